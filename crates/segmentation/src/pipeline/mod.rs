pub mod builder;

use std::path::Path;
use std::sync::Arc;

use detection::{DetectorError, NucleusDetector};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::classifier::NucleusClassifier;
use crate::contours::{estimate_fiber_centers, extract_contours};
use crate::error::{ConfigError, Result};
use crate::fiber_mask::FiberMaskBuilder;
use crate::loader::{extract_channel, load_rgb8};
use crate::types::{ChannelColor, SegmentationResult};

pub use builder::PipelineBuilder;

/// User-facing pipeline parameters.
///
/// The empirically tuned constants (blur divisor, morphology radius,
/// overlap threshold) are exposed here with the observed defaults —
/// their values are domain calibration, not algorithmic necessity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub nuclei_channel: ChannelColor,
    pub fiber_channel: ChannelColor,
    /// Fiber band, half-open: `min <= v < max` on the smoothed channel.
    pub min_fiber_intensity: u8,
    pub max_fiber_intensity: u8,
    /// Nucleus acceptance window, inclusive on both bounds.
    pub min_nucleus_intensity: u8,
    pub max_nucleus_intensity: u8,
    /// Minimum nucleus diameter in pixels, handed to the detector.
    pub min_nucleus_diameter: u32,
    pub min_nuclei_per_fiber: u32,
    pub overlap_threshold: f64,
    pub blur_divisor: u32,
    pub morph_radius: u8,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            nuclei_channel: ChannelColor::Blue,
            fiber_channel: ChannelColor::Green,
            min_fiber_intensity: 25,
            max_fiber_intensity: 255,
            min_nucleus_intensity: 25,
            max_nucleus_intensity: 255,
            min_nucleus_diameter: 20,
            min_nuclei_per_fiber: 3,
            overlap_threshold: 0.75,
            blur_divisor: 50,
            morph_radius: 2,
        }
    }
}

impl PipelineConfig {
    /// Reject invalid parameter combinations before any pixel work.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.nuclei_channel == self.fiber_channel {
            return Err(ConfigError::SameChannel(self.nuclei_channel));
        }
        if self.min_fiber_intensity > self.max_fiber_intensity {
            return Err(ConfigError::InvertedBand {
                band: "fiber",
                min: self.min_fiber_intensity,
                max: self.max_fiber_intensity,
            });
        }
        if self.min_nucleus_intensity > self.max_nucleus_intensity {
            return Err(ConfigError::InvertedBand {
                band: "nucleus",
                min: self.min_nucleus_intensity,
                max: self.max_nucleus_intensity,
            });
        }
        if self.min_nucleus_diameter == 0 {
            return Err(ConfigError::ZeroDiameter);
        }
        if !(self.overlap_threshold > 0.0 && self.overlap_threshold <= 1.0) {
            return Err(ConfigError::OverlapThreshold(self.overlap_threshold));
        }
        if self.blur_divisor == 0 {
            return Err(ConfigError::ZeroBlurDivisor);
        }
        Ok(())
    }
}

/// The per-image segmentation pipeline.
///
/// Holds a validated configuration and a detector handle; one instance
/// serves any number of images, from any number of threads. Each
/// invocation works on its own buffers and either returns a complete
/// [`SegmentationResult`] or fails — there are no partial results.
pub struct Pipeline {
    pub(crate) config: PipelineConfig,
    pub(crate) detector: Arc<dyn NucleusDetector>,
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Process a single image file.
    pub fn process(&self, path: &Path) -> Result<SegmentationResult> {
        let config = &self.config;

        let image = load_rgb8(path)?;
        let nuclei = extract_channel(&image, config.nuclei_channel);
        let fiber = extract_channel(&image, config.fiber_channel);
        drop(image);

        let mask = FiberMaskBuilder {
            min_intensity: config.min_fiber_intensity,
            max_intensity: config.max_fiber_intensity,
            blur_divisor: config.blur_divisor,
            morph_radius: config.morph_radius,
        }
        .build(&fiber, &nuclei);

        let labels = self.detector.detect(&nuclei)?;
        if labels.dimensions() != nuclei.dimensions() {
            let (got_width, got_height) = labels.dimensions();
            return Err(DetectorError::ShapeMismatch {
                expected_width: nuclei.width(),
                expected_height: nuclei.height(),
                got_width,
                got_height,
            }
            .into());
        }

        let (fiber_contours, area_ratio) = extract_contours(&mask);
        let fiber_centers = estimate_fiber_centers(&mask);

        let classification = NucleusClassifier {
            overlap_threshold: config.overlap_threshold,
            min_intensity: config.min_nucleus_intensity,
            max_intensity: config.max_nucleus_intensity,
            min_nuclei_per_fiber: config.min_nuclei_per_fiber,
        }
        .classify(&labels, &mask, &nuclei);

        let result = SegmentationResult {
            negatives: classification.negatives(),
            positives: classification.positives(),
            fiber_contours,
            fiber_centers,
            area_ratio,
        };

        info!(
            path = %path.display(),
            positives = result.positives.len(),
            negatives = result.negatives.len(),
            fibers = result.fiber_centers.len(),
            area_ratio = result.area_ratio,
            "image processed"
        );

        Ok(result)
    }
}
