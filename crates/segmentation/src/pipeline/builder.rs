use std::sync::Arc;

use detection::{NucleusDetector, ThresholdDetector};

use crate::error::ConfigError;
use crate::pipeline::{Pipeline, PipelineConfig};
use crate::types::ChannelColor;

/// Fluent construction of a [`Pipeline`].
///
/// `build` validates the configuration and, when no detector was
/// injected, falls back to the classical [`ThresholdDetector`] sized
/// from the configured minimum nucleus diameter.
pub struct PipelineBuilder {
    config: PipelineConfig,
    detector: Option<Arc<dyn NucleusDetector>>,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
            detector: None,
        }
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Inject a nucleus detector.
    pub fn detector<D>(mut self, detector: D) -> Self
    where
        D: NucleusDetector + 'static,
    {
        self.detector = Some(Arc::new(detector));
        self
    }

    /// Inject an already-shared detector handle.
    pub fn shared_detector(mut self, detector: Arc<dyn NucleusDetector>) -> Self {
        self.detector = Some(detector);
        self
    }

    pub fn channels(mut self, nuclei: ChannelColor, fiber: ChannelColor) -> Self {
        self.config.nuclei_channel = nuclei;
        self.config.fiber_channel = fiber;
        self
    }

    pub fn fiber_band(mut self, min: u8, max: u8) -> Self {
        self.config.min_fiber_intensity = min;
        self.config.max_fiber_intensity = max;
        self
    }

    pub fn nucleus_band(mut self, min: u8, max: u8) -> Self {
        self.config.min_nucleus_intensity = min;
        self.config.max_nucleus_intensity = max;
        self
    }

    pub fn min_nucleus_diameter(mut self, diameter: u32) -> Self {
        self.config.min_nucleus_diameter = diameter;
        self
    }

    pub fn min_nuclei_per_fiber(mut self, count: u32) -> Self {
        self.config.min_nuclei_per_fiber = count;
        self
    }

    pub fn overlap_threshold(mut self, threshold: f64) -> Self {
        self.config.overlap_threshold = threshold;
        self
    }

    /// Validate and assemble the pipeline.
    pub fn build(self) -> Result<Pipeline, ConfigError> {
        self.config.validate()?;
        let detector = self.detector.unwrap_or_else(|| {
            Arc::new(ThresholdDetector::new(self.config.min_nucleus_diameter))
        });
        Ok(Pipeline {
            config: self.config,
            detector,
        })
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_rejects_invalid_configuration() {
        let result = Pipeline::builder()
            .channels(ChannelColor::Red, ChannelColor::Red)
            .build();
        assert!(matches!(result, Err(ConfigError::SameChannel(_))));
    }

    #[test]
    fn build_with_defaults_succeeds() {
        let pipeline = Pipeline::builder().build().unwrap();
        assert_eq!(pipeline.config().min_fiber_intensity, 25);
        assert_eq!(pipeline.config().overlap_threshold, 0.75);
    }

    #[test]
    fn setters_reach_the_config() {
        let pipeline = Pipeline::builder()
            .channels(ChannelColor::Green, ChannelColor::Red)
            .fiber_band(30, 220)
            .nucleus_band(40, 250)
            .min_nucleus_diameter(12)
            .min_nuclei_per_fiber(5)
            .overlap_threshold(0.5)
            .build()
            .unwrap();

        let config = pipeline.config();
        assert_eq!(config.nuclei_channel, ChannelColor::Green);
        assert_eq!(config.fiber_channel, ChannelColor::Red);
        assert_eq!(config.min_fiber_intensity, 30);
        assert_eq!(config.max_nucleus_intensity, 250);
        assert_eq!(config.min_nucleus_diameter, 12);
        assert_eq!(config.min_nuclei_per_fiber, 5);
        assert_eq!(config.overlap_threshold, 0.5);
    }
}
