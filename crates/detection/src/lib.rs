//! Nucleus instance detection boundary.
//!
//! The segmentation pipeline treats nucleus detection as a pluggable
//! capability: given a single 2D intensity channel, return a per-pixel
//! label map where each connected nucleus instance carries a unique
//! positive label and 0 marks background, with a minimum-size filter
//! already applied. Anything satisfying [`NucleusDetector`] can be
//! dropped in — a neural instance-segmentation model, a classical
//! watershed, or a stub for tests.
//!
//! This crate also ships [`ThresholdDetector`], a classical detector
//! (Gaussian smoothing, Otsu threshold, connected component labeling,
//! minimum-area filter) that satisfies the contract without any model
//! runtime.

pub mod error;
pub mod label;
pub mod threshold;

pub use error::{DetectorError, Result};
pub use label::{min_nucleus_area, LabelImage};
pub use threshold::ThresholdDetector;

use image::GrayImage;

/// Capability interface for nucleus instance segmentation.
///
/// Implementations must return a label image with the same dimensions
/// as the input channel. Labels are expected to be contiguous from
/// `1..=N`, though consumers tolerate gaps defensively.
pub trait NucleusDetector: Send + Sync {
    /// Detect nucleus instances in a single intensity channel.
    fn detect(&self, nuclei: &GrayImage) -> Result<LabelImage>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    struct FixedDetector(LabelImage);

    impl NucleusDetector for FixedDetector {
        fn detect(&self, _nuclei: &GrayImage) -> Result<LabelImage> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn trait_object_is_substitutable() {
        let labels = LabelImage::from_raw(2, 2, vec![0, 1, 1, 0]).unwrap();
        let detector: Box<dyn NucleusDetector> = Box::new(FixedDetector(labels));

        let mut channel = GrayImage::new(2, 2);
        channel.put_pixel(0, 1, Luma([200u8]));

        let out = detector.detect(&channel).unwrap();
        assert_eq!(out.max_label(), 1);
        assert_eq!(out.label_at(1, 0), 1);
        assert_eq!(out.label_at(0, 0), 0);
    }
}
