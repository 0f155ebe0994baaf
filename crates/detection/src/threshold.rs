//! Classical nucleus detector: smoothing, Otsu threshold, connected
//! component labeling and a minimum-area filter.

use image::{GrayImage, Luma};
use imageproc::contrast::otsu_level;
use imageproc::filter::gaussian_blur_f32;
use imageproc::region_labelling::{connected_components, Connectivity};
use tracing::debug;

use crate::error::Result;
use crate::label::{min_nucleus_area, LabelImage};
use crate::NucleusDetector;

/// Threshold-based instance detector.
///
/// Nowhere near the separation power of a trained model on touching
/// nuclei, but it fully satisfies the [`NucleusDetector`] contract and
/// keeps the rest of the pipeline exercisable without a model runtime.
#[derive(Debug, Clone)]
pub struct ThresholdDetector {
    /// Minimum nucleus diameter in pixels; instances smaller than the
    /// equivalent disc area are dropped.
    pub min_diameter: u32,
    /// Smoothing applied before thresholding. Zero disables it.
    pub blur_sigma: f32,
}

impl ThresholdDetector {
    pub fn new(min_diameter: u32) -> Self {
        Self {
            min_diameter,
            blur_sigma: 1.0,
        }
    }
}

impl Default for ThresholdDetector {
    fn default() -> Self {
        Self::new(20)
    }
}

impl NucleusDetector for ThresholdDetector {
    fn detect(&self, nuclei: &GrayImage) -> Result<LabelImage> {
        let (width, height) = nuclei.dimensions();

        let smoothed = if self.blur_sigma > 0.0 {
            gaussian_blur_f32(nuclei, self.blur_sigma)
        } else {
            nuclei.clone()
        };

        let level = otsu_level(&smoothed);
        let binary = GrayImage::from_fn(width, height, |x, y| {
            if smoothed.get_pixel(x, y).0[0] > level {
                Luma([255u8])
            } else {
                Luma([0u8])
            }
        });

        let components = connected_components(&binary, Connectivity::Eight, Luma([0u8]));

        // Pixel count per raw component label.
        let raw_count = components.pixels().map(|p| p.0[0]).max().unwrap_or(0) as usize;
        let mut areas = vec![0u64; raw_count + 1];
        for pixel in components.pixels() {
            areas[pixel.0[0] as usize] += 1;
        }

        // Relabel surviving components contiguously from 1.
        let min_area = min_nucleus_area(self.min_diameter);
        let mut remap = vec![0u32; raw_count + 1];
        let mut next = 0u32;
        for (raw, &area) in areas.iter().enumerate().skip(1) {
            if (area as f64) >= min_area {
                next += 1;
                remap[raw] = next;
            }
        }

        let labels: Vec<u32> = components
            .pixels()
            .map(|p| remap[p.0[0] as usize])
            .collect();

        debug!(
            otsu = level,
            raw_components = raw_count,
            kept = next,
            "threshold detection finished"
        );

        LabelImage::from_raw(width, height, labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blob(image: &mut GrayImage, cx: i64, cy: i64, radius: i64, value: u8) {
        for y in (cy - radius)..=(cy + radius) {
            for x in (cx - radius)..=(cx + radius) {
                let (dx, dy) = (x - cx, y - cy);
                if dx * dx + dy * dy <= radius * radius
                    && x >= 0
                    && y >= 0
                    && (x as u32) < image.width()
                    && (y as u32) < image.height()
                {
                    image.put_pixel(x as u32, y as u32, Luma([value]));
                }
            }
        }
    }

    #[test]
    fn detects_separated_blobs() {
        let mut channel = GrayImage::new(120, 80);
        blob(&mut channel, 25, 25, 6, 210);
        blob(&mut channel, 80, 40, 6, 190);
        blob(&mut channel, 55, 65, 6, 230);

        let detector = ThresholdDetector::new(5);
        let labels = detector.detect(&channel).unwrap();
        assert_eq!(labels.max_label(), 3);
        assert_eq!(labels.dimensions(), (120, 80));
    }

    #[test]
    fn small_instances_are_filtered() {
        let mut channel = GrayImage::new(100, 100);
        blob(&mut channel, 30, 30, 8, 210);
        blob(&mut channel, 70, 70, 2, 210);

        // Diameter 10 -> min area ~78.5 px; the radius-2 blob (~13 px)
        // must not survive.
        let detector = ThresholdDetector::new(10);
        let labels = detector.detect(&channel).unwrap();
        assert_eq!(labels.max_label(), 1);
    }

    #[test]
    fn empty_channel_yields_no_instances() {
        let channel = GrayImage::new(64, 64);
        let labels = ThresholdDetector::new(5).detect(&channel).unwrap();
        assert_eq!(labels.max_label(), 0);
    }

    #[test]
    fn labels_are_contiguous_after_filtering() {
        let mut channel = GrayImage::new(160, 60);
        blob(&mut channel, 20, 30, 7, 200);
        blob(&mut channel, 60, 30, 2, 200);
        blob(&mut channel, 100, 30, 7, 200);
        blob(&mut channel, 140, 30, 2, 200);

        let labels = ThresholdDetector::new(10).detect(&channel).unwrap();
        assert_eq!(labels.max_label(), 2);

        let mut seen = std::collections::BTreeSet::new();
        for (_, _, label) in labels.labeled_pixels() {
            seen.insert(label);
        }
        assert_eq!(seen.into_iter().collect::<Vec<_>>(), vec![1, 2]);
    }
}
