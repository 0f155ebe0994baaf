//! Fiber mask construction: smoothing, band thresholding, morphology
//! and nucleus-aware hole filling.

use image::{GrayImage, Luma};
use imageproc::contrast::otsu_level;
use imageproc::filter::gaussian_blur_f32;
use imageproc::distance_transform::Norm;
use imageproc::morphology::{close, open};
use tracing::debug;

use crate::regions::enclosed_background_components;
use crate::types::FiberMask;

/// Builds a boolean fiber mask from the fiber marker channel.
///
/// The nucleus channel participates only in the hole heuristics: a
/// gap in the fiber signal that is bright in the nucleus channel is
/// most likely a nucleus sitting inside the fiber, not a real gap.
#[derive(Debug, Clone)]
pub struct FiberMaskBuilder {
    /// Lowest smoothed intensity considered fiber (inclusive).
    pub min_intensity: u8,
    /// Upper intensity bound (exclusive).
    pub max_intensity: u8,
    /// Smoothing kernel side is `min(width, height) / blur_divisor`,
    /// rounded down to odd.
    pub blur_divisor: u32,
    /// Radius of the square structuring element used for the opening
    /// and closing passes.
    pub morph_radius: u8,
}

impl Default for FiberMaskBuilder {
    fn default() -> Self {
        Self {
            min_intensity: 25,
            max_intensity: 255,
            blur_divisor: 50,
            morph_radius: 2,
        }
    }
}

impl FiberMaskBuilder {
    pub fn new(min_intensity: u8, max_intensity: u8) -> Self {
        Self {
            min_intensity,
            max_intensity,
            ..Self::default()
        }
    }

    /// Run the full mask pipeline. An entirely dark fiber channel
    /// yields an all-false mask, not an error.
    pub fn build(&self, fiber: &GrayImage, nuclei: &GrayImage) -> FiberMask {
        let smoothed = self.smooth(fiber);

        // Keep the half-open band [min, max).
        let (width, height) = smoothed.dimensions();
        let banded = GrayImage::from_fn(width, height, |x, y| {
            let v = smoothed.get_pixel(x, y).0[0];
            if v >= self.min_intensity && v < self.max_intensity {
                Luma([255u8])
            } else {
                Luma([0u8])
            }
        });

        // Opening clears speckle outside the fibers, closing seals
        // small gaps inside them.
        let opened = open(&banded, Norm::LInf, self.morph_radius);
        let mut mask = close(&opened, Norm::LInf, self.morph_radius);

        let filled = self.fill_nucleus_holes(&mut mask, fiber, nuclei);
        debug!(filled_holes = filled, "fiber mask built");

        FiberMask::from_gray(mask)
    }

    fn smooth(&self, fiber: &GrayImage) -> GrayImage {
        let side = (fiber.width().min(fiber.height()) / self.blur_divisor.max(1)).max(3);
        let side = if side % 2 == 0 { side - 1 } else { side };
        // OpenCV's sigma-for-kernel rule; `imageproc` wants sigma, not
        // a kernel side.
        let sigma = 0.3 * ((side as f32 - 1.0) * 0.5 - 1.0) + 0.8;
        debug!(kernel = side, sigma, "smoothing fiber channel");
        gaussian_blur_f32(fiber, sigma)
    }

    /// Fill enclosed mask holes that look like nuclei resting inside a
    /// fiber. Returns the number of holes filled.
    fn fill_nucleus_holes(
        &self,
        mask: &mut GrayImage,
        fiber: &GrayImage,
        nuclei: &GrayImage,
    ) -> usize {
        let mut masked: Vec<u8> = mask
            .enumerate_pixels()
            .filter(|(_, _, p)| p.0[0] != 0)
            .map(|(x, y, _)| fiber.get_pixel(x, y).0[0])
            .collect();
        if masked.is_empty() {
            return 0;
        }
        masked.sort_unstable();
        let masked_median = masked[masked.len() / 2];

        let nucleus_level = otsu_level(nuclei);
        let mut filled = 0;

        for hole in enclosed_background_components(mask) {
            let mut nucleus_values: Vec<u8> = hole
                .iter()
                .map(|&(x, y)| nuclei.get_pixel(x, y).0[0])
                .collect();
            nucleus_values.sort_unstable();
            let nucleus_median = nucleus_values[nucleus_values.len() / 2];

            let fiber_sum: u64 = hole
                .iter()
                .map(|&(x, y)| fiber.get_pixel(x, y).0[0] as u64)
                .sum();
            let fiber_mean = fiber_sum as f64 / hole.len() as f64;

            if nucleus_median >= nucleus_level && fiber_mean >= masked_median as f64 {
                for &(x, y) in &hole {
                    mask.put_pixel(x, y, Luma([255u8]));
                }
                filled += 1;
            }
        }
        filled
    }
}
