//! Image loading and normalization to 3-channel 8-bit RGB.

use std::path::Path;

use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};

use crate::error::LoadError;
use crate::types::ChannelColor;

/// Load an image file and normalize it to 3x8-bit RGB.
///
/// Whatever the source looks like, the result follows one convention:
/// - grayscale data lands in the red channel (index 0), the other two
///   channels are zero;
/// - an alpha channel, if present, is discarded;
/// - 16-bit unsigned samples are reduced with `v >> 8`;
/// - floating-point samples are linearly rescaled from the observed
///   [min, max] to [0, 255];
/// - any other pixel format fails with [`LoadError::UnsupportedFormat`]
///   rather than being silently mangled.
///
/// Pure function of the path apart from the read itself.
pub fn load_rgb8(path: &Path) -> Result<RgbImage, LoadError> {
    normalize(image::open(path)?)
}

/// Extract one channel of a normalized image as a grayscale buffer.
pub fn extract_channel(image: &RgbImage, channel: ChannelColor) -> GrayImage {
    let index = channel.index();
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        Luma([image.get_pixel(x, y).0[index]])
    })
}

pub(crate) fn normalize(decoded: DynamicImage) -> Result<RgbImage, LoadError> {
    match decoded {
        DynamicImage::ImageRgb8(rgb) => Ok(rgb),
        DynamicImage::ImageRgba8(rgba) => {
            Ok(RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
                let p = rgba.get_pixel(x, y).0;
                Rgb([p[0], p[1], p[2]])
            }))
        }
        DynamicImage::ImageLuma8(gray) => {
            Ok(gray_to_red(gray.width(), gray.height(), |x, y| {
                gray.get_pixel(x, y).0[0]
            }))
        }
        DynamicImage::ImageLumaA8(gray) => {
            Ok(gray_to_red(gray.width(), gray.height(), |x, y| {
                gray.get_pixel(x, y).0[0]
            }))
        }
        DynamicImage::ImageLuma16(gray) => {
            Ok(gray_to_red(gray.width(), gray.height(), |x, y| {
                shrink16(gray.get_pixel(x, y).0[0])
            }))
        }
        DynamicImage::ImageLumaA16(gray) => {
            Ok(gray_to_red(gray.width(), gray.height(), |x, y| {
                shrink16(gray.get_pixel(x, y).0[0])
            }))
        }
        DynamicImage::ImageRgb16(rgb) => {
            Ok(RgbImage::from_fn(rgb.width(), rgb.height(), |x, y| {
                let p = rgb.get_pixel(x, y).0;
                Rgb([shrink16(p[0]), shrink16(p[1]), shrink16(p[2])])
            }))
        }
        DynamicImage::ImageRgba16(rgba) => {
            Ok(RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
                let p = rgba.get_pixel(x, y).0;
                Rgb([shrink16(p[0]), shrink16(p[1]), shrink16(p[2])])
            }))
        }
        DynamicImage::ImageRgb32F(rgb) => {
            let (lo, hi) = float_range(rgb.pixels().flat_map(|p| p.0.iter().copied()));
            Ok(RgbImage::from_fn(rgb.width(), rgb.height(), |x, y| {
                let p = rgb.get_pixel(x, y).0;
                Rgb([
                    rescale_float(p[0], lo, hi),
                    rescale_float(p[1], lo, hi),
                    rescale_float(p[2], lo, hi),
                ])
            }))
        }
        DynamicImage::ImageRgba32F(rgba) => {
            let (lo, hi) = float_range(rgba.pixels().flat_map(|p| p.0[..3].iter().copied()));
            Ok(RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
                let p = rgba.get_pixel(x, y).0;
                Rgb([
                    rescale_float(p[0], lo, hi),
                    rescale_float(p[1], lo, hi),
                    rescale_float(p[2], lo, hi),
                ])
            }))
        }
        other => Err(LoadError::UnsupportedFormat(format!("{:?}", other.color()))),
    }
}

fn gray_to_red(width: u32, height: u32, sample: impl Fn(u32, u32) -> u8) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| Rgb([sample(x, y), 0, 0]))
}

fn shrink16(v: u16) -> u8 {
    (v >> 8) as u8
}

fn float_range(samples: impl Iterator<Item = f32>) -> (f32, f32) {
    let mut lo = f32::INFINITY;
    let mut hi = f32::NEG_INFINITY;
    for v in samples {
        lo = lo.min(v);
        hi = hi.max(v);
    }
    (lo, hi)
}

fn rescale_float(v: f32, lo: f32, hi: f32) -> u8 {
    if !(hi > lo) {
        return 0;
    }
    (((v - lo) / (hi - lo)) * 255.0).round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, LumaA, Rgba};

    #[test]
    fn rgb8_passes_through_unchanged() {
        let rgb = RgbImage::from_fn(3, 2, |x, y| Rgb([x as u8, y as u8, 7]));
        let out = normalize(DynamicImage::ImageRgb8(rgb.clone())).unwrap();
        assert_eq!(out, rgb);
    }

    #[test]
    fn alpha_is_discarded() {
        let rgba = ImageBuffer::from_fn(2, 2, |x, _| Rgba([10 * x as u8, 20, 30, 40]));
        let out = normalize(DynamicImage::ImageRgba8(rgba)).unwrap();
        assert_eq!(out.get_pixel(1, 0).0, [10, 20, 30]);
    }

    #[test]
    fn grayscale_lands_in_red_channel() {
        let gray = GrayImage::from_fn(4, 1, |x, _| Luma([50 + x as u8]));
        let out = normalize(DynamicImage::ImageLuma8(gray)).unwrap();
        assert_eq!(out.get_pixel(2, 0).0, [52, 0, 0]);

        let gray_alpha = ImageBuffer::from_fn(2, 1, |x, _| LumaA([90 + x as u8, 255]));
        let out = normalize(DynamicImage::ImageLumaA8(gray_alpha)).unwrap();
        assert_eq!(out.get_pixel(1, 0).0, [91, 0, 0]);
    }

    #[test]
    fn sixteen_bit_samples_shrink_by_256() {
        let gray16: ImageBuffer<Luma<u16>, Vec<u16>> =
            ImageBuffer::from_fn(256, 1, |x, _| Luma([(x as u16) << 8]));
        let out = normalize(DynamicImage::ImageLuma16(gray16)).unwrap();
        for x in 0..256 {
            assert_eq!(out.get_pixel(x, 0).0[0], x as u8);
        }
    }

    #[test]
    fn float_samples_rescale_to_full_range() {
        let float = image::Rgb32FImage::from_fn(2, 1, |x, _| {
            if x == 0 {
                Rgb([-1.0f32, -1.0, -1.0])
            } else {
                Rgb([3.0f32, 3.0, 1.0])
            }
        });
        let out = normalize(DynamicImage::ImageRgb32F(float)).unwrap();
        assert_eq!(out.get_pixel(0, 0).0, [0, 0, 0]);
        // 3.0 maps to 255; 1.0 sits halfway up the [-1, 3] range.
        assert_eq!(out.get_pixel(1, 0).0, [255, 255, 128]);
    }

    #[test]
    fn flat_float_image_maps_to_zero() {
        let float = image::Rgb32FImage::from_pixel(2, 2, Rgb([0.5f32, 0.5, 0.5]));
        let out = normalize(DynamicImage::ImageRgb32F(float)).unwrap();
        assert!(out.pixels().all(|p| p.0 == [0, 0, 0]));
    }

    #[test]
    fn channels_extract_by_configured_index() {
        let rgb = RgbImage::from_pixel(2, 2, Rgb([11, 22, 33]));
        assert_eq!(
            extract_channel(&rgb, ChannelColor::Red).get_pixel(0, 0).0[0],
            11
        );
        assert_eq!(
            extract_channel(&rgb, ChannelColor::Green).get_pixel(0, 0).0[0],
            22
        );
        assert_eq!(
            extract_channel(&rgb, ChannelColor::Blue).get_pixel(0, 0).0[0],
            33
        );
    }
}
