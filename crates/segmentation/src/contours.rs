//! Fiber contour extraction and per-fiber centre estimation.

use image::{GrayImage, Luma};
use imageproc::contours::find_contours;
use imageproc::distance_transform::euclidean_squared_distance_transform;
use imageproc::region_labelling::{connected_components, Connectivity};

use crate::types::{FiberContour, FiberMask};

/// Trace all fiber boundaries and compute the fiber area ratio.
///
/// The trace is flat: outer boundaries and hole boundaries come back
/// in one list. Degenerate contours (fewer than two distinct points)
/// are dropped.
pub fn extract_contours(mask: &FiberMask) -> (Vec<FiberContour>, f64) {
    let traced = find_contours::<i32>(mask.as_gray());

    let contours: Vec<FiberContour> = traced
        .into_iter()
        .filter_map(|contour| {
            let points: Vec<[f32; 2]> = contour
                .points
                .iter()
                .map(|p| [p.x as f32, p.y as f32])
                .collect();
            let degenerate = match points.first() {
                None => true,
                Some(first) => points.iter().all(|p| p == first),
            };
            if degenerate {
                None
            } else {
                Some(FiberContour { points })
            }
        })
        .collect();

    (contours, mask.area_ratio())
}

struct RegionPixels {
    pixels: Vec<(u32, u32)>,
    min_x: u32,
    min_y: u32,
    max_x: u32,
    max_y: u32,
}

/// Estimate one representative interior point per fiber region.
///
/// For each 8-connected mask component (holes excluded from the
/// domain), the squared Euclidean distance to the nearest non-region
/// pixel is computed with a one-pixel boundary ring around the
/// bounding box, so both holes and image edges count as borders. Only
/// the pixels at or above the 80th percentile of those distances are
/// kept, and among them the point minimizing
/// `(cx - x)^2 + (cy - y)^2 - d^3` wins: a compromise between sitting
/// near the region centroid and staying deep inside the fiber.
pub fn estimate_fiber_centers(mask: &FiberMask) -> Vec<[f32; 2]> {
    if mask.fiber_pixels() == 0 {
        return Vec::new();
    }

    let components = connected_components(mask.as_gray(), Connectivity::Eight, Luma([0u8]));
    let count = components.pixels().map(|p| p.0[0]).max().unwrap_or(0) as usize;
    if count == 0 {
        return Vec::new();
    }

    let mut regions: Vec<Option<RegionPixels>> = (0..count).map(|_| None).collect();
    for (x, y, pixel) in components.enumerate_pixels() {
        let label = pixel.0[0];
        if label == 0 {
            continue;
        }
        let region = regions[label as usize - 1].get_or_insert(RegionPixels {
            pixels: Vec::new(),
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
        });
        region.min_x = region.min_x.min(x);
        region.min_y = region.min_y.min(y);
        region.max_x = region.max_x.max(x);
        region.max_y = region.max_y.max(y);
        region.pixels.push((x, y));
    }

    let mut centers = Vec::new();
    for (index, region) in regions.into_iter().enumerate() {
        let Some(region) = region else { continue };
        let label = index as u32 + 1;

        // One-pixel ring of boundary around the bounding box; inside
        // it, everything that is not this region is boundary too.
        let roi_width = region.max_x - region.min_x + 3;
        let roi_height = region.max_y - region.min_y + 3;
        let roi = GrayImage::from_fn(roi_width, roi_height, |rx, ry| {
            if rx == 0 || ry == 0 || rx == roi_width - 1 || ry == roi_height - 1 {
                return Luma([255u8]);
            }
            let x = region.min_x + rx - 1;
            let y = region.min_y + ry - 1;
            if components.get_pixel(x, y).0[0] == label {
                Luma([0u8])
            } else {
                Luma([255u8])
            }
        });
        let distance_sq = euclidean_squared_distance_transform(&roi);

        let distances: Vec<f64> = region
            .pixels
            .iter()
            .map(|&(x, y)| {
                distance_sq
                    .get_pixel(x - region.min_x + 1, y - region.min_y + 1)
                    .0[0]
                    .sqrt()
            })
            .collect();

        let mut sorted = distances.clone();
        sorted.sort_unstable_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let crest = sorted[((sorted.len() - 1) as f64 * 0.8).round() as usize];

        let n = region.pixels.len() as f64;
        let cx = region.pixels.iter().map(|&(x, _)| x as f64).sum::<f64>() / n;
        let cy = region.pixels.iter().map(|&(_, y)| y as f64).sum::<f64>() / n;

        let mut best: Option<(f64, [f32; 2])> = None;
        for (&(x, y), &d) in region.pixels.iter().zip(&distances) {
            if d < crest {
                continue;
            }
            let score = (cx - x as f64).powi(2) + (cy - y as f64).powi(2) - d.powi(3);
            if best.map_or(true, |(s, _)| score < s) {
                best = Some((score, [x as f32, y as f32]));
            }
        }
        if let Some((_, center)) = best {
            centers.push(center);
        }
    }
    centers
}
