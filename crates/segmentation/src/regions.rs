//! Grouping of fiber mask components with their enclosed holes.

use image::{GrayImage, Luma};
use imageproc::region_labelling::{connected_components, Connectivity};

use crate::types::FiberMask;

/// Fiber regions: one entry per top-level mask component, with its
/// enclosed holes folded back into the region.
///
/// A nucleus sitting in a signal hole inside a fiber is still inside
/// that fiber, so membership lookups go through a label map in which
/// hole pixels carry the label of the component enclosing them.
#[derive(Debug, Clone)]
pub struct FiberRegions {
    width: u32,
    label_map: Vec<u32>,
    count: usize,
}

impl FiberRegions {
    pub fn from_mask(mask: &FiberMask) -> Self {
        let (width, height) = mask.dimensions();
        let components = connected_components(mask.as_gray(), Connectivity::Eight, Luma([0u8]));

        let mut label_map: Vec<u32> = components.pixels().map(|p| p.0[0]).collect();
        let count = label_map.iter().copied().max().unwrap_or(0) as usize;

        for hole in enclosed_background_components(mask.as_gray()) {
            let mut owner = 0u32;
            'search: for &(x, y) in &hole {
                for (nx, ny) in neighbors4(x, y, width, height) {
                    let label = components.get_pixel(nx, ny).0[0];
                    if label != 0 {
                        owner = label;
                        break 'search;
                    }
                }
            }
            if owner != 0 {
                for &(x, y) in &hole {
                    label_map[(y * width + x) as usize] = owner;
                }
            }
        }

        Self {
            width,
            label_map,
            count,
        }
    }

    /// Number of fiber regions.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Zero-based index of the region covering (x, y), holes included.
    pub fn region_at(&self, x: u32, y: u32) -> Option<usize> {
        match self.label_map[(y * self.width + x) as usize] {
            0 => None,
            label => Some(label as usize - 1),
        }
    }
}

/// Connected background components that do not touch the image border,
/// i.e. holes fully enclosed by mask foreground. 4-connectivity, the
/// complement of the 8-connected foreground, so a diagonal speckle
/// cannot bridge two regions.
pub(crate) fn enclosed_background_components(mask: &GrayImage) -> Vec<Vec<(u32, u32)>> {
    let (width, height) = mask.dimensions();
    if width == 0 || height == 0 {
        return Vec::new();
    }

    let inverted = GrayImage::from_fn(width, height, |x, y| {
        if mask.get_pixel(x, y).0[0] == 0 {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    });
    let components = connected_components(&inverted, Connectivity::Four, Luma([0u8]));

    let max = components.pixels().map(|p| p.0[0]).max().unwrap_or(0) as usize;
    if max == 0 {
        return Vec::new();
    }

    let mut touches_border = vec![false; max + 1];
    for x in 0..width {
        touches_border[components.get_pixel(x, 0).0[0] as usize] = true;
        touches_border[components.get_pixel(x, height - 1).0[0] as usize] = true;
    }
    for y in 0..height {
        touches_border[components.get_pixel(0, y).0[0] as usize] = true;
        touches_border[components.get_pixel(width - 1, y).0[0] as usize] = true;
    }

    let mut holes: Vec<Vec<(u32, u32)>> = vec![Vec::new(); max + 1];
    for y in 0..height {
        for x in 0..width {
            let label = components.get_pixel(x, y).0[0] as usize;
            if label != 0 && !touches_border[label] {
                holes[label].push((x, y));
            }
        }
    }
    holes.retain(|hole| !hole.is_empty());
    holes
}

fn neighbors4(x: u32, y: u32, width: u32, height: u32) -> impl Iterator<Item = (u32, u32)> {
    let mut out = Vec::with_capacity(4);
    if x > 0 {
        out.push((x - 1, y));
    }
    if y > 0 {
        out.push((x, y - 1));
    }
    if x + 1 < width {
        out.push((x + 1, y));
    }
    if y + 1 < height {
        out.push((x, y + 1));
    }
    out.into_iter()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask_from_fn(width: u32, height: u32, f: impl Fn(u32, u32) -> bool) -> FiberMask {
        FiberMask::from_gray(GrayImage::from_fn(width, height, |x, y| {
            if f(x, y) {
                Luma([255u8])
            } else {
                Luma([0u8])
            }
        }))
    }

    #[test]
    fn separate_components_get_separate_regions() {
        let mask = mask_from_fn(40, 20, |x, _| (2..12).contains(&x) || (25..35).contains(&x));
        let regions = FiberRegions::from_mask(&mask);
        assert_eq!(regions.len(), 2);
        assert_ne!(regions.region_at(5, 10), regions.region_at(30, 10));
        assert_eq!(regions.region_at(18, 10), None);
    }

    #[test]
    fn hole_pixels_belong_to_the_enclosing_region() {
        // A 20x20 ring: square with a 6x6 hollow centre.
        let mask = mask_from_fn(30, 30, |x, y| {
            let in_outer = (4..24).contains(&x) && (4..24).contains(&y);
            let in_hole = (11..17).contains(&x) && (11..17).contains(&y);
            in_outer && !in_hole
        });
        let regions = FiberRegions::from_mask(&mask);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions.region_at(13, 13), Some(0));
        assert_eq!(regions.region_at(0, 0), None);
    }

    #[test]
    fn border_touching_background_is_not_a_hole() {
        let mask = mask_from_fn(20, 20, |x, y| (5..15).contains(&x) && (5..15).contains(&y));
        let holes = enclosed_background_components(mask.as_gray());
        assert!(holes.is_empty());
    }

    #[test]
    fn enclosed_hole_is_reported_once() {
        let mask = mask_from_fn(30, 30, |x, y| {
            let in_outer = (2..28).contains(&x) && (2..28).contains(&y);
            let in_hole = (10..15).contains(&x) && (12..20).contains(&y);
            in_outer && !in_hole
        });
        let holes = enclosed_background_components(mask.as_gray());
        assert_eq!(holes.len(), 1);
        assert_eq!(holes[0].len(), 5 * 8);
    }
}
