use geo_types::{Coord, LineString, Polygon};
use image::GrayImage;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Which of the three image channels carries a marker.
///
/// Indices follow the loader's RGB convention: red = 0, green = 1,
/// blue = 2. Grayscale sources are loaded into the red channel.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ChannelColor {
    Red,
    Green,
    Blue,
}

impl ChannelColor {
    /// Index of this channel in a normalized RGB image.
    pub fn index(self) -> usize {
        match self {
            ChannelColor::Red => 0,
            ChannelColor::Green => 1,
            ChannelColor::Blue => 2,
        }
    }
}

/// Boolean fiber mask with the source image's dimensions.
///
/// Stored as a 0/255 grayscale buffer so it can flow straight into
/// `imageproc` operations; the true-pixel count is cached at
/// construction. Immutable afterwards.
#[derive(Debug, Clone)]
pub struct FiberMask {
    gray: GrayImage,
    fiber_pixels: u64,
}

impl FiberMask {
    /// Wrap a binary image; any non-zero pixel counts as fiber.
    pub fn from_gray(gray: GrayImage) -> Self {
        let fiber_pixels = gray.pixels().filter(|p| p.0[0] != 0).count() as u64;
        Self { gray, fiber_pixels }
    }

    pub fn width(&self) -> u32 {
        self.gray.width()
    }

    pub fn height(&self) -> u32 {
        self.gray.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.gray.dimensions()
    }

    /// Whether the pixel at (x, y) belongs to a fiber region.
    pub fn contains(&self, x: u32, y: u32) -> bool {
        self.gray.get_pixel(x, y).0[0] != 0
    }

    pub fn fiber_pixels(&self) -> u64 {
        self.fiber_pixels
    }

    /// Fiber pixels over total pixels, in [0, 1].
    pub fn area_ratio(&self) -> f64 {
        let total = self.gray.width() as u64 * self.gray.height() as u64;
        if total == 0 {
            0.0
        } else {
            self.fiber_pixels as f64 / total as f64
        }
    }

    pub fn as_gray(&self) -> &GrayImage {
        &self.gray
    }
}

/// One traced fiber boundary polygon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FiberContour {
    /// Ordered boundary points in image pixel coordinates.
    pub points: Vec<[f32; 2]>,
}

impl FiberContour {
    pub fn to_geo_polygon(&self) -> Polygon<f32> {
        let coords: Vec<Coord<f32>> = self
            .points
            .iter()
            .map(|&[x, y]| Coord { x, y })
            .collect();
        Polygon::new(LineString::new(coords), vec![])
    }

    /// Enclosed area of the boundary polygon.
    pub fn area(&self) -> f32 {
        use geo::Area;
        self.to_geo_polygon().unsigned_area()
    }
}

/// Per-instance classification record, kept only for the duration of
/// a pipeline invocation.
#[derive(Debug, Clone)]
pub struct NucleusRecord {
    /// Sub-pixel centroid (x, y) from averaging pixel coordinates.
    pub centroid: [f64; 2],
    /// Number of pixels belonging to the instance.
    pub pixel_count: u32,
    /// Mean nucleus-channel intensity over those pixels.
    pub mean_intensity: f64,
    /// Whether the nucleus is fiber-resident.
    pub positive: bool,
    /// Index of the owning fiber region, for positives.
    pub fiber: Option<usize>,
}

/// The one artifact a pipeline invocation hands back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentationResult {
    /// Centroids of nuclei outside any fiber.
    pub negatives: Vec<[f64; 2]>,
    /// Centroids of fiber-resident nuclei.
    pub positives: Vec<[f64; 2]>,
    /// Fiber boundary polygons.
    pub fiber_contours: Vec<FiberContour>,
    /// One representative interior point per fiber region.
    pub fiber_centers: Vec<[f32; 2]>,
    /// Fiber pixels over total pixels, in [0, 1].
    pub area_ratio: f64,
}

impl SegmentationResult {
    pub fn total_nuclei(&self) -> usize {
        self.negatives.len() + self.positives.len()
    }

    /// Fiber-resident nuclei over total nuclei; `None` when the image
    /// contains no accepted nuclei at all.
    pub fn fusion_index(&self) -> Option<f64> {
        let total = self.total_nuclei();
        if total == 0 {
            None
        } else {
            Some(self.positives.len() as f64 / total as f64)
        }
    }
}
