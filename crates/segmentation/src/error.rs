use thiserror::Error;

use crate::types::ChannelColor;

/// Failure to turn a file into a normalized 3-channel 8-bit image.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to load image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("unsupported pixel format: {0}")]
    UnsupportedFormat(String),
}

/// Invalid parameter combinations, rejected before any pixel work.
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("nuclei and fiber channels must differ, both are {0}")]
    SameChannel(ChannelColor),

    #[error("{band} intensity band is inverted: min {min} exceeds max {max}")]
    InvertedBand {
        band: &'static str,
        min: u8,
        max: u8,
    },

    #[error("minimum nucleus diameter must be positive")]
    ZeroDiameter,

    #[error("overlap threshold must lie in (0, 1], got {0}")]
    OverlapThreshold(f64),

    #[error("blur divisor must be positive")]
    ZeroBlurDivisor,
}

/// One failure signal per image; there is no partial-success state.
#[derive(Error, Debug)]
pub enum SegmentationError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Detector(#[from] detection::DetectorError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, SegmentationError>;
