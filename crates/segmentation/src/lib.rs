//! # Fiber / nucleus segmentation pipeline
//!
//! Turns a raw multi-channel fluorescence image of a muscle culture
//! into nucleus centroids partitioned into fiber-resident ("positive")
//! and non-resident ("negative") sets, plus fiber contours, per-fiber
//! centres and the fiber area ratio — everything needed to compute a
//! fusion index.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use segmentation::{Pipeline, PipelineConfig};
//!
//! let pipeline = Pipeline::builder()
//!     .config(PipelineConfig::default())
//!     .build()?;
//!
//! let result = pipeline.process("culture.tif".as_ref())?;
//! println!(
//!     "{} / {} nuclei in fibers, fiber area {:.1}%",
//!     result.positives.len(),
//!     result.total_nuclei(),
//!     result.area_ratio * 100.0,
//! );
//! # Ok::<(), segmentation::SegmentationError>(())
//! ```
//!
//! Detection of nucleus instances is pluggable: anything implementing
//! [`detection::NucleusDetector`] can be injected through the builder;
//! the classical threshold detector is used when nothing is.

pub mod classifier;
pub mod contours;
pub mod error;
pub mod fiber_mask;
pub mod loader;
pub mod pipeline;
pub mod regions;
pub mod types;

pub use classifier::{Classification, NucleusClassifier};
pub use contours::{estimate_fiber_centers, extract_contours};
pub use error::{ConfigError, LoadError, Result, SegmentationError};
pub use fiber_mask::FiberMaskBuilder;
pub use loader::{extract_channel, load_rgb8};
pub use pipeline::{Pipeline, PipelineBuilder, PipelineConfig};
pub use regions::FiberRegions;
pub use types::{ChannelColor, FiberContour, FiberMask, NucleusRecord, SegmentationResult};

// The detector boundary is re-exported so downstream code only needs
// one crate in scope for the common case.
pub use detection;
