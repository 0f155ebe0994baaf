use thiserror::Error;

#[derive(Error, Debug)]
pub enum DetectorError {
    /// The detector backend failed for any reason (model runtime,
    /// resource exhaustion, ...). The original cause is attached.
    #[error("nucleus detector backend failed: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The detector produced a label image whose dimensions do not
    /// match the input channel.
    #[error("label image is {got_width}x{got_height} but the input channel is {expected_width}x{expected_height}")]
    ShapeMismatch {
        expected_width: u32,
        expected_height: u32,
        got_width: u32,
        got_height: u32,
    },

    /// The raw label buffer length does not match width * height.
    #[error("label buffer holds {len} values, expected {expected}")]
    InvalidBuffer { len: usize, expected: usize },
}

pub type Result<T> = std::result::Result<T, DetectorError>;
