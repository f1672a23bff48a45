use thiserror::Error;

#[derive(Error, Debug)]
pub enum TensorError {
    #[error("Unsupported dtype code {descr:?} (expected one of <f4, <f8, <u4)")]
    UnsupportedDtype { descr: String },

    #[error("Buffer of {got} elements does not fit shape requiring {expected}")]
    SizeMismatch { expected: usize, got: usize },

    #[error("Payload for shape {shape:?} should hold {expected} elements, got {got}")]
    ShapeMismatch {
        shape: Vec<usize>,
        expected: usize,
        got: usize,
    },

    #[error("Malformed header field `{field}`: {reason}")]
    MalformedHeader { field: &'static str, reason: String },

    #[error("Truncated input: needed {needed} bytes, only {available} available")]
    Truncated { needed: usize, available: usize },

    #[error("Column-major (fortran_order) payloads are not accepted")]
    UnsupportedLayout,

    #[error("Payload of {size} bytes exceeds limit of {limit} bytes")]
    PayloadTooLarge { size: usize, limit: usize },

    #[error("Operation requires a rank-{expected} tensor, got rank {got}")]
    InvalidRank { expected: usize, got: usize },

    #[error("Index {index} out of bounds for axis {axis} with size {size}")]
    IndexOutOfBounds {
        index: usize,
        axis: usize,
        size: usize,
    },

    #[error("Unknown content type {0:?}")]
    UnknownContentType(String),

    #[error("Config error: {0}")]
    Config(String),
}
