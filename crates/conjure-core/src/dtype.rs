use std::fmt;

use crate::{Result, TensorError};

/// Element types the decoder understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    F32,
    F64,
    U32,
}

impl DType {
    /// Map a header `descr` code (e.g. `<f4`) to a dtype.
    pub fn from_descr(descr: &str) -> Result<Self> {
        match descr {
            "<f4" => Ok(DType::F32),
            "<f8" => Ok(DType::F64),
            "<u4" => Ok(DType::U32),
            other => Err(TensorError::UnsupportedDtype {
                descr: other.to_string(),
            }),
        }
    }

    /// The little-endian `descr` code written by the encoder.
    pub fn descr(&self) -> &'static str {
        match self {
            DType::F32 => "<f4",
            DType::F64 => "<f8",
            DType::U32 => "<u4",
        }
    }

    /// Size in bytes of a single element.
    pub fn element_size(&self) -> usize {
        match self {
            DType::F32 | DType::U32 => 4,
            DType::F64 => 8,
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(self, DType::F32 | DType::F64)
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, DType::U32)
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DType::F32 => write!(f, "f32"),
            DType::F64 => write!(f, "f64"),
            DType::U32 => write!(f, "u32"),
        }
    }
}
