use std::ops::Range;
use std::sync::Arc;

use crate::{DType, Result, TensorError};

#[derive(Debug, Clone)]
enum Buffer {
    F32(Arc<[f32]>),
    F64(Arc<[f64]>),
    U32(Arc<[u32]>),
}

/// Immutable, reference-counted flat element buffer.
///
/// Clones share the same allocation; nothing mutates a buffer once built,
/// so views over it never observe writes.
#[derive(Debug, Clone)]
pub struct Storage {
    buffer: Buffer,
}

impl Storage {
    pub fn from_f32(data: Vec<f32>) -> Self {
        Self {
            buffer: Buffer::F32(data.into()),
        }
    }

    pub fn from_f64(data: Vec<f64>) -> Self {
        Self {
            buffer: Buffer::F64(data.into()),
        }
    }

    pub fn from_u32(data: Vec<u32>) -> Self {
        Self {
            buffer: Buffer::U32(data.into()),
        }
    }

    /// Unpack packed little-endian elements of `dtype`.
    pub fn from_le_bytes(dtype: DType, bytes: &[u8]) -> Result<Self> {
        let size = dtype.element_size();
        let rem = bytes.len() % size;
        if rem != 0 {
            return Err(TensorError::Truncated {
                needed: bytes.len() + size - rem,
                available: bytes.len(),
            });
        }
        let storage = match dtype {
            DType::F32 => Self::from_f32(
                bytes
                    .chunks_exact(4)
                    .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                    .collect(),
            ),
            DType::F64 => Self::from_f64(
                bytes
                    .chunks_exact(8)
                    .map(|b| f64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
                    .collect(),
            ),
            DType::U32 => Self::from_u32(
                bytes
                    .chunks_exact(4)
                    .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                    .collect(),
            ),
        };
        Ok(storage)
    }

    pub fn dtype(&self) -> DType {
        match self.buffer {
            Buffer::F32(_) => DType::F32,
            Buffer::F64(_) => DType::F64,
            Buffer::U32(_) => DType::U32,
        }
    }

    pub fn len(&self) -> usize {
        match &self.buffer {
            Buffer::F32(d) => d.len(),
            Buffer::F64(d) => d.len(),
            Buffer::U32(d) => d.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn nbytes(&self) -> usize {
        self.len() * self.dtype().element_size()
    }

    /// Element at `index`, widened to `f64` (lossless for every dtype).
    pub fn get(&self, index: usize) -> Option<f64> {
        match &self.buffer {
            Buffer::F32(d) => d.get(index).map(|&v| v as f64),
            Buffer::F64(d) => d.get(index).copied(),
            Buffer::U32(d) => d.get(index).map(|&v| v as f64),
        }
    }

    /// Elements in `range`, widened to `f64`.
    pub fn values(&self, range: Range<usize>) -> Vec<f64> {
        match &self.buffer {
            Buffer::F32(d) => d[range].iter().map(|&v| v as f64).collect(),
            Buffer::F64(d) => d[range].to_vec(),
            Buffer::U32(d) => d[range].iter().map(|&v| v as f64).collect(),
        }
    }

    /// Independent copy of the elements in `range`, keeping the dtype.
    pub fn slice(&self, range: Range<usize>) -> Storage {
        match &self.buffer {
            Buffer::F32(d) => Self::from_f32(d[range].to_vec()),
            Buffer::F64(d) => Self::from_f64(d[range].to_vec()),
            Buffer::U32(d) => Self::from_u32(d[range].to_vec()),
        }
    }

    /// New buffer whose `i`-th element is `self[order[i]]`.
    ///
    /// Panics if any entry of `order` is out of range.
    pub fn gather(&self, order: &[usize]) -> Storage {
        match &self.buffer {
            Buffer::F32(d) => Self::from_f32(order.iter().map(|&i| d[i]).collect()),
            Buffer::F64(d) => Self::from_f64(order.iter().map(|&i| d[i]).collect()),
            Buffer::U32(d) => Self::from_u32(order.iter().map(|&i| d[i]).collect()),
        }
    }

    /// Append the elements in `range` to `out` as little-endian bytes.
    pub fn write_le_bytes(&self, range: Range<usize>, out: &mut Vec<u8>) {
        out.reserve(range.len() * self.dtype().element_size());
        match &self.buffer {
            Buffer::F32(d) => d[range].iter().for_each(|v| out.extend_from_slice(&v.to_le_bytes())),
            Buffer::F64(d) => d[range].iter().for_each(|v| out.extend_from_slice(&v.to_le_bytes())),
            Buffer::U32(d) => d[range].iter().for_each(|v| out.extend_from_slice(&v.to_le_bytes())),
        }
    }

    /// Raw native-endian bytes, e.g. for texture upload.
    pub fn as_bytes(&self) -> &[u8] {
        match &self.buffer {
            Buffer::F32(d) => bytemuck::cast_slice(&d[..]),
            Buffer::F64(d) => bytemuck::cast_slice(&d[..]),
            Buffer::U32(d) => bytemuck::cast_slice(&d[..]),
        }
    }

    pub fn as_f32_slice(&self) -> Option<&[f32]> {
        match &self.buffer {
            Buffer::F32(d) => Some(&d[..]),
            _ => None,
        }
    }

    pub fn as_f64_slice(&self) -> Option<&[f64]> {
        match &self.buffer {
            Buffer::F64(d) => Some(&d[..]),
            _ => None,
        }
    }

    pub fn as_u32_slice(&self) -> Option<&[u32]> {
        match &self.buffer {
            Buffer::U32(d) => Some(&d[..]),
            _ => None,
        }
    }

    /// Whether both handles point at the same allocation.
    pub fn shares_buffer_with(&self, other: &Storage) -> bool {
        match (&self.buffer, &other.buffer) {
            (Buffer::F32(a), Buffer::F32(b)) => Arc::ptr_eq(a, b),
            (Buffer::F64(a), Buffer::F64(b)) => Arc::ptr_eq(a, b),
            (Buffer::U32(a), Buffer::U32(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}
