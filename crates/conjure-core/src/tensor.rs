use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::dtype::DType;
use crate::error::TensorError;
use crate::shape::{checked_numel, compute_indices, Dims, Shape};
use crate::storage::Storage;
use crate::Result;

/// Free-form per-tensor annotations (e.g. `"samplerate"` for audio).
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// A row-major multi-dimensional array over an immutable flat buffer.
///
/// Sub-tensors returned by [`Tensor::get_element`] are views: they share
/// the parent's storage at an element offset. Storage is never written
/// after construction, so sharing is unobservable apart from memory use.
#[derive(Clone)]
pub struct Tensor {
    storage: Storage,
    shape: Shape,
    strides: Dims,
    offset: usize,
    metadata: Arc<Metadata>,
}

/// Result of indexing the leading axis of a tensor.
#[derive(Debug, Clone)]
pub enum Element {
    Scalar(f64),
    Tensor(Tensor),
}

impl Element {
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Element::Scalar(v) => Some(*v),
            Element::Tensor(_) => None,
        }
    }

    pub fn into_tensor(self) -> Option<Tensor> {
        match self {
            Element::Tensor(t) => Some(t),
            Element::Scalar(_) => None,
        }
    }
}

impl Tensor {
    // =========================================================================
    // Constructors
    // =========================================================================

    /// Wrap `storage` with `shape`; the element count must match exactly.
    ///
    /// A shape whose element count overflows `usize` reports
    /// `expected: usize::MAX`, since no buffer can satisfy it.
    pub fn new(storage: Storage, shape: &[usize]) -> Result<Self> {
        let expected = checked_numel(shape).unwrap_or(usize::MAX);
        if storage.len() != expected {
            return Err(TensorError::SizeMismatch {
                expected,
                got: storage.len(),
            });
        }
        let s = Shape::new(shape);
        let strides = s.contiguous_strides();
        Ok(Self {
            storage,
            shape: s,
            strides,
            offset: 0,
            metadata: Arc::default(),
        })
    }

    pub fn from_f32(data: Vec<f32>, shape: &[usize]) -> Result<Self> {
        Self::new(Storage::from_f32(data), shape)
    }

    pub fn from_f64(data: Vec<f64>, shape: &[usize]) -> Result<Self> {
        Self::new(Storage::from_f64(data), shape)
    }

    pub fn from_u32(data: Vec<u32>, shape: &[usize]) -> Result<Self> {
        Self::new(Storage::from_u32(data), shape)
    }

    /// Attach metadata. Meant to be called once, right after construction.
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Arc::new(metadata);
        self
    }

    // =========================================================================
    // Properties
    // =========================================================================

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    pub fn rank(&self) -> usize {
        self.shape.ndim()
    }

    pub fn total_size(&self) -> usize {
        self.shape.numel()
    }

    pub fn dtype(&self) -> DType {
        self.storage.dtype()
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn meta(&self, key: &str) -> Option<&serde_json::Value> {
        self.metadata.get(key)
    }

    pub fn storage_ref(&self) -> &Storage {
        &self.storage
    }

    /// Whether this tensor borrows a window of a larger buffer.
    pub fn is_view(&self) -> bool {
        self.offset != 0 || self.storage.len() != self.total_size()
    }

    // =========================================================================
    // Data access
    // =========================================================================

    /// All elements in flat (row-major) order, widened to `f64`.
    pub fn values(&self) -> Vec<f64> {
        self.storage.values(self.offset..self.offset + self.total_size())
    }

    pub fn get(&self, flat_index: usize) -> Option<f64> {
        if flat_index >= self.total_size() {
            return None;
        }
        self.storage.get(self.offset + flat_index)
    }

    /// Coordinate of the element at `flat_index`.
    pub fn indices(&self, flat_index: usize) -> Dims {
        compute_indices(flat_index, self.shape.dims(), &self.strides)
    }

    /// Largest element, seeded with `0.0`.
    ///
    /// A tensor whose values are all negative therefore reports `0.0`.
    /// Use [`Tensor::value_range`] for the true extremes.
    pub fn max_value(&self) -> f64 {
        let mut max = 0.0;
        for v in self.values() {
            if v > max {
                max = v;
            }
        }
        max
    }

    /// Smallest element, seeded with `+inf` (so an empty tensor reports `+inf`).
    pub fn min_value(&self) -> f64 {
        let mut min = f64::INFINITY;
        for v in self.values() {
            if v < min {
                min = v;
            }
        }
        min
    }

    /// `(min, max)` seeded from the first element; `None` when empty.
    pub fn value_range(&self) -> Option<(f64, f64)> {
        let values = self.values();
        let (&first, rest) = values.split_first()?;
        Some(
            rest.iter()
                .fold((first, first), |(lo, hi), &v| (lo.min(v), hi.max(v))),
        )
    }

    /// Index the leading axis.
    ///
    /// Rank-1 tensors yield a scalar; higher ranks yield a view with the
    /// leading axis dropped.
    pub fn get_element(&self, index: usize) -> Result<Element> {
        let size = self.shape.dim(0).ok_or(TensorError::InvalidRank {
            expected: 1,
            got: 0,
        })?;
        if index >= size {
            return Err(TensorError::IndexOutOfBounds {
                index,
                axis: 0,
                size,
            });
        }
        let start = self.offset + index * self.strides[0];
        if self.rank() == 1 {
            let value = self.storage.get(start).ok_or(TensorError::IndexOutOfBounds {
                index,
                axis: 0,
                size,
            })?;
            return Ok(Element::Scalar(value));
        }
        let shape = self.shape.tail();
        let strides = shape.contiguous_strides();
        Ok(Element::Tensor(Tensor {
            storage: self.storage.clone(),
            shape,
            strides,
            offset: start,
            metadata: Arc::clone(&self.metadata),
        }))
    }

    /// Row `channel` of a rank-2 tensor as plain values.
    pub fn get_channel_data(&self, channel: usize) -> Result<Vec<f64>> {
        let (rows, cols) = self.dims2()?;
        if channel >= rows {
            return Err(TensorError::IndexOutOfBounds {
                index: channel,
                axis: 0,
                size: rows,
            });
        }
        let start = self.offset + channel * self.strides[0];
        (0..cols)
            .map(|j| self.storage.get(start + j * self.strides[1]))
            .collect::<Option<Vec<f64>>>()
            .ok_or(TensorError::IndexOutOfBounds {
                index: channel,
                axis: 0,
                size: rows,
            })
    }

    /// Grayscale RGBA bytes for a rank-2 tensor.
    ///
    /// Each value maps to `floor(v * 255)`, saturated to `0..=255`, and is
    /// written to all four channels of its pixel.
    pub fn to_rgba(&self) -> Result<Vec<u8>> {
        self.dims2()?;
        let mut rgba = vec![0u8; self.total_size() * 4];
        for (flat, v) in self.values().into_iter().enumerate() {
            let coord = self.indices(flat);
            let pixel = coord[0] * self.strides[0] + coord[1] * self.strides[1];
            let byte = (v * 255.0).floor() as u8;
            rgba[pixel * 4..pixel * 4 + 4].fill(byte);
        }
        Ok(rgba)
    }

    /// Call `visitor` once per element in flat order and collect the results.
    pub fn visit<R, F>(&self, mut visitor: F) -> Vec<R>
    where
        F: FnMut(f64, &[usize]) -> R,
    {
        self.values()
            .into_iter()
            .enumerate()
            .map(|(flat, v)| visitor(v, &self.indices(flat)[..]))
            .collect()
    }

    /// Like [`Tensor::visit`], stopping at the first error.
    pub fn try_visit<R, E, F>(&self, mut visitor: F) -> std::result::Result<Vec<R>, E>
    where
        F: FnMut(f64, &[usize]) -> std::result::Result<R, E>,
    {
        self.values()
            .into_iter()
            .enumerate()
            .map(|(flat, v)| visitor(v, &self.indices(flat)[..]))
            .collect()
    }

    /// A tensor owning exactly its own elements, detached from any parent.
    pub fn compact(&self) -> Tensor {
        if !self.is_view() {
            return self.clone();
        }
        Tensor {
            storage: self
                .storage
                .slice(self.offset..self.offset + self.total_size()),
            shape: self.shape.clone(),
            strides: self.strides.clone(),
            offset: 0,
            metadata: Arc::clone(&self.metadata),
        }
    }

    fn dims2(&self) -> Result<(usize, usize)> {
        match self.shape.dims() {
            &[rows, cols] => Ok((rows, cols)),
            dims => Err(TensorError::InvalidRank {
                expected: 2,
                got: dims.len(),
            }),
        }
    }
}

impl fmt::Debug for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Tensor(shape={}, dtype={}, view={}, metadata={:?})",
            self.shape,
            self.dtype(),
            self.is_view(),
            self.metadata.keys().collect::<Vec<_>>(),
        )
    }
}

impl fmt::Display for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = self.total_size();
        if n <= 20 {
            write!(f, "tensor({:?}, shape={})", self.values(), self.shape)
        } else {
            let v = |i| self.get(i).unwrap_or(f64::NAN);
            write!(
                f,
                "tensor([{:.4}, {:.4}, ..., {:.4}], shape={})",
                v(0),
                v(1),
                v(n - 1),
                self.shape
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arange(n: usize, shape: &[usize]) -> Tensor {
        Tensor::from_f32((0..n).map(|i| i as f32).collect(), shape).unwrap()
    }

    #[test]
    fn test_construction_checks_size() {
        let err = Tensor::from_f32(vec![1.0, 2.0, 3.0], &[2, 2]).unwrap_err();
        assert!(matches!(err, TensorError::SizeMismatch { expected: 4, got: 3 }));

        let t = Tensor::from_u32(vec![1, 2, 3, 4, 5, 6], &[2, 3]).unwrap();
        assert_eq!(t.rank(), 2);
        assert_eq!(t.total_size(), 6);
        assert_eq!(t.strides(), &[3, 1]);
        assert_eq!(t.dtype(), DType::U32);
    }

    #[test]
    fn test_overflowing_shape_is_size_mismatch() {
        assert!(matches!(
            Tensor::from_f32(vec![], &[usize::MAX, 2]),
            Err(TensorError::SizeMismatch { expected: usize::MAX, got: 0 })
        ));
        let half = 1usize << (usize::BITS / 2);
        assert!(matches!(
            Tensor::from_u32(vec![], &[0, half, half]),
            Err(TensorError::SizeMismatch { .. })
        ));
        // Zero-sized with a huge leading axis is a valid empty tensor.
        let t = Tensor::from_f64(vec![], &[usize::MAX, 0]).unwrap();
        assert_eq!(t.total_size(), 0);
        assert!(t.values().is_empty());
    }

    #[test]
    fn test_rank_zero_holds_one_element() {
        let t = Tensor::from_f64(vec![2.5], &[]).unwrap();
        assert_eq!(t.rank(), 0);
        assert_eq!(t.total_size(), 1);
        assert!(t.indices(0).is_empty());
        assert!(matches!(
            t.get_element(0),
            Err(TensorError::InvalidRank { expected: 1, got: 0 })
        ));
        assert!(Tensor::from_f64(vec![], &[]).is_err());
    }

    #[test]
    fn test_get_element_rank1_is_scalar() {
        let t = Tensor::from_f64(vec![4.0, 5.0, 6.0], &[3]).unwrap();
        assert_eq!(t.get_element(2).unwrap().as_scalar(), Some(6.0));
        assert!(matches!(
            t.get_element(3),
            Err(TensorError::IndexOutOfBounds { index: 3, axis: 0, size: 3 })
        ));
    }

    #[test]
    fn test_get_element_is_shared_view() {
        let t = arange(24, &[2, 3, 4]);
        let sub = t.get_element(1).unwrap().into_tensor().unwrap();
        assert_eq!(sub.shape().dims(), &[3, 4]);
        assert_eq!(sub.strides(), &[4, 1]);
        assert!(sub.is_view());
        assert!(sub.storage_ref().shares_buffer_with(t.storage_ref()));
        assert_eq!(sub.values(), (12..24).map(|i| i as f64).collect::<Vec<_>>());

        let row = sub.get_element(2).unwrap().into_tensor().unwrap();
        assert_eq!(row.values(), vec![20.0, 21.0, 22.0, 23.0]);
        assert_eq!(row.get_element(1).unwrap().as_scalar(), Some(21.0));
    }

    #[test]
    fn test_compact_detaches_view() {
        let t = arange(6, &[2, 3]);
        let sub = t.get_element(1).unwrap().into_tensor().unwrap();
        let owned = sub.compact();
        assert!(!owned.is_view());
        assert!(!owned.storage_ref().shares_buffer_with(t.storage_ref()));
        assert_eq!(owned.values(), vec![3.0, 4.0, 5.0]);
        assert!(!t.is_view());
    }

    #[test]
    fn test_get_channel_data() {
        let t = arange(8, &[2, 4]);
        assert_eq!(t.get_channel_data(1).unwrap(), vec![4.0, 5.0, 6.0, 7.0]);
        assert!(matches!(
            t.get_channel_data(2),
            Err(TensorError::IndexOutOfBounds { index: 2, .. })
        ));
        assert!(matches!(
            arange(8, &[8]).get_channel_data(0),
            Err(TensorError::InvalidRank { expected: 2, got: 1 })
        ));
    }

    #[test]
    fn test_min_max_sentinel_seeds() {
        let t = Tensor::from_f64(vec![-5.0, -1.0, -9.0], &[3]).unwrap();
        assert_eq!(t.max_value(), 0.0);
        assert_eq!(t.min_value(), -9.0);
        assert_eq!(t.value_range(), Some((-9.0, -1.0)));

        let empty = Tensor::from_f32(vec![], &[0]).unwrap();
        assert_eq!(empty.min_value(), f64::INFINITY);
        assert_eq!(empty.max_value(), 0.0);
        assert_eq!(empty.value_range(), None);
    }

    #[test]
    fn test_to_rgba() {
        let t = Tensor::from_f32(vec![0.0, 0.5, 1.0, 2.0], &[2, 2]).unwrap();
        let rgba = t.to_rgba().unwrap();
        assert_eq!(rgba.len(), 16);
        assert_eq!(&rgba[0..4], &[0, 0, 0, 0]);
        assert_eq!(&rgba[4..8], &[127, 127, 127, 127]);
        assert_eq!(&rgba[8..12], &[255, 255, 255, 255]);
        assert_eq!(&rgba[12..16], &[255, 255, 255, 255]);
        assert!(arange(8, &[2, 2, 2]).to_rgba().is_err());
    }

    #[test]
    fn test_visit_order_and_coords() {
        let t = Tensor::from_f64(vec![10.0, 20.0, 30.0, 40.0], &[2, 2]).unwrap();
        let mut coords = Vec::new();
        let out = t.visit(|v, c| {
            coords.push(c.to_vec());
            v
        });
        assert_eq!(out, vec![10.0, 20.0, 30.0, 40.0]);
        assert_eq!(coords, vec![vec![0, 0], vec![0, 1], vec![1, 0], vec![1, 1]]);
    }

    #[test]
    fn test_try_visit_stops_on_error() {
        let t = arange(5, &[5]);
        let mut calls = 0;
        let res: std::result::Result<Vec<f64>, String> = t.try_visit(|v, _| {
            calls += 1;
            if v >= 2.0 {
                Err(format!("stop at {v}"))
            } else {
                Ok(v)
            }
        });
        assert_eq!(res.unwrap_err(), "stop at 2");
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_metadata_is_inherited_by_views() {
        let mut meta = Metadata::new();
        meta.insert("samplerate".into(), serde_json::json!(22050));
        let t = arange(4, &[2, 2]).with_metadata(meta);
        let sub = t.get_element(0).unwrap().into_tensor().unwrap();
        assert_eq!(sub.meta("samplerate"), Some(&serde_json::json!(22050)));
        assert_eq!(sub.metadata(), t.metadata());
    }

    #[test]
    fn test_display() {
        let t = arange(3, &[3]);
        assert_eq!(format!("{t}"), "tensor([0.0, 1.0, 2.0], shape=[3])");
        assert!(format!("{:?}", t).starts_with("Tensor(shape=[3], dtype=f32"));
    }
}
