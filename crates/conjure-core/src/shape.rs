//! Shape and row-major stride arithmetic.

use smallvec::SmallVec;
use std::fmt;

/// Per-axis values (strides, coordinates) kept inline for rank ≤ 4.
pub type Dims = SmallVec<[usize; 4]>;

/// Product of all dimensions; the empty product is 1.
pub fn product(dims: &[usize]) -> usize {
    dims.iter().product()
}

/// Element count of `shape`, or `None` when it does not fit in `usize`.
///
/// Zero-sized axes are left out of the overflow check, so `Some` also
/// guarantees every stride derived from `shape` fits.
pub fn checked_numel(shape: &[usize]) -> Option<usize> {
    shape
        .iter()
        .filter(|&&dim| dim != 0)
        .try_fold(1usize, |acc, &dim| acc.checked_mul(dim))?;
    Some(product(shape))
}

/// Row-major strides: `strides[i] == product(&shape[i + 1..])`.
pub fn compute_strides(shape: &[usize]) -> Dims {
    let ndim = shape.len();
    if ndim == 0 {
        return SmallVec::new();
    }
    let mut strides = SmallVec::from_elem(0usize, ndim);
    strides[ndim - 1] = 1;
    for i in (0..ndim - 1).rev() {
        strides[i] = strides[i + 1] * shape[i + 1];
    }
    strides
}

/// Column-major strides: `strides[i] == product(&shape[..i])`.
pub fn compute_fortran_strides(shape: &[usize]) -> Dims {
    let mut acc = 1;
    shape
        .iter()
        .map(|&dim| {
            let stride = acc;
            acc *= dim;
            stride
        })
        .collect()
}

/// Coordinate of the element stored at `flat_index` in a row-major buffer.
///
/// Axis `i` gets `(flat_index / strides[i]) % shape[i]`. Zero-sized axes
/// have no valid offsets and report coordinate 0.
pub fn compute_indices(flat_index: usize, shape: &[usize], strides: &[usize]) -> Dims {
    shape
        .iter()
        .zip(strides)
        .map(|(&dim, &stride)| {
            if dim == 0 || stride == 0 {
                0
            } else {
                (flat_index / stride) % dim
            }
        })
        .collect()
}

/// Flat offset of `coord`; inverse of [`compute_indices`].
pub fn ravel_index(coord: &[usize], strides: &[usize]) -> usize {
    coord.iter().zip(strides).map(|(&c, &s)| c * s).sum()
}

/// Tensor shape with stack-allocated storage for ≤4 dimensions.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Shape {
    dims: Dims,
}

impl Shape {
    pub fn new(dims: &[usize]) -> Self {
        Self {
            dims: SmallVec::from_slice(dims),
        }
    }

    pub fn scalar() -> Self {
        Self {
            dims: SmallVec::new(),
        }
    }

    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    pub fn numel(&self) -> usize {
        product(&self.dims)
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    pub fn dim(&self, axis: usize) -> Option<usize> {
        self.dims.get(axis).copied()
    }

    pub fn is_scalar(&self) -> bool {
        self.dims.is_empty()
    }

    pub fn contiguous_strides(&self) -> Dims {
        compute_strides(&self.dims)
    }

    /// Shape with the leading axis removed.
    pub fn tail(&self) -> Shape {
        Self {
            dims: self.dims.iter().skip(1).copied().collect(),
        }
    }
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Shape({:?})", self.dims.as_slice())
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, d) in self.dims.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{d}")?;
        }
        write!(f, "]")
    }
}
