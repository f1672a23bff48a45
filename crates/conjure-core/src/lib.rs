//! # conjure-core
//!
//! Strided tensor engine behind the conjure dashboard.
//!
//! Function results arrive as `.npy` blobs; [`npy::decode`] turns them into
//! [`Tensor`]s that views index, slice and traverse.
//!
//! ```rust
//! use conjure_core::{npy, Tensor};
//!
//! let t = Tensor::from_f32(vec![0.0, 0.5, 1.0, 1.5], &[2, 2]).unwrap();
//! let decoded = npy::decode(&npy::encode(&t).unwrap()).unwrap();
//! assert_eq!(decoded.get_channel_data(1).unwrap(), vec![1.0, 1.5]);
//! ```

pub mod config;
pub mod content;
pub mod dtype;
pub mod error;
pub mod npy;
pub mod shape;
pub mod storage;
pub mod tensor;

#[cfg(feature = "tracing-subscriber")]
pub mod logging;

pub use config::{DecoderConfig, LayoutPolicy};
pub use content::ContentType;
pub use dtype::DType;
pub use error::TensorError;
pub use shape::{compute_indices, compute_strides, product, ravel_index, Shape};
pub use storage::Storage;
pub use tensor::{Element, Metadata, Tensor};

pub type Result<T> = std::result::Result<T, TensorError>;
