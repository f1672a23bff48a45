//! Decoder configuration.

use serde::{Deserialize, Serialize};

use crate::{Result, TensorError};

/// What the decoder does with a payload whose header sets `fortran_order: True`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutPolicy {
    /// Reorder column-major payloads into row-major order.
    #[default]
    Transpose,
    /// Fail with [`TensorError::UnsupportedLayout`].
    Reject,
    /// Ignore the flag and read the payload as row-major.
    AssumeRowMajor,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    pub layout: LayoutPolicy,
    /// Upper bound on the element payload size, in bytes.
    pub max_payload_bytes: Option<usize>,
}

impl DecoderConfig {
    /// Refuses column-major input instead of reordering it.
    pub fn strict() -> Self {
        Self {
            layout: LayoutPolicy::Reject,
            ..Self::default()
        }
    }

    /// Reads every payload as row-major, whatever the header says.
    pub fn legacy() -> Self {
        Self {
            layout: LayoutPolicy::AssumeRowMajor,
            ..Self::default()
        }
    }

    pub fn with_max_payload_bytes(mut self, limit: usize) -> Self {
        self.max_payload_bytes = Some(limit);
        self
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| TensorError::Config(e.to_string()))
    }
}
