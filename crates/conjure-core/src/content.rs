//! Content types attached to function results served to the dashboard.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::TensorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentType {
    #[serde(rename = "application/tensor+octet-stream")]
    Tensor,
    #[serde(rename = "application/time-series+octet-stream")]
    TimeSeries,
    #[serde(rename = "audio/wav")]
    Audio,
}

impl ContentType {
    pub fn as_mime(&self) -> &'static str {
        match self {
            ContentType::Tensor => "application/tensor+octet-stream",
            ContentType::TimeSeries => "application/time-series+octet-stream",
            ContentType::Audio => "audio/wav",
        }
    }

    /// Whether results of this type are `.npy` blobs the decoder reads.
    pub fn is_binary_array(&self) -> bool {
        matches!(self, ContentType::Tensor | ContentType::TimeSeries)
    }
}

impl FromStr for ContentType {
    type Err = TensorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "application/tensor+octet-stream" => Ok(ContentType::Tensor),
            "application/time-series+octet-stream" => Ok(ContentType::TimeSeries),
            "audio/wav" => Ok(ContentType::Audio),
            other => Err(TensorError::UnknownContentType(other.to_string())),
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_mime())
    }
}
