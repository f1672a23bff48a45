//! Reader and writer for `.npy` array blobs.
//!
//! Layout: 8-byte preamble (`\x93NUMPY` + version), a little-endian `u16`
//! header length, an ASCII header holding a Python dict literal, then the
//! packed element payload.
//!
//! Only the `descr`, `shape` and `fortran_order` fields of the header are
//! read, by locating their keys in the text rather than parsing the dict.

use tracing::{debug, trace, warn};

use crate::config::{DecoderConfig, LayoutPolicy};
use crate::shape::{
    checked_numel, compute_fortran_strides, compute_indices, compute_strides, product, ravel_index,
};
use crate::{DType, Result, Storage, Tensor, TensorError};

pub const MAGIC: &[u8; 6] = b"\x93NUMPY";

const PREAMBLE_LEN: usize = 8;
const HEADER_LEN_BYTES: usize = 2;
const HEADER_ALIGNMENT: usize = 64;

/// The header fields the decoder uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub descr: String,
    pub shape: Vec<usize>,
    pub fortran_order: bool,
}

/// Decode with the default [`DecoderConfig`].
pub fn decode(raw: &[u8]) -> Result<Tensor> {
    decode_with(raw, &DecoderConfig::default())
}

#[tracing::instrument(level = "debug", skip_all, fields(bytes = raw.len()))]
pub fn decode_with(raw: &[u8], config: &DecoderConfig) -> Result<Tensor> {
    let header_start = PREAMBLE_LEN + HEADER_LEN_BYTES;
    if raw.len() < header_start {
        return Err(TensorError::Truncated {
            needed: header_start,
            available: raw.len(),
        });
    }
    let header_len = u16::from_le_bytes([raw[PREAMBLE_LEN], raw[PREAMBLE_LEN + 1]]) as usize;
    let payload_start = header_start + header_len;
    if raw.len() < payload_start {
        return Err(TensorError::Truncated {
            needed: payload_start,
            available: raw.len(),
        });
    }

    let header_bytes = &raw[header_start..payload_start];
    if !header_bytes.is_ascii() {
        return Err(TensorError::MalformedHeader {
            field: "header",
            reason: "header text is not ASCII".into(),
        });
    }
    let text = std::str::from_utf8(header_bytes).map_err(|e| TensorError::MalformedHeader {
        field: "header",
        reason: e.to_string(),
    })?;
    trace!(header = text.trim_end(), "npy header");

    let header = parse_header(text)?;
    let dtype = DType::from_descr(&header.descr)?;
    debug!(
        descr = %header.descr,
        shape = ?header.shape,
        fortran_order = header.fortran_order,
        "parsed npy header"
    );

    let payload = &raw[payload_start..];
    if let Some(limit) = config.max_payload_bytes {
        if payload.len() > limit {
            return Err(TensorError::PayloadTooLarge {
                size: payload.len(),
                limit,
            });
        }
    }

    let expected = checked_numel(&header.shape).ok_or_else(|| TensorError::MalformedHeader {
        field: "shape",
        reason: format!("element count of {:?} overflows usize", header.shape),
    })?;
    let size = dtype.element_size();
    if payload.len() % size != 0 || payload.len() / size != expected {
        return Err(TensorError::ShapeMismatch {
            shape: header.shape,
            expected,
            got: payload.len() / size,
        });
    }

    let mut storage = Storage::from_le_bytes(dtype, payload)?;
    if header.fortran_order {
        storage = match config.layout {
            LayoutPolicy::Reject => return Err(TensorError::UnsupportedLayout),
            LayoutPolicy::Transpose => {
                warn!(shape = ?header.shape, "reordering column-major payload to row-major");
                storage.gather(&fortran_to_row_major(&header.shape))
            }
            LayoutPolicy::AssumeRowMajor => {
                warn!(shape = ?header.shape, "ignoring fortran_order flag");
                storage
            }
        };
    }

    Tensor::new(storage, &header.shape)
}

/// Extract `descr`, `shape` and `fortran_order` from header text.
///
/// A missing `fortran_order` field reads as `false`.
pub fn parse_header(text: &str) -> Result<Header> {
    let descr = field_value(text, "descr")
        .and_then(quoted)
        .ok_or_else(|| TensorError::MalformedHeader {
            field: "descr",
            reason: "missing or unquoted".into(),
        })?
        .to_string();

    let shape_text = field_value(text, "shape")
        .and_then(parenthesized)
        .ok_or_else(|| TensorError::MalformedHeader {
            field: "shape",
            reason: "missing or not a tuple".into(),
        })?;
    let shape = parse_shape(shape_text)?;

    let fortran_order = match field_value(text, "fortran_order") {
        None => false,
        Some(v) if v.starts_with("True") => true,
        Some(v) if v.starts_with("False") => false,
        Some(v) => {
            return Err(TensorError::MalformedHeader {
                field: "fortran_order",
                reason: format!("expected True or False, got {:?}", truncate(v)),
            })
        }
    };

    Ok(Header {
        descr,
        shape,
        fortran_order,
    })
}

/// Parse the inside of a shape tuple: `"2, 3"`, `"6,"` or `""`.
pub fn parse_shape(inner: &str) -> Result<Vec<usize>> {
    let inner = inner.trim();
    if inner.is_empty() {
        return Ok(Vec::new());
    }
    // A trailing comma needs a dimension before it: "6," but never ",".
    let inner = match inner.strip_suffix(',') {
        Some(rest) if rest.trim().is_empty() => {
            return Err(TensorError::MalformedHeader {
                field: "shape",
                reason: "trailing comma without a dimension".into(),
            })
        }
        Some(rest) => rest,
        None => inner,
    };
    inner
        .split(',')
        .map(|dim| {
            let dim = dim.trim();
            dim.parse::<usize>().map_err(|_| TensorError::MalformedHeader {
                field: "shape",
                reason: format!("invalid dimension {dim:?}"),
            })
        })
        .collect()
}

/// Serialize `tensor` as a version 1.0 `.npy` blob.
pub fn encode(tensor: &Tensor) -> Result<Vec<u8>> {
    let dtype = tensor.dtype();
    let mut header = format!(
        "{{'descr': '{}', 'fortran_order': False, 'shape': {}, }}",
        dtype.descr(),
        shape_tuple(tensor.shape().dims())
    );
    // Payload starts on an aligned boundary; the header ends with '\n'.
    let unpadded = PREAMBLE_LEN + HEADER_LEN_BYTES + header.len() + 1;
    let padding = (HEADER_ALIGNMENT - unpadded % HEADER_ALIGNMENT) % HEADER_ALIGNMENT;
    header.extend(std::iter::repeat(' ').take(padding));
    header.push('\n');

    let header_len = u16::try_from(header.len()).map_err(|_| TensorError::MalformedHeader {
        field: "header",
        reason: format!("{} bytes does not fit a u16 length", header.len()),
    })?;

    let owned = tensor.compact();
    let storage = owned.storage_ref();
    let mut out = Vec::with_capacity(PREAMBLE_LEN + HEADER_LEN_BYTES + header.len() + storage.nbytes());
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&[1, 0]);
    out.extend_from_slice(&header_len.to_le_bytes());
    out.extend_from_slice(header.as_bytes());
    storage.write_le_bytes(0..storage.len(), &mut out);

    debug!(dtype = %dtype, shape = %tensor.shape(), bytes = out.len(), "encoded npy");
    Ok(out)
}

/// Value text following `'key':` (or `"key":`), leading whitespace removed.
fn field_value<'a>(text: &'a str, key: &str) -> Option<&'a str> {
    ['\'', '"'].iter().find_map(|q| {
        let pattern = format!("{q}{key}{q}");
        let start = text.find(&pattern)? + pattern.len();
        let rest = text[start..].trim_start().strip_prefix(':')?;
        Some(rest.trim_start())
    })
}

fn quoted(value: &str) -> Option<&str> {
    let q = value.chars().next().filter(|c| *c == '\'' || *c == '"')?;
    let rest = &value[1..];
    let end = rest.find(q)?;
    Some(&rest[..end])
}

fn parenthesized(value: &str) -> Option<&str> {
    let rest = value.strip_prefix('(')?;
    let end = rest.find(')')?;
    Some(&rest[..end])
}

fn truncate(value: &str) -> &str {
    let end = value
        .char_indices()
        .nth(16)
        .map(|(i, _)| i)
        .unwrap_or(value.len());
    &value[..end]
}

fn shape_tuple(dims: &[usize]) -> String {
    match dims {
        [] => "()".to_string(),
        [d] => format!("({d},)"),
        _ => {
            let parts: Vec<String> = dims.iter().map(|d| d.to_string()).collect();
            format!("({})", parts.join(", "))
        }
    }
}

/// For each row-major offset, the column-major offset holding that element.
fn fortran_to_row_major(shape: &[usize]) -> Vec<usize> {
    let c_strides = compute_strides(shape);
    let f_strides = compute_fortran_strides(shape);
    (0..product(shape))
        .map(|flat| ravel_index(&compute_indices(flat, shape, &c_strides), &f_strides))
        .collect()
}
