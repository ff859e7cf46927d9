use std::io;

use thiserror::Error;

/// Failures raised while parsing or marshaling OpenFlow structures.
///
/// TLV list parsing recovers locally from truncated and unknown elements, so those
/// kinds only surface from direct, single-element decodes.
#[derive(Debug, Error)]
pub enum OfpSerializationError {
    #[error("unknown OXM field type: class {class:#06x}, field {field}")]
    UnknownFieldType { class: u16, field: u8 },
    #[error("unknown {kind} type code {code:#06x}")]
    UnknownElementType { kind: &'static str, code: u16 },
    #[error("truncated input: {0}")]
    TruncatedInput(String),
    #[error("malformed {kind} header: {reason}")]
    MalformedHeader { kind: &'static str, reason: String },
    #[error("OXM field {field} does not allow a mask")]
    UnsupportedMask { field: &'static str },
    #[error("OXM field {field} is not allowed in {context}")]
    DisallowedFieldForContext { field: &'static str, context: &'static str },
    #[error("OXM field {field} expects a {expected}-byte value, got {found} bytes")]
    ValueLengthMismatch { field: &'static str, expected: usize, found: usize },
    #[error("{kind} length {length} does not fit a 16-bit length field")]
    LengthOverflow { kind: &'static str, length: usize },
    #[error("decode context is missing the {0}")]
    MissingContext(&'static str),
}

impl From<io::Error> for OfpSerializationError {
    fn from(err: io::Error) -> Self {
        OfpSerializationError::TruncatedInput(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, OfpSerializationError>;
