//! Main Crate Error

use crate::common::Id;
use crate::transport::TransportError;

#[derive(thiserror::Error, Debug)]
/// atomdht crate error enum.
pub enum Error {
    /// A blob fetched from `key` could not be decoded.
    #[error("Failed to decode content of {key}: {source}")]
    Decode {
        key: Id,
        #[source]
        source: DecodeError,
    },

    /// A write was attempted while the backend is observe-only.
    #[error("Backend is only observing, writes are not allowed")]
    ReadOnlyViolation,

    #[error(transparent)]
    /// Transparent [TransportError], never retried.
    Transport(#[from] TransportError),

    /// No record exists under this key.
    #[error("No entry found for {0}")]
    NotFound(Id),

    /// Indicates that the bytes used to build an [Id] are not 20 bytes.
    #[error("Invalid Id size, expected 20, got {0}")]
    InvalidIdSize(usize),

    /// Indicates that a string is not a hex encoded [Id].
    #[error("Invalid Id: {0}")]
    InvalidId(String),

    #[error(transparent)]
    /// Malformed caller supplied text, e.g. a type name.
    Codec(#[from] DecodeError),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
/// Failures of the text codec.
pub enum DecodeError {
    /// Unparsable or unbalanced value.
    #[error("Malformed {kind}: {text}")]
    MalformedValue { kind: &'static str, text: String },

    /// The value does not start with a known type tag.
    #[error("Unknown Value {0}")]
    UnknownValueType(String),

    /// Unparsable atom.
    #[error("Malformed atom: {0}")]
    MalformedAtom(String),

    /// Not a well formed type name.
    #[error("Invalid atom type: {0:?}")]
    InvalidType(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
