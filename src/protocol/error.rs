//! Framing error definitions.

use thiserror::Error;

/// Malformed or truncated wire data.
///
/// Always fatal to the connection that produced it: the format has no
/// resynchronization marker.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FramingError {
    /// Fewer bytes than the fixed header.
    #[error("frame of {0} bytes is shorter than the 12 byte header")]
    ShortHeader(usize),

    /// Class tag is not four printable ASCII characters.
    #[error("invalid class tag {0:?}")]
    InvalidClass([u8; 4]),

    /// Declared frame length disagrees with the bytes supplied.
    #[error("declared length {declared} does not match {actual} bytes supplied")]
    LengthMismatch { declared: u32, actual: usize },

    /// Declared frame length is outside the accepted window.
    #[error("declared length {declared} outside accepted range 12..={max}")]
    LengthOutOfBounds { declared: u32, max: u32 },

    /// Stream ended in the middle of a frame.
    #[error("stream ended after {received} of {expected} frame bytes")]
    Truncated { expected: usize, received: usize },

    /// Field section does not end with the NUL terminator.
    #[error("field section is not NUL terminated")]
    Unterminated,

    /// Bytes follow the NUL terminator.
    #[error("{0} trailing bytes after field terminator")]
    TrailingBytes(usize),

    /// Entry without a `=` separator or with an empty key.
    #[error("malformed field entry {0:?}")]
    MalformedEntry(String),

    /// Field section is not valid UTF-8.
    #[error("field section is not valid UTF-8")]
    InvalidText,

    /// Key cannot be represented on the wire.
    #[error("field key {0:?} cannot be encoded")]
    InvalidKey(String),

    /// Value cannot be represented on the wire.
    #[error("value of field {0:?} cannot be encoded")]
    InvalidValue(String),

    /// Encoded frame would not fit the 32-bit length word.
    #[error("encoded frame of {0} bytes exceeds the length field")]
    TooLarge(usize),
}
