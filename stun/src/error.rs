use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced while encoding or decoding a STUN message.
///
/// Every variant here is non-fatal from the caller's perspective: a
/// datagram that fails to decode is dropped by the caller, not propagated
/// as a connectivity-check failure.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
#[non_exhaustive]
pub enum Error {
    #[error("packet shorter than the 20-byte STUN header")]
    Short,

    #[error("bad magic cookie")]
    BadMagicCookie,

    #[error("message length {declared} does not match remaining buffer of {remaining} bytes")]
    LengthMismatch { declared: usize, remaining: usize },

    #[error("attribute {0:#06x} truncated")]
    AttributeTruncated(u16),

    #[error("attribute {0:#06x} not found")]
    AttributeNotFound(u16),

    #[error("attribute {attr:#06x} has invalid length {len} (expected {expected})")]
    AttributeLength {
        attr: u16,
        len: usize,
        expected: usize,
    },

    #[error("unsupported address family {0:#04x}")]
    UnsupportedFamily(u8),
}
