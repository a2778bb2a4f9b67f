use thiserror::Error;

/// Errors raised while encoding, decoding, applying or composing windows.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum SvndiffError {
    /// The delta stream ended in the middle of a header, window or varint.
    #[error("delta stream ended unexpectedly")]
    Truncated,
    /// A varint encodes a value outside the 64-bit range.
    #[error("varint exceeds the 64-bit range")]
    Overflow,
    /// The stream does not begin with the `b"SVN"` magic bytes.
    #[error("delta stream does not begin with the SVN magic")]
    BadMagic,
    /// The header names a format version this codec does not implement.
    #[error("unsupported delta format version {0}")]
    UnsupportedVersion(u8),
    /// An instruction byte uses the reserved selector.
    #[error("invalid delta instruction byte {0:#04x}")]
    BadInstruction(u8),
    /// A window violates its own structural invariants.
    #[error("invalid delta window: {0}")]
    InvalidWindow(&'static str),
    /// An instruction reads bytes the source buffer does not have.
    #[error("delta instruction reads outside its source data")]
    SourceExhausted,
    /// Two windows do not line up as adjacent links of one chain.
    #[error("windows cannot be composed: {0}")]
    InvalidCompose(&'static str),
}
