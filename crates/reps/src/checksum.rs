use std::fmt;

/// A 16-byte MD5 content checksum as stored in representation records.
///
/// The all-zero value is the "not yet computed" sentinel carried by a
/// freshly created mutable representation; it accepts any computed digest
/// until the write stream seals the real one.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Checksum([u8; 16]);

impl Checksum {
    /// The zero-filled sentinel meaning "not yet computed".
    pub const UNSET: Self = Self([0; 16]);

    /// Wraps raw digest bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// The raw digest bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Returns `true` for the sentinel value.
    #[must_use]
    pub fn is_unset(&self) -> bool {
        *self == Self::UNSET
    }

    /// Whether a freshly computed digest is acceptable: the sentinel
    /// accepts anything, a sealed checksum only its own bytes.
    #[must_use]
    pub fn accepts(&self, computed: [u8; 16]) -> bool {
        self.is_unset() || self.0 == computed
    }
}

impl From<[u8; 16]> for Checksum {
    fn from(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}
