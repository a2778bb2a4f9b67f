use thiserror::Error;

/// Errors raised while sliding the rolling checksum window.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
pub enum RollingError {
    /// The checksum window is empty, so there is no byte to roll out.
    #[error("rolling checksum requires a non-empty window")]
    EmptyWindow,
}

/// Adler-32 style rolling checksum over a sliding byte window.
///
/// `s1` accumulates the byte sum and `s2` accumulates the prefix sums; both
/// are truncated to 16 bits after every update. The delta generator hashes
/// each source block once, then slides a window of the same length across
/// the target one byte at a time with [`roll`](Self::roll).
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RollingChecksum {
    s1: u32,
    s2: u32,
    len: usize,
}

impl RollingChecksum {
    /// Creates a new rolling checksum with zeroed state.
    #[must_use]
    pub const fn new() -> Self {
        Self { s1: 0, s2: 0, len: 0 }
    }

    /// Computes the digest of `bytes` in one shot.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> u32 {
        let mut checksum = Self::new();
        checksum.update(bytes);
        checksum.digest()
    }

    /// Resets the checksum back to its initial state.
    pub fn reset(&mut self) {
        self.s1 = 0;
        self.s2 = 0;
        self.len = 0;
    }

    /// Returns the number of bytes currently in the window.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if no bytes have been observed yet.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Extends the window with an additional slice of bytes.
    #[inline]
    pub fn update(&mut self, chunk: &[u8]) {
        let mut s1 = self.s1;
        let mut s2 = self.s2;
        for &byte in chunk {
            s1 = s1.wrapping_add(u32::from(byte));
            s2 = s2.wrapping_add(s1);
        }
        self.s1 = s1 & 0xffff;
        self.s2 = s2 & 0xffff;
        self.len += chunk.len();
    }

    /// Slides the window one byte: removes `outgoing` from the front and
    /// appends `incoming` at the back. The window length is unchanged.
    #[inline]
    pub fn roll(&mut self, outgoing: u8, incoming: u8) -> Result<(), RollingError> {
        if self.len == 0 {
            return Err(RollingError::EmptyWindow);
        }
        let len = self.len as u32;
        self.s1 = self
            .s1
            .wrapping_add(u32::from(incoming))
            .wrapping_sub(u32::from(outgoing))
            & 0xffff;
        self.s2 = self
            .s2
            .wrapping_sub(len.wrapping_mul(u32::from(outgoing)))
            .wrapping_add(self.s1)
            & 0xffff;
        Ok(())
    }

    /// Packs the current state into a 32-bit digest (`s2 << 16 | s1`).
    #[must_use]
    pub const fn digest(&self) -> u32 {
        (self.s2 << 16) | self.s1
    }
}
