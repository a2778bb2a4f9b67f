use crate::SvndiffError;

/// One decoded delta window.
///
/// A window describes how to build `tview_len` bytes of target text from a
/// view of `sview_len` bytes starting at `sview_offset` in some source
/// text, an ordered instruction stream, and a run of literal bytes.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Window {
    /// Absolute offset of the source view within the source text.
    pub sview_offset: u64,
    /// Length of the source view.
    pub sview_len: u64,
    /// Number of target bytes this window produces.
    pub tview_len: u64,
    /// The instruction stream, executed in order.
    pub ops: Vec<Instruction>,
    /// Literal bytes consumed by [`Instruction::CopyNew`] in stream order.
    pub new_data: Vec<u8>,
}

/// A single window instruction.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Instruction {
    /// Copy `len` bytes from the source view, starting at `offset` within it.
    CopySource {
        /// Offset relative to the start of the source view.
        offset: u64,
        /// Number of bytes to copy.
        len: u64,
    },
    /// Copy `len` bytes from the target bytes already produced.
    ///
    /// The copy may overlap its own output; bytes are taken front to back,
    /// so an overlapping copy repeats the covered run.
    CopyTarget {
        /// Offset into the produced target prefix; always strictly less
        /// than the number of bytes produced so far.
        offset: u64,
        /// Number of bytes to copy.
        len: u64,
    },
    /// Copy the next `len` literal bytes.
    CopyNew {
        /// Number of literal bytes to copy.
        len: u64,
    },
}

impl Instruction {
    /// Number of target bytes this instruction produces.
    #[must_use]
    pub const fn len(&self) -> u64 {
        match *self {
            Self::CopySource { len, .. } | Self::CopyTarget { len, .. } | Self::CopyNew { len } => {
                len
            }
        }
    }
}

impl Window {
    /// Counts the source-copy instructions in the stream.
    #[must_use]
    pub fn src_ops(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, Instruction::CopySource { .. }))
            .count()
    }

    /// Returns `true` when applying this window needs no source bytes.
    #[must_use]
    pub fn is_self_contained(&self) -> bool {
        self.sview_len == 0 || self.src_ops() == 0
    }

    /// Validates the window's structural invariants.
    ///
    /// Checked: instruction lengths are non-zero and sum to `tview_len`,
    /// source copies stay inside the source view, target copies start
    /// strictly before the bytes they produce, and literal copies consume
    /// `new_data` exactly.
    pub fn check(&self) -> Result<(), SvndiffError> {
        let mut produced: u64 = 0;
        let mut literal: u64 = 0;
        for op in &self.ops {
            if op.len() == 0 {
                return Err(SvndiffError::InvalidWindow("zero-length instruction"));
            }
            match *op {
                Instruction::CopySource { offset, len } => {
                    if offset.checked_add(len).is_none_or(|end| end > self.sview_len) {
                        return Err(SvndiffError::InvalidWindow(
                            "source copy outside the source view",
                        ));
                    }
                }
                Instruction::CopyTarget { offset, .. } => {
                    if offset >= produced {
                        return Err(SvndiffError::InvalidWindow(
                            "target copy starts at or past the produced bytes",
                        ));
                    }
                }
                Instruction::CopyNew { len } => literal += len,
            }
            produced = produced
                .checked_add(op.len())
                .ok_or(SvndiffError::InvalidWindow("target view length overflows"))?;
        }
        if produced != self.tview_len {
            return Err(SvndiffError::InvalidWindow(
                "instructions do not add up to the target view length",
            ));
        }
        if literal != self.new_data.len() as u64 {
            return Err(SvndiffError::InvalidWindow(
                "literal copies do not consume the literal data exactly",
            ));
        }
        Ok(())
    }
}
