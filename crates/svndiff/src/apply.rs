use crate::window::{Instruction, Window};
use crate::SvndiffError;

/// Executes `window`'s instruction stream against `source`, writing at most
/// `out.len()` bytes and returning the number produced.
///
/// `source` holds the bytes of the window's source view (it may be shorter
/// when the underlying text ran out; an instruction that reaches past it is
/// an error). Production stops early once `out` is full, which is how the
/// range reader trims a window to the caller's buffer.
pub fn apply(window: &Window, source: &[u8], out: &mut [u8]) -> Result<usize, SvndiffError> {
    let cap = out.len();
    let mut pos = 0usize;
    let mut literal = 0usize;

    for op in &window.ops {
        if pos == cap {
            break;
        }
        let space = cap - pos;
        match *op {
            Instruction::CopySource { offset, len } => {
                let take = (len as usize).min(space);
                let start = usize::try_from(offset).map_err(|_| SvndiffError::Overflow)?;
                let end = start
                    .checked_add(take)
                    .ok_or(SvndiffError::SourceExhausted)?;
                if end > source.len() {
                    return Err(SvndiffError::SourceExhausted);
                }
                out[pos..pos + take].copy_from_slice(&source[start..end]);
                pos += take;
            }
            Instruction::CopyTarget { offset, len } => {
                let take = (len as usize).min(space);
                let start = usize::try_from(offset).map_err(|_| SvndiffError::Overflow)?;
                if start >= pos {
                    return Err(SvndiffError::InvalidWindow(
                        "target copy starts at or past the produced bytes",
                    ));
                }
                // Byte-at-a-time so an overlapping copy repeats its run.
                for i in 0..take {
                    out[pos + i] = out[start + i];
                }
                pos += take;
            }
            Instruction::CopyNew { len } => {
                let take = (len as usize).min(space);
                let end = literal
                    .checked_add(take)
                    .filter(|&end| end <= window.new_data.len())
                    .ok_or(SvndiffError::InvalidWindow(
                        "literal copy outside the literal data",
                    ))?;
                out[pos..pos + take].copy_from_slice(&window.new_data[literal..end]);
                literal = literal.saturating_add(len as usize);
                pos += take;
            }
        }
    }
    Ok(pos)
}
