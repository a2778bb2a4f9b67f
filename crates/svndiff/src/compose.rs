use crate::window::{Instruction, Window};
use crate::SvndiffError;

/// Outcome of composing two windows from adjacent links of a delta chain.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Composed {
    /// A single window equivalent to applying `first` and then `second`,
    /// standing directly on `first`'s source view.
    Window(Window),
    /// `second` never copies from its source, so it already stands on its
    /// own. The caller keeps `second` and overwrites its source view with
    /// the returned values, which are `first`'s.
    SecondStands {
        /// Replacement source view offset.
        sview_offset: u64,
        /// Replacement source view length.
        sview_len: u64,
    },
}

/// One run of `first`'s target view, flattened to its ultimate origin.
#[derive(Clone, Copy)]
enum Segment {
    /// `len` bytes at `offset` within `first`'s source view.
    Source { offset: u64, len: u64 },
    /// `len` bytes at `offset` within `first`'s literal data.
    New { offset: u64, len: u64 },
}

impl Segment {
    const fn len(self) -> u64 {
        match self {
            Self::Source { len, .. } | Self::New { len, .. } => len,
        }
    }

    /// Returns the sub-run starting `from` bytes in, `take` bytes long.
    const fn slice(self, from: u64, take: u64) -> Self {
        match self {
            Self::Source { offset, .. } => Self::Source {
                offset: offset + from,
                len: take,
            },
            Self::New { offset, .. } => Self::New {
                offset: offset + from,
                len: take,
            },
        }
    }
}

/// Composes the windows of two adjacent chain links.
///
/// `first` is the deeper window, the one applied earlier when
/// reconstructing; `second` is the accumulated outer window, whose source
/// view lies inside `first`'s target view. `first_tview_start` is the
/// absolute fulltext offset at which `first`'s target view begins, pinning
/// down how `second`'s absolute source offsets map into it.
///
/// The composed window produces `second`'s target view while copying only
/// from `first`'s source view, so the caller can keep walking the chain
/// with a single window in hand.
pub fn compose(
    first: &Window,
    first_tview_start: u64,
    second: &Window,
) -> Result<Composed, SvndiffError> {
    if second.src_ops() == 0 {
        return Ok(Composed::SecondStands {
            sview_offset: first.sview_offset,
            sview_len: first.sview_len,
        });
    }

    let map = flatten(first)?;
    let mut ops: Vec<Instruction> = Vec::with_capacity(second.ops.len());
    let mut new_data = Vec::new();
    let mut literal = 0usize;

    for op in &second.ops {
        match *op {
            Instruction::CopyTarget { offset, len } => {
                ops.push(Instruction::CopyTarget { offset, len });
            }
            Instruction::CopyNew { len } => {
                let end = literal + len as usize;
                new_data.extend_from_slice(&second.new_data[literal..end]);
                literal = end;
                push_literal(&mut ops, len);
            }
            Instruction::CopySource { offset, len } => {
                let absolute = second
                    .sview_offset
                    .checked_add(offset)
                    .ok_or(SvndiffError::Overflow)?;
                let Some(mut pos) = absolute.checked_sub(first_tview_start) else {
                    return Err(SvndiffError::InvalidCompose(
                        "outer source view starts before the inner target view",
                    ));
                };
                if pos.checked_add(len).is_none_or(|end| end > first.tview_len) {
                    return Err(SvndiffError::InvalidCompose(
                        "outer source view extends past the inner target view",
                    ));
                }
                let mut remaining = len;
                while remaining > 0 {
                    let (segment, skip) = locate(&map, pos)?;
                    let take = remaining.min(segment.len() - skip);
                    match segment.slice(skip, take) {
                        Segment::Source { offset, len } => {
                            ops.push(Instruction::CopySource { offset, len });
                        }
                        Segment::New { offset, len } => {
                            let start = offset as usize;
                            new_data.extend_from_slice(
                                &first.new_data[start..start + len as usize],
                            );
                            push_literal(&mut ops, len);
                        }
                    }
                    pos += take;
                    remaining -= take;
                }
            }
        }
    }

    let window = Window {
        sview_offset: first.sview_offset,
        sview_len: first.sview_len,
        tview_len: second.tview_len,
        ops,
        new_data,
    };
    window.check()?;
    Ok(Composed::Window(window))
}

/// Flattens `window`'s target view into runs of source and literal bytes,
/// expanding target copies against the runs already produced.
fn flatten(window: &Window) -> Result<Vec<Segment>, SvndiffError> {
    let mut segments: Vec<Segment> = Vec::with_capacity(window.ops.len());
    let mut literal = 0u64;
    for op in &window.ops {
        match *op {
            Instruction::CopySource { offset, len } => {
                segments.push(Segment::Source { offset, len });
            }
            Instruction::CopyNew { len } => {
                segments.push(Segment::New {
                    offset: literal,
                    len,
                });
                literal += len;
            }
            Instruction::CopyTarget { offset, len } => {
                // An overlapping copy re-reads runs pushed by this very
                // loop, which is what makes the repeat semantics hold.
                let mut pos = offset;
                let mut remaining = len;
                while remaining > 0 {
                    let (segment, skip) = locate(&segments, pos)?;
                    let take = remaining.min(segment.len() - skip);
                    segments.push(segment.slice(skip, take));
                    pos += take;
                    remaining -= take;
                }
            }
        }
    }
    Ok(segments)
}

fn locate(segments: &[Segment], pos: u64) -> Result<(Segment, u64), SvndiffError> {
    let mut start = 0u64;
    for segment in segments {
        let len = segment.len();
        if pos < start + len {
            return Ok((*segment, pos - start));
        }
        start += len;
    }
    Err(SvndiffError::InvalidWindow(
        "target copy outside the produced bytes",
    ))
}

fn push_literal(ops: &mut Vec<Instruction>, len: u64) {
    if let Some(Instruction::CopyNew { len: last }) = ops.last_mut() {
        *last += len;
    } else {
        ops.push(Instruction::CopyNew { len });
    }
}
