use checksums::RollingChecksum;
use rustc_hash::FxHashMap;

use crate::window::{Instruction, Window};

/// Length of the fixed-size source blocks indexed by the matcher.
pub const MATCH_BLOCK_LEN: usize = 64;

/// Produces one delta window turning `source` into `target`.
///
/// The chunks are the matching slices of the source and target texts; the
/// window's source view covers all of `source` starting at the absolute
/// offset `sview_offset`. Matching is a block scan: each full
/// [`MATCH_BLOCK_LEN`] block of the source is hashed into a table by its
/// rolling digest, the target is swept with a sliding window of the same
/// length, and candidates are confirmed by byte comparison before the match
/// is extended forward as far as the texts agree. Bytes with no match are
/// emitted as literals, so `apply(window, source) == target` always holds.
#[must_use]
pub fn delta_window(source: &[u8], target: &[u8], sview_offset: u64) -> Window {
    let mut ops = Vec::new();
    let mut new_data = Vec::new();

    if source.len() >= MATCH_BLOCK_LEN && target.len() >= MATCH_BLOCK_LEN {
        scan(source, target, &mut ops, &mut new_data);
    } else if !target.is_empty() {
        ops.push(Instruction::CopyNew {
            len: target.len() as u64,
        });
        new_data.extend_from_slice(target);
    }

    Window {
        sview_offset,
        sview_len: source.len() as u64,
        tview_len: target.len() as u64,
        ops,
        new_data,
    }
}

fn scan(source: &[u8], target: &[u8], ops: &mut Vec<Instruction>, new_data: &mut Vec<u8>) {
    let mut blocks: FxHashMap<u32, Vec<usize>> = FxHashMap::default();
    for index in 0..source.len() / MATCH_BLOCK_LEN {
        let start = index * MATCH_BLOCK_LEN;
        let digest = RollingChecksum::from_bytes(&source[start..start + MATCH_BLOCK_LEN]);
        blocks.entry(digest).or_default().push(start);
    }

    let mut pos = 0usize;
    let mut pending = 0usize;
    let mut rolling = RollingChecksum::new();
    rolling.update(&target[..MATCH_BLOCK_LEN]);

    while pos + MATCH_BLOCK_LEN <= target.len() {
        let matched = blocks
            .get(&rolling.digest())
            .into_iter()
            .flatten()
            .filter(|&&start| {
                source[start..start + MATCH_BLOCK_LEN] == target[pos..pos + MATCH_BLOCK_LEN]
            })
            .map(|&start| (start, extend(source, target, start, pos)))
            .max_by_key(|&(_, len)| len);

        if let Some((start, len)) = matched {
            flush_literals(ops, new_data, &target[pending..pos]);
            ops.push(Instruction::CopySource {
                offset: start as u64,
                len: len as u64,
            });
            pos += len;
            pending = pos;
            if pos + MATCH_BLOCK_LEN <= target.len() {
                rolling.reset();
                rolling.update(&target[pos..pos + MATCH_BLOCK_LEN]);
            }
        } else {
            if pos + MATCH_BLOCK_LEN < target.len() {
                rolling
                    .roll(target[pos], target[pos + MATCH_BLOCK_LEN])
                    .expect("match window is never empty");
            }
            pos += 1;
        }
    }
    flush_literals(ops, new_data, &target[pending..]);
}

/// Length of the match at `source[start..]` / `target[pos..]`, extended
/// forward one byte at a time past the confirmed block.
fn extend(source: &[u8], target: &[u8], start: usize, pos: usize) -> usize {
    let mut len = MATCH_BLOCK_LEN;
    while start + len < source.len() && pos + len < target.len() && source[start + len] == target[pos + len]
    {
        len += 1;
    }
    len
}

fn flush_literals(ops: &mut Vec<Instruction>, new_data: &mut Vec<u8>, run: &[u8]) {
    if run.is_empty() {
        return;
    }
    if let Some(Instruction::CopyNew { len }) = ops.last_mut() {
        *len += run.len() as u64;
    } else {
        ops.push(Instruction::CopyNew {
            len: run.len() as u64,
        });
    }
    new_data.extend_from_slice(run);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apply::apply;
    use proptest::prelude::*;

    fn apply_all(window: &Window, source: &[u8]) -> Vec<u8> {
        let mut out = vec![0u8; window.tview_len as usize];
        let produced = apply(window, source, &mut out).expect("window applies");
        assert_eq!(produced as u64, window.tview_len);
        out
    }

    #[test]
    fn identical_chunks_become_a_single_source_copy() {
        let data: Vec<u8> = (0..=255u8).cycle().take(500).collect();
        let window = delta_window(&data, &data, 0);
        assert_eq!(
            window.ops,
            vec![Instruction::CopySource {
                offset: 0,
                len: 500,
            }]
        );
        assert!(window.new_data.is_empty());
        assert_eq!(apply_all(&window, &data), data);
    }

    #[test]
    fn unrelated_chunks_fall_back_to_literals() {
        let source = vec![0u8; 200];
        let target = vec![1u8; 200];
        let window = delta_window(&source, &target, 0);
        assert_eq!(window.src_ops(), 0);
        assert_eq!(window.new_data, target);
        assert_eq!(apply_all(&window, &source), target);
    }

    #[test]
    fn short_chunks_skip_matching_entirely() {
        let window = delta_window(b"hello, world", b"hello, there", 0);
        assert_eq!(window.src_ops(), 0);
        assert_eq!(window.new_data, b"hello, there");
    }

    #[test]
    fn a_shared_middle_run_is_found_and_reused() {
        let shared: Vec<u8> = (0..200u8).collect();
        let mut source = vec![b'x'; 50];
        source.extend_from_slice(&shared);
        let mut target = vec![b'y'; 37];
        target.extend_from_slice(&shared);
        target.extend_from_slice(b"tail");

        let window = delta_window(&source, &target, 0);
        assert!(window.src_ops() >= 1, "shared run should be matched");
        assert!(
            (window.new_data.len() as u64) < window.tview_len,
            "most of the target should come from the source"
        );
        assert_eq!(apply_all(&window, &source), target);
    }

    #[test]
    fn windows_always_pass_their_own_check() {
        let source = b"abcdefgh".repeat(40);
        let target = b"abcdefgx".repeat(40);
        let window = delta_window(&source, &target, 12345);
        window.check().expect("produced window is valid");
        assert_eq!(window.sview_offset, 12345);
    }

    proptest! {
        #[test]
        fn produced_windows_reconstruct_the_target(
            source in proptest::collection::vec(any::<u8>(), 0..600),
            target in proptest::collection::vec(any::<u8>(), 0..600),
        ) {
            let window = delta_window(&source, &target, 0);
            window.check().unwrap();
            prop_assert_eq!(apply_all(&window, &source), target);
        }

        #[test]
        fn edited_copies_mostly_reuse_the_source(
            base in proptest::collection::vec(any::<u8>(), 300..600),
            edit in 0usize..300,
        ) {
            let mut target = base.clone();
            let at = edit.min(target.len() - 1);
            target[at] = target[at].wrapping_add(1);
            let window = delta_window(&base, &target, 0);
            window.check().unwrap();
            prop_assert_eq!(apply_all(&window, &base), target);
            prop_assert!(window.src_ops() >= 1);
        }
    }
}
