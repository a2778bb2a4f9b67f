use crate::varint;
use crate::window::{Instruction, Window};
use crate::{SvndiffError, FORMAT_VERSION};

/// Length of the magic header: `b"SVN"` plus the version byte.
pub const HEADER_LEN: usize = 4;

/// Reads the stream header, returning the version byte and the remainder.
pub fn read_header(input: &[u8]) -> Result<(u8, &[u8]), SvndiffError> {
    if input.len() < HEADER_LEN {
        return Err(SvndiffError::Truncated);
    }
    if &input[..3] != b"SVN" {
        return Err(SvndiffError::BadMagic);
    }
    let version = input[3];
    if version != FORMAT_VERSION {
        return Err(SvndiffError::UnsupportedVersion(version));
    }
    Ok((version, &input[HEADER_LEN..]))
}

/// Reads one window from the front of `input`.
///
/// Returns `None` at clean end-of-stream (empty input). The returned window
/// has passed [`Window::check`].
pub fn read_window(input: &[u8]) -> Result<Option<(Window, &[u8])>, SvndiffError> {
    if input.is_empty() {
        return Ok(None);
    }
    let (sview_offset, rest) = varint::decode(input)?;
    let (sview_len, rest) = varint::decode(rest)?;
    let (tview_len, rest) = varint::decode(rest)?;
    let (instr_len, rest) = varint::decode_len(rest)?;
    let (literal_len, rest) = varint::decode_len(rest)?;

    if rest.len() < instr_len {
        return Err(SvndiffError::Truncated);
    }
    let (instr_bytes, rest) = rest.split_at(instr_len);
    if rest.len() < literal_len {
        return Err(SvndiffError::Truncated);
    }
    let (literal_bytes, rest) = rest.split_at(literal_len);

    let window = Window {
        sview_offset,
        sview_len,
        tview_len,
        ops: read_instructions(instr_bytes)?,
        new_data: literal_bytes.to_vec(),
    };
    window.check()?;
    Ok(Some((window, rest)))
}

fn read_instructions(mut input: &[u8]) -> Result<Vec<Instruction>, SvndiffError> {
    let mut ops = Vec::new();
    while let Some((&byte, rest)) = input.split_first() {
        let mut tail = rest;
        let mut len = u64::from(byte & 0x3f);
        if len == 0 {
            let (decoded, rest) = varint::decode(tail)?;
            len = decoded;
            tail = rest;
        }
        let op = match byte >> 6 {
            0 => {
                let (offset, rest) = varint::decode(tail)?;
                tail = rest;
                Instruction::CopySource { offset, len }
            }
            1 => {
                let (offset, rest) = varint::decode(tail)?;
                tail = rest;
                Instruction::CopyTarget { offset, len }
            }
            2 => Instruction::CopyNew { len },
            _ => return Err(SvndiffError::BadInstruction(byte)),
        };
        ops.push(op);
        input = tail;
    }
    Ok(ops)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::write::{write_header, write_window};

    #[test]
    fn header_magic_and_version_are_enforced()  {
        assert_eq!(read_header(b"SVN"), Err(SvndiffError::Truncated));
        assert_eq!(read_header(b"XYZ\0rest"), Err(SvndiffError::BadMagic));
        assert_eq!(
            read_header(b"SVN\x03"),
            Err(SvndiffError::UnsupportedVersion(3))
        );

        let (version, rest) = read_header(b"SVN\0payload").expect("header is valid");
        assert_eq!(version, 0);
        assert_eq!(rest, b"payload");
    }

    #[test]
    fn empty_input_is_end_of_stream() {
        assert_eq!(read_window(&[]), Ok(None));
    }

    #[test]
    fn golden_window_decodes_to_known_instructions() {
        // sview (0, 7), tview 12: copy 7 source bytes, then 5 literals.
        let bytes = [
            0x00, 0x07, 0x0c, 0x03, 0x05, // window prologue
            0x07, 0x00, // source copy, len 7, offset 0
            0x85, // literal copy, len 5
            b't', b'h', b'e', b'r', b'e',
        ];
        let (window, rest) = read_window(&bytes)
            .expect("window parses")
            .expect("stream is not empty");
        assert!(rest.is_empty());
        assert_eq!(window.sview_len, 7);
        assert_eq!(window.tview_len, 12);
        assert_eq!(
            window.ops,
            vec![
                Instruction::CopySource { offset: 0, len: 7 },
                Instruction::CopyNew { len: 5 },
            ]
        );
        assert_eq!(window.new_data, b"there");
    }

    #[test]
    fn reserved_selector_is_rejected() {
        // Prologue promising one instruction byte, which uses selector 0b11.
        let bytes = [0x00, 0x00, 0x01, 0x01, 0x00, 0xc1];
        assert_eq!(
            read_window(&bytes),
            Err(SvndiffError::BadInstruction(0xc1))
        );
    }

    #[test]
    fn truncated_literal_run_is_rejected() {
        let mut bytes = Vec::new();
        let window = Window {
            tview_len: 4,
            ops: vec![Instruction::CopyNew { len: 4 }],
            new_data: b"data".to_vec(),
            ..Window::default()
        };
        write_window(&mut bytes, &window);
        bytes.truncate(bytes.len() - 2);
        assert_eq!(read_window(&bytes), Err(SvndiffError::Truncated));
    }

    #[test]
    fn writer_output_parses_back_including_long_lengths() {
        let window = Window {
            sview_offset: 1000,
            sview_len: 300,
            tview_len: 300,
            ops: vec![Instruction::CopySource { offset: 0, len: 300 }],
            ..Window::default()
        };
        let mut bytes = Vec::new();
        write_header(&mut bytes, FORMAT_VERSION);
        write_window(&mut bytes, &window);

        let (_, rest) = read_header(&bytes).expect("header is valid");
        let (parsed, rest) = read_window(rest)
            .expect("window parses")
            .expect("stream is not empty");
        assert_eq!(parsed, window);
        assert_eq!(read_window(rest), Ok(None));
    }
}
