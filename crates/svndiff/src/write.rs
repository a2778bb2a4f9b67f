use crate::varint;
use crate::window::{Instruction, Window};

/// Appends the stream header (`b"SVN"` plus `version`) to `out`.
pub fn write_header(out: &mut Vec<u8>, version: u8) {
    out.extend_from_slice(b"SVN");
    out.push(version);
}

/// Appends the encoding of one window to `out`.
///
/// Lengths below 64 are packed into the instruction byte itself; longer
/// lengths leave the low bits zero and follow as a varint.
pub fn write_window(out: &mut Vec<u8>, window: &Window) {
    let mut instrs = Vec::with_capacity(window.ops.len() * 3);
    for op in &window.ops {
        let selector = match op {
            Instruction::CopySource { .. } => 0u8,
            Instruction::CopyTarget { .. } => 1,
            Instruction::CopyNew { .. } => 2,
        };
        let len = op.len();
        if (1..64).contains(&len) {
            instrs.push((selector << 6) | len as u8);
        } else {
            instrs.push(selector << 6);
            varint::encode_to_vec(len, &mut instrs);
        }
        if let Instruction::CopySource { offset, .. } | Instruction::CopyTarget { offset, .. } = op
        {
            varint::encode_to_vec(*offset, &mut instrs);
        }
    }

    varint::encode_to_vec(window.sview_offset, out);
    varint::encode_to_vec(window.sview_len, out);
    varint::encode_to_vec(window.tview_len, out);
    varint::encode_to_vec(instrs.len() as u64, out);
    varint::encode_to_vec(window.new_data.len() as u64, out);
    out.extend_from_slice(&instrs);
    out.extend_from_slice(&window.new_data);
}
