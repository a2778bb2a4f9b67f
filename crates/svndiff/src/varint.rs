//! MSB-first base-128 integers.
//!
//! Every byte contributes its low seven bits, most significant group first;
//! all bytes except the last carry the `0x80` continuation flag. This is the
//! integer encoding used throughout the delta wire format and the persisted
//! representation records.

use crate::SvndiffError;

/// Appends the encoding of `value` to `out`.
pub fn encode_to_vec(mut value: u64, out: &mut Vec<u8>) {
    let mut buf = [0u8; 10];
    let mut at = buf.len() - 1;
    buf[at] = (value & 0x7f) as u8;
    value >>= 7;
    while value > 0 {
        at -= 1;
        buf[at] = ((value & 0x7f) as u8) | 0x80;
        value >>= 7;
    }
    out.extend_from_slice(&buf[at..]);
}

/// Decodes one integer from the front of `input`, returning it together
/// with the unconsumed remainder.
pub fn decode(input: &[u8]) -> Result<(u64, &[u8]), SvndiffError> {
    let mut value: u64 = 0;
    for (used, &byte) in input.iter().enumerate() {
        if value > u64::MAX >> 7 {
            return Err(SvndiffError::Overflow);
        }
        value = (value << 7) | u64::from(byte & 0x7f);
        if byte & 0x80 == 0 {
            return Ok((value, &input[used + 1..]));
        }
    }
    Err(SvndiffError::Truncated)
}

/// Decodes one integer and narrows it to `usize`.
pub fn decode_len(input: &[u8]) -> Result<(usize, &[u8]), SvndiffError> {
    let (value, rest) = decode(input)?;
    let len = usize::try_from(value).map_err(|_| SvndiffError::Overflow)?;
    Ok((len, rest))
}
