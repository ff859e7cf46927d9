use std::io::Cursor;

use byteorder::WriteBytesExt;

use crate::ofp_error::{OfpSerializationError, Result};

/// Set bit `bit` of `x` on if `toggle` is true, otherwise off.
pub fn bit(bit: u64, x: u64, toggle: bool) -> u64 {
    if toggle {
        x | (1 << bit)
    } else {
        x & !(1 << bit)
    }
}

/// Test whether bit `bit` of `x` is set.
pub fn test_bit(bit: u64, x: u64) -> bool {
    (x >> bit) & 1 == 1
}

/// Round `len` up to the next multiple of 8.
pub fn pad8(len: usize) -> usize {
    (len + 7) / 8 * 8
}

/// Number of zero bytes needed after `len` bytes to reach 8-byte alignment.
pub fn pad_len(len: usize) -> usize {
    pad8(len) - len
}

/// Narrow a computed length for a 16-bit length field.
pub fn length_u16(kind: &'static str, length: usize) -> Result<u16> {
    u16::try_from(length).map_err(|_| OfpSerializationError::LengthOverflow { kind, length })
}

/// Append `count` zero bytes to `bytes`.
pub fn write_padding_bytes(bytes: &mut Vec<u8>, count: usize) -> Result<()> {
    for _ in 0..count {
        bytes.write_u8(0)?;
    }
    Ok(())
}

/// Advance past `count` padding bytes, failing if the buffer ends first.
pub fn skip_padding_bytes(bytes: &mut Cursor<&[u8]>, count: usize) -> Result<()> {
    let pos = bytes.position() as usize;
    if pos + count > bytes.get_ref().len() {
        return Err(OfpSerializationError::TruncatedInput(format!("{} padding bytes at offset {}",
                                                                 count,
                                                                 pos)));
    }
    bytes.set_position((pos + count) as u64);
    Ok(())
}

/// Write `s` into a fixed-width, zero-filled field of `len` bytes, truncating if needed.
pub fn write_fixed_size_string(bytes: &mut Vec<u8>, s: &str, len: usize) -> Result<()> {
    let raw = s.as_bytes();
    let n = raw.len().min(len);
    bytes.extend_from_slice(&raw[..n]);
    write_padding_bytes(bytes, len - n)
}

/// Decode a fixed-width, NUL-padded string field.
pub fn read_fixed_size_string(raw: &[u8]) -> String {
    let end = raw.iter().position(|b| *b == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end]).into_owned()
}
