//! Unsigned LEB128 varints and zigzag mapping for signed integers.

use eventwire_core::error::CodecError;

/// Longest encoding of a `u64`.
pub const MAX_VARINT_LEN: usize = 10;

/// Appends `value` to `out` as an unsigned LEB128 varint.
#[allow(clippy::cast_possible_truncation)]
pub fn encode_u64(mut value: u64, out: &mut Vec<u8>) {
    while value >= 0x80 {
        out.push((value as u8) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
}

/// Reads a varint from the front of `buf`.
///
/// Returns the value and the number of bytes consumed.
///
/// # Errors
///
/// Returns `CodecError::Decoding` if `buf` ends before the varint does or
/// the varint does not fit in a `u64`.
pub fn decode_u64(buf: &[u8]) -> Result<(u64, usize), CodecError> {
    let mut value: u64 = 0;
    for (i, &byte) in buf.iter().take(MAX_VARINT_LEN).enumerate() {
        // The tenth byte may only carry the top bit of a u64.
        if i == MAX_VARINT_LEN - 1 && byte > 0x01 {
            return Err(CodecError::decoding("varint overflows 64 bits"));
        }
        value |= u64::from(byte & 0x7f) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
    }
    Err(CodecError::decoding("truncated varint"))
}

/// Maps a signed integer onto an unsigned one so small magnitudes stay short.
#[allow(clippy::cast_sign_loss)]
#[must_use]
pub fn zigzag_encode(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

/// Inverse of [`zigzag_encode`].
#[allow(clippy::cast_possible_wrap)]
#[must_use]
pub fn zigzag_decode(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}

/// Number of bytes `value` occupies when encoded.
#[must_use]
pub fn encoded_len(value: u64) -> usize {
    let bits = 64 - value.leading_zeros() as usize;
    bits.max(1).div_ceil(7)
}
