//! Big-endian fixed-width word encoding
//!
//! A word of width `W` occupies exactly `W.bytes()` bytes, most significant
//! byte first. VOID occupies nothing and always decodes to 0.

use super::errors::{WordError, WordResult};
use super::width::WordWidth;

/// Decodes a word from the first `width.bytes()` bytes of `src`.
pub fn read_word(width: WordWidth, src: &[u8]) -> WordResult<u64> {
    let n = width.bytes();
    if src.len() < n {
        return Err(WordError::EndOfStream {
            width,
            needed: n,
            available: src.len(),
        });
    }
    Ok(src[..n]
        .iter()
        .fold(0u64, |acc, &b| (acc << 8) | u64::from(b)))
}

/// Encodes the low `width.bytes()` bytes of `value` into `dest`.
///
/// Higher bits that do not fit are dropped; use [`write_word_checked`]
/// when the value must be validated.
pub fn write_word(width: WordWidth, dest: &mut [u8], value: u64) -> WordResult<()> {
    let n = width.bytes();
    if dest.len() < n {
        return Err(WordError::EndOfStream {
            width,
            needed: n,
            available: dest.len(),
        });
    }
    for (i, byte) in dest[..n].iter_mut().enumerate() {
        let shift = 8 * (n - 1 - i);
        *byte = (value >> shift) as u8;
    }
    Ok(())
}

/// Like [`write_word`] but fails with `OutOfBitDepth` instead of truncating.
pub fn write_word_checked(width: WordWidth, dest: &mut [u8], value: u64) -> WordResult<()> {
    width.ensure_can_fit(value)?;
    write_word(width, dest, value)
}

/// Encodes `value` into a fresh buffer of exactly `width.bytes()` bytes.
pub fn encode_word(width: WordWidth, value: u64) -> WordResult<Vec<u8>> {
    let mut buf = vec![0u8; width.bytes()];
    write_word_checked(width, &mut buf, value)?;
    Ok(buf)
}

/// Reinterprets the low bits of an unsigned word as two's complement.
pub fn to_signed(width: WordWidth, value: u64) -> i64 {
    match width.bytes() {
        0 => 0,
        8 => value as i64,
        n => {
            let bits = (n * 8) as u32;
            let masked = value & width.max_unsigned();
            if masked & (1u64 << (bits - 1)) != 0 {
                masked as i64 - (1i64 << bits)
            } else {
                masked as i64
            }
        }
    }
}

/// Maps a signed value onto the unsigned bit pattern of `width`.
pub fn to_unsigned(width: WordWidth, value: i64) -> u64 {
    match width.bytes() {
        8 => value as u64,
        _ => (value as u64) & width.max_unsigned(),
    }
}

/// Decodes a signed word.
pub fn read_signed(width: WordWidth, src: &[u8]) -> WordResult<i64> {
    read_word(width, src).map(|v| to_signed(width, v))
}

/// Encodes a signed word, failing when it is outside the width's range.
pub fn write_signed(width: WordWidth, dest: &mut [u8], value: i64) -> WordResult<()> {
    width.ensure_can_fit_signed(value)?;
    write_word(width, dest, to_unsigned(width, value))
}
