//! Buffer traits for fixed-layout frame access.
//!
//! This module provides:
//! - [`ReadBuffer`] trait for read-only access to variable-width little-endian integers
//! - [`WriteBuffer`] trait for read-write access
//! - Latin-1 helpers for single-byte, space padded text fields

/// Padding byte for text fields.
pub const PAD_BYTE: u8 = b' ';

/// Trait for read-only buffer access.
///
/// All integer reads use little-endian byte order. Widths are 1, 2, 4 or 8 bytes.
pub trait ReadBuffer {
    /// Returns the buffer as a byte slice.
    fn as_slice(&self) -> &[u8];

    /// Returns the length of the buffer in bytes.
    fn len(&self) -> usize;

    /// Returns true if the buffer is empty.
    #[must_use]
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reads a u8 at the given offset.
    #[inline(always)]
    fn get_u8(&self, offset: usize) -> u8 {
        self.as_slice()[offset]
    }

    /// Reads a u16 in little-endian at the given offset.
    #[inline(always)]
    fn get_u16_le(&self, offset: usize) -> u16 {
        let bytes = &self.as_slice()[offset..offset + 2];
        u16::from_le_bytes([bytes[0], bytes[1]])
    }

    /// Reads a sign-extended little-endian integer of `width` bytes.
    ///
    /// # Arguments
    /// * `offset` - Byte offset to read from
    /// * `width` - Width in bytes (1..=8)
    #[inline]
    fn get_int_le(&self, offset: usize, width: usize) -> i64 {
        let mut raw = [0u8; 8];
        raw[..width].copy_from_slice(self.get_bytes(offset, width));
        let shift = 64 - 8 * width as u32;
        (i64::from_le_bytes(raw) << shift) >> shift
    }

    /// Reads a zero-extended little-endian integer of `width` bytes.
    ///
    /// # Arguments
    /// * `offset` - Byte offset to read from
    /// * `width` - Width in bytes (1..=8)
    #[inline]
    fn get_uint_le(&self, offset: usize, width: usize) -> u64 {
        let mut raw = [0u8; 8];
        raw[..width].copy_from_slice(self.get_bytes(offset, width));
        u64::from_le_bytes(raw)
    }

    /// Returns a slice of bytes at the given offset and length.
    #[inline(always)]
    fn get_bytes(&self, offset: usize, len: usize) -> &[u8] {
        &self.as_slice()[offset..offset + len]
    }

    /// Reads a fixed-length Latin-1 field, trimming trailing padding and nulls.
    ///
    /// # Arguments
    /// * `offset` - Byte offset to start from
    /// * `len` - Field length in bytes
    fn get_padded_str(&self, offset: usize, len: usize) -> String {
        let bytes = self.get_bytes(offset, len);
        let end = bytes
            .iter()
            .rposition(|&b| b != PAD_BYTE && b != 0)
            .map_or(0, |pos| pos + 1);
        decode_latin1(&bytes[..end])
    }
}

/// Trait for read-write buffer access.
pub trait WriteBuffer: ReadBuffer {
    /// Returns the buffer as a mutable byte slice.
    fn as_mut_slice(&mut self) -> &mut [u8];

    /// Writes a u8 at the given offset.
    #[inline(always)]
    fn put_u8(&mut self, offset: usize, value: u8) {
        self.as_mut_slice()[offset] = value;
    }

    /// Writes a u16 in little-endian at the given offset.
    #[inline(always)]
    fn put_u16_le(&mut self, offset: usize, value: u16) {
        self.put_bytes(offset, &value.to_le_bytes());
    }

    /// Writes the low `width` bytes of a two's-complement value in little-endian.
    ///
    /// The caller is responsible for checking that the value fits, see [`fits_signed`].
    #[inline]
    fn put_int_le(&mut self, offset: usize, width: usize, value: i64) {
        self.put_bytes(offset, &value.to_le_bytes()[..width]);
    }

    /// Writes the low `width` bytes of an unsigned value in little-endian.
    ///
    /// The caller is responsible for checking that the value fits, see [`fits_unsigned`].
    #[inline]
    fn put_uint_le(&mut self, offset: usize, width: usize, value: u64) {
        self.put_bytes(offset, &value.to_le_bytes()[..width]);
    }

    /// Writes a byte slice at the given offset.
    #[inline(always)]
    fn put_bytes(&mut self, offset: usize, src: &[u8]) {
        self.as_mut_slice()[offset..offset + src.len()].copy_from_slice(src);
    }

    /// Writes already encoded text left-justified, padding with spaces up to `len`.
    ///
    /// # Panics
    /// Panics if `text` is longer than `len`.
    #[inline]
    fn put_padded_bytes(&mut self, offset: usize, text: &[u8], len: usize) {
        assert!(text.len() <= len, "text longer than field");
        self.put_bytes(offset, text);
        self.as_mut_slice()[offset + text.len()..offset + len].fill(PAD_BYTE);
    }
}

impl ReadBuffer for [u8] {
    #[inline(always)]
    fn as_slice(&self) -> &[u8] {
        self
    }

    #[inline(always)]
    fn len(&self) -> usize {
        <[u8]>::len(self)
    }
}

impl WriteBuffer for [u8] {
    #[inline(always)]
    fn as_mut_slice(&mut self) -> &mut [u8] {
        self
    }
}

impl ReadBuffer for Vec<u8> {
    #[inline(always)]
    fn as_slice(&self) -> &[u8] {
        self
    }

    #[inline(always)]
    fn len(&self) -> usize {
        Vec::len(self)
    }
}

impl WriteBuffer for Vec<u8> {
    #[inline(always)]
    fn as_mut_slice(&mut self) -> &mut [u8] {
        self
    }
}

/// Returns true if `value` is representable as a signed integer of `width` bytes.
#[must_use]
pub fn fits_signed(value: i64, width: usize) -> bool {
    if width >= 8 {
        return true;
    }
    let bits = 8 * width as u32;
    let min = -(1i64 << (bits - 1));
    let max = (1i64 << (bits - 1)) - 1;
    (min..=max).contains(&value)
}

/// Returns true if `value` is representable as an unsigned integer of `width` bytes.
#[must_use]
pub fn fits_unsigned(value: u64, width: usize) -> bool {
    width >= 8 || value < (1u64 << (8 * width as u32))
}

/// Encodes text as Latin-1 (ISO-8859-1).
///
/// # Errors
/// Returns the first character outside the Latin-1 range.
pub fn encode_latin1(text: &str) -> Result<Vec<u8>, char> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).map_err(|_| c))
        .collect()
}

/// Decodes Latin-1 (ISO-8859-1) bytes. Every byte maps to exactly one char.
#[must_use]
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_widths_round_trip() {
        let mut buf = vec![0u8; 8];
        for (width, value) in [(1, -5i64), (2, -300), (4, i32::MIN as i64), (8, i64::MAX)] {
            buf.put_int_le(0, width, value);
            assert_eq!(buf.get_int_le(0, width), value, "width {width}");
        }
    }

    #[test]
    fn test_uint_read_is_zero_extended() {
        let buf = vec![0xFFu8, 0xFF, 0, 0];
        assert_eq!(buf.get_uint_le(0, 2), 0xFFFF);
        assert_eq!(buf.get_int_le(0, 2), -1);
    }

    #[test]
    fn test_int32_wire_format() {
        let mut buf = vec![0u8; 4];
        buf.put_int_le(0, 4, i64::from(i32::MAX));
        assert_eq!(buf, vec![0xFF, 0xFF, 0xFF, 0x7F]);
    }

    #[test]
    fn test_fits() {
        assert!(fits_signed(127, 1));
        assert!(!fits_signed(128, 1));
        assert!(fits_signed(-128, 1));
        assert!(!fits_signed(i64::from(i32::MAX) + 1, 4));
        assert!(fits_unsigned(255, 1));
        assert!(!fits_unsigned(256, 1));
        assert!(fits_unsigned(u64::MAX, 8));
    }

    #[test]
    fn test_latin1() {
        assert_eq!(encode_latin1("caf\u{e9}").unwrap(), vec![b'c', b'a', b'f', 0xE9]);
        assert_eq!(encode_latin1("\u{20ac}"), Err('\u{20ac}'));
        assert_eq!(decode_latin1(&[b'a', 0xE9]), "a\u{e9}");
    }

    #[test]
    fn test_padded_str() {
        let mut buf = vec![0u8; 8];
        buf.put_padded_bytes(0, b"ABC", 8);
        assert_eq!(&buf, b"ABC     ");
        assert_eq!(buf.get_padded_str(0, 8), "ABC");

        let nulls = vec![b'X', 0, 0, 0];
        assert_eq!(nulls.get_padded_str(0, 4), "X");
    }
}
