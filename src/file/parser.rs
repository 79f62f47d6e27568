//! Cursor-based byte stream parser for metadata blobs.
//!
//! [`crate::file::parser::Parser`] keeps a position inside a byte slice and offers bounds-checked
//! reads of fixed-width integers and of the ECMA-335 *compressed* integer encodings used inside
//! signature blobs, blob-heap length prefixes and the user-string heap.
//!
//! # Compressed integers (ECMA-335 II.23.2)
//!
//! | First byte  | Width   | Payload bits |
//! |-------------|---------|--------------|
//! | `0xxxxxxx`  | 1 byte  | 7            |
//! | `10xxxxxx`  | 2 bytes | 14           |
//! | `110xxxxx`  | 4 bytes | 29           |
//!
//! Signed values are rotated so the sign lands in the lowest bit, then stored with the same
//! width scheme. [`crate::file::parser::compress_uint`] and [`crate::file::parser::compress_int`]
//! are the inverse operations.
//!
//! # Examples
//!
//! ```rust
//! use cildiff::file::parser::{compress_uint, Parser};
//!
//! let mut encoded = Vec::new();
//! compress_uint(0x3FFF, &mut encoded)?;
//! assert_eq!(encoded, [0xBF, 0xFF]);
//!
//! let mut parser = Parser::new(&encoded);
//! assert_eq!(parser.read_compressed_uint()?, 0x3FFF);
//! assert!(!parser.has_more_data());
//! # Ok::<(), cildiff::Error>(())
//! ```

use crate::{
    file::io::{read_le_at, CilIO},
    metadata::token::Token,
    Result,
};

/// Largest value representable by the compressed unsigned encoding.
pub const MAX_COMPRESSED_UINT: u32 = 0x1FFF_FFFF;

/// A bounds-checked cursor over a byte slice.
pub struct Parser<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> Parser<'a> {
    /// Create a parser positioned at the start of `data`.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Parser { data, position: 0 }
    }

    /// Total length of the underlying data.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the underlying data is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns true while unread bytes remain.
    #[must_use]
    pub fn has_more_data(&self) -> bool {
        self.position < self.data.len()
    }

    /// Move the cursor to an absolute position.
    ///
    /// # Errors
    /// Returns [`crate::Error::UnexpectedEndOfData`] if `pos` lies beyond the data.
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(out_of_bounds_error!());
        }

        self.position = pos;
        Ok(())
    }

    /// Skip a single byte.
    ///
    /// # Errors
    /// Returns [`crate::Error::UnexpectedEndOfData`] at the end of the data.
    pub fn advance(&mut self) -> Result<()> {
        self.advance_by(1)
    }

    /// Skip `step` bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::UnexpectedEndOfData`] if fewer than `step` bytes remain.
    pub fn advance_by(&mut self, step: usize) -> Result<()> {
        match self.position.checked_add(step) {
            Some(end) if end <= self.data.len() => {
                self.position = end;
                Ok(())
            }
            _ => Err(out_of_bounds_error!()),
        }
    }

    /// Current cursor position.
    #[must_use]
    pub fn pos(&self) -> usize {
        self.position
    }

    /// The full underlying data.
    #[must_use]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// The bytes that have not been consumed yet.
    #[must_use]
    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.position.min(self.data.len())..]
    }

    /// Look at the next byte without consuming it.
    ///
    /// # Errors
    /// Returns [`crate::Error::UnexpectedEndOfData`] at the end of the data.
    pub fn peek_byte(&self) -> Result<u8> {
        match self.data.get(self.position) {
            Some(byte) => Ok(*byte),
            None => Err(out_of_bounds_error!()),
        }
    }

    /// Read a little-endian value and advance past it.
    ///
    /// # Errors
    /// Returns [`crate::Error::UnexpectedEndOfData`] if the value does not fit.
    pub fn read_le<T: CilIO>(&mut self) -> Result<T> {
        read_le_at::<T>(self.data, &mut self.position)
    }

    /// Take the next `len` bytes as a slice.
    ///
    /// # Errors
    /// Returns [`crate::Error::UnexpectedEndOfData`] if fewer than `len` bytes remain.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let start = self.position;
        self.advance_by(len)?;
        Ok(&self.data[start..self.position])
    }

    /// Read an ECMA-335 compressed unsigned integer (1, 2 or 4 bytes).
    ///
    /// # Errors
    /// Returns [`crate::Error::UnexpectedEndOfData`] on truncation and
    /// [`crate::Error::MalformedImage`] for the reserved `111xxxxx` lead byte.
    pub fn read_compressed_uint(&mut self) -> Result<u32> {
        let first_byte = self.read_le::<u8>()?;

        // 1-byte encoding: 0xxxxxxx
        if (first_byte & 0x80) == 0 {
            return Ok(u32::from(first_byte));
        }

        // 2-byte encoding: 10xxxxxx xxxxxxxx
        if (first_byte & 0xC0) == 0x80 {
            let second_byte = self.read_le::<u8>()?;
            let value = ((u32::from(first_byte) & 0x3F) << 8) | u32::from(second_byte);
            return Ok(value);
        }

        // 4-byte encoding: 110xxxxx xxxxxxxx xxxxxxxx xxxxxxxx
        if (first_byte & 0xE0) == 0xC0 {
            let b1 = u32::from(self.read_le::<u8>()?);
            let b2 = u32::from(self.read_le::<u8>()?);
            let b3 = u32::from(self.read_le::<u8>()?);
            let value = ((u32::from(first_byte) & 0x1F) << 24) | (b1 << 16) | (b2 << 8) | b3;
            return Ok(value);
        }

        Err(malformed_error!("Invalid compressed uint - {}", first_byte))
    }

    /// Read an ECMA-335 compressed signed integer.
    ///
    /// The sign bit is stored in the lowest bit of the payload; the magnitude of the sign
    /// extension depends on the width the value was encoded with.
    ///
    /// # Errors
    /// See [`Parser::read_compressed_uint`].
    pub fn read_compressed_int(&mut self) -> Result<i32> {
        let start = self.position;
        let unsigned = self.read_compressed_uint()?;
        let width = self.position - start;

        let bias: i64 = match width {
            1 => 1 << 6,
            2 => 1 << 13,
            _ => 1 << 28,
        };

        let magnitude = i64::from(unsigned >> 1);
        let value = if unsigned & 1 == 0 {
            magnitude
        } else {
            magnitude - bias
        };

        i32::try_from(value).map_err(|_| malformed_error!("Invalid compressed int - {}", value))
    }

    /// Read a `TypeDefOrRefOrSpecEncoded` token (II.23.2.8).
    ///
    /// # Errors
    /// Returns [`crate::Error::MalformedImage`] if the two tag bits select no table.
    pub fn read_compressed_token(&mut self) -> Result<Token> {
        let compressed_token = self.read_compressed_uint()?;

        let table: u32 = match compressed_token & 0x3 {
            0x0 => 0x0200_0000, // TypeDef
            0x1 => 0x0100_0000, // TypeRef
            0x2 => 0x1B00_0000, // TypeSpec
            _ => {
                return Err(malformed_error!(
                    "Invalid compressed token - {}",
                    compressed_token
                ))
            }
        };

        Ok(Token::new(table | (compressed_token >> 2)))
    }

    /// Read a NUL-terminated UTF-8 string. A missing terminator ends the string at the end of
    /// the data.
    ///
    /// # Errors
    /// Returns [`crate::Error::MalformedImage`] if the bytes are not valid UTF-8.
    pub fn read_string_utf8(&mut self) -> Result<&'a str> {
        let start = self.position;
        let end = self.data[start.min(self.data.len())..]
            .iter()
            .position(|byte| *byte == 0)
            .map_or(self.data.len(), |nul| start + nul);

        let string_data = &self.data[start.min(end)..end];
        self.position = (end + 1).min(self.data.len());

        std::str::from_utf8(string_data).map_err(|e| {
            malformed_error!("Invalid UTF-8 string at offset {}-{}: {}", start, end, e)
        })
    }
}

/// Append `value` in the ECMA-335 compressed unsigned encoding.
///
/// # Errors
/// Returns [`crate::Error::MalformedImage`] if `value` exceeds [`MAX_COMPRESSED_UINT`].
pub fn compress_uint(value: u32, out: &mut Vec<u8>) -> Result<()> {
    match value {
        0..=0x7F => out.push(value as u8),
        0x80..=0x3FFF => {
            out.push(0x80 | (value >> 8) as u8);
            out.push((value & 0xFF) as u8);
        }
        0x4000..=MAX_COMPRESSED_UINT => {
            out.push(0xC0 | (value >> 24) as u8);
            out.push(((value >> 16) & 0xFF) as u8);
            out.push(((value >> 8) & 0xFF) as u8);
            out.push((value & 0xFF) as u8);
        }
        _ => {
            return Err(malformed_error!(
                "Value {} is too large for a compressed uint",
                value
            ))
        }
    }

    Ok(())
}

/// Append `value` in the ECMA-335 compressed signed encoding.
///
/// # Errors
/// Returns [`crate::Error::MalformedImage`] if `value` lies outside `-2^28 .. 2^28`.
#[allow(clippy::cast_sign_loss)]
pub fn compress_int(value: i32, out: &mut Vec<u8>) -> Result<()> {
    let (bias, width) = match value {
        -0x40..=0x3F => (1_i64 << 6, 1),
        -0x2000..=0x1FFF => (1_i64 << 13, 2),
        -0x1000_0000..=0x0FFF_FFFF => (1_i64 << 28, 4),
        _ => {
            return Err(malformed_error!(
                "Value {} is too large for a compressed int",
                value
            ))
        }
    };

    let value = i64::from(value);
    let rotated = if value < 0 {
        (((value + bias) << 1) | 1) as u32
    } else {
        (value << 1) as u32
    };

    // the width is chosen by the signed range; force it even when the rotated value is small
    match width {
        1 => out.push(rotated as u8),
        2 => {
            out.push(0x80 | (rotated >> 8) as u8);
            out.push((rotated & 0xFF) as u8);
        }
        _ => {
            out.push(0xC0 | (rotated >> 24) as u8);
            out.push(((rotated >> 16) & 0xFF) as u8);
            out.push(((rotated >> 8) & 0xFF) as u8);
            out.push((rotated & 0xFF) as u8);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_compressed_uint() {
        let test_cases = [
            (vec![0x03], 0x03),
            (vec![0x7F], 0x7F),
            (vec![0x80, 0x80], 0x80),
            (vec![0xAE, 0x57], 0x2E57),
            (vec![0xBF, 0xFF], 0x3FFF),
            (vec![0xC0, 0x00, 0x40, 0x00], 0x4000),
            (vec![0xDF, 0xFF, 0xFF, 0xFF], 0x1FFF_FFFF),
        ];

        for (input, expected) in test_cases {
            let mut parser = Parser::new(&input);
            assert_eq!(parser.read_compressed_uint().unwrap(), expected);
            assert!(!parser.has_more_data());
        }
    }

    #[test]
    fn test_read_compressed_int() {
        // ECMA-335 II.23.2 reference values
        let test_cases = [
            (vec![0x06], 3),
            (vec![0x7B], -3),
            (vec![0x80, 0x80], 64),
            (vec![0x01], -64),
            (vec![0xC0, 0x00, 0x40, 0x00], 8192),
            (vec![0x80, 0x01], -8192),
            (vec![0xDF, 0xFF, 0xFF, 0xFE], 268_435_455),
            (vec![0xC0, 0x00, 0x00, 0x01], -268_435_456),
        ];

        for (input, expected) in test_cases {
            let mut parser = Parser::new(&input);
            assert_eq!(parser.read_compressed_int().unwrap(), expected, "{input:02x?}");
        }
    }

    #[test]
    fn compressed_uint_round_trip() {
        let mut values: Vec<u32> = (0..=0x200).collect();
        values.extend([0x3FFE, 0x3FFF, 0x4000, 0x4001, 0x12_3456, 0x1FFF_FFFE, MAX_COMPRESSED_UINT]);
        values.extend((0..29).map(|shift| 1_u32 << shift));

        for value in values {
            let mut encoded = Vec::new();
            compress_uint(value, &mut encoded).unwrap();

            let expected_len = match value {
                0..=0x7F => 1,
                0x80..=0x3FFF => 2,
                _ => 4,
            };
            assert_eq!(encoded.len(), expected_len, "width of {value:#x}");

            let mut parser = Parser::new(&encoded);
            assert_eq!(parser.read_compressed_uint().unwrap(), value);
        }

        assert!(compress_uint(MAX_COMPRESSED_UINT + 1, &mut Vec::new()).is_err());
    }

    #[test]
    fn compressed_int_round_trip() {
        for value in [
            0,
            1,
            -1,
            63,
            -64,
            64,
            -65,
            8191,
            -8192,
            8192,
            -8193,
            0x0FFF_FFFF,
            -0x1000_0000,
        ] {
            let mut encoded = Vec::new();
            compress_int(value, &mut encoded).unwrap();

            let mut parser = Parser::new(&encoded);
            assert_eq!(parser.read_compressed_int().unwrap(), value);
        }

        assert!(compress_int(0x1000_0000, &mut Vec::new()).is_err());
    }

    #[test]
    fn test_read_compressed_token() {
        let mut parser = Parser::new(&[0x49]);
        assert_eq!(parser.read_compressed_token().unwrap(), Token::new(0x0100_0012));

        let mut parser = Parser::new(&[0x08]);
        assert_eq!(parser.read_compressed_token().unwrap(), Token::new(0x0200_0002));

        let mut parser = Parser::new(&[0x03]);
        assert!(parser.read_compressed_token().is_err());
    }

    #[test]
    fn test_parse_string() {
        let data = b"Hello\0World";
        let mut parser = Parser::new(data);
        assert_eq!(parser.read_string_utf8().unwrap(), "Hello");
        assert_eq!(parser.read_string_utf8().unwrap(), "World");
        assert!(!parser.has_more_data());
    }

    #[test]
    fn test_error_handling() {
        let mut parser = Parser::new(&[0xFF]);
        assert!(parser.read_compressed_uint().is_err());

        let mut parser = Parser::new(&[0xC0, 0x00]);
        assert!(matches!(
            parser.read_compressed_uint(),
            Err(crate::Error::UnexpectedEndOfData)
        ));

        let mut parser = Parser::new(&[0x01, 0x02]);
        assert!(parser.advance_by(3).is_err());
        assert_eq!(parser.pos(), 0);
        assert!(parser.read_bytes(2).is_ok());
        assert!(parser.peek_byte().is_err());
    }
}
