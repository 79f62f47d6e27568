//! Stream headers of the metadata root.
//!
//! # Reference
//! - [ECMA-335 II.24.2.2](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)

use crate::{file::io::read_le, Result};

/// Longest stream name the format allows, including the terminating NUL
const MAX_NAME_LEN: usize = 32;

/// A stream header names a heap or the table stream and locates it relative to the metadata
/// root. The header has no fixed length: the name is NUL-terminated and padded to a 4-byte
/// boundary.
///
/// # Examples
///
/// ```rust
/// use cildiff::metadata::streams::StreamHeader;
/// let header = StreamHeader::from(&[0x6C, 0, 0, 0, 0xA4, 0x45, 0, 0, b'#', b'~', 0, 0])?;
/// assert_eq!(header.name, "#~");
/// assert_eq!(header.encoded_len(), 12);
/// # Ok::<(), cildiff::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamHeader {
    /// Offset of the stream from the start of the metadata root
    pub offset: u32,
    /// Size of this stream in bytes
    pub size: u32,
    /// Name of the stream
    pub name: String,
}

impl StreamHeader {
    /// Read a stream header from the start of `data`
    ///
    /// # Errors
    /// Returns [`crate::Error::UnexpectedEndOfData`] if the header is truncated, or
    /// [`crate::Error::MalformedImage`] if the name is not terminated within 32 bytes or is not
    /// ASCII.
    pub fn from(data: &[u8]) -> Result<StreamHeader> {
        if data.len() < 9 {
            return Err(out_of_bounds_error!());
        }

        let name_area = &data[8..data.len().min(8 + MAX_NAME_LEN)];
        let Some(name_len) = name_area.iter().position(|b| *b == 0) else {
            return Err(malformed_error!("Stream name is not terminated"));
        };

        let name_bytes = &name_area[..name_len];
        if name_bytes.is_empty() || !name_bytes.is_ascii() {
            return Err(malformed_error!("Invalid stream header name"));
        }

        Ok(StreamHeader {
            offset: read_le::<u32>(data)?,
            size: read_le::<u32>(&data[4..])?,
            name: String::from_utf8_lossy(name_bytes).into_owned(),
        })
    }

    /// Number of bytes this header occupies, including name padding
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        8 + ((self.name.len() + 1 + 3) & !3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crafted() {
        #[rustfmt::skip]
        let header_bytes = [
            0x6C, 0x00, 0x00, 0x00,
            0xA4, 0x45, 0x00, 0x00,
            0x23, 0x53, 0x74, 0x72, 0x69, 0x6E, 0x67, 0x73, 0x00, 0x00, 0x00, 0x00,
        ];

        let parsed_header = StreamHeader::from(&header_bytes).unwrap();

        assert_eq!(parsed_header.offset, 0x6C);
        assert_eq!(parsed_header.size, 0x45A4);
        assert_eq!(parsed_header.name, "#Strings");
        assert_eq!(parsed_header.encoded_len(), 20);
    }

    #[test]
    fn crafted_invalid() {
        #[rustfmt::skip]
        let unterminated = [
            0x6C, 0x00, 0x00, 0x00,
            0xA4, 0x45, 0x00, 0x00,
            0x23, 0x7E,
        ];
        assert!(StreamHeader::from(&unterminated).is_err());

        let empty_name = [0x6C, 0x00, 0x00, 0x00, 0xA4, 0x45, 0x00, 0x00, 0x00];
        assert!(StreamHeader::from(&empty_name).is_err());

        assert!(StreamHeader::from(&[0x6C, 0x00]).is_err());
    }
}
