//! The `#US` heap.
//!
//! # Reference
//! - [ECMA-335 II.24.2.4](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)

use widestring::U16String;

use crate::{file::parser::Parser, Result};

/// '#US' holds the string literals of the method bodies (`ldstr`). Every entry is a blob whose
/// content is UTF-16LE code units followed by a single flag byte, which is set when any
/// character needs special handling beyond plain ASCII.
///
/// # Examples
///
/// ```rust
/// use cildiff::metadata::streams::UserStrings;
/// let data = &[0u8, 0x03, 0x41, 0x00, 0x00];
/// let us = UserStrings::from(data)?;
/// assert_eq!(us.get(1)?.to_string_lossy(), "A");
/// # Ok::<(), cildiff::Error>(())
/// ```
#[derive(Clone, Copy)]
pub struct UserStrings<'a> {
    data: &'a [u8],
}

impl<'a> UserStrings<'a> {
    /// Wrap heap bytes that were already accepted by [`UserStrings::from`]
    pub(crate) fn view(data: &'a [u8]) -> UserStrings<'a> {
        UserStrings { data }
    }

    /// Create a `UserStrings` object from a sequence of bytes
    ///
    /// # Errors
    /// Returns [`crate::Error::MalformedImage`] if a non-empty heap does not start with NUL
    pub fn from(data: &'a [u8]) -> Result<UserStrings<'a>> {
        if !data.is_empty() && data[0] != 0 {
            return Err(malformed_error!("Invalid #US heap - first byte must be 0"));
        }

        Ok(UserStrings { data })
    }

    /// Decode the string literal starting at `index`
    ///
    /// # Errors
    /// Returns [`crate::Error::UnexpectedEndOfData`] if the entry runs past the heap, or
    /// [`crate::Error::MalformedImage`] if its length is not `2n + 1`
    pub fn get(&self, index: usize) -> Result<U16String> {
        if index == 0 {
            return Ok(U16String::new());
        }

        if index >= self.data.len() {
            return Err(out_of_bounds_error!());
        }

        let mut parser = Parser::new(&self.data[index..]);
        let len = parser.read_compressed_uint()? as usize;
        if len == 0 {
            return Ok(U16String::new());
        }

        if len % 2 != 1 {
            return Err(malformed_error!(
                "Invalid user string length {} at index - {}",
                len,
                index
            ));
        }

        let bytes = parser.read_bytes(len - 1)?;
        let units: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();

        Ok(U16String::from_vec(units))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crafted() {
        #[rustfmt::skip]
        let data: [u8; 29] = [
            0x00, 0x1b, 0x48, 0x00, 0x65, 0x00, 0x6c, 0x00, 0x6c, 0x00, 0x6f, 0x00, 0x2c, 0x00, 0x20,
            0x00, 0x57, 0x00, 0x6f, 0x00, 0x72, 0x00, 0x6c, 0x00, 0x64, 0x00, 0x21, 0x00, 0x00,
        ];

        let us_str = UserStrings::from(&data).unwrap();

        assert_eq!(us_str.get(1).unwrap().to_string_lossy(), "Hello, World!");
        assert!(us_str.get(0).unwrap().is_empty());
    }

    #[test]
    fn invalid() {
        assert!(UserStrings::from(&[0x22, 0x01]).is_err());

        let even_length = UserStrings::from(&[0x00, 0x02, 0x41, 0x00]).unwrap();
        assert!(even_length.get(1).is_err());

        let truncated = UserStrings::from(&[0x00, 0x05, 0x41, 0x00]).unwrap();
        assert!(truncated.get(1).is_err());
    }
}
