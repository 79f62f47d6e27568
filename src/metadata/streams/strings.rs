//! The `#Strings` heap.
//!
//! # Reference
//! - [ECMA-335 II.24.2.3](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)

use std::{ffi::CStr, str};

use crate::Result;

/// '#Strings' holds the identifiers referenced from the metadata tables: type, member,
/// namespace and parameter names. Entries are UTF-8 and NUL-terminated; offset 0 is always
/// the empty string.
///
/// # Examples
///
/// ```rust
/// use cildiff::metadata::streams::Strings;
/// let data = &[0u8, b'H', b'e', b'l', b'l', b'o', 0u8];
/// let strings = Strings::from(data)?;
/// assert_eq!(strings.get(1)?, "Hello");
/// assert_eq!(strings.get(3)?, "llo");
/// # Ok::<(), cildiff::Error>(())
/// ```
#[derive(Clone, Copy)]
pub struct Strings<'a> {
    data: &'a [u8],
}

impl<'a> Strings<'a> {
    /// Wrap heap bytes that were already accepted by [`Strings::from`]
    pub(crate) fn view(data: &'a [u8]) -> Strings<'a> {
        Strings { data }
    }

    /// Create a `Strings` object from a sequence of bytes
    ///
    /// An absent heap is represented by an empty slice.
    ///
    /// # Errors
    /// Returns [`crate::Error::MalformedImage`] if a non-empty heap does not start with NUL
    pub fn from(data: &'a [u8]) -> Result<Strings<'a>> {
        if !data.is_empty() && data[0] != 0 {
            return Err(malformed_error!("Invalid #Strings heap - first byte must be 0"));
        }

        Ok(Strings { data })
    }

    /// Get the string starting at `index`
    ///
    /// # Errors
    /// Returns [`crate::Error::UnexpectedEndOfData`] if `index` is past the heap, or
    /// [`crate::Error::MalformedImage`] if the entry is unterminated or not UTF-8
    pub fn get(&self, index: usize) -> Result<&'a str> {
        if index == 0 {
            return Ok("");
        }

        if index >= self.data.len() {
            return Err(out_of_bounds_error!());
        }

        match CStr::from_bytes_until_nul(&self.data[index..]) {
            Ok(result) => match result.to_str() {
                Ok(result) => Ok(result),
                Err(_) => Err(malformed_error!("Invalid string at index - {}", index)),
            },
            Err(_) => Err(malformed_error!("Unterminated string at index - {}", index)),
        }
    }

    /// Size of the heap in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the heap is absent or empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn crafted() {
        #[rustfmt::skip]
        let data : [u8; 47] = [
            0x00,
            0x3c, 0x4d, 0x61, 0x69, 0x6e, 0x3e, 0x24, 0x00,
            0x43, 0x5f, 0x53, 0x68, 0x61, 0x72, 0x70, 0x5f, 0x50, 0x4f, 0x43, 0x5f, 0x31, 0x00,
            0x3c, 0x4d, 0x6f, 0x64, 0x75, 0x6c, 0x65, 0x3e, 0x00,
            0x53, 0x79, 0x73, 0x74, 0x65, 0x6d, 0x2e, 0x43, 0x6f, 0x6e, 0x73, 0x6f, 0x6c, 0x65, 0x00,
        ];

        let str_view = Strings::from(&data).unwrap();

        assert_eq!(str_view.get(0).unwrap(), "");
        assert_eq!(str_view.get(1).unwrap(), "<Main>$");
        assert_eq!(str_view.get(9).unwrap(), "C_Sharp_POC_1");
        assert_eq!(str_view.get(23).unwrap(), "<Module>");
        assert_eq!(str_view.get(32).unwrap(), "System.Console");
        assert_eq!(str_view.get(39).unwrap(), "Console");
    }

    #[test]
    fn invalid() {
        assert!(Strings::from(&[0x41, 0x00]).is_err());

        let strings = Strings::from(&[0x00, 0x41, 0x42]).unwrap();
        assert!(matches!(strings.get(1), Err(Error::MalformedImage { .. })));
        assert!(matches!(strings.get(3), Err(Error::UnexpectedEndOfData)));

        let strings = Strings::from(&[0x00, 0xFF, 0x00]).unwrap();
        assert!(strings.get(1).is_err());

        let absent = Strings::from(&[]).unwrap();
        assert!(absent.is_empty());
        assert_eq!(absent.get(0).unwrap(), "");
    }
}
