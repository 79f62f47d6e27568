//! The `#Blob` heap.
//!
//! # Reference
//! - [ECMA-335 II.24.2.4](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)

use crate::{file::parser::Parser, Result};

/// '#Blob' holds signatures, constant values, public keys and custom attribute arguments. Each
/// entry is prefixed with its length in the compressed unsigned integer encoding:
///
/// * `0bbbbbbb` - length is `bbbbbbb`
/// * `10bbbbbb x` - length is `(bbbbbb << 8) + x`
/// * `110bbbbb x y z` - length is `(bbbbb << 24) + (x << 16) + (y << 8) + z`
///
/// # Examples
///
/// ```rust
/// use cildiff::metadata::streams::Blob;
/// let data = &[0u8, 0x03, 0x41, 0x42, 0x43];
/// let blob = Blob::from(data)?;
/// assert_eq!(blob.get(1)?, &[0x41, 0x42, 0x43]);
/// # Ok::<(), cildiff::Error>(())
/// ```
#[derive(Clone, Copy)]
pub struct Blob<'a> {
    data: &'a [u8],
}

impl<'a> Blob<'a> {
    /// Wrap heap bytes that were already accepted by [`Blob::from`]
    pub(crate) fn view(data: &'a [u8]) -> Blob<'a> {
        Blob { data }
    }

    /// Create a `Blob` object from a sequence of bytes
    ///
    /// An absent heap is represented by an empty slice.
    ///
    /// # Errors
    /// Returns [`crate::Error::MalformedImage`] if a non-empty heap does not start with NUL
    pub fn from(data: &'a [u8]) -> Result<Blob<'a>> {
        if !data.is_empty() && data[0] != 0 {
            return Err(malformed_error!("Invalid #Blob heap - first byte must be 0"));
        }

        Ok(Blob { data })
    }

    /// Get the blob starting at `index`, without its length prefix
    ///
    /// # Errors
    /// Returns [`crate::Error::UnexpectedEndOfData`] if the index or the encoded length runs
    /// past the end of the heap
    pub fn get(&self, index: usize) -> Result<&'a [u8]> {
        if index == 0 {
            return Ok(&[]);
        }

        if index >= self.data.len() {
            return Err(out_of_bounds_error!());
        }

        let mut parser = Parser::new(&self.data[index..]);
        let len = parser.read_compressed_uint()? as usize;
        let data_start = index + parser.pos();

        let Some(data_end) = data_start.checked_add(len) else {
            return Err(out_of_bounds_error!());
        };

        if data_end > self.data.len() {
            return Err(out_of_bounds_error!());
        }

        Ok(&self.data[data_start..data_end])
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
        let mut data = vec![0x00, 0x02, 0xAA, 0xBB, 0x80, 0x81];
        data.extend(std::iter::repeat(0xCC).take(0x81));
        data.extend([0x00]);

        let blob = Blob::from(&data).unwrap();
        assert_eq!(blob.get(0).unwrap(), &[] as &[u8]);
        assert_eq!(blob.get(1).unwrap(), &[0xAA, 0xBB]);

        let long = blob.get(4).unwrap();
        assert_eq!(long.len(), 0x81);
        assert!(long.iter().all(|b| *b == 0xCC));

        assert_eq!(blob.get(data.len() - 1).unwrap(), &[] as &[u8]);
    }

    #[test]
    fn invalid() {
        assert!(Blob::from(&[0x01]).is_err());

        let blob = Blob::from(&[0x00, 0x05, 0x01]).unwrap();
        assert!(matches!(blob.get(1), Err(Error::UnexpectedEndOfData)));
        assert!(matches!(blob.get(3), Err(Error::UnexpectedEndOfData)));
    }
}
