//! The `#GUID` heap.
//!
//! # Reference
//! - [ECMA-335 II.24.2.5](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)

use crate::Result;

const GUID_SIZE: usize = 16;

/// '#GUID' is a sequence of 128-bit GUIDs addressed by 1-based index; index 0 means "no GUID".
///
/// # Examples
///
/// ```rust
/// use cildiff::metadata::streams::Guid;
/// let data = [0xAAu8; 32];
/// let guids = Guid::from(&data)?;
/// assert_eq!(guids.get(2)?, uguid::guid!("AAAAAAAA-AAAA-AAAA-AAAA-AAAAAAAAAAAA"));
/// # Ok::<(), cildiff::Error>(())
/// ```
#[derive(Clone, Copy)]
pub struct Guid<'a> {
    data: &'a [u8],
}

impl<'a> Guid<'a> {
    /// Wrap heap bytes that were already accepted by [`Guid::from`]
    pub(crate) fn view(data: &'a [u8]) -> Guid<'a> {
        Guid { data }
    }

    /// Create a `Guid` object from a sequence of bytes
    ///
    /// # Errors
    /// Returns [`crate::Error::MalformedImage`] if the heap size is not a multiple of 16
    pub fn from(data: &'a [u8]) -> Result<Guid<'a>> {
        if data.len() % GUID_SIZE != 0 {
            return Err(malformed_error!(
                "Size of #GUID heap is not a multiple of 16 - {}",
                data.len()
            ));
        }

        Ok(Guid { data })
    }

    /// Returns the GUID at the 1-based `index`
    ///
    /// # Errors
    /// Returns [`crate::Error::UnexpectedEndOfData`] if `index` is 0 or past the heap
    pub fn get(&self, index: usize) -> Result<uguid::Guid> {
        if index == 0 || index * GUID_SIZE > self.data.len() {
            return Err(out_of_bounds_error!());
        }

        let offset_start = (index - 1) * GUID_SIZE;
        let mut buffer = [0u8; GUID_SIZE];
        buffer.copy_from_slice(&self.data[offset_start..offset_start + GUID_SIZE]);

        Ok(uguid::Guid::from_bytes(buffer))
    }

    /// Number of GUIDs in the heap
    #[must_use]
    pub fn count(&self) -> usize {
        self.data.len() / GUID_SIZE
    }
}
