//! Typed, zero-copy view over one metadata table.

use std::marker::PhantomData;

use crate::{
    metadata::tables::{TableId, TableInfo, TableInfoRef},
    Result,
};

/// A row type that can be decoded from the raw bytes of its table.
pub trait RowReadable: Sized {
    /// The table this row type belongs to
    const TABLE_ID: TableId;

    /// Size of one row in bytes, following the column layout of [`Self::TABLE_ID`]
    fn row_size(sizes: &TableInfo) -> u32 {
        sizes.row_size(Self::TABLE_ID)
    }

    /// Decode the row at `offset`, advancing `offset` past it.
    ///
    /// # Errors
    /// Returns an error if the data is truncated or a coded index is invalid.
    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self>;
}

/// A table of `T` rows backed by the bytes of the `#~` stream.
pub struct MetadataTable<'a, T> {
    data: &'a [u8],
    row_count: u32,
    row_size: u32,
    sizes: TableInfoRef,
    _phantom: PhantomData<T>,
}

impl<'a, T: RowReadable> MetadataTable<'a, T> {
    /// Create a table view over `data`, which starts at the first row.
    ///
    /// # Errors
    /// Returns [`crate::Error::UnexpectedEndOfData`] if `data` is shorter than
    /// `row_count * row_size`.
    pub fn new(data: &'a [u8], row_count: u32, sizes: TableInfoRef) -> Result<Self> {
        let row_size = T::row_size(&sizes);
        let Some(size) = (row_count as usize).checked_mul(row_size as usize) else {
            return Err(out_of_bounds_error!());
        };

        if size > data.len() {
            return Err(out_of_bounds_error!());
        }

        Ok(MetadataTable {
            data: &data[..size],
            row_count,
            row_size,
            sizes,
            _phantom: PhantomData,
        })
    }

    /// Total size of the table in bytes
    #[must_use]
    pub fn size(&self) -> u64 {
        u64::from(self.row_count) * u64::from(self.row_size)
    }

    /// Size of one row in bytes
    #[must_use]
    pub fn row_size(&self) -> u32 {
        self.row_size
    }

    /// Number of rows
    #[must_use]
    pub fn row_count(&self) -> u32 {
        self.row_count
    }

    /// Decode the row with the 1-based index `rid`.
    ///
    /// # Errors
    /// Returns [`crate::Error::UnresolvedToken`] if `rid` is 0 or past the end of the table,
    /// or a decoding error for a damaged row.
    pub fn get(&self, rid: u32) -> Result<T> {
        if rid == 0 || rid > self.row_count {
            return Err(crate::Error::UnresolvedToken(
                crate::metadata::token::Token::from_parts(T::TABLE_ID as u8, rid),
            ));
        }

        T::row_read(
            self.data,
            &mut ((rid as usize - 1) * self.row_size as usize),
            rid,
            &self.sizes,
        )
    }

    /// Iterate over all rows in order. Iteration stops at the first row that fails to decode.
    #[must_use]
    pub fn iter(&self) -> TableIterator<'a, T> {
        TableIterator {
            data: self.data,
            sizes: self.sizes.clone(),
            row_count: self.row_count,
            current_row: 0,
            current_offset: 0,
            _phantom: PhantomData,
        }
    }
}

impl<'a, T: RowReadable> IntoIterator for &MetadataTable<'a, T> {
    type Item = T;
    type IntoIter = TableIterator<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Sequential iterator over the rows of a [`MetadataTable`]
pub struct TableIterator<'a, T> {
    data: &'a [u8],
    sizes: TableInfoRef,
    row_count: u32,
    current_row: u32,
    current_offset: usize,
    _phantom: PhantomData<T>,
}

impl<T: RowReadable> Iterator for TableIterator<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current_row >= self.row_count {
            return None;
        }

        match T::row_read(
            self.data,
            &mut self.current_offset,
            self.current_row + 1,
            &self.sizes,
        ) {
            Ok(row) => {
                self.current_row += 1;
                Some(row)
            }
            Err(_) => None,
        }
    }
}
