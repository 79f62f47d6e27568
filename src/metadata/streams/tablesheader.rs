//! Header of the `#~` / `#-` table stream.
//!
//! The stream starts with a fixed 24-byte header, followed by one row count for every table
//! whose bit is set in `valid`, an optional extra 4-byte word, and then the table data itself:
//! the tables are stored back to back in [`TableId`] order.
//!
//! ```text
//! 0   Reserved      u32
//! 4   MajorVersion  u8
//! 5   MinorVersion  u8
//! 6   HeapSizes     u8
//! 7   Reserved      u8
//! 8   Valid         u64
//! 16  Sorted        u64
//! 24  Rows          u32 * popcount(Valid)
//! ..  [ExtraData    u32]   (HeapSizes & 0x40)
//! ..  Tables
//! ```
//!
//! # Reference
//! - [ECMA-335 II.24.2.6](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)

use std::sync::Arc;

use strum::{EnumCount, IntoEnumIterator};

use crate::{
    file::io::{read_le, read_le_at},
    metadata::tables::{MetadataTable, RowReadable, TableId, TableInfo, TableInfoRef},
    Result,
};

/// `HeapSizes` flag: a 4-byte word follows the row counts
const HEAP_EXTRA_DATA: u8 = 0x40;

/// The decoded header of the table stream together with the location of every table.
///
/// The header does not borrow the stream; tables are handed out by passing the stream bytes
/// back into [`TablesHeader::table`].
#[derive(Debug, Clone)]
pub struct TablesHeader {
    /// Major version of the table schema, 2 for all known images
    pub major_version: u8,
    /// Minor version of the table schema
    pub minor_version: u8,
    /// `HeapSizes` flags
    pub heap_sizes: u8,
    /// Bit vector of present tables
    pub valid: u64,
    /// Bit vector of sorted tables
    pub sorted: u64,
    /// Row counts and column widths
    pub info: TableInfoRef,
    offsets: Vec<usize>,
    size: usize,
}

impl TablesHeader {
    /// Parse the table stream header and compute the offset of every table
    ///
    /// # Errors
    /// Returns [`crate::Error::MalformedImage`] if `valid` names a table that does not exist,
    /// or [`crate::Error::UnexpectedEndOfData`] if the row counts or the table data are
    /// truncated.
    pub fn from(data: &[u8]) -> Result<TablesHeader> {
        if data.len() < 24 {
            return Err(out_of_bounds_error!());
        }

        let major_version = read_le::<u8>(&data[4..])?;
        let minor_version = read_le::<u8>(&data[5..])?;
        let heap_sizes = read_le::<u8>(&data[6..])?;
        let valid = read_le::<u64>(&data[8..])?;
        let sorted = read_le::<u64>(&data[16..])?;

        if valid >> TableId::COUNT != 0 {
            return Err(malformed_error!(
                "Valid bit vector 0x{:016x} names unknown tables",
                valid
            ));
        }

        let mut rows = vec![0_u32; TableId::COUNT];
        let mut offset = 24_usize;
        for table_id in TableId::iter() {
            if valid & (1_u64 << table_id as u8) != 0 {
                rows[table_id as usize] = read_le_at::<u32>(data, &mut offset)?;
            }
        }

        if heap_sizes & HEAP_EXTRA_DATA != 0 {
            read_le_at::<u32>(data, &mut offset)?;
        }

        let info = TableInfo::new(&rows, heap_sizes);

        let mut offsets = vec![0_usize; TableId::COUNT];
        for table_id in TableId::iter() {
            offsets[table_id as usize] = offset;

            let table_size = u64::from(info.rows(table_id)) * u64::from(info.row_size(table_id));
            let Some(end) = usize::try_from(table_size)
                .ok()
                .and_then(|size| offset.checked_add(size))
            else {
                return Err(out_of_bounds_error!());
            };
            offset = end;
        }

        if offset > data.len() {
            return Err(out_of_bounds_error!());
        }

        Ok(TablesHeader {
            major_version,
            minor_version,
            heap_sizes,
            valid,
            sorted,
            info: Arc::new(info),
            offsets,
            size: offset,
        })
    }

    /// Number of tables present in the stream
    #[must_use]
    pub fn table_count(&self) -> u32 {
        self.valid.count_ones()
    }

    /// Number of rows of a table, 0 for absent tables
    #[must_use]
    pub fn row_count(&self, id: TableId) -> u32 {
        self.info.rows(id)
    }

    /// Returns true if the table has at least one row
    #[must_use]
    pub fn has_table(&self, id: TableId) -> bool {
        self.info.rows(id) > 0
    }

    /// Number of bytes of the stream covered by the header and the tables
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    /// A typed view of the table holding `T` rows, or `None` if it has no rows
    ///
    /// `data` must be the same stream this header was parsed from.
    ///
    /// # Errors
    /// Returns [`crate::Error::UnexpectedEndOfData`] if `data` is shorter than the stream
    /// described by the header.
    pub fn table<'a, T: RowReadable>(&self, data: &'a [u8]) -> Result<Option<MetadataTable<'a, T>>> {
        let row_count = self.info.rows(T::TABLE_ID);
        if row_count == 0 {
            return Ok(None);
        }

        let offset = self.offsets[T::TABLE_ID as usize];
        if offset > data.len() {
            return Err(out_of_bounds_error!());
        }

        Ok(Some(MetadataTable::new(
            &data[offset..],
            row_count,
            self.info.clone(),
        )?))
    }
}
