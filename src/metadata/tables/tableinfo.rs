//! Row counts and index widths of the tables in one `#~` stream.
//!
//! [`TableInfo`] answers every "how wide is this column" question: heap indices are 2 or 4 bytes
//! according to the `HeapSizes` flags, plain table indices are 4 bytes once the target table
//! has more than 65535 rows, and coded indices are 4 bytes once the largest candidate table no
//! longer fits next to the tag bits in 16 bits.

use std::sync::Arc;

use strum::{EnumCount, IntoEnumIterator};

use crate::{
    metadata::tables::{CodedIndex, CodedIndexType, Column, TableId},
    Result,
};

/// `HeapSizes` flag: `#Strings` indices are 4 bytes
pub const HEAP_LARGE_STRINGS: u8 = 0x01;
/// `HeapSizes` flag: `#GUID` indices are 4 bytes
pub const HEAP_LARGE_GUID: u8 = 0x02;
/// `HeapSizes` flag: `#Blob` indices are 4 bytes
pub const HEAP_LARGE_BLOB: u8 = 0x04;

/// Table sizes and the derived column widths of one metadata image.
#[derive(Clone, Debug, Default)]
pub struct TableInfo {
    rows: Vec<u32>,
    coded_index_bytes: Vec<u8>,
    is_large_index_str: bool,
    is_large_index_guid: bool,
    is_large_index_blob: bool,
}

/// Shared reference to a [`TableInfo`]
pub type TableInfoRef = Arc<TableInfo>;

impl TableInfo {
    /// Build the table information from the per-table row counts and the `HeapSizes` byte.
    ///
    /// `rows` is indexed by [`TableId`]; missing entries count as empty tables.
    #[must_use]
    pub fn new(rows: &[u32], heap_sizes: u8) -> Self {
        let mut table_rows = vec![0_u32; TableId::COUNT];
        for (slot, count) in table_rows.iter_mut().zip(rows) {
            *slot = *count;
        }

        let mut table_info = TableInfo {
            rows: table_rows,
            coded_index_bytes: vec![2; CodedIndexType::COUNT],
            is_large_index_str: heap_sizes & HEAP_LARGE_STRINGS != 0,
            is_large_index_guid: heap_sizes & HEAP_LARGE_GUID != 0,
            is_large_index_blob: heap_sizes & HEAP_LARGE_BLOB != 0,
        };

        table_info.calculate_coded_index_bytes();
        table_info
    }

    /// Build table information for unit tests from a sparse list of row counts.
    #[cfg(test)]
    pub fn new_test(
        valid_tables: &[(TableId, u32)],
        large_str: bool,
        large_blob: bool,
        large_guid: bool,
    ) -> Self {
        let mut rows = vec![0_u32; TableId::COUNT];
        for (id, count) in valid_tables {
            rows[*id as usize] = *count;
        }

        let mut heap_sizes = 0;
        if large_str {
            heap_sizes |= HEAP_LARGE_STRINGS;
        }
        if large_guid {
            heap_sizes |= HEAP_LARGE_GUID;
        }
        if large_blob {
            heap_sizes |= HEAP_LARGE_BLOB;
        }

        TableInfo::new(&rows, heap_sizes)
    }

    fn calculate_coded_index_bytes(&mut self) {
        for ci_type in CodedIndexType::iter() {
            let max_rows = ci_type
                .tables()
                .iter()
                .flatten()
                .map(|table| self.rows[*table as usize])
                .max()
                .unwrap_or(0);

            let limit = 1_u32 << (16 - ci_type.tag_bits());
            self.coded_index_bytes[ci_type as usize] = if max_rows < limit { 2 } else { 4 };
        }
    }

    /// Split a raw coded index value into table and row.
    ///
    /// # Errors
    /// Returns [`crate::Error::MalformedImage`] if the tag names no table.
    pub fn decode_coded_index(&self, value: u32, ci_type: CodedIndexType) -> Result<CodedIndex> {
        let tag_bits = ci_type.tag_bits();
        let tag = value & ((1 << tag_bits) - 1);
        let row = value >> tag_bits;

        match ci_type.tables().get(tag as usize) {
            Some(Some(table)) => Ok(CodedIndex::new(*table, row)),
            _ => Err(malformed_error!(
                "Invalid tag {} for coded index {:?}",
                tag,
                ci_type
            )),
        }
    }

    /// Number of rows in a table
    #[must_use]
    pub fn rows(&self, id: TableId) -> u32 {
        self.rows[id as usize]
    }

    /// Returns true if indices into `id` need 4 bytes
    #[must_use]
    pub fn is_large(&self, id: TableId) -> bool {
        self.rows[id as usize] > u32::from(u16::MAX)
    }

    /// Returns true if `#Strings` indices need 4 bytes
    #[must_use]
    pub fn is_large_str(&self) -> bool {
        self.is_large_index_str
    }

    /// Returns true if `#GUID` indices need 4 bytes
    #[must_use]
    pub fn is_large_guid(&self) -> bool {
        self.is_large_index_guid
    }

    /// Returns true if `#Blob` indices need 4 bytes
    #[must_use]
    pub fn is_large_blob(&self) -> bool {
        self.is_large_index_blob
    }

    /// Width of a `#Strings` index
    #[must_use]
    pub fn str_bytes(&self) -> u8 {
        if self.is_large_index_str {
            4
        } else {
            2
        }
    }

    /// Width of a `#GUID` index
    #[must_use]
    pub fn guid_bytes(&self) -> u8 {
        if self.is_large_index_guid {
            4
        } else {
            2
        }
    }

    /// Width of a `#Blob` index
    #[must_use]
    pub fn blob_bytes(&self) -> u8 {
        if self.is_large_index_blob {
            4
        } else {
            2
        }
    }

    /// Width of a plain index into `id`
    #[must_use]
    pub fn table_index_bytes(&self, id: TableId) -> u8 {
        if self.is_large(id) {
            4
        } else {
            2
        }
    }

    /// Width of a coded index of the given kind
    #[must_use]
    pub fn coded_index_bytes(&self, ci_type: CodedIndexType) -> u8 {
        self.coded_index_bytes[ci_type as usize]
    }

    /// Width of one column
    #[must_use]
    pub fn column_bytes(&self, column: Column) -> u8 {
        match column {
            Column::Fixed(bytes) => bytes,
            Column::Str => self.str_bytes(),
            Column::Guid => self.guid_bytes(),
            Column::Blob => self.blob_bytes(),
            Column::Table(id) => self.table_index_bytes(id),
            Column::Coded(ci_type) => self.coded_index_bytes(ci_type),
        }
    }

    /// Width of one row of `id`
    #[must_use]
    pub fn row_size(&self, id: TableId) -> u32 {
        id.columns()
            .iter()
            .map(|column| u32::from(self.column_bytes(*column)))
            .sum()
    }
}
