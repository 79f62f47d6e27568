//! Metadata tables of the `#~` / `#-` stream.
//!
//! # Key Components
//!
//! - [`TableId`] and [`Column`] - Table identifiers and their column layouts
//! - [`TableInfo`] - Row counts and the resulting heap, table and coded index widths
//! - [`CodedIndex`] and [`CodedIndexType`] - References that may target one of several tables
//! - [`MetadataTable`] and [`RowReadable`] - Typed, zero-copy row access
//! - [`rows`] - The decoded row types
//!
//! # Example
//!
//! ```rust,no_run
//! use cildiff::metadata::{Metadata, tables::TypeDefRaw};
//! use std::path::Path;
//!
//! let metadata = Metadata::from_file(Path::new("MyLibrary.dll"))?;
//! if let Some(types) = metadata.table::<TypeDefRaw>()? {
//!     for row in types.iter() {
//!         println!("{} {}", row.token, metadata.strings().get(row.type_name as usize)?);
//!     }
//! }
//! # Ok::<(), cildiff::Error>(())
//! ```
//!
//! # Reference
//! - [ECMA-335 II.22, II.24.2.6](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)

mod codedindex;
pub mod rows;
mod table;
mod tableid;
mod tableinfo;

pub use codedindex::{CodedIndex, CodedIndexType};
pub use rows::*;
pub use table::{MetadataTable, RowReadable, TableIterator};
pub use tableid::{Column, TableId};
pub use tableinfo::{TableInfo, TableInfoRef, HEAP_LARGE_BLOB, HEAP_LARGE_GUID, HEAP_LARGE_STRINGS};
