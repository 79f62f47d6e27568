//! ECMA-335 metadata: headers, heaps, tables and the declaration graph built on top of them.
//!
//! # Architecture
//!
//! - [`Metadata`] owns a loaded [`crate::file::File`], validates the CLI header and the
//!   metadata root, and hands out borrowed views of the heaps and tables.
//! - [`graph::ModuleGraph`] resolves table rows into declaration entities (types, methods,
//!   fields, ...) and memoizes them per token.
//! - [`signatures`] decodes signature blobs; [`typesystem`] turns them into comparable type
//!   expressions.
//!
//! # Example
//!
//! ```rust,no_run
//! use cildiff::metadata::Metadata;
//! use std::path::Path;
//!
//! let metadata = Metadata::from_file(Path::new("MyLibrary.dll"))?;
//! println!("Runtime: {}", metadata.root().version);
//! println!("Tables: {}", metadata.tables_header().table_count());
//! # Ok::<(), cildiff::Error>(())
//! ```

pub mod cor20header;
pub mod graph;
pub mod root;
pub mod signatures;
pub mod streams;
pub mod tables;
/// Metadata tokens: table id and row index packed into one `u32`
pub mod token;
pub mod typesystem;

use std::{ops::Range, path::Path};

use tracing::debug;

use crate::{
    file::{image::DataDirectory, File},
    metadata::{
        cor20header::Cor20Header,
        root::Root,
        streams::{Blob, Guid, Strings, TablesHeader, UserStrings},
        tables::{MetadataTable, RowReadable},
    },
    Result,
};

/// A managed image with its metadata located and validated.
///
/// The heaps and the table stream are validated once while loading; the accessors then build
/// cheap borrowed views on demand.
pub struct Metadata {
    file: File,
    cor20: Cor20Header,
    root: Root,
    tables: TablesHeader,
    tables_range: Range<usize>,
    strings_range: Range<usize>,
    blob_range: Range<usize>,
    guid_range: Range<usize>,
    userstrings_range: Range<usize>,
    uncompressed: bool,
}

impl Metadata {
    /// Load and validate the metadata of the image at `path`.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the file cannot be read, or a parse error if the
    /// image or its metadata is malformed.
    pub fn from_file(path: &Path) -> Result<Metadata> {
        Self::load(File::from_file(path)?)
    }

    /// Load and validate the metadata of an in-memory image.
    ///
    /// # Errors
    /// Returns a parse error if the image or its metadata is malformed.
    pub fn from_mem(data: Vec<u8>) -> Result<Metadata> {
        Self::load(File::from_mem(data)?)
    }

    /// Locate and validate the metadata of an already loaded image.
    ///
    /// # Errors
    /// Returns [`crate::Error::MalformedImage`] if the CLI header, the metadata root or one of
    /// the streams is invalid, and [`crate::Error::UnexpectedEndOfData`] if any of them is
    /// truncated.
    pub fn load(file: File) -> Result<Metadata> {
        let cor20 = Cor20Header::read(file.directory_data(file.clr())?)?;

        let metadata_range = file.image().directory_range(DataDirectory {
            virtual_address: cor20.meta_data_rva,
            size: cor20.meta_data_size,
        })?;
        let metadata = file.data_slice(metadata_range.start, metadata_range.len())?;
        let root = Root::read(metadata)?;

        let locate = |name: &str| -> Option<Range<usize>> {
            root.stream(name).map(|stream| {
                let start = metadata_range.start + stream.offset as usize;
                start..start + stream.size as usize
            })
        };

        let (tables_range, uncompressed) = match (locate("#~"), locate("#-")) {
            (Some(range), None) => (range, false),
            (None, Some(range)) => (range, true),
            (Some(_), Some(_)) => {
                return Err(malformed_error!("Image has both '#~' and '#-' streams"))
            }
            (None, None) => return Err(malformed_error!("Image has no table stream")),
        };

        let empty = metadata_range.start..metadata_range.start;
        let strings_range = locate("#Strings").unwrap_or_else(|| empty.clone());
        let blob_range = locate("#Blob").unwrap_or_else(|| empty.clone());
        let guid_range = locate("#GUID").unwrap_or_else(|| empty.clone());
        let userstrings_range = locate("#US").unwrap_or(empty);

        let data = file.data();
        Strings::from(&data[strings_range.clone()])?;
        Blob::from(&data[blob_range.clone()])?;
        Guid::from(&data[guid_range.clone()])?;
        UserStrings::from(&data[userstrings_range.clone()])?;
        let tables = TablesHeader::from(&data[tables_range.clone()])?;

        debug!(
            version = %root.version,
            tables = tables.table_count(),
            strings = strings_range.len(),
            blob = blob_range.len(),
            guid = guid_range.len(),
            uncompressed,
            "loaded metadata"
        );

        Ok(Metadata {
            file,
            cor20,
            root,
            tables,
            tables_range,
            strings_range,
            blob_range,
            guid_range,
            userstrings_range,
            uncompressed,
        })
    }

    /// The underlying image
    #[must_use]
    pub fn file(&self) -> &File {
        &self.file
    }

    /// The CLI header
    #[must_use]
    pub fn cor20(&self) -> &Cor20Header {
        &self.cor20
    }

    /// The metadata root
    #[must_use]
    pub fn root(&self) -> &Root {
        &self.root
    }

    /// The header of the table stream
    #[must_use]
    pub fn tables_header(&self) -> &TablesHeader {
        &self.tables
    }

    /// Returns true if the tables are stored in an uncompressed `#-` stream
    #[must_use]
    pub fn is_uncompressed(&self) -> bool {
        self.uncompressed
    }

    /// The `#Strings` heap
    #[must_use]
    pub fn strings(&self) -> Strings<'_> {
        Strings::view(&self.file.data()[self.strings_range.clone()])
    }

    /// The `#Blob` heap
    #[must_use]
    pub fn blobs(&self) -> Blob<'_> {
        Blob::view(&self.file.data()[self.blob_range.clone()])
    }

    /// The `#GUID` heap
    #[must_use]
    pub fn guids(&self) -> Guid<'_> {
        Guid::view(&self.file.data()[self.guid_range.clone()])
    }

    /// The `#US` heap
    #[must_use]
    pub fn userstrings(&self) -> UserStrings<'_> {
        UserStrings::view(&self.file.data()[self.userstrings_range.clone()])
    }

    /// A typed view of the table holding `T` rows, or `None` if the table has no rows
    ///
    /// # Errors
    /// Returns an error if the table data is truncated.
    pub fn table<T: RowReadable>(&self) -> Result<Option<MetadataTable<'_, T>>> {
        self.tables
            .table::<T>(&self.file.data()[self.tables_range.clone()])
    }
}
