//! PE file abstraction.
//!
//! This module loads a binary module from disk or from memory, validates its PE headers and
//! exposes the pieces the metadata layer needs: the raw bytes, the section table, the data
//! directories and RVA translation.
//!
//! # Key Components
//!
//! ## Core Types
//! - [`crate::file::File`] - A loaded PE image with a CLI header
//! - [`crate::file::Backend`] - Trait for different data sources (disk files, memory buffers)
//!
//! ## Parsing Infrastructure
//! - [`crate::file::image`] - PE/COFF header reader
//! - [`crate::file::parser::Parser`] - Cursor over metadata bytes, compressed integers
//! - [`crate::file::io`] - Low-level little-endian reads
//!
//! # Examples
//!
//! ```rust,no_run
//! use cildiff::file::File;
//! use std::path::Path;
//!
//! let file = File::from_file(Path::new("MyLibrary.dll"))?;
//! println!("Loaded PE file with {} bytes", file.len());
//! println!("Number of sections: {}", file.sections().len());
//!
//! let clr = file.clr();
//! let clr_data = file.data_slice(file.rva_to_offset(clr.virtual_address)?, 72)?;
//! println!("CLI header starts with: {:02x?}", &clr_data[0..8]);
//! # Ok::<(), cildiff::Error>(())
//! ```

pub mod image;
pub mod io;
pub mod parser;

mod memory;
mod physical;

use std::path::Path;

use tracing::debug;

use crate::{
    file::image::{DataDirectory, DataDirectoryType, Image, SectionHeader},
    Error::{Empty, NotSupported},
    Result,
};
use memory::Memory;
use physical::Physical;

/// Storage behind a [`File`]: an owned buffer or a read-only file mapping.
pub trait Backend: Send + Sync {
    /// The complete image
    fn data(&self) -> &[u8];

    /// Size of the image in bytes
    fn len(&self) -> usize {
        self.data().len()
    }

    /// The `len` bytes at `offset`.
    ///
    /// # Errors
    /// Returns [`crate::Error::UnexpectedEndOfData`] if the range ends past the image.
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        offset
            .checked_add(len)
            .and_then(|end| self.data().get(offset..end))
            .ok_or_else(|| out_of_bounds_error!())
    }
}

/// A loaded PE image that carries a CLI header.
///
/// Loading validates the DOS and PE signatures, the optional header and the section table, and
/// rejects images without a CLI runtime header with [`crate::Error::NotSupported`].
pub struct File {
    data: Box<dyn Backend>,
    image: Image,
    clr: DataDirectory,
}

impl File {
    /// Loads a PE file from the given path.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::FileError`] if the file cannot be read, or a parse error if the
    /// image is malformed or not a managed image.
    pub fn from_file(file: &Path) -> Result<File> {
        let input = Physical::new(file)?;
        let loaded = Self::load(input)?;
        debug!(path = %file.display(), size = loaded.len(), "loaded image");
        Ok(loaded)
    }

    /// Loads a PE file from an owned buffer.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Empty`] for an empty buffer, or a parse error if the image is
    /// malformed or not a managed image.
    pub fn from_mem(data: Vec<u8>) -> Result<File> {
        let input = Memory::new(data);
        Self::load(input)
    }

    fn load<T: Backend + 'static>(data: T) -> Result<File> {
        if data.len() == 0 {
            return Err(Empty);
        }

        let image = Image::parse(data.data())?;
        let Some(clr) = image.clr() else {
            return Err(NotSupported);
        };

        debug!(
            sections = image.sections.len(),
            pe32_plus = image.is_pe32_plus,
            machine = image.machine,
            "parsed PE headers"
        );

        Ok(File {
            data: Box::new(data),
            image,
            clr,
        })
    }

    /// Returns the total size of the loaded image in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the image has no data.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.len() == 0
    }

    /// The decoded PE headers.
    #[must_use]
    pub fn image(&self) -> &Image {
        &self.image
    }

    /// The preferred load address.
    #[must_use]
    pub fn imagebase(&self) -> u64 {
        self.image.image_base
    }

    /// The CLI runtime header directory.
    #[must_use]
    pub fn clr(&self) -> DataDirectory {
        self.clr
    }

    /// The section table.
    #[must_use]
    pub fn sections(&self) -> &[SectionHeader] {
        &self.image.sections
    }

    /// The data directory of the given kind, if present.
    #[must_use]
    pub fn data_directory(&self, kind: DataDirectoryType) -> Option<DataDirectory> {
        self.image.data_directory(kind)
    }

    /// The raw bytes of a section.
    ///
    /// # Errors
    ///
    /// Returns an error if the section's raw data lies outside the image.
    pub fn section_data(&self, section: &SectionHeader) -> Result<&[u8]> {
        self.data.data_slice(
            section.pointer_to_raw_data as usize,
            section.size_of_raw_data as usize,
        )
    }

    /// The full image.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        self.data.data()
    }

    /// A bounds-checked slice of the image.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::UnexpectedEndOfData`] if the range is out of bounds.
    pub fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        self.data.data_slice(offset, len)
    }

    /// The bytes a data directory refers to.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::MalformedImage`] if the directory points outside its section.
    pub fn directory_data(&self, directory: DataDirectory) -> Result<&[u8]> {
        let range = self.image.directory_range(directory)?;
        self.data.data_slice(range.start, range.len())
    }

    /// Translate a relative virtual address into a file offset.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::MalformedImage`] if no section contains `rva`.
    pub fn rva_to_offset(&self, rva: u32) -> Result<usize> {
        self.image.rva_to_offset(rva)
    }
}
