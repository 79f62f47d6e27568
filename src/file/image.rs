//! PE/COFF header reader.
//!
//! Only the parts of the Portable Executable format needed to find the CLI metadata are decoded:
//! the DOS stub pointer, the PE signature, the COFF file header, the PE32/PE32+ optional header
//! with its data directories, and the section table. Everything is validated while it is read;
//! a bad signature or a structure that points outside the file stops parsing immediately.
//!
//! # Layout
//!
//! ```text
//! 0x00  DOS header ("MZ") ... e_lfanew @ 0x3C ──┐
//! e_lfanew  "PE\0\0"                           <┘
//!           COFF header (20 bytes)
//!           Optional header (PE32: 0x10b / PE32+: 0x20b)
//!             ... NumberOfRvaAndSizes, DataDirectory[16]
//!           Section table (40 bytes per section)
//! ```
//!
//! # Examples
//!
//! ```rust,no_run
//! use cildiff::file::image::{DataDirectoryType, Image};
//!
//! let data = std::fs::read("MyLibrary.dll")?;
//! let image = Image::parse(&data)?;
//! if let Some(clr) = image.data_directory(DataDirectoryType::ClrRuntimeHeader) {
//!     let offset = image.rva_to_offset(clr.virtual_address)?;
//!     println!("CLI header at file offset 0x{offset:x}");
//! }
//! # Ok::<(), cildiff::Error>(())
//! ```

use strum::{EnumCount, EnumIter};

use crate::{file::parser::Parser, Result};

/// `MZ`
pub const DOS_MAGIC: u16 = 0x5A4D;
/// `PE\0\0`
pub const PE_SIGNATURE: u32 = 0x0000_4550;
/// Optional header magic of 32-bit images.
pub const PE32_MAGIC: u16 = 0x010B;
/// Optional header magic of 64-bit images.
pub const PE32_PLUS_MAGIC: u16 = 0x020B;

const DOS_LFANEW_OFFSET: usize = 0x3C;
const COFF_HEADER_SIZE: usize = 20;
const SECTION_HEADER_SIZE: usize = 40;
const MAX_SECTIONS: u16 = 96;

/// The well-known data directory slots of the optional header.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, EnumCount)]
#[repr(usize)]
pub enum DataDirectoryType {
    Export,
    Import,
    Resource,
    Exception,
    Certificate,
    BaseRelocation,
    Debug,
    Architecture,
    GlobalPtr,
    Tls,
    LoadConfig,
    BoundImport,
    ImportAddressTable,
    DelayImport,
    ClrRuntimeHeader,
    Reserved,
}

/// One `(rva, size)` entry of the data directory array.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DataDirectory {
    /// Relative virtual address of the referenced structure
    pub virtual_address: u32,
    /// Size in bytes of the referenced structure
    pub size: u32,
}

impl DataDirectory {
    /// Returns true for the all-zero entry, which marks an absent directory.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.virtual_address == 0 || self.size == 0
    }
}

/// A decoded entry of the section table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionHeader {
    /// Section name, NUL padding removed
    pub name: String,
    /// Size of the section once loaded
    pub virtual_size: u32,
    /// RVA of the first byte of the section
    pub virtual_address: u32,
    /// Size of the initialized data on disk
    pub size_of_raw_data: u32,
    /// File offset of the initialized data
    pub pointer_to_raw_data: u32,
    /// `IMAGE_SCN_*` flags
    pub characteristics: u32,
}

impl SectionHeader {
    fn read(parser: &mut Parser<'_>) -> Result<SectionHeader> {
        let raw_name = parser.read_bytes(8)?;
        let name_len = raw_name.iter().position(|b| *b == 0).unwrap_or(8);
        let name = String::from_utf8_lossy(&raw_name[..name_len]).into_owned();

        let virtual_size = parser.read_le::<u32>()?;
        let virtual_address = parser.read_le::<u32>()?;
        let size_of_raw_data = parser.read_le::<u32>()?;
        let pointer_to_raw_data = parser.read_le::<u32>()?;
        // relocations, line numbers and their counts are meaningless for managed images
        parser.advance_by(12)?;
        let characteristics = parser.read_le::<u32>()?;

        Ok(SectionHeader {
            name,
            virtual_size,
            virtual_address,
            size_of_raw_data,
            pointer_to_raw_data,
            characteristics,
        })
    }

    /// Number of bytes of virtual address space this section answers for.
    #[must_use]
    pub fn mapped_size(&self) -> u32 {
        self.virtual_size.max(self.size_of_raw_data)
    }

    /// Returns true if `rva` falls inside this section.
    #[must_use]
    pub fn contains_rva(&self, rva: u32) -> bool {
        rva >= self.virtual_address
            && u64::from(rva) < u64::from(self.virtual_address) + u64::from(self.mapped_size())
    }
}

/// The headers of a PE image.
#[derive(Debug, Clone)]
pub struct Image {
    /// `IMAGE_FILE_MACHINE_*` of the COFF header
    pub machine: u16,
    /// `IMAGE_FILE_*` characteristics of the COFF header
    pub characteristics: u16,
    /// True for PE32+ (64-bit) optional headers
    pub is_pe32_plus: bool,
    /// Preferred load address
    pub image_base: u64,
    /// Section alignment once loaded
    pub section_alignment: u32,
    /// `IMAGE_SUBSYSTEM_*` of the optional header
    pub subsystem: u16,
    /// The data directories present in the optional header
    pub data_directories: Vec<DataDirectory>,
    /// The section table
    pub sections: Vec<SectionHeader>,
}

impl Image {
    /// Parse the headers of the image in `data`.
    ///
    /// # Errors
    /// Returns [`crate::Error::MalformedImage`] for bad signatures or sections whose raw data
    /// lies outside the file, and [`crate::Error::UnexpectedEndOfData`] when a header is cut
    /// short.
    pub fn parse(data: &[u8]) -> Result<Image> {
        let mut parser = Parser::new(data);

        let dos_magic = parser.read_le::<u16>()?;
        if dos_magic != DOS_MAGIC {
            return Err(malformed_error!("Invalid DOS signature - 0x{:04x}", dos_magic));
        }

        parser.seek(DOS_LFANEW_OFFSET)?;
        let pe_offset = parser.read_le::<u32>()? as usize;
        parser.seek(pe_offset)?;

        let pe_signature = parser.read_le::<u32>()?;
        if pe_signature != PE_SIGNATURE {
            return Err(malformed_error!("Invalid PE signature - 0x{:08x}", pe_signature));
        }

        let machine = parser.read_le::<u16>()?;
        let number_of_sections = parser.read_le::<u16>()?;
        if number_of_sections > MAX_SECTIONS {
            return Err(malformed_error!(
                "Unreasonable number of sections - {}",
                number_of_sections
            ));
        }

        // TimeDateStamp, PointerToSymbolTable, NumberOfSymbols
        parser.advance_by(12)?;
        let size_of_optional_header = parser.read_le::<u16>()?;
        let characteristics = parser.read_le::<u16>()?;

        let optional_start = pe_offset + 4 + COFF_HEADER_SIZE;
        let optional_end = optional_start + usize::from(size_of_optional_header);
        if optional_end > data.len() {
            return Err(out_of_bounds_error!());
        }

        let optional = Parser::new(&data[optional_start..optional_end]);
        let (is_pe32_plus, image_base, section_alignment, subsystem, data_directories) =
            Self::read_optional_header(optional)?;

        let mut parser = Parser::new(data);
        parser.seek(optional_end)?;

        let mut sections = Vec::with_capacity(usize::from(number_of_sections));
        for _ in 0..number_of_sections {
            if data.len() - parser.pos() < SECTION_HEADER_SIZE {
                return Err(out_of_bounds_error!());
            }

            let section = SectionHeader::read(&mut parser)?;
            let raw_end = u64::from(section.pointer_to_raw_data)
                + u64::from(section.size_of_raw_data);
            if raw_end > data.len() as u64 {
                return Err(malformed_error!(
                    "Section '{}' raw data 0x{:x}..0x{:x} exceeds the file size 0x{:x}",
                    section.name,
                    section.pointer_to_raw_data,
                    raw_end,
                    data.len()
                ));
            }

            sections.push(section);
        }

        Ok(Image {
            machine,
            characteristics,
            is_pe32_plus,
            image_base,
            section_alignment,
            subsystem,
            data_directories,
            sections,
        })
    }

    fn read_optional_header(
        mut parser: Parser<'_>,
    ) -> Result<(bool, u64, u32, u16, Vec<DataDirectory>)> {
        let magic = parser.read_le::<u16>()?;
        let is_pe32_plus = match magic {
            PE32_MAGIC => false,
            PE32_PLUS_MAGIC => true,
            _ => {
                return Err(malformed_error!(
                    "Invalid optional header magic - 0x{:04x}",
                    magic
                ))
            }
        };

        // Standard fields up to AddressOfEntryPoint/BaseOfCode; PE32 additionally has BaseOfData
        parser.seek(if is_pe32_plus { 24 } else { 28 })?;
        let image_base = if is_pe32_plus {
            parser.read_le::<u64>()?
        } else {
            u64::from(parser.read_le::<u32>()?)
        };
        let section_alignment = parser.read_le::<u32>()?;

        parser.seek(68)?;
        let subsystem = parser.read_le::<u16>()?;

        parser.seek(if is_pe32_plus { 108 } else { 92 })?;
        let directory_count = parser.read_le::<u32>()?;
        if directory_count as usize > DataDirectoryType::COUNT {
            return Err(malformed_error!(
                "Invalid number of data directories - {}",
                directory_count
            ));
        }

        let mut data_directories = Vec::with_capacity(directory_count as usize);
        for _ in 0..directory_count {
            data_directories.push(DataDirectory {
                virtual_address: parser.read_le::<u32>()?,
                size: parser.read_le::<u32>()?,
            });
        }

        Ok((
            is_pe32_plus,
            image_base,
            section_alignment,
            subsystem,
            data_directories,
        ))
    }

    /// The data directory of the given kind, or `None` when it is absent or empty.
    #[must_use]
    pub fn data_directory(&self, kind: DataDirectoryType) -> Option<DataDirectory> {
        self.data_directories
            .get(kind as usize)
            .copied()
            .filter(|directory| !directory.is_empty())
    }

    /// The CLI header directory, present in every managed image.
    #[must_use]
    pub fn clr(&self) -> Option<DataDirectory> {
        self.data_directory(DataDirectoryType::ClrRuntimeHeader)
    }

    /// The debug directory, if the image carries one.
    #[must_use]
    pub fn debug(&self) -> Option<DataDirectory> {
        self.data_directory(DataDirectoryType::Debug)
    }

    /// Look up a section by name (e.g. `.text`).
    #[must_use]
    pub fn section(&self, name: &str) -> Option<&SectionHeader> {
        self.sections.iter().find(|section| section.name == name)
    }

    /// Translate a relative virtual address into a file offset.
    ///
    /// # Errors
    /// Returns [`crate::Error::MalformedImage`] if no section contains `rva`.
    pub fn rva_to_offset(&self, rva: u32) -> Result<usize> {
        match self.sections.iter().find(|section| section.contains_rva(rva)) {
            Some(section) => {
                Ok((rva - section.virtual_address) as usize + section.pointer_to_raw_data as usize)
            }
            None => Err(malformed_error!(
                "RVA 0x{:x} is not contained in any section",
                rva
            )),
        }
    }

    /// Resolve a data directory into the file range it occupies.
    ///
    /// # Errors
    /// Returns [`crate::Error::MalformedImage`] if the directory starts or ends outside the
    /// raw data of its section.
    pub fn directory_range(&self, directory: DataDirectory) -> Result<std::ops::Range<usize>> {
        let Some(section) = self
            .sections
            .iter()
            .find(|section| section.contains_rva(directory.virtual_address))
        else {
            return Err(malformed_error!(
                "Directory at RVA 0x{:x} is not contained in any section",
                directory.virtual_address
            ));
        };

        let start_in_section = (directory.virtual_address - section.virtual_address) as usize;
        let end_in_section = start_in_section + directory.size as usize;
        if end_in_section > section.size_of_raw_data as usize {
            return Err(malformed_error!(
                "Directory at RVA 0x{:x} (size {}) exceeds section '{}'",
                directory.virtual_address,
                directory.size,
                section.name
            ));
        }

        let start = section.pointer_to_raw_data as usize + start_in_section;
        Ok(start..start + directory.size as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    /// A PE32 header with a single `.text` section and a CLI header directory.
    fn crafted_image() -> Vec<u8> {
        let mut data = vec![0u8; 0x400];
        data[0] = b'M';
        data[1] = b'Z';
        data[0x3C..0x40].copy_from_slice(&0x80_u32.to_le_bytes());
        data[0x80..0x84].copy_from_slice(&PE_SIGNATURE.to_le_bytes());

        // COFF
        data[0x84..0x86].copy_from_slice(&0x014C_u16.to_le_bytes());
        data[0x86..0x88].copy_from_slice(&1_u16.to_le_bytes());
        data[0x94..0x96].copy_from_slice(&0xE0_u16.to_le_bytes());
        data[0x96..0x98].copy_from_slice(&0x2102_u16.to_le_bytes());

        // Optional header
        let opt = 0x98;
        data[opt..opt + 2].copy_from_slice(&PE32_MAGIC.to_le_bytes());
        data[opt + 28..opt + 32].copy_from_slice(&0x0040_0000_u32.to_le_bytes());
        data[opt + 32..opt + 36].copy_from_slice(&0x2000_u32.to_le_bytes());
        data[opt + 68..opt + 70].copy_from_slice(&3_u16.to_le_bytes());
        data[opt + 92..opt + 96].copy_from_slice(&16_u32.to_le_bytes());
        let clr = opt + 96 + 14 * 8;
        data[clr..clr + 4].copy_from_slice(&0x2008_u32.to_le_bytes());
        data[clr + 4..clr + 8].copy_from_slice(&0x48_u32.to_le_bytes());

        // Section table
        let sec = opt + 0xE0;
        data[sec..sec + 5].copy_from_slice(b".text");
        data[sec + 8..sec + 12].copy_from_slice(&0x100_u32.to_le_bytes());
        data[sec + 12..sec + 16].copy_from_slice(&0x2000_u32.to_le_bytes());
        data[sec + 16..sec + 20].copy_from_slice(&0x200_u32.to_le_bytes());
        data[sec + 20..sec + 24].copy_from_slice(&0x200_u32.to_le_bytes());
        data[sec + 36..sec + 40].copy_from_slice(&0x6000_0020_u32.to_le_bytes());

        data
    }

    #[test]
    fn crafted() {
        let data = crafted_image();
        let image = Image::parse(&data).unwrap();

        assert_eq!(image.machine, 0x014C);
        assert!(!image.is_pe32_plus);
        assert_eq!(image.image_base, 0x0040_0000);
        assert_eq!(image.section_alignment, 0x2000);
        assert_eq!(image.subsystem, 3);
        assert_eq!(image.data_directories.len(), 16);
        assert_eq!(image.sections.len(), 1);
        assert_eq!(image.sections[0].name, ".text");
        assert!(image.debug().is_none());

        let clr = image.clr().unwrap();
        assert_eq!(clr.virtual_address, 0x2008);
        assert_eq!(image.rva_to_offset(0x2008).unwrap(), 0x208);
        assert_eq!(image.directory_range(clr).unwrap(), 0x208..0x250);
        assert!(image.section(".text").is_some());
    }

    #[test]
    fn rva_outside_sections() {
        let image = Image::parse(&crafted_image()).unwrap();
        assert!(matches!(
            image.rva_to_offset(0x5000),
            Err(Error::MalformedImage { .. })
        ));

        let outside = DataDirectory {
            virtual_address: 0x21F0,
            size: 0x40,
        };
        assert!(image.directory_range(outside).is_err());
    }

    #[test]
    fn bad_signatures() {
        let mut data = crafted_image();
        data[0] = b'X';
        assert!(matches!(
            Image::parse(&data),
            Err(Error::MalformedImage { .. })
        ));

        let mut data = crafted_image();
        data[0x81] = b'X';
        assert!(matches!(
            Image::parse(&data),
            Err(Error::MalformedImage { .. })
        ));

        let mut data = crafted_image();
        data[0x98] = 0x0C;
        assert!(Image::parse(&data).is_err());
    }

    #[test]
    fn truncated() {
        let data = crafted_image();
        assert!(matches!(
            Image::parse(&data[..0x90]),
            Err(Error::UnexpectedEndOfData)
        ));
        assert!(Image::parse(&data[..0x1F0]).is_err());
    }
}
