//! Metadata root header and stream directory.
//!
//! The metadata root is the entry point for reading metadata. It carries the runtime version
//! string and the directory of streams (`#~`, `#Strings`, `#Blob`, ...), each located by an
//! offset relative to the root itself.
//!
//! # Example
//!
//! ```rust
//! use cildiff::metadata::root::Root;
//! let root = Root::read(&[
//!            0x42, 0x53, 0x4A, 0x42,
//!            0x01, 0x00,
//!            0x01, 0x00,
//!            0x00, 0x00, 0x00, 0x00,
//!            0x04, 0x00, 0x00, 0x00,
//!            b'v', b'4', 0x00, 0x00,
//!            0x00, 0x00,
//!            0x01, 0x00,
//!            0x24, 0x00, 0x00, 0x00, // StreamHeader
//!            0x04, 0x00, 0x00, 0x00,
//!            0x23, 0x7E, 0x00, 0x00,
//!            0x00, 0x00, 0x00, 0x00,
//!        ])?;
//! assert_eq!(root.version, "v4");
//! for stream in &root.stream_headers {
//!     println!("Stream: {} (offset: {}, size: {})", stream.name, stream.offset, stream.size);
//! }
//! # Ok::<(), cildiff::Error>(())
//! ```
//!
//! # References
//!
//! - [ECMA-335 II.24.2.1: Metadata root](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)

use std::collections::HashSet;

use crate::{
    file::io::{read_le, read_le_at},
    metadata::streams::StreamHeader,
    Result,
};

/// The MAGIC value indicating the CIL header
pub const CIL_HEADER_MAGIC: u32 = 0x424A_5342;

/// Upper bound for the allocated length of the version string
const MAX_VERSION_LENGTH: u32 = 255;

/// The metadata root: version information and the stream directory.
#[derive(Debug, Clone)]
pub struct Root {
    /// Magic signature for physical metadata: 0x424A5342
    pub signature: u32,
    /// `MajorVersion`
    pub major_version: u16,
    /// `MinorVersion`
    pub minor_version: u16,
    /// Number of bytes allocated to hold the version string, padded to 4
    pub length: u32,
    /// The runtime version the image was built for, e.g. `v4.0.30319`
    pub version: String,
    /// Reserved, always 0
    pub flags: u16,
    /// Streams, in directory order
    pub stream_headers: Vec<StreamHeader>,
}

impl Root {
    /// Reads a [`Root`] metadata header from a byte slice covering the whole metadata.
    ///
    /// # Errors
    /// Returns [`crate::Error::MalformedImage`] if the signature is invalid, the version string
    /// is too long, a stream name is duplicated or a stream lies outside the metadata, and
    /// [`crate::Error::UnexpectedEndOfData`] if the header is truncated.
    pub fn read(data: &[u8]) -> Result<Root> {
        if data.len() < 20 {
            return Err(out_of_bounds_error!());
        }

        let signature = read_le::<u32>(data)?;
        if signature != CIL_HEADER_MAGIC {
            return Err(malformed_error!(
                "CIL_HEADER_MAGIC does not match - 0x{:08x}",
                signature
            ));
        }

        let mut offset = 4;
        let major_version = read_le_at::<u16>(data, &mut offset)?;
        let minor_version = read_le_at::<u16>(data, &mut offset)?;
        // reserved
        read_le_at::<u32>(data, &mut offset)?;

        let length = read_le_at::<u32>(data, &mut offset)?;
        if length > MAX_VERSION_LENGTH {
            return Err(malformed_error!("Version string length {} is too large", length));
        }

        let version_end = 16 + length as usize;
        if version_end > data.len() {
            return Err(out_of_bounds_error!());
        }

        let version_bytes = &data[16..version_end];
        let version_len = version_bytes
            .iter()
            .position(|b| *b == 0)
            .unwrap_or(version_bytes.len());
        let version = String::from_utf8_lossy(&version_bytes[..version_len]).into_owned();

        let mut offset = version_end;
        let flags = read_le_at::<u16>(data, &mut offset)?;
        let stream_count = read_le_at::<u16>(data, &mut offset)?;
        if stream_count == 0 {
            return Err(malformed_error!("No streams have been found"));
        }

        let mut names = HashSet::with_capacity(stream_count as usize);
        let mut streams = Vec::with_capacity(stream_count as usize);
        for _ in 0..stream_count {
            if offset >= data.len() {
                return Err(out_of_bounds_error!());
            }

            let stream = StreamHeader::from(&data[offset..])?;
            let stream_end = u64::from(stream.offset) + u64::from(stream.size);
            if stream_end > data.len() as u64 {
                return Err(malformed_error!(
                    "Stream '{}' (0x{:x}..0x{:x}) exceeds the metadata (0x{:x})",
                    stream.name,
                    stream.offset,
                    stream_end,
                    data.len()
                ));
            }

            if !names.insert(stream.name.clone()) {
                return Err(malformed_error!("Duplicate stream '{}'", stream.name));
            }

            offset += stream.encoded_len();
            streams.push(stream);
        }

        Ok(Root {
            signature,
            major_version,
            minor_version,
            length,
            version,
            flags,
            stream_headers: streams,
        })
    }

    /// Look up a stream by name
    #[must_use]
    pub fn stream(&self, name: &str) -> Option<&StreamHeader> {
        self.stream_headers.iter().find(|stream| stream.name == name)
    }
}
