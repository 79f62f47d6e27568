//! Memory-mapped backend for images on disk.

use std::{fs, path::Path};

use memmap2::Mmap;

use super::Backend;
use crate::{Error, Result};

/// A read-only mapping of an image file
#[derive(Debug)]
pub struct Physical {
    map: Mmap,
}

impl Physical {
    /// Map the file at `path`.
    ///
    /// # Errors
    /// Returns [`Error::FileError`] if the file cannot be opened or mapped.
    pub fn new(path: impl AsRef<Path>) -> Result<Physical> {
        let file = fs::File::open(path)?;

        // SAFETY: the mapping is read-only and owned by `Physical`. Truncation of the file by
        // another process while it is mapped is not guarded against.
        let map = unsafe { Mmap::map(&file) }.map_err(Error::FileError)?;
        Ok(Physical { map })
    }
}

impl Backend for Physical {
    fn data(&self) -> &[u8] {
        &self.map
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn mapped_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"MZ\x90\x00\x03").unwrap();
        file.flush().unwrap();

        let image = Physical::new(file.path()).unwrap();
        assert_eq!(image.len(), 5);
        assert_eq!(image.data_slice(0, 2).unwrap(), b"MZ");
        assert!(image.data_slice(4, 2).is_err());
    }

    #[test]
    fn missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = Physical::new(dir.path().join("Acme.dll"));
        assert!(matches!(result, Err(Error::FileError(_))));
    }
}
