use thiserror::Error;

use crate::metadata::token::Token;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::MalformedImage {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::MalformedImage {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

macro_rules! out_of_bounds_error {
    () => {
        crate::Error::UnexpectedEndOfData
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Errors raised while reading an image are terminal for the comparison of that pair of
/// modules. The public entry points ([`crate::compare`], [`crate::compare_files`]) never surface
/// them to the caller; they log the failure and return a degraded result instead. The
/// lower-level APIs ([`crate::metadata::Metadata`], [`crate::metadata::graph::ModuleGraph`])
/// return them directly.
///
/// # Error Categories
///
/// ## Image Errors
/// - [`Error::MalformedImage`] - Bad signatures, directories outside any section, invalid layouts
/// - [`Error::UnexpectedEndOfData`] - A read ran past the end of the available data
/// - [`Error::NotSupported`] - The image is a valid PE file without a CLI header
///
/// ## Resolution Errors
/// - [`Error::UnresolvedToken`] - A token references a row that does not exist
/// - [`Error::RecursionLimit`] - Signature nesting or inheritance depth exceeded the guard
///
/// ## I/O Errors
/// - [`Error::FileError`] - Filesystem I/O errors
///
/// # Examples
///
/// ```rust,no_run
/// use cildiff::{Error, metadata::Metadata};
/// use std::path::Path;
///
/// match Metadata::from_file(Path::new("MyLibrary.dll")) {
///     Ok(metadata) => println!("Runtime: {}", metadata.root().version),
///     Err(Error::MalformedImage { message, .. }) => eprintln!("Malformed image: {message}"),
///     Err(Error::UnexpectedEndOfData) => eprintln!("Image is truncated"),
///     Err(e) => eprintln!("Other error: {e}"),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The image is damaged and could not be parsed.
    ///
    /// Raised on bad magic numbers, data directories that point outside every section, invalid
    /// stream layouts or table schemas. The error includes the source location where the
    /// malformation was detected for debugging purposes.
    #[error("Malformed - {file}:{line}: {message}")]
    MalformedImage {
        /// The message to be printed for the MalformedImage error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// A read ran past the end of the available data.
    ///
    /// This is raised for truncated files as well as for heap offsets or row indices that exceed
    /// the size of the region they address.
    #[error("Unexpected end of data")]
    UnexpectedEndOfData,

    /// This file type is not supported.
    ///
    /// The input is a well-formed PE image, but it carries no CLI header and therefore no
    /// metadata to compare.
    #[error("This file type is not supported")]
    NotSupported,

    /// Provided input was empty.
    #[error("Provided input was empty")]
    Empty,

    /// File I/O error.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// Generic error for miscellaneous failures.
    #[error("{0}")]
    Error(String),

    /// A token references a row that does not exist in its table.
    #[error("Failed to resolve token - {0}")]
    UnresolvedToken(Token),

    /// Recursion limit reached.
    ///
    /// Signature decoding and base-type walks are depth limited, so hostile or cyclic metadata
    /// cannot overflow the stack. The associated value is the limit that was reached.
    #[error("Reach the maximum recursion level allowed - {0}")]
    RecursionLimit(usize),
}
