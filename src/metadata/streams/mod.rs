//! Metadata streams: the four heaps and the table stream.
//!
//! | Stream      | Type              | Content                                   |
//! |-------------|-------------------|-------------------------------------------|
//! | `#~` / `#-` | [`TablesHeader`]  | Metadata tables (compressed / uncompressed) |
//! | `#Strings`  | [`Strings`]       | UTF-8 identifiers                          |
//! | `#Blob`     | [`Blob`]          | Signatures, constants, keys               |
//! | `#GUID`     | [`Guid`]          | Module version ids                         |
//! | `#US`       | [`UserStrings`]   | UTF-16 string literals                     |
//!
//! # Reference
//! - [ECMA-335 II.24.2](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)

mod blob;
mod guid;
mod streamheader;
mod strings;
mod tablesheader;
mod userstrings;

pub use blob::Blob;
pub use guid::Guid;
pub use streamheader::StreamHeader;
pub use strings::Strings;
pub use tablesheader::TablesHeader;
pub use userstrings::UserStrings;
