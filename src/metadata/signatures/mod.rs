//! Decoding of the signature blobs stored in the `#Blob` heap.
//!
//! Signatures describe the types of fields, the return and parameter types of methods, the
//! types of properties and the structure of constructed types (`TypeSpec`). They are the raw
//! input to [`crate::metadata::typesystem`], which resolves the tokens they contain into
//! comparable type expressions.
//!
//! # Example
//!
//! ```rust
//! use cildiff::metadata::signatures::{parse_method_signature, TypeSignature};
//!
//! // instance void M(int32, string)
//! let signature = parse_method_signature(&[0x20, 0x02, 0x01, 0x08, 0x0E])?;
//! assert!(signature.has_this);
//! assert_eq!(signature.return_type.base, TypeSignature::Void);
//! assert_eq!(signature.params.len(), 2);
//! # Ok::<(), cildiff::Error>(())
//! ```

mod parser;
mod types;

pub use parser::*;
pub use types::*;

use crate::Result;

/// Decode a method signature blob.
///
/// # Errors
/// Returns a decoding error for truncated or malformed blobs.
pub fn parse_method_signature(data: &[u8]) -> Result<SignatureMethod> {
    let mut parser = SignatureParser::new(data);
    parser.parse_method_signature()
}

/// Decode a field signature blob.
///
/// # Errors
/// Returns a decoding error for truncated or malformed blobs.
pub fn parse_field_signature(data: &[u8]) -> Result<SignatureField> {
    let mut parser = SignatureParser::new(data);
    parser.parse_field_signature()
}

/// Decode a property signature blob.
///
/// # Errors
/// Returns a decoding error for truncated or malformed blobs.
pub fn parse_property_signature(data: &[u8]) -> Result<SignatureProperty> {
    let mut parser = SignatureParser::new(data);
    parser.parse_property_signature()
}

/// Decode a type specification blob.
///
/// # Errors
/// Returns a decoding error for truncated or malformed blobs.
pub fn parse_type_spec_signature(data: &[u8]) -> Result<SignatureTypeSpec> {
    let mut parser = SignatureParser::new(data);
    parser.parse_type_spec_signature()
}
