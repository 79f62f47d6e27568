//! Resolved type expressions and generic substitution.
//!
//! Signature blobs ([`crate::metadata::signatures`]) reference types by token. The graph
//! resolves those tokens to names and produces [`TypeExpr`] trees, which are independent of the
//! module they were read from: two expressions read from different builds of an assembly compare
//! equal iff they denote the same type.
//!
//! # Key Components
//!
//! - [`TypeExpr`] - closed set of type shapes with structural equality
//! - [`NamedType`] - identity of a type definition or reference
//! - [`GenericArguments`] - the arguments of one instantiation, used by [`TypeExpr::substitute`]
//! - [`PrimitiveKind`] and [`ConstantValue`] - built-in types and literal values
//!
//! # Example
//!
//! ```rust
//! use cildiff::metadata::typesystem::{GenericArguments, PrimitiveKind, TypeExpr};
//!
//! let element = TypeExpr::sz_array(TypeExpr::type_parameter(0, "T"));
//! let arguments = GenericArguments::for_type(vec![TypeExpr::Primitive(PrimitiveKind::I4)]);
//!
//! assert_eq!(element.to_string(), "T[]");
//! assert_eq!(element.substitute(&arguments).to_string(), "int[]");
//! ```

mod expr;
mod generics;
mod primitives;

pub use expr::*;
pub use generics::GenericArguments;
pub use primitives::{ConstantValue, PrimitiveKind};
