use std::{
    fmt,
    hash::{Hash, Hasher},
};

use crate::metadata::{signatures::ArrayDimensions, typesystem::PrimitiveKind};

/// A reference to a named type: a `TypeDef`, or a `TypeRef` resolved to its name.
///
/// Identity is the namespace, the name, the declaring type chain and the simple name of the
/// assembly the type lives in. Assembly versions are deliberately not part of the identity, so a
/// type keeps its identity when a referenced assembly is upgraded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NamedType {
    /// Namespace; empty for nested types and types in the global namespace
    pub namespace: String,
    /// Name, including the generic arity suffix (`List`1`)
    pub name: String,
    /// The enclosing type of a nested type
    pub declaring: Option<Box<NamedType>>,
    /// Simple name of the assembly that defines the type
    pub assembly: String,
}

impl NamedType {
    /// Create a top-level type reference
    #[must_use]
    pub fn new(namespace: &str, name: &str, assembly: &str) -> NamedType {
        NamedType {
            namespace: namespace.to_string(),
            name: name.to_string(),
            declaring: None,
            assembly: assembly.to_string(),
        }
    }

    /// Create a reference to a type nested in `declaring`
    #[must_use]
    pub fn nested(declaring: NamedType, name: &str) -> NamedType {
        NamedType {
            namespace: String::new(),
            name: name.to_string(),
            assembly: declaring.assembly.clone(),
            declaring: Some(Box::new(declaring)),
        }
    }

    /// Dotted full name (`Ns.Outer.Inner`), with generic arity suffixes kept
    #[must_use]
    pub fn full_name(&self) -> String {
        match &self.declaring {
            Some(declaring) => format!("{}.{}", declaring.full_name(), self.name),
            None if self.namespace.is_empty() => self.name.clone(),
            None => format!("{}.{}", self.namespace, self.name),
        }
    }

    /// The name without its generic arity suffix
    #[must_use]
    pub fn display_name(&self) -> &str {
        strip_arity(&self.name)
    }

    fn write_display(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.declaring {
            Some(declaring) => {
                declaring.write_display(f)?;
                write!(f, ".{}", self.display_name())
            }
            None if self.namespace.is_empty() => write!(f, "{}", self.display_name()),
            None => write!(f, "{}.{}", self.namespace, self.display_name()),
        }
    }
}

impl fmt::Display for NamedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_display(f)
    }
}

/// Strip the `` `n `` generic arity suffix of a metadata type name.
#[must_use]
pub fn strip_arity(name: &str) -> &str {
    match name.rfind('`') {
        Some(tick) if name[tick + 1..].bytes().all(|b| b.is_ascii_digit()) && tick + 1 < name.len() => {
            &name[..tick]
        }
        _ => name,
    }
}

/// Whether a generic parameter belongs to a type or to a method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GenericParameterKind {
    /// `!n` - a parameter of the enclosing type
    Type,
    /// `!!n` - a parameter of the enclosing method
    Method,
}

/// An occurrence of a generic parameter in a signature.
///
/// Two parameters are equal iff kind and position match; the declared name is carried for
/// display only, so renaming `T` to `TItem` does not change any signature.
#[derive(Debug, Clone, Eq)]
pub struct GenericParameter {
    /// Type or method parameter
    pub kind: GenericParameterKind,
    /// Zero-based position in the owner's parameter list
    pub position: u32,
    /// Declared name, empty if unknown
    pub name: String,
}

impl PartialEq for GenericParameter {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.position == other.position
    }
}

impl Hash for GenericParameter {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.position.hash(state);
    }
}

/// The signature of a function pointer type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionSignature {
    /// Instance calling convention
    pub has_this: bool,
    /// Return type
    pub return_type: TypeExpr,
    /// Parameter types
    pub parameters: Vec<TypeExpr>,
}

/// A fully resolved type as it appears in a member signature.
///
/// Equality is structural: variants must match and all parts must be equal recursively.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeExpr {
    /// A built-in type
    Primitive(PrimitiveKind),
    /// A type definition or reference
    Named(NamedType),
    /// An array; single-dimensional zero-based arrays have rank 1 and no dimensions
    Array {
        /// Element type
        element: Box<TypeExpr>,
        /// Number of dimensions
        rank: u32,
        /// Declared sizes and lower bounds, in dimension order
        dimensions: Vec<ArrayDimensions>,
    },
    /// An unmanaged pointer
    Pointer(Box<TypeExpr>),
    /// A managed reference (`ref`, `out`, `in`)
    ByRef(Box<TypeExpr>),
    /// A constructed generic type
    GenericInstance {
        /// The generic type definition
        definition: Box<TypeExpr>,
        /// Type arguments, in parameter order
        arguments: Vec<TypeExpr>,
    },
    /// A generic parameter
    GenericParameter(GenericParameter),
    /// A type with a `modreq`
    RequiredModifier {
        /// The modifier type
        modifier: Box<TypeExpr>,
        /// The modified type
        element: Box<TypeExpr>,
    },
    /// A type with a `modopt`
    OptionalModifier {
        /// The modifier type
        modifier: Box<TypeExpr>,
        /// The modified type
        element: Box<TypeExpr>,
    },
    /// A function pointer
    FunctionPointer(Box<FunctionSignature>),
}

impl TypeExpr {
    /// A single-dimensional, zero-based array of `element`
    #[must_use]
    pub fn sz_array(element: TypeExpr) -> TypeExpr {
        TypeExpr::Array {
            element: Box::new(element),
            rank: 1,
            dimensions: Vec::new(),
        }
    }

    /// A type parameter at `position`
    #[must_use]
    pub fn type_parameter(position: u32, name: &str) -> TypeExpr {
        TypeExpr::GenericParameter(GenericParameter {
            kind: GenericParameterKind::Type,
            position,
            name: name.to_string(),
        })
    }

    /// A method parameter at `position`
    #[must_use]
    pub fn method_parameter(position: u32, name: &str) -> TypeExpr {
        TypeExpr::GenericParameter(GenericParameter {
            kind: GenericParameterKind::Method,
            position,
            name: name.to_string(),
        })
    }

    /// The named type at the core of this expression, looking through generic instantiation
    #[must_use]
    pub fn named(&self) -> Option<&NamedType> {
        match self {
            TypeExpr::Named(named) => Some(named),
            TypeExpr::GenericInstance { definition, .. } => definition.named(),
            _ => None,
        }
    }

    /// Returns true if the expression is a `ByRef`, looking through modifiers
    #[must_use]
    pub fn is_by_ref(&self) -> bool {
        match self {
            TypeExpr::ByRef(_) => true,
            TypeExpr::RequiredModifier { element, .. } | TypeExpr::OptionalModifier { element, .. } => {
                element.is_by_ref()
            }
            _ => false,
        }
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Primitive(kind) => write!(f, "{kind}"),
            TypeExpr::Named(named) => write!(f, "{named}"),
            TypeExpr::Array {
                element,
                rank,
                dimensions,
            } => {
                write!(f, "{element}[")?;
                if *rank == 1 && !dimensions.is_empty() {
                    write!(f, "*")?;
                }
                for _ in 1..*rank {
                    write!(f, ",")?;
                }
                write!(f, "]")
            }
            TypeExpr::Pointer(element) => write!(f, "{element}*"),
            TypeExpr::ByRef(element) => write!(f, "ref {element}"),
            TypeExpr::GenericInstance {
                definition,
                arguments,
            } => {
                write!(f, "{definition}<")?;
                for (i, argument) in arguments.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{argument}")?;
                }
                write!(f, ">")
            }
            TypeExpr::GenericParameter(parameter) => {
                if parameter.name.is_empty() {
                    match parameter.kind {
                        GenericParameterKind::Type => write!(f, "!{}", parameter.position),
                        GenericParameterKind::Method => write!(f, "!!{}", parameter.position),
                    }
                } else {
                    write!(f, "{}", parameter.name)
                }
            }
            TypeExpr::RequiredModifier { modifier, element } => {
                write!(f, "{element} modreq({modifier})")
            }
            TypeExpr::OptionalModifier { modifier, element } => {
                write!(f, "{element} modopt({modifier})")
            }
            TypeExpr::FunctionPointer(signature) => {
                write!(f, "delegate*<")?;
                for parameter in &signature.parameters {
                    write!(f, "{parameter}, ")?;
                }
                write!(f, "{}>", signature.return_type)
            }
        }
    }
}
