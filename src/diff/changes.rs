use std::fmt;

use crate::metadata::graph::{
    entities::{AssemblyVersion, TypeKind},
    flags::Visibility,
};

/// One atomic difference of a declaration that exists in both modules
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclarationDiff {
    /// Field type, method return type, property type or event type changed
    MemberTypeChanged {
        /// Old type, displayed
        old: String,
        /// New type, displayed
        new: String,
    },
    /// The member moved between static and instance
    StaticChanged {
        /// Old member was static
        old: bool,
    },
    /// The method gained or lost `virtual`
    VirtualChanged {
        /// Old method was virtual
        old: bool,
    },
    /// The type or method gained or lost `abstract`
    AbstractChanged {
        /// Old declaration was abstract
        old: bool,
    },
    /// The type or method gained or lost `sealed`
    SealedChanged {
        /// Old declaration was sealed
        old: bool,
    },
    /// The field gained or lost `readonly`
    ReadOnlyChanged {
        /// Old field was read-only
        old: bool,
    },
    /// Accessibility changed between two API-visible levels
    VisibilityChanged {
        /// Old accessibility
        old: Visibility,
        /// New accessibility
        new: Visibility,
    },
    /// A parameter kept its type but was renamed
    ParameterNameChanged {
        /// Zero-based parameter position
        position: usize,
        /// Old name
        old: String,
        /// New name
        new: String,
    },
    /// A by-reference parameter switched between `ref`, `out` and `in`
    ParameterDirectionChanged {
        /// Parameter name in the new module
        parameter: String,
        /// Old direction keyword
        old: &'static str,
        /// New direction keyword
        new: &'static str,
    },
    /// The default value of an optional parameter changed, was added or was removed
    DefaultValueChanged {
        /// Parameter name in the new module
        parameter: String,
        /// Old default, displayed
        old: Option<String>,
        /// New default, displayed
        new: Option<String>,
    },
    /// The value of a constant field changed
    ConstantValueChanged {
        /// Old value, displayed
        old: String,
        /// New value, displayed
        new: String,
    },
    /// The type changed between class, struct, enum, delegate
    TypeKindChanged {
        /// Old kind
        old: TypeKind,
        /// New kind
        new: TypeKind,
    },
    /// The base class changed
    BaseTypeChanged {
        /// Old base type, displayed
        old: Option<String>,
        /// New base type, displayed
        new: Option<String>,
    },
    /// The type implements an additional interface
    InterfaceAdded(String),
    /// The type no longer implements an interface
    InterfaceRemoved(String),
    /// A custom attribute was applied
    AttributeAdded(String),
    /// A custom attribute was removed
    AttributeRemoved(String),
    /// A referenced assembly is referenced with another version
    ReferenceVersionChanged {
        /// Old version
        old: AssemblyVersion,
        /// New version
        new: AssemblyVersion,
    },
    /// The public key token of the assembly changed
    PublicKeyTokenChanged {
        /// Old token, hex
        old: Option<String>,
        /// New token, hex
        new: Option<String>,
    },
}

impl DeclarationDiff {
    /// Returns true if the difference on its own can break consumers of the old declaration.
    ///
    /// Modifier changes break only in the restricting direction: a method losing `virtual`
    /// breaks overrides, a type gaining `abstract` or `sealed` breaks construction and
    /// derivation, a field gaining `readonly` breaks writers.
    #[must_use]
    pub fn is_breaking(&self) -> bool {
        match self {
            DeclarationDiff::VirtualChanged { old } => *old,
            DeclarationDiff::AbstractChanged { old }
            | DeclarationDiff::SealedChanged { old }
            | DeclarationDiff::ReadOnlyChanged { old } => !*old,
            DeclarationDiff::DefaultValueChanged { old, .. } => old.is_some(),
            DeclarationDiff::InterfaceAdded(_)
            | DeclarationDiff::AttributeAdded(_)
            | DeclarationDiff::ReferenceVersionChanged { .. } => false,
            DeclarationDiff::MemberTypeChanged { .. }
            | DeclarationDiff::StaticChanged { .. }
            | DeclarationDiff::VisibilityChanged { .. }
            | DeclarationDiff::ParameterNameChanged { .. }
            | DeclarationDiff::ParameterDirectionChanged { .. }
            | DeclarationDiff::ConstantValueChanged { .. }
            | DeclarationDiff::TypeKindChanged { .. }
            | DeclarationDiff::BaseTypeChanged { .. }
            | DeclarationDiff::InterfaceRemoved(_)
            | DeclarationDiff::AttributeRemoved(_)
            | DeclarationDiff::PublicKeyTokenChanged { .. } => true,
        }
    }
}

fn modifier(present: bool, keyword: &str) -> String {
    if present {
        keyword.to_string()
    } else {
        format!("non-{keyword}")
    }
}

fn or_none(value: Option<&String>) -> &str {
    value.map_or("none", String::as_str)
}

impl fmt::Display for DeclarationDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeclarationDiff::MemberTypeChanged { old, new } => {
                write!(f, "Member type changed from {old} to {new}.")
            }
            DeclarationDiff::StaticChanged { old } => write!(
                f,
                "Member changed from {} to {}.",
                modifier(*old, "static"),
                modifier(!*old, "static")
            ),
            DeclarationDiff::VirtualChanged { old } => write!(
                f,
                "Method changed from {} to {}.",
                modifier(*old, "virtual"),
                modifier(!*old, "virtual")
            ),
            DeclarationDiff::AbstractChanged { old } => write!(
                f,
                "Declaration changed from {} to {}.",
                modifier(*old, "abstract"),
                modifier(!*old, "abstract")
            ),
            DeclarationDiff::SealedChanged { old } => write!(
                f,
                "Declaration changed from {} to {}.",
                modifier(*old, "sealed"),
                modifier(!*old, "sealed")
            ),
            DeclarationDiff::ReadOnlyChanged { old } => write!(
                f,
                "Field changed from {} to {}.",
                modifier(*old, "readonly"),
                modifier(!*old, "readonly")
            ),
            DeclarationDiff::VisibilityChanged { old, new } => {
                write!(f, "Visibility changed from {old} to {new}.")
            }
            DeclarationDiff::ParameterNameChanged { old, new, .. } => {
                write!(f, "Parameter name changed from {old} to {new}.")
            }
            DeclarationDiff::ParameterDirectionChanged { parameter, old, new } => write!(
                f,
                "Parameter {parameter} changed from {old} to {new}."
            ),
            DeclarationDiff::DefaultValueChanged { parameter, old, new } => write!(
                f,
                "Default value of parameter {parameter} changed from {} to {}.",
                or_none(old.as_ref()),
                or_none(new.as_ref())
            ),
            DeclarationDiff::ConstantValueChanged { old, new } => {
                write!(f, "Constant value changed from {old} to {new}.")
            }
            DeclarationDiff::TypeKindChanged { old, new } => {
                write!(f, "Type changed from {old} to {new}.")
            }
            DeclarationDiff::BaseTypeChanged { old, new } => write!(
                f,
                "Base type changed from {} to {}.",
                or_none(old.as_ref()),
                or_none(new.as_ref())
            ),
            DeclarationDiff::InterfaceAdded(name) => write!(f, "Interface {name} added."),
            DeclarationDiff::InterfaceRemoved(name) => write!(f, "Interface {name} removed."),
            DeclarationDiff::AttributeAdded(name) => write!(f, "Attribute {name} added."),
            DeclarationDiff::AttributeRemoved(name) => write!(f, "Attribute {name} removed."),
            DeclarationDiff::ReferenceVersionChanged { old, new } => {
                write!(f, "Referenced version changed from {old} to {new}.")
            }
            DeclarationDiff::PublicKeyTokenChanged { old, new } => write!(
                f,
                "Public key token changed from {} to {}.",
                or_none(old.as_ref()),
                or_none(new.as_ref())
            ),
        }
    }
}
