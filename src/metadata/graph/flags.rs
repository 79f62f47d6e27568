//! Attribute flag sets of the declaration tables and the visibility derived from them.
//!
//! # Key Types
//! - [`TypeAttributes`], [`MethodAttributes`], [`FieldAttributes`]: Declaration flags
//! - [`ParamAttributes`], [`MethodSemanticsAttributes`], [`GenericParamAttributes`]: Supporting flags
//! - [`Visibility`]: Accessibility level, normalised across the different encodings

use std::fmt;

use bitflags::bitflags;

/// Bitmask for type visibility extraction
pub const TYPE_VISIBILITY_MASK: u32 = 0x0000_0007;
/// Bitmask for class semantics extraction
pub const TYPE_CLASS_SEMANTICS_MASK: u32 = 0x0000_0020;
/// Bitmask for member access extraction
pub const MEMBER_ACCESS_MASK: u16 = 0x0007;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    /// `TypeAttributes` of a `TypeDef` row (II.23.1.15)
    pub struct TypeAttributes: u32 {
        /// Top-level type, visible outside the assembly
        const PUBLIC = 0x0000_0001;
        /// Nested type with public visibility
        const NESTED_PUBLIC = 0x0000_0002;
        /// Nested type with private visibility
        const NESTED_PRIVATE = 0x0000_0003;
        /// Nested type with family visibility
        const NESTED_FAMILY = 0x0000_0004;
        /// Nested type with assembly visibility
        const NESTED_ASSEMBLY = 0x0000_0005;
        /// Nested type with family and assembly visibility
        const NESTED_FAM_AND_ASSEM = 0x0000_0006;
        /// Nested type with family or assembly visibility
        const NESTED_FAM_OR_ASSEM = 0x0000_0007;
        /// Fields are laid out sequentially
        const SEQUENTIAL_LAYOUT = 0x0000_0008;
        /// Layout is supplied explicitly
        const EXPLICIT_LAYOUT = 0x0000_0010;
        /// Type is an interface
        const INTERFACE = 0x0000_0020;
        /// Class is abstract
        const ABSTRACT = 0x0000_0080;
        /// Class cannot be extended
        const SEALED = 0x0000_0100;
        /// Class name is special
        const SPECIAL_NAME = 0x0000_0400;
        /// Class/Interface is imported
        const IMPORT = 0x0000_1000;
        /// Class is serializable
        const SERIALIZABLE = 0x0000_2000;
        /// Type has security associated with it
        const HAS_SECURITY = 0x0004_0000;
        /// Initialize the class before first static field access
        const BEFORE_FIELD_INIT = 0x0010_0000;
        /// Runtime should check name encoding
        const RT_SPECIAL_NAME = 0x0000_0800;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    /// `MethodAttributes` of a `MethodDef` row (II.23.1.10)
    pub struct MethodAttributes: u16 {
        /// Accessible only by the parent type
        const PRIVATE = 0x0001;
        /// Accessible by sub-types only in this Assembly
        const FAM_AND_ASSEM = 0x0002;
        /// Accessibly by anyone in the Assembly
        const ASSEM = 0x0003;
        /// Accessible only by type and sub-types
        const FAMILY = 0x0004;
        /// Accessibly by sub-types anywhere, plus anyone in assembly
        const FAM_OR_ASSEM = 0x0005;
        /// Accessibly by anyone who has visibility to this scope
        const PUBLIC = 0x0006;
        /// Defined on type, else per instance
        const STATIC = 0x0010;
        /// Method cannot be overridden
        const FINAL = 0x0020;
        /// Method is virtual
        const VIRTUAL = 0x0040;
        /// Method hides by name+sig, else just by name
        const HIDE_BY_SIG = 0x0080;
        /// Method always gets a new slot in the vtable
        const NEW_SLOT = 0x0100;
        /// Method can only be overriden if also accessible
        const STRICT = 0x0200;
        /// Method does not provide an implementation
        const ABSTRACT = 0x0400;
        /// Method is special
        const SPECIAL_NAME = 0x0800;
        /// Implementation is forwarded through PInvoke
        const PINVOKE_IMPL = 0x2000;
        /// CLI provides 'special' behavior, depending upon the name of the method
        const RT_SPECIAL_NAME = 0x1000;
        /// Method has security associate with it
        const HAS_SECURITY = 0x4000;
        /// Method calls another method containing security code
        const REQUIRE_SEC_OBJECT = 0x8000;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    /// `FieldAttributes` of a `Field` row (II.23.1.5)
    pub struct FieldAttributes: u16 {
        /// Accessible only by the parent type
        const PRIVATE = 0x0001;
        /// Accessible by sub-types only in this Assembly
        const FAM_AND_ASSEM = 0x0002;
        /// Accessibly by anyone in the Assembly
        const ASSEMBLY = 0x0003;
        /// Accessible only by type and sub-types
        const FAMILY = 0x0004;
        /// Accessibly by sub-types anywhere, plus anyone in assembly
        const FAM_OR_ASSEM = 0x0005;
        /// Accessibly by anyone who has visibility to this scope
        const PUBLIC = 0x0006;
        /// Defined on type, else per instance
        const STATIC = 0x0010;
        /// Field can only be initialized, not written to after init
        const INIT_ONLY = 0x0020;
        /// Value is compile time constant
        const LITERAL = 0x0040;
        /// Reserved (to indicate this field should not be serialized when type is remoted)
        const NOT_SERIALIZED = 0x0080;
        /// Field is special
        const SPECIAL_NAME = 0x0200;
        /// Implementation is forwarded through PInvoke
        const PINVOKE_IMPL = 0x2000;
        /// CLI provides 'special' behavior, depending upon the name of the field
        const RT_SPECIAL_NAME = 0x0400;
        /// Field has marshalling information
        const HAS_FIELD_MARSHAL = 0x1000;
        /// Field has default
        const HAS_DEFAULT = 0x8000;
        /// Field has RVA
        const HAS_FIELD_RVA = 0x0100;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    /// `ParamAttributes` of a `Param` row (II.23.1.13)
    pub struct ParamAttributes: u16 {
        /// Param is `[In]`
        const IN = 0x0001;
        /// Param is `[out]`
        const OUT = 0x0002;
        /// Param is optional
        const OPTIONAL = 0x0010;
        /// Param has default value
        const HAS_DEFAULT = 0x1000;
        /// Param has `FieldMarshal`
        const HAS_FIELD_MARSHAL = 0x2000;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    /// `MethodSemanticsAttributes` of a `MethodSemantics` row (II.23.1.12)
    pub struct MethodSemanticsAttributes: u16 {
        /// Setter for property
        const SETTER = 0x0001;
        /// Getter for property
        const GETTER = 0x0002;
        /// Other method for property or event
        const OTHER = 0x0004;
        /// `AddOn` method for event
        const ADD_ON = 0x0008;
        /// `RemoveOn` method for event
        const REMOVE_ON = 0x0010;
        /// Fire method for event
        const FIRE = 0x0020;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    /// `GenericParamAttributes` of a `GenericParam` row (II.23.1.7)
    pub struct GenericParamAttributes: u16 {
        /// The generic parameter is covariant
        const COVARIANT = 0x0001;
        /// The generic parameter is contravariant
        const CONTRAVARIANT = 0x0002;
        /// The generic parameter has the class special constraint
        const REFERENCE_TYPE_CONSTRAINT = 0x0004;
        /// The generic parameter has the valuetype special constraint
        const NOT_NULLABLE_VALUE_TYPE_CONSTRAINT = 0x0008;
        /// The generic parameter has the .ctor special constraint
        const DEFAULT_CONSTRUCTOR_CONSTRAINT = 0x0010;
    }
}

/// Accessibility of a type or member, ordered from least to most visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Visibility {
    /// Not referenceable (`compilercontrolled`)
    CompilerControlled,
    /// `private`
    Private,
    /// `private protected`
    FamilyAndAssembly,
    /// `internal`
    Assembly,
    /// `protected`
    Family,
    /// `protected internal`
    FamilyOrAssembly,
    /// `public`
    Public,
}

impl Visibility {
    /// Visibility of a member from the access bits of method or field flags
    #[must_use]
    pub fn from_member_access(access: u16) -> Visibility {
        match access & MEMBER_ACCESS_MASK {
            0x0001 => Visibility::Private,
            0x0002 => Visibility::FamilyAndAssembly,
            0x0003 => Visibility::Assembly,
            0x0004 => Visibility::Family,
            0x0005 => Visibility::FamilyOrAssembly,
            0x0006 => Visibility::Public,
            _ => Visibility::CompilerControlled,
        }
    }

    /// Visibility of a type from its flags, ignoring the enclosing type
    #[must_use]
    pub fn from_type_flags(flags: TypeAttributes) -> Visibility {
        match flags.bits() & TYPE_VISIBILITY_MASK {
            0x0001 | 0x0002 => Visibility::Public,
            0x0003 => Visibility::Private,
            0x0004 => Visibility::Family,
            0x0006 => Visibility::FamilyAndAssembly,
            0x0007 => Visibility::FamilyOrAssembly,
            // NotPublic and NestedAssembly
            _ => Visibility::Assembly,
        }
    }

    /// Returns true if code outside the assembly can see the declaration
    #[must_use]
    pub fn is_api_visible(&self) -> bool {
        matches!(
            self,
            Visibility::Public | Visibility::Family | Visibility::FamilyOrAssembly
        )
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Visibility::CompilerControlled => "compilercontrolled",
            Visibility::Private => "private",
            Visibility::FamilyAndAssembly => "private protected",
            Visibility::Assembly => "internal",
            Visibility::Family => "protected",
            Visibility::FamilyOrAssembly => "protected internal",
            Visibility::Public => "public",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn member_visibility() {
        let flags = MethodAttributes::PUBLIC | MethodAttributes::VIRTUAL;
        assert_eq!(Visibility::from_member_access(flags.bits()), Visibility::Public);
        assert_eq!(
            Visibility::from_member_access(FieldAttributes::FAMILY.bits()),
            Visibility::Family
        );
        assert_eq!(Visibility::from_member_access(0), Visibility::CompilerControlled);
    }

    #[test]
    fn type_visibility() {
        assert_eq!(
            Visibility::from_type_flags(TypeAttributes::PUBLIC | TypeAttributes::SEALED),
            Visibility::Public
        );
        assert_eq!(
            Visibility::from_type_flags(TypeAttributes::empty()),
            Visibility::Assembly
        );
        assert_eq!(
            Visibility::from_type_flags(TypeAttributes::NESTED_FAM_OR_ASSEM),
            Visibility::FamilyOrAssembly
        );
        assert_eq!(
            Visibility::from_type_flags(TypeAttributes::NESTED_ASSEMBLY),
            Visibility::Assembly
        );
    }

    #[test]
    fn api_visibility() {
        assert!(Visibility::Public.is_api_visible());
        assert!(Visibility::Family.is_api_visible());
        assert!(Visibility::FamilyOrAssembly.is_api_visible());
        assert!(!Visibility::FamilyAndAssembly.is_api_visible());
        assert!(!Visibility::Assembly.is_api_visible());
        assert!(!Visibility::Private.is_api_visible());
    }
}
