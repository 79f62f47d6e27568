//! Declaration entities materialized from table rows.
//!
//! Entities are plain data: names and flags read from their own row, child lists as tokens, and
//! signatures already resolved into [`TypeExpr`] trees. They are created once per token by
//! [`crate::metadata::graph::ModuleGraph`] and handed out by reference, so two resolutions of
//! the same token yield the same object.

use std::fmt;

use crate::metadata::{
    graph::flags::{
        FieldAttributes, GenericParamAttributes, MethodAttributes, MethodSemanticsAttributes,
        ParamAttributes, TypeAttributes, Visibility,
    },
    token::Token,
    typesystem::{ConstantValue, NamedType, TypeExpr},
};

/// Four-part assembly version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct AssemblyVersion {
    /// Major version
    pub major: u16,
    /// Minor version
    pub minor: u16,
    /// Build number
    pub build: u16,
    /// Revision number
    pub revision: u16,
}

impl AssemblyVersion {
    /// Create a version from its four parts
    #[must_use]
    pub fn new(major: u16, minor: u16, build: u16, revision: u16) -> Self {
        AssemblyVersion {
            major,
            minor,
            build,
            revision,
        }
    }
}

impl fmt::Display for AssemblyVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.major, self.minor, self.build, self.revision
        )
    }
}

/// The identity of an assembly: simple name, version, culture and public key token
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssemblyName {
    /// Simple name
    pub name: String,
    /// Version
    pub version: AssemblyVersion,
    /// Culture, empty for neutral
    pub culture: String,
    /// The last eight bytes of the SHA-1 of the public key, reversed
    pub public_key_token: Option<[u8; 8]>,
}

impl fmt::Display for AssemblyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, Version={}, Culture=", self.name, self.version)?;
        if self.culture.is_empty() {
            write!(f, "neutral")?;
        } else {
            write!(f, "{}", self.culture)?;
        }
        write!(f, ", PublicKeyToken=")?;
        match &self.public_key_token {
            Some(token) => {
                for byte in token {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
            None => write!(f, "null"),
        }
    }
}

/// The `Assembly` row of a manifest module
#[derive(Debug, Clone)]
pub struct AssemblyDefinition {
    /// Token of the row
    pub token: Token,
    /// Identity of the assembly
    pub identity: AssemblyName,
    /// `AssemblyFlags`
    pub flags: u32,
    /// The full public key, empty if unsigned
    pub public_key: Vec<u8>,
    /// Attributes applied to the assembly
    pub custom_attributes: Vec<CustomAttribute>,
}

/// An `AssemblyRef` row
#[derive(Debug, Clone)]
pub struct AssemblyReference {
    /// Token of the row
    pub token: Token,
    /// Identity of the referenced assembly
    pub identity: AssemblyName,
    /// `AssemblyFlags`
    pub flags: u32,
}

/// The `Module` row
#[derive(Debug, Clone)]
pub struct ModuleDefinition {
    /// Token of the row
    pub token: Token,
    /// File name of the module
    pub name: String,
    /// Module version id
    pub mvid: uguid::Guid,
}

/// A custom attribute applied to a declaration
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CustomAttribute {
    /// Token of the `CustomAttribute` row
    pub token: Token,
    /// The attribute type, i.e. the declaring type of its constructor
    pub attribute_type: NamedType,
}

impl CustomAttribute {
    /// Dotted full name of the attribute type
    #[must_use]
    pub fn full_name(&self) -> String {
        self.attribute_type.full_name()
    }
}

/// A `GenericParam` row
#[derive(Debug, Clone)]
pub struct GenericParameterDefinition {
    /// Token of the row
    pub token: Token,
    /// Zero-based position in the owner's parameter list
    pub number: u16,
    /// Variance and special constraints
    pub flags: GenericParamAttributes,
    /// Declared name
    pub name: String,
    /// Owning `TypeDef` or `MethodDef`
    pub owner: Token,
}

/// The shape of a type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// A reference type
    Class,
    /// An interface
    Interface,
    /// A value type other than an enum
    Struct,
    /// An enum
    Enum,
    /// A delegate
    Delegate,
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TypeKind::Class => "class",
            TypeKind::Interface => "interface",
            TypeKind::Struct => "struct",
            TypeKind::Enum => "enum",
            TypeKind::Delegate => "delegate",
        })
    }
}

/// A `TypeDef` row with its members
#[derive(Debug, Clone)]
pub struct TypeDefinition {
    /// Token of the row
    pub token: Token,
    /// `TypeAttributes`
    pub flags: TypeAttributes,
    /// Identity of this type, as referenced from signatures
    pub identity: NamedType,
    /// The enclosing type of a nested type
    pub declaring_type: Option<Token>,
    /// The base type, `None` for interfaces and `System.Object`
    pub base_type: Option<TypeExpr>,
    /// Directly implemented interfaces
    pub interfaces: Vec<TypeExpr>,
    /// Generic parameters, in order
    pub generic_parameters: Vec<Token>,
    /// `Field` rows
    pub fields: Vec<Token>,
    /// `MethodDef` rows
    pub methods: Vec<Token>,
    /// `Property` rows
    pub properties: Vec<Token>,
    /// `Event` rows
    pub events: Vec<Token>,
    /// Directly nested `TypeDef` rows
    pub nested_types: Vec<Token>,
    /// Attributes applied to the type
    pub custom_attributes: Vec<CustomAttribute>,
}

impl TypeDefinition {
    /// Name as stored in metadata, including the generic arity suffix
    #[must_use]
    pub fn name(&self) -> &str {
        &self.identity.name
    }

    /// Namespace of the outermost enclosing type
    #[must_use]
    pub fn namespace(&self) -> &str {
        let mut current = &self.identity;
        while let Some(declaring) = &current.declaring {
            current = declaring;
        }
        &current.namespace
    }

    /// Dotted full name (`Ns.Outer.Inner`)
    #[must_use]
    pub fn full_name(&self) -> String {
        self.identity.full_name()
    }

    /// Accessibility from the type's own flags
    #[must_use]
    pub fn visibility(&self) -> Visibility {
        Visibility::from_type_flags(self.flags)
    }

    /// Returns true for interfaces
    #[must_use]
    pub fn is_interface(&self) -> bool {
        self.flags.contains(TypeAttributes::INTERFACE)
    }

    /// Returns true for abstract classes and interfaces
    #[must_use]
    pub fn is_abstract(&self) -> bool {
        self.flags.contains(TypeAttributes::ABSTRACT)
    }

    /// Returns true for sealed classes, value types and delegates
    #[must_use]
    pub fn is_sealed(&self) -> bool {
        self.flags.contains(TypeAttributes::SEALED)
    }

    /// Classify the type by its flags and base type
    #[must_use]
    pub fn kind(&self) -> TypeKind {
        if self.is_interface() {
            return TypeKind::Interface;
        }

        let base = self
            .base_type
            .as_ref()
            .and_then(TypeExpr::named)
            .filter(|named| named.namespace == "System" && named.declaring.is_none());

        match base.map(|named| named.name.as_str()) {
            Some("Enum") => TypeKind::Enum,
            Some("ValueType") if self.full_name() != "System.Enum" => TypeKind::Struct,
            Some("MulticastDelegate") => TypeKind::Delegate,
            _ => TypeKind::Class,
        }
    }

    /// Returns true for enums
    #[must_use]
    pub fn is_enum(&self) -> bool {
        self.kind() == TypeKind::Enum
    }

    /// Returns true if the type carries an attribute with the given full name
    #[must_use]
    pub fn has_attribute(&self, full_name: &str) -> bool {
        self.custom_attributes
            .iter()
            .any(|attribute| attribute.full_name() == full_name)
    }
}

/// A `Field` row
#[derive(Debug, Clone)]
pub struct FieldDefinition {
    /// Token of the row
    pub token: Token,
    /// `FieldAttributes`
    pub flags: FieldAttributes,
    /// Name
    pub name: String,
    /// Owning type
    pub declaring_type: Token,
    /// Field type
    pub field_type: TypeExpr,
    /// Literal value of a `const` field or enum member
    pub constant: Option<ConstantValue>,
    /// Attributes applied to the field
    pub custom_attributes: Vec<CustomAttribute>,
}

impl FieldDefinition {
    /// Accessibility
    #[must_use]
    pub fn visibility(&self) -> Visibility {
        Visibility::from_member_access(self.flags.bits())
    }

    /// Returns true for static fields
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.flags.contains(FieldAttributes::STATIC)
    }

    /// Returns true for `readonly` fields
    #[must_use]
    pub fn is_init_only(&self) -> bool {
        self.flags.contains(FieldAttributes::INIT_ONLY)
    }

    /// Returns true for `const` fields and enum members
    #[must_use]
    pub fn is_literal(&self) -> bool {
        self.flags.contains(FieldAttributes::LITERAL)
    }
}

/// A resolved method signature
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodSignature {
    /// Instance method
    pub has_this: bool,
    /// Number of generic parameters
    pub generic_param_count: u32,
    /// Return type
    pub return_type: TypeExpr,
    /// Parameter types, in order
    pub parameters: Vec<TypeExpr>,
}

/// A `MethodDef` row
#[derive(Debug, Clone)]
pub struct MethodDefinition {
    /// Token of the row
    pub token: Token,
    /// `MethodAttributes`
    pub flags: MethodAttributes,
    /// `MethodImplAttributes`
    pub impl_flags: u16,
    /// Name
    pub name: String,
    /// Owning type
    pub declaring_type: Token,
    /// Resolved signature
    pub signature: MethodSignature,
    /// `Param` rows, the return value's row (sequence 0) included when present
    pub parameters: Vec<Token>,
    /// Generic parameters, in order
    pub generic_parameters: Vec<Token>,
    /// Attributes applied to the method
    pub custom_attributes: Vec<CustomAttribute>,
}

impl MethodDefinition {
    /// Accessibility
    #[must_use]
    pub fn visibility(&self) -> Visibility {
        Visibility::from_member_access(self.flags.bits())
    }

    /// Returns true for static methods
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.flags.contains(MethodAttributes::STATIC)
    }

    /// Returns true for virtual methods
    #[must_use]
    pub fn is_virtual(&self) -> bool {
        self.flags.contains(MethodAttributes::VIRTUAL)
    }

    /// Returns true for abstract methods
    #[must_use]
    pub fn is_abstract(&self) -> bool {
        self.flags.contains(MethodAttributes::ABSTRACT)
    }

    /// Returns true for virtual methods that cannot be overridden
    #[must_use]
    pub fn is_final(&self) -> bool {
        self.flags.contains(MethodAttributes::FINAL)
    }

    /// Returns true for instance and type constructors
    #[must_use]
    pub fn is_constructor(&self) -> bool {
        self.flags.contains(MethodAttributes::RT_SPECIAL_NAME)
            && (self.name == ".ctor" || self.name == ".cctor")
    }
}

/// A `Param` row
#[derive(Debug, Clone)]
pub struct ParameterDefinition {
    /// Token of the row
    pub token: Token,
    /// `ParamAttributes`
    pub flags: ParamAttributes,
    /// Position; 0 is the return value, parameters start at 1
    pub sequence: u16,
    /// Name
    pub name: String,
    /// Default value of an optional parameter
    pub default: Option<ConstantValue>,
    /// Attributes applied to the parameter
    pub custom_attributes: Vec<CustomAttribute>,
}

/// A parameter of a method: its signature type joined with its `Param` row, if any
#[derive(Debug, Clone, Copy)]
pub struct MethodParameter<'a> {
    /// Zero-based position
    pub position: usize,
    /// Type from the signature
    pub parameter_type: &'a TypeExpr,
    /// The `Param` row describing the parameter
    pub definition: Option<&'a ParameterDefinition>,
}

impl MethodParameter<'_> {
    /// Declared name, empty if the parameter has no `Param` row
    #[must_use]
    pub fn name(&self) -> &str {
        self.definition.map_or("", |definition| definition.name.as_str())
    }

    /// Flags of the `Param` row, empty if there is none
    #[must_use]
    pub fn flags(&self) -> ParamAttributes {
        self.definition
            .map_or(ParamAttributes::empty(), |definition| definition.flags)
    }
}

/// A method attached to a property or event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Accessor {
    /// The role of the method
    pub semantics: MethodSemanticsAttributes,
    /// The `MethodDef` row
    pub method: Token,
}

/// A `Property` row
#[derive(Debug, Clone)]
pub struct PropertyDefinition {
    /// Token of the row
    pub token: Token,
    /// `PropertyAttributes`
    pub flags: u16,
    /// Name
    pub name: String,
    /// Owning type
    pub declaring_type: Token,
    /// Instance property
    pub has_this: bool,
    /// Property type
    pub property_type: TypeExpr,
    /// Index parameter types of an indexer
    pub parameters: Vec<TypeExpr>,
    /// Getter, setter and other methods
    pub accessors: Vec<Accessor>,
    /// Attributes applied to the property
    pub custom_attributes: Vec<CustomAttribute>,
}

/// An `Event` row
#[derive(Debug, Clone)]
pub struct EventDefinition {
    /// Token of the row
    pub token: Token,
    /// `EventAttributes`
    pub flags: u16,
    /// Name
    pub name: String,
    /// Owning type
    pub declaring_type: Token,
    /// Delegate type of the event
    pub event_type: Option<TypeExpr>,
    /// Add, remove, fire and other methods
    pub accessors: Vec<Accessor>,
    /// Attributes applied to the event
    pub custom_attributes: Vec<CustomAttribute>,
}

/// Anything a token can resolve to
#[derive(Debug, Clone, Copy)]
pub enum Entity<'a> {
    /// `Assembly` row
    Assembly(&'a AssemblyDefinition),
    /// `AssemblyRef` row
    AssemblyReference(&'a AssemblyReference),
    /// `Module` row
    Module(&'a ModuleDefinition),
    /// `TypeDef` row
    Type(&'a TypeDefinition),
    /// `TypeRef` row, resolved to a name
    TypeReference(&'a NamedType),
    /// `TypeSpec` row, resolved to a type expression
    TypeSpecification(&'a TypeExpr),
    /// `Field` row
    Field(&'a FieldDefinition),
    /// `MethodDef` row
    Method(&'a MethodDefinition),
    /// `Param` row
    Parameter(&'a ParameterDefinition),
    /// `Property` row
    Property(&'a PropertyDefinition),
    /// `Event` row
    Event(&'a EventDefinition),
    /// `GenericParam` row
    GenericParameter(&'a GenericParameterDefinition),
}
