use crate::metadata::token::Token;

/// The `ELEMENT_TYPE_*` constants of ECMA-335 II.23.1.16
#[allow(non_snake_case)]
#[allow(missing_docs)]
pub mod ELEMENT_TYPE {
    // Marks end of a list
    pub const END: u8 = 0x00;
    pub const VOID: u8 = 0x01;
    pub const BOOLEAN: u8 = 0x02;
    pub const CHAR: u8 = 0x03;
    pub const I1: u8 = 0x04;
    pub const U1: u8 = 0x05;
    pub const I2: u8 = 0x06;
    pub const U2: u8 = 0x07;
    pub const I4: u8 = 0x08;
    pub const U4: u8 = 0x09;
    pub const I8: u8 = 0x0a;
    pub const U8: u8 = 0x0b;
    pub const R4: u8 = 0x0c;
    pub const R8: u8 = 0x0d;
    pub const STRING: u8 = 0x0e;
    // Followed by type
    pub const PTR: u8 = 0x0f;
    // Followed by type
    pub const BYREF: u8 = 0x10;
    // Followed by TypeDef or TypeRef token
    pub const VALUETYPE: u8 = 0x11;
    // Followed by TypeDef or TypeRef token
    pub const CLASS: u8 = 0x12;
    // Generic parameter in a generic type definition, represented as number
    pub const VAR: u8 = 0x13;
    // type rank boundsCount bound1 … loCount lo1 …
    pub const ARRAY: u8 = 0x14;
    // Generic type instantiation. Followed by type type-arg-count type-1 ... type-n
    pub const GENERICINST: u8 = 0x15;
    pub const TYPEDBYREF: u8 = 0x16;
    // System.IntPtr
    pub const I: u8 = 0x18;
    // System.UIntPtr
    pub const U: u8 = 0x19;
    // Followed by full method signature
    pub const FNPTR: u8 = 0x1b;
    // System.Object
    pub const OBJECT: u8 = 0x1c;
    // Single-dim array with 0 lower bound
    pub const SZARRAY: u8 = 0x1d;
    // Generic parameter in a generic method definition, represented as number
    pub const MVAR: u8 = 0x1e;
    // Required modifier, followed by a TypeDef or TypeRef token
    pub const CMOD_REQD: u8 = 0x1f;
    // Optional modifier, followed by a TypeDef or TypeRef token
    pub const CMOD_OPT: u8 = 0x20;
    // Implemented within the CLI
    pub const INTERNAL: u8 = 0x21;
    // Sentinel for vararg method signature
    pub const SENTINEL: u8 = 0x41;
    // Denotes a local variable that points at a pinned object
    pub const PINNED: u8 = 0x45;
}

/// The leading byte of a signature blob (II.23.2.1 - II.23.2.5)
#[allow(non_snake_case)]
#[allow(missing_docs)]
pub mod SIGNATURE_HEADER {
    pub const DEFAULT: u8 = 0x00;
    pub const C: u8 = 0x01;
    pub const STDCALL: u8 = 0x02;
    pub const THISCALL: u8 = 0x03;
    pub const FASTCALL: u8 = 0x04;
    pub const VARARG: u8 = 0x05;
    pub const FIELD: u8 = 0x06;
    pub const LOCAL_SIG: u8 = 0x07;
    pub const PROPERTY: u8 = 0x08;
    pub const UNMANAGED: u8 = 0x09;
    pub const GENERIC_INST: u8 = 0x0a;
    pub const KIND_MASK: u8 = 0x0f;
    pub const GENERIC: u8 = 0x10;
    pub const HAS_THIS: u8 = 0x20;
    pub const EXPLICIT_THIS: u8 = 0x40;
}

/// Represents a parsed type in field, method, property and type specification signatures
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeSignature {
    /// void
    Void,
    /// bool
    Boolean,
    /// char
    Char,
    /// signed 8bit integer
    I1,
    /// unsigned 8bit integer
    U1,
    /// signed 16bit integer
    I2,
    /// unsigned 16bit integer
    U2,
    /// signed 32bit integer
    I4,
    /// unsigned 32bit integer
    U4,
    /// signed 64bit integer
    I8,
    /// unsigned 64bit integer
    U8,
    /// 32bit floating-point
    R4,
    /// 64bit floating-point
    R8,
    /// System.String
    String,
    /// A pointer to a type
    Ptr(Box<TypeSignature>),
    /// Type by reference
    ByRef(Box<TypeSignature>),
    /// CIL value-type
    // TypeDefOrRefOrSpecEncoded
    ValueType(Token),
    /// CIL Class
    // TypeDefOrRefOrSpecEncoded
    Class(Token),
    /// Generic parameter of the enclosing type, by position
    GenericParamType(u32),
    /// General array
    Array(SignatureArray),
    /// Generic type and its arguments
    GenericInst(Box<TypeSignature>, Vec<TypeSignature>),
    /// Type is referenced during runtime
    TypedByRef,
    /// signed integer, sized to executing platform
    I,
    /// unsigned integer, sized to executing platform
    U,
    /// Function pointer
    FnPtr(Box<SignatureMethod>),
    /// System.Object
    Object,
    /// Single dimension array with a zero lower bound
    SzArray(Box<TypeSignature>),
    /// Generic parameter of the enclosing method, by position
    GenericParamMethod(u32),
    /// A type annotated with a custom modifier
    Modified(CustomModifier, Box<TypeSignature>),
    /// A pinned type
    Pinned(Box<TypeSignature>),
}

/// A `modreq` / `modopt` annotation (II.7.1.1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CustomModifier {
    /// `modreq` if true, `modopt` otherwise
    pub required: bool,
    /// `TypeDefOrRefOrSpecEncoded` token of the modifier type
    pub modifier: Token,
}

/// Size and lower bound of one array dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ArrayDimensions {
    /// The declared size, if any
    pub size: Option<u32>,
    /// The declared lower bound, if any
    pub lower_bound: Option<i32>,
}

/// A general (possibly multi-dimensional) array (II.23.2.13)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SignatureArray {
    /// The type in the array
    pub base: Box<TypeSignature>,
    /// The number of dimensions
    pub rank: u32,
    /// The dimensions (can be less than 'rank', are in order from 0..count)
    pub dimensions: Vec<ArrayDimensions>,
}

/// Calling convention of a method signature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CallingConvention {
    /// Managed default
    #[default]
    Default,
    /// Native `cdecl`
    C,
    /// Native `stdcall`
    StdCall,
    /// Native `thiscall`
    ThisCall,
    /// Native `fastcall`
    FastCall,
    /// Managed variable argument list
    VarArg,
    /// Unmanaged, with the convention given by a modifier
    Unmanaged,
}

/// Parameter or return type with optional custom modifiers
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SignatureParameter {
    /// Custom modifiers, outermost first
    pub modifiers: Vec<CustomModifier>,
    /// Parameter is passed by reference
    pub by_ref: bool,
    /// The type of the parameter
    pub base: TypeSignature,
}

/// Represents a method signature (II.23.2.1 - II.23.2.3)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SignatureMethod {
    /// Used to encode the keyword instance in the calling convention, see §II.15.3
    pub has_this: bool,
    /// Used to encode the keyword explicit in the calling convention, see §II.15.3
    pub explicit_this: bool,
    /// The calling convention
    pub calling_convention: CallingConvention,
    /// Number of generic parameters of the method
    pub generic_param_count: u32,
    /// The return type of this `Method`
    pub return_type: SignatureParameter,
    /// The fixed parameters of this `Method`
    pub params: Vec<SignatureParameter>,
    /// The parameters after the sentinel of a vararg call site
    pub varargs: Vec<SignatureParameter>,
}

/// Field signature (II.23.2.4)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SignatureField {
    /// The custom modifiers for this field, outermost first
    pub modifiers: Vec<CustomModifier>,
    /// The type of this field
    pub base: TypeSignature,
}

/// Property signature (II.23.2.5)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SignatureProperty {
    /// Indicates the passing of a 'this' pointer
    pub has_this: bool,
    /// The custom modifiers of the property type, outermost first
    pub modifiers: Vec<CustomModifier>,
    /// The type of this property
    pub base: TypeSignature,
    /// The index parameters of this property
    pub params: Vec<SignatureParameter>,
}

/// Type specification signature (II.23.2.14)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SignatureTypeSpec {
    /// Signature of this type
    pub base: TypeSignature,
}

impl TypeSignature {
    /// Wrap `self` in `modifiers`, the first modifier ending up outermost.
    #[must_use]
    pub fn with_modifiers(self, modifiers: &[CustomModifier]) -> TypeSignature {
        modifiers
            .iter()
            .rev()
            .fold(self, |inner, modifier| {
                TypeSignature::Modified(*modifier, Box::new(inner))
            })
    }
}

impl SignatureParameter {
    /// The parameter type with its modifiers and by-ref marker applied
    #[must_use]
    pub fn full_type(&self) -> TypeSignature {
        let base = if self.by_ref {
            TypeSignature::ByRef(Box::new(self.base.clone()))
        } else {
            self.base.clone()
        };
        base.with_modifiers(&self.modifiers)
    }
}
