use std::fmt;

use crate::{
    file::io::read_le,
    metadata::signatures::{TypeSignature, ELEMENT_TYPE},
    Result,
};

/// Represents all primitive types in CIL/.NET
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrimitiveKind {
    /// System.Void - represents no value
    Void,
    /// System.Boolean - true/false value
    Boolean,
    /// System.Char - Unicode 16-bit character
    Char,
    /// System.SByte - signed 8-bit integer
    I1,
    /// System.Byte - unsigned 8-bit integer
    U1,
    /// System.Int16 - signed 16-bit integer
    I2,
    /// System.UInt16 - unsigned 16-bit integer
    U2,
    /// System.Int32 - signed 32-bit integer
    I4,
    /// System.UInt32 - unsigned 32-bit integer
    U4,
    /// System.Int64 - signed 64-bit integer
    I8,
    /// System.UInt64 - unsigned 64-bit integer
    U8,
    /// System.Single - 32-bit floating point
    R4,
    /// System.Double - 64-bit floating point
    R8,
    /// System.IntPtr - native sized signed integer
    I,
    /// System.UIntPtr - native sized unsigned integer
    U,
    /// System.Object - base class for all reference types
    Object,
    /// System.String - immutable string of Unicode characters
    String,
    /// System.TypedReference - type-safe pointer (used by compiler)
    TypedReference,
}

impl PrimitiveKind {
    /// The primitive a signature element stands for, if it is one
    #[must_use]
    pub fn from_signature(signature: &TypeSignature) -> Option<PrimitiveKind> {
        Some(match signature {
            TypeSignature::Void => PrimitiveKind::Void,
            TypeSignature::Boolean => PrimitiveKind::Boolean,
            TypeSignature::Char => PrimitiveKind::Char,
            TypeSignature::I1 => PrimitiveKind::I1,
            TypeSignature::U1 => PrimitiveKind::U1,
            TypeSignature::I2 => PrimitiveKind::I2,
            TypeSignature::U2 => PrimitiveKind::U2,
            TypeSignature::I4 => PrimitiveKind::I4,
            TypeSignature::U4 => PrimitiveKind::U4,
            TypeSignature::I8 => PrimitiveKind::I8,
            TypeSignature::U8 => PrimitiveKind::U8,
            TypeSignature::R4 => PrimitiveKind::R4,
            TypeSignature::R8 => PrimitiveKind::R8,
            TypeSignature::I => PrimitiveKind::I,
            TypeSignature::U => PrimitiveKind::U,
            TypeSignature::Object => PrimitiveKind::Object,
            TypeSignature::String => PrimitiveKind::String,
            TypeSignature::TypedByRef => PrimitiveKind::TypedReference,
            _ => return None,
        })
    }

    /// The primitive a type in the `System` namespace stands for, if it is one.
    ///
    /// Signatures may spell a primitive either with its element type or as a class / value type
    /// reference; both spellings must compare equal.
    #[must_use]
    pub fn from_system_name(name: &str) -> Option<PrimitiveKind> {
        Some(match name {
            "Void" => PrimitiveKind::Void,
            "Boolean" => PrimitiveKind::Boolean,
            "Char" => PrimitiveKind::Char,
            "SByte" => PrimitiveKind::I1,
            "Byte" => PrimitiveKind::U1,
            "Int16" => PrimitiveKind::I2,
            "UInt16" => PrimitiveKind::U2,
            "Int32" => PrimitiveKind::I4,
            "UInt32" => PrimitiveKind::U4,
            "Int64" => PrimitiveKind::I8,
            "UInt64" => PrimitiveKind::U8,
            "Single" => PrimitiveKind::R4,
            "Double" => PrimitiveKind::R8,
            "IntPtr" => PrimitiveKind::I,
            "UIntPtr" => PrimitiveKind::U,
            "Object" => PrimitiveKind::Object,
            "String" => PrimitiveKind::String,
            "TypedReference" => PrimitiveKind::TypedReference,
            _ => return None,
        })
    }

    /// The C# keyword (or type name) of this primitive
    #[must_use]
    pub fn keyword(&self) -> &'static str {
        match self {
            PrimitiveKind::Void => "void",
            PrimitiveKind::Boolean => "bool",
            PrimitiveKind::Char => "char",
            PrimitiveKind::I1 => "sbyte",
            PrimitiveKind::U1 => "byte",
            PrimitiveKind::I2 => "short",
            PrimitiveKind::U2 => "ushort",
            PrimitiveKind::I4 => "int",
            PrimitiveKind::U4 => "uint",
            PrimitiveKind::I8 => "long",
            PrimitiveKind::U8 => "ulong",
            PrimitiveKind::R4 => "float",
            PrimitiveKind::R8 => "double",
            PrimitiveKind::I => "nint",
            PrimitiveKind::U => "nuint",
            PrimitiveKind::Object => "object",
            PrimitiveKind::String => "string",
            PrimitiveKind::TypedReference => "TypedReference",
        }
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// The value of a `Constant` row: a field literal, a parameter default or an enum member.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstantValue {
    /// The null reference
    Null,
    /// Boolean value
    Boolean(bool),
    /// UTF-16 code unit
    Char(u16),
    /// 8-bit signed integer
    I1(i8),
    /// 8-bit unsigned integer
    U1(u8),
    /// 16-bit signed integer
    I2(i16),
    /// 16-bit unsigned integer
    U2(u16),
    /// 32-bit signed integer
    I4(i32),
    /// 32-bit unsigned integer
    U4(u32),
    /// 64-bit signed integer
    I8(i64),
    /// 64-bit unsigned integer
    U8(u64),
    /// 32-bit floating point
    R4(f32),
    /// 64-bit floating point
    R8(f64),
    /// String value
    String(String),
    /// A constant of a type without a dedicated variant
    Bytes(Vec<u8>),
}

impl ConstantValue {
    /// Decode a constant of the element type `type_byte` from its blob.
    ///
    /// ## Arguments
    /// * `type_byte`   - The `ELEMENT_TYPE_*` of the `Constant` row
    /// * `data`        - The data blob to parse for the value
    ///
    /// # Errors
    /// Returns [`crate::Error::UnexpectedEndOfData`] if the data is too short for the type, or
    /// [`crate::Error::MalformedImage`] for invalid string data.
    pub fn from_bytes(type_byte: u8, data: &[u8]) -> Result<Self> {
        match type_byte {
            ELEMENT_TYPE::BOOLEAN => Ok(ConstantValue::Boolean(read_le::<u8>(data)? != 0)),
            ELEMENT_TYPE::CHAR => Ok(ConstantValue::Char(read_le::<u16>(data)?)),
            ELEMENT_TYPE::I1 => Ok(ConstantValue::I1(read_le::<i8>(data)?)),
            ELEMENT_TYPE::U1 => Ok(ConstantValue::U1(read_le::<u8>(data)?)),
            ELEMENT_TYPE::I2 => Ok(ConstantValue::I2(read_le::<i16>(data)?)),
            ELEMENT_TYPE::U2 => Ok(ConstantValue::U2(read_le::<u16>(data)?)),
            ELEMENT_TYPE::I4 => Ok(ConstantValue::I4(read_le::<i32>(data)?)),
            ELEMENT_TYPE::U4 => Ok(ConstantValue::U4(read_le::<u32>(data)?)),
            ELEMENT_TYPE::I8 => Ok(ConstantValue::I8(read_le::<i64>(data)?)),
            ELEMENT_TYPE::U8 => Ok(ConstantValue::U8(read_le::<u64>(data)?)),
            ELEMENT_TYPE::R4 => Ok(ConstantValue::R4(read_le::<f32>(data)?)),
            ELEMENT_TYPE::R8 => Ok(ConstantValue::R8(read_le::<f64>(data)?)),
            ELEMENT_TYPE::CLASS => Ok(ConstantValue::Null),
            ELEMENT_TYPE::STRING => {
                if data.len() % 2 != 0 {
                    return Err(malformed_error!(
                        "Invalid UTF-16 string length: {} (must be even)",
                        data.len()
                    ));
                }

                let utf16_chars: Vec<u16> = data
                    .chunks_exact(2)
                    .map(|chunk| u16::from_le_bytes([chunk[0], chunk[1]]))
                    .collect();

                match String::from_utf16(&utf16_chars) {
                    Ok(utf_string) => Ok(ConstantValue::String(utf_string)),
                    Err(_) => Err(malformed_error!("Invalid UTF-16 sequence in constant")),
                }
            }
            _ => Ok(ConstantValue::Bytes(data.to_vec())),
        }
    }

    /// The value widened to `i128`, for integral constants (enum members in particular)
    #[must_use]
    pub fn as_i128(&self) -> Option<i128> {
        match self {
            ConstantValue::Boolean(value) => Some(i128::from(*value)),
            ConstantValue::Char(value) => Some(i128::from(*value)),
            ConstantValue::I1(value) => Some(i128::from(*value)),
            ConstantValue::U1(value) => Some(i128::from(*value)),
            ConstantValue::I2(value) => Some(i128::from(*value)),
            ConstantValue::U2(value) => Some(i128::from(*value)),
            ConstantValue::I4(value) => Some(i128::from(*value)),
            ConstantValue::U4(value) => Some(i128::from(*value)),
            ConstantValue::I8(value) => Some(i128::from(*value)),
            ConstantValue::U8(value) => Some(i128::from(*value)),
            _ => None,
        }
    }
}

impl fmt::Display for ConstantValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstantValue::Null => write!(f, "null"),
            ConstantValue::Boolean(value) => write!(f, "{value}"),
            ConstantValue::Char(value) => match char::from_u32(u32::from(*value)) {
                Some(c) => write!(f, "'{c}'"),
                None => write!(f, "'\\u{value:04X}'"),
            },
            ConstantValue::I1(value) => write!(f, "{value}"),
            ConstantValue::U1(value) => write!(f, "{value}"),
            ConstantValue::I2(value) => write!(f, "{value}"),
            ConstantValue::U2(value) => write!(f, "{value}"),
            ConstantValue::I4(value) => write!(f, "{value}"),
            ConstantValue::U4(value) => write!(f, "{value}"),
            ConstantValue::I8(value) => write!(f, "{value}"),
            ConstantValue::U8(value) => write!(f, "{value}"),
            ConstantValue::R4(value) => write!(f, "{value}"),
            ConstantValue::R8(value) => write!(f, "{value}"),
            ConstantValue::String(value) => write!(f, "\"{value}\""),
            ConstantValue::Bytes(value) => {
                write!(f, "Bytes[")?;
                for (i, byte) in value.iter().enumerate().take(8) {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{byte:02X}")?;
                }
                if value.len() > 8 {
                    write!(f, "...")?;
                }
                write!(f, "]")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constants_from_bytes() {
        assert_eq!(
            ConstantValue::from_bytes(ELEMENT_TYPE::I4, &[0x02, 0x00, 0x00, 0x00]).unwrap(),
            ConstantValue::I4(2)
        );
        assert_eq!(
            ConstantValue::from_bytes(ELEMENT_TYPE::U1, &[0xFF]).unwrap(),
            ConstantValue::U1(255)
        );
        assert_eq!(
            ConstantValue::from_bytes(ELEMENT_TYPE::STRING, &[0x68, 0x00, 0x69, 0x00]).unwrap(),
            ConstantValue::String("hi".to_string())
        );
        assert_eq!(
            ConstantValue::from_bytes(ELEMENT_TYPE::CLASS, &[0x00, 0x00, 0x00, 0x00]).unwrap(),
            ConstantValue::Null
        );
        assert!(matches!(
            ConstantValue::from_bytes(ELEMENT_TYPE::I8, &[0x01]),
            Err(crate::Error::UnexpectedEndOfData)
        ));
        assert!(ConstantValue::from_bytes(ELEMENT_TYPE::STRING, &[0x68]).is_err());
    }

    #[test]
    fn integral_widening() {
        assert_eq!(ConstantValue::I1(-1).as_i128(), Some(-1));
        assert_eq!(ConstantValue::U8(u64::MAX).as_i128(), Some(i128::from(u64::MAX)));
        assert_eq!(ConstantValue::String("x".into()).as_i128(), None);
        assert_eq!(ConstantValue::R8(1.0).as_i128(), None);
    }

    #[test]
    fn display() {
        assert_eq!(ConstantValue::Null.to_string(), "null");
        assert_eq!(ConstantValue::Char(0x41).to_string(), "'A'");
        assert_eq!(ConstantValue::String("a".into()).to_string(), "\"a\"");
        assert_eq!(ConstantValue::Bytes(vec![1, 2]).to_string(), "Bytes[01 02]");
        assert_eq!(PrimitiveKind::I4.to_string(), "int");
        assert_eq!(PrimitiveKind::from_system_name("Int64"), Some(PrimitiveKind::I8));
    }
}
