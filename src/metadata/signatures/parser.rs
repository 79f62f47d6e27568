//! Recursive-descent decoder for signature blobs.
//!
//! Every signature kind starts with a header byte (see [`SIGNATURE_HEADER`]), followed by a
//! sequence of types encoded as `ELEMENT_TYPE_*` bytes with their operands. Nested types are
//! decoded recursively; the nesting depth is capped at [`MAX_RECURSION_DEPTH`] so that hostile
//! blobs cannot overflow the stack.

use crate::{
    file::parser::Parser,
    metadata::{
        signatures::{
            ArrayDimensions, CallingConvention, CustomModifier, SignatureArray, SignatureField,
            SignatureMethod, SignatureParameter, SignatureProperty, SignatureTypeSpec,
            TypeSignature, ELEMENT_TYPE, SIGNATURE_HEADER,
        },
        token::Token,
    },
    Error::RecursionLimit,
    Result,
};

/// Maximum nesting depth of types within one signature
pub const MAX_RECURSION_DEPTH: usize = 50;

/// Decoder for the signature blobs of the `#Blob` heap
pub struct SignatureParser<'a> {
    parser: Parser<'a>,
    depth: usize,
}

impl<'a> SignatureParser<'a> {
    /// Create a new `SignatureParser` over one blob
    ///
    /// # Arguments
    /// * 'data' - The blob contents, without the length prefix
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        SignatureParser {
            parser: Parser::new(data),
            depth: 0,
        }
    }

    /// Decode one type
    ///
    /// # Errors
    /// Returns [`crate::Error::RecursionLimit`] if the type nests too deeply, or a decoding error
    /// for truncated data and unknown element types.
    pub fn parse_type(&mut self) -> Result<TypeSignature> {
        self.depth += 1;
        if self.depth >= MAX_RECURSION_DEPTH {
            return Err(RecursionLimit(MAX_RECURSION_DEPTH));
        }

        let result = self.parse_type_inner();
        self.depth -= 1;
        result
    }

    fn parse_type_inner(&mut self) -> Result<TypeSignature> {
        let current_byte = self.parser.read_le::<u8>()?;
        match current_byte {
            ELEMENT_TYPE::VOID => Ok(TypeSignature::Void),
            ELEMENT_TYPE::BOOLEAN => Ok(TypeSignature::Boolean),
            ELEMENT_TYPE::CHAR => Ok(TypeSignature::Char),
            ELEMENT_TYPE::I1 => Ok(TypeSignature::I1),
            ELEMENT_TYPE::U1 => Ok(TypeSignature::U1),
            ELEMENT_TYPE::I2 => Ok(TypeSignature::I2),
            ELEMENT_TYPE::U2 => Ok(TypeSignature::U2),
            ELEMENT_TYPE::I4 => Ok(TypeSignature::I4),
            ELEMENT_TYPE::U4 => Ok(TypeSignature::U4),
            ELEMENT_TYPE::I8 => Ok(TypeSignature::I8),
            ELEMENT_TYPE::U8 => Ok(TypeSignature::U8),
            ELEMENT_TYPE::R4 => Ok(TypeSignature::R4),
            ELEMENT_TYPE::R8 => Ok(TypeSignature::R8),
            ELEMENT_TYPE::STRING => Ok(TypeSignature::String),
            ELEMENT_TYPE::PTR => Ok(TypeSignature::Ptr(Box::new(self.parse_type()?))),
            ELEMENT_TYPE::BYREF => Ok(TypeSignature::ByRef(Box::new(self.parse_type()?))),
            ELEMENT_TYPE::VALUETYPE => Ok(TypeSignature::ValueType(
                self.parser.read_compressed_token()?,
            )),
            ELEMENT_TYPE::CLASS => Ok(TypeSignature::Class(self.parser.read_compressed_token()?)),
            ELEMENT_TYPE::VAR => Ok(TypeSignature::GenericParamType(
                self.parser.read_compressed_uint()?,
            )),
            ELEMENT_TYPE::ARRAY => {
                let elem_type = self.parse_type()?;
                let rank = self.parser.read_compressed_uint()?;

                let num_sizes = self.parser.read_compressed_uint()?;
                if num_sizes > rank {
                    return Err(malformed_error!(
                        "ARRAY - {} sizes for rank {}",
                        num_sizes,
                        rank
                    ));
                }

                let mut dimensions: Vec<ArrayDimensions> = Vec::with_capacity(num_sizes as usize);
                for _ in 0..num_sizes {
                    dimensions.push(ArrayDimensions {
                        size: Some(self.parser.read_compressed_uint()?),
                        lower_bound: None,
                    });
                }

                let num_lo_bounds = self.parser.read_compressed_uint()?;
                if num_lo_bounds > rank {
                    return Err(malformed_error!(
                        "ARRAY - {} lower bounds for rank {}",
                        num_lo_bounds,
                        rank
                    ));
                }

                for i in 0..num_lo_bounds as usize {
                    let lower_bound = self.parser.read_compressed_int()?;
                    match dimensions.get_mut(i) {
                        Some(dimension) => dimension.lower_bound = Some(lower_bound),
                        None => dimensions.push(ArrayDimensions {
                            size: None,
                            lower_bound: Some(lower_bound),
                        }),
                    }
                }

                Ok(TypeSignature::Array(SignatureArray {
                    base: Box::new(elem_type),
                    rank,
                    dimensions,
                }))
            }
            ELEMENT_TYPE::GENERICINST => {
                let peek_byte = self.parser.peek_byte()?;
                if peek_byte != ELEMENT_TYPE::CLASS && peek_byte != ELEMENT_TYPE::VALUETYPE {
                    return Err(malformed_error!(
                        "GENERICINST - Next byte is not TYPE_CLASS or TYPE_VALUE - {}",
                        peek_byte
                    ));
                }

                let base_type = self.parse_type()?;
                let arg_count = self.parser.read_compressed_uint()?;

                let mut type_args = Vec::with_capacity(arg_count.min(64) as usize);
                for _ in 0..arg_count {
                    type_args.push(self.parse_type()?);
                }

                Ok(TypeSignature::GenericInst(Box::new(base_type), type_args))
            }
            ELEMENT_TYPE::TYPEDBYREF => Ok(TypeSignature::TypedByRef),
            ELEMENT_TYPE::I => Ok(TypeSignature::I),
            ELEMENT_TYPE::U => Ok(TypeSignature::U),
            ELEMENT_TYPE::FNPTR => Ok(TypeSignature::FnPtr(Box::new(
                self.parse_method_signature()?,
            ))),
            ELEMENT_TYPE::OBJECT => Ok(TypeSignature::Object),
            ELEMENT_TYPE::SZARRAY => Ok(TypeSignature::SzArray(Box::new(self.parse_type()?))),
            ELEMENT_TYPE::MVAR => Ok(TypeSignature::GenericParamMethod(
                self.parser.read_compressed_uint()?,
            )),
            ELEMENT_TYPE::CMOD_REQD | ELEMENT_TYPE::CMOD_OPT => {
                let modifier = CustomModifier {
                    required: current_byte == ELEMENT_TYPE::CMOD_REQD,
                    modifier: self.parser.read_compressed_token()?,
                };
                Ok(TypeSignature::Modified(
                    modifier,
                    Box::new(self.parse_type()?),
                ))
            }
            ELEMENT_TYPE::PINNED => Ok(TypeSignature::Pinned(Box::new(self.parse_type()?))),
            _ => Err(malformed_error!(
                "Unsupported ELEMENT_TYPE - {}",
                current_byte
            )),
        }
    }

    fn parse_custom_mods(&mut self) -> Result<Vec<CustomModifier>> {
        let mut mods = Vec::new();

        while self.parser.has_more_data() {
            let next_byte = self.parser.peek_byte()?;
            if next_byte != ELEMENT_TYPE::CMOD_REQD && next_byte != ELEMENT_TYPE::CMOD_OPT {
                break;
            }

            self.parser.advance()?;
            mods.push(CustomModifier {
                required: next_byte == ELEMENT_TYPE::CMOD_REQD,
                modifier: self.parser.read_compressed_token()?,
            });
        }

        Ok(mods)
    }

    fn parse_param(&mut self) -> Result<SignatureParameter> {
        let custom_mods = self.parse_custom_mods()?;

        let mut by_ref = false;
        if self.parser.peek_byte()? == ELEMENT_TYPE::BYREF {
            self.parser.advance()?;
            by_ref = true;
        }

        Ok(SignatureParameter {
            modifiers: custom_mods,
            by_ref,
            base: self.parse_type()?,
        })
    }

    /// Decode a `MethodDefSig`, `MethodRefSig` or `StandAloneMethodSig`
    ///
    /// # Errors
    /// Returns a decoding error if the blob is truncated or contains an invalid type.
    pub fn parse_method_signature(&mut self) -> Result<SignatureMethod> {
        let convention_byte = self.parser.read_le::<u8>()?;

        let calling_convention = match convention_byte & SIGNATURE_HEADER::KIND_MASK {
            SIGNATURE_HEADER::DEFAULT => CallingConvention::Default,
            SIGNATURE_HEADER::C => CallingConvention::C,
            SIGNATURE_HEADER::STDCALL => CallingConvention::StdCall,
            SIGNATURE_HEADER::THISCALL => CallingConvention::ThisCall,
            SIGNATURE_HEADER::FASTCALL => CallingConvention::FastCall,
            SIGNATURE_HEADER::VARARG => CallingConvention::VarArg,
            SIGNATURE_HEADER::UNMANAGED => CallingConvention::Unmanaged,
            other => {
                return Err(malformed_error!(
                    "SignatureMethod - invalid calling convention - {}",
                    other
                ))
            }
        };

        let generic_param_count = if convention_byte & SIGNATURE_HEADER::GENERIC != 0 {
            self.parser.read_compressed_uint()?
        } else {
            0
        };

        let param_count = self.parser.read_compressed_uint()?;
        let return_type = self.parse_param()?;

        let mut params = Vec::with_capacity(param_count.min(64) as usize);
        let mut varargs = Vec::new();
        for _ in 0..param_count {
            if self.parser.peek_byte()? == ELEMENT_TYPE::SENTINEL {
                self.parser.advance()?;
                varargs.push(self.parse_param()?);
                continue;
            }

            if varargs.is_empty() {
                params.push(self.parse_param()?);
            } else {
                varargs.push(self.parse_param()?);
            }
        }

        Ok(SignatureMethod {
            has_this: convention_byte & SIGNATURE_HEADER::HAS_THIS != 0,
            explicit_this: convention_byte & SIGNATURE_HEADER::EXPLICIT_THIS != 0,
            calling_convention,
            generic_param_count,
            return_type,
            params,
            varargs,
        })
    }

    /// Decode a `FieldSig`
    ///
    /// # Errors
    /// Returns [`crate::Error::MalformedImage`] if the header byte is not `FIELD`, or a decoding
    /// error for the field type.
    pub fn parse_field_signature(&mut self) -> Result<SignatureField> {
        let head_byte = self.parser.read_le::<u8>()?;
        if head_byte & SIGNATURE_HEADER::KIND_MASK != SIGNATURE_HEADER::FIELD {
            return Err(malformed_error!(
                "SignatureField - invalid start - {}",
                head_byte
            ));
        }

        let custom_mods = self.parse_custom_mods()?;
        let type_sig = self.parse_type()?;

        Ok(SignatureField {
            modifiers: custom_mods,
            base: type_sig,
        })
    }

    /// Decode a `PropertySig`
    ///
    /// # Errors
    /// Returns [`crate::Error::MalformedImage`] if the header byte is not `PROPERTY`, or a
    /// decoding error for the property or parameter types.
    pub fn parse_property_signature(&mut self) -> Result<SignatureProperty> {
        let head_byte = self.parser.read_le::<u8>()?;
        if head_byte & SIGNATURE_HEADER::KIND_MASK != SIGNATURE_HEADER::PROPERTY {
            return Err(malformed_error!(
                "SignatureProperty - invalid start - {}",
                head_byte
            ));
        }

        let has_this = (head_byte & SIGNATURE_HEADER::HAS_THIS) != 0;

        let param_count = self.parser.read_compressed_uint()?;
        let custom_mods = self.parse_custom_mods()?;
        let type_sig = self.parse_type()?;

        let mut params = Vec::with_capacity(param_count.min(64) as usize);
        for _ in 0..param_count {
            params.push(self.parse_param()?);
        }

        Ok(SignatureProperty {
            has_this,
            modifiers: custom_mods,
            base: type_sig,
            params,
        })
    }

    /// Decode a `TypeSpec` blob
    ///
    /// # Errors
    /// Returns a decoding error if the blob is truncated or contains an invalid type.
    pub fn parse_type_spec_signature(&mut self) -> Result<SignatureTypeSpec> {
        Ok(SignatureTypeSpec {
            base: self.parse_type()?,
        })
    }
}

/// Decode a single `TypeDefOrRefOrSpecEncoded` value, as found in event types and modifiers.
///
/// # Errors
/// Returns [`crate::Error::MalformedImage`] for an invalid table tag.
pub fn parse_type_def_or_ref(data: &[u8]) -> Result<Token> {
    Parser::new(data).read_compressed_token()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitive_types() {
        #[rustfmt::skip]
        let cases: [(u8, TypeSignature); 16] = [
            (0x01, TypeSignature::Void),
            (0x02, TypeSignature::Boolean),
            (0x03, TypeSignature::Char),
            (0x04, TypeSignature::I1),
            (0x05, TypeSignature::U1),
            (0x06, TypeSignature::I2),
            (0x07, TypeSignature::U2),
            (0x08, TypeSignature::I4),
            (0x09, TypeSignature::U4),
            (0x0a, TypeSignature::I8),
            (0x0b, TypeSignature::U8),
            (0x0c, TypeSignature::R4),
            (0x0d, TypeSignature::R8),
            (0x0e, TypeSignature::String),
            (0x18, TypeSignature::I),
            (0x1c, TypeSignature::Object),
        ];

        for (byte, expected) in cases {
            let data = [byte];
            let mut parser = SignatureParser::new(&data);
            assert_eq!(parser.parse_type().unwrap(), expected);
        }
    }

    #[test]
    fn class_and_value_type_tokens() {
        // CLASS TypeRef row 2 (2 << 2 | 1)
        let mut parser = SignatureParser::new(&[0x12, 0x09]);
        assert_eq!(
            parser.parse_type().unwrap(),
            TypeSignature::Class(Token::new(0x0100_0002))
        );

        // VALUETYPE TypeDef row 3 (3 << 2 | 0)
        let mut parser = SignatureParser::new(&[0x11, 0x0C]);
        assert_eq!(
            parser.parse_type().unwrap(),
            TypeSignature::ValueType(Token::new(0x0200_0003))
        );
    }

    #[test]
    fn generic_instance() {
        #[rustfmt::skip]
        let data = [
            0x15,             // GENERICINST
            0x12, 0x05,       // CLASS TypeRef row 1
            0x02,             // 2 arguments
            0x08,             // I4
            0x13, 0x00,       // !0
        ];

        let mut parser = SignatureParser::new(&data);
        assert_eq!(
            parser.parse_type().unwrap(),
            TypeSignature::GenericInst(
                Box::new(TypeSignature::Class(Token::new(0x0100_0001))),
                vec![TypeSignature::I4, TypeSignature::GenericParamType(0)]
            )
        );
    }

    #[test]
    fn generic_instance_requires_class_or_value_type() {
        let mut parser = SignatureParser::new(&[0x15, 0x08, 0x01, 0x08]);
        assert!(matches!(
            parser.parse_type(),
            Err(crate::Error::MalformedImage { .. })
        ));
    }

    #[test]
    fn multi_dimensional_array() {
        #[rustfmt::skip]
        let data = [
            0x14,             // ARRAY
            0x08,             // I4
            0x02,             // rank 2
            0x01, 0x05,       // 1 size: 5
            0x02, 0x00, 0x7F, // 2 lower bounds: 0, -1
        ];

        let mut parser = SignatureParser::new(&data);
        let TypeSignature::Array(array) = parser.parse_type().unwrap() else {
            panic!("expected an array");
        };
        assert_eq!(*array.base, TypeSignature::I4);
        assert_eq!(array.rank, 2);
        assert_eq!(
            array.dimensions,
            vec![
                ArrayDimensions {
                    size: Some(5),
                    lower_bound: Some(0)
                },
                ArrayDimensions {
                    size: None,
                    lower_bound: Some(-1)
                },
            ]
        );
    }

    #[test]
    fn modifier_wraps_following_type() {
        #[rustfmt::skip]
        let data = [
            0x1F, 0x05,       // modreq TypeRef row 1
            0x08,             // I4
        ];

        let mut parser = SignatureParser::new(&data);
        assert_eq!(
            parser.parse_type().unwrap(),
            TypeSignature::Modified(
                CustomModifier {
                    required: true,
                    modifier: Token::new(0x0100_0001)
                },
                Box::new(TypeSignature::I4)
            )
        );
    }

    #[test]
    fn method_signatures() {
        let result = SignatureParser::new(&[
            0x00, // DEFAULT
            0x00, // 0 parameters
            0x01, // VOID return
        ])
        .parse_method_signature()
        .unwrap();

        assert_eq!(result.params.len(), 0);
        assert_eq!(result.return_type.base, TypeSignature::Void);
        assert!(!result.has_this);
        assert_eq!(result.calling_convention, CallingConvention::Default);

        let result = SignatureParser::new(&[
            0x20, // HASTHIS
            0x02, // 2 parameters
            0x08, // I4 return
            0x0E, // String (first param)
            0x10, 0x1D, 0x08, // BYREF SZARRAY I4 (second param: ref int[])
        ])
        .parse_method_signature()
        .unwrap();

        assert!(result.has_this);
        assert_eq!(result.params.len(), 2);
        assert_eq!(result.return_type.base, TypeSignature::I4);
        assert_eq!(result.params[0].base, TypeSignature::String);
        assert!(!result.params[0].by_ref);
        assert!(result.params[1].by_ref);
        assert_eq!(
            result.params[1].base,
            TypeSignature::SzArray(Box::new(TypeSignature::I4))
        );

        let result = SignatureParser::new(&[
            0x30, // HASTHIS | GENERIC
            0x01, // 1 generic parameter
            0x01, // 1 method parameter
            0x1E, 0x00, // !!0 - return type is T
            0x1E, 0x00, // !!0 - parameter type is T
        ])
        .parse_method_signature()
        .unwrap();

        assert!(result.has_this);
        assert_eq!(result.generic_param_count, 1);
        assert_eq!(result.params.len(), 1);
        assert_eq!(result.return_type.base, TypeSignature::GenericParamMethod(0));
        assert_eq!(result.params[0].base, TypeSignature::GenericParamMethod(0));
    }

    #[test]
    fn vararg_sentinel() {
        #[rustfmt::skip]
        let data = [
            0x05,       // VARARG
            0x03,       // 3 parameters
            0x01,       // VOID
            0x08,       // I4
            0x41,       // SENTINEL
            0x0E,       // String
            0x0A,       // I8
        ];

        let result = SignatureParser::new(&data).parse_method_signature().unwrap();
        assert_eq!(result.calling_convention, CallingConvention::VarArg);
        assert_eq!(result.params.len(), 1);
        assert_eq!(result.varargs.len(), 2);
        assert_eq!(result.varargs[1].base, TypeSignature::I8);
    }

    #[test]
    fn field_signature() {
        let result = SignatureParser::new(&[0x06, 0x08])
            .parse_field_signature()
            .unwrap();
        assert!(result.modifiers.is_empty());
        assert_eq!(result.base, TypeSignature::I4);

        #[rustfmt::skip]
        let volatile = [
            0x06,       // FIELD
            0x1F, 0x09, // modreq TypeRef row 2
            0x08,       // I4
        ];
        let result = SignatureParser::new(&volatile)
            .parse_field_signature()
            .unwrap();
        assert_eq!(result.modifiers.len(), 1);
        assert!(result.modifiers[0].required);
        assert_eq!(result.base, TypeSignature::I4);

        assert!(SignatureParser::new(&[0x07, 0x08])
            .parse_field_signature()
            .is_err());
    }

    #[test]
    fn property_signature() {
        #[rustfmt::skip]
        let data = [
            0x28,       // PROPERTY | HASTHIS
            0x01,       // 1 index parameter
            0x0E,       // String
            0x08,       // I4 index
        ];

        let result = SignatureParser::new(&data)
            .parse_property_signature()
            .unwrap();
        assert!(result.has_this);
        assert_eq!(result.base, TypeSignature::String);
        assert_eq!(result.params.len(), 1);
        assert_eq!(result.params[0].base, TypeSignature::I4);
    }

    #[test]
    fn function_pointer() {
        #[rustfmt::skip]
        let data = [
            0x1B,             // FNPTR
            0x00, 0x01,       // DEFAULT, 1 parameter
            0x08,             // I4 return
            0x0E,             // String
        ];

        let mut parser = SignatureParser::new(&data);
        let TypeSignature::FnPtr(method) = parser.parse_type().unwrap() else {
            panic!("expected a function pointer");
        };
        assert_eq!(method.return_type.base, TypeSignature::I4);
        assert_eq!(method.params[0].base, TypeSignature::String);
    }

    #[test]
    fn recursion_limit() {
        let mut data = vec![ELEMENT_TYPE::SZARRAY; MAX_RECURSION_DEPTH + 10];
        data.push(ELEMENT_TYPE::I4);

        let mut parser = SignatureParser::new(&data);
        assert!(matches!(
            parser.parse_type(),
            Err(crate::Error::RecursionLimit(MAX_RECURSION_DEPTH))
        ));
    }

    #[test]
    fn nesting_below_the_limit() {
        let mut data = vec![ELEMENT_TYPE::SZARRAY; MAX_RECURSION_DEPTH - 2];
        data.push(ELEMENT_TYPE::I4);

        let mut parser = SignatureParser::new(&data);
        assert!(parser.parse_type().is_ok());
    }

    #[test]
    fn truncated_and_unknown() {
        assert!(matches!(
            SignatureParser::new(&[0x20, 0x01, 0x01]).parse_method_signature(),
            Err(crate::Error::UnexpectedEndOfData)
        ));
        assert!(matches!(
            SignatureParser::new(&[0x17]).parse_type(),
            Err(crate::Error::MalformedImage { .. })
        ));
    }
}
