//! Rows describing members, their indirections and their annotations.

use crate::{
    file::io::{read_le_at, read_le_at_dyn},
    metadata::{
        tables::{CodedIndex, CodedIndexType, RowReadable, TableId, TableInfo},
        token::Token,
    },
    Result,
};

/// Defines an indirection (`*Ptr`) row, present only in uncompressed `#-` streams.
macro_rules! pointer_row {
    ($(#[$meta:meta])* $name:ident, $table:expr, $field:ident, $target:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub struct $name {
            /// Row id
            pub rid: u32,
            /// Token of this row
            pub token: Token,
            /// Offset of the row within the table data
            pub offset: usize,
            /// Row in the target table
            pub $field: u32,
        }

        impl RowReadable for $name {
            const TABLE_ID: TableId = $table;

            fn row_read(
                data: &[u8],
                offset: &mut usize,
                rid: u32,
                sizes: &TableInfo,
            ) -> Result<Self> {
                Ok($name {
                    rid,
                    token: Token::from_parts(Self::TABLE_ID as u8, rid),
                    offset: *offset,
                    $field: read_le_at_dyn(data, offset, sizes.is_large($target))?,
                })
            }
        }
    };
}

pointer_row!(
    /// A row of the `FieldPtr` table (0x03)
    FieldPtrRaw, TableId::FieldPtr, field, TableId::Field
);
pointer_row!(
    /// A row of the `MethodPtr` table (0x05)
    MethodPtrRaw, TableId::MethodPtr, method, TableId::MethodDef
);
pointer_row!(
    /// A row of the `ParamPtr` table (0x07)
    ParamPtrRaw, TableId::ParamPtr, param, TableId::Param
);
pointer_row!(
    /// A row of the `EventPtr` table (0x13)
    EventPtrRaw, TableId::EventPtr, event, TableId::Event
);
pointer_row!(
    /// A row of the `PropertyPtr` table (0x16)
    PropertyPtrRaw, TableId::PropertyPtr, property, TableId::Property
);

/// A row of the `Field` table (0x04)
#[derive(Debug, Clone)]
pub struct FieldRaw {
    /// Row id
    pub rid: u32,
    /// Token of this row
    pub token: Token,
    /// Offset of the row within the table data
    pub offset: usize,
    /// `FieldAttributes`
    pub flags: u16,
    /// `#Strings` index of the field name
    pub name: u32,
    /// `#Blob` index of the field signature
    pub signature: u32,
}

impl RowReadable for FieldRaw {
    const TABLE_ID: TableId = TableId::Field;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self> {
        Ok(FieldRaw {
            rid,
            token: Token::from_parts(Self::TABLE_ID as u8, rid),
            offset: *offset,
            flags: read_le_at::<u16>(data, offset)?,
            name: read_le_at_dyn(data, offset, sizes.is_large_str())?,
            signature: read_le_at_dyn(data, offset, sizes.is_large_blob())?,
        })
    }
}

/// A row of the `MethodDef` table (0x06)
#[derive(Debug, Clone)]
pub struct MethodDefRaw {
    /// Row id
    pub rid: u32,
    /// Token of this row
    pub token: Token,
    /// Offset of the row within the table data
    pub offset: usize,
    /// RVA of the method body, 0 for abstract and extern methods
    pub rva: u32,
    /// `MethodImplAttributes`
    pub impl_flags: u16,
    /// `MethodAttributes`
    pub flags: u16,
    /// `#Strings` index of the method name
    pub name: u32,
    /// `#Blob` index of the method signature
    pub signature: u32,
    /// First row of the contiguous run of parameters owned by this method
    pub param_list: u32,
}

impl RowReadable for MethodDefRaw {
    const TABLE_ID: TableId = TableId::MethodDef;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self> {
        Ok(MethodDefRaw {
            rid,
            token: Token::from_parts(Self::TABLE_ID as u8, rid),
            offset: *offset,
            rva: read_le_at::<u32>(data, offset)?,
            impl_flags: read_le_at::<u16>(data, offset)?,
            flags: read_le_at::<u16>(data, offset)?,
            name: read_le_at_dyn(data, offset, sizes.is_large_str())?,
            signature: read_le_at_dyn(data, offset, sizes.is_large_blob())?,
            param_list: read_le_at_dyn(data, offset, sizes.is_large(TableId::Param))?,
        })
    }
}

/// A row of the `Param` table (0x08)
#[derive(Debug, Clone)]
pub struct ParamRaw {
    /// Row id
    pub rid: u32,
    /// Token of this row
    pub token: Token,
    /// Offset of the row within the table data
    pub offset: usize,
    /// `ParamAttributes`
    pub flags: u16,
    /// 1-based position; 0 describes the return value
    pub sequence: u16,
    /// `#Strings` index of the parameter name
    pub name: u32,
}

impl RowReadable for ParamRaw {
    const TABLE_ID: TableId = TableId::Param;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self> {
        Ok(ParamRaw {
            rid,
            token: Token::from_parts(Self::TABLE_ID as u8, rid),
            offset: *offset,
            flags: read_le_at::<u16>(data, offset)?,
            sequence: read_le_at::<u16>(data, offset)?,
            name: read_le_at_dyn(data, offset, sizes.is_large_str())?,
        })
    }
}

/// A row of the `MemberRef` table (0x0A)
#[derive(Debug, Clone)]
pub struct MemberRefRaw {
    /// Row id
    pub rid: u32,
    /// Token of this row
    pub token: Token,
    /// Offset of the row within the table data
    pub offset: usize,
    /// The type (or module, or method) the member belongs to
    pub class: CodedIndex,
    /// `#Strings` index of the member name
    pub name: u32,
    /// `#Blob` index of the member signature
    pub signature: u32,
}

impl RowReadable for MemberRefRaw {
    const TABLE_ID: TableId = TableId::MemberRef;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self> {
        Ok(MemberRefRaw {
            rid,
            token: Token::from_parts(Self::TABLE_ID as u8, rid),
            offset: *offset,
            class: CodedIndex::read(data, offset, sizes, CodedIndexType::MemberRefParent)?,
            name: read_le_at_dyn(data, offset, sizes.is_large_str())?,
            signature: read_le_at_dyn(data, offset, sizes.is_large_blob())?,
        })
    }
}

/// A row of the `Constant` table (0x0B)
#[derive(Debug, Clone)]
pub struct ConstantRaw {
    /// Row id
    pub rid: u32,
    /// Token of this row
    pub token: Token,
    /// Offset of the row within the table data
    pub offset: usize,
    /// `ELEMENT_TYPE_*` of the value
    pub base: u8,
    /// The field, parameter or property the constant belongs to
    pub parent: CodedIndex,
    /// `#Blob` index of the value
    pub value: u32,
}

impl RowReadable for ConstantRaw {
    const TABLE_ID: TableId = TableId::Constant;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self> {
        let row_offset = *offset;
        let base = read_le_at::<u8>(data, offset)?;
        // padding
        read_le_at::<u8>(data, offset)?;

        Ok(ConstantRaw {
            rid,
            token: Token::from_parts(Self::TABLE_ID as u8, rid),
            offset: row_offset,
            base,
            parent: CodedIndex::read(data, offset, sizes, CodedIndexType::HasConstant)?,
            value: read_le_at_dyn(data, offset, sizes.is_large_blob())?,
        })
    }
}

/// A row of the `CustomAttribute` table (0x0C)
#[derive(Debug, Clone)]
pub struct CustomAttributeRaw {
    /// Row id
    pub rid: u32,
    /// Token of this row
    pub token: Token,
    /// Offset of the row within the table data
    pub offset: usize,
    /// The annotated entity
    pub parent: CodedIndex,
    /// The attribute constructor (`MethodDef` or `MemberRef`)
    pub constructor: CodedIndex,
    /// `#Blob` index of the encoded arguments
    pub value: u32,
}

impl RowReadable for CustomAttributeRaw {
    const TABLE_ID: TableId = TableId::CustomAttribute;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self> {
        Ok(CustomAttributeRaw {
            rid,
            token: Token::from_parts(Self::TABLE_ID as u8, rid),
            offset: *offset,
            parent: CodedIndex::read(data, offset, sizes, CodedIndexType::HasCustomAttribute)?,
            constructor: CodedIndex::read(
                data,
                offset,
                sizes,
                CodedIndexType::CustomAttributeType,
            )?,
            value: read_le_at_dyn(data, offset, sizes.is_large_blob())?,
        })
    }
}

/// A row of the `EventMap` table (0x12)
#[derive(Debug, Clone)]
pub struct EventMapRaw {
    /// Row id
    pub rid: u32,
    /// Token of this row
    pub token: Token,
    /// Offset of the row within the table data
    pub offset: usize,
    /// `TypeDef` row owning the events
    pub parent: u32,
    /// First row of the contiguous run of events
    pub event_list: u32,
}

impl RowReadable for EventMapRaw {
    const TABLE_ID: TableId = TableId::EventMap;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self> {
        Ok(EventMapRaw {
            rid,
            token: Token::from_parts(Self::TABLE_ID as u8, rid),
            offset: *offset,
            parent: read_le_at_dyn(data, offset, sizes.is_large(TableId::TypeDef))?,
            event_list: read_le_at_dyn(data, offset, sizes.is_large(TableId::Event))?,
        })
    }
}

/// A row of the `Event` table (0x14)
#[derive(Debug, Clone)]
pub struct EventRaw {
    /// Row id
    pub rid: u32,
    /// Token of this row
    pub token: Token,
    /// Offset of the row within the table data
    pub offset: usize,
    /// `EventAttributes`
    pub flags: u16,
    /// `#Strings` index of the event name
    pub name: u32,
    /// The delegate type of the event
    pub event_type: CodedIndex,
}

impl RowReadable for EventRaw {
    const TABLE_ID: TableId = TableId::Event;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self> {
        Ok(EventRaw {
            rid,
            token: Token::from_parts(Self::TABLE_ID as u8, rid),
            offset: *offset,
            flags: read_le_at::<u16>(data, offset)?,
            name: read_le_at_dyn(data, offset, sizes.is_large_str())?,
            event_type: CodedIndex::read(data, offset, sizes, CodedIndexType::TypeDefOrRef)?,
        })
    }
}

/// A row of the `PropertyMap` table (0x15)
#[derive(Debug, Clone)]
pub struct PropertyMapRaw {
    /// Row id
    pub rid: u32,
    /// Token of this row
    pub token: Token,
    /// Offset of the row within the table data
    pub offset: usize,
    /// `TypeDef` row owning the properties
    pub parent: u32,
    /// First row of the contiguous run of properties
    pub property_list: u32,
}

impl RowReadable for PropertyMapRaw {
    const TABLE_ID: TableId = TableId::PropertyMap;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self> {
        Ok(PropertyMapRaw {
            rid,
            token: Token::from_parts(Self::TABLE_ID as u8, rid),
            offset: *offset,
            parent: read_le_at_dyn(data, offset, sizes.is_large(TableId::TypeDef))?,
            property_list: read_le_at_dyn(data, offset, sizes.is_large(TableId::Property))?,
        })
    }
}

/// A row of the `Property` table (0x17)
#[derive(Debug, Clone)]
pub struct PropertyRaw {
    /// Row id
    pub rid: u32,
    /// Token of this row
    pub token: Token,
    /// Offset of the row within the table data
    pub offset: usize,
    /// `PropertyAttributes`
    pub flags: u16,
    /// `#Strings` index of the property name
    pub name: u32,
    /// `#Blob` index of the property signature
    pub signature: u32,
}

impl RowReadable for PropertyRaw {
    const TABLE_ID: TableId = TableId::Property;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self> {
        Ok(PropertyRaw {
            rid,
            token: Token::from_parts(Self::TABLE_ID as u8, rid),
            offset: *offset,
            flags: read_le_at::<u16>(data, offset)?,
            name: read_le_at_dyn(data, offset, sizes.is_large_str())?,
            signature: read_le_at_dyn(data, offset, sizes.is_large_blob())?,
        })
    }
}

/// A row of the `MethodSemantics` table (0x18)
#[derive(Debug, Clone)]
pub struct MethodSemanticsRaw {
    /// Row id
    pub rid: u32,
    /// Token of this row
    pub token: Token,
    /// Offset of the row within the table data
    pub offset: usize,
    /// `MethodSemanticsAttributes`
    pub semantics: u16,
    /// `MethodDef` row of the accessor
    pub method: u32,
    /// The property or event the accessor belongs to
    pub association: CodedIndex,
}

impl RowReadable for MethodSemanticsRaw {
    const TABLE_ID: TableId = TableId::MethodSemantics;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self> {
        Ok(MethodSemanticsRaw {
            rid,
            token: Token::from_parts(Self::TABLE_ID as u8, rid),
            offset: *offset,
            semantics: read_le_at::<u16>(data, offset)?,
            method: read_le_at_dyn(data, offset, sizes.is_large(TableId::MethodDef))?,
            association: CodedIndex::read(data, offset, sizes, CodedIndexType::HasSemantics)?,
        })
    }
}
