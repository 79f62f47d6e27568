//! Rows describing modules, types and their relations.

use crate::{
    file::io::{read_le_at, read_le_at_dyn},
    metadata::{
        tables::{CodedIndex, CodedIndexType, RowReadable, TableId, TableInfo},
        token::Token,
    },
    Result,
};

/// A row of the `Module` table (0x00)
#[derive(Debug, Clone)]
pub struct ModuleRaw {
    /// Row id
    pub rid: u32,
    /// Token of this row
    pub token: Token,
    /// Offset of the row within the table data
    pub offset: usize,
    /// Reserved, 0
    pub generation: u16,
    /// `#Strings` index of the module name
    pub name: u32,
    /// `#GUID` index of the module version id
    pub mvid: u32,
    /// `#GUID` index, reserved
    pub encid: u32,
    /// `#GUID` index, reserved
    pub encbaseid: u32,
}

impl RowReadable for ModuleRaw {
    const TABLE_ID: TableId = TableId::Module;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self> {
        Ok(ModuleRaw {
            rid,
            token: Token::from_parts(Self::TABLE_ID as u8, rid),
            offset: *offset,
            generation: read_le_at::<u16>(data, offset)?,
            name: read_le_at_dyn(data, offset, sizes.is_large_str())?,
            mvid: read_le_at_dyn(data, offset, sizes.is_large_guid())?,
            encid: read_le_at_dyn(data, offset, sizes.is_large_guid())?,
            encbaseid: read_le_at_dyn(data, offset, sizes.is_large_guid())?,
        })
    }
}

/// A row of the `TypeRef` table (0x01)
#[derive(Debug, Clone)]
pub struct TypeRefRaw {
    /// Row id
    pub rid: u32,
    /// Token of this row
    pub token: Token,
    /// Offset of the row within the table data
    pub offset: usize,
    /// `Module`, `ModuleRef`, `AssemblyRef` or enclosing `TypeRef`
    pub resolution_scope: CodedIndex,
    /// `#Strings` index of the type name
    pub type_name: u32,
    /// `#Strings` index of the namespace
    pub type_namespace: u32,
}

impl RowReadable for TypeRefRaw {
    const TABLE_ID: TableId = TableId::TypeRef;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self> {
        Ok(TypeRefRaw {
            rid,
            token: Token::from_parts(Self::TABLE_ID as u8, rid),
            offset: *offset,
            resolution_scope: CodedIndex::read(data, offset, sizes, CodedIndexType::ResolutionScope)?,
            type_name: read_le_at_dyn(data, offset, sizes.is_large_str())?,
            type_namespace: read_le_at_dyn(data, offset, sizes.is_large_str())?,
        })
    }
}

/// A row of the `TypeDef` table (0x02)
#[derive(Debug, Clone)]
pub struct TypeDefRaw {
    /// Row id
    pub rid: u32,
    /// Token of this row
    pub token: Token,
    /// Offset of the row within the table data
    pub offset: usize,
    /// `TypeAttributes`
    pub flags: u32,
    /// `#Strings` index of the type name
    pub type_name: u32,
    /// `#Strings` index of the namespace
    pub type_namespace: u32,
    /// Base type, null for interfaces and `System.Object`
    pub extends: CodedIndex,
    /// First row of the contiguous run of fields owned by this type
    pub field_list: u32,
    /// First row of the contiguous run of methods owned by this type
    pub method_list: u32,
}

impl RowReadable for TypeDefRaw {
    const TABLE_ID: TableId = TableId::TypeDef;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self> {
        Ok(TypeDefRaw {
            rid,
            token: Token::from_parts(Self::TABLE_ID as u8, rid),
            offset: *offset,
            flags: read_le_at::<u32>(data, offset)?,
            type_name: read_le_at_dyn(data, offset, sizes.is_large_str())?,
            type_namespace: read_le_at_dyn(data, offset, sizes.is_large_str())?,
            extends: CodedIndex::read(data, offset, sizes, CodedIndexType::TypeDefOrRef)?,
            field_list: read_le_at_dyn(data, offset, sizes.is_large(TableId::Field))?,
            method_list: read_le_at_dyn(data, offset, sizes.is_large(TableId::MethodDef))?,
        })
    }
}

/// A row of the `InterfaceImpl` table (0x09)
#[derive(Debug, Clone)]
pub struct InterfaceImplRaw {
    /// Row id
    pub rid: u32,
    /// Token of this row
    pub token: Token,
    /// Offset of the row within the table data
    pub offset: usize,
    /// `TypeDef` row of the implementing type
    pub class: u32,
    /// The implemented interface
    pub interface: CodedIndex,
}

impl RowReadable for InterfaceImplRaw {
    const TABLE_ID: TableId = TableId::InterfaceImpl;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self> {
        Ok(InterfaceImplRaw {
            rid,
            token: Token::from_parts(Self::TABLE_ID as u8, rid),
            offset: *offset,
            class: read_le_at_dyn(data, offset, sizes.is_large(TableId::TypeDef))?,
            interface: CodedIndex::read(data, offset, sizes, CodedIndexType::TypeDefOrRef)?,
        })
    }
}

/// A row of the `TypeSpec` table (0x1B)
#[derive(Debug, Clone)]
pub struct TypeSpecRaw {
    /// Row id
    pub rid: u32,
    /// Token of this row
    pub token: Token,
    /// Offset of the row within the table data
    pub offset: usize,
    /// `#Blob` index of the type signature
    pub signature: u32,
}

impl RowReadable for TypeSpecRaw {
    const TABLE_ID: TableId = TableId::TypeSpec;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self> {
        Ok(TypeSpecRaw {
            rid,
            token: Token::from_parts(Self::TABLE_ID as u8, rid),
            offset: *offset,
            signature: read_le_at_dyn(data, offset, sizes.is_large_blob())?,
        })
    }
}

/// A row of the `NestedClass` table (0x29)
#[derive(Debug, Clone)]
pub struct NestedClassRaw {
    /// Row id
    pub rid: u32,
    /// Token of this row
    pub token: Token,
    /// Offset of the row within the table data
    pub offset: usize,
    /// `TypeDef` row of the nested type
    pub nested_class: u32,
    /// `TypeDef` row of the enclosing type
    pub enclosing_class: u32,
}

impl RowReadable for NestedClassRaw {
    const TABLE_ID: TableId = TableId::NestedClass;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self> {
        Ok(NestedClassRaw {
            rid,
            token: Token::from_parts(Self::TABLE_ID as u8, rid),
            offset: *offset,
            nested_class: read_le_at_dyn(data, offset, sizes.is_large(TableId::TypeDef))?,
            enclosing_class: read_le_at_dyn(data, offset, sizes.is_large(TableId::TypeDef))?,
        })
    }
}

/// A row of the `GenericParam` table (0x2A)
#[derive(Debug, Clone)]
pub struct GenericParamRaw {
    /// Row id
    pub rid: u32,
    /// Token of this row
    pub token: Token,
    /// Offset of the row within the table data
    pub offset: usize,
    /// 0-based position in the owner's parameter list
    pub number: u16,
    /// `GenericParamAttributes`
    pub flags: u16,
    /// Owning `TypeDef` or `MethodDef`
    pub owner: CodedIndex,
    /// `#Strings` index of the parameter name
    pub name: u32,
}

impl RowReadable for GenericParamRaw {
    const TABLE_ID: TableId = TableId::GenericParam;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self> {
        Ok(GenericParamRaw {
            rid,
            token: Token::from_parts(Self::TABLE_ID as u8, rid),
            offset: *offset,
            number: read_le_at::<u16>(data, offset)?,
            flags: read_le_at::<u16>(data, offset)?,
            owner: CodedIndex::read(data, offset, sizes, CodedIndexType::TypeOrMethodDef)?,
            name: read_le_at_dyn(data, offset, sizes.is_large_str())?,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::metadata::tables::MetadataTable;

    use super::*;

    #[test]
    fn typedef_short() {
        #[rustfmt::skip]
        let data = vec![
            0x01, 0x00, 0x10, 0x00, // flags
            0x42, 0x00,             // type_name
            0x43, 0x00,             // type_namespace
            0x05, 0x00,             // extends: TypeRef row 1
            0x03, 0x00,             // field_list
            0x04, 0x00,             // method_list
        ];

        let sizes = Arc::new(TableInfo::new_test(
            &[(TableId::Field, 1), (TableId::MethodDef, 1)],
            false,
            false,
            false,
        ));
        let table = MetadataTable::<TypeDefRaw>::new(&data, 1, sizes).unwrap();

        let row = table.get(1).unwrap();
        assert_eq!(row.rid, 1);
        assert_eq!(row.token.value(), 0x0200_0001);
        assert_eq!(row.flags, 0x0010_0001);
        assert_eq!(row.type_name, 0x42);
        assert_eq!(row.type_namespace, 0x43);
        assert_eq!(row.extends, CodedIndex::new(TableId::TypeRef, 1));
        assert_eq!(row.field_list, 3);
        assert_eq!(row.method_list, 4);

        assert_eq!(table.iter().count(), 1);
        assert!(table.get(2).is_err());
        assert!(table.get(0).is_err());
    }

    #[test]
    fn typedef_long() {
        #[rustfmt::skip]
        let data = vec![
            0x00, 0x00, 0x00, 0x01, // flags
            0x00, 0x00, 0x00, 0x02, // type_name
            0x00, 0x00, 0x00, 0x03, // type_namespace
            0x04, 0x00, 0x00, 0x00, // extends: TypeDef row 1
            0x05, 0x00, 0x00, 0x00, // field_list
            0x06, 0x00, 0x00, 0x00, // method_list
        ];

        let sizes = Arc::new(TableInfo::new_test(
            &[
                (TableId::Field, u32::from(u16::MAX) + 2),
                (TableId::MethodDef, u32::from(u16::MAX) + 2),
                (TableId::TypeSpec, u32::from(u16::MAX) + 2),
            ],
            true,
            true,
            true,
        ));
        let table = MetadataTable::<TypeDefRaw>::new(&data, 1, sizes).unwrap();
        assert_eq!(table.row_size(), 24);

        let row = table.get(1).unwrap();
        assert_eq!(row.flags, 0x0100_0000);
        assert_eq!(row.type_name, 0x0200_0000);
        assert_eq!(row.type_namespace, 0x0300_0000);
        assert_eq!(row.extends, CodedIndex::new(TableId::TypeDef, 1));
        assert_eq!(row.field_list, 5);
        assert_eq!(row.method_list, 6);
    }

    #[test]
    fn typeref_and_nested() {
        #[rustfmt::skip]
        let data = vec![
            0x06, 0x00, // resolution_scope: AssemblyRef row 1
            0x10, 0x00, // type_name
            0x20, 0x00, // type_namespace
        ];

        let sizes = Arc::new(TableInfo::new_test(&[(TableId::TypeRef, 1)], false, false, false));
        let table = MetadataTable::<TypeRefRaw>::new(&data, 1, sizes.clone()).unwrap();
        let row = table.get(1).unwrap();
        assert_eq!(row.resolution_scope, CodedIndex::new(TableId::AssemblyRef, 1));
        assert_eq!(row.type_name, 0x10);
        assert_eq!(row.type_namespace, 0x20);

        let data = vec![0x02, 0x00, 0x01, 0x00, 0x03, 0x00, 0x01, 0x00];
        let table = MetadataTable::<NestedClassRaw>::new(&data, 2, sizes).unwrap();
        let rows: Vec<NestedClassRaw> = table.iter().collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].rid, 2);
        assert_eq!(rows[1].nested_class, 3);
        assert_eq!(rows[1].enclosing_class, 1);
        assert_eq!(rows[1].offset, 4);
    }

    #[test]
    fn truncated_table() {
        let sizes = Arc::new(TableInfo::new_test(&[], false, false, false));
        assert!(MetadataTable::<TypeSpecRaw>::new(&[0x01, 0x00, 0x02], 2, sizes).is_err());
    }
}
