//! Coded indices: references that may target one of several tables.
//!
//! A coded index stores the target table in its low `tag_bits` bits and the 1-based row in the
//! remaining bits. The column is 2 bytes wide as long as the largest candidate table has fewer
//! than `2^(16 - tag_bits)` rows, and 4 bytes otherwise.
//!
//! # Reference
//! - [ECMA-335 II.24.2.6](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)

use strum::{EnumCount, EnumIter};

use crate::{
    file::io::read_le_at_dyn,
    metadata::{
        tables::{TableId, TableInfo},
        token::Token,
    },
    Result,
};

/// The kinds of coded index defined by ECMA-335.
#[allow(missing_docs)]
#[derive(Debug, Hash, Eq, PartialEq, Clone, Copy, EnumIter, EnumCount)]
#[repr(usize)]
pub enum CodedIndexType {
    TypeDefOrRef,
    HasConstant,
    HasCustomAttribute,
    HasFieldMarshal,
    HasDeclSecurity,
    MemberRefParent,
    HasSemantics,
    MethodDefOrRef,
    MemberForwarded,
    Implementation,
    CustomAttributeType,
    ResolutionScope,
    TypeOrMethodDef,
}

impl CodedIndexType {
    /// The candidate tables, indexed by tag value. `None` marks a tag that is reserved.
    #[must_use]
    pub fn tables(&self) -> &'static [Option<TableId>] {
        match self {
            CodedIndexType::TypeDefOrRef => &[
                Some(TableId::TypeDef),
                Some(TableId::TypeRef),
                Some(TableId::TypeSpec),
            ],
            CodedIndexType::HasConstant => &[
                Some(TableId::Field),
                Some(TableId::Param),
                Some(TableId::Property),
            ],
            CodedIndexType::HasCustomAttribute => &[
                Some(TableId::MethodDef),
                Some(TableId::Field),
                Some(TableId::TypeRef),
                Some(TableId::TypeDef),
                Some(TableId::Param),
                Some(TableId::InterfaceImpl),
                Some(TableId::MemberRef),
                Some(TableId::Module),
                // 'Permission' in the standard
                Some(TableId::DeclSecurity),
                Some(TableId::Property),
                Some(TableId::Event),
                Some(TableId::StandAloneSig),
                Some(TableId::ModuleRef),
                Some(TableId::TypeSpec),
                Some(TableId::Assembly),
                Some(TableId::AssemblyRef),
                Some(TableId::File),
                Some(TableId::ExportedType),
                Some(TableId::ManifestResource),
                Some(TableId::GenericParam),
                Some(TableId::GenericParamConstraint),
                Some(TableId::MethodSpec),
            ],
            CodedIndexType::HasFieldMarshal => &[Some(TableId::Field), Some(TableId::Param)],
            CodedIndexType::HasDeclSecurity => &[
                Some(TableId::TypeDef),
                Some(TableId::MethodDef),
                Some(TableId::Assembly),
            ],
            CodedIndexType::MemberRefParent => &[
                Some(TableId::TypeDef),
                Some(TableId::TypeRef),
                Some(TableId::ModuleRef),
                Some(TableId::MethodDef),
                Some(TableId::TypeSpec),
            ],
            CodedIndexType::HasSemantics => &[Some(TableId::Event), Some(TableId::Property)],
            CodedIndexType::MethodDefOrRef => &[Some(TableId::MethodDef), Some(TableId::MemberRef)],
            CodedIndexType::MemberForwarded => &[Some(TableId::Field), Some(TableId::MethodDef)],
            CodedIndexType::Implementation => &[
                Some(TableId::File),
                Some(TableId::AssemblyRef),
                Some(TableId::ExportedType),
            ],
            CodedIndexType::CustomAttributeType => &[
                None,
                None,
                Some(TableId::MethodDef),
                Some(TableId::MemberRef),
                None,
            ],
            CodedIndexType::ResolutionScope => &[
                Some(TableId::Module),
                Some(TableId::ModuleRef),
                Some(TableId::AssemblyRef),
                Some(TableId::TypeRef),
            ],
            CodedIndexType::TypeOrMethodDef => &[Some(TableId::TypeDef), Some(TableId::MethodDef)],
        }
    }

    /// Number of low-order bits that hold the tag.
    #[must_use]
    pub fn tag_bits(&self) -> u8 {
        match self {
            CodedIndexType::HasFieldMarshal
            | CodedIndexType::HasSemantics
            | CodedIndexType::MethodDefOrRef
            | CodedIndexType::MemberForwarded
            | CodedIndexType::TypeOrMethodDef => 1,
            CodedIndexType::TypeDefOrRef
            | CodedIndexType::HasConstant
            | CodedIndexType::HasDeclSecurity
            | CodedIndexType::Implementation
            | CodedIndexType::ResolutionScope => 2,
            CodedIndexType::MemberRefParent | CodedIndexType::CustomAttributeType => 3,
            CodedIndexType::HasCustomAttribute => 5,
        }
    }
}

/// A decoded coded index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CodedIndex {
    /// The table the index points into
    pub tag: TableId,
    /// The 1-based row; 0 is the null reference
    pub row: u32,
    /// The token of the referenced row
    pub token: Token,
}

impl CodedIndex {
    /// Create a coded index pointing at `row` of `tag`.
    #[must_use]
    pub fn new(tag: TableId, row: u32) -> CodedIndex {
        CodedIndex {
            tag,
            row,
            token: Token::from_parts(tag as u8, row),
        }
    }

    /// Read and decode a coded index column at `offset`.
    ///
    /// # Errors
    /// Returns [`crate::Error::UnexpectedEndOfData`] if `data` is too short, or
    /// [`crate::Error::MalformedImage`] if the tag does not name a table.
    pub fn read(
        data: &[u8],
        offset: &mut usize,
        info: &TableInfo,
        ci_type: CodedIndexType,
    ) -> Result<Self> {
        let is_large = info.coded_index_bytes(ci_type) == 4;
        let value = read_le_at_dyn(data, offset, is_large)?;
        info.decode_coded_index(value, ci_type)
    }

    /// Returns true if this index does not reference a row.
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.row == 0
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn tag_bits_cover_tables() {
        for ci in CodedIndexType::iter() {
            let slots = ci.tables().len();
            assert!(slots <= 1 << ci.tag_bits(), "{ci:?}");
            assert!(slots > 1 << (ci.tag_bits() - 1), "{ci:?}");
        }
    }

    #[test]
    fn read_small_and_large() {
        let info = TableInfo::new_test(&[(TableId::TypeRef, 10)], false, false, false);

        // TypeRef (tag 1), row 5 => (5 << 2) | 1 = 0x15
        let mut offset = 0;
        let ci = CodedIndex::read(&[0x15, 0x00], &mut offset, &info, CodedIndexType::TypeDefOrRef)
            .unwrap();
        assert_eq!(offset, 2);
        assert_eq!(ci, CodedIndex::new(TableId::TypeRef, 5));
        assert_eq!(ci.token, Token::new(0x0100_0005));

        let info = TableInfo::new_test(&[(TableId::TypeSpec, 0x4000)], false, false, false);
        let mut offset = 0;
        let ci = CodedIndex::read(
            &[0x02, 0x00, 0x01, 0x00],
            &mut offset,
            &info,
            CodedIndexType::TypeDefOrRef,
        )
        .unwrap();
        assert_eq!(offset, 4);
        assert_eq!(ci.tag, TableId::TypeSpec);
        assert_eq!(ci.row, 0x4000);
    }

    #[test]
    fn reserved_tag() {
        let info = TableInfo::new_test(&[], false, false, false);
        let mut offset = 0;
        // CustomAttributeType tag 0 is unused
        assert!(CodedIndex::read(
            &[0x08, 0x00],
            &mut offset,
            &info,
            CodedIndexType::CustomAttributeType
        )
        .is_err());

        let mut offset = 0;
        let ci = CodedIndex::read(
            &[0x0B, 0x00],
            &mut offset,
            &info,
            CodedIndexType::CustomAttributeType,
        )
        .unwrap();
        assert_eq!(ci, CodedIndex::new(TableId::MemberRef, 1));
    }
}
