//! Decoded row types of the tables the declaration graph reads.

mod assembly;
mod members;
mod types;

pub use assembly::{AssemblyRaw, AssemblyRefRaw};
pub use members::{
    ConstantRaw, CustomAttributeRaw, EventMapRaw, EventPtrRaw, EventRaw, FieldPtrRaw, FieldRaw,
    MemberRefRaw, MethodDefRaw, MethodPtrRaw, MethodSemanticsRaw, ParamPtrRaw, ParamRaw,
    PropertyMapRaw, PropertyPtrRaw, PropertyRaw,
};
pub use types::{
    GenericParamRaw, InterfaceImplRaw, ModuleRaw, NestedClassRaw, TypeDefRaw, TypeRefRaw,
    TypeSpecRaw,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::tables::{RowReadable, TableId, TableInfo};

    /// Every reader must consume exactly the bytes its column layout declares.
    fn assert_consumes_row<T: RowReadable>(sizes: &TableInfo) {
        // 0x02 decodes to a valid tag for every coded index kind
        let data = vec![0x02_u8; 64];
        let mut offset = 0;
        T::row_read(&data, &mut offset, 1, sizes).unwrap();
        assert_eq!(offset as u32, T::row_size(sizes), "{:?}", T::TABLE_ID);
    }

    fn check_all(sizes: &TableInfo) {
        assert_consumes_row::<ModuleRaw>(sizes);
        assert_consumes_row::<TypeRefRaw>(sizes);
        assert_consumes_row::<TypeDefRaw>(sizes);
        assert_consumes_row::<FieldPtrRaw>(sizes);
        assert_consumes_row::<FieldRaw>(sizes);
        assert_consumes_row::<MethodPtrRaw>(sizes);
        assert_consumes_row::<MethodDefRaw>(sizes);
        assert_consumes_row::<ParamPtrRaw>(sizes);
        assert_consumes_row::<ParamRaw>(sizes);
        assert_consumes_row::<InterfaceImplRaw>(sizes);
        assert_consumes_row::<MemberRefRaw>(sizes);
        assert_consumes_row::<ConstantRaw>(sizes);
        assert_consumes_row::<CustomAttributeRaw>(sizes);
        assert_consumes_row::<EventMapRaw>(sizes);
        assert_consumes_row::<EventPtrRaw>(sizes);
        assert_consumes_row::<EventRaw>(sizes);
        assert_consumes_row::<PropertyMapRaw>(sizes);
        assert_consumes_row::<PropertyPtrRaw>(sizes);
        assert_consumes_row::<PropertyRaw>(sizes);
        assert_consumes_row::<MethodSemanticsRaw>(sizes);
        assert_consumes_row::<TypeSpecRaw>(sizes);
        assert_consumes_row::<AssemblyRaw>(sizes);
        assert_consumes_row::<AssemblyRefRaw>(sizes);
        assert_consumes_row::<NestedClassRaw>(sizes);
        assert_consumes_row::<GenericParamRaw>(sizes);
    }

    #[test]
    fn readers_match_layouts_small() {
        check_all(&TableInfo::new_test(&[], false, false, false));
    }

    #[test]
    fn readers_match_layouts_large() {
        let big = 0x2_0000;
        let tables: Vec<(TableId, u32)> = [
            TableId::TypeRef,
            TableId::TypeDef,
            TableId::Field,
            TableId::MethodDef,
            TableId::Param,
            TableId::Event,
            TableId::Property,
            TableId::TypeSpec,
            TableId::MemberRef,
            TableId::AssemblyRef,
        ]
        .into_iter()
        .map(|id| (id, big))
        .collect();

        check_all(&TableInfo::new_test(&tables, true, true, true));
    }
}
