//! Reverse lookups from owners to their children.
//!
//! Metadata stores most parent/child relations in one direction only: a type row names the first
//! row of its field and method runs, a `PropertyMap` row the first row of a property run, a
//! `NestedClass` row the enclosing type of a nested one. This index is built once per module in a
//! single pass over those tables and answers both directions.

use std::{collections::HashMap, ops::Range};

use crate::{
    metadata::{
        graph::{entities::Accessor, flags::MethodSemanticsAttributes},
        tables::{
            CodedIndex, ConstantRaw, CustomAttributeRaw, EventMapRaw, EventPtrRaw, FieldPtrRaw,
            GenericParamRaw, InterfaceImplRaw, MethodDefRaw, MethodPtrRaw, MethodSemanticsRaw,
            NestedClassRaw, ParamPtrRaw, PropertyMapRaw, PropertyPtrRaw, RowReadable, TableId,
            TypeDefRaw,
        },
        token::Token,
        Metadata,
    },
    Result,
};

/// Owner / child relations of one module
#[derive(Debug, Default)]
pub(crate) struct OwnerIndex {
    /// `Field` rows per `TypeDef` row (index `rid - 1`)
    pub type_fields: Vec<Vec<u32>>,
    /// `MethodDef` rows per `TypeDef` row (index `rid - 1`)
    pub type_methods: Vec<Vec<u32>>,
    /// `Param` rows per `MethodDef` row (index `rid - 1`)
    pub method_params: Vec<Vec<u32>>,
    pub field_owner: HashMap<u32, u32>,
    pub method_owner: HashMap<u32, u32>,
    pub param_owner: HashMap<u32, u32>,
    pub type_properties: HashMap<u32, Vec<u32>>,
    pub property_owner: HashMap<u32, u32>,
    pub type_events: HashMap<u32, Vec<u32>>,
    pub event_owner: HashMap<u32, u32>,
    /// Accessors per `Property` / `Event` token
    pub semantics: HashMap<Token, Vec<Accessor>>,
    pub nested: HashMap<u32, Vec<u32>>,
    pub enclosing: HashMap<u32, u32>,
    pub interfaces: HashMap<u32, Vec<CodedIndex>>,
    /// `GenericParam` rows per owner token, ordered by number
    pub generic_params: HashMap<Token, Vec<u32>>,
    /// Element type and `#Blob` index of the value, per parent token
    pub constants: HashMap<Token, (u8, u32)>,
    /// `CustomAttribute` rows and their constructors, per parent token
    pub attributes: HashMap<Token, Vec<(u32, CodedIndex)>>,
}

/// All rows of a table, or none if the table is absent
pub(crate) fn all_rows<T: RowReadable>(metadata: &Metadata) -> Result<Vec<T>> {
    match metadata.table::<T>()? {
        Some(table) => (1..=table.row_count()).map(|rid| table.get(rid)).collect(),
        None => Ok(Vec::new()),
    }
}

/// Split `1..=row_count` into the runs starting at each `starts` entry.
///
/// Each run extends to the next start, the last one to the end of the target table. Starts past
/// the end or going backwards yield empty runs.
fn list_runs(starts: &[u32], row_count: u32) -> Vec<Range<u32>> {
    let end_of_table = row_count + 1;
    starts
        .iter()
        .enumerate()
        .map(|(i, start)| {
            let start = (*start).clamp(1, end_of_table);
            let end = starts
                .get(i + 1)
                .map_or(end_of_table, |next| (*next).clamp(1, end_of_table));
            if start < end {
                start..end
            } else {
                start..start
            }
        })
        .collect()
}

/// Map a run of list indices through an indirection table, if the module has one.
fn through_pointers(run: Range<u32>, pointers: &[u32]) -> Vec<u32> {
    if pointers.is_empty() {
        run.collect()
    } else {
        run.filter_map(|index| pointers.get(index as usize - 1).copied())
            .collect()
    }
}

/// Number of entries addressed by a list column: the pointer table if present, else the target
fn list_len(metadata: &Metadata, pointers: &[u32], target: TableId) -> u32 {
    if pointers.is_empty() {
        metadata.tables_header().row_count(target)
    } else {
        u32::try_from(pointers.len()).unwrap_or(u32::MAX)
    }
}

impl OwnerIndex {
    /// Build the index of `metadata` in one pass per table
    pub fn build(metadata: &Metadata) -> Result<OwnerIndex> {
        let mut index = OwnerIndex::default();

        let field_ptrs: Vec<u32> = all_rows::<FieldPtrRaw>(metadata)?
            .iter()
            .map(|row| row.field)
            .collect();
        let method_ptrs: Vec<u32> = all_rows::<MethodPtrRaw>(metadata)?
            .iter()
            .map(|row| row.method)
            .collect();
        let param_ptrs: Vec<u32> = all_rows::<ParamPtrRaw>(metadata)?
            .iter()
            .map(|row| row.param)
            .collect();
        let property_ptrs: Vec<u32> = all_rows::<PropertyPtrRaw>(metadata)?
            .iter()
            .map(|row| row.property)
            .collect();
        let event_ptrs: Vec<u32> = all_rows::<EventPtrRaw>(metadata)?
            .iter()
            .map(|row| row.event)
            .collect();

        let types = all_rows::<TypeDefRaw>(metadata)?;
        let field_starts: Vec<u32> = types.iter().map(|row| row.field_list).collect();
        let method_starts: Vec<u32> = types.iter().map(|row| row.method_list).collect();

        let field_runs = list_runs(
            &field_starts,
            list_len(metadata, &field_ptrs, TableId::Field),
        );
        let method_runs = list_runs(
            &method_starts,
            list_len(metadata, &method_ptrs, TableId::MethodDef),
        );

        for (row, (field_run, method_run)) in types.iter().zip(field_runs.into_iter().zip(method_runs)) {
            let fields = through_pointers(field_run, &field_ptrs);
            for field in &fields {
                index.field_owner.insert(*field, row.rid);
            }
            index.type_fields.push(fields);

            let methods = through_pointers(method_run, &method_ptrs);
            for method in &methods {
                index.method_owner.insert(*method, row.rid);
            }
            index.type_methods.push(methods);
        }

        let methods = all_rows::<MethodDefRaw>(metadata)?;
        let param_starts: Vec<u32> = methods.iter().map(|row| row.param_list).collect();
        let param_runs = list_runs(
            &param_starts,
            list_len(metadata, &param_ptrs, TableId::Param),
        );
        for (row, run) in methods.iter().zip(param_runs) {
            let params = through_pointers(run, &param_ptrs);
            for param in &params {
                index.param_owner.insert(*param, row.rid);
            }
            index.method_params.push(params);
        }

        let property_maps = all_rows::<PropertyMapRaw>(metadata)?;
        let property_starts: Vec<u32> = property_maps.iter().map(|row| row.property_list).collect();
        let property_runs = list_runs(
            &property_starts,
            list_len(metadata, &property_ptrs, TableId::Property),
        );
        for (row, run) in property_maps.iter().zip(property_runs) {
            let properties = through_pointers(run, &property_ptrs);
            for property in &properties {
                index.property_owner.insert(*property, row.parent);
            }
            index
                .type_properties
                .entry(row.parent)
                .or_default()
                .extend(properties);
        }

        let event_maps = all_rows::<EventMapRaw>(metadata)?;
        let event_starts: Vec<u32> = event_maps.iter().map(|row| row.event_list).collect();
        let event_runs = list_runs(
            &event_starts,
            list_len(metadata, &event_ptrs, TableId::Event),
        );
        for (row, run) in event_maps.iter().zip(event_runs) {
            let events = through_pointers(run, &event_ptrs);
            for event in &events {
                index.event_owner.insert(*event, row.parent);
            }
            index.type_events.entry(row.parent).or_default().extend(events);
        }

        for row in all_rows::<MethodSemanticsRaw>(metadata)? {
            index
                .semantics
                .entry(row.association.token)
                .or_default()
                .push(Accessor {
                    semantics: MethodSemanticsAttributes::from_bits_retain(row.semantics),
                    method: Token::from_parts(TableId::MethodDef as u8, row.method),
                });
        }

        for row in all_rows::<NestedClassRaw>(metadata)? {
            index.enclosing.insert(row.nested_class, row.enclosing_class);
            index
                .nested
                .entry(row.enclosing_class)
                .or_default()
                .push(row.nested_class);
        }

        for row in all_rows::<InterfaceImplRaw>(metadata)? {
            index
                .interfaces
                .entry(row.class)
                .or_default()
                .push(row.interface);
        }

        let mut generic_params: HashMap<Token, Vec<(u16, u32)>> = HashMap::new();
        for row in all_rows::<GenericParamRaw>(metadata)? {
            generic_params
                .entry(row.owner.token)
                .or_default()
                .push((row.number, row.rid));
        }
        for (owner, mut params) in generic_params {
            params.sort_unstable();
            index
                .generic_params
                .insert(owner, params.into_iter().map(|(_, rid)| rid).collect());
        }

        for row in all_rows::<ConstantRaw>(metadata)? {
            index.constants.insert(row.parent.token, (row.base, row.value));
        }

        for row in all_rows::<CustomAttributeRaw>(metadata)? {
            index
                .attributes
                .entry(row.parent.token)
                .or_default()
                .push((row.rid, row.constructor));
        }

        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_extend_to_next_start() {
        assert_eq!(list_runs(&[1, 3, 3, 4], 5), vec![1..3, 3..3, 3..4, 4..6]);
    }

    #[test]
    fn runs_are_clamped() {
        // A start past the end of the table and a decreasing start are both empty
        assert_eq!(list_runs(&[1, 9], 2), vec![1..3, 3..3]);
        assert_eq!(list_runs(&[3, 2], 4), vec![3..3, 2..5]);
        assert_eq!(list_runs(&[0], 2), vec![1..3]);
    }

    #[test]
    fn pointer_indirection() {
        assert_eq!(through_pointers(1..3, &[]), vec![1, 2]);
        assert_eq!(through_pointers(1..3, &[7, 5, 6]), vec![7, 5]);
        assert_eq!(through_pointers(3..5, &[7, 5, 6]), vec![6]);
    }
}
