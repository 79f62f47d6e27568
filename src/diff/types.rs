use tracing::trace;

use crate::{
    diff::{
        attributes, members::TypeMembers, Comparable, Comparer, CompareOptions, DeclarationDiff,
        DeclarationRef, DiffNode, NodeKind,
    },
    metadata::graph::{
        entities::{TypeDefinition, TypeKind},
        resolver::ModuleSet,
        ModuleGraph,
    },
    Result,
};

/// A type definition of one side of the comparison
pub(crate) struct TypeEntry<'a> {
    set: &'a ModuleSet,
    graph: &'a ModuleGraph,
    definition: &'a TypeDefinition,
}

/// Returns true if `definition` is API-visible on its own and not ignored. Enclosing types are
/// checked by the caller.
fn is_compared(definition: &TypeDefinition, options: &CompareOptions) -> bool {
    if !definition.visibility().is_api_visible() {
        return false;
    }

    let name = definition.full_name();
    if options.is_ignored(&name) {
        trace!(ty = %name, "ignoring type");
        return false;
    }
    true
}

/// The compared top-level types of the primary module of `set`
pub(crate) fn top_level<'a>(set: &'a ModuleSet, options: &CompareOptions) -> Result<Vec<TypeEntry<'a>>> {
    let graph = set.primary();
    Ok(graph
        .type_definitions()?
        .into_iter()
        .filter(|definition| definition.declaring_type.is_none() && is_compared(definition, options))
        .map(|definition| TypeEntry {
            set,
            graph,
            definition,
        })
        .collect())
}

impl<'a> TypeEntry<'a> {
    fn nested(&self, options: &CompareOptions) -> Result<Vec<TypeEntry<'a>>> {
        let mut nested = Vec::with_capacity(self.definition.nested_types.len());
        for token in &self.definition.nested_types {
            let definition = self.graph.type_definition(*token)?;
            if is_compared(definition, options) {
                nested.push(TypeEntry {
                    set: self.set,
                    graph: self.graph,
                    definition,
                });
            }
        }
        Ok(nested)
    }

    fn class_diffs(&self, new: &TypeDefinition, diffs: &mut Vec<DeclarationDiff>) {
        let old = self.definition;

        if old.is_abstract() != new.is_abstract() {
            diffs.push(DeclarationDiff::AbstractChanged {
                old: old.is_abstract(),
            });
        }
        if old.is_sealed() != new.is_sealed() {
            diffs.push(DeclarationDiff::SealedChanged {
                old: old.is_sealed(),
            });
        }
        if old.base_type != new.base_type {
            diffs.push(DeclarationDiff::BaseTypeChanged {
                old: old.base_type.as_ref().map(ToString::to_string),
                new: new.base_type.as_ref().map(ToString::to_string),
            });
        }
    }
}

impl Comparable for TypeEntry<'_> {
    const KIND: NodeKind = NodeKind::Type;

    fn key(&self) -> Result<String> {
        Ok(self.definition.full_name())
    }

    fn display_name(&self) -> Result<String> {
        let generics = self.graph.generic_names(self.definition.token)?;
        if generics.is_empty() {
            Ok(self.definition.identity.to_string())
        } else {
            Ok(format!("{}<{}>", self.definition.identity, generics.join(", ")))
        }
    }

    fn declaration(&self) -> DeclarationRef {
        DeclarationRef::for_type(
            self.definition.token,
            self.definition.identity.to_string(),
            self.definition.is_interface(),
        )
    }

    fn same_identity(&self, other: &Self) -> bool {
        self.definition.is_interface() == other.definition.is_interface()
    }

    fn compare(&self, new: &Self, comparer: &Comparer<'_>) -> Result<Option<DiffNode>> {
        let options = comparer.options();
        let old_type = self.definition;
        let new_type = new.definition;
        let mut diffs = Vec::new();

        let (old_kind, new_kind) = (old_type.kind(), new_type.kind());
        if old_kind != new_kind {
            diffs.push(DeclarationDiff::TypeKindChanged {
                old: old_kind,
                new: new_kind,
            });
        } else if old_kind == TypeKind::Class {
            self.class_diffs(new_type, &mut diffs);
        }

        if old_type.visibility() != new_type.visibility() {
            diffs.push(DeclarationDiff::VisibilityChanged {
                old: old_type.visibility(),
                new: new_type.visibility(),
            });
        }

        for interface in &old_type.interfaces {
            if !new_type.interfaces.contains(interface) {
                diffs.push(DeclarationDiff::InterfaceRemoved(interface.to_string()));
            }
        }
        for interface in &new_type.interfaces {
            if !old_type.interfaces.contains(interface) {
                diffs.push(DeclarationDiff::InterfaceAdded(interface.to_string()));
            }
        }

        diffs.extend(attributes::diffs(
            &old_type.custom_attributes,
            &new_type.custom_attributes,
            options,
        ));

        let old_members = TypeMembers::collect(self.set, self.graph, old_type, options)?;
        let new_members = TypeMembers::collect(new.set, new.graph, new_type, options)?;

        let mut children = comparer.compare_all(old_members.fields, new_members.fields)?;
        children.extend(comparer.compare_all(old_members.methods, new_members.methods)?);
        children.extend(comparer.compare_all(old_members.properties, new_members.properties)?);
        children.extend(comparer.compare_all(old_members.events, new_members.events)?);
        children.extend(comparer.compare_all(self.nested(options)?, new.nested(options)?)?);

        Ok(DiffNode::modified(
            Self::KIND,
            new.display_name()?,
            self.declaration(),
            new.declaration(),
            diffs,
            children,
        ))
    }
}
