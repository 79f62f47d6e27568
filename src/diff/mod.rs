//! Structural comparison of two modules.
//!
//! The comparison walks both declaration graphs top-down (assembly, module, types, members,
//! accessors) and pairs declarations by a per-kind ordering key with [`merge_compare`]. Only
//! API-visible declarations take part: public, protected and protected-internal. Paired
//! declarations are checked for atomic [`DeclarationDiff`]s and recursed into; unpaired ones become
//! [`DiffType::New`] or [`DiffType::Deleted`] nodes. The result is a [`DiffNode`] tree rooted at
//! the assembly, or `None` if nothing visible differs.
//!
//! # Key Components
//!
//! - [`DiffNode`], [`NodeKind`], [`DiffType`]: the result tree and its breaking-change rules
//! - [`DeclarationDiff`]: atomic differences with their descriptions
//! - [`CompareOptions`]: ignore predicate, ignored attributes, inheritance and resolution
//! - [`merge_compare`]: the ordered two-list merge every comparer is built on
//! - [`to_xml`]: the XML report
//!
//! # Keys
//!
//! | Kind | Key | Paired only if |
//! |------|-----|----------------|
//! | Type | full name with arity (`Ns.Outer.Inner`1`) | both or neither are interfaces |
//! | Field, Event | name | |
//! | Method | name, generic arity, parameter types (conversion operators: also return type) | |
//! | Property | name, index parameter types | |
//! | Accessor | role (`get`, `set`, `add`, `remove`, `raise`) | |
//! | Assembly reference | simple name | |
//!
//! Parameter types in keys are displayed with generic parameters by position, so renaming a
//! generic parameter keeps the pairing.

mod attributes;
mod changes;
mod members;
mod merge;
mod node;
mod options;
mod types;
mod xml;

pub use changes::DeclarationDiff;
pub use merge::{merge_compare, MergeStep};
pub use node::{DeclarationRef, DiffNode, DiffType, NodeKind, Nodes};
pub use options::{CompareOptions, IgnorePredicate, COMPILER_ATTRIBUTES};
pub use xml::to_xml;

use tracing::debug;

use crate::{
    metadata::graph::{entities::AssemblyReference, resolver::ModuleSet, ModuleGraph},
    Result,
};

/// A declaration kind that takes part in the keyed merge
pub(crate) trait Comparable: Sized {
    /// Node kind of unpaired and modified declarations
    const KIND: NodeKind;

    /// Ordering and pairing key
    fn key(&self) -> Result<String>;

    /// Name shown in the result tree
    fn display_name(&self) -> Result<String>;

    /// Reference to the declaration for the result tree
    fn declaration(&self) -> DeclarationRef;

    /// Whether two declarations with equal keys are the same declaration
    fn same_identity(&self, _other: &Self) -> bool {
        true
    }

    /// Compare `self` (old) with `new`, `None` if they do not differ
    fn compare(&self, new: &Self, comparer: &Comparer<'_>) -> Result<Option<DiffNode>>;
}

/// Runs one comparison with fixed options
pub(crate) struct Comparer<'a> {
    options: &'a CompareOptions,
}

impl<'a> Comparer<'a> {
    pub(crate) fn new(options: &'a CompareOptions) -> Self {
        Comparer { options }
    }

    pub(crate) fn options(&self) -> &CompareOptions {
        self.options
    }

    /// Merge two lists of declarations of one kind into result nodes
    pub(crate) fn compare_all<T: Comparable>(&self, old: Vec<T>, new: Vec<T>) -> Result<Vec<DiffNode>> {
        let keyed = |items: Vec<T>| -> Result<Vec<(String, T)>> {
            items
                .into_iter()
                .map(|item| Ok((item.key()?, item)))
                .collect()
        };

        let mut nodes = Vec::new();
        for step in merge_compare(keyed(old)?, keyed(new)?, |a, b| a.same_identity(b)) {
            match step {
                MergeStep::Deleted(old) => {
                    nodes.push(DiffNode::deleted(T::KIND, old.display_name()?, old.declaration()));
                }
                MergeStep::New(new) => {
                    nodes.push(DiffNode::added(T::KIND, new.display_name()?, new.declaration()));
                }
                MergeStep::Paired(old, new) => {
                    if let Some(node) = old.compare(&new, self)? {
                        nodes.push(node);
                    }
                }
            }
        }
        Ok(nodes)
    }

    /// Compare the primary modules of two sets, rooted at the assembly
    pub(crate) fn compare_assemblies(&self, old: &ModuleSet, new: &ModuleSet) -> Result<Option<DiffNode>> {
        let old_graph = old.primary();
        let new_graph = new.primary();

        let mut diffs = Vec::new();
        let mut children = Vec::new();

        if let Some(module) = self.compare_modules(old, new)? {
            children.push(module);
        }
        children.extend(self.compare_all(references(old_graph)?, references(new_graph)?)?);

        let old_assembly = old_graph.assembly()?;
        let new_assembly = new_graph.assembly()?;
        if let (Some(old_assembly), Some(new_assembly)) = (old_assembly, new_assembly) {
            let old_token = old_assembly.identity.public_key_token;
            let new_token = new_assembly.identity.public_key_token;
            if old_token != new_token {
                diffs.push(DeclarationDiff::PublicKeyTokenChanged {
                    old: old_token.map(hex),
                    new: new_token.map(hex),
                });
            }
            diffs.extend(attributes::diffs(
                &old_assembly.custom_attributes,
                &new_assembly.custom_attributes,
                self.options,
            ));
        }

        let declaration = |graph: &ModuleGraph| -> Result<DeclarationRef> {
            Ok(match graph.assembly()? {
                Some(assembly) => DeclarationRef::new(assembly.token, assembly.identity.to_string()),
                None => {
                    let module = graph.module()?;
                    DeclarationRef::new(module.token, module.name.clone())
                }
            })
        };

        Ok(DiffNode::modified(
            NodeKind::Assembly,
            new_graph.assembly_name(),
            declaration(old_graph)?,
            declaration(new_graph)?,
            diffs,
            children,
        ))
    }

    /// The two modules always pair; their children are the top-level API-visible types
    fn compare_modules(&self, old: &ModuleSet, new: &ModuleSet) -> Result<Option<DiffNode>> {
        let old_types = types::top_level(old, self.options)?;
        let new_types = types::top_level(new, self.options)?;
        debug!(
            old = old_types.len(),
            new = new_types.len(),
            "comparing top-level types"
        );

        let children = self.compare_all(old_types, new_types)?;

        let old_module = old.primary().module()?;
        let new_module = new.primary().module()?;
        Ok(DiffNode::modified(
            NodeKind::Module,
            new_module.name.clone(),
            DeclarationRef::new(old_module.token, old_module.name.clone()),
            DeclarationRef::new(new_module.token, new_module.name.clone()),
            Vec::new(),
            children,
        ))
    }
}

fn hex(bytes: [u8; 8]) -> String {
    bytes.iter().map(|byte| format!("{byte:02x}")).collect()
}

fn references(graph: &ModuleGraph) -> Result<Vec<ReferenceEntry<'_>>> {
    Ok(graph
        .assembly_references()?
        .into_iter()
        .map(|reference| ReferenceEntry { reference })
        .collect())
}

/// An assembly reference, paired by simple name
struct ReferenceEntry<'a> {
    reference: &'a AssemblyReference,
}

impl Comparable for ReferenceEntry<'_> {
    const KIND: NodeKind = NodeKind::Reference;

    fn key(&self) -> Result<String> {
        Ok(self.reference.identity.name.clone())
    }

    fn display_name(&self) -> Result<String> {
        Ok(self.reference.identity.name.clone())
    }

    fn declaration(&self) -> DeclarationRef {
        DeclarationRef::new(self.reference.token, self.reference.identity.to_string())
    }

    fn compare(&self, new: &Self, _comparer: &Comparer<'_>) -> Result<Option<DiffNode>> {
        let old_identity = &self.reference.identity;
        let new_identity = &new.reference.identity;

        let mut diffs = Vec::new();
        if old_identity.version != new_identity.version {
            diffs.push(DeclarationDiff::ReferenceVersionChanged {
                old: old_identity.version,
                new: new_identity.version,
            });
        }
        if old_identity.public_key_token != new_identity.public_key_token {
            diffs.push(DeclarationDiff::PublicKeyTokenChanged {
                old: old_identity.public_key_token.map(hex),
                new: new_identity.public_key_token.map(hex),
            });
        }

        Ok(DiffNode::modified(
            NodeKind::Reference,
            new_identity.name.clone(),
            self.declaration(),
            new.declaration(),
            diffs,
            Vec::new(),
        ))
    }
}

/// Compare two module sets. Returns the assembly node, or `None` if no API-visible declaration
/// differs.
///
/// # Errors
/// Returns an error if either module's metadata is damaged beyond decoding.
pub fn compare_modules(
    old: &ModuleSet,
    new: &ModuleSet,
    options: &CompareOptions,
) -> Result<Option<DiffNode>> {
    Comparer::new(options).compare_assemblies(old, new)
}

