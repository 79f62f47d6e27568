//! The comparison result tree.
//!
//! A [`DiffNode`] describes one declaration that differs between the two modules: it exists only
//! in the new module ([`DiffType::New`]), only in the old one ([`DiffType::Deleted`]), or in both
//! with atomic [`DeclarationDiff`]s and/or differing children ([`DiffType::Modified`]). Nodes are
//! built bottom-up by the comparers and never change afterwards; whether a node is breaking is
//! computed on first request and memoized.

use once_cell::sync::OnceCell;
use strum::{Display, EnumIter};

use crate::{diff::DeclarationDiff, metadata::token::Token};

/// The declaration kind a node describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumIter)]
pub enum NodeKind {
    /// The assembly manifest
    Assembly,
    /// The module
    Module,
    /// A type definition, nested or top-level
    Type,
    /// A method, constructor or operator
    Method,
    /// A field
    Field,
    /// A property
    Property,
    /// An event
    Event,
    /// A property or event accessor method
    Accessor,
    /// A referenced assembly
    #[strum(serialize = "AssemblyReference")]
    Reference,
}

/// How a declaration differs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum DiffType {
    /// Only in the new module
    New,
    /// Only in the old module
    Deleted,
    /// In both modules, with differences
    Modified,
}

/// One side of a node: the declaration it was built from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclarationRef {
    /// Token of the declaration in its module
    pub token: Token,
    /// Display name of the declaration on this side
    pub name: String,
    /// The declaration is an interface type
    pub is_interface: bool,
}

impl DeclarationRef {
    /// A declaration that is not an interface
    #[must_use]
    pub fn new(token: Token, name: impl Into<String>) -> Self {
        DeclarationRef {
            token,
            name: name.into(),
            is_interface: false,
        }
    }

    /// A type declaration
    #[must_use]
    pub fn for_type(token: Token, name: impl Into<String>, is_interface: bool) -> Self {
        DeclarationRef {
            token,
            name: name.into(),
            is_interface,
        }
    }
}

/// One node of the comparison result tree
#[derive(Debug)]
pub struct DiffNode {
    kind: NodeKind,
    diff_type: DiffType,
    name: String,
    old: Option<DeclarationRef>,
    new: Option<DeclarationRef>,
    declaration_diffs: Vec<DeclarationDiff>,
    children: Vec<DiffNode>,
    breaking: OnceCell<bool>,
}

impl DiffNode {
    /// A declaration only present in the new module
    #[must_use]
    pub fn added(kind: NodeKind, name: impl Into<String>, new: DeclarationRef) -> DiffNode {
        DiffNode {
            kind,
            diff_type: DiffType::New,
            name: name.into(),
            old: None,
            new: Some(new),
            declaration_diffs: Vec::new(),
            children: Vec::new(),
            breaking: OnceCell::new(),
        }
    }

    /// A declaration only present in the old module
    #[must_use]
    pub fn deleted(kind: NodeKind, name: impl Into<String>, old: DeclarationRef) -> DiffNode {
        DiffNode {
            kind,
            diff_type: DiffType::Deleted,
            name: name.into(),
            old: Some(old),
            new: None,
            declaration_diffs: Vec::new(),
            children: Vec::new(),
            breaking: OnceCell::new(),
        }
    }

    /// A declaration present in both modules, or `None` if nothing about it differs
    #[must_use]
    pub fn modified(
        kind: NodeKind,
        name: impl Into<String>,
        old: DeclarationRef,
        new: DeclarationRef,
        declaration_diffs: Vec<DeclarationDiff>,
        children: Vec<DiffNode>,
    ) -> Option<DiffNode> {
        if declaration_diffs.is_empty() && children.is_empty() {
            return None;
        }

        Some(DiffNode {
            kind,
            diff_type: DiffType::Modified,
            name: name.into(),
            old: Some(old),
            new: Some(new),
            declaration_diffs,
            children,
            breaking: OnceCell::new(),
        })
    }

    /// The declaration kind
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// New, deleted or modified
    #[must_use]
    pub fn diff_type(&self) -> DiffType {
        self.diff_type
    }

    /// Display name of the declaration (the new name for modified nodes)
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The old declaration, absent for new nodes
    #[must_use]
    pub fn old_ref(&self) -> Option<&DeclarationRef> {
        self.old.as_ref()
    }

    /// The new declaration, absent for deleted nodes
    #[must_use]
    pub fn new_ref(&self) -> Option<&DeclarationRef> {
        self.new.as_ref()
    }

    /// Atomic differences of the declaration itself
    #[must_use]
    pub fn declaration_diffs(&self) -> &[DeclarationDiff] {
        &self.declaration_diffs
    }

    /// Differences of nested declarations
    #[must_use]
    pub fn children(&self) -> &[DiffNode] {
        &self.children
    }

    fn is_interface(&self) -> bool {
        self.old.as_ref().is_some_and(|old| old.is_interface)
            || self.new.as_ref().is_some_and(|new| new.is_interface)
    }

    /// Returns true if the difference can break code compiled against the old module.
    ///
    /// - new declarations never break
    /// - deleted declarations break, except assembly references
    /// - modified declarations break if any atomic diff or child breaks, except that any change
    ///   at all to an interface breaks (implementers must follow every change)
    /// - assembly references are informational and never break
    pub fn is_breaking(&self) -> bool {
        *self.breaking.get_or_init(|| match self.diff_type {
            DiffType::New => false,
            DiffType::Deleted => self.kind != NodeKind::Reference,
            DiffType::Modified if self.kind == NodeKind::Reference => false,
            DiffType::Modified if self.kind == NodeKind::Type && self.is_interface() => true,
            DiffType::Modified => {
                self.declaration_diffs.iter().any(DeclarationDiff::is_breaking)
                    || self.children.iter().any(DiffNode::is_breaking)
            }
        })
    }

    /// Depth-first, pre-order walk over this node and all its descendants
    pub fn iter(&self) -> Nodes<'_> {
        Nodes { stack: vec![self] }
    }
}

/// Pre-order iterator over a diff tree, see [`DiffNode::iter`]
pub struct Nodes<'a> {
    stack: Vec<&'a DiffNode>,
}

impl<'a> Iterator for Nodes<'a> {
    type Item = &'a DiffNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use crate::metadata::typesystem::PrimitiveKind;

    use super::*;

    fn declaration(row: u32) -> DeclarationRef {
        DeclarationRef::new(Token::from_parts(0x06, row), format!("M{row}"))
    }

    fn interface(row: u32) -> DeclarationRef {
        DeclarationRef::for_type(Token::from_parts(0x02, row), "Acme.IWidget", true)
    }

    fn class(row: u32) -> DeclarationRef {
        DeclarationRef::for_type(Token::from_parts(0x02, row), "Acme.Widget", false)
    }

    #[test]
    fn unchanged_is_not_a_node() {
        assert!(DiffNode::modified(
            NodeKind::Method,
            "M",
            declaration(1),
            declaration(1),
            vec![],
            vec![]
        )
        .is_none());
    }

    #[test]
    fn new_and_deleted() {
        let added = DiffNode::added(NodeKind::Method, "M", declaration(1));
        assert_eq!(added.diff_type(), DiffType::New);
        assert!(added.old_ref().is_none());
        assert!(!added.is_breaking());

        let deleted = DiffNode::deleted(NodeKind::Method, "M", declaration(1));
        assert_eq!(deleted.diff_type(), DiffType::Deleted);
        assert!(deleted.new_ref().is_none());
        assert!(deleted.is_breaking());

        let reference = DiffNode::deleted(NodeKind::Reference, "Foo", declaration(1));
        assert!(!reference.is_breaking());
    }

    #[test]
    fn breaking_propagates_up() {
        let method = DiffNode::deleted(NodeKind::Method, "M", declaration(1));
        let ty = DiffNode::modified(NodeKind::Type, "Acme.Widget", class(1), class(1), vec![], vec![method])
            .unwrap();
        assert!(ty.is_breaking());

        let method = DiffNode::added(NodeKind::Method, "M", declaration(2));
        let ty = DiffNode::modified(NodeKind::Type, "Acme.Widget", class(1), class(1), vec![], vec![method])
            .unwrap();
        assert!(!ty.is_breaking());
    }

    #[test]
    fn any_interface_change_breaks() {
        let method = DiffNode::added(NodeKind::Method, "M", declaration(2));
        let ty = DiffNode::modified(
            NodeKind::Type,
            "Acme.IWidget",
            interface(1),
            interface(1),
            vec![],
            vec![method],
        )
        .unwrap();
        assert!(ty.is_breaking());

        let ty = DiffNode::modified(
            NodeKind::Type,
            "Acme.IWidget",
            interface(1),
            interface(1),
            vec![DeclarationDiff::AttributeAdded("System.ObsoleteAttribute".into())],
            vec![],
        )
        .unwrap();
        assert!(ty.is_breaking());
    }

    #[test]
    fn atomic_diffs_decide_modified_nodes() {
        let non_breaking = DiffNode::modified(
            NodeKind::Method,
            "M",
            declaration(1),
            declaration(1),
            vec![DeclarationDiff::AttributeAdded("System.ObsoleteAttribute".into())],
            vec![],
        )
        .unwrap();
        assert!(!non_breaking.is_breaking());

        let breaking = DiffNode::modified(
            NodeKind::Field,
            "F",
            declaration(1),
            declaration(1),
            vec![DeclarationDiff::MemberTypeChanged {
                old: PrimitiveKind::I4.to_string(),
                new: PrimitiveKind::I8.to_string(),
            }],
            vec![],
        )
        .unwrap();
        assert!(breaking.is_breaking());
    }

    #[test]
    fn pre_order_walk() {
        let leaf = DiffNode::added(NodeKind::Method, "M", declaration(2));
        let field = DiffNode::deleted(NodeKind::Field, "F", declaration(3));
        let ty = DiffNode::modified(NodeKind::Type, "T", class(1), class(1), vec![], vec![leaf])
            .unwrap();
        let root = DiffNode::modified(
            NodeKind::Module,
            "Acme.dll",
            declaration(1),
            declaration(1),
            vec![],
            vec![ty, field],
        )
        .unwrap();

        let names: Vec<&str> = root.iter().map(DiffNode::name).collect();
        assert_eq!(names, vec!["Acme.dll", "T", "M", "F"]);
    }

    #[test]
    fn xml_element_names() {
        assert_eq!(NodeKind::Reference.to_string(), "AssemblyReference");
        assert_eq!(NodeKind::Accessor.to_string(), "Accessor");
        assert_eq!(DiffType::Modified.to_string(), "Modified");
    }
}
