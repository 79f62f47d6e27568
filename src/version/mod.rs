//! Semantic-version verdicts.
//!
//! [`classify`] reduces a diff tree and the independent [`EnumChanges`] check to one
//! [`VersionChange`]. The two signals are classified separately and the higher one wins:
//!
//! | Signal | Verdict |
//! |--------|---------|
//! | breaking tree, enum member removed or re-valued, `[Flags]` changed | [`VersionChange::Major`] |
//! | new or modified declaration, enum member added | [`VersionChange::Minor`] |
//! | nothing, or only assembly reference changes | [`VersionChange::Build`] |

mod enums;

pub use enums::{EnumChange, EnumChanges, EnumMemberChange};

use strum::{Display, EnumIter};

use crate::diff::{DiffNode, DiffType, NodeKind};

/// The version component that has to be incremented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumIter)]
pub enum VersionChange {
    /// No change needed
    None,
    /// Build number only: no API-visible difference
    Build,
    /// Minor version: compatible additions
    Minor,
    /// Major version: breaking changes
    Major,
}

/// Returns true if `node` on its own is a compatible API change
fn is_minor_signal(node: &DiffNode) -> bool {
    if node.kind() == NodeKind::Reference {
        return false;
    }
    match node.diff_type() {
        DiffType::New | DiffType::Deleted => true,
        DiffType::Modified => !node.declaration_diffs().is_empty(),
    }
}

fn tree_severity(root: &DiffNode) -> VersionChange {
    if root.is_breaking() {
        VersionChange::Major
    } else if root.iter().any(is_minor_signal) {
        VersionChange::Minor
    } else {
        VersionChange::Build
    }
}

/// Classify a comparison result. Never returns [`VersionChange::None`]: every comparison yields
/// at least a build increment.
///
/// ```rust
/// use cildiff::version::{classify, EnumChanges, VersionChange};
///
/// assert_eq!(classify(None, &EnumChanges::default()), VersionChange::Build);
/// ```
#[must_use]
pub fn classify(root: Option<&DiffNode>, enums: &EnumChanges) -> VersionChange {
    let tree = root.map_or(VersionChange::Build, tree_severity);
    tree.max(enums.severity()).max(VersionChange::Build)
}

#[cfg(test)]
mod tests {
    use crate::{
        diff::{DeclarationDiff, DeclarationRef},
        metadata::{graph::entities::AssemblyVersion, token::Token},
    };

    use super::*;

    fn declaration(table: u8, name: &str) -> DeclarationRef {
        DeclarationRef::new(Token::from_parts(table, 1), name)
    }

    fn assembly(children: Vec<DiffNode>) -> DiffNode {
        DiffNode::modified(
            NodeKind::Assembly,
            "Acme",
            declaration(0x20, "Acme"),
            declaration(0x20, "Acme"),
            vec![],
            children,
        )
        .unwrap()
    }

    fn enum_change(member: EnumMemberChange) -> EnumChanges {
        vec![EnumChange {
            name: "Acme.Color".into(),
            flags_changed: None,
            members: vec![member],
        }]
        .into_iter()
        .collect()
    }

    #[test]
    fn ordering() {
        assert!(VersionChange::None < VersionChange::Build);
        assert!(VersionChange::Build < VersionChange::Minor);
        assert!(VersionChange::Minor < VersionChange::Major);
        assert_eq!(VersionChange::Major.to_string(), "Major");
    }

    #[test]
    fn additions_are_minor() {
        let root = assembly(vec![DiffNode::added(
            NodeKind::Type,
            "Acme.Widget",
            declaration(0x02, "Acme.Widget"),
        )]);
        assert_eq!(classify(Some(&root), &EnumChanges::default()), VersionChange::Minor);
    }

    #[test]
    fn deletions_are_major() {
        let root = assembly(vec![DiffNode::deleted(
            NodeKind::Type,
            "Acme.Widget",
            declaration(0x02, "Acme.Widget"),
        )]);
        assert_eq!(classify(Some(&root), &EnumChanges::default()), VersionChange::Major);
    }

    #[test]
    fn references_only_build() {
        let reference = DiffNode::modified(
            NodeKind::Reference,
            "Foo",
            declaration(0x23, "Foo"),
            declaration(0x23, "Foo"),
            vec![DeclarationDiff::ReferenceVersionChanged {
                old: AssemblyVersion::new(1, 0, 0, 0),
                new: AssemblyVersion::new(2, 0, 0, 0),
            }],
            vec![],
        )
        .unwrap();
        let added = DiffNode::added(NodeKind::Reference, "Bar", declaration(0x23, "Bar"));
        let root = assembly(vec![reference, added]);

        assert!(!root.is_breaking());
        assert_eq!(classify(Some(&root), &EnumChanges::default()), VersionChange::Build);
    }

    #[test]
    fn enum_signal() {
        let added = enum_change(EnumMemberChange::Added {
            name: "Blue".into(),
            value: 4,
        });
        assert_eq!(classify(None, &added), VersionChange::Minor);

        let changed = enum_change(EnumMemberChange::ValueChanged {
            name: "Red".into(),
            old: 1,
            new: 2,
        });
        assert_eq!(classify(None, &changed), VersionChange::Major);

        // the enum signal never lowers the tree verdict
        let root = assembly(vec![DiffNode::deleted(
            NodeKind::Method,
            "Paint()",
            declaration(0x06, "Paint"),
        )]);
        assert_eq!(classify(Some(&root), &added), VersionChange::Major);
    }
}
