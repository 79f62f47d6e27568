//! Enum value check.
//!
//! Signature comparison sees an enum member as a literal field of the enum's own type, so a
//! changed numeric value goes unnoticed by the diff tree. This check compares the member values
//! of every API-visible enum present in both modules and reports the differences separately.

use std::{collections::BTreeMap, fmt};

use tracing::trace;

use crate::{
    diff::CompareOptions,
    metadata::graph::{entities::TypeDefinition, ModuleGraph},
    version::VersionChange,
    Result,
};

const FLAGS_ATTRIBUTE: &str = "System.FlagsAttribute";

/// A difference in one enum member
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnumMemberChange {
    /// The member exists only in the new enum
    Added {
        /// Member name
        name: String,
        /// Underlying value
        value: i128,
    },
    /// The member exists only in the old enum
    Removed {
        /// Member name
        name: String,
        /// Underlying value
        value: i128,
    },
    /// The member exists in both with different underlying values
    ValueChanged {
        /// Member name
        name: String,
        /// Old underlying value
        old: i128,
        /// New underlying value
        new: i128,
    },
}

impl EnumMemberChange {
    /// Returns true unless the member was only added
    #[must_use]
    pub fn is_breaking(&self) -> bool {
        !matches!(self, EnumMemberChange::Added { .. })
    }
}

impl fmt::Display for EnumMemberChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnumMemberChange::Added { name, value } => write!(f, "Member {name} = {value} added."),
            EnumMemberChange::Removed { name, value } => {
                write!(f, "Member {name} = {value} removed.")
            }
            EnumMemberChange::ValueChanged { name, old, new } => {
                write!(f, "Value of member {name} changed from {old} to {new}.")
            }
        }
    }
}

/// The differences of one enum present in both modules
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumChange {
    /// Full name of the enum
    pub name: String,
    /// `Some((old, new))` if `[Flags]` was added or removed
    pub flags_changed: Option<(bool, bool)>,
    /// Member differences, ordered by member name
    pub members: Vec<EnumMemberChange>,
}

impl EnumChange {
    /// The version change this enum alone requires
    #[must_use]
    pub fn severity(&self) -> VersionChange {
        if self.flags_changed.is_some() || self.members.iter().any(EnumMemberChange::is_breaking) {
            VersionChange::Major
        } else if self.members.is_empty() {
            VersionChange::None
        } else {
            VersionChange::Minor
        }
    }
}

/// The enum value differences between two modules
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnumChanges {
    changes: Vec<EnumChange>,
}

/// An enum's members by name, with their underlying values
struct EnumValues {
    has_flags: bool,
    members: BTreeMap<String, i128>,
}

fn enum_values(graph: &ModuleGraph, definition: &TypeDefinition) -> Result<EnumValues> {
    let mut members = BTreeMap::new();
    for token in &definition.fields {
        let field = graph.field(*token)?;
        if !field.is_literal() {
            continue;
        }
        match field.constant.as_ref().and_then(|constant| constant.as_i128()) {
            Some(value) => {
                members.insert(field.name.clone(), value);
            }
            None => trace!(member = %field.name, "enum member without integral value"),
        }
    }

    Ok(EnumValues {
        has_flags: definition.has_attribute(FLAGS_ATTRIBUTE),
        members,
    })
}

/// API-visible, not ignored enums of `graph` by full name
fn exported_enums<'a>(
    graph: &'a ModuleGraph,
    options: &CompareOptions,
) -> Result<BTreeMap<String, &'a TypeDefinition>> {
    let mut enums = BTreeMap::new();
    for definition in graph.type_definitions()? {
        if !definition.is_enum() || !graph.is_api_visible(definition)? {
            continue;
        }
        let name = definition.full_name();
        if !options.is_ignored(&name) {
            enums.insert(name, definition);
        }
    }
    Ok(enums)
}

fn member_changes(old: &BTreeMap<String, i128>, new: &BTreeMap<String, i128>) -> Vec<EnumMemberChange> {
    let mut changes = Vec::new();
    for (name, &value) in old {
        match new.get(name) {
            None => changes.push(EnumMemberChange::Removed {
                name: name.clone(),
                value,
            }),
            Some(&new_value) if new_value != value => changes.push(EnumMemberChange::ValueChanged {
                name: name.clone(),
                old: value,
                new: new_value,
            }),
            Some(_) => {}
        }
    }
    for (name, &value) in new {
        if !old.contains_key(name) {
            changes.push(EnumMemberChange::Added {
                name: name.clone(),
                value,
            });
        }
    }
    changes.sort_by(|a, b| member_name(a).cmp(member_name(b)));
    changes
}

fn member_name(change: &EnumMemberChange) -> &str {
    match change {
        EnumMemberChange::Added { name, .. }
        | EnumMemberChange::Removed { name, .. }
        | EnumMemberChange::ValueChanged { name, .. } => name,
    }
}

impl EnumChanges {
    /// Compare the enums present in both modules. Enums on one side only are left to the diff
    /// tree.
    ///
    /// # Errors
    /// Returns an error if the metadata of an enum or one of its members cannot be decoded.
    pub fn compute(old: &ModuleGraph, new: &ModuleGraph, options: &CompareOptions) -> Result<Self> {
        let old_enums = exported_enums(old, options)?;
        let new_enums = exported_enums(new, options)?;

        let mut changes = Vec::new();
        for (name, old_definition) in &old_enums {
            let Some(new_definition) = new_enums.get(name) else {
                continue;
            };

            let old_values = enum_values(old, old_definition)?;
            let new_values = enum_values(new, new_definition)?;

            let change = EnumChange {
                name: name.clone(),
                flags_changed: (old_values.has_flags != new_values.has_flags)
                    .then_some((old_values.has_flags, new_values.has_flags)),
                members: member_changes(&old_values.members, &new_values.members),
            };
            if change.flags_changed.is_some() || !change.members.is_empty() {
                changes.push(change);
            }
        }

        Ok(EnumChanges { changes })
    }

    /// Returns true if no enum differs
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// The differing enums, ordered by full name
    #[must_use]
    pub fn changes(&self) -> &[EnumChange] {
        &self.changes
    }

    /// The highest severity of all enum changes, [`VersionChange::None`] if there are none
    #[must_use]
    pub fn severity(&self) -> VersionChange {
        self.changes
            .iter()
            .map(EnumChange::severity)
            .max()
            .unwrap_or(VersionChange::None)
    }
}

impl FromIterator<EnumChange> for EnumChanges {
    fn from_iter<I: IntoIterator<Item = EnumChange>>(iter: I) -> Self {
        EnumChanges {
            changes: iter.into_iter().collect(),
        }
    }
}
