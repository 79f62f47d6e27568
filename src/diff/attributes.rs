use std::collections::BTreeSet;

use crate::{
    diff::{CompareOptions, DeclarationDiff},
    metadata::graph::entities::CustomAttribute,
};

fn names(attributes: &[CustomAttribute], options: &CompareOptions) -> BTreeSet<String> {
    attributes
        .iter()
        .map(CustomAttribute::full_name)
        .filter(|name| !options.is_attribute_ignored(name))
        .collect()
}

/// Attribute types applied on one side only, removals first. Attributes are identified by their
/// type; constructor arguments are not compared.
pub(crate) fn diffs(
    old: &[CustomAttribute],
    new: &[CustomAttribute],
    options: &CompareOptions,
) -> Vec<DeclarationDiff> {
    let old = names(old, options);
    let new = names(new, options);

    old.difference(&new)
        .map(|name| DeclarationDiff::AttributeRemoved(name.clone()))
        .chain(
            new.difference(&old)
                .map(|name| DeclarationDiff::AttributeAdded(name.clone())),
        )
        .collect()
}
