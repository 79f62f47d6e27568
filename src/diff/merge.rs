//! Ordered two-list merge.
//!
//! Both sides are sorted by a caller-chosen key and walked in lockstep. The side whose current
//! key is behind advances alone and contributes a [`MergeStep::Deleted`] or [`MergeStep::New`];
//! equal keys advance together. Paired elements must also pass an identity predicate, otherwise
//! they are reported as a deletion followed by an addition (for example a class that became an
//! interface under the same name).

use std::{cmp::Ordering, iter::Peekable, vec::IntoIter};

/// One step of a merge walk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeStep<T> {
    /// Only in the old list
    Deleted(T),
    /// Only in the new list
    New(T),
    /// In both lists under the same key and identity
    Paired(T, T),
}

struct Merge<K, T, F> {
    old: Peekable<IntoIter<(K, T)>>,
    new: Peekable<IntoIter<(K, T)>>,
    same_identity: F,
    pending: Option<T>,
}

impl<K: Ord, T, F: Fn(&T, &T) -> bool> Iterator for Merge<K, T, F> {
    type Item = MergeStep<T>;

    fn next(&mut self) -> Option<MergeStep<T>> {
        if let Some(new) = self.pending.take() {
            return Some(MergeStep::New(new));
        }

        let order = match (self.old.peek(), self.new.peek()) {
            (None, None) => return None,
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (Some((old_key, _)), Some((new_key, _))) => old_key.cmp(new_key),
        };

        match order {
            Ordering::Less => self.old.next().map(|(_, old)| MergeStep::Deleted(old)),
            Ordering::Greater => self.new.next().map(|(_, new)| MergeStep::New(new)),
            Ordering::Equal => {
                let (_, old) = self.old.next()?;
                let (_, new) = self.new.next()?;
                if (self.same_identity)(&old, &new) {
                    Some(MergeStep::Paired(old, new))
                } else {
                    self.pending = Some(new);
                    Some(MergeStep::Deleted(old))
                }
            }
        }
    }
}

/// Merge two keyed lists. The lists need not be sorted; elements with equal keys on one side
/// keep their relative order.
pub fn merge_compare<K, T, F>(
    mut old: Vec<(K, T)>,
    mut new: Vec<(K, T)>,
    same_identity: F,
) -> Vec<MergeStep<T>>
where
    K: Ord,
    F: Fn(&T, &T) -> bool,
{
    old.sort_by(|a, b| a.0.cmp(&b.0));
    new.sort_by(|a, b| a.0.cmp(&b.0));

    Merge {
        old: old.into_iter().peekable(),
        new: new.into_iter().peekable(),
        same_identity,
        pending: None,
    }
    .collect()
}
