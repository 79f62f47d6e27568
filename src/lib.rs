// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(clippy::too_many_arguments)]
//#![deny(unsafe_code)]
// - 'file/physical.rs' uses mmap to map a file into memory

//! # cildiff
//!
//! Structural public-API comparison of two builds of a .NET assembly, and the semantic-version
//! increment the differences require.
//!
//! `cildiff` reads the ECMA-335 metadata of both images from scratch (PE headers, heaps, tables,
//! signature blobs), resolves the API-visible declarations into a graph of types and members,
//! and compares the two graphs member by member. The result is a tree of [`diff::DiffNode`]s
//! that knows which differences break existing consumers, plus a separate check of enum member
//! values, which signature comparison cannot see.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cildiff::{compare_files, diff::CompareOptions, version::VersionChange};
//! use std::path::Path;
//!
//! let comparison = compare_files(
//!     Path::new("v1/Acme.dll"),
//!     Path::new("v2/Acme.dll"),
//!     &CompareOptions::default(),
//! );
//!
//! match comparison.version_change() {
//!     VersionChange::Major => println!("breaking changes:\n{}", comparison.to_xml()),
//!     VersionChange::Minor => println!("compatible additions"),
//!     _ => println!("no API changes"),
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`file`] - PE/COFF image reader over memory or memory-mapped backends
//! - [`metadata`] - metadata root, heaps, tables, signatures, type expressions and the
//!   declaration graph
//! - [`diff`] - merge-compare of declarations, the result tree and its XML report
//! - [`version`] - enum value check and the version verdict
//!
//! ## Error Handling
//!
//! The lower-level APIs return [`Result<T, Error>`](Result). The entry points [`compare`] and
//! [`compare_files`] never fail: a missing or malformed input is logged and yields an empty
//! [`Comparison`], whose verdict is [`version::VersionChange::Build`].
//!
//! ```rust,no_run
//! use cildiff::{Error, metadata::graph::ModuleGraph};
//!
//! match ModuleGraph::from_file(std::path::Path::new("Acme.dll")) {
//!     Ok(graph) => println!("Loaded {}", graph.assembly_name()),
//!     Err(Error::NotSupported) => println!("Not a managed image"),
//!     Err(Error::MalformedImage { message, .. }) => println!("Malformed file: {message}"),
//!     Err(e) => println!("Other error: {e}"),
//! }
//! ```
//!
//! ## Logging
//!
//! `cildiff` reports through [`tracing`]; it never installs a subscriber.

#[macro_use]
pub(crate) mod error;

/// Shared functionality which is used in unit tests
#[cfg(test)]
pub(crate) mod test;

/// PE/COFF image access
///
/// The [`file::File`] type loads an image from disk (memory-mapped) or from a buffer, validates
/// the DOS and PE headers and maps RVAs to file offsets. [`file::parser::Parser`] is the cursor
/// used by every decoder of the crate.
pub mod file;

/// ECMA-335 metadata and the declaration graph built from it
///
/// # Key Components
///
/// - [`metadata::Metadata`] - validated CLI header, metadata root, heaps and tables
/// - [`metadata::tables`] - row layouts, coded indices and typed rows
/// - [`metadata::signatures`] - signature blob decoding
/// - [`metadata::typesystem`] - comparable type expressions and substitution
/// - [`metadata::graph`] - memoized declaration entities and cross-module resolution
pub mod metadata;

/// Structural comparison and the difference tree
pub mod diff;

/// Semantic-version verdicts
pub mod version;

use std::{path::Path, sync::Arc};

use tracing::{debug, warn};

use crate::{
    diff::{CompareOptions, DiffNode},
    metadata::graph::{resolver::ModuleSet, ModuleGraph},
    version::{classify, EnumChanges, VersionChange},
};

/// `cildiff` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `cildiff` Error type
///
/// The error type of every fallible operation in this crate.
pub use error::Error;

pub use file::{parser::Parser, File};

/// The outcome of comparing two modules
#[derive(Debug, Default)]
pub struct Comparison {
    root: Option<DiffNode>,
    enums: EnumChanges,
}

impl Comparison {
    /// The difference tree rooted at the assembly, `None` if no API-visible declaration differs
    /// or the comparison could not be performed
    #[must_use]
    pub fn root(&self) -> Option<&DiffNode> {
        self.root.as_ref()
    }

    /// Enum member value differences
    #[must_use]
    pub fn enum_changes(&self) -> &EnumChanges {
        &self.enums
    }

    /// Returns true if the difference tree contains a breaking change
    #[must_use]
    pub fn is_breaking_change(&self) -> bool {
        self.root.as_ref().is_some_and(DiffNode::is_breaking)
    }

    /// The version increment the differences require
    #[must_use]
    pub fn version_change(&self) -> VersionChange {
        classify(self.root.as_ref(), &self.enums)
    }

    /// The difference tree as an XML report, empty if there is no tree
    #[must_use]
    pub fn to_xml(&self) -> String {
        diff::to_xml(self.root.as_ref())
    }
}

fn module_set(graph: ModuleGraph, options: &CompareOptions) -> ModuleSet {
    ModuleSet::new(graph, options.resolver.clone(), Arc::clone(&options.path_cache))
}

fn compare_graphs(old: ModuleGraph, new: ModuleGraph, options: &CompareOptions) -> Result<Comparison> {
    debug!(
        old = old.assembly_name(),
        new = new.assembly_name(),
        "comparing modules"
    );

    let enums = EnumChanges::compute(&old, &new, options)?;
    let old = module_set(old, options);
    let new = module_set(new, options);
    let root = diff::compare_modules(&old, &new, options)?;

    let comparison = Comparison { root, enums };
    debug!(
        nodes = comparison.root.as_ref().map_or(0, |root| root.iter().count()),
        enums = comparison.enums.changes().len(),
        verdict = %comparison.version_change(),
        "comparison finished"
    );
    Ok(comparison)
}

/// Compare two in-memory images.
///
/// Never fails: if either image cannot be read, the failure is logged and the result is an
/// empty [`Comparison`].
#[must_use]
pub fn compare(old: Vec<u8>, new: Vec<u8>, options: &CompareOptions) -> Comparison {
    let graphs = ModuleGraph::from_mem(old).and_then(|old| Ok((old, ModuleGraph::from_mem(new)?)));
    match graphs.and_then(|(old, new)| compare_graphs(old, new, options)) {
        Ok(comparison) => comparison,
        Err(error) => {
            warn!(%error, "comparison failed");
            Comparison::default()
        }
    }
}

fn load(path: &Path) -> Option<ModuleGraph> {
    if !path.is_file() {
        warn!(path = %path.display(), "input file does not exist");
        return None;
    }

    match ModuleGraph::from_file(path) {
        Ok(graph) => Some(graph),
        Err(error) => {
            warn!(path = %path.display(), %error, "failed to load module");
            None
        }
    }
}

/// Compare two images on disk.
///
/// Never fails: a missing or malformed file is logged and the result is an empty
/// [`Comparison`].
#[must_use]
pub fn compare_files(old: &Path, new: &Path, options: &CompareOptions) -> Comparison {
    let (Some(old_graph), Some(new_graph)) = (load(old), load(new)) else {
        return Comparison::default();
    };

    match compare_graphs(old_graph, new_graph, options) {
        Ok(comparison) => comparison,
        Err(error) => {
            warn!(
                old = %old.display(),
                new = %new.display(),
                %error,
                "comparison failed"
            );
            Comparison::default()
        }
    }
}
