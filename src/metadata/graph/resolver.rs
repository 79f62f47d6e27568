//! Cross-module resolution.
//!
//! A module's signatures name types from other assemblies through `AssemblyRef` rows. Following
//! such a reference (for example to walk a base class chain that leaves the compared assembly)
//! needs the referenced image on disk. Locating it is delegated to an [`AssemblyResolver`]
//! supplied by the caller; probe results are kept in an explicit [`AssemblyPathCache`] that the
//! caller owns, shares between comparisons and clears when its search context changes.
//!
//! [`ModuleSet`] ties a primary [`ModuleGraph`] to the modules loaded on its behalf. A reference
//! that cannot be resolved is not an error: lookups through it return `None`.

use std::{
    cell::RefCell,
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use dashmap::DashMap;
use tracing::{debug, trace};

use crate::metadata::{
    graph::{entities::AssemblyName, entities::TypeDefinition, ModuleGraph},
    typesystem::NamedType,
};

/// Locates the image of a referenced assembly
pub trait AssemblyResolver: Send + Sync {
    /// The path of the image defining `name`, or `None` if it cannot be found.
    ///
    /// Implementations may consult and fill `cache`.
    fn resolve(&self, name: &AssemblyName, cache: &AssemblyPathCache) -> Option<PathBuf>;
}

/// Process-scoped memo of assembly probe results, keyed by full assembly identity.
///
/// Negative results are cached too. Call [`AssemblyPathCache::clear`] between comparisons whose
/// search directories differ, since equal identities may then live at different paths.
#[derive(Debug, Default)]
pub struct AssemblyPathCache {
    entries: DashMap<String, Option<PathBuf>>,
}

impl AssemblyPathCache {
    /// Create an empty cache
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached probe result for `name`: `None` if never probed, `Some(None)` if the probe
    /// found nothing
    #[must_use]
    pub fn get(&self, name: &AssemblyName) -> Option<Option<PathBuf>> {
        self.entries
            .get(&name.to_string())
            .map(|entry| entry.value().clone())
    }

    /// Record the probe result for `name`
    pub fn insert(&self, name: &AssemblyName, path: Option<PathBuf>) {
        self.entries.insert(name.to_string(), path);
    }

    /// Forget every probe result
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Number of cached identities
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is cached
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Resolver probing `<dir>/<name>.dll` and `<dir>/<name>.exe` in a list of directories
#[derive(Debug, Clone, Default)]
pub struct DirectoryResolver {
    search_dirs: Vec<PathBuf>,
}

impl DirectoryResolver {
    /// Create a resolver without search directories
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a directory to probe, after the ones already added
    #[must_use]
    pub fn with_search_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.search_dirs.push(dir.as_ref().to_path_buf());
        self
    }

    /// The probed directories, in order
    #[must_use]
    pub fn search_dirs(&self) -> &[PathBuf] {
        &self.search_dirs
    }

    fn candidates<'a>(&'a self, name: &'a AssemblyName) -> impl Iterator<Item = PathBuf> + 'a {
        self.search_dirs.iter().flat_map(move |dir| {
            ["dll", "exe"]
                .into_iter()
                .map(move |extension| dir.join(format!("{}.{extension}", name.name)))
        })
    }
}

impl AssemblyResolver for DirectoryResolver {
    fn resolve(&self, name: &AssemblyName, cache: &AssemblyPathCache) -> Option<PathBuf> {
        if let Some(cached) = cache.get(name) {
            return cached;
        }

        let found = self.candidates(name).find(|candidate| candidate.is_file());
        cache.insert(name, found.clone());
        found
    }
}

/// A primary module and the referenced modules loaded while resolving its types
pub struct ModuleSet {
    primary: ModuleGraph,
    loaded: boxcar::Vec<ModuleGraph>,
    by_assembly: RefCell<HashMap<String, Option<usize>>>,
    resolver: Option<Arc<dyn AssemblyResolver>>,
    cache: Arc<AssemblyPathCache>,
}

impl ModuleSet {
    /// Wrap `primary`. Without a resolver only types of the primary module can be found.
    #[must_use]
    pub fn new(
        primary: ModuleGraph,
        resolver: Option<Arc<dyn AssemblyResolver>>,
        cache: Arc<AssemblyPathCache>,
    ) -> Self {
        ModuleSet {
            primary,
            loaded: boxcar::Vec::new(),
            by_assembly: RefCell::new(HashMap::new()),
            resolver,
            cache,
        }
    }

    /// The module being compared
    #[must_use]
    pub fn primary(&self) -> &ModuleGraph {
        &self.primary
    }

    /// Number of referenced modules loaded so far
    #[must_use]
    pub fn loaded_count(&self) -> usize {
        self.loaded.count()
    }

    /// The first `AssemblyRef` named `assembly` in any module of the set
    fn reference_named(&self, assembly: &str) -> Option<AssemblyName> {
        std::iter::once(&self.primary)
            .chain(self.loaded.iter().map(|(_, graph)| graph))
            .find_map(|graph| {
                graph.assembly_references().ok().and_then(|references| {
                    references
                        .into_iter()
                        .find(|reference| reference.identity.name == assembly)
                        .map(|reference| reference.identity.clone())
                })
            })
    }

    fn load(&self, assembly: &str) -> Option<usize> {
        let resolver = self.resolver.as_ref()?;
        let Some(name) = self.reference_named(assembly) else {
            trace!(assembly, "no reference to resolve");
            return None;
        };

        let Some(path) = resolver.resolve(&name, &self.cache) else {
            trace!(reference = %name, "unresolved assembly reference");
            return None;
        };

        match ModuleGraph::from_file(&path) {
            Ok(graph) => {
                debug!(reference = %name, path = %path.display(), "loaded referenced module");
                Some(self.loaded.push(graph))
            }
            Err(error) => {
                trace!(reference = %name, path = %path.display(), %error, "failed to load referenced module");
                None
            }
        }
    }

    /// The module defining `assembly`, loading it through the resolver on first use
    pub fn module_for(&self, assembly: &str) -> Option<&ModuleGraph> {
        if assembly == self.primary.assembly_name() {
            return Some(&self.primary);
        }

        let cached = self.by_assembly.borrow().get(assembly).copied();
        let slot = match cached {
            Some(slot) => slot,
            None => {
                let slot = self.load(assembly);
                self.by_assembly
                    .borrow_mut()
                    .insert(assembly.to_string(), slot);
                slot
            }
        };

        slot.and_then(|index| self.loaded.get(index))
    }

    /// Find the definition of `identity` and the module defining it
    pub fn find_type(&self, identity: &NamedType) -> Option<(&ModuleGraph, &TypeDefinition)> {
        let graph = self.module_for(&identity.assembly)?;
        match graph.find_type(identity) {
            Ok(Some(definition)) => Some((graph, definition)),
            Ok(None) => {
                trace!(%identity, "type not found in its module");
                None
            }
            Err(error) => {
                trace!(%identity, %error, "failed to read type");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use crate::metadata::graph::entities::AssemblyVersion;

    use super::*;

    fn reference(name: &str) -> AssemblyName {
        AssemblyName {
            name: name.to_string(),
            version: AssemblyVersion::new(1, 0, 0, 0),
            culture: String::new(),
            public_key_token: None,
        }
    }

    #[test]
    fn directory_resolver_probes_dll_then_exe() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        fs::write(second.path().join("Acme.Core.exe"), b"MZ").unwrap();
        fs::write(second.path().join("Acme.Util.dll"), b"MZ").unwrap();

        let resolver = DirectoryResolver::new()
            .with_search_dir(first.path())
            .with_search_dir(second.path());
        let cache = AssemblyPathCache::new();

        assert_eq!(
            resolver.resolve(&reference("Acme.Core"), &cache),
            Some(second.path().join("Acme.Core.exe"))
        );
        assert_eq!(
            resolver.resolve(&reference("Acme.Util"), &cache),
            Some(second.path().join("Acme.Util.dll"))
        );
        assert_eq!(resolver.resolve(&reference("Missing"), &cache), None);
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn cache_answers_until_cleared() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = DirectoryResolver::new().with_search_dir(dir.path());
        let cache = AssemblyPathCache::new();

        assert_eq!(resolver.resolve(&reference("Late"), &cache), None);
        assert_eq!(cache.get(&reference("Late")), Some(None));

        // The negative result sticks until the cache is cleared
        fs::write(dir.path().join("Late.dll"), b"MZ").unwrap();
        assert_eq!(resolver.resolve(&reference("Late"), &cache), None);

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(
            resolver.resolve(&reference("Late"), &cache),
            Some(dir.path().join("Late.dll"))
        );
    }

    #[test]
    fn cache_keys_include_version() {
        let cache = AssemblyPathCache::new();
        let mut newer = reference("Acme");
        newer.version = AssemblyVersion::new(2, 0, 0, 0);

        cache.insert(&reference("Acme"), Some(PathBuf::from("/v1/Acme.dll")));
        assert_eq!(cache.get(&newer), None);
    }
}
