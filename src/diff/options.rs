//! Comparison options.

use std::{fmt, sync::Arc};

use crate::metadata::graph::resolver::{AssemblyPathCache, AssemblyResolver};

/// Predicate over qualified names (`Ns.Outer.Inner`, `Ns.Type.Member`); `true` hides the
/// declaration from both sides of the comparison.
pub type IgnorePredicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Attributes emitted by compilers rather than written by hand. They change with compiler
/// versions and settings and never produce attribute diffs by default.
pub const COMPILER_ATTRIBUTES: &[&str] = &[
    "System.Runtime.CompilerServices.CompilerGeneratedAttribute",
    "System.Runtime.CompilerServices.NullableAttribute",
    "System.Runtime.CompilerServices.NullableContextAttribute",
    "System.Runtime.CompilerServices.NullablePublicOnlyAttribute",
    "System.Runtime.CompilerServices.IsReadOnlyAttribute",
    "System.Runtime.CompilerServices.IsByRefLikeAttribute",
    "System.Runtime.CompilerServices.AsyncStateMachineAttribute",
    "System.Runtime.CompilerServices.IteratorStateMachineAttribute",
    "System.Runtime.CompilerServices.RefSafetyRulesAttribute",
    "System.Runtime.CompilerServices.TupleElementNamesAttribute",
    "System.Runtime.CompilerServices.ExtensionAttribute",
    "System.Runtime.CompilerServices.CompilationRelaxationsAttribute",
    "System.Runtime.CompilerServices.RuntimeCompatibilityAttribute",
    "System.Diagnostics.DebuggableAttribute",
    "System.Diagnostics.DebuggerNonUserCodeAttribute",
    "System.Diagnostics.DebuggerHiddenAttribute",
    "System.Diagnostics.DebuggerStepThroughAttribute",
    "System.Diagnostics.DebuggerBrowsableAttribute",
    "System.Runtime.Versioning.TargetFrameworkAttribute",
    "System.Reflection.AssemblyConfigurationAttribute",
    "System.Reflection.AssemblyFileVersionAttribute",
    "System.Reflection.AssemblyInformationalVersionAttribute",
];

/// Settings of one comparison.
///
/// Built with [`CompareOptions::new`] and the `with_*` setters:
///
/// ```rust
/// use cildiff::diff::CompareOptions;
///
/// let options = CompareOptions::new()
///     .with_ignore(|name| name.starts_with("Acme.Internal."))
///     .with_inherited_members(true);
/// assert!(options.is_ignored("Acme.Internal.Helper"));
/// ```
#[derive(Clone)]
pub struct CompareOptions {
    /// Hides matching types and members from the comparison
    pub ignore: Option<IgnorePredicate>,
    /// Full names of attribute types that never produce attribute diffs
    pub ignored_attributes: Vec<String>,
    /// Compare inherited API-visible members as part of each type
    pub include_inherited_members: bool,
    /// Locates referenced assemblies when following base types across modules
    pub resolver: Option<Arc<dyn AssemblyResolver>>,
    /// Probe results of `resolver`, shared by every comparison using these options
    pub path_cache: Arc<AssemblyPathCache>,
}

impl Default for CompareOptions {
    fn default() -> Self {
        CompareOptions {
            ignore: None,
            ignored_attributes: COMPILER_ATTRIBUTES
                .iter()
                .map(|name| (*name).to_string())
                .collect(),
            include_inherited_members: false,
            resolver: None,
            path_cache: Arc::new(AssemblyPathCache::new()),
        }
    }
}

impl fmt::Debug for CompareOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompareOptions")
            .field("ignore", &self.ignore.is_some())
            .field("ignored_attributes", &self.ignored_attributes)
            .field("include_inherited_members", &self.include_inherited_members)
            .field("resolver", &self.resolver.is_some())
            .field("path_cache", &self.path_cache.len())
            .finish()
    }
}

impl CompareOptions {
    /// Default options: nothing ignored, compiler attributes skipped, no cross-module resolution
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Hide types and members whose qualified name matches `predicate`
    #[must_use]
    pub fn with_ignore<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.ignore = Some(Arc::new(predicate));
        self
    }

    /// Replace the list of attribute types that never produce diffs
    #[must_use]
    pub fn with_ignored_attributes<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignored_attributes = attributes.into_iter().map(Into::into).collect();
        self
    }

    /// Include members inherited from base types (and base interfaces)
    #[must_use]
    pub fn with_inherited_members(mut self, include: bool) -> Self {
        self.include_inherited_members = include;
        self
    }

    /// Resolve referenced assemblies with `resolver`
    #[must_use]
    pub fn with_resolver(mut self, resolver: Arc<dyn AssemblyResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Share `cache` with other comparisons
    #[must_use]
    pub fn with_path_cache(mut self, cache: Arc<AssemblyPathCache>) -> Self {
        self.path_cache = cache;
        self
    }

    /// Returns true if the declaration named `qualified_name` is hidden
    #[must_use]
    pub fn is_ignored(&self, qualified_name: &str) -> bool {
        self.ignore
            .as_ref()
            .is_some_and(|predicate| predicate(qualified_name))
    }

    /// Returns true if attributes of type `full_name` are skipped
    #[must_use]
    pub fn is_attribute_ignored(&self, full_name: &str) -> bool {
        self.ignored_attributes.iter().any(|name| name == full_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = CompareOptions::default();
        assert!(!options.is_ignored("Acme.Widget"));
        assert!(!options.include_inherited_members);
        assert!(options
            .is_attribute_ignored("System.Runtime.CompilerServices.CompilerGeneratedAttribute"));
        assert!(!options.is_attribute_ignored("System.ObsoleteAttribute"));
    }

    #[test]
    fn builder() {
        let options = CompareOptions::new()
            .with_ignore(|name| name.ends_with(".Generated"))
            .with_ignored_attributes(["Acme.MarkerAttribute"]);

        assert!(options.is_ignored("Acme.Generated"));
        assert!(!options.is_ignored("Acme.Widget"));
        assert!(options.is_attribute_ignored("Acme.MarkerAttribute"));
        assert!(!options
            .is_attribute_ignored("System.Runtime.CompilerServices.CompilerGeneratedAttribute"));
    }
}
