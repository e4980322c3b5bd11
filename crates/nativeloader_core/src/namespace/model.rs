//! Namespace declaration and validation.

use super::ConfigError;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// One linker namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    /// Stable namespace identifier, e.g. `oem`.
    pub id: String,
    /// Directories searched in order.
    pub search_paths: Vec<PathBuf>,
    /// Namespaces visible through fallback, in link order.
    pub linked_namespaces: Vec<String>,
    /// Whether unresolved lookups may fall through to linked namespaces.
    pub allow_fallback: bool,
    /// Short names visible to namespaces that reach this one through a link.
    ///
    /// `None` exposes everything found in the search paths.
    pub public_libraries: Option<BTreeSet<String>>,
}

impl Namespace {
    pub fn new(
        id: impl Into<String>,
        search_paths: impl IntoIterator<Item = impl Into<PathBuf>>,
        linked_namespaces: impl IntoIterator<Item = impl Into<String>>,
        allow_fallback: bool,
    ) -> Self {
        Self {
            id: id.into(),
            search_paths: search_paths.into_iter().map(Into::into).collect(),
            linked_namespaces: linked_namespaces.into_iter().map(Into::into).collect(),
            allow_fallback,
            public_libraries: None,
        }
    }

    /// Restricts what linking namespaces may see to `names`.
    pub fn with_public_libraries(
        mut self,
        names: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.public_libraries = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Validates declaration-level invariants.
    ///
    /// Links are checked only for self-reference; unknown targets are a
    /// whole-configuration concern.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.id.trim().is_empty() {
            return Err(ConfigError::EmptyNamespaceId);
        }
        if !is_valid_namespace_id(&self.id) {
            return Err(ConfigError::InvalidNamespaceId(self.id.clone()));
        }
        if self.search_paths.is_empty() {
            return Err(ConfigError::EmptySearchPaths(self.id.clone()));
        }
        for path in &self.search_paths {
            if path.as_os_str().is_empty() || !path.is_absolute() {
                return Err(ConfigError::InvalidSearchPath {
                    namespace: self.id.clone(),
                    path: path.clone(),
                });
            }
        }
        if self.linked_namespaces.iter().any(|link| link == &self.id) {
            return Err(ConfigError::SelfLink(self.id.clone()));
        }
        Ok(())
    }

    /// Returns whether a linking namespace may see `short_name` here.
    pub fn exposes(&self, short_name: &str) -> bool {
        self.public_libraries
            .as_ref()
            .map_or(true, |names| names.contains(short_name))
    }

    /// Returns whether `path` sits directly inside one of the search paths.
    pub fn contains_path(&self, path: &Path) -> bool {
        path.parent()
            .is_some_and(|dir| self.search_paths.iter().any(|search| search == dir))
    }
}

/// Namespace ids are lowercase ascii, digits, `_`, `-` and `.`, starting with
/// a letter or digit.
pub fn is_valid_namespace_id(value: &str) -> bool {
    let mut chars = value.chars();
    let first = match chars.next() {
        Some(c) => c,
        None => return false,
    };
    if !(first.is_ascii_lowercase() || first.is_ascii_digit()) {
        return false;
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '-' | '.'))
}
