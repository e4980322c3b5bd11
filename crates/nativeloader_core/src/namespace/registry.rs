//! In-process namespace registry.

use super::{ConfigError, Namespace};
use log::{error, info};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Result of one `configure` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigureOutcome {
    Registered,
    Updated,
    Unchanged,
}

/// Registered namespace definitions keyed by id.
///
/// Definitions are handed out as shared snapshots; an update swaps the
/// snapshot and never mutates one already handed out.
#[derive(Debug, Default)]
pub struct NamespaceRegistry {
    entries: BTreeMap<String, Arc<Namespace>>,
}

impl NamespaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers or updates one namespace definition.
    ///
    /// # Errors
    /// - Any declaration-level violation from [`Namespace::validate`].
    /// - [`ConfigError::ConflictingRedefinition`] when the id is already
    ///   registered and both the search paths and the fallback flag differ.
    pub fn configure(&mut self, namespace: Namespace) -> Result<ConfigureOutcome, ConfigError> {
        if let Err(err) = namespace.validate() {
            error!(
                "event=ns_configure module=namespace status=error namespace={} error={}",
                namespace.id, err
            );
            return Err(err);
        }

        let outcome = match self.entries.get(namespace.id.as_str()) {
            None => ConfigureOutcome::Registered,
            Some(existing) if **existing == namespace => ConfigureOutcome::Unchanged,
            Some(existing) => {
                let paths_differ = existing.search_paths != namespace.search_paths;
                let fallback_differs = existing.allow_fallback != namespace.allow_fallback;
                if paths_differ && fallback_differs {
                    error!(
                        "event=ns_configure module=namespace status=error namespace={} error_code=conflicting_redefinition",
                        namespace.id
                    );
                    return Err(ConfigError::ConflictingRedefinition(namespace.id));
                }
                ConfigureOutcome::Updated
            }
        };

        if outcome != ConfigureOutcome::Unchanged {
            info!(
                "event=ns_configure module=namespace status=ok namespace={} outcome={:?} search_paths={} links={} fallback={}",
                namespace.id,
                outcome,
                namespace.search_paths.len(),
                namespace.linked_namespaces.len(),
                namespace.allow_fallback
            );
            self.entries
                .insert(namespace.id.clone(), Arc::new(namespace));
        }
        Ok(outcome)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, namespace_id: &str) -> Option<Arc<Namespace>> {
        self.entries.get(namespace_id).cloned()
    }

    /// Returns sorted namespace ids.
    pub fn ids(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }
}
