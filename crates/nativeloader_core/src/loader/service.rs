//! Namespace-aware load/unload entry points.
//!
//! # Responsibility
//! - Resolve the request origin to its owning namespace.
//! - Search that namespace, then its permitted links, for the library file.
//! - Delegate sharing and reference counting to the library registry.
//!
//! # Invariants
//! - Namespace search is one hop: links of linked namespaces are not followed.
//! - A file that exists but fails to initialize ends the search.

use super::backend::{BackendError, LibraryBackend};
use super::naming::{validate_short_name, LibraryNaming};
use super::registry::LibraryRegistry;
use super::{LibraryHandle, LibraryRequest, LibraryState, LoadedLibrary, LoaderError, LoaderResult};
use crate::config::LoaderConfig;
use crate::namespace::registry::{ConfigureOutcome, NamespaceRegistry};
use crate::namespace::{ConfigError, Namespace};
use crate::resolve::partition::PartitionTable;
use log::{debug, error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;

/// Resolver and loader over injected namespaces, partitions and backend.
pub struct NativeLoader {
    namespaces: RwLock<NamespaceRegistry>,
    partitions: PartitionTable,
    naming: LibraryNaming,
    backend: Arc<dyn LibraryBackend>,
    libraries: LibraryRegistry,
}

impl NativeLoader {
    /// Creates a loader with no namespaces and host file naming.
    pub fn new(partitions: PartitionTable, backend: Arc<dyn LibraryBackend>) -> Self {
        Self {
            namespaces: RwLock::new(NamespaceRegistry::new()),
            partitions,
            naming: LibraryNaming::host(),
            backend,
            libraries: LibraryRegistry::new(),
        }
    }

    /// Overrides the file naming convention.
    pub fn with_naming(mut self, naming: LibraryNaming) -> Self {
        self.naming = naming;
        self
    }

    /// Validates `config` and registers every namespace it declares.
    ///
    /// Reads public library directories referenced by the configuration.
    pub fn from_config(
        config: &LoaderConfig,
        backend: Arc<dyn LibraryBackend>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let loader = Self::new(config.partition_table()?, backend);
        for namespace in config.build_namespaces()? {
            loader.configure_namespace(namespace)?;
        }
        Ok(loader)
    }

    /// Registers or updates one namespace definition.
    ///
    /// # Errors
    /// - [`ConfigError::ConflictingRedefinition`] when `namespace_id` exists
    ///   with different search paths and a different fallback flag.
    /// - Declaration errors (bad id, relative path, self link).
    ///
    /// A public library set already registered for `namespace_id` is kept;
    /// use [`NativeLoader::configure_namespace`] to replace it.
    pub fn configure(
        &self,
        namespace_id: &str,
        search_paths: &[PathBuf],
        linked_namespaces: &[String],
        allow_fallback: bool,
    ) -> Result<ConfigureOutcome, ConfigError> {
        let mut namespace = Namespace::new(
            namespace_id,
            search_paths.iter().cloned(),
            linked_namespaces.iter().cloned(),
            allow_fallback,
        );
        let mut namespaces = self.write_namespaces();
        if let Some(existing) = namespaces.get(namespace_id) {
            namespace.public_libraries = existing.public_libraries.clone();
        }
        namespaces.configure(namespace)
    }

    /// Registers or updates a full namespace definition.
    pub fn configure_namespace(
        &self,
        namespace: Namespace,
    ) -> Result<ConfigureOutcome, ConfigError> {
        self.write_namespaces().configure(namespace)
    }

    /// Maps the request origin to its owning namespace.
    ///
    /// Deterministic; performs no I/O.
    pub fn resolve(&self, request: &LibraryRequest) -> Result<Arc<Namespace>, ConfigError> {
        let found = self.partitions.lookup(&request.origin);
        match self.read_namespaces().get(found.namespace) {
            Some(namespace) => {
                debug!(
                    "event=ns_resolve module=loader status=ok partition={} namespace={}",
                    found.partition.unwrap_or("-"),
                    namespace.id
                );
                Ok(namespace)
            }
            None => Err(ConfigError::UnknownNamespace(found.namespace.to_string())),
        }
    }

    /// Loads `request.name` into the namespace owning `request.origin`.
    ///
    /// # Errors
    /// - [`LoaderError::InvalidName`] for names that are not plain names.
    /// - [`LoaderError::NotFound`] when no permitted namespace has the file.
    /// - [`LoaderError::Load`] when the file exists but fails to initialize.
    pub fn load(&self, request: &LibraryRequest) -> LoaderResult<LoadedLibrary> {
        let started_at = Instant::now();
        validate_short_name(&request.name)?;
        let owner = self.resolve(request)?;
        let file_name = self.naming.file_name(&request.name);

        for namespace in self.search_order(&owner, &request.name) {
            for dir in &namespace.search_paths {
                let path = dir.join(&file_name);
                match self
                    .libraries
                    .acquire(&namespace.id, &path, self.backend.as_ref())
                {
                    Ok(loaded) => {
                        info!(
                            "event=lib_load module=loader status=ok library={} namespace={} owner={} path={} ref_count={} duration_ms={}",
                            request.name,
                            loaded.namespace,
                            owner.id,
                            loaded.path.display(),
                            loaded.ref_count,
                            started_at.elapsed().as_millis()
                        );
                        return Ok(loaded);
                    }
                    Err(BackendError::Missing) => continue,
                    Err(BackendError::Failed(reason)) => {
                        error!(
                            "event=lib_load module=loader status=error error_code=init_failed library={} namespace={} path={} error={}",
                            request.name,
                            namespace.id,
                            path.display(),
                            reason
                        );
                        return Err(LoaderError::Load { path, reason });
                    }
                }
            }
        }

        warn!(
            "event=lib_load module=loader status=error error_code=not_found library={} namespace={} duration_ms={}",
            request.name,
            owner.id,
            started_at.elapsed().as_millis()
        );
        Err(LoaderError::NotFound {
            library: request.name.clone(),
            namespace: owner.id.clone(),
        })
    }

    /// Drops one reference to `handle`.
    ///
    /// The OS mapping is released only when the count reaches zero.
    pub fn unload(&self, handle: LibraryHandle) -> LoaderResult<()> {
        match self.libraries.release(handle) {
            Ok(remaining) => {
                info!(
                    "event=lib_unload module=loader status=ok handle={} ref_count={} released={}",
                    handle,
                    remaining,
                    remaining == 0
                );
                Ok(())
            }
            Err(err) => {
                warn!(
                    "event=lib_unload module=loader status=error error_code=not_loaded handle={}",
                    handle
                );
                Err(err)
            }
        }
    }

    /// Loaded libraries sorted by path.
    pub fn loaded_libraries(&self) -> Vec<LoadedLibrary> {
        self.libraries.loaded()
    }

    pub fn library(&self, handle: LibraryHandle) -> Option<LoadedLibrary> {
        self.libraries.get(handle)
    }

    pub fn library_state(&self, namespace_id: &str, path: &Path) -> LibraryState {
        self.libraries.state(namespace_id, path)
    }

    pub fn namespace(&self, namespace_id: &str) -> Option<Arc<Namespace>> {
        self.read_namespaces().get(namespace_id)
    }

    /// Returns sorted namespace ids.
    pub fn namespace_ids(&self) -> Vec<String> {
        self.read_namespaces().ids()
    }

    pub fn partitions(&self) -> &PartitionTable {
        &self.partitions
    }

    pub fn naming(&self) -> LibraryNaming {
        self.naming
    }

    /// Owner first, then linked namespaces that expose `short_name` when the
    /// owner allows fallback.
    fn search_order(&self, owner: &Arc<Namespace>, short_name: &str) -> Vec<Arc<Namespace>> {
        let mut order = vec![Arc::clone(owner)];
        if !owner.allow_fallback {
            return order;
        }

        let namespaces = self.read_namespaces();
        for link in &owner.linked_namespaces {
            match namespaces.get(link) {
                Some(linked) if linked.exposes(short_name) => order.push(linked),
                Some(_) => debug!(
                    "event=ns_link module=loader status=skip namespace={} link={} library={} reason=not_public",
                    owner.id, link, short_name
                ),
                None => warn!(
                    "event=ns_link module=loader status=skip namespace={} link={} reason=unknown_namespace",
                    owner.id, link
                ),
            }
        }
        order
    }

    fn read_namespaces(&self) -> RwLockReadGuard<'_, NamespaceRegistry> {
        self.namespaces.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_namespaces(&self) -> RwLockWriteGuard<'_, NamespaceRegistry> {
        self.namespaces.write().unwrap_or_else(PoisonError::into_inner)
    }
}
