//! Injected loader configuration.
//!
//! # Responsibility
//! - Describe namespaces and the partition table as one plain structure.
//! - Parse it from JSON and validate it as a whole before any namespace is
//!   registered.
//!
//! # Invariants
//! - `validate` performs no I/O; public library directories are read only by
//!   `build_namespaces`.

use crate::namespace::{ConfigError, Namespace};
use crate::resolve::partition::{PartitionRule, PartitionTable};
use log::info;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

pub mod public_libraries;

/// Declarative form of one namespace.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NamespaceSpec {
    pub id: String,
    pub search_paths: Vec<PathBuf>,
    #[serde(default)]
    pub linked_namespaces: Vec<String>,
    #[serde(default)]
    pub allow_fallback: bool,
    /// Inline public library short names.
    #[serde(default)]
    pub public_libraries: Option<Vec<String>>,
    /// Directory holding `public.libraries-<company>.txt` files.
    #[serde(default)]
    pub public_library_dir: Option<PathBuf>,
}

impl NamespaceSpec {
    pub fn new(
        id: impl Into<String>,
        search_paths: impl IntoIterator<Item = impl Into<PathBuf>>,
    ) -> Self {
        Self {
            id: id.into(),
            search_paths: search_paths.into_iter().map(Into::into).collect(),
            linked_namespaces: vec![],
            allow_fallback: false,
            public_libraries: None,
            public_library_dir: None,
        }
    }

    pub fn linked(mut self, targets: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.linked_namespaces = targets.into_iter().map(Into::into).collect();
        self.allow_fallback = true;
        self
    }

    fn declaration(&self) -> Namespace {
        Namespace::new(
            self.id.clone(),
            self.search_paths.iter().cloned(),
            self.linked_namespaces.iter().cloned(),
            self.allow_fallback,
        )
    }
}

/// Full loader configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoaderConfig {
    /// Namespace for origins no partition rule claims.
    pub base_namespace: String,
    pub namespaces: Vec<NamespaceSpec>,
    /// Partition rules in precedence order.
    #[serde(default)]
    pub partitions: Vec<PartitionRule>,
}

impl LoaderConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(raw).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|err| ConfigError::Io {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        let config = Self::from_json_str(&raw)?;
        info!(
            "event=config_load module=config status=ok path={} namespaces={} partitions={}",
            path.display(),
            config.namespaces.len(),
            config.partitions.len()
        );
        Ok(config)
    }

    /// Checks the configuration as a whole.
    ///
    /// # Errors
    /// - Any per-namespace declaration error.
    /// - Duplicate namespace ids, or no namespaces at all.
    /// - Links, partition targets or base namespace naming unknown ids.
    /// - Empty or duplicate partition tags.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.namespaces.is_empty() {
            return Err(ConfigError::NoNamespaces);
        }

        let mut ids = BTreeSet::new();
        for spec in &self.namespaces {
            spec.declaration().validate()?;
            if !ids.insert(spec.id.as_str()) {
                return Err(ConfigError::DuplicateNamespace(spec.id.clone()));
            }
        }

        for spec in &self.namespaces {
            if let Some(target) = spec
                .linked_namespaces
                .iter()
                .find(|target| !ids.contains(target.as_str()))
            {
                return Err(ConfigError::UnknownLink {
                    namespace: spec.id.clone(),
                    target: target.clone(),
                });
            }
        }

        let table = self.partition_table()?;
        if let Some(missing) = table
            .referenced_namespaces()
            .into_iter()
            .find(|id| !ids.contains(id))
        {
            return Err(ConfigError::UnknownNamespace(missing.to_string()));
        }
        Ok(())
    }

    pub fn partition_table(&self) -> Result<PartitionTable, ConfigError> {
        PartitionTable::new(self.base_namespace.clone(), self.partitions.clone())
    }

    /// Builds namespace definitions in declaration order.
    ///
    /// Inline public libraries and those read from `public_library_dir` are
    /// merged; a namespace declaring neither exposes everything.
    pub fn build_namespaces(&self) -> Result<Vec<Namespace>, ConfigError> {
        let mut namespaces = Vec::with_capacity(self.namespaces.len());
        for spec in &self.namespaces {
            let mut namespace = spec.declaration();
            let mut public: Option<BTreeSet<String>> = spec
                .public_libraries
                .as_ref()
                .map(|names| names.iter().cloned().collect());

            if let Some(dir) = &spec.public_library_dir {
                let lists = public_libraries::read_public_library_dir(dir)?;
                public
                    .get_or_insert_with(BTreeSet::new)
                    .extend(lists.into_values().flatten());
            }

            namespace.public_libraries = public;
            namespaces.push(namespace);
        }
        Ok(namespaces)
    }
}
