//! Precedence-ordered partition table.

use crate::namespace::ConfigError;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// One partition-to-namespace mapping.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PartitionRule {
    /// Partition tag, e.g. `oem`. Matches origins equal to it.
    pub partition: String,
    /// Module path prefixes owned by this partition, e.g. `/oem`.
    #[serde(default)]
    pub path_prefixes: Vec<PathBuf>,
    /// Namespace that libraries requested from this partition resolve in.
    pub namespace: String,
}

impl PartitionRule {
    pub fn new(
        partition: impl Into<String>,
        path_prefixes: impl IntoIterator<Item = impl Into<PathBuf>>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            partition: partition.into(),
            path_prefixes: path_prefixes.into_iter().map(Into::into).collect(),
            namespace: namespace.into(),
        }
    }

    /// Origin equals the tag, or is a path under one of the prefixes.
    ///
    /// Prefixes match whole path components: `/oem` owns `/oem/app/x.apk`
    /// but not `/oemx/app/x.apk`.
    pub fn matches(&self, origin: &str) -> bool {
        if origin == self.partition {
            return true;
        }
        let origin = Path::new(origin);
        self.path_prefixes
            .iter()
            .any(|prefix| origin.starts_with(prefix))
    }
}

/// Which rule, if any, claimed an origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionMatch<'a> {
    pub partition: Option<&'a str>,
    pub namespace: &'a str,
}

/// Partition rules plus the namespace used when none match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionTable {
    base_namespace: String,
    rules: Vec<PartitionRule>,
}

impl PartitionTable {
    /// Builds a table after checking tags are present and unique and every
    /// path prefix is absolute.
    pub fn new(
        base_namespace: impl Into<String>,
        rules: Vec<PartitionRule>,
    ) -> Result<Self, ConfigError> {
        let base_namespace = base_namespace.into();
        if base_namespace.trim().is_empty() {
            return Err(ConfigError::EmptyNamespaceId);
        }
        let mut seen = BTreeSet::new();
        for rule in &rules {
            if rule.partition.trim().is_empty() {
                return Err(ConfigError::EmptyPartitionTag);
            }
            if !seen.insert(rule.partition.as_str()) {
                return Err(ConfigError::DuplicatePartition(rule.partition.clone()));
            }
            if let Some(prefix) = rule.path_prefixes.iter().find(|p| !p.is_absolute()) {
                return Err(ConfigError::InvalidPartitionPrefix {
                    partition: rule.partition.clone(),
                    path: prefix.clone(),
                });
            }
        }
        Ok(Self {
            base_namespace,
            rules,
        })
    }

    /// Table with no rules: every origin resolves to `base_namespace`.
    pub fn single(base_namespace: impl Into<String>) -> Result<Self, ConfigError> {
        Self::new(base_namespace, Vec::new())
    }

    pub fn base_namespace(&self) -> &str {
        &self.base_namespace
    }

    pub fn rules(&self) -> &[PartitionRule] {
        &self.rules
    }

    /// Returns the first rule matching `origin`, else the base namespace.
    pub fn lookup(&self, origin: &str) -> PartitionMatch<'_> {
        let origin = origin.trim();
        match self.rules.iter().find(|rule| rule.matches(origin)) {
            Some(rule) => PartitionMatch {
                partition: Some(rule.partition.as_str()),
                namespace: rule.namespace.as_str(),
            },
            None => PartitionMatch {
                partition: None,
                namespace: self.base_namespace.as_str(),
            },
        }
    }

    /// Every namespace id the table can yield, base included.
    pub fn referenced_namespaces(&self) -> BTreeSet<&str> {
        let mut ids: BTreeSet<&str> = self
            .rules
            .iter()
            .map(|rule| rule.namespace.as_str())
            .collect();
        ids.insert(self.base_namespace.as_str());
        ids
    }
}
