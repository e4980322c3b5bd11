//! Linker namespace definitions and registry.
//!
//! # Responsibility
//! - Define the isolated search/visibility scope used for library lookup.
//! - Validate namespace declarations before they reach the loader.
//!
//! # Invariants
//! - A registered namespace is immutable; updates replace the whole definition.
//! - Search paths are absolute and non-empty.
//! - A namespace never links to itself.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

mod model;
pub mod registry;

pub use model::{is_valid_namespace_id, Namespace};

/// Invalid or conflicting namespace setup.
///
/// Fatal at startup: callers are expected to surface these and stop rather
/// than retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    EmptyNamespaceId,
    InvalidNamespaceId(String),
    EmptySearchPaths(String),
    InvalidSearchPath {
        namespace: String,
        path: PathBuf,
    },
    SelfLink(String),
    /// Re-registration changed both search paths and the fallback flag.
    ConflictingRedefinition(String),
    DuplicateNamespace(String),
    UnknownLink {
        namespace: String,
        target: String,
    },
    UnknownNamespace(String),
    NoNamespaces,
    EmptyPartitionTag,
    DuplicatePartition(String),
    InvalidPartitionPrefix {
        partition: String,
        path: PathBuf,
    },
    InvalidPublicLibrary {
        list: String,
        entry: String,
    },
    Io {
        path: PathBuf,
        message: String,
    },
    Parse(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyNamespaceId => write!(f, "namespace id must not be empty"),
            Self::InvalidNamespaceId(value) => write!(f, "namespace id is invalid: {value}"),
            Self::EmptySearchPaths(id) => {
                write!(f, "namespace `{id}` must declare at least one search path")
            }
            Self::InvalidSearchPath { namespace, path } => write!(
                f,
                "namespace `{namespace}` has a non-absolute search path: `{}`",
                path.display()
            ),
            Self::SelfLink(id) => write!(f, "namespace `{id}` cannot link to itself"),
            Self::ConflictingRedefinition(id) => write!(
                f,
                "namespace `{id}` already registered with different search paths and fallback flag"
            ),
            Self::DuplicateNamespace(id) => write!(f, "namespace declared twice: {id}"),
            Self::UnknownLink { namespace, target } => {
                write!(f, "namespace `{namespace}` links to unknown namespace `{target}`")
            }
            Self::UnknownNamespace(id) => write!(f, "namespace not registered: {id}"),
            Self::NoNamespaces => write!(f, "configuration declares no namespaces"),
            Self::EmptyPartitionTag => write!(f, "partition tag must not be empty"),
            Self::DuplicatePartition(tag) => write!(f, "partition declared twice: {tag}"),
            Self::InvalidPartitionPrefix { partition, path } => write!(
                f,
                "partition `{partition}` has a non-absolute path prefix: `{}`",
                path.display()
            ),
            Self::InvalidPublicLibrary { list, entry } => {
                write!(f, "invalid public library `{entry}` in {list}")
            }
            Self::Io { path, message } => {
                write!(f, "failed to read `{}`: {message}", path.display())
            }
            Self::Parse(message) => write!(f, "invalid loader configuration: {message}"),
        }
    }
}

impl Error for ConfigError {}
