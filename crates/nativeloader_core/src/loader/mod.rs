//! Library lookup, loading and reference counting.
//!
//! # Responsibility
//! - Turn a `LibraryRequest` into a loaded mapping inside the right namespace.
//! - Share one mapping per (namespace, path) across callers and threads.
//!
//! # Invariants
//! - At most one live handle per resolved path per namespace.
//! - Backend calls and OS unmapping happen outside the registry lock.
//! - Errors are returned as typed results and never retried internally.

use crate::namespace::ConfigError;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub mod backend;
pub mod naming;
pub mod registry;
pub mod service;

pub type LoaderResult<T> = Result<T, LoaderError>;

/// Opaque id for one loaded library.
///
/// Ids are never reused within one loader, so a stale handle can not alias a
/// later load of the same path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LibraryHandle(u64);

impl LibraryHandle {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl Display for LibraryHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "lib#{}", self.0)
    }
}

/// One load call: what to load and who is asking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryRequest {
    /// Library short name, e.g. `foo.oem1` for `libfoo.oem1.so`.
    pub name: String,
    /// Requesting module identity: a partition tag or a module file path.
    pub origin: String,
}

impl LibraryRequest {
    pub fn new(name: impl Into<String>, origin: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            origin: origin.into(),
        }
    }
}

/// Snapshot of one registry entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedLibrary {
    pub handle: LibraryHandle,
    pub path: PathBuf,
    /// Namespace whose search path the file was found in.
    pub namespace: String,
    /// Reference count at the time the snapshot was taken.
    pub ref_count: usize,
}

/// Externally observable lifecycle of one (namespace, path) slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LibraryState {
    Unloaded,
    Loading,
    Loaded,
    /// Last reference released; the mapping is being dropped.
    Unloading,
}

/// Loader errors surfaced to callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoaderError {
    Config(ConfigError),
    InvalidName(String),
    /// No file matched in any namespace the request may search.
    NotFound {
        library: String,
        namespace: String,
    },
    /// File exists but failed to initialize.
    Load {
        path: PathBuf,
        reason: String,
    },
    NotLoaded(LibraryHandle),
}

impl Display for LoaderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{err}"),
            Self::InvalidName(name) => write!(f, "invalid library name: `{name}`"),
            Self::NotFound { library, namespace } => write!(
                f,
                "library `{library}` not found in namespace `{namespace}` or its permitted links"
            ),
            Self::Load { path, reason } => {
                write!(f, "failed to load `{}`: {reason}", path.display())
            }
            Self::NotLoaded(handle) => write!(f, "library handle is not loaded: {handle}"),
        }
    }
}

impl Error for LoaderError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::InvalidName(_)
            | Self::NotFound { .. }
            | Self::Load { .. }
            | Self::NotLoaded(_) => None,
        }
    }
}

impl From<ConfigError> for LoaderError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}
