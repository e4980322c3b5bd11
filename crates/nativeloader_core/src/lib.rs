//! Core native-library namespace resolution and loading.
//! This crate is the single source of truth for namespace and loader invariants.

pub mod config;
pub mod loader;
pub mod logging;
pub mod namespace;
pub mod resolve;

pub use config::public_libraries::{parse_public_libraries, read_public_library_dir};
pub use config::{LoaderConfig, NamespaceSpec};
pub use loader::backend::{BackendError, HostBackend, LibraryBackend, Mapping};
pub use loader::naming::{validate_short_name, LibraryNaming};
pub use loader::service::NativeLoader;
pub use loader::{
    LibraryHandle, LibraryRequest, LibraryState, LoadedLibrary, LoaderError, LoaderResult,
};
pub use logging::{default_log_level, init_logging, logging_status};
pub use namespace::registry::{ConfigureOutcome, NamespaceRegistry};
pub use namespace::{ConfigError, Namespace};
pub use resolve::partition::{PartitionMatch, PartitionRule, PartitionTable};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
