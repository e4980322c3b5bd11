//! Dynamic-loading capability seam.
//!
//! Production binds [`LibraryBackend`] to the host loader; tests bind it to
//! fakes that simulate present, missing and broken files.

use std::any::Any;
use std::path::Path;

/// Live OS-level mapping. Dropping it releases the mapping.
pub type Mapping = Box<dyn Any + Send + Sync>;

/// Why a candidate path did not produce a mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Nothing loadable at the path; lookup moves on to the next candidate.
    Missing,
    /// File exists but failed to initialize.
    Failed(String),
}

/// Maps one shared object into the process.
pub trait LibraryBackend: Send + Sync {
    fn load_from_path(&self, path: &Path) -> Result<Mapping, BackendError>;
}

/// Host dynamic loader via `libloading`.
#[derive(Debug, Default, Clone, Copy)]
pub struct HostBackend;

impl LibraryBackend for HostBackend {
    fn load_from_path(&self, path: &Path) -> Result<Mapping, BackendError> {
        if !path.is_file() {
            return Err(BackendError::Missing);
        }
        // SAFETY: running the library's initializers is the point of this
        // call; paths only come from configured namespace search paths.
        let library = unsafe { libloading::Library::new(path) }
            .map_err(|err| BackendError::Failed(err.to_string()))?;
        Ok(Box::new(library))
    }
}
