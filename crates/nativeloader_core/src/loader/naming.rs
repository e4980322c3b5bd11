//! Platform library file naming.

use super::{LoaderError, LoaderResult};
use once_cell::sync::Lazy;
use regex::Regex;

static SHORT_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_+][A-Za-z0-9_.+\-]*$").expect("valid short name regex"));

/// Shared-object naming convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LibraryNaming {
    /// `lib<name>.so`
    Elf,
    /// `lib<name>.dylib`
    MachO,
    /// `<name>.dll`
    Windows,
}

impl LibraryNaming {
    /// Convention of the platform this crate was built for.
    pub fn host() -> Self {
        if cfg!(target_os = "windows") {
            Self::Windows
        } else if cfg!(any(target_os = "macos", target_os = "ios")) {
            Self::MachO
        } else {
            Self::Elf
        }
    }

    pub fn file_name(self, short_name: &str) -> String {
        match self {
            Self::Elf => format!("lib{short_name}.so"),
            Self::MachO => format!("lib{short_name}.dylib"),
            Self::Windows => format!("{short_name}.dll"),
        }
    }

    /// Inverse of [`LibraryNaming::file_name`].
    pub fn short_name(self, file_name: &str) -> Option<&str> {
        let stripped = match self {
            Self::Elf => file_name.strip_prefix("lib")?.strip_suffix(".so"),
            Self::MachO => file_name.strip_prefix("lib")?.strip_suffix(".dylib"),
            Self::Windows => file_name.strip_suffix(".dll"),
        }?;
        (!stripped.is_empty()).then_some(stripped)
    }
}

/// Rejects names that could escape a search path or are not names at all.
pub fn validate_short_name(name: &str) -> LoaderResult<()> {
    if name.contains("..") || !SHORT_NAME_RE.is_match(name) {
        return Err(LoaderError::InvalidName(name.to_string()));
    }
    Ok(())
}
