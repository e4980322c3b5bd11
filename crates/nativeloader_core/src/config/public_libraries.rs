//! Public library declaration lists.
//!
//! A partition declares the libraries it exposes to apps in
//! `public.libraries-<company>.txt`: one file name per line, `#` comments,
//! and every name scoped to the company as `lib<name>.<company>.so`.

use crate::loader::naming::{validate_short_name, LibraryNaming};
use crate::namespace::ConfigError;
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::Path;

static PUBLIC_LIBRARY_FILE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^public\.libraries-([a-z0-9_]+)\.txt$").expect("valid list file regex")
});

/// Parses one list into short names, preserving first-seen order.
///
/// `company` enforces the `.<company>` suffix; `None` accepts any valid name.
/// Tokens after the first on a line (bitness, flags) are ignored.
pub fn parse_public_libraries(
    text: &str,
    company: Option<&str>,
) -> Result<Vec<String>, ConfigError> {
    let list = company.map_or_else(
        || "public library list".to_string(),
        |company| format!("public.libraries-{company}.txt"),
    );
    let mut names: Vec<String> = Vec::new();

    for line in text.lines() {
        let content = line.split('#').next().unwrap_or_default().trim();
        let Some(entry) = content.split_whitespace().next() else {
            continue;
        };

        let short = LibraryNaming::Elf.short_name(entry).unwrap_or(entry);
        let invalid = || ConfigError::InvalidPublicLibrary {
            list: list.clone(),
            entry: entry.to_string(),
        };
        validate_short_name(short).map_err(|_| invalid())?;
        if let Some(company) = company {
            let scoped = short
                .strip_suffix(company)
                .and_then(|stem| stem.strip_suffix('.'))
                .is_some_and(|stem| !stem.is_empty());
            if !scoped {
                return Err(invalid());
            }
        }

        if !names.iter().any(|existing| existing == short) {
            names.push(short.to_string());
        }
    }
    Ok(names)
}

/// Reads every `public.libraries-<company>.txt` in `dir`, keyed by company.
///
/// Other files are ignored.
pub fn read_public_library_dir(
    dir: impl AsRef<Path>,
) -> Result<BTreeMap<String, Vec<String>>, ConfigError> {
    let dir = dir.as_ref();
    let io_error = |path: &Path, err: std::io::Error| ConfigError::Io {
        path: path.to_path_buf(),
        message: err.to_string(),
    };

    let mut lists = BTreeMap::new();
    for entry in std::fs::read_dir(dir).map_err(|err| io_error(dir, err))? {
        let entry = entry.map_err(|err| io_error(dir, err))?;
        let file_name = entry.file_name();
        let Some(file_name) = file_name.to_str() else {
            continue;
        };
        let Some(captures) = PUBLIC_LIBRARY_FILE_RE.captures(file_name) else {
            continue;
        };
        let company = captures[1].to_string();

        let path = entry.path();
        let text = std::fs::read_to_string(&path).map_err(|err| io_error(&path, err))?;
        let names = parse_public_libraries(&text, Some(&company))?;
        debug!(
            "event=public_libraries module=config status=ok company={} count={}",
            company,
            names.len()
        );
        lists.insert(company, names);
    }
    Ok(lists)
}
