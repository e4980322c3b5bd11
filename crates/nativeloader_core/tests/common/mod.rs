//! Shared fixtures for loader integration tests.
#![allow(dead_code)]

use nativeloader_core::{
    BackendError, LibraryBackend, LibraryNaming, Mapping, NativeLoader, PartitionRule,
    PartitionTable,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// What the fake finds at one path.
#[derive(Debug, Clone)]
pub enum FakeFile {
    Present,
    Broken(String),
}

/// In-memory stand-in for the host loader.
#[derive(Default)]
pub struct FakeBackend {
    files: Mutex<HashMap<PathBuf, FakeFile>>,
    calls: Mutex<HashMap<PathBuf, usize>>,
    live_mappings: Arc<AtomicUsize>,
    peak_mappings: AtomicUsize,
    delay: Option<Duration>,
    unmap_delay: Option<Duration>,
}

struct FakeMapping {
    live: Arc<AtomicUsize>,
    unmap_delay: Option<Duration>,
}

impl Drop for FakeMapping {
    fn drop(&mut self) {
        if let Some(delay) = self.unmap_delay {
            std::thread::sleep(delay);
        }
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Holds each backend call open for `delay` to widen race windows.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Holds each mapping drop open for `delay`.
    pub fn with_unmap_delay(mut self, delay: Duration) -> Self {
        self.unmap_delay = Some(delay);
        self
    }

    pub fn with_file(self, path: impl Into<PathBuf>) -> Self {
        self.files
            .lock()
            .unwrap()
            .insert(path.into(), FakeFile::Present);
        self
    }

    pub fn with_broken_file(self, path: impl Into<PathBuf>, reason: &str) -> Self {
        self.files
            .lock()
            .unwrap()
            .insert(path.into(), FakeFile::Broken(reason.to_string()));
        self
    }

    /// Backend calls made for `path`, hits and misses alike.
    pub fn calls_for(&self, path: impl AsRef<Path>) -> usize {
        self.calls
            .lock()
            .unwrap()
            .get(path.as_ref())
            .copied()
            .unwrap_or(0)
    }

    pub fn live_mappings(&self) -> usize {
        self.live_mappings.load(Ordering::SeqCst)
    }

    /// Most mappings ever alive at once.
    pub fn peak_mappings(&self) -> usize {
        self.peak_mappings.load(Ordering::SeqCst)
    }
}

impl LibraryBackend for FakeBackend {
    fn load_from_path(&self, path: &Path) -> Result<Mapping, BackendError> {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(path.to_path_buf())
            .or_insert(0) += 1;
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }

        let file = self.files.lock().unwrap().get(path).cloned();
        match file {
            None => Err(BackendError::Missing),
            Some(FakeFile::Broken(reason)) => Err(BackendError::Failed(reason)),
            Some(FakeFile::Present) => {
                let live = self.live_mappings.fetch_add(1, Ordering::SeqCst) + 1;
                self.peak_mappings.fetch_max(live, Ordering::SeqCst);
                Ok(Box::new(FakeMapping {
                    live: Arc::clone(&self.live_mappings),
                    unmap_delay: self.unmap_delay,
                }))
            }
        }
    }
}

pub const OEM_LIB: &str = "/oem/lib";
pub const PRODUCT_LIB: &str = "/product/lib";
pub const SYSTEM_LIB: &str = "/system/lib";

/// Backend holding the oem1, oem2 and product1 public libraries.
pub fn partition_backend() -> FakeBackend {
    FakeBackend::new()
        .with_file("/oem/lib/libfoo.oem1.so")
        .with_file("/oem/lib/libbar.oem1.so")
        .with_file("/oem/lib/libfoo.oem2.so")
        .with_file("/oem/lib/libbar.oem2.so")
        .with_file("/product/lib/libfoo.product1.so")
        .with_file("/product/lib/libbar.product1.so")
        .with_file("/system/lib/libc.so")
}

/// oem, product and system partitions with ELF naming and no namespaces.
pub fn partition_loader(backend: Arc<FakeBackend>) -> NativeLoader {
    let partitions = PartitionTable::new(
        "system",
        vec![
            PartitionRule::new("oem", ["/oem"], "oem"),
            PartitionRule::new("product", ["/product", "/system/product"], "product"),
        ],
    )
    .unwrap();
    NativeLoader::new(partitions, backend).with_naming(LibraryNaming::Elf)
}
