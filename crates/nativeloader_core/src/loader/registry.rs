//! Shared registry of loaded libraries.
//!
//! # Invariants
//! - One slot per (namespace, path); a slot is loading, loaded or unloading.
//! - Exactly one caller (the leader) runs the backend for a loading slot;
//!   everyone else arriving meanwhile waits for the leader's outcome.
//! - Every caller that receives a successful outcome owns one reference.
//! - The backend call and mapping release run without the registry lock.
//! - A slot stays unloading until its mapping is dropped, so a path is
//!   never mapped twice at once.

use super::backend::{BackendError, LibraryBackend, Mapping};
use super::{LibraryHandle, LibraryState, LoadedLibrary, LoaderError, LoaderResult};
use log::debug;
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

type SlotKey = (String, PathBuf);
type Outcome = Result<LoadedLibrary, BackendError>;

/// Value published once to every waiter: a load outcome, or `()` when an
/// unmap finishes.
struct InFlight<T> {
    outcome: Mutex<Option<T>>,
    ready: Condvar,
}

impl<T: Clone> InFlight<T> {
    fn new() -> Self {
        Self {
            outcome: Mutex::new(None),
            ready: Condvar::new(),
        }
    }

    fn publish(&self, outcome: T) {
        let mut slot = self.outcome.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(outcome);
        self.ready.notify_all();
    }

    fn wait(&self) -> T {
        let mut slot = self.outcome.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if let Some(outcome) = slot.as_ref() {
                return outcome.clone();
            }
            slot = self
                .ready
                .wait(slot)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

struct Resident {
    handle: LibraryHandle,
    ref_count: usize,
    _mapping: Mapping,
}

impl Resident {
    fn snapshot(&self, key: &SlotKey) -> LoadedLibrary {
        LoadedLibrary {
            handle: self.handle,
            path: key.1.clone(),
            namespace: key.0.clone(),
            ref_count: self.ref_count,
        }
    }
}

enum Slot {
    Loading {
        flight: Arc<InFlight<Outcome>>,
        waiters: usize,
    },
    Loaded(Resident),
    Unloading(Arc<InFlight<()>>),
}

#[derive(Default)]
struct RegistryState {
    slots: HashMap<SlotKey, Slot>,
    handles: HashMap<LibraryHandle, SlotKey>,
    next_handle: u64,
}

/// Reference-counted registry keyed by (namespace, resolved path).
#[derive(Default)]
pub struct LibraryRegistry {
    state: Mutex<RegistryState>,
}

impl Debug for LibraryRegistry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("LibraryRegistry")
            .field("slots", &state.slots.len())
            .field("handles", &state.handles.len())
            .finish()
    }
}

impl LibraryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the resident library at `path`, loading it through `backend`
    /// if no caller has yet.
    ///
    /// A caller arriving while another is loading the same slot blocks and
    /// receives the same outcome, success or failure. A caller arriving while
    /// the slot is unloading blocks until the old mapping is gone, then loads
    /// afresh.
    pub fn acquire(
        &self,
        namespace: &str,
        path: &Path,
        backend: &dyn LibraryBackend,
    ) -> Result<LoadedLibrary, BackendError> {
        let key: SlotKey = (namespace.to_string(), path.to_path_buf());

        let mut guard = loop {
            let mut guard = self.lock();
            match guard.slots.get_mut(&key) {
                Some(Slot::Loaded(resident)) => {
                    resident.ref_count += 1;
                    return Ok(resident.snapshot(&key));
                }
                Some(Slot::Loading { flight, waiters }) => {
                    *waiters += 1;
                    let flight = Arc::clone(flight);
                    drop(guard);
                    debug!(
                        "event=lib_load module=registry status=wait namespace={} path={}",
                        namespace,
                        path.display()
                    );
                    return flight.wait();
                }
                Some(Slot::Unloading(unmapped)) => {
                    let unmapped = Arc::clone(unmapped);
                    drop(guard);
                    debug!(
                        "event=lib_load module=registry status=wait_unload namespace={} path={}",
                        namespace,
                        path.display()
                    );
                    unmapped.wait();
                    continue;
                }
                None => {}
            }
            break guard;
        };

        let flight = Arc::new(InFlight::new());
        guard.slots.insert(
            key.clone(),
            Slot::Loading {
                flight: Arc::clone(&flight),
                waiters: 0,
            },
        );
        drop(guard);

        let mut pending = PendingLoad {
            registry: self,
            key: &key,
            flight: &flight,
            finished: false,
        };
        let result = backend.load_from_path(path);
        let outcome = self.complete(&key, result);
        pending.finished = true;
        flight.publish(outcome.clone());
        outcome
    }

    /// Drops one reference; unmaps when the count reaches zero.
    ///
    /// Returns the remaining reference count.
    pub fn release(&self, handle: LibraryHandle) -> LoaderResult<usize> {
        let mut guard = self.lock();
        let state = &mut *guard;
        let Some(key) = state.handles.get(&handle).cloned() else {
            return Err(LoaderError::NotLoaded(handle));
        };

        let remaining = match state.slots.get_mut(&key) {
            Some(Slot::Loaded(resident)) if resident.handle == handle => {
                resident.ref_count -= 1;
                resident.ref_count
            }
            _ => {
                state.handles.remove(&handle);
                return Err(LoaderError::NotLoaded(handle));
            }
        };
        if remaining > 0 {
            return Ok(remaining);
        }

        state.handles.remove(&handle);
        let unmapped = Arc::new(InFlight::new());
        let released = state
            .slots
            .insert(key.clone(), Slot::Unloading(Arc::clone(&unmapped)));
        drop(guard);

        let pending = PendingUnload {
            registry: self,
            key: &key,
            unmapped: &unmapped,
        };
        drop(released);
        drop(pending);
        Ok(0)
    }

    pub fn state(&self, namespace: &str, path: &Path) -> LibraryState {
        let key: SlotKey = (namespace.to_string(), path.to_path_buf());
        match self.lock().slots.get(&key) {
            None => LibraryState::Unloaded,
            Some(Slot::Loading { .. }) => LibraryState::Loading,
            Some(Slot::Loaded(_)) => LibraryState::Loaded,
            Some(Slot::Unloading(_)) => LibraryState::Unloading,
        }
    }

    /// Loaded libraries sorted by path then namespace.
    pub fn loaded(&self) -> Vec<LoadedLibrary> {
        let state = self.lock();
        let mut libraries: Vec<LoadedLibrary> = state
            .slots
            .iter()
            .filter_map(|(key, slot)| match slot {
                Slot::Loaded(resident) => Some(resident.snapshot(key)),
                Slot::Loading { .. } | Slot::Unloading(_) => None,
            })
            .collect();
        libraries.sort_by(|a, b| (&a.path, &a.namespace).cmp(&(&b.path, &b.namespace)));
        libraries
    }

    pub fn get(&self, handle: LibraryHandle) -> Option<LoadedLibrary> {
        let state = self.lock();
        let key = state.handles.get(&handle)?;
        match state.slots.get(key)? {
            Slot::Loaded(resident) => Some(resident.snapshot(key)),
            Slot::Loading { .. } | Slot::Unloading(_) => None,
        }
    }

    fn complete(&self, key: &SlotKey, result: Result<Mapping, BackendError>) -> Outcome {
        let mut guard = self.lock();
        let state = &mut *guard;
        let waiters = match state.slots.remove(key) {
            Some(Slot::Loading { waiters, .. }) => waiters,
            _ => 0,
        };
        let mapping = result?;

        state.next_handle += 1;
        let resident = Resident {
            handle: LibraryHandle::new(state.next_handle),
            ref_count: 1 + waiters,
            _mapping: mapping,
        };
        let snapshot = resident.snapshot(key);
        state.handles.insert(resident.handle, key.clone());
        state.slots.insert(key.clone(), Slot::Loaded(resident));
        Ok(snapshot)
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Clears a loading slot if the leader unwinds out of the backend call, so
/// waiters are released with a failure instead of blocking forever.
struct PendingLoad<'a> {
    registry: &'a LibraryRegistry,
    key: &'a SlotKey,
    flight: &'a InFlight<Outcome>,
    finished: bool,
}

impl Drop for PendingLoad<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        self.registry.lock().slots.remove(self.key);
        self.flight.publish(Err(BackendError::Failed(
            "loader panicked during initialization".to_string(),
        )));
    }
}

/// Clears an unloading slot once the mapping has been dropped, even if the
/// drop unwinds, and wakes callers waiting to reload it.
struct PendingUnload<'a> {
    registry: &'a LibraryRegistry,
    key: &'a SlotKey,
    unmapped: &'a InFlight<()>,
}

impl Drop for PendingUnload<'_> {
    fn drop(&mut self) {
        self.registry.lock().slots.remove(self.key);
        self.unmapped.publish(());
    }
}
