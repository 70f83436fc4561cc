//! State registry: last commanded state of every device port.
//!
//! ```text
//!   sequencer ──set()──▶ ┌──────────────────────────┐ ──▶ states.json
//!                        │ Mutex<BTreeMap<key, st>> │
//!   telemetry ◀─snapshot─└──────────────────────────┘
//! ```
//!
//! Mutation and persistence of the whole map happen under one lock, so a
//! snapshot sees either the old or the new value of a key, and the file
//! always holds a map that existed in memory.  Entries never expire.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use log::{error, warn};
use serde::Serialize;

use crate::error::PersistenceError;
use crate::sequence::{LogicalState, Port, state_key};

/// Consecutive persistence failures after which every further failure is
/// logged at `error` level.
pub const ESCALATE_AFTER: u32 = 3;

/// Owned snapshot of the registry, sorted by key.
pub type Snapshot = BTreeMap<String, LogicalState>;

pub struct StateRegistry {
    states: Mutex<Snapshot>,
    path: Option<PathBuf>,
    failures: AtomicU32,
}

impl StateRegistry {
    /// In-memory registry with no backing file.
    pub fn in_memory() -> Self {
        Self {
            states: Mutex::new(Snapshot::new()),
            path: None,
            failures: AtomicU32::new(0),
        }
    }

    /// Registry backed by `path`.  An existing file is loaded so the
    /// registry continues from the last commanded values; a corrupt file
    /// is logged and ignored.
    pub fn open(path: &Path) -> Self {
        let states = match fs::read_to_string(path) {
            Ok(text) => serde_json::from_str(&text).unwrap_or_else(|e| {
                warn!("Registry: ignoring unreadable {}: {e}", path.display());
                Snapshot::new()
            }),
            Err(_) => Snapshot::new(),
        };
        Self {
            states: Mutex::new(states),
            path: Some(path.to_path_buf()),
            failures: AtomicU32::new(0),
        }
    }

    /// Record `state` for `device#port` and persist the whole map.
    ///
    /// The in-memory update always takes effect; a persistence failure is
    /// returned for the caller to log and never rolls the value back.
    pub fn set(&self, device: &str, port: Port, state: LogicalState) -> Result<(), PersistenceError> {
        let mut states = self.states.lock().unwrap_or_else(|p| p.into_inner());
        states.insert(state_key(device, port), state);

        let Some(path) = &self.path else {
            return Ok(());
        };
        match persist(path, &states) {
            Ok(()) => {
                self.failures.store(0, Ordering::Relaxed);
                Ok(())
            }
            Err(e) => {
                let n = self.failures.fetch_add(1, Ordering::Relaxed) + 1;
                if n >= ESCALATE_AFTER {
                    error!("Registry: {n} consecutive write failures, last: {e}");
                }
                Err(e)
            }
        }
    }

    /// Owned copy of the current map.
    pub fn snapshot(&self) -> Snapshot {
        self.states.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    pub fn get(&self, device: &str, port: Port) -> Option<LogicalState> {
        self.states
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .get(&state_key(device, port))
            .cloned()
    }

    /// Consecutive persistence failures since the last successful write.
    pub fn consecutive_failures(&self) -> u32 {
        self.failures.load(Ordering::Relaxed)
    }
}

/// Key-sorted JSON with four-space indentation, written through a temp
/// file and renamed into place.
fn persist(path: &Path, states: &Snapshot) -> Result<(), PersistenceError> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    states
        .serialize(&mut ser)
        .map_err(|e| PersistenceError::Encode(e.to_string()))?;
    write_atomic(path, &buf)
}

/// Write `data` to a sibling temp file, then rename it over `path`.
pub(crate) fn write_atomic(path: &Path, data: &[u8]) -> Result<(), PersistenceError> {
    let io_err = |source| PersistenceError::Io {
        path: path.display().to_string(),
        source,
    };
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, data).map_err(io_err)?;
    fs::rename(&tmp, path).map_err(io_err)
}
