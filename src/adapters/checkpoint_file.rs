//! File-backed checkpoint store.
//!
//! Implements [`CheckpointPort`] over a one-line text file
//! (`step_index,elapsed_seconds`).  Saves go through a temp file and a
//! rename, so a crash mid-write leaves the previous checkpoint intact.
//! Without a configured path the store keeps nothing and always starts
//! fresh.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::app::ports::CheckpointPort;
use crate::checkpoint::Checkpoint;
use crate::error::{ConfigError, PersistenceError};
use crate::registry::write_atomic;

pub struct FileCheckpoint {
    path: Option<PathBuf>,
}

impl FileCheckpoint {
    pub fn new(path: &Path) -> Self {
        Self {
            path: Some(path.to_path_buf()),
        }
    }

    /// A store that never persists anything.
    pub fn disabled() -> Self {
        Self { path: None }
    }

    pub fn from_config(path: Option<&Path>) -> Self {
        path.map_or_else(Self::disabled, Self::new)
    }
}

impl CheckpointPort for FileCheckpoint {
    fn load(&self) -> Result<Option<Checkpoint>, ConfigError> {
        let Some(path) = &self.path else {
            return Ok(None);
        };
        match fs::read_to_string(path) {
            Ok(text) => Checkpoint::parse(&text).map(Some),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ConfigError::Unreadable {
                path: path.display().to_string(),
                reason: e.to_string(),
            }),
        }
    }

    fn save(&mut self, checkpoint: Checkpoint) -> Result<(), PersistenceError> {
        match &self.path {
            Some(path) => write_atomic(path, checkpoint.to_string().as_bytes()),
            None => Ok(()),
        }
    }
}
