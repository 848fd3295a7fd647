//! Resumable crawl state: processed keys plus completed groups, kept in a
//! JSON file next to the outputs.

use std::collections::BTreeSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::StoreError;
use crate::atomic::write_atomic;

/// Group name used when a listing is not split by year.
pub const ALL_GROUP: &str = "all";

/// Progress key for sites enumerated by `(year, number)`.
pub fn year_number_key(year: i32, number: u32) -> String {
    format!("{year}_{number}")
}

/// On-disk shape of `progress.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressState {
    #[serde(default)]
    pub done_keys: BTreeSet<String>,
    #[serde(default)]
    pub done_groups: BTreeSet<String>,
}

/// Progress state bound to its file.
///
/// Mutations only touch memory; call [`save`](Self::save) to persist.
#[derive(Debug)]
pub struct ProgressStore {
    path: PathBuf,
    state: ProgressState,
    dirty: bool,
}

impl ProgressStore {
    /// Load progress from `path`. A missing file starts empty; an unparsable
    /// one is an error rather than a silent restart.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let state = match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text).map_err(|source| {
                StoreError::CorruptProgress {
                    path: path.clone(),
                    source,
                }
            })?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => ProgressState::default(),
            Err(e) => return Err(e.into()),
        };
        info!(
            path = %path.display(),
            keys = state.done_keys.len(),
            groups = state.done_groups.len(),
            "loaded progress"
        );
        Ok(Self {
            path,
            state,
            dirty: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> &ProgressState {
        &self.state
    }

    pub fn contains(&self, key: &str) -> bool {
        self.state.done_keys.contains(key)
    }

    /// Record `key` as processed. Returns false if it already was.
    pub fn mark_done(&mut self, key: impl Into<String>) -> bool {
        let inserted = self.state.done_keys.insert(key.into());
        self.dirty |= inserted;
        inserted
    }

    pub fn is_group_done(&self, group: &str) -> bool {
        self.state.done_groups.contains(group)
    }

    pub fn mark_group_done(&mut self, group: impl Into<String>) {
        self.dirty |= self.state.done_groups.insert(group.into());
    }

    pub fn len(&self) -> usize {
        self.state.done_keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.done_keys.is_empty()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Persist atomically. No-op when nothing changed since the last save.
    pub fn save(&mut self) -> Result<(), StoreError> {
        if !self.dirty {
            return Ok(());
        }
        let json = serde_json::to_vec_pretty(&self.state)?;
        write_atomic(&self.path, |f| {
            f.write_all(&json)?;
            Ok(())
        })?;
        self.dirty = false;
        debug!(path = %self.path.display(), keys = self.state.done_keys.len(), "saved progress");
        Ok(())
    }
}
