//! JSON-file state store for the mock agent.
//!
//! The whole document is re-read on every load and fully rewritten on every
//! save; nothing is cached between calls.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Errors from state store operations.
#[derive(Debug, Error)]
pub enum StateStoreError {
    #[error("state file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("state file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("node index space exhausted, cannot assign an index to {server_uuid}")]
    IndexExhausted { server_uuid: String },
}

/// Persisted agent state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeState {
    /// Server UUID to assigned node index.
    #[serde(default)]
    pub cn_indexes: BTreeMap<String, u32>,
}

/// Result of looking up or assigning a node index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeIndexAssignment {
    /// The node's index.
    pub index: u32,
    /// True if the index was assigned by this call.
    pub fresh: bool,
}

impl NodeState {
    /// The index already assigned to `server_uuid`, if any.
    pub fn index_of(&self, server_uuid: &str) -> Option<u32> {
        self.cn_indexes.get(server_uuid).copied()
    }

    /// One past the highest assigned index (0 when nothing is assigned).
    ///
    /// Indices are map values, so this scans every assignment. `None` once
    /// `u32::MAX` is taken.
    pub fn next_index(&self) -> Option<u32> {
        match self.cn_indexes.values().max() {
            Some(max) => max.checked_add(1),
            None => Some(0),
        }
    }

    /// Look up `server_uuid`, assigning the next index if it has none.
    pub fn assign(&mut self, server_uuid: &str) -> Result<NodeIndexAssignment, StateStoreError> {
        if let Some(index) = self.index_of(server_uuid) {
            return Ok(NodeIndexAssignment {
                index,
                fresh: false,
            });
        }

        let index = self
            .next_index()
            .ok_or_else(|| StateStoreError::IndexExhausted {
                server_uuid: server_uuid.to_string(),
            })?;
        self.cn_indexes.insert(server_uuid.to_string(), index);
        Ok(NodeIndexAssignment { index, fresh: true })
    }
}

/// JSON state store.
pub struct StateStore {
    path: PathBuf,

    /// Serializes index assignment (load → modify → save).
    index_lock: Mutex<()>,
}

impl StateStore {
    /// Create a store backed by the file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            index_lock: Mutex::new(()),
        }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the state document; a missing file yields empty state.
    pub async fn load(&self) -> Result<NodeState, StateStoreError> {
        let data = match tokio::fs::read(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "State file does not exist, starting empty");
                return Ok(NodeState::default());
            }
            Err(source) => {
                return Err(StateStoreError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        serde_json::from_slice(&data).map_err(|source| StateStoreError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    /// Overwrite the state document.
    ///
    /// Writes a sibling temp file and renames it over the target, so a
    /// failed write never leaves a truncated document behind.
    pub async fn save(&self, state: &NodeState) -> Result<(), StateStoreError> {
        let data =
            serde_json::to_vec_pretty(state).map_err(|source| StateStoreError::Corrupt {
                path: self.path.clone(),
                source,
            })?;

        let tmp = self.path.with_extension("json.tmp");
        let io_err = |source| StateStoreError::Io {
            path: self.path.clone(),
            source,
        };
        tokio::fs::write(&tmp, &data).await.map_err(io_err)?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(io_err)?;
        Ok(())
    }

    /// Return the index for `server_uuid`, assigning and persisting a new
    /// one if needed.
    ///
    /// Concurrent callers are serialized so no assignment is lost.
    pub async fn assign_index(
        &self,
        server_uuid: &str,
    ) -> Result<NodeIndexAssignment, StateStoreError> {
        let _guard = self.index_lock.lock().await;

        let mut state = self.load().await?;
        let assignment = state.assign(server_uuid)?;

        if assignment.fresh {
            self.save(&state).await?;
            info!(
                server_uuid = %server_uuid,
                index = assignment.index,
                "Assigned node index"
            );
        }

        Ok(assignment)
    }
}
