//! Message store access and poll-cursor persistence.
//!
//! The store is read-only from the pipeline's point of view. Polling asks
//! for every row past a cursor position; the cursor itself is persisted so
//! a restart resumes where the previous run stopped instead of replaying
//! the whole store.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::StoreError;
use crate::message::StoreRow;

/// Read access to the chat client's message store.
///
/// Implementations must return rows ordered by ascending `seq` and must
/// never return a row with `seq <= since`.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// All rows strictly past the given cursor position.
    async fn poll_since(&self, since: i64) -> Result<Vec<StoreRow>, StoreError>;
}

/// Persisted poll position.
///
/// The cursor only ever moves forward. Persistence failures are logged by
/// the caller and do not lose messages; at worst a restart re-reads rows
/// the dedup window then discards.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StoreCursor {
    pub seq: i64,
}

impl StoreCursor {
    /// Load the cursor from disk, or start from zero if none is persisted.
    pub fn load_or_default(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(cursor) => cursor,
                Err(err) => {
                    debug!(path = %path.display(), error = %err, "Cursor file unreadable, starting from zero");
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    /// Advance to `seq` if it is past the current position.
    pub fn advance(&mut self, seq: i64) -> bool {
        if seq > self.seq {
            self.seq = seq;
            true
        } else {
            false
        }
    }

    /// Persist the cursor to disk.
    pub fn save(&self, path: &Path) -> marionette_core::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string(self)?;
        std::fs::write(path, raw)?;
        Ok(())
    }

    /// Conventional cursor location under the configured data directory.
    pub fn default_path(data_dir: &Path) -> PathBuf {
        data_dir.join("cursor.json")
    }
}

/// An in-process store backed by a sorted map, used by tests and by the
/// simulated wiring in the application binary.
#[derive(Default)]
pub struct InMemoryStore {
    rows: tokio::sync::Mutex<BTreeMap<i64, StoreRow>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a row, keyed by its `seq`.
    pub async fn push(&self, row: StoreRow) {
        self.rows.lock().await.insert(row.seq, row);
    }

    pub async fn len(&self) -> usize {
        self.rows.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.lock().await.is_empty()
    }
}

#[async_trait]
impl MessageStore for InMemoryStore {
    async fn poll_since(&self, since: i64) -> Result<Vec<StoreRow>, StoreError> {
        let rows = self.rows.lock().await;
        Ok(rows
            .range((since + 1)..)
            .map(|(_, row)| row.clone())
            .collect())
    }
}
