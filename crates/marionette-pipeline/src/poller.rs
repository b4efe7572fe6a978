//! Polled ingestion.
//!
//! The poller wakes on a fixed interval, reads every store row past its
//! cursor, discards rows already seen inside the dedup window, classifies
//! the rest, and forwards the envelopes to the dispatch loop. The cursor
//! is persisted after every batch that moved it.

use std::collections::{HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use marionette_core::config::StoreConfig;
use marionette_core::control::PauseGate;
use marionette_core::events::DomainEvent;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::factory::MessageFactory;
use crate::message::MessageEnvelope;
use crate::store::{MessageStore, StoreCursor};

/// Fixed-capacity set of recently seen row ids.
///
/// Insertion order eviction. The window only needs to cover the overlap a
/// cursor reset or store hiccup can produce, not the whole history.
struct RecentSet {
    seen: HashSet<i64>,
    order: VecDeque<i64>,
    capacity: usize,
}

impl RecentSet {
    fn new(capacity: usize) -> Self {
        Self {
            seen: HashSet::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Record an id. Returns `false` if it was already present.
    fn insert(&mut self, id: i64) -> bool {
        if !self.seen.insert(id) {
            return false;
        }
        self.order.push_back(id);
        while self.order.len() > self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.seen.remove(&evicted);
            }
        }
        true
    }
}

/// The ingestion stage.
pub struct Poller {
    store: Arc<dyn MessageStore>,
    factory: MessageFactory,
    cursor: StoreCursor,
    cursor_path: PathBuf,
    recent: RecentSet,
    tx: mpsc::Sender<MessageEnvelope>,
    events: broadcast::Sender<DomainEvent>,
    gate: PauseGate,
    interval: Duration,
}

impl Poller {
    pub fn new(
        store: Arc<dyn MessageStore>,
        factory: MessageFactory,
        config: &StoreConfig,
        data_dir: &std::path::Path,
        tx: mpsc::Sender<MessageEnvelope>,
        events: broadcast::Sender<DomainEvent>,
        gate: PauseGate,
    ) -> Self {
        let cursor_path = StoreCursor::default_path(data_dir);
        let cursor = StoreCursor::load_or_default(&cursor_path);
        info!(seq = cursor.seq, "Poller starting from persisted cursor");
        Self {
            store,
            factory,
            cursor,
            cursor_path,
            recent: RecentSet::new(config.dedup_capacity),
            tx,
            events,
            gate,
            interval: Duration::from_millis(config.poll_interval_ms),
        }
    }

    pub fn cursor_seq(&self) -> i64 {
        self.cursor.seq
    }

    /// One poll pass. Returns the number of envelopes forwarded, or an
    /// error if the store read failed.
    pub async fn poll_once(&mut self) -> Result<usize, StoreError> {
        let rows = self.store.poll_since(self.cursor.seq).await?;
        if rows.is_empty() {
            return Ok(0);
        }

        let mut moved = false;
        let mut forwarded = 0usize;
        for row in rows {
            moved |= self.cursor.advance(row.seq);
            if !self.recent.insert(row.id) {
                debug!(row_id = row.id, "Duplicate row suppressed");
                continue;
            }

            let envelope = self.factory.classify(&row);
            let _ = self.events.send(DomainEvent::MessageIngested {
                row_id: envelope.row_id,
                kind: envelope.kind.label().to_string(),
                timestamp: envelope.timestamp,
            });
            if self.tx.send(envelope).await.is_err() {
                // Dispatch side is gone; the caller decides to stop.
                break;
            }
            forwarded += 1;
        }

        if moved {
            if let Err(err) = self.cursor.save(&self.cursor_path) {
                warn!(error = %err, "Failed to persist poll cursor");
            }
        }
        Ok(forwarded)
    }

    /// Poll forever, honoring the pause gate. Returns when the dispatch
    /// channel closes.
    pub async fn run(mut self) {
        info!(interval_ms = self.interval.as_millis() as u64, "Ingestion loop started");
        loop {
            self.gate.wait_ready().await;
            match self.poll_once().await {
                Ok(_) => {}
                Err(err) => {
                    // Transient store errors skip one cycle.
                    warn!(error = %err, "Poll cycle failed");
                }
            }
            if self.tx.is_closed() {
                info!("Dispatch channel closed, ingestion loop exiting");
                return;
            }
            tokio::time::sleep(self.interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::factory::Directory;
    use crate::message::{type_code, StoreRow};
    use crate::store::InMemoryStore;
    use marionette_core::types::{Contact, Room};

    struct EmptyDirectory;

    impl Directory for EmptyDirectory {
        fn contact(&self, _id: &str) -> Option<Contact> {
            None
        }
        fn room(&self, _id: &str) -> Option<Room> {
            None
        }
    }

    fn row(id: i64, seq: i64) -> StoreRow {
        StoreRow {
            id,
            seq,
            type_code: type_code::TEXT,
            sender_id: "u_1".to_string(),
            room_id: None,
            content: format!("msg {id}"),
            extra: None,
            created_at: 1_700_000_000,
        }
    }

    struct Harness {
        store: Arc<InMemoryStore>,
        poller: Poller,
        rx: mpsc::Receiver<MessageEnvelope>,
    }

    fn harness(dir: &std::path::Path) -> Harness {
        let store = Arc::new(InMemoryStore::new());
        let factory = MessageFactory::new(Arc::new(EmptyDirectory), "me");
        let (tx, rx) = mpsc::channel(64);
        let (events, _) = broadcast::channel(64);
        let config = StoreConfig {
            dedup_capacity: 8,
            ..StoreConfig::default()
        };
        let poller = Poller::new(
            store.clone(),
            factory,
            &config,
            dir,
            tx,
            events,
            PauseGate::new(),
        );
        Harness { store, poller, rx }
    }

    fn drain(rx: &mut mpsc::Receiver<MessageEnvelope>) -> Vec<i64> {
        let mut ids = Vec::new();
        while let Ok(envelope) = rx.try_recv() {
            ids.push(envelope.row_id);
        }
        ids
    }

    #[tokio::test]
    async fn test_overlapping_polls_emit_each_row_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut h = harness(dir.path());

        // First batch: A, B, C.
        for (id, seq) in [(1, 1), (2, 2), (3, 3)] {
            h.store.push(row(id, seq)).await;
        }
        assert_eq!(h.poller.poll_once().await.unwrap(), 3);
        assert_eq!(drain(&mut h.rx), vec![1, 2, 3]);

        // Cursor regresses so the next poll overlaps: B, C, D.
        h.poller.cursor.seq = 1;
        h.store.push(row(4, 4)).await;
        assert_eq!(h.poller.poll_once().await.unwrap(), 1);
        assert_eq!(drain(&mut h.rx), vec![4]);
    }

    #[tokio::test]
    async fn test_cursor_advances_to_max_seq() {
        let dir = tempfile::tempdir().unwrap();
        let mut h = harness(dir.path());

        h.store.push(row(1, 10)).await;
        h.store.push(row(2, 12)).await;
        h.poller.poll_once().await.unwrap();
        assert_eq!(h.poller.cursor_seq(), 12);

        // Persisted, so a fresh poller resumes past the batch.
        let h2 = harness(dir.path());
        assert_eq!(h2.poller.cursor_seq(), 12);
    }

    #[tokio::test]
    async fn test_empty_poll_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let mut h = harness(dir.path());
        assert_eq!(h.poller.poll_once().await.unwrap(), 0);
        assert!(drain(&mut h.rx).is_empty());
    }

    #[tokio::test]
    async fn test_dedup_window_evicts_oldest() {
        let mut recent = RecentSet::new(2);
        assert!(recent.insert(1));
        assert!(recent.insert(2));
        assert!(recent.insert(3));
        // 1 was evicted; only 2 and 3 are still remembered.
        assert!(recent.insert(1));
        assert!(!recent.insert(3));
    }

    #[tokio::test]
    async fn test_duplicate_ids_within_one_batch() {
        let dir = tempfile::tempdir().unwrap();
        let mut h = harness(dir.path());

        // Same row id at two store positions.
        h.store.push(row(5, 1)).await;
        h.store.push(row(5, 2)).await;
        assert_eq!(h.poller.poll_once().await.unwrap(), 1);
        assert_eq!(drain(&mut h.rx), vec![5]);
        assert_eq!(h.poller.cursor_seq(), 2);
    }
}
