//! Generic keyed record store with asynchronous persistence.
//!
//! A [`RecordStore`] keeps an ordered in-memory collection of records and
//! mirrors every mutation to its backing [`RecordStorage`] as detached
//! background work. Mutation methods return once the in-memory view
//! reflects the change; [`RecordStore::flush`] awaits the outstanding
//! durable writes. Uniqueness is opt-in via a caller-supplied key
//! extraction function.
//!
//! Records persist as their compact reconstruction text, so loading a
//! store re-resolves every member through the codec's
//! [`RecordBackup::rebuild`]. Entries that fail to rebuild are quarantined
//! with their raw backup retained; one corrupt record never fails a load.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock, broadcast};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::{ReconstructError, StoreError};
use crate::storage::{RecordStorage, StoredEntry};

/// Capacity of the per-store event channel.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Per-record-type codec driving persistence and reconstruction.
#[async_trait]
pub trait RecordBackup: Send + Sync + 'static {
    /// The record type this codec handles.
    type Record: Clone + Send + Sync + 'static;

    /// Stable identity used as the durable entry key.
    fn record_id(&self, record: &Self::Record) -> String;

    /// Compact reconstruction text for one record.
    fn encode(&self, record: &Self::Record, include_label: bool) -> String;

    /// Rebuild a record from its backup text, appending non-fatal notes to
    /// `diagnostics`.
    ///
    /// # Errors
    ///
    /// Structural decode failures and fatal reconstruction failures; the
    /// store quarantines the entry and keeps loading.
    async fn rebuild(
        &self,
        id: &str,
        backup: &str,
        diagnostics: &mut Vec<String>,
    ) -> Result<Self::Record, ReconstructError>;
}

/// Event published after each committed mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// A record was added or replaced.
    Saved {
        /// Identity of the record.
        id: String,
    },
    /// Several records were added in one batch.
    SavedAll {
        /// Identities of the added records.
        ids: Vec<String>,
    },
    /// A record was deleted.
    Deleted {
        /// Identity of the record.
        id: String,
    },
    /// The whole collection was cleared.
    Cleared,
}

/// A durable entry whose rebuild failed at load time.
///
/// The raw backup text is the only copy of the user's data, so it is
/// retained here and in storage; the next load retries it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuarantinedEntry {
    /// Record identity.
    pub id: String,
    /// The raw backup text, preserved untouched.
    pub backup: String,
    /// Why the rebuild failed.
    pub reason: String,
}

/// Outcome of a [`RecordStore::load`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadReport {
    /// Records rebuilt into the live set.
    pub loaded: usize,
    /// Entries kept out of the live set with their raw backup retained.
    pub quarantined: usize,
}

struct StoreState<R> {
    records: Vec<R>,
    quarantined: Vec<QuarantinedEntry>,
}

enum WriteOp {
    Put(StoredEntry),
    Delete(String),
}

type UniqueKeyFn<R> = dyn Fn(&R) -> String + Send + Sync;

/// Generic durable collection of records.
pub struct RecordStore<B: RecordBackup> {
    name: String,
    backup: B,
    storage: Arc<dyn RecordStorage>,
    unique_key: Option<Box<UniqueKeyFn<B::Record>>>,
    state: RwLock<StoreState<B::Record>>,
    /// Tail of the background write chain. Writes are enqueued while the
    /// state write lock is held and each task awaits its predecessor, so
    /// durable writes land in commit order.
    pending: Mutex<Option<JoinHandle<()>>>,
    event_tx: broadcast::Sender<StoreEvent>,
}

impl<B: RecordBackup> RecordStore<B> {
    /// Create an empty store; call [`load`](Self::load) to populate it
    /// from storage.
    pub fn new(name: impl Into<String>, storage: Arc<dyn RecordStorage>, backup: B) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            name: name.into(),
            backup,
            storage,
            unique_key: None,
            state: RwLock::new(StoreState {
                records: Vec::new(),
                quarantined: Vec::new(),
            }),
            pending: Mutex::new(None),
            event_tx,
        }
    }

    /// Enforce uniqueness by a key extracted from each record.
    #[must_use]
    pub fn with_unique_key(
        mut self,
        key: impl Fn(&B::Record) -> String + Send + Sync + 'static,
    ) -> Self {
        self.unique_key = Some(Box::new(key));
        self
    }

    /// The store's name, used in logs and diagnostics.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Load all persisted entries, rebuilding each record through the
    /// codec.
    ///
    /// Entries whose rebuild fails are quarantined and loading continues.
    /// Non-fatal diagnostics produced while rebuilding are logged rather
    /// than returned, since a load aggregates many records.
    ///
    /// # Errors
    ///
    /// Only a failure to enumerate storage fails the load itself.
    pub async fn load(&self) -> Result<LoadReport, StoreError> {
        let entries = self.storage.list_all().await?;

        let mut records = Vec::with_capacity(entries.len());
        let mut quarantined = Vec::new();
        for entry in entries {
            let mut diagnostics = Vec::new();
            match self
                .backup
                .rebuild(&entry.id, &entry.backup, &mut diagnostics)
                .await
            {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!("Quarantining entry {} in {}: {}", entry.id, self.name, e);
                    quarantined.push(QuarantinedEntry {
                        id: entry.id,
                        backup: entry.backup,
                        reason: e.to_string(),
                    });
                }
            }
            for message in diagnostics {
                warn!("{}: {}", self.name, message);
            }
        }

        let report = LoadReport {
            loaded: records.len(),
            quarantined: quarantined.len(),
        };

        let mut state = self.state.write().await;
        state.records = records;
        state.quarantined = quarantined;

        info!(
            "Loaded {} records into {} ({} quarantined)",
            report.loaded, self.name, report.quarantined
        );
        Ok(report)
    }

    /// Snapshot of the live records, in collection order.
    pub async fn get_all(&self) -> Vec<B::Record> {
        let state = self.state.read().await;
        state.records.clone()
    }

    /// First live record matching the predicate.
    pub async fn find(&self, predicate: impl Fn(&B::Record) -> bool) -> Option<B::Record> {
        let state = self.state.read().await;
        state.records.iter().find(|r| predicate(r)).cloned()
    }

    /// Run a read-only aggregate over a consistent snapshot of the live
    /// records.
    pub async fn query<T>(&self, aggregate: impl FnOnce(&[B::Record]) -> T) -> T {
        let state = self.state.read().await;
        aggregate(&state.records)
    }

    /// Entries whose rebuild failed at the last load.
    pub async fn quarantined(&self) -> Vec<QuarantinedEntry> {
        let state = self.state.read().await;
        state.quarantined.clone()
    }

    /// Insert or update one record.
    ///
    /// With a uniqueness key configured and a colliding record present,
    /// `upsert` replaces the first match in place; without `upsert` the
    /// collection is left unchanged (the add is already satisfied).
    /// Otherwise the record is appended.
    ///
    /// The in-memory view updates before this returns; the durable write
    /// runs in the background but is enqueued under the same critical
    /// section, so writes land in commit order. Returns whether the live
    /// set changed.
    pub async fn save(&self, record: B::Record, upsert: bool) -> bool {
        let id = self.backup.record_id(&record);
        let encoded = self.backup.encode(&record, true);

        let mut state = self.state.write().await;
        match self.position_by_key(&state.records, &record) {
            Some(pos) => {
                if !upsert {
                    debug!("Skipping duplicate {} in {}", id, self.name);
                    return false;
                }
                let old_id = self.backup.record_id(&state.records[pos]);
                state.records[pos] = record;
                // A replace under a key that is not the identity leaves the
                // old entry behind in storage; drop it first.
                if old_id != id {
                    self.schedule(WriteOp::Delete(old_id)).await;
                }
            }
            None => state.records.push(record),
        }
        self.schedule(WriteOp::Put(StoredEntry::new(id.clone(), encoded)))
            .await;
        drop(state);

        let _ = self.event_tx.send(StoreEvent::Saved { id });
        true
    }

    /// Batch insert, applying non-upsert [`save`](Self::save) semantics
    /// per record under a single critical section.
    ///
    /// Returns the number of records added.
    pub async fn save_all(&self, records: Vec<B::Record>) -> usize {
        let mut state = self.state.write().await;
        let mut ids = Vec::with_capacity(records.len());
        for record in records {
            if self.position_by_key(&state.records, &record).is_some() {
                debug!(
                    "Skipping duplicate {} in {}",
                    self.backup.record_id(&record),
                    self.name
                );
                continue;
            }
            let id = self.backup.record_id(&record);
            let encoded = self.backup.encode(&record, true);
            self.schedule(WriteOp::Put(StoredEntry::new(id.clone(), encoded)))
                .await;
            ids.push(id);
            state.records.push(record);
        }
        drop(state);

        if ids.is_empty() {
            return 0;
        }
        let count = ids.len();
        let _ = self.event_tx.send(StoreEvent::SavedAll { ids });
        count
    }

    /// Replace the whole collection under one critical section.
    ///
    /// The clear and the batch insert commit together; no concurrent
    /// mutation can land between them. Quarantined entries and their
    /// retained backups go with the old collection, as in
    /// [`delete_all`](Self::delete_all). Duplicate keys within `records`
    /// keep the first occurrence. Returns the size of the new collection.
    pub async fn replace_all(&self, records: Vec<B::Record>) -> usize {
        let mut state = self.state.write().await;
        let mut old_ids: Vec<String> = state
            .records
            .iter()
            .map(|r| self.backup.record_id(r))
            .collect();
        old_ids.extend(state.quarantined.iter().map(|q| q.id.clone()));
        state.records.clear();
        state.quarantined.clear();
        for id in old_ids {
            self.schedule(WriteOp::Delete(id)).await;
        }

        let mut ids = Vec::with_capacity(records.len());
        for record in records {
            if self.position_by_key(&state.records, &record).is_some() {
                debug!(
                    "Skipping duplicate {} in {}",
                    self.backup.record_id(&record),
                    self.name
                );
                continue;
            }
            let id = self.backup.record_id(&record);
            let encoded = self.backup.encode(&record, true);
            self.schedule(WriteOp::Put(StoredEntry::new(id.clone(), encoded)))
                .await;
            ids.push(id);
            state.records.push(record);
        }
        drop(state);

        let _ = self.event_tx.send(StoreEvent::Cleared);
        let count = ids.len();
        if count > 0 {
            let _ = self.event_tx.send(StoreEvent::SavedAll { ids });
        }
        info!("Replaced store {} with {} records", self.name, count);
        count
    }

    /// Delete one record by identity.
    ///
    /// Returns `false` when no live record has that identity.
    pub async fn delete(&self, id: &str) -> bool {
        let mut state = self.state.write().await;
        let pos = state
            .records
            .iter()
            .position(|r| self.backup.record_id(r) == id);
        let Some(pos) = pos else {
            drop(state);
            warn!("Cannot delete {} from {} - not found", id, self.name);
            return false;
        };
        state.records.remove(pos);
        self.schedule(WriteOp::Delete(id.to_string())).await;
        drop(state);

        let _ = self.event_tx.send(StoreEvent::Deleted { id: id.to_string() });
        true
    }

    /// Clear the collection, scheduling durable deletion of every entry.
    ///
    /// Quarantined entries are cleared too: this is the explicit
    /// everything-goes reset, so their retained backups go with it.
    /// Returns the number of live records removed.
    pub async fn delete_all(&self) -> usize {
        let mut state = self.state.write().await;
        let removed = state.records.len();
        let mut ids: Vec<String> = state
            .records
            .iter()
            .map(|r| self.backup.record_id(r))
            .collect();
        ids.extend(state.quarantined.iter().map(|q| q.id.clone()));
        state.records.clear();
        state.quarantined.clear();
        for id in ids {
            self.schedule(WriteOp::Delete(id)).await;
        }
        drop(state);

        let _ = self.event_tx.send(StoreEvent::Cleared);
        info!("Cleared store {}", self.name);
        removed
    }

    /// Compact backup text for one record.
    #[must_use]
    pub fn reconstruction_string(&self, record: &B::Record, include_label: bool) -> String {
        self.backup.encode(record, include_label)
    }

    /// Subscribe to committed-mutation events.
    ///
    /// Dropping the receiver unsubscribes it.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.event_tx.subscribe()
    }

    /// Await every pending background write and delete.
    ///
    /// Mutation calls return before their durable writes complete; call
    /// this for orderly shutdown and before asserting on storage in tests.
    pub async fn flush(&self) {
        let mut pending = self.pending.lock().await;
        if let Some(handle) = pending.as_mut() {
            let _ = handle.await;
        }
        *pending = None;
    }

    fn position_by_key(&self, records: &[B::Record], record: &B::Record) -> Option<usize> {
        let key_fn = self.unique_key.as_ref()?;
        let key = key_fn(record);
        records.iter().position(|r| key_fn(r) == key)
    }

    /// Chain a durable write behind the previous one. Callers hold the
    /// state write guard while enqueueing, so chain order matches commit
    /// order. Failures are logged, never surfaced to the caller.
    async fn schedule(&self, op: WriteOp) {
        let storage = Arc::clone(&self.storage);
        let store_name = self.name.clone();
        let mut pending = self.pending.lock().await;
        let prev = pending.take();
        let handle = tokio::spawn(async move {
            if let Some(prev) = prev {
                let _ = prev.await;
            }
            match op {
                WriteOp::Put(entry) => {
                    let id = entry.id.clone();
                    if let Err(e) = storage.put(entry).await {
                        error!("Background write of {} in {} failed: {}", id, store_name, e);
                    }
                }
                WriteOp::Delete(id) => {
                    if let Err(e) = storage.delete(&id).await {
                        error!("Background delete of {} in {} failed: {}", id, store_name, e);
                    }
                }
            }
        });
        *pending = Some(handle);
    }
}

impl<B: RecordBackup> std::fmt::Debug for RecordStore<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStore")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
