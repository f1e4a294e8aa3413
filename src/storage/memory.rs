//! In-memory record store.
//!
//! Holds records with their folder membership, applies update batches with a
//! single-slot undo and broadcasts a change after every mutation. Useful for
//! demos and tests; it also counts calls so callers can assert on them.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::domain::{Account, AccountId, AutoAdvance, Folder, Record, RecordId, RecordSet};

use super::traits::{
    Disposition, RecordStore, StoreError, StoreNotification, StoreResult, UpdateBatch, ViewSpec,
};

#[derive(Default)]
struct MemoryState {
    records: HashMap<RecordId, Record>,
    /// Prior state of every record the last undoable batch touched.
    undo_slot: Option<Vec<(RecordId, Option<Record>)>>,
    inboxes: HashMap<AccountId, Folder>,
    auto_advance: HashMap<AccountId, AutoAdvance>,
    batches: Vec<UpdateBatch>,
    synced: Vec<String>,
}

/// Record store backed by a mutex-guarded map.
pub struct InMemoryStore {
    state: Mutex<MemoryState>,
    changes: broadcast::Sender<StoreNotification>,
    fetches: AtomicUsize,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(64);
        Self {
            state: Mutex::new(MemoryState::default()),
            changes,
            fetches: AtomicUsize::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self) {
        // No receivers simply means no view is open.
        let _ = self.changes.send(StoreNotification::Changed);
    }

    /// Adds or replaces a record without touching the undo slot.
    pub fn insert(&self, record: Record) {
        self.lock().records.insert(record.id.clone(), record);
    }

    /// Adds a record and tells open views about it.
    pub fn deliver(&self, record: Record) {
        self.insert(record);
        self.notify();
    }

    pub fn set_inbox(&self, account: AccountId, folder: Folder) {
        self.lock().inboxes.insert(account, folder);
    }

    pub fn record(&self, id: &RecordId) -> Option<Record> {
        self.lock().records.get(id).cloned()
    }

    pub fn all_records(&self) -> Vec<Record> {
        let mut records: Vec<Record> = self.lock().records.values().cloned().collect();
        records.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));
        records
    }

    /// Number of fetches served so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Every batch applied so far, in order.
    pub fn batches(&self) -> Vec<UpdateBatch> {
        self.lock().batches.clone()
    }

    /// Endpoints passed to `sync_folder`, in order.
    pub fn synced_endpoints(&self) -> Vec<String> {
        self.lock().synced.clone()
    }

    pub fn saved_auto_advance(&self, account: &AccountId) -> Option<AutoAdvance> {
        self.lock().auto_advance.get(account).copied()
    }

    pub fn has_undo(&self) -> bool {
        self.lock().undo_slot.is_some()
    }
}

#[async_trait]
impl RecordStore for InMemoryStore {
    async fn fetch(&self, view: &ViewSpec) -> StoreResult<RecordSet> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        let mut records: Vec<Record> = self
            .lock()
            .records
            .values()
            .filter(|r| view.matches(r))
            .cloned()
            .collect();
        records.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));

        Ok(RecordSet::from_records(records))
    }

    async fn apply_batch(&self, batch: &UpdateBatch) -> StoreResult<()> {
        {
            let mut state = self.lock();
            let mut prior = Vec::with_capacity(batch.len());

            for update in &batch.updates {
                let Some(record) = state.records.get_mut(&update.id) else {
                    tracing::warn!(record_id = %update.id, "update for unknown record");
                    continue;
                };
                prior.push((update.id.clone(), Some(record.clone())));

                if update.apply_to(record) == Disposition::Purge {
                    state.records.remove(&update.id);
                }
            }

            if !batch.suppress_undo && !prior.is_empty() {
                state.undo_slot = Some(prior);
            }
            state.batches.push(batch.clone());
        }

        self.notify();
        Ok(())
    }

    async fn undo(&self, endpoint: &str) -> StoreResult<()> {
        {
            let mut state = self.lock();
            let prior = state.undo_slot.take().ok_or(StoreError::NothingToUndo)?;
            tracing::debug!(endpoint, count = prior.len(), "reversing last batch");

            for (id, record) in prior {
                match record {
                    Some(record) => {
                        state.records.insert(id, record);
                    }
                    None => {
                        state.records.remove(&id);
                    }
                }
            }
        }

        self.notify();
        Ok(())
    }

    async fn sync_folder(&self, endpoint: &str) -> StoreResult<()> {
        self.lock().synced.push(endpoint.to_string());
        self.notify();
        Ok(())
    }

    async fn default_inbox(&self, account: &Account) -> StoreResult<Option<Folder>> {
        Ok(self.lock().inboxes.get(&account.id).cloned())
    }

    async fn save_auto_advance(
        &self,
        account: &AccountId,
        value: AutoAdvance,
    ) -> StoreResult<()> {
        self.lock().auto_advance.insert(account.clone(), value);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreNotification> {
        self.changes.subscribe()
    }
}

impl std::fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryStore")
            .field("records", &self.lock().records.len())
            .field("fetches", &self.fetch_count())
            .finish_non_exhaustive()
    }
}
