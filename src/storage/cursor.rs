//! Live cursor over one view of the backing store.
//!
//! The cursor holds the record set currently on screen, prefetches the next one
//! in the background and applies updates optimistically before the store
//! confirms them. All results come back to the coordination thread as
//! `ControllerMessage`s.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::AbortHandle;
use uuid::Uuid;

use crate::domain::{Record, RecordId, RecordSet};
use crate::services::ControllerMessage;

use super::traits::{RecordStore, StoreResult, UpdateBatch, ViewSpec};

/// What a finished fetch did to the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The result belonged to a cancelled or superseded fetch.
    Stale,
    /// First load; the record set was installed directly.
    Installed,
    /// New data is waiting to be swapped in with `sync`.
    Ready,
    /// The fetch failed; nothing changed.
    Failed,
}

/// Client side of one open view.
pub struct ListCursor {
    id: Uuid,
    store: Arc<dyn RecordStore>,
    view: ViewSpec,
    current: Option<RecordSet>,
    prefetched: Option<RecordSet>,
    local_removals: HashSet<RecordId>,
    /// Records hidden by the last batch the store can reverse.
    undoable_removals: HashSet<RecordId>,
    refresh_required: bool,
    generation: u64,
    refresh_task: Option<AbortHandle>,
    watcher: Option<AbortHandle>,
    messages: UnboundedSender<ControllerMessage>,
}

impl ListCursor {
    /// Opens `view`, starts watching the store and issues the first fetch.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn open(
        store: Arc<dyn RecordStore>,
        view: ViewSpec,
        messages: UnboundedSender<ControllerMessage>,
    ) -> Self {
        let id = Uuid::new_v4();
        let watcher = Self::watch(store.as_ref(), id, messages.clone());

        let mut cursor = Self {
            id,
            store,
            view,
            current: None,
            prefetched: None,
            local_removals: HashSet::new(),
            undoable_removals: HashSet::new(),
            refresh_required: false,
            generation: 0,
            refresh_task: None,
            watcher: Some(watcher),
            messages,
        };
        cursor.refresh();
        cursor
    }

    fn watch(
        store: &dyn RecordStore,
        cursor: Uuid,
        messages: UnboundedSender<ControllerMessage>,
    ) -> AbortHandle {
        let mut changes = store.subscribe();

        tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(_) | Err(RecvError::Lagged(_)) => {
                        if messages.send(ControllerMessage::DataChanged { cursor }).is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
        .abort_handle()
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn view(&self) -> &ViewSpec {
        &self.view
    }

    /// The record set on screen, once the first fetch has landed.
    pub fn records(&self) -> Option<&RecordSet> {
        self.current.as_ref()
    }

    pub fn record(&self, id: &RecordId) -> Option<&Record> {
        self.current.as_ref().and_then(|set| set.record(id))
    }

    pub fn is_loaded(&self) -> bool {
        self.current.is_some()
    }

    /// The store changed and no fetch has been issued for it yet.
    pub fn is_refresh_required(&self) -> bool {
        self.refresh_required
    }

    /// A fetched record set is waiting to be swapped in.
    pub fn is_refresh_ready(&self) -> bool {
        self.prefetched.is_some()
    }

    pub fn is_fetching(&self) -> bool {
        self.refresh_task.is_some()
    }

    pub fn mark_refresh_required(&mut self) {
        self.refresh_required = true;
    }

    /// Fetches the view again, cancelling any fetch still in flight.
    pub fn refresh(&mut self) {
        if let Some(task) = self.refresh_task.take() {
            tracing::debug!(cursor = %self.id, "replacing in-flight fetch");
            task.abort();
        }

        self.generation += 1;
        self.refresh_required = false;

        let generation = self.generation;
        let cursor = self.id;
        let store = Arc::clone(&self.store);
        let view = self.view.clone();
        let messages = self.messages.clone();

        let task = tokio::spawn(async move {
            let result = store.fetch(&view).await;
            let _ = messages.send(ControllerMessage::ListLoaded {
                cursor,
                generation,
                result,
            });
        });
        self.refresh_task = Some(task.abort_handle());
    }

    /// Records the result of a fetch issued by `refresh`.
    pub fn on_loaded(&mut self, generation: u64, result: StoreResult<RecordSet>) -> LoadOutcome {
        if generation != self.generation {
            return LoadOutcome::Stale;
        }
        self.refresh_task = None;

        let set = match result {
            Ok(set) => set,
            Err(e) => {
                tracing::error!(cursor = %self.id, error = %e, "fetch failed");
                return LoadOutcome::Failed;
            }
        };

        if self.current.is_none() {
            self.install(set);
            LoadOutcome::Installed
        } else {
            self.prefetched = Some(set);
            LoadOutcome::Ready
        }
    }

    /// Swaps the prefetched record set in. Returns false when none was waiting.
    pub fn sync(&mut self) -> bool {
        match self.prefetched.take() {
            Some(set) => {
                self.install(set);
                true
            }
            None => false,
        }
    }

    fn install(&mut self, mut set: RecordSet) {
        self.local_removals.retain(|id| set.contains(id));
        for record in set.iter_mut() {
            record.pending_local_removal = self.local_removals.contains(&record.id);
        }
        self.current = Some(set);
    }

    /// Applies `batch` locally, then commits it to the store in the background.
    pub fn apply(&mut self, batch: UpdateBatch) {
        if let Some(set) = self.current.as_mut() {
            for update in &batch.updates {
                let Some(record) = set.record_mut(&update.id) else {
                    continue;
                };
                update.apply_to(record);
                if update.local_removal {
                    record.pending_local_removal = true;
                    self.local_removals.insert(update.id.clone());
                }
            }
        }
        if !batch.suppress_undo && !batch.is_empty() {
            self.undoable_removals = batch
                .updates
                .iter()
                .filter(|u| u.local_removal)
                .map(|u| u.id.clone())
                .collect();
        }

        let store = Arc::clone(&self.store);
        let messages = self.messages.clone();
        tokio::spawn(async move {
            let result = store.apply_batch(&batch).await;
            let _ = messages.send(ControllerMessage::BatchApplied(result));
        });
    }

    /// Asks the store to reverse its last batch and shows the records it hid.
    pub fn undo(&mut self, endpoint: &str) {
        for id in self.undoable_removals.drain() {
            self.local_removals.remove(&id);
            if let Some(record) = self.current.as_mut().and_then(|set| set.record_mut(&id)) {
                record.pending_local_removal = false;
            }
        }

        let store = Arc::clone(&self.store);
        let messages = self.messages.clone();
        let endpoint = endpoint.to_string();
        tokio::spawn(async move {
            let result = store.undo(&endpoint).await;
            let _ = messages.send(ControllerMessage::UndoFinished(result));
        });
    }
}

impl Drop for ListCursor {
    fn drop(&mut self) {
        if let Some(task) = self.refresh_task.take() {
            task.abort();
        }
        if let Some(watcher) = self.watcher.take() {
            watcher.abort();
        }
    }
}

impl std::fmt::Debug for ListCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListCursor")
            .field("id", &self.id)
            .field("view", &self.view)
            .field("loaded", &self.is_loaded())
            .field("refresh_required", &self.refresh_required)
            .field("refresh_ready", &self.is_refresh_ready())
            .finish_non_exhaustive()
    }
}
