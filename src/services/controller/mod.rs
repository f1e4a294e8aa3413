//! Mailbox controller.
//!
//! Owns the session state and serializes every mutation, refresh and
//! notification through one coordination thread. Background work (fetches,
//! store commits, undo timers) reports back as `ControllerMessage`s, which the
//! owner feeds to `process_next` or `run`.

mod mutations;
mod session;

use std::collections::HashSet;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::AbortHandle;
use uuid::Uuid;

use crate::app::{ControllerEvents, ListEvent, Presenter, SessionContext, ToastEvent, ViewMode};
use crate::config::Settings;
use crate::domain::{AccountId, AutoAdvance, Folder, Record, RecordId, RecordSet};
use crate::storage::{ListCursor, LoadOutcome, RecordStore, StoreResult};

use super::actions::{ActionContext, ActionOutcome, DestructiveAction, UndoScheduler};
use super::auto_advance::{AutoAdvanceOutcome, AutoAdvanceResolver, ContinuationToken};
use super::pending::PendingDestruction;
use super::propagator::ChangePropagator;
use super::refresh::{RefreshCoordinator, RefreshLatches, RefreshPlan};
use super::selection::SelectionSet;
use super::toast::{Toast, ToastOperation};
use super::tracker::PositionTracker;

pub use mutations::MutationOutcome;

/// Results posted back to the coordination thread.
#[derive(Debug)]
pub enum ControllerMessage {
    /// A cursor fetch finished.
    ListLoaded {
        cursor: Uuid,
        generation: u64,
        result: StoreResult<RecordSet>,
    },
    /// The store reported a change under an open cursor.
    DataChanged { cursor: Uuid },
    BatchApplied(StoreResult<()>),
    UndoFinished(StoreResult<()>),
    /// The undo delay elapsed for a committed action.
    UndoAvailable(ToastOperation),
    FolderSynced(StoreResult<()>),
    InboxLoaded {
        account: AccountId,
        result: StoreResult<Option<Folder>>,
    },
    SettingsSaved(StoreResult<()>),
    /// Stops `run`.
    Shutdown,
}

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("no record list is loaded")]
    NoActiveList,

    #[error("unknown continuation token")]
    UnknownToken,

    #[error("the active account cannot undo")]
    UndoUnavailable,

    #[error("snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),
}

pub type ControllerResult<T> = Result<T, ControllerError>;

/// An operation parked behind the auto-advance prompt.
#[derive(Debug)]
enum DeferredOperation {
    Delete(Arc<DestructiveAction>),
    MarkRead {
        targets: Vec<Record>,
        read: bool,
        viewed: bool,
    },
}

/// Coordinates mutations, refreshes and undo for one mailbox session.
pub struct MailboxController {
    store: Arc<dyn RecordStore>,
    presenter: Arc<dyn Presenter>,
    events: ControllerEvents,
    propagator: ChangePropagator,
    session: SessionContext,
    cursor: Option<ListCursor>,
    selection: SelectionSet,
    tracker: PositionTracker,
    pending: PendingDestruction,
    refresh: RefreshCoordinator,
    resolver: AutoAdvanceResolver<DeferredOperation>,
    undo: UndoScheduler,
    toast: Option<Toast>,
    folder_sync: Option<AbortHandle>,
    inbox_load: Option<AbortHandle>,
    sender: UnboundedSender<ControllerMessage>,
    receiver: UnboundedReceiver<ControllerMessage>,
}

impl MailboxController {
    pub fn new(
        store: Arc<dyn RecordStore>,
        presenter: Arc<dyn Presenter>,
        settings: &Settings,
    ) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let events = ControllerEvents::new();

        Self {
            store,
            presenter,
            propagator: ChangePropagator::new(events.clone()),
            selection: SelectionSet::with_channel(events.selection.clone()),
            events,
            session: SessionContext::from_settings(settings),
            cursor: None,
            tracker: PositionTracker::new(),
            pending: PendingDestruction::default(),
            refresh: RefreshCoordinator::new(),
            resolver: AutoAdvanceResolver::new(),
            undo: UndoScheduler::new(sender.clone(), settings.behavior.undo_bar_delay()),
            toast: None,
            folder_sync: None,
            inbox_load: None,
            sender,
            receiver,
        }
    }

    pub fn events(&self) -> &ControllerEvents {
        &self.events
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn cursor(&self) -> Option<&ListCursor> {
        self.cursor.as_ref()
    }

    pub fn selected(&self) -> &SelectionSet {
        &self.selection
    }

    pub fn selection_mut(&mut self) -> &mut SelectionSet {
        &mut self.selection
    }

    pub fn current_record(&self) -> Option<&Record> {
        self.tracker.current()
    }

    pub fn toast(&self) -> Option<&Toast> {
        self.toast.as_ref()
    }

    pub fn pending_action(&self) -> Option<&Arc<DestructiveAction>> {
        self.pending.action()
    }

    /// Token of the operation waiting on the auto-advance prompt.
    pub fn awaiting_choice(&self) -> Option<ContinuationToken> {
        self.resolver.parked_token()
    }

    pub fn is_refresh_suppressed(&self) -> bool {
        self.refresh.is_suppressed()
    }

    /// Handle for posting into the controller from outside, e.g. `Shutdown`.
    pub fn sender(&self) -> UnboundedSender<ControllerMessage> {
        self.sender.clone()
    }

    /// The neighbor of the current record under `policy`.
    pub fn next_record(&self, policy: AutoAdvance) -> Option<Record> {
        let records = self.cursor.as_ref()?.records()?;
        let excluded: HashSet<_> = self
            .tracker
            .current()
            .map(|r| r.id.clone())
            .into_iter()
            .collect();
        self.tracker.next_record(policy, &excluded, records)
    }

    // =========================================================================
    // Message loop
    // =========================================================================

    /// Waits for and handles one message. Returns false on `Shutdown`.
    pub async fn process_next(&mut self) -> bool {
        match self.receiver.recv().await {
            Some(ControllerMessage::Shutdown) | None => false,
            Some(message) => {
                self.handle_message(message);
                true
            }
        }
    }

    /// Handles every message already queued, without waiting.
    pub fn process_pending(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(message) = self.receiver.try_recv() {
            if matches!(message, ControllerMessage::Shutdown) {
                tracing::debug!("ignoring shutdown outside the run loop");
                continue;
            }
            self.handle_message(message);
            handled += 1;
        }
        handled
    }

    /// Handles messages until `Shutdown`.
    pub async fn run(&mut self) {
        tracing::info!("controller loop started");
        while self.process_next().await {}
        self.commit_destructive_actions(false);
        tracing::info!("controller loop stopped");
    }

    fn handle_message(&mut self, message: ControllerMessage) {
        match message {
            ControllerMessage::ListLoaded {
                cursor,
                generation,
                result,
            } => {
                let Some(active) = self.cursor.as_mut().filter(|c| c.id() == cursor) else {
                    tracing::debug!(%cursor, "fetch result for a closed cursor");
                    return;
                };
                match active.on_loaded(generation, result) {
                    LoadOutcome::Installed => self.on_data_set_changed(),
                    LoadOutcome::Ready => self.on_refresh_ready(),
                    LoadOutcome::Stale | LoadOutcome::Failed => {}
                }
            }
            ControllerMessage::DataChanged { cursor } => {
                let Some(active) = self.cursor.as_mut().filter(|c| c.id() == cursor) else {
                    return;
                };
                active.mark_refresh_required();
                self.on_refresh_required();
            }
            ControllerMessage::BatchApplied(result) => match result {
                Ok(()) => tracing::debug!("batch committed"),
                Err(e) => tracing::error!(error = %e, "failed to commit batch"),
            },
            ControllerMessage::UndoFinished(result) => match result {
                Ok(()) => tracing::info!("undo committed"),
                Err(e) => tracing::error!(error = %e, "undo failed"),
            },
            ControllerMessage::UndoAvailable(op) => self.on_undo_available(op),
            ControllerMessage::FolderSynced(result) => {
                self.folder_sync = None;
                if let Err(e) = result {
                    tracing::error!(error = %e, "folder sync failed");
                }
            }
            ControllerMessage::InboxLoaded { account, result } => {
                self.inbox_load = None;
                self.on_inbox_loaded(account, result);
            }
            ControllerMessage::SettingsSaved(result) => {
                if let Err(e) = result {
                    tracing::error!(error = %e, "failed to save account settings");
                }
            }
            ControllerMessage::Shutdown => {}
        }
    }

    // =========================================================================
    // Refresh and animation
    // =========================================================================

    fn latches(&self) -> RefreshLatches {
        self.cursor
            .as_ref()
            .map(|c| RefreshLatches {
                required: c.is_refresh_required(),
                ready: c.is_refresh_ready(),
            })
            .unwrap_or_default()
    }

    /// The store changed under the open list.
    pub fn on_refresh_required(&mut self) {
        let plan = self.refresh.on_refresh_required(self.latches());
        self.execute(plan);
    }

    fn on_refresh_ready(&mut self) {
        let plan = self.refresh.on_refresh_ready();
        self.execute(plan);
    }

    /// The list started animating; refreshes are held until it ends.
    pub fn on_animation_start(&mut self) {
        self.refresh.start_animation();
    }

    /// The removal animation finished: commit the pending action, then catch up
    /// on any refresh held back meanwhile.
    pub fn on_animation_end(&mut self) {
        self.flush_pending();
        let plan = self.refresh.end_animation(self.latches());
        self.execute(plan);
    }

    pub fn start_drag_mode(&mut self) {
        self.refresh.start_drag();
    }

    pub fn stop_drag_mode(&mut self) {
        let plan = self.refresh.end_drag(self.latches());
        self.execute(plan);
    }

    fn execute(&mut self, plan: RefreshPlan) {
        if plan.is_empty() {
            return;
        }
        if plan.swap {
            self.swap_list();
        }
        if plan.fetch {
            if let Some(cursor) = self.cursor.as_mut() {
                cursor.refresh();
            }
        }
    }

    fn swap_list(&mut self) {
        self.flush_pending();
        let Some(cursor) = self.cursor.as_mut() else {
            return;
        };
        if cursor.sync() {
            self.on_data_set_changed();
        }
    }

    fn on_data_set_changed(&mut self) {
        let Some(records) = self.cursor.as_ref().and_then(ListCursor::records) else {
            return;
        };
        self.tracker.on_cursor_updated(records);
        self.selection.validate_against(records);
        let count = records.len();

        self.presenter.request_list_refresh();
        self.events.list.publish(&ListEvent::DataSetChanged { count });
        self.show_first_search_result();
    }

    /// In a two-pane search, the first result opens as soon as results arrive.
    fn show_first_search_result(&mut self) {
        if !self.session.is_multi_pane()
            || self.session.view_mode != ViewMode::SearchResultsList
            || self.tracker.current().is_some()
        {
            return;
        }
        let first = self
            .cursor
            .as_ref()
            .and_then(ListCursor::records)
            .and_then(|set| set.get(0))
            .cloned();
        if first.is_some() {
            self.show_record(first);
        }
    }

    // =========================================================================
    // Current record and view mode
    // =========================================================================

    /// Makes `record` current and shows it, or returns to the list on `None`.
    pub fn show_record(&mut self, record: Option<Record>) {
        let records = self.cursor.as_ref().and_then(ListCursor::records);
        self.tracker.initialize(record.clone(), records);

        let searching = self.session.search_query.is_some();
        self.session.view_mode = match (&record, searching) {
            (Some(_), false) => ViewMode::Record,
            (Some(_), true) => ViewMode::SearchResultsRecord,
            (None, false) => ViewMode::RecordList,
            (None, true) => ViewMode::SearchResultsList,
        };

        self.presenter.show_record(record.as_ref());
        self.events
            .list
            .publish(&ListEvent::CurrentRecordChanged(record.map(|r| r.id)));
    }

    /// Leaving a record mode clears the current record.
    pub fn set_view_mode(&mut self, mode: ViewMode) {
        let previous = std::mem::replace(&mut self.session.view_mode, mode);
        tracing::debug!(?previous, ?mode, "view mode changed");
        if previous.is_record_mode() && !mode.is_record_mode() && self.tracker.current().is_some() {
            let records = self.cursor.as_ref().and_then(ListCursor::records);
            self.tracker.initialize(None, records);
            self.events.list.publish(&ListEvent::CurrentRecordChanged(None));
        }
    }

    // =========================================================================
    // Toasts
    // =========================================================================

    fn on_undo_available(&mut self, op: ToastOperation) {
        tracing::debug!(kind = ?op.kind, count = op.count, "undo available");
        self.events.toast.publish(&ToastEvent::Undo(op.clone()));
        self.toast = Some(Toast::Undo(op));
    }

    pub fn dismiss_toast(&mut self) {
        if self.toast.take().is_some() {
            self.events.toast.publish(&ToastEvent::Dismissed);
        }
    }

    // =========================================================================
    // Shared plumbing
    // =========================================================================

    fn split(&mut self) -> (&mut PendingDestruction, ActionContext<'_>) {
        (
            &mut self.pending,
            ActionContext {
                session: &self.session,
                cursor: self.cursor.as_mut(),
                selection: &mut self.selection,
                presenter: self.presenter.as_ref(),
                undo: &self.undo,
            },
        )
    }

    fn flush_pending(&mut self) -> Option<ActionOutcome> {
        let (pending, mut ctx) = self.split();
        pending.flush(&mut ctx)
    }

    fn register(&mut self, action: Arc<DestructiveAction>) {
        let (pending, mut ctx) = self.split();
        if let Some(outcome) = pending.flush_and_replace(action, &mut ctx) {
            tracing::debug!(?outcome, "flushed previous pending action");
        }
    }

    fn perform(&mut self, action: &DestructiveAction) -> ActionOutcome {
        let (_, mut ctx) = self.split();
        action.perform(&mut ctx)
    }

    fn resolve_auto_advance(
        &mut self,
        target: &HashSet<RecordId>,
        park: impl FnOnce() -> DeferredOperation,
    ) -> AutoAdvanceOutcome {
        let records = self.cursor.as_ref().and_then(ListCursor::records);
        let outcome = self
            .resolver
            .resolve(target, &self.session, &self.tracker, records, park);
        if let AutoAdvanceOutcome::Deferred(token) = outcome {
            tracing::info!(%token, "waiting for auto-advance choice");
            self.presenter.show_auto_advance_prompt(token);
        }
        outcome
    }

    fn advance_to(&mut self, next: Option<Record>) {
        let unchanged = next.as_ref().map(|r| &r.id) == self.tracker.current().map(|r| &r.id);
        if !unchanged {
            self.show_record(next);
        }
    }

}

impl std::fmt::Debug for MailboxController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailboxController")
            .field("session", &self.session)
            .field("cursor", &self.cursor)
            .field("selected", &self.selection.len())
            .field("pending", &self.pending)
            .field("toast", &self.toast)
            .finish_non_exhaustive()
    }
}
