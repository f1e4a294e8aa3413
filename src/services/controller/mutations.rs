//! Destructive actions, read state, folder moves, drops and undo.

use std::collections::HashSet;
use std::sync::Arc;

use crate::app::ListEvent;
use crate::domain::{AutoAdvance, Folder, FolderCapabilities, FolderOperation, Record, RecordId};
use crate::storage::{RecordUpdate, UpdateBatch, UpdateOp};

use super::{
    ControllerError, ControllerMessage, ControllerResult, DeferredOperation, MailboxController,
};
use crate::services::actions::{ActionOutcome, DestructiveAction, FolderChange, MutationKind};
use crate::services::auto_advance::{AutoAdvanceOutcome, ContinuationToken};
use crate::services::propagator::AccountTransition;

/// What a mutation request led to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    /// The mutation was issued to the store.
    Applied,
    /// The removal animation is running; the mutation is issued when it ends.
    Animating,
    /// Waiting for the auto-advance prompt.
    Deferred(ContinuationToken),
}

fn ids_of(records: &[Record]) -> HashSet<RecordId> {
    records.iter().map(|r| r.id.clone()).collect()
}

impl MailboxController {
    /// Builds an action over the selection and makes it the pending one.
    pub fn batch_action(&mut self, kind: MutationKind) -> ControllerResult<Arc<DestructiveAction>> {
        if self.selection.is_empty() {
            return Err(ControllerError::InvalidInput("nothing selected".into()));
        }
        let action = Arc::new(DestructiveAction::new(kind, self.selection.values(), true));
        self.register(Arc::clone(&action));
        Ok(action)
    }

    /// Builds an action without registering it. It runs when passed to `delete`.
    pub fn deferred_action(
        &self,
        kind: MutationKind,
        target: Vec<Record>,
        batch: bool,
    ) -> Arc<DestructiveAction> {
        Arc::new(DestructiveAction::new(kind, target, batch))
    }

    /// Removes the action's records from view, then performs it.
    ///
    /// If the record on screen is among them, auto-advance picks what comes
    /// next first. When the presenter animates, the action waits in the pending
    /// register until `on_animation_end`.
    pub fn delete(&mut self, action: Arc<DestructiveAction>) -> ControllerResult<MutationOutcome> {
        if action.target().is_empty() {
            tracing::warn!(kind = ?action.kind(), "delete requested with no records");
            return Err(ControllerError::InvalidInput("empty target".into()));
        }

        let parked = Arc::clone(&action);
        let target = action.target_ids();
        match self.resolve_auto_advance(&target, || DeferredOperation::Delete(parked)) {
            AutoAdvanceOutcome::Deferred(token) => {
                // Parked actions must not be committed by a flush.
                if self.pending.holds(&action) {
                    self.pending.take();
                }
                return Ok(MutationOutcome::Deferred(token));
            }
            AutoAdvanceOutcome::Proceed(next) => self.advance_to(next),
        }

        let ids: Vec<RecordId> = action.target().iter().map(|r| r.id.clone()).collect();
        if self.presenter.is_visible() && self.presenter.request_delete(&ids) {
            self.refresh.start_animation();
            self.register(action);
            return Ok(MutationOutcome::Animating);
        }

        if self.pending.holds(&action) {
            self.pending.take();
        }
        match self.perform(&action) {
            ActionOutcome::Dropped => Err(ControllerError::NoActiveList),
            ActionOutcome::Performed | ActionOutcome::AlreadyPerformed => {
                Ok(MutationOutcome::Applied)
            }
        }
    }

    /// `delete` for an explicit set of records.
    pub fn destroy(
        &mut self,
        kind: MutationKind,
        target: Vec<Record>,
    ) -> ControllerResult<MutationOutcome> {
        let action = self.deferred_action(kind, target, false);
        self.delete(action)
    }

    /// `delete` for everything selected.
    pub fn destroy_selected(&mut self, kind: MutationKind) -> ControllerResult<MutationOutcome> {
        let action = self.batch_action(kind)?;
        self.delete(action)
    }

    /// Commits leave-behind items in the list and the pending action.
    pub fn commit_destructive_actions(&mut self, animate: bool) {
        self.presenter.commit_destructive_actions(animate);
        if let Some(outcome) = self.flush_pending() {
            tracing::debug!(?outcome, "committed pending action");
        }
    }

    /// Marks `targets` read or unread.
    ///
    /// Marking the record on screen unread moves off it first, through
    /// auto-advance. Read-state changes never offer undo.
    pub fn mark_records_read(
        &mut self,
        targets: Vec<Record>,
        read: bool,
        viewed: bool,
    ) -> ControllerResult<MutationOutcome> {
        if targets.is_empty() {
            return Err(ControllerError::InvalidInput("empty target".into()));
        }

        if !read {
            let ids = ids_of(&targets);
            let parked = targets.clone();
            match self.resolve_auto_advance(&ids, || DeferredOperation::MarkRead {
                targets: parked,
                read,
                viewed,
            }) {
                AutoAdvanceOutcome::Deferred(token) => return Ok(MutationOutcome::Deferred(token)),
                AutoAdvanceOutcome::Proceed(next) => self.advance_to(next),
            }
        }

        let Some(cursor) = self.cursor.as_mut().filter(|c| c.is_loaded()) else {
            tracing::error!("no loaded list, dropping read-state change");
            return Err(ControllerError::NoActiveList);
        };
        let updates = targets
            .iter()
            .map(|r| RecordUpdate::new(r.id.clone(), UpdateOp::SetRead { read, viewed }))
            .collect();
        cursor.apply(UpdateBatch::new(updates).suppressing_undo());

        tracing::info!(count = targets.len(), read, "marked records");
        self.presenter.request_list_refresh();
        Ok(MutationOutcome::Applied)
    }

    /// Applies folder operations to `target`.
    ///
    /// A change that removes the records from the open folder goes through the
    /// destructive path; any other runs at once.
    pub fn assign_folder(
        &mut self,
        ops: Vec<FolderOperation>,
        target: Vec<Record>,
        batch: bool,
        show_undo: bool,
    ) -> ControllerResult<MutationOutcome> {
        let Some(current) = self.session.folder.clone() else {
            return Err(ControllerError::InvalidInput("no open folder".into()));
        };
        if target.is_empty() || ops.is_empty() {
            return Err(ControllerError::InvalidInput("empty folder change".into()));
        }

        let kind = if ops.iter().any(|op| op.add) {
            MutationKind::ChangeFolder
        } else {
            MutationKind::RemoveFolder
        };
        let change = FolderChange::new(ops, &current, show_undo);
        self.run_folder_change(kind, change, target, batch)
    }

    fn run_folder_change(
        &mut self,
        kind: MutationKind,
        change: FolderChange,
        target: Vec<Record>,
        batch: bool,
    ) -> ControllerResult<MutationOutcome> {
        let destructive = change.destructive;
        let action = Arc::new(DestructiveAction::with_folders(kind, change, target, batch));

        if destructive {
            self.register(Arc::clone(&action));
            return self.delete(action);
        }
        match self.perform(&action) {
            ActionOutcome::Dropped => Err(ControllerError::NoActiveList),
            _ => Ok(MutationOutcome::Applied),
        }
    }

    /// Whether the selection may be dropped on `target`.
    pub fn supports_drag(&self, target: &Folder) -> bool {
        target.supports(FolderCapabilities::CAN_ACCEPT_MOVED_MESSAGES)
            && target.supports(FolderCapabilities::CAN_HOLD_MAIL)
            && self.session.folder.as_ref().map(|f| &f.id) != Some(&target.id)
    }

    /// The selection was dragged onto `target`.
    ///
    /// Onto Starred: stars the records and takes them out of the open folder.
    /// Out of Starred: only adds the target. Otherwise a move, which removes
    /// the open folder unless it is a view-all folder.
    pub fn handle_drop(&mut self, target: &Folder) -> ControllerResult<MutationOutcome> {
        if !self.supports_drag(target) {
            tracing::warn!(folder_id = %target.id, "folder does not accept drops");
            return Err(ControllerError::InvalidInput(format!(
                "cannot drop into {}",
                target.id
            )));
        }
        let Some(current) = self.session.folder.clone() else {
            return Err(ControllerError::InvalidInput("no open folder".into()));
        };
        let records = self.selection.values();
        if records.is_empty() {
            return Err(ControllerError::InvalidInput("nothing selected".into()));
        }

        if target.is_starred() {
            let change = FolderChange {
                ops: vec![FolderOperation::remove(current)],
                destructive: true,
                show_undo: true,
                star: true,
            };
            return self.run_folder_change(MutationKind::ChangeFolder, change, records, true);
        }

        let mut ops = vec![FolderOperation::add(target.clone())];
        if !current.is_starred()
            && !current.is_view_all()
            && current.supports(FolderCapabilities::CAN_ACCEPT_MOVED_MESSAGES)
        {
            ops.push(FolderOperation::remove(current));
        }
        self.assign_folder(ops, records, true, true)
    }

    /// Reverses the last committed batch.
    pub fn undo(&mut self) -> ControllerResult<()> {
        let Some(endpoint) = self
            .session
            .account
            .as_ref()
            .filter(|_| self.session.supports_undo())
            .and_then(|a| a.undo_uri.clone())
        else {
            tracing::warn!("undo requested but the account cannot undo");
            return Err(ControllerError::UndoUnavailable);
        };
        let Some(cursor) = self.cursor.as_mut() else {
            return Err(ControllerError::NoActiveList);
        };

        tracing::info!("undoing last batch");
        cursor.undo(&endpoint);
        self.dismiss_toast();
        self.events.list.publish(&ListEvent::UndoApplied);
        self.presenter.request_list_refresh();
        Ok(())
    }

    /// The user picked a policy in the auto-advance prompt.
    ///
    /// The choice is stored on the account, then the parked operation resumes.
    pub fn on_auto_advance_chosen(
        &mut self,
        token: ContinuationToken,
        choice: AutoAdvance,
    ) -> ControllerResult<MutationOutcome> {
        if !choice.is_set() {
            return Err(ControllerError::InvalidInput("no policy chosen".into()));
        }
        let Some(operation) = self.resolver.resume(token) else {
            tracing::warn!(%token, "no operation waiting on this token");
            return Err(ControllerError::UnknownToken);
        };

        self.save_auto_advance(choice);
        match operation {
            DeferredOperation::Delete(action) => self.delete(action),
            DeferredOperation::MarkRead {
                targets,
                read,
                viewed,
            } => self.mark_records_read(targets, read, viewed),
        }
    }

    /// The user dismissed the prompt. The parked operation is abandoned.
    pub fn on_auto_advance_dismissed(&mut self, token: ContinuationToken) -> ControllerResult<()> {
        if !self.resolver.dismiss(token) {
            return Err(ControllerError::UnknownToken);
        }
        tracing::info!(%token, "auto-advance prompt dismissed, operation abandoned");
        Ok(())
    }

    fn save_auto_advance(&mut self, choice: AutoAdvance) {
        let Some(account) = self.session.account.as_mut() else {
            return;
        };
        account.settings.auto_advance = choice;
        let account = account.clone();
        self.propagator
            .account_committed(AccountTransition::SettingsOnly, &account);

        let store = Arc::clone(&self.store);
        let messages = self.sender.clone();
        tokio::spawn(async move {
            let result = store.save_auto_advance(&account.id, choice).await;
            let _ = messages.send(ControllerMessage::SettingsSaved(result));
        });
    }
}
