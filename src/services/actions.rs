//! Destructive actions.
//!
//! A `DestructiveAction` is a one-shot mutation of a fixed set of records. It
//! runs its effect at most once no matter how many times it is performed,
//! which lets the pending-action register flush it early while the view still
//! holds a handle to it.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;

use crate::app::{Presenter, SessionContext};
use crate::domain::{Folder, FolderCapabilities, FolderOperation, Priority, Record, RecordId};
use crate::storage::{ListCursor, RecordUpdate, UpdateBatch, UpdateOp};

use super::controller::ControllerMessage;
use super::selection::SelectionSet;
use super::toast::ToastOperation;

/// Every mutation a destructive action can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    Archive,
    Delete,
    Mute,
    ReportSpam,
    ReportNotSpam,
    ReportPhishing,
    RemoveStar,
    MarkNotImportant,
    DiscardDrafts,
    ChangeFolder,
    RemoveFolder,
}

impl MutationKind {
    /// Whether this mutation takes records out of `folder`.
    ///
    /// Folder reassignments are decided when the action is built, from the
    /// operations it carries; this returns false for them.
    pub fn is_destructive_in(self, folder: &Folder) -> bool {
        match self {
            Self::Archive | Self::Delete | Self::ReportSpam | Self::ReportNotSpam => true,
            Self::Mute => folder.supports(FolderCapabilities::DESTRUCTIVE_MUTE),
            Self::ReportPhishing => false,
            Self::RemoveStar => folder.is_starred(),
            Self::MarkNotImportant => folder.is_important_only(),
            Self::DiscardDrafts => folder.is_drafts(),
            Self::ChangeFolder | Self::RemoveFolder => false,
        }
    }

    /// Whether the store may reverse this mutation when performed in `folder`.
    pub fn is_undoable_in(self, folder: &Folder) -> bool {
        match self {
            Self::Delete => !folder.supports(FolderCapabilities::DELETE_ACTION_FINAL),
            Self::DiscardDrafts => false,
            _ => true,
        }
    }

    pub fn is_folder_change(self) -> bool {
        matches!(self, Self::ChangeFolder | Self::RemoveFolder)
    }

    fn update_ops(self) -> Vec<UpdateOp> {
        match self {
            Self::Archive => vec![UpdateOp::Archive],
            Self::Delete => vec![UpdateOp::Delete],
            Self::Mute => vec![UpdateOp::Mute],
            Self::ReportSpam => vec![UpdateOp::ReportSpam],
            Self::ReportNotSpam => vec![UpdateOp::ReportNotSpam],
            Self::ReportPhishing => vec![UpdateOp::ReportPhishing],
            Self::RemoveStar => vec![UpdateOp::SetStarred(false)],
            Self::MarkNotImportant => vec![UpdateOp::SetPriority(Priority::Low)],
            Self::DiscardDrafts => vec![UpdateOp::DiscardDrafts],
            Self::ChangeFolder | Self::RemoveFolder => Vec::new(),
        }
    }
}

/// Folder reassignment carried by a `ChangeFolder` or `RemoveFolder` action.
#[derive(Debug, Clone, PartialEq)]
pub struct FolderChange {
    pub ops: Vec<FolderOperation>,
    /// The records leave the current view.
    pub destructive: bool,
    /// Offer undo once the change is committed.
    pub show_undo: bool,
    /// Also star the records (a drop onto the starred folder).
    pub star: bool,
}

impl FolderChange {
    /// Builds a change, deciding destructiveness against the current folder.
    pub fn new(ops: Vec<FolderOperation>, current: &Folder, show_undo: bool) -> Self {
        let destructive = current.supports(FolderCapabilities::CAN_ACCEPT_MOVED_MESSAGES)
            && FolderOperation::removes(&ops, &current.id);
        Self {
            ops,
            destructive,
            show_undo,
            star: false,
        }
    }

    fn update_ops(&self) -> Vec<UpdateOp> {
        let (add, remove): (Vec<_>, Vec<_>) = self.ops.iter().partition(|op| op.add);
        let mut ops = vec![UpdateOp::ChangeFolders {
            add: add.into_iter().map(|op| op.folder.id.clone()).collect(),
            remove: remove.into_iter().map(|op| op.folder.id.clone()).collect(),
        }];
        if self.star {
            ops.push(UpdateOp::SetStarred(true));
        }
        ops
    }
}

/// What a call to `perform` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The mutation was issued.
    Performed,
    /// An earlier call already issued it.
    AlreadyPerformed,
    /// There was no loaded list to act on; the action is spent.
    Dropped,
}

/// Posts undo descriptors to the coordination thread after a delay.
#[derive(Debug, Clone)]
pub struct UndoScheduler {
    messages: UnboundedSender<ControllerMessage>,
    delay: Duration,
}

impl UndoScheduler {
    pub fn new(messages: UnboundedSender<ControllerMessage>, delay: Duration) -> Self {
        Self { messages, delay }
    }

    /// Delivers `op` once the delay elapses. The timer is never cancelled.
    pub fn schedule(&self, op: ToastOperation) {
        let messages = self.messages.clone();
        let delay = self.delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = messages.send(ControllerMessage::UndoAvailable(op));
        });
    }
}

/// Everything an action touches while it runs.
pub struct ActionContext<'a> {
    pub session: &'a SessionContext,
    pub cursor: Option<&'a mut ListCursor>,
    pub selection: &'a mut SelectionSet,
    pub presenter: &'a dyn Presenter,
    pub undo: &'a UndoScheduler,
}

/// One-shot mutation of an immutable snapshot of records.
#[derive(Debug)]
pub struct DestructiveAction {
    kind: MutationKind,
    target: Arc<[Record]>,
    batch: bool,
    folder_change: Option<FolderChange>,
    completed: AtomicBool,
}

impl DestructiveAction {
    pub fn new(kind: MutationKind, target: Vec<Record>, batch: bool) -> Self {
        Self {
            kind,
            target: target.into(),
            batch,
            folder_change: None,
            completed: AtomicBool::new(false),
        }
    }

    /// An action that reassigns folders.
    pub fn with_folders(
        kind: MutationKind,
        change: FolderChange,
        target: Vec<Record>,
        batch: bool,
    ) -> Self {
        Self {
            folder_change: Some(change),
            ..Self::new(kind, target, batch)
        }
    }

    pub fn kind(&self) -> MutationKind {
        self.kind
    }

    pub fn target(&self) -> &[Record] {
        &self.target
    }

    pub fn target_ids(&self) -> HashSet<RecordId> {
        self.target.iter().map(|r| r.id.clone()).collect()
    }

    pub fn is_batch(&self) -> bool {
        self.batch
    }

    pub fn folder_change(&self) -> Option<&FolderChange> {
        self.folder_change.as_ref()
    }

    pub fn is_completed(&self) -> bool {
        self.completed.load(Ordering::Acquire)
    }

    pub fn is_destructive_in(&self, folder: &Folder) -> bool {
        match &self.folder_change {
            Some(change) => change.destructive,
            None => self.kind.is_destructive_in(folder),
        }
    }

    pub fn is_undoable_in(&self, folder: &Folder) -> bool {
        let eligible = self.kind.is_undoable_in(folder);
        match &self.folder_change {
            Some(change) => eligible && change.destructive && change.show_undo,
            None => eligible,
        }
    }

    fn update_ops(&self) -> Vec<UpdateOp> {
        match &self.folder_change {
            Some(change) => change.update_ops(),
            None => self.kind.update_ops(),
        }
    }

    /// Issues the mutation, schedules undo and refreshes the list.
    ///
    /// Only the first call has an effect.
    pub fn perform(&self, ctx: &mut ActionContext<'_>) -> ActionOutcome {
        if self.completed.swap(true, Ordering::AcqRel) {
            return ActionOutcome::AlreadyPerformed;
        }

        let Some(folder) = ctx.session.folder.as_ref() else {
            tracing::error!(kind = ?self.kind, "no open folder, dropping action");
            return ActionOutcome::Dropped;
        };
        let Some(cursor) = ctx.cursor.as_deref_mut().filter(|c| c.is_loaded()) else {
            tracing::error!(kind = ?self.kind, "no loaded list, dropping action");
            return ActionOutcome::Dropped;
        };

        let destructive = self.is_destructive_in(folder);
        let ops = self.update_ops();
        let updates = self
            .target
            .iter()
            .map(|record| RecordUpdate {
                id: record.id.clone(),
                ops: ops.clone(),
                local_removal: destructive,
            })
            .collect();

        tracing::info!(
            kind = ?self.kind,
            count = self.target.len(),
            destructive,
            folder_id = %folder.id,
            "performing action"
        );
        cursor.apply(UpdateBatch::new(updates));

        if ctx.session.supports_undo() && self.is_undoable_in(folder) {
            ctx.undo
                .schedule(ToastOperation::undo(self.target.len(), self.kind, self.batch));
        }

        ctx.presenter.request_list_refresh();
        if self.batch {
            ctx.selection.clear();
        }
        ActionOutcome::Performed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{system_folders, FolderType};
    use crate::services::test_support::Harness;

    fn inbox() -> Folder {
        Folder::new("INBOX", "Inbox").with_type(FolderType::Inbox)
    }

    #[test]
    fn destructiveness_depends_on_folder() {
        let inbox = inbox();
        let mute_folder = inbox
            .clone()
            .with_capabilities(FolderCapabilities::DESTRUCTIVE_MUTE);
        let important = Folder::new("IMPORTANT", "Important")
            .with_capabilities(FolderCapabilities::ONLY_IMPORTANT);
        let drafts = Folder::new("DRAFTS", "Drafts").with_type(FolderType::Drafts);
        let starred = Folder::new("STARRED", "Starred").with_type(FolderType::Starred);

        assert!(MutationKind::Archive.is_destructive_in(&inbox));
        assert!(MutationKind::Delete.is_destructive_in(&inbox));
        assert!(!MutationKind::Mute.is_destructive_in(&inbox));
        assert!(MutationKind::Mute.is_destructive_in(&mute_folder));
        assert!(!MutationKind::MarkNotImportant.is_destructive_in(&inbox));
        assert!(MutationKind::MarkNotImportant.is_destructive_in(&important));
        assert!(!MutationKind::DiscardDrafts.is_destructive_in(&inbox));
        assert!(MutationKind::DiscardDrafts.is_destructive_in(&drafts));
        assert!(!MutationKind::RemoveStar.is_destructive_in(&inbox));
        assert!(MutationKind::RemoveStar.is_destructive_in(&starred));
        assert!(!MutationKind::ReportPhishing.is_destructive_in(&inbox));
    }

    #[test]
    fn undo_eligibility() {
        let inbox = inbox();
        let final_trash = Folder::new("TRASH", "Trash")
            .with_capabilities(FolderCapabilities::DELETE_ACTION_FINAL);

        assert!(MutationKind::Delete.is_undoable_in(&inbox));
        assert!(!MutationKind::Delete.is_undoable_in(&final_trash));
        assert!(!MutationKind::DiscardDrafts.is_undoable_in(&inbox));
        assert!(MutationKind::Archive.is_undoable_in(&final_trash));
    }

    #[test]
    fn folder_change_destructive_only_when_removing_current() {
        let inbox = inbox();
        let work = Folder::new("work", "Work");

        let moving = FolderChange::new(
            vec![FolderOperation::add(work.clone()), FolderOperation::remove(inbox.clone())],
            &inbox,
            true,
        );
        assert!(moving.destructive);

        let labelling = FolderChange::new(vec![FolderOperation::add(work)], &inbox, true);
        assert!(!labelling.destructive);

        let locked = inbox.clone().with_capabilities(FolderCapabilities::CAN_HOLD_MAIL);
        let from_locked =
            FolderChange::new(vec![FolderOperation::remove(locked.clone())], &locked, true);
        assert!(!from_locked.destructive);
    }

    #[test]
    fn folder_change_undo_needs_destruction_and_consent() {
        let inbox = inbox();
        let change = FolderChange::new(vec![FolderOperation::remove(inbox.clone())], &inbox, false);
        let action =
            DestructiveAction::with_folders(MutationKind::RemoveFolder, change, vec![], false);

        assert!(action.is_destructive_in(&inbox));
        assert!(!action.is_undoable_in(&inbox));
    }

    #[test]
    fn folder_change_ops_split_add_and_remove() {
        let inbox = inbox();
        let mut change = FolderChange::new(
            vec![
                FolderOperation::add(Folder::new("work", "Work")),
                FolderOperation::remove(inbox.clone()),
            ],
            &inbox,
            true,
        );
        change.star = true;

        assert_eq!(
            change.update_ops(),
            vec![
                UpdateOp::ChangeFolders {
                    add: vec!["work".into()],
                    remove: vec!["INBOX".into()],
                },
                UpdateOp::SetStarred(true),
            ]
        );
    }

    #[test]
    fn kind_ops() {
        assert_eq!(MutationKind::RemoveStar.update_ops(), vec![UpdateOp::SetStarred(false)]);
        assert_eq!(
            MutationKind::MarkNotImportant.update_ops(),
            vec![UpdateOp::SetPriority(Priority::Low)]
        );
    }

    #[tokio::test]
    async fn perform_posts_undo_descriptor() {
        let mut h = Harness::loaded(&["a", "b", "c"]).await;
        let target = vec![h.record("a"), h.record("c")];
        let action = DestructiveAction::new(MutationKind::Archive, target, true);

        assert_eq!(action.perform(&mut h.ctx()), ActionOutcome::Performed);
        assert_eq!(action.perform(&mut h.ctx()), ActionOutcome::AlreadyPerformed);
        h.settle().await;

        assert_eq!(
            h.undo_toasts(),
            vec![ToastOperation::undo(2, MutationKind::Archive, true)]
        );
        assert_eq!(h.store.batches().len(), 1);
    }

    #[tokio::test]
    async fn final_delete_posts_no_undo() {
        let mut h = Harness::loaded(&["a", "b"]).await;
        let trash = Folder::new(system_folders::trash(), "Trash")
            .with_type(FolderType::Trash)
            .with_capabilities(
                FolderCapabilities::CAN_HOLD_MAIL | FolderCapabilities::DELETE_ACTION_FINAL,
            );
        h.session.folder = Some(trash);
        let action = DestructiveAction::new(MutationKind::Delete, vec![h.record("a")], false);

        assert_eq!(action.perform(&mut h.ctx()), ActionOutcome::Performed);
        h.settle().await;

        assert!(h.undo_toasts().is_empty());
        assert_eq!(h.store.batches().len(), 1);
        assert!(h.record("a").pending_local_removal);
    }

    #[tokio::test]
    async fn discarded_drafts_post_no_undo() {
        let mut h = Harness::loaded(&["a"]).await;
        let drafts = Folder::new(system_folders::drafts(), "Drafts").with_type(FolderType::Drafts);
        h.session.folder = Some(drafts);
        let target = vec![h.record("a")];
        let action = DestructiveAction::new(MutationKind::DiscardDrafts, target, false);

        assert_eq!(action.perform(&mut h.ctx()), ActionOutcome::Performed);
        h.settle().await;

        assert!(h.undo_toasts().is_empty());
        assert_eq!(h.store.batches().len(), 1);
    }
}
