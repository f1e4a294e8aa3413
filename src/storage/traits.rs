//! Backing store interface.
//!
//! The coordination layer reaches persistence only through `RecordStore`:
//! fetch a view, apply a batch of field updates, reverse the last batch and
//! notify when data changed.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::domain::{
    system_folders, Account, AccountId, AutoAdvance, Folder, FolderId, Priority, Record,
    RecordId, RecordSet,
};
use crate::storage::database::DatabaseError;

/// Errors reported by a backing store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("nothing to undo")]
    NothingToUndo,

    #[error("database error: {0}")]
    Database(#[from] DatabaseError),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Which records a fetch should return.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ViewSpec {
    pub account: AccountId,
    pub folder: FolderId,
    /// Case-insensitive subject filter for search views.
    pub query: Option<String>,
}

impl ViewSpec {
    pub fn folder(account: AccountId, folder: FolderId) -> Self {
        Self {
            account,
            folder,
            query: None,
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// True when `record` belongs in this view.
    pub fn matches(&self, record: &Record) -> bool {
        if !record.is_in(&self.folder) {
            return false;
        }
        match &self.query {
            Some(query) => record
                .subject
                .as_deref()
                .is_some_and(|s| s.to_lowercase().contains(&query.to_lowercase())),
            None => true,
        }
    }
}

/// One field-level change applied to a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOp {
    Archive,
    Delete,
    Mute,
    ReportSpam,
    ReportNotSpam,
    ReportPhishing,
    SetStarred(bool),
    SetPriority(Priority),
    DiscardDrafts,
    ChangeFolders {
        add: Vec<FolderId>,
        remove: Vec<FolderId>,
    },
    SetRead {
        read: bool,
        viewed: bool,
    },
}

/// Whether a record survives an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Keep,
    Purge,
}

impl UpdateOp {
    /// Applies the change to `record` using the system folder conventions.
    pub fn apply_to(&self, record: &mut Record) -> Disposition {
        match self {
            Self::Archive | Self::Mute => {
                record.remove_folder(&system_folders::inbox());
            }
            Self::Delete => {
                if record.is_in(&system_folders::trash()) {
                    return Disposition::Purge;
                }
                record.folders.clear();
                record.add_folder(&system_folders::trash());
            }
            Self::ReportSpam => {
                record.folders.clear();
                record.add_folder(&system_folders::spam());
            }
            Self::ReportNotSpam => {
                record.remove_folder(&system_folders::spam());
                record.add_folder(&system_folders::inbox());
            }
            Self::ReportPhishing => {
                record.add_folder(&system_folders::spam());
            }
            Self::SetStarred(starred) => {
                record.starred = *starred;
                if *starred {
                    record.add_folder(&system_folders::starred());
                } else {
                    record.remove_folder(&system_folders::starred());
                }
            }
            Self::SetPriority(priority) => {
                record.priority = *priority;
                match priority {
                    Priority::High => record.add_folder(&system_folders::important()),
                    Priority::Low => record.remove_folder(&system_folders::important()),
                };
            }
            Self::DiscardDrafts => {
                record.remove_folder(&system_folders::drafts());
                if record.folders.is_empty() {
                    return Disposition::Purge;
                }
            }
            Self::ChangeFolders { add, remove } => {
                for folder in remove {
                    record.remove_folder(folder);
                }
                for folder in add {
                    record.add_folder(folder);
                }
            }
            Self::SetRead { read, .. } => {
                record.read = *read;
            }
        }
        Disposition::Keep
    }
}

/// Updates for one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordUpdate {
    pub id: RecordId,
    pub ops: Vec<UpdateOp>,
    /// The record is expected to leave the current view.
    pub local_removal: bool,
}

impl RecordUpdate {
    pub fn new(id: RecordId, op: UpdateOp) -> Self {
        Self {
            id,
            ops: vec![op],
            local_removal: false,
        }
    }

    pub fn removing(mut self, local_removal: bool) -> Self {
        self.local_removal = local_removal;
        self
    }

    pub fn and(mut self, op: UpdateOp) -> Self {
        self.ops.push(op);
        self
    }

    /// Applies every op in order, stopping once the record is purged.
    pub fn apply_to(&self, record: &mut Record) -> Disposition {
        for op in &self.ops {
            if op.apply_to(record) == Disposition::Purge {
                return Disposition::Purge;
            }
        }
        Disposition::Keep
    }
}

/// A group of record updates committed together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateBatch {
    pub updates: Vec<RecordUpdate>,
    /// The batch must not replace the store's undo slot.
    pub suppress_undo: bool,
}

impl UpdateBatch {
    pub fn new(updates: Vec<RecordUpdate>) -> Self {
        Self {
            updates,
            suppress_undo: false,
        }
    }

    pub fn suppressing_undo(mut self) -> Self {
        self.suppress_undo = true;
        self
    }

    pub fn len(&self) -> usize {
        self.updates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &RecordId> {
        self.updates.iter().map(|u| &u.id)
    }
}

/// Change notification broadcast by a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreNotification {
    /// Records changed; open views should refresh.
    Changed,
}

/// Storage operations the coordination layer consumes.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Returns the records of `view` in position order.
    async fn fetch(&self, view: &ViewSpec) -> StoreResult<RecordSet>;

    /// Commits a batch. Unless `suppress_undo` is set, the batch becomes the
    /// single reversible one.
    async fn apply_batch(&self, batch: &UpdateBatch) -> StoreResult<()>;

    /// Reverses the most recent undoable batch through `endpoint`.
    async fn undo(&self, endpoint: &str) -> StoreResult<()>;

    /// Asks the store to sync the folder behind `endpoint`.
    async fn sync_folder(&self, endpoint: &str) -> StoreResult<()>;

    /// The folder opened when `account` becomes active.
    async fn default_inbox(&self, account: &Account) -> StoreResult<Option<Folder>>;

    /// Persists an auto-advance choice for `account`.
    async fn save_auto_advance(&self, account: &AccountId, value: AutoAdvance)
        -> StoreResult<()>;

    /// Subscribes to change notifications.
    fn subscribe(&self) -> broadcast::Receiver<StoreNotification>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn inbox_record() -> Record {
        Record::new("r1", Utc::now())
            .with_subject("Quarterly report")
            .in_folder(system_folders::inbox())
    }

    #[test]
    fn delete_moves_to_trash_then_purges() {
        let mut record = inbox_record();

        assert_eq!(UpdateOp::Delete.apply_to(&mut record), Disposition::Keep);
        assert_eq!(record.folders, vec![system_folders::trash()]);

        assert_eq!(UpdateOp::Delete.apply_to(&mut record), Disposition::Purge);
    }

    #[test]
    fn star_mirrors_starred_folder() {
        let mut record = inbox_record();

        UpdateOp::SetStarred(true).apply_to(&mut record);
        assert!(record.starred);
        assert!(record.is_in(&system_folders::starred()));

        UpdateOp::SetStarred(false).apply_to(&mut record);
        assert!(!record.is_in(&system_folders::starred()));
    }

    #[test]
    fn discarding_the_only_draft_purges() {
        let mut record = Record::new("d1", Utc::now()).in_folder(system_folders::drafts());
        assert_eq!(UpdateOp::DiscardDrafts.apply_to(&mut record), Disposition::Purge);
    }

    #[test]
    fn change_folders_removes_before_adding() {
        let mut record = inbox_record();
        let op = UpdateOp::ChangeFolders {
            add: vec![FolderId::from("work")],
            remove: vec![system_folders::inbox()],
        };

        op.apply_to(&mut record);
        assert_eq!(record.folders, vec![FolderId::from("work")]);
    }

    #[test]
    fn view_spec_query_filters_subjects() {
        let record = inbox_record();
        let view = ViewSpec::folder(AccountId::from("a"), system_folders::inbox());

        assert!(view.matches(&record));
        assert!(view.clone().with_query("QUARTERLY").matches(&record));
        assert!(!view.with_query("invoice").matches(&record));
    }
}
