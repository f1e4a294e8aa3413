//! SQLite-backed record store.
//!
//! Persists records, folder definitions, the undo slot and auto-advance
//! preferences. Every write happens in one transaction and is followed by a
//! change notification.

use std::path::Path;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::domain::{Account, AccountId, AutoAdvance, Folder, Record, RecordSet};

use super::database::Database;
use super::queries::undo::UndoEntry;
use super::queries::{accounts, folders, records, undo};
use super::traits::{
    Disposition, RecordStore, StoreError, StoreNotification, StoreResult, UpdateBatch, ViewSpec,
};

/// Record store persisted in SQLite.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    db: Database,
    changes: broadcast::Sender<StoreNotification>,
}

impl SqliteStore {
    pub fn new(db: Database) -> Self {
        let (changes, _) = broadcast::channel(64);
        Self { db, changes }
    }

    /// Opens the database at `path`, creating it if necessary.
    pub async fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Ok(Self::new(Database::open(path).await?))
    }

    pub async fn in_memory() -> StoreResult<Self> {
        Ok(Self::new(Database::open_in_memory().await?))
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    fn notify(&self) {
        let _ = self.changes.send(StoreNotification::Changed);
    }

    /// Stores `record` under `account` and tells open views.
    pub async fn insert(&self, account: &AccountId, record: &Record) -> StoreResult<()> {
        records::upsert(&self.db, account, record).await?;
        self.notify();
        Ok(())
    }

    /// Stores a folder definition, optionally as the account's default inbox.
    pub async fn add_folder(
        &self,
        account: &AccountId,
        folder: &Folder,
        default_inbox: bool,
    ) -> StoreResult<()> {
        folders::upsert(&self.db, account, folder, default_inbox).await?;
        Ok(())
    }

    pub async fn saved_auto_advance(
        &self,
        account: &AccountId,
    ) -> StoreResult<Option<AutoAdvance>> {
        Ok(accounts::auto_advance(&self.db, account).await?)
    }

    pub async fn can_undo(&self) -> StoreResult<bool> {
        Ok(undo::has_entries(&self.db).await?)
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn fetch(&self, view: &ViewSpec) -> StoreResult<RecordSet> {
        let records = records::get_by_account(&self.db, &view.account).await?;
        Ok(records.into_iter().filter(|r| view.matches(r)).collect())
    }

    async fn apply_batch(&self, batch: &UpdateBatch) -> StoreResult<()> {
        let batch = batch.clone();
        let count = batch.len();

        self.db
            .transaction(move |tx| {
                let mut prior = Vec::with_capacity(batch.len());

                for update in &batch.updates {
                    let Some((account_id, mut record)) = records::read(tx, &update.id)? else {
                        tracing::warn!(record_id = %update.id, "update for unknown record");
                        continue;
                    };
                    prior.push(UndoEntry {
                        record_id: update.id.clone(),
                        account_id: account_id.clone(),
                        snapshot: Some(record.clone()),
                    });

                    match update.apply_to(&mut record) {
                        Disposition::Keep => records::write(tx, &account_id, &record)?,
                        Disposition::Purge => records::delete(tx, &update.id)?,
                    }
                }

                if !batch.suppress_undo && !prior.is_empty() {
                    undo::replace(tx, &prior)?;
                }
                Ok(())
            })
            .await?;

        tracing::debug!(count, "batch committed");
        self.notify();
        Ok(())
    }

    async fn undo(&self, endpoint: &str) -> StoreResult<()> {
        let restored = self
            .db
            .transaction(|tx| {
                let entries = undo::take(tx)?;
                for entry in &entries {
                    match &entry.snapshot {
                        Some(record) => records::write(tx, &entry.account_id, record)?,
                        None => records::delete(tx, &entry.record_id)?,
                    }
                }
                Ok(entries.len())
            })
            .await?;

        if restored == 0 {
            return Err(StoreError::NothingToUndo);
        }
        tracing::debug!(endpoint, restored, "reversed last batch");
        self.notify();
        Ok(())
    }

    async fn sync_folder(&self, endpoint: &str) -> StoreResult<()> {
        folders::record_sync_request(&self.db, endpoint).await?;
        self.notify();
        Ok(())
    }

    async fn default_inbox(&self, account: &Account) -> StoreResult<Option<Folder>> {
        match &account.settings.default_inbox {
            Some(id) => folders::get(&self.db, &account.id, id)
                .await?
                .map(Some)
                .ok_or_else(|| StoreError::NotFound(format!("folder {id}"))),
            None => Ok(folders::default_inbox(&self.db, &account.id).await?),
        }
    }

    async fn save_auto_advance(&self, account: &AccountId, value: AutoAdvance) -> StoreResult<()> {
        accounts::save_auto_advance(&self.db, account, value).await?;
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreNotification> {
        self.changes.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{system_folders, FolderType, RecordId};
    use crate::storage::traits::{RecordUpdate, UpdateOp};
    use chrono::{TimeZone, Utc};

    async fn seeded(ids: &[&str]) -> SqliteStore {
        let store = SqliteStore::in_memory().await.unwrap();
        let account = AccountId::from("acct");
        for (n, id) in ids.iter().enumerate() {
            let record = Record::new(*id, Utc.with_ymd_and_hms(2024, 8, 1, 9, n as u32, 0).unwrap())
                .in_folder(system_folders::inbox());
            store.insert(&account, &record).await.unwrap();
        }
        store
    }

    fn inbox() -> ViewSpec {
        ViewSpec::folder(AccountId::from("acct"), system_folders::inbox())
    }

    fn ids(set: &RecordSet) -> Vec<String> {
        set.ids().map(|id| id.0.clone()).collect()
    }

    #[tokio::test]
    async fn fetch_filters_by_folder() {
        let store = seeded(&["a", "b"]).await;
        let sent = Record::new("s", Utc::now()).in_folder("SENT");
        store.insert(&AccountId::from("acct"), &sent).await.unwrap();

        assert_eq!(ids(&store.fetch(&inbox()).await.unwrap()), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn delete_then_undo_restores() {
        let store = seeded(&["a", "b"]).await;
        let mut changes = store.subscribe();

        let batch = UpdateBatch::new(vec![RecordUpdate::new(
            RecordId::from("a"),
            UpdateOp::Delete,
        )]);
        store.apply_batch(&batch).await.unwrap();
        assert!(changes.recv().await.is_ok());
        assert_eq!(ids(&store.fetch(&inbox()).await.unwrap()), vec!["b"]);
        assert!(store.can_undo().await.unwrap());

        store.undo("undo://acct").await.unwrap();
        assert_eq!(ids(&store.fetch(&inbox()).await.unwrap()), vec!["a", "b"]);
        assert!(matches!(
            store.undo("undo://acct").await,
            Err(StoreError::NothingToUndo)
        ));
    }

    #[tokio::test]
    async fn purged_record_comes_back_on_undo() {
        let store = SqliteStore::in_memory().await.unwrap();
        let draft = Record::new("d", Utc::now()).in_folder(system_folders::drafts());
        store.insert(&AccountId::from("acct"), &draft).await.unwrap();

        let batch = UpdateBatch::new(vec![RecordUpdate::new(
            draft.id.clone(),
            UpdateOp::DiscardDrafts,
        )]);
        store.apply_batch(&batch).await.unwrap();
        assert_eq!(records::count(store.db()).await.unwrap(), 0);

        store.undo("undo://acct").await.unwrap();
        assert_eq!(records::count(store.db()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn suppressed_batches_keep_previous_undo() {
        let store = seeded(&["a", "b"]).await;

        let archive = UpdateBatch::new(vec![RecordUpdate::new(
            RecordId::from("a"),
            UpdateOp::Archive,
        )]);
        store.apply_batch(&archive).await.unwrap();

        let read = UpdateBatch::new(vec![RecordUpdate::new(
            RecordId::from("b"),
            UpdateOp::SetRead {
                read: true,
                viewed: true,
            },
        )])
        .suppressing_undo();
        store.apply_batch(&read).await.unwrap();

        store.undo("undo://acct").await.unwrap();
        let set = store.fetch(&inbox()).await.unwrap();
        assert_eq!(ids(&set), vec!["a", "b"]);
        assert!(set.record(&"b".into()).is_some_and(|r| r.read));
    }

    #[tokio::test]
    async fn default_inbox_prefers_account_setting() {
        let store = SqliteStore::in_memory().await.unwrap();
        let account_id = AccountId::from("acct");
        let inbox = Folder::new(system_folders::inbox(), "Inbox").with_type(FolderType::Inbox);
        let priority = Folder::new("priority", "Priority");
        store.add_folder(&account_id, &inbox, true).await.unwrap();
        store.add_folder(&account_id, &priority, false).await.unwrap();

        let mut account = Account::new("acct", "Work");
        assert_eq!(store.default_inbox(&account).await.unwrap(), Some(inbox));

        account.settings.default_inbox = Some(priority.id.clone());
        assert_eq!(store.default_inbox(&account).await.unwrap(), Some(priority));

        account.settings.default_inbox = Some("missing".into());
        assert!(matches!(
            store.default_inbox(&account).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn auto_advance_is_persisted() {
        let store = SqliteStore::in_memory().await.unwrap();
        let account = AccountId::from("acct");

        store.save_auto_advance(&account, AutoAdvance::Older).await.unwrap();
        assert_eq!(
            store.saved_auto_advance(&account).await.unwrap(),
            Some(AutoAdvance::Older)
        );
    }

    #[tokio::test]
    async fn batch_for_unknown_records_keeps_undo() {
        let store = seeded(&["a"]).await;
        let archive = UpdateBatch::new(vec![RecordUpdate::new(
            RecordId::from("a"),
            UpdateOp::Archive,
        )]);
        store.apply_batch(&archive).await.unwrap();

        let missing = UpdateBatch::new(vec![RecordUpdate::new(
            RecordId::from("gone"),
            UpdateOp::Delete,
        )]);
        store.apply_batch(&missing).await.unwrap();
        assert!(store.can_undo().await.unwrap());

        store.undo("undo://acct").await.unwrap();
        assert_eq!(ids(&store.fetch(&inbox()).await.unwrap()), vec!["a"]);
    }
}
