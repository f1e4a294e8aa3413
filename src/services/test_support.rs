//! Shared fixtures for service tests.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use tokio::sync::mpsc::{self, UnboundedReceiver};

use crate::app::testing::MockPresenter;
use crate::app::SessionContext;
use crate::domain::{system_folders, Account, Folder, FolderType, Record, RecordId};
use crate::storage::{InMemoryStore, ListCursor, RecordStore, ViewSpec};

use super::actions::{ActionContext, UndoScheduler};
use super::controller::ControllerMessage;
use super::selection::SelectionSet;
use super::toast::ToastOperation;

pub(crate) fn inbox_folder() -> Folder {
    Folder::new(system_folders::inbox(), "Inbox").with_type(FolderType::Inbox)
}

/// Inbox records named by `ids`, oldest first.
pub(crate) fn seed(store: &InMemoryStore, ids: &[&str]) {
    for (n, id) in ids.iter().enumerate() {
        store.insert(
            Record::new(*id, Utc.with_ymd_and_hms(2024, 6, 1, 12, n as u32, 0).unwrap())
                .with_subject(format!("subject {id}"))
                .in_folder(system_folders::inbox()),
        );
    }
}

/// A loaded inbox cursor plus everything an action needs.
pub(crate) struct Harness {
    pub store: Arc<InMemoryStore>,
    pub cursor: ListCursor,
    pub selection: SelectionSet,
    pub presenter: MockPresenter,
    pub session: SessionContext,
    pub undo: UndoScheduler,
    pub rx: UnboundedReceiver<ControllerMessage>,
    pub received: Vec<ControllerMessage>,
}

impl Harness {
    pub async fn loaded(ids: &[&str]) -> Self {
        let store = Arc::new(InMemoryStore::new());
        seed(&store, ids);

        let account = Account::new("acct", "Work").with_undo("undo://acct");
        let (tx, mut rx) = mpsc::unbounded_channel();
        let view = ViewSpec::folder(account.id.clone(), system_folders::inbox());
        let mut cursor = ListCursor::open(store.clone() as Arc<dyn RecordStore>, view, tx.clone());

        let mut received = Vec::new();
        while let Some(message) = rx.recv().await {
            if let ControllerMessage::ListLoaded {
                generation, result, ..
            } = message
            {
                cursor.on_loaded(generation, result);
                break;
            }
            received.push(message);
        }

        Self {
            store,
            cursor,
            selection: SelectionSet::new(),
            presenter: MockPresenter::default(),
            session: SessionContext {
                account: Some(account),
                folder: Some(inbox_folder()),
                ..SessionContext::default()
            },
            undo: UndoScheduler::new(tx, Duration::ZERO),
            rx,
            received,
        }
    }

    pub fn record(&self, id: &str) -> Record {
        self.cursor
            .record(&RecordId::from(id))
            .cloned()
            .unwrap_or_else(|| panic!("record {id} not loaded"))
    }

    pub fn ctx(&mut self) -> ActionContext<'_> {
        ActionContext {
            session: &self.session,
            cursor: Some(&mut self.cursor),
            selection: &mut self.selection,
            presenter: &self.presenter,
            undo: &self.undo,
        }
    }

    /// Lets spawned store tasks and timers run, then collects their messages.
    pub async fn settle(&mut self) {
        tokio::time::sleep(Duration::from_millis(20)).await;
        while let Ok(message) = self.rx.try_recv() {
            self.received.push(message);
        }
    }

    pub fn undo_toasts(&self) -> Vec<ToastOperation> {
        self.received
            .iter()
            .filter_map(|m| match m {
                ControllerMessage::UndoAvailable(op) => Some(op.clone()),
                _ => None,
            })
            .collect()
    }
}
