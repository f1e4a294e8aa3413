//! Account and folder switching, folder sync, error recovery, lifecycle and
//! save/restore.

use std::sync::Arc;

use crate::app::{ListEvent, ToastEvent, ViewMode};
use crate::domain::{Account, AccountId, Folder};
use crate::storage::{ListCursor, StoreResult, ViewSpec};

use super::{ControllerError, ControllerMessage, ControllerResult, MailboxController};
use crate::services::propagator::{AccountTransition, ChangePropagator, FolderTransition};
use crate::services::snapshot::SavedState;
use crate::services::toast::{RecoveryAction, SyncErrorNotice, Toast};

impl MailboxController {
    /// A new or updated account arrived.
    ///
    /// Switching accounts commits pending work, drops the open list and loads
    /// the new account's default inbox.
    pub fn on_account_changed(&mut self, account: Account) -> ControllerResult<()> {
        self.switch_account(account, true)
    }

    fn switch_account(&mut self, account: Account, load_inbox: bool) -> ControllerResult<()> {
        if !account.is_valid() {
            tracing::warn!("ignoring account without identity");
            return Err(ControllerError::InvalidInput("account has no id".into()));
        }

        let transition =
            ChangePropagator::classify_account(self.session.account.as_ref(), &account);
        match transition {
            AccountTransition::Unchanged => return Ok(()),
            AccountTransition::SettingsOnly => {
                self.session.account = Some(account.clone());
            }
            AccountTransition::Switched => {
                self.commit_destructive_actions(false);
                self.close_list();
                self.cancel_folder_sync();
                self.resolver.clear();
                self.dismiss_toast();
                self.session.account = Some(account.clone());
                self.session.folder = None;
                self.session.hierarchy_folder = None;
                self.session.search_query = None;
                self.presenter.suppress_notifications(&account, None);
                if load_inbox {
                    self.load_default_inbox(&account);
                }
            }
        }
        self.propagator.account_committed(transition, &account);
        Ok(())
    }

    fn load_default_inbox(&mut self, account: &Account) {
        if let Some(task) = self.inbox_load.take() {
            task.abort();
        }
        let store = Arc::clone(&self.store);
        let messages = self.sender.clone();
        let account = account.clone();
        let task = tokio::spawn(async move {
            let result = store.default_inbox(&account).await;
            let _ = messages.send(ControllerMessage::InboxLoaded {
                account: account.id,
                result,
            });
        });
        self.inbox_load = Some(task.abort_handle());
    }

    pub(super) fn on_inbox_loaded(
        &mut self,
        account: AccountId,
        result: StoreResult<Option<Folder>>,
    ) {
        if self.session.account.as_ref().map(|a| &a.id) != Some(&account) {
            tracing::debug!(%account, "inbox for an inactive account");
            return;
        }
        match result {
            Ok(Some(inbox)) => {
                if let Err(e) = self.on_folder_changed(inbox) {
                    tracing::error!(error = %e, "failed to open default inbox");
                }
            }
            Ok(None) => tracing::warn!(%account, "account has no default inbox"),
            Err(e) => tracing::error!(%account, error = %e, "failed to load default inbox"),
        }
    }

    /// A new or updated folder arrived.
    ///
    /// Switching folders commits pending work before the new list opens.
    pub fn on_folder_changed(&mut self, folder: Folder) -> ControllerResult<()> {
        let transition = ChangePropagator::classify_folder(self.session.folder.as_ref(), &folder);
        match transition {
            FolderTransition::Invalid => {
                tracing::warn!("ignoring folder without identity");
                return Err(ControllerError::InvalidInput("folder has no id".into()));
            }
            FolderTransition::Unchanged => return Ok(()),
            FolderTransition::Updated => {
                self.session.folder = Some(folder.clone());
            }
            FolderTransition::Switched => {
                let Some(account) = self.session.account.clone() else {
                    return Err(ControllerError::InvalidInput("no active account".into()));
                };
                self.commit_destructive_actions(false);
                self.cancel_folder_sync();
                self.session.folder = Some(folder.clone());
                self.open_list(&account);
                self.presenter.suppress_notifications(&account, Some(&folder));
            }
        }
        self.propagator.folder_committed(transition, &folder);
        self.on_sync_error(false);
        Ok(())
    }

    /// Runs `query` against the open folder.
    pub fn search(&mut self, query: impl Into<String>) -> ControllerResult<()> {
        let Some(account) = self.session.account.clone() else {
            return Err(ControllerError::InvalidInput("no active account".into()));
        };
        if self.session.folder.is_none() {
            return Err(ControllerError::InvalidInput("no open folder".into()));
        }
        self.commit_destructive_actions(false);
        self.session.search_query = Some(query.into());
        self.open_list(&account);
        self.session.view_mode = ViewMode::SearchResultsList;
        Ok(())
    }

    /// Leaves search results for the plain folder list.
    pub fn exit_search(&mut self) {
        let Some(account) = self.session.account.clone() else {
            return;
        };
        if self.session.search_query.take().is_none() {
            return;
        }
        self.commit_destructive_actions(false);
        self.open_list(&account);
        self.session.view_mode = ViewMode::RecordList;
    }

    fn open_list(&mut self, account: &Account) {
        self.close_list();
        let Some(folder) = self.session.folder.as_ref() else {
            return;
        };
        let mut view = ViewSpec::folder(account.id.clone(), folder.id.clone());
        if let Some(query) = &self.session.search_query {
            view = view.with_query(query.clone());
        }
        tracing::info!(folder_id = %folder.id, query = ?view.query, "opening list");
        self.cursor = Some(ListCursor::open(Arc::clone(&self.store), view, self.sender.clone()));
        self.session.view_mode = ViewMode::RecordList;
    }

    fn close_list(&mut self) {
        self.selection.clear();
        self.tracker.initialize(None, None);
        if self.cursor.take().is_some() {
            self.events.list.publish(&ListEvent::Invalidated);
        }
    }

    /// Sets the folder whose children are being browsed.
    pub fn set_hierarchy_folder(&mut self, folder: Option<Folder>) {
        if self.session.hierarchy_folder == folder {
            return;
        }
        self.session.hierarchy_folder = folder;
        self.propagator
            .hierarchy_committed(self.session.hierarchy_folder.as_ref());
    }

    // =========================================================================
    // Folder sync
    // =========================================================================

    /// Asks the store to sync the open folder.
    pub fn request_folder_refresh(&mut self) -> ControllerResult<()> {
        let uri = self.session.folder.as_ref().and_then(|f| f.refresh_uri.clone());
        let Some(uri) = uri else {
            return Err(ControllerError::InvalidInput("folder cannot be refreshed".into()));
        };
        self.start_folder_sync(uri);
        Ok(())
    }

    /// Asks the store for older records of the open folder.
    pub fn load_more(&mut self) -> ControllerResult<()> {
        let uri = self.session.folder.as_ref().and_then(|f| f.load_more_uri.clone());
        let Some(uri) = uri else {
            return Err(ControllerError::InvalidInput("folder has no more records".into()));
        };
        self.start_folder_sync(uri);
        Ok(())
    }

    fn start_folder_sync(&mut self, endpoint: String) {
        self.cancel_folder_sync();
        tracing::info!(endpoint, "syncing folder");

        let store = Arc::clone(&self.store);
        let messages = self.sender.clone();
        let task = tokio::spawn(async move {
            let result = store.sync_folder(&endpoint).await;
            let _ = messages.send(ControllerMessage::FolderSynced(result));
        });
        self.folder_sync = Some(task.abort_handle());
    }

    pub(super) fn cancel_folder_sync(&mut self) {
        if let Some(task) = self.folder_sync.take() {
            tracing::debug!("cancelling folder sync");
            task.abort();
        }
    }

    // =========================================================================
    // Errors
    // =========================================================================

    /// Shows the sync error of the open folder, if the user should see it.
    ///
    /// A visible toast is kept unless `replace_visible` is set.
    pub fn on_sync_error(&mut self, replace_visible: bool) -> Option<SyncErrorNotice> {
        let notice = SyncErrorNotice::for_folder(self.session.folder.as_ref()?, replace_visible)?;
        if self.toast.is_some() && !replace_visible {
            return None;
        }
        tracing::warn!(status = ?notice.status, action = ?notice.action, "folder sync failed");
        self.events.toast.publish(&ToastEvent::Error(notice.clone()));
        self.toast = Some(Toast::Error(notice.clone()));
        Some(notice)
    }

    /// The user picked the recovery offered with a sync error.
    pub fn on_error_action(&mut self, action: RecoveryAction) -> ControllerResult<()> {
        self.dismiss_toast();
        match action {
            RecoveryAction::Retry => self.request_folder_refresh(),
            RecoveryAction::Reauthenticate => {
                let uri = self
                    .session
                    .account
                    .as_ref()
                    .and_then(|a| a.reauthentication_uri.as_deref());
                let Some(uri) = uri else {
                    return Err(ControllerError::InvalidInput("no sign-in endpoint".into()));
                };
                self.presenter.prompt_reauthentication(uri);
                Ok(())
            }
            RecoveryAction::StorageDetail => {
                let Some(folder) = self.session.folder.as_ref() else {
                    return Err(ControllerError::InvalidInput("no open folder".into()));
                };
                self.presenter.show_storage_error_dialog(folder);
                Ok(())
            }
            RecoveryAction::Report => {
                let Some(account) = self.session.account.as_ref() else {
                    return Err(ControllerError::InvalidInput("no active account".into()));
                };
                self.presenter.send_feedback(account);
                Ok(())
            }
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// The host is going to the background.
    pub fn on_pause(&mut self) {
        tracing::debug!("pausing");
        self.commit_destructive_actions(false);
    }

    /// The host is back in the foreground.
    pub fn on_resume(&mut self) {
        tracing::debug!("resuming");
        if let Some(account) = &self.session.account {
            self.presenter
                .suppress_notifications(account, self.session.folder.as_ref());
        }
    }

    // =========================================================================
    // Save / restore
    // =========================================================================

    pub fn save_state(&self) -> SavedState {
        SavedState {
            account: self.session.account.clone(),
            folder: self.session.folder.clone(),
            search_query: self.session.search_query.clone(),
            view_mode: self.session.view_mode,
            current_record: self
                .tracker
                .current()
                .filter(|_| self.session.view_mode.is_record_mode())
                .cloned(),
            selection: self.selection.values(),
            toast: self.toast.clone(),
            hierarchy_folder: self.session.hierarchy_folder.clone(),
        }
    }

    /// Rebuilds a session from `state` through the cold-start path.
    ///
    /// Selection entries and the current record that the reloaded list no
    /// longer contains are dropped once it arrives.
    pub fn restore_state(&mut self, state: SavedState) -> ControllerResult<()> {
        if let Some(account) = state.account {
            self.switch_account(account, state.folder.is_none())?;
        }
        if let Some(folder) = state.folder {
            self.session.search_query = state.search_query;
            self.on_folder_changed(folder)?;
        }
        self.set_hierarchy_folder(state.hierarchy_folder);

        if state.view_mode.is_record_mode() && state.current_record.is_some() {
            self.show_record(state.current_record);
        } else {
            self.session.view_mode = state.view_mode;
        }
        self.selection.restore(state.selection);

        match state.toast {
            Some(Toast::Undo(op)) => self.on_undo_available(op),
            Some(Toast::Error(notice)) => {
                self.events.toast.publish(&ToastEvent::Error(notice.clone()));
                self.toast = Some(Toast::Error(notice));
            }
            None => {}
        }
        tracing::info!("session restored");
        Ok(())
    }

    pub fn save_state_json(&self) -> ControllerResult<String> {
        Ok(self.save_state().to_json()?)
    }

    pub fn restore_state_json(&mut self, raw: &str) -> ControllerResult<()> {
        let state = SavedState::from_json(raw)?;
        self.restore_state(state)
    }
}
