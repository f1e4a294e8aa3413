//! Interface to the view-presentation layer.
//!
//! The controller never renders anything; it asks a `Presenter` to animate,
//! refresh, prompt and display.

use crate::domain::{Account, Folder, Record, RecordId};
use crate::services::ContinuationToken;

/// Calls the controller makes into the presentation layer.
pub trait Presenter: Send + Sync {
    /// Whether the record list is on screen. Deletes are only animated while it is.
    fn is_visible(&self) -> bool {
        true
    }

    /// Redraw the record list from the current cursor.
    fn request_list_refresh(&self);

    /// Start the removal animation for `target`.
    ///
    /// Returns true when an animation was started; the presenter must then call
    /// `MailboxController::on_animation_end` once it finishes. Returns false when
    /// the list is not showing and the action should run immediately.
    fn request_delete(&self, target: &[RecordId]) -> bool;

    /// Commit any swipe leave-behind items the list is holding.
    fn commit_destructive_actions(&self, animate: bool);

    /// Show `record` in the reading pane, or return to the list on `None`.
    fn show_record(&self, record: Option<&Record>);

    /// Ask the user to choose an auto-advance policy.
    ///
    /// The answer comes back through `on_auto_advance_chosen` or
    /// `on_auto_advance_dismissed` with the same token.
    fn show_auto_advance_prompt(&self, token: ContinuationToken);

    fn prompt_reauthentication(&self, uri: &str);

    fn show_storage_error_dialog(&self, folder: &Folder);

    fn send_feedback(&self, account: &Account);

    /// Re-point notification suppression at the active account and folder.
    fn suppress_notifications(&self, _account: &Account, _folder: Option<&Folder>) {}
}

/// Presenter with no screen. Actions run immediately and prompts are logged.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeadlessPresenter;

impl Presenter for HeadlessPresenter {
    fn is_visible(&self) -> bool {
        false
    }

    fn request_list_refresh(&self) {
        tracing::debug!("list refresh requested");
    }

    fn request_delete(&self, target: &[RecordId]) -> bool {
        tracing::debug!(count = target.len(), "removing records without animation");
        false
    }

    fn commit_destructive_actions(&self, animate: bool) {
        tracing::debug!(animate, "committing leave-behind items");
    }

    fn show_record(&self, record: Option<&Record>) {
        match record {
            Some(r) => tracing::info!(record_id = %r.id, "showing record"),
            None => tracing::info!("showing list"),
        }
    }

    fn show_auto_advance_prompt(&self, token: ContinuationToken) {
        tracing::warn!(%token, "auto-advance prompt requested without a screen");
    }

    fn prompt_reauthentication(&self, uri: &str) {
        tracing::warn!(uri, "account needs to sign in again");
    }

    fn show_storage_error_dialog(&self, folder: &Folder) {
        tracing::warn!(folder_id = %folder.id, "device storage is full");
    }

    fn send_feedback(&self, account: &Account) {
        tracing::info!(account_id = %account.id, "diagnostic report requested");
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::*;

    /// One observed presenter call.
    #[derive(Debug, Clone, PartialEq)]
    pub enum Call {
        ListRefresh,
        RequestDelete(Vec<RecordId>),
        Commit(bool),
        ShowRecord(Option<RecordId>),
        Prompt(ContinuationToken),
        Reauthenticate(String),
        StorageDialog,
        Feedback,
        Suppress,
    }

    /// Presenter that records calls and optionally claims to animate deletes.
    #[derive(Default)]
    pub struct MockPresenter {
        pub calls: Mutex<Vec<Call>>,
        pub animate: bool,
        /// Report the list as off screen.
        pub hidden: bool,
    }

    impl MockPresenter {
        pub fn animating() -> Self {
            Self {
                animate: true,
                ..Self::default()
            }
        }

        pub fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        pub fn count(&self, call: &Call) -> usize {
            self.calls().iter().filter(|c| *c == call).count()
        }

        fn push(&self, call: Call) {
            self.calls.lock().unwrap().push(call);
        }
    }

    impl Presenter for MockPresenter {
        fn is_visible(&self) -> bool {
            !self.hidden
        }

        fn request_list_refresh(&self) {
            self.push(Call::ListRefresh);
        }

        fn request_delete(&self, target: &[RecordId]) -> bool {
            self.push(Call::RequestDelete(target.to_vec()));
            self.animate
        }

        fn commit_destructive_actions(&self, animate: bool) {
            self.push(Call::Commit(animate));
        }

        fn show_record(&self, record: Option<&Record>) {
            self.push(Call::ShowRecord(record.map(|r| r.id.clone())));
        }

        fn show_auto_advance_prompt(&self, token: ContinuationToken) {
            self.push(Call::Prompt(token));
        }

        fn prompt_reauthentication(&self, uri: &str) {
            self.push(Call::Reauthenticate(uri.to_string()));
        }

        fn show_storage_error_dialog(&self, _folder: &Folder) {
            self.push(Call::StorageDialog);
        }

        fn send_feedback(&self, _account: &Account) {
            self.push(Call::Feedback);
        }

        fn suppress_notifications(&self, _account: &Account, _folder: Option<&Folder>) {
            self.push(Call::Suppress);
        }
    }
}
