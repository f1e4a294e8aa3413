//! Status strip descriptors.
//!
//! An undo toast describes the last destructive action; an error notice
//! describes a failed folder sync together with the recovery the user can pick.

use serde::{Deserialize, Serialize};

use crate::domain::{Folder, SyncRequest, SyncStatus};

use super::actions::MutationKind;

/// Lightweight notice offering to reverse the last committed destructive action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToastOperation {
    /// Number of records affected.
    pub count: usize,
    pub kind: MutationKind,
    /// Whether the action came from the selection set.
    pub batch: bool,
}

impl ToastOperation {
    pub fn undo(count: usize, kind: MutationKind, batch: bool) -> Self {
        Self { count, kind, batch }
    }
}

/// Recovery offered next to a sync error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryAction {
    /// Sync the folder again.
    Retry,
    /// Send the user to sign in again.
    Reauthenticate,
    /// Explain the storage problem.
    StorageDetail,
    /// Send a diagnostic report.
    Report,
}

/// A dismissible sync error for the open folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncErrorNotice {
    pub status: SyncStatus,
    pub action: RecoveryAction,
    /// Replace a toast already on screen.
    pub replace_visible: bool,
}

impl SyncErrorNotice {
    /// Notice for the last sync of `folder`, if the user should see one.
    ///
    /// Security errors are never shown. Connection errors are shown only for
    /// user-initiated refreshes of a folder that has never synced.
    pub fn for_folder(folder: &Folder, replace_visible: bool) -> Option<Self> {
        let status = folder.sync_status();
        let action = match status {
            SyncStatus::Success | SyncStatus::SecurityError => return None,
            SyncStatus::ConnectionError => {
                let request = folder.sync_request();
                if folder.sync_window > 0
                    || request.has(SyncRequest::BACKGROUND_SYNC)
                    || !request.has(SyncRequest::USER_REFRESH)
                {
                    return None;
                }
                RecoveryAction::Retry
            }
            SyncStatus::AuthError => RecoveryAction::Reauthenticate,
            SyncStatus::StorageError => RecoveryAction::StorageDetail,
            SyncStatus::InternalError => RecoveryAction::Report,
        };

        Some(Self {
            status,
            action,
            replace_visible,
        })
    }
}

/// Whatever the status strip is showing, for save/restore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Toast {
    Undo(ToastOperation),
    Error(SyncErrorNotice),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::sync_result;

    fn folder_with(status: SyncStatus, request: u32) -> Folder {
        Folder {
            last_sync_result: sync_result(status, request),
            ..Folder::new("INBOX", "Inbox")
        }
    }

    #[test]
    fn recovery_follows_status() {
        let cases = [
            (SyncStatus::AuthError, RecoveryAction::Reauthenticate),
            (SyncStatus::StorageError, RecoveryAction::StorageDetail),
            (SyncStatus::InternalError, RecoveryAction::Report),
        ];

        for (status, action) in cases {
            let notice = SyncErrorNotice::for_folder(&folder_with(status, 0), false).unwrap();
            assert_eq!(notice.action, action);
        }
    }

    #[test]
    fn security_errors_are_suppressed() {
        let folder = folder_with(SyncStatus::SecurityError, SyncRequest::USER_REFRESH);
        assert_eq!(SyncErrorNotice::for_folder(&folder, true), None);
    }

    #[test]
    fn connection_errors_only_for_user_refresh() {
        let user = folder_with(SyncStatus::ConnectionError, SyncRequest::USER_REFRESH);
        assert_eq!(
            SyncErrorNotice::for_folder(&user, false).map(|n| n.action),
            Some(RecoveryAction::Retry)
        );

        let background = folder_with(
            SyncStatus::ConnectionError,
            SyncRequest::USER_REFRESH | SyncRequest::BACKGROUND_SYNC,
        );
        assert_eq!(SyncErrorNotice::for_folder(&background, false), None);

        let synced_before = Folder {
            sync_window: 25,
            ..folder_with(SyncStatus::ConnectionError, SyncRequest::USER_REFRESH)
        };
        assert_eq!(SyncErrorNotice::for_folder(&synced_before, false), None);
    }

    #[test]
    fn toast_serialization_is_tagged() {
        let toast = Toast::Undo(ToastOperation::undo(2, MutationKind::Archive, true));
        let json = serde_json::to_value(&toast).unwrap();

        assert_eq!(json["type"], "undo");
        assert_eq!(json["kind"], "archive");
        assert_eq!(json["count"], 2);
    }
}
