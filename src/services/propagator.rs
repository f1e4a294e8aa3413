//! Account and folder change propagation.
//!
//! Classifies incoming account and folder notifications so the controller can
//! skip no-ops, flush pending work before an identity swap and broadcast only
//! once the swap is committed.

use crate::app::{AccountEvent, ControllerEvents, FolderEvent};
use crate::domain::{Account, Folder};

/// How a new account relates to the active one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountTransition {
    /// Same identity and settings.
    Unchanged,
    /// Same identity, different settings or capabilities.
    SettingsOnly,
    /// A different account.
    Switched,
}

/// How a new folder relates to the open one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FolderTransition {
    /// The folder has no identity yet.
    Invalid,
    Unchanged,
    /// Same identity, different flags or sync status.
    Updated,
    /// A different folder.
    Switched,
}

/// Fans out account and folder changes.
#[derive(Debug, Clone)]
pub struct ChangePropagator {
    events: ControllerEvents,
}

impl ChangePropagator {
    pub fn new(events: ControllerEvents) -> Self {
        Self { events }
    }

    pub fn classify_account(previous: Option<&Account>, next: &Account) -> AccountTransition {
        match previous {
            Some(prev) if prev.id == next.id => {
                if prev.settings_differ(next) {
                    AccountTransition::SettingsOnly
                } else {
                    AccountTransition::Unchanged
                }
            }
            _ => AccountTransition::Switched,
        }
    }

    pub fn classify_folder(previous: Option<&Folder>, next: &Folder) -> FolderTransition {
        if !next.is_initialized() {
            return FolderTransition::Invalid;
        }
        match previous {
            Some(prev) if prev.id == next.id => {
                if prev == next {
                    FolderTransition::Unchanged
                } else {
                    FolderTransition::Updated
                }
            }
            _ => FolderTransition::Switched,
        }
    }

    /// Tells observers about a committed account swap.
    pub fn account_committed(&self, change: AccountTransition, account: &Account) {
        let event = match change {
            AccountTransition::Switched => AccountEvent::Changed(account.clone()),
            AccountTransition::SettingsOnly => AccountEvent::SettingsChanged(account.clone()),
            AccountTransition::Unchanged => return,
        };
        tracing::info!(account_id = %account.id, ?change, "account changed");
        self.events.account.publish(&event);
    }

    /// Tells observers about a committed folder swap.
    pub fn folder_committed(&self, change: FolderTransition, folder: &Folder) {
        let event = match change {
            FolderTransition::Switched => FolderEvent::Changed(folder.clone()),
            FolderTransition::Updated => FolderEvent::Updated(folder.clone()),
            FolderTransition::Unchanged | FolderTransition::Invalid => return,
        };
        tracing::info!(folder_id = %folder.id, ?change, "folder changed");
        self.events.folder.publish(&event);
    }

    pub fn hierarchy_committed(&self, folder: Option<&Folder>) {
        self.events
            .folder
            .publish(&FolderEvent::HierarchyChanged(folder.cloned()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{sync_result, AutoAdvance, SyncStatus};
    use std::sync::{Arc, Mutex};

    #[test]
    fn account_classification() {
        let work = Account::new("work", "Work");

        assert_eq!(
            ChangePropagator::classify_account(None, &work),
            AccountTransition::Switched
        );
        assert_eq!(
            ChangePropagator::classify_account(Some(&work), &work.clone()),
            AccountTransition::Unchanged
        );
        assert_eq!(
            ChangePropagator::classify_account(
                Some(&work),
                &work.clone().with_auto_advance(AutoAdvance::Older)
            ),
            AccountTransition::SettingsOnly
        );
        assert_eq!(
            ChangePropagator::classify_account(Some(&work), &Account::new("home", "Home")),
            AccountTransition::Switched
        );
    }

    #[test]
    fn folder_classification() {
        let inbox = Folder::new("INBOX", "Inbox");
        let failed = Folder {
            last_sync_result: sync_result(SyncStatus::AuthError, 0),
            ..inbox.clone()
        };

        assert_eq!(
            ChangePropagator::classify_folder(Some(&inbox), &Folder::new("", "")),
            FolderTransition::Invalid
        );
        assert_eq!(
            ChangePropagator::classify_folder(Some(&inbox), &inbox.clone()),
            FolderTransition::Unchanged
        );
        assert_eq!(
            ChangePropagator::classify_folder(Some(&inbox), &failed),
            FolderTransition::Updated
        );
        assert_eq!(
            ChangePropagator::classify_folder(Some(&inbox), &Folder::new("work", "Work")),
            FolderTransition::Switched
        );
    }

    #[test]
    fn unchanged_notifications_broadcast_nothing() {
        let events = ControllerEvents::new();
        let seen = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&seen);
        events.account.subscribe(move |_| *counter.lock().unwrap() += 1);
        let counter = Arc::clone(&seen);
        events.folder.subscribe(move |_| *counter.lock().unwrap() += 1);

        let propagator = ChangePropagator::new(events);
        propagator.account_committed(AccountTransition::Unchanged, &Account::new("a", "A"));
        propagator.folder_committed(FolderTransition::Unchanged, &Folder::new("f", "F"));
        assert_eq!(*seen.lock().unwrap(), 0);

        propagator.folder_committed(FolderTransition::Switched, &Folder::new("f", "F"));
        assert_eq!(*seen.lock().unwrap(), 1);
    }
}
