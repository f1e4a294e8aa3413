//! Session state shared by the coordination components.
//!
//! A `SessionContext` is built once per view session and passed explicitly to
//! whatever needs the current account or folder.

use serde::{Deserialize, Serialize};

use crate::config::{Layout, Settings};
use crate::domain::{Account, AccountCapabilities, AutoAdvance, Folder};

/// What the main view is currently showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    #[default]
    Unknown,
    /// A folder's record list.
    RecordList,
    /// A single record.
    Record,
    /// The result list of a search.
    SearchResultsList,
    /// A single record opened from search results.
    SearchResultsRecord,
}

impl ViewMode {
    /// True when a single record is on screen.
    pub fn is_record_mode(self) -> bool {
        matches!(self, Self::Record | Self::SearchResultsRecord)
    }

    pub fn is_list_mode(self) -> bool {
        matches!(self, Self::RecordList | Self::SearchResultsList)
    }
}

/// Current account, folder and view for one session.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    pub account: Option<Account>,
    pub folder: Option<Folder>,
    /// Folder whose children are being browsed, for the breadcrumb.
    pub hierarchy_folder: Option<Folder>,
    pub view_mode: ViewMode,
    pub layout: Layout,
    pub search_query: Option<String>,
    /// Policy used when the account has none and the layout cannot prompt.
    pub default_auto_advance: AutoAdvance,
}

impl SessionContext {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            layout: settings.behavior.layout,
            default_auto_advance: settings.behavior.default_auto_advance,
            ..Self::default()
        }
    }

    /// True when the active account can reverse a committed batch.
    pub fn supports_undo(&self) -> bool {
        self.account
            .as_ref()
            .is_some_and(|a| a.supports(AccountCapabilities::UNDO))
    }

    /// Auto-advance preference stored on the active account.
    pub fn auto_advance(&self) -> AutoAdvance {
        self.account
            .as_ref()
            .map(|a| a.settings.auto_advance)
            .unwrap_or_default()
    }

    pub fn is_multi_pane(&self) -> bool {
        self.layout == Layout::MultiPane
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_modes() {
        assert!(ViewMode::Record.is_record_mode());
        assert!(ViewMode::SearchResultsRecord.is_record_mode());
        assert!(!ViewMode::RecordList.is_record_mode());
        assert!(ViewMode::SearchResultsList.is_list_mode());
    }

    #[test]
    fn session_without_account_has_no_undo() {
        let session = SessionContext::default();
        assert!(!session.supports_undo());
        assert_eq!(session.auto_advance(), AutoAdvance::Unset);
    }

    #[test]
    fn session_reads_account_preferences() {
        let session = SessionContext {
            account: Some(
                Account::new("a", "A")
                    .with_undo("undo://a")
                    .with_auto_advance(AutoAdvance::Newer),
            ),
            ..SessionContext::default()
        };

        assert!(session.supports_undo());
        assert_eq!(session.auto_advance(), AutoAdvance::Newer);
    }

    #[test]
    fn session_takes_layout_from_settings() {
        let mut settings = Settings::default();
        settings.behavior.layout = Layout::MultiPane;

        let session = SessionContext::from_settings(&settings);
        assert!(session.is_multi_pane());
    }
}
