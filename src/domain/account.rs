//! Account domain types.
//!
//! Represents email accounts, their capabilities and the per-account settings
//! the coordination layer reads.

use serde::{Deserialize, Serialize};

use super::{AccountId, FolderId};

/// What becomes current after the displayed record is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoAdvance {
    /// No preference recorded yet.
    #[default]
    Unset,
    /// Show the next older record.
    Older,
    /// Show the next newer record.
    Newer,
    /// Return to the list.
    List,
}

impl AutoAdvance {
    pub fn is_set(self) -> bool {
        self != Self::Unset
    }
}

/// Capability bit set attached to an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct AccountCapabilities(pub u32);

impl AccountCapabilities {
    pub const NONE: Self = Self(0);
    /// The store can reverse the last committed batch.
    pub const UNDO: Self = Self(0x0001);
    pub const LOCAL_SEARCH: Self = Self(0x0002);
    pub const SERVER_SEARCH: Self = Self(0x0004);

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for AccountCapabilities {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Per-account preferences stored alongside the account.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AccountSettings {
    /// Auto-advance preference.
    pub auto_advance: AutoAdvance,
    /// Folder opened when the account is selected.
    pub default_inbox: Option<FolderId>,
    /// Ask before deleting.
    #[serde(default)]
    pub confirm_delete: bool,
}

/// An email account the user can switch to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    /// Display name shown in the UI.
    pub name: String,
    pub capabilities: AccountCapabilities,
    pub settings: AccountSettings,
    /// Endpoint that reverses the last committed batch.
    pub undo_uri: Option<String>,
    /// Endpoint the user visits to sign in again.
    pub reauthentication_uri: Option<String>,
    /// Endpoint that receives diagnostic reports.
    pub send_feedback_uri: Option<String>,
}

impl Account {
    pub fn new(id: impl Into<AccountId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            capabilities: AccountCapabilities::NONE,
            settings: AccountSettings::default(),
            undo_uri: None,
            reauthentication_uri: None,
            send_feedback_uri: None,
        }
    }

    /// Enables undo and sets the endpoint used to issue it.
    pub fn with_undo(mut self, uri: impl Into<String>) -> Self {
        self.capabilities = self.capabilities | AccountCapabilities::UNDO;
        self.undo_uri = Some(uri.into());
        self
    }

    pub fn with_auto_advance(mut self, auto_advance: AutoAdvance) -> Self {
        self.settings.auto_advance = auto_advance;
        self
    }

    pub fn is_valid(&self) -> bool {
        !self.id.0.is_empty()
    }

    pub fn supports(&self, capability: AccountCapabilities) -> bool {
        self.capabilities.contains(capability)
    }

    /// True when anything other than the identity differs from `other`.
    pub fn settings_differ(&self, other: &Account) -> bool {
        self.settings != other.settings
            || self.capabilities != other.capabilities
            || self.undo_uri != other.undo_uri
            || self.reauthentication_uri != other.reauthentication_uri
            || self.send_feedback_uri != other.send_feedback_uri
            || self.name != other.name
    }
}
