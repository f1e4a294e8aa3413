//! Folder domain types.
//!
//! Folders carry the capability flags the coordination layer consults when it
//! decides whether a mutation removes records from the open view.

use serde::{Deserialize, Serialize};

use super::FolderId;

/// Kind of folder, as reported by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FolderType {
    Inbox,
    Drafts,
    Sent,
    Trash,
    Spam,
    Starred,
    Important,
    /// Every record of the account, regardless of filing.
    AllMail,
    Search,
    #[default]
    User,
}

/// Capability bit set attached to a folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct FolderCapabilities(pub u32);

impl FolderCapabilities {
    pub const NONE: Self = Self(0);
    /// Records can be moved into this folder.
    pub const CAN_ACCEPT_MOVED_MESSAGES: Self = Self(0x0001);
    /// The folder holds records (as opposed to only child folders).
    pub const CAN_HOLD_MAIL: Self = Self(0x0002);
    /// Deleting from this folder cannot be reversed.
    pub const DELETE_ACTION_FINAL: Self = Self(0x0004);
    /// Muting removes records from this folder.
    pub const DESTRUCTIVE_MUTE: Self = Self(0x0008);
    /// The folder only shows important records.
    pub const ONLY_IMPORTANT: Self = Self(0x0010);
    pub const SUPPORTS_SETTINGS: Self = Self(0x0020);

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[must_use]
    pub const fn with(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

impl std::ops::BitOr for FolderCapabilities {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.with(rhs)
    }
}

/// A folder (or label) the user can open as a view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Folder {
    pub id: FolderId,
    pub name: String,
    pub folder_type: FolderType,
    pub capabilities: FolderCapabilities,
    /// Endpoint the store syncs when the user asks for a refresh.
    pub refresh_uri: Option<String>,
    /// Endpoint the store syncs to fetch older records.
    pub load_more_uri: Option<String>,
    /// Raw result of the last sync: status in the low nibble, request flags above.
    #[serde(default)]
    pub last_sync_result: u32,
    /// Size of the sync window; zero when nothing has been synced yet.
    #[serde(default)]
    pub sync_window: u32,
    #[serde(default)]
    pub total_count: u32,
}

impl Folder {
    /// Creates a user folder that accepts moved records and holds mail.
    pub fn new(id: impl Into<FolderId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            folder_type: FolderType::User,
            capabilities: FolderCapabilities::CAN_ACCEPT_MOVED_MESSAGES
                | FolderCapabilities::CAN_HOLD_MAIL,
            refresh_uri: None,
            load_more_uri: None,
            last_sync_result: 0,
            sync_window: 0,
            total_count: 0,
        }
    }

    pub fn with_type(mut self, folder_type: FolderType) -> Self {
        self.folder_type = folder_type;
        self
    }

    pub fn with_capabilities(mut self, capabilities: FolderCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_refresh_uri(mut self, uri: impl Into<String>) -> Self {
        self.refresh_uri = Some(uri.into());
        self
    }

    /// A folder without an identity has not been loaded yet.
    pub fn is_initialized(&self) -> bool {
        !self.id.is_empty()
    }

    pub fn supports(&self, capability: FolderCapabilities) -> bool {
        self.capabilities.contains(capability)
    }

    pub fn is_type(&self, folder_type: FolderType) -> bool {
        self.folder_type == folder_type
    }

    pub fn is_drafts(&self) -> bool {
        self.is_type(FolderType::Drafts)
    }

    pub fn is_starred(&self) -> bool {
        self.is_type(FolderType::Starred)
    }

    pub fn is_view_all(&self) -> bool {
        self.is_type(FolderType::AllMail)
    }

    pub fn is_important_only(&self) -> bool {
        self.supports(FolderCapabilities::ONLY_IMPORTANT)
    }

    /// Status decoded from the last sync result.
    pub fn sync_status(&self) -> SyncStatus {
        SyncStatus::from_result(self.last_sync_result)
    }

    /// Request flags that triggered the last sync.
    pub fn sync_request(&self) -> SyncRequest {
        SyncRequest(self.last_sync_result >> 4)
    }
}

/// One step of a multi-folder reassignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FolderOperation {
    pub folder: Folder,
    /// True to add the folder, false to remove it.
    pub add: bool,
}

impl FolderOperation {
    pub fn add(folder: Folder) -> Self {
        Self { folder, add: true }
    }

    pub fn remove(folder: Folder) -> Self {
        Self { folder, add: false }
    }

    /// True when `ops` remove `folder`.
    pub fn removes(ops: &[FolderOperation], folder: &FolderId) -> bool {
        ops.iter().any(|op| !op.add && &op.folder.id == folder)
    }
}

/// Outcome of the last sync of a folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Success,
    ConnectionError,
    AuthError,
    SecurityError,
    StorageError,
    InternalError,
}

impl SyncStatus {
    /// Decodes the low nibble of a raw sync result. Unknown codes are internal errors.
    pub fn from_result(result: u32) -> Self {
        match result & 0x0f {
            0 => Self::Success,
            1 => Self::ConnectionError,
            2 => Self::AuthError,
            3 => Self::SecurityError,
            4 => Self::StorageError,
            _ => Self::InternalError,
        }
    }

    pub fn code(self) -> u32 {
        match self {
            Self::Success => 0,
            Self::ConnectionError => 1,
            Self::AuthError => 2,
            Self::SecurityError => 3,
            Self::StorageError => 4,
            Self::InternalError => 5,
        }
    }

    pub fn is_error(self) -> bool {
        self != Self::Success
    }
}

/// Flags describing what triggered a sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncRequest(pub u32);

impl SyncRequest {
    pub const USER_REFRESH: u32 = 1 << 0;
    pub const USER_QUERY: u32 = 1 << 1;
    pub const USER_MORE_RESULTS: u32 = 1 << 2;
    pub const BACKGROUND_SYNC: u32 = 1 << 3;

    pub fn has(self, flag: u32) -> bool {
        self.0 & flag != 0
    }
}

/// Packs a status and request flags into a raw sync result.
pub fn sync_result(status: SyncStatus, request: u32) -> u32 {
    (request << 4) | status.code()
}

/// Well-known system folder IDs.
pub mod system_folders {
    use super::FolderId;

    pub fn inbox() -> FolderId {
        FolderId::from("INBOX")
    }

    pub fn drafts() -> FolderId {
        FolderId::from("DRAFTS")
    }

    pub fn trash() -> FolderId {
        FolderId::from("TRASH")
    }

    pub fn spam() -> FolderId {
        FolderId::from("SPAM")
    }

    pub fn starred() -> FolderId {
        FolderId::from("STARRED")
    }

    pub fn important() -> FolderId {
        FolderId::from("IMPORTANT")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capability_set_contains() {
        let caps = FolderCapabilities::CAN_HOLD_MAIL | FolderCapabilities::DELETE_ACTION_FINAL;
        assert!(caps.contains(FolderCapabilities::DELETE_ACTION_FINAL));
        assert!(!caps.contains(FolderCapabilities::DESTRUCTIVE_MUTE));
        assert!(caps.contains(FolderCapabilities::NONE));
    }

    #[test]
    fn uninitialized_folder() {
        assert!(!Folder::new("", "nowhere").is_initialized());
        assert!(Folder::new("INBOX", "Inbox").is_initialized());
    }

    #[test]
    fn sync_result_decoding() {
        let folder = Folder {
            last_sync_result: sync_result(SyncStatus::ConnectionError, SyncRequest::USER_REFRESH),
            ..Folder::new("INBOX", "Inbox")
        };

        assert_eq!(folder.sync_status(), SyncStatus::ConnectionError);
        assert!(folder.sync_request().has(SyncRequest::USER_REFRESH));
        assert!(!folder.sync_request().has(SyncRequest::BACKGROUND_SYNC));
        assert_eq!(SyncStatus::from_result(0x0e), SyncStatus::InternalError);
    }

    #[test]
    fn folder_operations_detect_removal() {
        let inbox = Folder::new("INBOX", "Inbox");
        let work = Folder::new("work", "Work");
        let ops = vec![FolderOperation::add(work), FolderOperation::remove(inbox.clone())];

        assert!(FolderOperation::removes(&ops, &inbox.id));
        assert!(!FolderOperation::removes(&ops, &FolderId::from("work")));
    }

    #[test]
    fn folder_type_serialization() {
        let json = serde_json::to_string(&FolderType::AllMail).unwrap();
        assert_eq!(json, "\"all_mail\"");
    }
}
