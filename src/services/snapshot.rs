//! Save/restore snapshot of a view session.
//!
//! Everything needed to rebuild the session after a restart, serialized as an
//! opaque JSON blob and replayed through the cold-start path.

use serde::{Deserialize, Serialize};

use crate::app::ViewMode;
use crate::domain::{Account, Folder, Record};

use super::toast::Toast;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SavedState {
    pub account: Option<Account>,
    pub folder: Option<Folder>,
    #[serde(default)]
    pub search_query: Option<String>,
    #[serde(default)]
    pub view_mode: ViewMode,
    /// Only saved while a record is on screen.
    #[serde(default)]
    pub current_record: Option<Record>,
    #[serde(default)]
    pub selection: Vec<Record>,
    /// The toast that was visible, if any.
    #[serde(default)]
    pub toast: Option<Toast>,
    #[serde(default)]
    pub hierarchy_folder: Option<Folder>,
}

impl SavedState {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}
