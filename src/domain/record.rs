//! Record domain types.
//!
//! A record is one addressable mailbox item (a conversation). A record set is
//! the ordered list the store produces for the open view.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{FolderId, RecordId};

/// Importance marker carried by a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    Low,
    High,
}

/// A single mailbox item as seen by the coordination layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Opaque key assigned by the store.
    pub id: RecordId,
    /// Subject line, if any.
    pub subject: Option<String>,
    /// Date of the most recent message.
    pub date: DateTime<Utc>,
    /// Whether the record has been read.
    pub read: bool,
    /// Whether the record is starred.
    pub starred: bool,
    /// Importance marker.
    pub priority: Priority,
    /// Folders this record is filed under.
    pub folders: Vec<FolderId>,
    /// Set when a destructive action expects the record to leave the current
    /// view before the store confirms it.
    #[serde(default)]
    pub pending_local_removal: bool,
}

impl Record {
    /// Creates an unread, unstarred record with no folders.
    pub fn new(id: impl Into<RecordId>, date: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            subject: None,
            date,
            read: false,
            starred: false,
            priority: Priority::Low,
            folders: Vec::new(),
            pending_local_removal: false,
        }
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn in_folder(mut self, folder: impl Into<FolderId>) -> Self {
        let folder = folder.into();
        if !self.folders.contains(&folder) {
            self.folders.push(folder);
        }
        self
    }

    pub fn starred(mut self, starred: bool) -> Self {
        self.starred = starred;
        self
    }

    pub fn read(mut self, read: bool) -> Self {
        self.read = read;
        self
    }

    /// Returns true when the record is filed under `folder`.
    pub fn is_in(&self, folder: &FolderId) -> bool {
        self.folders.contains(folder)
    }

    /// Adds a folder membership. Returns false when it was already present.
    pub fn add_folder(&mut self, folder: &FolderId) -> bool {
        if self.is_in(folder) {
            return false;
        }
        self.folders.push(folder.clone());
        true
    }

    /// Removes a folder membership. Returns false when it was absent.
    pub fn remove_folder(&mut self, folder: &FolderId) -> bool {
        let before = self.folders.len();
        self.folders.retain(|f| f != folder);
        before != self.folders.len()
    }
}

/// Ordered, deduplicated list of records for the active view.
///
/// Positions ascend in recency: a higher position holds a newer record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordSet {
    records: Vec<Record>,
    index: HashMap<RecordId, usize>,
}

impl RecordSet {
    /// Builds a record set, keeping the first occurrence of each identity.
    pub fn from_records(records: impl IntoIterator<Item = Record>) -> Self {
        let mut set = Self::default();
        for record in records {
            if set.index.contains_key(&record.id) {
                continue;
            }
            set.index.insert(record.id.clone(), set.records.len());
            set.records.push(record);
        }
        set
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, id: &RecordId) -> bool {
        self.index.contains_key(id)
    }

    /// Position of `id`, if present.
    pub fn position(&self, id: &RecordId) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn get(&self, position: usize) -> Option<&Record> {
        self.records.get(position)
    }

    pub fn record(&self, id: &RecordId) -> Option<&Record> {
        self.position(id).and_then(|pos| self.records.get(pos))
    }

    pub(crate) fn record_mut(&mut self, id: &RecordId) -> Option<&mut Record> {
        let pos = self.position(id)?;
        self.records.get_mut(pos)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Record> {
        self.records.iter_mut()
    }

    pub fn ids(&self) -> impl Iterator<Item = &RecordId> {
        self.records.iter().map(|r| &r.id)
    }
}

impl FromIterator<Record> for RecordSet {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        Self::from_records(iter)
    }
}
