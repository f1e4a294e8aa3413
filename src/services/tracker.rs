//! Position tracking for the open record.
//!
//! Remembers where the displayed record sits in the list so the controller can
//! pick a neighbor after the record is removed.

use std::collections::HashSet;

use crate::domain::{AutoAdvance, Record, RecordId, RecordSet};

/// Tracks the current record and its position in the active record set.
#[derive(Debug, Clone, Default)]
pub struct PositionTracker {
    current: Option<Record>,
    /// `None` when the record was not found in the last record set.
    position: Option<usize>,
}

impl PositionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts tracking `record`, locating it in `records` when available.
    pub fn initialize(&mut self, record: Option<Record>, records: Option<&RecordSet>) {
        self.position = match (&record, records) {
            (Some(r), Some(set)) => set.position(&r.id),
            _ => None,
        };
        self.current = record;
    }

    /// Re-resolves the position after the list was reloaded.
    pub fn on_cursor_updated(&mut self, records: &RecordSet) {
        let Some(current) = &self.current else {
            self.position = None;
            return;
        };

        self.position = records.position(&current.id);
        if self.position.is_none() {
            tracing::debug!(record_id = %current.id, "tracked record left the list");
        }
    }

    pub fn current(&self) -> Option<&Record> {
        self.current.as_ref()
    }

    pub fn position(&self) -> Option<usize> {
        self.position
    }

    /// Record to show after `excluded` leaves the list.
    ///
    /// NEWER walks toward higher positions and OLDER toward lower ones, skipping
    /// excluded records and records already pending removal. Returns `None` at
    /// the list boundary, for LIST, and when the position is unknown.
    pub fn next_record(
        &self,
        policy: AutoAdvance,
        excluded: &HashSet<RecordId>,
        records: &RecordSet,
    ) -> Option<Record> {
        let start = self.position?;
        let eligible = |pos: usize| {
            records
                .get(pos)
                .filter(|r| !excluded.contains(&r.id) && !r.pending_local_removal)
                .cloned()
        };

        match policy {
            AutoAdvance::Newer => (start + 1..records.len()).find_map(eligible),
            AutoAdvance::Older => (0..start).rev().find_map(eligible),
            AutoAdvance::List | AutoAdvance::Unset => None,
        }
    }
}
