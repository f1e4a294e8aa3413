//! Selection set for batch actions.
//!
//! Tracks which records the user has checked in the list. Observers hear about
//! the set becoming populated or empty through the selection channel.

use std::collections::HashMap;

use crate::app::{EventChannel, SelectionEvent, SubscriberId};
use crate::domain::{Record, RecordId, RecordSet};

/// Records currently chosen by the user, keyed by identity.
///
/// Must only be touched from the coordination thread.
#[derive(Debug, Default)]
pub struct SelectionSet {
    entries: HashMap<RecordId, Record>,
    events: EventChannel<SelectionEvent>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a set that publishes on an existing channel.
    pub fn with_channel(events: EventChannel<SelectionEvent>) -> Self {
        Self {
            entries: HashMap::new(),
            events,
        }
    }

    pub fn subscribe<F>(&self, handler: F) -> SubscriberId
    where
        F: Fn(&SelectionEvent) + Send + Sync + 'static,
    {
        self.events.subscribe(handler)
    }

    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        self.events.unsubscribe(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &RecordId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn keys(&self) -> impl Iterator<Item = &RecordId> {
        self.entries.keys()
    }

    /// Snapshot of the selected records, ordered by identity.
    pub fn values(&self) -> Vec<Record> {
        let mut records: Vec<Record> = self.entries.values().cloned().collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        records
    }

    /// Adds or replaces `record`.
    pub fn add(&mut self, record: Record) {
        let was_empty = self.entries.is_empty();
        self.entries.insert(record.id.clone(), record);

        if was_empty {
            self.events.publish(&SelectionEvent::Populated { count: 1 });
        }
        self.events.publish(&SelectionEvent::Changed {
            count: self.entries.len(),
        });
    }

    /// Removes `id`. Returns the record that was selected, if any.
    pub fn remove(&mut self, id: &RecordId) -> Option<Record> {
        let removed = self.entries.remove(id)?;

        if self.entries.is_empty() {
            self.events.publish(&SelectionEvent::Emptied);
        } else {
            self.events.publish(&SelectionEvent::Changed {
                count: self.entries.len(),
            });
        }
        Some(removed)
    }

    /// Selects `record` if it was not selected, deselects it otherwise.
    pub fn toggle(&mut self, record: Record) -> bool {
        if self.contains(&record.id) {
            self.remove(&record.id);
            false
        } else {
            self.add(record);
            true
        }
    }

    pub fn clear(&mut self) {
        if self.entries.is_empty() {
            return;
        }
        self.entries.clear();
        self.events.publish(&SelectionEvent::Emptied);
    }

    /// Drops every entry absent from `records`.
    ///
    /// No per-record events fire; observers get one aggregate notice when
    /// anything was dropped.
    pub fn validate_against(&mut self, records: &RecordSet) {
        if self.entries.is_empty() {
            return;
        }

        let before = self.entries.len();
        self.entries.retain(|id, _| records.contains(id));
        let dropped = before - self.entries.len();
        if dropped == 0 {
            return;
        }

        tracing::debug!(dropped, remaining = self.entries.len(), "purged stale selection");
        if self.entries.is_empty() {
            self.events.publish(&SelectionEvent::Emptied);
        } else {
            self.events.publish(&SelectionEvent::Changed {
                count: self.entries.len(),
            });
        }
    }

    /// Bulk-adds saved records, firing a single `Populated` when the result is
    /// non-empty.
    pub fn restore(&mut self, records: impl IntoIterator<Item = Record>) {
        let was_empty = self.entries.is_empty();
        self.entries
            .extend(records.into_iter().map(|r| (r.id.clone(), r)));

        if was_empty && !self.entries.is_empty() {
            self.events.publish(&SelectionEvent::Populated {
                count: self.entries.len(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::{Arc, Mutex};

    fn record(id: &str) -> Record {
        Record::new(id, Utc::now())
    }

    fn recording(set: &SelectionSet) -> Arc<Mutex<Vec<SelectionEvent>>> {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        set.subscribe(move |event| sink.lock().unwrap().push(*event));
        log
    }

    #[test]
    fn first_add_populates_and_last_remove_empties() {
        let mut set = SelectionSet::new();
        let log = recording(&set);

        set.add(record("a"));
        set.add(record("b"));
        set.remove(&RecordId::from("a"));
        set.remove(&RecordId::from("b"));

        assert_eq!(
            *log.lock().unwrap(),
            vec![
                SelectionEvent::Populated { count: 1 },
                SelectionEvent::Changed { count: 1 },
                SelectionEvent::Changed { count: 2 },
                SelectionEvent::Changed { count: 1 },
                SelectionEvent::Emptied,
            ]
        );
    }

    #[test]
    fn toggle_flips_membership() {
        let mut set = SelectionSet::new();
        assert!(set.toggle(record("a")));
        assert!(set.contains(&RecordId::from("a")));
        assert!(!set.toggle(record("a")));
        assert!(set.is_empty());
    }

    #[test]
    fn clear_on_empty_set_is_silent() {
        let mut set = SelectionSet::new();
        let log = recording(&set);
        set.clear();
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn validate_drops_absent_records() {
        let mut set = SelectionSet::new();
        set.add(record("a"));
        set.add(record("b"));
        set.add(record("c"));
        let log = recording(&set);

        let current = RecordSet::from_records(vec![record("b"), record("d")]);
        set.validate_against(&current);

        assert_eq!(set.len(), 1);
        assert!(set.keys().all(|id| current.contains(id)));
        assert_eq!(*log.lock().unwrap(), vec![SelectionEvent::Changed { count: 1 }]);
    }

    #[test]
    fn validate_to_empty_fires_emptied_once() {
        let mut set = SelectionSet::new();
        set.add(record("a"));
        set.add(record("b"));
        let log = recording(&set);

        set.validate_against(&RecordSet::default());

        assert!(set.is_empty());
        assert_eq!(*log.lock().unwrap(), vec![SelectionEvent::Emptied]);
    }

    #[test]
    fn validate_with_nothing_stale_is_silent() {
        let mut set = SelectionSet::new();
        set.add(record("a"));
        let log = recording(&set);

        set.validate_against(&RecordSet::from_records(vec![record("a")]));
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn restore_fires_one_aggregate_event() {
        let mut set = SelectionSet::new();
        let log = recording(&set);

        set.restore(vec![record("a"), record("b"), record("c")]);

        assert_eq!(set.len(), 3);
        assert_eq!(
            *log.lock().unwrap(),
            vec![SelectionEvent::Populated { count: 3 }]
        );
    }

    #[test]
    fn restore_of_nothing_is_silent() {
        let mut set = SelectionSet::new();
        let log = recording(&set);
        set.restore(Vec::new());
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn values_are_sorted_snapshots() {
        let mut set = SelectionSet::new();
        set.add(record("b"));
        set.add(record("a"));

        let ids: Vec<_> = set.values().into_iter().map(|r| r.id.0).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
