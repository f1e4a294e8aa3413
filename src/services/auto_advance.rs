//! Auto-advance resolution.
//!
//! When an action removes the record on screen, something else has to become
//! current. The resolver answers with the record to show, or defers the action
//! behind a one-time prompt when the user has not picked a policy yet.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app::SessionContext;
use crate::domain::{AutoAdvance, Record, RecordId, RecordSet};

use super::tracker::PositionTracker;

/// Handle for an operation parked behind the auto-advance prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContinuationToken(Uuid);

impl ContinuationToken {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ContinuationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Result of resolving auto-advance for an action.
#[derive(Debug, Clone, PartialEq)]
pub enum AutoAdvanceOutcome {
    /// Go ahead. The record that should be current afterwards, or `None` to
    /// return to the list.
    Proceed(Option<Record>),
    /// The user is being asked; the operation resumes through the token.
    Deferred(ContinuationToken),
}

/// Decides the next record and parks operations while the user chooses.
///
/// `T` is whatever the caller needs to resume the operation later.
#[derive(Debug)]
pub struct AutoAdvanceResolver<T> {
    parked: Option<(ContinuationToken, T)>,
}

impl<T> Default for AutoAdvanceResolver<T> {
    fn default() -> Self {
        Self { parked: None }
    }
}

impl<T> AutoAdvanceResolver<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when removing `target` takes away the record on screen.
    pub fn affects_current(
        target: &HashSet<RecordId>,
        session: &SessionContext,
        tracker: &PositionTracker,
    ) -> bool {
        session.view_mode.is_record_mode()
            && tracker.current().is_some_and(|r| target.contains(&r.id))
    }

    /// Resolves what to show once `target` is gone.
    ///
    /// `park` is called only when the operation has to wait for the prompt. A
    /// new deferral abandons any operation parked earlier.
    pub fn resolve(
        &mut self,
        target: &HashSet<RecordId>,
        session: &SessionContext,
        tracker: &PositionTracker,
        records: Option<&RecordSet>,
        park: impl FnOnce() -> T,
    ) -> AutoAdvanceOutcome {
        if !Self::affects_current(target, session, tracker) {
            return AutoAdvanceOutcome::Proceed(tracker.current().cloned());
        }

        let policy = match session.auto_advance() {
            AutoAdvance::Unset if session.is_multi_pane() => {
                let token = ContinuationToken::new();
                if let Some((abandoned, _)) = self.parked.replace((token, park())) {
                    tracing::warn!(%abandoned, "replacing unanswered auto-advance prompt");
                }
                return AutoAdvanceOutcome::Deferred(token);
            }
            AutoAdvance::Unset => session.default_auto_advance,
            policy => policy,
        };

        let next = records.and_then(|set| tracker.next_record(policy, target, set));
        tracing::debug!(?policy, next = ?next.as_ref().map(|r| &r.id), "auto-advance resolved");
        AutoAdvanceOutcome::Proceed(next)
    }

    pub fn parked_token(&self) -> Option<ContinuationToken> {
        self.parked.as_ref().map(|(token, _)| *token)
    }

    /// Releases the operation parked under `token`.
    pub fn resume(&mut self, token: ContinuationToken) -> Option<T> {
        match self.parked.take() {
            Some((parked, op)) if parked == token => Some(op),
            other => {
                self.parked = other;
                None
            }
        }
    }

    /// Abandons the operation parked under `token`. Returns false for an unknown token.
    pub fn dismiss(&mut self, token: ContinuationToken) -> bool {
        self.resume(token).is_some()
    }

    /// Abandons whatever is parked.
    pub fn clear(&mut self) {
        self.parked = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ViewMode;
    use crate::config::Layout;
    use crate::domain::Account;
    use chrono::{Duration, TimeZone, Utc};

    fn abc() -> RecordSet {
        let base = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        ["a", "b", "c"]
            .iter()
            .enumerate()
            .map(|(n, id)| Record::new(*id, base + Duration::hours(n as i64)))
            .collect()
    }

    fn session(policy: AutoAdvance, layout: Layout) -> SessionContext {
        SessionContext {
            account: Some(Account::new("acct", "A").with_auto_advance(policy)),
            view_mode: ViewMode::Record,
            layout,
            default_auto_advance: AutoAdvance::List,
            ..SessionContext::default()
        }
    }

    fn viewing(id: &str, records: &RecordSet) -> PositionTracker {
        let mut tracker = PositionTracker::new();
        tracker.initialize(records.record(&RecordId::from(id)).cloned(), Some(records));
        tracker
    }

    fn target(id: &str) -> HashSet<RecordId> {
        HashSet::from([RecordId::from(id)])
    }

    #[test]
    fn unaffected_record_stays_current() {
        let records = abc();
        let tracker = viewing("b", &records);
        let mut resolver = AutoAdvanceResolver::<()>::new();

        let outcome = resolver.resolve(
            &target("c"),
            &session(AutoAdvance::Older, Layout::SinglePane),
            &tracker,
            Some(&records),
            || (),
        );
        assert_eq!(outcome, AutoAdvanceOutcome::Proceed(records.record(&"b".into()).cloned()));
    }

    #[test]
    fn list_mode_is_unaffected() {
        let records = abc();
        let tracker = viewing("b", &records);
        let mut list_session = session(AutoAdvance::Older, Layout::SinglePane);
        list_session.view_mode = ViewMode::RecordList;

        assert!(!AutoAdvanceResolver::<()>::affects_current(&target("b"), &list_session, &tracker));
    }

    #[test]
    fn stored_policy_picks_neighbor() {
        let records = abc();
        let tracker = viewing("b", &records);
        let mut resolver = AutoAdvanceResolver::<()>::new();

        let outcome = resolver.resolve(
            &target("b"),
            &session(AutoAdvance::Newer, Layout::MultiPane),
            &tracker,
            Some(&records),
            || (),
        );
        assert_eq!(outcome, AutoAdvanceOutcome::Proceed(records.record(&"c".into()).cloned()));
    }

    #[test]
    fn unset_policy_single_pane_uses_default() {
        let records = abc();
        let tracker = viewing("b", &records);
        let mut resolver = AutoAdvanceResolver::<()>::new();

        let outcome = resolver.resolve(
            &target("b"),
            &session(AutoAdvance::Unset, Layout::SinglePane),
            &tracker,
            Some(&records),
            || panic!("must not park"),
        );
        assert_eq!(outcome, AutoAdvanceOutcome::Proceed(None));
    }

    #[test]
    fn unset_policy_multi_pane_defers_until_resumed() {
        let records = abc();
        let tracker = viewing("b", &records);
        let mut resolver = AutoAdvanceResolver::new();

        let outcome = resolver.resolve(
            &target("b"),
            &session(AutoAdvance::Unset, Layout::MultiPane),
            &tracker,
            Some(&records),
            || "delete b",
        );
        let AutoAdvanceOutcome::Deferred(token) = outcome else {
            panic!("expected deferral, got {outcome:?}");
        };

        assert_eq!(resolver.parked_token(), Some(token));
        assert_eq!(resolver.resume(ContinuationToken::new()), None);
        assert_eq!(resolver.resume(token), Some("delete b"));
        assert_eq!(resolver.resume(token), None);
    }

    #[test]
    fn dismiss_abandons_the_parked_operation() {
        let records = abc();
        let tracker = viewing("b", &records);
        let mut resolver = AutoAdvanceResolver::new();

        let AutoAdvanceOutcome::Deferred(token) = resolver.resolve(
            &target("b"),
            &session(AutoAdvance::Unset, Layout::MultiPane),
            &tracker,
            Some(&records),
            || 7,
        ) else {
            panic!("expected deferral");
        };

        assert!(resolver.dismiss(token));
        assert!(!resolver.dismiss(token));
        assert_eq!(resolver.parked_token(), None);
    }
}
