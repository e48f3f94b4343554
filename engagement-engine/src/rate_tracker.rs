use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

/// Timestamps of recent reply actions, keyed by the post that was answered.
///
/// Lives in memory only; a restart forgets everything.
#[derive(Debug, Default, Clone)]
pub struct RateTracker {
    actions: HashMap<String, DateTime<Utc>>,
}

impl RateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recording the same post again keeps the later of the two timestamps.
    pub fn record(&mut self, post_id: impl Into<String>, timestamp: DateTime<Utc>) {
        self.actions
            .entry(post_id.into())
            .and_modify(|existing| *existing = (*existing).max(timestamp))
            .or_insert(timestamp);
    }

    /// Number of actions with `now - window <= timestamp <= now`.
    pub fn count_within(&self, window: Duration, now: DateTime<Utc>) -> usize {
        let window_start = now - window;
        self.actions
            .values()
            .filter(|timestamp| **timestamp >= window_start && **timestamp <= now)
            .count()
    }

    pub fn contains(&self, post_id: &str) -> bool {
        self.actions.contains_key(post_id)
    }

    /// Forget actions that fell out of the window, keeping memory bounded.
    pub fn prune(&mut self, window: Duration, now: DateTime<Utc>) -> usize {
        let window_start = now - window;
        let before = self.actions.len();
        self.actions.retain(|_, timestamp| *timestamp >= window_start);
        before - self.actions.len()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_excludes_entries_older_than_window() {
        let now = now();
        let mut tracker = RateTracker::new();
        tracker.record("old", now - Duration::seconds(7300));
        tracker.record("recent", now - Duration::seconds(60));

        assert_eq!(tracker.count_within(Duration::seconds(7200), now), 1);
    }

    #[test]
    fn test_window_boundary_is_inclusive() {
        let now = now();
        let mut tracker = RateTracker::new();
        tracker.record("edge", now - Duration::seconds(7200));

        assert_eq!(tracker.count_within(Duration::seconds(7200), now), 1);
    }

    #[test]
    fn test_recording_never_decreases_count() {
        let now = now();
        let window = Duration::hours(2);
        let mut tracker = RateTracker::new();

        let mut last = tracker.count_within(window, now);
        for minutes in [5, 30, 90, 200] {
            tracker.record(format!("post-{}", minutes), now - Duration::minutes(minutes));
            let current = tracker.count_within(window, now);
            assert!(current >= last);
            last = current;
        }
        assert_eq!(last, 3);
    }

    #[test]
    fn test_rerecording_with_earlier_time_keeps_count() {
        let now = now();
        let window = Duration::hours(2);
        let mut tracker = RateTracker::new();

        tracker.record("a", now);
        assert_eq!(tracker.count_within(window, now), 1);

        tracker.record("a", now - Duration::hours(3));
        assert_eq!(tracker.count_within(window, now), 1);
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn test_count_slides_as_time_advances() {
        let start = now();
        let window = Duration::hours(2);
        let mut tracker = RateTracker::new();
        tracker.record("a", start);
        tracker.record("b", start + Duration::minutes(30));

        assert_eq!(tracker.count_within(window, start + Duration::minutes(30)), 2);
        assert_eq!(tracker.count_within(window, start + Duration::minutes(121)), 1);
        assert_eq!(tracker.count_within(window, start + Duration::minutes(151)), 0);
    }

    #[test]
    fn test_future_entries_are_not_counted() {
        let now = now();
        let mut tracker = RateTracker::new();
        tracker.record("later", now + Duration::minutes(1));
        assert_eq!(tracker.count_within(Duration::hours(2), now), 0);
    }

    #[test]
    fn test_prune_drops_expired_entries() {
        let now = now();
        let mut tracker = RateTracker::new();
        tracker.record("old", now - Duration::hours(3));
        tracker.record("fresh", now - Duration::minutes(10));

        assert_eq!(tracker.prune(Duration::hours(2), now), 1);
        assert!(!tracker.contains("old"));
        assert!(tracker.contains("fresh"));
        assert_eq!(tracker.len(), 1);
    }
}
