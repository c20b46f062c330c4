//! Tracking of recently-seen event ids.

use std::{collections::HashMap, time::Duration};

use tokio::time::Instant;

/// Remembers when each event id was first seen, so re-delivered events are
/// not processed twice within the window.
///
/// The map lives for the whole client lifetime and survives reconnects.
/// After an entry expires, re-delivery is possible and accepted again; the
/// server's replay window is assumed to be no longer than the dedup window.
#[derive(Debug)]
pub(crate) struct Deduplicator {
    window: Duration,
    seen: HashMap<String, Instant>,
}

impl Deduplicator {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            seen: HashMap::new(),
        }
    }

    /// Record `id` if it was not seen within the window.
    ///
    /// Returns false for a duplicate. Events without an id cannot be
    /// deduplicated and always pass.
    pub fn check_and_record(&mut self, id: &str) -> bool {
        if id.is_empty() {
            return true;
        }

        let now = Instant::now();

        match self.seen.get(id) {
            Some(first_seen) if now.duration_since(*first_seen) < self.window => false,
            _ => {
                self.seen.insert(id.to_string(), now);
                true
            }
        }
    }

    /// Drop entries older than the window to bound the map.
    pub fn sweep(&mut self) {
        let now = Instant::now();
        let before = self.seen.len();

        self.seen
            .retain(|_, first_seen| now.duration_since(*first_seen) < self.window);

        log::trace!(
            "Dedup sweep removed {} of {} entries",
            before - self.seen.len(),
            before
        );
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_within_window_rejected() {
        let mut dedup = Deduplicator::new(Duration::from_secs(300));

        assert!(dedup.check_and_record("abc-1"));
        assert!(!dedup.check_and_record("abc-1"));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(!dedup.check_and_record("abc-1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_redelivery_after_window_accepted() {
        let mut dedup = Deduplicator::new(Duration::from_secs(300));

        assert!(dedup.check_and_record("abc-1"));

        tokio::time::advance(Duration::from_secs(301)).await;
        assert!(dedup.check_and_record("abc-1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_bounds_the_map() {
        let mut dedup = Deduplicator::new(Duration::from_secs(300));

        assert!(dedup.check_and_record("old"));
        tokio::time::advance(Duration::from_secs(301)).await;
        assert!(dedup.check_and_record("fresh"));

        dedup.sweep();

        assert_eq!(dedup.seen.len(), 1);
        assert!(dedup.seen.contains_key("fresh"));
    }

    #[test]
    fn test_idless_events_always_pass() {
        let mut dedup = Deduplicator::new(Duration::from_secs(300));

        assert!(dedup.check_and_record(""));
        assert!(dedup.check_and_record(""));
        assert!(dedup.seen.is_empty());
    }
}
