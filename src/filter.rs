//! Event filters for subscribers.

use crate::stream::{EventKind, StreamEvent};

/// Type implements this trait can check if an event is wanted.
pub trait Filter: Send + Sync {
    /// true if event is wanted, otherwise false.
    fn filter_event(&self, event: &StreamEvent) -> bool;
}

impl<F> Filter for F
where
    F: Fn(&StreamEvent) -> bool + Send + Sync,
{
    fn filter_event(&self, event: &StreamEvent) -> bool {
        self(event)
    }
}

/// Negative wrapper of a filter.
#[derive(Debug, Copy, Clone)]
pub struct Not<F> {
    filter: F,
}

impl<F> Filter for Not<F>
where
    F: Filter,
{
    fn filter_event(&self, event: &StreamEvent) -> bool {
        !self.filter.filter_event(event)
    }
}

/// If and only if a and b both pass, this filter will pass.
#[derive(Debug, Copy, Clone)]
pub struct And<FA, FB> {
    a: FA,
    b: FB,
}

impl<FA, FB> Filter for And<FA, FB>
where
    FA: Filter,
    FB: Filter,
{
    fn filter_event(&self, event: &StreamEvent) -> bool {
        self.a.filter_event(event) && self.b.filter_event(event)
    }
}

/// If a or b pass, this filter will pass.
#[derive(Debug, Copy, Clone)]
pub struct Or<FA, FB> {
    a: FA,
    b: FB,
}

impl<FA, FB> Filter for Or<FA, FB>
where
    FA: Filter,
    FB: Filter,
{
    fn filter_event(&self, event: &StreamEvent) -> bool {
        self.a.filter_event(event) || self.b.filter_event(event)
    }
}

/// Filter combinator.
pub trait FilterExt
where
    Self: Sized,
{
    /// Invert a filter.
    fn not(self) -> Not<Self> {
        Not { filter: self }
    }

    /// Return a new filter that pass an event only if self and other both pass it.
    fn and<F>(self, other: F) -> And<Self, F> {
        And { a: self, b: other }
    }

    /// Return a new filter that pass an event if self or other pass it.
    fn or<F>(self, other: F) -> Or<Self, F> {
        Or { a: self, b: other }
    }
}

impl<T> FilterExt for T where T: Filter {}

/// Filter that will pass all events.
#[derive(Debug, Copy, Clone)]
pub struct All;

impl Filter for All {
    fn filter_event(&self, _event: &StreamEvent) -> bool {
        true
    }
}

/// Create a filter that pass all events.
pub fn all() -> All {
    All
}

/// Filter that will reject all events.
#[derive(Debug, Copy, Clone)]
pub struct None;

impl Filter for None {
    fn filter_event(&self, _event: &StreamEvent) -> bool {
        false
    }
}

/// Create a filter that will reject all events.
pub fn none() -> None {
    None
}

/// Filter that passes events of one kind, mirroring the per-type dispatch
/// of the stream contract.
#[derive(Debug, Clone)]
pub struct Kind {
    kind: EventKind,
}

impl Filter for Kind {
    fn filter_event(&self, event: &StreamEvent) -> bool {
        event.kind == self.kind
    }
}

/// Create a filter that passes only events of the given kind.
pub fn kind(kind: EventKind) -> Kind {
    Kind { kind }
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::Utc;

    fn event(kind: EventKind) -> StreamEvent {
        StreamEvent {
            id: "evt-1".to_string(),
            kind,
            timestamp: Utc::now(),
            license_key: "POS-1234-ABCD".to_string(),
            data: serde_json::Value::Null,
        }
    }

    #[test]
    fn test_kind_filter() {
        let filter = kind(EventKind::SubscriptionCancelled);

        assert!(filter.filter_event(&event(EventKind::SubscriptionCancelled)));
        assert!(!filter.filter_event(&event(EventKind::SubscriptionUpdated)));
    }

    #[test]
    fn test_combinators() {
        let cancelled = kind(EventKind::SubscriptionCancelled);
        let revoked = kind(EventKind::LicenseRevoked);

        let either = cancelled.clone().or(revoked);
        assert!(either.filter_event(&event(EventKind::SubscriptionCancelled)));
        assert!(either.filter_event(&event(EventKind::LicenseRevoked)));
        assert!(!either.filter_event(&event(EventKind::Message)));

        let rejected = cancelled.and(none());
        assert!(!rejected.filter_event(&event(EventKind::SubscriptionCancelled)));

        let reject_all = all().not();
        assert!(!reject_all.filter_event(&event(EventKind::Message)));
    }
}
