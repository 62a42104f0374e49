use std::sync::atomic::{AtomicU64, Ordering};

use log::debug;

/// Identifies one compression request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionTicket(u64);

impl SessionTicket {
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// A value produced for a particular session.
#[derive(Debug, Clone)]
pub struct Session<T> {
    pub ticket: SessionTicket,
    pub value: T,
}

/// Hands out increasing session ids so late results from superseded
/// requests (e.g. the slider moved again) can be dropped.
#[derive(Debug, Default)]
pub struct SessionTracker {
    latest: AtomicU64,
}

impl SessionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new session, superseding every earlier one.
    pub fn begin(&self) -> SessionTicket {
        SessionTicket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, ticket: &SessionTicket) -> bool {
        self.is_latest(ticket.0)
    }

    /// Same as [`is_current`](Self::is_current) for shells that only keep the raw id.
    pub fn is_latest(&self, id: u64) -> bool {
        self.latest.load(Ordering::SeqCst) == id
    }

    /// Returns the value only if its session has not been superseded.
    pub fn accept<T>(&self, session: Session<T>) -> Option<T> {
        if self.is_current(&session.ticket) {
            Some(session.value)
        } else {
            debug!(
                "Dropping stale result for session {} (latest is {})",
                session.ticket.0,
                self.latest.load(Ordering::SeqCst)
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_increase() {
        let tracker = SessionTracker::new();
        let a = tracker.begin();
        let b = tracker.begin();
        assert!(b > a);
        assert_eq!(a.id(), 1);
        assert_eq!(b.id(), 2);
    }

    #[test]
    fn test_only_latest_is_current() {
        let tracker = SessionTracker::new();
        let first = tracker.begin();
        assert!(tracker.is_current(&first));
        let second = tracker.begin();
        assert!(!tracker.is_current(&first));
        assert!(tracker.is_current(&second));
        assert!(tracker.is_latest(second.id()));
        assert!(!tracker.is_latest(first.id()));
    }

    #[test]
    fn test_stale_results_are_dropped() {
        let tracker = SessionTracker::new();
        let old = tracker.begin();
        let new = tracker.begin();

        // The older request finishes last.
        assert_eq!(tracker.accept(Session { ticket: new, value: "new" }), Some("new"));
        assert_eq!(tracker.accept(Session { ticket: old, value: "old" }), None);
    }
}
