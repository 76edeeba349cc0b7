//! Subscriber types for the lifecycle registry.
//!
//! A Subscriber is one callback registered against one lifecycle phase.
//! Closures have no identity of their own, so every registration is handed a
//! [`SubscriberId`] and removal goes through that id.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Unique identifier for a lifecycle registration.
///
/// Each registration gets a unique ID when created. The ID is what
/// `off_mount`/`off_update`/`off_unmount` match against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A callback registered for one lifecycle phase.
///
/// Cloning shares the callback and the liveness flag, which is how a
/// dispatch snapshot learns that an entry was removed mid-walk.
#[derive(Clone)]
pub(crate) struct Subscriber {
    id: SubscriberId,
    notify: Arc<dyn Fn() + Send + Sync>,
    live: Arc<AtomicBool>,
}

impl Subscriber {
    pub(crate) fn new<F>(notify: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            id: SubscriberId::new(),
            notify: Arc::new(notify),
            live: Arc::new(AtomicBool::new(true)),
        }
    }

    pub(crate) fn id(&self) -> SubscriberId {
        self.id
    }

    pub(crate) fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    pub(crate) fn retire(&self) {
        self.live.store(false, Ordering::SeqCst);
    }

    pub(crate) fn notify(&self) {
        (self.notify)();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscriber_ids_are_unique() {
        let id1 = SubscriberId::new();
        let id2 = SubscriberId::new();
        let id3 = SubscriberId::new();

        assert_ne!(id1, id2);
        assert_ne!(id2, id3);
        assert_ne!(id1, id3);
    }

    #[test]
    fn subscriber_notify_calls_callback() {
        let called = Arc::new(AtomicBool::new(false));
        let called_clone = called.clone();

        let subscriber = Subscriber::new(move || {
            called_clone.store(true, Ordering::SeqCst);
        });

        assert!(!called.load(Ordering::SeqCst));
        subscriber.notify();
        assert!(called.load(Ordering::SeqCst));
    }

    #[test]
    fn retired_subscriber_is_seen_through_clones() {
        let subscriber = Subscriber::new(|| {});
        let snapshot = subscriber.clone();

        assert!(snapshot.is_live());
        subscriber.retire();
        assert!(!snapshot.is_live());
    }
}
