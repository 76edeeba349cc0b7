//! External Store Bridge
//!
//! Adapts a value source living outside the component (a global store, a
//! channel, a cache) into the same contract as a state slot: readers get a
//! consistent cached snapshot and the host re-renders when the source hands
//! out a different value.
//!
//! The source is described by two functions:
//!
//! - `subscribe(on_change) -> unsubscribe`, called once at mount through an
//!   effect with an empty dependency list; the returned unsubscribe runs at
//!   unmount.
//! - `get_snapshot() -> T`, read at construction and on every change
//!   notification.
//!
//! A notification whose snapshot is the [`SameValue`] as the cached one is
//! dropped without a re-render.

use std::fmt::{Debug, Display};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tokio::sync::watch;

use super::dependency::{AsDependency, Dependency, SameValue};
use super::effect::{Cleanup, Effect};
use super::lifecycle::Lifecycle;
use crate::host::Host;

/// Change callback handed to a store's `subscribe` function.
pub type OnStoreChange = Arc<dyn Fn() + Send + Sync>;

/// Teardown returned by a store's `subscribe` function.
pub type Unsubscribe = Box<dyn FnOnce() + Send>;

struct StoreCore<T> {
    get_snapshot: Box<dyn Fn() -> T + Send + Sync>,
    value: RwLock<T>,
    host: Arc<dyn Host>,
}

impl<T> StoreCore<T>
where
    T: Clone + SameValue + Send + Sync + 'static,
{
    fn handle_update(&self) {
        let next = (self.get_snapshot)();

        let changed = {
            let mut value = self.value.write();
            if value.same_value(&next) {
                false
            } else {
                *value = next;
                true
            }
        };

        if changed {
            tracing::debug!("external store changed, requesting re-render");
            self.host.force_update();
        }
    }
}

/// A cached view of an external subscribable source.
pub struct ExternalStore<T> {
    core: Arc<StoreCore<T>>,
    subscription: Effect,
}

impl<T> ExternalStore<T>
where
    T: Clone + SameValue + Send + Sync + 'static,
{
    pub fn new<S, G>(
        lifecycle: &Lifecycle,
        host: Arc<dyn Host>,
        subscribe: S,
        get_snapshot: G,
    ) -> Self
    where
        S: Fn(OnStoreChange) -> Unsubscribe + Send + Sync + 'static,
        G: Fn() -> T + Send + Sync + 'static,
    {
        let initial = get_snapshot();
        let core = Arc::new(StoreCore {
            get_snapshot: Box::new(get_snapshot),
            value: RwLock::new(initial),
            host,
        });

        let weak: Weak<StoreCore<T>> = Arc::downgrade(&core);
        let subscription = Effect::new(
            lifecycle,
            move || {
                let target = weak.clone();
                let on_change: OnStoreChange = Arc::new(move || {
                    if let Some(core) = target.upgrade() {
                        core.handle_update();
                    }
                });
                Cleanup::new(subscribe(on_change))
            },
            Some(Vec::new()),
        );

        Self { core, subscription }
    }

    /// The cached snapshot. Stable between change notifications.
    pub fn get(&self) -> T {
        self.core.value.read().clone()
    }

    /// Tear the subscription down ahead of unmount.
    pub fn unsubscribe(&self) {
        self.subscription.cancel(false);
    }
}

impl<T> Clone for ExternalStore<T> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
            subscription: self.subscription.clone(),
        }
    }
}

impl<T> AsDependency for ExternalStore<T>
where
    T: Clone + SameValue + Send + Sync + 'static,
{
    type Value = T;

    fn dependency(&self) -> Dependency<T> {
        let store = self.clone();
        Dependency::new(move || store.get())
    }
}

impl<T> Display for ExternalStore<T>
where
    T: Clone + SameValue + Send + Sync + Display + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&*self.core.value.read(), f)
    }
}

impl<T> Debug for ExternalStore<T>
where
    T: Clone + SameValue + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExternalStore")
            .field("value", &*self.core.value.read())
            .field("subscription", &self.subscription)
            .finish()
    }
}

/// Adapt a `tokio::sync::watch` channel into a subscribe/get-snapshot pair.
///
/// Subscribing spawns a task on the current tokio runtime that forwards
/// every change; unsubscribing aborts it. A value sent between construction
/// and mount is forwarded as soon as the task starts. Mounting outside a
/// runtime panics inside the mount callback, which the lifecycle logs.
pub fn watch_source<T>(
    rx: watch::Receiver<T>,
) -> (
    impl Fn(OnStoreChange) -> Unsubscribe + Send + Sync + 'static,
    impl Fn() -> T + Send + Sync + 'static,
)
where
    T: Clone + Send + Sync + 'static,
{
    let snapshot_rx = rx.clone();

    let subscribe = move |on_change: OnStoreChange| -> Unsubscribe {
        let mut rx = rx.clone();
        let task = tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                on_change();
            }
        });
        Box::new(move || task.abort())
    };

    let get_snapshot = move || snapshot_rx.borrow().clone();

    (subscribe, get_snapshot)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
