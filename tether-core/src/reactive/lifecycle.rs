//! Lifecycle Registry
//!
//! Ordered callback lists for the three phases a host instance goes through:
//! mount, update and unmount. The host calls [`Lifecycle::mount`],
//! [`Lifecycle::update`] and [`Lifecycle::unmount`]; every reactive primitive
//! hooks itself in through the `on_*` methods.
//!
//! # Dispatch
//!
//! Dispatch walks a snapshot of the phase's registrations taken when the
//! dispatch starts. Before each entry runs, its liveness flag is checked:
//!
//! - a callback removing itself never causes the next one to be skipped;
//! - a callback removing a later entry prevents that entry from running;
//! - entries registered during dispatch first run on the next dispatch.
//!
//! No lock is held while a callback runs, so callbacks are free to register
//! and unregister on the same registry.
//!
//! # Fault Isolation
//!
//! Each callback runs under `catch_unwind`. A panic is logged with
//! `tracing::error!` and dispatch continues with the remaining callbacks.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use super::subscriber::{Subscriber, SubscriberId};
use crate::error::ReactionPanic;

/// One of the three lifecycle phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Mount,
    Update,
    Unmount,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Phase::Mount => "mount",
            Phase::Update => "update",
            Phase::Unmount => "unmount",
        })
    }
}

#[derive(Default)]
struct Registry {
    mount: RwLock<Vec<Subscriber>>,
    update: RwLock<Vec<Subscriber>>,
    unmount: RwLock<Vec<Subscriber>>,
}

impl Registry {
    fn list(&self, phase: Phase) -> &RwLock<Vec<Subscriber>> {
        match phase {
            Phase::Mount => &self.mount,
            Phase::Update => &self.update,
            Phase::Unmount => &self.unmount,
        }
    }
}

/// The per-host lifecycle registry.
///
/// Cloning is cheap and shares the underlying registrations.
#[derive(Clone, Default)]
pub struct Lifecycle {
    inner: Arc<Registry>,
}

/// A non-owning reference to a [`Lifecycle`].
///
/// Primitives that need to unregister themselves later hold one of these so
/// that the registry and the primitive do not keep each other alive.
#[derive(Clone, Default)]
pub struct WeakLifecycle {
    inner: Weak<Registry>,
}

impl WeakLifecycle {
    pub fn upgrade(&self) -> Option<Lifecycle> {
        self.inner.upgrade().map(|inner| Lifecycle { inner })
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn downgrade(&self) -> WeakLifecycle {
        WeakLifecycle {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Register `callback` for `phase`, after every existing registration.
    pub fn on<F>(&self, phase: Phase, callback: F) -> SubscriberId
    where
        F: Fn() + Send + Sync + 'static,
    {
        let subscriber = Subscriber::new(callback);
        let id = subscriber.id();
        self.inner.list(phase).write().push(subscriber);
        id
    }

    /// Remove the registration `id` from `phase`.
    ///
    /// Returns `false` if it was not registered there. Safe to call from
    /// inside a running callback.
    pub fn off(&self, phase: Phase, id: SubscriberId) -> bool {
        let mut list = self.inner.list(phase).write();
        match list.iter().position(|s| s.id() == id) {
            Some(index) => {
                list.remove(index).retire();
                true
            }
            None => false,
        }
    }

    pub fn on_mount<F>(&self, callback: F) -> SubscriberId
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on(Phase::Mount, callback)
    }

    pub fn on_update<F>(&self, callback: F) -> SubscriberId
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on(Phase::Update, callback)
    }

    pub fn on_unmount<F>(&self, callback: F) -> SubscriberId
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on(Phase::Unmount, callback)
    }

    pub fn off_mount(&self, id: SubscriberId) -> bool {
        self.off(Phase::Mount, id)
    }

    pub fn off_update(&self, id: SubscriberId) -> bool {
        self.off(Phase::Update, id)
    }

    pub fn off_unmount(&self, id: SubscriberId) -> bool {
        self.off(Phase::Unmount, id)
    }

    pub fn mount(&self) {
        self.dispatch(Phase::Mount);
    }

    pub fn update(&self) {
        self.dispatch(Phase::Update);
    }

    pub fn unmount(&self) {
        self.dispatch(Phase::Unmount);
    }

    /// Number of callbacks currently registered for `phase`.
    pub fn len(&self, phase: Phase) -> usize {
        self.inner.list(phase).read().len()
    }

    pub fn is_empty(&self) -> bool {
        [Phase::Mount, Phase::Update, Phase::Unmount]
            .into_iter()
            .all(|phase| self.len(phase) == 0)
    }

    /// Drop every registration. Used when the owning host goes away.
    pub(crate) fn clear(&self) {
        for phase in [Phase::Mount, Phase::Update, Phase::Unmount] {
            let drained: Vec<Subscriber> = self.inner.list(phase).write().drain(..).collect();
            for subscriber in &drained {
                subscriber.retire();
            }
        }
    }

    fn dispatch(&self, phase: Phase) {
        let snapshot: Vec<Subscriber> = self.inner.list(phase).read().clone();

        for subscriber in snapshot {
            if !subscriber.is_live() {
                continue;
            }

            let outcome = catch_unwind(AssertUnwindSafe(|| subscriber.notify()));

            if let Err(payload) = outcome {
                let fault = ReactionPanic::from_payload(phase, payload);
                tracing::error!(
                    phase = %phase,
                    subscriber = %subscriber.id(),
                    "{}",
                    fault
                );
            }
        }
    }
}

impl std::fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lifecycle")
            .field("mount", &self.len(Phase::Mount))
            .field("update", &self.len(Phase::Update))
            .field("unmount", &self.len(Phase::Unmount))
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
