//! The host instance behind a [`Component`](super::Component).
//!
//! `HostCore` owns the storage record, the pending write queue, the props
//! and contexts and the lifecycle registry. Writes queue up until the driver
//! commits; a commit applies them in order and then dispatches one update
//! notification, the way a UI host re-renders and then notifies.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use super::module::{ComponentModule, ModuleContext};
use super::props::{ContextMap, PropDependencies, PropValue, Props};
use super::ComponentOptions;
use crate::error::{ReactionPanic, Result, TetherError};
use crate::host::{Host, StateKey, StatePatch, StateRecord, StoredValue};
use crate::reactive::{
    Cleanup, Computed, Dependency, Deps, Effect, ExternalStore, Lifecycle, OnStoreChange, Phase,
    Reducer, SameValue, StateSlot, Transitions, Unsubscribe,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Status {
    Created,
    Mounted,
    Unmounted,
}

pub(crate) struct HostCore {
    options: ComponentOptions,
    lifecycle: Lifecycle,

    record: RwLock<StateRecord>,
    pending: Mutex<Vec<StatePatch>>,
    render_requested: AtomicBool,
    next_state_id: AtomicU64,
    status: Mutex<Status>,

    props: Arc<RwLock<Props>>,
    prop_deps: PropDependencies,

    /// Contexts as last delivered by the driver.
    delivered_contexts: RwLock<ContextMap>,
    /// Contexts as seen by readers, refreshed on update notifications.
    contexts: RwLock<ContextMap>,
}

impl HostCore {
    pub(crate) fn new(options: ComponentOptions, props: Props, contexts: ContextMap) -> Arc<Self> {
        let props = Arc::new(RwLock::new(props));
        let core = Arc::new(Self {
            options,
            lifecycle: Lifecycle::new(),
            record: RwLock::new(StateRecord::new()),
            pending: Mutex::new(Vec::new()),
            render_requested: AtomicBool::new(false),
            next_state_id: AtomicU64::new(1),
            status: Mutex::new(Status::Created),
            prop_deps: PropDependencies::new(props.clone()),
            props,
            delivered_contexts: RwLock::new(contexts.clone()),
            contexts: RwLock::new(contexts),
        });

        let weak = Arc::downgrade(&core);
        core.lifecycle.on_update(move || {
            if let Some(core) = weak.upgrade() {
                core.refresh_contexts();
            }
        });

        core
    }

    pub(crate) fn options(&self) -> &ComponentOptions {
        &self.options
    }

    pub(crate) fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    pub(crate) fn status(&self) -> Status {
        *self.status.lock()
    }

    fn next_key(&self) -> StateKey {
        StateKey::new(self.next_state_id.fetch_add(1, Ordering::SeqCst))
    }

    fn as_host(self: &Arc<Self>) -> Arc<dyn Host> {
        self.clone()
    }

    // ------------------------------------------------------------------
    // Primitive entry points
    // ------------------------------------------------------------------

    pub(crate) fn state<T>(self: &Arc<Self>, initial: T) -> StateSlot<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        StateSlot::new(&self.lifecycle, self.as_host(), self.next_key(), initial)
    }

    pub(crate) fn reducer<T, R>(self: &Arc<Self>, initial: T, transitions: R) -> Reducer<T, R>
    where
        T: Clone + Send + Sync + 'static,
        R: Transitions<T>,
    {
        Reducer::new(self.state(initial), transitions)
    }

    pub(crate) fn effect<F, R>(&self, callback: F, deps: Deps) -> Effect
    where
        F: Fn() -> R + Send + Sync + 'static,
        R: Into<Cleanup>,
    {
        Effect::new(&self.lifecycle, callback, deps)
    }

    pub(crate) fn computed<T, F>(self: &Arc<Self>, compute: F, deps: Deps) -> Computed<T>
    where
        T: Clone + SameValue + Send + Sync + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        Computed::new(&self.lifecycle, self.as_host(), compute, deps)
    }

    pub(crate) fn external_store<T, S, G>(
        self: &Arc<Self>,
        subscribe: S,
        get_snapshot: G,
    ) -> ExternalStore<T>
    where
        T: Clone + SameValue + Send + Sync + 'static,
        S: Fn(OnStoreChange) -> Unsubscribe + Send + Sync + 'static,
        G: Fn() -> T + Send + Sync + 'static,
    {
        ExternalStore::new(&self.lifecycle, self.as_host(), subscribe, get_snapshot)
    }

    pub(crate) fn module<M: ComponentModule>(self: &Arc<Self>, args: M::Args) -> M {
        tracing::trace!(
            component = %self.options.name,
            module = std::any::type_name::<M>(),
            "module setup"
        );
        M::setup(ModuleContext::new(self.clone(), args))
    }

    pub(crate) fn depend(&self, name: &str) -> Dependency<Option<PropValue>> {
        self.prop_deps.dependency_for(name)
    }

    pub(crate) fn props(&self) -> Props {
        self.props.read().clone()
    }

    pub(crate) fn prop(&self, name: &str) -> Option<PropValue> {
        self.props.read().get(name).cloned()
    }

    pub(crate) fn context(&self, name: &str) -> Option<PropValue> {
        self.contexts.read().get(name).cloned()
    }

    // ------------------------------------------------------------------
    // Driver
    // ------------------------------------------------------------------

    pub(crate) fn mount(&self) {
        {
            let mut status = self.status.lock();
            if *status != Status::Created {
                tracing::debug!(
                    component = %self.options.name,
                    status = ?*status,
                    "ignoring mount"
                );
                return;
            }
            *status = Status::Mounted;
        }
        tracing::debug!(component = %self.options.name, "mount");
        self.lifecycle.mount();
    }

    pub(crate) fn has_pending_work(&self) -> bool {
        !self.pending.lock().is_empty() || self.render_requested.load(Ordering::SeqCst)
    }

    /// Apply queued writes and, once mounted, dispatch one update
    /// notification. Returns whether a render pass happened.
    pub(crate) fn commit(&self) -> bool {
        let status = self.status();
        if status == Status::Unmounted {
            return false;
        }

        let patches = std::mem::take(&mut *self.pending.lock());
        let requested = self.render_requested.swap(false, Ordering::SeqCst);
        if patches.is_empty() && !requested {
            return false;
        }

        let span = tracing::debug_span!(
            "commit",
            component = %self.options.name,
            patches = patches.len()
        );
        let _enter = span.enter();

        let mut working = self.record.read().clone();
        for patch in patches {
            let applied = panic::catch_unwind(AssertUnwindSafe(|| patch.apply_to(&mut working)));
            if let Err(payload) = applied {
                let fault = ReactionPanic::from_payload(Phase::Update, payload);
                tracing::error!(component = %self.options.name, "state write dropped: {fault}");
            }
        }
        *self.record.write() = working;

        if status == Status::Mounted {
            self.lifecycle.update();
        }
        true
    }

    pub(crate) fn settle(&self) -> Result<usize> {
        let mut passes = 0;
        while self.commit() {
            passes += 1;
            if passes >= self.options.max_render_passes && self.has_pending_work() {
                tracing::warn!(component = %self.options.name, passes, "render loop detected");
                return Err(TetherError::RenderLoop { passes });
            }
        }
        Ok(passes)
    }

    /// Deliver new props (and optionally contexts) and commit.
    pub(crate) fn deliver(&self, props: Props, contexts: Option<ContextMap>) -> bool {
        if self.status() == Status::Unmounted {
            return false;
        }

        if self.options.pure && !self.has_pending_work() {
            let same_props = self.props.read().shallow_same(&props);
            let same_contexts = contexts
                .as_ref()
                .map_or(true, |next| self.delivered_contexts.read().shallow_same(next));
            if same_props && same_contexts {
                tracing::trace!(component = %self.options.name, "props unchanged, skipping render");
                return false;
            }
        }

        *self.props.write() = props;
        if let Some(contexts) = contexts {
            *self.delivered_contexts.write() = contexts;
        }
        self.render_requested.store(true, Ordering::SeqCst);
        self.commit()
    }

    pub(crate) fn unmount(&self) {
        {
            let mut status = self.status.lock();
            if *status == Status::Unmounted {
                return;
            }
            *status = Status::Unmounted;
        }
        tracing::debug!(component = %self.options.name, "unmount");
        self.pending.lock().clear();
        self.render_requested.store(false, Ordering::SeqCst);
        self.lifecycle.unmount();
    }

    fn refresh_contexts(&self) {
        let delivered = self.delivered_contexts.read().clone();
        if self.contexts.read().shallow_same(&delivered) {
            return;
        }
        tracing::debug!(component = %self.options.name, "context changed, requesting re-render");
        *self.contexts.write() = delivered;
        self.force_update();
    }
}

impl Host for HostCore {
    fn read_state(&self, key: StateKey) -> Option<StoredValue> {
        self.record.read().get(key).cloned()
    }

    fn init_state(&self, key: StateKey, value: StoredValue) {
        self.record.write().insert_stored(key, value);
    }

    fn set_state(&self, patch: StatePatch) {
        if self.status() == Status::Unmounted {
            tracing::debug!(component = %self.options.name, "dropping write after unmount");
            return;
        }
        self.pending.lock().push(patch);
    }

    fn force_update(&self) {
        if self.status() == Status::Unmounted {
            return;
        }
        self.render_requested.store(true, Ordering::SeqCst);
    }
}
