//! Reusable bundles of reactive primitives.
//!
//! A module is any type implementing [`ComponentModule`]. Its `setup` receives
//! a [`ModuleContext`] carrying the module's own arguments and a handle on the
//! owning component. Every primitive a module creates is created on that
//! component: the module has no lifecycle of its own, so its effects mount,
//! update and unmount exactly like ones created on the component directly.
//!
//! ```rust,ignore
//! struct Stepper {
//!     count: StateSlot<i64>,
//!     step: i64,
//! }
//!
//! impl ComponentModule for Stepper {
//!     type Args = i64;
//!
//!     fn setup(cx: ModuleContext<i64>) -> Self {
//!         Stepper { count: cx.state(0), step: *cx.args() }
//!     }
//! }
//!
//! let stepper: Stepper = component.module(5);
//! ```

use std::fmt::Debug;
use std::sync::Arc;

use super::instance::HostCore;
use super::props::{PropValue, Props};
use crate::reactive::{
    Cleanup, Computed, Dependency, Deps, Effect, ExternalStore, OnStoreChange, Reducer, SameValue,
    StateSlot, Transitions, Unsubscribe,
};

/// A type that can be built as a module of a component.
pub trait ComponentModule: Sized {
    /// Arguments fixed at construction.
    type Args;

    fn setup(cx: ModuleContext<Self::Args>) -> Self;
}

/// What a module sees of its owning component.
pub struct ModuleContext<A> {
    host: Arc<HostCore>,
    args: Arc<A>,
}

impl<A> ModuleContext<A> {
    pub(crate) fn new(host: Arc<HostCore>, args: A) -> Self {
        Self {
            host,
            args: Arc::new(args),
        }
    }

    pub fn args(&self) -> &A {
        &self.args
    }

    /// The owning component's props as they are now.
    pub fn props(&self) -> Props {
        self.host.props()
    }

    pub fn prop(&self, name: &str) -> Option<PropValue> {
        self.host.prop(name)
    }

    /// A dependency on one of the owning component's props, read live.
    pub fn depend(&self, name: &str) -> Dependency<Option<PropValue>> {
        self.host.depend(name)
    }

    pub fn context(&self, name: &str) -> Option<PropValue> {
        self.host.context(name)
    }

    pub fn state<T>(&self, initial: T) -> StateSlot<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        self.host.state(initial)
    }

    pub fn reducer<T, R>(&self, initial: T, transitions: R) -> Reducer<T, R>
    where
        T: Clone + Send + Sync + 'static,
        R: Transitions<T>,
    {
        self.host.reducer(initial, transitions)
    }

    pub fn effect<F, R>(&self, callback: F, deps: Deps) -> Effect
    where
        F: Fn() -> R + Send + Sync + 'static,
        R: Into<Cleanup>,
    {
        self.host.effect(callback, deps)
    }

    pub fn computed<T, F>(&self, compute: F, deps: Deps) -> Computed<T>
    where
        T: Clone + SameValue + Send + Sync + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.host.computed(compute, deps)
    }

    pub fn external_store<T, S, G>(&self, subscribe: S, get_snapshot: G) -> ExternalStore<T>
    where
        T: Clone + SameValue + Send + Sync + 'static,
        S: Fn(OnStoreChange) -> Unsubscribe + Send + Sync + 'static,
        G: Fn() -> T + Send + Sync + 'static,
    {
        self.host.external_store(subscribe, get_snapshot)
    }

    /// Build a nested module on the same component.
    pub fn module<M: ComponentModule>(&self, args: M::Args) -> M {
        self.host.module(args)
    }
}

impl<A> Clone for ModuleContext<A> {
    fn clone(&self) -> Self {
        Self {
            host: Arc::clone(&self.host),
            args: Arc::clone(&self.args),
        }
    }
}

impl<A: Debug> Debug for ModuleContext<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleContext")
            .field("component", &self.host.options().name)
            .field("args", &self.args)
            .finish()
    }
}
