//! Computed Implementation
//!
//! A Computed is a derived value that recomputes on relevant updates and
//! asks the host to re-render only when the result is a different value.
//!
//! # How Computeds Work
//!
//! 1. The derivation runs once at construction; its result is cached.
//!
//! 2. On update notifications the dependency list decides whether to
//!    recompute, exactly like an [`Effect`](super::Effect):
//!    no list recomputes every time, an empty list never recomputes, a
//!    non-empty list recomputes when a dependency changed identity.
//!
//! 3. After recomputing, the new result is compared with the cached one using
//!    [`SameValue`]. Only a different value is stored and triggers
//!    [`Host::force_update`].
//!
//! A computed has no cleanup. It stays registered until the host's
//! lifecycle registry is released.

use std::fmt::{Debug, Display};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use smallvec::SmallVec;

use super::dependency::{
    refresh_changed, AnyDependency, AsDependency, Dependency, Deps, SameValue, Snapshot,
};
use super::lifecycle::Lifecycle;
use crate::host::Host;

struct ComputedCore<T> {
    compute: Box<dyn Fn() -> T + Send + Sync>,

    deps: Vec<AnyDependency>,

    last_known: Mutex<SmallVec<[Snapshot; 4]>>,

    /// The cached value.
    value: RwLock<T>,

    host: Arc<dyn Host>,

    recompute_count: AtomicUsize,
}

impl<T> ComputedCore<T>
where
    T: Clone + SameValue + Send + Sync + 'static,
{
    fn recalculate(&self) {
        let next = (self.compute)();
        self.recompute_count.fetch_add(1, Ordering::SeqCst);

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
            tracing::debug!("computed value changed, requesting re-render");
            self.host.force_update();
        }
    }

    fn handle_dep_update(&self) {
        let changed = {
            let mut last = self.last_known.lock();
            refresh_changed(&self.deps, &mut last)
        };

        if changed {
            self.recalculate();
        }
    }
}

/// A cached derived value.
///
/// # Type Parameters
///
/// - `T`: The derived value. [`SameValue`] decides whether a recomputation
///   produced something new.
pub struct Computed<T> {
    core: Arc<ComputedCore<T>>,
}

impl<T> Computed<T>
where
    T: Clone + SameValue + Send + Sync + 'static,
{
    /// Compute the initial value and register with `lifecycle`.
    pub fn new<F>(lifecycle: &Lifecycle, host: Arc<dyn Host>, compute: F, deps: Deps) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        let reacts_to_every_update = deps.is_none();
        let deps = deps.unwrap_or_default();
        let last_known = deps.iter().map(AnyDependency::snapshot).collect();
        let initial = compute();

        let core = Arc::new(ComputedCore {
            compute: Box::new(compute),
            deps,
            last_known: Mutex::new(last_known),
            value: RwLock::new(initial),
            host,
            recompute_count: AtomicUsize::new(0),
        });

        if reacts_to_every_update {
            let c = core.clone();
            lifecycle.on_update(move || c.recalculate());
        } else if !core.deps.is_empty() {
            let c = core.clone();
            lifecycle.on_update(move || c.handle_dep_update());
        }

        Self { core }
    }

    /// The cached value.
    pub fn get(&self) -> T {
        self.core.value.read().clone()
    }

    /// Number of recomputations since construction, whether or not they
    /// produced a new value.
    pub fn recompute_count(&self) -> usize {
        self.core.recompute_count.load(Ordering::SeqCst)
    }
}

impl<T> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<T> AsDependency for Computed<T>
where
    T: Clone + SameValue + Send + Sync + 'static,
{
    type Value = T;

    fn dependency(&self) -> Dependency<T> {
        let computed = self.clone();
        Dependency::new(move || computed.get())
    }
}

impl<T> Display for Computed<T>
where
    T: Clone + SameValue + Send + Sync + Display + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&*self.core.value.read(), f)
    }
}

impl<T> Debug for Computed<T>
where
    T: Clone + SameValue + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Computed")
            .field("value", &*self.core.value.read())
            .field("recompute_count", &self.recompute_count())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
