//! Effect Implementation
//!
//! An Effect is a side-effecting callback tied to the host's lifecycle.
//!
//! # How Effects Work
//!
//! 1. On mount, the effect runs its callback and keeps the returned
//!    [`Cleanup`].
//!
//! 2. On every update, the effect decides whether to rerun, based on its
//!    dependency list:
//!    - no list: rerun on every update;
//!    - empty list: never rerun after the mount run;
//!    - non-empty list: rerun when at least one dependency returns a value
//!      that is not the [`SameValue`](super::SameValue) as the one seen at
//!      the previous check. Every changed value is refreshed before the rerun.
//!
//! 3. On unmount, only the cleanup runs.
//!
//! A rerun always runs the previous cleanup first.
//!
//! # Cancellation
//!
//! [`Effect::cancel`] unregisters from all three phases and runs the pending
//! cleanup (unless told not to). Calling it again does nothing.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use smallvec::SmallVec;

use super::dependency::{refresh_changed, AnyDependency, Deps, Snapshot};
use super::lifecycle::{Lifecycle, WeakLifecycle};
use super::subscriber::SubscriberId;

/// What an effect callback leaves behind to undo itself.
#[derive(Default)]
pub struct Cleanup(Option<Box<dyn FnOnce() + Send>>);

impl Cleanup {
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self(Some(Box::new(f)))
    }

    pub fn none() -> Self {
        Self(None)
    }

    pub fn is_none(&self) -> bool {
        self.0.is_none()
    }

    fn run(self) {
        if let Some(f) = self.0 {
            f();
        }
    }
}

impl From<()> for Cleanup {
    fn from(_: ()) -> Self {
        Self::none()
    }
}

impl From<Option<Cleanup>> for Cleanup {
    fn from(cleanup: Option<Cleanup>) -> Self {
        cleanup.unwrap_or_default()
    }
}

impl std::fmt::Debug for Cleanup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(if self.is_none() { "Cleanup(none)" } else { "Cleanup(..)" })
    }
}

struct EffectCore {
    callback: Box<dyn Fn() -> Cleanup + Send + Sync>,

    deps: Vec<AnyDependency>,

    /// Values seen at the previous dependency check.
    last_known: Mutex<SmallVec<[Snapshot; 4]>>,

    cleanup: Mutex<Cleanup>,

    run_count: AtomicUsize,

    cancelled: AtomicBool,
}

impl EffectCore {
    fn run_cleanup(&self) {
        let cleanup = std::mem::take(&mut *self.cleanup.lock());
        cleanup.run();
    }

    fn run_callback(&self) {
        self.run_cleanup();
        let cleanup = (self.callback)();
        *self.cleanup.lock() = cleanup;
        self.run_count.fetch_add(1, Ordering::SeqCst);
    }

    fn handle_dep_update(&self) {
        let changed = {
            let mut last = self.last_known.lock();
            refresh_changed(&self.deps, &mut last)
        };

        if changed {
            tracing::debug!(
                runs = self.run_count.load(Ordering::SeqCst),
                "effect dependency changed"
            );
            self.run_callback();
        }
    }
}

#[derive(Default)]
struct Registrations {
    mount: Option<SubscriberId>,
    update: Option<SubscriberId>,
    unmount: Option<SubscriberId>,
}

/// A dependency-tracked side effect.
///
/// # Example
///
/// ```rust,ignore
/// let label = component.state(String::from("Click Me"));
///
/// let watched = label.clone();
/// component.effect(
///     move || println!("label is now {}", watched.get()),
///     deps![label],
/// );
/// ```
#[derive(Clone)]
pub struct Effect {
    core: Arc<EffectCore>,
    lifecycle: WeakLifecycle,
    registrations: Arc<Mutex<Registrations>>,
}

impl Effect {
    /// Create an effect and register it with `lifecycle`.
    ///
    /// The callback does not run until the mount notification.
    pub fn new<F, R>(lifecycle: &Lifecycle, callback: F, deps: Deps) -> Self
    where
        F: Fn() -> R + Send + Sync + 'static,
        R: Into<Cleanup>,
    {
        let reacts_to_every_update = deps.is_none();
        let deps = deps.unwrap_or_default();
        let last_known = deps.iter().map(AnyDependency::snapshot).collect();

        let core = Arc::new(EffectCore {
            callback: Box::new(move || callback().into()),
            deps,
            last_known: Mutex::new(last_known),
            cleanup: Mutex::new(Cleanup::none()),
            run_count: AtomicUsize::new(0),
            cancelled: AtomicBool::new(false),
        });

        let mut registrations = Registrations::default();

        let c = core.clone();
        registrations.mount = Some(lifecycle.on_mount(move || c.run_callback()));

        if reacts_to_every_update {
            let c = core.clone();
            registrations.update = Some(lifecycle.on_update(move || c.run_callback()));
        } else if !core.deps.is_empty() {
            let c = core.clone();
            registrations.update = Some(lifecycle.on_update(move || c.handle_dep_update()));
        }

        let c = core.clone();
        registrations.unmount = Some(lifecycle.on_unmount(move || c.run_cleanup()));

        Self {
            core,
            lifecycle: lifecycle.downgrade(),
            registrations: Arc::new(Mutex::new(registrations)),
        }
    }

    /// Unregister from every phase and run the pending cleanup unless
    /// `prevent_cleanup` is set. Subsequent calls do nothing.
    pub fn cancel(&self, prevent_cleanup: bool) {
        if self.core.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }

        let registrations = std::mem::take(&mut *self.registrations.lock());
        if let Some(lifecycle) = self.lifecycle.upgrade() {
            if let Some(id) = registrations.mount {
                lifecycle.off_mount(id);
            }
            if let Some(id) = registrations.update {
                lifecycle.off_update(id);
            }
            if let Some(id) = registrations.unmount {
                lifecycle.off_unmount(id);
            }
        }

        if !prevent_cleanup {
            self.core.run_cleanup();
        }
    }

    /// Run cleanup then the callback right now, outside any lifecycle dispatch.
    ///
    /// Does nothing once the effect is cancelled.
    pub fn force_update(&self) {
        if self.is_cancelled() {
            return;
        }
        self.core.run_callback();
    }

    pub fn is_cancelled(&self) -> bool {
        self.core.cancelled.load(Ordering::SeqCst)
    }

    /// Number of times the callback has run.
    pub fn run_count(&self) -> usize {
        self.core.run_count.load(Ordering::SeqCst)
    }

    pub fn dependency_count(&self) -> usize {
        self.core.deps.len()
    }
}

impl std::fmt::Debug for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Effect")
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{Dependency, Phase};
    use std::sync::atomic::AtomicI32;

    fn counter() -> (Arc<AtomicI32>, Arc<AtomicI32>) {
        let count = Arc::new(AtomicI32::new(0));
        (count.clone(), count)
    }

    #[test]
    fn effect_runs_on_mount_not_on_creation() {
        let lifecycle = Lifecycle::new();
        let (runs, r) = counter();

        let effect = Effect::new(
            &lifecycle,
            move || {
                r.fetch_add(1, Ordering::SeqCst);
            },
            None,
        );

        assert_eq!(runs.load(Ordering::SeqCst), 0);
        lifecycle.mount();
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(effect.run_count(), 1);
    }

    #[test]
    fn no_deps_effect_reruns_on_every_update() {
        let lifecycle = Lifecycle::new();
        let (runs, r) = counter();

        let _effect = Effect::new(
            &lifecycle,
            move || {
                r.fetch_add(1, Ordering::SeqCst);
            },
            None,
        );

        lifecycle.mount();
        lifecycle.update();
        lifecycle.update();
        lifecycle.update();
        assert_eq!(runs.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn empty_deps_effect_runs_exactly_once() {
        let lifecycle = Lifecycle::new();
        let (runs, r) = counter();

        let _effect = Effect::new(
            &lifecycle,
            move || {
                r.fetch_add(1, Ordering::SeqCst);
            },
            Some(vec![]),
        );

        lifecycle.mount();
        for _ in 0..5 {
            lifecycle.update();
        }
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(lifecycle.len(Phase::Update), 0);
    }

    #[test]
    fn deps_effect_reruns_only_on_identity_change() {
        let lifecycle = Lifecycle::new();
        let (runs, r) = counter();
        let source = Arc::new(Mutex::new(Arc::new(vec![1])));

        let reader = source.clone();
        let dep: AnyDependency = Dependency::new(move || reader.lock().clone()).into();
        let _effect = Effect::new(
            &lifecycle,
            move || {
                r.fetch_add(1, Ordering::SeqCst);
            },
            Some(vec![dep]),
        );

        lifecycle.mount();
        lifecycle.update();
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        // Same contents, new allocation.
        *source.lock() = Arc::new(vec![1]);
        lifecycle.update();
        assert_eq!(runs.load(Ordering::SeqCst), 2);

        lifecycle.update();
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn cleanup_runs_before_rerun_and_on_unmount() {
        let lifecycle = Lifecycle::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let l = log.clone();
        let _effect = Effect::new(
            &lifecycle,
            move || {
                l.lock().push("run");
                let l = l.clone();
                Cleanup::new(move || l.lock().push("cleanup"))
            },
            None,
        );

        lifecycle.mount();
        lifecycle.update();
        lifecycle.unmount();

        assert_eq!(*log.lock(), vec!["run", "cleanup", "run", "cleanup"]);
    }

    #[test]
    fn cancel_is_idempotent_and_runs_cleanup_once() {
        let lifecycle = Lifecycle::new();
        let (cleanups, c) = counter();

        let effect = Effect::new(
            &lifecycle,
            move || {
                let c = c.clone();
                Cleanup::new(move || {
                    c.fetch_add(1, Ordering::SeqCst);
                })
            },
            None,
        );

        lifecycle.mount();
        effect.cancel(false);
        effect.cancel(false);

        assert_eq!(cleanups.load(Ordering::SeqCst), 1);
        assert!(effect.is_cancelled());
        assert!(lifecycle.is_empty());

        lifecycle.update();
        lifecycle.unmount();
        assert_eq!(cleanups.load(Ordering::SeqCst), 1);
        assert_eq!(effect.run_count(), 1);
    }

    #[test]
    fn cancel_can_skip_cleanup() {
        let lifecycle = Lifecycle::new();
        let (cleanups, c) = counter();

        let effect = Effect::new(
            &lifecycle,
            move || {
                let c = c.clone();
                Cleanup::new(move || {
                    c.fetch_add(1, Ordering::SeqCst);
                })
            },
            Some(vec![]),
        );

        lifecycle.mount();
        effect.cancel(true);
        lifecycle.unmount();
        assert_eq!(cleanups.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn force_update_reruns_unconditionally() {
        let lifecycle = Lifecycle::new();
        let (runs, r) = counter();

        let effect = Effect::new(
            &lifecycle,
            move || {
                r.fetch_add(1, Ordering::SeqCst);
            },
            Some(vec![]),
        );

        lifecycle.mount();
        effect.force_update();
        effect.force_update();
        assert_eq!(runs.load(Ordering::SeqCst), 3);

        effect.cancel(false);
        effect.force_update();
        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn panicking_effect_does_not_block_siblings() {
        let lifecycle = Lifecycle::new();
        let (runs, r) = counter();

        let _bad = Effect::new::<_, ()>(&lifecycle, || panic!("effect failed"), None);
        let _good = Effect::new(
            &lifecycle,
            move || {
                r.fetch_add(1, Ordering::SeqCst);
            },
            None,
        );

        lifecycle.mount();
        lifecycle.update();
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }
}
