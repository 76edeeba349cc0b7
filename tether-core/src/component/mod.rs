//! Component shim
//!
//! A [`Component`] is a host instance for the reactive primitives: it keeps
//! the storage record, receives props and contexts, and drives the lifecycle
//! registry. Embedders that already have a UI host implement
//! [`Host`](crate::host::Host) themselves; everything else (and every test in
//! this crate) uses `Component`.
//!
//! # Driving a component
//!
//! ```rust,ignore
//! let component = Component::builder()
//!     .props(Props::new().with("label", "Click Me"))
//!     .name("button")
//!     .build();
//!
//! let label = component.state(String::from("Click Me"));
//! component.mount();
//!
//! label.set(String::from("Clicked"));
//! component.settle()?;
//! ```
//!
//! Writes queue until [`Component::commit`]; a commit applies them in call
//! order, then dispatches a single update notification.

mod instance;
pub mod module;
pub mod props;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use self::instance::{HostCore, Status};
use crate::error::Result;
use crate::reactive::{
    Cleanup, Computed, Dependency, Deps, Effect, ExternalStore, Lifecycle, OnStoreChange, Reducer,
    SameValue, StateSlot, Transitions, Unsubscribe,
};

pub use module::{ComponentModule, ModuleContext};
pub use props::{ContextMap, PropDependencies, PropValue, Props};

/// Per-component configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComponentOptions {
    /// Attached to every log line and span the component emits.
    pub name: String,

    /// Skip re-rendering when delivered props and contexts are shallow-same.
    pub pure: bool,

    /// Upper bound on render passes in one [`Component::settle`].
    pub max_render_passes: usize,
}

impl Default for ComponentOptions {
    fn default() -> Self {
        Self {
            name: "component".to_string(),
            pure: false,
            max_render_passes: 64,
        }
    }
}

/// Builds a [`Component`].
#[derive(Debug, Default)]
pub struct ComponentBuilder {
    props: Props,
    contexts: ContextMap,
    options: ComponentOptions,
}

impl ComponentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn props(mut self, props: Props) -> Self {
        self.props = props;
        self
    }

    pub fn prop(mut self, name: impl Into<String>, value: impl Into<PropValue>) -> Self {
        self.props.insert(name, value);
        self
    }

    /// Inject one context entry.
    pub fn context(mut self, name: impl Into<String>, value: impl Into<PropValue>) -> Self {
        self.contexts.insert(name, value);
        self
    }

    pub fn contexts(mut self, contexts: ContextMap) -> Self {
        self.contexts = contexts;
        self
    }

    pub fn options(mut self, options: ComponentOptions) -> Self {
        self.options = options;
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.options.name = name.into();
        self
    }

    pub fn pure(mut self, pure: bool) -> Self {
        self.options.pure = pure;
        self
    }

    pub fn max_render_passes(mut self, passes: usize) -> Self {
        self.options.max_render_passes = passes;
        self
    }

    pub fn build(self) -> Component {
        let mut options = self.options;
        options.max_render_passes = options.max_render_passes.max(1);
        Component {
            core: HostCore::new(options, self.props, self.contexts),
        }
    }
}

/// A host instance owning the reactive primitives created on it.
///
/// Dropping the component releases every lifecycle registration, and with
/// them the primitives' callbacks.
pub struct Component {
    core: Arc<HostCore>,
}

impl Component {
    pub fn new(props: Props) -> Self {
        Self::builder().props(props).build()
    }

    pub fn builder() -> ComponentBuilder {
        ComponentBuilder::new()
    }

    pub fn name(&self) -> &str {
        &self.core.options().name
    }

    pub fn options(&self) -> &ComponentOptions {
        self.core.options()
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        self.core.lifecycle()
    }

    // ------------------------------------------------------------------
    // Primitives
    // ------------------------------------------------------------------

    pub fn state<T>(&self, initial: T) -> StateSlot<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        self.core.state(initial)
    }

    pub fn state_default<T>(&self) -> StateSlot<T>
    where
        T: Clone + Default + Send + Sync + 'static,
    {
        self.core.state(T::default())
    }

    pub fn reducer<T, R>(&self, initial: T, transitions: R) -> Reducer<T, R>
    where
        T: Clone + Send + Sync + 'static,
        R: Transitions<T>,
    {
        self.core.reducer(initial, transitions)
    }

    pub fn reducer_default<T, R>(&self, transitions: R) -> Reducer<T, R>
    where
        T: Clone + Default + Send + Sync + 'static,
        R: Transitions<T>,
    {
        self.core.reducer(T::default(), transitions)
    }

    /// Register an effect. See [`Effect::new`] for how `deps` is read.
    pub fn effect<F, R>(&self, callback: F, deps: Deps) -> Effect
    where
        F: Fn() -> R + Send + Sync + 'static,
        R: Into<Cleanup>,
    {
        self.core.effect(callback, deps)
    }

    pub fn computed<T, F>(&self, compute: F, deps: Deps) -> Computed<T>
    where
        T: Clone + SameValue + Send + Sync + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.core.computed(compute, deps)
    }

    pub fn external_store<T, S, G>(&self, subscribe: S, get_snapshot: G) -> ExternalStore<T>
    where
        T: Clone + SameValue + Send + Sync + 'static,
        S: Fn(OnStoreChange) -> Unsubscribe + Send + Sync + 'static,
        G: Fn() -> T + Send + Sync + 'static,
    {
        self.core.external_store(subscribe, get_snapshot)
    }

    pub fn module<M: ComponentModule>(&self, args: M::Args) -> M {
        self.core.module(args)
    }

    /// A dependency on the prop called `name`, for effect and computed lists.
    pub fn depend(&self, name: &str) -> Dependency<Option<PropValue>> {
        self.core.depend(name)
    }

    pub fn props(&self) -> Props {
        self.core.props()
    }

    pub fn prop(&self, name: &str) -> Option<PropValue> {
        self.core.prop(name)
    }

    pub fn context(&self, name: &str) -> Option<PropValue> {
        self.core.context(name)
    }

    // ------------------------------------------------------------------
    // Driver
    // ------------------------------------------------------------------

    /// Dispatch the mount notification. Only the first call has an effect.
    pub fn mount(&self) {
        self.core.mount();
    }

    /// Apply queued writes and dispatch one update notification.
    ///
    /// Returns `false` when there was nothing to render. Before mount the
    /// writes still apply but no notification is sent.
    pub fn commit(&self) -> bool {
        self.core.commit()
    }

    /// Commit until nothing is queued. Returns the number of render passes.
    ///
    /// Fails with [`TetherError::RenderLoop`](crate::TetherError::RenderLoop)
    /// when reactions keep writing past
    /// [`ComponentOptions::max_render_passes`].
    pub fn settle(&self) -> Result<usize> {
        self.core.settle()
    }

    /// Deliver new props and commit. Returns whether a render pass happened.
    pub fn rerender(&self, props: Props) -> bool {
        self.core.deliver(props, None)
    }

    /// Deliver new props and contexts and commit.
    pub fn rerender_with(&self, props: Props, contexts: ContextMap) -> bool {
        self.core.deliver(props, Some(contexts))
    }

    /// Dispatch the unmount notification. Later writes are ignored.
    pub fn unmount(&self) {
        self.core.unmount();
    }

    /// Whether writes or a forced re-render are waiting for a commit.
    pub fn needs_render(&self) -> bool {
        self.core.has_pending_work()
    }

    pub fn is_mounted(&self) -> bool {
        self.core.status() == Status::Mounted
    }

    pub fn is_unmounted(&self) -> bool {
        self.core.status() == Status::Unmounted
    }
}

impl Drop for Component {
    fn drop(&mut self) {
        self.core.lifecycle().clear();
    }
}

impl std::fmt::Debug for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Component")
            .field("name", &self.name())
            .field("status", &self.core.status())
            .field("lifecycle", self.lifecycle())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deps;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, impl Fn() + Send + Sync + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        (count, move || {
            c.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn options_default_and_deserialize() {
        let options: ComponentOptions =
            serde_json::from_str(r#"{ "name": "list", "pure": true }"#).expect("valid options");
        assert_eq!(options.name, "list");
        assert!(options.pure);
        assert_eq!(options.max_render_passes, ComponentOptions::default().max_render_passes);
    }

    #[test]
    fn builder_sets_props_contexts_and_options() {
        let component = Component::builder()
            .prop("value", 3)
            .context("theme", "dark")
            .name("button")
            .max_render_passes(0)
            .build();

        assert_eq!(component.name(), "button");
        assert_eq!(component.options().max_render_passes, 1);
        assert_eq!(component.prop("value").and_then(|v| v.as_i64()), Some(3));
        assert_eq!(
            component.context("theme").and_then(|v| v.as_str().map(String::from)),
            Some("dark".into())
        );
    }

    #[test]
    fn mount_is_dispatched_once() {
        let component = Component::new(Props::new());
        let (runs, bump) = counter();
        component.effect(bump, deps![]);

        component.mount();
        component.mount();
        assert!(component.is_mounted());
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn context_change_refreshes_and_rerenders() {
        let component = Component::builder().context("theme", "light").build();
        let seen = Arc::new(Mutex::new(Vec::new()));
        component.mount();

        let core = component.core.clone();
        let log = seen.clone();
        component.effect(
            move || {
                let theme = core.context("theme").map(|v| v.to_string());
                log.lock().push(theme);
            },
            None,
        );

        let contexts = ContextMap::new().with("theme", "dark");
        assert!(component.rerender_with(Props::new(), contexts));
        assert_eq!(component.context("theme").map(|v| v.to_string()).as_deref(), Some("dark"));
        assert!(component.needs_render());

        assert_eq!(component.settle().expect("settles"), 1);
        assert_eq!(seen.lock().len(), 2);
        assert!(seen.lock().iter().all(|t| t.as_deref() == Some("dark")));
    }

    #[test]
    fn pure_component_skips_identical_props() {
        let component = Component::builder().prop("value", 1).pure(true).build();
        let (renders, bump) = counter();
        component.effect(bump, None);
        component.mount();

        assert_eq!(renders.load(Ordering::SeqCst), 1);

        assert!(!component.rerender(Props::new().with("value", 1)));
        assert_eq!(renders.load(Ordering::SeqCst), 1);

        assert!(component.rerender(Props::new().with("value", 2)));
        assert_eq!(renders.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn pure_component_renders_when_state_is_queued() {
        let component = Component::builder().prop("value", 1).pure(true).build();
        let count = component.state(0);
        component.mount();

        count.set(5);
        assert!(component.rerender(Props::new().with("value", 1)));
        assert_eq!(count.get(), 5);
    }

    #[test]
    fn drop_releases_registrations() {
        let component = Component::new(Props::new());
        let count = component.state(0);
        let c = count.clone();
        component.effect(
            move || {
                let _ = c.get();
            },
            deps![count],
        );

        let lifecycle = component.lifecycle().clone();
        assert!(!lifecycle.is_empty());
        drop(component);
        assert!(lifecycle.is_empty());
    }
}
