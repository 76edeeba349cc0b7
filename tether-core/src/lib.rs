//! Tether Core
//!
//! This crate ties a small reactive runtime to the lifecycle of a single host
//! component instance. It implements:
//!
//! - Named state slots backed by the host's storage record
//! - Dependency-tracked effects with cleanup
//! - Computed values that re-render only when their value changes
//! - Reducers driven by a table of named transitions
//! - A bridge for external subscribable stores
//! - Modules: reusable bundles of primitives that delegate to their component
//!
//! Nothing is tracked automatically. Dependency lists are explicit and change
//! detection is identity-based ([`SameValue`]), never deep equality.
//!
//! # Architecture
//!
//! - `reactive`: the primitives and the lifecycle registry that drives them
//! - `host`: the boundary a UI host implements (storage, merge writer, forced re-render)
//! - `component`: a ready-made host instance with props, contexts and modules
//! - `error`: shared error types
//!
//! # Example
//!
//! ```rust,ignore
//! use tether_core::{deps, Component, Props};
//!
//! let component = Component::new(Props::new().with("label", "Click Me"));
//! let clicks = component.state(0);
//!
//! let seen = clicks.clone();
//! component.effect(move || println!("clicked {} times", seen.get()), deps![clicks]);
//!
//! component.mount();           // prints "clicked 0 times"
//! clicks.update(|n| n + 1);
//! component.settle()?;         // prints "clicked 1 times"
//! ```

pub mod component;
pub mod error;
pub mod host;
pub mod reactive;

pub use component::{
    Component, ComponentBuilder, ComponentModule, ComponentOptions, ContextMap, ModuleContext,
    PropValue, Props,
};
pub use error::{ReactionPanic, Result, TetherError};
pub use host::{Host, StateKey, StatePatch, StateRecord};
pub use reactive::{
    AsDependency, Cleanup, Computed, Dependency, Deps, Effect, ExternalStore, Lifecycle, Phase,
    Reducer, SameValue, StateSlot, Transitions,
};
