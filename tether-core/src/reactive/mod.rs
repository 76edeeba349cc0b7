//! Reactive Primitives
//!
//! This module implements the reactive core a host component carries:
//! state slots, effects, computed values, reducers and external stores, all
//! driven by one lifecycle registry per host instance.
//!
//! # Concepts
//!
//! ## Lifecycle
//!
//! The host notifies its [`Lifecycle`] at mount, after every re-render
//! commit, and before teardown. Every primitive that reacts to anything does
//! so through a registration on that registry.
//!
//! ## State Slots
//!
//! A [`StateSlot`] is a key into the host's storage record. Writes go through
//! the host, which re-renders and then dispatches the next update
//! notification.
//!
//! ## Effects and Computeds
//!
//! An [`Effect`] runs a callback at mount and, depending on its dependency
//! list, again on updates. A [`Computed`] recomputes a derived value under the
//! same rules and asks the host to re-render when the value changed.
//!
//! ## Dependencies
//!
//! Dependency lists hold [`AnyDependency`] values. Change detection is
//! identity-based ([`SameValue`]), never deep equality.
//!
//! # Implementation Notes
//!
//! There is no automatic dependency tracking: dependencies are listed
//! explicitly, and nothing runs outside of the host's lifecycle
//! notifications. Everything is synchronous.

mod computed;
mod dependency;
mod effect;
mod external_store;
mod lifecycle;
mod reducer;
mod state;
mod subscriber;

pub use computed::Computed;
pub use dependency::{AnyDependency, AsDependency, Dependency, Deps, SameValue, Snapshot};
pub use effect::{Cleanup, Effect};
pub use external_store::{watch_source, ExternalStore, OnStoreChange, Unsubscribe};
pub use lifecycle::{Lifecycle, Phase, WeakLifecycle};
pub use reducer::{Reducer, Transitions};
pub use state::StateSlot;
pub use subscriber::SubscriberId;
