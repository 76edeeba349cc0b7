//! Reducer Implementation
//!
//! A reducer is a [`StateSlot`] whose mutations go through a fixed table of
//! pure transitions. The table is a [`Transitions`] implementation whose
//! `Action` type (usually an enum) tags which transition to run and carries
//! its arguments.
//!
//! Every dispatch is a functional update: the transition is applied to the
//! value stored when the host applies the write, not to the value visible
//! when `dispatch` was called. Several dispatches in one synchronous pass
//! therefore compose in call order.

use std::fmt::{Debug, Display};
use std::sync::Arc;

use super::dependency::{AsDependency, Dependency};
use super::state::StateSlot;
use crate::error::Result;
use crate::host::StateKey;

/// The transition table of a reducer.
///
/// # Example
///
/// ```rust,ignore
/// enum Counter { Increment, Decrement, Multiply(i32) }
///
/// struct CounterTransitions;
///
/// impl Transitions<i32> for CounterTransitions {
///     type Action = Counter;
///
///     fn apply(&self, state: &i32, action: Counter) -> i32 {
///         match action {
///             Counter::Increment => state + 1,
///             Counter::Decrement => state - 1,
///             Counter::Multiply(by) => state * by,
///         }
///     }
/// }
/// ```
pub trait Transitions<T>: Send + Sync + 'static {
    type Action: Send + 'static;

    /// Compute the next state. Must be pure.
    fn apply(&self, state: &T, action: Self::Action) -> T;

    /// Name of the transition an action selects, for logging.
    fn name(&self, _action: &Self::Action) -> &'static str {
        std::any::type_name::<Self::Action>()
    }
}

/// A state slot mutated through named transitions.
pub struct Reducer<T, R> {
    slot: StateSlot<T>,
    transitions: Arc<R>,
}

impl<T, R> Reducer<T, R>
where
    T: Clone + Send + Sync + 'static,
    R: Transitions<T>,
{
    pub fn new(slot: StateSlot<T>, transitions: R) -> Self {
        Self {
            slot,
            transitions: Arc::new(transitions),
        }
    }

    pub fn key(&self) -> StateKey {
        self.slot.key()
    }

    pub fn get(&self) -> T {
        self.slot.get()
    }

    pub fn try_get(&self) -> Result<T> {
        self.slot.try_get()
    }

    pub fn set(&self, value: T) {
        self.slot.set(value);
    }

    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T + Send + 'static,
    {
        self.slot.update(f);
    }

    /// Run the transition selected by `action` against the value current at
    /// application time.
    pub fn dispatch(&self, action: R::Action) {
        tracing::trace!(
            key = %self.slot.key(),
            action = self.transitions.name(&action),
            "dispatch"
        );
        let transitions = Arc::clone(&self.transitions);
        self.slot
            .update(move |current| transitions.apply(current, action));
    }

    /// Build a callable for one transition.
    ///
    /// ```rust,ignore
    /// let multiply = counter.bind(Counter::Multiply);
    /// multiply(2);
    /// ```
    pub fn bind<A, C>(&self, make_action: C) -> impl Fn(A) + Send + Sync + 'static
    where
        A: 'static,
        C: Fn(A) -> R::Action + Send + Sync + 'static,
    {
        let reducer = self.clone();
        move |args: A| reducer.dispatch(make_action(args))
    }
}

impl<T, R> Clone for Reducer<T, R> {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot.clone(),
            transitions: Arc::clone(&self.transitions),
        }
    }
}

impl<T, R> AsDependency for Reducer<T, R>
where
    T: Clone + Send + Sync + 'static,
{
    type Value = T;

    fn dependency(&self) -> Dependency<T> {
        self.slot.dependency()
    }
}

impl<T, R> Display for Reducer<T, R>
where
    T: Clone + Send + Sync + Display + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.slot, f)
    }
}

impl<T, R> Debug for Reducer<T, R>
where
    T: Clone + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reducer").field("slot", &self.slot).finish()
    }
}
