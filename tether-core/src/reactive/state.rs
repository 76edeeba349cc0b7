//! State Slot Implementation
//!
//! A state slot is a named cell whose value lives in the host's storage
//! record, not in the slot itself. Reads go straight to the record; writes go
//! through the host's merge-based writer, so the host decides how a write
//! turns into a re-render.
//!
//! # Lifetime
//!
//! Each slot registers an unmount callback that makes it inert: once the
//! host has unmounted, `set` and `update` are silently ignored. Writes from
//! callbacks racing teardown therefore never reach a dead storage record.

use std::fmt::{Debug, Display};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::dependency::{AsDependency, Dependency};
use super::lifecycle::Lifecycle;
use crate::error::{Result, TetherError};
use crate::host::{Host, StateKey, StatePatch, StateRecord};

/// A reactive cell of type `T` backed by host storage.
///
/// # Example
///
/// ```rust,ignore
/// let count = component.state(0);
///
/// count.set(5);
/// count.update(|prev| prev + 1);
/// ```
pub struct StateSlot<T> {
    /// Key into the host's storage record.
    key: StateKey,

    host: Arc<dyn Host>,

    /// Set once the host has unmounted.
    inert: Arc<AtomicBool>,

    _marker: std::marker::PhantomData<fn() -> T>,
}

impl<T> StateSlot<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a slot and store its initial value under `key`.
    pub fn new(lifecycle: &Lifecycle, host: Arc<dyn Host>, key: StateKey, initial: T) -> Self {
        host.init_state(key, Arc::new(initial));

        let inert = Arc::new(AtomicBool::new(false));
        let flag = inert.clone();
        lifecycle.on_unmount(move || flag.store(true, Ordering::SeqCst));

        Self {
            key,
            host,
            inert,
            _marker: std::marker::PhantomData,
        }
    }

    pub fn key(&self) -> StateKey {
        self.key
    }

    /// Read the current value from host storage.
    pub fn try_get(&self) -> Result<T> {
        let stored = self
            .host
            .read_state(self.key)
            .ok_or(TetherError::StateMissing { key: self.key })?;

        stored
            .downcast_ref::<T>()
            .cloned()
            .ok_or(TetherError::StateTypeMismatch { key: self.key })
    }

    /// Read the current value from host storage.
    ///
    /// # Panics
    ///
    /// If something other than this slot wrote a different type under its key.
    pub fn get(&self) -> T {
        self.try_get().unwrap_or_else(|err| panic!("{err}"))
    }

    /// Store a new value.
    pub fn set(&self, value: T) {
        if self.is_inert() {
            tracing::debug!(key = %self.key, "ignoring write after unmount");
            return;
        }
        self.host
            .set_state(StatePatch::Merge(StateRecord::single(self.key, value)));
    }

    /// Store a value computed from the previous one.
    ///
    /// `f` runs when the host applies the write, against the value stored at
    /// that moment, so consecutive updates compose in call order.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T + Send + 'static,
    {
        if self.is_inert() {
            tracing::debug!(key = %self.key, "ignoring update after unmount");
            return;
        }

        let key = self.key;
        self.host
            .set_state(StatePatch::Update(Box::new(move |prev: &StateRecord| {
                match prev.get_as::<T>(key) {
                    Some(current) => StateRecord::single(key, f(current)),
                    None => {
                        tracing::error!(key = %key, "{}", TetherError::StateTypeMismatch { key });
                        StateRecord::new()
                    }
                }
            })));
    }

    /// Whether the owning host has unmounted.
    pub fn is_inert(&self) -> bool {
        self.inert.load(Ordering::SeqCst)
    }
}

impl<T> Clone for StateSlot<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key,
            host: Arc::clone(&self.host),
            inert: Arc::clone(&self.inert),
            _marker: std::marker::PhantomData,
        }
    }
}

impl<T> AsDependency for StateSlot<T>
where
    T: Clone + Send + Sync + 'static,
{
    type Value = T;

    fn dependency(&self) -> Dependency<T> {
        let slot = self.clone();
        Dependency::new(move || slot.get())
    }
}

impl<T> Display for StateSlot<T>
where
    T: Clone + Send + Sync + Display + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.try_get() {
            Ok(value) => Display::fmt(&value, f),
            Err(_) => Ok(()),
        }
    }
}

impl<T> Debug for StateSlot<T>
where
    T: Clone + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateSlot")
            .field("key", &self.key)
            .field("value", &self.try_get().ok())
            .field("inert", &self.is_inert())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::testing::MockHost;

    fn slot<T: Clone + Send + Sync + 'static>(
        host: &Arc<MockHost>,
        lifecycle: &Lifecycle,
        raw: u64,
        v: T,
    ) -> StateSlot<T> {
        StateSlot::new(lifecycle, host.clone(), StateKey::new(raw), v)
    }

    #[test]
    fn slot_get_and_set() {
        let host = MockHost::new();
        let lifecycle = Lifecycle::new();
        let label = slot(&host, &lifecycle, 1, String::from("Click Me"));

        assert_eq!(label.get(), "Click Me");

        label.set(String::from("Clicked"));
        assert_eq!(label.get(), "Clicked");
        assert_eq!(host.writes(), 1);
    }

    #[test]
    fn slot_update_uses_value_at_application_time() {
        let host = MockHost::new();
        let lifecycle = Lifecycle::new();
        let count = slot(&host, &lifecycle, 1, 10);

        count.update(|v| v + 5);
        count.update(|v| v * 2);
        assert_eq!(count.get(), 30);
    }

    #[test]
    fn slots_do_not_share_storage() {
        let host = MockHost::new();
        let lifecycle = Lifecycle::new();
        let a = slot(&host, &lifecycle, 1, 1);
        let b = slot(&host, &lifecycle, 2, 2);

        a.set(10);
        assert_eq!(a.get(), 10);
        assert_eq!(b.get(), 2);
    }

    #[test]
    fn set_after_unmount_is_ignored() {
        let host = MockHost::new();
        let lifecycle = Lifecycle::new();
        let count = slot(&host, &lifecycle, 1, 0);

        lifecycle.unmount();
        count.set(99);
        count.update(|v| v + 1);

        assert!(count.is_inert());
        assert_eq!(count.get(), 0);
        assert_eq!(host.writes(), 0);
    }

    #[test]
    fn type_mismatch_is_reported() {
        let host = MockHost::new();
        let lifecycle = Lifecycle::new();
        let count = slot(&host, &lifecycle, 1, 0_i32);

        host.record.write().insert(StateKey::new(1), "not a number");
        assert!(matches!(
            count.try_get(),
            Err(TetherError::StateTypeMismatch { .. })
        ));
    }

    #[test]
    fn slot_displays_current_value() {
        let host = MockHost::new();
        let lifecycle = Lifecycle::new();
        let count = slot(&host, &lifecycle, 1, 42);
        assert_eq!(count.to_string(), "42");
    }

    #[test]
    fn slot_clone_shares_state() {
        let host = MockHost::new();
        let lifecycle = Lifecycle::new();
        let a = slot(&host, &lifecycle, 1, 0);
        let b = a.clone();

        a.set(42);
        assert_eq!(b.get(), 42);
        assert_eq!(a.key(), b.key());
    }
}
