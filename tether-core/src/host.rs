//! Host boundary.
//!
//! The reactive primitives never own storage or decide when to re-render.
//! Both belong to the host instance, which provides:
//!
//! - a keyed storage record ([`StateRecord`]), read through [`Host::read_state`];
//! - a merge-based writer ([`Host::set_state`]) taking a [`StatePatch`];
//! - a forced re-render trigger ([`Host::force_update`]).
//!
//! [`crate::component::Component`] is the host shipped with this crate.

use std::any::Any;
use std::sync::Arc;

use indexmap::IndexMap;

/// Key of one state slot inside the host's storage record.
///
/// Keys come from a per-host counter and are never reused while the host
/// lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateKey(u64);

impl StateKey {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for StateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "_state{}", self.0)
    }
}

/// A type-erased value stored in the record.
pub type StoredValue = Arc<dyn Any + Send + Sync>;

/// The host's storage record: slot key to current value, in creation order.
#[derive(Clone, Default)]
pub struct StateRecord {
    values: IndexMap<StateKey, StoredValue>,
}

impl StateRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// A one-entry record, the usual shape of a slot's patch.
    pub fn single<T>(key: StateKey, value: T) -> Self
    where
        T: Send + Sync + 'static,
    {
        let mut record = Self::new();
        record.insert(key, value);
        record
    }

    pub fn get(&self, key: StateKey) -> Option<&StoredValue> {
        self.values.get(&key)
    }

    pub fn get_as<T: 'static>(&self, key: StateKey) -> Option<&T> {
        self.values.get(&key).and_then(|value| value.downcast_ref::<T>())
    }

    pub fn insert<T>(&mut self, key: StateKey, value: T)
    where
        T: Send + Sync + 'static,
    {
        self.values.insert(key, Arc::new(value));
    }

    pub fn insert_stored(&mut self, key: StateKey, value: StoredValue) {
        self.values.insert(key, value);
    }

    /// Shallow merge: every entry of `patch` replaces the entry with the same key.
    pub fn merge(&mut self, patch: StateRecord) {
        self.values.extend(patch.values);
    }

    pub fn contains(&self, key: StateKey) -> bool {
        self.values.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = StateKey> + '_ {
        self.values.keys().copied()
    }
}

impl std::fmt::Debug for StateRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set()
            .entries(self.values.keys().map(|k| k.to_string()))
            .finish()
    }
}

/// A state write handed to the host.
pub enum StatePatch {
    /// Partial record merged as-is.
    Merge(StateRecord),
    /// Partial record computed from the whole record at application time.
    Update(Box<dyn FnOnce(&StateRecord) -> StateRecord + Send>),
}

impl StatePatch {
    /// Apply the patch to `record` the way the host's merge writer does.
    pub fn apply_to(self, record: &mut StateRecord) {
        let patch = match self {
            StatePatch::Merge(patch) => patch,
            StatePatch::Update(updater) => updater(record),
        };
        record.merge(patch);
    }
}

impl std::fmt::Debug for StatePatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatePatch::Merge(record) => f.debug_tuple("Merge").field(record).finish(),
            StatePatch::Update(_) => f.write_str("Update(..)"),
        }
    }
}

/// The services a host instance offers to the reactive primitives.
pub trait Host: Send + Sync {
    /// Read the stored value for `key`.
    fn read_state(&self, key: StateKey) -> Option<StoredValue>;

    /// Store a slot's initial value directly, at slot construction.
    fn init_state(&self, key: StateKey, value: StoredValue);

    /// Hand a write to the host's merge-based writer. The host applies it and
    /// schedules an update notification on its own cycle.
    fn set_state(&self, patch: StatePatch);

    /// Ask the host to re-render without a state change.
    fn force_update(&self);
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_key_displays_with_prefix() {
        assert_eq!(StateKey::new(3).to_string(), "_state3");
    }

    #[test]
    fn merge_replaces_only_patched_keys() {
        let a = StateKey::new(1);
        let b = StateKey::new(2);

        let mut record = StateRecord::new();
        record.insert(a, 1_i32);
        record.insert(b, "keep");

        StatePatch::Merge(StateRecord::single(a, 5_i32)).apply_to(&mut record);

        assert_eq!(record.get_as::<i32>(a), Some(&5));
        assert_eq!(record.get_as::<&str>(b), Some(&"keep"));
        assert_eq!(record.len(), 2);
    }

    #[test]
    fn updater_sees_record_at_application_time() {
        let key = StateKey::new(1);
        let mut record = StateRecord::single(key, 1_i32);

        let double = |key: StateKey| {
            StatePatch::Update(Box::new(move |prev: &StateRecord| {
                let current = prev.get_as::<i32>(key).copied().unwrap_or_default();
                StateRecord::single(key, current * 2)
            }))
        };

        double(key).apply_to(&mut record);
        double(key).apply_to(&mut record);

        assert_eq!(record.get_as::<i32>(key), Some(&4));
    }
}
