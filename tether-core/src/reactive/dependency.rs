//! Dependencies and identity comparison.
//!
//! A [`Dependency`] is a read-only accessor: effects and computed values hold
//! a list of them and compare what they return against what they returned
//! last time. The comparison is [`SameValue`], an identity check rather than
//! deep equality:
//!
//! - scalars and strings compare by value;
//! - floats follow `Object.is` (`NaN` is the same as `NaN`, `0.0` and `-0.0`
//!   are different);
//! - `Arc<T>` compares by pointer, so two equal allocations still count as a
//!   change.
//!
//! Collections do not implement [`SameValue`]. Put them behind an `Arc` to
//! give them reference semantics.

use std::any::Any;
use std::sync::Arc;

/// Identity comparison used by every dirty-check in the crate.
pub trait SameValue {
    fn same_value(&self, other: &Self) -> bool;
}

macro_rules! same_value_by_eq {
    ($($ty:ty),* $(,)?) => {
        $(
            impl SameValue for $ty {
                #[inline]
                fn same_value(&self, other: &Self) -> bool {
                    self == other
                }
            }
        )*
    };
}

same_value_by_eq!(
    (), bool, char, u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, String,
    &'static str,
);

macro_rules! same_value_float {
    ($($ty:ty),*) => {
        $(
            impl SameValue for $ty {
                #[inline]
                fn same_value(&self, other: &Self) -> bool {
                    (self.is_nan() && other.is_nan()) || self.to_bits() == other.to_bits()
                }
            }
        )*
    };
}

same_value_float!(f32, f64);

impl<T: ?Sized> SameValue for Arc<T> {
    #[inline]
    fn same_value(&self, other: &Self) -> bool {
        Arc::ptr_eq(self, other)
    }
}

impl<T: SameValue> SameValue for Option<T> {
    fn same_value(&self, other: &Self) -> bool {
        match (self, other) {
            (Some(a), Some(b)) => a.same_value(b),
            (None, None) => true,
            _ => false,
        }
    }
}

macro_rules! same_value_tuple {
    ($(($($name:ident : $idx:tt),+)),*) => {
        $(
            impl<$($name: SameValue),+> SameValue for ($($name,)+) {
                fn same_value(&self, other: &Self) -> bool {
                    $(self.$idx.same_value(&other.$idx))&&+
                }
            }
        )*
    };
}

same_value_tuple!((A: 0, B: 1), (A: 0, B: 1, C: 2), (A: 0, B: 1, C: 2, D: 3));

/// A read-only view of a value owned by something else.
///
/// Cloning is cheap; many subscribers may share one dependency.
pub struct Dependency<T> {
    read: Arc<dyn Fn() -> T + Send + Sync>,
}

impl<T> Dependency<T> {
    pub fn new<F>(read: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self {
            read: Arc::new(read),
        }
    }

    /// Read the current value.
    pub fn get(&self) -> T {
        (self.read)()
    }
}

impl<T> Clone for Dependency<T> {
    fn clone(&self) -> Self {
        Self {
            read: Arc::clone(&self.read),
        }
    }
}

impl<T> std::fmt::Debug for Dependency<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dependency").finish_non_exhaustive()
    }
}

trait Observed: Send + Sync {
    fn same_as(&self, other: &dyn Observed) -> bool;
    fn as_any(&self) -> &dyn Any;
}

impl<T> Observed for T
where
    T: SameValue + Send + Sync + 'static,
{
    fn same_as(&self, other: &dyn Observed) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .is_some_and(|other| self.same_value(other))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A value observed through an [`AnyDependency`], kept for the next check.
pub struct Snapshot(Box<dyn Observed>);

impl Snapshot {
    pub fn same_as(&self, other: &Snapshot) -> bool {
        self.0.same_as(&*other.0)
    }
}

impl std::fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Snapshot(..)")
    }
}

/// A type-erased dependency, as stored in effect and computed dependency lists.
#[derive(Clone)]
pub struct AnyDependency {
    read: Arc<dyn Fn() -> Snapshot + Send + Sync>,
}

impl AnyDependency {
    pub fn snapshot(&self) -> Snapshot {
        (self.read)()
    }
}

impl<T> From<Dependency<T>> for AnyDependency
where
    T: SameValue + Send + Sync + 'static,
{
    fn from(dependency: Dependency<T>) -> Self {
        Self {
            read: Arc::new(move || Snapshot(Box::new(dependency.get()))),
        }
    }
}

impl std::fmt::Debug for AnyDependency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnyDependency").finish_non_exhaustive()
    }
}

/// Anything that can be observed as a dependency: state slots, reducers,
/// computed values, external stores, prop dependencies.
pub trait AsDependency {
    type Value;

    fn dependency(&self) -> Dependency<Self::Value>;

    fn erased(&self) -> AnyDependency
    where
        Self::Value: SameValue + Send + Sync + 'static,
    {
        self.dependency().into()
    }
}

impl<T> AsDependency for Dependency<T> {
    type Value = T;

    fn dependency(&self) -> Dependency<T> {
        self.clone()
    }
}

/// Dependency list the way effect and computed constructors take it.
///
/// `None` reacts to every update, `Some(vec![])` never reacts after the
/// first run.
pub type Deps = Option<Vec<AnyDependency>>;

/// Build a [`Deps`] list from anything implementing [`AsDependency`].
///
/// ```rust,ignore
/// component.effect(
///     move || println!("{}", label.get()),
///     deps![label_slot, component.depend("value")],
/// );
/// ```
#[macro_export]
macro_rules! deps {
    () => {
        ::std::option::Option::Some(::std::vec::Vec::<$crate::reactive::AnyDependency>::new())
    };
    ($($dep:expr),+ $(,)?) => {
        ::std::option::Option::Some(::std::vec![$($crate::reactive::AsDependency::erased(&$dep)),+])
    };
}

/// Compare each dependency to its last observed value and refresh the ones
/// that changed. Returns whether anything changed.
pub(crate) fn refresh_changed(deps: &[AnyDependency], last: &mut [Snapshot]) -> bool {
    let mut changed = false;
    for (dep, seen) in deps.iter().zip(last.iter_mut()) {
        let current = dep.snapshot();
        if !current.same_as(seen) {
            *seen = current;
            changed = true;
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn scalars_compare_by_value() {
        assert!(1_i32.same_value(&1));
        assert!(!1_i32.same_value(&2));
        assert!("a".same_value(&"a"));
        assert!(String::from("label").same_value(&String::from("label")));
    }

    #[test]
    fn floats_follow_object_is() {
        assert!(f64::NAN.same_value(&f64::NAN));
        assert!(!0.0_f64.same_value(&-0.0));
        assert!(1.5_f64.same_value(&1.5));
    }

    #[test]
    fn arcs_compare_by_pointer() {
        let a = Arc::new(vec![1, 2, 3]);
        let b = Arc::new(vec![1, 2, 3]);
        assert!(a.same_value(&a.clone()));
        assert!(!a.same_value(&b));
    }

    #[test]
    fn options_and_tuples_compare_elementwise() {
        assert!(Some(3).same_value(&Some(3)));
        assert!(!Some(3).same_value(&None));
        assert!((1, "x").same_value(&(1, "x")));
        assert!(!(1, "x", 2.0).same_value(&(1, "x", 2.5)));
    }

    #[test]
    fn dependency_reads_live_value() {
        let source = Arc::new(Mutex::new(1));
        let reader = source.clone();
        let dep = Dependency::new(move || *reader.lock());

        assert_eq!(dep.get(), 1);
        *source.lock() = 7;
        assert_eq!(dep.get(), 7);
    }

    #[test]
    fn refresh_detects_new_reference_with_equal_content() {
        let source = Arc::new(Mutex::new(Arc::new(String::from("same"))));
        let reader = source.clone();
        let deps = vec![AnyDependency::from(Dependency::new(move || reader.lock().clone()))];
        let mut last: Vec<Snapshot> = deps.iter().map(AnyDependency::snapshot).collect();

        assert!(!refresh_changed(&deps, &mut last));

        *source.lock() = Arc::new(String::from("same"));
        assert!(refresh_changed(&deps, &mut last));
        assert!(!refresh_changed(&deps, &mut last));
    }

    #[test]
    fn deps_macro_builds_lists() {
        let empty: Deps = deps![];
        assert_eq!(empty.map(|d| d.len()), Some(0));

        let a = Dependency::new(|| 1_u8);
        let b = Dependency::new(|| "b");
        let list: Deps = deps![a, b];
        assert_eq!(list.map(|d| d.len()), Some(2));
    }
}
