//! Props, injected contexts, and prop dependencies.
//!
//! Props arrive from the host as a plain keyed mapping of [`PropValue`]s.
//! Scalars compare by value; structured payloads sit behind an `Arc` and
//! compare by pointer, so delivering a freshly built object counts as a
//! change even when its contents are equal.

use std::any::Any;
use std::fmt::{Debug, Display};
use std::sync::Arc;

use dashmap::DashMap;
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Result, TetherError};
use crate::reactive::{Dependency, SameValue};

/// One prop (or injected context) value.
#[derive(Clone)]
pub enum PropValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Arc<str>),
    /// A structured value converted from serde data (array or object).
    Json(Arc<serde_json::Value>),
    /// An arbitrary host-side object, compared by pointer.
    Object(Arc<dyn Any + Send + Sync>),
}

impl PropValue {
    pub fn object<T>(value: Arc<T>) -> Self
    where
        T: Any + Send + Sync,
    {
        PropValue::Object(value)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PropValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropValue::Float(n) => Some(*n),
            PropValue::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow the payload of an [`PropValue::Object`] as `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            PropValue::Object(object) => object.downcast_ref::<T>(),
            _ => None,
        }
    }

    /// Read a serde-compatible prop back into a typed value.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T> {
        let value = match self {
            PropValue::Null => serde_json::Value::Null,
            PropValue::Bool(b) => serde_json::Value::Bool(*b),
            PropValue::Int(n) => serde_json::Value::from(*n),
            PropValue::Float(n) => serde_json::Value::from(*n),
            PropValue::Str(s) => serde_json::Value::String(s.to_string()),
            PropValue::Json(json) => json.as_ref().clone(),
            PropValue::Object(_) => return Err(TetherError::NotAnObject { kind: "opaque object" }),
        };
        Ok(serde_json::from_value(value)?)
    }

    fn kind(&self) -> &'static str {
        match self {
            PropValue::Null => "null",
            PropValue::Bool(_) => "bool",
            PropValue::Int(_) => "int",
            PropValue::Float(_) => "float",
            PropValue::Str(_) => "string",
            PropValue::Json(json) if json.is_array() => "array",
            PropValue::Json(_) => "object",
            PropValue::Object(_) => "opaque object",
        }
    }
}

impl SameValue for PropValue {
    fn same_value(&self, other: &Self) -> bool {
        match (self, other) {
            (PropValue::Null, PropValue::Null) => true,
            (PropValue::Bool(a), PropValue::Bool(b)) => a == b,
            (PropValue::Int(a), PropValue::Int(b)) => a == b,
            (PropValue::Float(a), PropValue::Float(b)) => a.same_value(b),
            (PropValue::Str(a), PropValue::Str(b)) => a == b,
            (PropValue::Json(a), PropValue::Json(b)) => Arc::ptr_eq(a, b),
            (PropValue::Object(a), PropValue::Object(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<serde_json::Value> for PropValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => PropValue::Null,
            serde_json::Value::Bool(b) => PropValue::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => PropValue::Int(i),
                None => PropValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => PropValue::Str(s.into()),
            other => PropValue::Json(Arc::new(other)),
        }
    }
}

impl From<bool> for PropValue {
    fn from(b: bool) -> Self {
        PropValue::Bool(b)
    }
}

impl From<i64> for PropValue {
    fn from(n: i64) -> Self {
        PropValue::Int(n)
    }
}

impl From<i32> for PropValue {
    fn from(n: i32) -> Self {
        PropValue::Int(n.into())
    }
}

impl From<f64> for PropValue {
    fn from(n: f64) -> Self {
        PropValue::Float(n)
    }
}

impl From<&str> for PropValue {
    fn from(s: &str) -> Self {
        PropValue::Str(s.into())
    }
}

impl From<String> for PropValue {
    fn from(s: String) -> Self {
        PropValue::Str(s.into())
    }
}

impl Display for PropValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PropValue::Null => f.write_str("null"),
            PropValue::Bool(b) => Display::fmt(b, f),
            PropValue::Int(n) => Display::fmt(n, f),
            PropValue::Float(n) => Display::fmt(n, f),
            PropValue::Str(s) => f.write_str(s),
            PropValue::Json(json) => Display::fmt(json, f),
            PropValue::Object(_) => f.write_str("[object]"),
        }
    }
}

impl Debug for PropValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PropValue::Str(s) => write!(f, "{s:?}"),
            PropValue::Object(_) => f.write_str("Object(..)"),
            other => Display::fmt(other, f),
        }
    }
}

/// The keyed props mapping delivered by the host.
#[derive(Clone, Default, Debug)]
pub struct Props {
    entries: IndexMap<String, PropValue>,
}

/// Injected contexts travel in the same shape as props, on a separate channel.
pub type ContextMap = Props;

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<PropValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<PropValue>) {
        self.entries.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&PropValue> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Convert any serializable struct into a props mapping. Each top-level
    /// field becomes one prop.
    pub fn from_serialize<S: Serialize>(props: &S) -> Result<Self> {
        match serde_json::to_value(props)? {
            serde_json::Value::Object(map) => Ok(map.into_iter().collect()),
            other => Err(TetherError::NotAnObject {
                kind: PropValue::from(other).kind(),
            }),
        }
    }

    /// Same keys in the same order, each value the [`SameValue`].
    pub fn shallow_same(&self, other: &Props) -> bool {
        self.entries.len() == other.entries.len()
            && self
                .entries
                .iter()
                .zip(other.entries.iter())
                .all(|((ka, va), (kb, vb))| ka == kb && va.same_value(vb))
    }
}

impl<K, V> FromIterator<(K, V)> for Props
where
    K: Into<String>,
    V: Into<PropValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut props = Props::new();
        for (k, v) in iter {
            props.insert(k, v);
        }
        props
    }
}

/// Lazily built, memoized dependencies on individual props.
///
/// Each dependency reads the live props mapping at call time, so an effect
/// or computed listing it always compares against the latest delivery.
#[derive(Clone)]
pub struct PropDependencies {
    props: Arc<RwLock<Props>>,
    cache: Arc<DashMap<String, Dependency<Option<PropValue>>>>,
}

impl PropDependencies {
    pub(crate) fn new(props: Arc<RwLock<Props>>) -> Self {
        Self {
            props,
            cache: Arc::new(DashMap::new()),
        }
    }

    /// A dependency on the prop called `name`. `None` while it is absent.
    pub fn dependency_for(&self, name: &str) -> Dependency<Option<PropValue>> {
        if let Some(dep) = self.cache.get(name) {
            return dep.value().clone();
        }

        let props = Arc::clone(&self.props);
        let key = name.to_string();
        let dep = Dependency::new(move || props.read().get(&key).cloned());

        self.cache
            .entry(name.to_string())
            .or_insert(dep)
            .value()
            .clone()
    }

    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}

impl Debug for PropDependencies {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropDependencies")
            .field("cached", &self.cached())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Serialize)]
    struct ButtonProps {
        label: String,
        count: i64,
        ratio: f64,
        tags: Vec<String>,
    }

    #[test]
    fn props_from_serializable_struct() {
        let props = Props::from_serialize(&ButtonProps {
            label: "Click Me".into(),
            count: 3,
            ratio: 0.5,
            tags: vec!["a".into()],
        })
        .expect("struct serializes to a map");

        assert_eq!(props.get("label").and_then(PropValue::as_str), Some("Click Me"));
        assert_eq!(props.get("count").and_then(PropValue::as_i64), Some(3));
        assert_eq!(props.get("ratio").and_then(PropValue::as_f64), Some(0.5));
        assert!(matches!(props.get("tags"), Some(PropValue::Json(_))));
        assert_eq!(props.len(), 4);
    }

    #[test]
    fn non_object_props_are_rejected() {
        let err = Props::from_serialize(&vec![1, 2]).expect_err("arrays are not props");
        assert!(matches!(err, TetherError::NotAnObject { kind: "array" }));
    }

    #[test]
    fn deserialize_reads_typed_value() {
        #[derive(Deserialize, PartialEq, Debug)]
        struct Point {
            x: i32,
            y: i32,
        }

        let value = PropValue::from(serde_json::json!({ "x": 1, "y": 2 }));
        assert_eq!(value.deserialize::<Point>().expect("valid point"), Point { x: 1, y: 2 });
        assert_eq!(PropValue::from(7).deserialize::<u8>().expect("small int"), 7);
    }

    #[test]
    fn scalar_props_compare_by_value_and_objects_by_pointer() {
        assert!(PropValue::from("a").same_value(&PropValue::from("a")));
        assert!(!PropValue::from(1).same_value(&PropValue::from(1.0)));

        let shared = Arc::new(5_u32);
        assert!(PropValue::object(shared.clone()).same_value(&PropValue::object(shared)));
        assert!(!PropValue::object(Arc::new(5_u32))
            .same_value(&PropValue::object(Arc::new(5_u32))));

        let json = serde_json::json!([1]);
        assert!(!PropValue::from(json.clone()).same_value(&PropValue::from(json)));
    }

    #[test]
    fn shallow_same_checks_keys_and_identity() {
        let a = Props::new().with("value", 1).with("label", "x");
        let b = Props::new().with("value", 1).with("label", "x");
        let c = Props::new().with("value", 2).with("label", "x");

        assert!(a.shallow_same(&b));
        assert!(!a.shallow_same(&c));
        assert!(!a.shallow_same(&Props::new().with("value", 1)));
    }

    #[test]
    fn prop_dependency_reads_live_props() {
        let props = Arc::new(RwLock::new(Props::new().with("value", 0)));
        let deps = PropDependencies::new(props.clone());

        let value = deps.dependency_for("value");
        let missing = deps.dependency_for("missing");
        assert_eq!(value.get().and_then(|v| v.as_i64()), Some(0));
        assert!(missing.get().is_none());

        *props.write() = Props::new().with("value", 4);
        assert_eq!(value.get().and_then(|v| v.as_i64()), Some(4));
    }

    #[test]
    fn prop_dependencies_are_memoized() {
        let deps = PropDependencies::new(Arc::new(RwLock::new(Props::new())));
        deps.dependency_for("a");
        deps.dependency_for("a");
        deps.dependency_for("b");
        assert_eq!(deps.cached(), 2);
    }

    #[test]
    fn display_matches_rendered_text() {
        assert_eq!(PropValue::from("label").to_string(), "label");
        assert_eq!(PropValue::from(4).to_string(), "4");
        assert_eq!(PropValue::Null.to_string(), "null");
    }
}
