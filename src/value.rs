//! Dynamic value representation for CBON data.
//!
//! [`Value`] holds any data a CBON document can describe. Parsed documents are
//! plain trees; [`Value::Shared`] lets programs build values whose parts are
//! referenced from several places, including from inside themselves.
//!
//! ## Examples
//!
//! ```rust
//! use serde_cbon::{cbon, Value};
//!
//! let value = cbon!({ "name": "Alice", "tags": ["admin"] });
//! assert!(value.is_object());
//! assert_eq!(value.get("name").and_then(Value::as_str), Some("Alice"));
//! assert_eq!(value.to_string(), "{name Alice,tags[admin]}");
//! ```
//!
//! Converting from Rust types:
//!
//! ```rust
//! use serde::Serialize;
//! use serde_cbon::{to_value, Value};
//!
//! #[derive(Serialize)]
//! struct Point { x: i32, y: i32 }
//!
//! let value: Value = to_value(&Point { x: 10, y: 20 }).unwrap();
//! assert_eq!(value.get("x").and_then(Value::as_i64), Some(10));
//! ```

use crate::error::{Error, Result};
use crate::map::CbonMap;
use crate::options::CbonOptions;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

/// Any CBON value.
///
/// Equality looks through [`Value::Shared`]. Two shared values are equal when
/// they are the same cell, or when their contents are equal; a cycle reached a
/// second time compares unequal unless it is the same cell.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Array(Vec<Value>),
    Object(CbonMap),
    /// A reference-counted cell. Cloning shares it.
    Shared(Rc<RefCell<Value>>),
}

/// A CBON number: always a 64-bit float.
///
/// # Examples
///
/// ```rust
/// use serde_cbon::Number;
///
/// let n = Number::from(42);
/// assert!(n.is_integer());
/// assert_eq!(n.as_i64(), Some(42));
/// assert_eq!(Number::from(2.5).as_i64(), None);
/// assert_eq!(Number::from(2.5).to_string(), "2.5");
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd)]
pub struct Number(f64);

impl Number {
    #[inline]
    #[must_use]
    pub const fn new(value: f64) -> Self {
        Number(value)
    }

    /// Whether the value is finite and has no fractional part.
    #[inline]
    #[must_use]
    pub fn is_integer(&self) -> bool {
        self.0.is_finite() && self.0.fract() == 0.0
    }

    #[inline]
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.0.is_finite()
    }

    #[inline]
    #[must_use]
    pub const fn as_f64(&self) -> f64 {
        self.0
    }

    #[inline]
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        if self.is_integer() && self.0 >= i64::MIN as f64 && self.0 < i64::MAX as f64 {
            Some(self.0 as i64)
        } else {
            None
        }
    }

    #[inline]
    #[must_use]
    pub fn as_u64(&self) -> Option<u64> {
        if self.is_integer() && self.0 >= 0.0 && self.0 < u64::MAX as f64 {
            Some(self.0 as u64)
        } else {
            None
        }
    }
}

/// Plain decimals between `1e-6` and `1e21`, exponent form (`1e300`,
/// `5e-324`) outside that range.
impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let magnitude = self.0.abs();
        if magnitude >= 1e21 || (magnitude > 0.0 && magnitude < 1e-6) {
            write!(f, "{:e}", self.0)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

macro_rules! number_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Number {
                fn from(value: $ty) -> Self {
                    Number(value as f64)
                }
            }

            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::Number(Number::from(value))
                }
            }
        )*
    };
}

number_from!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64);

impl Value {
    /// Wraps `value` in a new shared cell.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde_cbon::{stringify, CbonOptions, Value};
    ///
    /// let shared = Value::shared(Value::Array(vec![]));
    /// let root = Value::Array(vec![shared.clone(), shared.clone()]);
    /// assert_eq!(root.to_string(), "[[],[]]");
    ///
    /// // Make the array contain itself.
    /// if let Value::Shared(cell) = &shared {
    ///     cell.borrow_mut().as_array_mut().unwrap().push(shared.clone());
    /// }
    /// assert!(stringify(&root, &CbonOptions::new()).is_err());
    /// ```
    #[must_use]
    pub fn shared(value: Value) -> Value {
        Value::Shared(Rc::new(RefCell::new(value)))
    }

    #[inline]
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    #[inline]
    #[must_use]
    pub const fn is_bool(&self) -> bool {
        matches!(self, Value::Bool(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_number(&self) -> bool {
        matches!(self, Value::Number(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_string(&self) -> bool {
        matches!(self, Value::String(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_object(&self) -> bool {
        matches!(self, Value::Object(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_shared(&self) -> bool {
        matches!(self, Value::Shared(_))
    }

    /// Whether this is a block or an array.
    #[inline]
    #[must_use]
    pub fn is_container(&self) -> bool {
        match self {
            Value::Array(_) | Value::Object(_) => true,
            Value::Shared(cell) => cell.try_borrow().map_or(false, |v| v.is_container()),
            _ => false,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_number(&self) -> Option<Number> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        self.as_number().map(|n| n.as_f64())
    }

    #[inline]
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        self.as_number().and_then(|n| n.as_i64())
    }

    #[inline]
    #[must_use]
    pub fn as_u64(&self) -> Option<u64> {
        self.as_number().and_then(|n| n.as_u64())
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(arr) => Some(arr),
            _ => None,
        }
    }

    #[inline]
    pub fn as_array_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self {
            Value::Array(arr) => Some(arr),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_object(&self) -> Option<&CbonMap> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    #[inline]
    pub fn as_object_mut(&mut self) -> Option<&mut CbonMap> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Looks up a key of an object. Shared cells are not looked through.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_object().and_then(|obj| obj.get(key))
    }

    /// Deep-copies the value, replacing every shared cell with its contents.
    ///
    /// A cell reached again from inside itself is an [`Error::Circular`]; a
    /// cell reached twice side by side is copied twice.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde_cbon::Value;
    ///
    /// let inner = Value::shared(Value::from(1));
    /// let value = Value::Array(vec![inner.clone(), inner]);
    /// assert_eq!(
    ///     value.unshare().unwrap(),
    ///     Value::Array(vec![Value::from(1), Value::from(1)])
    /// );
    /// ```
    pub fn unshare(&self) -> Result<Value> {
        unshare(self, &mut HashSet::new())
    }
}

fn unshare(value: &Value, active: &mut HashSet<*const RefCell<Value>>) -> Result<Value> {
    match value {
        Value::Shared(cell) => {
            let key = Rc::as_ptr(cell);
            if !active.insert(key) {
                return Err(Error::Circular);
            }
            let inner = cell.try_borrow().map_err(Error::custom)?;
            let copy = unshare(&inner, active);
            active.remove(&key);
            copy
        }
        Value::Array(arr) => arr
            .iter()
            .map(|v| unshare(v, active))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        Value::Object(obj) => obj
            .iter()
            .map(|(k, v)| Ok((k.clone(), unshare(v, active)?)))
            .collect::<Result<CbonMap>>()
            .map(Value::Object),
        other => Ok(other.clone()),
    }
}

/// Tears nested containers down with a work list instead of recursion, so a
/// value of any depth can be dropped.
///
/// Because of this impl, contents cannot be moved out of a `Value` by pattern;
/// match on `&mut value` and use [`std::mem::take`] instead.
impl Drop for Value {
    fn drop(&mut self) {
        let mut pending = match self {
            Value::Array(items) if !items.is_empty() => std::mem::take(items),
            Value::Object(map) if !map.is_empty() => map.drain_values().collect(),
            Value::Shared(cell) => match take_unique(cell) {
                Some(inner) => vec![inner],
                None => return,
            },
            _ => return,
        };
        while let Some(mut value) = pending.pop() {
            match &mut value {
                Value::Array(items) => pending.append(items),
                Value::Object(map) => pending.extend(map.drain_values()),
                Value::Shared(cell) => pending.extend(take_unique(cell)),
                _ => {}
            }
        }
    }
}

/// The contents of a cell about to lose its last handle.
fn take_unique(cell: &Rc<RefCell<Value>>) -> Option<Value> {
    if Rc::strong_count(cell) != 1 {
        return None;
    }
    cell.try_borrow_mut().ok().map(|mut inner| std::mem::take(&mut *inner))
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Shared(a), Value::Shared(b)) if Rc::ptr_eq(a, b) => true,
            (Value::Shared(cell), value) | (value, Value::Shared(cell)) => {
                match cell.try_borrow_mut() {
                    Ok(guard) => *guard == *value,
                    Err(_) => false,
                }
            }
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Value::Number(n) => f.debug_tuple("Number").field(&n.0).finish(),
            Value::String(s) => f.debug_tuple("String").field(s).finish(),
            Value::Array(arr) => f.debug_tuple("Array").field(arr).finish(),
            Value::Object(obj) => f.debug_tuple("Object").field(obj).finish(),
            Value::Shared(cell) => match cell.try_borrow_mut() {
                Ok(guard) => f.debug_tuple("Shared").field(&*guard).finish(),
                Err(_) => f.write_str("Shared(<cycle>)"),
            },
        }
    }
}

/// Writes the value with [`CbonOptions::default`]. Circular values fail to format.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = crate::ser::stringify(self, &CbonOptions::default()).map_err(|_| fmt::Error)?;
        f.write_str(&text)
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::{Error as _, SerializeMap, SerializeSeq};
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => serializer.serialize_i64(i),
                None => serializer.serialize_f64(n.as_f64()),
            },
            Value::String(s) => serializer.serialize_str(s),
            Value::Array(arr) => {
                let mut seq = serializer.serialize_seq(Some(arr.len()))?;
                for element in arr {
                    seq.serialize_element(element)?;
                }
                seq.end()
            }
            Value::Object(obj) => {
                let mut map = serializer.serialize_map(Some(obj.len()))?;
                for (k, v) in obj {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
            Value::Shared(cell) => {
                // Held for the whole visit so re-entering the same cell fails.
                let guard = cell
                    .try_borrow_mut()
                    .map_err(|_| S::Error::custom(Error::Circular))?;
                (*guard).serialize(serializer)
            }
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::{self, Visitor};

        struct ValueVisitor;

        impl<'de> Visitor<'de> for ValueVisitor {
            type Value = Value;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("any valid CBON value")
            }

            fn visit_bool<E>(self, value: bool) -> std::result::Result<Value, E> {
                Ok(Value::Bool(value))
            }

            fn visit_i64<E>(self, value: i64) -> std::result::Result<Value, E> {
                Ok(Value::from(value))
            }

            fn visit_u64<E>(self, value: u64) -> std::result::Result<Value, E> {
                Ok(Value::from(value))
            }

            fn visit_f64<E>(self, value: f64) -> std::result::Result<Value, E> {
                Ok(Value::from(value))
            }

            fn visit_str<E>(self, value: &str) -> std::result::Result<Value, E> {
                Ok(Value::String(value.to_string()))
            }

            fn visit_string<E>(self, value: String) -> std::result::Result<Value, E> {
                Ok(Value::String(value))
            }

            fn visit_unit<E>(self) -> std::result::Result<Value, E> {
                Ok(Value::Null)
            }

            fn visit_none<E>(self) -> std::result::Result<Value, E> {
                Ok(Value::Null)
            }

            fn visit_some<D>(self, deserializer: D) -> std::result::Result<Value, D::Error>
            where
                D: Deserializer<'de>,
            {
                Deserialize::deserialize(deserializer)
            }

            fn visit_seq<A>(self, mut seq: A) -> std::result::Result<Value, A::Error>
            where
                A: de::SeqAccess<'de>,
            {
                let mut vec = Vec::new();
                while let Some(elem) = seq.next_element()? {
                    vec.push(elem);
                }
                Ok(Value::Array(vec))
            }

            fn visit_map<A>(self, mut map: A) -> std::result::Result<Value, A::Error>
            where
                A: de::MapAccess<'de>,
            {
                let mut values = CbonMap::new();
                while let Some((key, value)) = map.next_entry()? {
                    values.insert(key, value);
                }
                Ok(Value::Object(values))
            }
        }

        deserializer.deserialize_any(ValueVisitor)
    }
}

impl TryFrom<Value> for i64 {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        value
            .as_i64()
            .ok_or_else(|| Error::custom(format!("expected integer, found {:?}", value)))
    }
}

impl TryFrom<Value> for f64 {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        value
            .as_f64()
            .ok_or_else(|| Error::custom(format!("expected number, found {:?}", value)))
    }
}

impl TryFrom<Value> for bool {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        value
            .as_bool()
            .ok_or_else(|| Error::custom(format!("expected bool, found {:?}", value)))
    }
}

impl TryFrom<Value> for String {
    type Error = Error;

    fn try_from(mut value: Value) -> Result<Self> {
        match &mut value {
            Value::String(s) => Ok(std::mem::take(s)),
            _ => Err(Error::custom(format!("expected string, found {:?}", value))),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<Number> for Value {
    fn from(value: Number) -> Self {
        Value::Number(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::Array(value)
    }
}

impl From<CbonMap> for Value {
    fn from(value: CbonMap) -> Self {
        Value::Object(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}
