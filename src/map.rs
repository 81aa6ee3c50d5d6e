//! Ordered map type for CBON blocks.
//!
//! [`CbonMap`] wraps an [`IndexMap`] so a block's keys keep the order they were
//! written in, both when reading and when writing.
//!
//! A key that appears twice in one block keeps its first position and takes
//! its last value:
//!
//! ```rust
//! use serde_cbon::{from_str, Value};
//!
//! let value: Value = from_str("{a 1, b 2, a 3}").unwrap();
//! let map = value.as_object().unwrap();
//! assert_eq!(map.keys().collect::<Vec<_>>(), vec!["a", "b"]);
//! assert_eq!(map.get("a").and_then(Value::as_i64), Some(3));
//! ```

use crate::value::Value;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::ops::Index;

/// An ordered map of string keys to CBON values.
///
/// Equality ignores order.
///
/// # Examples
///
/// ```rust
/// use serde_cbon::{CbonMap, Value};
///
/// let mut map = CbonMap::new();
/// map.insert("second".to_string(), Value::from(2));
/// map.insert("first".to_string(), Value::from(1));
///
/// let keys: Vec<_> = map.keys().cloned().collect();
/// assert_eq!(keys, vec!["second", "first"]);
/// assert_eq!(map["first"], Value::from(1));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CbonMap(IndexMap<String, Value>);

impl CbonMap {
    #[must_use]
    pub fn new() -> Self {
        CbonMap(IndexMap::new())
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        CbonMap(IndexMap::with_capacity(capacity))
    }

    /// Inserts a key-value pair.
    ///
    /// An existing key keeps its position; the old value is returned.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde_cbon::{CbonMap, Value};
    ///
    /// let mut map = CbonMap::new();
    /// assert!(map.insert("key".to_string(), Value::from(42)).is_none());
    /// assert_eq!(map.insert("key".to_string(), Value::from(43)), Some(Value::from(42)));
    /// ```
    pub fn insert(&mut self, key: String, value: Value) -> Option<Value> {
        self.0.insert(key, value)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.0.get_mut(key)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Removes a key, shifting later entries up so order is preserved.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.shift_remove(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> indexmap::map::Keys<'_, String, Value> {
        self.0.keys()
    }

    pub fn values(&self) -> indexmap::map::Values<'_, String, Value> {
        self.0.values()
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, String, Value> {
        self.0.iter()
    }

    pub fn iter_mut(&mut self) -> indexmap::map::IterMut<'_, String, Value> {
        self.0.iter_mut()
    }

    /// Empties the map, yielding its values.
    pub(crate) fn drain_values(&mut self) -> impl Iterator<Item = Value> + '_ {
        self.0.drain(..).map(|(_, value)| value)
    }
}

impl Index<&str> for CbonMap {
    type Output = Value;

    /// # Panics
    ///
    /// If the key is not present.
    fn index(&self, key: &str) -> &Value {
        &self.0[key]
    }
}

impl From<HashMap<String, Value>> for CbonMap {
    fn from(map: HashMap<String, Value>) -> Self {
        CbonMap(map.into_iter().collect())
    }
}

impl From<CbonMap> for HashMap<String, Value> {
    fn from(map: CbonMap) -> Self {
        map.0.into_iter().collect()
    }
}

impl IntoIterator for CbonMap {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a CbonMap {
    type Item = (&'a String, &'a Value);
    type IntoIter = indexmap::map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromIterator<(String, Value)> for CbonMap {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        CbonMap(IndexMap::from_iter(iter))
    }
}
