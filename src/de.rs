//! CBON deserialization.
//!
//! Text is parsed and materialized first; [`ValueDeserializer`] then drives any
//! `T: Deserialize` from the resulting [`Value`].
//!
//! ## Examples
//!
//! ```rust
//! use serde::Deserialize;
//! use serde_cbon::from_str;
//!
//! #[derive(Deserialize, Debug, PartialEq)]
//! struct Config { name: String, port: u16, debug: bool }
//!
//! let text = "
//!     # service settings
//!     {
//!         name = api
//!         port = 8080
//!         debug = false
//!     }
//! ";
//! let config: Config = from_str(text).unwrap();
//! assert_eq!(config, Config { name: "api".into(), port: 8080, debug: false });
//! ```
//!
//! Several documents in one text:
//!
//! ```rust
//! use serde_cbon::{from_str, from_str_all};
//!
//! let all: Vec<Vec<u8>> = from_str_all("[1 2] [3]").unwrap();
//! assert_eq!(all, vec![vec![1, 2], vec![3]]);
//!
//! // `from_str` sees more than one document as an array of them.
//! let same: Vec<Vec<u8>> = from_str("[1 2] [3]").unwrap();
//! assert_eq!(same, all);
//! ```

use crate::drive::parse_str;
use crate::error::{Error, Result};
use crate::map::CbonMap;
use crate::materialize::materialize;
use crate::options::ParseOptions;
use crate::value::Value;
use serde::de::{self, Deserialize, IntoDeserializer};
use serde::forward_to_deserialize_any;

/// Parses `text` into its document values, failing on any diagnostic.
pub(crate) fn documents(text: &str) -> Result<Vec<Value>> {
    let parsed = parse_str(text, &ParseOptions::collect_all())?;
    Ok(materialize(&parsed.into_result()?))
}

/// Deserializes a `T` from a [`Value`].
///
/// # Errors
///
/// [`Error::Circular`] if a shared cell contains itself, or a deserialization
/// error if the data does not fit `T`.
///
/// # Examples
///
/// ```rust
/// use serde_cbon::{cbon, from_value};
/// use std::collections::BTreeMap;
///
/// let scores: BTreeMap<String, f64> = from_value(cbon!({ "a": 1, "b": 2.5 })).unwrap();
/// assert_eq!(scores["b"], 2.5);
/// ```
pub fn from_value<T>(value: Value) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
{
    T::deserialize(ValueDeserializer::new(value))
}

/// Containers nested deeper than this are refused rather than recursed into.
const MAX_DEPTH: usize = 128;

/// A deserializer over an owned [`Value`].
///
/// Arrays and objects nested more than 128 levels deep are an error.
pub struct ValueDeserializer {
    value: Value,
    depth: usize,
}

impl ValueDeserializer {
    #[must_use]
    pub fn new(value: Value) -> Self {
        ValueDeserializer { value, depth: 0 }
    }

    fn nested(value: Value, depth: usize) -> Self {
        ValueDeserializer { value, depth }
    }

    /// The value with shared cells replaced by their contents.
    fn plain(&mut self) -> Result<Value> {
        match &self.value {
            Value::Shared(_) => self.value.unshare(),
            _ => Ok(std::mem::take(&mut self.value)),
        }
    }

    /// Depth for the children of a container at this level.
    fn enter(&self) -> Result<usize> {
        if self.depth >= MAX_DEPTH {
            Err(Error::custom(format!(
                "Recursion limit exceeded: more than {} nested levels",
                MAX_DEPTH
            )))
        } else {
            Ok(self.depth + 1)
        }
    }

    fn seq(&self, items: &mut Vec<Value>) -> Result<SeqDeserializer> {
        Ok(SeqDeserializer::new(std::mem::take(items), self.enter()?))
    }

    fn map(&self, map: &mut CbonMap) -> Result<MapDeserializer> {
        Ok(MapDeserializer::new(std::mem::take(map), self.enter()?))
    }
}

impl<'de> de::Deserializer<'de> for ValueDeserializer {
    type Error = Error;

    fn deserialize_any<V>(mut self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        let mut value = self.plain()?;
        match &mut value {
            Value::Null => visitor.visit_unit(),
            Value::Bool(b) => visitor.visit_bool(*b),
            Value::Number(n) => match (n.as_i64(), n.as_u64()) {
                (Some(i), _) => visitor.visit_i64(i),
                (None, Some(u)) => visitor.visit_u64(u),
                _ => visitor.visit_f64(n.as_f64()),
            },
            Value::String(s) => visitor.visit_string(std::mem::take(s)),
            Value::Array(arr) => visitor.visit_seq(self.seq(arr)?),
            Value::Object(obj) => visitor.visit_map(self.map(obj)?),
            Value::Shared(_) => Err(Error::custom("shared value left after unsharing")),
        }
    }

    fn deserialize_option<V>(mut self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.plain()? {
            Value::Null => visitor.visit_none(),
            value => visitor.visit_some(ValueDeserializer::nested(value, self.depth)),
        }
    }

    fn deserialize_newtype_struct<V>(self, _name: &'static str, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V>(
        mut self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        let mut value = self.plain()?;
        match &mut value {
            Value::String(s) => visitor.visit_enum(std::mem::take(s).into_deserializer()),
            Value::Object(obj) if obj.len() == 1 => {
                let depth = self.enter()?;
                match std::mem::take(obj).into_iter().next() {
                    Some((variant, value)) => {
                        visitor.visit_enum(EnumDeserializer::new(variant, value, depth))
                    }
                    None => Err(Error::custom("Expected enum variant")),
                }
            }
            Value::Object(_) => Err(Error::custom("Expected an object with exactly one variant key")),
            _ => Err(Error::custom("Expected enum")),
        }
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf unit unit_struct seq tuple
        tuple_struct map struct identifier ignored_any
    }
}

struct SeqDeserializer {
    iter: std::vec::IntoIter<Value>,
    depth: usize,
}

impl SeqDeserializer {
    fn new(vec: Vec<Value>, depth: usize) -> Self {
        SeqDeserializer {
            iter: vec.into_iter(),
            depth,
        }
    }
}

impl<'de> de::SeqAccess<'de> for SeqDeserializer {
    type Error = Error;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>>
    where
        T: de::DeserializeSeed<'de>,
    {
        match self.iter.next() {
            Some(value) => seed
                .deserialize(ValueDeserializer::nested(value, self.depth))
                .map(Some),
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}

struct MapDeserializer {
    iter: indexmap::map::IntoIter<String, Value>,
    value: Option<Value>,
    depth: usize,
}

impl MapDeserializer {
    fn new(map: CbonMap, depth: usize) -> Self {
        MapDeserializer {
            iter: map.into_iter(),
            value: None,
            depth,
        }
    }
}

impl<'de> de::MapAccess<'de> for MapDeserializer {
    type Error = Error;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>>
    where
        K: de::DeserializeSeed<'de>,
    {
        match self.iter.next() {
            Some((key, value)) => {
                self.value = Some(value);
                seed.deserialize(KeyDeserializer(key)).map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value>
    where
        V: de::DeserializeSeed<'de>,
    {
        match self.value.take() {
            Some(value) => seed.deserialize(ValueDeserializer::nested(value, self.depth)),
            None => Err(Error::custom("next_value_seed called before next_key_seed")),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}

/// Keys are always text; numeric and boolean key types parse it.
struct KeyDeserializer(String);

macro_rules! deserialize_parsed_key {
    ($($method:ident => $visit:ident: $ty:ty),* $(,)?) => {
        $(
            fn $method<V>(self, visitor: V) -> Result<V::Value>
            where
                V: de::Visitor<'de>,
            {
                match self.0.parse::<$ty>() {
                    Ok(parsed) => visitor.$visit(parsed),
                    Err(_) => visitor.visit_string(self.0),
                }
            }
        )*
    };
}

impl<'de> de::Deserializer<'de> for KeyDeserializer {
    type Error = Error;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_string(self.0)
    }

    deserialize_parsed_key! {
        deserialize_bool => visit_bool: bool,
        deserialize_i8 => visit_i8: i8,
        deserialize_i16 => visit_i16: i16,
        deserialize_i32 => visit_i32: i32,
        deserialize_i64 => visit_i64: i64,
        deserialize_u8 => visit_u8: u8,
        deserialize_u16 => visit_u16: u16,
        deserialize_u32 => visit_u32: u32,
        deserialize_u64 => visit_u64: u64,
        deserialize_f32 => visit_f32: f32,
        deserialize_f64 => visit_f64: f64,
    }

    fn deserialize_newtype_struct<V>(self, _name: &'static str, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_enum(self.0.into_deserializer())
    }

    forward_to_deserialize_any! {
        i128 u128 char str string bytes byte_buf option unit unit_struct seq tuple
        tuple_struct map struct identifier ignored_any
    }
}

struct EnumDeserializer {
    variant: String,
    value: Value,
    depth: usize,
}

impl EnumDeserializer {
    fn new(variant: String, value: Value, depth: usize) -> Self {
        EnumDeserializer {
            variant,
            value,
            depth,
        }
    }
}

impl<'de> de::EnumAccess<'de> for EnumDeserializer {
    type Error = Error;
    type Variant = ValueDeserializer;

    fn variant_seed<V>(self, seed: V) -> Result<(V::Value, Self::Variant)>
    where
        V: de::DeserializeSeed<'de>,
    {
        let variant = seed.deserialize(KeyDeserializer(self.variant))?;
        Ok((variant, ValueDeserializer::nested(self.value, self.depth)))
    }
}

/// The content of a `{Variant content}` object.
impl<'de> de::VariantAccess<'de> for ValueDeserializer {
    type Error = Error;

    fn unit_variant(self) -> Result<()> {
        match self.value {
            Value::Null => Ok(()),
            _ => Err(Error::custom("Expected unit variant")),
        }
    }

    fn newtype_variant_seed<T>(self, seed: T) -> Result<T::Value>
    where
        T: de::DeserializeSeed<'de>,
    {
        seed.deserialize(self)
    }

    fn tuple_variant<V>(mut self, _len: usize, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match &mut self.plain()? {
            Value::Array(arr) => visitor.visit_seq(self.seq(arr)?),
            _ => Err(Error::custom("Expected tuple variant")),
        }
    }

    fn struct_variant<V>(mut self, _fields: &'static [&'static str], visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match &mut self.plain()? {
            Value::Object(obj) => visitor.visit_map(self.map(obj)?),
            _ => Err(Error::custom("Expected struct variant")),
        }
    }
}
