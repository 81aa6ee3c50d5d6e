//! CBON serialization.
//!
//! Output is produced in two steps: any `T: Serialize` is first converted to a
//! [`Value`] by [`ValueSerializer`], then written by [`Serializer`] following a
//! [`CbonOptions`] layout.
//!
//! ## Layout
//!
//! - Strings that would read back as the same bare word are written bare,
//!   everything else is quoted and escaped.
//! - Keys are written bare when they are a single word.
//! - Numbers use the shortest decimal that reads back exactly; NaN and the
//!   infinities are written as `null`.
//! - Shared cells are followed; a cell met again inside itself fails with
//!   [`Error::Circular`].
//!
//! ## Examples
//!
//! ```rust
//! use serde::Serialize;
//! use serde_cbon::{to_string, to_string_pretty};
//!
//! #[derive(Serialize)]
//! struct Server { host: String, ports: Vec<u16>, note: Option<String> }
//!
//! let server = Server { host: "example.org".into(), ports: vec![80, 443], note: None };
//! assert_eq!(to_string(&server).unwrap(), "{host example.org,ports[80,443],note null}");
//! assert_eq!(
//!     to_string_pretty(&server).unwrap(),
//!     "{\n  host example.org\n  ports [\n    80\n    443\n  ]\n  note null\n}"
//! );
//! ```
//!
//! Scalars serialize too, but only blocks and arrays are documents that can be
//! parsed back.

use crate::error::{Error, Result};
use crate::map::CbonMap;
use crate::options::{CbonOptions, Splitter};
use crate::parser::is_bare_string;
use crate::value::Value;
use serde::{ser, Serialize};
use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt::Write as _;
use std::rc::Rc;

/// Renders `value` as CBON text.
///
/// # Errors
///
/// [`Error::Circular`] if a shared cell contains itself.
///
/// # Examples
///
/// ```rust
/// use serde_cbon::{cbon, stringify, CbonOptions, Splitter};
///
/// let value = cbon!({ "a b": "", "n": 1.5 });
/// let options = CbonOptions::new().with_splitter(Splitter::Equals);
/// assert_eq!(stringify(&value, &options).unwrap(), "{'a b'='',n=1.5}");
/// ```
pub fn stringify(value: &Value, options: &CbonOptions) -> Result<String> {
    let mut serializer = Serializer::new(options);
    serializer.write_value(value)?;
    Ok(serializer.into_inner())
}

/// Writes [`Value`]s as CBON text.
///
/// # Examples
///
/// ```rust
/// use serde_cbon::{cbon, CbonOptions, Serializer};
///
/// let options = CbonOptions::min();
/// let mut serializer = Serializer::new(&options);
/// serializer.write_value(&cbon!([1, "two", [3]])).unwrap();
/// assert_eq!(serializer.into_inner(), "[1 two [3]]");
/// ```
pub struct Serializer<'o> {
    output: String,
    options: &'o CbonOptions,
    level: usize,
    /// Shared cells currently being written.
    active: HashSet<*const RefCell<Value>>,
}

impl<'o> Serializer<'o> {
    #[must_use]
    pub fn new(options: &'o CbonOptions) -> Self {
        Serializer {
            output: String::new(),
            options,
            level: 0,
            active: HashSet::new(),
        }
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.output
    }

    /// Appends one value to the output.
    pub fn write_value(&mut self, value: &Value) -> Result<()> {
        let options = self.options;
        if let Some(text) = options.replacer.as_ref().and_then(|replace| replace(value)) {
            self.output.push_str(&text);
            return Ok(());
        }
        match value {
            Value::Null => self.output.push_str("null"),
            Value::Bool(b) => self.output.push_str(if *b { "true" } else { "false" }),
            Value::Number(n) if n.is_finite() => {
                let _ = write!(self.output, "{}", n);
            }
            Value::Number(_) => self.output.push_str("null"),
            Value::String(s) => {
                if !options.strict_string && is_bare_string(s) {
                    self.output.push_str(s);
                } else {
                    self.write_quoted(s);
                }
            }
            Value::Array(items) => self.write_array(items)?,
            Value::Object(map) => self.write_object(map)?,
            Value::Shared(cell) => self.write_shared(cell)?,
        }
        Ok(())
    }

    fn write_shared(&mut self, cell: &Rc<RefCell<Value>>) -> Result<()> {
        let key = Rc::as_ptr(cell);
        if !self.active.insert(key) {
            return Err(Error::Circular);
        }
        let inner = cell.try_borrow().map_err(Error::custom)?;
        let result = self.write_value(&inner);
        self.active.remove(&key);
        result
    }

    fn write_array(&mut self, items: &[Value]) -> Result<()> {
        self.output.push('[');
        let count = items.len();
        for (i, item) in items.iter().enumerate() {
            self.begin_item(i);
            self.write_value(item)?;
            self.end_item(i, count);
        }
        self.close(']', count);
        Ok(())
    }

    fn write_object(&mut self, map: &CbonMap) -> Result<()> {
        self.output.push('{');
        let count = map.len();
        for (i, (key, value)) in map.iter().enumerate() {
            self.begin_item(i);
            self.write_key(key);
            let separator = self.key_separator(value);
            self.output.push_str(separator);
            self.write_value(value)?;
            self.end_item(i, count);
        }
        self.close('}', count);
        Ok(())
    }

    fn begin_item(&mut self, index: usize) {
        if self.options.pretty {
            if index == 0 {
                self.level += 1;
            }
            self.output.push('\n');
            self.indent();
        } else if index > 0 {
            let separator = self.options.inline_separator();
            self.output.push_str(separator);
        }
    }

    fn end_item(&mut self, index: usize, count: usize) {
        if self.options.pretty && self.options.comma && index + 1 < count {
            self.output.push(',');
        }
    }

    fn close(&mut self, bracket: char, count: usize) {
        if self.options.pretty && count > 0 {
            self.level -= 1;
            self.output.push('\n');
            self.indent();
        }
        self.output.push(bracket);
    }

    fn indent(&mut self) {
        let width = self.level * self.options.indent_width;
        self.output
            .extend(std::iter::repeat(self.options.indent.as_char()).take(width));
    }

    fn write_key(&mut self, key: &str) {
        if !self.options.strict_key && is_bare_key(key) {
            self.output.push_str(key);
        } else {
            self.write_quoted(key);
        }
    }

    fn key_separator(&self, value: &Value) -> &'static str {
        let pretty = self.options.pretty;
        if value.is_container() && !self.options.split_before_brackets {
            return if pretty { " " } else { "" };
        }
        match (self.options.splitter, pretty) {
            (Splitter::Space, _) => " ",
            (Splitter::Colon, false) => ":",
            (Splitter::Colon, true) => ": ",
            (Splitter::Equals, false) => "=",
            (Splitter::Equals, true) => " = ",
        }
    }

    fn write_quoted(&mut self, text: &str) {
        let quote = self.options.quote.as_char();
        self.output.push(quote);
        for c in text.chars() {
            match c {
                '\\' => self.output.push_str("\\\\"),
                '\n' => self.output.push_str("\\n"),
                '\r' => self.output.push_str("\\r"),
                '\t' => self.output.push_str("\\t"),
                '\0' => self.output.push_str("\\0"),
                '\u{8}' => self.output.push_str("\\b"),
                '\u{c}' => self.output.push_str("\\f"),
                '\u{b}' => self.output.push_str("\\v"),
                c if c == quote => {
                    self.output.push('\\');
                    self.output.push(c);
                }
                c if c.is_control() => {
                    let _ = write!(self.output, "\\u{{{:x}}}", c as u32);
                }
                c => self.output.push(c),
            }
        }
        self.output.push(quote);
    }
}

/// A key reads back as a word unless it is empty or contains a terminator.
fn is_bare_key(key: &str) -> bool {
    !key.is_empty() && !key.chars().any(|c| crate::lexer::ends_word(c) || c.is_control())
}

/// Converts any `T: Serialize` into a [`Value`].
///
/// Newtype, tuple and struct variants become single-entry objects keyed by the
/// variant name; unit variants become strings.
pub struct ValueSerializer;

pub struct SerializeVec {
    vec: Vec<Value>,
    variant: Option<&'static str>,
}

pub struct SerializeMap {
    map: CbonMap,
    current_key: Option<String>,
    variant: Option<&'static str>,
}

fn wrap_variant(variant: Option<&'static str>, value: Value) -> Value {
    match variant {
        Some(name) => {
            let mut map = CbonMap::with_capacity(1);
            map.insert(name.to_string(), value);
            Value::Object(map)
        }
        None => value,
    }
}

impl ser::Serializer for ValueSerializer {
    type Ok = Value;
    type Error = Error;

    type SerializeSeq = SerializeVec;
    type SerializeTuple = SerializeVec;
    type SerializeTupleStruct = SerializeVec;
    type SerializeTupleVariant = SerializeVec;
    type SerializeMap = SerializeMap;
    type SerializeStruct = SerializeMap;
    type SerializeStructVariant = SerializeMap;

    fn serialize_bool(self, v: bool) -> Result<Value> {
        Ok(Value::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> Result<Value> {
        Ok(Value::from(v))
    }

    fn serialize_i16(self, v: i16) -> Result<Value> {
        Ok(Value::from(v))
    }

    fn serialize_i32(self, v: i32) -> Result<Value> {
        Ok(Value::from(v))
    }

    fn serialize_i64(self, v: i64) -> Result<Value> {
        Ok(Value::from(v))
    }

    fn serialize_u8(self, v: u8) -> Result<Value> {
        Ok(Value::from(v))
    }

    fn serialize_u16(self, v: u16) -> Result<Value> {
        Ok(Value::from(v))
    }

    fn serialize_u32(self, v: u32) -> Result<Value> {
        Ok(Value::from(v))
    }

    fn serialize_u64(self, v: u64) -> Result<Value> {
        Ok(Value::from(v))
    }

    fn serialize_f32(self, v: f32) -> Result<Value> {
        Ok(Value::from(v))
    }

    fn serialize_f64(self, v: f64) -> Result<Value> {
        Ok(Value::from(v))
    }

    fn serialize_char(self, v: char) -> Result<Value> {
        Ok(Value::String(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> Result<Value> {
        Ok(Value::String(v.to_string()))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<Value> {
        Ok(Value::Array(v.iter().map(|&b| Value::from(b)).collect()))
    }

    fn serialize_none(self) -> Result<Value> {
        Ok(Value::Null)
    }

    fn serialize_some<T>(self, value: &T) -> Result<Value>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Value> {
        Ok(Value::Null)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<Value> {
        Ok(Value::Null)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<Value> {
        Ok(Value::String(variant.to_string()))
    }

    fn serialize_newtype_struct<T>(self, _name: &'static str, value: &T) -> Result<Value>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<Value>
    where
        T: ?Sized + Serialize,
    {
        Ok(wrap_variant(Some(variant), to_value(value)?))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<SerializeVec> {
        Ok(SerializeVec::new(len.unwrap_or(0), None))
    }

    fn serialize_tuple(self, len: usize) -> Result<SerializeVec> {
        Ok(SerializeVec::new(len, None))
    }

    fn serialize_tuple_struct(self, _name: &'static str, len: usize) -> Result<SerializeVec> {
        Ok(SerializeVec::new(len, None))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<SerializeVec> {
        Ok(SerializeVec::new(len, Some(variant)))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<SerializeMap> {
        Ok(SerializeMap::new(None))
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<SerializeMap> {
        Ok(SerializeMap::new(None))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<SerializeMap> {
        Ok(SerializeMap::new(Some(variant)))
    }
}

impl SerializeVec {
    fn new(capacity: usize, variant: Option<&'static str>) -> Self {
        SerializeVec {
            vec: Vec::with_capacity(capacity),
            variant,
        }
    }

    fn push<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        self.vec.push(to_value(value)?);
        Ok(())
    }

    fn finish(self) -> Value {
        wrap_variant(self.variant, Value::Array(self.vec))
    }
}

impl SerializeMap {
    fn new(variant: Option<&'static str>) -> Self {
        SerializeMap {
            map: CbonMap::new(),
            current_key: None,
            variant,
        }
    }

    fn finish(self) -> Value {
        wrap_variant(self.variant, Value::Object(self.map))
    }
}

impl ser::SerializeSeq for SerializeVec {
    type Ok = Value;
    type Error = Error;

    fn serialize_element<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.push(value)
    }

    fn end(self) -> Result<Value> {
        Ok(self.finish())
    }
}

impl ser::SerializeTuple for SerializeVec {
    type Ok = Value;
    type Error = Error;

    fn serialize_element<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.push(value)
    }

    fn end(self) -> Result<Value> {
        Ok(self.finish())
    }
}

impl ser::SerializeTupleStruct for SerializeVec {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.push(value)
    }

    fn end(self) -> Result<Value> {
        Ok(self.finish())
    }
}

impl ser::SerializeTupleVariant for SerializeVec {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.push(value)
    }

    fn end(self) -> Result<Value> {
        Ok(self.finish())
    }
}

impl ser::SerializeMap for SerializeMap {
    type Ok = Value;
    type Error = Error;

    fn serialize_key<T>(&mut self, key: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        let mut key = to_value(key)?;
        let key = match &mut key {
            Value::String(s) => std::mem::take(s),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            other => {
                return Err(Error::unsupported_type(&format!(
                    "map key must be a string, number or boolean, not {:?}",
                    other
                )))
            }
        };
        self.current_key = Some(key);
        Ok(())
    }

    fn serialize_value<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        let key = self
            .current_key
            .take()
            .ok_or_else(|| Error::custom("serialize_value called without serialize_key"))?;
        self.map.insert(key, to_value(value)?);
        Ok(())
    }

    fn end(self) -> Result<Value> {
        Ok(self.finish())
    }
}

impl ser::SerializeStruct for SerializeMap {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.map.insert(key.to_string(), to_value(value)?);
        Ok(())
    }

    fn end(self) -> Result<Value> {
        Ok(self.finish())
    }
}

impl ser::SerializeStructVariant for SerializeMap {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.map.insert(key.to_string(), to_value(value)?);
        Ok(())
    }

    fn end(self) -> Result<Value> {
        Ok(self.finish())
    }
}

/// Converts any `T: Serialize` to a [`Value`].
///
/// # Errors
///
/// If `T`'s `Serialize` implementation fails, or a map key is not a string,
/// number or boolean.
pub fn to_value<T>(value: &T) -> Result<Value>
where
    T: ?Sized + Serialize,
{
    value.serialize(ValueSerializer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Indent;
    use crate::token::Quote;
    use serde::Serialize;

    fn obj(entries: &[(&str, Value)]) -> Value {
        Value::Object(
            entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        )
    }

    fn render(value: &Value, options: CbonOptions) -> String {
        stringify(value, &options).unwrap()
    }

    #[test]
    fn test_presets() {
        let value = obj(&[
            ("a", Value::from(1)),
            ("b", Value::Array(vec![Value::from("x y"), Value::Null])),
        ]);
        assert_eq!(render(&value, CbonOptions::new()), "{a 1,b['x y',null]}");
        assert_eq!(render(&value, CbonOptions::min()), "{a 1 b['x y' null]}");
        assert_eq!(
            render(&value, CbonOptions::json()),
            r#"{"a":1,"b":["x y",null]}"#
        );
    }

    #[test]
    fn test_pretty_with_commas_and_tabs() {
        let value = obj(&[("a", Value::from(1)), ("b", Value::Array(vec![]))]);
        let options = CbonOptions::pretty()
            .with_comma(true)
            .with_splitter(Splitter::Colon)
            .with_indent(Indent::Tab, 1);
        assert_eq!(render(&value, options), "{\n\ta: 1,\n\tb []\n}");

        let json = CbonOptions::json().with_pretty(true);
        assert_eq!(render(&value, json), "{\n  \"a\": 1,\n  \"b\": []\n}");
    }

    #[test]
    fn test_splitters() {
        let value = obj(&[("k", Value::from(true))]);
        for (splitter, expected) in [
            (Splitter::Space, "{k true}"),
            (Splitter::Colon, "{k:true}"),
            (Splitter::Equals, "{k=true}"),
        ] {
            assert_eq!(render(&value, CbonOptions::new().with_splitter(splitter)), expected);
        }
        let nested = obj(&[("k", Value::Array(vec![]))]);
        let options = CbonOptions::new()
            .with_splitter(Splitter::Equals)
            .with_split_before_brackets(true);
        assert_eq!(render(&nested, options), "{k=[]}");
    }

    #[test]
    fn test_string_quoting() {
        let words = Value::Array(
            ["plain", "true", "12", "1.2.3", "", "a,b", "it's", "line\nbreak"]
                .iter()
                .map(|s| Value::from(*s))
                .collect(),
        );
        assert_eq!(
            render(&words, CbonOptions::new()),
            r"[plain,'true','12','1.2.3','','a,b','it\'s','line\nbreak']"
        );
        let double = CbonOptions::new().with_quote(Quote::Double).with_strict_string(true);
        assert_eq!(
            render(&Value::Array(vec![Value::from("it's \"x\"")]), double),
            r#"["it's \"x\""]"#
        );
    }

    #[test]
    fn test_escapes() {
        let value = Value::from("\\\t\0\u{8}\u{c}\u{b}\r\u{1}");
        assert_eq!(
            render(&value, CbonOptions::new()),
            r"'\\\t\0\b\f\v\r\u{1}'"
        );
    }

    #[test]
    fn test_keys() {
        let value = obj(&[("a b", Value::from(1)), ("true", Value::from(2))]);
        assert_eq!(render(&value, CbonOptions::new()), "{'a b' 1,true 2}");
        let strict = CbonOptions::new().with_strict_key(true);
        assert_eq!(render(&value, strict), "{'a b' 1,'true' 2}");
    }

    #[test]
    fn test_numbers() {
        let value = Value::Array(vec![
            Value::from(1),
            Value::from(-2.5),
            Value::from(1e21),
            Value::from(f64::NAN),
            Value::from(f64::NEG_INFINITY),
        ]);
        assert_eq!(
            render(&value, CbonOptions::new()),
            "[1,-2.5,1e21,null,null]"
        );

        let extremes = vec![1e300, -5e-324, 1.5e-7, 123456.75, 0.0];
        let text = crate::to_string(&extremes).unwrap();
        assert_eq!(text, "[1e300,-5e-324,1.5e-7,123456.75,0]");
        assert_eq!(crate::from_str::<Vec<f64>>(&text).unwrap(), extremes);
    }

    #[test]
    fn test_replacer() {
        let options = CbonOptions::new().with_replacer(|v: &Value| {
            v.as_str()
                .filter(|s| s.starts_with("secret"))
                .map(|_| "'***'".to_string())
        });
        let value = obj(&[("user", Value::from("bob")), ("pass", Value::from("secret1"))]);
        assert_eq!(render(&value, options), "{user bob,pass '***'}");
    }

    #[test]
    fn test_shared_and_circular() {
        let shared = Value::shared(obj(&[("x", Value::from(1))]));
        let value = Value::Array(vec![shared.clone(), shared.clone()]);
        assert_eq!(render(&value, CbonOptions::new()), "[{x 1},{x 1}]");

        if let Value::Shared(cell) = &shared {
            if let Some(map) = cell.borrow_mut().as_object_mut() {
                map.insert("self".to_string(), shared.clone());
            }
        }
        let err = stringify(&value, &CbonOptions::new()).unwrap_err();
        assert!(matches!(err, Error::Circular));
        assert_eq!(err.to_string(), "Converting circular structure to CBON");
    }

    #[derive(Serialize)]
    enum Shape {
        Dot,
        Circle(f64),
        Line(i32, i32),
        Rect { w: u8, h: u8 },
    }

    #[test]
    fn test_to_value_variants() {
        let shapes = vec![
            Shape::Dot,
            Shape::Circle(1.5),
            Shape::Line(1, 2),
            Shape::Rect { w: 3, h: 4 },
        ];
        let value = to_value(&shapes).unwrap();
        assert_eq!(
            render(&value, CbonOptions::new()),
            "[Dot,{Circle 1.5},{Line[1,2]},{Rect{w 3,h 4}}]"
        );
    }

    #[test]
    fn test_map_keys() {
        let mut map = std::collections::BTreeMap::new();
        map.insert(1, "one");
        map.insert(2, "two");
        let value = to_value(&map).unwrap();
        assert_eq!(render(&value, CbonOptions::new()), "{1 one,2 two}");
        assert!(matches!(
            to_value(&std::collections::HashMap::from([((1, 2), 3)])),
            Err(Error::UnsupportedType(_))
        ));
    }
}
