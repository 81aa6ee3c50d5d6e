//! # serde_cbon
//!
//! A parser, serializer and Serde bridge for CBON, a relaxed JSON-like
//! configuration format.
//!
//! ## What is CBON?
//!
//! CBON reads like JSON with the noise taken out:
//!
//! - Keys and simple strings need no quotes; strings may use `'` or `"`
//! - Keys and values are separated by `:`, `=` or just whitespace
//! - Commas between entries are optional
//! - `//` and `#` line comments, `/* */` and `#* *#` block comments, which nest
//! - Numbers may be hex (`0xff`) and carry digit separators (`1_000`)
//! - One text can hold several top-level documents, each a block or an array
//!
//! ```text
//! # server settings
//! {
//!     host = localhost
//!     ports [80, 443]
//!     banner: 'it\'s up'
//! }
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use serde::{Deserialize, Serialize};
//! use serde_cbon::{from_str, to_string};
//!
//! #[derive(Serialize, Deserialize, PartialEq, Debug)]
//! struct User {
//!     id: u32,
//!     name: String,
//!     active: bool,
//! }
//!
//! let user = User { id: 123, name: "Alice".to_string(), active: true };
//!
//! let text = to_string(&user).unwrap();
//! assert_eq!(text, "{id 123,name Alice,active true}");
//!
//! let user_back: User = from_str(&text).unwrap();
//! assert_eq!(user, user_back);
//! ```
//!
//! ## Pipeline
//!
//! Text goes through a tokenizer and a parser, both pushdown automata fed one
//! symbol at a time, into a syntax tree ([`Docs`]) that keeps comments,
//! separators and source ranges. [`materialize`] reduces the tree to plain
//! [`Value`]s, and [`stringify`] writes values back out.
//!
//! Each stage can run over a whole string, an iterator, or a
//! [`Stream`](futures_core::Stream); all shapes produce the same output in the
//! same order.
//!
//! ```rust
//! use serde_cbon::{parse_str, Doc, ParseOptions};
//!
//! let parsed = parse_str("{a 1} /* done */", &ParseOptions::new()).unwrap();
//! assert!(matches!(parsed.value.items[1], Doc::Comment(_)));
//! ```
//!
//! ## Diagnostics
//!
//! Parsing runs in one of two [`ErrorMode`]s. Fail-fast stops at the first
//! problem. Collect-all records every problem, recovers locally, and always
//! produces a tree:
//!
//! ```rust
//! use serde_cbon::{materialize, parse_str, ParseOptions};
//!
//! let parsed = parse_str("{a:1", &ParseOptions::collect_all()).unwrap();
//! assert_eq!(parsed.diagnostics.len(), 1);
//! assert_eq!(
//!     parsed.diagnostics[0].to_string(),
//!     "Block is not closed\n    at 1:5 to 1:5"
//! );
//! assert_eq!(materialize(&parsed.value)[0].to_string(), "{a 1}");
//!
//! let err = parse_str("{a:1", &ParseOptions::new()).unwrap_err();
//! assert_eq!(err.as_diagnostics().map(|d| d.len()), Some(1));
//! ```
//!
//! ## Dynamic Values with the cbon! Macro
//!
//! ```rust
//! use serde_cbon::{cbon, Value};
//!
//! let data = cbon!({
//!     "name": "Alice",
//!     "age": 30,
//!     "tags": ["rust", "serde"]
//! });
//!
//! if let Value::Object(ref obj) = data {
//!     assert_eq!(obj.get("name").and_then(|v| v.as_str()), Some("Alice"));
//! }
//! ```
//!
//! ## Demos
//!
//! See the `demos/` directory:
//!
//! - **`simple.rs`** - serializing and reading back a struct
//! - **`macro.rs`** - building values with the cbon! macro
//! - **`diagnostics.rs`** - fail-fast and collect-all parsing of broken input
//! - **`dynamic_values.rs`** - working with [`Value`] dynamically
//! - **`custom_options.rs`** - output presets and layout knobs
//! - **`streaming.rs`** - iterator and stream shapes, suspension and cancellation
//!
//! Run any demo with: `cargo run --example <name>`

pub mod ast;
pub mod de;
pub mod drive;
pub mod error;
pub mod lexer;
pub mod machine;
pub mod macros;
pub mod map;
pub mod materialize;
pub mod options;
pub mod parser;
pub mod pos;
pub mod ser;
pub mod token;
pub mod value;

pub use ast::{Arr, ArrItem, Block, BlockItem, Doc, Docs, Key, KeyVal, Node, Split, SplitKind, Str};
pub use de::{from_value, ValueDeserializer};
pub use drive::{
    parse, parse_async, parse_chars_async, parse_chars_iter, parse_chars_stream, parse_iter,
    parse_stream, parse_str, tokenize, tokenize_async, tokenize_iter, tokenize_stream, Parsed,
};
pub use error::{render_diagnostics, Diagnostic, Diagnostics, Error, Result};
pub use machine::ErrorMode;
pub use map::CbonMap;
pub use materialize::{materialize, materialize_doc, materialize_node};
pub use options::{Canceller, CbonOptions, Indent, ParseOptions, Replacer, Splitter};
pub use pos::{Position, Range};
pub use ser::{stringify, to_value, Serializer, ValueSerializer};
pub use token::{Comment, CommentKind, CommentPart, Marker, Quote, Symbol, Token};
pub use value::{Number, Value};

use serde::{Deserialize, Serialize};
use std::io;

/// Serialize any `T: Serialize` to a CBON string.
///
/// # Examples
///
/// ```rust
/// use serde_cbon::to_string;
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Point { x: i32, y: i32 }
///
/// let point = Point { x: 1, y: 2 };
/// assert_eq!(to_string(&point).unwrap(), "{x 1,y 2}");
/// ```
///
/// # Errors
///
/// Returns an error if the value cannot be serialized (e.g., a circular shared value).
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_string<T>(value: &T) -> Result<String>
where
    T: ?Sized + Serialize,
{
    to_string_with_options(value, CbonOptions::default())
}

/// Serialize any `T: Serialize` to a pretty-printed CBON string.
///
/// Pretty-printing puts every entry on its own indented line.
///
/// # Examples
///
/// ```rust
/// use serde_cbon::to_string_pretty;
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Point { x: i32, y: i32 }
///
/// let point = Point { x: 1, y: 2 };
/// assert_eq!(to_string_pretty(&point).unwrap(), "{\n  x 1\n  y 2\n}");
/// ```
///
/// # Errors
///
/// Returns an error if the value cannot be serialized.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_string_pretty<T>(value: &T) -> Result<String>
where
    T: ?Sized + Serialize,
{
    to_string_with_options(value, CbonOptions::pretty())
}

/// Serialize any `T: Serialize` to a CBON string with custom options.
///
/// # Examples
///
/// ```rust
/// use serde_cbon::{to_string_with_options, CbonOptions, Quote, Splitter};
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Point { x: i32, label: String }
///
/// let point = Point { x: 1, label: "a b".into() };
/// let options = CbonOptions::new()
///     .with_splitter(Splitter::Equals)
///     .with_quote(Quote::Double);
/// assert_eq!(to_string_with_options(&point, options).unwrap(), "{x=1,label=\"a b\"}");
/// ```
///
/// # Errors
///
/// Returns an error if the value cannot be serialized.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_string_with_options<T>(value: &T, options: CbonOptions) -> Result<String>
where
    T: ?Sized + Serialize,
{
    stringify(&to_value(value)?, &options)
}

/// Serialize any `T: Serialize` to a writer in CBON format.
///
/// # Examples
///
/// ```rust
/// use serde_cbon::to_writer;
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Point { x: i32, y: i32 }
///
/// let mut buffer = Vec::new();
/// to_writer(&mut buffer, &Point { x: 1, y: 2 }).unwrap();
/// assert_eq!(buffer, b"{x 1,y 2}");
/// ```
///
/// # Errors
///
/// Returns an error if serialization fails or writing to the writer fails.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_writer<W, T>(writer: W, value: &T) -> Result<()>
where
    W: io::Write,
    T: ?Sized + Serialize,
{
    to_writer_with_options(writer, value, CbonOptions::default())
}

/// Serialize any `T: Serialize` to a writer in CBON format with custom options.
///
/// # Errors
///
/// Returns an error if serialization fails or writing to the writer fails.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_writer_with_options<W, T>(mut writer: W, value: &T, options: CbonOptions) -> Result<()>
where
    W: io::Write,
    T: ?Sized + Serialize,
{
    let text = to_string_with_options(value, options)?;
    writer
        .write_all(text.as_bytes())
        .map_err(|e| Error::io(&e.to_string()))?;
    Ok(())
}

/// Deserialize an instance of type `T` from a string of CBON text.
///
/// The text is parsed in collect-all mode. A text with exactly one document
/// deserializes from that document; any other number of documents
/// deserializes from an array of all of them.
///
/// # Examples
///
/// ```rust
/// use serde_cbon::from_str;
/// use serde::Deserialize;
///
/// #[derive(Deserialize, PartialEq, Debug)]
/// struct Point { x: i32, y: i32 }
///
/// let point: Point = from_str("{x: 1, y = 2}").unwrap();
/// assert_eq!(point, Point { x: 1, y: 2 });
/// ```
///
/// # Errors
///
/// [`Error::Parse`] with every diagnostic if the input is not well-formed, or a
/// deserialization error if the data does not fit `T`.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_str<T>(s: &str) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
{
    let mut values = de::documents(s)?;
    let value = if values.len() == 1 {
        values.remove(0)
    } else {
        Value::Array(values)
    };
    from_value(value)
}

/// Deserialize every top-level document of a CBON text.
///
/// # Examples
///
/// ```rust
/// use serde_cbon::from_str_all;
///
/// let docs: Vec<Vec<u8>> = from_str_all("[1 2] // second\n[3]").unwrap();
/// assert_eq!(docs, vec![vec![1, 2], vec![3]]);
/// ```
///
/// # Errors
///
/// As [`from_str`].
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_str_all<T>(s: &str) -> Result<Vec<T>>
where
    T: for<'de> Deserialize<'de>,
{
    de::documents(s)?.into_iter().map(from_value).collect()
}

/// Deserialize an instance of type `T` from an I/O stream of CBON.
///
/// # Examples
///
/// ```rust
/// use serde_cbon::from_reader;
/// use serde::Deserialize;
/// use std::io::Cursor;
///
/// #[derive(Deserialize, PartialEq, Debug)]
/// struct Point { x: i32, y: i32 }
///
/// let point: Point = from_reader(Cursor::new(b"{x 1 y 2}")).unwrap();
/// assert_eq!(point, Point { x: 1, y: 2 });
/// ```
///
/// # Errors
///
/// Returns an error if reading from the reader fails, the input is not valid CBON,
/// or the data cannot be deserialized to type `T`.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_reader<R, T>(mut reader: R) -> Result<T>
where
    R: io::Read,
    T: for<'de> Deserialize<'de>,
{
    let mut string = String::new();
    reader
        .read_to_string(&mut string)
        .map_err(|e| Error::io(&e.to_string()))?;
    from_str(&string)
}

/// Deserialize an instance of type `T` from bytes of CBON text.
///
/// # Examples
///
/// ```rust
/// use serde_cbon::from_slice;
///
/// let ports: Vec<u16> = from_slice(b"[80 443]").unwrap();
/// assert_eq!(ports, vec![80, 443]);
/// ```
///
/// # Errors
///
/// Returns an error if the bytes are not valid UTF-8, not valid CBON,
/// or cannot be deserialized to type `T`.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_slice<T>(v: &[u8]) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
{
    let s = std::str::from_utf8(v).map_err(|e| Error::custom(e.to_string()))?;
    from_str(s)
}
