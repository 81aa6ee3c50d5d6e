//! Configuration for parsing and for CBON output.
//!
//! - [`ParseOptions`]: error mode, cooperative suspension and cancellation
//! - [`CbonOptions`]: how [`stringify`](crate::stringify) lays out text
//!
//! ## Examples
//!
//! ```rust
//! use serde_cbon::{to_string_with_options, CbonOptions, Quote, Splitter};
//!
//! let value = serde_cbon::cbon!({ "name": "it's", "tags": ["a", "b"] });
//!
//! let text = to_string_with_options(&value, CbonOptions::new()).unwrap();
//! assert_eq!(text, r"{name 'it\'s',tags[a,b]}");
//!
//! let options = CbonOptions::new()
//!     .with_quote(Quote::Double)
//!     .with_splitter(Splitter::Colon);
//! let text = to_string_with_options(&value, options).unwrap();
//! assert_eq!(text, r#"{name:"it's",tags[a,b]}"#);
//! ```

use crate::machine::ErrorMode;
use crate::token::Quote;
use crate::value::Value;
use std::fmt;
use std::sync::Arc;

/// A cancellation predicate, polled by the driving loop between steps.
///
/// Once it returns `true` the run stops and it is not called again.
pub type Canceller = Arc<dyn Fn() -> bool + Send + Sync>;

/// A per-value rendering hook for [`CbonOptions::with_replacer`].
///
/// Returning `Some(text)` writes `text` verbatim in place of the value.
pub type Replacer = Arc<dyn Fn(&Value) -> Option<String> + Send + Sync>;

/// Options for tokenizing and parsing.
///
/// # Examples
///
/// ```rust
/// use serde_cbon::{parse_str, ErrorMode, ParseOptions};
///
/// let parsed = parse_str("{a 1", &ParseOptions::collect_all()).unwrap();
/// assert_eq!(parsed.diagnostics.len(), 1);
///
/// let options = ParseOptions::new().with_mode(ErrorMode::FailFast);
/// assert!(parse_str("{a 1", &options).is_err());
/// ```
#[derive(Clone)]
pub struct ParseOptions {
    pub mode: ErrorMode,
    /// Whether the `_async` and `_stream` shapes yield to the executor once
    /// before every input symbol they consume: each character for the
    /// tokenizer, each token for the parser. On by default. The synchronous
    /// and `_iter` shapes ignore it and never yield.
    pub suspend: bool,
    pub cancel: Option<Canceller>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            mode: ErrorMode::FailFast,
            suspend: true,
            cancel: None,
        }
    }
}

impl ParseOptions {
    /// Fail-fast, suspending, no canceller.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect every diagnostic and recover.
    #[must_use]
    pub fn collect_all() -> Self {
        ParseOptions {
            mode: ErrorMode::CollectAll,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_mode(mut self, mode: ErrorMode) -> Self {
        self.mode = mode;
        self
    }

    /// `false` lets the asynchronous shapes run through a ready source
    /// without yielding.
    #[must_use]
    pub fn with_suspend(mut self, suspend: bool) -> Self {
        self.suspend = suspend;
        self
    }

    /// Sets the cancellation predicate.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde_cbon::{tokenize, Error, ParseOptions};
    ///
    /// let options = ParseOptions::new().with_cancel(|| true);
    /// assert!(matches!(tokenize("{a 1}", &options), Err(Error::Cancelled)));
    /// ```
    #[must_use]
    pub fn with_cancel<F>(mut self, cancel: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.cancel = Some(Arc::new(cancel));
        self
    }
}

impl fmt::Debug for ParseOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParseOptions")
            .field("mode", &self.mode)
            .field("suspend", &self.suspend)
            .field("cancel", &self.cancel.is_some())
            .finish()
    }
}

/// What goes between a key and its value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Splitter {
    /// Whitespace only: `{a 1}`
    #[default]
    Space,
    /// `{a:1}`
    Colon,
    /// `{a=1}`
    Equals,
}

impl Splitter {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Splitter::Space => " ",
            Splitter::Colon => ":",
            Splitter::Equals => "=",
        }
    }
}

/// Indentation character for pretty output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Indent {
    #[default]
    Space,
    Tab,
}

impl Indent {
    #[must_use]
    pub const fn as_char(&self) -> char {
        match self {
            Indent::Space => ' ',
            Indent::Tab => '\t',
        }
    }
}

/// Layout options for CBON output.
///
/// The presets mirror common needs:
///
/// - [`CbonOptions::new`]: single quotes, whitespace splitter, commas only on one line
/// - [`CbonOptions::min`]: as `new`, separated by spaces instead of commas
/// - [`CbonOptions::json`]: double quotes everywhere, `:` and commas, valid JSON for plain data
/// - [`CbonOptions::pretty`]: as `new`, one entry per line with two-space indentation
///
/// # Examples
///
/// ```rust
/// use serde_cbon::{stringify, cbon, CbonOptions};
///
/// let value = cbon!({ "a": 1, "b": [true, null] });
/// assert_eq!(stringify(&value, &CbonOptions::new()).unwrap(), "{a 1,b[true,null]}");
/// assert_eq!(stringify(&value, &CbonOptions::min()).unwrap(), "{a 1 b[true null]}");
/// assert_eq!(
///     stringify(&value, &CbonOptions::json()).unwrap(),
///     r#"{"a":1,"b":[true,null]}"#
/// );
/// ```
#[derive(Clone)]
pub struct CbonOptions {
    pub quote: Quote,
    pub splitter: Splitter,
    /// Separate entries with commas, on one line or many.
    pub comma: bool,
    /// Separate entries with commas when everything is on one line.
    pub comma_when_only_one_line: bool,
    /// Write the splitter before `{` and `[` values too.
    pub split_before_brackets: bool,
    /// Quote every string value, even ones that would read back as bare words.
    pub strict_string: bool,
    /// Quote every key.
    pub strict_key: bool,
    pub pretty: bool,
    pub indent: Indent,
    /// Indentation characters per level.
    pub indent_width: usize,
    pub replacer: Option<Replacer>,
}

impl Default for CbonOptions {
    fn default() -> Self {
        CbonOptions {
            quote: Quote::Single,
            splitter: Splitter::Space,
            comma: false,
            comma_when_only_one_line: true,
            split_before_brackets: false,
            strict_string: false,
            strict_key: false,
            pretty: false,
            indent: Indent::Space,
            indent_width: 2,
            replacer: None,
        }
    }
}

impl CbonOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn min() -> Self {
        CbonOptions {
            comma_when_only_one_line: false,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn json() -> Self {
        CbonOptions {
            quote: Quote::Double,
            splitter: Splitter::Colon,
            comma: true,
            split_before_brackets: true,
            strict_string: true,
            strict_key: true,
            ..Default::default()
        }
    }

    /// Pretty-printed output.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde_cbon::{stringify, cbon, CbonOptions};
    ///
    /// let value = cbon!({ "a": 1, "b": { "c": [] } });
    /// assert_eq!(
    ///     stringify(&value, &CbonOptions::pretty()).unwrap(),
    ///     "{\n  a 1\n  b {\n    c []\n  }\n}"
    /// );
    /// ```
    #[must_use]
    pub fn pretty() -> Self {
        CbonOptions {
            pretty: true,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_quote(mut self, quote: Quote) -> Self {
        self.quote = quote;
        self
    }

    #[must_use]
    pub fn with_splitter(mut self, splitter: Splitter) -> Self {
        self.splitter = splitter;
        self
    }

    #[must_use]
    pub fn with_comma(mut self, comma: bool) -> Self {
        self.comma = comma;
        self
    }

    #[must_use]
    pub fn with_comma_when_only_one_line(mut self, comma: bool) -> Self {
        self.comma_when_only_one_line = comma;
        self
    }

    #[must_use]
    pub fn with_split_before_brackets(mut self, split: bool) -> Self {
        self.split_before_brackets = split;
        self
    }

    #[must_use]
    pub fn with_strict_string(mut self, strict: bool) -> Self {
        self.strict_string = strict;
        self
    }

    #[must_use]
    pub fn with_strict_key(mut self, strict: bool) -> Self {
        self.strict_key = strict;
        self
    }

    #[must_use]
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Sets the indentation character and how many of them make one level.
    ///
    /// Only affects pretty output.
    #[must_use]
    pub fn with_indent(mut self, indent: Indent, width: usize) -> Self {
        self.indent = indent;
        self.indent_width = width;
        self
    }

    /// Sets a hook that may replace the rendering of any value.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde_cbon::{stringify, cbon, CbonOptions, Value};
    ///
    /// let options = CbonOptions::new().with_replacer(|v: &Value| {
    ///     v.as_f64().filter(|n| *n > 100.0).map(|_| "big".to_string())
    /// });
    /// let value = cbon!([1, 1000]);
    /// assert_eq!(stringify(&value, &options).unwrap(), "[1,big]");
    /// ```
    #[must_use]
    pub fn with_replacer<F>(mut self, replacer: F) -> Self
    where
        F: Fn(&Value) -> Option<String> + Send + Sync + 'static,
    {
        self.replacer = Some(Arc::new(replacer));
        self
    }

    /// The separator between entries on one line.
    pub(crate) fn inline_separator(&self) -> &'static str {
        if self.comma || self.comma_when_only_one_line {
            ","
        } else {
            " "
        }
    }
}

impl fmt::Debug for CbonOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CbonOptions")
            .field("quote", &self.quote)
            .field("splitter", &self.splitter)
            .field("comma", &self.comma)
            .field("comma_when_only_one_line", &self.comma_when_only_one_line)
            .field("split_before_brackets", &self.split_before_brackets)
            .field("strict_string", &self.strict_string)
            .field("strict_key", &self.strict_key)
            .field("pretty", &self.pretty)
            .field("indent", &self.indent)
            .field("indent_width", &self.indent_width)
            .field("replacer", &self.replacer.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        let default = CbonOptions::new();
        assert_eq!(default.quote, Quote::Single);
        assert_eq!(default.inline_separator(), ",");
        assert_eq!(CbonOptions::min().inline_separator(), " ");

        let json = CbonOptions::json();
        assert_eq!(json.quote, Quote::Double);
        assert_eq!(json.splitter, Splitter::Colon);
        assert!(json.comma && json.strict_key && json.strict_string);
        assert!(json.split_before_brackets);

        assert!(CbonOptions::pretty().pretty);
    }

    #[test]
    fn test_parse_options() {
        let options = ParseOptions::new();
        assert_eq!(options.mode, ErrorMode::FailFast);
        assert!(options.suspend);
        assert!(options.cancel.is_none());
        assert!(ParseOptions::collect_all().suspend);

        let options = ParseOptions::collect_all().with_suspend(false).with_cancel(|| false);
        assert_eq!(options.mode, ErrorMode::CollectAll);
        assert!(!options.suspend);
        assert_eq!(options.cancel.as_ref().map(|c| c()), Some(false));
        assert!(format!("{:?}", options).contains("cancel: true"));
    }
}
