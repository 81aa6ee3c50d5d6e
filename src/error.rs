//! Error types for CBON parsing and serialization.
//!
//! Parsing problems are reported as [`Diagnostic`]s: a message plus the exact
//! source [`Range`] it concerns. Depending on the [`ErrorMode`](crate::ErrorMode)
//! a run either stops at the first diagnostic or collects all of them; either way
//! they surface to callers as [`Error::Parse`].
//!
//! ## Error Categories
//!
//! - **Lexical**: unclosed strings and block comments, bad escapes, lone `/`
//! - **Structural**: unclosed blocks/arrays, missing keys or values, stray closers
//! - **Semantic**: numbers with more than one decimal point
//! - **Serialization**: circular structures, unsupported serde types
//!
//! ## Examples
//!
//! ```rust
//! use serde_cbon::{from_str, Error, Value};
//!
//! let result: Result<Value, Error> = from_str("{a:1");
//! match result {
//!     Err(Error::Parse(diagnostics)) => {
//!         assert_eq!(diagnostics[0].message, "Block is not closed");
//!     }
//!     _ => panic!("expected a parse error"),
//! }
//! ```

use crate::pos::Range;
use std::fmt;
use std::ops::Deref;
use thiserror::Error;

/// A problem found in the source, with the range it concerns.
///
/// Displays as the message followed by an indented 1-based location line:
///
/// ```rust
/// use serde_cbon::{Diagnostic, Position, Range};
///
/// let d = Diagnostic::new(
///     Range::new(Position::new(0, 0, 0), Position::new(3, 0, 3)),
///     "Block is not closed",
/// );
/// assert_eq!(d.to_string(), "Block is not closed\n    at 1:1 to 1:4");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub range: Range,
    pub message: String,
}

impl Diagnostic {
    pub fn new(range: Range, message: impl Into<String>) -> Self {
        Diagnostic {
            range,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\n    at {}", self.message, self.range)
    }
}

/// A non-empty list of diagnostics, ordered by source offset.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    #[must_use]
    pub fn new(mut list: Vec<Diagnostic>) -> Self {
        list.sort_by_key(|d| d.range.from.offset);
        Diagnostics(list)
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.0
    }
}

impl Deref for Diagnostics {
    type Target = [Diagnostic];

    fn deref(&self) -> &[Diagnostic] {
        &self.0
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render_diagnostics(&self.0))
    }
}

/// Renders diagnostics one per block, each as `message\n    at l:c to l:c`.
#[must_use]
pub fn render_diagnostics(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Represents all possible errors of this crate.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// IO error during reading or writing
    #[error("IO error: {0}")]
    Io(String),

    /// One or more diagnostics from tokenizing or parsing
    #[error("{0}")]
    Parse(Diagnostics),

    /// A value refers back to one of its own ancestors
    #[error("Converting circular structure to CBON")]
    Circular,

    /// Unsupported type for serialization
    #[error("Unsupported type: {0}")]
    UnsupportedType(String),

    /// The run was stopped by its canceller
    #[error("Operation was cancelled")]
    Cancelled,

    /// Custom error
    #[error("Error: {0}")]
    Custom(String),
}

impl Error {
    /// Creates a parse error from a single diagnostic.
    pub fn diagnostic(diagnostic: Diagnostic) -> Self {
        Error::Parse(Diagnostics::new(vec![diagnostic]))
    }

    /// Creates a parse error from collected diagnostics.
    pub fn diagnostics(list: Vec<Diagnostic>) -> Self {
        Error::Parse(Diagnostics::new(list))
    }

    /// Returns the diagnostics carried by a parse error.
    #[must_use]
    pub fn as_diagnostics(&self) -> Option<&[Diagnostic]> {
        match self {
            Error::Parse(d) => Some(d),
            _ => None,
        }
    }

    /// Creates an unsupported type error for types that cannot be represented in CBON.
    pub fn unsupported_type(msg: &str) -> Self {
        Error::UnsupportedType(msg.to_string())
    }

    /// Creates a custom error with a display message.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde_cbon::Error;
    ///
    /// let err = Error::custom("something went wrong");
    /// assert!(err.to_string().contains("something went wrong"));
    /// ```
    pub fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }

    /// Creates an I/O error for reading/writing failures.
    pub fn io(msg: &str) -> Self {
        Error::Io(msg.to_string())
    }
}

impl serde::ser::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }
}

impl serde::de::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
