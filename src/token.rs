//! Tokens produced by the tokenizer.

use crate::pos::Range;
use std::fmt;

/// The quote character of a quoted string.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Quote {
    #[default]
    Single,
    Double,
}

impl Quote {
    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            Quote::Single => '\'',
            Quote::Double => '"',
        }
    }

    #[must_use]
    pub const fn from_char(c: char) -> Option<Quote> {
        match c {
            '\'' => Some(Quote::Single),
            '"' => Some(Quote::Double),
            _ => None,
        }
    }
}

/// One of the structural characters `, : = [ ] { }`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Symbol {
    Comma,
    Colon,
    Equals,
    ArrayStart,
    ArrayEnd,
    BlockStart,
    BlockEnd,
}

impl Symbol {
    #[must_use]
    pub const fn from_char(c: char) -> Option<Symbol> {
        match c {
            ',' => Some(Symbol::Comma),
            ':' => Some(Symbol::Colon),
            '=' => Some(Symbol::Equals),
            '[' => Some(Symbol::ArrayStart),
            ']' => Some(Symbol::ArrayEnd),
            '{' => Some(Symbol::BlockStart),
            '}' => Some(Symbol::BlockEnd),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            Symbol::Comma => ',',
            Symbol::Colon => ':',
            Symbol::Equals => '=',
            Symbol::ArrayStart => '[',
            Symbol::ArrayEnd => ']',
            Symbol::BlockStart => '{',
            Symbol::BlockEnd => '}',
        }
    }

    /// `true` for the key/value separators `:` and `=`.
    #[must_use]
    pub const fn is_split(self) -> bool {
        matches!(self, Symbol::Colon | Symbol::Equals)
    }
}

/// The character that opened a comment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Marker {
    Slash,
    Hash,
}

impl Marker {
    #[must_use]
    pub const fn from_char(c: char) -> Option<Marker> {
        match c {
            '/' => Some(Marker::Slash),
            '#' => Some(Marker::Hash),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            Marker::Slash => '/',
            Marker::Hash => '#',
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CommentKind {
    Line,
    Block,
}

/// A line or block comment.
///
/// Comments may contain other comments; those are kept as structured children
/// in `parts`, between the plain text around them.
#[derive(Clone, Debug, PartialEq)]
pub struct Comment {
    pub kind: CommentKind,
    pub marker: Marker,
    pub parts: Vec<CommentPart>,
    pub range: Range,
}

#[derive(Clone, Debug, PartialEq)]
pub enum CommentPart {
    Text(String),
    Comment(Comment),
}

impl Comment {
    /// All text of this comment with nested comments flattened.
    #[must_use]
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for part in &self.parts {
            match part {
                CommentPart::Text(s) => out.push_str(s),
                CommentPart::Comment(c) => c.collect_text(out),
            }
        }
    }

    /// Nested comments, in source order.
    pub fn children(&self) -> impl Iterator<Item = &Comment> {
        self.parts.iter().filter_map(|p| match p {
            CommentPart::Comment(c) => Some(c),
            CommentPart::Text(_) => None,
        })
    }
}

/// Nested comments are released one level at a time, not recursively.
impl Drop for Comment {
    fn drop(&mut self) {
        let mut pending: Vec<Comment> = Vec::new();
        let mut parts = std::mem::take(&mut self.parts);
        loop {
            for part in parts.drain(..) {
                if let CommentPart::Comment(child) = part {
                    pending.push(child);
                }
            }
            match pending.pop() {
                Some(mut child) => parts = std::mem::take(&mut child.parts),
                None => break,
            }
        }
    }
}

/// A token of CBON source text.
#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    EndOfInput(Range),
    Word(String, Range),
    QuotedString(String, Quote, Range),
    Symbol(Symbol, Range),
    Comment(Comment),
}

impl Token {
    #[must_use]
    pub fn range(&self) -> Range {
        match self {
            Token::EndOfInput(r)
            | Token::Word(_, r)
            | Token::QuotedString(_, _, r)
            | Token::Symbol(_, r) => *r,
            Token::Comment(c) => c.range,
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_end(&self) -> bool {
        matches!(self, Token::EndOfInput(_))
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::EndOfInput(_) => write!(f, "end of input"),
            Token::Word(w, _) => write!(f, "{}", w),
            Token::QuotedString(s, q, _) => write!(f, "{0}{1}{0}", q.as_char(), s),
            Token::Symbol(s, _) => write!(f, "{}", s.as_char()),
            Token::Comment(c) => match c.kind {
                CommentKind::Line if c.marker == Marker::Slash => write!(f, "//{}", c.text()),
                CommentKind::Line => write!(f, "#{}", c.text()),
                CommentKind::Block => write!(
                    f,
                    "{0}*{1}*{0}",
                    c.marker.as_char(),
                    c.text()
                ),
            },
        }
    }
}
