//! Source positions and ranges.
//!
//! Every token and AST node carries a [`Range`] so diagnostics can point at the
//! exact characters involved. Positions count characters, not bytes, and both ends
//! of a range are inclusive.

use std::fmt;

/// A position in the source text.
///
/// `offset` is the absolute character count, `line` and `column` are 0-based.
/// Use [`Position::display`] for the 1-based form shown to users.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl Position {
    #[must_use]
    pub const fn new(offset: usize, line: usize, column: usize) -> Self {
        Position {
            offset,
            line,
            column,
        }
    }

    /// Returns a value displaying as `line:column` with 1-based numbers.
    #[must_use]
    pub fn display(&self) -> impl fmt::Display + '_ {
        DisplayPosition(self)
    }
}

struct DisplayPosition<'a>(&'a Position);

impl fmt::Display for DisplayPosition<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.0.line + 1, self.0.column + 1)
    }
}

/// A pair of positions bracketing a token or node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Range {
    pub from: Position,
    pub to: Position,
}

impl Range {
    #[must_use]
    pub const fn new(from: Position, to: Position) -> Self {
        Range { from, to }
    }

    /// A range covering a single position.
    #[must_use]
    pub const fn at(pos: Position) -> Self {
        Range { from: pos, to: pos }
    }

    /// The smallest range covering both `self` and `other`.
    #[must_use]
    pub fn join(&self, other: &Range) -> Self {
        let from = if other.from.offset < self.from.offset {
            other.from
        } else {
            self.from
        };
        let to = if other.to.offset > self.to.offset {
            other.to
        } else {
            self.to
        };
        Range { from, to }
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.from.display(), self.to.display())
    }
}

/// Tracks the position of the character being processed.
///
/// `\n` and `\r` both break lines, but a `\n` directly after `\r` does not break
/// again, so CRLF counts as one line break.
#[derive(Clone, Debug, Default)]
pub struct Cursor {
    pos: Position,
    prev: Position,
    after_cr: bool,
}

impl Cursor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Position of the character currently being processed.
    #[inline]
    #[must_use]
    pub fn pos(&self) -> Position {
        self.pos
    }

    /// Position of the last character consumed before the current one.
    ///
    /// At the very start of the input this is the start position.
    #[inline]
    #[must_use]
    pub fn last_pos(&self) -> Position {
        self.prev
    }

    /// Moves past `c`.
    pub fn advance(&mut self, c: char) {
        self.prev = self.pos;
        self.pos.offset += 1;
        match c {
            '\n' if self.after_cr => {
                self.after_cr = false;
            }
            '\n' => {
                self.pos.line += 1;
                self.pos.column = 0;
            }
            '\r' => {
                self.pos.line += 1;
                self.pos.column = 0;
                self.after_cr = true;
            }
            _ => {
                self.pos.column += 1;
                self.after_cr = false;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn walk(text: &str) -> Cursor {
        let mut cursor = Cursor::new();
        for c in text.chars() {
            cursor.advance(c);
        }
        cursor
    }

    #[test]
    fn test_columns_and_lines() {
        let cursor = walk("ab\ncd");
        assert_eq!(cursor.pos(), Position::new(5, 1, 2));
        assert_eq!(cursor.last_pos(), Position::new(4, 1, 1));
    }

    #[test]
    fn test_crlf_is_one_break() {
        let cursor = walk("a\r\nb");
        assert_eq!(cursor.pos(), Position::new(4, 1, 1));

        let cursor = walk("a\r\rb");
        assert_eq!(cursor.pos().line, 2);

        let cursor = walk("a\n\nb");
        assert_eq!(cursor.pos().line, 2);
    }

    #[test]
    fn test_last_pos_crosses_lines() {
        let cursor = walk("abc\n");
        assert_eq!(cursor.pos(), Position::new(4, 1, 0));
        assert_eq!(cursor.last_pos(), Position::new(3, 0, 3));
    }

    #[test]
    fn test_range_display_is_one_based() {
        let range = Range::new(Position::new(0, 0, 0), Position::new(7, 2, 3));
        assert_eq!(range.to_string(), "1:1 to 3:4");
    }

    #[test]
    fn test_join() {
        let a = Range::at(Position::new(3, 0, 3));
        let b = Range::at(Position::new(9, 1, 2));
        assert_eq!(a.join(&b), Range::new(a.from, b.to));
        assert_eq!(b.join(&a), Range::new(a.from, b.to));
    }
}
