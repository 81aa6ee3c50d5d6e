//! Syntax tree produced by the parser.
//!
//! The tree keeps everything the source said, not only the data: commas,
//! comments, separators and the ranges of every node. [`materialize`] reduces it
//! to plain [`Value`](crate::Value)s.
//!
//! [`materialize`]: crate::materialize

use crate::pos::Range;
use crate::token::{Comment, Quote};

/// A string in value or key position. `quote` is `None` for bare words.
#[derive(Clone, Debug, PartialEq)]
pub struct Str {
    pub value: String,
    pub quote: Option<Quote>,
    pub range: Range,
}

/// Anything that can stand in value position.
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    Null(Range),
    Bool(bool, Range),
    Number(f64, Range),
    Str(Str),
    Block(Block),
    Arr(Arr),
    /// Stands in for a value that was expected but absent. Only produced while
    /// recovering from errors; it materializes to nothing.
    Missing(Range),
}

impl Node {
    #[must_use]
    pub fn range(&self) -> Range {
        match self {
            Node::Null(r) | Node::Bool(_, r) | Node::Number(_, r) | Node::Missing(r) => *r,
            Node::Str(s) => s.range,
            Node::Block(b) => b.range(),
            Node::Arr(a) => a.range(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Key {
    Word(String, Range),
    Quoted(Str),
}

impl Key {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Key::Word(w, _) => w,
            Key::Quoted(s) => &s.value,
        }
    }

    #[must_use]
    pub fn range(&self) -> Range {
        match self {
            Key::Word(_, r) => *r,
            Key::Quoted(s) => s.range,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SplitKind {
    Colon,
    Equals,
}

/// An explicit key/value separator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Split {
    pub kind: SplitKind,
    pub range: Range,
}

#[derive(Clone, Debug, PartialEq)]
pub struct KeyVal {
    pub key: Key,
    pub value: Node,
    /// `None` when key and value were separated by whitespace only.
    pub split: Option<Split>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum BlockItem {
    KeyVal(KeyVal),
    Comma(Range),
    Comment(Comment),
}

#[derive(Clone, Debug, PartialEq)]
pub enum ArrItem {
    Value(Node),
    Comma(Range),
    Comment(Comment),
}

/// `{ ... }`. `begin` and `end` are the ranges of the braces.
#[derive(Clone, Debug, PartialEq)]
pub struct Block {
    pub items: Vec<BlockItem>,
    pub begin: Range,
    pub end: Range,
}

impl Block {
    #[must_use]
    pub fn range(&self) -> Range {
        self.begin.join(&self.end)
    }

    pub fn entries(&self) -> impl Iterator<Item = &KeyVal> {
        self.items.iter().filter_map(|item| match item {
            BlockItem::KeyVal(kv) => Some(kv),
            _ => None,
        })
    }
}

/// `[ ... ]`. `begin` and `end` are the ranges of the brackets.
#[derive(Clone, Debug, PartialEq)]
pub struct Arr {
    pub items: Vec<ArrItem>,
    pub begin: Range,
    pub end: Range,
}

impl Arr {
    #[must_use]
    pub fn range(&self) -> Range {
        self.begin.join(&self.end)
    }

    pub fn values(&self) -> impl Iterator<Item = &Node> {
        self.items.iter().filter_map(|item| match item {
            ArrItem::Value(v) => Some(v),
            _ => None,
        })
    }
}

/// Moves the nested blocks and arrays of `items` onto `pending`.
trait Nested {
    fn take_nested(self, pending: &mut Vec<Node>);
}

impl Nested for BlockItem {
    fn take_nested(self, pending: &mut Vec<Node>) {
        if let BlockItem::KeyVal(kv) = self {
            if matches!(kv.value, Node::Block(_) | Node::Arr(_)) {
                pending.push(kv.value);
            }
        }
    }
}

impl Nested for ArrItem {
    fn take_nested(self, pending: &mut Vec<Node>) {
        if let ArrItem::Value(node @ (Node::Block(_) | Node::Arr(_))) = self {
            pending.push(node);
        }
    }
}

/// Drops a tree of any depth with a work list instead of recursion.
fn drop_items<T: Nested>(items: &mut Vec<T>) {
    let mut pending = Vec::new();
    for item in items.drain(..) {
        item.take_nested(&mut pending);
    }
    while let Some(node) = pending.pop() {
        match node {
            Node::Block(mut block) => {
                for item in block.items.drain(..) {
                    item.take_nested(&mut pending);
                }
            }
            Node::Arr(mut arr) => {
                for item in arr.items.drain(..) {
                    item.take_nested(&mut pending);
                }
            }
            _ => {}
        }
    }
}

impl Drop for Block {
    fn drop(&mut self) {
        if !self.items.is_empty() {
            drop_items(&mut self.items);
        }
    }
}

impl Drop for Arr {
    fn drop(&mut self) {
        if !self.items.is_empty() {
            drop_items(&mut self.items);
        }
    }
}

/// A top-level item of a source text.
#[derive(Clone, Debug, PartialEq)]
pub enum Doc {
    Block(Block),
    Arr(Arr),
    Comment(Comment),
}

/// The root of a parse: every top-level document and comment, in order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Docs {
    pub items: Vec<Doc>,
}

impl Docs {
    /// The documents, without top-level comments.
    pub fn documents(&self) -> impl Iterator<Item = &Doc> {
        self.items
            .iter()
            .filter(|d| !matches!(d, Doc::Comment(_)))
    }
}

impl From<Vec<Doc>> for Docs {
    fn from(items: Vec<Doc>) -> Self {
        Docs { items }
    }
}
