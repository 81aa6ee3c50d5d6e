//! Reduction of syntax trees to plain values.
//!
//! Commas, comments and separators are dropped, and so is anything error
//! recovery stood in for: a [`Node::Missing`] value disappears together with
//! its key. Blocks keep their keys in written order; a repeated key keeps its
//! first position and takes its last value.
//!
//! The walk keeps its own stack, so nesting depth is bounded by memory only.
//!
//! ```rust
//! use serde_cbon::{materialize, parse_str, ParseOptions, Value};
//!
//! let docs = parse_str("// config\n{port 8080, tags [a b]} [1]", &ParseOptions::new())
//!     .unwrap()
//!     .value;
//! let values = materialize(&docs);
//! assert_eq!(values.len(), 2);
//! assert_eq!(values[0].get("port").and_then(Value::as_i64), Some(8080));
//! ```

use crate::ast::{Arr, ArrItem, Block, BlockItem, Doc, Docs, Node};
use crate::map::CbonMap;
use crate::value::Value;
use std::slice;

/// One value per document, in order. Top-level comments are skipped.
#[must_use]
pub fn materialize(docs: &Docs) -> Vec<Value> {
    docs.items.iter().filter_map(materialize_doc).collect()
}

/// The value of one document, or `None` for a comment.
#[must_use]
pub fn materialize_doc(doc: &Doc) -> Option<Value> {
    match doc {
        Doc::Block(block) => build(Frame::block(block)),
        Doc::Arr(arr) => build(Frame::arr(arr)),
        Doc::Comment(_) => None,
    }
}

/// The value of one node, or `None` for [`Node::Missing`].
#[must_use]
pub fn materialize_node(node: &Node) -> Option<Value> {
    let mut stack = Vec::new();
    match open(node, &mut stack) {
        Some(value) => value,
        None => stack.pop().and_then(build),
    }
}

enum Frame<'a> {
    Block {
        items: slice::Iter<'a, BlockItem>,
        map: CbonMap,
        key: Option<&'a str>,
    },
    Arr {
        items: slice::Iter<'a, ArrItem>,
        values: Vec<Value>,
    },
}

impl<'a> Frame<'a> {
    fn block(block: &'a Block) -> Self {
        Frame::Block {
            items: block.items.iter(),
            map: CbonMap::new(),
            key: None,
        }
    }

    fn arr(arr: &'a Arr) -> Self {
        Frame::Arr {
            items: arr.items.iter(),
            values: Vec::new(),
        }
    }

    /// The next value node of this container, remembering its key.
    fn next_node(&mut self) -> Option<&'a Node> {
        match self {
            Frame::Block { items, key, .. } => items.find_map(|item| match item {
                BlockItem::KeyVal(kv) => {
                    *key = Some(kv.key.as_str());
                    Some(&kv.value)
                }
                _ => None,
            }),
            Frame::Arr { items, .. } => items.find_map(|item| match item {
                ArrItem::Value(node) => Some(node),
                _ => None,
            }),
        }
    }

    fn accept(&mut self, value: Option<Value>) {
        match self {
            Frame::Block { map, key, .. } => {
                if let (Some(key), Some(value)) = (key.take(), value) {
                    map.insert(key.to_string(), value);
                }
            }
            Frame::Arr { values, .. } => values.extend(value),
        }
    }

    fn close(self) -> Value {
        match self {
            Frame::Block { map, .. } => Value::Object(map),
            Frame::Arr { values, .. } => Value::Array(values),
        }
    }
}

/// Converts a leaf node directly. For a container, pushes its frame and
/// returns `None`.
fn open<'a>(node: &'a Node, stack: &mut Vec<Frame<'a>>) -> Option<Option<Value>> {
    let value = match node {
        Node::Null(_) => Value::Null,
        Node::Bool(b, _) => Value::Bool(*b),
        Node::Number(n, _) => Value::from(*n),
        Node::Str(s) => Value::String(s.value.clone()),
        Node::Missing(_) => return Some(None),
        Node::Block(block) => {
            stack.push(Frame::block(block));
            return None;
        }
        Node::Arr(arr) => {
            stack.push(Frame::arr(arr));
            return None;
        }
    };
    Some(Some(value))
}

fn build(root: Frame<'_>) -> Option<Value> {
    let mut stack = vec![root];
    let mut finished: Option<Option<Value>> = None;
    loop {
        if let Some(value) = finished.take() {
            match stack.last_mut() {
                Some(top) => top.accept(value),
                None => return value,
            }
        }
        let next = stack.last_mut()?.next_node();
        finished = match next {
            Some(node) => open(node, &mut stack),
            None => stack.pop().map(|frame| Some(frame.close())),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drive::parse_str;
    use crate::options::ParseOptions;

    fn values(text: &str) -> Vec<Value> {
        let parsed = parse_str(text, &ParseOptions::collect_all()).unwrap();
        materialize(&parsed.value)
    }

    #[test]
    fn test_documents_and_comments() {
        let values = values("# top\n{a 1} /* x */ [true null 'q' w]");
        assert_eq!(values.len(), 2);
        assert_eq!(
            values[1],
            Value::Array(vec![
                Value::Bool(true),
                Value::Null,
                Value::from("q"),
                Value::from("w")
            ])
        );
    }

    #[test]
    fn test_nested_containers() {
        let values = values("{a {b [1 {c 2}]}, d []}");
        let inner = values[0].get("a").and_then(|a| a.get("b")).unwrap();
        assert_eq!(inner.as_array().map(Vec::len), Some(2));
        assert_eq!(inner.as_array().unwrap()[1].get("c"), Some(&Value::from(2)));
        assert_eq!(values[0].get("d"), Some(&Value::Array(vec![])));
    }

    #[test]
    fn test_last_write_wins() {
        let values = values("{a 1 b 2 a 3}");
        let map = values[0].as_object().unwrap();
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(map["a"], Value::from(3));
    }

    #[test]
    fn test_missing_values_are_dropped() {
        let docs = values("{a: , b 2}");
        let map = docs[0].as_object().unwrap();
        assert!(!map.contains_key("a"));
        assert_eq!(map["b"], Value::from(2));

        assert_eq!(values("[1, :]")[0], Value::Array(vec![Value::from(1)]));
    }

    #[test]
    fn test_node_entry_point() {
        let parsed = parse_str("{a [1 2]}", &ParseOptions::new()).unwrap();
        let Some(Doc::Block(block)) = parsed.value.items.first() else {
            panic!("expected a block");
        };
        let node = &block.entries().next().unwrap().value;
        assert_eq!(
            materialize_node(node),
            Some(Value::Array(vec![Value::from(1), Value::from(2)]))
        );
    }

    #[test]
    fn test_deep_nesting() {
        let depth = 200_000;
        let text = format!("{}{}", "[".repeat(depth), "]".repeat(depth));
        let parsed = parse_str(&text, &ParseOptions::new()).unwrap();
        let values = materialize(&parsed.value);
        let mut current = &values[0];
        let mut levels = 1;
        while let Some(inner) = current.as_array().and_then(|a| a.first()) {
            current = inner;
            levels += 1;
        }
        assert_eq!(levels, depth);
    }

    #[test]
    fn test_deep_trees_drop() {
        let depth = 200_000;
        let text = format!("{}{}", "{a [".repeat(depth), "]}".repeat(depth));
        let parsed = parse_str(&text, &ParseOptions::new()).unwrap();
        assert_eq!(parsed.value.documents().count(), 1);
        let values = materialize(&parsed.value);
        drop(parsed);
        assert_eq!(values.len(), 1);
        drop(values);

        // Unclosed: the parser closes every level itself.
        let text = "[{k ".repeat(depth);
        let parsed = parse_str(&text, &ParseOptions::collect_all()).unwrap();
        assert!(parsed.diagnostics.len() >= 2 * depth);
        assert_eq!(materialize(&parsed.value).len(), 1);
    }
}
