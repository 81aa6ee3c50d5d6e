//! Token-level parser.
//!
//! Like the tokenizer, the parser is a set of [`Parse`] units on a [`Machine`].
//! A block pushes a key unit for each entry; the key pushes a value unit and,
//! when the value finishes, finishes itself with the assembled [`KeyVal`].
//! Completed top-level documents are emitted one at a time, so a caller can
//! consume them before the rest of the input has arrived.
//!
//! On errors the parser recovers locally: unclosed blocks and arrays are closed
//! at the end of input, a missing value becomes [`Node::Missing`], and stray
//! nested documents inside a block are parsed and dropped.

use crate::ast::{self, ArrItem, BlockItem, Doc, Key, KeyVal, Node, Split, SplitKind, Str};
use crate::drive::Feed;
use crate::error::{Diagnostic, Result};
use crate::lexer::ends_word;
use crate::machine::{Action, Context, ErrorMode, Machine, Unit};
use crate::pos::Range;
use crate::token::{Symbol, Token};
use once_cell::sync::Lazy;
use regex::Regex;

const KEY_FIRST: &str = "Block content must start with a key";
const MISSING_VALUE: &str = "There should be a value here";

static NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(?:0x[0-9a-f_]+|-?[0-9_]+\.(?:[0-9_]+)?(?:e-?[0-9]+)?|-?\.[0-9_]+(?:e-?[0-9]+)?|-?[0-9_]+(?:e-?[0-9]+)?)$",
    )
    .expect("number pattern is valid")
});

type Ctx = Context<Doc>;

pub(crate) enum Out {
    Node(Node),
    KeyVal(KeyVal),
}

/// Parser states.
pub(crate) enum Parse {
    Root,
    Block { begin: Range, items: Vec<BlockItem> },
    Arr { begin: Range, items: Vec<ArrItem> },
    /// A key was read; waiting for an optional separator and then the value.
    Key { key: Option<Key>, split: Option<Split> },
    Value,
}

impl Parse {
    fn block(begin: Range) -> Self {
        Parse::Block {
            begin,
            items: Vec::new(),
        }
    }

    fn arr(begin: Range) -> Self {
        Parse::Arr {
            begin,
            items: Vec::new(),
        }
    }
}

fn push(unit: Parse) -> Action<Parse> {
    Action::Push {
        unit,
        consume: true,
    }
}

impl Unit for Parse {
    type Symbol = Token;
    type Output = Out;
    type Emit = Doc;

    fn step(&mut self, t: &Token, ctx: &mut Ctx) -> Result<Action<Self>> {
        match self {
            Parse::Root => root(t, ctx),
            Parse::Block { begin, items } => block(t, *begin, items, ctx),
            Parse::Arr { begin, items } => arr(t, *begin, items, ctx),
            Parse::Key { split, .. } => key(t, split, ctx),
            Parse::Value => value(t, ctx),
        }
    }

    fn absorb(&mut self, out: Out, ctx: &mut Ctx) -> Result<Option<Out>> {
        match (self, out) {
            (Parse::Root, Out::Node(Node::Block(b))) => {
                tracing::trace!(range = %b.range(), "document");
                ctx.emit(Doc::Block(b));
            }
            (Parse::Root, Out::Node(Node::Arr(a))) => {
                tracing::trace!(range = %a.range(), "document");
                ctx.emit(Doc::Arr(a));
            }
            (Parse::Block { items, .. }, Out::KeyVal(kv)) => items.push(BlockItem::KeyVal(kv)),
            (Parse::Arr { items, .. }, Out::Node(node)) => items.push(ArrItem::Value(node)),
            (Parse::Key { key, split }, Out::Node(value)) => {
                return Ok(key.take().map(|key| {
                    Out::KeyVal(KeyVal {
                        key,
                        value,
                        split: *split,
                    })
                }));
            }
            // Nested documents that were parsed only to be skipped.
            _ => {}
        }
        Ok(None)
    }
}

fn root(t: &Token, ctx: &mut Ctx) -> Result<Action<Parse>> {
    match t {
        Token::EndOfInput(_) => Ok(Action::pop()),
        Token::Symbol(Symbol::BlockStart, r) => Ok(push(Parse::block(*r))),
        Token::Symbol(Symbol::ArrayStart, r) => Ok(push(Parse::arr(*r))),
        Token::Comment(c) => {
            ctx.emit(Doc::Comment(c.clone()));
            Ok(Action::Stay)
        }
        other => {
            ctx.error(
                other.range(),
                "File root must have no content other than a document",
            )?;
            Ok(Action::Stay)
        }
    }
}

fn block(t: &Token, begin: Range, items: &mut Vec<BlockItem>, ctx: &mut Ctx) -> Result<Action<Parse>> {
    let close = |items: &mut Vec<BlockItem>, end: Range| {
        Out::Node(Node::Block(ast::Block {
            items: std::mem::take(items),
            begin,
            end,
        }))
    };
    match t {
        Token::EndOfInput(r) => {
            ctx.error(*r, "Block is not closed")?;
            Ok(Action::finish_redo(close(items, *r)))
        }
        Token::Symbol(Symbol::BlockEnd, r) => Ok(Action::finish(close(items, *r))),
        Token::Symbol(Symbol::Comma, r) => {
            items.push(BlockItem::Comma(*r));
            Ok(Action::Stay)
        }
        Token::Symbol(Symbol::BlockStart, r) => {
            ctx.error(*r, KEY_FIRST)?;
            Ok(push(Parse::block(*r)))
        }
        Token::Symbol(Symbol::ArrayStart, r) => {
            ctx.error(*r, KEY_FIRST)?;
            Ok(push(Parse::arr(*r)))
        }
        Token::Symbol(Symbol::ArrayEnd, r) => {
            ctx.error(*r, "No Array here")?;
            Ok(Action::Stay)
        }
        Token::Symbol(_, r) => {
            ctx.error(*r, KEY_FIRST)?;
            Ok(Action::Stay)
        }
        Token::Word(w, r) => Ok(push(Parse::Key {
            key: Some(Key::Word(w.clone(), *r)),
            split: None,
        })),
        Token::QuotedString(s, q, r) => Ok(push(Parse::Key {
            key: Some(Key::Quoted(Str {
                value: s.clone(),
                quote: Some(*q),
                range: *r,
            })),
            split: None,
        })),
        Token::Comment(c) => {
            items.push(BlockItem::Comment(c.clone()));
            Ok(Action::Stay)
        }
    }
}

fn arr(t: &Token, begin: Range, items: &mut Vec<ArrItem>, ctx: &mut Ctx) -> Result<Action<Parse>> {
    let close = |items: &mut Vec<ArrItem>, end: Range| {
        Out::Node(Node::Arr(ast::Arr {
            items: std::mem::take(items),
            begin,
            end,
        }))
    };
    match t {
        Token::EndOfInput(r) => {
            ctx.error(*r, "Array is not closed")?;
            Ok(Action::finish_redo(close(items, *r)))
        }
        Token::Symbol(Symbol::ArrayEnd, r) => Ok(Action::finish(close(items, *r))),
        Token::Symbol(Symbol::Comma, r) => {
            items.push(ArrItem::Comma(*r));
            Ok(Action::Stay)
        }
        Token::Symbol(Symbol::BlockEnd, r) => {
            ctx.error(*r, "No Block here")?;
            Ok(Action::Stay)
        }
        Token::Symbol(s, r) if s.is_split() => {
            ctx.error(*r, "Array can't have key")?;
            Ok(Action::Stay)
        }
        Token::Comment(c) => {
            items.push(ArrItem::Comment(c.clone()));
            Ok(Action::Stay)
        }
        _ => Ok(Action::Push {
            unit: Parse::Value,
            consume: false,
        }),
    }
}

fn key(t: &Token, split: &mut Option<Split>, ctx: &mut Ctx) -> Result<Action<Parse>> {
    if split.is_none() {
        match t {
            Token::Symbol(Symbol::Colon, r) | Token::Symbol(Symbol::Equals, r) => {
                let kind = if matches!(t, Token::Symbol(Symbol::Colon, _)) {
                    SplitKind::Colon
                } else {
                    SplitKind::Equals
                };
                *split = Some(Split { kind, range: *r });
                return Ok(Action::Stay);
            }
            Token::Symbol(Symbol::Comma, r) | Token::EndOfInput(r) => {
                ctx.error(*r, "There should be a key value here")?;
                return Ok(Action::redo());
            }
            Token::Comment(_) => return Ok(Action::Stay),
            _ => {}
        }
    }
    Ok(Action::Push {
        unit: Parse::Value,
        consume: false,
    })
}

fn value(t: &Token, ctx: &mut Ctx) -> Result<Action<Parse>> {
    match t {
        Token::QuotedString(s, q, r) => Ok(Action::finish(Out::Node(Node::Str(Str {
            value: s.clone(),
            quote: Some(*q),
            range: *r,
        })))),
        Token::Word(w, r) => Ok(Action::finish(Out::Node(classify(w, *r, ctx)?))),
        Token::Symbol(Symbol::BlockStart, r) => Ok(Action::replace(Parse::block(*r), true)),
        Token::Symbol(Symbol::ArrayStart, r) => Ok(Action::replace(Parse::arr(*r), true)),
        Token::Comment(_) => Ok(Action::Stay),
        Token::Symbol(_, r) | Token::EndOfInput(r) => {
            ctx.error(*r, MISSING_VALUE)?;
            Ok(Action::finish_redo(Out::Node(Node::Missing(*r))))
        }
    }
}

/// Turns a bare word into a literal, a number, or an unquoted string.
fn classify(word: &str, range: Range, ctx: &mut Ctx) -> Result<Node> {
    match word {
        "true" => return Ok(Node::Bool(true, range)),
        "false" => return Ok(Node::Bool(false, range)),
        "null" => return Ok(Node::Null(range)),
        _ => {}
    }
    if NUMBER.is_match(word) {
        if let Some(n) = parse_number(word) {
            return Ok(Node::Number(n, range));
        }
    } else if has_extra_points(word) {
        ctx.error(range, "Number can't have more than one decimal point")?;
    }
    Ok(Node::Str(Str {
        value: word.to_string(),
        quote: None,
        range,
    }))
}

/// Converts a word matching [`NUMBER`]. Digit separators are dropped first.
fn parse_number(word: &str) -> Option<f64> {
    let digits: String = word.chars().filter(|&c| c != '_').collect();
    if let Some(hex) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        if hex.is_empty() {
            return None;
        }
        return hex
            .chars()
            .try_fold(0.0, |acc, c| c.to_digit(16).map(|d| acc * 16.0 + f64::from(d)));
    }
    digits.parse().ok()
}

/// `1.2.3` and the like: digits and points only, with more than one point.
fn has_extra_points(word: &str) -> bool {
    let body = word.strip_prefix('-').unwrap_or(word);
    body.matches('.').count() > 1
        && body.chars().any(|c| c.is_ascii_digit())
        && body.chars().all(|c| c.is_ascii_digit() || c == '_' || c == '.')
}

/// Whether `text` written bare reads back as the same string.
pub(crate) fn is_bare_string(text: &str) -> bool {
    !text.is_empty()
        && !text.chars().any(|c| ends_word(c) || c.is_control())
        && !matches!(text, "true" | "false" | "null")
        && !NUMBER.is_match(text)
        && !has_extra_points(text)
}

/// The parser as a feedable machine over tokens.
///
/// Tokens after an end-of-input token are ignored. If the token source ends
/// without one, an end-of-input token is synthesized after the last token seen.
pub(crate) struct Parser {
    machine: Machine<Parse>,
    last: Range,
    ended: bool,
}

impl Parser {
    pub(crate) fn new(mode: ErrorMode) -> Self {
        Parser {
            machine: Machine::new(Parse::Root, mode),
            last: Range::default(),
            ended: false,
        }
    }
}

impl Feed for Parser {
    type Input = Token;
    type Output = Doc;

    fn feed(&mut self, token: Token) -> Result<()> {
        if self.ended {
            return Ok(());
        }
        self.last = token.range();
        if token.is_end() {
            self.ended = true;
            return self.machine.finish(&token);
        }
        self.machine.feed(&token)
    }

    fn finish(&mut self) -> Result<()> {
        if self.ended {
            return Ok(());
        }
        self.ended = true;
        self.machine
            .finish(&Token::EndOfInput(Range::at(self.last.to)))
    }

    fn next_output(&mut self) -> Option<Doc> {
        self.machine.take_emitted()
    }

    fn upstream(&mut self, diagnostics: Vec<Diagnostic>) -> Result<()> {
        self.machine.ctx().extend_diagnostics(diagnostics)
    }

    fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        self.machine.take_diagnostics()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    fn run(text: &str, mode: ErrorMode) -> Result<(Vec<Doc>, Vec<Diagnostic>)> {
        let mut lexer = Lexer::new(mode);
        let mut tokens = Vec::new();
        for c in text.chars() {
            lexer.feed(c)?;
        }
        lexer.finish()?;
        while let Some(t) = lexer.next_output() {
            tokens.push(t);
        }
        let mut diagnostics = lexer.take_diagnostics();

        let mut parser = Parser::new(mode);
        for t in tokens {
            parser.feed(t)?;
        }
        parser.finish()?;
        let mut docs = Vec::new();
        while let Some(d) = parser.next_output() {
            docs.push(d);
        }
        diagnostics.extend(parser.take_diagnostics());
        Ok((docs, diagnostics))
    }

    fn messages(text: &str) -> Vec<String> {
        let (_, diagnostics) = run(text, ErrorMode::CollectAll).unwrap();
        diagnostics.into_iter().map(|d| d.message).collect()
    }

    fn single_block(text: &str) -> ast::Block {
        let (docs, diagnostics) = run(text, ErrorMode::CollectAll).unwrap();
        assert!(diagnostics.is_empty(), "{:?}", diagnostics);
        match docs.into_iter().next() {
            Some(Doc::Block(b)) => b,
            other => panic!("expected a block, got {:?}", other),
        }
    }

    #[test]
    fn test_key_values_and_separators() {
        let block = single_block("{a:1, b=2 c 'x', \"d\" : true}");
        let entries: Vec<&KeyVal> = block.entries().collect();
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[0].key.as_str(), "a");
        assert_eq!(entries[0].split.map(|s| s.kind), Some(SplitKind::Colon));
        assert_eq!(entries[1].split.map(|s| s.kind), Some(SplitKind::Equals));
        assert_eq!(entries[2].split, None);
        assert!(matches!(&entries[2].value, Node::Str(s) if s.value == "x"));
        assert!(matches!(&entries[3].key, Key::Quoted(s) if s.value == "d"));
        assert!(matches!(entries[3].value, Node::Bool(true, _)));
        let commas = block
            .items
            .iter()
            .filter(|i| matches!(i, BlockItem::Comma(_)))
            .count();
        assert_eq!(commas, 2);
    }

    #[test]
    fn test_block_ranges_bracket_braces() {
        let block = single_block("  { a 1 }");
        assert_eq!(block.begin.from.offset, 2);
        assert_eq!(block.end.from.offset, 8);
    }

    #[test]
    fn test_word_classification() {
        let (docs, _) = run(
            "[null true false 1 -2.5 .5 1. 0xff 1_000 2e3 1E-2 abc 0x 1e+5 -]",
            ErrorMode::CollectAll,
        )
        .unwrap();
        let Some(Doc::Arr(arr)) = docs.into_iter().next() else {
            panic!("expected an array");
        };
        let values: Vec<&Node> = arr.values().collect();
        assert!(matches!(values[0], Node::Null(_)));
        assert!(matches!(values[1], Node::Bool(true, _)));
        assert!(matches!(values[2], Node::Bool(false, _)));
        let numbers: Vec<f64> = values[3..11]
            .iter()
            .map(|v| match v {
                Node::Number(n, _) => *n,
                other => panic!("expected a number, got {:?}", other),
            })
            .collect();
        assert_eq!(numbers, vec![1.0, -2.5, 0.5, 1.0, 255.0, 1000.0, 2000.0, 0.01]);
        for v in &values[11..] {
            assert!(matches!(v, Node::Str(s) if s.quote.is_none()), "{:?}", v);
        }
    }

    #[test]
    fn test_extra_decimal_points() {
        assert_eq!(
            messages("{v 1.2.3}"),
            vec!["Number can't have more than one decimal point"]
        );
        assert!(messages("{v a.b.c}").is_empty());
    }

    #[test]
    fn test_unclosed_block_recovers() {
        let (docs, diagnostics) = run("{a:1", ErrorMode::CollectAll).unwrap();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].message, "Block is not closed");
        let Some(Doc::Block(b)) = docs.first() else {
            panic!("expected a block");
        };
        assert_eq!(b.entries().count(), 1);
        assert_eq!(b.end, diagnostics[0].range);

        let err = run("{a:1", ErrorMode::FailFast).unwrap_err();
        assert_eq!(err.as_diagnostics().map(|d| d.len()), Some(1));
    }

    #[test]
    fn test_nested_unclosed_cascades() {
        assert_eq!(
            messages("{a [1 {b 2"),
            vec![
                "Block is not closed",
                "Array is not closed",
                "Block is not closed"
            ]
        );
    }

    #[test]
    fn test_structural_errors() {
        assert_eq!(
            messages("x {a 1}"),
            vec!["File root must have no content other than a document"]
        );
        assert_eq!(messages("{{a 1} b 2}"), vec![KEY_FIRST]);
        assert_eq!(messages("{: a 1}"), vec![KEY_FIRST]);
        assert_eq!(messages("{a 1 ]}"), vec!["No Array here"]);
        assert_eq!(messages("[1 } 2]"), vec!["No Block here"]);
        assert_eq!(messages("[a: 1]"), vec!["Array can't have key"]);
        assert_eq!(messages("{a, b 1}"), vec!["There should be a key value here"]);
        assert_eq!(messages("{a:}"), vec![MISSING_VALUE]);
    }

    #[test]
    fn test_missing_value_placeholder() {
        let (docs, _) = run("{a: , b 2}", ErrorMode::CollectAll).unwrap();
        let Some(Doc::Block(b)) = docs.first() else {
            panic!("expected a block");
        };
        let entries: Vec<&KeyVal> = b.entries().collect();
        assert!(matches!(entries[0].value, Node::Missing(_)));
        assert!(matches!(entries[1].value, Node::Number(n, _) if n == 2.0));
    }

    #[test]
    fn test_discarded_nested_document() {
        let block = single_block_lenient("{[1 2] a 1}");
        assert_eq!(block.entries().count(), 1);
    }

    fn single_block_lenient(text: &str) -> ast::Block {
        let (docs, _) = run(text, ErrorMode::CollectAll).unwrap();
        match docs.into_iter().next() {
            Some(Doc::Block(b)) => b,
            other => panic!("expected a block, got {:?}", other),
        }
    }

    #[test]
    fn test_comments_are_kept() {
        let (docs, diagnostics) =
            run("# head\n{a /* c */ 1 // tail\n} [1 # x\n 2]", ErrorMode::CollectAll).unwrap();
        assert!(diagnostics.is_empty());
        assert_eq!(docs.len(), 3);
        assert!(matches!(&docs[0], Doc::Comment(c) if c.text() == " head"));
        let Doc::Block(b) = &docs[1] else {
            panic!("expected a block");
        };
        assert!(b.items.iter().any(|i| matches!(i, BlockItem::Comment(c) if c.text() == " tail")));
        assert!(matches!(b.entries().next().map(|kv| &kv.value), Some(Node::Number(n, _)) if *n == 1.0));
        let Doc::Arr(a) = &docs[2] else {
            panic!("expected an array");
        };
        assert_eq!(a.values().count(), 2);
    }

    #[test]
    fn test_multiple_documents() {
        let (docs, _) = run("{a 1}[2]{}", ErrorMode::FailFast).unwrap();
        assert_eq!(docs.len(), 3);
    }

    #[test]
    fn test_end_synthesized_without_token() {
        let mut parser = Parser::new(ErrorMode::CollectAll);
        let start = crate::pos::Position::new(0, 0, 0);
        parser
            .feed(Token::Symbol(Symbol::BlockStart, Range::at(start)))
            .unwrap();
        parser.finish().unwrap();
        let diagnostics = parser.take_diagnostics();
        assert_eq!(diagnostics[0].message, "Block is not closed");
        assert!(matches!(parser.next_output(), Some(Doc::Block(_))));
    }

    #[test]
    fn test_bare_strings() {
        for text in ["hello", "snake_case", "a.b", "-x", "é"] {
            assert!(is_bare_string(text), "{text}");
        }
        for text in ["", "true", "null", "12", "0x1f", "\u{1}", "1.2.3", "a b", "a:b", "it's", "x/y", "[a"] {
            assert!(!is_bare_string(text), "{text}");
        }
    }
}
