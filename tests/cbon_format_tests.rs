//! Behaviour of the CBON text format end to end: what well-formed text looks
//! like after parsing, how broken text is reported and recovered, and how
//! values are written back.

use serde_cbon::{
    cbon, materialize, parse, parse_str, render_diagnostics, stringify, tokenize, BlockItem,
    CbonOptions, CommentKind, Doc, ErrorMode, Node, ParseOptions, Position, Range, Token, Value,
};

fn values(text: &str) -> Vec<Value> {
    let parsed = parse_str(text, &ParseOptions::new()).unwrap();
    assert!(parsed.is_clean(), "{:?}", parsed.diagnostics);
    materialize(&parsed.value)
}

fn messages(text: &str) -> Vec<String> {
    let parsed = parse_str(text, &ParseOptions::collect_all()).unwrap();
    parsed.diagnostics.into_iter().map(|d| d.message).collect()
}

#[test]
fn test_well_formed_inputs_have_no_diagnostics() {
    let inputs = [
        "{}",
        "[]",
        "{a 1 b 2}",
        "{a: 1, b: 2,}",
        "{'quoted key' = \"value\"}",
        "[1 2, 3 ,4]",
        "{nested {deep [{x y}]}}",
        "// comment\n{a 1} # trailing",
        "{a /* inline */ 1}",
        "[0xff -1.5e3 .5 1_000]",
        "{} [] {}",
    ];
    for text in inputs {
        assert!(messages(text).is_empty(), "{text}");
    }
}

#[test]
fn test_commas_are_optional() {
    assert_eq!(values("{a 1 b 2}"), values("{a 1, b 2}"));
    assert_eq!(values("{a 1 b 2}"), values("{a:1,b:2,}"));
    assert_eq!(values("[1 2 3]"), values("[1,2,3]"));
}

#[test]
fn test_unclosed_block_collect_all() {
    let parsed = parse_str("{a:1", &ParseOptions::collect_all()).unwrap();
    assert_eq!(parsed.diagnostics.len(), 1);
    assert_eq!(parsed.diagnostics[0].message, "Block is not closed");
    assert_eq!(
        parsed.diagnostics[0].range,
        Range::at(Position::new(4, 0, 4))
    );
    assert_eq!(materialize(&parsed.value), vec![cbon!({ "a": 1 })]);
}

#[test]
fn test_unclosed_block_fail_fast() {
    let err = parse_str("{a:1", &ParseOptions::new()).unwrap_err();
    let diagnostics = err.as_diagnostics().unwrap();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].message, "Block is not closed");
}

#[test]
fn test_fail_fast_stops_at_first_problem() {
    let text = "{a 'x' ] b [1 }";
    let err = parse_str(text, &ParseOptions::new().with_mode(ErrorMode::FailFast)).unwrap_err();
    assert_eq!(err.as_diagnostics().map(|d| d.len()), Some(1));
    assert_eq!(
        messages(text),
        vec!["No Array here", "No Block here", "Array is not closed", "Block is not closed"]
    );
}

#[test]
fn test_diagnostic_rendering() {
    let parsed = parse_str("{\n  a 1.2.3\n", &ParseOptions::collect_all()).unwrap();
    assert_eq!(
        render_diagnostics(&parsed.diagnostics),
        "Number can't have more than one decimal point\n    at 2:5 to 2:9\n\
         Block is not closed\n    at 3:1 to 3:1"
    );
    // The word is still kept, as a string.
    assert_eq!(
        materialize(&parsed.value)[0].get("a").and_then(Value::as_str),
        Some("1.2.3")
    );
}

#[test]
fn test_escapes() {
    let value = &values(r"{a '\n\r\u{2a5f}'}")[0];
    assert_eq!(value.get("a").and_then(Value::as_str), Some("\n\r\u{2a5f}"));

    let value = &values(r#"["\t\0\b\f\v" 'A\x']"#)[0];
    assert_eq!(
        value,
        &Value::Array(vec![
            Value::from("\t\0\u{8}\u{c}\u{b}"),
            Value::from("Ax"),
        ])
    );
}

#[test]
fn test_escapes_written_back() {
    let value = cbon!(["\n\r\u{2a5f}", "tab\there", "\u{1}"]);
    assert_eq!(
        stringify(&value, &CbonOptions::new()).unwrap(),
        r"['\n\r⩟','tab\there','\u{1}']"
    );
}

#[test]
fn test_nested_comments_are_structured() {
    let parsed = parse_str("{a 1 /* outer // inner\n */}", &ParseOptions::new()).unwrap();
    let Some(Doc::Block(block)) = parsed.value.items.first() else {
        panic!("expected a block");
    };
    let comment = block
        .items
        .iter()
        .find_map(|item| match item {
            BlockItem::Comment(c) => Some(c),
            _ => None,
        })
        .unwrap();
    assert_eq!(comment.kind, CommentKind::Block);
    let children: Vec<_> = comment.children().collect();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].kind, CommentKind::Line);
    assert_eq!(children[0].text(), " inner");
}

#[test]
fn test_words_classify() {
    let value = &values("[true false null 12 -0.5 0x1F 1e3 1_0 abc 'true' 1.]")[0];
    assert_eq!(
        value,
        &Value::Array(vec![
            Value::Bool(true),
            Value::Bool(false),
            Value::Null,
            Value::from(12),
            Value::from(-0.5),
            Value::from(31),
            Value::from(1000),
            Value::from(10),
            Value::from("abc"),
            Value::from("true"),
            Value::from(1),
        ])
    );
}

#[test]
fn test_missing_value_and_key() {
    assert_eq!(messages("{a:}"), vec!["There should be a value here"]);
    assert_eq!(messages("{a,}"), vec!["There should be a key value here"]);
    assert_eq!(messages("[x: 1]"), vec!["Array can't have key"]);
    assert_eq!(
        messages("root {}"),
        vec!["File root must have no content other than a document"]
    );
    assert_eq!(messages("{[1] a 1}"), vec!["Block content must start with a key"]);
}

#[test]
fn test_lexical_errors() {
    assert_eq!(
        messages("{a 'x}"),
        vec!["String is not closed", "Block is not closed"]
    );
    assert_eq!(messages("{a 1} /* open"), vec!["Block Comment is not closed"]);
    assert_eq!(messages("/ note\n{}"), vec!["Line Comment need two /"]);
    assert_eq!(messages(r"['\u{12']"), vec!["Unicode escape is not finished"]);
    assert_eq!(messages(r"['\u{g}']"), vec!["Invalid Unicode escape sequence"]);
}

#[test]
fn test_tokens_then_parse() {
    let options = ParseOptions::collect_all();
    let tokens = tokenize("{a [1 2]} // end", &options).unwrap();
    assert!(tokens.is_clean());
    assert!(matches!(tokens.value.last(), Some(Token::EndOfInput(_))));

    let docs = parse(tokens.value, &options).unwrap();
    assert!(docs.is_clean());
    assert_eq!(docs.value.items.len(), 2);
    let Doc::Block(block) = &docs.value.items[0] else {
        panic!("expected a block");
    };
    let entry = block.entries().next().unwrap();
    assert_eq!(entry.key.as_str(), "a");
    assert!(matches!(&entry.value, Node::Arr(a) if a.values().count() == 2));
}

#[test]
fn test_presets() {
    let value = cbon!({ "name": "it's", "list": [1, "a b", null], "empty": {} });
    let render = |options: CbonOptions| stringify(&value, &options).unwrap();
    assert_eq!(render(CbonOptions::new()), r"{name 'it\'s',list[1,'a b',null],empty{}}");
    assert_eq!(render(CbonOptions::min()), r"{name 'it\'s' list[1 'a b' null] empty{}}");
    assert_eq!(
        render(CbonOptions::json()),
        r#"{"name":"it's","list":[1,"a b",null],"empty":{}}"#
    );
    assert_eq!(
        render(CbonOptions::pretty()),
        "{\n  name 'it\\'s'\n  list [\n    1\n    'a b'\n    null\n  ]\n  empty {}\n}"
    );
}

#[test]
fn test_non_finite_numbers_are_null() {
    let value = Value::Array(vec![Value::from(f64::NAN), Value::from(f64::INFINITY)]);
    assert_eq!(stringify(&value, &CbonOptions::new()).unwrap(), "[null,null]");
}

#[test]
fn test_circular_reference() {
    let cell = Value::shared(cbon!({}));
    if let Value::Shared(inner) = &cell {
        inner
            .borrow_mut()
            .as_object_mut()
            .unwrap()
            .insert("self".to_string(), cell.clone());
    }
    let err = stringify(&cell, &CbonOptions::new()).unwrap_err();
    assert_eq!(err.to_string(), "Converting circular structure to CBON");
    if let Value::Shared(inner) = &cell {
        inner.borrow_mut().as_object_mut().unwrap().remove("self");
    }

    // The same cell twice side by side is not a cycle.
    let leaf = Value::shared(Value::from(1));
    let pair = Value::Array(vec![leaf.clone(), leaf]);
    assert_eq!(stringify(&pair, &CbonOptions::new()).unwrap(), "[1,1]");
}
