//! Property-based tests for the round-trip guarantees.
//!
//! Only blocks and arrays are documents, so scalar inputs are wrapped in a
//! one-element array before they go through text.

use proptest::prelude::*;
use serde::{Deserialize, Serialize};
use serde_cbon::{
    from_str, materialize, parse_str, stringify, to_string, CbonMap, CbonOptions, ParseOptions,
    Value,
};

/// Largest magnitude an `i64` keeps exactly through an `f64`.
const EXACT: i64 = 1 << 53;

fn roundtrip<T: Serialize + for<'de> Deserialize<'de> + PartialEq + std::fmt::Debug>(
    value: &T,
) -> bool {
    let wrapped = [value];
    match to_string(&wrapped) {
        Ok(serialized) => match from_str::<Vec<T>>(&serialized) {
            Ok(mut back) if back.len() == 1 => back.remove(0) == *value,
            Ok(back) => {
                eprintln!("Expected one element, got {:?}", back);
                false
            }
            Err(e) => {
                eprintln!("Deserialize failed: {}", e);
                eprintln!("Serialized was: {}", serialized);
                false
            }
        },
        Err(e) => {
            eprintln!("Serialize failed: {}", e);
            false
        }
    }
}

fn text_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z_]{0,8}",
        Just("true".to_string()),
        Just("null".to_string()),
        Just("1.5".to_string()),
        Just("1.2.3".to_string()),
        any::<String>(),
    ]
}

fn value_strategy() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        (-EXACT..EXACT).prop_map(Value::from),
        prop::num::f64::NORMAL.prop_map(Value::from),
        text_strategy().prop_map(Value::String),
    ];
    leaf.prop_recursive(4, 48, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::vec((text_strategy(), inner), 0..6)
                .prop_map(|entries| Value::Object(entries.into_iter().collect::<CbonMap>())),
        ]
    })
}

fn options_strategy() -> impl Strategy<Value = CbonOptions> {
    prop_oneof![
        Just(CbonOptions::new()),
        Just(CbonOptions::min()),
        Just(CbonOptions::json()),
        Just(CbonOptions::pretty()),
    ]
}

fn reparse(text: &str) -> Vec<Value> {
    let parsed = parse_str(text, &ParseOptions::new()).unwrap();
    assert!(parsed.diagnostics.is_empty(), "{:?}", parsed.diagnostics);
    materialize(&parsed.value)
}

proptest! {
    #[test]
    fn prop_value_round_trip(value in value_strategy(), options in options_strategy()) {
        let root = Value::Array(vec![value]);
        let text = stringify(&root, &options).unwrap();
        prop_assert_eq!(reparse(&text), vec![root]);
    }

    #[test]
    fn prop_serialize_is_idempotent(value in value_strategy(), options in options_strategy()) {
        let root = Value::Array(vec![value]);
        let first = stringify(&root, &options).unwrap();
        let values = reparse(&first);
        let second = stringify(&values[0], &options).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_any_text_collect_all_completes(text in any::<String>()) {
        let parsed = parse_str(&text, &ParseOptions::collect_all());
        prop_assert!(parsed.is_ok());
    }

    #[test]
    fn prop_i32(n in any::<i32>()) {
        prop_assert!(roundtrip(&n));
    }

    #[test]
    fn prop_i64(n in -EXACT..EXACT) {
        prop_assert!(roundtrip(&n));
    }

    #[test]
    fn prop_u32(n in any::<u32>()) {
        prop_assert!(roundtrip(&n));
    }

    #[test]
    fn prop_f64(n in prop::num::f64::NORMAL | prop::num::f64::ZERO) {
        prop_assert!(roundtrip(&n));
    }

    #[test]
    fn prop_bool(b in any::<bool>()) {
        prop_assert!(roundtrip(&b));
    }

    #[test]
    fn prop_string(s in any::<String>()) {
        prop_assert!(roundtrip(&s));
    }

    #[test]
    fn prop_vec_i32(v in prop::collection::vec(any::<i32>(), 0..20)) {
        prop_assert!(roundtrip(&v));
    }

    #[test]
    fn prop_option_i32(opt in proptest::option::of(any::<i32>())) {
        prop_assert!(roundtrip(&opt));
    }

    #[test]
    fn prop_tuple_i32_bool(t in (any::<i32>(), any::<bool>())) {
        prop_assert!(roundtrip(&t));
    }
}
