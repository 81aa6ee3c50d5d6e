use serde_cbon::{cbon, to_string, CbonMap, Number, Value};

#[test]
fn test_cbon_macro_null() {
    let value = cbon!(null);
    assert_eq!(value, Value::Null);
}

#[test]
fn test_cbon_macro_booleans() {
    assert_eq!(cbon!(true), Value::Bool(true));
    assert_eq!(cbon!(false), Value::Bool(false));
}

#[test]
fn test_cbon_macro_numbers() {
    assert_eq!(cbon!(42), Value::Number(Number::from(42)));
    assert_eq!(cbon!(3.5), Value::Number(Number::from(3.5)));
    assert_eq!(cbon!(-123), Value::Number(Number::from(-123)));
    assert_eq!(cbon!(42).as_i64(), Some(42));
}

#[test]
fn test_cbon_macro_strings() {
    assert_eq!(cbon!("hello world"), Value::String("hello world".to_string()));
    assert_eq!(cbon!(""), Value::String(String::new()));
}

#[test]
fn test_cbon_macro_arrays() {
    assert_eq!(cbon!([]), Value::Array(vec![]));

    let mixed = cbon!([1, "two", null, [true], {"k": "v"},]);
    let items = mixed.as_array().unwrap();
    assert_eq!(items.len(), 5);
    assert_eq!(items[1], Value::from("two"));
    assert_eq!(items[3], Value::Array(vec![Value::Bool(true)]));
    assert_eq!(items[4].get("k"), Some(&Value::from("v")));
}

#[test]
fn test_cbon_macro_objects() {
    assert_eq!(cbon!({}), Value::Object(CbonMap::new()));

    let obj = cbon!({
        "name": "Alice",
        "age": 30,
        "address": {
            "city": "Paris",
            "zip": "75001"
        }
    });
    let map = obj.as_object().unwrap();
    assert_eq!(map.len(), 3);
    assert_eq!(map.get("age"), Some(&Value::from(30)));
    assert_eq!(
        obj.get("address").and_then(|a| a.get("city")).and_then(Value::as_str),
        Some("Paris")
    );
}

#[test]
fn test_cbon_macro_keeps_key_order() {
    let obj = cbon!({ "z": 1, "a": 2, "m": 3 });
    let keys: Vec<_> = obj.as_object().unwrap().keys().cloned().collect();
    assert_eq!(keys, vec!["z", "a", "m"]);
}

#[test]
fn test_cbon_macro_expressions() {
    let name = String::from("Bob");
    let scores = vec![1, 2, 3];
    let value = cbon!({ "name": name, "scores": scores, "sum": (1 + 2) });
    assert_eq!(to_string(&value).unwrap(), "{name Bob,scores[1,2,3],sum 3}");
}

#[test]
fn test_cbon_macro_renders() {
    let value = cbon!({ "quote": "it's", "empty": "", "n": 1.25, "flag": false });
    assert_eq!(
        to_string(&value).unwrap(),
        r"{quote 'it\'s',empty '',n 1.25,flag false}"
    );
}
