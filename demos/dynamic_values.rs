//! Working with Value for runtime flexibility.
//!
//! Run with: cargo run --example dynamic_values

use serde::{Deserialize, Serialize};
use serde_cbon::{
    cbon, from_value, materialize, parse_str, stringify, to_string_pretty, to_value, CbonMap,
    CbonOptions, ParseOptions, Value,
};
use std::error::Error;

#[derive(Debug, Serialize, Deserialize)]
struct User {
    id: u32,
    name: String,
    roles: Vec<String>,
}

fn main() -> Result<(), Box<dyn Error>> {
    // Several documents in one text become one value each
    let text = "{host localhost port 8080} [auth logging] // trailing note";
    let parsed = parse_str(text, &ParseOptions::new())?;
    let values = materialize(&parsed.value);
    println!("{} documents", values.len());

    let mut config = values[0].clone();
    if let Some(port) = config.get("port").and_then(Value::as_i64) {
        println!("Accessing field 'port': {}", port);
    }

    // Edit in place; keys keep their written order
    if let Some(map) = config.as_object_mut() {
        map.insert("features".to_string(), values[1].clone());
        map.insert("port".to_string(), Value::from(9090));
    }
    println!("Edited:\n{}\n", to_string_pretty(&config)?);

    // Convert existing struct to Value and back
    let user = User {
        id: 123,
        name: "Alice".to_string(),
        roles: vec!["admin".to_string(), "developer".to_string()],
    };
    let mut user_value = to_value(&user)?;
    if let Some(roles) = user_value
        .as_object_mut()
        .and_then(|map| map.get_mut("roles"))
        .and_then(Value::as_array_mut)
    {
        roles.push(Value::from("auditor"));
    }
    let user_back: User = from_value(user_value.clone())?;
    println!("User as Value: {}", user_value);
    println!("Back as struct: {:?}\n", user_back);

    // Shared cells: the same value referenced from two places
    let shared = Value::shared(cbon!({ "level": "debug" }));
    let mut outputs = CbonMap::new();
    outputs.insert("console".to_string(), shared.clone());
    outputs.insert("file".to_string(), shared.clone());
    let logging = Value::Object(outputs);
    println!("Shared: {}", logging);

    // A cell that contains itself cannot be written
    if let Value::Shared(cell) = &shared {
        if let Some(map) = cell.borrow_mut().as_object_mut() {
            map.insert("parent".to_string(), shared.clone());
        }
    }
    match stringify(&logging, &CbonOptions::new()) {
        Ok(text) => println!("Unexpected: {}", text),
        Err(err) => println!("Cycle rejected: {}", err),
    }
    if let Value::Shared(cell) = &shared {
        if let Some(map) = cell.borrow_mut().as_object_mut() {
            map.remove("parent");
        }
    }

    // Runtime type checking
    println!("Type checks:");
    println!("  is_object: {}", config.is_object());
    println!("  is_array:  {}", values[1].is_array());
    println!("  is_string: {}", config.is_string());

    Ok(())
}
