//! Using the cbon! macro for dynamic value construction.
//!
//! Run with: cargo run --example macro

use serde_cbon::{cbon, to_string, to_string_pretty, Value};
use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    let null_val = cbon!(null);
    let bool_val = cbon!(true);
    let number = cbon!(42);
    let text = cbon!("Hello, CBON!");

    // Scalars render fine; only blocks and arrays parse back as documents.
    println!("Primitives:");
    println!("  null:   {}", to_string(&null_val)?);
    println!("  bool:   {}", to_string(&bool_val)?);
    println!("  number: {}", to_string(&number)?);
    println!("  text:   {}\n", to_string(&text)?);

    let numbers = cbon!([1, 2, 3, 4, 5]);
    let mixed = cbon!([1, "two", true, null]);

    println!("Arrays:");
    println!("  Numbers: {}", to_string(&numbers)?);
    println!("  Mixed:   {}\n", to_string(&mixed)?);

    let config = cbon!({
        "app": {
            "name": "MyApp",
            "version": "1.0.0"
        },
        "database": {
            "host": "localhost",
            "port": 5432
        },
        "features": ["auth", "logging", "metrics"],
        "debug": true
    });

    println!("Nested structures:");
    println!("{}\n", to_string_pretty(&config)?);

    let items = vec![
        cbon!({"id": 1, "status": "active"}),
        cbon!({"id": 2, "status": "pending"}),
    ];
    let summary = cbon!({
        "total": (items.len()),
        "items": items
    });

    println!("Dynamic construction:");
    println!("{}\n", summary);

    if let Some(name) = config.get("app").and_then(|app| app.get("name")).and_then(Value::as_str) {
        println!("Accessing values:");
        println!("  App name: {}", name);
    }
    if let Some(features) = config.get("features").and_then(Value::as_array) {
        println!("  Features: {}", features.len());
    }

    Ok(())
}
