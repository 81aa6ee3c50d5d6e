//! Basic CBON serialization and deserialization.
//!
//! Run with: cargo run --example simple

use serde::{Deserialize, Serialize};
use serde_cbon::{from_str, to_string, to_string_pretty};
use std::error::Error;

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct User {
    id: u32,
    name: String,
    email: String,
}

fn main() -> Result<(), Box<dyn Error>> {
    let users = vec![
        User {
            id: 42,
            name: "Alice Johnson".to_string(),
            email: "alice@example.com".to_string(),
        },
        User {
            id: 43,
            name: "Bob Smith".to_string(),
            email: "bob@example.com".to_string(),
        },
    ];

    // Serialize to CBON
    let text = to_string(&users)?;
    println!("CBON output:\n{}\n", text);
    println!("Pretty:\n{}\n", to_string_pretty(&users)?);

    // Deserialize back to struct
    let users_back: Vec<User> = from_str(&text)?;
    assert_eq!(users, users_back);
    println!("✓ Round-trip successful");

    // Hand-written text: no quotes on simple strings, optional commas, comments
    let written = r#"
        // the team
        [
            { id 42, name 'Alice Johnson', email alice@example.com }
            { id: 43  name: "Bob Smith"  email: bob@example.com }  # no commas needed
        ]
    "#;
    let parsed: Vec<User> = from_str(written)?;
    assert_eq!(users, parsed);
    println!("✓ Hand-written text reads the same");

    Ok(())
}
