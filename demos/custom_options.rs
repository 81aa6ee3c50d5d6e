//! Customizing CBON output with CbonOptions.
//!
//! Run with: cargo run --example custom_options

use serde::{Deserialize, Serialize};
use serde_cbon::{
    from_str, to_string_with_options, CbonOptions, Indent, Quote, Splitter, Value,
};
use std::error::Error;

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Config {
    name: String,
    version: String,
    debug: bool,
    hosts: Vec<String>,
}

fn main() -> Result<(), Box<dyn Error>> {
    let config = Config {
        name: "My App".to_string(),
        version: "1.0.0".to_string(),
        debug: true,
        hosts: vec!["a.example".to_string(), "b.example".to_string()],
    };

    let presets = [
        ("Default", CbonOptions::default()),
        ("Min", CbonOptions::min()),
        ("JSON", CbonOptions::json()),
        ("Pretty", CbonOptions::pretty()),
    ];
    for (name, options) in presets {
        let text = to_string_with_options(&config, options)?;
        println!("{}:\n{}\n", name, text);
        let back: Config = from_str(&text)?;
        assert_eq!(config, back);
    }

    // Individual knobs
    let options = CbonOptions::new()
        .with_quote(Quote::Double)
        .with_splitter(Splitter::Equals)
        .with_split_before_brackets(true);
    println!("Double quotes, '=' everywhere:\n{}\n", to_string_with_options(&config, options)?);

    let options = CbonOptions::pretty()
        .with_splitter(Splitter::Colon)
        .with_comma(true)
        .with_indent(Indent::Tab, 1);
    println!("Pretty with tabs and commas:\n{}\n", to_string_with_options(&config, options)?);

    let options = CbonOptions::new().with_strict_string(true).with_strict_key(true);
    println!("Everything quoted:\n{}\n", to_string_with_options(&config, options)?);

    // A replacer takes over rendering of single values
    let options = CbonOptions::new().with_replacer(|value: &Value| {
        value
            .as_str()
            .filter(|s| s.ends_with(".example"))
            .map(|s| format!("'<{}>'", s.trim_end_matches(".example")))
    });
    println!("With a replacer:\n{}", to_string_with_options(&config, options)?);

    Ok(())
}
