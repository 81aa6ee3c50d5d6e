//! Reporting problems in broken CBON text.
//!
//! Run with: cargo run --example diagnostics

use serde_cbon::{materialize, parse_str, render_diagnostics, ErrorMode, ParseOptions};
use std::error::Error;

const BROKEN: &str = r#"{
    name 'demo'
    ports [80 443
    ratio 1.2.3
    : 5
}
"#;

fn main() -> Result<(), Box<dyn Error>> {
    // Fail-fast: the first problem ends the run
    match parse_str(BROKEN, &ParseOptions::new().with_mode(ErrorMode::FailFast)) {
        Ok(_) => println!("Unexpectedly clean"),
        Err(err) => println!("Fail-fast:\n{}\n", err),
    }

    // Collect-all: every problem is reported and a best-effort tree is built
    let parsed = parse_str(BROKEN, &ParseOptions::collect_all())?;
    println!(
        "Collect-all found {} problems:\n{}\n",
        parsed.diagnostics.len(),
        render_diagnostics(&parsed.diagnostics)
    );
    for value in materialize(&parsed.value) {
        println!("Recovered value: {}", value);
    }

    // Unfinished input is closed at the end
    let parsed = parse_str("{a:1", &ParseOptions::collect_all())?;
    println!(
        "\n'{{a:1' recovers as {} with: {}",
        materialize(&parsed.value)[0],
        parsed.diagnostics[0].message
    );

    Ok(())
}
