//! Incremental parsing: iterators, async streams, suspension and cancellation.
//!
//! Run with: cargo run --example streaming

use futures::executor::block_on;
use futures::stream::{self, StreamExt};
use serde_cbon::{
    materialize_doc, parse_chars_async, parse_chars_iter, parse_chars_stream, tokenize_iter, Error,
    ParseOptions,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const LOG: &str = "
# one document per event
{event start at 0}
{event tick at 1}
{event tick at 2}
{event stop at 3}
";

fn main() -> Result<(), Error> {
    // Documents come out as soon as their closing bracket is read
    println!("Iterator:");
    for doc in parse_chars_iter(LOG.chars(), ParseOptions::new()) {
        if let Some(value) = materialize_doc(&doc?) {
            println!("  {}", value);
        }
    }

    // The same over an async stream, which yields to the executor between characters
    let options = ParseOptions::new();
    let docs = block_on(parse_chars_async(stream::iter(LOG.chars()), &options))?;
    println!("\nAsync: {} documents", docs.value.documents().count());

    let events = block_on(
        parse_chars_stream(stream::iter(LOG.chars()), ParseOptions::new())
            .filter_map(|doc| async move { doc.ok().as_ref().and_then(materialize_doc) })
            .collect::<Vec<_>>(),
    );
    println!("Stream: {} events", events.len());

    // Cancellation stops the run between steps
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = seen.clone();
    let options = ParseOptions::new().with_cancel(move || counter.load(Ordering::SeqCst) >= 3);
    println!("\nCancelled after three tokens:");
    for token in tokenize_iter(LOG.chars(), options) {
        match token {
            Ok(token) => {
                seen.fetch_add(1, Ordering::SeqCst);
                println!("  {}", token);
            }
            Err(err) => println!("  {}", err),
        }
    }

    Ok(())
}
