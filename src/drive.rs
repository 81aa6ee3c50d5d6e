//! Driving the tokenizer and parser over any shape of input.
//!
//! The same machines run behind every entry point. A [`Driver`] pulls input
//! symbols from a [`Stream`], feeds them one at a time and hands outputs on as
//! soon as they are complete. The synchronous functions block on that stream;
//! the `_async` functions await it; the `_stream` and `_iter` functions return it
//! so callers consume outputs incrementally.
//!
//! The `_async` and `_stream` shapes yield to the executor once before every
//! input symbol they consume (see [`ParseOptions::suspend`]). The synchronous
//! and `_iter` shapes never yield.
//!
//! ## Examples
//!
//! ```rust
//! use serde_cbon::{parse_str, tokenize, ParseOptions, Token};
//!
//! let tokens = tokenize("{a 1}", &ParseOptions::new()).unwrap();
//! assert_eq!(tokens.value.len(), 5);
//! assert!(matches!(tokens.value.last(), Some(Token::EndOfInput(_))));
//!
//! let docs = parse_str("{a 1} [2]", &ParseOptions::new()).unwrap();
//! assert_eq!(docs.value.documents().count(), 2);
//! ```
//!
//! Incremental consumption:
//!
//! ```rust
//! use serde_cbon::{parse_iter, tokenize_iter, ParseOptions};
//!
//! let tokens = tokenize_iter("{a 1}{b 2}".chars(), ParseOptions::new()).map(|t| t.unwrap());
//! let docs: Vec<_> = parse_iter(tokens, ParseOptions::new()).collect();
//! assert_eq!(docs.len(), 2);
//! ```

use crate::ast::{Doc, Docs};
use crate::error::{Diagnostic, Error, Result};
use crate::lexer::Lexer;
use crate::machine::ErrorMode;
use crate::options::{Canceller, ParseOptions};
use crate::parser::Parser;
use crate::token::Token;
use futures::executor::{block_on, block_on_stream};
use futures::stream::{self, StreamExt};
use futures_core::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use tracing::{debug, trace};

/// A stage that consumes symbols one at a time and produces outputs.
pub(crate) trait Feed {
    type Input;
    type Output;

    fn feed(&mut self, input: Self::Input) -> Result<()>;

    /// Signals the end of input; every open construct is closed.
    fn finish(&mut self) -> Result<()>;

    fn next_output(&mut self) -> Option<Self::Output>;

    /// Takes over diagnostics produced by the stage feeding this one.
    fn upstream(&mut self, diagnostics: Vec<Diagnostic>) -> Result<()>;

    fn take_diagnostics(&mut self) -> Vec<Diagnostic>;
}

/// Tokenizer and parser chained: characters in, documents out.
///
/// Tokens pass straight from one to the other, so the canceller is checked here
/// once per token.
pub(crate) struct Pipeline {
    lexer: Lexer,
    parser: Parser,
    cancel: Option<Canceller>,
}

impl Pipeline {
    pub(crate) fn new(options: &ParseOptions) -> Self {
        Pipeline {
            lexer: Lexer::new(options.mode),
            parser: Parser::new(options.mode),
            cancel: options.cancel.clone(),
        }
    }

    fn pump(&mut self) -> Result<()> {
        while let Some(token) = self.lexer.next_output() {
            if self.cancel.as_ref().is_some_and(|cancel| cancel()) {
                debug!("cancelled between tokens");
                return Err(Error::Cancelled);
            }
            self.parser.feed(token)?;
        }
        Ok(())
    }
}

impl Feed for Pipeline {
    type Input = char;
    type Output = Doc;

    fn feed(&mut self, c: char) -> Result<()> {
        self.lexer.feed(c)?;
        self.pump()
    }

    fn finish(&mut self) -> Result<()> {
        self.lexer.finish()?;
        self.pump()?;
        self.parser.finish()
    }

    fn next_output(&mut self) -> Option<Doc> {
        self.parser.next_output()
    }

    fn upstream(&mut self, diagnostics: Vec<Diagnostic>) -> Result<()> {
        self.lexer.upstream(diagnostics)
    }

    fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        let mut diagnostics = self.lexer.take_diagnostics();
        diagnostics.extend(self.parser.take_diagnostics());
        diagnostics
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Feeding,
    Draining,
    Done,
}

/// Runs a [`Feed`] over an input stream, itself a stream of outputs.
///
/// Outputs come first; collected diagnostics, if any, follow as one final
/// `Err(Error::Parse)`. A fail-fast diagnostic ends the stream right away.
///
/// Cancellation is checked at most once per step, where a step is either one
/// consumed input symbol or one output handed out, and ends the stream with
/// `Err(Error::Cancelled)`. Checking before outputs means a consumer that
/// cancels after `n` items receives exactly `n`.
pub(crate) struct Driver<F, S> {
    feed: F,
    input: S,
    suspend: bool,
    cancel: Option<Canceller>,
    phase: Phase,
    paused: bool,
    checked: bool,
    steps: usize,
}

impl<F: Feed, S> Driver<F, S> {
    pub(crate) fn new(feed: F, input: S, options: &ParseOptions, suspend: bool) -> Self {
        debug!(mode = ?options.mode, suspend, "run started");
        Driver {
            feed,
            input,
            suspend,
            cancel: options.cancel.clone(),
            phase: Phase::Feeding,
            paused: false,
            checked: false,
            steps: 0,
        }
    }

    fn stop(&mut self, error: Error) -> Option<Result<F::Output>> {
        debug!(steps = self.steps, %error, "run stopped");
        self.phase = Phase::Done;
        Some(Err(error))
    }

    fn close(&mut self) -> Option<Result<F::Output>> {
        self.phase = Phase::Done;
        let diagnostics = self.feed.take_diagnostics();
        debug!(steps = self.steps, diagnostics = diagnostics.len(), "run finished");
        if diagnostics.is_empty() {
            None
        } else {
            Some(Err(Error::diagnostics(diagnostics)))
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|cancel| cancel())
    }
}

impl<F, S> Stream for Driver<F, S>
where
    F: Feed + Unpin,
    S: Stream<Item = Result<F::Input>> + Unpin,
{
    type Item = Result<F::Output>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            if this.phase == Phase::Done {
                return Poll::Ready(None);
            }
            if !this.checked {
                this.checked = true;
                if this.is_cancelled() {
                    return Poll::Ready(this.stop(Error::Cancelled));
                }
            }
            if let Some(output) = this.feed.next_output() {
                this.checked = false;
                this.steps += 1;
                return Poll::Ready(Some(Ok(output)));
            }
            if this.phase == Phase::Draining {
                return Poll::Ready(this.close());
            }
            if this.suspend && !this.paused {
                this.paused = true;
                cx.waker().wake_by_ref();
                return Poll::Pending;
            }
            match Pin::new(&mut this.input).poll_next(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(Some(Ok(symbol))) => {
                    this.paused = false;
                    this.checked = false;
                    this.steps += 1;
                    if let Err(error) = this.feed.feed(symbol) {
                        return Poll::Ready(this.stop(error));
                    }
                }
                Poll::Ready(Some(Err(Error::Parse(diagnostics)))) => {
                    trace!(count = diagnostics.len(), "upstream diagnostics");
                    if let Err(error) = this.feed.upstream(diagnostics.into_vec()) {
                        return Poll::Ready(this.stop(error));
                    }
                }
                Poll::Ready(Some(Err(error))) => return Poll::Ready(this.stop(error)),
                Poll::Ready(None) => {
                    this.phase = Phase::Draining;
                    if let Err(error) = this.feed.finish() {
                        return Poll::Ready(this.stop(error));
                    }
                }
            }
        }
    }
}

/// The result of a run: its output and every diagnostic collected on the way.
///
/// In fail-fast mode a diagnostic is an error instead, so `diagnostics` is
/// always empty there.
#[derive(Clone, Debug, PartialEq)]
pub struct Parsed<T> {
    pub value: T,
    pub diagnostics: Vec<Diagnostic>,
}

impl<T> Parsed<T> {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// The value, or the diagnostics as an error if there are any.
    pub fn into_result(self) -> Result<T> {
        if self.diagnostics.is_empty() {
            Ok(self.value)
        } else {
            Err(Error::diagnostics(self.diagnostics))
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Parsed<U> {
        Parsed {
            value: f(self.value),
            diagnostics: self.diagnostics,
        }
    }
}

async fn collect<T, S>(mut outputs: S) -> Result<Parsed<Vec<T>>>
where
    S: Stream<Item = Result<T>> + Unpin,
{
    let mut value = Vec::new();
    let mut diagnostics = Vec::new();
    while let Some(item) = outputs.next().await {
        match item {
            Ok(output) => value.push(output),
            Err(Error::Parse(list)) => diagnostics.extend(list.into_vec()),
            Err(error) => return Err(error),
        }
    }
    Ok(Parsed { value, diagnostics })
}

/// Collects a run; in fail-fast mode its diagnostic is returned as the error.
async fn run<T, S>(outputs: S, options: &ParseOptions) -> Result<Parsed<Vec<T>>>
where
    S: Stream<Item = Result<T>> + Unpin,
{
    let parsed = collect(outputs).await?;
    match options.mode {
        ErrorMode::FailFast if !parsed.is_clean() => {
            Err(Error::diagnostics(parsed.diagnostics))
        }
        _ => Ok(parsed),
    }
}

fn lexer_driver<S>(
    chars: S,
    options: &ParseOptions,
    suspend: bool,
) -> impl Stream<Item = Result<Token>> + Unpin
where
    S: Stream<Item = char> + Unpin,
{
    Driver::new(Lexer::new(options.mode), chars.map(Ok::<char, Error>), options, suspend)
}

fn parser_driver<S>(
    tokens: S,
    options: &ParseOptions,
    suspend: bool,
) -> impl Stream<Item = Result<Doc>> + Unpin
where
    S: Stream<Item = Result<Token>> + Unpin,
{
    Driver::new(Parser::new(options.mode), tokens, options, suspend)
}

fn pipeline_driver<S>(
    chars: S,
    options: &ParseOptions,
    suspend: bool,
) -> impl Stream<Item = Result<Doc>> + Unpin
where
    S: Stream<Item = char> + Unpin,
{
    Driver::new(Pipeline::new(options), chars.map(Ok::<char, Error>), options, suspend)
}

/// Splits `text` into tokens. The last token is always [`Token::EndOfInput`].
///
/// # Errors
///
/// In fail-fast mode, the first diagnostic. [`Error::Cancelled`] if the
/// canceller fired.
pub fn tokenize(text: &str, options: &ParseOptions) -> Result<Parsed<Vec<Token>>> {
    block_on(run(lexer_driver(stream::iter(text.chars()), options, false), options))
}

/// Tokenizes lazily; every token is produced as soon as it is complete.
///
/// Collected diagnostics arrive as one final `Err` item.
pub fn tokenize_iter<I>(chars: I, options: ParseOptions) -> impl Iterator<Item = Result<Token>>
where
    I: IntoIterator<Item = char>,
{
    block_on_stream(lexer_driver(stream::iter(chars), &options, false))
}

/// Tokenizes an asynchronous character source.
///
/// # Examples
///
/// ```rust
/// use futures::executor::block_on;
/// use futures::stream;
/// use serde_cbon::{tokenize_async, ParseOptions};
///
/// let options = ParseOptions::new();
/// let tokens = block_on(tokenize_async(stream::iter("[1]".chars()), &options)).unwrap();
/// assert_eq!(tokens.value.len(), 4);
/// ```
pub async fn tokenize_async<S>(chars: S, options: &ParseOptions) -> Result<Parsed<Vec<Token>>>
where
    S: Stream<Item = char> + Unpin,
{
    run(lexer_driver(chars, options, options.suspend), options).await
}

/// Tokenizes an asynchronous character source into a stream of tokens.
pub fn tokenize_stream<S>(chars: S, options: ParseOptions) -> impl Stream<Item = Result<Token>> + Unpin
where
    S: Stream<Item = char> + Unpin,
{
    lexer_driver(chars, &options, options.suspend)
}

/// Parses a token sequence into documents.
///
/// Tokens after [`Token::EndOfInput`] are ignored; a missing end token is
/// supplied after the last token.
pub fn parse<I>(tokens: I, options: &ParseOptions) -> Result<Parsed<Docs>>
where
    I: IntoIterator<Item = Token>,
{
    let tokens = stream::iter(tokens.into_iter().map(Ok::<Token, Error>));
    let parsed = block_on(run(parser_driver(tokens, options, false), options))?;
    Ok(parsed.map(Docs::from))
}

/// Parses lazily; each document is produced once its closing bracket is read.
pub fn parse_iter<I>(tokens: I, options: ParseOptions) -> impl Iterator<Item = Result<Doc>>
where
    I: IntoIterator<Item = Token>,
{
    let tokens = stream::iter(tokens.into_iter().map(Ok::<Token, Error>));
    block_on_stream(parser_driver(tokens, &options, false))
}

/// Parses an asynchronous token source.
///
/// The source may carry diagnostics of an earlier stage as `Err(Error::Parse)`
/// items, as [`tokenize_stream`] does; they are merged into this run's.
pub async fn parse_async<S>(tokens: S, options: &ParseOptions) -> Result<Parsed<Docs>>
where
    S: Stream<Item = Result<Token>> + Unpin,
{
    let parsed = run(parser_driver(tokens, options, options.suspend), options).await?;
    Ok(parsed.map(Docs::from))
}

/// Parses an asynchronous token source into a stream of documents.
pub fn parse_stream<S>(tokens: S, options: ParseOptions) -> impl Stream<Item = Result<Doc>> + Unpin
where
    S: Stream<Item = Result<Token>> + Unpin,
{
    parser_driver(tokens, &options, options.suspend)
}

/// Tokenizes and parses `text` in one pass.
pub fn parse_str(text: &str, options: &ParseOptions) -> Result<Parsed<Docs>> {
    let chars = stream::iter(text.chars());
    let parsed = block_on(run(pipeline_driver(chars, options, false), options))?;
    Ok(parsed.map(Docs::from))
}

/// Tokenizes and parses an asynchronous character source in one pass.
///
/// # Examples
///
/// ```rust
/// use futures::executor::block_on;
/// use futures::stream;
/// use serde_cbon::{parse_chars_async, ParseOptions};
///
/// let options = ParseOptions::collect_all();
/// let parsed = block_on(parse_chars_async(stream::iter("{a 1".chars()), &options)).unwrap();
/// assert_eq!(parsed.value.documents().count(), 1);
/// assert_eq!(parsed.diagnostics[0].message, "Block is not closed");
/// ```
pub async fn parse_chars_async<S>(chars: S, options: &ParseOptions) -> Result<Parsed<Docs>>
where
    S: Stream<Item = char> + Unpin,
{
    let parsed = run(pipeline_driver(chars, options, options.suspend), options).await?;
    Ok(parsed.map(Docs::from))
}

/// Tokenizes and parses an asynchronous character source into a stream of documents.
pub fn parse_chars_stream<S>(chars: S, options: ParseOptions) -> impl Stream<Item = Result<Doc>> + Unpin
where
    S: Stream<Item = char> + Unpin,
{
    pipeline_driver(chars, &options, options.suspend)
}

/// Tokenizes and parses a character iterator lazily.
pub fn parse_chars_iter<I>(chars: I, options: ParseOptions) -> impl Iterator<Item = Result<Doc>>
where
    I: IntoIterator<Item = char>,
{
    block_on_stream(pipeline_driver(stream::iter(chars), &options, false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_tokenize_and_parse_agree() {
        let options = ParseOptions::new();
        let tokens = tokenize("{a 1, b [x]}", &options).unwrap();
        assert!(tokens.is_clean());
        let from_tokens = parse(tokens.value, &options).unwrap();
        let direct = parse_str("{a 1, b [x]}", &options).unwrap();
        assert_eq!(from_tokens.value, direct.value);
    }

    #[test]
    fn test_fail_fast_reports_one() {
        let err = parse_str("{a 1} ] {b", &ParseOptions::new()).unwrap_err();
        assert_eq!(err.as_diagnostics().map(|d| d.len()), Some(1));
    }

    #[test]
    fn test_collect_all_merges_stages() {
        let parsed = parse_str("{a 'x} [1", &ParseOptions::collect_all()).unwrap();
        let messages: Vec<_> = parsed.diagnostics.iter().map(|d| d.message.as_str()).collect();
        assert!(messages.contains(&"String is not closed"));
        assert!(!parsed.is_clean());
        assert!(parsed.clone().into_result().is_err());
    }

    #[test]
    fn test_streams_chain_with_diagnostics() {
        let options = ParseOptions::collect_all();
        let tokens = tokenize_stream(stream::iter("{a 'x".chars()), options.clone());
        let piped = block_on(parse_async(tokens, &options)).unwrap();
        let direct = parse_str("{a 'x", &options).unwrap();
        assert_eq!(piped.value, direct.value);
        let mut a: Vec<_> = piped.diagnostics.iter().map(|d| d.message.clone()).collect();
        let mut b: Vec<_> = direct.diagnostics.iter().map(|d| d.message.clone()).collect();
        a.sort();
        b.sort();
        assert_eq!(a, b);
    }

    #[test]
    fn test_iter_yields_documents_in_order() {
        let docs: Vec<_> = parse_chars_iter("[1] {a 2} // c".chars(), ParseOptions::new())
            .collect::<Result<_>>()
            .unwrap();
        assert!(matches!(docs[0], Doc::Arr(_)));
        assert!(matches!(docs[1], Doc::Block(_)));
        assert!(matches!(docs[2], Doc::Comment(_)));
    }

    #[test]
    fn test_diagnostics_come_last_in_streams() {
        let items: Vec<_> = tokenize_iter("'a".chars(), ParseOptions::collect_all()).collect();
        assert!(matches!(items.last(), Some(Err(Error::Parse(_)))));
        assert!(items[..items.len() - 1].iter().all(|i| i.is_ok()));
    }

    #[test]
    fn test_cancel_after_outputs() {
        let polls = Arc::new(AtomicUsize::new(0));
        let counter = polls.clone();
        let options = ParseOptions::new().with_cancel(move || counter.fetch_add(1, Ordering::SeqCst) >= 3);
        let items: Vec<_> = tokenize_iter("abc def ghi jkl".chars(), options).collect();
        assert!(matches!(items.last(), Some(Err(Error::Cancelled))));
        assert!(items.len() < 8);
        assert!(matches!(tokenize("[1]", &ParseOptions::new().with_cancel(|| true)), Err(Error::Cancelled)));
    }

    #[test]
    fn test_suspend_yields() {
        let options = ParseOptions::collect_all();
        let parsed = block_on(parse_chars_async(stream::iter("{a [1 2]}".chars()), &options)).unwrap();
        assert!(parsed.is_clean());
        assert_eq!(parsed.value.documents().count(), 1);

        let options = options.with_suspend(false);
        let parsed = block_on(parse_chars_async(stream::iter("{a [1 2]}".chars()), &options)).unwrap();
        assert_eq!(parsed.value.documents().count(), 1);
    }

    fn counting_canceller(calls: &Arc<AtomicUsize>, fire_at: usize) -> ParseOptions {
        let calls = calls.clone();
        ParseOptions::new().with_cancel(move || calls.fetch_add(1, Ordering::SeqCst) + 1 >= fire_at)
    }

    #[test]
    fn test_pipeline_checks_cancel_per_token() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut pipeline = Pipeline::new(&counting_canceller(&calls, usize::MAX));
        for c in "[1 2]".chars() {
            pipeline.feed(c).unwrap();
        }
        pipeline.finish().unwrap();
        // `[`, `1`, `2`, `]` and end of input.
        assert_eq!(calls.load(Ordering::SeqCst), 5);
        assert!(matches!(pipeline.next_output(), Some(Doc::Arr(_))));
    }

    #[test]
    fn test_pipeline_stops_between_tokens() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut pipeline = Pipeline::new(&counting_canceller(&calls, 2));
        assert!(pipeline.feed('[').is_ok());
        assert!(pipeline.feed('1').is_ok());
        // The space completes `1`, the second token.
        assert!(matches!(pipeline.feed(' '), Err(Error::Cancelled)));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
