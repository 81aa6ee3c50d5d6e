//! Character-level tokenizer.
//!
//! The tokenizer is a set of [`Lex`] units run by a [`Machine`]. Each character
//! is fed once; units that need to see the character after a construct (words,
//! lone comment markers) finish and hand that character back with a redo.
//!
//! Comments nest: a comment marker inside a comment starts a lenient detection
//! that either opens a nested comment (kept as a structured child) or gives the
//! marker back as plain text.

use crate::drive::Feed;
use crate::error::{Diagnostic, Result};
use crate::machine::{Action, Context, ErrorMode, Machine, Unit};
use crate::pos::{Position, Range};
use crate::token::{Comment, CommentKind, CommentPart, Marker, Quote, Symbol, Token};

const UNFINISHED_UNICODE: &str = "Unicode escape is not finished";
const INVALID_UNICODE: &str = "Invalid Unicode escape sequence";

type Ctx = Context<Token>;

/// What a finished unit hands back to the unit that started it.
pub(crate) enum Piece {
    Text(String),
    Comment(Comment),
}

/// Progress through a `\u` escape.
pub(crate) enum EscapeState {
    Start,
    Unicode,
    Fixed(String),
    Braced(String),
}

/// Text and nested comments collected by an open comment.
#[derive(Default)]
pub(crate) struct Body {
    parts: Vec<CommentPart>,
    text: String,
}

impl Body {
    fn flush(&mut self) {
        if !self.text.is_empty() {
            self.parts
                .push(CommentPart::Text(std::mem::take(&mut self.text)));
        }
    }

    fn absorb(&mut self, piece: Piece) {
        match piece {
            Piece::Text(s) => self.text.push_str(&s),
            Piece::Comment(c) => {
                self.flush();
                self.parts.push(CommentPart::Comment(c));
            }
        }
    }

    fn close(&mut self, kind: CommentKind, marker: Marker, range: Range) -> Comment {
        self.flush();
        Comment {
            kind,
            marker,
            parts: std::mem::take(&mut self.parts),
            range,
        }
    }
}

/// Tokenizer states.
pub(crate) enum Lex {
    Root,
    Word {
        start: Position,
        text: String,
    },
    Str {
        quote: Quote,
        start: Position,
        text: String,
    },
    Escape {
        quote: Quote,
        start: Position,
        state: EscapeState,
    },
    /// A comment marker was seen; the next character decides what it opens.
    Detect {
        marker: Marker,
        start: Position,
        lenient: bool,
    },
    LineComment {
        marker: Marker,
        start: Position,
        body: Body,
    },
    BlockComment {
        marker: Marker,
        start: Position,
        body: Body,
        star: bool,
    },
}

impl Unit for Lex {
    type Symbol = Option<char>;
    type Output = Piece;
    type Emit = Token;

    fn step(&mut self, c: &Option<char>, ctx: &mut Ctx) -> Result<Action<Self>> {
        let c = *c;
        match self {
            Lex::Root => Ok(root(c, ctx)),
            Lex::Word { start, text } => Ok(word(c, *start, text, ctx)),
            Lex::Str { quote, start, text } => string(c, *quote, *start, text, ctx),
            Lex::Escape {
                quote,
                start,
                state,
            } => escape(c, *quote, *start, state, ctx),
            Lex::Detect {
                marker,
                start,
                lenient,
            } => detect(c, *marker, *start, *lenient, ctx),
            Lex::LineComment {
                marker,
                start,
                body,
            } => Ok(line_comment(c, *marker, *start, body, ctx)),
            Lex::BlockComment {
                marker,
                start,
                body,
                star,
            } => block_comment(c, *marker, *start, body, star, ctx),
        }
    }

    fn absorb(&mut self, piece: Piece, ctx: &mut Ctx) -> Result<Option<Piece>> {
        match (self, piece) {
            (Lex::Root, Piece::Comment(c)) => ctx.emit(Token::Comment(c)),
            (Lex::Str { text, .. }, Piece::Text(s)) => text.push_str(&s),
            (Lex::LineComment { body, .. } | Lex::BlockComment { body, .. }, piece) => {
                body.absorb(piece)
            }
            _ => {}
        }
        Ok(None)
    }
}

/// Characters that cannot appear in a bare word.
pub(crate) fn ends_word(c: char) -> bool {
    c.is_whitespace()
        || Quote::from_char(c).is_some()
        || Symbol::from_char(c).is_some()
        || Marker::from_char(c).is_some()
}

fn root(c: Option<char>, ctx: &mut Ctx) -> Action<Lex> {
    let Some(c) = c else {
        ctx.emit(Token::EndOfInput(Range::at(ctx.pos())));
        return Action::pop();
    };
    if c.is_whitespace() {
        return Action::Stay;
    }
    if let Some(symbol) = Symbol::from_char(c) {
        ctx.emit(Token::Symbol(symbol, Range::at(ctx.pos())));
        return Action::Stay;
    }
    let start = ctx.pos();
    let unit = if let Some(quote) = Quote::from_char(c) {
        Lex::Str {
            quote,
            start,
            text: String::new(),
        }
    } else if let Some(marker) = Marker::from_char(c) {
        Lex::Detect {
            marker,
            start,
            lenient: false,
        }
    } else {
        return Action::Push {
            unit: Lex::Word {
                start,
                text: String::new(),
            },
            consume: false,
        };
    };
    Action::Push {
        unit,
        consume: true,
    }
}

fn word(c: Option<char>, start: Position, text: &mut String, ctx: &mut Ctx) -> Action<Lex> {
    match c {
        Some(c) if !ends_word(c) => {
            text.push(c);
            Action::Stay
        }
        _ => {
            ctx.emit(Token::Word(std::mem::take(text), ctx.range_from_last(start)));
            Action::redo()
        }
    }
}

fn string(
    c: Option<char>,
    quote: Quote,
    start: Position,
    text: &mut String,
    ctx: &mut Ctx,
) -> Result<Action<Lex>> {
    match c {
        None => {
            ctx.error(ctx.range_from(start), "String is not closed")?;
            ctx.emit(Token::QuotedString(
                std::mem::take(text),
                quote,
                ctx.range_from_last(start),
            ));
            Ok(Action::redo())
        }
        Some('\\') => Ok(Action::Push {
            unit: Lex::Escape {
                quote,
                start: ctx.pos(),
                state: EscapeState::Start,
            },
            consume: true,
        }),
        Some(c) if c == quote.as_char() => {
            ctx.emit(Token::QuotedString(
                std::mem::take(text),
                quote,
                ctx.range_from(start),
            ));
            Ok(Action::pop())
        }
        Some(c) => {
            text.push(c);
            Ok(Action::Stay)
        }
    }
}

fn escape(
    c: Option<char>,
    quote: Quote,
    start: Position,
    state: &mut EscapeState,
    ctx: &mut Ctx,
) -> Result<Action<Lex>> {
    match state {
        EscapeState::Start => {
            let decoded = match c {
                None => return Ok(Action::redo()),
                Some('u') => {
                    *state = EscapeState::Unicode;
                    return Ok(Action::Stay);
                }
                Some('n') => '\n',
                Some('r') => '\r',
                Some('t') => '\t',
                Some('0') => '\0',
                Some('b') => '\u{8}',
                Some('f') => '\u{c}',
                Some('v') => '\u{b}',
                Some(other) => other,
            };
            Ok(Action::finish(Piece::Text(decoded.to_string())))
        }
        EscapeState::Unicode => match c {
            Some('{') => {
                *state = EscapeState::Braced(String::new());
                Ok(Action::Stay)
            }
            Some(h) if h.is_ascii_hexdigit() => {
                *state = EscapeState::Fixed(h.to_string());
                Ok(Action::Stay)
            }
            other => malformed(other, quote, start, ctx),
        },
        EscapeState::Fixed(digits) => match c {
            Some(h) if h.is_ascii_hexdigit() => {
                digits.push(h);
                if digits.len() == 4 {
                    decode(digits, start, ctx)
                } else {
                    Ok(Action::Stay)
                }
            }
            other => malformed(other, quote, start, ctx),
        },
        EscapeState::Braced(digits) => match c {
            Some('}') if digits.is_empty() => {
                ctx.error(ctx.range_from(start), INVALID_UNICODE)?;
                Ok(Action::finish(Piece::Text(String::new())))
            }
            Some('}') => decode(digits, start, ctx),
            Some(h) if h.is_ascii_hexdigit() => {
                digits.push(h);
                if digits.len() > 6 {
                    ctx.error(ctx.range_from(start), INVALID_UNICODE)?;
                    Ok(Action::finish(Piece::Text(String::new())))
                } else {
                    Ok(Action::Stay)
                }
            }
            other => malformed(other, quote, start, ctx),
        },
    }
}

/// A `\u` escape interrupted by `c`. The closing quote or the end of input
/// means the escape was cut short; anything else is a bad digit.
fn malformed(c: Option<char>, quote: Quote, start: Position, ctx: &mut Ctx) -> Result<Action<Lex>> {
    let message = match c {
        Some(c) if c != quote.as_char() => INVALID_UNICODE,
        _ => UNFINISHED_UNICODE,
    };
    ctx.error(ctx.range_from(start), message)?;
    Ok(Action::finish_redo(Piece::Text(String::new())))
}

fn decode(digits: &str, start: Position, ctx: &mut Ctx) -> Result<Action<Lex>> {
    match u32::from_str_radix(digits, 16).ok().and_then(char::from_u32) {
        Some(ch) => Ok(Action::finish(Piece::Text(ch.to_string()))),
        None => {
            ctx.error(ctx.range_from(start), INVALID_UNICODE)?;
            Ok(Action::finish(Piece::Text(String::new())))
        }
    }
}

fn detect(
    c: Option<char>,
    marker: Marker,
    start: Position,
    lenient: bool,
    ctx: &mut Ctx,
) -> Result<Action<Lex>> {
    match c {
        Some('*') => Ok(Action::replace(
            Lex::BlockComment {
                marker,
                start,
                body: Body::default(),
                star: false,
            },
            true,
        )),
        Some(c) if c == marker.as_char() => Ok(Action::replace(
            Lex::LineComment {
                marker,
                start,
                body: Body::default(),
            },
            true,
        )),
        _ if lenient => Ok(Action::finish_redo(Piece::Text(
            marker.as_char().to_string(),
        ))),
        _ => {
            if marker == Marker::Slash {
                ctx.error(ctx.range_from(start), "Line Comment need two /")?;
            }
            Ok(Action::replace(
                Lex::LineComment {
                    marker,
                    start,
                    body: Body::default(),
                },
                false,
            ))
        }
    }
}

fn line_comment(
    c: Option<char>,
    marker: Marker,
    start: Position,
    body: &mut Body,
    ctx: &mut Ctx,
) -> Action<Lex> {
    match c {
        None | Some('\n') | Some('\r') => {
            let comment = body.close(CommentKind::Line, marker, ctx.range_from_last(start));
            Action::finish_redo(Piece::Comment(comment))
        }
        Some(c) => match Marker::from_char(c) {
            Some(nested) => nested_detect(nested, ctx),
            None => {
                body.text.push(c);
                Action::Stay
            }
        },
    }
}

fn block_comment(
    c: Option<char>,
    marker: Marker,
    start: Position,
    body: &mut Body,
    star: &mut bool,
    ctx: &mut Ctx,
) -> Result<Action<Lex>> {
    match c {
        None => {
            if *star {
                body.text.push('*');
            }
            let comment = body.close(CommentKind::Block, marker, ctx.range_from_last(start));
            ctx.error(Range::at(ctx.pos()), "Block Comment is not closed")?;
            Ok(Action::finish_redo(Piece::Comment(comment)))
        }
        Some('*') => {
            if *star {
                body.text.push('*');
            }
            *star = true;
            Ok(Action::Stay)
        }
        Some(c) if *star && c == marker.as_char() => {
            let comment = body.close(CommentKind::Block, marker, ctx.range_from(start));
            Ok(Action::finish(Piece::Comment(comment)))
        }
        Some(c) => {
            if std::mem::replace(star, false) {
                body.text.push('*');
                body.text.push(c);
                return Ok(Action::Stay);
            }
            match Marker::from_char(c) {
                Some(nested) => Ok(nested_detect(nested, ctx)),
                None => {
                    body.text.push(c);
                    Ok(Action::Stay)
                }
            }
        }
    }
}

fn nested_detect(marker: Marker, ctx: &Ctx) -> Action<Lex> {
    Action::Push {
        unit: Lex::Detect {
            marker,
            start: ctx.pos(),
            lenient: true,
        },
        consume: true,
    }
}

/// The tokenizer as a feedable machine over characters.
pub(crate) struct Lexer {
    machine: Machine<Lex>,
}

impl Lexer {
    pub(crate) fn new(mode: ErrorMode) -> Self {
        Lexer {
            machine: Machine::new(Lex::Root, mode),
        }
    }
}

impl Feed for Lexer {
    type Input = char;
    type Output = Token;

    fn feed(&mut self, c: char) -> Result<()> {
        self.machine.feed(&Some(c))?;
        self.machine.ctx().cursor.advance(c);
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.machine.finish(&None)
    }

    fn next_output(&mut self) -> Option<Token> {
        self.machine.take_emitted()
    }

    fn upstream(&mut self, diagnostics: Vec<Diagnostic>) -> Result<()> {
        self.machine.ctx().extend_diagnostics(diagnostics)
    }

    fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        self.machine.take_diagnostics()
    }
}
