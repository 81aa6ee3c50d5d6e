//! Generic pushdown automaton shared by the tokenizer and the parser.
//!
//! A [`Machine`] owns a stack of units. Each unit is one state of a grammar,
//! holding whatever it has accumulated so far as plain fields. Feeding a symbol
//! hands it to the unit on top of the stack, which answers with an [`Action`]:
//! stay, push a child, or pop itself (optionally handing an output to its parent
//! and re-delivering the symbol there).
//!
//! The tokenizer runs a machine over characters and the parser runs one over
//! tokens; neither contains any stack handling of its own.

use crate::error::{Diagnostic, Error, Result};
use crate::pos::{Cursor, Position, Range};
use std::collections::VecDeque;

/// How a run reacts to diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ErrorMode {
    /// The first diagnostic aborts the run and is the only one reported.
    #[default]
    FailFast,
    /// Every diagnostic is recorded and the run recovers and completes.
    CollectAll,
}

/// What happens after a unit pops itself.
pub(crate) enum Then<U> {
    /// The symbol is consumed.
    Consumed,
    /// The symbol is delivered again, now to the unit below.
    Redo,
    /// A replacement unit is pushed; the symbol is delivered to it unless `consume`.
    Push { unit: U, consume: bool },
}

/// The answer of a unit to one symbol.
pub(crate) enum Action<U: Unit> {
    Stay,
    Push { unit: U, consume: bool },
    Pop {
        output: Option<U::Output>,
        then: Then<U>,
    },
}

impl<U: Unit> Action<U> {
    /// Pop without output and consume the symbol.
    pub(crate) fn pop() -> Self {
        Action::Pop {
            output: None,
            then: Then::Consumed,
        }
    }

    /// Pop and deliver the symbol again below.
    pub(crate) fn redo() -> Self {
        Action::Pop {
            output: None,
            then: Then::Redo,
        }
    }

    /// Pop, hand `output` to the parent, and consume the symbol.
    pub(crate) fn finish(output: U::Output) -> Self {
        Action::Pop {
            output: Some(output),
            then: Then::Consumed,
        }
    }

    /// Pop, hand `output` to the parent, and deliver the symbol again below.
    pub(crate) fn finish_redo(output: U::Output) -> Self {
        Action::Pop {
            output: Some(output),
            then: Then::Redo,
        }
    }

    /// Replace the current unit with `unit`.
    pub(crate) fn replace(unit: U, consume: bool) -> Self {
        Action::Pop {
            output: None,
            then: Then::Push { unit, consume },
        }
    }
}

/// One grammar state.
pub(crate) trait Unit: Sized {
    /// The input symbol type (characters or tokens).
    type Symbol;
    /// What a finished unit hands to its parent.
    type Output;
    /// Final products the machine queues for its driver.
    type Emit;

    fn step(&mut self, symbol: &Self::Symbol, ctx: &mut Context<Self::Emit>)
        -> Result<Action<Self>>;

    /// Receives the output of a finished child.
    ///
    /// Returning `Some` finishes this unit as well, handing that output on to its
    /// own parent.
    fn absorb(
        &mut self,
        output: Self::Output,
        ctx: &mut Context<Self::Emit>,
    ) -> Result<Option<Self::Output>>;
}

/// Shared state of one run: error mode, diagnostics, output queue, cursor.
pub(crate) struct Context<E> {
    mode: ErrorMode,
    diagnostics: Vec<Diagnostic>,
    emitted: VecDeque<E>,
    pub(crate) cursor: Cursor,
}

impl<E> Context<E> {
    fn new(mode: ErrorMode) -> Self {
        Context {
            mode,
            diagnostics: Vec::new(),
            emitted: VecDeque::new(),
            cursor: Cursor::new(),
        }
    }

    /// Reports a diagnostic.
    ///
    /// Fails in fail-fast mode, so units propagate it with `?` and the run stops.
    pub(crate) fn error(&mut self, range: Range, message: &str) -> Result<()> {
        tracing::debug!(%range, message, "diagnostic");
        let diagnostic = Diagnostic::new(range, message);
        match self.mode {
            ErrorMode::FailFast => Err(Error::diagnostic(diagnostic)),
            ErrorMode::CollectAll => {
                self.diagnostics.push(diagnostic);
                Ok(())
            }
        }
    }

    /// Absorbs diagnostics reported by an upstream stage.
    pub(crate) fn extend_diagnostics(&mut self, list: Vec<Diagnostic>) -> Result<()> {
        match self.mode {
            ErrorMode::FailFast if !list.is_empty() => Err(Error::diagnostics(list)),
            _ => {
                self.diagnostics.extend(list);
                Ok(())
            }
        }
    }

    pub(crate) fn emit(&mut self, item: E) {
        self.emitted.push_back(item);
    }

    #[inline]
    pub(crate) fn pos(&self) -> Position {
        self.cursor.pos()
    }

    #[inline]
    pub(crate) fn last_pos(&self) -> Position {
        self.cursor.last_pos()
    }

    /// Range from `start` to the current position.
    #[inline]
    pub(crate) fn range_from(&self, start: Position) -> Range {
        Range::new(start, self.pos())
    }

    /// Range from `start` to the last consumed position.
    #[inline]
    pub(crate) fn range_from_last(&self, start: Position) -> Range {
        let end = self.last_pos();
        if end.offset < start.offset {
            Range::at(start)
        } else {
            Range::new(start, end)
        }
    }
}

/// A stack of units and the context they share.
pub(crate) struct Machine<U: Unit> {
    stack: Vec<U>,
    ctx: Context<U::Emit>,
}

impl<U: Unit> Machine<U> {
    pub(crate) fn new(root: U, mode: ErrorMode) -> Self {
        Machine {
            stack: vec![root],
            ctx: Context::new(mode),
        }
    }

    /// Delivers one symbol and returns once the stack is stable again.
    pub(crate) fn feed(&mut self, symbol: &U::Symbol) -> Result<()> {
        loop {
            let Some(top) = self.stack.last_mut() else {
                return Ok(());
            };
            match top.step(symbol, &mut self.ctx)? {
                Action::Stay => return Ok(()),
                Action::Push { unit, consume } => {
                    self.stack.push(unit);
                    if consume {
                        return Ok(());
                    }
                }
                Action::Pop { output, then } => {
                    self.stack.pop();
                    self.deliver(output)?;
                    match then {
                        Then::Consumed => return Ok(()),
                        Then::Redo => continue,
                        Then::Push { unit, consume } => {
                            self.stack.push(unit);
                            if consume {
                                return Ok(());
                            }
                        }
                    }
                }
            }
        }
    }

    /// Delivers the end-of-input symbol until every open unit has finished.
    pub(crate) fn finish(&mut self, end: &U::Symbol) -> Result<()> {
        self.feed(end)?;
        while self.stack.len() > 1 {
            self.stack.pop();
            self.feed(end)?;
        }
        Ok(())
    }

    /// Hands a finished unit's output to its parent, cascading while parents finish.
    fn deliver(&mut self, mut output: Option<U::Output>) -> Result<()> {
        while let Some(out) = output.take() {
            let Some(parent) = self.stack.last_mut() else {
                break;
            };
            output = parent.absorb(out, &mut self.ctx)?;
            if output.is_some() {
                self.stack.pop();
            }
        }
        Ok(())
    }

    pub(crate) fn ctx(&mut self) -> &mut Context<U::Emit> {
        &mut self.ctx
    }

    pub(crate) fn take_emitted(&mut self) -> Option<U::Emit> {
        self.ctx.emitted.pop_front()
    }

    pub(crate) fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.ctx.diagnostics)
    }
}
