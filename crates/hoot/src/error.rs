//! Error taxonomy and diagnostics reporting.
//!
//! Compile-time problems (lex, parse, resolve) go through [`Diagnostics`]:
//! each is reported immediately, recorded, and sets the `had_error` flag that
//! gates the pipeline. Runtime problems are values — [`RuntimeError`] unwinds
//! the current program through [`Unwind`], the same channel `return` and
//! `break` travel on, distinguished by variant rather than by exception type.

use std::cell::{Cell, RefCell};

use crate::{
    token::{Token, TokenType},
    value::Value,
};

/// A runtime error carrying the token that triggered it, so the driver can
/// report the source line.
#[derive(Debug, Clone)]
pub(crate) struct RuntimeError {
    pub token: Token,
    pub message: String,
}

impl RuntimeError {
    pub fn new(token: Token, message: impl Into<String>) -> Self {
        Self {
            token,
            message: message.into(),
        }
    }
}

pub(crate) type RunResult<T> = Result<T, RuntimeError>;

/// Non-local control flow signal unwound by the evaluator.
///
/// `Return` and `Break` are not errors; the resolver guarantees they never
/// escape their function or loop. `execute_block` restores the previous
/// environment on every variant.
#[derive(Debug)]
pub(crate) enum Unwind {
    Error(RuntimeError),
    Return(Value),
    Break,
}

impl From<RuntimeError> for Unwind {
    fn from(error: RuntimeError) -> Self {
        Self::Error(error)
    }
}

pub(crate) type Exec<T> = Result<T, Unwind>;

/// Collector for compile-time diagnostics and the two pipeline gate flags.
///
/// Interior mutability lets the scanner, parser and resolver report while
/// borrowing the collector immutably. Formatted messages are also retained so
/// callers (and tests) can inspect what was reported.
#[derive(Debug, Default)]
pub(crate) struct Diagnostics {
    messages: RefCell<Vec<String>>,
    had_error: Cell<bool>,
    had_runtime_error: Cell<bool>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports a compile-time error: `[line N] Error<where>: <message>`.
    pub fn report(&self, line: u32, location: &str, message: &str) {
        let formatted = format!("[line {line}] Error{location}: {message}");
        eprintln!("{formatted}");
        self.messages.borrow_mut().push(formatted);
        self.had_error.set(true);
    }

    /// Reports an error against a token, pointing at its lexeme, or at the
    /// end of input for the EOF token.
    pub fn error_at(&self, token: &Token, message: &str) {
        if token.token_type == TokenType::Eof {
            self.report(token.line, " at end", message);
        } else {
            self.report(token.line, &format!(" at '{}'", token.lexeme), message);
        }
    }

    pub fn mark_runtime_error(&self) {
        self.had_runtime_error.set(true);
    }

    pub fn had_error(&self) -> bool {
        self.had_error.get()
    }

    pub fn had_runtime_error(&self) -> bool {
        self.had_runtime_error.get()
    }

    /// Clears both flags and the recorded messages. Used between REPL lines.
    pub fn reset(&self) {
        self.messages.borrow_mut().clear();
        self.had_error.set(false);
        self.had_runtime_error.set(false);
    }

    /// Returns a copy of every message reported so far.
    pub fn messages(&self) -> Vec<String> {
        self.messages.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenLiteral;

    #[test]
    fn report_formats_line_and_location() {
        let diagnostics = Diagnostics::new();
        diagnostics.report(3, " at 'x'", "Unexpected character.");
        assert_eq!(diagnostics.messages(), vec!["[line 3] Error at 'x': Unexpected character."]);
        assert!(diagnostics.had_error());
    }

    #[test]
    fn error_at_eof_points_at_end() {
        let diagnostics = Diagnostics::new();
        let eof = Token::new(TokenType::Eof, String::new(), TokenLiteral::None, 7);
        diagnostics.error_at(&eof, "Expect expression.");
        assert_eq!(diagnostics.messages(), vec!["[line 7] Error at end: Expect expression."]);
    }

    #[test]
    fn reset_clears_flags_and_messages() {
        let diagnostics = Diagnostics::new();
        diagnostics.report(1, "", "boom");
        diagnostics.mark_runtime_error();
        diagnostics.reset();
        assert!(!diagnostics.had_error());
        assert!(!diagnostics.had_runtime_error());
        assert!(diagnostics.messages().is_empty());
    }
}
