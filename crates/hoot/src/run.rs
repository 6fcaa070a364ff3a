//! The pipeline driver: source text in, side effects out.
//!
//! `scan → parse → resolve → interpret`, gated on the `had_error` flag after
//! parsing and again after resolution — a program with compile-time errors
//! never runs. The global environment (with the natives pre-installed)
//! belongs to the driver and survives across runs, which is what gives the
//! REPL its persistent state.

use std::rc::Rc;

use crate::{
    env::{EnvRef, Environment},
    error::Diagnostics,
    interpret::Interpreter,
    io::PrintWriter,
    natives,
    parse::Parser,
    resolve::Resolver,
    scan::Scanner,
    tracer::{NoopTracer, RunTracer},
};

/// Primary interface for running Hoot code.
///
/// # Example
/// ```
/// use hoot::{CollectStringPrint, Hoot};
///
/// let mut hoot = Hoot::new();
/// let mut output = CollectStringPrint::new();
/// hoot.run("print 1 + 2;", &mut output);
/// assert_eq!(output.output(), "3");
/// ```
pub struct Hoot {
    globals: EnvRef,
    diagnostics: Diagnostics,
    tracer: Rc<dyn RunTracer>,
}

impl Hoot {
    /// Creates a driver with the native built-ins installed in the global
    /// frame and no tracing.
    #[must_use]
    pub fn new() -> Self {
        Self::with_tracer(Rc::new(NoopTracer))
    }

    /// Creates a driver that reports task lifecycle events to `tracer`.
    #[must_use]
    pub fn with_tracer(tracer: Rc<dyn RunTracer>) -> Self {
        let globals = Environment::global();
        natives::install(&globals);
        Self {
            globals,
            diagnostics: Diagnostics::new(),
            tracer,
        }
    }

    /// Runs a program to completion, including the background task drain.
    ///
    /// Program output and runtime-error reports go through `stdout`;
    /// compile-time diagnostics go to stderr. Check [`Hoot::had_error`] and
    /// [`Hoot::had_runtime_error`] afterwards.
    pub fn run(&mut self, source: &str, stdout: &mut dyn PrintWriter) {
        let tokens = Scanner::new(source, &self.diagnostics).scan_tokens();
        let statements = Parser::new(tokens, &self.diagnostics).parse();

        // Stop for parse errors.
        if self.diagnostics.had_error() {
            return;
        }

        let bindings = Resolver::new(&self.diagnostics).resolve(&statements);

        // Stop for resolution errors.
        if self.diagnostics.had_error() {
            return;
        }

        let mut interpreter = Interpreter::new(
            Rc::clone(&self.globals),
            bindings,
            Rc::clone(&self.tracer),
            &self.diagnostics,
            stdout,
        );
        interpreter.interpret(&statements);
    }

    /// True if any lex, parse or resolve error was reported.
    #[must_use]
    pub fn had_error(&self) -> bool {
        self.diagnostics.had_error()
    }

    /// True if the last run hit a runtime error.
    #[must_use]
    pub fn had_runtime_error(&self) -> bool {
        self.diagnostics.had_runtime_error()
    }

    /// Clears both error flags and recorded diagnostics. Globals persist.
    pub fn reset(&mut self) {
        self.diagnostics.reset();
    }

    /// Copies of the diagnostics reported so far, in order.
    #[must_use]
    pub fn diagnostics(&self) -> Vec<String> {
        self.diagnostics.messages()
    }

    /// Maps the error flags onto the process exit code contract:
    /// 65 for compile errors, 70 for runtime errors, 0 otherwise.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        if self.had_error() {
            65
        } else if self.had_runtime_error() {
            70
        } else {
            0
        }
    }
}

impl Default for Hoot {
    fn default() -> Self {
        Self::new()
    }
}
