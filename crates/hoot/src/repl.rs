//! Interactive session support.
//!
//! A session evaluates one line at a time against a persistent driver:
//! globals (and therefore functions, classes and natives) survive between
//! lines, while the error flags are cleared before each line so one bad line
//! does not poison the next.

use crate::{io::PrintWriter, run::Hoot};

/// A persistent REPL session.
///
/// # Example
/// ```
/// use hoot::{CollectStringPrint, ReplSession};
///
/// let mut session = ReplSession::new();
/// let mut output = CollectStringPrint::new();
/// session.execute("let owl = 40;", &mut output);
/// session.execute("print owl + 2;", &mut output);
/// assert_eq!(output.output(), "42");
/// ```
pub struct ReplSession {
    hoot: Hoot,
}

impl ReplSession {
    #[must_use]
    pub fn new() -> Self {
        Self { hoot: Hoot::new() }
    }

    /// Evaluates one line. Each line runs its own full pipeline, including
    /// the background task drain, so timers scheduled by a line fire before
    /// the next prompt.
    pub fn execute(&mut self, line: &str, stdout: &mut dyn PrintWriter) {
        self.hoot.reset();
        self.hoot.run(line, stdout);
    }

    /// True if the most recent line reported a compile-time error.
    #[must_use]
    pub fn had_error(&self) -> bool {
        self.hoot.had_error()
    }

    /// True if the most recent line hit a runtime error.
    #[must_use]
    pub fn had_runtime_error(&self) -> bool {
        self.hoot.had_runtime_error()
    }
}

impl Default for ReplSession {
    fn default() -> Self {
        Self::new()
    }
}
