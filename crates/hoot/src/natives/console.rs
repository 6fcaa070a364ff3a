//! Console native: `input`.

use std::io::{BufRead, Write};

use crate::{
    error::{RunResult, RuntimeError},
    natives::collections,
    token::Token,
    value::Value,
};

/// `input(prompt)`: prints the prompt, reads one line from stdin, and
/// returns it (without the trailing newline) as a string-instance.
pub(super) fn input(args: &[Value], paren: &Token) -> RunResult<Value> {
    let prompt = args[0].stringify();
    print!("{prompt}");
    let _ = std::io::stdout().flush();

    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(|err| RuntimeError::new(paren.clone(), format!("Error reading input. Caught error: {err}")))?;
    while line.ends_with('\n') || line.ends_with('\r') {
        line.pop();
    }
    Ok(collections::string_instance(line))
}
