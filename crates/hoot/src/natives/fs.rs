//! File natives: `read` and `write`.
//!
//! Both schedule background tasks; the blocking filesystem call happens on a
//! worker thread and the user callback runs later, during the driver's drain
//! phase. A failing task reports through diagnostics and skips its callback.

use std::{fs::OpenOptions, io::Write as _};

use crate::{
    error::{RunResult, RuntimeError},
    interpret::{Args, Interpreter},
    natives::text_arg,
    sched::{TaskKind, TaskPayload},
    token::Token,
    value::Value,
};

/// `read(path, callback)`: reads the file in the background and invokes
/// `callback(contents)` with a string-instance.
pub(super) fn read(interpreter: &mut Interpreter<'_>, args: Args, paren: &Token) -> RunResult<Value> {
    let mut args = args.into_iter();
    let path = text_arg(&args.next().expect("arity checked"), "read", paren)?;
    let callback = args.next().expect("arity checked");

    interpreter
        .scheduler_mut()
        .spawn(TaskKind::FileRead, Some(callback), paren.clone(), move || {
            std::fs::read_to_string(&path)
                .map(TaskPayload::Text)
                .map_err(|err| format!("Error reading '{path}'. Caught error: {err}"))
        });

    Ok(Value::Nil)
}

/// `write(path, mode, data, callback?)`: writes in the background. Mode "w"
/// truncates or creates, "a" appends. The callback, if not nil, is invoked
/// with no arguments on completion.
pub(super) fn write(interpreter: &mut Interpreter<'_>, args: Args, paren: &Token) -> RunResult<Value> {
    let mut args = args.into_iter();
    let path = text_arg(&args.next().expect("arity checked"), "write", paren)?;
    let mode = text_arg(&args.next().expect("arity checked"), "write", paren)?;
    let data = text_arg(&args.next().expect("arity checked"), "write", paren)?;
    let callback = match args.next().expect("arity checked") {
        Value::Nil => None,
        callback => Some(callback),
    };

    let append = match mode.as_str() {
        "w" => false,
        "a" => true,
        other => {
            return Err(RuntimeError::new(
                paren.clone(),
                format!("Unknown write mode '{other}'. Expect 'w' or 'a'."),
            ));
        }
    };

    interpreter
        .scheduler_mut()
        .spawn(TaskKind::FileWrite, callback, paren.clone(), move || {
            let result = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(!append)
                .append(append)
                .open(&path)
                .and_then(|mut file| file.write_all(data.as_bytes()));
            match result {
                Ok(()) => Ok(TaskPayload::Unit),
                Err(err) => Err(format!("Error writing '{path}'. Caught error: {err}")),
            }
        });

    Ok(Value::Nil)
}
