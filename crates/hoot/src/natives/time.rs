//! Time natives: `clock` and `delay`.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::{
    error::{RunResult, RuntimeError},
    interpret::{Args, Interpreter},
    natives::number_arg,
    sched::{TaskKind, TaskPayload},
    token::Token,
    value::Value,
};

/// `clock()`: seconds since the UNIX epoch as a number.
pub(super) fn clock(paren: &Token) -> RunResult<Value> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|_| RuntimeError::new(paren.clone(), "System clock is before the UNIX epoch."))?;
    Ok(Value::Number(now.as_secs_f64()))
}

/// `delay(callback, ms)`: schedules a timer task and returns 0 immediately.
/// The callback runs with no arguments once the driver drains the task, at
/// least `ms` milliseconds from now.
pub(super) fn delay(interpreter: &mut Interpreter<'_>, args: Args, paren: &Token) -> RunResult<Value> {
    let mut args = args.into_iter();
    let callback = args.next().expect("arity checked");
    let ms = number_arg(&args.next().expect("arity checked"), "delay", paren)?;
    let wait = Duration::from_millis(if ms.is_finite() && ms > 0.0 { ms as u64 } else { 0 });

    interpreter
        .scheduler_mut()
        .spawn(TaskKind::Timer, Some(callback), paren.clone(), move || {
            std::thread::sleep(wait);
            Ok(TaskPayload::Unit)
        });

    Ok(Value::Number(0.0))
}
