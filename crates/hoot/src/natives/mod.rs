//! Native built-ins wired into the global frame at startup.
//!
//! Every native is a [`NativeFunction`] value: a kind from the closed
//! [`NativeFn`] set, plus an optional receiver when the native is a
//! collection method bound to its instance. Dispatch is a single match in
//! [`call`]; arity lives next to the kind so the interpreter can check it
//! before invoking (−1 disables the check).

pub(crate) mod collections;
mod console;
mod fs;
mod http;
mod time;

use std::rc::Rc;

use crate::{
    env::EnvRef,
    error::{RunResult, RuntimeError},
    interpret::{Args, Interpreter},
    object::InstanceRef,
    sched::TaskPayload,
    token::Token,
    value::Value,
};

/// The closed set of native functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub(crate) enum NativeFn {
    // Globals installed at startup.
    Clock,
    Delay,
    Input,
    Read,
    Write,
    Request,
    #[strum(serialize = "string")]
    StringNew,
    #[strum(serialize = "list")]
    ListNew,
    #[strum(serialize = "map")]
    MapNew,

    // Collection methods, always bound to a receiver.
    At,
    Alter,
    Length,
    Push,
    Pop,
    #[strum(serialize = "get")]
    MapGet,
    #[strum(serialize = "set")]
    MapSet,
}

impl NativeFn {
    /// Expected argument count; −1 disables arity checking.
    pub fn arity(self) -> i32 {
        match self {
            Self::Clock | Self::MapNew | Self::Length | Self::Pop => 0,
            Self::Input | Self::StringNew | Self::At | Self::Push | Self::MapGet => 1,
            Self::Delay | Self::Read | Self::Alter | Self::MapSet => 2,
            Self::Write => 4,
            Self::Request => 5,
            Self::ListNew => -1,
        }
    }
}

/// A native callable value.
#[derive(Clone)]
pub(crate) struct NativeFunction {
    pub kind: NativeFn,
    /// The instance a collection method was looked up on.
    pub receiver: Option<InstanceRef>,
}

impl NativeFunction {
    pub fn new(kind: NativeFn) -> Self {
        Self { kind, receiver: None }
    }

    pub fn bound(kind: NativeFn, receiver: InstanceRef) -> Self {
        Self {
            kind,
            receiver: Some(receiver),
        }
    }

    /// Identity comparison: same kind bound to the same receiver.
    pub fn is_same(&self, other: &Self) -> bool {
        if self.kind != other.kind {
            return false;
        }
        match (&self.receiver, &other.receiver) {
            (None, None) => true,
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Defines every startup native in the global frame.
pub(crate) fn install(globals: &EnvRef) {
    let mut frame = globals.borrow_mut();
    for kind in [
        NativeFn::Clock,
        NativeFn::Delay,
        NativeFn::Input,
        NativeFn::Read,
        NativeFn::Write,
        NativeFn::Request,
        NativeFn::StringNew,
        NativeFn::ListNew,
        NativeFn::MapNew,
    ] {
        frame.define(kind.to_string(), Value::Native(NativeFunction::new(kind)));
    }
}

/// Invokes a native. Arity has already been checked by the interpreter.
pub(crate) fn call(
    interpreter: &mut Interpreter<'_>,
    native: &NativeFunction,
    args: Args,
    paren: &Token,
) -> RunResult<Value> {
    match native.kind {
        NativeFn::Clock => time::clock(paren),
        NativeFn::Delay => time::delay(interpreter, args, paren),
        NativeFn::Input => console::input(&args, paren),
        NativeFn::Read => fs::read(interpreter, args, paren),
        NativeFn::Write => fs::write(interpreter, args, paren),
        NativeFn::Request => http::request(interpreter, args, paren),
        NativeFn::StringNew => Ok(collections::new_string(&args)),
        NativeFn::ListNew => Ok(collections::new_list(args)),
        NativeFn::MapNew => Ok(collections::new_map()),
        NativeFn::At | NativeFn::Alter | NativeFn::Length | NativeFn::Push | NativeFn::Pop | NativeFn::MapGet | NativeFn::MapSet => {
            let receiver = native
                .receiver
                .as_ref()
                .expect("collection methods are always bound to a receiver");
            collections::call_method(receiver, native.kind, &args, paren)
        }
    }
}

/// Wraps a completed task's payload into the values its callback receives.
/// Runs on the driver thread, never on a worker.
pub(crate) fn payload_arguments(payload: TaskPayload) -> Args {
    match payload {
        TaskPayload::Unit => Args::new(),
        TaskPayload::Text(text) => {
            let mut args = Args::new();
            args.push(collections::string_instance(text));
            args
        }
        TaskPayload::Response { body, headers } => {
            let mut args = Args::new();
            args.push(http::response_instance(body, headers));
            args
        }
    }
}

/// Extracts textual content from a primitive string or string-instance.
fn text_arg(value: &Value, what: &str, token: &Token) -> RunResult<String> {
    value.as_text().ok_or_else(|| {
        RuntimeError::new(
            token.clone(),
            format!("'{what}' only accepts strings. Got '{}'.", value.stringify()),
        )
    })
}

/// Extracts a number argument.
fn number_arg(value: &Value, what: &str, token: &Token) -> RunResult<f64> {
    match value {
        Value::Number(n) => Ok(*n),
        other => Err(RuntimeError::new(
            token.clone(),
            format!("'{what}' only accepts numbers. Got '{}'.", other.stringify()),
        )),
    }
}
