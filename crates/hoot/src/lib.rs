#![doc = include_str!("../../../README.md")]

mod ast;
mod env;
mod error;
mod function;
mod interpret;
mod io;
mod natives;
mod object;
mod parse;
mod repl;
mod resolve;
mod run;
mod scan;
mod sched;
mod token;
mod tracer;
mod value;

pub use crate::{
    io::{CollectStringPrint, NoPrint, PrintWriter, StdPrint},
    repl::ReplSession,
    run::Hoot,
    sched::{TaskId, TaskKind},
    tracer::{NoopTracer, RecordingTracer, RunTracer, StderrTracer, TraceEvent},
};
