//! Background task scheduling for native I/O.
//!
//! User code is single-threaded; only native built-ins go off-thread. Each
//! blocking job (timer, file read/write, HTTP request) runs on its own worker
//! thread and posts a plain-data payload to a channel inbox. Workers never
//! touch interpreter state: payloads are wrapped into values on the driver
//! thread, right before the user callback runs.
//!
//! The pending table maps task ids to the callback that should receive the
//! payload. The interpreter drains the inbox after the top-level program
//! finishes; callbacks that spawn new tasks grow the table, and the drain
//! loop keeps going until it is empty. Completions arrive in completion
//! order, not submission order.

use crossbeam_channel::{Receiver, Sender};

use ahash::AHashMap;

use crate::{token::Token, tracer::RunTracer, value::Value};

/// Unique identifier for a background task, allocated sequentially.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(u32);

impl TaskId {
    /// Returns the raw u32 value.
    #[must_use]
    pub fn raw(self) -> u32 {
        self.0
    }
}

/// What kind of blocking work a task performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum TaskKind {
    Timer,
    FileRead,
    FileWrite,
    HttpRequest,
}

/// Plain data produced by a worker, wrapped into values on the driver thread.
#[derive(Debug)]
pub(crate) enum TaskPayload {
    /// Completion with nothing to hand to the callback (timers, writes).
    Unit,
    /// File contents; becomes a string-instance callback argument.
    Text(String),
    /// HTTP response; becomes a `Response` instance callback argument.
    Response {
        body: String,
        headers: Vec<(String, String)>,
    },
}

pub(crate) type TaskOutcome = Result<TaskPayload, String>;

struct Completion {
    task: TaskId,
    outcome: TaskOutcome,
}

/// Driver-side bookkeeping for one in-flight task.
pub(crate) struct PendingTask {
    /// Invoked with the wrapped payload on success. `None` for fire-and-forget
    /// writes.
    pub callback: Option<Value>,
    /// The call-site token, for error reporting.
    pub token: Token,
    pub kind: TaskKind,
}

pub(crate) struct Scheduler {
    tx: Sender<Completion>,
    rx: Receiver<Completion>,
    pending: AHashMap<TaskId, PendingTask>,
    next_task: u32,
    tracer: std::rc::Rc<dyn RunTracer>,
}

impl Scheduler {
    pub fn new(tracer: std::rc::Rc<dyn RunTracer>) -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self {
            tx,
            rx,
            pending: AHashMap::new(),
            next_task: 0,
            tracer,
        }
    }

    /// Registers a pending task and runs `job` on a fresh worker thread.
    pub fn spawn<F>(&mut self, kind: TaskKind, callback: Option<Value>, token: Token, job: F) -> TaskId
    where
        F: FnOnce() -> TaskOutcome + Send + 'static,
    {
        let task = TaskId(self.next_task);
        self.next_task += 1;
        self.pending.insert(task, PendingTask { callback, token, kind });
        self.tracer.task_spawned(task, kind);

        let tx = self.tx.clone();
        std::thread::spawn(move || {
            // The send fails only when the driver already shut down and
            // dropped the receiver; the result is discarded either way.
            let _ = tx.send(Completion { task, outcome: job() });
        });

        task
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Blocks for the next completion and removes its pending entry.
    ///
    /// # Panics
    /// Panics if called with no pending tasks (the drain loop checks first).
    pub fn next_completion(&mut self) -> (PendingTask, TaskOutcome) {
        assert!(self.has_pending(), "next_completion requires a pending task");
        // The scheduler owns a sender, so the channel cannot disconnect.
        let completion = self.rx.recv().expect("completion channel cannot disconnect");
        let pending = self
            .pending
            .remove(&completion.task)
            .expect("every completion matches a pending entry");
        match &completion.outcome {
            Ok(_) => self.tracer.task_completed(completion.task, pending.kind),
            Err(message) => self.tracer.task_failed(completion.task, pending.kind, message),
        }
        (pending, completion.outcome)
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::{
        token::{TokenType, Token},
        tracer::{NoopTracer, RecordingTracer, TraceEvent},
    };

    fn paren() -> Token {
        Token::synthetic(TokenType::RightParen, ")", 1)
    }

    #[test]
    fn completions_drain_until_empty() {
        let mut scheduler = Scheduler::new(Rc::new(NoopTracer));
        scheduler.spawn(TaskKind::Timer, None, paren(), || Ok(TaskPayload::Unit));
        scheduler.spawn(TaskKind::Timer, None, paren(), || Ok(TaskPayload::Unit));

        let mut seen = 0;
        while scheduler.has_pending() {
            let (pending, outcome) = scheduler.next_completion();
            assert_eq!(pending.kind, TaskKind::Timer);
            assert!(outcome.is_ok());
            seen += 1;
        }
        assert_eq!(seen, 2);
    }

    #[test]
    fn failures_are_reported_to_the_tracer() {
        let tracer = Rc::new(RecordingTracer::new());
        let mut scheduler = Scheduler::new(Rc::clone(&tracer) as Rc<dyn RunTracer>);
        scheduler.spawn(TaskKind::FileRead, None, paren(), || Err("no such file".to_owned()));

        let (_, outcome) = scheduler.next_completion();
        assert_eq!(outcome.expect_err("job failed"), "no such file");
        assert!(
            tracer
                .events()
                .iter()
                .any(|event| matches!(event, TraceEvent::TaskFailed { .. })),
            "tracer should observe the failure, got: {:?}",
            tracer.events()
        );
    }

    #[test]
    fn task_ids_are_sequential() {
        let mut scheduler = Scheduler::new(Rc::new(NoopTracer));
        let first = scheduler.spawn(TaskKind::Timer, None, paren(), || Ok(TaskPayload::Unit));
        let second = scheduler.spawn(TaskKind::Timer, None, paren(), || Ok(TaskPayload::Unit));
        assert_eq!(first.raw() + 1, second.raw());
        while scheduler.has_pending() {
            scheduler.next_completion();
        }
    }
}
