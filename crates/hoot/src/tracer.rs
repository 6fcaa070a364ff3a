//! Tracing hooks for the background task driver.
//!
//! Embedders observe task lifecycle without touching the interpreter:
//! [`NoopTracer`] (default) discards events, [`StderrTracer`] logs
//! human-readable lines, and [`RecordingTracer`] buffers events for
//! inspection in tests.

use std::cell::RefCell;

use crate::sched::{TaskId, TaskKind};

/// One task lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceEvent {
    TaskSpawned {
        task: TaskId,
        kind: TaskKind,
    },
    TaskCompleted {
        task: TaskId,
        kind: TaskKind,
    },
    TaskFailed {
        task: TaskId,
        kind: TaskKind,
        message: String,
    },
}

/// Receiver for task lifecycle events.
///
/// All hooks run on the driver thread. Default implementations are no-ops so
/// implementors only override what they care about.
pub trait RunTracer {
    fn task_spawned(&self, task: TaskId, kind: TaskKind) {
        let _ = (task, kind);
    }

    fn task_completed(&self, task: TaskId, kind: TaskKind) {
        let _ = (task, kind);
    }

    fn task_failed(&self, task: TaskId, kind: TaskKind, message: &str) {
        let _ = (task, kind, message);
    }
}

/// Tracer that discards all events.
#[derive(Debug, Default)]
pub struct NoopTracer;

impl RunTracer for NoopTracer {}

/// Tracer that writes one line per event to stderr.
#[derive(Debug, Default)]
pub struct StderrTracer;

impl RunTracer for StderrTracer {
    fn task_spawned(&self, task: TaskId, kind: TaskKind) {
        eprintln!("[task {}] spawned {kind}", task.raw());
    }

    fn task_completed(&self, task: TaskId, kind: TaskKind) {
        eprintln!("[task {}] completed {kind}", task.raw());
    }

    fn task_failed(&self, task: TaskId, kind: TaskKind, message: &str) {
        eprintln!("[task {}] failed {kind}: {message}", task.raw());
    }
}

/// Tracer that buffers events in order for later assertion.
#[derive(Debug, Default)]
pub struct RecordingTracer {
    events: RefCell<Vec<TraceEvent>>,
}

impl RecordingTracer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every event recorded so far, in arrival order.
    #[must_use]
    pub fn events(&self) -> Vec<TraceEvent> {
        self.events.borrow().clone()
    }

    /// Counts recorded spawn events.
    #[must_use]
    pub fn spawned_count(&self) -> usize {
        self.events
            .borrow()
            .iter()
            .filter(|event| matches!(event, TraceEvent::TaskSpawned { .. }))
            .count()
    }

    /// Counts recorded completion events.
    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.events
            .borrow()
            .iter()
            .filter(|event| matches!(event, TraceEvent::TaskCompleted { .. }))
            .count()
    }
}

impl RunTracer for RecordingTracer {
    fn task_spawned(&self, task: TaskId, kind: TaskKind) {
        self.events.borrow_mut().push(TraceEvent::TaskSpawned { task, kind });
    }

    fn task_completed(&self, task: TaskId, kind: TaskKind) {
        self.events.borrow_mut().push(TraceEvent::TaskCompleted { task, kind });
    }

    fn task_failed(&self, task: TaskId, kind: TaskKind, message: &str) {
        self.events.borrow_mut().push(TraceEvent::TaskFailed {
            task,
            kind,
            message: message.to_owned(),
        });
    }
}
