//! The async driver: delay, file I/O, and the drain contract.
//!
//! The driver runs the top-level program first, then drains background tasks
//! until none remain, including tasks spawned by callbacks. Callbacks from
//! distinct tasks have no guaranteed order, so cross-task assertions here are
//! membership checks, not sequences.

use std::rc::Rc;

use hoot::{CollectStringPrint, Hoot, RecordingTracer, RunTracer, TaskKind, TraceEvent};
use pretty_assertions::assert_eq;

fn run(source: &str) -> (Hoot, CollectStringPrint) {
    let mut hoot = Hoot::new();
    let mut output = CollectStringPrint::new();
    hoot.run(source, &mut output);
    (hoot, output)
}

fn run_ok(source: &str) -> Vec<String> {
    let (hoot, output) = run(source);
    assert!(!hoot.had_error(), "unexpected compile error: {:?}", hoot.diagnostics());
    assert!(
        !hoot.had_runtime_error(),
        "unexpected runtime error, output: {:?}",
        output.lines()
    );
    output.lines().to_vec()
}

// =============================================================================
// delay
// =============================================================================

#[test]
fn delayed_callbacks_run_after_the_top_level_program() {
    assert_eq!(
        run_ok("delay(fun() { print \"late\"; }, 10); print \"early\";"),
        vec!["early", "late"]
    );
}

#[test]
fn delay_returns_zero_immediately() {
    assert_eq!(run_ok("print delay(fun() { print \"later\"; }, 5);"), vec!["0", "later"]);
}

#[test]
fn callbacks_may_schedule_more_work_before_exit() {
    assert_eq!(
        run_ok("delay(fun() { print \"outer\"; delay(fun() { print \"inner\"; }, 5); }, 5); print \"start\";"),
        vec!["start", "outer", "inner"]
    );
}

#[test]
fn callbacks_within_one_task_chain_run_in_spawn_order() {
    // Three generations of nested timers drain generation by generation.
    let source = "\
delay(fun() {
  print 1;
  delay(fun() {
    print 2;
    delay(fun() { print 3; }, 1);
  }, 1);
}, 1);";
    assert_eq!(run_ok(source), vec!["1", "2", "3"]);
}

#[test]
fn delay_requires_a_numeric_wait() {
    let (hoot, output) = run("delay(fun() {}, \"soon\");");
    assert!(hoot.had_runtime_error());
    assert_eq!(output.lines(), ["[line 1] 'delay' only accepts numbers. Got 'soon'."]);
}

#[test]
fn delay_checks_arity() {
    let (hoot, output) = run("delay(fun() {});");
    assert!(hoot.had_runtime_error());
    assert_eq!(output.lines(), ["[line 1] Expected 2 arguments but got 1."]);
}

#[test]
fn a_failing_callback_does_not_strand_other_tasks() {
    let (hoot, output) = run("delay(fun() { nil.x; }, 5); delay(fun() { print \"survivor\"; }, 120);");
    assert!(hoot.had_runtime_error(), "the bad callback should flag a runtime error");
    let lines = output.lines();
    assert!(
        lines.contains(&"survivor".to_owned()),
        "the healthy task should still drain, got: {lines:?}"
    );
    assert!(
        lines.iter().any(|line| line.contains("Only instances have properties")),
        "the failure should be reported, got: {lines:?}"
    );
}

// =============================================================================
// write / read
// =============================================================================

#[test]
fn write_then_read_roundtrip() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("note.txt").display().to_string();
    let source = format!(
        "write(\"{path}\", \"w\", \"hoot\", fun() {{ read(\"{path}\", fun(contents) {{ print contents; }}); }});"
    );
    assert_eq!(run_ok(&source), vec!["hoot"]);
}

#[test]
fn append_mode_extends_the_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("log.txt").display().to_string();
    let source = format!(
        "write(\"{path}\", \"w\", \"a\", fun() {{
           write(\"{path}\", \"a\", \"b\", fun() {{
             read(\"{path}\", fun(contents) {{ print contents; }});
           }});
         }});"
    );
    assert_eq!(run_ok(&source), vec!["ab"]);
}

#[test]
fn write_accepts_a_nil_callback() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("quiet.txt").display().to_string();

    let mut hoot = Hoot::new();
    let mut output = CollectStringPrint::new();
    // The first run drains the write before returning, so the second run
    // observes the file.
    hoot.run(&format!("write(\"{path}\", \"w\", \"quiet\", nil);"), &mut output);
    assert!(!hoot.had_error() && !hoot.had_runtime_error());
    hoot.run(
        &format!("read(\"{path}\", fun(contents) {{ print contents; }});"),
        &mut output,
    );
    assert_eq!(output.lines(), ["quiet"]);
}

#[test]
fn write_rejects_unknown_modes() {
    let (hoot, output) = run("write(\"somewhere\", \"x\", \"data\", nil);");
    assert!(hoot.had_runtime_error());
    assert_eq!(output.lines(), ["[line 1] Unknown write mode 'x'. Expect 'w' or 'a'."]);
}

#[test]
fn file_contents_arrive_as_a_string_instance() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("sized.txt").display().to_string();
    let source = format!(
        "write(\"{path}\", \"w\", \"hoot\", fun() {{ read(\"{path}\", fun(contents) {{ print contents.length(); }}); }});"
    );
    assert_eq!(run_ok(&source), vec!["4"]);
}

#[test]
fn a_failed_read_reports_and_skips_its_callback() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("missing.txt").display().to_string();
    let (hoot, output) = run(&format!("read(\"{path}\", fun(contents) {{ print contents; }});"));
    assert!(
        output.lines().is_empty(),
        "the callback of a failed task must not run, printed: {:?}",
        output.lines()
    );
    assert!(hoot.had_error(), "the failure should land in diagnostics");
    assert!(
        hoot.diagnostics().iter().any(|message| message.contains("Error reading")),
        "got: {:?}",
        hoot.diagnostics()
    );
}

// =============================================================================
// tracing
// =============================================================================

#[test]
fn tracer_observes_spawn_and_completion() {
    let tracer = Rc::new(RecordingTracer::new());
    let mut hoot = Hoot::with_tracer(Rc::clone(&tracer) as Rc<dyn RunTracer>);
    let mut output = CollectStringPrint::new();
    hoot.run("delay(fun() {}, 1); delay(fun() {}, 1);", &mut output);

    assert_eq!(tracer.spawned_count(), 2);
    assert_eq!(tracer.completed_count(), 2);
    assert!(
        matches!(
            tracer.events().first(),
            Some(TraceEvent::TaskSpawned {
                kind: TaskKind::Timer,
                ..
            })
        ),
        "the first event should be a timer spawn, got: {:?}",
        tracer.events()
    );
}

#[test]
fn tracer_observes_failures() {
    let tracer = Rc::new(RecordingTracer::new());
    let mut hoot = Hoot::with_tracer(Rc::clone(&tracer) as Rc<dyn RunTracer>);
    let mut output = CollectStringPrint::new();
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("absent.txt").display().to_string();
    hoot.run(&format!("read(\"{path}\", fun(contents) {{}});"), &mut output);

    assert!(
        tracer.events().iter().any(|event| matches!(
            event,
            TraceEvent::TaskFailed {
                kind: TaskKind::FileRead,
                ..
            }
        )),
        "got: {:?}",
        tracer.events()
    );
}
