//! Static resolution errors: programs that parse but must not run.

use hoot::{CollectStringPrint, Hoot};

/// Runs a program expected to fail resolution and returns the driver.
fn expect_resolve_error(source: &str, expected_fragment: &str) -> Hoot {
    let mut hoot = Hoot::new();
    let mut output = CollectStringPrint::new();
    hoot.run(source, &mut output);
    assert!(hoot.had_error(), "expected a compile error for: {source}");
    assert_eq!(hoot.exit_code(), 65);
    assert!(
        hoot.diagnostics().iter().any(|message| message.contains(expected_fragment)),
        "diagnostics should mention {expected_fragment:?}, got: {:?}",
        hoot.diagnostics()
    );
    assert!(
        output.lines().is_empty(),
        "a program with resolve errors must not run, printed: {:?}",
        output.lines()
    );
    hoot
}

#[test]
fn return_at_top_level() {
    expect_resolve_error("return 1;", "Can't return from top-level code.");
}

#[test]
fn return_with_value_inside_initializer() {
    expect_resolve_error(
        "class C { init() { return 1; } }",
        "Can't return a value from an initializer.",
    );
}

#[test]
fn self_inheritance() {
    expect_resolve_error("class X < X {}", "A class can't inherit from itself.");
}

#[test]
fn local_read_in_its_own_initializer() {
    expect_resolve_error("{ let a = a; }", "Can't read local variable in its own initializer.");
}

#[test]
fn duplicate_declaration_in_a_local_scope() {
    expect_resolve_error("{ let a = 1; let a = 2; }", "Already a variable with this name in this scope.");
}

#[test]
fn break_outside_a_loop() {
    expect_resolve_error("break;", "Can't use 'break' outside of a loop.");
}

#[test]
fn break_does_not_reach_through_a_function_boundary() {
    expect_resolve_error("while (true) { fun f() { break; } }", "Can't use 'break' outside of a loop.");
}

#[test]
fn break_in_an_escaping_closure_is_flagged_at_resolve_time() {
    // The closure is returned and called where no loop encloses it; the
    // break must be rejected statically, never unwound at runtime.
    expect_resolve_error(
        "fun outer() { while (true) { fun inner() { break; } return inner; } } outer()();",
        "Can't use 'break' outside of a loop.",
    );
}

#[test]
fn break_in_a_method_body_inside_a_loop_is_flagged() {
    expect_resolve_error(
        "while (true) { class C { m() { break; } } }",
        "Can't use 'break' outside of a loop.",
    );
}

#[test]
fn break_in_a_lambda_inside_a_loop_is_flagged() {
    expect_resolve_error(
        "while (true) { let f = fun() { break; }; }",
        "Can't use 'break' outside of a loop.",
    );
}

#[test]
fn a_loop_inside_a_function_still_allows_break() {
    let mut hoot = Hoot::new();
    let mut output = CollectStringPrint::new();
    hoot.run("fun f() { while (true) { break; } } f();", &mut output);
    assert!(!hoot.had_error(), "got: {:?}", hoot.diagnostics());
    assert!(!hoot.had_runtime_error());
}

#[test]
fn this_outside_a_class() {
    expect_resolve_error("print this;", "Can't use 'this' outside of a class.");
}

#[test]
fn this_inside_a_plain_function() {
    expect_resolve_error("fun f() { print this; }", "Can't use 'this' outside of a class.");
}

#[test]
fn super_outside_a_class() {
    expect_resolve_error("print super.x;", "Can't use 'super' outside of a class.");
}

#[test]
fn super_in_a_class_without_a_superclass() {
    expect_resolve_error(
        "class C { speak() { super.speak(); } }",
        "Can't use 'super' in a class with no superclass.",
    );
}

#[test]
fn errors_gate_execution_even_when_earlier_statements_are_fine() {
    // The print statement is valid but must never run.
    expect_resolve_error("print 1; return 2;", "Can't return from top-level code.");
}

#[test]
fn multiple_errors_are_all_reported() {
    let mut hoot = Hoot::new();
    let mut output = CollectStringPrint::new();
    hoot.run("break; return 1; print this;", &mut output);
    assert!(hoot.had_error());
    assert_eq!(
        hoot.diagnostics().len(),
        3,
        "resolution should continue past each error, got: {:?}",
        hoot.diagnostics()
    );
}
