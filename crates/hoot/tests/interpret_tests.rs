//! End-to-end interpreter semantics: source in, printed lines out.

use hoot::{CollectStringPrint, Hoot};
use pretty_assertions::assert_eq;

/// Runs a program and returns the driver plus everything it printed.
fn run(source: &str) -> (Hoot, CollectStringPrint) {
    let mut hoot = Hoot::new();
    let mut output = CollectStringPrint::new();
    hoot.run(source, &mut output);
    (hoot, output)
}

/// Runs a program that is expected to finish cleanly and returns its output.
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
// Expressions and printing
// =============================================================================

#[test]
fn addition_prints_without_decimal_point() {
    assert_eq!(run_ok("print 1 + 2;"), vec!["3"]);
}

#[test]
fn fractional_results_keep_their_digits() {
    assert_eq!(run_ok("print 7 / 2;"), vec!["3.5"]);
}

#[test]
fn string_concatenation() {
    assert_eq!(run_ok("let a = \"hi\"; let b = \"!\"; print a + b;"), vec!["hi!"]);
}

#[test]
fn division_by_zero_is_not_trapped() {
    assert_eq!(run_ok("print 1 / 0;"), vec!["inf"]);
}

#[test]
fn precedence_cascade() {
    assert_eq!(run_ok("print 1 + 2 * 3 - 4 / 2;"), vec!["5"]);
    assert_eq!(run_ok("print (1 + 2) * 3;"), vec!["9"]);
}

#[test]
fn comparison_and_equality() {
    assert_eq!(
        run_ok("print 1 < 2; print 2 <= 2; print 3 > 4; print 1 == 1; print 1 != 1;"),
        vec!["true", "true", "false", "true", "false"]
    );
}

#[test]
fn equality_never_coerces() {
    assert_eq!(run_ok("print 1 == \"1\"; print nil == false;"), vec!["false", "false"]);
}

#[test]
fn unary_operators() {
    assert_eq!(run_ok("print -(3 + 4); print !nil; print !0;"), vec!["-7", "true", "false"]);
}

#[test]
fn logical_operators_return_the_deciding_operand() {
    assert_eq!(
        run_ok("print nil or \"fallback\"; print false and \"x\"; print 0 and 1;"),
        vec!["fallback", "false", "1"]
    );
}

#[test]
fn logical_operators_short_circuit() {
    // The right-hand call would blow up if evaluated.
    assert_eq!(run_ok("print true or missing(); print false and missing();"), vec!["true", "false"]);
}

#[test]
fn print_renders_every_value_shape() {
    assert_eq!(
        run_ok("fun f() {} class Foo {} print nil; print true; print \"s\"; print f; print Foo; print Foo(); print clock;"),
        vec!["nil", "true", "s", "<fn f>", "Foo", "Foo instance", "<native fn>"]
    );
}

// =============================================================================
// Variables and scope
// =============================================================================

#[test]
fn blocks_shadow_and_restore() {
    assert_eq!(
        run_ok("let a = \"outer\"; { let a = \"inner\"; print a; } print a;"),
        vec!["inner", "outer"]
    );
}

#[test]
fn assignment_is_an_expression_returning_the_value() {
    assert_eq!(run_ok("let a = 1; print a = 2; print a;"), vec!["2", "2"]);
}

#[test]
fn assignment_in_a_block_writes_the_outer_binding() {
    assert_eq!(run_ok("let a = 1; { a = 5; } print a;"), vec!["5"]);
}

#[test]
fn let_without_initializer_is_nil() {
    assert_eq!(run_ok("let a; print a;"), vec!["nil"]);
}

// =============================================================================
// Control flow
// =============================================================================

#[test]
fn if_else_follows_truthiness() {
    assert_eq!(
        run_ok("if (0) print \"zero is truthy\"; if (nil) print \"no\"; else print \"nil is falsey\";"),
        vec!["zero is truthy", "nil is falsey"]
    );
}

#[test]
fn while_loops_run_to_the_condition() {
    assert_eq!(run_ok("let i = 0; while (i < 3) { print i; i = i + 1; }"), vec!["0", "1", "2"]);
}

#[test]
fn for_desugaring_counts_in_order() {
    assert_eq!(run_ok("for (let i = 0; i < 3; i = i + 1) print i;"), vec!["0", "1", "2"]);
}

#[test]
fn for_initializer_is_invisible_after_the_loop() {
    let (hoot, output) = run("for (let i = 0; i < 1; i = i + 1) {} print i;");
    assert!(hoot.had_runtime_error(), "'i' should not leak out of the loop");
    assert_eq!(output.lines(), ["[line 1] Undefined variable 'i'."]);
}

#[test]
fn break_exits_the_innermost_loop_only() {
    let source = "\
let i = 0;
while (i < 2) {
  let j = 0;
  while (true) {
    if (j > 0) break;
    print i + j;
    j = j + 1;
  }
  i = i + 1;
}";
    assert_eq!(run_ok(source), vec!["0", "1"]);
}

#[test]
fn break_inside_for_stops_the_desugared_while() {
    assert_eq!(
        run_ok("for (let i = 0; i < 10; i = i + 1) { if (i == 2) break; print i; }"),
        vec!["0", "1"]
    );
}

// =============================================================================
// Functions and closures
// =============================================================================

#[test]
fn nested_closures_capture_the_defining_scope() {
    assert_eq!(
        run_ok("fun make(n) { fun add(x) { return n + x; } return add; } print make(3)(4);"),
        vec!["7"]
    );
}

#[test]
fn closures_see_bindings_at_call_time_regardless_of_caller() {
    let source = "\
let x = \"global\";
fun outer() {
  let x = \"local\";
  fun inner() { print x; }
  return inner;
}
let f = outer();
f();";
    assert_eq!(run_ok(source), vec!["local"]);
}

#[test]
fn closures_share_their_captured_frame() {
    let source = "\
fun counter() {
  let n = 0;
  fun tick() { n = n + 1; print n; }
  return tick;
}
let t = counter();
t();
t();";
    assert_eq!(run_ok(source), vec!["1", "2"]);
}

#[test]
fn function_without_return_yields_nil() {
    assert_eq!(run_ok("fun f() {} print f();"), vec!["nil"]);
}

#[test]
fn recursion_through_the_global_binding() {
    assert_eq!(
        run_ok("fun fib(n) { if (n < 2) return n; return fib(n - 1) + fib(n - 2); } print fib(10);"),
        vec!["55"]
    );
}

#[test]
fn lambdas_are_first_class_values() {
    assert_eq!(run_ok("let double = fun(x) { return x * 2; }; print double(21);"), vec!["42"]);
}

// =============================================================================
// Classes
// =============================================================================

#[test]
fn constructor_runs_init_and_fields_stick() {
    assert_eq!(run_ok("class C { init(x) { this.x = x; } } print C(5).x;"), vec!["5"]);
}

#[test]
fn methods_bind_this() {
    let source = "\
class Owl {
  init(name) { this.name = name; }
  speak() { print this.name; }
}
Owl(\"echo\").speak();";
    assert_eq!(run_ok(source), vec!["echo"]);
}

#[test]
fn extracted_methods_stay_bound_to_their_instance() {
    let source = "\
class Owl {
  init(name) { this.name = name; }
  speak() { print this.name; }
}
let m = Owl(\"echo\").speak;
m();";
    assert_eq!(run_ok(source), vec!["echo"]);
}

#[test]
fn super_dispatches_from_the_lexical_superclass() {
    let source = "\
class A { greet() { print \"A\"; } }
class B < A { greet() { super.greet(); print \"B\"; } }
B().greet();";
    assert_eq!(run_ok(source), vec!["A", "B"]);
}

#[test]
fn super_binds_the_dynamic_this() {
    let source = "\
class Base { tag() { return \"tag-\"; } }
class Mid < Base {
  name() { return \"mid\"; }
  describe() { print super.tag() + this.name(); }
}
class Leaf < Mid {
  name() { return \"leaf\"; }
}
Leaf().describe();";
    // describe is found on Mid; super.tag() starts at Base; this is the Leaf.
    assert_eq!(run_ok(source), vec!["tag-leaf"]);
}

#[test]
fn inherited_methods_resolve_through_the_chain() {
    let source = "\
class A { speak() { print \"hoot\"; } }
class B < A {}
B().speak();";
    assert_eq!(run_ok(source), vec!["hoot"]);
}

#[test]
fn bare_return_in_init_still_yields_the_instance() {
    let source = "\
class C {
  init() {
    this.ready = true;
    return;
  }
}
print C().ready;";
    assert_eq!(run_ok(source), vec!["true"]);
}

#[test]
fn property_assignment_returns_the_value() {
    assert_eq!(run_ok("class Box {} let b = Box(); print b.v = 7;"), vec!["7"]);
}

#[test]
fn fields_shadow_methods() {
    let source = "\
class C { tag() { return \"method\"; } }
let c = C();
c.tag = \"field\";
print c.tag;";
    assert_eq!(run_ok(source), vec!["field"]);
}

// =============================================================================
// Runtime errors
// =============================================================================

/// Checks a program fails at runtime with the given report on stdout.
fn expect_runtime_error(source: &str, expected_line: &str) {
    let (hoot, output) = run(source);
    assert!(!hoot.had_error(), "should compile: {:?}", hoot.diagnostics());
    assert!(hoot.had_runtime_error(), "expected a runtime error");
    assert_eq!(hoot.exit_code(), 70);
    assert_eq!(output.lines(), [expected_line.to_owned()]);
}

#[test]
fn subtracting_a_string_is_a_type_error() {
    expect_runtime_error("\"a\" - 1;", "[line 1] Operand must be a number");
}

#[test]
fn mixed_plus_reports_both_accepted_shapes() {
    expect_runtime_error("1 + \"a\";", "[line 1] Operands must be two numbers or two strings.");
}

#[test]
fn property_access_on_nil_fails() {
    expect_runtime_error("nil.x;", "[line 1] Only instances have properties");
}

#[test]
fn field_assignment_on_a_number_fails() {
    expect_runtime_error("let x = 1; x.y = 2;", "[line 1] Only instances have fields.");
}

#[test]
fn calling_a_non_callable_fails() {
    expect_runtime_error("let x = 1; x();", "[line 1] Can only call functions and classes.");
}

#[test]
fn arity_mismatch_reports_expected_and_got() {
    expect_runtime_error("fun f(a) {} f();", "[line 1] Expected 1 arguments but got 0.");
}

#[test]
fn undefined_variable_reports_its_name() {
    expect_runtime_error("print missing;", "[line 1] Undefined variable 'missing'.");
}

#[test]
fn undefined_property_reports_its_name() {
    expect_runtime_error("class C {} C().missing;", "[line 1] Undefined property 'missing'.");
}

#[test]
fn superclass_must_be_a_class() {
    expect_runtime_error("let NotAClass = 1; class C < NotAClass {}", "[line 1] Superclass must be a class.");
}

#[test]
fn runtime_errors_report_the_right_line() {
    expect_runtime_error("let a = 1;\nlet b = 2;\nprint a - \"x\";", "[line 3] Operand must be a number");
}

#[test]
fn statements_before_the_error_still_ran() {
    let (hoot, output) = run("print \"first\"; nil.x;");
    assert!(hoot.had_runtime_error());
    assert_eq!(
        output.lines(),
        ["first".to_owned(), "[line 1] Only instances have properties".to_owned()]
    );
}

// =============================================================================
// Mixed string-instance concatenation
// =============================================================================

#[test]
fn primitive_and_string_instance_concatenate() {
    assert_eq!(
        run_ok("print \"a\" + string(\"b\"); print string(\"a\") + \"b\"; print string(\"a\") + string(\"b\");"),
        vec!["ab", "ab", "ab"]
    );
}

#[test]
fn mixed_concatenation_yields_a_string_instance() {
    // The result supports the string-instance surface.
    assert_eq!(run_ok("print (\"ho\" + string(\"ot\")).length();"), vec!["4"]);
}
