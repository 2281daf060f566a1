use std::cell::RefCell;
use std::rc::Rc;

use zoof::{Sink, Zoof};

struct Capture(Rc<RefCell<Vec<String>>>);

impl Sink for Capture {
  fn print_line(&mut self, line: &str) {
    self.0.borrow_mut().push(line.to_string());
  }
}

fn run(src: &str) -> Vec<String> {
  let lines = Rc::new(RefCell::new(Vec::new()));
  let mut zoof = Zoof::with_sink(Box::new(Capture(lines.clone())));
  let outcome = zoof.run("<test>", src);
  assert!(outcome.diagnostics.is_clean(), "unexpected diagnostics for {src:?}");
  Rc::try_unwrap(lines).unwrap().into_inner()
}

#[test]
fn arithmetic_and_print() {
  assert_eq!(run("print 3 + 4 * 2\n"), vec!["11.0"]);
}

#[test]
fn assignment_and_variable_reference() {
  assert_eq!(run("a = 10\nb = a + 5\nprint b\n"), vec!["15.0"]);
}

#[test]
fn if_statement_branches_on_a_bool() {
  assert_eq!(run("if 1 == 1 do\n    print 'yes'\nelse\n    print 'no'\n"), vec!["yes"]);
}

#[test]
fn if_expression_yields_a_value() {
  assert_eq!(run("print if 2 < 3 its 'a' else 'b'\n"), vec!["a"]);
}

#[test]
fn for_loop_iterates_a_range() {
  assert_eq!(run("for i in 0:3 do\n    print i\n"), vec!["0.0", "1.0", "2.0"]);
}

#[test]
fn mutual_recursion_between_module_functions() {
  let src = "func foo() do\n    return bar()\nfunc bar() do\n    return 42\nprint foo()\n";
  assert_eq!(run(src), vec!["42.0"]);
}

#[test]
fn struct_with_impl_and_getter() {
  let src = "struct Vector\n    x num\n    y num\n\nimpl Vector\n    func new(x, y) its This(x, y)\n    getter length() its (this..x ^ 2 + this..y ^ 2) ^ 0.5\n\nv = Vector.new(3, 4)\nprint v.length\n";
  assert_eq!(run(src), vec!["5.0"]);
}

#[test]
fn non_bool_if_condition_reports_a_runtime_error() {
  let mut zoof = Zoof::new();
  let outcome = zoof.run("<test>", "if 1 do\n    print 'x'\n");
  assert!(outcome.diagnostics.had_runtime_error);
  assert_eq!(outcome.diagnostics.exit_code(), 70);
  assert_eq!(outcome.reports[0].code(), "E8295");
}

#[test]
fn undefined_name_is_caught_before_running() {
  let mut zoof = Zoof::new();
  let outcome = zoof.run("<test>", "print doesNotExist\n");
  assert!(outcome.diagnostics.had_analysis_error);
  assert_eq!(outcome.diagnostics.exit_code(), 65);
}

#[test]
fn dedent_mismatch_is_a_syntax_error() {
  let mut zoof = Zoof::new();
  let outcome = zoof.run("<test>", "do\n    do\n        print 1\n      print 2\n");
  assert!(outcome.diagnostics.had_syntax_error);
  assert_eq!(outcome.diagnostics.exit_code(), 65);
}

#[test]
fn field_privacy_blocks_dotdot_access_from_outside() {
  let src = "struct Point\n    x num\n\nimpl Point\n    func new(x) its This(x)\n\np = Point.new(1)\nprint p..x\n";
  let mut zoof = Zoof::new();
  let outcome = zoof.run("<test>", src);
  assert!(outcome.diagnostics.had_runtime_error);
  assert_eq!(outcome.reports[0].code(), "E8242");
}

#[test]
fn repl_session_keeps_module_scope_across_lines() {
  let mut zoof = Zoof::new();
  assert!(zoof.run("<repl>", "x = 41\n").diagnostics.is_clean());
  let outcome = zoof.eval_line("<repl>", "x + 1\n");
  assert!(outcome.diagnostics.is_clean());
  assert_eq!(outcome.value.map(|v| v.stringify()), Some("42.0".to_string()));
}
