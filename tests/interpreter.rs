#[cfg(test)]
mod interpreter_tests {
    use std::cell::RefCell;
    use std::io::Write;
    use std::rc::Rc;

    use rlox as lox;

    use lox::error::LoxError;
    use lox::interpreter::Interpreter;
    use lox::parser::Parser;
    use lox::resolver::Resolver;
    use lox::scanner::Scanner;
    use lox::token::Token;

    /// `print` sink shared between the test and the interpreter.
    #[derive(Clone, Default)]
    struct OutputCapture {
        into: Rc<RefCell<Vec<u8>>>,
    }

    impl OutputCapture {
        fn contents(&self) -> String {
            String::from_utf8(self.into.borrow().clone()).expect("captured output is UTF-8")
        }
    }

    impl Write for OutputCapture {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.into.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    /// Run a program through the full pipeline, panicking on static
    /// errors, and return the captured output plus the runtime result.
    fn run(source: &str) -> (String, Result<(), LoxError>) {
        let capture = OutputCapture::default();
        let mut interpreter = Interpreter::new().with_output(Box::new(capture.clone()));

        let tokens: Vec<Token> = Scanner::new(source).filter_map(Result::ok).collect();

        let (statements, parse_errors) = Parser::new(tokens).parse();
        assert!(
            parse_errors.is_empty(),
            "unexpected parse errors: {:?}",
            parse_errors
        );

        let resolve_errors = Resolver::new(&mut interpreter).resolve(&statements);
        assert!(
            resolve_errors.is_empty(),
            "unexpected resolve errors: {:?}",
            resolve_errors
        );

        let result = interpreter.interpret(&statements);

        (capture.contents(), result)
    }

    fn run_ok(source: &str) -> String {
        let (output, result) = run(source);
        result.unwrap_or_else(|e| panic!("runtime error: {}", e));

        output
    }

    fn run_err(source: &str) -> String {
        let (_, result) = run(source);

        result.expect_err("expected a runtime error").to_string()
    }

    // End-to-end scenarios
    // ─────────────────────────────────────────────────────────────────────

    #[test]
    fn test_eval_01_fibonacci() {
        let output = run_ok(
            "fun fib(n) { if (n < 2) return n; return fib(n - 1) + fib(n - 2); } \
             print fib(10);",
        );

        assert_eq!(output, "55\n");
    }

    #[test]
    fn test_eval_02_closure_capture_independence() {
        let output = run_ok(
            "fun makeCounter() { \
               var i = 0; \
               fun count() { i = i + 1; return i; } \
               return count; \
             } \
             var a = makeCounter(); \
             var b = makeCounter(); \
             print a(); print a(); print b();",
        );

        assert_eq!(output, "1\n2\n1\n");
    }

    #[test]
    fn test_eval_03_lexical_scope_through_shadowing() {
        let output = run_ok(
            "var a = \"global\"; \
             { \
               fun show() { print a; } \
               show(); \
               var a = \"local\"; \
               show(); \
             }",
        );

        assert_eq!(output, "global\nglobal\n");
    }

    #[test]
    fn test_eval_04_inheritance_and_super() {
        let output = run_ok(
            "class A { hello() { print \"A\"; } } \
             class B < A { hello() { super.hello(); print \"B\"; } } \
             B().hello();",
        );

        assert_eq!(output, "A\nB\n");
    }

    #[test]
    fn test_eval_05_initializer_returns_instance() {
        let output = run_ok("class P { init(x) { this.x = x; } } var p = P(7); print p.x;");

        assert_eq!(output, "7\n");
    }

    #[test]
    fn test_eval_06_break_and_continue() {
        let output = run_ok(
            "var s = 0; \
             for (var i = 0; i < 10; i = i + 1) { \
               if (i == 5) break; \
               if (i == 2) continue; \
               s = s + i; \
             } \
             print s;",
        );

        assert_eq!(output, "8\n");
    }

    // Operators and values
    // ─────────────────────────────────────────────────────────────────────

    #[test]
    fn test_eval_07_arithmetic_and_string_concat() {
        assert_eq!(run_ok("print 1 + 2 * 3 - 4 / 2;"), "5\n");
        assert_eq!(run_ok("print \"foo\" + \"bar\";"), "foobar\n");
        assert_eq!(run_ok("print 0.5 + 0.25;"), "0.75\n");
    }

    #[test]
    fn test_eval_08_mixed_plus_is_an_error() {
        let message = run_err("print \"a\" + 1;");

        assert!(message.contains("Operands must be two strings or two numbers."));
    }

    #[test]
    fn test_eval_09_division_by_zero_is_ieee() {
        assert_eq!(run_ok("print 1 / 0;"), "inf\n");
        assert_eq!(run_ok("assert 1 / 0 > 0; print \"ok\";"), "ok\n");
    }

    #[test]
    fn test_eval_10_equality() {
        assert_eq!(run_ok("print nil == nil;"), "true\n");
        assert_eq!(run_ok("print nil == false;"), "false\n");
        assert_eq!(run_ok("print 1 == 1;"), "true\n");
        assert_eq!(run_ok("print \"a\" == \"a\";"), "true\n");
        assert_eq!(run_ok("print 1 == \"1\";"), "false\n");
    }

    #[test]
    fn test_eval_11_string_comparison_is_lexicographic() {
        assert_eq!(run_ok("print \"apple\" < \"banana\";"), "true\n");
        assert_eq!(run_ok("print \"b\" <= \"a\";"), "false\n");
    }

    #[test]
    fn test_eval_12_logical_operators_return_operands() {
        assert_eq!(run_ok("print nil or \"yes\";"), "yes\n");
        assert_eq!(run_ok("print \"hi\" or 2;"), "hi\n");
        assert_eq!(run_ok("print nil and 2;"), "nil\n");
        assert_eq!(run_ok("print 1 and 2;"), "2\n");
    }

    #[test]
    fn test_eval_13_short_circuit_skips_side_effects() {
        let output = run_ok(
            "var called = false; \
             fun touch() { called = true; return true; } \
             var _ = false and touch(); \
             print called;",
        );

        assert_eq!(output, "false\n");
    }

    #[test]
    fn test_eval_14_ternary() {
        assert_eq!(run_ok("print 1 < 2 ? \"yes\" : \"no\";"), "yes\n");
        assert_eq!(run_ok("print nil ? 1 : 2;"), "2\n");
    }

    #[test]
    fn test_eval_15_unary_operators() {
        assert_eq!(run_ok("print -(3);"), "-3\n");
        assert_eq!(run_ok("print +3;"), "3\n");
        assert_eq!(run_ok("print !nil;"), "true\n");
        assert_eq!(run_ok("print !0;"), "false\n");

        assert!(run_err("print -\"x\";").contains("Operand must be a number."));
    }

    #[test]
    fn test_eval_16_assert_statement() {
        assert_eq!(run_ok("assert 1 == 1; print \"ok\";"), "ok\n");
        assert!(run_err("assert 1 == 2;").contains("Assertion failed."));
    }

    // Calls and classes
    // ─────────────────────────────────────────────────────────────────────

    #[test]
    fn test_eval_17_call_arity_mismatch() {
        let message = run_err("fun f(a, b) {} f(1);");

        assert!(message.contains("Expected 2 arguments but got 1 arguments."));
    }

    #[test]
    fn test_eval_18_only_callables_can_be_called() {
        assert!(run_err("1();").contains("Can only call functions and classes."));
        assert!(run_err("\"s\"();").contains("Can only call functions and classes."));
    }

    #[test]
    fn test_eval_19_fields_shadow_methods() {
        let output = run_ok(
            "class C { f() { return \"method\"; } } \
             var c = C(); \
             print c.f(); \
             c.f = \"field\"; \
             print c.f;",
        );

        assert_eq!(output, "method\nfield\n");
    }

    #[test]
    fn test_eval_20_undefined_property() {
        let message = run_err("class C {} print C().missing;");

        assert!(message.contains("Undefined property 'missing'."));
    }

    #[test]
    fn test_eval_21_property_access_on_non_instance() {
        assert!(run_err("print 1.x;").contains("Only instances have properties."));
        assert!(run_err("1.x = 2;").contains("Only instances have fields."));
    }

    #[test]
    fn test_eval_22_method_lookup_through_superclass_chain() {
        let output = run_ok(
            "class A { name() { return \"A\"; } } \
             class B < A {} \
             class C < B {} \
             print C().name();",
        );

        assert_eq!(output, "A\n");
    }

    #[test]
    fn test_eval_23_class_without_init_takes_no_arguments() {
        let message = run_err("class C {} C(1);");

        assert!(message.contains("Expected 0 arguments but got 1 arguments."));
    }

    #[test]
    fn test_eval_24_initializer_early_return_still_yields_instance() {
        let output = run_ok(
            "class P { init(x) { this.x = x; if (x > 0) return; this.x = 0; } } \
             print P(5).x; \
             print P(-1).x;",
        );

        assert_eq!(output, "5\n0\n");
    }

    #[test]
    fn test_eval_25_bound_method_remembers_receiver() {
        let output = run_ok(
            "class C { init(tag) { this.tag = tag; } who() { return this.tag; } } \
             var a = C(\"a\"); \
             var m = a.who; \
             print m();",
        );

        assert_eq!(output, "a\n");
    }

    #[test]
    fn test_eval_26_superclass_must_be_a_class() {
        let message = run_err("var NotAClass = 1; class C < NotAClass {}");

        assert!(message.contains("Superclass must be a class."));
    }

    #[test]
    fn test_eval_27_return_unwinds_through_nested_blocks_and_loops() {
        let output = run_ok(
            "fun find() { \
               for (var i = 0; i < 100; i = i + 1) { \
                 { if (i == 7) return i; } \
               } \
             } \
             print find();",
        );

        assert_eq!(output, "7\n");
    }

    // Natives
    // ─────────────────────────────────────────────────────────────────────

    #[test]
    fn test_eval_28_clock_returns_a_number() {
        assert_eq!(run_ok("assert clock() > 0; print \"ok\";"), "ok\n");
    }

    #[test]
    fn test_eval_29_string_native() {
        assert_eq!(run_ok("print string(42);"), "42\n");
        assert_eq!(run_ok("print string(nil);"), "nil\n");
        assert_eq!(run_ok("print string(true);"), "true\n");

        // Idempotent on strings.
        assert_eq!(run_ok("print string(\"x\") == \"x\";"), "true\n");
    }

    #[test]
    fn test_eval_30_instance_of_native() {
        let output = run_ok(
            "class A {} class B {} \
             var a = A(); \
             print instance_of(a, A); \
             print instance_of(a, B);",
        );

        assert_eq!(output, "true\nfalse\n");
    }

    #[test]
    fn test_eval_31_native_errors_are_distinct() {
        let message = run_err("sleep(-1);");

        assert_eq!(
            message,
            "Error in native function: Argument to 'sleep' should be a non-negative number."
        );

        let message = run_err("instance_of(1, 2);");

        assert!(message.starts_with("Error in native function:"));
    }

    // Boundaries
    // ─────────────────────────────────────────────────────────────────────

    #[test]
    fn test_eval_32_empty_program() {
        assert_eq!(run_ok(""), "");
    }

    #[test]
    fn test_eval_33_undefined_variable() {
        let message = run_err("print missing;");

        assert!(message.contains("Undefined variable 'missing'."));
        assert!(message.contains("[line 1]"));
    }

    #[test]
    fn test_eval_34_number_formatting() {
        assert_eq!(run_ok("print 3.0;"), "3\n");
        assert_eq!(run_ok("print 3.5;"), "3.5\n");
        assert_eq!(run_ok("print 100;"), "100\n");
    }

    #[test]
    fn test_eval_35_runtime_error_reports_line() {
        let (_, result) = run("var a = 1;\nprint a + \"x\";");

        let message = result.expect_err("expected runtime error").to_string();
        assert!(message.ends_with("[line 2]"), "message: {}", message);
    }

    #[test]
    fn test_eval_36_while_loop_with_assignment_condition() {
        let output = run_ok(
            "var n = 0; \
             while (n < 3) { print n; n = n + 1; }",
        );

        assert_eq!(output, "0\n1\n2\n");
    }

    #[test]
    fn test_eval_37_block_scoping_restores_outer_binding() {
        let output = run_ok(
            "var a = \"outer\"; \
             { var a = \"inner\"; print a; } \
             print a;",
        );

        assert_eq!(output, "inner\nouter\n");
    }

    #[test]
    fn test_eval_38_closure_over_loop_variable_sees_final_value() {
        // One frame holds the loop variable; the closure shares it.
        let output = run_ok(
            "var f; \
             for (var i = 0; i < 3; i = i + 1) { \
               if (i == 0) { fun g() { return i; } f = g; } \
             } \
             print f();",
        );

        assert_eq!(output, "3\n");
    }
}
