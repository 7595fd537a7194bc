#[cfg(test)]
mod resolver_tests {
    use rlox as lox;

    use lox::interpreter::Interpreter;
    use lox::parser::Parser;
    use lox::resolver::Resolver;
    use lox::scanner::Scanner;
    use lox::token::Token;

    /// Parse (expecting no syntax errors) and resolve, returning the
    /// rendered static errors.
    fn resolve_errors(source: &str) -> Vec<String> {
        let tokens: Vec<Token> = Scanner::new(source).filter_map(Result::ok).collect();

        let (statements, parse_errors) = Parser::new(tokens).parse();
        assert!(
            parse_errors.is_empty(),
            "unexpected parse errors: {:?}",
            parse_errors
        );

        let mut interpreter = Interpreter::new();

        Resolver::new(&mut interpreter)
            .resolve(&statements)
            .iter()
            .map(|e| e.to_string())
            .collect()
    }

    fn assert_clean(source: &str) {
        let errors = resolve_errors(source);
        assert!(errors.is_empty(), "unexpected resolve errors: {:?}", errors);
    }

    fn assert_single_error(source: &str, fragment: &str) {
        let errors = resolve_errors(source);

        assert_eq!(errors.len(), 1, "errors: {:?}", errors);
        assert!(
            errors[0].contains(fragment),
            "expected {:?} in {:?}",
            fragment,
            errors[0]
        );
    }

    #[test]
    fn test_resolver_01_duplicate_declaration_in_local_scope() {
        assert_single_error(
            "{ var a = 1; var a = 2; }",
            "Already a variable with this name in this scope.",
        );
    }

    #[test]
    fn test_resolver_02_global_redeclaration_is_allowed() {
        assert_clean("var a = 1; var a = 2;");
    }

    #[test]
    fn test_resolver_03_reading_own_initializer() {
        assert_single_error(
            "{ var a = a; }",
            "Can't read local variable in its own initializer.",
        );
    }

    #[test]
    fn test_resolver_04_return_outside_function() {
        assert_single_error("return 1;", "Can't return from top-level code.");
    }

    #[test]
    fn test_resolver_05_return_value_from_initializer() {
        assert_single_error(
            "class P { init() { return 1; } }",
            "Can't return a value from an initializer.",
        );
    }

    #[test]
    fn test_resolver_06_bare_return_in_initializer_is_allowed() {
        assert_clean("class P { init() { return; } }");
    }

    #[test]
    fn test_resolver_07_break_outside_loop() {
        assert_single_error("break;", "Can't use 'break' outside of a loop.");
    }

    #[test]
    fn test_resolver_08_continue_outside_loop() {
        assert_single_error("continue;", "Can't use 'continue' outside of a loop.");
    }

    #[test]
    fn test_resolver_09_break_inside_nested_function_is_outside_loop() {
        // The function boundary resets the loop context: this `break`
        // could not unwind past the call frame.
        assert_single_error(
            "while (true) { fun f() { break; } f(); }",
            "Can't use 'break' outside of a loop.",
        );
    }

    #[test]
    fn test_resolver_10_break_and_continue_inside_loops_are_allowed() {
        assert_clean("while (true) { break; }");
        assert_clean("for (var i = 0; i < 10; i = i + 1) { continue; }");
    }

    #[test]
    fn test_resolver_11_this_outside_class() {
        assert_single_error("print this;", "Can't use 'this' outside of a class.");
    }

    #[test]
    fn test_resolver_12_this_inside_method_is_allowed() {
        assert_clean("class C { who() { return this; } }");
    }

    #[test]
    fn test_resolver_13_super_outside_class() {
        assert_single_error(
            "print super.name;",
            "Can't use 'super' outside of a class.",
        );
    }

    #[test]
    fn test_resolver_14_super_without_superclass() {
        assert_single_error(
            "class C { f() { return super.f; } }",
            "Can't use 'super' in a class with no superclass.",
        );
    }

    #[test]
    fn test_resolver_15_class_inheriting_from_itself() {
        assert_single_error("class C < C {}", "A class can't inherit from itself.");
    }

    #[test]
    fn test_resolver_16_errors_accumulate() {
        let errors = resolve_errors("break; continue; return 1;");

        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_resolver_17_closures_resolve_clean() {
        assert_clean(
            "fun makeCounter() { \
               var i = 0; \
               fun count() { i = i + 1; return i; } \
               return count; \
             } \
             var c = makeCounter();",
        );
    }

    #[test]
    fn test_resolver_18_inheritance_resolves_clean() {
        assert_clean(
            "class A { hello() { print \"A\"; } } \
             class B < A { hello() { super.hello(); print this; } }",
        );
    }
}
