#[cfg(test)]
mod parser_tests {
    use rlox as lox;

    use lox::ast_printer::AstPrinter;
    use lox::error::LoxError;
    use lox::parser::Parser;
    use lox::scanner::Scanner;
    use lox::stmt::Stmt;
    use lox::token::Token;

    fn parse(source: &str) -> (Vec<Stmt>, Vec<LoxError>) {
        let tokens: Vec<Token> = Scanner::new(source).filter_map(Result::ok).collect();

        Parser::new(tokens).parse()
    }

    /// Parse a single expression statement and render it in prefix form.
    fn parse_expr(source: &str) -> String {
        let (statements, errors) = parse(source);

        assert!(errors.is_empty(), "unexpected parse errors: {:?}", errors);
        assert_eq!(statements.len(), 1);

        match &statements[0] {
            Stmt::Expression(expr) => AstPrinter::print(expr),
            other => panic!("expected expression statement, got {:?}", other),
        }
    }

    #[test]
    fn test_parser_01_precedence() {
        assert_eq!(parse_expr("1 + 2 * 3;"), "(+ 1.0 (* 2.0 3.0))");
        assert_eq!(parse_expr("(1 + 2) * 3;"), "(* (group (+ 1.0 2.0)) 3.0)");
        assert_eq!(parse_expr("1 < 2 == true;"), "(== (< 1.0 2.0) true)");
        assert_eq!(parse_expr("-1 * 2;"), "(* (- 1.0) 2.0)");
    }

    #[test]
    fn test_parser_02_logical_binds_looser_than_equality() {
        assert_eq!(
            parse_expr("a == b or c and d;"),
            "(or (== a b) (and c d))"
        );
    }

    #[test]
    fn test_parser_03_ternary_right_associative() {
        assert_eq!(
            parse_expr("a ? b : c ? d : e;"),
            "(?: a b (?: c d e))"
        );
    }

    #[test]
    fn test_parser_04_assignment_targets() {
        assert_eq!(parse_expr("x = 1;"), "(= x 1.0)");
        assert_eq!(parse_expr("o.f = 1;"), "(set o f 1.0)");
        assert_eq!(parse_expr("o.f.g;"), "(get (get o f) g)");
    }

    #[test]
    fn test_parser_05_invalid_assignment_target_reported_not_fatal() {
        let (statements, errors) = parse("1 = 2; print 3;");

        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("Invalid assignment target."));

        // Parsing carried on: both statements are present.
        assert_eq!(statements.len(), 2);
    }

    #[test]
    fn test_parser_06_call_chains() {
        assert_eq!(
            parse_expr("f(1)(2).g(3);"),
            "(call (get (call (call f 1.0) 2.0) g) 3.0)"
        );
    }

    #[test]
    fn test_parser_07_for_desugars_to_while() {
        let (statements, errors) = parse("for (var i = 0; i < 3; i = i + 1) print i;");

        assert!(errors.is_empty());
        assert_eq!(statements.len(), 1);

        let inner = match &statements[0] {
            Stmt::Block(inner) => inner,
            other => panic!("expected block, got {:?}", other),
        };

        assert!(matches!(inner[0], Stmt::Var { .. }));
        assert!(matches!(
            inner[1],
            Stmt::While {
                increment: Some(_),
                ..
            }
        ));
    }

    #[test]
    fn test_parser_08_for_without_condition_loops_on_true() {
        let (statements, errors) = parse("for (;;) break;");

        assert!(errors.is_empty());

        match &statements[0] {
            Stmt::While {
                condition,
                increment,
                ..
            } => {
                assert_eq!(AstPrinter::print(condition), "true");
                assert!(increment.is_none());
            }
            other => panic!("expected while, got {:?}", other),
        }
    }

    #[test]
    fn test_parser_09_synchronizes_after_error() {
        let (statements, errors) = parse("var 1 = 2; print 3;");

        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("Expect a variable name."));

        // The statement after the bad declaration still parses.
        assert_eq!(statements.len(), 1);
        assert!(matches!(statements[0], Stmt::Print(_)));
    }

    #[test]
    fn test_parser_10_class_declaration() {
        let (statements, errors) = parse("class B < A { init(x) { this.x = x; } hello() {} }");

        assert!(errors.is_empty());

        match &statements[0] {
            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                assert_eq!(name.lexeme, "B");
                assert!(superclass.is_some());
                assert_eq!(methods.len(), 2);
                assert_eq!(methods[0].name.lexeme, "init");
                assert_eq!(methods[0].params.len(), 1);
            }
            other => panic!("expected class, got {:?}", other),
        }
    }

    #[test]
    fn test_parser_11_super_and_this_expressions() {
        assert_eq!(parse_expr("this;"), "this");
        assert_eq!(parse_expr("super.hello;"), "(super hello)");
    }

    #[test]
    fn test_parser_12_missing_semicolon_is_an_error() {
        let (_, errors) = parse("print 1");

        assert_eq!(errors.len(), 1);
        assert!(errors[0]
            .to_string()
            .contains("Expect ';' after expression."));
    }
}
