#[cfg(test)]
mod parser_tests {
    use rox::ast::{Expr, Stmt};
    use rox::ast_printer::AstPrinter;
    use rox::error::LoxError;
    use rox::parser::Parser;
    use rox::scanner::tokenize;

    fn print_expression(source: &str) -> String {
        let tokens = tokenize(source).unwrap();
        let expr = Parser::new(&tokens).parse_expression().unwrap();

        AstPrinter::print(&expr)
    }

    fn print_program(source: &str) -> Vec<String> {
        let tokens = tokenize(source).unwrap();
        let statements = Parser::new(&tokens).parse().unwrap();

        statements.iter().map(AstPrinter::print_stmt).collect()
    }

    fn program_error(source: &str) -> LoxError {
        let tokens = tokenize(source).unwrap();
        Parser::new(&tokens).parse().unwrap_err()
    }

    #[test]
    fn test_parser_01_arithmetic_precedence() {
        assert_eq!(
            print_expression("1 + 2 * 3 - 4"),
            "(- (+ 1.0 (* 2.0 3.0)) 4.0)"
        );
    }

    #[test]
    fn test_parser_02_comparison_below_equality() {
        assert_eq!(
            print_expression("1 > 2 != 2 > 3"),
            "(!= (> 1.0 2.0) (> 2.0 3.0))"
        );
    }

    #[test]
    fn test_parser_03_unary_and_grouping() {
        assert_eq!(print_expression("-(1.5) == !true"), "(== (- (group 1.5)) (! true))");
    }

    #[test]
    fn test_parser_04_logical_operators() {
        assert_eq!(
            print_expression("a or b and c"),
            "(or a (and b c))"
        );
    }

    #[test]
    fn test_parser_05_comma_and_conditional() {
        assert_eq!(print_expression("1, 2, 3"), "(begin 1.0 2.0 3.0)");
        assert_eq!(
            print_expression("a ? b : c ? d : e"),
            "(if a b (if c d e))"
        );
    }

    #[test]
    fn test_parser_06_assignment_is_right_associative() {
        assert_eq!(print_expression("a = b = 1"), "(= a (= b 1.0))");
        assert_eq!(print_expression("obj.field = 2"), "(= (. obj field) 2.0)");
    }

    #[test]
    fn test_parser_07_calls_and_properties() {
        assert_eq!(
            print_expression("f(1, g(2))(3).x"),
            "(. (call (call f 1.0 (call g 2.0)) 3.0) x)"
        );
    }

    #[test]
    fn test_parser_08_lambda_expression() {
        assert_eq!(
            print_expression("fun (a, b) { return a; }"),
            "(fun (a b) (return a))"
        );
    }

    #[test]
    fn test_parser_09_statements() {
        assert_eq!(
            print_program("var a = 1; var b; print a; { a; }"),
            vec!["(define a 1.0)", "(define b)", "(print a)", "(block a)"]
        );
    }

    #[test]
    fn test_parser_10_for_desugars_to_while() {
        assert_eq!(
            print_program("for (var i = 0; i < 3; i = i + 1) print i;"),
            vec!["(block (define i 0.0) (while (< i 3.0) (block (print i) (= i (+ i 1.0)))))"]
        );

        assert_eq!(print_program("for (;;) print 1;"), vec!["(while true (print 1.0))"]);
    }

    #[test]
    fn test_parser_11_class_declaration() {
        let printed = print_program(
            "class B < A { init(x) { this.x = x; } get() { return super.get(); } }",
        );

        assert_eq!(
            printed,
            vec![
                "(class B < A (method init (x) (= (. this x) x)) (method get () (return (call (super get)))))"
            ]
        );
    }

    #[test]
    fn test_parser_12_if_else_and_return() {
        assert_eq!(
            print_program("fun f(n) { if (n) return 1; else return; }"),
            vec!["(fun f (n) (if n (return 1.0) (return)))"]
        );
    }

    #[test]
    fn test_parser_13_reference_ids_are_unique() {
        let tokens = tokenize("a = a + b;").unwrap();
        let statements = Parser::new(&tokens).parse().unwrap();

        let Stmt::Expression(Expr::Assign { id, value, .. }) = &statements[0] else {
            panic!("expected an assignment statement");
        };
        let Expr::Binary { left, right, .. } = value.as_ref() else {
            panic!("expected a binary right-hand side");
        };
        let (Expr::Variable { id: left_id, .. }, Expr::Variable { id: right_id, .. }) =
            (left.as_ref(), right.as_ref())
        else {
            panic!("expected variable operands");
        };

        assert_ne!(id, left_id);
        assert_ne!(id, right_id);
        assert_ne!(left_id, right_id);
    }

    #[test]
    fn test_parser_14_missing_semicolon_names_found_token() {
        let err = program_error("print 1 print 2;");

        assert!(matches!(err, LoxError::Parse { line: 1, .. }));
        assert_eq!(err.message(), "Expect ';' after value, found 'print'.");
    }

    #[test]
    fn test_parser_15_unexpected_end_of_input() {
        let err = program_error("var a = (1 + 2");

        assert_eq!(err.message(), "Expect ')' after expression, found end of input.");
    }

    #[test]
    fn test_parser_16_invalid_assignment_target() {
        let err = program_error("\n1 + 2 = 3;");

        assert_eq!(err.message(), "Invalid assignment target.");
        assert_eq!(err.line(), Some(2));
        assert_eq!(err.to_string(), "[line 2] Error: Invalid assignment target.");
    }

    #[test]
    fn test_parser_17_expect_expression() {
        let err = program_error("print ;");

        assert_eq!(err.message(), "Expect expression, found ';'.");
    }

    #[test]
    fn test_parser_18_argument_limit() {
        let args: Vec<String> = (0..256).map(|i| i.to_string()).collect();
        let source = format!("f({});", args.join(", "));

        let err = program_error(&source);

        assert_eq!(err.message(), "Can't have more than 255 arguments.");

        let ok: Vec<String> = (0..255).map(|i| i.to_string()).collect();
        assert_eq!(print_program(&format!("f({});", ok.join(", "))).len(), 1);
    }

    #[test]
    fn test_parser_19_parameter_limit() {
        let params: Vec<String> = (0..256).map(|i| format!("p{}", i)).collect();
        let source = format!("fun f({}) {{}}", params.join(", "));

        let err = program_error(&source);

        assert_eq!(err.message(), "Can't have more than 255 parameters.");
    }

    #[test]
    fn test_parser_20_super_requires_dot() {
        let err = program_error("super;");

        assert_eq!(err.message(), "Expect '.' after 'super', found ';'.");
    }

    #[test]
    fn test_parser_21_trailing_tokens_after_expression() {
        let tokens = tokenize("1 2").unwrap();
        let err = Parser::new(&tokens).parse_expression().unwrap_err();

        assert_eq!(err.message(), "Expect end of expression, found '2'.");
    }
}
