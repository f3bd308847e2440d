#[cfg(test)]
mod interpreter_tests {
    use rox::error::LoxError;

    /// Run a program, returning whatever it printed before finishing or
    /// failing.
    fn run_capturing(source: &str) -> (String, Option<LoxError>) {
        let mut out: Vec<u8> = Vec::new();
        let result = rox::run(source, &mut out);

        (String::from_utf8(out).unwrap(), result.err())
    }

    fn run_ok(source: &str) -> String {
        match run_capturing(source) {
            (output, None) => output,
            (_, Some(e)) => panic!("program failed: {}", e),
        }
    }

    fn runtime_error(source: &str) -> LoxError {
        let (_, err) = run_capturing(source);
        let err = err.expect("expected the program to fail");

        assert!(
            matches!(err, LoxError::Runtime { .. }),
            "expected a runtime error, got {:?}",
            err
        );
        err
    }

    #[test]
    fn test_interpreter_01_print_forms() {
        assert_eq!(
            run_ok("print 3; print 2.5; print \"str\"; print nil; print true; print -0.5;"),
            "3\n2.5\nstr\nnil\ntrue\n-0.5\n"
        );
    }

    #[test]
    fn test_interpreter_02_arithmetic_and_concatenation() {
        assert_eq!(
            run_ok("print 1 + 2 * 3 - 4; print (1 + 2) * 3; print 7 / 2; print \"a\" + \"b\";"),
            "3\n9\n3.5\nab\n"
        );
    }

    #[test]
    fn test_interpreter_03_comparison_and_equality() {
        assert_eq!(
            run_ok(
                "print 1 < 2; print 2 <= 1; print 1 == \"1\"; print nil == false; \
                 print nil == nil; print \"x\" != \"y\"; print 3 >= 3;"
            ),
            "true\nfalse\nfalse\nfalse\ntrue\ntrue\ntrue\n"
        );
    }

    #[test]
    fn test_interpreter_04_truthiness() {
        assert_eq!(
            run_ok(
                "if (0) print \"zero\"; if (\"\") print \"empty\"; \
                 if (nil) print \"bad\"; else print \"nil is falsy\"; print !nil;"
            ),
            "zero\nempty\nnil is falsy\ntrue\n"
        );
    }

    #[test]
    fn test_interpreter_05_logical_short_circuit() {
        // the right operands would fail if evaluated
        assert_eq!(
            run_ok("print nil or \"x\"; print false and missing; print 1 or missing;"),
            "x\nfalse\n1\n"
        );
    }

    #[test]
    fn test_interpreter_06_comma_and_conditional() {
        assert_eq!(
            run_ok("var a = 0; print (a = 1, a + 1); print a > 0 ? \"pos\" : missing;"),
            "2\npos\n"
        );
    }

    #[test]
    fn test_interpreter_07_block_scoping() {
        assert_eq!(run_ok("{ var a = 1; { var a = 2; } print a; }"), "1\n");
        assert_eq!(
            run_ok("var a = \"global\"; { var a = \"local\"; print a; } print a;"),
            "local\nglobal\n"
        );
    }

    #[test]
    fn test_interpreter_08_closure_shares_captured_frame() {
        let source = "
            fun make() {
                var x = 0;
                fun inc() { x = x + 1; return x; }
                return inc;
            }
            var f = make();
            print f();
            print f();
            var g = make();
            print g();
        ";

        assert_eq!(run_ok(source), "1\n2\n1\n");
    }

    #[test]
    fn test_interpreter_09_closure_binds_at_declaration() {
        let source = "
            var a = \"global\";
            {
                fun show() { print a; }
                show();
                var a = \"block\";
                show();
                print a;
            }
        ";

        assert_eq!(run_ok(source), "global\nglobal\nblock\n");
    }

    #[test]
    fn test_interpreter_10_recursion_and_loops() {
        let source = "
            fun fib(n) { if (n < 2) return n; return fib(n - 1) + fib(n - 2); }
            print fib(15);
            for (var i = 0; i < 3; i = i + 1) print i;
            var n = 0;
            while (n < 2) n = n + 1;
            print n;
        ";

        assert_eq!(run_ok(source), "610\n0\n1\n2\n2\n");
    }

    #[test]
    fn test_interpreter_11_return_unwinds_loops() {
        let source = "
            fun first_over(limit) {
                var i = 0;
                while (true) {
                    i = i + 1;
                    if (i > limit) return i;
                }
            }
            print first_over(3);
            fun nothing() { return; }
            print nothing();
            fun implicit() {}
            print implicit();
        ";

        assert_eq!(run_ok(source), "4\nnil\nnil\n");
    }

    #[test]
    fn test_interpreter_12_lambdas() {
        let source = "
            fun twice(f, x) { return f(f(x)); }
            print twice(fun (n) { return n * 2; }, 5);
            var anon = fun () {};
            print anon;
        ";

        assert_eq!(run_ok(source), "20\n<fn>\n");
    }

    #[test]
    fn test_interpreter_13_callable_display() {
        assert_eq!(
            run_ok("fun f() {} class C {} print f; print clock; print C; print C();"),
            "<fn f>\n<native fn clock>\nC\nC instance\n"
        );
    }

    #[test]
    fn test_interpreter_14_clock() {
        assert_eq!(run_ok("print clock() > 0;"), "true\n");
    }

    #[test]
    fn test_interpreter_15_classes_fields_and_methods() {
        let source = "
            class Counter {
                init(start) { this.count = start; }
                bump() { this.count = this.count + 1; return this; }
            }
            var c = Counter(10);
            c.bump().bump();
            print c.count;
            var bump = c.bump;
            bump();
            print c.count;
            c.label = \"fresh\";
            print c.label;
        ";

        assert_eq!(run_ok(source), "12\n13\nfresh\n");
    }

    #[test]
    fn test_interpreter_16_fields_shadow_methods() {
        let source = "
            class A { m() { return \"method\"; } }
            var a = A();
            a.m = \"field\";
            print a.m;
        ";

        assert_eq!(run_ok(source), "field\n");
    }

    #[test]
    fn test_interpreter_17_inheritance_and_override() {
        let source = "
            class A { m() { return \"A.m\"; } n() { return \"A.n\"; } }
            class B < A { n() { return \"B.n\"; } }
            var b = B();
            print b.m();
            print b.n();
        ";

        assert_eq!(run_ok(source), "A.m\nB.n\n");
    }

    #[test]
    fn test_interpreter_18_super_calls() {
        let source = "
            class A { say() { return \"A\"; } }
            class B < A { say() { return \"B\" + super.say(); } }
            class C < B { say() { return \"C\" + super.say(); } }
            print C().say();
        ";

        assert_eq!(run_ok(source), "CBA\n");
    }

    #[test]
    fn test_interpreter_19_initializers() {
        let source = "
            class A { init(x) { this.x = x; } }
            class B < A {}
            print B(7).x;
            class E { init() { this.v = 1; return; } }
            var e = E();
            print e.init() == e;
            print e.v;
        ";

        assert_eq!(run_ok(source), "7\ntrue\n1\n");
    }

    #[test]
    fn test_interpreter_20_identity_equality() {
        let source = "
            class A {}
            var a = A();
            var b = A();
            fun f() {}
            print a == a;
            print a == b;
            print f == f;
            print A == A;
        ";

        assert_eq!(run_ok(source), "true\nfalse\ntrue\ntrue\n");
    }

    #[test]
    fn test_interpreter_21_lazy_globals() {
        assert_eq!(
            run_ok("fun f() { return later; } var later = 5; print f();"),
            "5\n"
        );
    }

    #[test]
    fn test_interpreter_22_operand_type_errors() {
        let err = runtime_error("print 1 + \"a\";");
        assert_eq!(
            err.message(),
            "Operands must be two numbers or two strings, got number and string."
        );

        let err = runtime_error("print 1 < nil;");
        assert_eq!(err.message(), "Operands must be numbers, got number and nil.");

        let err = runtime_error("print -\"no\";");
        assert_eq!(err.message(), "Operand must be a number, got string.");

        let err = runtime_error("print true * 2;");
        assert_eq!(err.message(), "Operands must be numbers, got boolean and number.");
    }

    #[test]
    fn test_interpreter_23_division_by_zero() {
        let err = runtime_error("\n\nprint 1 / 0;");

        assert_eq!(err.message(), "Division by zero.");
        assert_eq!(err.to_string(), "Division by zero.\n[line 3]");
        assert_eq!(err.exit_code(), 70);
    }

    #[test]
    fn test_interpreter_24_undefined_names() {
        let err = runtime_error("print nope;");
        assert_eq!(err.message(), "Undefined variable 'nope'.");

        let err = runtime_error("nope = 1;");
        assert_eq!(err.message(), "Undefined variable 'nope'.");
    }

    #[test]
    fn test_interpreter_25_call_errors() {
        let err = runtime_error("\"str\"();");
        assert_eq!(err.message(), "Can only call functions and classes.");

        let err = runtime_error("fun add(a, b) { return a + b; } add(1);");
        assert_eq!(err.message(), "Expected 2 arguments but got 1.");

        let err = runtime_error("fun add(a, b) { return a + b; } add(1, 2, 3);");
        assert_eq!(err.message(), "Expected 2 arguments but got 3.");

        let err = runtime_error("class P { init(x) { this.x = x; } } P();");
        assert_eq!(err.message(), "Expected 1 arguments but got 0.");

        let err = runtime_error("clock(1);");
        assert_eq!(err.message(), "Expected 0 arguments but got 1.");
    }

    #[test]
    fn test_interpreter_25b_arguments_evaluate_before_call_checks() {
        // an argument failure wins over a non-callable callee
        let err = runtime_error("nil(undefinedThing);");
        assert_eq!(err.message(), "Undefined variable 'undefinedThing'.");

        // and over an arity mismatch; argument side effects happen first
        let (output, err) = run_capturing(
            "fun one(a) { return a; } fun noisy() { print \"arg\"; return 1; } one(noisy(), noisy());",
        );
        assert_eq!(output, "arg\narg\n");
        assert_eq!(err.unwrap().message(), "Expected 1 arguments but got 2.");
    }

    #[test]
    fn test_interpreter_26_property_errors() {
        let err = runtime_error("var x = 1; print x.y;");
        assert_eq!(err.message(), "Only instances have properties.");

        let err = runtime_error("var x = \"s\"; x.y = 2;");
        assert_eq!(err.message(), "Only instances have properties.");

        let err = runtime_error("class A {} print A().missing;");
        assert_eq!(err.message(), "Undefined property 'missing'.");
    }

    #[test]
    fn test_interpreter_27_superclass_must_be_a_class() {
        let err = runtime_error("var NotClass = \"x\";\nclass A < NotClass {}");

        assert_eq!(err.message(), "Superclass must be a class.");
        assert_eq!(err.line(), Some(2));
    }

    #[test]
    fn test_interpreter_28_output_before_error_is_kept() {
        let (output, err) = run_capturing("print \"before\"; print nil + 1; print \"after\";");

        assert_eq!(output, "before\n");
        assert!(matches!(err, Some(LoxError::Runtime { line: 1, .. })));
    }

    #[test]
    fn test_interpreter_29_static_errors_prevent_execution() {
        let (output, err) = run_capturing("print \"never\"; { var a = a; }");

        assert_eq!(output, "");
        let err = err.unwrap();
        assert!(matches!(err, LoxError::Resolve { .. }));
        assert_eq!(err.exit_code(), 65);
    }

    #[test]
    fn test_interpreter_30_evaluate_expression() {
        assert_eq!(rox::evaluate("1 + 2").unwrap(), "3");
        assert_eq!(rox::evaluate("\"a\" + \"b\"").unwrap(), "ab");
        assert_eq!(rox::evaluate("!(1 == 1)").unwrap(), "false");
        assert_eq!(rox::evaluate("10 / 4").unwrap(), "2.5");

        let err = rox::evaluate("1 / 0").unwrap_err();
        assert!(matches!(err, LoxError::Runtime { .. }));
    }

    #[test]
    fn test_check_reports_without_running() {
        assert!(rox::check("print 1;").is_ok());
        assert!(matches!(
            rox::check("return 1;"),
            Err(LoxError::Resolve { .. })
        ));
    }
}
