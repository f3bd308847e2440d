//! Property-based tests for the whole pipeline.
//!
//! Case counts are kept small; every case runs the scanner, parser,
//! resolver and interpreter end to end.

use proptest::prelude::*;
use rox::error::LoxError;
use rox::interpreter::Interpreter;
use rox::parser::Parser;
use rox::scanner::tokenize;
use rox::value::Value;

/// Lex, parse and evaluate a lone expression, returning it as a number.
fn eval_number(source: &str) -> Result<f64, LoxError> {
    let tokens = tokenize(source)?;
    let expr = Parser::new(&tokens).parse_expression()?;
    let mut interpreter = Interpreter::new();

    match interpreter.evaluate_expression(&expr)? {
        Value::Number(n) => Ok(n),
        other => panic!("expected a number from {:?}, got {:?}", source, other),
    }
}

// ============================================================================
// Strategies
// ============================================================================

/// Number literals as the scanner accepts them: digits, optionally followed
/// by a dot and more digits.
fn arb_number_literal() -> impl Strategy<Value = String> {
    prop_oneof![
        (0u64..1_000_000).prop_map(|n| n.to_string()),
        (0u64..100_000, 0u32..100_000).prop_map(|(i, f)| format!("{}.{}", i, f)),
    ]
}

/// Finite operands; `Display` for `f64` never uses exponent notation, so the
/// rendered text is always a valid literal (with a leading unary minus).
fn arb_operand() -> impl Strategy<Value = f64> {
    -1.0e6f64..1.0e6f64
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// A number literal evaluates to exactly the value it spells.
    #[test]
    fn number_literal_round_trips(literal in arb_number_literal()) {
        let expected: f64 = literal.parse().unwrap();

        prop_assert_eq!(eval_number(&literal).unwrap(), expected);
    }

    /// `a + b` agrees with host addition.
    #[test]
    fn addition_matches_host(a in arb_operand(), b in arb_operand()) {
        let source = format!("{} + {}", a, b);

        prop_assert_eq!(eval_number(&source).unwrap(), a + b);
    }

    /// Dividing by zero is always a runtime error, never a value.
    #[test]
    fn division_by_zero_always_fails(a in arb_operand()) {
        let source = format!("{} / 0", a);
        let result = eval_number(&source);

        prop_assert!(
            matches!(result, Err(LoxError::Runtime { .. })),
            "expected a runtime error for {}, got {:?}",
            source,
            result
        );
    }

    /// Calling with the wrong number of arguments always reports both counts.
    #[test]
    fn arity_mismatch_reports_both_counts(params in 0usize..6, args in 0usize..6) {
        prop_assume!(params != args);

        let param_list: Vec<String> = (0..params).map(|i| format!("p{}", i)).collect();
        let arg_list: Vec<String> = (0..args).map(|i| i.to_string()).collect();
        let source = format!(
            "fun f({}) {{}} f({});",
            param_list.join(", "),
            arg_list.join(", ")
        );

        let mut out: Vec<u8> = Vec::new();
        let err = rox::run(&source, &mut out).unwrap_err();

        prop_assert_eq!(
            err.message(),
            format!("Expected {} arguments but got {}.", params, args)
        );
    }
}
