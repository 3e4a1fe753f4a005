// tests/language_properties.rs
//
// Behaviour transform authors rely on, checked end to end.

use reshape_lang::{EvalContext, Evaluator, Value, compiler::compile};
use serde_json::json;

fn eval(text: &str, data: serde_json::Value) -> serde_json::Value {
    let evaluator = Evaluator::new();
    let expr = evaluator.compile(text).unwrap();
    evaluator
        .evaluate(&expr, &EvalContext::new(Value::from(data)))
        .unwrap()
        .to_json()
}

fn eval_err(text: &str) -> reshape_lang::Error {
    let evaluator = Evaluator::new();
    let expr = evaluator.compile(text).unwrap();
    evaluator
        .evaluate(&expr, &EvalContext::new(Value::Null))
        .unwrap_err()
}

// ============================================================================
// Precedence
// ============================================================================

#[test]
fn test_precedence_results() {
    assert_eq!(eval("2 + 3 * 4", json!(null)), json!(14));
    assert_eq!(eval("(2 + 3) * 4", json!(null)), json!(20));
    assert_eq!(eval("2 - 3 - 4", json!(null)), json!(-5));
}

#[test]
fn test_subtraction_groups_the_following_sum() {
    // 2 - (3 + 4)
    assert_eq!(eval("2 - 3 + 4", json!(null)), json!(-5));
    assert_eq!(eval("12 / 2 * 3", json!(null)), json!(2));
}

// ============================================================================
// Coercion
// ============================================================================

#[test]
fn test_numeric_comparison_of_strings() {
    assert_eq!(eval("10 > 9", json!(null)), json!(true));
    assert_eq!(eval("'10' > '9'", json!(null)), json!(true));
    assert_eq!(eval("'10' > 9", json!(null)), json!(true));
    assert_eq!(eval("'b' > 'a'", json!(null)), json!(true));
}

#[test]
fn test_boolean_plus_is_and() {
    assert_eq!(eval("true + false", json!(null)), json!(false));
    assert_eq!(eval("true + true", json!(null)), json!(true));
}

#[test]
fn test_boolean_minus_is_or() {
    assert_eq!(eval("true - false", json!(null)), json!(true));
    assert_eq!(eval("false - false", json!(null)), json!(false));
}

#[test]
fn test_string_minus_removes_first_occurrence() {
    assert_eq!(eval("'banana' - 'an'", json!(null)), json!("bana"));
    assert_eq!(eval("'banana' - 'x'", json!(null)), json!("banana"));
}

#[test]
fn test_numeric_strings_do_arithmetic() {
    assert_eq!(eval("'2' + '3'", json!(null)), json!(5));
    assert_eq!(eval("A * B", json!({"A": "1.5", "B": 4})), json!(6));
}

#[test]
fn test_string_false_is_falsy() {
    assert_eq!(eval("Flag ? 'on' : 'off'", json!({"Flag": "false"})), json!("off"));
    assert_eq!(eval("Flag ? 'on' : 'off'", json!({"Flag": "yes"})), json!("on"));
}

// ============================================================================
// Conditionals
// ============================================================================

#[test]
fn test_tertiary_results() {
    assert_eq!(eval("1 < 2 ? 'yes' : 'no'", json!(null)), json!("yes"));
    assert_eq!(eval("1 > 2 ? 'a' : 2 > 1 ? 'b' : 'c'", json!(null)), json!("b"));
}

#[test]
fn test_untaken_branch_is_not_evaluated() {
    assert_eq!(eval("true ? 1 : nosuchfunction()", json!(null)), json!(1));
}

// ============================================================================
// Paths and Indexers
// ============================================================================

#[test]
fn test_nested_path_flattening() {
    let data = json!({"Orders": [{"Items": [1, 2]}, {"Items": [3]}]});
    assert_eq!(eval("Orders.Items", data), json!([1, 2, 3]));
}

#[test]
fn test_positional_and_predicate_indexers() {
    let data = json!({"seq": [10, 20, 30]});
    assert_eq!(eval("seq[1]", data.clone()), json!(20));
    assert_eq!(eval("seq[@ > 15]", data.clone()), json!([20, 30]));
    assert_eq!(eval("seq[-1]", data), json!(30));
}

#[test]
fn test_indexer_after_flattened_path_sees_whole_array() {
    let data = json!({"Orders": [{"Items": [1, 2]}, {"Items": [3]}]});
    assert_eq!(eval("Orders.Items[2]", data), json!(3));
}

#[test]
fn test_null_propagates_through_paths() {
    assert_eq!(eval("A.B.C", json!({"A": null})), json!(null));
    assert_eq!(eval("A.B[0].C", json!({})), json!(null));
}

// ============================================================================
// Functions
// ============================================================================

#[test]
fn test_wrong_arity_is_a_syntax_error() {
    let err = eval_err("substring('abc')");
    assert!(err.is_syntax());
    assert!(err.to_string().contains("does not take 1 argument"));
}

#[test]
fn test_unknown_function_is_a_syntax_error() {
    let err = eval_err("nosuchfunction(1, 2)");
    assert!(err.is_syntax());
    assert!(err.to_string().contains("Unknown function 'nosuchfunction'"));
}

#[test]
fn test_compiling_never_resolves_functions() {
    assert!(compile("nosuchfunction(1, 2)").is_ok());
}

// ============================================================================
// Literals
// ============================================================================

#[test]
fn test_quote_escape_round_trip() {
    let expr = compile("'it''s'").unwrap();
    assert_eq!(eval("'it''s'", json!(null)), json!("it's"));
    assert_eq!(compile(&expr.to_string()).unwrap(), expr);

    let expr = compile(r"Path == 'C:\\new'").unwrap();
    assert_eq!(compile(&expr.to_string()).unwrap(), expr);
}

#[test]
fn test_backslash_literal_survives_quoted_predicate() {
    let data = json!({"Items": [{"Id": 1, "Path": "C:\\new"}, {"Id": 2, "Path": "D:"}]});
    assert_eq!(eval(r"Items[Path == 'C:\\new'].Id", data.clone()), json!([1]));
    assert_eq!(eval(r"where(Items, Path == 'C:\\new').Id", data), json!([1]));
}

#[test]
fn test_decimal_arithmetic_is_exact() {
    assert_eq!(eval("0.1 + 0.2", json!(null)), json!(0.3));
    assert_eq!(eval("1.10 * 3 == 3.3", json!(null)), json!(true));
}
