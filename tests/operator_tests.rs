// tests/operator_tests.rs

use pretty_assertions::assert_eq;
use serde_json::{Value as Json, json};
use sprig_lang::{Engine, EngineConfig, Value};

fn eval(source: &str) -> Json {
    eval_with(source, json!({}))
}

fn eval_with(source: &str, input: Json) -> Json {
    let engine = Engine::new();
    let input: Value = input.into();
    engine.evaluate(source, &input).unwrap().into()
}

// ============================================================================
// Exact arithmetic
// ============================================================================

#[test]
fn test_decimal_addition_has_no_drift() {
    assert_eq!(eval("0.1 + 0.2"), json!(0.3));
    assert_eq!(eval("0.1 + 0.2 == 0.3"), json!(true));
    assert_eq!(eval("9999999999999999 + 1"), json!(10000000000000000u64));
}

#[test]
fn test_repeating_quotients_convert_to_nearest_double() {
    assert_eq!(eval("1/3"), json!(1.0 / 3.0));
    assert_eq!(eval("2/3"), json!(2.0 / 3.0));
    assert_eq!(eval("1/7"), json!(1.0 / 7.0));
}

#[test]
fn test_decimal_arithmetic_on_input_numbers() {
    let input = json!({"price": 19.99, "qty": 3});
    assert_eq!(eval_with("$price * $qty", input), json!(59.97));
}

#[test]
fn test_native_mode_drifts() {
    let engine = Engine::with_config(EngineConfig {
        use_exact_decimal: false,
        ..EngineConfig::default()
    });
    let result: Json = engine.evaluate("0.1 + 0.2", &Value::Null).unwrap().into();
    assert_eq!(result, json!(0.1 + 0.2));
}

#[test]
fn test_numeric_strings_are_numbers() {
    assert_eq!(eval("'2' * 3"), json!(6));
    assert_eq!(eval("'10' == 10"), json!(true));
}

#[test]
fn test_non_numeric_operands_are_undefined() {
    let engine = Engine::new();
    for source in ["'a' - 1", "'a' * 2", "[1] % 2", "'x' ^ 2"] {
        let result = engine.evaluate(source, &Value::Null).unwrap();
        assert_eq!(result, Value::Undefined, "{}", source);
    }
}

#[test]
fn test_divide_fallback_joins_operands() {
    assert_eq!(eval("'left' / 'right'"), json!("left/right"));
    assert_eq!(eval("6 / 4"), json!(1.5));
}

#[test]
fn test_add_with_undefined_is_identity() {
    assert_eq!(eval("$missing + 5"), json!(5));
    assert_eq!(eval("5 + $missing"), json!(5));
}

#[test]
fn test_power_is_right_associative() {
    assert_eq!(eval("2 ^ 3 ^ 2"), json!(512));
}

#[test]
fn test_unary_minus() {
    assert_eq!(eval_with("-$n + 1", json!({"n": 3})), json!(-2));
    assert_eq!(eval("5 -1"), json!(4));
}

// ============================================================================
// Comparison
// ============================================================================

#[test]
fn test_structural_equality() {
    assert_eq!(eval("[1 2 {'a': 3}] == [1 2 {'a': 3}]"), json!(true));
    assert_eq!(eval("[1 2] == [2 1]"), json!(false));
    assert_eq!(eval("null == undefined"), json!(true));
    assert_eq!(eval("'a' != 'b'"), json!(true));
}

#[test]
fn test_ordering() {
    assert_eq!(eval("'10' > 9"), json!(true));
    assert_eq!(eval("'apple' < 'banana'"), json!(true));
    assert_eq!(eval("2 <= 2"), json!(true));
}

#[test]
fn test_three_way_compare() {
    assert_eq!(eval("1 <=> 2"), json!(-1));
    assert_eq!(eval("2 <=> 2"), json!(0));
    assert_eq!(eval("'b' <=> 'a'"), json!(1));
    assert_eq!(eval("true <=> false"), json!(0));
}

#[test]
fn test_regex_match() {
    assert_eq!(eval("'Hello' =~ /^h/i"), json!(true));
    assert_eq!(eval("'Hello' =~ /^h/"), json!(false));
}

// ============================================================================
// Logic
// ============================================================================

#[test]
fn test_logic_returns_operands() {
    assert_eq!(eval("0 || 'fallback'"), json!("fallback"));
    assert_eq!(eval("'a' && 'b'"), json!("b"));
    assert_eq!(eval("!''"), json!(true));
    assert_eq!(eval("![]"), json!(false));
}

// ============================================================================
// Structure
// ============================================================================

#[test]
fn test_concat() {
    assert_eq!(eval("'a' & 1 & true"), json!("a1true"));
    assert_eq!(eval("[1 2] & [3] & 4"), json!([1, 2, 3, 4]));
    assert_eq!(eval("{'a': 1} & {'b': 2}"), json!({"a": 1, "b": 2}));
    assert_eq!(eval("$missing & 'x'"), json!("x"));
    assert_eq!(eval("null & 'a'"), json!("nulla"));
}

#[test]
fn test_object_construction() {
    assert_eq!(eval("{'a': 1}"), json!({"a": 1}));
    assert_eq!(eval("{'a': 1, 'b': 2, 'a': 3}"), json!({"a": 3, "b": 2}));
    assert_eq!(eval("'k' : 'v'"), json!(["k", "v"]));
}

#[test]
fn test_range() {
    assert_eq!(eval("1..4"), json!([1, 2, 3, 4]));
    assert_eq!(eval("3..1"), json!([3, 2, 1]));
    assert_eq!(eval("'a'..3"), json!([]));
}

#[test]
fn test_grouping_and_index() {
    assert_eq!(eval("(1 + 2) * 3"), json!(9));
    assert_eq!(eval("([10 20 30])[1]"), json!(20));
}
