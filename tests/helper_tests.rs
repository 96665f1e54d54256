// tests/helper_tests.rs

use pretty_assertions::assert_eq;
use serde_json::{Value as Json, json};
use sprig_lang::{Engine, Error, HelperDef, TypeTag, Value};

fn eval_with(engine: &Engine, source: &str, input: Json) -> Json {
    let input: Value = input.into();
    engine.evaluate(source, &input).unwrap().into()
}

fn eval(source: &str, input: Json) -> Json {
    eval_with(&Engine::new(), source, input)
}

fn counting_engine() -> Engine {
    let mut engine = Engine::new();
    engine.register_helper(
        HelperDef::new("count")
            .on(TypeTag::Array, |_, args| {
                Ok(Value::from(args[0].as_array().map_or(0, |items| items.len())))
            })
            .coerce(&[TypeTag::Array])
            .meta("count( $list )", "Number of items", "Counts the items in a list."),
    );
    engine
}

// ============================================================================
// Dispatch
// ============================================================================

#[test]
fn test_undefined_is_coerced_to_empty_array() {
    let engine = counting_engine();
    assert_eq!(eval_with(&engine, "count(undefined)", json!({})), json!(0));
    assert_eq!(eval_with(&engine, "count($missing)", json!({})), json!(0));
    assert_eq!(eval_with(&engine, "count($list)", json!({"list": [1, 2, 3]})), json!(3));
}

#[test]
fn test_scalar_is_coerced_to_one_item_array() {
    let engine = counting_engine();
    assert_eq!(eval_with(&engine, "count('x')", json!({})), json!(1));
}

#[test]
fn test_unknown_helper_is_a_dispatch_error() {
    let engine = Engine::new();
    let err = engine.evaluate("nosuch(1)", &Value::Null).unwrap_err();
    assert!(err.is_dispatch());
    assert_eq!(err, Error::UnknownHelper { name: "nosuch".to_string() });
}

#[test]
fn test_no_overload_names_helper_and_type() {
    let engine = Engine::new();
    let err = engine.evaluate("pairs(5)", &Value::Null).unwrap_err();
    assert_eq!(
        err,
        Error::NoOverload {
            helper: "pairs".to_string(),
            found: TypeTag::Number,
        }
    );
    assert_eq!(
        err.to_string(),
        "Unable to call 'pairs()' helper with type 'number' for first argument"
    );
}

#[test]
fn test_specific_overload_beats_wildcard() {
    let mut engine = Engine::new();
    engine.register_helper(
        HelperDef::new("kind")
            .on(TypeTag::String, |_, _| Ok(Value::from("text")))
            .any(|_, _| Ok(Value::from("other")))
            .meta("kind( $x )", "A label", "Labels strings."),
    );
    assert_eq!(eval_with(&engine, "kind('a')", json!({})), json!("text"));
    assert_eq!(eval_with(&engine, "kind(1)", json!({})), json!("other"));
    assert_eq!(eval_with(&engine, "kind([])", json!({})), json!("other"));
}

#[test]
fn test_decimals_are_demoted_for_plain_helpers() {
    let mut engine = Engine::new();
    engine.register_helper(
        HelperDef::new("is_exact")
            .any(|_, args| {
                let exact = matches!(&args[0], Value::Number(n) if n.is_exact());
                Ok(Value::Boolean(exact))
            })
            .meta("is_exact( $n )", "Whether the number is exact", ""),
    );
    assert_eq!(eval_with(&engine, "is_exact(0.5)", json!({})), json!(false));
}

#[test]
fn test_link_renames_helper() {
    let mut engine = Engine::new();
    assert!(engine.helpers_mut().link("lower", "lc"));
    assert_eq!(eval_with(&engine, "lower('ABC')", json!({})), json!("abc"));
}

#[test]
fn test_metadata_covers_builtins() {
    let engine = Engine::new();
    let metadata = engine.helper_metadata();
    for name in ["?", "map", "reduce", "grep", "sort", "sort_by", "group", "derive", "chain", "union"] {
        let meta = metadata.get(name).unwrap_or_else(|| panic!("no metadata for {}", name));
        assert!(!meta.syntax.is_empty());
    }
    assert_eq!(metadata["∪"], metadata["union"]);
}

// ============================================================================
// Conditional
// ============================================================================

#[test]
fn test_conditional_is_lazy() {
    assert_eq!(eval("?(true, 1, nosuch(2))", json!({})), json!(1));
    assert_eq!(eval("?(false, nosuch(2), 'no')", json!({})), json!("no"));
}

#[test]
fn test_conditional_evaluates_selected_branch() {
    let engine = Engine::new();
    let err = engine.evaluate("?(false, 1, nosuch(2))", &Value::Null).unwrap_err();
    assert!(err.is_dispatch());
    assert_eq!(eval("?($missing 'yes')", json!({})), Json::Null);
}

// ============================================================================
// Higher-order helpers
// ============================================================================

#[test]
fn test_map_with_expression_template() {
    let input = json!({"items": [1, 2, 3]});
    assert_eq!(eval("map($items '(: $item * 2 :)')", input), json!([2, 4, 6]));
}

#[test]
fn test_map_iteration_context() {
    let input = json!({"items": ["a", "b"], "sep": "-"});
    let result = eval("map($items '(: $index & $extra & $item & length($all) :)' $sep)", input);
    assert_eq!(result, json!(["0-a2", "1-b2"]));
}

#[test]
fn test_map_over_object_uses_key_order() {
    let input = json!({"prices": {"b": 2, "a": 1}});
    assert_eq!(eval("map($prices '(: $index :)')", input), json!(["a", "b"]));
}

#[test]
fn test_reduce_with_memo() {
    let input = json!({"items": [1, 2, 3, 4]});
    assert_eq!(eval("reduce($items '(: $memo + $item :)' 0)", input), json!(10));
}

#[test]
fn test_grep_default_keeps_non_empty() {
    let input = json!({"items": ["a", "", null, "b"]});
    assert_eq!(eval("grep($items)", input), json!(["a", "b"]));
}

#[test]
fn test_grep_with_value_transform() {
    let input = json!({"items": [1, 5, 10]});
    let result = eval("grep($items '(: $item > 2 :)' '(: $item * 10 :)')", input);
    assert_eq!(result, json!([50, 100]));
}

#[test]
fn test_grep_object() {
    let input = json!({"stock": {"apples": 0, "pears": 4}});
    assert_eq!(eval("grep($stock '(: $item > 0 :)')", input), json!({"pears": 4}));
}

#[test]
fn test_first() {
    let input = json!({"items": [1, 5, 10]});
    assert_eq!(eval("first($items '(: $item > 2 :)')", input.clone()), json!(5));
    assert_eq!(eval("first($items '(: $item > 20 :)')", input), Json::Null);
}

#[test]
fn test_sort_default_and_comparator() {
    let input = json!({"names": ["pear", "apple", "fig"], "nums": [3, 1, 2]});
    assert_eq!(eval("sort($names)", input.clone()), json!(["apple", "fig", "pear"]));
    assert_eq!(eval("sort($nums '(: $b - $a :)')", input), json!([3, 2, 1]));
}

#[test]
fn test_sort_by() {
    let input = json!({"people": [{"n": "b", "age": 40}, {"n": "a", "age": 9}]});
    let result = eval("sort_by($people '(: $age :)')", input);
    assert_eq!(result, json!([{"n": "a", "age": 9}, {"n": "b", "age": 40}]));
}

#[test]
fn test_group() {
    let input = json!({"rows": [
        {"kind": "fruit", "name": "apple"},
        {"kind": "veg", "name": "leek"},
        {"kind": "fruit", "name": "fig"},
    ]});
    let result = eval("group($rows '(: $item.kind :)' '(: $item.name :)')", input);
    assert_eq!(result, json!({"fruit": ["apple", "fig"], "veg": ["leek"]}));
}

#[test]
fn test_derive_first_match() {
    let rules = "[['(: $. > 100 :)' `(: 'big' :)`] ['(: $. > 10 :)' `(: 'medium' :)`] \
                 ['(: true :)' `(: 'small' :)`]]";
    let engine = Engine::new();
    let run = |n: i64| -> Json {
        let source = format!("derive({} {})", n, rules);
        engine.evaluate(&source, &Value::Null).unwrap().into()
    };
    assert_eq!(run(500), json!("big"));
    assert_eq!(run(50), json!("medium"));
    assert_eq!(run(5), json!("small"));
}

#[test]
fn test_derive_without_match_is_undefined() {
    let engine = Engine::new();
    let result = engine
        .evaluate("derive(1 [['(: false :)' '(: 1 :)']])", &Value::Null)
        .unwrap();
    assert_eq!(result, Value::Undefined);
}

#[test]
fn test_chain_threads_value() {
    let result = eval("chain(3 ['(: $. + 1 :)' '(: $. * 10 :)'])", json!({}));
    assert_eq!(result, json!(40));
}

// ============================================================================
// Sets
// ============================================================================

#[test]
fn test_union_keeps_first_appearance_order() {
    let input = json!({"a": [1, 3, 5], "b": [2, 4]});
    assert_eq!(eval("union($a, $b)", input), json!([1, 3, 5, 2, 4]));
    let input = json!({"a": [1, 2, 2], "b": [2, 3]});
    assert_eq!(eval("∪($a $b)", input), json!([1, 2, 3]));
}

#[test]
fn test_set_operations() {
    let input = json!({"a": [1, 2, 3], "b": [2, 3, 4]});
    assert_eq!(eval("intersection($a $b)", input.clone()), json!([2, 3]));
    assert_eq!(eval("difference($a $b)", input.clone()), json!([1]));
    assert_eq!(eval("member($a 2)", input.clone()), json!(true));
    assert_eq!(eval("subset($a [1 3])", input.clone()), json!(true));
    assert_eq!(eval("subset($a $b)", input), json!(false));
}

// ============================================================================
// Core, string and math helpers
// ============================================================================

#[test]
fn test_inspection_helpers() {
    let input = json!({"s": "héllo", "o": {"a": 1, "b": 2}, "n": null});
    assert_eq!(eval("length($s)", input.clone()), json!(5));
    assert_eq!(eval("keys($o)", input.clone()), json!(["a", "b"]));
    assert_eq!(eval("values($o)", input.clone()), json!([1, 2]));
    assert_eq!(eval("typeof($n)", input.clone()), json!("null"));
    assert_eq!(eval("exists($n)", input.clone()), json!(true));
    assert_eq!(eval("exists($nope)", input.clone()), json!(false));
    assert_eq!(eval("fne($n '' 'x')", input), json!("x"));
}

#[test]
fn test_num() {
    assert_eq!(eval("num('12px') + 1", json!({})), json!(13));
    assert_eq!(eval("#('0.1') + 0.2", json!({})), json!(0.3));
    assert_eq!(eval("fne(num('abc') 0)", json!({})), json!(0));
}

#[test]
fn test_string_helpers() {
    assert_eq!(eval("uc('abc') & lc('DEF')", json!({})), json!("ABCdef"));
    assert_eq!(eval("split('a,b,c' ',')", json!({})), json!(["a", "b", "c"]));
    assert_eq!(eval("join(['a' 'b'] '-')", json!({})), json!("a-b"));
    assert_eq!(eval("replace('a-b-c' /-/g '+')", json!({})), json!("a+b+c"));
    assert_eq!(eval("replace('a-b-c' '-' '+')", json!({})), json!("a+b-c"));
    assert_eq!(eval("substr('hello' 1 3)", json!({})), json!("el"));
}

#[test]
fn test_invalid_regex_is_an_error() {
    let engine = Engine::new();
    let err = engine.evaluate("regex('(')", &Value::Null).unwrap_err();
    assert!(matches!(err, Error::Helper { ref helper, .. } if helper == "regex"));
}

#[test]
fn test_math_helpers() {
    assert_eq!(eval("math.abs(-2.5)", json!({})), json!(2.5));
    assert_eq!(eval("math.round(2.5)", json!({})), json!(3));
    assert_eq!(eval("math.max([3 9 4])", json!({})), json!(9));
    assert_eq!(eval("math.sum(0.1 0.2)", json!({})), json!(0.3));
    assert_eq!(eval("tofixed(1.005 2 true)", json!({})), json!("1.01"));
    assert_eq!(eval("math.sqrt(-1)", json!({})), Json::Null);
    assert_eq!(eval("math.sign(-0.5)", json!({})), json!(-1));
    assert_eq!(eval("math.sign(0)", json!({})), json!(0));
}

#[test]
fn test_transform_helper_runs_named_entry() {
    let engine = Engine::new();
    let transforms: Value = json!({
        "out": "(: ^($person 'greet') :)",
        "greet": "(: 'Hi ' & $name :)",
    })
    .into();
    let input: Value = json!({"person": {"name": "Ada"}}).into();
    let result: Json = engine
        .apply(&input, &transforms, None, &Default::default())
        .unwrap()
        .into();
    assert_eq!(result, json!("Hi Ada"));
}

#[test]
fn test_head_and_tail_slices() {
    let input = json!({"a": [1, 2, 3], "min": i64::MIN});
    assert_eq!(eval("head($a 2)", input.clone()), json!([1, 2]));
    assert_eq!(eval("tail($a 2)", input.clone()), json!([2, 3]));
    assert_eq!(eval("tail($a, -1)", input.clone()), json!([2, 3]));
    assert_eq!(eval("tail($a $min)", input.clone()), json!([]));
    assert_eq!(eval("tail($a, -9223372036854775808)", input), json!([]));
}

#[test]
fn test_segment_stops_at_last_item() {
    let input = json!({"a": [1, 2, 3]});
    assert_eq!(eval("segment($a 2 0 1000000000000)", input.clone()), json!([[1, 2], [3]]));
    assert_eq!(eval("segment($a)", input), json!([[1, 2, 3]]));
}

#[test]
fn test_concat_helper_skips_null() {
    assert_eq!(eval("&(null 'a' 'b')", json!({})), json!("ab"));
    assert_eq!(eval("&(null [1] 2)", json!({})), json!([1, 2]));
}
