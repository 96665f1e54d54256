// tests/transform_tests.rs

use pretty_assertions::assert_eq;
use serde_json::{Value as Json, json};
use sprig_lang::{ApplyOptions, Delimiters, Engine, Error, Value};

fn apply(transforms: Json, input: Json) -> Result<Json, Error> {
    apply_with(transforms, input, None, &ApplyOptions::default())
}

fn apply_with(
    transforms: Json,
    input: Json,
    entry: Option<&str>,
    options: &ApplyOptions,
) -> Result<Json, Error> {
    let engine = Engine::new();
    let result = engine.apply(&input.into(), &transforms.into(), entry, options)?;
    Ok(result.into())
}

// ============================================================================
// Walking templates
// ============================================================================

#[test]
fn test_identity() {
    let input = json!({"a": [1, 2.5, {"b": null}], "c": "text", "d": true});
    assert_eq!(apply(json!({"out": "(: $ :)"}), input.clone()).unwrap(), input);
    assert_eq!(apply(json!({"out": "(: $. :)"}), input.clone()).unwrap(), input);
}

#[test]
fn test_template_structure_is_preserved() {
    let transforms = json!({
        "out": {
            "name": "(: $first & ' ' & $last :)",
            "tags": ["fixed", "(: $tag :)", 3, null],
            "nested": {"total": "(: $price + 0.2 :)"}
        }
    });
    let input = json!({"first": "Ada", "last": "Lovelace", "tag": "math", "price": 0.1});
    assert_eq!(
        apply(transforms, input).unwrap(),
        json!({
            "name": "Ada Lovelace",
            "tags": ["fixed", "math", 3, null],
            "nested": {"total": 0.3}
        })
    );
}

#[test]
fn test_keys_are_never_evaluated() {
    let result = apply(json!({"out": {"(: 'x' :)": "(: 1 :)"}}), json!({})).unwrap();
    assert_eq!(result, json!({"(: 'x' :)": 1}));
}

#[test]
fn test_dynamic_keys_use_object_construction() {
    let result = apply(json!({"out": "(: { $key: $value } :)"}), json!({"key": "x", "value": 2})).unwrap();
    assert_eq!(result, json!({"x": 2}));
}

#[test]
fn test_undefined_results_drop_object_entries() {
    let result = apply(json!({"out": {"a": "(: $missing :)", "b": 1}}), json!({})).unwrap();
    assert_eq!(result, json!({"b": 1}));
}

#[test]
fn test_sub_transforms_are_not_expanded() {
    let transforms = json!({
        "out": {"a": "helper_entry", "b": "(: ^('helper_entry') :)"},
        "helper_entry": "(: 1 + 1 :)"
    });
    let result = apply(transforms, json!({})).unwrap();
    assert_eq!(result, json!({"a": "helper_entry", "b": 2}));
}

#[test]
fn test_object_without_out_is_the_template() {
    let result = apply(json!({"total": "(: $a * 2 :)"}), json!({"a": 4})).unwrap();
    assert_eq!(result, json!({"total": 8}));
}

#[test]
fn test_bare_expression_as_transform() {
    let result = apply(json!("(: $a * 2 :)"), json!({"a": 4})).unwrap();
    assert_eq!(result, json!(8));
}

#[test]
fn test_named_entry() {
    let transforms = json!({"out": "(: 1 :)", "other": "(: $a :)"});
    let options = ApplyOptions::default();
    assert_eq!(apply_with(transforms.clone(), json!({"a": 7}), Some("other"), &options).unwrap(), json!(7));
    assert_eq!(apply_with(transforms.clone(), json!({"a": 7}), Some("$other"), &options).unwrap(), json!(7));
    assert_eq!(apply_with(transforms, json!({}), Some("nope"), &options).unwrap(), Json::Null);
}

#[test]
fn test_named_action_map() {
    let transforms = json!({
        "out": "(: map($words `(: derive($item 'labels') :)`) :)",
        "labels": [
            ["(: $. =~ /z/ :)", "(: 'has_z' :)"],
            ["(: typeof($.) == 'array' :)", "sum_items"],
            ["(: true :)", "(: $. :)"]
        ],
        "sum_items": "(: reduce($. '(: $memo + $item :)' 0) :)"
    });
    let input = json!({"words": ["zap", "bob", [8, 2]]});
    assert_eq!(apply(transforms, input).unwrap(), json!(["has_z", "bob", 10]));
}

#[test]
fn test_chain_by_name() {
    let transforms = json!({
        "out": "(: chain($n 'steps') :)",
        "steps": ["(: $. + 1 :)", "double"],
        "double": "(: $. * 2 :)"
    });
    assert_eq!(apply(transforms, json!({"n": 4})).unwrap(), json!(10));
}

#[test]
fn test_arrow_runs_template() {
    let transforms = json!({
        "out": "(: $people -> 'person' :)",
        "person": {"name": "(: $name :)"}
    });
    let input = json!({"people": {"name": "Grace", "age": 85}});
    assert_eq!(apply(transforms, input).unwrap(), json!({"name": "Grace"}));
}

#[test]
fn test_transform_with_dictionary_argument() {
    let input = json!({"dict": {"out": "(: $v * 2 :)"}, "v": 4});
    let result = apply(json!({"out": "(: transform($ $dict undefined) :)"}), input).unwrap();
    assert_eq!(result, json!(8));
}

// ============================================================================
// Depth budget
// ============================================================================

#[test]
fn test_mutual_recursion_exceeds_depth() {
    let transforms = json!({
        "out": "(: ^('ping') :)",
        "ping": "(: ^('pong') :)",
        "pong": "(: ^('ping') :)"
    });
    let err = apply(transforms, json!({})).unwrap_err();
    assert!(err.is_depth_exceeded());
    assert_eq!(err, Error::DepthExceeded { max_depth: 50 });
}

#[test]
fn test_depth_budget_counts_every_nested_call() {
    let transforms = json!({
        "count": "(: ?($. > 0, ^($. - 1, 'count'), 'done') :)"
    });
    let options = ApplyOptions::default();
    assert_eq!(
        apply_with(transforms.clone(), json!(49), Some("count"), &options).unwrap(),
        json!("done")
    );
    let err = apply_with(transforms, json!(50), Some("count"), &options).unwrap_err();
    assert!(err.is_depth_exceeded());
}

#[test]
fn test_max_depth_option() {
    let transforms = json!({"out": "(: map($items '(: $item :)') :)"});
    let input = json!({"items": [1]});
    let shallow = ApplyOptions::new().max_depth(1);
    let err = apply_with(transforms.clone(), input.clone(), None, &shallow).unwrap_err();
    assert_eq!(err, Error::DepthExceeded { max_depth: 1 });
    let enough = ApplyOptions::new().max_depth(2);
    assert_eq!(apply_with(transforms, input, None, &enough).unwrap(), json!([1]));
}

// ============================================================================
// Output
// ============================================================================

#[test]
fn test_exact_decimals_on_request() {
    let engine = Engine::new();
    let transforms: Value = json!({"out": "(: 0.1 + 0.2 :)"}).into();
    let options = ApplyOptions::new().return_exact_decimal(true);
    let result = engine.apply(&Value::Null, &transforms, None, &options).unwrap();
    assert!(matches!(result, Value::Number(n) if n.is_exact()));
    assert_eq!(result.as_string(), "0.3");
}

#[test]
fn test_decimals_as_strings() {
    let options = ApplyOptions::new().decimals_as_strings(true);
    let result = apply_with(json!({"out": ["(: 0.1 + 0.2 :)", null]}), json!({}), None, &options).unwrap();
    assert_eq!(result, json!(["0.3", null]));
}

#[test]
fn test_normalization_is_idempotent() {
    let engine = Engine::new();
    let transforms: Value = json!({"out": {"a": "(: 1.5 * 2 :)", "b": ["(: 0.1 :)", "(: /x/ :)"]}}).into();
    let options = ApplyOptions::new().return_exact_decimal(true);
    let exact = engine.apply(&Value::Null, &transforms, None, &options).unwrap();
    let once = exact.clone().normalized(false);
    let twice = once.clone().normalized(false);
    assert_eq!(once, twice);
    assert!(!once.contains_exact());
    assert!(exact.contains_exact());
}

// ============================================================================
// Collaborators
// ============================================================================

#[test]
fn test_key_filter_rewrites_lookups() {
    let options = ApplyOptions::new().key_filter(|mut keys, _data| {
        keys.insert(0, Value::from("data"));
        keys
    });
    let input = json!({"data": {"name": "Ada"}, "name": "wrong"});
    let result = apply_with(json!({"out": "(: $name :)"}), input, None, &options).unwrap();
    assert_eq!(result, json!("Ada"));
}

struct Braces;

impl Delimiters for Braces {
    fn extract<'s>(&self, candidate: &'s str) -> Option<&'s str> {
        candidate.strip_prefix("{{")?.strip_suffix("}}")
    }

    fn quote(&self, source: &str) -> String {
        format!("{{{{{}}}}}", source)
    }
}

#[test]
fn test_custom_delimiters() {
    let options = ApplyOptions::new().delimiters(Braces);
    let transforms = json!({"out": {"a": "{{ $a + 1 }}", "b": "(: $a :)", "c": "{{ grep($list) }}"}});
    let input = json!({"a": 1, "list": ["x", ""]});
    let result = apply_with(transforms, input, None, &options).unwrap();
    assert_eq!(result, json!({"a": 2, "b": "(: $a :)", "c": ["x"]}));
}

#[test]
fn test_parse_error_surfaces_with_caret() {
    let err = apply(json!({"out": "(:$a + * 2:)"}), json!({})).unwrap_err();
    let Error::Parse(parse) = &err else {
        panic!("expected a parse error, got {:?}", err);
    };
    assert_eq!(parse.line.as_deref(), Some("$a + * 2"));
    assert_eq!(parse.columns(), (6, 6));
    assert_eq!(err.to_string(), "Error while parsing:\n$a + * 2\n     ^\nUnexpected '*'");
}

#[test]
fn test_engine_is_shared_between_threads() {
    let engine = Engine::new();
    let transforms: Value = json!({"out": "(: $n * 2 :)"}).into();
    std::thread::scope(|scope| {
        for n in 0..4 {
            let (engine, transforms) = (&engine, &transforms);
            scope.spawn(move || {
                let input = Value::from(json!({"n": n}));
                let result = engine.apply(&input, transforms, None, &ApplyOptions::default()).unwrap();
                assert_eq!(result, Value::from(n * 2));
            });
        }
    });
    assert_eq!(engine.cache().len(), 1);
}
