//! Control flow, inspection and conversion helpers.

use std::sync::LazyLock;

use log::debug;
use regex::Regex;

use super::{HelperDef, HelperRegistry, arg};
use crate::number::{Number, NumericMode};
use crate::operators;
use crate::output::to_json;
use crate::value::{TypeTag, Value};

static NUMBER_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*[-+]?(\d+\.?\d*|\.\d+)").expect("number prefix pattern compiles")
});

pub(super) fn register(registry: &mut HelperRegistry) {
    registry.register(
        HelperDef::raw("?", |ctx, args| {
            let Some(condition) = args.first() else {
                return Ok(Value::Undefined);
            };
            // Only the selected branch is evaluated
            let branch = if ctx.eval(condition)?.is_truthy() {
                args.get(1)
            } else {
                args.get(2)
            };
            match branch {
                Some(expr) => ctx.eval(expr),
                None => Ok(Value::Undefined),
            }
        })
        .meta(
            "?( condition trueexpression falseexpression )",
            "trueexpression if condition is truthy, falseexpression otherwise",
            "Evaluates the condition, then evaluates and returns only the branch it selects. \
             The other branch is never evaluated, so it may hold expensive or failing logic.",
        ),
    );

    registry.register(
        HelperDef::new("exists")
            .on(TypeTag::Undefined, |_, _| Ok(Value::Boolean(false)))
            .any(|_, _| Ok(Value::Boolean(true)))
            .meta(
                "exists( $data_item )",
                "Whether the item is defined at all",
                "Returns true when the passed item is not undefined.",
            ),
    );

    registry.register(
        HelperDef::new("empty")
            .any(|_, args| Ok(Value::Boolean(is_empty(arg(&args, 0)))))
            .meta(
                "empty( $data_item )",
                "Whether the item is empty",
                "Returns true for undefined, null, an empty string or array, and an object with no keys.",
            ),
    );

    registry.register(
        HelperDef::new("fne")
            .any(|_, args| {
                Ok(args
                    .into_iter()
                    .find(|item| !is_empty(item))
                    .unwrap_or_else(|| Value::String(String::new())))
            })
            .handles_decimals()
            .meta(
                "fne( $item1 $item2 [ $item3 ... ] )",
                "The first non-empty item",
                "Returns the first argument that empty() would not report as empty, or an empty \
                 string when every argument is empty.",
            ),
    );

    registry.register(
        HelperDef::new("typeof")
            .any(|_, args| Ok(Value::from(arg(&args, 0).type_tag().name())))
            .meta(
                "typeof( $thing )",
                "The name of the item's type",
                "One of string, number, boolean, null, object, array, regex or undefined.",
            ),
    );

    registry.register(
        HelperDef::new("num")
            .alias("#")
            .on(TypeTag::String, |ctx, args| {
                let text = arg(&args, 0).as_str().unwrap_or_default();
                let Some(prefix) = NUMBER_PREFIX.find(text) else {
                    return Ok(Value::Undefined);
                };
                Ok(Number::parse(prefix.as_str().trim())
                    .map_or(Value::Undefined, |n| Value::Number(in_mode(n, ctx.numeric_mode()))))
            })
            .on(TypeTag::Number, |ctx, args| {
                Ok(match arg(&args, 0) {
                    Value::Number(n) if n.is_nan() => Value::Undefined,
                    Value::Number(n) => Value::Number(in_mode(*n, ctx.numeric_mode())),
                    _ => Value::Undefined,
                })
            })
            .any(|_, _| Ok(Value::Undefined))
            .handles_decimals()
            .meta(
                "num( $string )",
                "The string converted to a number, or undefined",
                "Reads the leading number of a string. Text that does not start with a number \
                 gives undefined; combine with fne() for a default.",
            ),
    );

    registry.register(
        HelperDef::new("length")
            .any(|_, args| {
                let length = match arg(&args, 0) {
                    Value::String(s) => s.chars().count(),
                    Value::Array(items) => items.len(),
                    Value::Object(map) => map.len(),
                    Value::Undefined | Value::Null => 0,
                    _ => 1,
                };
                Ok(Value::from(length))
            })
            .meta(
                "length( $item )",
                "The length of the item",
                "Characters of a string, items of an array or keys of an object. Undefined has \
                 length 0 and every other value length 1.",
            ),
    );

    registry.register(
        HelperDef::new("keys")
            .on(TypeTag::Object, |_, args| {
                let keys = arg(&args, 0)
                    .as_object()
                    .map(|map| map.keys().map(|k| Value::from(k.as_str())).collect())
                    .unwrap_or_default();
                Ok(Value::Array(keys))
            })
            .on(TypeTag::Array, |_, args| {
                let len = arg(&args, 0).as_array().map_or(0, <[Value]>::len);
                Ok(Value::Array((0..len).map(Value::from).collect()))
            })
            .any(|_, _| Ok(Value::Array(Vec::new())))
            .meta(
                "keys( $object )",
                "The keys of the object",
                "Returns the keys of an object, or the indexes of an array.",
            ),
    );

    registry.register(
        HelperDef::new("values")
            .on(TypeTag::Object, |_, mut args| match args.swap_remove(0) {
                Value::Object(map) => Ok(Value::Array(map.into_values().collect())),
                _ => Ok(Value::Array(Vec::new())),
            })
            .on(TypeTag::Array, |_, mut args| Ok(args.swap_remove(0)))
            .on(TypeTag::Undefined, |_, _| Ok(Value::Array(Vec::new())))
            .any(|_, args| Ok(Value::Array(vec![arg(&args, 0).clone()])))
            .handles_decimals()
            .meta(
                "values( $object )",
                "The values of the object as an array",
                "Returns the values of an object. Arrays are returned as they are and any other \
                 value is wrapped in a one-item array.",
            ),
    );

    registry.register(
        HelperDef::new("pairs")
            .on(TypeTag::Object, |_, args| {
                let pairs = super::elements(arg(&args, 0))
                    .into_iter()
                    .map(|(key, value)| Value::Array(vec![key, value.clone()]))
                    .collect();
                Ok(Value::Array(pairs))
            })
            .handles_decimals()
            .meta(
                "pairs( $object )",
                "An array of [key, value] pairs",
                "Extracts the key / value pairs of an object, sorted by key. The {} operator \
                 turns such a list back into an object.",
            ),
    );

    registry.register(
        HelperDef::new("&")
            .any(|_, args| Ok(operators::concat_present(args)))
            .handles_decimals()
            .meta(
                "&( $item1 $item2 [ $item3 ... ] )",
                "The items concatenated together",
                "The first defined item decides the result: lists are appended to, objects \
                 merged at the top level and anything else joined as a string.",
            ),
    );

    registry.register(
        HelperDef::new("@")
            .any(|_, mut args| {
                let (label, value) = if args.len() < 2 {
                    ("debug".to_string(), args.pop().unwrap_or_default())
                } else {
                    let value = args.swap_remove(1);
                    (args[0].as_string(), value)
                };
                debug!(target: "sprig::debug", "{}: {}", label, to_json(&value));
                Ok(value)
            })
            .handles_decimals()
            .meta(
                "@( [ $label ] $data_item )",
                "The passed value",
                "Logs the item, with an optional label, and returns it unchanged.",
            ),
    );

    registry.register(
        HelperDef::new("transform")
            .alias("^")
            .any(|ctx, args| match args.len() {
                0 => Ok(Value::Undefined),
                // ^('name') runs a named transform on the current input
                1 => ctx.transform(ctx.input(), &args[0]),
                2 => ctx.transform(&args[0], &args[1]),
                _ => {
                    let dictionary = &args[1];
                    let template = match &args[2] {
                        Value::Undefined => match dictionary.as_object() {
                            Some(map) if map.contains_key("out") => Value::from("out"),
                            _ => dictionary.clone(),
                        },
                        name => name.clone(),
                    };
                    ctx.transform_with(&args[0], dictionary, &template)
                }
            })
            .handles_decimals()
            .meta(
                "transform( $input $transform_or_expression [ $name ] )",
                "The result of running the transform with $input as $.",
                "Runs an expression or a named transform with $input as the data. Also written \
                 ^( $input $transform ) or $input -> $transform. With only a name, the current \
                 data is used; with three arguments the second is the transform dictionary.",
            ),
    );

    registry.register(
        HelperDef::new("decimal_clean")
            .any(|_, args| {
                let as_strings = arg(&args, 1).is_truthy();
                Ok(arg(&args, 0).clone().normalized(as_strings))
            })
            .handles_decimals()
            .meta(
                "decimal_clean( $thing [ $use_strings ] )",
                "$thing with every exact decimal converted",
                "Converts exact decimals inside $thing to native numbers, or to strings that keep \
                 their full precision when $use_strings is true.",
            ),
    );
}

/// The same test `empty()` performs.
pub(super) fn is_empty(value: &Value) -> bool {
    match value {
        Value::Undefined | Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

fn in_mode(number: Number, mode: NumericMode) -> Number {
    match (mode, number.to_decimal()) {
        (NumericMode::Exact, Some(d)) => Number::Decimal(d),
        _ => number.to_native(),
    }
}
