//! Helpers: the registry and the builtin catalog.
//!
//! Builtins are grouped by what they work on. Every one is registered with
//! metadata so `Engine::helper_metadata` can document the whole catalog.

mod collections;
mod core;
mod math;
mod sets;
mod strings;
pub mod registry;

pub use registry::{HelperDef, HelperKind, HelperMeta, HelperRecord, HelperRegistry, RawFn, ValueFn, coerce};

use crate::evaluator::EvalContext;
use crate::value::{Map, Value};

static UNDEFINED: Value = Value::Undefined;

/// Registers every builtin helper.
pub fn register_builtins(registry: &mut HelperRegistry) {
    self::core::register(registry);
    collections::register(registry);
    sets::register(registry);
    strings::register(registry);
    math::register(registry);
}

/// The argument at `index`, or `undefined` when it was not passed.
pub(crate) fn arg(args: &[Value], index: usize) -> &Value {
    args.get(index).unwrap_or(&UNDEFINED)
}

/// Integer value of an optional argument.
pub(crate) fn int_arg(args: &[Value], index: usize) -> Option<i64> {
    match arg(args, index) {
        Value::Number(n) => n.as_i64().or_else(|| {
            let f = n.to_f64();
            f.is_finite().then(|| f.trunc() as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// The input a sub-transform sees for one element of a collection:
/// `{index, all, item}`, plus `extra` when the caller passed one.
pub(crate) fn iteration(all: &Value, index: Value, item: &Value, extra: &Value) -> Value {
    let mut data = Map::new();
    data.insert("index".to_string(), index);
    data.insert("all".to_string(), all.clone());
    data.insert("item".to_string(), item.clone());
    if !extra.is_undefined() {
        data.insert("extra".to_string(), extra.clone());
    }
    Value::Object(data)
}

/// Elements of an array (keyed by index) or an object (keyed by name, in
/// sorted key order).
pub(crate) fn elements(collection: &Value) -> Vec<(Value, &Value)> {
    match collection {
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| (Value::from(i), item))
            .collect(),
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            keys.into_iter()
                .filter_map(|key| map.get(key).map(|value| (Value::from(key.as_str()), value)))
                .collect()
        }
        _ => Vec::new(),
    }
}

/// The test used by `grep` and `first` when none is given.
pub(crate) fn not_empty_test(ctx: &EvalContext<'_>) -> Value {
    Value::String(ctx.quote("!empty($item)"))
}

/// A template argument, falling back to `default` when it was not passed.
pub(crate) fn template_or(args: &[Value], index: usize, default: impl FnOnce() -> Value) -> Value {
    match arg(args, index) {
        Value::Undefined => default(),
        template => template.clone(),
    }
}
