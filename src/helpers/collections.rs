//! Higher-order and structural helpers over arrays and objects.
//!
//! The higher-order helpers take a template argument: a delimited expression
//! such as `'(: $item.name :)'`, the name of an entry in the current transform
//! dictionary, or an inline array/object template. Each element is run through
//! it with `{index, all, item, extra?}` as the input.

use std::cmp::Ordering;

use super::{HelperDef, HelperRegistry, arg, elements, int_arg, iteration, not_empty_test, template_or};
use crate::error::Result;
use crate::evaluator::EvalContext;
use crate::helpers::strings::Matcher;
use crate::transform::find_entry;
use crate::value::{Map, TypeTag, Value};

/// Largest array index `unflatten` creates; bigger numeric keys stay object keys.
const MAX_UNFLATTEN_INDEX: usize = 65_535;

const COLLECTIONS: &[TypeTag] = &[TypeTag::Array, TypeTag::Object];

pub(super) fn register(registry: &mut HelperRegistry) {
    registry.register(
        HelperDef::new("map")
            .on_each(COLLECTIONS, map)
            .coerce(&[TypeTag::Array])
            .handles_decimals()
            .meta(
                "map( $input_data $transform [ $extra ] )",
                "An array of the results of applying $transform to each item",
                "Runs $transform once per item with $item, $index and $all (and $extra when \
                 given) as its data. Objects are visited in key order.",
            ),
    );

    registry.register(
        HelperDef::new("reduce")
            .on_each(COLLECTIONS, reduce)
            .coerce(&[TypeTag::Array])
            .handles_decimals()
            .meta(
                "reduce( $input_data $transform [ $memo ] )",
                "The result of the final application of $transform",
                "Runs $transform once per item. Besides $item, $index and $all it receives \
                 $memo, the previous result, which starts as the $memo argument.",
            ),
    );

    registry.register(
        HelperDef::new("grep")
            .on(TypeTag::Array, grep_array)
            .on(TypeTag::Object, grep_object)
            .coerce(&[TypeTag::Array])
            .handles_decimals()
            .meta(
                "grep( $array_or_object $search_transform [ $value_transform ] [ $extra ] )",
                "The items that match $search_transform",
                "Keeps the items for which $search_transform is truthy, or the result of \
                 $value_transform for them when it is given. The default search keeps \
                 non-empty items.",
            ),
    );

    registry.register(
        HelperDef::new("first")
            .on(TypeTag::Array, first)
            .coerce(&[TypeTag::Array])
            .handles_decimals()
            .meta(
                "first( $array [ $transform ] [ $extra ] )",
                "The first item that matches the condition",
                "Returns the first item $transform is truthy for, by default the first \
                 non-empty item, or undefined when none matches.",
            ),
    );

    registry.register(
        HelperDef::new("sort")
            .on(TypeTag::Array, sort)
            .coerce(&[TypeTag::Array])
            .handles_decimals()
            .meta(
                "sort( $array [ $comparison ] )",
                "A sorted copy of the array",
                "Without $comparison items are sorted by their string form. A $comparison \
                 receives $a and $b and returns a positive number when $a sorts after $b, \
                 a negative one when it sorts before, or 0.",
            ),
    );

    registry.register(
        HelperDef::new("sort_by")
            .on(TypeTag::Array, sort_by)
            .coerce(&[TypeTag::Array])
            .handles_decimals()
            .meta(
                "sort_by( $array $extractor )",
                "A copy of the array sorted by the value $extractor returns",
                "Runs $extractor once per item (the item is its data) and sorts by the \
                 results: strings alphabetically, numbers numerically.",
            ),
    );

    registry.register(
        HelperDef::new("group")
            .on_each(COLLECTIONS, group)
            .coerce(&[TypeTag::Array])
            .handles_decimals()
            .meta(
                "group( $items $bucket_name_transform [ $value_transform ] )",
                "An object of buckets holding the grouped items",
                "Puts each item into the bucket named by $bucket_name_transform, skipping \
                 items it returns undefined for. $value_transform, when given, computes \
                 what is stored instead of the item.",
            ),
    );

    registry.register(
        HelperDef::new("derive")
            .any(derive)
            .handles_decimals()
            .meta(
                "derive( $data $action_map )",
                "The result of the first matching action, or undefined",
                "An action map is a list of [test, action] transform pairs. The first test \
                 that is truthy for $data has its action run on $data.",
            ),
    );

    registry.register(
        HelperDef::new("chain")
            .any(chain)
            .handles_decimals()
            .meta(
                "chain( $data $transform_chain )",
                "The data after passing through every transform in the chain",
                "Feeds $data to the first transform of the list, its result to the next \
                 one, and so on.",
            ),
    );

    registry.register(
        HelperDef::new("head")
            .on(TypeTag::Array, |_, args| {
                let items = arg(&args, 0).as_array().unwrap_or_default();
                let end = int_arg(&args, 1).unwrap_or(items.len() as i64);
                Ok(Value::Array(slice(items, 0, Some(end)).to_vec()))
            })
            .coerce(&[TypeTag::Array])
            .handles_decimals()
            .meta(
                "head( $array $n )",
                "The first $n items of the array",
                "Returns the first $n items. A negative $n drops that many from the end.",
            ),
    );

    registry.register(
        HelperDef::new("tail")
            .on(TypeTag::Array, |_, args| {
                let items = arg(&args, 0).as_array().unwrap_or_default();
                let tail = match int_arg(&args, 1) {
                    Some(0) => &[][..],
                    Some(n) => slice(items, n.saturating_neg(), None),
                    None => items,
                };
                Ok(Value::Array(tail.to_vec()))
            })
            .coerce(&[TypeTag::Array])
            .handles_decimals()
            .meta(
                "tail( $array $n )",
                "The last $n items of the array",
                "Returns the last $n items.",
            ),
    );

    registry.register(
        HelperDef::new("reverse")
            .on(TypeTag::Array, |_, args| {
                let mut items = arg(&args, 0).as_array().unwrap_or_default().to_vec();
                items.reverse();
                Ok(Value::Array(items))
            })
            .on(TypeTag::String, |_, args| {
                Ok(Value::String(arg(&args, 0).as_string().chars().rev().collect()))
            })
            .handles_decimals()
            .meta(
                "reverse( $array_or_string )",
                "The items or characters in reverse order",
                "Returns a new array or string with the elements in reverse order.",
            ),
    );

    registry.register(
        HelperDef::new("flatten")
            .on(TypeTag::Array, |_, args| {
                let items = arg(&args, 0).as_array().unwrap_or_default();
                Ok(Value::Array(flatten_array(items, int_arg(&args, 1))))
            })
            .on(TypeTag::Object, |_, args| {
                let separator = match arg(&args, 1) {
                    Value::Undefined => ".".to_string(),
                    other => other.as_string(),
                };
                let prefix = match arg(&args, 2) {
                    Value::Undefined => None,
                    other => Some(other.as_string()),
                };
                let mut out = Map::new();
                flatten_object(&mut out, arg(&args, 0), &separator, prefix.as_deref());
                Ok(Value::Object(out))
            })
            .coerce(&[TypeTag::Array])
            .handles_decimals()
            .meta(
                "flatten( $array_or_object [ $separator_or_depth ] [ $prefix ] )",
                "A single-level copy of the nested structure",
                "Arrays lose their nesting (down to $depth levels when given). Objects \
                 become one level of keys that spell out the full path with `.` or \
                 $separator, each prefixed by $prefix when given. unflatten() reverses it.",
            ),
    );

    registry.register(
        HelperDef::new("unflatten")
            .on(TypeTag::Object, |_, args| {
                let separator = match arg(&args, 1) {
                    Value::Undefined => Matcher::Literal(".".to_string()),
                    other => Matcher::from_value(other),
                };
                let mut out = Value::Object(Map::new());
                if let Some(map) = arg(&args, 0).as_object() {
                    for (key, value) in map {
                        let parts = separator.split(key);
                        insert_path(&mut out, &parts, value.clone());
                    }
                }
                Ok(out)
            })
            .coerce(&[TypeTag::Array])
            .handles_decimals()
            .meta(
                "unflatten( $object [ $separator ] )",
                "A nested structure built from dotted keys",
                "Reads each key of $object as a path split on `.` (or $separator) and \
                 builds the nested structure it describes. Numeric parts create arrays.",
            ),
    );

    registry.register(
        HelperDef::new("segment")
            .on(TypeTag::Array, segment)
            .coerce(&[TypeTag::Array])
            .handles_decimals()
            .meta(
                "segment( $array [ $group_size $start $end ] )",
                "An array of sub-arrays of at most $group_size items",
                "Breaks the array (or the items from $start to $end) into groups of \
                 $group_size. The last group holds the remainder.",
            ),
    );

    registry.register(
        HelperDef::new("extract")
            .on(TypeTag::Array, |_, args| {
                let items = arg(&args, 0).as_array().unwrap_or_default();
                let picked = requested_keys(&args)
                    .map(|key| index_of(key).and_then(|i| items.get(i)).cloned().unwrap_or_default())
                    .collect();
                Ok(Value::Array(picked))
            })
            .on(TypeTag::Object, |_, args| {
                let source = arg(&args, 0).as_object();
                let mut out = Map::new();
                for key in requested_keys(&args) {
                    let key = key.as_string();
                    let value = source.and_then(|map| map.get(&key)).cloned().unwrap_or_default();
                    out.insert(key, value);
                }
                Ok(Value::Object(out))
            })
            .coerce(&[TypeTag::Array])
            .handles_decimals()
            .meta(
                "extract( $input_data [ keys to extract ] )",
                "Only the given indexes or keys of the input",
                "Returns an array of the items at the given indexes, in the order given, or \
                 an object with only the given keys.",
            ),
    );
}

// ========================================
// Higher-order helpers
// ========================================

fn map(ctx: &EvalContext<'_>, args: Vec<Value>) -> Result<Value> {
    let (input, template, extra) = (arg(&args, 0), arg(&args, 1), arg(&args, 2));
    let mut out = Vec::new();
    for (index, item) in elements(input) {
        out.push(ctx.transform(&iteration(input, index, item, extra), template)?);
    }
    Ok(Value::Array(out))
}

/// Visits objects in insertion order, unlike the other iterating helpers.
fn reduce(ctx: &EvalContext<'_>, args: Vec<Value>) -> Result<Value> {
    let (input, template) = (arg(&args, 0), arg(&args, 1));
    let steps: Vec<(Value, &Value)> = match input {
        Value::Object(map) => map.iter().map(|(k, v)| (Value::from(k.as_str()), v)).collect(),
        other => elements(other),
    };

    let mut memo = arg(&args, 2).clone();
    for (index, item) in steps {
        let mut data = iteration(input, index, item, &Value::Undefined);
        if let Value::Object(map) = &mut data {
            map.insert("memo".to_string(), memo);
        }
        memo = ctx.transform(&data, template)?;
    }
    Ok(memo)
}

fn grep_array(ctx: &EvalContext<'_>, args: Vec<Value>) -> Result<Value> {
    let input = arg(&args, 0);
    let test = template_or(&args, 1, || not_empty_test(ctx));
    let (value_template, extra) = (arg(&args, 2), arg(&args, 3));

    let mut out = Vec::new();
    for (index, item) in elements(input) {
        let data = iteration(input, index, item, extra);
        if ctx.transform(&data, &test)?.is_truthy() {
            out.push(match value_template {
                Value::Undefined => item.clone(),
                template => ctx.transform(&data, template)?,
            });
        }
    }
    Ok(Value::Array(out))
}

fn grep_object(ctx: &EvalContext<'_>, args: Vec<Value>) -> Result<Value> {
    let input = arg(&args, 0);
    let test = template_or(&args, 1, || not_empty_test(ctx));
    let (value_template, extra) = (arg(&args, 2), arg(&args, 3));

    let mut out = Map::new();
    for (key, item) in elements(input) {
        let data = iteration(input, key.clone(), item, extra);
        if ctx.transform(&data, &test)?.is_truthy() {
            let value = match value_template {
                Value::Undefined => item.clone(),
                template => ctx.transform(&data, template)?,
            };
            out.insert(key.as_string(), value);
        }
    }
    Ok(Value::Object(out))
}

fn first(ctx: &EvalContext<'_>, args: Vec<Value>) -> Result<Value> {
    let input = arg(&args, 0);
    let test = template_or(&args, 1, || not_empty_test(ctx));
    let extra = arg(&args, 2);
    for (index, item) in elements(input) {
        if ctx.transform(&iteration(input, index, item, extra), &test)?.is_truthy() {
            return Ok(item.clone());
        }
    }
    Ok(Value::Undefined)
}

fn sort(ctx: &EvalContext<'_>, args: Vec<Value>) -> Result<Value> {
    let items = arg(&args, 0).as_array().unwrap_or_default().to_vec();
    let sorted = match arg(&args, 1) {
        Value::Undefined => merge_sort(items, &mut |a, b| Ok(default_order(a, b)))?,
        template => merge_sort(items, &mut |a, b| {
            let mut pair = Map::new();
            pair.insert("a".to_string(), a.clone());
            pair.insert("b".to_string(), b.clone());
            let result = ctx.transform(&Value::Object(pair), template)?;
            Ok(comparison_result(&result))
        })?,
    };
    Ok(Value::Array(sorted))
}

fn sort_by(ctx: &EvalContext<'_>, args: Vec<Value>) -> Result<Value> {
    let items = arg(&args, 0).as_array().unwrap_or_default();
    let extractor = arg(&args, 1);
    let mut keyed = Vec::with_capacity(items.len());
    for item in items {
        keyed.push((ctx.transform(item, extractor)?, item.clone()));
    }
    let sorted = merge_sort(keyed, &mut |(a, _), (b, _)| {
        Ok(match a {
            Value::String(a) => a.as_str().cmp(b.as_string().as_str()),
            Value::Number(a) => b
                .as_number()
                .and_then(|b| a.to_f64().partial_cmp(&b.to_f64()))
                .unwrap_or(Ordering::Equal),
            _ => Ordering::Equal,
        })
    })?;
    Ok(Value::Array(sorted.into_iter().map(|(_, item)| item).collect()))
}

fn group(ctx: &EvalContext<'_>, args: Vec<Value>) -> Result<Value> {
    let (input, bucket_template, value_template) = (arg(&args, 0), arg(&args, 1), arg(&args, 2));
    let mut buckets = Map::new();
    for (index, item) in elements(input) {
        let data = iteration(input, index, item, &Value::Undefined);
        let bucket = ctx.transform(&data, bucket_template)?;
        if bucket.is_undefined() {
            continue;
        }
        let value = match value_template {
            Value::Undefined => item.clone(),
            template => ctx.transform(&data, template)?,
        };
        let entry = buckets
            .entry(bucket.as_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        if let Value::Array(members) = entry {
            members.push(value);
        }
    }
    Ok(Value::Object(buckets))
}

fn derive(ctx: &EvalContext<'_>, args: Vec<Value>) -> Result<Value> {
    let input = arg(&args, 0);
    for rule in template_list(ctx, arg(&args, 1)) {
        let (test, action) = match rule.as_array() {
            Some([test, action, ..]) => (test, action),
            _ => continue,
        };
        if ctx.transform(input, test)?.is_truthy() {
            return ctx.transform(input, action);
        }
    }
    Ok(Value::Undefined)
}

fn chain(ctx: &EvalContext<'_>, args: Vec<Value>) -> Result<Value> {
    let mut data = arg(&args, 0).clone();
    for step in template_list(ctx, arg(&args, 1)) {
        data = ctx.transform(&data, &step)?;
    }
    Ok(data)
}

/// A list of templates given inline or by the name of a dictionary entry.
fn template_list(ctx: &EvalContext<'_>, list: &Value) -> Vec<Value> {
    let list = match list {
        Value::String(name) => find_entry(ctx.transforms(), name.strip_prefix('$').unwrap_or(name)),
        other => Some(other),
    };
    match list {
        Some(Value::Array(items)) => items.clone(),
        _ => Vec::new(),
    }
}

// ========================================
// Sorting
// ========================================

/// Stable merge sort with a comparison that may fail.
fn merge_sort<T, F>(mut items: Vec<T>, compare: &mut F) -> Result<Vec<T>>
where
    F: FnMut(&T, &T) -> Result<Ordering>,
{
    if items.len() <= 1 {
        return Ok(items);
    }
    let right = items.split_off(items.len() / 2);
    let left = merge_sort(items, compare)?;
    let right = merge_sort(right, compare)?;

    let mut merged = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    while let (Some(l), Some(r)) = (left.peek(), right.peek()) {
        let next = if compare(l, r)? == Ordering::Greater {
            right.next()
        } else {
            left.next()
        };
        merged.extend(next);
    }
    merged.extend(left);
    merged.extend(right);
    Ok(merged)
}

/// Default order: by string form, with undefined items last.
fn default_order(a: &Value, b: &Value) -> Ordering {
    match (a.is_undefined(), b.is_undefined()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.as_string().cmp(&b.as_string()),
    }
}

fn comparison_result(result: &Value) -> Ordering {
    match result {
        Value::Boolean(true) => Ordering::Greater,
        other => other
            .as_number()
            .and_then(|n| n.to_f64().partial_cmp(&0.0))
            .unwrap_or(Ordering::Equal),
    }
}

// ========================================
// Structural helpers
// ========================================

/// Slice with negative positions counting from the end.
fn slice(items: &[Value], start: i64, end: Option<i64>) -> &[Value] {
    let len = items.len() as i64;
    let clamp = |pos: i64| {
        let pos = if pos < 0 { (len + pos).max(0) } else { pos.min(len) };
        pos as usize
    };
    let (start, end) = (clamp(start), clamp(end.unwrap_or(len)));
    if start >= end { &[] } else { &items[start..end] }
}

fn flatten_array(items: &[Value], depth: Option<i64>) -> Vec<Value> {
    let mut out = Vec::new();
    for item in items {
        match item {
            Value::Array(inner) if depth.is_none_or(|d| d > 0) => {
                out.extend(flatten_array(inner, depth.map(|d| d - 1)));
            }
            other => out.push(other.clone()),
        }
    }
    out
}

fn flatten_object(out: &mut Map, value: &Value, separator: &str, prefix: Option<&str>) {
    let key_for = |key: &str| match prefix {
        Some(prefix) => format!("{}{}{}", prefix, separator, key),
        None => key.to_string(),
    };
    match value {
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                flatten_object(out, item, separator, Some(&key_for(&i.to_string())));
            }
        }
        Value::Object(map) => {
            for (key, item) in map {
                flatten_object(out, item, separator, Some(&key_for(key)));
            }
        }
        scalar => {
            out.insert(prefix.unwrap_or_default().to_string(), scalar.clone());
        }
    }
}

fn unflatten_index(key: &str) -> Option<usize> {
    if key.is_empty() || !key.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    key.parse().ok().filter(|i| *i <= MAX_UNFLATTEN_INDEX)
}

/// Stores `value` at the path `parts` below `target`, creating arrays for
/// numeric parts and objects for the rest.
fn insert_path(target: &mut Value, parts: &[String], value: Value) {
    let Some((key, rest)) = parts.split_first() else {
        *target = value;
        return;
    };

    let index = unflatten_index(key);
    if index.is_none()
        && let Value::Array(items) = target
    {
        // A named key turns an array built so far into an object
        let map = std::mem::take(items)
            .into_iter()
            .enumerate()
            .map(|(i, item)| (i.to_string(), item))
            .collect();
        *target = Value::Object(map);
    }

    let child = match (target, index) {
        (Value::Array(items), Some(i)) => {
            if items.len() <= i {
                items.resize(i + 1, Value::Undefined);
            }
            &mut items[i]
        }
        (Value::Object(map), _) => map.entry(key.clone()).or_insert(Value::Undefined),
        _ => return,
    };

    if let Some(next) = rest.first()
        && !matches!(child, Value::Array(_) | Value::Object(_))
    {
        *child = if unflatten_index(next).is_some() {
            Value::Array(Vec::new())
        } else {
            Value::Object(Map::new())
        };
    }
    insert_path(child, rest, value);
}

fn segment(_: &EvalContext<'_>, args: Vec<Value>) -> Result<Value> {
    let items = arg(&args, 0).as_array().unwrap_or_default();
    let start = int_arg(&args, 2).filter(|s| *s > 0).unwrap_or(0);
    let stop = int_arg(&args, 3)
        .filter(|s| *s != 0)
        .unwrap_or(i64::MAX)
        .min(items.len() as i64 - 1);
    let group_size = match arg(&args, 1) {
        Value::Number(n) if !n.is_zero() && !n.is_nan() => (n.to_f64().ceil() as i64).max(1),
        _ => stop.saturating_sub(start).saturating_add(1).max(1),
    };

    let mut groups = vec![Vec::new()];
    for i in start..=stop {
        if groups.last().is_some_and(|g: &Vec<Value>| g.len() as i64 >= group_size) {
            groups.push(Vec::new());
        }
        let item = usize::try_from(i).ok().and_then(|i| items.get(i)).cloned().unwrap_or_default();
        if let Some(current) = groups.last_mut() {
            current.push(item);
        }
    }
    Ok(Value::Array(groups.into_iter().map(Value::Array).collect()))
}

/// The keys after the first argument, with array arguments spliced in.
fn requested_keys(args: &[Value]) -> impl Iterator<Item = &Value> {
    args.iter().skip(1).flat_map(|key| match key {
        Value::Array(keys) => keys.iter().collect::<Vec<_>>(),
        single => vec![single],
    })
}

fn index_of(key: &Value) -> Option<usize> {
    let index = key.as_number()?.as_i64()?;
    usize::try_from(index).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(values: &[i64]) -> Vec<Value> {
        values.iter().map(|v| Value::from(*v)).collect()
    }

    #[test]
    fn test_slice_bounds() {
        let items = ints(&[1, 2, 3, 4]);
        assert_eq!(slice(&items, 0, Some(2)), &ints(&[1, 2])[..]);
        assert_eq!(slice(&items, -2, None), &ints(&[3, 4])[..]);
        assert_eq!(slice(&items, 0, Some(-3)), &ints(&[1])[..]);
        assert!(slice(&items, 3, Some(1)).is_empty());
    }

    #[test]
    fn test_merge_sort_is_stable() {
        let items = vec![(2, 'a'), (1, 'b'), (2, 'c'), (1, 'd')];
        let sorted = merge_sort(items, &mut |a, b| Ok(a.0.cmp(&b.0))).unwrap();
        assert_eq!(sorted, vec![(1, 'b'), (1, 'd'), (2, 'a'), (2, 'c')]);
    }

    #[test]
    fn test_flatten_depth() {
        let nested = vec![Value::from(1), Value::Array(vec![Value::from(2), Value::Array(ints(&[3]))])];
        assert_eq!(flatten_array(&nested, None), ints(&[1, 2, 3]));
        assert_eq!(
            flatten_array(&nested, Some(1)),
            vec![Value::from(1), Value::from(2), Value::Array(ints(&[3]))]
        );
    }

    #[test]
    fn test_insert_path_builds_arrays_for_numeric_parts() {
        let mut root = Value::Object(Map::new());
        insert_path(&mut root, &["a".to_string(), "0".to_string()], Value::from("x"));
        insert_path(&mut root, &["a".to_string(), "1".to_string()], Value::from("y"));
        let expected: Value = serde_json::json!({ "a": ["x", "y"] }).into();
        assert_eq!(root, expected);
    }
}
