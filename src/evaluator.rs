//! Expression evaluation.
//!
//! [`EvalContext`] carries everything an expression needs while it runs: the
//! engine (helpers, cache, parser), the resolved options of the current
//! `apply` call, the transform dictionary, the current input and the depth
//! budget left. Helpers receive the context so they can evaluate raw
//! arguments and run nested transforms.

use std::collections::VecDeque;

use crate::ast::{Expr, KeySegment};
use crate::engine::{Engine, Settings};
use crate::error::Result;
use crate::number::NumericMode;
use crate::operators;
use crate::value::Value;

/// Evaluation state for one template walk.
#[derive(Clone, Copy)]
pub struct EvalContext<'a> {
    engine: &'a Engine,
    settings: &'a Settings,
    transforms: &'a Value,
    input: &'a Value,
    depth: usize,
}

impl<'a> EvalContext<'a> {
    pub(crate) fn new(
        engine: &'a Engine,
        settings: &'a Settings,
        transforms: &'a Value,
        input: &'a Value,
        depth: usize,
    ) -> Self {
        EvalContext {
            engine,
            settings,
            transforms,
            input,
            depth,
        }
    }

    pub fn engine(&self) -> &'a Engine {
        self.engine
    }

    /// The data `$` refers to.
    pub fn input(&self) -> &'a Value {
        self.input
    }

    /// The dictionary named sub-transforms are looked up in.
    pub fn transforms(&self) -> &'a Value {
        self.transforms
    }

    /// Depth budget left for nested transforms.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn numeric_mode(&self) -> NumericMode {
        self.settings.numeric_mode
    }

    /// Wraps expression source into template leaf form, e.g. `(: src :)`.
    pub fn quote(&self, source: &str) -> String {
        self.settings.delimiters.quote(source)
    }

    /// The expression inside a template leaf, if `candidate` is one.
    pub fn extract<'s>(&self, candidate: &'s str) -> Option<&'s str> {
        self.settings.delimiters.extract(candidate)
    }

    /// Runs `template` against `input` as a nested transform, using the current
    /// dictionary. A string template is either a delimited expression or the
    /// name of a dictionary entry.
    pub fn transform(&self, input: &Value, template: &Value) -> Result<Value> {
        self.transform_with(input, self.transforms, template)
    }

    /// Like [`transform`](Self::transform), resolving names in `transforms`.
    pub fn transform_with(&self, input: &Value, transforms: &Value, template: &Value) -> Result<Value> {
        self.engine.run_nested(
            self.settings,
            input,
            transforms,
            template,
            self.depth.saturating_sub(1),
        )
    }

    /// Evaluates an expression against the current input.
    pub fn eval(&self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Variable { root, keys } => {
                let root = match root {
                    Some(root) => Some(self.eval(root)?),
                    None => None,
                };
                let data = root.as_ref().unwrap_or(self.input);
                let mut path = Vec::with_capacity(keys.len());
                for key in keys {
                    path.push(self.eval_key(key)?);
                }
                if let Some(filter) = &self.settings.key_filter {
                    path = filter(path, data);
                }
                Ok(lookup_path(data, path))
            }
            Expr::Operation { op, args } => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval(arg)?);
                }
                Ok(operators::apply(*op, values, self.settings.numeric_mode))
            }
            Expr::HelperCall { name, args } => self.engine.helpers().call(self, name, args),
        }
    }

    fn eval_key(&self, key: &KeySegment) -> Result<Value> {
        Ok(match key {
            KeySegment::Key(name) => Value::String(name.clone()),
            KeySegment::Index(index) => Value::from(*index),
            // A one-item list holding a dotted string is split at lookup
            KeySegment::Dotted(path) => Value::Array(vec![Value::String(path.clone())]),
            KeySegment::Computed(expr) => self.eval(expr)?,
        })
    }
}

/// Walks `keys` down from `data`.
///
/// - an array key splices its items in as successive keys; a one-item array
///   holding a dotted string is split at unescaped single dots
/// - arrays accept integer keys and numeric strings, negative ones counting
///   from the end
/// - a lookup through a scalar, or a `null` found at the end, is `undefined`
/// - with no keys at all, `data` itself is returned
pub fn lookup_path(data: &Value, keys: Vec<Value>) -> Value {
    if keys.is_empty() {
        return data.clone();
    }

    let mut pending: VecDeque<Value> = keys.into();
    let mut current = data;
    while let Some(key) = pending.pop_front() {
        let key = match key {
            Value::Array(items) => {
                let mut expanded = match items.as_slice() {
                    [Value::String(path)] => split_path(path),
                    _ => items,
                };
                if expanded.is_empty() {
                    continue;
                }
                let first = expanded.remove(0);
                for rest in expanded.into_iter().rev() {
                    pending.push_front(rest);
                }
                first
            }
            other => other,
        };

        let next = match current {
            Value::Object(map) => map.get(&key.as_string()),
            Value::Array(items) => array_index(&key, items.len()).and_then(|i| items.get(i)),
            _ => return Value::Undefined,
        };
        match next {
            Some(value) => current = value,
            None => return Value::Undefined,
        }
    }

    match current {
        Value::Null => Value::Undefined,
        other => other.clone(),
    }
}

fn array_index(key: &Value, len: usize) -> Option<usize> {
    let index = match key {
        Value::Number(n) => n.as_i64()?,
        Value::String(s) => s.trim().parse::<i64>().ok()?,
        _ => return None,
    };
    if index < 0 {
        let from_end = i64::try_from(len).ok()? + index;
        usize::try_from(from_end).ok()
    } else {
        usize::try_from(index).ok()
    }
}

/// Splits `a.b\.c` into `["a", "b.c"]`. Paths containing `..` are kept
/// whole.
fn split_path(path: &str) -> Vec<Value> {
    if path.contains("..") {
        return vec![Value::String(path.replace('\\', ""))];
    }
    let mut keys = Vec::new();
    let mut current = String::new();
    let mut chars = path.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            }
            '.' => keys.push(Value::String(std::mem::take(&mut current))),
            other => current.push(other),
        }
    }
    keys.push(Value::String(current));
    keys
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Map;

    fn sample() -> Value {
        let mut user = Map::new();
        user.insert("name".to_string(), Value::from("Ada"));
        user.insert("a.b".to_string(), Value::from("dotted"));
        user.insert("gone".to_string(), Value::Null);
        let mut root = Map::new();
        root.insert("user".to_string(), Value::Object(user));
        root.insert(
            "list".to_string(),
            Value::Array(vec![Value::from(10), Value::from(20), Value::from(30)]),
        );
        Value::Object(root)
    }

    fn dotted(path: &str) -> Vec<Value> {
        vec![Value::Array(vec![Value::from(path)])]
    }

    #[test]
    fn test_dotted_paths() {
        assert_eq!(lookup_path(&sample(), dotted("user.name")), Value::from("Ada"));
        assert_eq!(lookup_path(&sample(), dotted(r"user.a\.b")), Value::from("dotted"));
    }

    #[test]
    fn test_array_indexes() {
        let data = sample();
        assert_eq!(lookup_path(&data, vec![Value::from("list"), Value::from(-1)]), Value::from(30));
        assert_eq!(lookup_path(&data, vec![Value::from("list"), Value::from("1")]), Value::from(20));
        assert_eq!(lookup_path(&data, vec![Value::from("list"), Value::from(9)]), Value::Undefined);
    }

    #[test]
    fn test_null_and_scalars_read_as_undefined() {
        let data = sample();
        assert_eq!(lookup_path(&data, dotted("user.gone")), Value::Undefined);
        assert_eq!(lookup_path(&data, dotted("user.name.first")), Value::Undefined);
    }

    #[test]
    fn test_no_keys_returns_data() {
        assert_eq!(lookup_path(&Value::Null, vec![]), Value::Null);
        assert_eq!(lookup_path(&Value::from(5), vec![]), Value::from(5));
    }

    #[test]
    fn test_spliced_keys() {
        let keys = vec![Value::Array(vec![Value::from("list"), Value::from(0)])];
        assert_eq!(lookup_path(&sample(), keys), Value::from(10));
    }
}
