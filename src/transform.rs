//! Template walking.
//!
//! A transform template is any value. Arrays and objects are rebuilt with
//! every element (object *values* only, never keys) walked in turn; strings
//! that are expression leaves are parsed and evaluated against the current
//! input; everything else is copied unchanged.

use crate::error::Result;
use crate::evaluator::EvalContext;
use crate::value::{Map, Value};

/// Recognizes expression leaves in templates and builds them back.
pub trait Delimiters: Send + Sync {
    /// The expression source inside `candidate`, if it is a leaf.
    fn extract<'s>(&self, candidate: &'s str) -> Option<&'s str>;

    /// Wraps expression source into a leaf.
    fn quote(&self, source: &str) -> String;
}

/// Leaves written as `(: expression :)`.
///
/// # Examples
///
/// ```
/// use sprig_lang::transform::{DefaultDelimiters, Delimiters};
///
/// let delimiters = DefaultDelimiters;
/// assert_eq!(delimiters.extract("(: $a + 1 :)"), Some(" $a + 1 "));
/// assert_eq!(delimiters.extract("plain text"), None);
/// assert_eq!(delimiters.quote("$a"), "(: $a :)");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultDelimiters;

impl Delimiters for DefaultDelimiters {
    fn extract<'s>(&self, candidate: &'s str) -> Option<&'s str> {
        candidate.strip_prefix("(:")?.strip_suffix(":)")
    }

    fn quote(&self, source: &str) -> String {
        format!("(: {} :)", source)
    }
}

/// Walks `template` against the context's input.
pub fn walk(ctx: &EvalContext<'_>, template: &Value) -> Result<Value> {
    match template {
        Value::String(text) => match ctx.extract(text) {
            Some(source) => {
                let engine = ctx.engine();
                let expr = engine.cache().find_or_parse(source, engine.parser())?;
                ctx.eval(&expr)
            }
            None => Ok(template.clone()),
        },
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(walk(ctx, item)?);
            }
            Ok(Value::Array(out))
        }
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, value) in map {
                out.insert(key.clone(), walk(ctx, value)?);
            }
            Ok(Value::Object(out))
        }
        other => Ok(other.clone()),
    }
}

/// Finds a named entry in a transform dictionary. An exact key match wins;
/// otherwise a dotted name descends into nested objects.
pub fn find_entry<'t>(transforms: &'t Value, name: &str) -> Option<&'t Value> {
    let Value::Object(map) = transforms else {
        return None;
    };
    if let Some(entry) = map.get(name) {
        return Some(entry);
    }
    let mut current = transforms;
    for part in name.split('.') {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_requires_both_delimiters() {
        assert_eq!(DefaultDelimiters.extract("(:$a:)"), Some("$a"));
        assert_eq!(DefaultDelimiters.extract("(: $a"), None);
        assert_eq!(DefaultDelimiters.extract("$a :)"), None);
        assert_eq!(DefaultDelimiters.extract("(:)"), None);
    }

    #[test]
    fn test_find_entry() {
        let transforms: Value = serde_json::json!({
            "out": "(: 1 :)",
            "parts": { "name": "(: 2 :)" },
            "a.b": "(: 3 :)"
        })
        .into();
        assert_eq!(find_entry(&transforms, "a.b"), Some(&Value::from("(: 3 :)")));
        assert_eq!(find_entry(&transforms, "parts.name"), Some(&Value::from("(: 2 :)")));
        assert_eq!(find_entry(&transforms, "missing"), None);
    }
}
