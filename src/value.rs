use std::fmt;

use indexmap::IndexMap;
use regex::{Regex, RegexBuilder};

use crate::number::{Number, is_numeric_text};
use crate::output::to_json;

/// Ordered object storage. Keys keep the order they were inserted in.
pub type Map = IndexMap<String, Value>;

/// A runtime value of the transformation language.
///
/// This covers every JSON type plus three additions the language needs:
/// `Undefined` for missing data (distinct from `null`), exact decimal numbers
/// inside [`Number`], and compiled regular expressions.
///
/// # Examples
///
/// ```
/// use sprig_lang::{Map, Value};
///
/// let mut obj = Map::new();
/// obj.insert("name".to_string(), Value::from("Alice"));
/// obj.insert("tags".to_string(), Value::Array(vec![Value::from(1), Value::from(2)]));
/// let object = Value::Object(obj);
///
/// assert!(object.is_truthy());
/// assert!(!Value::Undefined.is_truthy());
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Missing data: an absent key, an out of range index, a failed lookup
    #[default]
    Undefined,

    /// JSON null
    Null,

    /// JSON boolean (true/false)
    Boolean(bool),

    /// Integer, float or exact decimal
    Number(Number),

    /// UTF-8 string
    String(String),

    /// Array of values (homogeneous or heterogeneous)
    Array(Vec<Value>),

    /// Object with insertion-ordered keys
    Object(Map),

    /// Compiled regular expression
    Regex(Pattern),
}

/// The runtime type of a value, used to pick helper overloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TypeTag {
    Undefined,
    Null,
    Boolean,
    Number,
    String,
    Array,
    Object,
    Regex,
}

impl TypeTag {
    pub const ALL: [TypeTag; 8] = [
        TypeTag::Undefined,
        TypeTag::Null,
        TypeTag::Boolean,
        TypeTag::Number,
        TypeTag::String,
        TypeTag::Array,
        TypeTag::Object,
        TypeTag::Regex,
    ];

    pub fn of(value: &Value) -> TypeTag {
        match value {
            Value::Undefined => TypeTag::Undefined,
            Value::Null => TypeTag::Null,
            Value::Boolean(_) => TypeTag::Boolean,
            Value::Number(_) => TypeTag::Number,
            Value::String(_) => TypeTag::String,
            Value::Array(_) => TypeTag::Array,
            Value::Object(_) => TypeTag::Object,
            Value::Regex(_) => TypeTag::Regex,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TypeTag::Undefined => "undefined",
            TypeTag::Null => "null",
            TypeTag::Boolean => "boolean",
            TypeTag::Number => "number",
            TypeTag::String => "string",
            TypeTag::Array => "array",
            TypeTag::Object => "object",
            TypeTag::Regex => "regex",
        }
    }

    pub fn from_name(name: &str) -> Option<TypeTag> {
        TypeTag::ALL.into_iter().find(|tag| tag.name() == name)
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Value {
    pub fn type_tag(&self) -> TypeTag {
        TypeTag::of(self)
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// `Undefined` or `Null`
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    /// Check if the value is truthy (for conditions)
    ///
    /// Empty arrays and objects are truthy; only `undefined`, `null`, `false`,
    /// zero, NaN and the empty string are not.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Boolean(b) => *b,
            Value::Number(n) => !n.is_zero() && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) | Value::Regex(_) => true,
        }
    }

    /// A number, or a string holding plain decimal text.
    pub fn is_numeric_like(&self) -> bool {
        match self {
            Value::Number(_) => true,
            Value::String(s) => is_numeric_text(s),
            _ => false,
        }
    }

    pub fn as_number(&self) -> Option<Number> {
        match self {
            Value::Number(n) => Some(*n),
            Value::String(s) if is_numeric_text(s) => Number::parse(s),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Map> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    /// String form used for concatenation, object keys and set membership.
    ///
    /// Arrays join their items with `,`, objects render as compact JSON and
    /// regular expressions as `/source/flags`.
    pub fn as_string(&self) -> String {
        match self {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            Value::String(s) => s.clone(),
            Value::Array(items) => items
                .iter()
                .map(|item| if item.is_nullish() { String::new() } else { item.as_string() })
                .collect::<Vec<_>>()
                .join(","),
            Value::Object(_) => to_json(self),
            Value::Regex(p) => p.to_string(),
        }
    }

    /// Replaces a top-level exact decimal with its native number.
    pub fn demoted(self) -> Value {
        match self {
            Value::Number(n) => Value::Number(n.to_native()),
            other => other,
        }
    }

    /// Deep-converts every exact decimal in the tree into a native number, or
    /// into its decimal text when `as_strings` is set. `null` and regular
    /// expressions are left untouched. Applying it twice changes nothing.
    pub fn normalized(self, as_strings: bool) -> Value {
        match self {
            Value::Number(Number::Decimal(d)) if as_strings => Value::String(d.normalize().to_string()),
            Value::Number(n) => Value::Number(n.to_native()),
            Value::Array(items) => Value::Array(
                items
                    .into_iter()
                    .map(|item| item.normalized(as_strings))
                    .collect(),
            ),
            Value::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(k, v)| (k, v.normalized(as_strings)))
                    .collect(),
            ),
            other => other,
        }
    }

    /// True when the tree still holds an exact decimal anywhere.
    pub fn contains_exact(&self) -> bool {
        match self {
            Value::Number(n) => n.is_exact(),
            Value::Array(items) => items.iter().any(Value::contains_exact),
            Value::Object(map) => map.values().any(Value::contains_exact),
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Number(Number::Integer(value))
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Number(Number::Integer(value.into()))
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        match i64::try_from(value) {
            Ok(i) => Value::Number(Number::Integer(i)),
            Err(_) => Value::Number(Number::Float(value as f64)),
        }
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(Number::from_f64(value))
    }
}

impl From<Number> for Value {
    fn from(value: Number) -> Self {
        Value::Number(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::Array(value)
    }
}

impl From<Map> for Value {
    fn from(value: Map) -> Self {
        Value::Object(value)
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Number(Number::Integer(i)),
                None => Value::Number(Number::Float(n.as_f64().unwrap_or(f64::NAN))),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<Value> for serde_json::Value {
    /// Undefined object entries are dropped, undefined array items and
    /// non-finite floats become `null`, regular expressions become `{}`.
    fn from(value: Value) -> Self {
        match value {
            Value::Undefined | Value::Null => serde_json::Value::Null,
            Value::Boolean(b) => serde_json::Value::Bool(b),
            Value::Number(n) => match n.to_native() {
                Number::Integer(i) => serde_json::Value::Number(i.into()),
                other => serde_json::Number::from_f64(other.to_f64())
                    .map(serde_json::Value::Number)
                    .unwrap_or(serde_json::Value::Null),
            },
            Value::String(s) => serde_json::Value::String(s),
            Value::Array(items) => {
                serde_json::Value::Array(items.into_iter().map(serde_json::Value::from).collect())
            }
            Value::Object(map) => serde_json::Value::Object(
                map.into_iter()
                    .filter(|(_, v)| !v.is_undefined())
                    .map(|(k, v)| (k, serde_json::Value::from(v)))
                    .collect(),
            ),
            Value::Regex(_) => serde_json::Value::Object(serde_json::Map::new()),
        }
    }
}

// ============================================================================
// Regular expressions
// ============================================================================

/// A compiled regular expression together with the source and flags it was
/// written with.
///
/// Flags follow the usual letters: `i` (case insensitive), `m` (multi-line),
/// `s` (dot matches newline), `x` (ignore whitespace) and `g` (global, used
/// by replacing and matching helpers). Unknown flags are ignored.
#[derive(Debug, Clone)]
pub struct Pattern {
    regex: Regex,
    source: String,
    flags: String,
}

impl Pattern {
    pub fn new(source: &str, flags: &str) -> Result<Pattern, regex::Error> {
        let regex = RegexBuilder::new(source)
            .case_insensitive(flags.contains('i'))
            .multi_line(flags.contains('m'))
            .dot_matches_new_line(flags.contains('s'))
            .ignore_whitespace(flags.contains('x'))
            .build()?;
        Ok(Pattern {
            regex,
            source: source.to_string(),
            flags: flags.to_string(),
        })
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn flags(&self) -> &str {
        &self.flags
    }

    pub fn is_global(&self) -> bool {
        self.flags.contains('g')
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source && self.flags == other.flags
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/{}", self.source, self.flags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn decimal(text: &str) -> Value {
        Value::Number(Number::Decimal(Decimal::from_str(text).unwrap()))
    }

    #[test]
    fn test_truthiness() {
        assert!(Value::Array(vec![]).is_truthy());
        assert!(Value::Object(Map::new()).is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(!Value::from(0).is_truthy());
        assert!(!decimal("0.00").is_truthy());
        assert!(!Value::Null.is_truthy());
    }

    #[test]
    fn test_normalize_recurses_and_is_idempotent() {
        let mut inner = Map::new();
        inner.insert("price".to_string(), decimal("10.50"));
        inner.insert("missing".to_string(), Value::Null);
        let tree = Value::Array(vec![decimal("3"), Value::Object(inner)]);

        let once = tree.normalized(false);
        assert!(!once.contains_exact());
        assert_eq!(once.clone().normalized(false), once);

        let Value::Array(items) = &once else { panic!("expected array") };
        assert_eq!(items[0], Value::Number(Number::Integer(3)));
        assert_eq!(items[1].as_object().unwrap()["missing"], Value::Null);
    }

    #[test]
    fn test_normalize_to_strings() {
        assert_eq!(decimal("0.30").normalized(true), Value::from("0.3"));
    }

    #[test]
    fn test_as_string() {
        let list = Value::Array(vec![Value::from(1), Value::Null, Value::from("a")]);
        assert_eq!(list.as_string(), "1,,a");
        assert_eq!(Value::from(2.5).as_string(), "2.5");
    }

    #[test]
    fn test_deep_equality_ignores_key_order() {
        let mut a = Map::new();
        a.insert("x".to_string(), Value::from(1));
        a.insert("y".to_string(), Value::from(2));
        let mut b = Map::new();
        b.insert("y".to_string(), Value::from(2));
        b.insert("x".to_string(), Value::from(1));
        assert_eq!(Value::Object(a), Value::Object(b));
    }

    #[test]
    fn test_json_conversion_drops_undefined_entries() {
        let mut map = Map::new();
        map.insert("kept".to_string(), Value::from(1));
        map.insert("gone".to_string(), Value::Undefined);
        let json = serde_json::Value::from(Value::Object(map));
        assert_eq!(json, serde_json::json!({ "kept": 1 }));
    }

    #[test]
    fn test_pattern_flags() {
        let pattern = Pattern::new("^abc$", "ig").unwrap();
        assert!(pattern.is_match("ABC"));
        assert!(pattern.is_global());
        assert_eq!(pattern.to_string(), "/^abc$/ig");
    }
}
