//! JSON text for sprig values.
//!
//! Both compact and pretty-printed output are supported. Object keys keep
//! their insertion order, so a template's output reads in the order the
//! template was written.
//!
//! Values without a JSON form are rendered the way a JSON encoder in a
//! browser would: `undefined` object entries are left out, `undefined` array
//! items and non-finite numbers become `null`, and regular expressions
//! become `{}`. Exact decimals are written with their full precision.
//!
//! # Examples
//!
//! ```
//! use sprig_lang::Value;
//! use sprig_lang::output::{to_json, to_json_pretty};
//!
//! let value = Value::from(42);
//!
//! assert_eq!(to_json(&value), "42");
//! assert_eq!(to_json_pretty(&value), "42");
//! ```

use crate::number::Number;
use crate::value::{Map, Value};

pub struct JsonPrinter {
    pretty: bool,
}

impl JsonPrinter {
    pub fn new(pretty: bool) -> Self {
        JsonPrinter { pretty }
    }

    pub fn print(&self, value: &Value) -> String {
        let mut out = String::new();
        self.print_value(value, 0, &mut out);
        out
    }

    fn print_value(&self, value: &Value, indent: usize, out: &mut String) {
        match value {
            Value::Undefined | Value::Null => out.push_str("null"),
            Value::Boolean(b) => out.push_str(if *b { "true" } else { "false" }),
            Value::Number(n) => self.print_number(n, out),
            Value::String(s) => self.print_string(s, out),
            Value::Array(items) => self.print_array(items, indent, out),
            Value::Object(map) => self.print_object(map, indent, out),
            Value::Regex(_) => out.push_str("{}"),
        }
    }

    fn print_number(&self, number: &Number, out: &mut String) {
        match number {
            Number::Float(x) if !x.is_finite() => out.push_str("null"),
            n => out.push_str(&n.to_string()),
        }
    }

    fn print_array(&self, items: &[Value], indent: usize, out: &mut String) {
        if items.is_empty() {
            out.push_str("[]");
            return;
        }

        out.push('[');
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            self.newline(indent + 1, out);
            self.print_value(item, indent + 1, out);
        }
        self.newline(indent, out);
        out.push(']');
    }

    fn print_object(&self, map: &Map, indent: usize, out: &mut String) {
        let mut entries = map.iter().filter(|(_, v)| !v.is_undefined()).peekable();
        if entries.peek().is_none() {
            out.push_str("{}");
            return;
        }

        out.push('{');
        for (i, (key, value)) in entries.enumerate() {
            if i > 0 {
                out.push(',');
            }
            self.newline(indent + 1, out);
            self.print_string(key, out);
            out.push_str(if self.pretty { ": " } else { ":" });
            self.print_value(value, indent + 1, out);
        }
        self.newline(indent, out);
        out.push('}');
    }

    fn newline(&self, level: usize, out: &mut String) {
        if self.pretty {
            out.push('\n');
            out.push_str(&"  ".repeat(level));
        }
    }

    fn print_string(&self, s: &str, out: &mut String) {
        out.push('"');
        out.push_str(&escape_string(s));
        out.push('"');
    }
}

/// Escapes a string for use between JSON double quotes.
pub fn escape_string(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            '\u{08}' => escaped.push_str("\\b"),
            '\u{0c}' => escaped.push_str("\\f"),
            c if c.is_control() => escaped.push_str(&format!("\\u{:04x}", c as u32)),
            c => escaped.push(c),
        }
    }
    escaped
}

// Convenience functions

/// Converts a value to compact JSON.
///
/// ```
/// use sprig_lang::Value;
/// use sprig_lang::output::to_json;
///
/// let value = Value::from(serde_json::json!({"name": "Ada", "age": 36}));
/// assert_eq!(to_json(&value), r#"{"name":"Ada","age":36}"#);
/// ```
pub fn to_json(value: &Value) -> String {
    JsonPrinter::new(false).print(value)
}

/// Converts a value to JSON with 2-space indentation and one element or
/// property per line.
///
/// ```
/// use sprig_lang::Value;
/// use sprig_lang::output::to_json_pretty;
///
/// let value = Value::from(serde_json::json!({"tags": ["a", "b"]}));
/// assert_eq!(to_json_pretty(&value), "{\n  \"tags\": [\n    \"a\",\n    \"b\"\n  ]\n}");
/// ```
pub fn to_json_pretty(value: &Value) -> String {
    JsonPrinter::new(true).print(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    #[test]
    fn test_undefined_entries_are_dropped() {
        let mut map = Map::new();
        map.insert("a".to_string(), Value::from(1));
        map.insert("gone".to_string(), Value::Undefined);
        let value = Value::Array(vec![Value::Object(map), Value::Undefined]);
        assert_eq!(to_json(&value), r#"[{"a":1},null]"#);
    }

    #[test]
    fn test_keys_keep_insertion_order() {
        let mut map = Map::new();
        map.insert("z".to_string(), Value::from(1));
        map.insert("a".to_string(), Value::from(2));
        assert_eq!(to_json(&Value::Object(map)), r#"{"z":1,"a":2}"#);
    }

    #[test]
    fn test_special_values() {
        assert_eq!(to_json(&Value::from(f64::NAN)), "null");
        let decimal = Decimal::from_str("0.30000000000000000001").unwrap();
        assert_eq!(to_json(&Value::Number(Number::Decimal(decimal))), "0.30000000000000000001");
        assert_eq!(to_json(&Value::from("a\"b\n")), r#""a\"b\n""#);
    }
}
