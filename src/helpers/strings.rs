//! String, regular expression and JSON helpers.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

use super::{HelperDef, HelperRegistry, arg, int_arg};
use crate::error::Error;
use crate::output::{to_json, to_json_pretty};
use crate::value::{Pattern, TypeTag, Value};

/// `/source/flags` or `#source#flags` written inside a string.
static DELIMITED_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:/(.*)/|#(.*)#)([gimsxy]*)$").expect("delimited pattern compiles")
});

/// A pattern that matches nothing.
const NEVER_MATCHES: &str = r"[^\s\S]";

/// How a search argument matches text.
///
/// Regex values, `/re/flags` strings, `#re#flags` strings and `[source,
/// flags]` pairs are regular expressions. Any other string is matched
/// literally. Values that cannot describe a pattern never match.
pub(crate) enum Matcher {
    Regex { regex: Regex, global: bool },
    Literal(String),
    Never,
}

impl Matcher {
    pub(crate) fn from_value(value: &Value) -> Matcher {
        match value {
            Value::Regex(pattern) => Matcher::Regex {
                regex: pattern.regex().clone(),
                global: pattern.is_global(),
            },
            Value::String(text) => match DELIMITED_PATTERN.captures(text) {
                Some(caps) => {
                    let source = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
                    let flags = caps.get(3).map_or("", |m| m.as_str());
                    Self::compiled(source, flags)
                }
                None => Matcher::Literal(text.clone()),
            },
            Value::Array(parts) => match parts.first() {
                Some(source) => Self::compiled(&source.as_string(), &flags_of(parts.get(1))),
                None => Matcher::Never,
            },
            _ => Matcher::Never,
        }
    }

    fn compiled(source: &str, flags: &str) -> Matcher {
        match Pattern::new(source, flags) {
            Ok(pattern) => Matcher::Regex {
                regex: pattern.regex().clone(),
                global: pattern.is_global(),
            },
            Err(_) => Matcher::Never,
        }
    }

    /// Splits `text` at every match.
    pub(crate) fn split(&self, text: &str) -> Vec<String> {
        match self {
            Matcher::Regex { regex, .. } => regex.split(text).map(str::to_string).collect(),
            Matcher::Literal(separator) if separator.is_empty() => {
                text.chars().map(String::from).collect()
            }
            Matcher::Literal(separator) => text.split(separator.as_str()).map(str::to_string).collect(),
            Matcher::Never => vec![text.to_string()],
        }
    }

    /// Replaces the first match, or every match of a global regex.
    /// `$1`-style references in `replacement` refer to capture groups.
    fn replace<'t>(&self, text: &'t str, replacement: &str) -> Cow<'t, str> {
        match self {
            Matcher::Regex { regex, global: true } => regex.replace_all(text, replacement),
            Matcher::Regex { regex, global: false } => regex.replace(text, replacement),
            Matcher::Literal(search) => Cow::Owned(text.replacen(search.as_str(), replacement, 1)),
            Matcher::Never => Cow::Borrowed(text),
        }
    }
}

fn flags_of(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Undefined | Value::Null) => String::new(),
        Some(flags) => flags.as_string(),
    }
}

pub(super) fn register(registry: &mut HelperRegistry) {
    registry.register(
        HelperDef::new("lc")
            .on(TypeTag::String, |_, args| Ok(Value::String(arg(&args, 0).as_string().to_lowercase())))
            .coerce(&[TypeTag::String])
            .meta(
                "lc( $string )",
                "The string in lowercase",
                "Returns a new string with every character converted to lowercase.",
            ),
    );

    registry.register(
        HelperDef::new("uc")
            .on(TypeTag::String, |_, args| Ok(Value::String(arg(&args, 0).as_string().to_uppercase())))
            .coerce(&[TypeTag::String])
            .meta(
                "uc( $string )",
                "The string in uppercase",
                "Returns a new string with every character converted to uppercase.",
            ),
    );

    registry.register(
        HelperDef::new("capitalize")
            .on(TypeTag::String, |_, args| {
                let text = arg(&args, 0).as_string();
                let mut chars = text.chars();
                let capitalized = match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                    None => String::new(),
                };
                Ok(Value::String(capitalized))
            })
            .coerce(&[TypeTag::String])
            .meta(
                "capitalize( $string )",
                "The string with its first character in uppercase",
                "Returns a new string with the first character converted to uppercase.",
            ),
    );

    registry.register(
        HelperDef::new("split")
            .on(TypeTag::String, |_, args| {
                let text = arg(&args, 0).as_string();
                let parts = Matcher::from_value(arg(&args, 1))
                    .split(&text)
                    .into_iter()
                    .map(Value::String)
                    .collect();
                Ok(Value::Array(parts))
            })
            .any(|_, args| Ok(arg(&args, 0).clone()))
            .meta(
                "split( $string $separator )",
                "The pieces of the string",
                "Splits the string at every occurrence of $separator, a plain string or a \
                 regular expression.",
            ),
    );

    registry.register(
        HelperDef::new("join")
            .on(TypeTag::Array, |_, args| {
                let separator = match arg(&args, 1) {
                    Value::Undefined => ",".to_string(),
                    other => other.as_string(),
                };
                let joined = arg(&args, 0)
                    .as_array()
                    .unwrap_or_default()
                    .iter()
                    .map(|item| if item.is_nullish() { String::new() } else { item.as_string() })
                    .collect::<Vec<_>>()
                    .join(&separator);
                Ok(Value::String(joined))
            })
            .any(|_, args| Ok(arg(&args, 0).clone()))
            .meta(
                "join( $array $separator )",
                "The items joined into one string",
                "Joins the string forms of the items with $separator between them (`,` when \
                 not given).",
            ),
    );

    registry.register(
        HelperDef::new("substr")
            .on(TypeTag::String, |_, args| {
                let chars: Vec<char> = arg(&args, 0).as_string().chars().collect();
                let len = chars.len() as i64;
                let clamp = |pos: i64| pos.clamp(0, len) as usize;
                let start = clamp(int_arg(&args, 1).unwrap_or(0));
                let end = clamp(int_arg(&args, 2).unwrap_or(len));
                let (start, end) = if start > end { (end, start) } else { (start, end) };
                Ok(Value::String(chars[start..end].iter().collect()))
            })
            .any(|_, _| Ok(Value::Undefined))
            .meta(
                "substr( $string $start $end )",
                "The characters from $start up to $end",
                "Returns the part of the string from offset $start up to, not including, \
                 offset $end. Offsets are clamped to the string and swapped when reversed.",
            ),
    );

    registry.register(
        HelperDef::new("replace")
            .on(TypeTag::String, |_, args| {
                let text = arg(&args, 0).as_string();
                let replacement = arg(&args, 2).as_string();
                let replaced = Matcher::from_value(arg(&args, 1)).replace(&text, &replacement);
                Ok(Value::String(replaced.into_owned()))
            })
            .any(|_, _| Ok(Value::String(String::new())))
            .meta(
                "replace( $string $search $replacement )",
                "The string with $search replaced",
                "Replaces the first occurrence of $search. Use a regular expression with the \
                 `g` flag, such as /a/g, to replace every occurrence.",
            ),
    );

    registry.register(
        HelperDef::new("match")
            .on(TypeTag::String, |_, args| {
                let text = arg(&args, 0).as_string();
                // A plain string is read as a pattern here
                let matcher = match Matcher::from_value(arg(&args, 1)) {
                    Matcher::Literal(source) => Matcher::compiled(&source, ""),
                    other => other,
                };
                Ok(Value::Array(match_all(&matcher, &text)))
            })
            .any(|_, _| Ok(Value::Array(Vec::new())))
            .meta(
                "match( $string $search )",
                "The matched portions of the string",
                "Matches the string against $search. The result holds the matched text \
                 followed by each capture, or every match for a global pattern, or is empty \
                 when nothing matched.",
            ),
    );

    registry.register(
        HelperDef::new("regex")
            .on(TypeTag::String, |_, args| {
                let source = arg(&args, 0).as_string();
                let flags = flags_of(args.get(1));
                Pattern::new(&source, &flags)
                    .map(Value::Regex)
                    .map_err(|e| Error::helper("regex", e.to_string()))
            })
            .on(TypeTag::Regex, |_, args| {
                let Value::Regex(existing) = arg(&args, 0) else {
                    return Ok(Value::Undefined);
                };
                let flags = match args.get(1) {
                    None | Some(Value::Undefined) => existing.flags().to_string(),
                    flags => flags_of(flags),
                };
                Pattern::new(existing.source(), &flags)
                    .map(Value::Regex)
                    .map_err(|e| Error::helper("regex", e.to_string()))
            })
            .on(TypeTag::Object, |_, _| {
                Pattern::new(NEVER_MATCHES, "")
                    .map(Value::Regex)
                    .map_err(|e| Error::helper("regex", e.to_string()))
            })
            .meta(
                "regex( $pattern [ $flags ] )",
                "A regular expression built from the pattern and flags",
                "Creates a regular expression at run time, usable anywhere a literal /re/ is. \
                 An invalid pattern is an error.",
            ),
    );

    registry.register(
        HelperDef::new("escape")
            .on(TypeTag::String, |_, args| {
                let text = arg(&args, 0).as_string();
                let escaped = match arg(&args, 1) {
                    Value::Undefined => text.replace('.', r"\."),
                    characters => match Regex::new(&characters.as_string()) {
                        Ok(re) => re.replace_all(&text, r"\$0").into_owned(),
                        Err(_) => text,
                    },
                };
                Ok(Value::String(escaped))
            })
            .any(|_, args| Ok(arg(&args, 0).clone()))
            .meta(
                "escape( $string [ $characters ] )",
                "The string with special characters prefixed by \\",
                "Escapes the dots in a string so it can be used as a single key in a path. \
                 $characters, a pattern, selects other characters to escape.",
            ),
    );

    registry.register(
        HelperDef::new("explode")
            .on(TypeTag::String, |_, args| {
                let chars = arg(&args, 0)
                    .as_string()
                    .chars()
                    .map(|c| Value::String(c.to_string()))
                    .collect();
                Ok(Value::Array(chars))
            })
            .meta(
                "explode( $string )",
                "The characters of the string as an array",
                "Returns an array holding each character of the string.",
            ),
    );

    registry.register(
        HelperDef::new("to_json")
            .any(|_, args| {
                let pretty = matches!(arg(&args, 1), Value::String(s) if s == "pretty")
                    || matches!(arg(&args, 1), Value::Boolean(true));
                let mut value = arg(&args, 0).clone().normalized(arg(&args, 3).is_truthy());
                if arg(&args, 2).is_truthy() {
                    value = undefined_to_null(value);
                }
                let json = if pretty { to_json_pretty(&value) } else { to_json(&value) };
                Ok(Value::String(json))
            })
            .handles_decimals()
            .meta(
                "to_json( $value [ $pretty ] [ $preserve_undefined ] [ $decimals_as_strings ] )",
                "The value encoded as a JSON string",
                "Encodes the value as JSON, indented when $pretty is true or 'pretty'. With \
                 $preserve_undefined, undefined values are written as null.",
            ),
    );

    registry.register(
        HelperDef::new("from_json")
            .on(TypeTag::String, |_, args| {
                let text = arg(&args, 0).as_string();
                Ok(match serde_json::from_str::<serde_json::Value>(&text) {
                    Ok(json) => Value::from(json),
                    Err(_) => Value::String(String::new()),
                })
            })
            .meta(
                "from_json( $json_string )",
                "The value described by the JSON string",
                "Parses the string as JSON. Invalid JSON gives an empty string.",
            ),
    );
}

fn match_all(matcher: &Matcher, text: &str) -> Vec<Value> {
    let Matcher::Regex { regex, global } = matcher else {
        return Vec::new();
    };
    if *global {
        return regex
            .find_iter(text)
            .map(|m| Value::from(m.as_str()))
            .collect();
    }
    match regex.captures(text) {
        Some(caps) => caps
            .iter()
            .map(|group| group.map_or(Value::Undefined, |m| Value::from(m.as_str())))
            .collect(),
        None => Vec::new(),
    }
}

fn undefined_to_null(value: Value) -> Value {
    match value {
        Value::Undefined => Value::Null,
        Value::Array(items) => Value::Array(items.into_iter().map(undefined_to_null).collect()),
        Value::Object(map) => Value::Object(map.into_iter().map(|(k, v)| (k, undefined_to_null(v))).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matcher_from_delimited_strings() {
        let slashes = Matcher::from_value(&Value::from("/a+/g"));
        assert!(matches!(slashes, Matcher::Regex { global: true, .. }));
        let hashes = Matcher::from_value(&Value::from("#b#i"));
        assert!(matches!(hashes, Matcher::Regex { global: false, .. }));
        assert!(matches!(Matcher::from_value(&Value::from("a.b")), Matcher::Literal(_)));
        assert!(matches!(Matcher::from_value(&Value::from(5)), Matcher::Never));
    }

    #[test]
    fn test_literal_replace_is_first_only() {
        let matcher = Matcher::from_value(&Value::from("a"));
        assert_eq!(matcher.replace("banana", "o"), "bonana");
        let global = Matcher::from_value(&Value::from("/a/g"));
        assert_eq!(global.replace("banana", "o"), "bonono");
    }

    #[test]
    fn test_split_variants() {
        assert_eq!(Matcher::from_value(&Value::from(",")).split("a,b"), vec!["a", "b"]);
        assert_eq!(Matcher::from_value(&Value::from("/\\s+/")).split("a  b"), vec!["a", "b"]);
        assert_eq!(Matcher::Never.split("a,b"), vec!["a,b"]);
    }

    #[test]
    fn test_never_pattern_matches_nothing() {
        let never = Pattern::new(NEVER_MATCHES, "").unwrap();
        assert!(!never.is_match("anything"));
        assert!(!never.is_match(""));
    }
}
