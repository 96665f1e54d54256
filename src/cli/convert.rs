//! Reading documents and settings for the command line

use std::fs;
use std::path::Path;

use super::CliError;
use crate::engine::EngineConfig;
use crate::transform::{DefaultDelimiters, Delimiters};
use crate::value::Value;

/// The text of `source`, read from disk when it names an existing file.
pub fn read_source(source: &str) -> Result<String, CliError> {
    let path = Path::new(source);
    if path.is_file() {
        Ok(fs::read_to_string(path)?)
    } else {
        Ok(source.to_string())
    }
}

/// Parses a transform argument. A bare `(: ... :)` leaf is accepted as a
/// one-off template; anything else must be JSON.
pub fn parse_transforms(text: &str) -> Result<Value, CliError> {
    let trimmed = text.trim();
    if DefaultDelimiters.extract(trimmed).is_some() {
        return Ok(Value::String(trimmed.to_string()));
    }
    let json: serde_json::Value = serde_json::from_str(text)?;
    Ok(json.into())
}

/// Reads an engine configuration from a JSON file. Missing fields keep
/// their defaults.
pub fn load_config(path: &Path) -> Result<EngineConfig, CliError> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_leaf() {
        let value = parse_transforms(" (: $a + 1 :) ").unwrap();
        assert_eq!(value, Value::from("(: $a + 1 :)"));
    }

    #[test]
    fn test_parse_dictionary() {
        let value = parse_transforms(r#"{"out": "(: $a :)"}"#).unwrap();
        assert!(value.as_object().is_some_and(|map| map.contains_key("out")));
        assert!(matches!(parse_transforms("{oops"), Err(CliError::Json(_))));
    }
}
