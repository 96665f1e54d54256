//! Run transforms against JSON input

use super::{CliError, parse_transforms};
use crate::engine::{ApplyOptions, Engine};
use crate::output::{to_json, to_json_pretty};
use crate::value::Value;

/// Options for the apply command
#[derive(Debug, Clone, Default)]
pub struct ApplyCommand {
    /// JSON transform dictionary, or a single `(: ... :)` leaf
    pub transforms: String,
    /// JSON input string; `null` is used when absent
    pub input: Option<String>,
    /// Dictionary entry to run instead of `out`
    pub entry: Option<String>,
    pub pretty: bool,
    pub max_depth: Option<usize>,
}

/// Applies the transforms and renders the result as JSON.
pub fn execute_apply(engine: &Engine, command: &ApplyCommand) -> Result<String, CliError> {
    let transforms = parse_transforms(&command.transforms)?;
    let input: Value = match &command.input {
        Some(text) => serde_json::from_str::<serde_json::Value>(text)?.into(),
        None => Value::Null,
    };

    let mut options = ApplyOptions::new();
    if let Some(max_depth) = command.max_depth {
        options = options.max_depth(max_depth);
    }
    let result = engine.apply(&input, &transforms, command.entry.as_deref(), &options)?;

    Ok(if command.pretty {
        to_json_pretty(&result)
    } else {
        to_json(&result)
    })
}
