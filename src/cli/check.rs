//! Syntax checking for single expressions

use super::CliError;
use crate::engine::Engine;
use crate::transform::{DefaultDelimiters, Delimiters};

/// Result of a check operation
#[derive(Debug, Clone, PartialEq)]
pub enum CheckResult {
    Valid,
    /// The rendered parse error, with the offending line and a caret marker
    Invalid(String),
}

/// Parses `expression`, with or without its `(: :)` delimiters. The parse
/// error itself is the result, so callers decide how to report it.
pub fn execute_check(engine: &Engine, expression: &str) -> Result<CheckResult, CliError> {
    let trimmed = expression.trim();
    let source = DefaultDelimiters.extract(trimmed).unwrap_or(expression);
    match engine.parser().parse(source) {
        Ok(_) => Ok(CheckResult::Valid),
        Err(e) => Ok(CheckResult::Invalid(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_valid() {
        let engine = Engine::new();
        assert_eq!(execute_check(&engine, "$a + 1").unwrap(), CheckResult::Valid);
        assert_eq!(execute_check(&engine, "(: map($items 'row') :)").unwrap(), CheckResult::Valid);
    }

    #[test]
    fn test_check_reports_caret() {
        let engine = Engine::new();
        let CheckResult::Invalid(message) = execute_check(&engine, "$a + * 2").unwrap() else {
            panic!("expected a parse error");
        };
        assert!(message.starts_with("Error while parsing:"));
        assert!(message.contains('^'));
    }
}
