//! CLI support for sprig-lang
//!
//! Provides programmatic access to the `sprig` command so other tools can
//! embed it.

mod apply;
mod check;
mod convert;
mod docs;

pub use apply::{ApplyCommand, execute_apply};
pub use check::{CheckResult, execute_check};
pub use convert::{load_config, parse_transforms, read_source};
pub use docs::{helper_listing, helper_page};

use std::io;

use thiserror::Error;

/// Errors that can occur during CLI operations
#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Sprig(#[from] crate::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Unknown helper: '{0}'\nRun 'sprig helpers' to see available helpers.")]
    UnknownHelper(String),
}

impl From<crate::ParseError> for CliError {
    fn from(e: crate::ParseError) -> Self {
        CliError::Sprig(e.into())
    }
}
