//! Error taxonomy of the engine.
//!
//! Hard failures abort the whole `apply` call. Nonsensical input to most
//! operators and helpers is not an error: it produces `undefined`.

use thiserror::Error;

use crate::parser::ParseError;
use crate::value::TypeTag;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Malformed expression source
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("Attempt to call unknown helper function: {name}")]
    UnknownHelper { name: String },

    /// No overload matched the first argument, even after coercion
    #[error("Unable to call '{helper}()' helper with type '{found}' for first argument")]
    NoOverload { helper: String, found: TypeTag },

    /// Nested sub-transforms ran out of depth budget
    #[error("Maximum transform depth of {max_depth} exceeded")]
    DepthExceeded { max_depth: usize },

    /// A helper that cannot produce a soft `undefined`, such as `regex()` given
    /// an invalid pattern
    #[error("{helper}(): {message}")]
    Helper { helper: String, message: String },
}

impl Error {
    /// Unknown helper or unmatched overload.
    pub fn is_dispatch(&self) -> bool {
        matches!(self, Error::UnknownHelper { .. } | Error::NoOverload { .. })
    }

    pub fn is_depth_exceeded(&self) -> bool {
        matches!(self, Error::DepthExceeded { .. })
    }

    pub fn helper(helper: &str, message: impl Into<String>) -> Self {
        Error::Helper {
            helper: helper.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
