pub mod ast;
pub mod cache;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod helpers;
pub mod lexer;
pub mod number;
pub mod operators;
pub mod output;
pub mod parser;
pub mod transform;
pub mod value;

#[cfg(feature = "cli")]
pub mod cli;

pub use ast::{Expr, Operator};
pub use cache::ExpressionCache;
pub use engine::{ApplyOptions, Engine, EngineConfig, KeyFilter};
pub use error::{Error, Result};
pub use evaluator::EvalContext;
pub use helpers::{HelperDef, HelperMeta, HelperRegistry};
pub use lexer::Location;
pub use number::{Number, NumericMode};
pub use output::{to_json, to_json_pretty};
pub use parser::{DefaultParser, ExpressionParser, ParseError};
pub use transform::{DefaultDelimiters, Delimiters};
pub use value::{Map, Pattern, TypeTag, Value};
