//! # Sprig Expression Language - Abstract Syntax Tree
//!
//! Expressions appear inside transform templates as delimited string leaves,
//! for example `"(: $price * 1.2 :)"`. Once parsed, an expression is one of
//! four node kinds:
//!
//! - **Literal** - a constant value (number, string, boolean, null, regex)
//! - **Variable** - a lookup into the current input (`$name.path`, `$.[0]`)
//! - **Operation** - an operator applied to evaluated operands (`a + b`)
//! - **HelperCall** - a named helper applied to arguments (`map($items 'row')`)
//!
//! ## Submodules
//!
//! - **[tokens]** - Lexical tokens produced by the lexer
//! - **[expressions]** - Expression nodes and variable key segments
//! - **[operators]** - Operator identifiers and their source symbols
//!
//! ## Examples
//!
//! ```text
//! $order.total + 5            // Operation(Add, [Variable, Literal])
//! ?($paid 'yes' 'no')         // HelperCall("?", [...]) evaluated lazily
//! [1 2 3] & 4                 // Operation(Concat, [Operation(Array), Literal])
//! { 'id': $id }               // Operation(Object, [Operation(Pair, ...)])
//! $rows -> 'row'              // HelperCall("transform", [Variable, Literal])
//! ```
//!
//! AST nodes are immutable once built; the expression cache hands out shared
//! references to them.
pub mod tokens;
pub mod expressions;
pub mod operators;

pub use tokens::{Lexeme, Token};
pub use expressions::{Expr, KeySegment};
pub use operators::Operator;
