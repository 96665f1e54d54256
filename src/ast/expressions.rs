use crate::ast::Operator;
use crate::value::Value;

/// Abstract Syntax Tree node representing a parsed expression.
///
/// The AST is the internal representation of an expression after parsing.
/// Nodes never change after construction.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Constant value
    ///
    /// # Example
    /// ```text
    /// 42
    /// 'hello'
    /// /^ab+c$/i
    /// ```
    Literal(Value),

    /// Lookup into the current input, or into `root` when present
    ///
    /// # Examples
    /// ```text
    /// $.              // Variable { root: None, keys: [] }
    /// $user.name      // keys: [Dotted("user.name")]
    /// $items[0]       // keys: [Key("items"), Index(0)]
    /// $[$key]         // keys: [Computed(Variable ...)]
    /// ([1 2 3])[1]    // root: Some(Operation(Array ...)), keys: [Index(1)]
    /// ```
    Variable {
        root: Option<Box<Expr>>,
        keys: Vec<KeySegment>,
    },

    /// Operator applied to operands, which are all evaluated first
    ///
    /// # Example
    /// ```text
    /// $a + $b     // Operation { op: Add, args: [Variable, Variable] }
    /// ```
    Operation { op: Operator, args: Vec<Expr> },

    /// Named helper call
    ///
    /// # Example
    /// ```text
    /// union($a $b)
    /// ?($flag 'on' 'off')
    /// ```
    HelperCall { name: String, args: Vec<Expr> },
}

/// One step of a variable path.
#[derive(Debug, Clone, PartialEq)]
pub enum KeySegment {
    /// Plain key (`$name`, `$['name']`)
    Key(String),
    /// Integer key (`$list[2]`, `$list[-1]`)
    Index(i64),
    /// Path written with dots, split at lookup time (`$a.b.c`, `${a.b}`)
    Dotted(String),
    /// Key computed by an expression (`$[$field]`)
    Computed(Box<Expr>),
}

impl Expr {
    pub fn literal(value: impl Into<Value>) -> Expr {
        Expr::Literal(value.into())
    }

    pub fn operation(op: Operator, args: Vec<Expr>) -> Expr {
        Expr::Operation { op, args }
    }

    pub fn helper(name: impl Into<String>, args: Vec<Expr>) -> Expr {
        Expr::HelperCall {
            name: name.into(),
            args,
        }
    }

    /// `$.`, the current input itself.
    pub fn current() -> Expr {
        Expr::Variable {
            root: None,
            keys: Vec::new(),
        }
    }

    pub fn as_literal(&self) -> Option<&Value> {
        match self {
            Expr::Literal(value) => Some(value),
            _ => None,
        }
    }
}
