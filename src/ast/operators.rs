/// Operator identifiers.
///
/// Operators act on already evaluated operands; only helpers ever see
/// unevaluated expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    // Logical
    /// Logical AND (`&&`), returns the deciding operand
    And,
    /// Logical OR (`||`), returns the deciding operand
    Or,
    /// Logical NOT (`!`)
    Not,

    /// Concatenation (`&`) of strings, arrays or objects
    Concat,

    // Comparison
    /// Equal (`==`)
    Equal,
    /// Not equal (`!=`)
    NotEqual,
    /// Less than (`<`)
    Less,
    /// Less than or equal (`<=`)
    LessEqual,
    /// Greater than (`>`)
    Greater,
    /// Greater than or equal (`>=`)
    GreaterEqual,
    /// Three-way comparison (`<=>`)
    Compare,
    /// Regular expression match (`=~`)
    Matches,

    // Arithmetic
    /// Addition (`+`)
    Add,
    /// Subtraction (`-`)
    Subtract,
    /// Multiplication (`*`)
    Multiply,
    /// Division (`/`)
    Divide,
    /// Remainder (`%`)
    Modulo,
    /// Exponentiation (`^`)
    Power,

    // Constructors
    /// Pair constructor (`:`)
    Pair,
    /// Object constructor (`{}`)
    Object,
    /// Array constructor (`[]`)
    Array,
    /// Inclusive integer range (`..`)
    Range,
    /// Grouping (`()`)
    Group,
}

impl Operator {
    /// The source symbol of the operator.
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::And => "&&",
            Operator::Or => "||",
            Operator::Not => "!",
            Operator::Concat => "&",
            Operator::Equal => "==",
            Operator::NotEqual => "!=",
            Operator::Less => "<",
            Operator::LessEqual => "<=",
            Operator::Greater => ">",
            Operator::GreaterEqual => ">=",
            Operator::Compare => "<=>",
            Operator::Matches => "=~",
            Operator::Add => "+",
            Operator::Subtract => "-",
            Operator::Multiply => "*",
            Operator::Divide => "/",
            Operator::Modulo => "%",
            Operator::Power => "^",
            Operator::Pair => ":",
            Operator::Object => "{}",
            Operator::Array => "[]",
            Operator::Range => "..",
            Operator::Group => "()",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Operator> {
        let op = match symbol {
            "&&" => Operator::And,
            "||" => Operator::Or,
            "!" => Operator::Not,
            "&" => Operator::Concat,
            "==" | "===" => Operator::Equal,
            "!=" | "!==" => Operator::NotEqual,
            "<" => Operator::Less,
            "<=" => Operator::LessEqual,
            ">" => Operator::Greater,
            ">=" => Operator::GreaterEqual,
            "<=>" => Operator::Compare,
            "=~" => Operator::Matches,
            "+" => Operator::Add,
            "-" => Operator::Subtract,
            "*" => Operator::Multiply,
            "/" => Operator::Divide,
            "%" => Operator::Modulo,
            "^" => Operator::Power,
            ":" => Operator::Pair,
            "{}" => Operator::Object,
            "[]" => Operator::Array,
            ".." => Operator::Range,
            "()" => Operator::Group,
            _ => return None,
        };
        Some(op)
    }
}
