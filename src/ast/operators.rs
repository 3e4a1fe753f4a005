use std::fmt;

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    // Comparison
    /// Equal (`==`)
    Equal,
    /// Not equal (`!=`)
    NotEqual,
    /// Less than (`<`)
    LessThan,
    /// Greater than (`>`)
    GreaterThan,
    /// Less than or equal (`<=`)
    LessEqual,
    /// Greater than or equal (`>=`)
    GreaterEqual,

    // Arithmetic
    /// Addition, boolean AND or string concatenation (`+`)
    Add,
    /// Subtraction, boolean OR or substring removal (`-`)
    Subtract,
    /// Multiplication (`*`)
    Multiply,
    /// Division (`/`)
    Divide,
    /// Modulo (`%`)
    Modulo,

    // Logical
    /// Logical AND (`and`, `&&`)
    And,
    /// Logical OR (`or`, `||`)
    Or,
}

impl BinOp {
    /// Maps operator text to an operator. Keywords are case-insensitive.
    pub fn from_text(text: &str) -> Option<BinOp> {
        let op = match text {
            "==" => BinOp::Equal,
            "!=" => BinOp::NotEqual,
            "<" => BinOp::LessThan,
            ">" => BinOp::GreaterThan,
            "<=" => BinOp::LessEqual,
            ">=" => BinOp::GreaterEqual,
            "+" => BinOp::Add,
            "-" => BinOp::Subtract,
            "*" => BinOp::Multiply,
            "/" => BinOp::Divide,
            "%" => BinOp::Modulo,
            "&&" => BinOp::And,
            "||" => BinOp::Or,
            _ if text.eq_ignore_ascii_case("and") => BinOp::And,
            _ if text.eq_ignore_ascii_case("or") => BinOp::Or,
            _ => return None,
        };
        Some(op)
    }

    /// Binding strength; higher binds tighter.
    ///
    /// Subtraction binds looser than addition and division looser than
    /// multiplication, so `2 - 3 + 4` is `2 - (3 + 4)`.
    pub fn precedence(self) -> u8 {
        match self {
            BinOp::Or => 3,
            BinOp::And => 4,
            BinOp::NotEqual => 8,
            BinOp::Equal => 9,
            BinOp::GreaterThan | BinOp::GreaterEqual | BinOp::LessThan | BinOp::LessEqual => 11,
            BinOp::Subtract => 12,
            BinOp::Add | BinOp::Modulo => 13,
            BinOp::Divide => 14,
            BinOp::Multiply => 15,
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinOp::Equal
                | BinOp::NotEqual
                | BinOp::LessThan
                | BinOp::GreaterThan
                | BinOp::LessEqual
                | BinOp::GreaterEqual
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinOp::And | BinOp::Or)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Equal => "==",
            BinOp::NotEqual => "!=",
            BinOp::LessThan => "<",
            BinOp::GreaterThan => ">",
            BinOp::LessEqual => "<=",
            BinOp::GreaterEqual => ">=",
            BinOp::Add => "+",
            BinOp::Subtract => "-",
            BinOp::Multiply => "*",
            BinOp::Divide => "/",
            BinOp::Modulo => "%",
            BinOp::And => "&&",
            BinOp::Or => "||",
        }
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}
