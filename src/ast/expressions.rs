use std::fmt;

use rust_decimal::Decimal;

use crate::{ast::BinOp, value::Value};

/// Which frame a [`Expr::DataPath`] looks its property up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// Current data
    Current,
    /// Parent frame (`/name`)
    Parent,
    /// Grandparent frame (`//name`)
    Grandparent,
}

/// Compiled expression tree node.
///
/// Nodes are immutable once built; evaluation only reads them, so the same
/// tree can be evaluated from several threads at once.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    // Literals
    /// Literal value: an unquoted string, or the `true`/`false`/`null` keywords
    ///
    /// # Example
    /// ```text
    /// 'Chevy'
    /// ```
    Literal(Value),

    /// Numeric literal, parsed once at compile time
    Number(Decimal),

    // References
    /// Property lookup relative to the current data or an ancestor
    ///
    /// # Examples
    /// ```text
    /// Make          // DataPath { name: "Make", axis: Current }
    /// /Customer     // DataPath { name: "Customer", axis: Parent }
    /// //Region      // DataPath { name: "Region", axis: Grandparent }
    /// ```
    DataPath { name: String, axis: Axis },

    /// The current data itself (`@`)
    Current,

    /// Chain of path segments and indexers evaluated left to right
    ///
    /// # Examples
    /// ```text
    /// Orders.Items
    /// Customers[0].Name
    /// $order.Lines
    /// ```
    MultiPartPath(Vec<Expr>),

    /// Index, property name or predicate applied to the preceding part
    ///
    /// # Examples
    /// ```text
    /// [1]
    /// ['Name']
    /// [Age > 21]
    /// ```
    Indexer(Box<Expr>),

    /// Variable reference (`$name`)
    Variable(String),

    // Operations
    /// Function call resolved against the function registry when evaluated
    ///
    /// # Example
    /// ```text
    /// substring(Name, 0, 3)
    /// ```
    FunctionCall { name: String, args: Vec<Expr> },

    /// Binary operation (arithmetic, comparison, logical)
    BinaryOp {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// Conditional (`condition ? if_true : if_false`)
    Tertiary {
        condition: Box<Expr>,
        if_true: Box<Expr>,
        if_false: Box<Expr>,
    },
}

impl Expr {
    /// Appends a path part, turning `self` into a [`Expr::MultiPartPath`].
    pub fn append_part(self, part: Expr) -> Expr {
        match self {
            Expr::MultiPartPath(mut parts) => {
                parts.push(part);
                Expr::MultiPartPath(parts)
            }
            other => Expr::MultiPartPath(vec![other, part]),
        }
    }

    /// Source-like text of the node.
    ///
    /// Literal function parameters receive this instead of their value.
    pub fn source_text(&self) -> String {
        match self {
            Expr::Literal(Value::String(s)) => s.clone(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(Value::String(s)) => {
                write!(f, "'{}'", s.replace('\\', "\\\\").replace('\'', "''"))
            }
            Expr::Literal(v) => write!(f, "{}", v),
            Expr::Number(n) => write!(f, "{}", n),
            Expr::DataPath { name, axis } => match axis {
                Axis::Current => write!(f, "{}", name),
                Axis::Parent => write!(f, "/{}", name),
                Axis::Grandparent => write!(f, "//{}", name),
            },
            Expr::Current => write!(f, "@"),
            Expr::MultiPartPath(parts) => {
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 && !matches!(part, Expr::Indexer(_)) {
                        write!(f, ".")?;
                    }
                    write!(f, "{}", part)?;
                }
                Ok(())
            }
            Expr::Indexer(inner) => write!(f, "[{}]", inner),
            Expr::Variable(name) => write!(f, "${}", name),
            Expr::FunctionCall { name, args } => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            Expr::BinaryOp { op, left, right } => write!(f, "({} {} {})", left, op, right),
            Expr::Tertiary {
                condition,
                if_true,
                if_false,
            } => write!(f, "({} ? {} : {})", condition, if_true, if_false),
        }
    }
}
