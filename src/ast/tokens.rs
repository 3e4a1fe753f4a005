use std::fmt;

/// Lexical category of a [`Token`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Identifier, path segment, keyword or `$variable`
    ///
    /// # Examples
    /// ```text
    /// FirstName
    /// @
    /// $customer.Address
    /// ```
    Text,

    /// Literal enclosed in single quotes, stored unquoted and unescaped
    ///
    /// # Examples
    /// ```text
    /// 'Chevy'
    /// 'it''s'
    /// ```
    SingleQuoted,

    /// Literal enclosed in double quotes, stored unquoted and unescaped
    DoubleQuoted,

    /// Numeric literal
    ///
    /// # Examples
    /// ```text
    /// 42
    /// -3.5
    /// .25
    /// ```
    Number,

    /// Run of operator characters that is not a known operator
    Punctuation,

    /// Known operator, keyword operator (`and`, `or`) or structural character
    ///
    /// # Examples
    /// ```text
    /// ==  <=  &&  and  (  [  ,  ?  :
    /// ```
    Operator,
}

/// A lexical unit.
///
/// Tokens live only while an expression is compiled. After the structural
/// parser runs, `(` and `[` tokens own the tokens up to their matching
/// closer as `children`.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub children: Vec<Token>,
    /// Monotonic id, handy when dumping token trees
    pub id: usize,
    /// Character offset of the token's first character
    pub position: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>) -> Self {
        Token {
            kind,
            text: text.into(),
            children: Vec::new(),
            id: 0,
            position: 0,
        }
    }

    pub fn is_operator(&self, text: &str) -> bool {
        self.kind == TokenKind::Operator && self.text == text
    }

    pub fn is_literal(&self) -> bool {
        matches!(self.kind, TokenKind::SingleQuoted | TokenKind::DoubleQuoted)
    }

    /// `(` or `[` carrying nested children
    pub fn is_group(&self) -> bool {
        self.is_operator("(") || self.is_operator("[")
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::SingleQuoted => write!(f, "'{}'", self.text.replace('\'', "''")),
            TokenKind::DoubleQuoted => write!(f, "\"{}\"", self.text.replace('"', "\\\"")),
            _ if self.is_group() => {
                let close = if self.text == "(" { ")" } else { "]" };
                write!(f, "{}", self.text)?;
                for (i, child) in self.children.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", child)?;
                }
                write!(f, "{}", close)
            }
            _ => write!(f, "{}", self.text),
        }
    }
}
