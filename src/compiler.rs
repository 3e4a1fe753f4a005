use rust_decimal::Decimal;

use crate::{
    ast::{Axis, BinOp, Expr, Token, TokenKind},
    error::SyntaxError,
    lexer::parse_number,
    parser,
    value::Value,
};

/// What stopped a compilation level.
///
/// Function arguments end with `Comma` or `End`, the true branch of a
/// conditional must end with `Colon`, groups must end with `End`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminator {
    End,
    Comma,
    Colon,
}

/// Precedence-climbing compiler over one nesting level of tokens.
///
/// `(` and `[` groups are compiled by a fresh `Compiler` over their
/// children.
pub struct Compiler<'t> {
    tokens: &'t [Token],
    position: usize,
}

impl<'t> Compiler<'t> {
    pub fn new(tokens: &'t [Token]) -> Self {
        Compiler {
            tokens,
            position: 0,
        }
    }

    fn current_token(&self) -> Option<&'t Token> {
        self.tokens.get(self.position)
    }

    fn advance(&mut self) -> Option<&'t Token> {
        let token = self.tokens.get(self.position);
        self.position += 1;
        token
    }

    fn check_operator(&self, text: &str) -> bool {
        self.current_token().is_some_and(|t| t.is_operator(text))
    }

    /// Position used when the input runs out
    fn end_position(&self) -> usize {
        self.tokens.last().map(|t| t.position).unwrap_or(0)
    }

    /// Compiles the whole token slice; any terminator other than the end of
    /// input is an error.
    pub fn compile(mut self) -> Result<Expr, SyntaxError> {
        let (expr, terminator) = self.compile_level()?;
        match terminator {
            Terminator::End => Ok(expr),
            Terminator::Comma => Err(SyntaxError::new("Unexpected ',' outside of a function call")),
            Terminator::Colon => Err(SyntaxError::new("Unexpected ':' without a matching '?'")),
        }
    }

    /// Compiles one expression and reports the boundary that ended it.
    pub fn compile_level(&mut self) -> Result<(Expr, Terminator), SyntaxError> {
        let expr = self.compile_tertiary()?;

        let terminator = match self.advance() {
            None => Terminator::End,
            Some(t) if t.is_operator(",") => Terminator::Comma,
            Some(t) if t.is_operator(":") => Terminator::Colon,
            Some(t) => {
                return Err(SyntaxError::at(
                    format!("Unexpected '{}'", t),
                    t.position,
                ));
            }
        };
        Ok((expr, terminator))
    }

    fn compile_tertiary(&mut self) -> Result<Expr, SyntaxError> {
        let condition = self.compile_binary(0)?;

        if !self.check_operator("?") {
            return Ok(condition);
        }
        let question = self.advance().map(|t| t.position).unwrap_or_default();

        let (if_true, terminator) = self.compile_level()?;
        if terminator != Terminator::Colon {
            return Err(SyntaxError::at("Missing ':' in conditional", question));
        }
        // Right-associative: `a ? b : c ? d : e`
        let if_false = self.compile_tertiary()?;

        Ok(Expr::Tertiary {
            condition: Box::new(condition),
            if_true: Box::new(if_true),
            if_false: Box::new(if_false),
        })
    }

    /// Operator at the cursor, if the cursor is on a binary operator.
    fn peek_binop(&self) -> Result<Option<BinOp>, SyntaxError> {
        let Some(token) = self.current_token() else {
            return Ok(None);
        };
        match token.kind {
            TokenKind::Punctuation => Err(SyntaxError::at(
                format!("Unknown operator '{}'", token.text),
                token.position,
            )),
            TokenKind::Operator => Ok(BinOp::from_text(&token.text)),
            _ => Ok(None),
        }
    }

    /// Equal or lower precedence folds into `left`; strictly higher
    /// precedence recurses so it binds tighter to the right.
    fn compile_binary(&mut self, min_precedence: u8) -> Result<Expr, SyntaxError> {
        let mut left = self.compile_operand()?;

        while let Some(op) = self.peek_binop()? {
            if op.precedence() < min_precedence {
                break;
            }
            self.advance();
            let right = self.compile_binary(op.precedence() + 1)?;

            left = Expr::BinaryOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn compile_operand(&mut self) -> Result<Expr, SyntaxError> {
        let Some(token) = self.advance() else {
            return Err(SyntaxError::at("Missing operand", self.end_position()));
        };

        let expr = match token.kind {
            TokenKind::Number => match parse_number(&token.text) {
                Some(n) => Expr::Number(n),
                None => {
                    return Err(SyntaxError::at(
                        format!("Invalid number '{}'", token.text),
                        token.position,
                    ));
                }
            },
            TokenKind::SingleQuoted | TokenKind::DoubleQuoted => {
                Expr::Literal(Value::String(token.text.clone()))
            }
            TokenKind::Text => self.compile_text(token)?,
            TokenKind::Punctuation => {
                return Err(SyntaxError::at(
                    format!("Unknown operator '{}'", token.text),
                    token.position,
                ));
            }
            TokenKind::Operator => match token.text.as_str() {
                "(" => compile_group(token)?,
                // Unary minus: 0 - operand
                "-" => {
                    let operand = self.compile_operand()?;
                    return Ok(Expr::BinaryOp {
                        op: BinOp::Subtract,
                        left: Box::new(Expr::Number(Decimal::ZERO)),
                        right: Box::new(operand),
                    });
                }
                "/" | "//" => {
                    let axis = if token.text == "/" {
                        Axis::Parent
                    } else {
                        Axis::Grandparent
                    };
                    match self.advance() {
                        Some(name) if name.kind == TokenKind::Text => Expr::DataPath {
                            name: name.text.clone(),
                            axis,
                        },
                        _ => {
                            return Err(SyntaxError::at(
                                format!("Expected a property name after '{}'", token.text),
                                token.position,
                            ));
                        }
                    }
                }
                "[" => {
                    return Err(SyntaxError::at(
                        "Indexer without anything to index",
                        token.position,
                    ));
                }
                _ => {
                    return Err(SyntaxError::at(
                        format!("Unexpected '{}'", token.text),
                        token.position,
                    ));
                }
            },
        };

        self.compile_postfix(expr)
    }

    /// Member access (`.name`, `.func(...)`) and indexers (`[...]`).
    fn compile_postfix(&mut self, mut expr: Expr) -> Result<Expr, SyntaxError> {
        loop {
            if self.check_operator(".") {
                let dot = self.advance().map(|t| t.position).unwrap_or_default();
                let part = match self.advance() {
                    Some(name) if name.kind == TokenKind::Text => self.compile_text(name)?,
                    _ => {
                        return Err(SyntaxError::at("Expected a property name after '.'", dot));
                    }
                };
                expr = expr.append_part(part);
            } else if self.check_operator("[") {
                let Some(group) = self.advance() else { break };
                let inner = compile_group(group)?;
                expr = expr.append_part(Expr::Indexer(Box::new(inner)));
            } else {
                break;
            }
        }
        Ok(expr)
    }

    /// Function calls, `@`, variables, keywords and plain path segments.
    fn compile_text(&mut self, token: &'t Token) -> Result<Expr, SyntaxError> {
        let text = token.text.as_str();

        if let Some(group) = self.current_token().filter(|t| t.is_operator("(")) {
            self.advance();
            return Ok(Expr::FunctionCall {
                name: text.to_string(),
                args: compile_arguments(group)?,
            });
        }

        if text == "@" {
            return Ok(Expr::Current);
        }

        if let Some(variable) = text.strip_prefix('$') {
            let mut segments = variable.split('.');
            let name = segments.next().unwrap_or_default();
            if name.is_empty() {
                return Err(SyntaxError::at("Missing variable name after '$'", token.position));
            }

            let mut expr = Expr::Variable(name.to_string());
            for segment in segments {
                if segment.is_empty() {
                    return Err(SyntaxError::at(
                        format!("Empty path segment in '{}'", text),
                        token.position,
                    ));
                }
                expr = expr.append_part(Expr::DataPath {
                    name: segment.to_string(),
                    axis: Axis::Current,
                });
            }
            return Ok(expr);
        }

        if text.eq_ignore_ascii_case("true") {
            return Ok(Expr::Literal(Value::Boolean(true)));
        }
        if text.eq_ignore_ascii_case("false") {
            return Ok(Expr::Literal(Value::Boolean(false)));
        }
        if text.eq_ignore_ascii_case("null") {
            return Ok(Expr::Literal(Value::Null));
        }

        Ok(Expr::DataPath {
            name: text.to_string(),
            axis: Axis::Current,
        })
    }
}

/// Compiles a `(` or `[` group, which must hold exactly one expression.
fn compile_group(group: &Token) -> Result<Expr, SyntaxError> {
    if group.children.is_empty() {
        return Err(SyntaxError::at(
            format!("Empty '{}' group", group.text),
            group.position,
        ));
    }
    Compiler::new(&group.children).compile()
}

/// Compiles the comma separated arguments of a call group.
fn compile_arguments(group: &Token) -> Result<Vec<Expr>, SyntaxError> {
    let mut args = Vec::new();
    if group.children.is_empty() {
        return Ok(args);
    }

    let mut compiler = Compiler::new(&group.children);
    loop {
        let (arg, terminator) = compiler.compile_level()?;
        args.push(arg);
        match terminator {
            Terminator::End => break,
            Terminator::Comma => continue,
            Terminator::Colon => {
                return Err(SyntaxError::at(
                    "Unexpected ':' in argument list",
                    group.position,
                ));
            }
        }
    }
    Ok(args)
}

/// Compiles already nested tokens into an expression tree.
pub fn compile_tokens(tokens: &[Token]) -> Result<Expr, SyntaxError> {
    if tokens.is_empty() {
        return Err(SyntaxError::new("Empty expression"));
    }
    Compiler::new(tokens).compile()
}

/// Tokenizes, nests and compiles expression text.
///
/// # Examples
///
/// ```
/// use reshape_lang::{ast::{BinOp, Expr}, compiler::compile};
///
/// let expr = compile("2 + 3 * 4").unwrap();
/// assert!(matches!(expr, Expr::BinaryOp { op: BinOp::Add, .. }));
/// ```
pub fn compile(text: &str) -> Result<Expr, SyntaxError> {
    compile_tokens(&parser::parse(text)?)
}
