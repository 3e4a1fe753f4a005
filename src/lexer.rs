use std::str::FromStr;

use rust_decimal::Decimal;

use crate::{
    ast::{BinOp, Token, TokenKind},
    error::SyntaxError,
};

/// Characters that form operator runs.
const OPERATOR_CHARS: &[char] = &['!', '=', '<', '>', '*', '/', '+', '-', '~', '^', '%', '&', '|'];

/// Multi-character operators a punctuation run may grow into.
const MULTI_CHAR_OPERATORS: &[&str] = &["==", "!=", "<=", ">=", "&&", "||", "//"];

#[derive(Debug, Clone, Copy, PartialEq)]
enum Pending {
    Text,
    Number,
    Punctuation,
}

/// Single pass tokenizer.
///
/// Characters accumulate into a pending token which is flushed (and
/// classified) on whitespace, brackets, quotes and kind changes.
pub struct Lexer {
    input: Vec<char>,
    position: usize,
    pending: String,
    pending_kind: Option<Pending>,
    pending_start: usize,
    tokens: Vec<Token>,
    next_id: usize,
}

/// Parses number token text; a bare leading `.` is allowed (`.5`, `-.5`).
pub(crate) fn parse_number(text: &str) -> Option<Decimal> {
    let normalized = if let Some(rest) = text.strip_prefix("-.") {
        format!("-0.{}", rest)
    } else if let Some(rest) = text.strip_prefix('.') {
        format!("0.{}", rest)
    } else {
        text.to_string()
    };
    Decimal::from_str(&normalized).ok()
}

/// Tokenizes an expression.
///
/// # Examples
///
/// ```
/// use reshape_lang::{ast::TokenKind, lexer::tokenize};
///
/// let tokens = tokenize("Make == 'Chevy'").unwrap();
/// let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
/// assert_eq!(kinds, vec![TokenKind::Text, TokenKind::Operator, TokenKind::SingleQuoted]);
/// assert_eq!(tokens[2].text, "Chevy");
/// ```
pub fn tokenize(input: &str) -> Result<Vec<Token>, SyntaxError> {
    Lexer::new(input).tokenize()
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            position: 0,
            pending: String::new(),
            pending_kind: None,
            pending_start: 0,
            tokens: Vec::new(),
            next_id: 0,
        }
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, SyntaxError> {
        while let Some(ch) = self.current_char() {
            match ch {
                '\'' | '"' => {
                    self.flush();
                    self.read_literal(ch)?;
                }
                c if c.is_whitespace() => {
                    self.flush();
                    self.advance();
                }
                '(' | ')' | '[' | ']' | ',' | '?' | ':' => {
                    self.flush();
                    self.emit(TokenKind::Operator, ch.to_string(), self.position);
                    self.advance();
                }
                '-' if self.starts_negative_number() => {
                    self.flush();
                    self.start(Pending::Number);
                    self.pending.push(ch);
                    self.advance();
                }
                '.' => self.read_dot(),
                c if c.is_ascii_digit() => self.read_digit(c),
                c if OPERATOR_CHARS.contains(&c) => self.read_operator_char(c),
                c => self.read_text_char(c),
            }
        }

        self.flush();
        Ok(self.tokens)
    }

    fn start(&mut self, kind: Pending) {
        self.pending_kind = Some(kind);
        self.pending_start = self.position;
    }

    fn emit(&mut self, kind: TokenKind, text: String, position: usize) {
        let mut token = Token::new(kind, text);
        token.id = self.next_id;
        token.position = position;
        self.next_id += 1;
        self.tokens.push(token);
    }

    /// Emits the pending token, classifying its text.
    fn flush(&mut self) {
        let Some(kind) = self.pending_kind.take() else {
            return;
        };
        let text = std::mem::take(&mut self.pending);

        let kind = match kind {
            Pending::Text if BinOp::from_text(&text).is_some() => TokenKind::Operator,
            Pending::Text => TokenKind::Text,
            Pending::Number if parse_number(&text).is_some() => TokenKind::Number,
            Pending::Number => TokenKind::Text,
            Pending::Punctuation if BinOp::from_text(&text).is_some() || text == "//" => {
                TokenKind::Operator
            }
            Pending::Punctuation => TokenKind::Punctuation,
        };

        self.emit(kind, text, self.pending_start);
    }

    /// Whether the last complete token can end an operand.
    fn after_operand(&self) -> bool {
        if self.pending_kind.is_some() {
            return self.pending_kind != Some(Pending::Punctuation);
        }
        match self.tokens.last() {
            None => false,
            Some(t) => match t.kind {
                TokenKind::Operator => t.text == ")" || t.text == "]",
                TokenKind::Punctuation => false,
                _ => true,
            },
        }
    }

    /// A `-` in unary position directly followed by a digit (or `.digit`).
    fn starts_negative_number(&self) -> bool {
        if self.after_operand() {
            return false;
        }
        match self.peek_char(1) {
            Some(c) if c.is_ascii_digit() => true,
            Some('.') => self.peek_char(2).is_some_and(|c| c.is_ascii_digit()),
            _ => false,
        }
    }

    fn read_dot(&mut self) {
        match self.pending_kind {
            Some(Pending::Number) if !self.pending.contains('.') => {
                self.pending.push('.');
                self.advance();
            }
            // Variables keep their sub-path: `$customer.Name`
            Some(Pending::Text) if self.pending.starts_with('$') => {
                self.pending.push('.');
                self.advance();
            }
            _ if !self.after_operand() && self.peek_char(1).is_some_and(|c| c.is_ascii_digit()) => {
                self.flush();
                self.start(Pending::Number);
                self.pending.push('.');
                self.advance();
            }
            _ => {
                // Member access
                self.flush();
                self.emit(TokenKind::Operator, ".".to_string(), self.position);
                self.advance();
            }
        }
    }

    fn read_digit(&mut self, ch: char) {
        match self.pending_kind {
            Some(Pending::Text) | Some(Pending::Number) => {}
            _ => {
                self.flush();
                self.start(Pending::Number);
            }
        }
        self.pending.push(ch);
        self.advance();
    }

    fn read_operator_char(&mut self, ch: char) {
        let extends = self.pending_kind == Some(Pending::Punctuation) && {
            let candidate = format!("{}{}", self.pending, ch);
            MULTI_CHAR_OPERATORS.iter().any(|op| op.starts_with(&candidate))
        };

        if !extends {
            self.flush();
            self.start(Pending::Punctuation);
        }
        self.pending.push(ch);
        self.advance();
    }

    fn read_text_char(&mut self, ch: char) {
        match self.pending_kind {
            Some(Pending::Text) => {}
            // `2nd` is an identifier, not a number
            Some(Pending::Number) => self.pending_kind = Some(Pending::Text),
            _ => {
                self.flush();
                self.start(Pending::Text);
            }
        }
        self.pending.push(ch);
        self.advance();
    }

    fn read_literal(&mut self, quote: char) -> Result<(), SyntaxError> {
        let start = self.position;
        let mut result = String::new();
        self.advance(); // Consume opening quote

        while let Some(ch) = self.current_char() {
            match ch {
                c if c == quote => {
                    if self.peek_char(1) == Some(quote) {
                        // Doubled quote: 'it''s'
                        result.push(quote);
                        self.advance();
                        self.advance();
                        continue;
                    }
                    self.advance();
                    let kind = if quote == '\'' {
                        TokenKind::SingleQuoted
                    } else {
                        TokenKind::DoubleQuoted
                    };
                    self.emit(kind, result, start);
                    return Ok(());
                }
                '\\' => {
                    self.advance(); // Consume backslash
                    match self.current_char() {
                        Some('n') => result.push('\n'),
                        Some('t') => result.push('\t'),
                        Some('r') => result.push('\r'),
                        Some(c @ ('\'' | '"' | '\\')) => result.push(c),
                        Some(c) => {
                            result.push('\\');
                            result.push(c);
                        }
                        None => break,
                    }
                    self.advance();
                }
                _ => {
                    result.push(ch);
                    self.advance();
                }
            }
        }

        Err(SyntaxError::at(
            format!("Unterminated literal: missing closing {}", quote),
            start,
        ))
    }
}

#[cfg(test)]
fn texts(input: &str) -> Vec<String> {
    tokenize(input)
        .unwrap()
        .into_iter()
        .map(|t| t.text)
        .collect()
}

#[test]
fn test_keywords() {
    let tokens = tokenize("a and b OR c").unwrap();
    assert_eq!(tokens[1].kind, TokenKind::Operator);
    assert_eq!(tokens[3].kind, TokenKind::Operator);
    assert_eq!(tokens[3].text, "OR");
}

#[test]
fn test_negative_numbers() {
    assert_eq!(texts("a-1"), vec!["a", "-", "1"]);
    assert_eq!(texts("3*-2"), vec!["3", "*", "-2"]);
    assert_eq!(texts("(-1.5)"), vec!["(", "-1.5", ")"]);
    assert_eq!(texts("x - -.5"), vec!["x", "-", "-.5"]);
}

#[test]
fn test_dots() {
    assert_eq!(texts("Orders.Items"), vec!["Orders", ".", "Items"]);
    assert_eq!(texts("$order.Lines.Count"), vec!["$order.Lines.Count"]);
    assert_eq!(texts("1.25"), vec!["1.25"]);
    assert_eq!(texts("Items[0].Name"), vec!["Items", "[", "0", "]", ".", "Name"]);
}
