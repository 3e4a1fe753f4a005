//! Structural pass over the flat token stream.
//!
//! Resolves bracket nesting before precedence is applied: every `(` and `[`
//! token takes ownership of the tokens up to its matching closer as
//! `children`, and the closer itself is dropped. The tree compiler then only
//! ever sees balanced groups.

use crate::{
    ast::{Token, TokenKind},
    error::SyntaxError,
    lexer::tokenize,
};

pub struct Parser {
    tokens: std::vec::IntoIter<Token>,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser {
            tokens: tokens.into_iter(),
        }
    }

    /// Nests the whole token stream.
    pub fn parse(mut self) -> Result<Vec<Token>, SyntaxError> {
        let (tokens, closer) = self.parse_group(None)?;
        match closer {
            None => Ok(tokens),
            Some(token) => Err(SyntaxError::at(
                format!("Unexpected '{}'", token.text),
                token.position,
            )),
        }
    }

    /// Collects tokens until the closer matching `opener` (or the end of
    /// input when `opener` is `None`). Returns the stray closer, if any, so
    /// the caller can report it.
    fn parse_group(
        &mut self,
        opener: Option<&Token>,
    ) -> Result<(Vec<Token>, Option<Token>), SyntaxError> {
        let expected = opener.map(|t| closer_for(&t.text));
        let mut out = Vec::new();

        while let Some(mut token) = self.tokens.next() {
            if token.kind != TokenKind::Operator {
                out.push(token);
                continue;
            }

            match token.text.as_str() {
                "(" | "[" => {
                    let (children, closer) = self.parse_group(Some(&token))?;
                    if let Some(stray) = closer {
                        return Err(SyntaxError::at(
                            format!(
                                "Expected '{}' but found '{}'",
                                closer_for(&token.text),
                                stray.text
                            ),
                            stray.position,
                        ));
                    }
                    token.children = children;
                    out.push(token);
                }
                ")" | "]" => {
                    if expected == Some(token.text.as_str()) {
                        return Ok((out, None));
                    }
                    return Ok((out, Some(token)));
                }
                _ => out.push(token),
            }
        }

        match (opener, expected) {
            (Some(open), Some(close)) => Err(SyntaxError::at(
                format!("Missing '{}'", close),
                open.position,
            )),
            _ => Ok((out, None)),
        }
    }
}

fn closer_for(opener: &str) -> &'static str {
    if opener == "(" { ")" } else { "]" }
}

/// Tokenizes and nests an expression.
///
/// # Examples
///
/// ```
/// use reshape_lang::parser::parse;
///
/// let tokens = parse("max(a, b[1])").unwrap();
/// assert_eq!(tokens.len(), 2);
/// assert_eq!(tokens[1].children.len(), 4);
/// ```
pub fn parse(input: &str) -> Result<Vec<Token>, SyntaxError> {
    Parser::new(tokenize(input)?).parse()
}
