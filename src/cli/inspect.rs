//! Token and tree dumps for debugging expressions

use super::CliError;
use crate::{ast::Token, compiler, lexer, parser};

fn write_tokens(out: &mut String, tokens: &[Token], depth: usize) {
    for token in tokens {
        out.push_str(&format!(
            "{}{:<4} {:<12} {:?}\n",
            "  ".repeat(depth),
            token.position,
            format!("{:?}", token.kind),
            token.text
        ));
        write_tokens(out, &token.children, depth + 1);
    }
}

/// One line per token: position, kind and text. Nested groups are
/// indented under their opener when `nested` is set.
pub fn token_listing(expression: &str, nested: bool) -> Result<String, CliError> {
    let tokens = if nested {
        parser::parse(expression)?
    } else {
        lexer::tokenize(expression)?
    };

    let mut out = String::new();
    write_tokens(&mut out, &tokens, 0);
    Ok(out)
}

/// The compiled tree, followed by its normalized source form.
pub fn tree_listing(expression: &str) -> Result<String, CliError> {
    let expr = compiler::compile(expression)?;
    Ok(format!("{:#?}\n\n{}\n", expr, expr))
}
