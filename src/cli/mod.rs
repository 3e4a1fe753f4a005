//! CLI support for reshape-lang
//!
//! Provides programmatic access to the `reshape` command so other tools can
//! embed it.

mod convert;
mod eval;
mod inspect;

pub use convert::{parse_variable, parse_variables};
pub use eval::{EvalOptions, EvalResult, execute_eval};
pub use inspect::{token_listing, tree_listing};

use std::io;

use crate::error::{Error, SyntaxError};

/// Errors that can occur during CLI operations
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Malformed expression
    #[error("{0}")]
    Syntax(#[from] SyntaxError),
    /// Evaluation failed
    #[error("Evaluation error: {0}")]
    Eval(#[source] Error),
    /// JSON parsing error
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    /// `--var` argument without `=`
    #[error("Invalid variable '{0}': expected name=value")]
    InvalidVariable(String),
}

impl From<Error> for CliError {
    fn from(e: Error) -> Self {
        match e {
            Error::Syntax(e) => CliError::Syntax(e),
            other => CliError::Eval(other),
        }
    }
}
