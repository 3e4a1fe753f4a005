use thiserror::Error;

/// A structural problem with an expression.
///
/// Raised while tokenizing or compiling, and at evaluation time when a
/// function call cannot be resolved (unknown name or wrong argument count).
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Syntax error: {message}{}", .position.map(|p| format!(" (at position {})", p)).unwrap_or_default())]
pub struct SyntaxError {
    pub message: String,
    pub position: Option<usize>,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>) -> Self {
        SyntaxError {
            message: message.into(),
            position: None,
        }
    }

    pub fn at(message: impl Into<String>, position: usize) -> Self {
        SyntaxError {
            message: message.into(),
            position: Some(position),
        }
    }
}

/// A data-driven error raised on purpose by the `required` builtin.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct UserError {
    pub message: String,
    pub code: Option<String>,
}

impl UserError {
    pub fn new(message: impl Into<String>, code: Option<String>) -> Self {
        UserError {
            message: message.into(),
            code,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error("User error: {0}")]
    User(#[from] UserError),
}

impl Error {
    pub fn syntax(message: impl Into<String>) -> Self {
        Error::Syntax(SyntaxError::new(message))
    }

    pub fn is_syntax(&self) -> bool {
        matches!(self, Error::Syntax(_))
    }

    pub fn is_user(&self) -> bool {
        matches!(self, Error::User(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
