//! Evaluate an expression against JSON input

use super::{CliError, parse_variables};
use crate::{context::EvalContext, evaluator::Evaluator, value::Value};

/// Options for the eval command
#[derive(Debug, Clone, Default)]
pub struct EvalOptions {
    /// The expression to evaluate
    pub expression: String,
    /// JSON input string; evaluated against null when absent
    pub input: Option<String>,
    /// `name=value` variable bindings
    pub variables: Vec<String>,
    /// Pretty-print the output
    pub pretty: bool,
    /// Only validate syntax, don't evaluate
    pub syntax_only: bool,
}

/// Result of an eval operation
#[derive(Debug)]
pub enum EvalResult {
    /// Syntax validation passed
    SyntaxValid,
    /// Expression evaluated successfully
    Success(serde_json::Value),
}

/// Execute a reshape eval operation
pub fn execute_eval(options: &EvalOptions) -> Result<EvalResult, CliError> {
    let evaluator = Evaluator::new();
    let expr = evaluator.compile(&options.expression)?;

    if options.syntax_only {
        return Ok(EvalResult::SyntaxValid);
    }

    let data = match &options.input {
        Some(json) => Value::from(serde_json::from_str::<serde_json::Value>(json)?),
        None => Value::Null,
    };
    let variables = parse_variables(&options.variables)?;

    let ctx = EvalContext::new(data).with_variables(&variables);
    let result = evaluator.evaluate(&expr, &ctx)?;
    Ok(EvalResult::Success(result.to_json()))
}
