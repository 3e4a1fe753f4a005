//! `--var name=value` parsing

use super::CliError;
use crate::{context::Variables, value::Value};

/// Parses one `name=value` pair. The value is read as JSON when it parses,
/// otherwise it is taken as a plain string (`--var region=West`).
pub fn parse_variable(spec: &str) -> Result<(String, Value), CliError> {
    let Some((name, raw)) = spec.split_once('=') else {
        return Err(CliError::InvalidVariable(spec.to_string()));
    };
    let name = name.trim().trim_start_matches('$');
    if name.is_empty() {
        return Err(CliError::InvalidVariable(spec.to_string()));
    }

    let value = match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(json) => Value::from(json),
        Err(_) => Value::from(raw),
    };
    Ok((name.to_string(), value))
}

pub fn parse_variables(specs: &[String]) -> Result<Variables, CliError> {
    let mut variables = Variables::new();
    for spec in specs {
        let (name, value) = parse_variable(spec)?;
        variables.set(name, value);
    }
    Ok(variables)
}
