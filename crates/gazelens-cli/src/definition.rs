//! Pipeline definitions read from JSON files and `--step` flags.

use gazelens_pipeline::{Direction, ParamBindings, ParamValue};
use serde::{Deserialize, Serialize};

/// One step: an operation id and the parameters to bind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDefinition {
    /// Catalog id of the operation.
    pub operation: String,
    /// Parameters overriding the operation's defaults.
    #[serde(default)]
    pub params: ParamBindings,
}

/// A whole pipeline as written in a `--pipeline` file.
///
/// ```json
/// { "direction": "reversed",
///   "steps": [{ "operation": "blur", "params": { "ksize": 7 } }] }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineDefinition {
    /// Execution direction; storage order is the order of `steps`.
    #[serde(default)]
    pub direction: Direction,
    /// Steps in storage order.
    #[serde(default)]
    pub steps: Vec<StepDefinition>,
}

impl PipelineDefinition {
    /// Parse a definition from JSON text.
    ///
    /// # Errors
    ///
    /// Returns a message naming the JSON problem.
    pub fn from_json(json: &str) -> Result<Self, String> {
        serde_json::from_str(json).map_err(|e| format!("Error parsing pipeline definition: {e}"))
    }
}

/// Parse a `--step` argument of the form `id[:name=value,...]`.
///
/// Values that parse as numbers bind as numbers; anything else binds
/// as text.
///
/// # Errors
///
/// Returns a message for an empty id, an entry without `=`, or an
/// empty parameter name.
pub fn parse_step(arg: &str) -> Result<StepDefinition, String> {
    let (operation, rest) = arg.split_once(':').unwrap_or((arg, ""));
    let operation = operation.trim();
    if operation.is_empty() {
        return Err(format!("Invalid --step '{arg}': missing operation id"));
    }

    let mut params = ParamBindings::new();
    for entry in rest.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let Some((name, value)) = entry.split_once('=') else {
            return Err(format!("Invalid --step '{arg}': expected name=value, got '{entry}'"));
        };
        let name = name.trim();
        if name.is_empty() {
            return Err(format!("Invalid --step '{arg}': empty parameter name"));
        }
        let value = value.trim();
        let value = value
            .parse::<f64>()
            .map_or_else(|_| ParamValue::from(value), ParamValue::Number);
        params.set(name, value);
    }

    Ok(StepDefinition {
        operation: operation.to_string(),
        params,
    })
}
