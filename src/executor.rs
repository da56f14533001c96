//! Preview execution of a rule body and validation of its return value.
//!
//! This is the single error-recovery boundary of the engine: everything the
//! author's script can do wrong is caught here and converted to a display
//! string. It is a best-effort preview facility, not an isolation
//! boundary — the script runs in-process and must never be exposed to
//! hostile authors.

use std::collections::BTreeMap;

use serde_json::{Map as JsonMap, Number as JsonNumber, Value as JsonValue};

use crate::error::RuleError;
use crate::schema::{
    return_kind_name, return_primitive_name, ParamType, Parameter, ReturnKind, ReturnType,
};
use crate::script;
use crate::transpile::strip_source;

#[derive(Debug, Clone, PartialEq)]
/// Terminal, non-throwing outcome of a "Run Test" invocation.
pub enum RunOutcome {
    /// The rule produced a value of the declared return type.
    Success {
        value: JsonValue,
        display: String,
    },
    /// Execution or return-type validation failed.
    Failure {
        display: String,
    },
}

impl RunOutcome {
    /// The string shown to the author, for either outcome.
    pub fn display(&self) -> &str {
        match self {
            RunOutcome::Success { display, .. } | RunOutcome::Failure { display } => display,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Success { .. })
    }

    fn error(message: impl Into<String>) -> Self {
        RunOutcome::Failure {
            display: format!("Error: {}", message.into()),
        }
    }
}

/// Builds the parameter value bag from the schema and the raw (string-typed)
/// test values entered in the UI. Numeric values that fail to parse coerce
/// to null; the run then fails downstream rather than here.
pub fn coerce_test_values(
    parameters: &[Parameter],
    raw_values: &BTreeMap<String, String>,
) -> JsonValue {
    let mut bag = JsonMap::new();
    for parameter in parameters {
        let value = match raw_values.get(&parameter.name) {
            Some(raw) => coerce_one(parameter.param_type, raw),
            None => JsonValue::Null,
        };
        bag.insert(parameter.name.clone(), value);
    }
    JsonValue::Object(bag)
}

fn coerce_one(param_type: ParamType, raw: &str) -> JsonValue {
    match param_type {
        ParamType::Numeric => match raw.trim().parse::<f64>() {
            Ok(n) if n.fract() == 0.0 && n >= i64::MIN as f64 && n <= i64::MAX as f64 => {
                JsonValue::Number(JsonNumber::from(n as i64))
            }
            Ok(n) => JsonNumber::from_f64(n)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Err(_) => JsonValue::Null,
        },
        ParamType::Boolean => JsonValue::Bool(raw == "true"),
        ParamType::Text | ParamType::List => JsonValue::String(raw.to_string()),
    }
}

/// Strips, executes, and validates a rule body against its declared return
/// type. Never returns an error: both paths land in [`RunOutcome`].
pub fn run_rule(
    source: &str,
    parameters: &[Parameter],
    raw_values: &BTreeMap<String, String>,
    return_type: Option<&ReturnType>,
) -> RunOutcome {
    let Some(return_type) = return_type else {
        return RunOutcome::error("no return type is declared for this rule");
    };

    let bag = coerce_test_values(parameters, raw_values);
    let stripped = strip_source(source);

    let value = match script::run_source(&stripped, bag) {
        Ok(value) => value,
        Err(err) => return RunOutcome::error(inner_message(err)),
    };

    if let Err(message) = validate_return_value(&value, return_type) {
        return RunOutcome::error(message);
    }

    let display = format!("Result: {}", render_value(&value));
    RunOutcome::Success { value, display }
}

/// Checks a produced value against the declared return type. Returns the
/// mismatch description on failure.
pub fn validate_return_value(value: &JsonValue, return_type: &ReturnType) -> Result<(), String> {
    let options = return_type.list_options.as_deref().unwrap_or(&[]);
    match return_type.kind {
        ReturnKind::List => {
            let JsonValue::Array(elements) = value else {
                return Err(format!(
                    "expected an array for the declared list return type, got {}",
                    runtime_type_name(value)
                ));
            };
            if !options.is_empty() {
                for element in elements {
                    if !is_member(element, options) {
                        return Err(format!(
                            "invalid list element {}; allowed values: {}",
                            render_value(element),
                            options.join(", ")
                        ));
                    }
                }
            }
            Ok(())
        }
        ReturnKind::Enum => {
            if value.is_array() {
                return Err(
                    "expected a single value for the declared enum return type, got an array"
                        .to_string(),
                );
            }
            if !options.is_empty() && !is_member(value, options) {
                return Err(format!(
                    "{} is not one of the allowed values: {}",
                    render_value(value),
                    options.join(", ")
                ));
            }
            Ok(())
        }
        kind => {
            let expected = return_primitive_name(kind);
            if runtime_type_name(value) != expected {
                return Err(format!(
                    "expected return type \"{}\" but the rule returned \"{}\"",
                    return_kind_name(kind),
                    runtime_type_name(value)
                ));
            }
            Ok(())
        }
    }
}

fn is_member(value: &JsonValue, options: &[String]) -> bool {
    match value {
        JsonValue::String(s) => options.iter().any(|o| o == s),
        other => {
            let rendered = render_value(other);
            options.iter().any(|o| *o == rendered)
        }
    }
}

fn runtime_type_name(value: &JsonValue) -> &'static str {
    crate::script::eval::json_type_name(value)
}

fn render_value(value: &JsonValue) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| value.to_string())
}

fn inner_message(err: RuleError) -> String {
    match err {
        RuleError::Script(message) => message,
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Parameter;
    use serde_json::json;

    fn values(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn coerces_test_values_per_declared_type() {
        let params = vec![
            Parameter::from_label("qty", ParamType::Numeric),
            Parameter::from_label("active", ParamType::Boolean),
            Parameter::from_label("note", ParamType::Text),
        ];
        let bag = coerce_test_values(
            &params,
            &values(&[("qty", "15"), ("active", "true"), ("note", "hi")]),
        );
        assert_eq!(bag, json!({"qty": 15, "active": true, "note": "hi"}));
    }

    #[test]
    fn unparseable_numeric_coerces_to_null() {
        let params = vec![Parameter::from_label("qty", ParamType::Numeric)];
        let bag = coerce_test_values(&params, &values(&[("qty", "abc")]));
        assert_eq!(bag, json!({"qty": null}));
    }

    #[test]
    fn scalar_type_mismatch_names_both_types() {
        let return_type = ReturnType::scalar(ReturnKind::Numeric);
        let err = validate_return_value(&json!("5"), &return_type).unwrap_err();
        assert!(err.contains("\"numeric\""));
        assert!(err.contains("\"string\""));
    }

    #[test]
    fn missing_return_type_is_a_failure() {
        let outcome = run_rule("function configure(params) { return 1; }", &[], &values(&[]), None);
        assert_eq!(
            outcome.display(),
            "Error: no return type is declared for this rule"
        );
    }
}
