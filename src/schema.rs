//! Parameter schema model: typed inputs, declared return type, and groups.
//!
//! The schema is assumed valid upstream (the parameter editing form owns
//! full validation); the only defensive check carried here is the list-type
//! invariant, plus name uniqueness because generated documents depend on it.

use serde::{Deserialize, Serialize};

use crate::error::RuleError;

/// Id of the distinguished "ungrouped" pseudo-group. It always exists, is
/// not orderable, and cannot be deleted.
pub const UNGROUPED_GROUP_ID: &str = "null";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Declared type of a single rule parameter.
pub enum ParamType {
    Numeric,
    Text,
    Boolean,
    /// Single selection out of the parameter's `list_options`.
    List,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Declared kind of a rule's return value.
pub enum ReturnKind {
    Numeric,
    Text,
    Boolean,
    /// An array; with options, every element must be one of them.
    List,
    /// A single scalar; with options, the value must be one of them.
    Enum,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// A named, typed input to a configuration rule.
pub struct Parameter {
    /// Derived identifier, unique within the rule's parameter set.
    pub name: String,
    /// Human label the identifier was derived from.
    pub label: String,
    #[serde(rename = "type")]
    pub param_type: ParamType,
    /// Allowed values; only meaningful (and required non-empty) for
    /// list-typed parameters.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub list_options: Vec<String>,
    /// Owning group, or `None` for the ungrouped pseudo-group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    /// Fractional sort key within the owning group.
    pub sort_order: f64,
}

impl Parameter {
    /// Builds a parameter from a human label, deriving its identifier.
    pub fn from_label(label: &str, param_type: ParamType) -> Self {
        Self {
            name: parameter_name_from_label(label),
            label: label.to_string(),
            param_type,
            list_options: Vec::new(),
            group_id: None,
            sort_order: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Declared shape/constraint of a rule's result.
pub struct ReturnType {
    #[serde(rename = "type")]
    pub kind: ReturnKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_options: Option<Vec<String>>,
}

impl ReturnType {
    pub fn scalar(kind: ReturnKind) -> Self {
        Self {
            kind,
            list_options: None,
        }
    }

    pub fn with_options(kind: ReturnKind, options: &[&str]) -> Self {
        Self {
            kind,
            list_options: Some(options.iter().map(|o| (*o).to_string()).collect()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// A named parameter group with a fractional sort key.
pub struct Group {
    pub id: String,
    pub name: String,
    pub sort_order: f64,
}

impl Group {
    /// The distinguished ungrouped pseudo-group.
    pub fn ungrouped() -> Self {
        Self {
            id: UNGROUPED_GROUP_ID.to_string(),
            name: "Ungrouped".to_string(),
            sort_order: 0.0,
        }
    }
}

/// Derives a parameter identifier from its human label: lowercased, spaces
/// replaced with underscores.
pub fn parameter_name_from_label(label: &str) -> String {
    label.trim().to_lowercase().replace(' ', "_")
}

/// Checks the invariants this core relies on: unique parameter names and
/// non-empty options on list-typed parameters.
pub fn validate_parameters(parameters: &[Parameter]) -> Result<(), RuleError> {
    let mut seen = std::collections::HashSet::new();
    for parameter in parameters {
        if !seen.insert(parameter.name.as_str()) {
            return Err(RuleError::Schema(format!(
                "duplicate parameter name '{}'",
                parameter.name
            )));
        }
        if parameter.param_type == ParamType::List && parameter.list_options.is_empty() {
            return Err(RuleError::Schema(format!(
                "list parameter '{}' must define at least one option",
                parameter.name
            )));
        }
    }
    Ok(())
}

/// Maps a parameter type to the primitive type name used in generated
/// declarations and runtime `typeof` checks.
pub fn primitive_name(param_type: ParamType) -> &'static str {
    match param_type {
        ParamType::Numeric => "number",
        ParamType::Text => "string",
        ParamType::Boolean => "boolean",
        ParamType::List => "string",
    }
}

/// Maps a scalar return kind to its runtime primitive name.
///
/// Only meaningful for scalar kinds; list/enum validation goes through
/// membership checks instead.
pub fn return_primitive_name(kind: ReturnKind) -> &'static str {
    match kind {
        ReturnKind::Numeric => "number",
        ReturnKind::Text => "string",
        ReturnKind::Boolean => "boolean",
        ReturnKind::List => "array",
        ReturnKind::Enum => "string",
    }
}

/// Human-facing name of a return kind, used in generated docs and errors.
pub fn return_kind_name(kind: ReturnKind) -> &'static str {
    match kind {
        ReturnKind::Numeric => "numeric",
        ReturnKind::Text => "text",
        ReturnKind::Boolean => "boolean",
        ReturnKind::List => "list",
        ReturnKind::Enum => "enum",
    }
}
