//! Generation of the ambient type declaration and the editable rule document.
//!
//! The editable document is a fixed-shape scaffold (doc comment + function
//! signature + closing brace) wrapping a variable-height user body. The
//! scaffold header is exactly `8 + |parameters|` lines, which is also the
//! locked-region boundary (see [`crate::editor::locked_line_count`]).

use crate::editor::{self, locked_line_count};
use crate::error::RuleError;
use crate::schema::{
    primitive_name, return_kind_name, validate_parameters, ParamType, Parameter, ReturnKind,
    ReturnType,
};

/// Renders the ambient TypeScript declaration used purely for editor-time
/// type assistance: a `Params` record type plus a `configure` signature.
pub fn ambient_declaration(parameters: &[Parameter], return_type: &ReturnType) -> String {
    let mut out = String::new();
    out.push_str("interface Params {\n");
    for parameter in parameters {
        out.push_str(&format!(
            "  {}: {};\n",
            parameter.name,
            parameter_ts_type(parameter)
        ));
    }
    out.push_str("}\n\n");
    out.push_str(&format!(
        "declare function configure(params: Params): {};\n",
        return_ts_type(return_type)
    ));
    out
}

fn parameter_ts_type(parameter: &Parameter) -> String {
    if parameter.param_type == ParamType::List && !parameter.list_options.is_empty() {
        return literal_union(&parameter.list_options);
    }
    primitive_name(parameter.param_type).to_string()
}

fn return_ts_type(return_type: &ReturnType) -> String {
    let options = return_type.list_options.as_deref().unwrap_or(&[]);
    match return_type.kind {
        ReturnKind::Numeric => "number".to_string(),
        ReturnKind::Text => "string".to_string(),
        ReturnKind::Boolean => "boolean".to_string(),
        ReturnKind::List => {
            if options.is_empty() {
                "string[]".to_string()
            } else {
                format!("({})[]", literal_union(options))
            }
        }
        ReturnKind::Enum => {
            if options.is_empty() {
                "string".to_string()
            } else {
                literal_union(options)
            }
        }
    }
}

fn literal_union(options: &[String]) -> String {
    options
        .iter()
        .map(|o| format!("\"{}\"", o))
        .collect::<Vec<_>>()
        .join(" | ")
}

/// Generates the initial editable document: a doc comment enumerating each
/// parameter and the return semantics, then a `configure` skeleton whose
/// body is `body` or a type-appropriate default literal.
///
/// Deterministic given the same inputs.
pub fn generate_document(
    parameters: &[Parameter],
    return_type: &ReturnType,
    body: Option<&str>,
) -> Result<String, RuleError> {
    validate_parameters(parameters)?;

    let mut lines: Vec<String> = Vec::with_capacity(locked_line_count(parameters) + 2);
    lines.push("/**".to_string());
    lines.push(" * Configuration rule for this field.".to_string());
    lines.push(" *".to_string());
    lines.push(" * Parameters:".to_string());
    for parameter in parameters {
        lines.push(format!(
            " *  - {}: {}",
            parameter.name,
            parameter_doc(parameter)
        ));
    }
    lines.push(" *".to_string());
    lines.push(format!(" * Returns: {}", return_doc(return_type)));
    lines.push(" */".to_string());
    lines.push("function configure(params) {".to_string());

    debug_assert_eq!(lines.len(), locked_line_count(parameters));

    let body = match body {
        Some(text) if !text.trim().is_empty() => text.trim_end().to_string(),
        _ => format!("  return {};", default_literal(return_type)),
    };
    for body_line in body.lines() {
        lines.push(body_line.to_string());
    }
    lines.push("}".to_string());

    Ok(lines.join("\n"))
}

/// Regenerates the scaffold for a changed schema, carrying the author's
/// in-progress body across from `existing` (sliced at the previous lock
/// boundary `old_locked`). Falls back to the default body when there is no
/// previous document.
pub fn regenerate_document(
    existing: Option<&str>,
    old_locked: usize,
    parameters: &[Parameter],
    return_type: &ReturnType,
) -> Result<String, RuleError> {
    let carried = existing.map(|document| editor::body_slice(document, old_locked));
    generate_document(parameters, return_type, carried.as_deref())
}

fn parameter_doc(parameter: &Parameter) -> String {
    if parameter.param_type == ParamType::List && !parameter.list_options.is_empty() {
        return format!("one of {}", quoted_list(&parameter.list_options));
    }
    primitive_name(parameter.param_type).to_string()
}

fn return_doc(return_type: &ReturnType) -> String {
    let options = return_type.list_options.as_deref().unwrap_or(&[]);
    match return_type.kind {
        ReturnKind::List if !options.is_empty() => {
            format!("array of {}", quoted_list(options))
        }
        ReturnKind::Enum if !options.is_empty() => {
            format!("one of {}", quoted_list(options))
        }
        kind => return_kind_name(kind).to_string(),
    }
}

fn quoted_list(options: &[String]) -> String {
    options
        .iter()
        .map(|o| format!("\"{}\"", o))
        .collect::<Vec<_>>()
        .join(", ")
}

fn default_literal(return_type: &ReturnType) -> String {
    let options = return_type.list_options.as_deref().unwrap_or(&[]);
    match return_type.kind {
        ReturnKind::Text => "\"test\"".to_string(),
        ReturnKind::Numeric => "1".to_string(),
        ReturnKind::Boolean => "true".to_string(),
        ReturnKind::List => match options.first() {
            Some(first) => format!("[\"{}\"]", first),
            None => "[]".to_string(),
        },
        ReturnKind::Enum => match options.first() {
            Some(first) => format!("\"{}\"", first),
            None => "\"test\"".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Parameter;

    fn qty() -> Parameter {
        Parameter::from_label("Qty", ParamType::Numeric)
    }

    #[test]
    fn header_height_matches_lock_boundary() {
        let params = vec![qty(), Parameter::from_label("Note", ParamType::Text)];
        let return_type = ReturnType::scalar(ReturnKind::Boolean);
        let document = generate_document(&params, &return_type, None).unwrap();
        let lines: Vec<&str> = document.lines().collect();
        assert_eq!(lines[locked_line_count(&params) - 1], "function configure(params) {");
        assert_eq!(*lines.last().unwrap(), "}");
    }

    #[test]
    fn list_parameter_renders_literal_union() {
        let mut color = Parameter::from_label("Color", ParamType::List);
        color.list_options = vec!["red".to_string(), "blue".to_string()];
        let declaration =
            ambient_declaration(&[color], &ReturnType::scalar(ReturnKind::Numeric));
        assert!(declaration.contains("color: \"red\" | \"blue\";"));
        assert!(declaration.contains("declare function configure(params: Params): number;"));
    }

    #[test]
    fn default_bodies_follow_return_type() {
        let cases = [
            (ReturnType::scalar(ReturnKind::Text), "  return \"test\";"),
            (ReturnType::scalar(ReturnKind::Numeric), "  return 1;"),
            (ReturnType::scalar(ReturnKind::Boolean), "  return true;"),
            (
                ReturnType::with_options(ReturnKind::Enum, &["A", "B"]),
                "  return \"A\";",
            ),
            (
                ReturnType::with_options(ReturnKind::List, &["A", "B"]),
                "  return [\"A\"];",
            ),
        ];
        for (return_type, expected) in cases {
            let document = generate_document(&[qty()], &return_type, None).unwrap();
            assert!(document.contains(expected), "missing {expected:?}");
        }
    }

    #[test]
    fn regeneration_preserves_typed_body() {
        let params = vec![qty()];
        let return_type = ReturnType::scalar(ReturnKind::Boolean);
        let body = "  const threshold = 10;\n  return params.qty > threshold;";
        let first = generate_document(&params, &return_type, Some(body)).unwrap();

        let grown = vec![qty(), Parameter::from_label("Note", ParamType::Text)];
        let second =
            regenerate_document(Some(&first), locked_line_count(&params), &grown, &return_type)
                .unwrap();
        assert!(second.contains("const threshold = 10;"));
        assert!(second.contains(" *  - note: string"));
    }
}
