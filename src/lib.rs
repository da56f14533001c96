pub mod document;
pub mod editor;
pub mod error;
pub mod executor;
pub mod ordering;
pub mod schema;
pub mod script;
pub mod session;
pub mod store;
pub mod transpile;

use std::collections::BTreeMap;

pub use document::{ambient_declaration, generate_document, regenerate_document};
pub use editor::{extract_user_body, is_selection_locked, locked_line_count, Selection};
pub use error::RuleError;
pub use executor::{coerce_test_values, run_rule, RunOutcome};
pub use ordering::{OrderedEntity, PendingMutations, PendingPatch, Placement};
pub use schema::{Group, ParamType, Parameter, ReturnKind, ReturnType, UNGROUPED_GROUP_ID};
pub use session::RuleSession;
pub use store::{Audit, MemoryRecordStore, ParameterRecord, RecordStore, RuleStore};
pub use transpile::strip_source;

/// Generates both documents for a rule in one call: the ambient type
/// declaration and the initial editable document.
pub fn generate_documents(
    parameters: &[Parameter],
    return_type: &ReturnType,
    saved_body: Option<&str>,
) -> Result<(String, String), RuleError> {
    let declaration = ambient_declaration(parameters, return_type);
    let document = generate_document(parameters, return_type, saved_body)?;
    Ok((declaration, document))
}

/// Runs a full editable document against raw test values and returns the
/// author-facing display string.
pub fn run_rule_test(
    document: &str,
    parameters: &[Parameter],
    raw_values: &BTreeMap<String, String>,
    return_type: &ReturnType,
) -> String {
    run_rule(document, parameters, raw_values, Some(return_type))
        .display()
        .to_string()
}

/// Extracts the persistable rule body from a full document, enforcing the
/// strict closing-brace contract.
pub fn extract_rule_body(document: &str, parameters: &[Parameter]) -> Result<String, RuleError> {
    extract_user_body(document, locked_line_count(parameters))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use crate::schema::{ParamType, Parameter, ReturnKind, ReturnType};
    use crate::{extract_rule_body, generate_documents, run_rule_test};

    fn values(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn generates_and_runs_a_quantity_rule() {
        let params = vec![Parameter::from_label("qty", ParamType::Numeric)];
        let return_type = ReturnType::scalar(ReturnKind::Boolean);
        let (declaration, document) =
            generate_documents(&params, &return_type, Some("  return params.qty > 10;"))
                .unwrap();

        assert!(declaration.contains("qty: number;"));
        assert_eq!(
            run_rule_test(&document, &params, &values(&[("qty", "15")]), &return_type),
            "Result: true"
        );
        assert_eq!(
            run_rule_test(&document, &params, &values(&[("qty", "5")]), &return_type),
            "Result: false"
        );
    }

    #[test]
    fn extraction_round_trips_the_generated_body() {
        let params = vec![Parameter::from_label("qty", ParamType::Numeric)];
        let return_type = ReturnType::scalar(ReturnKind::Boolean);
        let body = "return params.qty > 10;";
        let (_, document) = generate_documents(&params, &return_type, Some(body)).unwrap();
        assert_eq!(extract_rule_body(&document, &params).unwrap(), body);
    }
}
