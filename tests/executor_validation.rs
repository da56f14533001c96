use std::collections::BTreeMap;

use configrule::schema::{ParamType, Parameter, ReturnKind, ReturnType};
use configrule::{generate_document, run_rule};

fn values(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

fn configure(body: &str) -> String {
    format!("function configure(params) {{\n{body}\n}}")
}

#[test]
fn enum_return_outside_allowed_set_names_value_and_options() {
    let return_type = ReturnType::with_options(ReturnKind::Enum, &["A", "B"]);
    let outcome = run_rule(
        &configure("  return \"C\";"),
        &[],
        &values(&[]),
        Some(&return_type),
    );
    assert!(!outcome.is_success());
    assert!(outcome.display().contains("\"C\""));
    assert!(outcome.display().contains("A, B"));
}

#[test]
fn list_return_names_the_first_invalid_element() {
    let return_type = ReturnType::with_options(ReturnKind::List, &["A", "B"]);
    let outcome = run_rule(
        &configure("  return [\"A\", \"C\"];"),
        &[],
        &values(&[]),
        Some(&return_type),
    );
    assert!(!outcome.is_success());
    assert!(outcome.display().contains("\"C\""));
}

#[test]
fn list_return_accepts_members_only() {
    let return_type = ReturnType::with_options(ReturnKind::List, &["A", "B"]);
    let outcome = run_rule(
        &configure("  return [\"B\", \"A\"];"),
        &[],
        &values(&[]),
        Some(&return_type),
    );
    assert_eq!(outcome.display(), "Result: [\"B\",\"A\"]");
}

#[test]
fn enum_return_must_not_be_an_array() {
    let return_type = ReturnType::with_options(ReturnKind::Enum, &["A", "B"]);
    let outcome = run_rule(
        &configure("  return [\"A\"];"),
        &[],
        &values(&[]),
        Some(&return_type),
    );
    assert!(outcome.display().contains("enum"));
    assert!(outcome.display().contains("array"));
}

#[test]
fn scalar_mismatch_reports_expected_and_actual() {
    let return_type = ReturnType::scalar(ReturnKind::Numeric);
    let outcome = run_rule(
        &configure("  return \"5\";"),
        &[],
        &values(&[]),
        Some(&return_type),
    );
    assert!(outcome.display().contains("\"numeric\""));
    assert!(outcome.display().contains("\"string\""));
}

#[test]
fn execution_errors_surface_verbatim_with_prefix() {
    let return_type = ReturnType::scalar(ReturnKind::Numeric);
    let outcome = run_rule(
        &configure("  return missing_helper(1);"),
        &[],
        &values(&[]),
        Some(&return_type),
    );
    assert_eq!(
        outcome.display(),
        "Error: missing_helper is not defined"
    );
}

#[test]
fn runaway_scripts_fail_instead_of_hanging() {
    let return_type = ReturnType::scalar(ReturnKind::Numeric);
    let outcome = run_rule(
        &configure("  while (true) { }\n  return 1;"),
        &[],
        &values(&[]),
        Some(&return_type),
    );
    assert!(!outcome.is_success());
    assert!(outcome.display().contains("evaluation steps"));
}

#[test]
fn end_to_end_quantity_scenario() {
    let params = vec![Parameter::from_label("qty", ParamType::Numeric)];
    let return_type = ReturnType::scalar(ReturnKind::Boolean);
    let document =
        generate_document(&params, &return_type, Some("  return params.qty > 10;")).unwrap();

    let over = run_rule(&document, &params, &values(&[("qty", "15")]), Some(&return_type));
    assert_eq!(over.display(), "Result: true");

    let under = run_rule(&document, &params, &values(&[("qty", "5")]), Some(&return_type));
    assert_eq!(under.display(), "Result: false");
}

#[test]
fn annotated_body_runs_after_stripping() {
    let params = vec![Parameter::from_label("qty", ParamType::Numeric)];
    let return_type = ReturnType::scalar(ReturnKind::Numeric);
    let source = "function helper(base: number): number {\n  return base * 2;\n}\nfunction configure(params: Params): number {\n  return helper(params.qty) as number;\n}";
    let outcome = run_rule(source, &params, &values(&[("qty", "4")]), Some(&return_type));
    assert_eq!(outcome.display(), "Result: 8");
}

#[test]
fn boolean_test_values_coerce_from_the_literal_true() {
    let params = vec![Parameter::from_label("active", ParamType::Boolean)];
    let return_type = ReturnType::scalar(ReturnKind::Boolean);
    let document = generate_document(&params, &return_type, Some("  return params.active;")).unwrap();

    let on = run_rule(&document, &params, &values(&[("active", "true")]), Some(&return_type));
    assert_eq!(on.display(), "Result: true");
    let off = run_rule(&document, &params, &values(&[("active", "yes")]), Some(&return_type));
    assert_eq!(off.display(), "Result: false");
}
