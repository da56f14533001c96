use std::collections::BTreeMap;

use configrule::editor::{EditorSurface, MemoryEditor, Selection};
use configrule::schema::{Group, ParamType, Parameter, ReturnKind, ReturnType};
use configrule::store::{Audit, MemoryRecordStore, ParameterRecord, RecordStore};
use configrule::RuleSession;

fn values(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

fn parameter(label: &str, param_type: ParamType, sort_order: f64, group: Option<&str>) -> Parameter {
    let mut parameter = Parameter::from_label(label, param_type);
    parameter.sort_order = sort_order;
    parameter.group_id = group.map(|g| g.to_string());
    parameter
}

fn seeded_store(parameters: &[Parameter]) -> MemoryRecordStore {
    let mut store = MemoryRecordStore::new();
    for p in parameters {
        store
            .create_parameter(ParameterRecord {
                parameter: p.clone(),
                audit: Audit::default(),
            })
            .unwrap();
    }
    store
}

#[test]
fn edit_run_save_round_trip() {
    let params = vec![parameter("qty", ParamType::Numeric, 1.0, None)];
    let session = RuleSession::new(
        params,
        Vec::new(),
        ReturnType::scalar(ReturnKind::Boolean),
        Some("  return params.qty > 10;"),
    )
    .unwrap();

    let mut editor = MemoryEditor::new();
    session.attach(&mut editor);
    assert_eq!(editor.locked_lines(), 9);
    assert!(editor.text().contains("function configure(params) {"));

    let outcome = session.run_test(&values(&[("qty", "15")]));
    assert_eq!(outcome.display(), "Result: true");

    let mut store = MemoryRecordStore::new();
    let body = session.save(&mut store, "item-42", "unit_price_rule").unwrap();
    assert_eq!(body, "return params.qty > 10;");
    assert_eq!(
        store.rule("item-42", "unit_price_rule"),
        Some("return params.qty > 10;")
    );
}

#[test]
fn author_edits_survive_schema_growth() {
    let params = vec![parameter("qty", ParamType::Numeric, 1.0, None)];
    let mut session = RuleSession::new(
        params.clone(),
        Vec::new(),
        ReturnType::scalar(ReturnKind::Boolean),
        None,
    )
    .unwrap();

    let mut editor = MemoryEditor::new();
    session.attach(&mut editor);

    // The author replaces the default body.
    let edited = editor
        .text()
        .replace("  return true;", "  return params.qty > 3;");
    editor.set_text(&edited);
    session.sync_from_editor(&editor);

    let mut grown = params;
    grown.push(parameter("note", ParamType::Text, 2.0, None));
    session.set_parameters(grown).unwrap();
    assert_eq!(session.locked_lines(), 10);
    assert!(session.document().contains("return params.qty > 3;"));

    let outcome = session.run_test(&values(&[("qty", "4"), ("note", "x")]));
    assert_eq!(outcome.display(), "Result: true");
}

#[test]
fn locked_selection_is_rejected_below_the_repinned_boundary() {
    let params = vec![parameter("qty", ParamType::Numeric, 1.0, None)];
    let session = RuleSession::new(
        params,
        Vec::new(),
        ReturnType::scalar(ReturnKind::Numeric),
        None,
    )
    .unwrap();

    assert!(session.is_selection_locked(Selection::cursor(0)));
    assert!(session.is_selection_locked(Selection::cursor(9)));
    assert!(!session.is_selection_locked(Selection::cursor(10)));
}

#[test]
fn save_is_blocked_for_a_malformed_document() {
    let params = vec![parameter("qty", ParamType::Numeric, 1.0, None)];
    let mut session = RuleSession::new(
        params,
        Vec::new(),
        ReturnType::scalar(ReturnKind::Numeric),
        None,
    )
    .unwrap();

    let mut editor = MemoryEditor::new();
    session.attach(&mut editor);
    let broken = editor.text().replace('}', "");
    editor.set_text(&broken);
    session.sync_from_editor(&editor);

    let mut store = MemoryRecordStore::new();
    let err = session.save(&mut store, "item-1", "rule").unwrap_err();
    assert!(err.to_string().contains("no closing brace"));
    assert_eq!(store.rule("item-1", "rule"), None);
}

#[test]
fn successful_reorder_updates_authoritative_state_and_clears_overlay() {
    let params = vec![
        parameter("a", ParamType::Numeric, 2.0, None),
        parameter("b", ParamType::Numeric, 4.0, None),
        parameter("c", ParamType::Numeric, 6.0, None),
    ];
    let mut store = seeded_store(&params);
    let mut session = RuleSession::new(
        params,
        Vec::new(),
        ReturnType::scalar(ReturnKind::Numeric),
        None,
    )
    .unwrap();

    session.move_parameter(&mut store, "c", "b").unwrap();

    assert!(session.pending().is_empty());
    let rendered = session.rendered_parameters();
    let order: Vec<&str> = rendered.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(order, vec!["a", "c", "b"]);
    assert_eq!(store.parameter("c").unwrap().parameter.sort_order, 3.0);
}

#[test]
fn failed_reorder_reverts_the_overlay_and_leaves_state_untouched() {
    let params = vec![
        parameter("a", ParamType::Numeric, 2.0, None),
        parameter("b", ParamType::Numeric, 4.0, None),
    ];
    let mut store = seeded_store(&params);
    store.fail_next_call("backend unavailable");
    let mut session = RuleSession::new(
        params,
        Vec::new(),
        ReturnType::scalar(ReturnKind::Numeric),
        None,
    )
    .unwrap();

    let err = session.move_parameter(&mut store, "b", "a").unwrap_err();
    assert!(err.to_string().contains("backend unavailable"));
    assert!(session.pending().is_empty());

    let rendered = session.rendered_parameters();
    assert_eq!(rendered[0].id, "a");
    assert_eq!(rendered[0].sort_order, 2.0);
    assert_eq!(rendered[1].sort_order, 4.0);
}

#[test]
fn dropping_a_parameter_onto_a_group_reparents_atomically() {
    let params = vec![
        parameter("a", ParamType::Numeric, 2.0, None),
        parameter("b", ParamType::Numeric, 4.0, Some("g1")),
    ];
    let groups = vec![Group {
        id: "g1".to_string(),
        name: "Dimensions".to_string(),
        sort_order: 1.0,
    }];
    let mut store = seeded_store(&params);
    let mut session = RuleSession::new(
        params,
        groups,
        ReturnType::scalar(ReturnKind::Numeric),
        None,
    )
    .unwrap();

    session
        .drop_parameter_on_group(&mut store, "a", Some("g1"))
        .unwrap();

    let stored = store.parameter("a").unwrap();
    assert_eq!(stored.parameter.group_id.as_deref(), Some("g1"));
    assert!(stored.parameter.sort_order > 0.0 && stored.parameter.sort_order < 4.0);
}

#[test]
fn deleting_a_parameter_repins_the_lock_boundary() {
    let params = vec![
        parameter("a", ParamType::Numeric, 1.0, None),
        parameter("b", ParamType::Numeric, 2.0, None),
    ];
    let mut store = seeded_store(&params);
    let mut session = RuleSession::new(
        params,
        Vec::new(),
        ReturnType::scalar(ReturnKind::Numeric),
        None,
    )
    .unwrap();
    assert_eq!(session.locked_lines(), 10);

    session.delete_parameter(&mut store, "b").unwrap();
    assert_eq!(session.locked_lines(), 9);
    assert!(store.parameter("b").is_none());
}

#[test]
fn the_ungrouped_pseudo_group_is_protected() {
    let mut session = RuleSession::new(
        Vec::new(),
        Vec::new(),
        ReturnType::scalar(ReturnKind::Numeric),
        None,
    )
    .unwrap();

    let err = session.delete_group("null").unwrap_err();
    assert!(err.to_string().contains("cannot be deleted"));

    let mut store = MemoryRecordStore::new();
    let err = session.move_group(&mut store, "null", "null").unwrap_err();
    assert!(err.to_string().contains("unknown group") || err.to_string().contains("reordered"));
}

#[test]
fn group_reorder_between_one_and_two_lands_at_one_point_five() {
    let groups = vec![
        Group {
            id: "g1".to_string(),
            name: "First".to_string(),
            sort_order: 1.0,
        },
        Group {
            id: "g2".to_string(),
            name: "Second".to_string(),
            sort_order: 2.0,
        },
        Group {
            id: "g3".to_string(),
            name: "Third".to_string(),
            sort_order: 5.0,
        },
    ];
    let mut store = MemoryRecordStore::new();
    let mut session = RuleSession::new(
        Vec::new(),
        groups,
        ReturnType::scalar(ReturnKind::Numeric),
        None,
    )
    .unwrap();

    session.move_group(&mut store, "g3", "g2").unwrap();

    let moved = session.groups().iter().find(|g| g.id == "g3").unwrap();
    assert_eq!(moved.sort_order, 1.5);
    assert_eq!(store.entity_order("g3"), Some(&(None, 1.5)));
}
