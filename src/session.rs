//! One editing session over a rule: owns the schema, the editable
//! document, the lock boundary, and the optimistic ordering overlay.
//!
//! The session is the short-lived owner of parameters and groups; the
//! record store remains the long-lived owner across sessions.

use std::collections::BTreeMap;

use crate::document::{ambient_declaration, generate_document, regenerate_document};
use crate::editor::{extract_user_body, is_selection_locked, locked_line_count, EditorSurface, Selection};
use crate::error::RuleError;
use crate::executor::{run_rule, RunOutcome};
use crate::ordering::{
    place_between, place_group_between, place_in_group, OrderedEntity, PendingMutations,
    PendingPatch, Placement,
};
use crate::schema::{validate_parameters, Group, Parameter, ReturnType, UNGROUPED_GROUP_ID};
use crate::store::{RecordStore, RuleStore};

const LOCK_MESSAGE: &str =
    "This section is generated from the parameter schema and cannot be edited.";

/// Editing session for a single configurable field's rule.
pub struct RuleSession {
    parameters: Vec<Parameter>,
    groups: Vec<Group>,
    return_type: ReturnType,
    document: String,
    locked: usize,
    pending: PendingMutations,
}

impl RuleSession {
    /// Opens a session, generating the editable document around the
    /// persisted body (or the default body for a new rule).
    pub fn new(
        parameters: Vec<Parameter>,
        groups: Vec<Group>,
        return_type: ReturnType,
        saved_body: Option<&str>,
    ) -> Result<Self, RuleError> {
        validate_parameters(&parameters)?;
        let document = generate_document(&parameters, &return_type, saved_body)?;
        let locked = locked_line_count(&parameters);
        let mut groups = groups;
        if !groups.iter().any(|g| g.id == UNGROUPED_GROUP_ID) {
            groups.push(Group::ungrouped());
        }
        Ok(Self {
            parameters,
            groups,
            return_type,
            document,
            locked,
            pending: PendingMutations::new(),
        })
    }

    pub fn document(&self) -> &str {
        &self.document
    }

    pub fn locked_lines(&self) -> usize {
        self.locked
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// The ambient declaration for editor-time type assistance.
    pub fn ambient_declaration(&self) -> String {
        ambient_declaration(&self.parameters, &self.return_type)
    }

    /// Pushes the current document and lock boundary into an editor surface.
    pub fn attach(&self, editor: &mut dyn EditorSurface) {
        editor.set_text(&self.document);
        editor.set_locked_region(self.locked, LOCK_MESSAGE);
    }

    /// Accepts the author's edits back from the editor surface.
    pub fn sync_from_editor(&mut self, editor: &dyn EditorSurface) {
        self.document = editor.text();
    }

    pub fn is_selection_locked(&self, selection: Selection) -> bool {
        is_selection_locked(selection, self.locked)
    }

    /// Replaces the parameter set, regenerating the scaffold while carrying
    /// the author's in-progress body across and re-pinning the lock
    /// boundary.
    pub fn set_parameters(&mut self, parameters: Vec<Parameter>) -> Result<(), RuleError> {
        validate_parameters(&parameters)?;
        self.document = regenerate_document(
            Some(&self.document),
            self.locked,
            &parameters,
            &self.return_type,
        )?;
        self.locked = locked_line_count(&parameters);
        self.parameters = parameters;
        Ok(())
    }

    /// Replaces the declared return type, regenerating the scaffold.
    pub fn set_return_type(&mut self, return_type: ReturnType) -> Result<(), RuleError> {
        self.document = regenerate_document(
            Some(&self.document),
            self.locked,
            &self.parameters,
            &return_type,
        )?;
        self.return_type = return_type;
        Ok(())
    }

    /// Runs the rule against raw test values. Never fails the session;
    /// both outcomes come back as the display string contract.
    pub fn run_test(&self, raw_values: &BTreeMap<String, String>) -> RunOutcome {
        run_rule(
            &self.document,
            &self.parameters,
            raw_values,
            Some(&self.return_type),
        )
    }

    /// Extracts the user body strictly and persists it. A malformed
    /// closing brace or a store failure blocks the save; the document
    /// stays editable either way.
    pub fn save(
        &self,
        store: &mut dyn RuleStore,
        rule_owner_id: &str,
        field: &str,
    ) -> Result<String, RuleError> {
        let body = extract_user_body(&self.document, self.locked)?;
        store.save_rule(rule_owner_id, field, &body)?;
        Ok(body)
    }

    /// Drags `active` to the position of `over`, submitting one atomic
    /// reorder update. The pending overlay reflects the move until the
    /// store call settles; on failure the overlay is reverted and the
    /// authoritative rows stay untouched.
    pub fn move_parameter(
        &mut self,
        store: &mut dyn RecordStore,
        active_id: &str,
        over_id: &str,
    ) -> Result<(), RuleError> {
        let entities = self.parameter_entities();
        let active = find_entity(&entities, active_id)?;
        let over = find_entity(&entities, over_id)?;
        let placement = place_between(active, over, &entities)?;
        self.submit_parameter_placement(store, active_id, placement)
    }

    /// Drops a parameter onto a group with no specific sibling target.
    pub fn drop_parameter_on_group(
        &mut self,
        store: &mut dyn RecordStore,
        parameter_id: &str,
        group_id: Option<&str>,
    ) -> Result<(), RuleError> {
        if let Some(group_id) = group_id {
            if group_id != UNGROUPED_GROUP_ID && !self.groups.iter().any(|g| g.id == group_id) {
                return Err(RuleError::Ordering(format!("unknown group '{group_id}'")));
            }
        }
        let entities = self.parameter_entities();
        find_entity(&entities, parameter_id)?;
        let placement = place_in_group(group_id, &entities);
        self.submit_parameter_placement(store, parameter_id, placement)
    }

    /// Reorders a group relative to another group.
    pub fn move_group(
        &mut self,
        store: &mut dyn RecordStore,
        active_id: &str,
        over_id: &str,
    ) -> Result<(), RuleError> {
        let active = self
            .groups
            .iter()
            .find(|g| g.id == active_id)
            .cloned()
            .ok_or_else(|| RuleError::Ordering(format!("unknown group '{active_id}'")))?;
        let over = self
            .groups
            .iter()
            .find(|g| g.id == over_id)
            .cloned()
            .ok_or_else(|| RuleError::Ordering(format!("unknown group '{over_id}'")))?;
        let placement = place_group_between(&active, &over, &self.groups)?;

        self.pending
            .stage(active_id, PendingPatch::placement(&placement));
        match store.reorder_entity(active_id, None, placement.sort_order) {
            Ok(()) => {
                if let Some(group) = self.groups.iter_mut().find(|g| g.id == active_id) {
                    group.sort_order = placement.sort_order;
                }
                self.pending.settle(active_id);
                Ok(())
            }
            Err(err) => {
                self.pending.settle(active_id);
                Err(err)
            }
        }
    }

    /// Removes a parameter locally and from the store, re-pinning the lock
    /// boundary for the shrunken scaffold.
    pub fn delete_parameter(
        &mut self,
        store: &mut dyn RecordStore,
        parameter_id: &str,
    ) -> Result<(), RuleError> {
        if !self.parameters.iter().any(|p| p.name == parameter_id) {
            return Err(RuleError::Ordering(format!(
                "unknown parameter '{parameter_id}'"
            )));
        }
        store.delete_parameter(parameter_id)?;
        let remaining: Vec<Parameter> = self
            .parameters
            .iter()
            .filter(|p| p.name != parameter_id)
            .cloned()
            .collect();
        self.pending.settle(parameter_id);
        self.set_parameters(remaining)
    }

    /// Deletes a group, moving its parameters to the ungrouped
    /// pseudo-group. The ungrouped pseudo-group itself cannot be deleted.
    pub fn delete_group(&mut self, group_id: &str) -> Result<(), RuleError> {
        if group_id == UNGROUPED_GROUP_ID {
            return Err(RuleError::Ordering(
                "the ungrouped pseudo-group cannot be deleted".to_string(),
            ));
        }
        let index = self
            .groups
            .iter()
            .position(|g| g.id == group_id)
            .ok_or_else(|| RuleError::Ordering(format!("unknown group '{group_id}'")))?;
        self.groups.remove(index);
        for parameter in &mut self.parameters {
            if parameter.group_id.as_deref() == Some(group_id) {
                parameter.group_id = None;
            }
        }
        Ok(())
    }

    /// The parameter collection as rendered: pending patches merged over
    /// the authoritative rows, ordered by group and fractional key.
    pub fn rendered_parameters(&self) -> Vec<OrderedEntity> {
        let mut merged = self.pending.merged(&self.parameter_entities());
        merged.sort_by(|a, b| {
            (a.parent_id.as_deref(), a.sort_order)
                .partial_cmp(&(b.parent_id.as_deref(), b.sort_order))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        merged
    }

    /// In-flight mutations, exposed for reconciliation-aware callers.
    pub fn pending(&self) -> &PendingMutations {
        &self.pending
    }

    fn parameter_entities(&self) -> Vec<OrderedEntity> {
        self.parameters.iter().map(OrderedEntity::parameter).collect()
    }

    fn submit_parameter_placement(
        &mut self,
        store: &mut dyn RecordStore,
        parameter_id: &str,
        placement: Placement,
    ) -> Result<(), RuleError> {
        self.pending
            .stage(parameter_id, PendingPatch::placement(&placement));
        match store.reorder_entity(
            parameter_id,
            placement.parent_id.as_deref(),
            placement.sort_order,
        ) {
            Ok(()) => {
                if let Some(parameter) =
                    self.parameters.iter_mut().find(|p| p.name == parameter_id)
                {
                    parameter.sort_order = placement.sort_order;
                    parameter.group_id = placement.parent_id.clone();
                }
                self.pending.settle(parameter_id);
                Ok(())
            }
            Err(err) => {
                // Revert the optimistic overlay; authoritative state wins.
                self.pending.settle(parameter_id);
                Err(err)
            }
        }
    }
}

fn find_entity<'a>(
    entities: &'a [OrderedEntity],
    id: &str,
) -> Result<&'a OrderedEntity, RuleError> {
    entities
        .iter()
        .find(|e| e.id == id)
        .ok_or_else(|| RuleError::Ordering(format!("unknown parameter '{id}'")))
}
