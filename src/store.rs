//! Persistence-boundary traits consumed by the engine, plus an in-memory
//! implementation for tests and local sessions.
//!
//! The engine owns no transport or wire format; these traits describe the
//! shapes it consumes and produces, nothing more.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::RuleError;
use crate::schema::Parameter;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
/// Standard audit fields carried on store records. Not read by the engine.
pub struct Audit {
    pub created_by: String,
    pub updated_by: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// A parameter row as the record store sees it.
pub struct ParameterRecord {
    #[serde(flatten)]
    pub parameter: Parameter,
    #[serde(flatten)]
    pub audit: Audit,
}

/// Record store for parameter rows and ordering updates. A reparent that
/// changes both the parent and the sort key arrives as one
/// [`RecordStore::reorder_entity`] call, never two.
pub trait RecordStore {
    fn create_parameter(&mut self, record: ParameterRecord) -> Result<(), RuleError>;
    fn update_parameter(&mut self, record: ParameterRecord) -> Result<(), RuleError>;
    fn reorder_entity(
        &mut self,
        id: &str,
        parent_id: Option<&str>,
        sort_order: f64,
    ) -> Result<(), RuleError>;
    fn delete_parameter(&mut self, id: &str) -> Result<(), RuleError>;
}

/// Persistence for the rule body itself: one call with the extracted
/// user body for the owning record and field.
pub trait RuleStore {
    fn save_rule(&mut self, rule_owner_id: &str, field: &str, body: &str)
        -> Result<(), RuleError>;
}

#[derive(Debug, Default)]
/// In-memory record and rule store. Can be told to fail its next call to
/// exercise error-handling paths.
pub struct MemoryRecordStore {
    parameters: BTreeMap<String, ParameterRecord>,
    /// Last confirmed `(parent_id, sort_order)` per entity id; groups are
    /// entities too, so this is kept separately from the parameter rows.
    entity_orders: BTreeMap<String, (Option<String>, f64)>,
    rules: BTreeMap<(String, String), String>,
    fail_next: Option<String>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next store call fail with the given message.
    pub fn fail_next_call(&mut self, message: &str) {
        self.fail_next = Some(message.to_string());
    }

    pub fn parameter(&self, id: &str) -> Option<&ParameterRecord> {
        self.parameters.get(id)
    }

    pub fn entity_order(&self, id: &str) -> Option<&(Option<String>, f64)> {
        self.entity_orders.get(id)
    }

    pub fn rule(&self, rule_owner_id: &str, field: &str) -> Option<&str> {
        self.rules
            .get(&(rule_owner_id.to_string(), field.to_string()))
            .map(String::as_str)
    }

    fn check_failure(&mut self) -> Result<(), RuleError> {
        if let Some(message) = self.fail_next.take() {
            return Err(RuleError::Store(message));
        }
        Ok(())
    }
}

impl RecordStore for MemoryRecordStore {
    fn create_parameter(&mut self, record: ParameterRecord) -> Result<(), RuleError> {
        self.check_failure()?;
        self.parameters
            .insert(record.parameter.name.clone(), record);
        Ok(())
    }

    fn update_parameter(&mut self, record: ParameterRecord) -> Result<(), RuleError> {
        self.check_failure()?;
        let id = record.parameter.name.clone();
        if !self.parameters.contains_key(&id) {
            return Err(RuleError::Store(format!("unknown parameter '{id}'")));
        }
        self.parameters.insert(id, record);
        Ok(())
    }

    fn reorder_entity(
        &mut self,
        id: &str,
        parent_id: Option<&str>,
        sort_order: f64,
    ) -> Result<(), RuleError> {
        self.check_failure()?;
        if let Some(record) = self.parameters.get_mut(id) {
            record.parameter.group_id = parent_id.map(|p| p.to_string());
            record.parameter.sort_order = sort_order;
        }
        self.entity_orders.insert(
            id.to_string(),
            (parent_id.map(|p| p.to_string()), sort_order),
        );
        Ok(())
    }

    fn delete_parameter(&mut self, id: &str) -> Result<(), RuleError> {
        self.check_failure()?;
        self.parameters
            .remove(id)
            .ok_or_else(|| RuleError::Store(format!("unknown parameter '{id}'")))?;
        Ok(())
    }
}

impl RuleStore for MemoryRecordStore {
    fn save_rule(
        &mut self,
        rule_owner_id: &str,
        field: &str,
        body: &str,
    ) -> Result<(), RuleError> {
        self.check_failure()?;
        self.rules.insert(
            (rule_owner_id.to_string(), field.to_string()),
            body.to_string(),
        );
        Ok(())
    }
}
