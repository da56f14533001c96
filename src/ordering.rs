//! Fractional-key ordering for parameters and groups, plus the optimistic
//! pending-mutation overlay merged over authoritative state at render time.
//!
//! Midpoint insertion never renumbers existing siblings, so a reorder only
//! ever touches one entity. Repeated insertion between the same two
//! neighbors will eventually approach f64 resolution; no renormalization
//! pass exists, and none is assumed here.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::RuleError;
use crate::schema::{Group, Parameter, UNGROUPED_GROUP_ID};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Shared ordering shape for parameters and groups.
pub struct OrderedEntity {
    pub id: String,
    pub sort_order: f64,
    /// Owning group for parameters; always `None` for groups.
    pub parent_id: Option<String>,
}

impl OrderedEntity {
    pub fn parameter(parameter: &Parameter) -> Self {
        Self {
            id: parameter.name.clone(),
            sort_order: parameter.sort_order,
            parent_id: parameter.group_id.clone(),
        }
    }

    pub fn group(group: &Group) -> Self {
        Self {
            id: group.id.clone(),
            sort_order: group.sort_order,
            parent_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
/// New position for one entity: a fresh fractional key and (for
/// parameters) the owning group, applied as one atomic update.
pub struct Placement {
    pub sort_order: f64,
    pub parent_id: Option<String>,
}

/// Computes the placement for dragging `active` to the position of `over`.
///
/// When `active` sits below `over` (greater key) or lives under a different
/// parent, it is inserted before `over`: the new key is the midpoint of
/// `over`'s key and the greatest sibling key below it (0 when none).
/// Otherwise it is inserted after `over`: the midpoint of `over`'s key and
/// the least sibling key above it (`over + 1` when none).
pub fn place_between(
    active: &OrderedEntity,
    over: &OrderedEntity,
    entities: &[OrderedEntity],
) -> Result<Placement, RuleError> {
    if active.id == over.id {
        return Err(RuleError::Ordering(format!(
            "cannot reorder '{}' relative to itself",
            active.id
        )));
    }

    let siblings: Vec<&OrderedEntity> = entities
        .iter()
        .filter(|e| e.parent_id == over.parent_id)
        .collect();

    let insert_before = active.sort_order > over.sort_order || active.parent_id != over.parent_id;
    let sort_order = if insert_before {
        let before = siblings
            .iter()
            .map(|e| e.sort_order)
            .filter(|&key| key < over.sort_order)
            .fold(0.0_f64, f64::max);
        (before + over.sort_order) / 2.0
    } else {
        let before = over.sort_order;
        let after = siblings
            .iter()
            .map(|e| e.sort_order)
            .filter(|&key| key > before)
            .fold(f64::INFINITY, f64::min);
        let after = if after.is_finite() { after } else { before + 1.0 };
        (before + after) / 2.0
    };

    Ok(Placement {
        sort_order,
        parent_id: over.parent_id.clone(),
    })
}

/// Computes the placement for dropping a parameter onto a group with no
/// specific sibling target: the midpoint between 0 and the group's current
/// first child, or of (0, 1) when the group is empty.
pub fn place_in_group(
    group_id: Option<&str>,
    entities: &[OrderedEntity],
) -> Placement {
    let first_child = entities
        .iter()
        .filter(|e| e.parent_id.as_deref() == group_id)
        .map(|e| e.sort_order)
        .fold(f64::INFINITY, f64::min);
    let upper = if first_child.is_finite() { first_child } else { 1.0 };

    Placement {
        sort_order: upper / 2.0,
        parent_id: group_id.map(|g| g.to_string()),
    }
}

/// Computes the placement for reordering a group relative to another group.
/// Groups carry no parent; the ungrouped pseudo-group is not orderable.
pub fn place_group_between(
    active: &Group,
    over: &Group,
    groups: &[Group],
) -> Result<Placement, RuleError> {
    if active.id == UNGROUPED_GROUP_ID || over.id == UNGROUPED_GROUP_ID {
        return Err(RuleError::Ordering(
            "the ungrouped pseudo-group cannot be reordered".to_string(),
        ));
    }
    let entities: Vec<OrderedEntity> = groups
        .iter()
        .filter(|g| g.id != UNGROUPED_GROUP_ID)
        .map(OrderedEntity::group)
        .collect();
    place_between(
        &OrderedEntity::group(active),
        &OrderedEntity::group(over),
        &entities,
    )
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
/// An uncommitted ordering change for one entity, merged over the
/// authoritative row until the owning request settles.
pub struct PendingPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<f64>,
    /// `Some(None)` moves the entity to the ungrouped pseudo-group.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Option<String>>,
}

impl PendingPatch {
    pub fn placement(placement: &Placement) -> Self {
        Self {
            sort_order: Some(placement.sort_order),
            parent_id: Some(placement.parent_id.clone()),
        }
    }
}

#[derive(Debug, Clone, Default)]
/// In-flight ordering mutations, keyed by entity id. A second mutation for
/// the same entity supersedes the first; mutations for different entities
/// coexist independently.
pub struct PendingMutations {
    pending: BTreeMap<String, PendingPatch>,
}

impl PendingMutations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stages (or replaces) the pending patch for an entity.
    pub fn stage(&mut self, entity_id: &str, patch: PendingPatch) {
        self.pending.insert(entity_id.to_string(), patch);
    }

    /// Discards the pending entry once the owning request settles (whether
    /// confirmed or reverted); the authoritative value takes over.
    pub fn settle(&mut self, entity_id: &str) {
        self.pending.remove(entity_id);
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn get(&self, entity_id: &str) -> Option<&PendingPatch> {
        self.pending.get(entity_id)
    }

    /// Merges pending patches over the authoritative collection for
    /// rendering; the authoritative rows are not modified.
    pub fn merged(&self, entities: &[OrderedEntity]) -> Vec<OrderedEntity> {
        entities
            .iter()
            .map(|entity| {
                let mut merged = entity.clone();
                if let Some(patch) = self.pending.get(&entity.id) {
                    if let Some(sort_order) = patch.sort_order {
                        merged.sort_order = sort_order;
                    }
                    if let Some(parent_id) = &patch.parent_id {
                        merged.parent_id = parent_id.clone();
                    }
                }
                merged
            })
            .collect()
    }
}
