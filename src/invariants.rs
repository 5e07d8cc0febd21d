use std::collections::HashSet;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

use crate::error::{LibError, Result};
use crate::models::{Entity, EntityId, Relationship, RelationshipId};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GraphInvariantViolation {
    DanglingSource {
        relationship_id: RelationshipId,
        missing_entity_id: EntityId,
    },
    DanglingTarget {
        relationship_id: RelationshipId,
        missing_entity_id: EntityId,
    },
    DuplicateEntityId {
        entity_id: EntityId,
    },
    DuplicateRelationshipId {
        relationship_id: RelationshipId,
    },
    /// Advisory only: at least one primary key per entity is recommended,
    /// never enforced.
    MissingPrimaryKey {
        entity_id: EntityId,
    },
}

impl GraphInvariantViolation {
    pub const fn error_code(&self) -> &'static str {
        match self {
            GraphInvariantViolation::DanglingSource { .. } => "graph_dangling_source",
            GraphInvariantViolation::DanglingTarget { .. } => "graph_dangling_target",
            GraphInvariantViolation::DuplicateEntityId { .. } => "graph_duplicate_entity_id",
            GraphInvariantViolation::DuplicateRelationshipId { .. } => {
                "graph_duplicate_relationship_id"
            }
            GraphInvariantViolation::MissingPrimaryKey { .. } => "graph_missing_primary_key",
        }
    }

    pub const fn public_message(&self) -> &'static str {
        match self {
            GraphInvariantViolation::DanglingSource { .. } => {
                "La relacion referencia una tabla de origen que no existe"
            }
            GraphInvariantViolation::DanglingTarget { .. } => {
                "La relacion referencia una tabla de destino que no existe"
            }
            GraphInvariantViolation::DuplicateEntityId { .. } => {
                "Los identificadores de tabla deben ser unicos"
            }
            GraphInvariantViolation::DuplicateRelationshipId { .. } => {
                "Los identificadores de relacion deben ser unicos"
            }
            GraphInvariantViolation::MissingPrimaryKey { .. } => {
                "Se recomienda que cada tabla tenga al menos una clave primaria"
            }
        }
    }
}

/// Structural violations of the canvas graph: duplicate ids and dangling
/// endpoint references. Externally supplied graphs are not rejected on
/// these (dangling references are permitted transiently during merges);
/// this exists for diagnostics and for validating synthesized output.
pub fn graph_invariant_violations(
    nodes: &[Entity],
    edges: &[Relationship],
) -> Vec<GraphInvariantViolation> {
    let mut violations = Vec::new();

    let mut entity_ids: HashSet<&EntityId> = HashSet::with_capacity(nodes.len());
    for node in nodes {
        if !entity_ids.insert(&node.id) {
            violations.push(GraphInvariantViolation::DuplicateEntityId {
                entity_id: node.id.clone(),
            });
        }
    }

    let mut relationship_ids: HashSet<&RelationshipId> = HashSet::with_capacity(edges.len());
    for edge in edges {
        if !relationship_ids.insert(&edge.id) {
            violations.push(GraphInvariantViolation::DuplicateRelationshipId {
                relationship_id: edge.id.clone(),
            });
        }
        if !entity_ids.contains(&edge.source) {
            violations.push(GraphInvariantViolation::DanglingSource {
                relationship_id: edge.id.clone(),
                missing_entity_id: edge.source.clone(),
            });
        }
        if !entity_ids.contains(&edge.target) {
            violations.push(GraphInvariantViolation::DanglingTarget {
                relationship_id: edge.id.clone(),
                missing_entity_id: edge.target.clone(),
            });
        }
    }

    violations
}

/// Non-blocking warnings: entities without a primary-key column.
pub fn graph_warnings(nodes: &[Entity]) -> Vec<GraphInvariantViolation> {
    nodes
        .iter()
        .filter(|node| !node.data.columns.iter().any(|column| column.pk))
        .map(|node| GraphInvariantViolation::MissingPrimaryKey {
            entity_id: node.id.clone(),
        })
        .collect()
}

pub fn ensure_graph_invariants(nodes: &[Entity], edges: &[Relationship]) -> Result<()> {
    let violations = graph_invariant_violations(nodes, edges);
    if let Some(first) = violations.first() {
        return Err(LibError::invalid_with_code(
            first.error_code(),
            first.public_message(),
            anyhow!("graph invariant validation failed: {:?}", violations),
        ));
    }

    Ok(())
}
