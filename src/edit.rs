use std::collections::HashSet;

use crate::ident;
use crate::invariants::GraphInvariantViolation;
use crate::models::{
    Column, Entity, EntityData, EntityId, Multiplicity, NewRelationshipData, Position,
    Relationship, RelationshipId, RelationshipKind, NEW_ENTITY_LABEL,
};
use crate::store::GraphStore;

/// Edit buffer for the entity form. Nothing touches the store until
/// [`EntityDraft::save`]; discarding the draft discards the edit.
#[derive(Debug, Clone)]
pub struct EntityDraft {
    target: Option<EntityId>,
    pub label: String,
    pub columns: Vec<Column>,
    pub position: Position,
    is_join: bool,
    join_of: Option<[String; 2]>,
}

impl Default for EntityDraft {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityDraft {
    /// Draft for a brand-new table, seeded with the default label and an
    /// `id INT` primary key.
    pub fn new() -> Self {
        Self {
            target: None,
            label: NEW_ENTITY_LABEL.to_string(),
            columns: vec![Column::new("", "id", "INT").primary_key()],
            position: Position::default(),
            is_join: false,
            join_of: None,
        }
    }

    pub fn at(mut self, position: Position) -> Self {
        self.position = position;
        self
    }

    /// Draft pre-filled from an existing entity; saving writes back to the
    /// same id.
    pub fn edit(entity: &Entity) -> Self {
        Self {
            target: Some(entity.id.clone()),
            label: entity.data.label.clone(),
            columns: entity.data.columns.clone(),
            position: entity.position,
            is_join: entity.data.is_join,
            join_of: entity.data.join_of.clone(),
        }
    }

    pub fn add_column(&mut self, name: impl Into<String>, column_type: impl Into<String>) {
        self.columns.push(Column::new("", name, column_type));
    }

    pub fn remove_column(&mut self, index: usize) {
        if index < self.columns.len() {
            self.columns.remove(index);
        }
    }

    /// Advisory warnings shown next to the save button; never blocking.
    pub fn warnings(&self) -> Vec<GraphInvariantViolation> {
        if self.columns.iter().any(|column| column.pk) {
            return Vec::new();
        }
        vec![GraphInvariantViolation::MissingPrimaryKey {
            entity_id: self.target.clone().unwrap_or_default(),
        }]
    }

    /// Commits the draft through the store's upsert path. A new table gets
    /// a slug-derived id that never collides with an existing one; a blank
    /// label falls back to the new-table default. Columns added through the
    /// draft get ids derived from the entity id and their name.
    pub fn save(self, store: &mut GraphStore) -> EntityId {
        let label = {
            let trimmed = self.label.trim();
            if trimmed.is_empty() {
                NEW_ENTITY_LABEL.to_string()
            } else {
                trimmed.to_string()
            }
        };

        let id = match self.target {
            Some(id) => id,
            None => {
                let used: HashSet<String> =
                    store.nodes().iter().map(|node| node.id.0.clone()).collect();
                let base = format!("node-{}", ident::slugify(&label));
                EntityId(ident::ensure_unique_id(&base, &used))
            }
        };

        let mut column_ids: HashSet<String> = self
            .columns
            .iter()
            .filter(|column| !column.id.is_empty())
            .map(|column| column.id.clone())
            .collect();
        let columns = self
            .columns
            .into_iter()
            .map(|mut column| {
                if column.id.is_empty() {
                    let base = format!("{id}-{}", ident::label_fragment(&column.name));
                    column.id = ident::ensure_unique_id(&base, &column_ids);
                    column_ids.insert(column.id.clone());
                }
                column
            })
            .collect();

        store.upsert_entities(vec![Entity {
            id: id.clone(),
            node_type: None,
            position: self.position,
            data: EntityData {
                label,
                columns,
                is_join: self.is_join,
                join_of: self.join_of,
            },
        }]);
        id
    }
}

/// Edit buffer for the relationship form: label, kind and both
/// multiplicities of an existing edge.
#[derive(Debug, Clone)]
pub struct RelationshipDraft {
    target: RelationshipId,
    pub label: String,
    pub kind: RelationshipKind,
    pub source_mult: Multiplicity,
    pub target_mult: Multiplicity,
}

impl RelationshipDraft {
    pub fn edit(edge: &Relationship) -> Self {
        Self {
            target: edge.id.clone(),
            label: edge.label.clone(),
            kind: edge.data.kind,
            source_mult: edge.data.source_mult,
            target_mult: edge.data.target_mult,
        }
    }

    /// Writes the buffered attributes back; returns false when the edge no
    /// longer exists (deleted underneath the open form).
    pub fn save(self, store: &mut GraphStore) -> bool {
        if store.find_relationship(&self.target).is_none() {
            return false;
        }
        store.update_relationship_data(
            &self.target,
            NewRelationshipData {
                kind: Some(self.kind.as_str().to_string()),
                source_mult: Some(self.source_mult.as_str().to_string()),
                target_mult: Some(self.target_mult.as_str().to_string()),
                label: Some(self.label),
                ..Default::default()
            },
        );
        true
    }
}
