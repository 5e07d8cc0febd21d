use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::models::{
    normalize_entity, normalize_relationship, Column, Entity, EntityId, Graph, GraphPayload,
    NewRelationship, NewRelationshipData, Position, Relationship, RelationshipId,
    DEFAULT_ENTITY_LABEL,
};

/// Partial update of an entity's display data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EntityDataPatch {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub columns: Option<Vec<Column>>,
    #[serde(rename = "isJoin", default)]
    pub is_join: Option<bool>,
    #[serde(rename = "joinOf", default)]
    pub join_of: Option<[String; 2]>,
}

/// Partial update of an entity's positional/meta fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EntityPatch {
    #[serde(rename = "type", default)]
    pub node_type: Option<String>,
    #[serde(default)]
    pub position: Option<Position>,
    #[serde(default)]
    pub data: Option<EntityDataPatch>,
}

/// Partial update of a relationship's top-level fields. Endpoint changes
/// are mirrored into the attribute bundle so the edge stays self-consistent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RelationshipPatch {
    #[serde(default)]
    pub source: Option<EntityId>,
    #[serde(default)]
    pub target: Option<EntityId>,
    #[serde(default)]
    pub label: Option<String>,
}

/// Owner of the live canvas graph. All mutation is synchronous and routed
/// through the operations below; every relationship write passes through
/// the normalizer. Hosts subscribe to the revision channel to re-render.
///
/// The store never persists anything implicitly: callers needing
/// durability serialize [`GraphStore::snapshot`] themselves.
#[derive(Debug)]
pub struct GraphStore {
    nodes: Vec<Entity>,
    edges: Vec<Relationship>,
    revision: watch::Sender<u64>,
}

impl Default for GraphStore {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphStore {
    pub fn new() -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            revision,
        }
    }

    pub fn nodes(&self) -> &[Entity] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Relationship] {
        &self.edges
    }

    pub fn find_entity(&self, id: &EntityId) -> Option<&Entity> {
        self.nodes.iter().find(|node| node.id == *id)
    }

    pub fn find_relationship(&self, id: &RelationshipId) -> Option<&Relationship> {
        self.edges.iter().find(|edge| edge.id == *id)
    }

    pub fn snapshot(&self) -> Graph {
        Graph {
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
        }
    }

    /// Revision channel for re-render signaling. The value increments once
    /// per observable change.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    fn notify(&self) {
        self.revision.send_modify(|revision| *revision += 1);
    }

    /// Unconditionally replaces both sequences; no merge with prior state.
    pub fn replace_graph(&mut self, graph: GraphPayload) {
        self.nodes = graph.nodes.into_iter().map(normalize_entity).collect();
        self.edges = graph
            .edges
            .into_iter()
            .map(normalize_relationship)
            .collect();
        self.notify();
    }

    pub fn reset_graph(&mut self) {
        if self.nodes.is_empty() && self.edges.is_empty() {
            return;
        }
        self.nodes.clear();
        self.edges.clear();
        self.notify();
    }

    /// Merge-by-id: an incoming entity with a known id overwrites the
    /// existing one in place (new fields win), preserving relative order;
    /// unknown ids are appended in input order.
    pub fn upsert_entities(&mut self, entities: Vec<Entity>) {
        let mut changed = false;
        for incoming in entities {
            let incoming = normalize_entity(incoming);
            match self.nodes.iter_mut().find(|node| node.id == incoming.id) {
                Some(existing) => {
                    if *existing != incoming {
                        *existing = incoming;
                        changed = true;
                    }
                }
                None => {
                    self.nodes.push(incoming);
                    changed = true;
                }
            }
        }
        if changed {
            self.notify();
        }
    }

    /// Same merge semantics as entities, routed through the normalizer
    /// after the merge.
    pub fn upsert_relationships(&mut self, edges: Vec<NewRelationship>) {
        let mut changed = false;
        for incoming in edges {
            match self
                .edges
                .iter_mut()
                .find(|edge| edge.id == incoming.id
                    || incoming
                        .data
                        .as_ref()
                        .and_then(|data| data.id.as_ref())
                        .is_some_and(|id| edge.id == *id))
            {
                Some(existing) => {
                    let merged = normalize_relationship(merge_relationship(existing, incoming));
                    if *existing != merged {
                        *existing = merged;
                        changed = true;
                    }
                }
                None => {
                    self.edges.push(normalize_relationship(incoming));
                    changed = true;
                }
            }
        }
        if changed {
            self.notify();
        }
    }

    /// Partial update of label/columns; no-op when the id is absent.
    pub fn update_entity_data(&mut self, id: &EntityId, patch: EntityDataPatch) -> bool {
        let Some(node) = self.nodes.iter_mut().find(|node| node.id == *id) else {
            return false;
        };
        let before = node.data.clone();
        apply_entity_data_patch(node, patch);
        let changed = node.data != before;
        if changed {
            self.notify();
        }
        changed
    }

    /// Partial update of positional/meta fields; no-op when the id is absent.
    pub fn update_entity_fields(&mut self, id: &EntityId, patch: EntityPatch) -> bool {
        let Some(node) = self.nodes.iter_mut().find(|node| node.id == *id) else {
            return false;
        };
        let before = node.clone();
        if let Some(node_type) = patch.node_type {
            node.node_type = Some(node_type);
        }
        if let Some(position) = patch.position {
            node.position = position;
        }
        if let Some(data) = patch.data {
            apply_entity_data_patch(node, data);
        }
        let changed = *node != before;
        if changed {
            self.notify();
        }
        changed
    }

    /// Removes the entity and, atomically, every relationship whose source
    /// or target references it. The store is never left with a dangling
    /// relationship after a user-initiated deletion.
    pub fn remove_entity(&mut self, id: &EntityId) -> bool {
        let before = self.nodes.len();
        self.nodes.retain(|node| node.id != *id);
        if self.nodes.len() == before {
            return false;
        }
        self.edges
            .retain(|edge| edge.source != *id && edge.target != *id);
        self.notify();
        true
    }

    /// Removes a single relationship; no cascade.
    pub fn remove_relationship(&mut self, id: &RelationshipId) -> bool {
        let before = self.edges.len();
        self.edges.retain(|edge| edge.id != *id);
        let removed = self.edges.len() != before;
        if removed {
            self.notify();
        }
        removed
    }

    pub fn update_relationship_fields(
        &mut self,
        id: &RelationshipId,
        patch: RelationshipPatch,
    ) -> bool {
        let Some(edge) = self.edges.iter_mut().find(|edge| edge.id == *id) else {
            return false;
        };
        let before = edge.clone();
        if let Some(source) = patch.source {
            edge.source = source.clone();
            edge.data.source = source;
        }
        if let Some(target) = patch.target {
            edge.target = target.clone();
            edge.data.target = target;
        }
        if let Some(label) = patch.label {
            edge.label = label.clone();
            edge.data.label = label;
        }
        let changed = *edge != before;
        if changed {
            self.notify();
        }
        changed
    }

    /// Shallow-merges the patch into the relationship's attribute bundle
    /// and re-normalizes; no-op when the id is absent.
    pub fn update_relationship_data(
        &mut self,
        id: &RelationshipId,
        patch: NewRelationshipData,
    ) -> bool {
        let Some(index) = self.edges.iter().position(|edge| edge.id == *id) else {
            return false;
        };
        let existing = self.edges[index].clone();
        let mut loose = NewRelationship::from(existing.clone());
        let data = loose.data.get_or_insert_with(Default::default);
        overlay_relationship_data(data, patch);
        let merged = normalize_relationship(loose);
        let changed = merged != existing;
        if changed {
            self.edges[index] = merged;
            self.notify();
        }
        changed
    }
}

fn apply_entity_data_patch(node: &mut Entity, patch: EntityDataPatch) {
    if let Some(label) = patch.label {
        let trimmed = label.trim();
        node.data.label = if trimmed.is_empty() {
            DEFAULT_ENTITY_LABEL.to_string()
        } else {
            trimmed.to_string()
        };
    }
    if let Some(columns) = patch.columns {
        node.data.columns = columns;
    }
    if let Some(is_join) = patch.is_join {
        node.data.is_join = is_join;
    }
    if let Some(join_of) = patch.join_of {
        node.data.join_of = Some(join_of);
    }
}

fn merge_relationship(existing: &Relationship, incoming: NewRelationship) -> NewRelationship {
    let mut merged = NewRelationship::from(existing.clone());
    merged.source = incoming.source;
    merged.target = incoming.target;
    if incoming.label.is_some() {
        merged.label = incoming.label;
    }
    if let Some(patch) = incoming.data {
        let data = merged.data.get_or_insert_with(Default::default);
        overlay_relationship_data(data, patch);
    }
    merged
}

fn overlay_relationship_data(data: &mut NewRelationshipData, patch: NewRelationshipData) {
    if patch.id.is_some() {
        data.id = patch.id;
    }
    if patch.source.is_some() {
        data.source = patch.source;
    }
    if patch.target.is_some() {
        data.target = patch.target;
    }
    if patch.kind.is_some() {
        data.kind = patch.kind;
    }
    if patch.source_mult.is_some() {
        data.source_mult = patch.source_mult;
    }
    if patch.target_mult.is_some() {
        data.target_mult = patch.target_mult;
    }
    if patch.label.is_some() {
        data.label = patch.label;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EntityData, Multiplicity, RelationshipKind};

    fn entity(id: &str, label: &str) -> Entity {
        Entity {
            id: id.into(),
            node_type: None,
            position: Position::default(),
            data: EntityData {
                label: label.to_string(),
                columns: vec![Column::new(format!("{id}-id"), "id", "INT").primary_key()],
                ..Default::default()
            },
        }
    }

    fn bare_edge(id: &str, source: &str, target: &str) -> NewRelationship {
        NewRelationship {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            label: None,
            data: None,
        }
    }

    fn store_with(nodes: Vec<Entity>, edges: Vec<NewRelationship>) -> GraphStore {
        let mut store = GraphStore::new();
        store.replace_graph(GraphPayload { nodes, edges });
        store
    }

    #[test]
    fn replace_graph_normalizes_edges() {
        let store = store_with(
            vec![entity("a", "A"), entity("b", "B")],
            vec![bare_edge("e1", "a", "b")],
        );
        let edge = &store.edges()[0];
        assert_eq!(edge.data.kind, RelationshipKind::Simple);
        assert_eq!(edge.data.source_mult, Multiplicity::One);
        assert_eq!(edge.data.target_mult, Multiplicity::Many);
        assert_eq!(edge.label, "");
    }

    #[test]
    fn remove_entity_cascades_all_referencing_relationships() {
        let mut store = store_with(
            vec![
                entity("node-pedido", "Pedido"),
                entity("node-cliente", "Cliente"),
                entity("node-producto", "Producto"),
            ],
            vec![
                bare_edge("e1", "node-cliente", "node-pedido"),
                bare_edge("e2", "node-pedido", "node-producto"),
                bare_edge("e3", "node-producto", "node-pedido"),
                bare_edge("e4", "node-cliente", "node-producto"),
            ],
        );

        assert!(store.remove_entity(&"node-pedido".into()));

        let pedido = EntityId::from("node-pedido");
        assert!(store
            .edges()
            .iter()
            .all(|edge| edge.source != pedido && edge.target != pedido));
        assert_eq!(store.edges().len(), 1);
        assert_eq!(store.nodes().len(), 2);
    }

    #[test]
    fn remove_entity_is_noop_for_unknown_id() {
        let mut store = store_with(vec![entity("a", "A")], vec![]);
        let revision = store.revision();
        assert!(!store.remove_entity(&"ghost".into()));
        assert_eq!(store.revision(), revision);
        assert_eq!(store.nodes().len(), 1);
    }

    #[test]
    fn upsert_entities_is_idempotent_and_preserves_order() {
        let mut store = store_with(vec![entity("a", "A"), entity("b", "B")], vec![]);
        let incoming = vec![entity("b", "B renombrada"), entity("c", "C")];

        store.upsert_entities(incoming.clone());
        let once: Vec<_> = store.nodes().to_vec();
        store.upsert_entities(incoming);
        assert_eq!(store.nodes(), once.as_slice());

        let ids: Vec<&str> = store.nodes().iter().map(|n| n.id.0.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(store.nodes()[1].data.label, "B renombrada");
    }

    #[test]
    fn upsert_relationships_merges_and_renormalizes() {
        let mut store = store_with(
            vec![entity("a", "A"), entity("b", "B")],
            vec![bare_edge("e1", "a", "b")],
        );

        let mut patch = bare_edge("e1", "a", "b");
        patch.data = Some(NewRelationshipData {
            kind: Some("segmentada".to_string()),
            target_mult: Some("1..*".to_string()),
            ..Default::default()
        });
        store.upsert_relationships(vec![patch]);

        let edge = &store.edges()[0];
        assert_eq!(store.edges().len(), 1);
        assert_eq!(edge.data.kind, RelationshipKind::Dashed);
        assert_eq!(edge.data.target_mult, Multiplicity::OneOrMany);
        // untouched fields survive the merge
        assert_eq!(edge.data.source_mult, Multiplicity::One);
    }

    #[test]
    fn update_entity_fields_moves_without_touching_data() {
        let mut store = store_with(vec![entity("a", "A")], vec![]);
        let moved = store.update_entity_fields(
            &"a".into(),
            EntityPatch {
                position: Some(Position::new(320.0, 80.0)),
                ..Default::default()
            },
        );
        assert!(moved);
        let node = store.find_entity(&"a".into()).expect("entity should exist");
        assert_eq!(node.position, Position::new(320.0, 80.0));
        assert_eq!(node.data.label, "A");
    }

    #[test]
    fn update_operations_are_noops_for_unknown_ids() {
        let mut store = store_with(vec![entity("a", "A")], vec![]);
        let revision = store.revision();
        assert!(!store.update_entity_data(&"ghost".into(), EntityDataPatch::default()));
        assert!(!store.update_relationship_data(&"ghost".into(), NewRelationshipData::default()));
        assert!(!store.update_relationship_fields(&"ghost".into(), RelationshipPatch::default()));
        assert_eq!(store.revision(), revision);
    }

    #[test]
    fn update_relationship_data_renormalizes_unknown_kind() {
        let mut store = store_with(
            vec![entity("a", "A"), entity("b", "B")],
            vec![bare_edge("e1", "a", "b")],
        );
        store.update_relationship_data(
            &"e1".into(),
            NewRelationshipData {
                kind: Some("inexistente".to_string()),
                label: Some("compra".to_string()),
                ..Default::default()
            },
        );
        let edge = &store.edges()[0];
        assert_eq!(edge.data.kind, RelationshipKind::Simple);
        assert_eq!(edge.data.label, "compra");
        assert_eq!(edge.label, "compra");
    }

    #[test]
    fn subscribers_observe_each_mutation_once() {
        let mut store = GraphStore::new();
        let receiver = store.subscribe();
        store.replace_graph(GraphPayload {
            nodes: vec![entity("a", "A")],
            edges: vec![],
        });
        store.reset_graph();
        store.reset_graph(); // already empty, no change
        assert_eq!(*receiver.borrow(), 2);
    }

    #[test]
    fn remove_relationship_has_no_cascade() {
        let mut store = store_with(
            vec![entity("a", "A"), entity("b", "B")],
            vec![bare_edge("e1", "a", "b"), bare_edge("e2", "b", "a")],
        );
        assert!(store.remove_relationship(&"e1".into()));
        assert_eq!(store.edges().len(), 1);
        assert_eq!(store.nodes().len(), 2);
    }
}
