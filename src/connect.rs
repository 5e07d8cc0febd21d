use std::collections::HashSet;

use anyhow::anyhow;
use chrono::Utc;
use uuid::Uuid;

use crate::error::{LibError, Result};
use crate::ident;
use crate::models::{
    Column, Entity, EntityData, EntityId, Multiplicity, NewRelationship, NewRelationshipData,
    Position, RelationshipId, RelationshipKind, ENTITY_NODE_TYPE,
};
use crate::store::GraphStore;

/// Vertical offset between the connected pair and a synthesized join table.
const JOIN_OFFSET_Y: f64 = 220.0;

/// Active connection settings of the canvas toolbar. The defaults mirror a
/// plain one-to-many line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionTool {
    pub kind: RelationshipKind,
    pub source_mult: Multiplicity,
    pub target_mult: Multiplicity,
}

impl Default for ConnectionTool {
    fn default() -> Self {
        Self {
            kind: RelationshipKind::Simple,
            source_mult: Multiplicity::One,
            target_mult: Multiplicity::Many,
        }
    }
}

impl ConnectionTool {
    /// A dashed line with `*` on both ends means many-to-many, which is
    /// never stored directly: it materializes as a join table.
    pub fn is_many_to_many(&self) -> bool {
        self.kind == RelationshipKind::Dashed
            && self.source_mult == Multiplicity::Many
            && self.target_mult == Multiplicity::Many
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectOutcome {
    /// A single relationship was added between the two entities.
    Direct { relationship_id: RelationshipId },
    /// A join table was synthesized together with its two anchoring edges.
    Join {
        entity_id: EntityId,
        relationship_ids: [RelationshipId; 2],
    },
}

impl GraphStore {
    /// Connects two existing entities according to the toolbar settings.
    ///
    /// Dashed many-to-many requests are rewritten into a join table with
    /// two one-to-many edges; everything else becomes a single edge
    /// carrying the tool's kind and multiplicities.
    pub fn connect(
        &mut self,
        source: &EntityId,
        target: &EntityId,
        tool: &ConnectionTool,
    ) -> Result<ConnectOutcome> {
        let Some(source_entity) = self.find_entity(source) else {
            return Err(LibError::not_found(
                "La tabla de origen no existe",
                anyhow!("connect: unknown source entity {source}"),
            ));
        };
        let Some(target_entity) = self.find_entity(target) else {
            return Err(LibError::not_found(
                "La tabla de destino no existe",
                anyhow!("connect: unknown target entity {target}"),
            ));
        };

        if tool.is_many_to_many() {
            let used: HashSet<String> = self.nodes().iter().map(|node| node.id.0.clone()).collect();
            let (join, edges) = synthesize_join(source_entity, target_entity, tool, &used);
            let entity_id = join.id.clone();
            let relationship_ids = [edges[0].id.clone(), edges[1].id.clone()];
            self.upsert_entities(vec![join]);
            self.upsert_relationships(edges.into());
            return Ok(ConnectOutcome::Join {
                entity_id,
                relationship_ids,
            });
        }

        let relationship_id = fresh_edge_id();
        self.upsert_relationships(vec![NewRelationship {
            id: relationship_id.clone(),
            source: source.clone(),
            target: target.clone(),
            label: None,
            data: Some(NewRelationshipData {
                kind: Some(tool.kind.as_str().to_string()),
                source_mult: Some(tool.source_mult.as_str().to_string()),
                target_mult: Some(tool.target_mult.as_str().to_string()),
                ..Default::default()
            }),
        }]);
        Ok(ConnectOutcome::Direct { relationship_id })
    }
}

fn fresh_edge_id() -> RelationshipId {
    RelationshipId(format!("edge-{}", Uuid::new_v4()))
}

/// Builds the join table plus its two anchoring edges. The join carries a
/// surrogate primary key and one foreign-key column per endpoint, named
/// after the endpoint labels; its id embeds a millisecond timestamp and
/// gets a numeric suffix when that id is already taken, so repeated
/// connections between the same pair never collide.
fn synthesize_join(
    source: &Entity,
    target: &Entity,
    tool: &ConnectionTool,
    used_ids: &HashSet<String>,
) -> (Entity, [NewRelationship; 2]) {
    let base = format!(
        "join-{}-{}-{}",
        source.id,
        target.id,
        Utc::now().timestamp_millis()
    );
    let join_id = EntityId(ident::ensure_unique_id(&base, used_ids));
    let label = format!("{}_{}", source.data.label, target.data.label);
    let source_fragment = ident::label_fragment(&source.data.label);
    let target_fragment = ident::label_fragment(&target.data.label);

    let columns = vec![
        Column::new(format!("{join_id}-id"), "id", "INT").primary_key(),
        Column::new(
            format!("{join_id}-{source_fragment}"),
            format!("{source_fragment}_id"),
            "INT",
        )
        .not_null(),
        Column::new(
            format!("{join_id}-{target_fragment}"),
            format!("{target_fragment}_id"),
            "INT",
        )
        .not_null(),
    ];

    let join = Entity {
        id: join_id.clone(),
        node_type: Some(ENTITY_NODE_TYPE.to_string()),
        position: Position::new(
            (source.position.x + target.position.x) / 2.0,
            source.position.y.max(target.position.y) + JOIN_OFFSET_Y,
        ),
        data: EntityData {
            label,
            columns,
            is_join: true,
            join_of: Some([source.data.label.clone(), target.data.label.clone()]),
        },
    };

    let source_edge = NewRelationship {
        id: fresh_edge_id(),
        source: source.id.clone(),
        target: join_id.clone(),
        label: None,
        data: Some(NewRelationshipData {
            kind: Some(RelationshipKind::Simple.as_str().to_string()),
            source_mult: Some(tool.source_mult.as_str().to_string()),
            target_mult: Some(Multiplicity::One.as_str().to_string()),
            ..Default::default()
        }),
    };
    let target_edge = NewRelationship {
        id: fresh_edge_id(),
        source: join_id,
        target: target.id.clone(),
        label: None,
        data: Some(NewRelationshipData {
            kind: Some(RelationshipKind::Simple.as_str().to_string()),
            source_mult: Some(Multiplicity::One.as_str().to_string()),
            target_mult: Some(tool.target_mult.as_str().to_string()),
            ..Default::default()
        }),
    };

    (join, [source_edge, target_edge])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::invariants::graph_invariant_violations;
    use crate::models::GraphPayload;

    fn entity(id: &str, label: &str, x: f64, y: f64) -> Entity {
        Entity {
            id: id.into(),
            node_type: None,
            position: Position::new(x, y),
            data: EntityData {
                label: label.to_string(),
                columns: vec![Column::new(format!("{id}-id"), "id", "INT").primary_key()],
                ..Default::default()
            },
        }
    }

    fn seeded_store() -> GraphStore {
        let mut store = GraphStore::new();
        store.replace_graph(GraphPayload {
            nodes: vec![
                entity("node-cliente", "Cliente", 100.0, 50.0),
                entity("node-pedido", "Pedido", 500.0, 150.0),
            ],
            edges: vec![],
        });
        store
    }

    #[test]
    fn default_tool_adds_a_one_to_many_edge() {
        let mut store = seeded_store();
        let outcome = store
            .connect(
                &"node-cliente".into(),
                &"node-pedido".into(),
                &ConnectionTool::default(),
            )
            .expect("connect should succeed");

        let ConnectOutcome::Direct { relationship_id } = outcome else {
            panic!("default tool must not synthesize a join");
        };
        let edge = store
            .find_relationship(&relationship_id)
            .expect("edge should be stored");
        assert_eq!(edge.data.kind, RelationshipKind::Simple);
        assert_eq!(edge.data.source_mult, Multiplicity::One);
        assert_eq!(edge.data.target_mult, Multiplicity::Many);
    }

    #[test]
    fn unknown_endpoint_is_rejected() {
        let mut store = seeded_store();
        let err = store
            .connect(
                &"node-cliente".into(),
                &"node-fantasma".into(),
                &ConnectionTool::default(),
            )
            .expect_err("unknown target should fail");
        assert_eq!(err.kind, ErrorKind::NotFound);
        assert!(store.edges().is_empty());
    }

    #[test]
    fn dashed_many_to_many_synthesizes_join_table() {
        let mut store = seeded_store();
        let tool = ConnectionTool {
            kind: RelationshipKind::Dashed,
            source_mult: Multiplicity::Many,
            target_mult: Multiplicity::Many,
        };
        let outcome = store
            .connect(&"node-cliente".into(), &"node-pedido".into(), &tool)
            .expect("connect should succeed");

        let ConnectOutcome::Join {
            entity_id,
            relationship_ids,
        } = outcome
        else {
            panic!("dashed many-to-many must synthesize a join");
        };

        let join = store.find_entity(&entity_id).expect("join should be stored");
        assert_eq!(join.data.label, "Cliente_Pedido");
        assert!(join.data.is_join);
        assert_eq!(
            join.data.join_of,
            Some(["Cliente".to_string(), "Pedido".to_string()])
        );

        let names: Vec<&str> = join
            .data
            .columns
            .iter()
            .map(|column| column.name.as_str())
            .collect();
        assert_eq!(names, vec!["id", "cliente_id", "pedido_id"]);
        assert!(join.data.columns[0].pk);
        assert!(!join.data.columns[1].nullable);
        assert!(!join.data.columns[2].nullable);

        // midpoint x, below the lower endpoint
        assert_eq!(join.position.x, 300.0);
        assert_eq!(join.position.y, 150.0 + JOIN_OFFSET_Y);

        let first = store
            .find_relationship(&relationship_ids[0])
            .expect("source edge should be stored");
        assert_eq!(first.source, EntityId::from("node-cliente"));
        assert_eq!(first.target, entity_id);
        assert_eq!(first.data.kind, RelationshipKind::Simple);
        assert_eq!(first.data.source_mult, Multiplicity::Many);
        assert_eq!(first.data.target_mult, Multiplicity::One);

        let second = store
            .find_relationship(&relationship_ids[1])
            .expect("target edge should be stored");
        assert_eq!(second.source, entity_id);
        assert_eq!(second.target, EntityId::from("node-pedido"));
        assert_eq!(second.data.source_mult, Multiplicity::One);
        assert_eq!(second.data.target_mult, Multiplicity::Many);

        // the join replaces the direct connection entirely
        assert_eq!(store.edges().len(), 2);
        let cliente = EntityId::from("node-cliente");
        let pedido = EntityId::from("node-pedido");
        assert!(!store
            .edges()
            .iter()
            .any(|edge| edge.source == cliente && edge.target == pedido));

        let snapshot = store.snapshot();
        assert!(graph_invariant_violations(&snapshot.nodes, &snapshot.edges).is_empty());
    }

    #[test]
    fn rapid_repeated_connections_create_distinct_joins() {
        let mut store = seeded_store();
        let tool = ConnectionTool {
            kind: RelationshipKind::Dashed,
            source_mult: Multiplicity::Many,
            target_mult: Multiplicity::Many,
        };

        // both calls can land inside the same millisecond
        let first = store
            .connect(&"node-cliente".into(), &"node-pedido".into(), &tool)
            .expect("first connect should succeed");
        let second = store
            .connect(&"node-cliente".into(), &"node-pedido".into(), &tool)
            .expect("second connect should succeed");

        let (
            ConnectOutcome::Join {
                entity_id: first_join,
                ..
            },
            ConnectOutcome::Join {
                entity_id: second_join,
                ..
            },
        ) = (first, second)
        else {
            panic!("both connects must synthesize a join");
        };

        assert_ne!(first_join, second_join);
        assert_eq!(store.nodes().len(), 4);
        assert_eq!(store.edges().len(), 4);
        assert_eq!(
            store
                .edges()
                .iter()
                .filter(|edge| edge.source == first_join || edge.target == first_join)
                .count(),
            2
        );
        assert_eq!(
            store
                .edges()
                .iter()
                .filter(|edge| edge.source == second_join || edge.target == second_join)
                .count(),
            2
        );
    }

    #[test]
    fn dashed_without_double_many_stays_direct() {
        let mut store = seeded_store();
        let tool = ConnectionTool {
            kind: RelationshipKind::Dashed,
            source_mult: Multiplicity::One,
            target_mult: Multiplicity::Many,
        };
        let outcome = store
            .connect(&"node-cliente".into(), &"node-pedido".into(), &tool)
            .expect("connect should succeed");
        assert!(matches!(outcome, ConnectOutcome::Direct { .. }));
        assert_eq!(store.nodes().len(), 2);
        assert_eq!(store.edges()[0].data.kind, RelationshipKind::Dashed);
    }
}
