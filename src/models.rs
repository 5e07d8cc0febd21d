use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Display label given to an entity whose label arrives blank.
pub const DEFAULT_ENTITY_LABEL: &str = "Tabla";
/// Display label seeded into the edit buffer for a brand-new table.
pub const NEW_ENTITY_LABEL: &str = "NuevaTabla";
/// Node type tag carried on every entity of the canvas wire format.
pub const ENTITY_NODE_TYPE: &str = "databaseNode";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for EntityId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct RelationshipId(pub String);

impl fmt::Display for RelationshipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RelationshipId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for RelationshipId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: String,
    #[serde(default)]
    pub pk: bool,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
}

fn default_nullable() -> bool {
    true
}

impl Column {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        column_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            column_type: column_type.into(),
            pk: false,
            nullable: true,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.pk = true;
        self.nullable = false;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EntityData {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub columns: Vec<Column>,
    #[serde(rename = "isJoin", default, skip_serializing_if = "std::ops::Not::not")]
    pub is_join: bool,
    #[serde(rename = "joinOf", default, skip_serializing_if = "Option::is_none")]
    pub join_of: Option<[String; 2]>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub data: EntityData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum RelationshipKind {
    #[default]
    #[serde(rename = "simple")]
    Simple,
    #[serde(rename = "flechaBlanca")]
    OpenArrow,
    #[serde(rename = "flechaNegra")]
    FilledArrow,
    #[serde(rename = "segmentada")]
    Dashed,
}

impl RelationshipKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            RelationshipKind::Simple => "simple",
            RelationshipKind::OpenArrow => "flechaBlanca",
            RelationshipKind::FilledArrow => "flechaNegra",
            RelationshipKind::Dashed => "segmentada",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "simple" => Some(RelationshipKind::Simple),
            "flechaBlanca" => Some(RelationshipKind::OpenArrow),
            "flechaNegra" => Some(RelationshipKind::FilledArrow),
            "segmentada" => Some(RelationshipKind::Dashed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Multiplicity {
    #[serde(rename = "1")]
    One,
    #[serde(rename = "0..1")]
    ZeroOrOne,
    #[serde(rename = "*")]
    Many,
    #[serde(rename = "1..*")]
    OneOrMany,
    #[serde(rename = "0..*")]
    ZeroOrMany,
}

impl Multiplicity {
    pub const fn as_str(self) -> &'static str {
        match self {
            Multiplicity::One => "1",
            Multiplicity::ZeroOrOne => "0..1",
            Multiplicity::Many => "*",
            Multiplicity::OneOrMany => "1..*",
            Multiplicity::ZeroOrMany => "0..*",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "1" => Some(Multiplicity::One),
            "0..1" => Some(Multiplicity::ZeroOrOne),
            "*" => Some(Multiplicity::Many),
            "1..*" => Some(Multiplicity::OneOrMany),
            "0..*" => Some(Multiplicity::ZeroOrMany),
            _ => None,
        }
    }
}

/// Fully populated relationship attribute bundle. Every edge held by the
/// store carries one of these; only loose input may omit fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipData {
    pub id: RelationshipId,
    pub source: EntityId,
    pub target: EntityId,
    pub kind: RelationshipKind,
    #[serde(rename = "sourceMult")]
    pub source_mult: Multiplicity,
    #[serde(rename = "targetMult")]
    pub target_mult: Multiplicity,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub id: RelationshipId,
    pub source: EntityId,
    pub target: EntityId,
    #[serde(default)]
    pub label: String,
    pub data: RelationshipData,
}

/// Loose attribute bundle as supplied by external generators or incremental
/// UI edits. Kind and multiplicities arrive as open strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct NewRelationshipData {
    #[serde(default)]
    pub id: Option<RelationshipId>,
    #[serde(default)]
    pub source: Option<EntityId>,
    #[serde(default)]
    pub target: Option<EntityId>,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(rename = "sourceMult", default)]
    pub source_mult: Option<String>,
    #[serde(rename = "targetMult", default)]
    pub target_mult: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRelationship {
    pub id: RelationshipId,
    pub source: EntityId,
    pub target: EntityId,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub data: Option<NewRelationshipData>,
}

impl From<Relationship> for NewRelationship {
    fn from(value: Relationship) -> Self {
        Self {
            id: value.id,
            source: value.source,
            target: value.target,
            label: Some(value.label),
            data: Some(NewRelationshipData {
                id: Some(value.data.id),
                source: Some(value.data.source),
                target: Some(value.data.target),
                kind: Some(value.data.kind.as_str().to_string()),
                source_mult: Some(value.data.source_mult.as_str().to_string()),
                target_mult: Some(value.data.target_mult.as_str().to_string()),
                label: Some(value.data.label),
            }),
        }
    }
}

/// Completes a partially specified relationship to its canonical form.
///
/// Nested attribute-bundle fields win over the top-level edge fields when
/// both are present. Absent or unrecognized kinds become `simple`, absent
/// multiplicities become `1`/`*`, absent labels become the empty string.
/// Pure and idempotent; every edge entering the store passes through here.
pub fn normalize_relationship(edge: NewRelationship) -> Relationship {
    let data = edge.data.unwrap_or_default();
    let id = data.id.unwrap_or(edge.id);
    let source = data.source.unwrap_or(edge.source);
    let target = data.target.unwrap_or(edge.target);
    let kind = data
        .kind
        .as_deref()
        .and_then(RelationshipKind::parse)
        .unwrap_or_default();
    let source_mult = data
        .source_mult
        .as_deref()
        .and_then(Multiplicity::parse)
        .unwrap_or(Multiplicity::One);
    let target_mult = data
        .target_mult
        .as_deref()
        .and_then(Multiplicity::parse)
        .unwrap_or(Multiplicity::Many);
    let label = data.label.or(edge.label).unwrap_or_default();

    Relationship {
        id: id.clone(),
        source: source.clone(),
        target: target.clone(),
        label: label.clone(),
        data: RelationshipData {
            id,
            source,
            target,
            kind,
            source_mult,
            target_mult,
            label,
        },
    }
}

/// Fills in the wire defaults for an incoming entity: blank labels become
/// "Tabla" and the node type tag is set when missing. Column order is
/// preserved untouched.
pub fn normalize_entity(mut entity: Entity) -> Entity {
    let label = entity.data.label.trim();
    if label.is_empty() {
        entity.data.label = DEFAULT_ENTITY_LABEL.to_string();
    } else if label.len() != entity.data.label.len() {
        entity.data.label = label.to_string();
    }
    if entity.node_type.is_none() {
        entity.node_type = Some(ENTITY_NODE_TYPE.to_string());
    }
    entity
}

/// Canonical graph snapshot: every edge fully normalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Graph {
    #[serde(default)]
    pub nodes: Vec<Entity>,
    #[serde(default)]
    pub edges: Vec<Relationship>,
}

impl Graph {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }
}

/// Graph as supplied from outside the store (generation service, history
/// snapshot, persistence cache), before edge normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct GraphPayload {
    #[serde(default)]
    pub nodes: Vec<Entity>,
    #[serde(default)]
    pub edges: Vec<NewRelationship>,
}

impl GraphPayload {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }
}

impl From<Graph> for GraphPayload {
    fn from(value: Graph) -> Self {
        Self {
            nodes: value.nodes,
            edges: value.edges.into_iter().map(NewRelationship::from).collect(),
        }
    }
}

/// Server-side conversation snapshot. Immutable client-side except for the
/// in-place prompt/graph refresh after a successful continuation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: i64,
    pub prompt: String,
    pub graph: GraphPayload,
    pub created_at: NaiveDateTime,
}
