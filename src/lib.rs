pub mod config;
pub mod connect;
pub mod edit;
pub mod error;
pub mod fallback;
#[cfg(feature = "http")]
pub mod http;
pub mod ident;
pub mod invariants;
pub mod models;
pub mod reconcile;
pub mod services;
pub mod store;

pub mod prelude {
    pub use crate::config::AppConfig;
    pub use crate::connect::{ConnectOutcome, ConnectionTool};
    pub use crate::edit::{EntityDraft, RelationshipDraft};
    pub use crate::error::{ErrorKind, LibError, Result};
    pub use crate::fallback::offline_fallback;
    #[cfg(feature = "http")]
    pub use crate::http::HttpDiagramService;
    pub use crate::invariants::{
        ensure_graph_invariants, graph_invariant_violations, graph_warnings,
        GraphInvariantViolation,
    };
    pub use crate::models::{
        normalize_entity, normalize_relationship, Column, Entity, EntityData, EntityId, Graph,
        GraphPayload, HistoryEntry, Multiplicity, NewRelationship, NewRelationshipData, Position,
        Relationship, RelationshipData, RelationshipId, RelationshipKind,
    };
    pub use crate::reconcile::{Reconciler, MAX_IMAGE_BYTES, PROMPT_SEED};
    pub use crate::services::{
        DiagramService, GenerateRequest, GenerationOutcome, ImageUpload,
    };
    pub use crate::store::{
        EntityDataPatch, EntityPatch, GraphStore, RelationshipPatch,
    };
}
