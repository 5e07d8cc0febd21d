use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{GraphPayload, HistoryEntry};

/// Request for a text-driven generation round. The current canvas travels
/// along so the service can extend it instead of starting over, and the
/// active conversation id keeps the round attached to its thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub prompt: String,
    #[serde(default)]
    pub graph: GraphPayload,
    #[serde(rename = "history_id", default, skip_serializing_if = "Option::is_none")]
    pub history_id: Option<i64>,
}

/// What a generation round produced. Text rounds typically return only the
/// graph; image rounds also carry the created conversation id and the
/// prompt the service derived from the picture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationOutcome {
    pub graph: GraphPayload,
    #[serde(rename = "history_id", default)]
    pub history_id: Option<i64>,
    #[serde(default)]
    pub prompt: Option<String>,
}

/// An image attached to a vision round, as received from the host UI.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub content_type: String,
}

/// Remote diagram generation and conversation history. Implemented over
/// HTTP in production; tests substitute an in-memory fake.
#[async_trait]
pub trait DiagramService: Send + Sync {
    async fn generate(&self, request: GenerateRequest) -> Result<GenerationOutcome>;

    async fn generate_from_image(
        &self,
        image: ImageUpload,
        prompt: Option<&str>,
        history_id: Option<i64>,
    ) -> Result<GenerationOutcome>;

    /// Newest-first conversation snapshots, at most `limit` of them.
    async fn list_history(&self, limit: u32) -> Result<Vec<HistoryEntry>>;

    async fn delete_history(&self, id: i64) -> Result<()>;

    async fn clear_history(&self) -> Result<()>;
}
