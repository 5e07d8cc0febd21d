use anyhow::anyhow;
use tracing::{info, warn};

use crate::error::{ErrorKind, LibError, Result};
use crate::fallback::offline_fallback;
use crate::models::HistoryEntry;
use crate::services::{DiagramService, GenerateRequest, GenerationOutcome, ImageUpload};
use crate::store::GraphStore;

/// Upper bound on an uploaded diagram photo.
pub const MAX_IMAGE_BYTES: usize = 8 * 1024 * 1024;

/// Text seeded into the prompt box after the history is wiped.
pub const PROMPT_SEED: &str = "Crea tablas Usuario y Post";

const DEFAULT_HISTORY_LIMIT: u32 = 30;

/// Mediates between the canvas store, the generation service and the
/// conversation history. Tracks which server-side entry the canvas
/// currently reflects and keeps the local history list in step with the
/// outcome of every round.
pub struct Reconciler<S: DiagramService> {
    service: S,
    history: Vec<HistoryEntry>,
    active: Option<i64>,
    /// Bound to the prompt input of the host UI.
    pub prompt_buffer: String,
    history_limit: u32,
    clearing: bool,
}

impl<S: DiagramService> Reconciler<S> {
    pub fn new(service: S) -> Self {
        Self {
            service,
            history: Vec::new(),
            active: None,
            prompt_buffer: String::new(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            clearing: false,
        }
    }

    pub fn with_history_limit(mut self, limit: u32) -> Self {
        self.history_limit = limit.clamp(1, 100);
        self
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn active(&self) -> Option<i64> {
        self.active
    }

    /// Reloads the newest-first history list from the service.
    pub async fn refresh_history(&mut self) -> Result<()> {
        self.history = self.service.list_history(self.history_limit).await?;
        Ok(())
    }

    /// Loads a past conversation onto the canvas and makes it the active
    /// thread. The snapshot re-enters through the normalizer.
    pub fn select_entry(&mut self, id: i64, store: &mut GraphStore) -> Result<()> {
        let Some(entry) = self.history.iter().find(|entry| entry.id == id) else {
            return Err(LibError::not_found(
                "La conversacion no existe",
                anyhow!("select_entry: unknown history entry {id}"),
            ));
        };
        store.replace_graph(entry.graph.clone());
        self.prompt_buffer = entry.prompt.clone();
        self.active = Some(id);
        Ok(())
    }

    /// Detaches from the active thread: the next generation starts a fresh
    /// conversation server-side. The canvas keeps whatever is on it.
    pub fn new_conversation(&mut self) {
        self.active = None;
        self.prompt_buffer.clear();
    }

    /// Runs a text generation round and reconciles the result.
    ///
    /// When the service is unreachable the built-in offline vocabulary is
    /// tried before surfacing the error; a fallback graph lands on the
    /// canvas without creating or touching any history entry.
    pub async fn generate(&mut self, prompt: &str, store: &mut GraphStore) -> Result<()> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(LibError::invalid(
                "Escribe una instruccion antes de generar",
                anyhow!("generate called with an empty prompt"),
            ));
        }

        let request = GenerateRequest {
            prompt: prompt.to_string(),
            graph: store.snapshot().into(),
            history_id: self.active,
        };
        let outcome = match self.service.generate(request).await {
            Ok(outcome) => outcome,
            Err(err) if err.kind == ErrorKind::Transport => {
                let Some(graph) = offline_fallback(prompt) else {
                    return Err(err);
                };
                warn!(
                    target: "er_canvas::reconcile",
                    code = err.code,
                    "servicio inaccesible, usando diagrama de respaldo"
                );
                store.replace_graph(graph.into());
                return Ok(());
            }
            Err(err) => return Err(err),
        };

        self.adopt_outcome(prompt, outcome, store).await
    }

    /// Runs a vision round from an uploaded image. Validation failures
    /// never reach the service; transport errors surface directly since
    /// the offline vocabulary cannot read pictures.
    pub async fn generate_from_image(
        &mut self,
        image: ImageUpload,
        prompt: Option<&str>,
        store: &mut GraphStore,
    ) -> Result<()> {
        if image.bytes.is_empty() {
            return Err(LibError::invalid(
                "La imagen esta vacia",
                anyhow!("vision round with an empty upload"),
            ));
        }
        if !image.content_type.starts_with("image/") {
            return Err(LibError::invalid(
                "El archivo debe ser una imagen",
                anyhow!("vision round with content type {}", image.content_type),
            ));
        }
        if image.bytes.len() > MAX_IMAGE_BYTES {
            return Err(LibError::invalid(
                "La imagen supera el tamano maximo de 8MB",
                anyhow!("vision round with {} bytes", image.bytes.len()),
            ));
        }

        let outcome = self
            .service
            .generate_from_image(image, prompt, self.active)
            .await?;
        let prompt = outcome
            .prompt
            .clone()
            .or_else(|| prompt.map(str::to_string))
            .unwrap_or_default();
        self.adopt_outcome(&prompt, outcome, store).await
    }

    /// Deletes one conversation. Deleting the active one keeps the canvas
    /// as-is and moves the pointer to the newest remaining entry.
    pub async fn delete_entry(&mut self, id: i64) -> Result<()> {
        // a wipe is already in flight; individual deletes are redundant
        if self.clearing {
            return Ok(());
        }
        self.service.delete_history(id).await?;
        self.history.retain(|entry| entry.id != id);
        if self.active == Some(id) {
            self.active = self.history.first().map(|entry| entry.id);
        }
        Ok(())
    }

    /// Wipes the whole history. The canvas keeps whatever is on it; the
    /// prompt box is re-seeded with a starter instruction.
    pub async fn clear_all(&mut self) -> Result<()> {
        self.clearing = true;
        let result = self.service.clear_history().await;
        self.clearing = false;
        result?;
        self.history.clear();
        self.active = None;
        self.prompt_buffer = PROMPT_SEED.to_string();
        info!(target: "er_canvas::reconcile", "historial borrado");
        Ok(())
    }

    /// Applies a successful outcome: graph onto the canvas, then history.
    /// A round that continued the active thread patches the local entry in
    /// place; anything else refetches the list and adopts the outcome id,
    /// falling back to the newest entry when the service returned none.
    async fn adopt_outcome(
        &mut self,
        prompt: &str,
        outcome: GenerationOutcome,
        store: &mut GraphStore,
    ) -> Result<()> {
        if outcome.graph.is_empty() {
            return Err(LibError::invalid(
                "El servicio no devolvio ninguna tabla",
                anyhow!("generation outcome carried an empty graph"),
            ));
        }
        store.replace_graph(outcome.graph.clone());

        let continued_active = self
            .active
            .zip(outcome.history_id)
            .is_some_and(|(active, id)| active == id);
        if continued_active {
            let id = outcome.history_id.unwrap_or_default();
            if let Some(entry) = self.history.iter_mut().find(|entry| entry.id == id) {
                entry.prompt = prompt.to_string();
                entry.graph = outcome.graph;
                return Ok(());
            }
        }

        self.refresh_history().await?;
        self.active = outcome
            .history_id
            .or_else(|| self.history.first().map(|entry| entry.id));
        Ok(())
    }
}
