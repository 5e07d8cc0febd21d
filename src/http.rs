use anyhow::anyhow;
use async_trait::async_trait;
use reqwest::multipart;
use tracing::{debug, warn};

use crate::config::AppConfig;
use crate::error::{LibError, Result};
use crate::models::{GraphPayload, HistoryEntry};
use crate::services::{DiagramService, GenerateRequest, GenerationOutcome, ImageUpload};

const PUBLIC_TRANSPORT_MESSAGE: &str = "No se pudo contactar con el servicio";

/// [`DiagramService`] over the generation backend's REST surface.
#[derive(Debug, Clone)]
pub struct HttpDiagramService {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpDiagramService {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: trim_trailing_slash(base_url.into()),
            token: None,
        }
    }

    /// Client pointed at the configured backend, carrying the configured
    /// bearer token when one is set.
    pub fn from_config(config: &AppConfig) -> Self {
        let service = Self::new(config.backend_url.clone());
        match &config.auth_token {
            Some(token) => service.with_token(token.clone()),
            None => service,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        warn!(target: "er_canvas::http", %status, "el servicio respondio con error");
        Err(LibError::transport(
            PUBLIC_TRANSPORT_MESSAGE,
            anyhow!("service returned {status}: {body}"),
        ))
    }
}

fn trim_trailing_slash(mut url: String) -> String {
    while url.ends_with('/') {
        url.pop();
    }
    url
}

#[async_trait]
impl DiagramService for HttpDiagramService {
    async fn generate(&self, request: GenerateRequest) -> Result<GenerationOutcome> {
        debug!(target: "er_canvas::http", history_id = ?request.history_id, "solicitando generacion");
        let history_id = request.history_id;
        let response = self
            .authorize(self.client.post(self.url("/ai/generate")))
            .json(&request)
            .send()
            .await?;
        let graph: GraphPayload = Self::check(response)
            .await?
            .json()
            .await
            .map_err(LibError::from)?;
        // the text endpoint returns a bare graph; the conversation id is
        // whatever the caller already had
        Ok(GenerationOutcome {
            graph,
            history_id,
            prompt: None,
        })
    }

    async fn generate_from_image(
        &self,
        image: ImageUpload,
        prompt: Option<&str>,
        history_id: Option<i64>,
    ) -> Result<GenerationOutcome> {
        debug!(
            target: "er_canvas::http",
            filename = %image.filename,
            bytes = image.bytes.len(),
            "solicitando generacion por imagen"
        );
        let part = multipart::Part::bytes(image.bytes)
            .file_name(image.filename)
            .mime_str(&image.content_type)
            .map_err(LibError::from)?;
        let mut form = multipart::Form::new().part("file", part);
        if let Some(prompt) = prompt {
            form = form.text("prompt", prompt.to_string());
        }
        if let Some(history_id) = history_id {
            form = form.text("history_id", history_id.to_string());
        }

        let response = self
            .authorize(self.client.post(self.url("/ai/vision")))
            .multipart(form)
            .send()
            .await?;
        Self::check(response)
            .await?
            .json()
            .await
            .map_err(LibError::from)
    }

    async fn list_history(&self, limit: u32) -> Result<Vec<HistoryEntry>> {
        let response = self
            .authorize(self.client.get(self.url("/ai/history")))
            .query(&[("limit", limit)])
            .send()
            .await?;
        Self::check(response)
            .await?
            .json()
            .await
            .map_err(LibError::from)
    }

    async fn delete_history(&self, id: i64) -> Result<()> {
        let response = self
            .authorize(self.client.delete(self.url(&format!("/ai/history/{id}"))))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn clear_history(&self) -> Result<()> {
        let response = self
            .authorize(self.client.delete(self.url("/ai/history")))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}
