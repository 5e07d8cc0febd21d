//! Client configuration loading (generation backend and history limits).

use std::env;

use anyhow::anyhow;

use crate::error::{LibError, Result};

const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
const DEFAULT_HISTORY_LIMIT: u32 = 30;

/// Complete client configuration.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub backend_url: String,
    pub history_limit: u32,
    pub auth_token: Option<String>,
}

impl AppConfig {
    /// Loads the configuration from environment variables (reading `.env`
    /// when present). The history limit is clamped to 1..=100.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let backend_url =
            env::var("BACKEND_URL").unwrap_or_else(|_| DEFAULT_BACKEND_URL.to_string());

        let history_limit = match env::var("HISTORY_LIMIT") {
            Ok(raw) => raw
                .parse::<u32>()
                .map_err(|_| {
                    LibError::invalid(
                        "HISTORY_LIMIT debe ser un numero",
                        anyhow!("HISTORY_LIMIT is not numeric: {raw}"),
                    )
                })?
                .clamp(1, 100),
            Err(_) => DEFAULT_HISTORY_LIMIT,
        };

        let auth_token = env::var("AUTH_TOKEN").ok().filter(|token| !token.is_empty());

        Ok(Self {
            backend_url,
            history_limit,
            auth_token,
        })
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            auth_token: None,
        }
    }
}
