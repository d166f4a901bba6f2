//! Thin client for the Ollama REST API.
//!
//! Only the calls the range analysis needs: `/api/generate` (non-streaming),
//! `/api/tags` and `/api/version`. Every call is made once; there are no
//! retries and no backoff.

use crate::core::response::parse_generate_response;
use crate::utils::error::{AnalysisError, Result};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

pub const DEFAULT_SERVER_URL: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "llama2";
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Model options Ollama understands; anything else is ignored with a warning.
pub const KNOWN_OPTIONS: &[&str] = &[
    "temperature",
    "top_p",
    "top_k",
    "num_predict",
    "num_ctx",
    "repeat_penalty",
    "seed",
];

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<&'a BTreeMap<String, serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelInfo>,
}

#[derive(Debug, Deserialize)]
struct VersionResponse {
    version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub modified_at: String,
    #[serde(default)]
    pub digest: String,
}

impl ModelInfo {
    pub fn size_mb(&self) -> f64 {
        self.size as f64 / (1024.0 * 1024.0)
    }
}

#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
    model: String,
    options: BTreeMap<String, serde_json::Value>,
}

impl OllamaClient {
    pub fn new(base_url: &str, model: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AnalysisError::ConfigError {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            options: BTreeMap::new(),
        })
    }

    pub fn with_options(mut self, options: &BTreeMap<String, serde_json::Value>) -> Self {
        self.options = options
            .iter()
            .filter(|(key, _)| {
                let known = KNOWN_OPTIONS.contains(&key.as_str());
                if !known {
                    tracing::warn!("Unknown model option '{}' ignored", key);
                }
                known
            })
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Sends the prompt and returns the raw response body.
    pub async fn generate_raw(&self, prompt: &str) -> Result<String> {
        let url = self.endpoint("/api/generate");
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: (!self.options.is_empty()).then_some(&self.options),
        };

        tracing::debug!(
            "POST {} (model: {}, prompt: {} chars)",
            url,
            self.model,
            prompt.chars().count()
        );
        let response = self.client.post(&url).json(&request).send().await?;
        let status = response.status();
        tracing::debug!("Generate response status: {}", status);

        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!("Generate request failed with {}: {}", status, body.trim());
            return Err(status_error(status));
        }

        Ok(response.text().await?)
    }

    /// Sends the prompt and returns the model's answer text.
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        let body = self.generate_raw(prompt).await?;
        parse_generate_response(&body)
    }

    pub async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let url = self.endpoint("/api/tags");
        tracing::debug!("GET {}", url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(status_error(status));
        }

        let tags: TagsResponse = serde_json::from_str(&response.text().await?)?;
        Ok(tags.models)
    }

    pub async fn version(&self) -> Result<String> {
        let url = self.endpoint("/api/version");
        tracing::debug!("GET {}", url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(status_error(status));
        }

        let version: VersionResponse = serde_json::from_str(&response.text().await?)?;
        Ok(version.version)
    }

    pub async fn test_connection(&self) -> bool {
        match self.list_models().await {
            Ok(models) => {
                tracing::debug!("Connection ok, {} models available", models.len());
                true
            }
            Err(e) => {
                tracing::debug!("Connection test failed: {}", e);
                false
            }
        }
    }
}

fn status_error(status: StatusCode) -> AnalysisError {
    AnalysisError::HttpStatusError {
        status: status.as_u16(),
        reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
    }
}
