//! Blocking client for the Ollama HTTP API.

use crate::{
    config::OllamaSettings,
    error::{Error, Result},
};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader};
use std::time::Duration;
use tracing::{debug, info, warn};

const GENERATE_PATH: &str = "/api/generate";
const TAGS_PATH: &str = "/api/tags";
const PULL_PATH: &str = "/api/pull";
const DELETE_PATH: &str = "/api/delete";

const MODEL_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Anything that turns a prompt into generated text.
pub trait TextGenerator {
    /// Generates a completion for `prompt`.
    ///
    /// # Errors
    ///
    /// Returns a fatal [`Error::Generation`] when no text could be obtained.
    fn generate(&self, prompt: &str, system: Option<&str>) -> Result<String>;

    /// Model identifier used for generation.
    fn model(&self) -> &str;
}

/// Sampling parameters sent with every generation request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GenerationOptions {
    /// Sampling temperature
    pub temperature: f32,
    /// Nucleus sampling threshold
    pub top_p: f32,
    /// Upper bound on generated tokens
    pub max_tokens: u32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: 0.9,
            max_tokens: 4000,
        }
    }
}

/// Body of `POST /api/generate`.
#[derive(Debug, Serialize)]
pub struct GenerationRequest<'a> {
    /// Model identifier
    pub model: &'a str,
    /// Prompt text
    pub prompt: &'a str,
    /// Always false; the whole response is read at once
    pub stream: bool,
    /// Sampling parameters
    pub options: GenerationOptions,
    /// Optional system instruction
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<&'a str>,
}

#[derive(Deserialize)]
struct GenerationResponse {
    #[serde(default)]
    response: Option<String>,
}

/// A model installed on the server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ModelInfo {
    /// Model name with tag
    pub name: String,
    /// Size on disk in bytes
    #[serde(default)]
    pub size: u64,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelInfo>,
}

/// One line of the `/api/pull` progress stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PullEvent {
    /// Human-readable status
    #[serde(default)]
    pub status: Option<String>,
    /// Bytes downloaded so far
    #[serde(default)]
    pub completed: Option<u64>,
    /// Total bytes of the current layer
    #[serde(default)]
    pub total: Option<u64>,
    /// Error reported by the server
    #[serde(default)]
    pub error: Option<String>,
}

impl PullEvent {
    /// Completion percentage, when both counters are present and total is
    /// non-zero.
    #[must_use]
    pub fn progress(&self) -> Option<f64> {
        match (self.completed, self.total) {
            (Some(completed), Some(total)) if total > 0 => {
                Some(completed as f64 / total as f64 * 100.0)
            }
            _ => None,
        }
    }
}

#[derive(Serialize)]
struct ModelName<'a> {
    name: &'a str,
}

/// Client for a single Ollama host.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    settings: OllamaSettings,
    client: Client,
}

impl OllamaClient {
    /// Creates a client for the given settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings are invalid or the HTTP client
    /// cannot be built.
    pub fn new(settings: &OllamaSettings) -> Result<Self> {
        settings.validate()?;

        // Pulls may legitimately run for a long time, so each request sets
        // its own timeout instead.
        let client = Client::builder()
            .timeout(None::<Duration>)
            .build()
            .map_err(|e| Error::config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            settings: settings.clone(),
            client,
        })
    }

    /// Base URL of the server.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.settings.host
    }

    /// Lists installed models.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on transport, status or decode failure.
    pub fn try_list_models(&self) -> Result<Vec<ModelInfo>> {
        let endpoint = self.settings.endpoint(TAGS_PATH);

        let response = self
            .client
            .get(&endpoint)
            .timeout(MODEL_REQUEST_TIMEOUT)
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .map_err(|e| Error::http(&endpoint, e))?;

        let tags: TagsResponse = response.json().map_err(|e| Error::http(&endpoint, e))?;
        debug!("Server reports {} models", tags.models.len());
        Ok(tags.models)
    }

    /// Lists installed models, or nothing if the server cannot be reached.
    #[must_use]
    pub fn list_models(&self) -> Vec<ModelInfo> {
        self.try_list_models().unwrap_or_else(|e| {
            warn!("{}", e);
            Vec::new()
        })
    }

    /// Pulls a model, reporting every progress event to `on_event`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] if the request fails or a line of the stream
    /// cannot be read or decoded.
    pub fn pull_model(&self, name: &str, mut on_event: impl FnMut(&PullEvent)) -> Result<()> {
        let endpoint = self.settings.endpoint(PULL_PATH);
        info!("Pulling model {}", name);

        let response = self
            .client
            .post(&endpoint)
            .json(&ModelName { name })
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .map_err(|e| Error::http(&endpoint, e))?;

        for line in BufReader::new(response).lines() {
            let line = line.map_err(|e| Error::http(&endpoint, e))?;
            if line.trim().is_empty() {
                continue;
            }

            let event: PullEvent =
                serde_json::from_str(&line).map_err(|e| Error::http(&endpoint, e))?;
            on_event(&event);
        }

        Ok(())
    }

    /// Deletes a model from the server.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on transport or status failure.
    pub fn delete_model(&self, name: &str) -> Result<()> {
        let endpoint = self.settings.endpoint(DELETE_PATH);

        self.client
            .delete(&endpoint)
            .timeout(MODEL_REQUEST_TIMEOUT)
            .json(&ModelName { name })
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .map_err(|e| Error::http(&endpoint, e))?;

        info!("Deleted model {}", name);
        Ok(())
    }
}

impl TextGenerator for OllamaClient {
    fn generate(&self, prompt: &str, system: Option<&str>) -> Result<String> {
        let endpoint = self.settings.endpoint(GENERATE_PATH);
        let request = GenerationRequest {
            model: &self.settings.model,
            prompt,
            stream: false,
            options: GenerationOptions::default(),
            system,
        };

        debug!(
            "POST {} (model={}, prompt={} chars)",
            endpoint,
            self.settings.model,
            prompt.len()
        );

        let response = self
            .client
            .post(&endpoint)
            .timeout(self.settings.timeout)
            .json(&request)
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .map_err(|e| Error::generation(&endpoint, e))?;

        let body: GenerationResponse = response
            .json()
            .map_err(|e| Error::generation(&endpoint, e))?;

        Ok(body.response.unwrap_or_default())
    }

    fn model(&self) -> &str {
        &self.settings.model
    }
}

#[cfg(test)]
#[path = "../tests/common/mod.rs"]
mod mock;
