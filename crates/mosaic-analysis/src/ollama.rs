//! Minimal client for a local Ollama server.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::AnalysisError;

const GENERATE_TIMEOUT: Duration = Duration::from_secs(120);
const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Sampling options sent with every generation. Tuned for short,
/// near-deterministic answers from small models.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationOptions {
    pub temperature: f64,
    pub num_predict: u32,
    pub top_k: u32,
    pub top_p: f64,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: 0.1,
            num_predict: 50,
            top_k: 10,
            top_p: 0.5,
        }
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: &'a GenerationOptions,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagModel>,
}

#[derive(Debug, Deserialize)]
struct TagModel {
    name: String,
}

#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
    model: String,
    options: GenerationOptions,
}

impl OllamaClient {
    /// # Errors
    ///
    /// Returns [`AnalysisError::Http`] if the HTTP client cannot be built.
    pub fn new(base_url: &str, model: &str) -> Result<Self, AnalysisError> {
        let client = Client::builder()
            .timeout(GENERATE_TIMEOUT)
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            options: GenerationOptions::default(),
        })
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// `true` when `GET /api/tags` answers 200 within two seconds.
    pub async fn is_available(&self) -> bool {
        match self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!(error = %e, "ollama probe failed");
                false
            }
        }
    }

    /// Installed model names, sorted.
    ///
    /// # Errors
    ///
    /// Network failures, non-2xx statuses and malformed bodies.
    pub async fn list_models(&self) -> Result<Vec<String>, AnalysisError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .client
            .get(&url)
            .timeout(PROBE_TIMEOUT)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(AnalysisError::UnexpectedStatus {
                status: response.status().as_u16(),
                url,
            });
        }
        let body = response.text().await?;
        let tags: TagsResponse =
            serde_json::from_str(&body).map_err(|e| AnalysisError::Deserialize {
                context: "ollama model list".to_string(),
                source: e,
            })?;
        let mut names: Vec<String> = tags.models.into_iter().map(|m| m.name).collect();
        names.sort();
        Ok(names)
    }

    /// Non-streaming generation over `prompt` followed by `data`.
    ///
    /// # Errors
    ///
    /// Network failures, non-2xx statuses and malformed bodies.
    pub async fn generate(&self, prompt: &str, data: &str) -> Result<String, AnalysisError> {
        let full_prompt = if data.is_empty() {
            prompt.to_string()
        } else {
            format!("{prompt}\n\n{data}")
        };
        let url = format!("{}/api/generate", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&GenerateRequest {
                model: &self.model,
                prompt: &full_prompt,
                stream: false,
                options: &self.options,
            })
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(AnalysisError::UnexpectedStatus {
                status: response.status().as_u16(),
                url,
            });
        }
        let body = response.text().await?;
        let parsed: GenerateResponse =
            serde_json::from_str(&body).map_err(|e| AnalysisError::Deserialize {
                context: "ollama generate response".to_string(),
                source: e,
            })?;
        Ok(parsed.response)
    }

    /// Like [`Self::generate`], but failures come back as an `ERROR: …`
    /// line so they end up in the report instead of aborting it.
    pub async fn analyze(&self, prompt: &str, data: &str) -> String {
        match self.generate(prompt, data).await {
            Ok(answer) => answer,
            Err(AnalysisError::Http(e)) if e.is_connect() => {
                "ERROR: Cannot connect to Ollama. Is it running? (ollama serve)".to_string()
            }
            Err(AnalysisError::Http(e)) if e.is_timeout() => {
                "ERROR: Ollama request timed out (>120s)".to_string()
            }
            Err(e) => {
                tracing::warn!(model = %self.model, error = %e, "analysis failed");
                format!("ERROR: {e}")
            }
        }
    }
}
