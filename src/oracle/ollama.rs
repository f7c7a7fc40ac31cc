//! Ollama `/api/generate` client.

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{Prompt, TextOracle};
use crate::config::OracleConfig;
use crate::error::{CognitiveError, Result};

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
    options: SamplingOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
}

#[derive(Debug, Clone, Copy, Serialize)]
struct SamplingOptions {
    temperature: f64,
    top_p: f64,
    top_k: u32,
    repeat_penalty: f64,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Non-streaming client for a local Ollama server.
#[derive(Debug)]
pub struct OllamaOracle {
    client: Client,
    url: String,
    model: String,
    system_prompt: Option<String>,
    options: SamplingOptions,
}

impl OllamaOracle {
    pub fn new(config: &OracleConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .build()
            .context("failed to build HTTP client")?;

        tracing::info!(model = %config.model, base_url = %config.base_url, "ollama oracle configured");

        Ok(Self {
            client,
            url: format!("{}/api/generate", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            system_prompt: config.system_prompt.clone(),
            options: SamplingOptions {
                temperature: config.temperature,
                top_p: config.top_p,
                top_k: config.top_k,
                repeat_penalty: config.repeat_penalty,
            },
        })
    }
}

#[async_trait]
impl TextOracle for OllamaOracle {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn complete(&self, prompt: &Prompt) -> Result<String> {
        let request = GenerateRequest {
            model: &self.model,
            prompt: prompt.render(),
            stream: false,
            options: self.options,
            system: self.system_prompt.as_deref(),
        };

        tracing::debug!(url = %self.url, model = %self.model, "calling ollama");

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| CognitiveError::Oracle(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(CognitiveError::Oracle(format!("ollama returned {status}: {body}")));
        }

        let generated: GenerateResponse = response
            .json()
            .await
            .map_err(|e| CognitiveError::Oracle(format!("malformed response: {e}")))?;

        let text = generated.response.trim();
        if text.is_empty() {
            return Err(CognitiveError::Oracle("empty completion".into()));
        }
        Ok(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(base_url: String) -> OracleConfig {
        OracleConfig {
            provider: "ollama".into(),
            base_url,
            model: "mistral".into(),
            system_prompt: Some("Be brief.".into()),
            ..OracleConfig::default()
        }
    }

    fn prompt() -> Prompt {
        Prompt {
            query: "what broke".into(),
            instruction: "Deduce.".into(),
            steps: vec!["the cache was cold".into()],
        }
    }

    #[tokio::test]
    async fn sends_model_options_and_returns_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .and(body_partial_json(serde_json::json!({
                "model": "mistral",
                "stream": false,
                "system": "Be brief.",
                "options": { "top_k": 40 }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "model": "mistral",
                "response": "  The cache was cold.  ",
                "done": true
            })))
            .mount(&server)
            .await;

        let oracle = OllamaOracle::new(&config(server.uri())).unwrap();
        let text = oracle.complete(&prompt()).await.unwrap();
        assert_eq!(text, "The cache was cold.");
    }

    #[tokio::test]
    async fn server_error_maps_to_oracle_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(500).set_body_string("model not loaded"))
            .mount(&server)
            .await;

        let oracle = OllamaOracle::new(&config(server.uri())).unwrap();
        let err = oracle.complete(&prompt()).await.unwrap_err();
        assert!(matches!(err, CognitiveError::Oracle(ref m) if m.contains("model not loaded")));
        assert!(err.is_recoverable());
    }

    #[tokio::test]
    async fn empty_completion_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "response": "" })),
            )
            .mount(&server)
            .await;

        let oracle = OllamaOracle::new(&config(server.uri())).unwrap();
        assert!(oracle.complete(&prompt()).await.is_err());
    }
}
