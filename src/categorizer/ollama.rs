// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Ollama API client for local inference

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::TextGenerator;
use crate::config::EngineConfig;
use crate::error::RequestError;

/// Ollama API client
pub struct OllamaClient {
    client: Client,
    base_url: String,
    model: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    format: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Deserialize)]
struct TagsResponse {
    models: Vec<ModelInfo>,
}

#[derive(Deserialize)]
struct ModelInfo {
    name: String,
}

impl OllamaClient {
    pub fn new(config: &EngineConfig) -> Result<Self, RequestError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        // Accept full endpoint URLs as well as the bare host
        let base_url = config
            .resolved_base_url()
            .replace("/api/generate", "")
            .replace("/api/chat", "");

        Ok(Self {
            client,
            base_url,
            model: config.model.clone(),
        })
    }

    /// List available models
    pub async fn list_models(&self) -> Result<Vec<String>, RequestError> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(RequestError::Status {
                status: response.status().as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let tags: TagsResponse = response.json().await?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }
}

#[async_trait]
impl TextGenerator for OllamaClient {
    fn name(&self) -> &'static str {
        "ollama"
    }

    async fn generate(&self, prompt: &str) -> Result<String, RequestError> {
        let url = format!("{}/api/generate", self.base_url);

        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            format: "json",
        };

        debug!("Sending request to Ollama: model={}", self.model);

        let response = self.client.post(&url).json(&request).send().await?;

        if !response.status().is_success() {
            return Err(RequestError::Status {
                status: response.status().as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let result: GenerateResponse = response
            .json()
            .await
            .map_err(|e| RequestError::Malformed(format!("unexpected Ollama reply: {}", e)))?;
        Ok(result.response)
    }

    /// Check Ollama answers and has the configured model
    async fn health_check(&self) -> Result<(), RequestError> {
        let models = self.list_models().await.map_err(|e| {
            RequestError::Unavailable(format!("Cannot connect to Ollama at {}: {}", self.base_url, e))
        })?;

        let wanted = &self.model;
        if models
            .iter()
            .any(|m| m == wanted || m.starts_with(&format!("{}:", wanted)))
        {
            Ok(())
        } else {
            Err(RequestError::Unavailable(format!(
                "Model '{}' not found. Available: {:?}",
                wanted, models
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Provider;
    use httpmock::prelude::*;
    use serde_json::json;

    fn engine(url: String) -> EngineConfig {
        EngineConfig {
            provider: Provider::Ollama,
            base_url: url,
            model: "llama3.2".to_string(),
            ..EngineConfig::default()
        }
    }

    #[tokio::test]
    async fn test_generate_sends_json_format() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/api/generate")
                .json_body_partial(r#"{"model": "llama3.2", "stream": false, "format": "json"}"#);
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(json!({"response": "[]", "done": true}));
        });

        let client = OllamaClient::new(&engine(server.base_url())).unwrap();
        let text = client.generate("sort").await.unwrap();

        mock.assert();
        assert_eq!(text, "[]");
    }

    #[tokio::test]
    async fn test_full_endpoint_url_is_normalized() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/api/generate");
            then.status(200).json_body(json!({"response": "{}"}));
        });

        let client = OllamaClient::new(&engine(server.url("/api/generate"))).unwrap();
        client.generate("sort").await.unwrap();
        mock.assert();
    }

    #[tokio::test]
    async fn test_error_status() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/api/generate");
            then.status(500).body("model crashed");
        });

        let client = OllamaClient::new(&engine(server.base_url())).unwrap();
        match client.generate("sort").await {
            Err(RequestError::Status { status, body }) => {
                assert_eq!(status, 500);
                assert_eq!(body, "model crashed");
            }
            other => panic!("Expected status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_health_check_requires_model() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api/tags");
            then.status(200)
                .json_body(json!({"models": [{"name": "llama3.2:latest"}, {"name": "moondream:latest"}]}));
        });

        let client = OllamaClient::new(&engine(server.base_url())).unwrap();
        assert!(client.health_check().await.is_ok());

        let mut other = engine(server.base_url());
        other.model = "mistral".to_string();
        let client = OllamaClient::new(&other).unwrap();
        assert!(matches!(
            client.health_check().await,
            Err(RequestError::Unavailable(_))
        ));
    }
}
