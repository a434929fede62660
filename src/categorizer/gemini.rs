// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Google Gemini (Generative Language API) client

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use super::TextGenerator;
use crate::config::EngineConfig;
use crate::error::RequestError;

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Gemini API client
pub struct GeminiClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    api_key_env: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: Value,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

/// Structured-output schema: one `{id, filename, category}` per file
fn response_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "id": {"type": "INTEGER", "description": "The unique identifier for the file."},
                "filename": {"type": "STRING", "description": "The exact original filename."},
                "category": {
                    "type": "STRING",
                    "description": "A folder path for the file, up to two levels deep (e.g., 'Sims/Mods', 'Documents')."
                }
            },
            "required": ["id", "filename", "category"]
        }
    })
}

impl GeminiClient {
    pub fn new(config: &EngineConfig) -> Result<Self, RequestError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.resolved_base_url(),
            model: config.model.clone(),
            api_key: config.resolved_api_key(),
            api_key_env: config.api_key_env.clone(),
        })
    }

    fn api_key(&self) -> Result<&str, RequestError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| RequestError::MissingApiKey(self.api_key_env.clone()))
    }

    fn model_url(&self) -> String {
        format!("{}/v1beta/models/{}", self.base_url, self.model)
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn generate(&self, prompt: &str) -> Result<String, RequestError> {
        let api_key = self.api_key()?;
        let url = format!("{}:generateContent", self.model_url());

        let request = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: response_schema(),
            },
        };

        debug!("Sending request to Gemini: model={}", self.model);

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(RequestError::Status {
                status: response.status().as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| RequestError::Malformed(format!("unexpected Gemini reply: {}", e)))?;

        let text: String = body
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(RequestError::Malformed("Gemini returned no candidates".to_string()));
        }
        Ok(text)
    }

    async fn health_check(&self) -> Result<(), RequestError> {
        let api_key = self.api_key()?;

        let response = self
            .client
            .get(self.model_url())
            .header(API_KEY_HEADER, api_key)
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| {
                RequestError::Unavailable(format!("Cannot connect to Gemini at {}: {}", self.base_url, e))
            })?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(RequestError::Status {
                status: response.status().as_u16(),
                body: response.text().await.unwrap_or_default(),
            })
        }
    }
}
