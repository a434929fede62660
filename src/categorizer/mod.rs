// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Categorizers: turn scanned items into category labels

pub mod gemini;
pub mod offline;
pub mod ollama;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::category::Category;
use crate::config::{AppConfig, Provider};
use crate::error::RequestError;
use crate::scanner::{FileItem, ItemKind};

/// Label assigned to one scanned item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryResult {
    pub item_id: usize,
    pub category: Category,
    /// Label as returned, before sanitizing
    pub raw_label: String,
}

/// Assigns categories to a batch of items
#[async_trait]
pub trait Categorizer: Send + Sync {
    /// Name shown in logs and `status`
    fn name(&self) -> &'static str;

    /// At most one result per item; items may be left out
    async fn categorize(&self, items: &[FileItem]) -> Result<Vec<CategoryResult>, RequestError>;

    /// Check the backing service is reachable
    async fn health_check(&self) -> Result<(), RequestError> {
        Ok(())
    }
}

/// A hosted model that completes a text prompt
#[async_trait]
pub trait TextGenerator: Send + Sync {
    fn name(&self) -> &'static str;

    /// Complete `prompt`, returning the model's text reply
    async fn generate(&self, prompt: &str) -> Result<String, RequestError>;

    async fn health_check(&self) -> Result<(), RequestError>;
}

/// What the model sees for each item
#[derive(Debug, Serialize)]
struct ItemDescriptor<'a> {
    id: usize,
    filename: &'a str,
    extension: &'a str,
    kind: ItemKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    excerpt: Option<&'a str>,
}

/// Categorizer backed by a hosted model
pub struct RemoteCategorizer {
    backend: Box<dyn TextGenerator>,
    instructions: String,
    categories: Vec<String>,
    retries: u32,
}

impl RemoteCategorizer {
    pub fn new(backend: Box<dyn TextGenerator>, config: &AppConfig) -> Self {
        Self {
            backend,
            instructions: config.prompts.categorize.clone(),
            categories: config.categories.clone(),
            retries: config.ai_engine.retries,
        }
    }

    async fn generate_with_retry(&self, prompt: &str) -> Result<String, RequestError> {
        let mut attempt = 0;
        loop {
            match self.backend.generate(prompt).await {
                Ok(text) => return Ok(text),
                Err(e) if attempt < self.retries && is_transient(&e) => {
                    attempt += 1;
                    let delay = Duration::from_secs(2u64.saturating_pow(attempt - 1));
                    warn!("{} request failed ({}), retrying in {:?}", self.backend.name(), e, delay);
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl Categorizer for RemoteCategorizer {
    fn name(&self) -> &'static str {
        self.backend.name()
    }

    async fn categorize(&self, items: &[FileItem]) -> Result<Vec<CategoryResult>, RequestError> {
        if items.is_empty() {
            return Ok(Vec::new());
        }
        let prompt = build_prompt(&self.instructions, &self.categories, items)?;

        info!("Sending {} items to {}...", items.len(), self.backend.name());
        let text = self.generate_with_retry(&prompt).await?;
        info!("Received response from {}", self.backend.name());
        debug!("Raw response: {}", text);

        parse_response(&text, items)
    }

    async fn health_check(&self) -> Result<(), RequestError> {
        self.backend.health_check().await
    }
}

fn is_transient(err: &RequestError) -> bool {
    match err {
        RequestError::Http(_) | RequestError::Unavailable(_) => true,
        RequestError::Status { status, .. } => *status == 429 || *status >= 500,
        RequestError::MissingApiKey(_) | RequestError::Malformed(_) => false,
    }
}

/// Build the categorization prompt for a batch
pub fn build_prompt(
    instructions: &str,
    categories: &[String],
    items: &[FileItem],
) -> Result<String, RequestError> {
    let descriptors: Vec<ItemDescriptor<'_>> = items
        .iter()
        .map(|item| ItemDescriptor {
            id: item.id,
            filename: &item.name,
            extension: &item.extension,
            kind: item.kind,
            excerpt: item.excerpt.as_deref(),
        })
        .collect();
    let listing = serde_json::to_string(&descriptors)
        .map_err(|e| RequestError::Malformed(format!("cannot encode items: {}", e)))?;

    let mut prompt = instructions.trim_end().to_string();
    prompt.push('\n');
    for category in categories {
        prompt.push_str("- ");
        prompt.push_str(category);
        prompt.push('\n');
    }
    prompt.push_str(
        "Return ONLY a valid JSON list of objects with the fields \"id\" (integer), \
         \"filename\" (string) and \"category\" (string), one per file. \
         Files to categorize:\n",
    );
    prompt.push_str(&listing);
    Ok(prompt)
}

/// Map a model reply onto the items of the batch it answers
pub fn parse_response(text: &str, items: &[FileItem]) -> Result<Vec<CategoryResult>, RequestError> {
    let value = extract_json(text)?;

    let elements = match value {
        Value::Array(elements) => elements,
        Value::Object(map) => {
            // First array field in reply order, skipping empty ones such as "errors": []
            let mut arrays = map.into_iter().filter_map(|(_, v)| match v {
                Value::Array(a) => Some(a),
                _ => None,
            });
            let first = arrays.next().ok_or_else(|| {
                RequestError::Malformed("object reply has no list of results".to_string())
            })?;
            if first.is_empty() {
                arrays.find(|a| !a.is_empty()).unwrap_or(first)
            } else {
                first
            }
        }
        other => {
            return Err(RequestError::Malformed(format!(
                "expected a JSON list, got {}",
                json_kind(&other)
            )))
        }
    };

    let mut seen = HashSet::new();
    let mut results = Vec::new();

    for element in elements {
        let Some(raw_label) = element.get("category").and_then(Value::as_str) else {
            warn!("Result without a category, skipping: {}", element);
            continue;
        };

        let item = match element.get("id").and_then(id_of) {
            Some(id) => items.iter().find(|i| i.id == id),
            None => element
                .get("filename")
                .and_then(Value::as_str)
                .and_then(|name| unique_by_name(items, name)),
        };
        let Some(item) = item else {
            warn!("Result does not match any file in the batch, skipping: {}", element);
            continue;
        };

        if !seen.insert(item.id) {
            debug!("Duplicate result for '{}', keeping the first", item.name);
            continue;
        }

        results.push(CategoryResult {
            item_id: item.id,
            category: Category::parse(raw_label),
            raw_label: raw_label.to_string(),
        });
    }

    Ok(results)
}

fn id_of(value: &Value) -> Option<usize> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| usize::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn unique_by_name<'a>(items: &'a [FileItem], name: &str) -> Option<&'a FileItem> {
    let mut matches = items.iter().filter(|i| i.name == name);
    let first = matches.next()?;
    match matches.next() {
        Some(_) => None,
        None => Some(first),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

/// Pull the JSON payload out of a reply that may be wrapped in prose or fences
fn extract_json(text: &str) -> Result<Value, RequestError> {
    let trimmed = text.trim();
    if let Ok(value) = serde_json::from_str(trimmed) {
        return Ok(value);
    }

    // ```json fenced or plain ``` fenced block
    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        let body_start = after.find('\n').map(|i| i + 1).unwrap_or(0);
        let body = &after[body_start..];
        if let Some(end) = body.find("```") {
            if let Ok(value) = serde_json::from_str(body[..end].trim()) {
                return Ok(value);
            }
        }
    }

    // Bare list or object embedded in prose
    for (open, close) in [('[', ']'), ('{', '}')] {
        if let (Some(start), Some(end)) = (trimmed.find(open), trimmed.rfind(close)) {
            if start < end {
                if let Ok(value) = serde_json::from_str(&trimmed[start..=end]) {
                    return Ok(value);
                }
            }
        }
    }

    let preview: String = trimmed.chars().take(120).collect();
    Err(RequestError::Malformed(format!("no JSON found in reply: {}", preview)))
}

/// Pick the categorizer for a run
pub fn build_categorizer(config: &AppConfig, offline: bool) -> Result<Box<dyn Categorizer>, RequestError> {
    if offline {
        info!("Offline mode: no requests will be sent");
        return Ok(Box::new(offline::OfflineCategorizer::new(&config.offline, &config.categories)));
    }

    let backend: Box<dyn TextGenerator> = match config.ai_engine.provider {
        Provider::Gemini => Box::new(gemini::GeminiClient::new(&config.ai_engine)?),
        Provider::Ollama => Box::new(ollama::OllamaClient::new(&config.ai_engine)?),
    };
    Ok(Box::new(RemoteCategorizer::new(backend, config)))
}
