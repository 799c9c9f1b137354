//! Client for the local generative-model HTTP endpoint.
//!
//! One `POST` per prompt to an Ollama-compatible `/api/generate` URL with
//! body `{"model": ..., "prompt": ...}`. The endpoint streams its answer as
//! newline-delimited JSON objects; each object's `"response"` field is one
//! text fragment. This module assembles the fragments back into a single
//! answer string.
//!
//! # Assembly rules
//!
//! - Blank lines are ignored.
//! - A line that fails to parse as JSON is skipped, never fatal to the
//!   response; skipped lines are counted and reported on [`ModelReply`].
//! - Fragments are concatenated in arrival order and trimmed; an empty
//!   result becomes the literal [`NO_RESPONSE_FALLBACK`].
//! - A non-200 status becomes a [`ModelOutcome::ServiceError`] carrying the
//!   literal legacy message (`Error: <status> - Unable to process the
//!   request.`) rather than an `Err` — the surfaces decide how to render it.
//!
//! No retry, no backoff; the timeout is optional and off by default.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;

use crate::config::ModelConfig;

/// Returned verbatim when the endpoint answers 200 with no usable fragments.
pub const NO_RESPONSE_FALLBACK: &str = "No meaningful response received.";

/// Legacy-format message for a non-200 status.
pub fn service_error_message(status: u16) -> String {
    format!("Error: {} - Unable to process the request.", status)
}

/// Outcome of one generate call that reached the endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelOutcome {
    /// Assembled answer text (or the no-response fallback).
    Answer(String),
    /// The endpoint returned a non-200 status; `message` is the legacy
    /// display string embedding the status code.
    ServiceError { status: u16, message: String },
}

impl ModelOutcome {
    /// Text to show the user. Service errors render with their legacy
    /// message so the visible behavior matches the original tool.
    pub fn display_text(&self) -> &str {
        match self {
            ModelOutcome::Answer(text) => text,
            ModelOutcome::ServiceError { message, .. } => message,
        }
    }

    pub fn is_answer(&self) -> bool {
        matches!(self, ModelOutcome::Answer(_))
    }
}

/// One reply from the model endpoint, with parse diagnostics.
#[derive(Debug, Clone)]
pub struct ModelReply {
    pub outcome: ModelOutcome,
    /// Number of response lines that were not valid JSON and were dropped.
    pub skipped_lines: usize,
}

/// Seam for the conversation controller: anything that can answer a prompt.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<ModelReply>;
}

/// HTTP client for the configured generate endpoint.
pub struct ModelClient {
    http: reqwest::Client,
    url: String,
    model: String,
}

impl ModelClient {
    pub fn new(config: &ModelConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder.build().context("Failed to build HTTP client")?;
        Ok(Self {
            http,
            url: config.url.clone(),
            model: config.name.clone(),
        })
    }
}

#[async_trait]
impl LanguageModel for ModelClient {
    async fn generate(&self, prompt: &str) -> Result<ModelReply> {
        let body = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
        });

        let response = self
            .http
            .post(&self.url)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Model request failed (is the model running at {}?)", self.url))?;

        let status = response.status();
        if !status.is_success() {
            return Ok(ModelReply {
                outcome: ModelOutcome::ServiceError {
                    status: status.as_u16(),
                    message: service_error_message(status.as_u16()),
                },
                skipped_lines: 0,
            });
        }

        let text = response
            .text()
            .await
            .context("Failed to read model response body")?;

        let (answer, skipped_lines) = assemble_fragments(&text);
        Ok(ModelReply {
            outcome: ModelOutcome::Answer(answer),
            skipped_lines,
        })
    }
}

/// Assembles a newline-delimited JSON body into `(answer, skipped_lines)`.
///
/// Each non-blank line is parsed independently; parse failures are counted
/// and skipped. Parsed lines contribute their `"response"` string (empty if
/// absent) in order. The concatenation is trimmed; an empty result yields
/// [`NO_RESPONSE_FALLBACK`].
pub fn assemble_fragments(body: &str) -> (String, usize) {
    let mut out = String::new();
    let mut skipped = 0usize;
    for line in body.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<serde_json::Value>(line) {
            Ok(value) => {
                if let Some(fragment) = value.get("response").and_then(|v| v.as_str()) {
                    out.push_str(fragment);
                }
            }
            Err(_) => skipped += 1,
        }
    }
    let trimmed = out.trim();
    if trimmed.is_empty() {
        (NO_RESPONSE_FALLBACK.to_string(), skipped)
    } else {
        (trimmed.to_string(), skipped)
    }
}
