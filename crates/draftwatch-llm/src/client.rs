// Claude API streaming client using reqwest-eventsource.
//
// Sends a single-turn message to the Anthropic Messages API with
// `stream: true` and folds the Server-Sent Events into one `Completion`.

use anyhow::{anyhow, bail};
use futures_util::StreamExt;
use reqwest_eventsource::{Event, RequestBuilderExt};
use serde_json::Value;
use tracing::{debug, warn};

use draftwatch_core::config::Config;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

// ---------------------------------------------------------------------------
// Completion
// ---------------------------------------------------------------------------

/// Fully collected text of one streamed response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
}

// ---------------------------------------------------------------------------
// ClaudeClient
// ---------------------------------------------------------------------------

/// Low-level Claude API streaming client.
pub struct ClaudeClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    api_url: String,
}

impl ClaudeClient {
    /// Create a new client with the given API key and model identifier.
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            model,
            api_url: ANTHROPIC_API_URL.to_string(),
        }
    }

    /// Point the client at a different Messages endpoint.
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send a message and collect the streamed response.
    ///
    /// Returns once `message_stop` arrives. A stream that ends early still
    /// yields whatever text arrived; an empty one is an error.
    pub async fn complete(
        &self,
        system: &str,
        user_content: &str,
        max_tokens: u32,
    ) -> anyhow::Result<Completion> {
        if self.api_key.is_empty() {
            bail!("API key not configured");
        }

        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": max_tokens,
            "stream": true,
            "system": system,
            "messages": [{ "role": "user", "content": user_content }]
        });

        let request = self
            .http
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body);

        let mut es = request
            .eventsource()
            .map_err(|e| anyhow!("Failed to create event source: {e}"))?;

        let mut completion = Completion {
            text: String::new(),
            input_tokens: 0,
            output_tokens: 0,
        };

        while let Some(event) = es.next().await {
            match event {
                Ok(Event::Open) => {
                    debug!("SSE connection opened");
                }
                Ok(Event::Message(msg)) => {
                    let event_type = msg.event.as_str();
                    let data = &msg.data;

                    match event_type {
                        "message_start" => {
                            match parse_input_tokens(data) {
                                Some(n) => completion.input_tokens = n,
                                None => warn!("failed to parse input_tokens from message_start"),
                            }
                            debug!(input_tokens = completion.input_tokens, "message_start");
                        }
                        "content_block_delta" => {
                            if let Some(text) = parse_delta_text(data) {
                                completion.text.push_str(&text);
                            }
                        }
                        "message_delta" => {
                            match parse_output_tokens(data) {
                                Some(n) => completion.output_tokens = n,
                                None => warn!("failed to parse output_tokens from message_delta"),
                            }
                            debug!(output_tokens = completion.output_tokens, "message_delta");
                        }
                        "message_stop" => {
                            debug!("message_stop, streaming complete");
                            es.close();
                            return Ok(completion);
                        }
                        "error" => {
                            es.close();
                            bail!(
                                "API stream error: {}",
                                parse_stream_error(data).unwrap_or_else(|| data.clone())
                            );
                        }
                        _ => {
                            debug!(event_type, "ignoring SSE event");
                        }
                    }
                }
                Err(reqwest_eventsource::Error::StreamEnded) => break,
                Err(err) => {
                    warn!(?err, "SSE stream error");
                    es.close();
                    bail!(extract_error_message(&err));
                }
            }
        }

        es.close();
        if completion.text.is_empty() {
            bail!("Stream ended unexpectedly without any content");
        }
        Ok(completion)
    }
}

// ---------------------------------------------------------------------------
// LlmClient wrapper
// ---------------------------------------------------------------------------

/// High-level wrapper that can be either an active Claude client or disabled.
pub enum LlmClient {
    /// Claude API is configured and ready.
    Active(ClaudeClient),
    /// LLM functionality is disabled (no API key configured).
    Disabled,
}

impl LlmClient {
    /// `Active` when credentials carry a non-empty API key, else `Disabled`.
    pub fn from_config(config: &Config) -> Self {
        match &config.credentials.anthropic_api_key {
            Some(key) if !key.is_empty() => {
                LlmClient::Active(ClaudeClient::new(key.clone(), config.llm.model.clone()))
            }
            _ => LlmClient::Disabled,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, LlmClient::Active(_))
    }

    pub async fn complete(
        &self,
        system: &str,
        user_content: &str,
        max_tokens: u32,
    ) -> anyhow::Result<Completion> {
        match self {
            LlmClient::Active(client) => client.complete(system, user_content, max_tokens).await,
            LlmClient::Disabled => bail!("LLM not configured"),
        }
    }
}

// ---------------------------------------------------------------------------
// SSE JSON parsing helpers
// ---------------------------------------------------------------------------

/// Extract `input_tokens` from a `message_start` event's JSON.
///
/// Expected shape: `{ "type": "message_start", "message": { "usage": { "input_tokens": N } } }`
pub(crate) fn parse_input_tokens(data: &str) -> Option<u32> {
    let v: Value = serde_json::from_str(data).ok()?;
    v.get("message")?
        .get("usage")?
        .get("input_tokens")?
        .as_u64()
        .map(|n| n as u32)
}

/// Extract `delta.text` from a `content_block_delta` event's JSON.
pub(crate) fn parse_delta_text(data: &str) -> Option<String> {
    let v: Value = serde_json::from_str(data).ok()?;
    v.get("delta")?.get("text")?.as_str().map(str::to_string)
}

/// Extract `output_tokens` from a `message_delta` event's JSON.
pub(crate) fn parse_output_tokens(data: &str) -> Option<u32> {
    let v: Value = serde_json::from_str(data).ok()?;
    v.get("usage")?
        .get("output_tokens")?
        .as_u64()
        .map(|n| n as u32)
}

/// Extract `error.message` from an in-stream `error` event.
///
/// Expected shape: `{ "type": "error", "error": { "type": "overloaded_error", "message": "..." } }`
pub(crate) fn parse_stream_error(data: &str) -> Option<String> {
    let v: Value = serde_json::from_str(data).ok()?;
    v.get("error")?
        .get("message")?
        .as_str()
        .map(str::to_string)
}

/// Extract a human-readable error message from an SSE error.
fn extract_error_message(err: &reqwest_eventsource::Error) -> String {
    match err {
        reqwest_eventsource::Error::InvalidStatusCode(status, _response) => {
            format!("API returned status {status}")
        }
        reqwest_eventsource::Error::Transport(e) => {
            format!("Network error: {e}")
        }
        other => format!("Stream error: {other}"),
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
