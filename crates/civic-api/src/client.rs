//! HTTP-backed completion client for chat-style inference endpoints.

use std::time::Duration;

use reqwest::StatusCode;
use serde_json::{json, Value};
use tracing::{debug, warn};

use civic_core::{CompletionClient, CompletionError};

const DEFAULT_MAX_NEW_TOKENS: u32 = 1024;
const DEFAULT_TEMPERATURE: f64 = 0.7;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
const RETRY_DELAY: Duration = Duration::from_secs(5);

/// Calls an inference endpoint that accepts `{inputs: [...], parameters}`
/// and answers `[{"generated_text": "..."}]`. Retries once when the
/// endpoint reports itself unavailable (scale-to-zero cold starts).
#[derive(Debug)]
pub struct HttpCompletionClient {
    endpoint_url: String,
    token: Option<String>,
    max_new_tokens: u32,
    temperature: f64,
    http: reqwest::blocking::Client,
}

impl HttpCompletionClient {
    pub fn new(endpoint_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            endpoint_url: endpoint_url.into(),
            token,
            max_new_tokens: DEFAULT_MAX_NEW_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            http: reqwest::blocking::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_else(|_| reqwest::blocking::Client::new()),
        }
    }

    fn post_once(&self, body: &Value) -> Result<reqwest::blocking::Response, CompletionError> {
        let mut request = self.http.post(&self.endpoint_url).json(body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        request
            .send()
            .map_err(|err| CompletionError::Transport(err.to_string()))
    }
}

impl CompletionClient for HttpCompletionClient {
    fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, CompletionError> {
        let body = json!({
            "inputs": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_prompt},
            ],
            "parameters": {
                "max_new_tokens": self.max_new_tokens,
                "temperature": self.temperature,
            },
        });

        debug!(
            endpoint = %self.endpoint_url,
            system_chars = system_prompt.len(),
            user_chars = user_prompt.len(),
            "calling completion endpoint"
        );

        let mut retried = false;
        loop {
            let response = self.post_once(&body)?;
            let status = response.status();

            if status == StatusCode::SERVICE_UNAVAILABLE && !retried {
                warn!(endpoint = %self.endpoint_url, "endpoint unavailable, retrying once");
                std::thread::sleep(RETRY_DELAY);
                retried = true;
                continue;
            }
            if status == StatusCode::SERVICE_UNAVAILABLE {
                return Err(CompletionError::Unavailable(format!(
                    "endpoint still unavailable after retry (status {status})"
                )));
            }
            if !status.is_success() {
                return Err(CompletionError::Transport(format!(
                    "endpoint answered with status {status}"
                )));
            }

            let raw = response
                .text()
                .map_err(|err| CompletionError::Transport(err.to_string()))?;
            return extract_generated_text(&raw);
        }
    }
}

/// Pulls the generated text out of the handler's response envelope,
/// falling back to the raw body for plain-text endpoints.
fn extract_generated_text(raw: &str) -> Result<String, CompletionError> {
    if raw.trim().is_empty() {
        return Err(CompletionError::EmptyResponse);
    }

    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(entries)) => {
            if let Some(text) = entries
                .first()
                .and_then(|entry| entry.get("generated_text"))
                .and_then(Value::as_str)
            {
                return Ok(text.to_string());
            }
            warn!("unexpected completion response shape, passing body through");
            Ok(raw.to_string())
        }
        Ok(Value::String(text)) => Ok(text),
        _ => Ok(raw.to_string()),
    }
}

/// Stand-in used when no endpoint is configured: every call fails as
/// unavailable, which surfaces as a pipeline failure to the caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredClient;

impl CompletionClient for UnconfiguredClient {
    fn complete(&self, _system_prompt: &str, _user_prompt: &str) -> Result<String, CompletionError> {
        Err(CompletionError::Unavailable(
            "no completion endpoint configured".to_string(),
        ))
    }
}
