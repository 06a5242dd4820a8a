//! Upstream HTTP client (spec.md §4.7). Grounded on the teacher's
//! `OpenAIAdapter::generate` (`keyvault/src/adapters/openai.rs`): build a
//! `reqwest::Client` once, POST the OpenAI-compatible chat-completions
//! body, parse `choices[0].message.content`, and surface non-2xx bodies as
//! a typed error rather than `anyhow::bail!` since this is a library
//! boundary, not the teacher's top-level binary.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(8);
const TOTAL_TIMEOUT: Duration = Duration::from_secs(20);
/// Chat-gateway buffered calls get a longer total timeout than parse's
/// upstream calls (spec.md §5: "non-stream total timeout is 20-30 s
/// (parse: 20; chat: 30)").
const CHAT_TOTAL_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Serialize, Default)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

#[derive(Debug, Clone)]
pub struct CallResponse {
    pub model: String,
    pub usage: Usage,
    pub json_object: Value,
}

/// Error string format exactly as spec.md §4.7 requires:
/// `http_<status>[:upstream_message]` or `model_content_not_json_object`.
#[derive(Debug)]
pub enum CallError {
    Http {
        status: u16,
        upstream_message: Option<String>,
    },
    ContentNotJson,
    Transport(String),
}

impl std::fmt::Display for CallError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CallError::Http { status, upstream_message: Some(m) } if !m.is_empty() => {
                write!(f, "http_{status}:{m}")
            }
            CallError::Http { status, .. } => write!(f, "http_{status}"),
            CallError::ContentNotJson => write!(f, "model_content_not_json_object"),
            CallError::Transport(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for CallError {}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    response_format: ResponseFormat<'a>,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<UsageResponse>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: String,
}

#[derive(Deserialize, Default)]
struct UsageResponse {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
    #[serde(default)]
    total_tokens: u64,
}

pub struct UpstreamClient {
    http: reqwest::Client,
}

impl Default for UpstreamClient {
    fn default() -> Self {
        Self::new()
    }
}

impl UpstreamClient {
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(TOTAL_TIMEOUT)
            .build()
            .expect("reqwest client builder with fixed timeouts never fails");
        UpstreamClient { http }
    }

    /// Single buffered chat-completions call (spec.md §4.7). On 2xx,
    /// `choices[0].message.content` is trimmed and re-parsed as JSON;
    /// failure to re-parse yields `CallError::ContentNotJson`.
    pub async fn call(
        &self,
        endpoint: &str,
        api_key: &str,
        model: &str,
        system_text: &str,
        user_text: &str,
    ) -> Result<CallResponse, CallError> {
        let body = ChatRequest {
            model,
            temperature: 0.2,
            response_format: ResponseFormat { kind: "json_object" },
            messages: [
                ChatMessage { role: "system", content: system_text },
                ChatMessage { role: "user", content: user_text },
            ],
        };

        let response = self
            .http
            .post(endpoint)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| CallError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = extract_error_message(&text);
            return Err(CallError::Http {
                status: status.as_u16(),
                upstream_message: message,
            });
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| CallError::Transport(e.to_string()))?;

        let content = parsed
            .choices
            .first()
            .map(|c| c.message.content.trim().to_string())
            .unwrap_or_default();

        let json_object: Value =
            serde_json::from_str(&content).map_err(|_| CallError::ContentNotJson)?;

        let usage = parsed.usage.unwrap_or_default();
        Ok(CallResponse {
            model: model.to_string(),
            usage: Usage {
                prompt_tokens: usage.prompt_tokens,
                completion_tokens: usage.completion_tokens,
                total_tokens: usage.total_tokens,
            },
            json_object,
        })
    }

    /// Opens the streaming variant of the same call (spec.md §4.9): body
    /// carries `stream: true`; no total timeout (cancellation is driven by
    /// upstream EOF or client disconnect), connect timeout is unchanged.
    pub async fn call_stream(
        &self,
        endpoint: &str,
        api_key: &str,
        model: &str,
        system_text: &str,
        user_text: &str,
    ) -> Result<reqwest::Response, CallError> {
        let body = serde_json::json!({
            "model": model,
            "temperature": 0.2,
            "stream": true,
            "messages": [
                {"role": "system", "content": system_text},
                {"role": "user", "content": user_text},
            ],
        });

        self.http
            .post(endpoint)
            .bearer_auth(api_key)
            .timeout(Duration::MAX)
            .json(&body)
            .send()
            .await
            .map_err(|e| CallError::Transport(e.to_string()))
    }

    /// Same as [`Self::call_stream`] but forwards the caller's raw chat
    /// body verbatim (spec.md §4.11 chat gateway), only overriding `model`
    /// and forcing `stream: true`.
    pub async fn call_stream_raw(
        &self,
        endpoint: &str,
        api_key: &str,
        mut body: Value,
        model: &str,
    ) -> Result<reqwest::Response, CallError> {
        if let Value::Object(ref mut map) = body {
            map.insert("model".to_string(), Value::String(model.to_string()));
            map.insert("stream".to_string(), Value::Bool(true));
        }
        self.http
            .post(endpoint)
            .bearer_auth(api_key)
            .timeout(Duration::MAX)
            .json(&body)
            .send()
            .await
            .map_err(|e| CallError::Transport(e.to_string()))
    }

    /// Buffered variant of the chat-gateway call (spec.md §4.11
    /// non-stream branch): forwards the caller's body, relaying status,
    /// body, and content-type verbatim at the call site.
    pub async fn call_raw(
        &self,
        endpoint: &str,
        api_key: &str,
        mut body: Value,
        model: &str,
    ) -> Result<reqwest::Response, CallError> {
        if let Value::Object(ref mut map) = body {
            map.insert("model".to_string(), Value::String(model.to_string()));
            map.insert("stream".to_string(), Value::Bool(false));
        }
        self.http
            .post(endpoint)
            .bearer_auth(api_key)
            .timeout(CHAT_TOTAL_TIMEOUT)
            .json(&body)
            .send()
            .await
            .map_err(|e| CallError::Transport(e.to_string()))
    }
}

/// Extracts `error.message` from an OpenAI-compatible error body, the way
/// `OpenAIAdapter::parse_error_response` does in the teacher.
fn extract_error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .get("error")
        .and_then(|e| e.get("message"))
        .and_then(|m| m.as_str())
        .map(|s| s.to_string())
}
