use crate::mode::{Mode, TargetLang};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Parse-endpoint request envelope (spec.md §3). Callers may submit any
/// subset of these fields via JSON body, form body, or query string; the
/// orchestrator normalizes them before dispatch.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ParseRequest {
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub target_lang: Option<String>,
    #[serde(default)]
    pub instruction: Option<String>,
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeepseekMeta {
    pub provider: String,
    pub tier: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct ParseMeta {
    pub mode: String,
    pub input_bytes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deepseek: Option<DeepseekMeta>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_lang: Option<String>,
}

/// Parse-endpoint response envelope (spec.md §3).
#[derive(Debug, Clone, Serialize)]
pub struct ParseResponse {
    pub ok: bool,
    pub request_id: String,
    pub ts: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ParseError>,
    pub meta: ParseMeta,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParseError {
    pub code: &'static str,
    pub message: String,
}

impl ParseResponse {
    pub fn ok(request_id: String, data: Value, meta: ParseMeta) -> Self {
        ParseResponse {
            ok: true,
            request_id,
            ts: chrono::Utc::now().to_rfc3339(),
            data: Some(data),
            error: None,
            meta,
        }
    }

    pub fn err(request_id: String, code: &'static str, message: String, meta: ParseMeta) -> Self {
        ParseResponse {
            ok: false,
            request_id,
            ts: chrono::Utc::now().to_rfc3339(),
            data: None,
            error: Some(ParseError { code, message }),
            meta,
        }
    }
}

/// A request envelope after mode/target_lang have been validated and
/// normalized — what the orchestrator actually works with.
#[derive(Debug, Clone)]
pub struct NormalizedParseRequest {
    pub mode: Mode,
    pub target_lang: Option<TargetLang>,
    pub instruction: String,
    pub body: String,
    pub url: Option<String>,
    pub auth_token: Option<String>,
}
