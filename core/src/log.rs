use serde::Serialize;

/// Monetization log record (spec.md §3), one JSON line per parse request.
#[derive(Debug, Clone, Serialize)]
pub struct MonetizationLogRecord {
    pub ts: String,
    pub request_id: String,
    pub ok: bool,
    pub mode: String,
    pub resolved_mode: String,
    pub client_ip: String,
    pub input_bytes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

/// Access log record (spec.md §3), one JSON line per upstream call.
#[derive(Debug, Clone, Serialize)]
pub struct AccessLogRecord {
    pub ts: String,
    pub provider: String,
    pub status_code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_byte_ms: Option<u64>,
    pub total_latency_ms: u64,
    pub path: String,
    pub stream: bool,
    pub ip: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}
