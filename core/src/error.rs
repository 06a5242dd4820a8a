use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;

/// Stable error codes, per spec.md §7. Each variant carries the status
/// code it maps to and an optional human-readable message.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("method not allowed")]
    MethodNotAllowed,
    #[error("invalid target_lang")]
    InvalidTargetLang,
    #[error("invalid mode")]
    InvalidMode,
    #[error("payload too large")]
    PayloadTooLarge,
    #[error("empty payload")]
    EmptyPayload,
    #[error("rate limited")]
    RateLimited { limit_per_minute: u32 },
    #[error("unauthorized")]
    Unauthorized,
    #[error("parse failed: {0}")]
    ParseFailed(String),
    #[error("ai call failed: {0}")]
    AiCallFailed(String),
    #[error("contract violation: {0}")]
    ContractViolation(String),
    #[error("service unavailable")]
    ServiceUnavailable,
    #[error("json encode failed")]
    JsonEncodeFailed,
    #[error("upstream error: {0}")]
    UpstreamError(String),
}

impl GatewayError {
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::MethodNotAllowed => "method_not_allowed",
            GatewayError::InvalidTargetLang => "invalid_target_lang",
            GatewayError::InvalidMode => "invalid_mode",
            GatewayError::PayloadTooLarge => "payload_too_large",
            GatewayError::EmptyPayload => "empty_payload",
            GatewayError::RateLimited { .. } => "rate_limited",
            GatewayError::Unauthorized => "unauthorized",
            GatewayError::ParseFailed(_) => "parse_failed",
            GatewayError::AiCallFailed(_) => "ai_call_failed",
            GatewayError::ContractViolation(_) => "contract_violation",
            GatewayError::ServiceUnavailable => "service_unavailable",
            GatewayError::JsonEncodeFailed => "json_encode_failed",
            GatewayError::UpstreamError(_) => "upstream_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            GatewayError::InvalidTargetLang
            | GatewayError::InvalidMode
            | GatewayError::EmptyPayload => StatusCode::BAD_REQUEST,
            GatewayError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            GatewayError::Unauthorized => StatusCode::UNAUTHORIZED,
            GatewayError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::ContractViolation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            GatewayError::AiCallFailed(_) => StatusCode::BAD_GATEWAY,
            GatewayError::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::ParseFailed(_)
            | GatewayError::JsonEncodeFailed
            | GatewayError::UpstreamError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> String {
        match self {
            GatewayError::ParseFailed(m)
            | GatewayError::AiCallFailed(m)
            | GatewayError::ContractViolation(m)
            | GatewayError::UpstreamError(m) => m.clone(),
            other => other.to_string(),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    ok: bool,
    error: ErrorDetail,
    #[serde(skip_serializing_if = "Option::is_none")]
    meta: Option<serde_json::Value>,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let meta = match &self {
            GatewayError::RateLimited { limit_per_minute } => {
                Some(serde_json::json!({ "limit_per_minute": limit_per_minute }))
            }
            _ => None,
        };
        let body = ErrorBody {
            ok: false,
            error: ErrorDetail {
                code: self.code(),
                message: self.message(),
            },
            meta,
        };
        (self.status(), Json(body)).into_response()
    }
}
