use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Missing authorization header")]
    MissingAuthHeader,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Missing API key or service credentials. The message is returned verbatim.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// AI endpoint answered with a non-2xx status.
    #[error("AI endpoint returned {status}: {details}")]
    Upstream { status: u16, details: String },

    #[error("No response from AI")]
    EmptyReply,

    #[error("Failed to parse AI response: {reason}")]
    Parse { reason: String, raw: String },

    #[error("AI response failed schema check: {}", .violations.join("; "))]
    Schema { violations: Vec<String>, raw: String },

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MissingAuthHeader | AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::InvalidBody(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// JSON body sent to the caller: always `error`, plus whatever detail
    /// the variant carries.
    pub fn body(&self) -> Value {
        match self {
            AppError::MissingAuthHeader => json!({ "error": "Missing authorization header" }),
            AppError::Unauthorized(details) => json!({
                "error": "Unauthorized",
                "details": details,
                "code": 401,
            }),
            AppError::Config(msg) => json!({ "error": msg }),
            AppError::InvalidBody(details) => json!({
                "error": "Invalid request body",
                "details": details,
            }),
            AppError::Validation(msg) => json!({ "error": msg }),
            AppError::Upstream { status, details } => json!({
                "error": "Failed to analyze product with AI",
                "details": details,
                "status": status,
            }),
            AppError::EmptyReply => json!({ "error": "No response from AI" }),
            AppError::Parse { reason, raw } => json!({
                "error": "Failed to parse AI response",
                "details": reason,
                "raw_response": raw,
            }),
            AppError::Schema { violations, raw } => json!({
                "error": "AI response did not match the expected schema",
                "details": violations.join("; "),
                "violations": violations,
                "raw_response": raw,
            }),
            AppError::Http(_) | AppError::Io(_) => {
                let mut body = json!({
                    "error": "Internal server error",
                    "details": self.to_string(),
                });
                if cfg!(debug_assertions) {
                    body["debug"] = Value::String(format!("{self:?}"));
                }
                body
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        (self.status(), Json(self.body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_failures_map_to_401() {
        assert_eq!(AppError::MissingAuthHeader.status(), StatusCode::UNAUTHORIZED);
        let err = AppError::Unauthorized("expired".to_string());
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.body()["details"], "expired");
        assert_eq!(err.body()["code"], 401);
    }

    #[test]
    fn validation_failures_map_to_400() {
        let err = AppError::Validation("Valid store_price is required".to_string());
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.body()["error"], "Valid store_price is required");
        assert_eq!(AppError::InvalidBody("eof".into()).status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn parse_failure_carries_raw_reply() {
        let err = AppError::Parse {
            reason: "no JSON object found".to_string(),
            raw: "sorry, I can't help".to_string(),
        };
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.body()["raw_response"], "sorry, I can't help");
    }

    #[test]
    fn schema_failure_lists_violations() {
        let err = AppError::Schema {
            violations: vec!["verdict: required".into(), "market_price: required".into()],
            raw: "{}".to_string(),
        };
        let body = err.body();
        assert_eq!(body["violations"].as_array().map(|v| v.len()), Some(2));
        assert_eq!(body["raw_response"], "{}");
    }

    #[test]
    fn io_failure_is_generic_500() {
        let err = AppError::from(std::io::Error::new(std::io::ErrorKind::AddrInUse, "port taken"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = err.body();
        assert_eq!(body["error"], "Internal server error");
        assert_eq!(body["details"], "IO error: port taken");
    }

    #[test]
    fn upstream_failure_forwards_status_and_details() {
        let err = AppError::Upstream { status: 429, details: "quota exceeded".to_string() };
        let body = err.body();
        assert_eq!(body["status"], 429);
        assert_eq!(body["details"], "quota exceeded");
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
