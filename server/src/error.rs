//! Proxy failures and their HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Non-success status from the inference API, with its body untouched.
    #[error("upstream returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl ProxyError {
    pub fn error_type(&self) -> &'static str {
        match self {
            ProxyError::Configuration(_) => "configuration_error",
            ProxyError::Upstream { .. } => "upstream_error",
            ProxyError::Transport(_) => "transport_error",
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = match self {
            ProxyError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ProxyError::Upstream { .. } | ProxyError::Transport(_) => StatusCode::BAD_GATEWAY,
        };

        let body = Json(json!({
            "error": {
                "type": self.error_type(),
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}
