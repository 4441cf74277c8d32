use axum::{
    Json,
    extract::rejection::BytesRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RelayError>;

const GENERIC_FAILURE: &str = "Failed to get response from the upstream model";

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Invalid request body")]
    InvalidBody,

    #[error("Request body rejected: {message}")]
    BodyRejected { status: StatusCode, message: String },

    #[error("API key not configured. Please set {0} in the relay environment.")]
    MissingConfig(&'static str),

    #[error("API request failed: {status_text}")]
    Upstream {
        status: StatusCode,
        status_text: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("{0}")]
    SerdeJson(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl RelayError {
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    pub fn upstream(status: StatusCode) -> Self {
        Self::Upstream {
            status,
            status_text: status
                .canonical_reason()
                .map(str::to_string)
                .unwrap_or_else(|| status.as_str().to_string()),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::InvalidBody => StatusCode::BAD_REQUEST,
            RelayError::BodyRejected { status, .. } | RelayError::Upstream { status, .. } => {
                *status
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<BytesRejection> for RelayError {
    fn from(rejection: BytesRejection) -> Self {
        Self::BodyRejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<anyhow::Error> for RelayError {
    fn from(value: anyhow::Error) -> Self {
        Self::Other(value.to_string())
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut message = self.to_string();
        if message.trim().is_empty() {
            message = GENERIC_FAILURE.to_string();
        }

        (status, Json(json!({ "error": message }))).into_response()
    }
}
