use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Failures surfaced by the club services and mapped onto HTTP responses.
///
/// Every variant is raised before the store is written, so a failed call
/// leaves the state exactly as it was.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClubError {
    #[error("Not authenticated")]
    Unauthenticated,

    #[error("Permission denied")]
    Forbidden,

    #[error("Lab key is held by another member")]
    KeyHeldByOther,

    #[error("Insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { requested: u32, available: u32 },

    #[error("No units of this component are held by the caller")]
    NothingToReturn,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),
}

impl ClubError {
    /// Stable machine-readable code carried in error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            ClubError::Unauthenticated => "unauthenticated",
            ClubError::Forbidden => "forbidden",
            ClubError::KeyHeldByOther => "key_held",
            ClubError::InsufficientStock { .. } => "insufficient_stock",
            ClubError::NothingToReturn => "nothing_to_return",
            ClubError::NotFound(_) => "not_found",
            ClubError::Validation(_) => "validation_failed",
            ClubError::Conflict(_) => "conflict",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ClubError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ClubError::Forbidden => StatusCode::FORBIDDEN,
            ClubError::KeyHeldByOther
            | ClubError::InsufficientStock { .. }
            | ClubError::NothingToReturn
            | ClubError::Conflict(_) => StatusCode::CONFLICT,
            ClubError::NotFound(_) => StatusCode::NOT_FOUND,
            ClubError::Validation(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ClubError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({
            "error": {
                "code": self.code(),
                "message": self.to_string(),
            }
        }));

        let mut resp = (status, body).into_response();
        if status == StatusCode::UNAUTHORIZED {
            resp.headers_mut().insert(
                axum::http::header::WWW_AUTHENTICATE,
                axum::http::HeaderValue::from_static("Bearer"),
            );
        }
        resp
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config.json: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
