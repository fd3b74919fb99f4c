use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::fmt;

use crate::services::AnimeError;

/// Error body: a generic message plus the underlying cause when there is one.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug)]
pub enum ApiError {
    ValidationError(String),

    NotFound { error: String, details: String },

    UpstreamError { error: String, details: String },

    InternalError { error: String, details: String },
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ValidationError(msg) => write!(f, "Validation error: {msg}"),
            Self::NotFound { error, details } => write!(f, "{error}: {details}"),
            Self::UpstreamError { error, details } => write!(f, "{error}: {details}"),
            Self::InternalError { error, details } => write!(f, "{error}: {details}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::ValidationError(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: msg,
                    details: None,
                },
            ),
            Self::NotFound { error, details } => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    error,
                    details: Some(details),
                },
            ),
            Self::UpstreamError { error, details } => {
                tracing::warn!("{error}: {details}");
                (
                    StatusCode::BAD_GATEWAY,
                    ErrorBody {
                        error,
                        details: Some(details),
                    },
                )
            }
            Self::InternalError { error, details } => {
                tracing::error!("{error}: {details}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        error,
                        details: Some(details),
                    },
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    pub fn not_found(error: impl Into<String>, details: impl fmt::Display) -> Self {
        Self::NotFound {
            error: error.into(),
            details: details.to_string(),
        }
    }

    pub fn upstream(error: impl Into<String>, details: impl fmt::Display) -> Self {
        Self::UpstreamError {
            error: error.into(),
            details: details.to_string(),
        }
    }

    pub fn internal(error: impl Into<String>, details: impl fmt::Display) -> Self {
        Self::InternalError {
            error: error.into(),
            details: details.to_string(),
        }
    }

    /// Maps a service failure onto a response, `error` being the generic message.
    ///
    /// Database failures keep their cause out of the response body.
    pub fn from_anime(error: &str, err: AnimeError) -> Self {
        match err {
            AnimeError::NotFound(what) => Self::not_found(error, format!("Not found: {what}")),
            AnimeError::Database(msg) => {
                tracing::error!("Database error: {msg}");
                Self::internal(error, "A database error occurred")
            }
            other => Self::internal(error, other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::ScrapeError;
    use http_body_util::BodyExt;

    async fn body_of(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn validation_errors_have_no_details() {
        let (status, body) = body_of(ApiError::validation("method parameter is required")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, serde_json::json!({"error": "method parameter is required"}));
    }

    #[tokio::test]
    async fn configuration_errors_surface_as_500() {
        let err = ApiError::from_anime(
            "Failed to fetch anime info",
            ScrapeError::Configuration("MAL_CLIENT_ID").into(),
        );
        let (status, body) = body_of(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Failed to fetch anime info");
        assert_eq!(body["details"], "Missing configuration: MAL_CLIENT_ID");
    }

    #[tokio::test]
    async fn database_details_are_hidden() {
        let err = ApiError::from_anime("x", AnimeError::Database("disk I/O error at /srv".into()));
        let (_, body) = body_of(err).await;
        assert_eq!(body["details"], "A database error occurred");
    }
}
