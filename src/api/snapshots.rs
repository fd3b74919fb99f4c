use axum::{
    body::Body,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use super::AppState;
use crate::clients::ScrapeError;
use crate::constants::cache::SNAPSHOT_MAX_AGE;

/// Proxies an episode thumbnail from the first snapshot host that has it.
///
/// # Endpoint
/// `GET /api/anime/pahe/snapshots/{*path}`
pub async fn get_snapshot(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
) -> Response {
    if path.split('/').any(|segment| segment == "..") {
        return (StatusCode::BAD_REQUEST, "Invalid snapshot path").into_response();
    }

    match state.shared.pahe.snapshot(&path).await {
        Ok(image) => (
            [
                (header::CONTENT_TYPE, image.content_type),
                (header::CACHE_CONTROL, SNAPSHOT_MAX_AGE.to_string()),
            ],
            Body::from(image.bytes),
        )
            .into_response(),
        Err(ScrapeError::UpstreamUnavailable { status, .. }) => {
            let status = StatusCode::from_u16(status.as_u16()).unwrap_or(StatusCode::NOT_FOUND);
            (status, "Image not found").into_response()
        }
        Err(e) => {
            tracing::error!(path = %path, "Snapshot proxy failed: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
    }
}
