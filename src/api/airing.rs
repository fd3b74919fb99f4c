use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use super::validation::validate_page;
use super::{ApiError, AppState};

#[derive(Debug, Default, Deserialize)]
pub struct AiringQuery {
    pub page: Option<String>,
    pub refresh: Option<String>,
}

/// Recently aired episodes, each with a catalog summary.
///
/// # Endpoint
/// `GET /api/anime/pahe/airing?page=N&refresh=1`
///
/// Page 1 is cached; any `refresh` value bypasses and repopulates the cache.
pub async fn get_airing(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AiringQuery>,
) -> Result<Json<Value>, ApiError> {
    let page = validate_page(query.page.as_deref())?;
    let refresh = query.refresh.is_some();

    let feed = state
        .shared
        .airing
        .page(page, refresh)
        .await
        .map_err(|e| ApiError::upstream("Failed to fetch airing data", e))?;

    Ok(Json(feed))
}
