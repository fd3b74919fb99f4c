//! Catalog read endpoint.
//!
//! # Endpoint
//! `GET /api/anime/pahe/links?method=<links|info|mal_id|episode_data>`
//!
//! | method         | parameters                                   |
//! |----------------|----------------------------------------------|
//! | `links`        | `session`, optional `page`                   |
//! | `info`         | `id` (metadata-provider id)                  |
//! | `mal_id`       | `session`                                    |
//! | `episode_data` | `session`, `episode_session` (or `ep`), `episode` |

use axum::{
    Json,
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use super::validation::{require, validate_episode_number, validate_mal_id, validate_page};
use super::{ApiError, AppState};

#[derive(Debug, Default, Deserialize)]
pub struct PaheQuery {
    pub method: Option<String>,
    pub session: Option<String>,
    pub page: Option<String>,
    pub id: Option<String>,
    #[serde(alias = "ep")]
    pub episode_session: Option<String>,
    pub episode: Option<String>,
}

pub async fn get_pahe(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PaheQuery>,
) -> Result<Response, ApiError> {
    let method = require(query.method.as_deref(), "method")?;
    let service = &state.shared.anime_service;

    match method {
        "links" => {
            let session = query
                .session
                .as_deref()
                .filter(|s| !s.trim().is_empty())
                .ok_or_else(|| ApiError::validation("Invalid method or missing session"))?;
            let page = validate_page(query.page.as_deref())?;

            let links = service
                .anime_links(session.trim(), page)
                .await
                .map_err(|e| ApiError::from_anime("Failed to scrape links", e))?;
            Ok(Json(links).into_response())
        }
        "info" => {
            let id = validate_mal_id(require(query.id.as_deref(), "id")?)?;
            let doc = service
                .anime_info(id)
                .await
                .map_err(|e| ApiError::from_anime("Failed to fetch anime info", e))?;
            Ok(Json(doc).into_response())
        }
        "mal_id" => {
            let session = require(query.session.as_deref(), "session")?;
            let info = service
                .basic_info(session)
                .await
                .map_err(|e| ApiError::not_found("Anime not found", e))?;
            Ok(Json(json!({ "data": info })).into_response())
        }
        "episode_data" => {
            let session = require(query.session.as_deref(), "session")?;
            let episode_session = require(query.episode_session.as_deref(), "episode_session")?;
            let number = validate_episode_number(require(query.episode.as_deref(), "episode")?)?;

            let episode = service
                .episode_data(session, episode_session, number)
                .await
                .map_err(|e| ApiError::from_anime("Failed to fetch episode data", e))?;
            Ok(Json(episode).into_response())
        }
        _ => Err(ApiError::validation("Invalid method or missing session")),
    }
}
