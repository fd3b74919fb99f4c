use axum::Json;
use serde::{Deserialize, Serialize};

use super::ApiError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodeRequest {
    pub encoded_text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodeResponse {
    pub decoded_text: String,
}

/// Percent-decodes a string.
///
/// # Endpoint
/// `POST /api/decode-url` with `{"encodedText": "..."}`
pub async fn decode_url(Json(body): Json<DecodeRequest>) -> Result<Json<DecodeResponse>, ApiError> {
    let encoded = body
        .encoded_text
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::validation("Encoded text is required"))?;

    let decoded = urlencoding::decode(&encoded)
        .map_err(|e| ApiError::internal("Failed to decode text", e))?;

    Ok(Json(DecodeResponse {
        decoded_text: decoded.into_owned(),
    }))
}
