use super::ApiError;
use crate::domain::MalId;

/// Parses an optional 1-based page number; absent means page 1.
pub fn validate_page(page: Option<&str>) -> Result<u32, ApiError> {
    let Some(raw) = page.map(str::trim).filter(|p| !p.is_empty()) else {
        return Ok(1);
    };
    match raw.parse::<u32>() {
        Ok(page) if page >= 1 => Ok(page),
        _ => Err(ApiError::validation("Invalid page number")),
    }
}

pub fn require<'a>(value: Option<&'a str>, name: &str) -> Result<&'a str, ApiError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::validation(format!("{name} parameter is required")))
}

pub fn validate_mal_id(id: &str) -> Result<MalId, ApiError> {
    id.parse()
        .map_err(|_| ApiError::validation(format!("Invalid anime ID: {id}. ID must be a positive integer")))
}

pub fn validate_episode_number(episode: &str) -> Result<f64, ApiError> {
    match episode.trim().parse::<f64>() {
        Ok(n) if n.is_finite() && n > 0.0 => Ok(n),
        _ => Err(ApiError::validation(format!(
            "Invalid episode number: {episode}. Episode must be a positive number"
        ))),
    }
}
