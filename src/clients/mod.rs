pub mod kwik;
pub mod mal;
pub mod pahe;
pub mod workers;

use reqwest::StatusCode;
use thiserror::Error;

/// Failures talking to one of the scraped or third-party services.
///
/// Messages never include cookie or token values.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("{service} responded with {status}")]
    UpstreamUnavailable {
        service: &'static str,
        status: StatusCode,
    },

    #[error("{service} request failed: {message}")]
    Request {
        service: &'static str,
        message: String,
    },

    #[error("Unexpected {service} response: {message}")]
    Parse {
        service: &'static str,
        message: String,
    },

    #[error("No cross-reference id on anime page {0}")]
    CrossReferenceMissing(String),

    #[error("Missing configuration: {0}")]
    Configuration(&'static str),
}

impl ScrapeError {
    pub(crate) fn request(service: &'static str, err: reqwest::Error) -> Self {
        // reqwest errors embed the URL, which can carry query secrets; keep the kind only.
        let message = if err.is_timeout() {
            "timed out".to_string()
        } else if err.is_connect() {
            "connection failed".to_string()
        } else if err.is_decode() {
            "invalid response body".to_string()
        } else {
            err.without_url().to_string()
        };
        Self::Request { service, message }
    }

    pub(crate) fn parse(service: &'static str, message: impl Into<String>) -> Self {
        Self::Parse {
            service,
            message: message.into(),
        }
    }

    /// True when the upstream answered 404.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::UpstreamUnavailable { status, .. } if *status == StatusCode::NOT_FOUND
        )
    }
}

pub type ScrapeResult<T> = Result<T, ScrapeError>;
