use crate::clients::{ScrapeError, ScrapeResult};
use crate::config::PaheConfig;
use crate::constants::headers::{ACCEPT_API, ACCEPT_HTML, ACCEPT_LANGUAGE};
use crate::constants::paths::SNAPSHOT_PROXY_PREFIX;
use crate::parser::get_regex;
use crate::parser::links::{ExtractedLinks, LinkExtractor, PatternExtractor};
use regex::Regex;
use reqwest::Client;
use reqwest::header::{
    ACCEPT, ACCEPT_LANGUAGE as ACCEPT_LANGUAGE_HEADER, COOKIE, HeaderMap, HeaderValue, REFERER,
    USER_AGENT,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

const SERVICE: &str = "pahe";

/// One entry of the upstream episode listing, before links are attached.
#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseStub {
    pub episode: f64,
    #[serde(default)]
    pub duration: String,
    pub session: String,
    #[serde(default)]
    pub snapshot: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReleasePage {
    #[serde(default)]
    pub data: Vec<ReleaseStub>,
    #[serde(default = "first_page")]
    pub current_page: u32,
    #[serde(default = "first_page")]
    pub last_page: u32,
    #[serde(default)]
    pub total: u32,
}

const fn first_page() -> u32 {
    1
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchHit {
    pub session: String,
    pub title: String,
    #[serde(default)]
    pub episodes: Option<u32>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResults {
    #[serde(default)]
    pub data: Vec<SearchHit>,
}

/// An airing-feed entry. Fields other than the anime identity pass through untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiringEntry {
    pub anime_session: String,
    pub anime_title: String,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiringPage {
    #[serde(default)]
    pub data: Vec<AiringEntry>,
    #[serde(default)]
    pub total: Option<u32>,
    #[serde(default)]
    pub per_page: Option<u32>,
    #[serde(default)]
    pub current_page: Option<u32>,
    #[serde(default)]
    pub last_page: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct SnapshotImage {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Rewrites an upstream snapshot URL to the local snapshot proxy.
#[must_use]
pub fn proxied_snapshot_url(original: &str) -> String {
    match original.rsplit('/').next() {
        Some(name) if !name.is_empty() => format!("{SNAPSHOT_PROXY_PREFIX}{name}"),
        _ => original.to_string(),
    }
}

/// Pulls the metadata-provider id out of an anime page.
#[must_use]
pub fn parse_cross_reference_id(html: &str) -> Option<i64> {
    static RE: OnceLock<Regex> = OnceLock::new();
    get_regex(&RE, r#"<meta name="myanimelist" content="(\d+)">"#)
        .captures(html)?
        .get(1)?
        .as_str()
        .parse()
        .ok()
}

pub(crate) fn record_upstream(service: &'static str, outcome: &str) {
    metrics::counter!(
        "upstream_requests_total",
        "service" => service,
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

#[derive(Clone)]
pub struct PaheClient {
    client: Client,
    config: PaheConfig,
    extractor: Arc<dyn LinkExtractor>,
}

impl PaheClient {
    pub fn new(config: PaheConfig) -> ScrapeResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| ScrapeError::request(SERVICE, e))?;
        Self::with_shared_client(client, config)
    }

    pub fn with_shared_client(client: Client, config: PaheConfig) -> ScrapeResult<Self> {
        let extractor = PatternExtractor::new(&config.kwik_prefix, &config.mirror_prefix)
            .map_err(|_| ScrapeError::Configuration("pahe link prefixes"))?;
        Ok(Self::with_extractor(client, config, Arc::new(extractor)))
    }

    #[must_use]
    pub fn with_extractor(
        client: Client,
        config: PaheConfig,
        extractor: Arc<dyn LinkExtractor>,
    ) -> Self {
        Self {
            client,
            config,
            extractor,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &PaheConfig {
        &self.config
    }

    fn headers(&self, accept: &'static str, referer: Option<&str>, xhr: bool) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(accept));
        headers.insert(
            ACCEPT_LANGUAGE_HEADER,
            HeaderValue::from_static(ACCEPT_LANGUAGE),
        );
        if let Ok(ua) = HeaderValue::from_str(&self.config.user_agent) {
            headers.insert(USER_AGENT, ua);
        }
        if let Some(cookie) = self.config.cookie.as_deref() {
            match HeaderValue::from_str(cookie) {
                Ok(value) => {
                    headers.insert(COOKIE, value);
                }
                Err(_) => warn!("Configured pahe cookie is not a valid header value, skipping"),
            }
        }
        if let Some(referer) = referer.and_then(|r| HeaderValue::from_str(r).ok()) {
            headers.insert(REFERER, referer);
        }
        if xhr {
            headers.insert("X-Requested-With", HeaderValue::from_static("XMLHttpRequest"));
        }
        headers
    }

    fn api_url(&self, params: &[(&str, &str)]) -> ScrapeResult<Url> {
        let mut url = Url::parse(&self.config.api_url)
            .map_err(|_| ScrapeError::Configuration("pahe.api_url"))?;
        url.query_pairs_mut().extend_pairs(params);
        Ok(url)
    }

    fn anime_page_url(&self, session: &str) -> String {
        format!("{}/anime/{session}", self.config.base_url.trim_end_matches('/'))
    }

    async fn get_text(&self, url: &str, headers: HeaderMap) -> ScrapeResult<String> {
        let response = self
            .client
            .get(url)
            .headers(headers)
            .send()
            .await
            .map_err(|e| {
                record_upstream(SERVICE, "error");
                ScrapeError::request(SERVICE, e)
            })?;

        let status = response.status();
        if !status.is_success() {
            record_upstream(SERVICE, "http_error");
            return Err(ScrapeError::UpstreamUnavailable {
                service: SERVICE,
                status,
            });
        }

        record_upstream(SERVICE, "ok");
        response
            .text()
            .await
            .map_err(|e| ScrapeError::request(SERVICE, e))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: Url,
        referer: Option<&str>,
    ) -> ScrapeResult<T> {
        let body = self
            .get_text(url.as_str(), self.headers(ACCEPT_API, referer, true))
            .await?;
        serde_json::from_str(&body).map_err(|e| ScrapeError::parse(SERVICE, e.to_string()))
    }

    /// Fetches the anime page and reads its cross-reference id, if any.
    pub async fn cross_reference_id(&self, session: &str) -> ScrapeResult<Option<i64>> {
        let html = self
            .get_text(
                &self.anime_page_url(session),
                self.headers(ACCEPT_HTML, None, false),
            )
            .await?;
        let id = parse_cross_reference_id(&html);
        if id.is_none() {
            debug!(session = %session, "Anime page carries no cross-reference tag");
        }
        Ok(id)
    }

    pub async fn search(&self, title: &str) -> ScrapeResult<SearchResults> {
        let url = self.api_url(&[("m", "search"), ("q", title)])?;
        self.get_json(url, None).await
    }

    /// One page of the episode listing, sorted by ascending episode number.
    pub async fn release_page(&self, session: &str, page: u32) -> ScrapeResult<ReleasePage> {
        let page = page.to_string();
        let url = self.api_url(&[
            ("m", "release"),
            ("id", session),
            ("sort", "episode_asc"),
            ("page", &page),
        ])?;
        let referer = self.anime_page_url(session);
        self.get_json(url, Some(&referer)).await
    }

    /// Fetches an episode play page and extracts its links.
    pub async fn episode_links(
        &self,
        anime_session: &str,
        episode_session: &str,
    ) -> ScrapeResult<ExtractedLinks> {
        let url = format!(
            "{}/play/{anime_session}/{episode_session}",
            self.config.base_url.trim_end_matches('/')
        );
        let referer = self.anime_page_url(anime_session);
        let html = self
            .get_text(&url, self.headers(ACCEPT_HTML, Some(&referer), false))
            .await?;
        Ok(self.extractor.extract(&html))
    }

    pub async fn airing(&self, page: u32) -> ScrapeResult<AiringPage> {
        let page = page.to_string();
        let url = self.api_url(&[("m", "airing"), ("page", &page)])?;
        self.get_json(url, None).await
    }

    /// Tries every configured snapshot host in order and returns the first hit.
    pub async fn snapshot(&self, path: &str) -> ScrapeResult<SnapshotImage> {
        let referer = format!("{}/", self.config.base_url.trim_end_matches('/'));
        let mut last_status = None;

        for host in &self.config.snapshot_urls {
            let url = format!("{}/{}", host.trim_end_matches('/'), path.trim_start_matches('/'));
            let result = self
                .client
                .get(&url)
                .headers(self.headers(ACCEPT_HTML, Some(&referer), false))
                .send()
                .await;

            let response = match result {
                Ok(response) => response,
                Err(e) => {
                    debug!(host = %host, error = %e.without_url(), "Snapshot host unreachable");
                    continue;
                }
            };

            let status = response.status();
            if !status.is_success() {
                last_status = Some(status);
                continue;
            }

            let content_type = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("image/jpeg")
                .to_string();
            let bytes = response
                .bytes()
                .await
                .map_err(|e| ScrapeError::request(SERVICE, e))?;
            return Ok(SnapshotImage {
                bytes: bytes.to_vec(),
                content_type,
            });
        }

        Err(ScrapeError::UpstreamUnavailable {
            service: "snapshot",
            status: last_status.unwrap_or(reqwest::StatusCode::NOT_FOUND),
        })
    }
}
