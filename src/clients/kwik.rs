//! Resolves redirector links to the direct media URL.
//!
//! Each attempt walks `Fetching -> Decoding -> TokenExtracted -> Posting`
//! and ends in `Resolved` or `Failed`. A failed attempt restarts from
//! `Fetching` until the retry budget is spent.

use crate::clients::pahe::record_upstream;
use crate::clients::{ScrapeError, ScrapeResult};
use crate::config::{PaheConfig, ResolverConfig};
use crate::models::episode::{KwikLink, PaheLink};
use crate::parser::label::parse_label;
use crate::parser::obfuscation::{extract_form, find_packed_payload};
use regex::Regex;
use reqwest::header::{COOKIE, LOCATION, REFERER};
use reqwest::{Client, redirect};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

const SERVICE: &str = "kwik";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveState {
    Fetching,
    Decoding,
    TokenExtracted,
    Posting,
    Resolved,
    Failed,
}

impl fmt::Display for ResolveState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Fetching => "fetching",
            Self::Decoding => "decoding",
            Self::TokenExtracted => "token_extracted",
            Self::Posting => "posting",
            Self::Resolved => "resolved",
            Self::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// Why a single attempt stopped, and in which state.
#[derive(Debug, Clone)]
pub struct AttemptFailure {
    pub state: ResolveState,
    pub reason: String,
}

impl AttemptFailure {
    fn at(state: ResolveState, reason: impl Into<String>) -> Self {
        Self {
            state,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.reason, self.state)
    }
}

/// Clones share one permit pool, so `resolver.max_concurrency` caps every
/// in-flight exchange with the redirector host, however callers fan out.
#[derive(Clone)]
pub struct KwikResolver {
    client: Client,
    permits: Arc<Semaphore>,
    retry_attempts: u32,
    preview_segment: String,
    direct_segment: String,
    referer: String,
    mirror_anchor: Regex,
    mirror_any: Regex,
}

impl KwikResolver {
    pub fn new(resolver: &ResolverConfig, pahe: &PaheConfig) -> ScrapeResult<Self> {
        let client = Client::builder()
            .redirect(redirect::Policy::none())
            .timeout(Duration::from_secs(pahe.request_timeout_seconds))
            .user_agent(pahe.user_agent.clone())
            .build()
            .map_err(|e| ScrapeError::request(SERVICE, e))?;

        let prefix = regex::escape(pahe.kwik_prefix.trim_end_matches('/'));
        let mirror_anchor = Regex::new(&format!(r#"(?i)href=["']({prefix}[^"']+)["']"#))
            .map_err(|_| ScrapeError::Configuration("pahe.kwik_prefix"))?;
        let mirror_any = Regex::new(&format!(r#"["']({prefix}/[^"']+)["']"#))
            .map_err(|_| ScrapeError::Configuration("pahe.kwik_prefix"))?;

        Ok(Self {
            client,
            permits: Arc::new(Semaphore::new(resolver.max_concurrency.max(1))),
            retry_attempts: resolver.retry_attempts.max(1),
            preview_segment: resolver.preview_segment.clone(),
            direct_segment: resolver.direct_segment.clone(),
            referer: format!("{}/", pahe.base_url.trim_end_matches('/')),
            mirror_anchor,
            mirror_any,
        })
    }

    /// Rewrites the preview path variant of a file URL to its direct variant.
    #[must_use]
    pub fn normalize_action(&self, action: &str) -> String {
        if self.preview_segment.is_empty() || !action.contains(&self.preview_segment) {
            return action.to_string();
        }
        action.replacen(&self.preview_segment, &self.direct_segment, 1)
    }

    /// Resolves a redirector link, retrying the whole exchange on failure.
    pub async fn resolve(&self, url: &str) -> ScrapeResult<String> {
        let mut last_failure = None;

        for attempt in 1..=self.retry_attempts {
            match self.attempt(url).await {
                Ok(location) => {
                    metrics::counter!("kwik_resolutions_total", "outcome" => "resolved")
                        .increment(1);
                    debug!(url = %url, attempt, state = %ResolveState::Resolved, "Redirector resolved");
                    return Ok(location);
                }
                Err(failure) => {
                    warn!(
                        url = %url,
                        attempt,
                        budget = self.retry_attempts,
                        state = %failure.state,
                        "Redirector attempt failed: {}",
                        failure.reason
                    );
                    last_failure = Some(failure);
                }
            }
        }

        metrics::counter!("kwik_resolutions_total", "outcome" => "failed").increment(1);
        let reason = last_failure.map_or_else(|| "no attempt made".to_string(), |f| f.to_string());
        debug!(url = %url, state = %ResolveState::Failed, "Giving up on redirector");
        Err(ScrapeError::parse(
            SERVICE,
            format!("gave up after {} attempts: {reason}", self.retry_attempts),
        ))
    }

    async fn attempt(&self, url: &str) -> Result<String, AttemptFailure> {
        use ResolveState::{Decoding, Fetching, Posting, TokenExtracted};

        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| AttemptFailure::at(Fetching, "resolver shut down"))?;

        let response = self
            .client
            .get(url)
            .header(REFERER, &self.referer)
            .send()
            .await
            .map_err(|e| AttemptFailure::at(Fetching, e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            record_upstream(SERVICE, "http_error");
            return Err(AttemptFailure::at(Fetching, format!("status {status}")));
        }
        record_upstream(SERVICE, "ok");

        let session_cookie = response
            .cookies()
            .map(|c| format!("{}={}", c.name(), c.value()))
            .collect::<Vec<_>>()
            .join("; ");
        let body = response
            .text()
            .await
            .map_err(|e| AttemptFailure::at(Fetching, e.without_url().to_string()))?;

        let payload = find_packed_payload(&body)
            .ok_or_else(|| AttemptFailure::at(Decoding, "packed payload not found"))?;
        let decoded = payload.decode();

        let form = extract_form(&decoded)
            .ok_or_else(|| AttemptFailure::at(TokenExtracted, "form action or token missing"))?;
        let action = self.normalize_action(&form.action);

        let mut request = self
            .client
            .post(&action)
            .header(REFERER, url)
            .form(&[("_token", form.token.as_str())]);
        if !session_cookie.is_empty() {
            request = request.header(COOKIE, session_cookie);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AttemptFailure::at(Posting, e.without_url().to_string()))?;

        if !response.status().is_redirection() {
            return Err(AttemptFailure::at(
                Posting,
                format!("expected redirect, got {}", response.status()),
            ));
        }

        response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .ok_or_else(|| AttemptFailure::at(Posting, "redirect without Location"))
    }

    /// Second hop for mirror links: finds the redirector behind a mirror page and resolves it.
    ///
    /// A redirector that cannot be resolved still yields a link, with `direct_url` unset.
    pub async fn resolve_mirror(&self, mirror: &PaheLink) -> ScrapeResult<KwikLink> {
        let html = self.fetch_mirror(mirror).await?;
        let redirector = self
            .find_mirror_target(&html)
            .ok_or_else(|| ScrapeError::parse("mirror", "no redirector link on mirror page"))?;

        let label = parse_label(&mirror.text);
        let mut link = KwikLink::new(redirector, mirror.text.clone());
        link.sub = label.sub;
        link.resolution = label.resolution;
        link.file_size = label.file_size;

        match self.resolve(&link.url).await {
            Ok(direct) => link.direct_url = Some(direct),
            Err(e) => info!(mirror = %mirror.url, "Mirror redirector left unresolved: {e}"),
        }

        Ok(link)
    }

    async fn fetch_mirror(&self, mirror: &PaheLink) -> ScrapeResult<String> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| ScrapeError::Configuration("resolver.max_concurrency"))?;

        let response = self
            .client
            .get(&mirror.url)
            .header(REFERER, &self.referer)
            .send()
            .await
            .map_err(|e| ScrapeError::request("mirror", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::UpstreamUnavailable {
                service: "mirror",
                status,
            });
        }

        response
            .text()
            .await
            .map_err(|e| ScrapeError::request("mirror", e))
    }

    fn find_mirror_target(&self, html: &str) -> Option<String> {
        self.mirror_anchor
            .captures(html)
            .or_else(|| self.mirror_any.captures(html))
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    }
}
