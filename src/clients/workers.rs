use crate::clients::pahe::record_upstream;
use crate::clients::{ScrapeError, ScrapeResult};
use crate::config::WorkersConfig;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use url::Url;

const SERVICE: &str = "workers";

/// A named download link published by the episode worker.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WorkerLink {
    pub name: String,
    pub link: String,
}

#[derive(Debug, Deserialize)]
struct AccessResponse {
    #[serde(default)]
    status: bool,
    content: Option<AccessContent>,
}

#[derive(Debug, Deserialize)]
struct AccessContent {
    url: Option<String>,
}

#[derive(Debug, Serialize)]
struct AccessRequest<'a> {
    service: &'static str,
    action: &'static str,
    content: serde_json::Value,
    auth: &'a str,
}

/// Client for the external helper services that map episodes to named
/// links and exchange a link for its direct URL.
#[derive(Clone)]
pub struct WorkersClient {
    client: Client,
    config: WorkersConfig,
}

impl WorkersClient {
    #[must_use]
    pub const fn with_shared_client(client: Client, config: WorkersConfig) -> Self {
        Self { client, config }
    }

    pub async fn episode_links(
        &self,
        anime_session: &str,
        episode_session: &str,
    ) -> ScrapeResult<Vec<WorkerLink>> {
        let mut url = Url::parse(&self.config.episode_url)
            .map_err(|_| ScrapeError::Configuration("workers.episode_url"))?;
        url.query_pairs_mut()
            .append_pair("method", "episode")
            .append_pair("session", anime_session)
            .append_pair("ep", episode_session);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ScrapeError::request(SERVICE, e))?;

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
            .json()
            .await
            .map_err(|e| ScrapeError::request(SERVICE, e))
    }

    /// Exchanges a named link for a direct URL. `Ok(None)` when the worker declines.
    pub async fn access_kwik(&self, link: &str) -> ScrapeResult<Option<String>> {
        let token = self
            .config
            .access_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or(ScrapeError::Configuration("KWIK_ACCESS_TOKEN"))?;

        let body = AccessRequest {
            service: "kwik",
            action: "fetch",
            content: json!({ "kwik": link }),
            auth: token,
        };

        let response = self
            .client
            .post(&self.config.access_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ScrapeError::request(SERVICE, e))?;

        let status = response.status();
        if !status.is_success() {
            record_upstream(SERVICE, "http_error");
            return Err(ScrapeError::UpstreamUnavailable {
                service: SERVICE,
                status,
            });
        }

        record_upstream(SERVICE, "ok");
        let parsed: AccessResponse = response
            .json()
            .await
            .map_err(|e| ScrapeError::request(SERVICE, e))?;

        Ok(parsed
            .status
            .then_some(parsed.content)
            .flatten()
            .and_then(|c| c.url)
            .filter(|u| !u.is_empty()))
    }
}

/// Picks the worker link for a redirector by subtitle group and resolution.
///
/// The worker names links like `"SubsPlease 1080"`; the resolution is
/// matched without its trailing `p`.
#[must_use]
pub fn match_worker_link<'a>(
    links: &'a [WorkerLink],
    sub: Option<&str>,
    resolution: Option<&str>,
) -> Option<&'a WorkerLink> {
    let sub = sub.filter(|s| !s.is_empty())?.to_lowercase();
    let resolution = resolution
        .filter(|r| !r.is_empty())?
        .trim_end_matches(['p', 'P'])
        .to_lowercase();

    links.iter().find(|l| {
        let name = l.name.to_lowercase();
        name.contains(&sub) && name.contains(&resolution)
    })
}
