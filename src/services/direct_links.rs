use crate::clients::kwik::KwikResolver;
use crate::clients::workers::{WorkersClient, match_worker_link};
use crate::models::episode::{EpisodeRecord, KwikLink};
use futures::{StreamExt, stream};
use std::sync::Arc;
use tracing::{debug, warn};

/// Turns redirector links into direct media URLs.
///
/// The returned vector is parallel to `links`. `None` marks a link that could
/// not be resolved; a failure never affects sibling links.
#[async_trait::async_trait]
pub trait DirectLinkSource: Send + Sync {
    async fn resolve_links(
        &self,
        anime_session: &str,
        episode_session: &str,
        links: &[KwikLink],
    ) -> Vec<Option<String>>;
}

/// Resolves every link in-process through the redirector exchange.
pub struct LocalDirectLinks {
    resolver: KwikResolver,
    concurrency: usize,
}

impl LocalDirectLinks {
    #[must_use]
    pub fn new(resolver: KwikResolver, concurrency: usize) -> Self {
        Self {
            resolver,
            concurrency: concurrency.max(1),
        }
    }
}

#[async_trait::async_trait]
impl DirectLinkSource for LocalDirectLinks {
    async fn resolve_links(
        &self,
        _anime_session: &str,
        episode_session: &str,
        links: &[KwikLink],
    ) -> Vec<Option<String>> {
        stream::iter(links.iter().cloned())
            .map(|link| async move {
                match self.resolver.resolve(&link.url).await {
                    Ok(direct) => Some(direct),
                    Err(e) => {
                        debug!(episode = %episode_session, url = %link.url, "Direct link unavailable: {e}");
                        None
                    }
                }
            })
            .buffered(self.concurrency)
            .collect()
            .await
    }
}

/// Delegates resolution to the external worker services.
pub struct WorkerDirectLinks {
    workers: WorkersClient,
    concurrency: usize,
}

impl WorkerDirectLinks {
    #[must_use]
    pub fn new(workers: WorkersClient, concurrency: usize) -> Self {
        Self {
            workers,
            concurrency: concurrency.max(1),
        }
    }
}

#[async_trait::async_trait]
impl DirectLinkSource for WorkerDirectLinks {
    async fn resolve_links(
        &self,
        anime_session: &str,
        episode_session: &str,
        links: &[KwikLink],
    ) -> Vec<Option<String>> {
        let named = match self
            .workers
            .episode_links(anime_session, episode_session)
            .await
        {
            Ok(named) => named,
            Err(e) => {
                warn!(episode = %episode_session, "Worker link map unavailable: {e}");
                return vec![None; links.len()];
            }
        };

        let named = &named;
        stream::iter(links.iter().cloned())
            .map(|link| async move {
                let target =
                    match_worker_link(named, link.sub.as_deref(), link.resolution.as_deref())?;
                match self.workers.access_kwik(&target.link).await {
                    Ok(direct) => direct,
                    Err(e) => {
                        debug!(episode = %episode_session, name = %target.name, "Worker access failed: {e}");
                        None
                    }
                }
            })
            .buffered(self.concurrency)
            .collect()
            .await
    }
}

/// True when the link has no usable cached direct URL.
///
/// A cached URL on one of the `stale_hosts` counts as unusable.
#[must_use]
pub fn needs_resolution(link: &KwikLink, stale_hosts: &[String]) -> bool {
    match link.direct_url.as_deref() {
        None | Some("") => true,
        Some(direct) => {
            let host = url::Url::parse(direct)
                .ok()
                .and_then(|u| u.host_str().map(str::to_ascii_lowercase));
            host.is_some_and(|host| {
                stale_hosts
                    .iter()
                    .any(|stale| host == stale.to_ascii_lowercase())
            })
        }
    }
}

/// Fills in missing direct URLs on an episode's redirector links.
///
/// Returns the episode and whether any `direct_url` changed. A resolved URL
/// is never replaced by a failed one.
pub async fn backfill(
    source: &Arc<dyn DirectLinkSource>,
    anime_session: &str,
    mut episode: EpisodeRecord,
    stale_hosts: &[String],
) -> (EpisodeRecord, bool) {
    let pending: Vec<usize> = episode
        .links
        .kwik
        .iter()
        .enumerate()
        .filter(|(_, link)| needs_resolution(link, stale_hosts))
        .map(|(i, _)| i)
        .collect();

    if pending.is_empty() {
        return (episode, false);
    }

    let targets: Vec<KwikLink> = pending
        .iter()
        .map(|&i| episode.links.kwik[i].clone())
        .collect();
    let resolved = source
        .resolve_links(anime_session, &episode.session, &targets)
        .await;

    let mut changed = false;
    for (&i, direct) in pending.iter().zip(resolved) {
        let Some(direct) = direct.filter(|d| !d.is_empty()) else {
            continue;
        };
        let link = &mut episode.links.kwik[i];
        if link.direct_url.as_deref() != Some(direct.as_str()) {
            link.direct_url = Some(direct);
            changed = true;
        }
    }

    (episode, changed)
}
