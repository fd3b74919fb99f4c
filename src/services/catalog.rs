//! Episode listing aggregation over the scrape target.
//!
//! Walks the paginated release API, fans each episode out to link
//! extraction (and, when configured, direct-link resolution) and stitches the
//! results back together ordered by episode number.

use crate::clients::ScrapeError;
use crate::clients::pahe::{PaheClient, ReleasePage, ReleaseStub, proxied_snapshot_url};
use crate::models::anime::AnimeLinks;
use crate::models::episode::{EpisodeLinks, EpisodeListing, EpisodePage, EpisodeRecord, Pagination};
use crate::services::direct_links::{DirectLinkSource, backfill};
use futures::{StreamExt, stream};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct CatalogService {
    pahe: PaheClient,
    direct_links: Option<Arc<dyn DirectLinkSource>>,
    stale_hosts: Vec<String>,
    concurrency: usize,
    page_size: u32,
}

impl CatalogService {
    #[must_use]
    pub fn new(pahe: PaheClient, concurrency: usize, page_size: u32) -> Self {
        Self {
            pahe,
            direct_links: None,
            stale_hosts: Vec::new(),
            concurrency: concurrency.max(1),
            page_size: page_size.max(1),
        }
    }

    /// Resolves direct URLs for every listed episode using `source`.
    #[must_use]
    pub fn with_direct_links(
        mut self,
        source: Arc<dyn DirectLinkSource>,
        stale_hosts: Vec<String>,
    ) -> Self {
        self.direct_links = Some(source);
        self.stale_hosts = stale_hosts;
        self
    }

    #[must_use]
    pub const fn pahe(&self) -> &PaheClient {
        &self.pahe
    }

    /// Listing page that holds the given episode number.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn page_for_episode(&self, episode_number: f64) -> u32 {
        let page = (episode_number / f64::from(self.page_size)).ceil();
        if page.is_finite() && page >= 1.0 {
            page as u32
        } else {
            1
        }
    }

    async fn assemble_episode(&self, anime_session: &str, stub: ReleaseStub) -> EpisodeRecord {
        let links = match self.pahe.episode_links(anime_session, &stub.session).await {
            Ok(extracted) => EpisodeLinks {
                kwik: extracted.kwik,
                pahe: extracted.pahe,
            },
            Err(e) => {
                warn!(
                    session = %anime_session,
                    episode = stub.episode,
                    "Episode links unavailable, returning empty stub: {e}"
                );
                EpisodeLinks::default()
            }
        };

        let record = EpisodeRecord {
            episode: stub.episode,
            duration: stub.duration,
            session: stub.session,
            snapshot: proxied_snapshot_url(&stub.snapshot),
            links,
        };

        match &self.direct_links {
            Some(source) => backfill(source, anime_session, record, &self.stale_hosts).await.0,
            None => record,
        }
    }

    async fn assemble_page(
        &self,
        anime_session: &str,
        page: u32,
        release: ReleasePage,
    ) -> EpisodePage {
        let mut episodes: Vec<EpisodeRecord> = stream::iter(release.data)
            .map(|stub| self.assemble_episode(anime_session, stub))
            .buffered(self.concurrency)
            .collect()
            .await;
        episodes.sort_by(|a, b| a.episode.total_cmp(&b.episode));

        EpisodePage {
            pagination: Pagination {
                current_page: page,
                last_page: release.last_page,
                total: release.total,
                has_next: release.current_page < release.last_page,
                has_prev: page > 1,
            },
            episodes,
        }
    }

    /// One page of episodes with their links.
    ///
    /// # Errors
    ///
    /// Fails only when the listing page itself cannot be fetched; individual
    /// episodes degrade to empty links.
    pub async fn episode_page(
        &self,
        anime_session: &str,
        page: u32,
    ) -> Result<EpisodePage, ScrapeError> {
        let release = self.pahe.release_page(anime_session, page).await?;
        Ok(self.assemble_page(anime_session, page, release).await)
    }

    async fn collect_from(
        &self,
        anime_session: &str,
        first: ReleasePage,
    ) -> Result<Vec<EpisodeRecord>, ScrapeError> {
        let last_page = first.last_page;
        let mut episodes = self.assemble_page(anime_session, 1, first).await.episodes;

        for page in 2..=last_page {
            debug!(session = %anime_session, page, last_page, "Fetching listing page");
            episodes.extend(self.episode_page(anime_session, page).await?.episodes);
        }

        let mut seen = HashSet::new();
        episodes.retain(|e| seen.insert(e.session.clone()));
        Ok(episodes)
    }

    /// Every episode across all listing pages, without duplicate sessions.
    ///
    /// # Errors
    ///
    /// Fails when any listing page cannot be fetched.
    pub async fn all_episodes(&self, anime_session: &str) -> Result<Vec<EpisodeRecord>, ScrapeError> {
        let first = self.pahe.release_page(anime_session, 1).await?;
        self.collect_from(anime_session, first).await
    }

    /// Decides how a catalog entry keeps its episodes.
    ///
    /// Above `threshold` total episodes only the count is returned; the
    /// episodes themselves are resolved live on each read.
    ///
    /// # Errors
    ///
    /// Fails when the listing cannot be fetched.
    pub async fn listing(
        &self,
        anime_session: &str,
        threshold: u32,
    ) -> Result<EpisodeListing, ScrapeError> {
        let first = self.pahe.release_page(anime_session, 1).await?;
        if first.total > threshold {
            info!(
                session = %anime_session,
                total = first.total,
                threshold,
                "Episode count above threshold, serving episodes live"
            );
            return Ok(EpisodeListing::Live { total: first.total });
        }

        Ok(EpisodeListing::Stored(
            self.collect_from(anime_session, first).await?,
        ))
    }

    /// Cross-reference id plus one page of episodes.
    ///
    /// # Errors
    ///
    /// [`ScrapeError::CrossReferenceMissing`] when the anime page carries no id.
    pub async fn anime_links(&self, anime_session: &str, page: u32) -> Result<AnimeLinks, ScrapeError> {
        let (cross_ref, episodes) = tokio::join!(
            self.pahe.cross_reference_id(anime_session),
            self.episode_page(anime_session, page)
        );

        let mal_id =
            cross_ref?.ok_or_else(|| ScrapeError::CrossReferenceMissing(anime_session.to_string()))?;

        Ok(AnimeLinks {
            mal_id: mal_id.to_string(),
            page: episodes?,
        })
    }

    /// Searches the scrape target for `title` and returns the first hit whose
    /// anime page points back at `mal_id`.
    ///
    /// # Errors
    ///
    /// Fails when the search itself fails; unreachable candidates are skipped.
    pub async fn find_matching(&self, mal_id: i64, title: &str) -> Result<Option<String>, ScrapeError> {
        let results = self.pahe.search(title).await?;

        for hit in results.data {
            match self.pahe.cross_reference_id(&hit.session).await {
                Ok(Some(id)) if id == mal_id => {
                    debug!(mal_id, session = %hit.session, "Matched catalog entry");
                    return Ok(Some(hit.session));
                }
                Ok(_) => {}
                Err(e) => debug!(session = %hit.session, "Skipping candidate: {e}"),
            }
        }

        Ok(None)
    }
}
