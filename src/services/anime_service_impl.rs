//! `SeaORM` implementation of the `AnimeService` trait.

use crate::clients::mal::{MalAnime, MalClient};
use crate::db::Store;
use crate::domain::MalId;
use crate::models::anime::{AnimeDocument, AnimeLinks, AnimePatch, BasicAnimeInfo, RelatedAnime};
use crate::models::episode::{EpisodeListing, EpisodeRecord};
use crate::services::anime_service::{AnimeError, AnimeService};
use crate::services::catalog::CatalogService;
use crate::services::direct_links::{DirectLinkSource, backfill};
use crate::services::reconcile::{ScrapedAnime, reconcile};
use futures::{StreamExt, stream};
use std::sync::Arc;
use tracing::{debug, info, warn};

const CURRENTLY_AIRING: &str = "currently_airing";

/// SeaORM-backed implementation of [`AnimeService`].
pub struct SeaOrmAnimeService {
    store: Store,
    mal: MalClient,
    catalog: Arc<CatalogService>,
    direct_links: Arc<dyn DirectLinkSource>,
    stale_hosts: Vec<String>,
    use_api_threshold: u32,
    concurrency: usize,
}

impl SeaOrmAnimeService {
    #[must_use]
    pub fn new(
        store: Store,
        mal: MalClient,
        catalog: Arc<CatalogService>,
        direct_links: Arc<dyn DirectLinkSource>,
        stale_hosts: Vec<String>,
        use_api_threshold: u32,
        concurrency: usize,
    ) -> Self {
        Self {
            store,
            mal,
            catalog,
            direct_links,
            stale_hosts,
            use_api_threshold,
            concurrency: concurrency.max(1),
        }
    }

    /// Related entries with media type and episode duration filled in.
    ///
    /// An entry whose detail lookup fails keeps its stub values.
    async fn enrich_related(&self, anime: &MalAnime) -> Vec<RelatedAnime> {
        stream::iter(anime.related_anime.iter().cloned())
            .map(|related| async move {
                let mut entry = related.to_stub();
                match self.mal.related_details(related.node.id).await {
                    Ok(details) => {
                        entry.anime.media_type = details
                            .media_type
                            .map(|t| t.to_uppercase())
                            .unwrap_or_default();
                        entry.anime.duration = details.average_episode_duration.unwrap_or(0);
                    }
                    Err(e) => {
                        debug!(related_id = related.node.id, "Related details unavailable: {e}");
                    }
                }
                entry
            })
            .buffered(self.concurrency)
            .collect()
            .await
    }

    async fn create(&self, id: MalId, anime: MalAnime) -> Result<AnimeDocument, AnimeError> {
        let session = match self.catalog.find_matching(id.value(), &anime.title).await {
            Ok(session) => session,
            Err(e) => {
                warn!(mal_id = %id, "Catalog search failed: {e}");
                None
            }
        };
        if session.is_none() {
            info!(mal_id = %id, title = %anime.title, "No catalog match, storing metadata only");
        }

        let mut metadata = anime.to_document(session.clone());
        metadata.related_anime = self.enrich_related(&anime).await;

        let episodes = match &session {
            Some(session) => match self.catalog.listing(session, self.use_api_threshold).await {
                Ok(listing) => Some(listing),
                Err(e) => {
                    warn!(session = %session, "Episode listing failed, serving episodes live: {e}");
                    Some(EpisodeListing::Live { total: 0 })
                }
            },
            None => None,
        };

        let result = reconcile(None, ScrapedAnime { metadata, episodes });
        self.store
            .insert_anime(&result.updated)
            .await
            .map_err(|e| AnimeError::database(&e))?;

        info!(
            mal_id = %id,
            use_api = result.updated.use_api,
            episodes = result.updated.current_episode_count,
            "Created catalog document"
        );
        Ok(result.updated)
    }

    async fn refresh(&self, existing: AnimeDocument, anime: MalAnime) -> Result<AnimeDocument, AnimeError> {
        let mut metadata = anime.to_document(existing.session.clone());
        metadata.related_anime = self.enrich_related(&anime).await;

        // Stored status, not the fresh one: the finale lands with the status flip.
        let relist = existing.session.as_deref().filter(|_| {
            existing.status == CURRENTLY_AIRING || existing.episodes.is_empty()
        });
        let episodes = match relist {
            Some(session) => match self.catalog.listing(session, self.use_api_threshold).await {
                Ok(listing) => Some(listing),
                Err(e) => {
                    warn!(session = %session, "Episode refresh failed, keeping stored episodes: {e}");
                    None
                }
            },
            None => None,
        };

        let result = reconcile(Some(&existing), ScrapedAnime { metadata, episodes });
        if result.patch.is_empty() {
            debug!(mal_id = existing.anime_id, "Catalog document unchanged");
            return Ok(result.updated);
        }

        self.store
            .update_anime(existing.anime_id, &result.patch)
            .await
            .map_err(|e| AnimeError::database(&e))?;
        info!(
            mal_id = existing.anime_id,
            fields = ?result.patch.changed_fields(),
            "Updated catalog document"
        );
        Ok(result.updated)
    }

    async fn locate_episode(
        &self,
        doc: &AnimeDocument,
        session: &str,
        episode_session: &str,
        episode_number: f64,
    ) -> Result<Option<EpisodeRecord>, AnimeError> {
        let pick = |episodes: &[EpisodeRecord]| {
            episodes
                .iter()
                .find(|e| e.session == episode_session)
                .or_else(|| {
                    episodes
                        .iter()
                        .find(|e| (e.episode - episode_number).abs() < f64::EPSILON)
                })
                .cloned()
        };

        if !doc.use_api {
            return Ok(pick(&doc.episodes));
        }

        let page = self.catalog.page_for_episode(episode_number);
        let listing = self.catalog.episode_page(session, page).await?;
        Ok(pick(&listing.episodes))
    }
}

#[async_trait::async_trait]
impl AnimeService for SeaOrmAnimeService {
    async fn anime_links(&self, session: &str, page: u32) -> Result<AnimeLinks, AnimeError> {
        Ok(self.catalog.anime_links(session, page).await?)
    }

    async fn anime_info(&self, id: MalId) -> Result<AnimeDocument, AnimeError> {
        let existing = self
            .store
            .find_anime_by_id(id.value())
            .await
            .map_err(|e| AnimeError::database(&e))?;

        let anime = match self.mal.anime(id.value()).await {
            Ok(anime) => anime,
            Err(e) => {
                return match existing {
                    Some(doc) => {
                        warn!(mal_id = %id, "Metadata refresh failed, serving stored document: {e}");
                        Ok(doc)
                    }
                    None if e.is_not_found() => Err(AnimeError::NotFound(id.to_string())),
                    None => Err(e.into()),
                };
            }
        };

        match existing {
            Some(doc) => self.refresh(doc, anime).await,
            None => self.create(id, anime).await,
        }
    }

    async fn basic_info(&self, session: &str) -> Result<BasicAnimeInfo, AnimeError> {
        let id = self
            .catalog
            .pahe()
            .cross_reference_id(session)
            .await?
            .ok_or_else(|| AnimeError::NotFound(session.to_string()))?;
        let anime = self.mal.basic(id).await?;
        Ok(anime.to_basic_info(session))
    }

    async fn episode_data(
        &self,
        session: &str,
        episode_session: &str,
        episode_number: f64,
    ) -> Result<EpisodeRecord, AnimeError> {
        let doc = self
            .store
            .find_anime_by_session(session)
            .await
            .map_err(|e| AnimeError::database(&e))?
            .ok_or_else(|| AnimeError::NotFound(session.to_string()))?;

        let episode = self
            .locate_episode(&doc, session, episode_session, episode_number)
            .await?
            .ok_or_else(|| AnimeError::NotFound(format!("{session}/{episode_session}")))?;

        let (episode, changed) =
            backfill(&self.direct_links, session, episode, &self.stale_hosts).await;

        if changed && !doc.use_api {
            let episodes: Vec<EpisodeRecord> = doc
                .episodes
                .iter()
                .map(|e| {
                    if e.session == episode.session {
                        episode.clone()
                    } else {
                        e.clone()
                    }
                })
                .collect();
            let patch = AnimePatch {
                episodes: Some(episodes),
                ..Default::default()
            };
            self.store
                .update_anime(doc.anime_id, &patch)
                .await
                .map_err(|e| AnimeError::database(&e))?;
            debug!(session = %session, episode = %episode.session, "Stored resolved direct links");
        }

        Ok(episode)
    }
}
