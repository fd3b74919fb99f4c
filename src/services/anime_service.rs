//! Domain service for catalog reads.
//!
//! Every read may refresh the stored document as a side effect: metadata is
//! reconciled against the provider, episodes are re-listed when stale, and
//! direct URLs are backfilled on demand.

use crate::clients::ScrapeError;
use crate::domain::MalId;
use crate::models::anime::{AnimeDocument, AnimeLinks, BasicAnimeInfo};
use crate::models::episode::EpisodeRecord;
use thiserror::Error;

/// Domain errors for catalog operations.
#[derive(Debug, Error)]
pub enum AnimeError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Scrape(ScrapeError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Missing configuration: {0}")]
    Configuration(String),
}

impl From<ScrapeError> for AnimeError {
    fn from(err: ScrapeError) -> Self {
        match err {
            ScrapeError::Configuration(key) => Self::Configuration(key.to_string()),
            other => Self::Scrape(other),
        }
    }
}

impl From<sea_orm::DbErr> for AnimeError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl AnimeError {
    pub(crate) fn database(err: &anyhow::Error) -> Self {
        Self::Database(format!("{err:#}"))
    }
}

/// Domain service trait for catalog reads.
///
/// Handlers and the CLI talk to this trait only, so the scraping and
/// persistence layers can be replaced in tests.
///
/// # Examples
///
/// ```rust,ignore
/// use pahe_relay::domain::MalId;
/// use pahe_relay::services::{AnimeError, AnimeService};
/// use std::sync::Arc;
///
/// async fn example(service: Arc<dyn AnimeService>) -> Result<(), AnimeError> {
///     let doc = service.anime_info(MalId::new(52991)).await?;
///     println!("{} has {} episodes", doc.title, doc.current_episode_count);
///     Ok(())
/// }
/// ```
#[async_trait::async_trait]
pub trait AnimeService: Send + Sync {
    /// Cross-reference id plus one page of episodes with their links.
    ///
    /// Nothing is persisted.
    ///
    /// # Errors
    ///
    /// - Returns [`AnimeError::Scrape`] when the listing cannot be fetched or
    ///   the anime page has no cross-reference id
    async fn anime_links(&self, session: &str, page: u32) -> Result<AnimeLinks, AnimeError>;

    /// Full catalog document for a provider id, created or reconciled on the way.
    ///
    /// When the provider is unreachable but a stored document exists, the
    /// stored document is returned unchanged.
    ///
    /// # Errors
    ///
    /// - Returns [`AnimeError::Configuration`] if no provider client id is set
    ///   and nothing is stored yet
    /// - Returns [`AnimeError::Scrape`] if the provider fails and nothing is stored
    /// - Returns [`AnimeError::Database`] on store failures
    async fn anime_info(&self, id: MalId) -> Result<AnimeDocument, AnimeError>;

    /// Compact summary for a scrape-target session.
    ///
    /// # Errors
    ///
    /// - Returns [`AnimeError::Scrape`] when the cross-reference lookup or the
    ///   provider fetch fails
    /// - Returns [`AnimeError::Configuration`] if no provider client id is set
    async fn basic_info(&self, session: &str) -> Result<BasicAnimeInfo, AnimeError>;

    /// One episode with direct URLs backfilled.
    ///
    /// Persists the episode list when a direct URL changed on a document that
    /// stores its episodes inline.
    ///
    /// # Errors
    ///
    /// - Returns [`AnimeError::NotFound`] if no document has this session or
    ///   the episode is not part of it
    /// - Returns [`AnimeError::Scrape`] when a live listing page cannot be fetched
    /// - Returns [`AnimeError::Database`] on store failures
    async fn episode_data(
        &self,
        session: &str,
        episode_session: &str,
        episode_number: f64,
    ) -> Result<EpisodeRecord, AnimeError>;
}
