use crate::clients::ScrapeError;
use crate::clients::pahe::{AiringEntry, PaheClient};
use crate::constants::cache::AIRING_FIRST_PAGE_KEY;
use crate::models::anime::BasicAnimeInfo;
use crate::services::anime_service::AnimeService;
use crate::services::cache::TtlCache;
use futures::{StreamExt, stream};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, Serialize)]
pub struct AiringItem {
    #[serde(flatten)]
    pub entry: AiringEntry,
    pub anime_info: BasicAnimeInfo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiringPagination {
    pub total: u32,
    pub per_page: u32,
    pub current_page: u32,
    pub last_page: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct AiringFeed {
    pub data: Vec<AiringItem>,
    pub pagination: AiringPagination,
}

/// The recently-aired feed, each entry enriched with its catalog summary.
pub struct AiringService {
    pahe: PaheClient,
    anime: Arc<dyn AnimeService>,
    cache: Arc<dyn TtlCache>,
    ttl: Duration,
    concurrency: usize,
}

impl AiringService {
    #[must_use]
    pub fn new(
        pahe: PaheClient,
        anime: Arc<dyn AnimeService>,
        cache: Arc<dyn TtlCache>,
        ttl: Duration,
        concurrency: usize,
    ) -> Self {
        Self {
            pahe,
            anime,
            cache,
            ttl,
            concurrency: concurrency.max(1),
        }
    }

    async fn enrich(&self, entry: AiringEntry) -> AiringItem {
        let anime_info = match self.anime.basic_info(&entry.anime_session).await {
            Ok(info) => info,
            Err(e) => {
                debug!(session = %entry.anime_session, "Using placeholder summary: {e}");
                BasicAnimeInfo::placeholder(&entry.anime_session, &entry.anime_title)
            }
        };
        AiringItem { entry, anime_info }
    }

    /// One page of the feed. The first page is served from cache unless
    /// `refresh` is set.
    ///
    /// # Errors
    ///
    /// Fails when the upstream feed cannot be fetched.
    pub async fn page(&self, page: u32, refresh: bool) -> Result<Value, ScrapeError> {
        let cacheable = page == 1;
        if cacheable && !refresh {
            if let Some(cached) = self.cache.get(AIRING_FIRST_PAGE_KEY).await {
                debug!("Serving airing feed from cache");
                return Ok(cached);
            }
        }

        let upstream = self.pahe.airing(page).await?;
        if upstream.data.is_empty() {
            warn!(page, "Upstream airing feed is empty");
            return Ok(Value::Array(Vec::new()));
        }

        let data: Vec<AiringItem> = stream::iter(upstream.data)
            .map(|entry| self.enrich(entry))
            .buffered(self.concurrency)
            .collect()
            .await;

        let current_page = upstream.current_page.unwrap_or(page);
        let feed = AiringFeed {
            pagination: AiringPagination {
                total: upstream
                    .total
                    .unwrap_or_else(|| u32::try_from(data.len()).unwrap_or(u32::MAX)),
                per_page: upstream.per_page.unwrap_or(0),
                current_page,
                last_page: upstream.last_page.unwrap_or(current_page),
            },
            data,
        };

        let value = serde_json::to_value(&feed)
            .map_err(|e| ScrapeError::parse("airing", e.to_string()))?;

        if cacheable {
            self.cache
                .set(AIRING_FIRST_PAGE_KEY, value.clone(), self.ttl)
                .await;
        }

        Ok(value)
    }
}

