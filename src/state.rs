use std::sync::Arc;
use std::time::Duration;

use crate::clients::kwik::KwikResolver;
use crate::clients::mal::MalClient;
use crate::clients::pahe::PaheClient;
use crate::clients::workers::WorkersClient;
use crate::config::{Config, ResolverMode};
use crate::db::Store;
use crate::services::{
    AiringService, AnimeService, CatalogService, DirectLinkSource, LocalDirectLinks, MemoryCache,
    SeaOrmAnimeService, StoreCache, TtlCache, WorkerDirectLinks,
};

/// Build a shared HTTP client with reasonable defaults for API calls.
/// This client should be reused across all HTTP-based services to enable
/// connection pooling and avoid socket exhaustion.
fn build_shared_http_client(config: &Config) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.pahe.request_timeout_seconds))
        .user_agent(config.pahe.user_agent.clone())
        .pool_max_idle_per_host(10)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build shared HTTP client: {e}"))
}

/// Everything a request handler or CLI command needs, built once per process.
#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<Config>,

    pub store: Store,

    pub pahe: PaheClient,

    pub resolver: KwikResolver,

    pub catalog: Arc<CatalogService>,

    pub anime_service: Arc<dyn AnimeService>,

    pub airing: Arc<AiringService>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;
        Self::with_store(config, store)
    }

    /// Wires every service around an already opened store.
    pub fn with_store(config: Config, store: Store) -> anyhow::Result<Self> {
        let http_client = build_shared_http_client(&config)?;

        let pahe = PaheClient::with_shared_client(http_client.clone(), config.pahe.clone())?;
        let mal = MalClient::with_shared_client(
            http_client.clone(),
            &config.mal.base_url,
            config.mal.client_id.clone(),
        );
        let resolver = KwikResolver::new(&config.resolver, &config.pahe)?;
        let concurrency = config.resolver.max_concurrency;

        let direct_links: Arc<dyn DirectLinkSource> = match config.resolver.mode {
            ResolverMode::Local => Arc::new(LocalDirectLinks::new(resolver.clone(), concurrency)),
            ResolverMode::Worker => Arc::new(WorkerDirectLinks::new(
                WorkersClient::with_shared_client(http_client, config.workers.clone()),
                concurrency,
            )),
        };

        let mut catalog =
            CatalogService::new(pahe.clone(), concurrency, config.catalog.page_size);
        if config.resolver.resolve_on_listing {
            catalog =
                catalog.with_direct_links(direct_links.clone(), config.resolver.stale_hosts.clone());
        }
        let catalog = Arc::new(catalog);

        let anime_service = Arc::new(SeaOrmAnimeService::new(
            store.clone(),
            mal,
            catalog.clone(),
            direct_links,
            config.resolver.stale_hosts.clone(),
            config.catalog.use_api_threshold,
            concurrency,
        )) as Arc<dyn AnimeService>;

        let cache: Arc<dyn TtlCache> = if config.cache.persistent {
            Arc::new(StoreCache::new(store.clone()))
        } else {
            Arc::new(MemoryCache::new())
        };
        let airing = Arc::new(AiringService::new(
            pahe.clone(),
            anime_service.clone(),
            cache,
            Duration::from_secs(config.cache.airing_ttl_seconds),
            concurrency,
        ));

        Ok(Self {
            config: Arc::new(config),
            store,
            pahe,
            resolver,
            catalog,
            anime_service,
            airing,
        })
    }
}
