use crate::models::anime::{AnimeDocument, AnimePatch};
use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub mod migrator;
pub mod repositories;

/// Handle to the document store. Cheap to clone; every clone shares one pool.
#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        let path_str = db_url.trim_start_matches("sqlite://").trim_start_matches("sqlite:");
        let path_str = path_str.split('?').next().unwrap_or(path_str);
        if !path_str.is_empty() && !path_str.starts_with(":memory:") {
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn anime_repo(&self) -> repositories::anime::AnimeRepository {
        repositories::anime::AnimeRepository::new(self.conn.clone())
    }

    fn cache_repo(&self) -> repositories::cache::CacheRepository {
        repositories::cache::CacheRepository::new(self.conn.clone())
    }

    pub async fn find_anime_by_id(&self, anime_id: i64) -> Result<Option<AnimeDocument>> {
        self.anime_repo().find_by_id(anime_id).await
    }

    pub async fn find_anime_by_session(&self, session: &str) -> Result<Option<AnimeDocument>> {
        self.anime_repo().find_by_session(session).await
    }

    pub async fn insert_anime(&self, doc: &AnimeDocument) -> Result<()> {
        self.anime_repo().insert(doc).await
    }

    /// Single-document partial update; only fields set on `patch` are written.
    pub async fn update_anime(&self, anime_id: i64, patch: &AnimePatch) -> Result<bool> {
        self.anime_repo().update(anime_id, patch).await
    }

    pub async fn get_cached_response(&self, key: &str) -> Result<Option<String>> {
        self.cache_repo().get(key).await
    }

    pub async fn cache_response(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let ttl = chrono::Duration::from_std(ttl)?;
        self.cache_repo().set(key, value, ttl).await
    }

    pub async fn invalidate_cached_response(&self, key: &str) -> Result<()> {
        self.cache_repo().delete(key).await
    }

    pub async fn purge_expired_responses(&self) -> Result<u64> {
        self.cache_repo().purge_expired().await
    }
}
