use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::constants::headers::DEFAULT_USER_AGENT;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub pahe: PaheConfig,

    pub mal: MalConfig,

    pub resolver: ResolverConfig,

    pub workers: WorkersConfig,

    pub catalog: CatalogConfig,

    pub cache: CacheConfig,

    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub database_path: String,

    pub log_level: String,

    /// Emit logs as JSON lines instead of the human readable format.
    pub json_logs: bool,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    pub max_db_connections: u32,

    pub min_db_connections: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_path: "sqlite:data/pahe-relay.db".to_string(),
            log_level: "info".to_string(),
            json_logs: false,
            worker_threads: 2,
            max_db_connections: 5,
            min_db_connections: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,

    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 6790,
            cors_allowed_origins: vec!["https://meowani.vercel.app".to_string()],
        }
    }
}

/// Endpoints and request shaping for the scraped streaming site.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PaheConfig {
    pub base_url: String,

    pub api_url: String,

    /// Hosts tried in order by the snapshot proxy.
    pub snapshot_urls: Vec<String>,

    /// Prefix every redirector link starts with.
    pub kwik_prefix: String,

    /// Prefix every download mirror link starts with.
    pub mirror_prefix: String,

    /// Clearance cookie forwarded verbatim. Usually supplied via `PAHE_COOKIE`.
    #[serde(skip_serializing)]
    pub cookie: Option<String>,

    pub user_agent: String,

    pub request_timeout_seconds: u64,
}

impl Default for PaheConfig {
    fn default() -> Self {
        Self {
            base_url: "https://animepahe.si".to_string(),
            api_url: "https://animepahe.si/api".to_string(),
            snapshot_urls: vec![
                "https://i.animepahe.si/snapshots".to_string(),
                "https://i.animepahe.si/uploads/snapshots".to_string(),
            ],
            kwik_prefix: "https://kwik.cx".to_string(),
            mirror_prefix: "https://pahe.win".to_string(),
            cookie: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout_seconds: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MalConfig {
    pub base_url: String,

    /// Usually supplied via `MAL_CLIENT_ID`.
    #[serde(skip_serializing)]
    pub client_id: Option<String>,
}

impl Default for MalConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.myanimelist.net/v2/anime".to_string(),
            client_id: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolverMode {
    /// Decode and replay redirector pages in-process.
    #[default]
    Local,
    /// Delegate to the external worker services.
    Worker,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub mode: ResolverMode,

    /// Attempts per redirector link before giving up.
    pub retry_attempts: u32,

    /// Upper bound on concurrent upstream fetches within one fan-out.
    pub max_concurrency: usize,

    /// Path segment of the preview variant of a file URL.
    pub preview_segment: String,

    /// Path segment the preview variant is rewritten to.
    pub direct_segment: String,

    /// CDN hosts whose cached direct URLs expire quickly and are always re-resolved.
    pub stale_hosts: Vec<String>,

    /// Resolve direct URLs while listing episodes instead of on first episode read.
    pub resolve_on_listing: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            mode: ResolverMode::Local,
            retry_attempts: 3,
            max_concurrency: 8,
            preview_segment: "/f/".to_string(),
            direct_segment: "/d/".to_string(),
            stale_hosts: Vec::new(),
            resolve_on_listing: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkersConfig {
    pub episode_url: String,

    pub access_url: String,

    /// Usually supplied via `KWIK_ACCESS_TOKEN`.
    #[serde(skip_serializing)]
    pub access_token: Option<String>,
}

impl Default for WorkersConfig {
    fn default() -> Self {
        Self {
            episode_url: "https://anime.apex-cloud.workers.dev/".to_string(),
            access_url: "https://access-kwik.apex-cloud.workers.dev".to_string(),
            access_token: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Episodes per upstream listing page.
    pub page_size: u32,

    /// Above this many episodes the document switches to live listing.
    pub use_api_threshold: u32,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            page_size: 30,
            use_api_threshold: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub airing_ttl_seconds: u64,

    /// Keep cached responses in the database instead of process memory.
    pub persistent: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            airing_ttl_seconds: 5 * 60,
            persistent: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: true,
        }
    }
}

impl Config {
    /// Loads the first config file found and layers environment secrets on top.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut config = Self::default();
        for path in &Self::config_paths() {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                config = Self::load_from_path(path)?;
                break;
            }
        }

        config.apply_env();
        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    /// Overrides secrets and the database location from the process environment.
    pub fn apply_env(&mut self) {
        fn non_empty(key: &str) -> Option<String> {
            std::env::var(key).ok().filter(|v| !v.trim().is_empty())
        }

        if let Some(id) = non_empty("MAL_CLIENT_ID") {
            self.mal.client_id = Some(id);
        }
        if let Some(cookie) = non_empty("PAHE_COOKIE") {
            self.pahe.cookie = Some(cookie);
        }
        if let Some(token) = non_empty("KWIK_ACCESS_TOKEN") {
            self.workers.access_token = Some(token);
        }
        if let Some(url) = non_empty("PAHE_RELAY_DATABASE_URL") {
            self.general.database_path = url;
        }
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("pahe-relay").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".pahe-relay").join("config.toml"));
        }

        paths
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = PathBuf::from("config.toml");
        if path.exists() {
            Ok(false)
        } else {
            Self::default().save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.pahe.base_url.is_empty() || self.pahe.api_url.is_empty() {
            anyhow::bail!("pahe.base_url and pahe.api_url cannot be empty");
        }

        if self.mal.base_url.is_empty() {
            anyhow::bail!("mal.base_url cannot be empty");
        }

        if self.resolver.retry_attempts == 0 {
            anyhow::bail!("resolver.retry_attempts must be at least 1");
        }

        if self.resolver.max_concurrency == 0 {
            anyhow::bail!("resolver.max_concurrency must be at least 1");
        }

        if self.catalog.page_size == 0 {
            anyhow::bail!("catalog.page_size must be at least 1");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.resolver.retry_attempts, 3);
        assert_eq!(config.catalog.use_api_threshold, 30);
        assert_eq!(config.catalog.page_size, 30);
        assert_eq!(config.resolver.mode, ResolverMode::Local);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization_omits_secrets() {
        let mut config = Config::default();
        config.mal.client_id = Some("secret-client".to_string());
        config.pahe.cookie = Some("__ddg2=abc".to_string());

        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[resolver]"));
        assert!(toml_str.contains("[catalog]"));
        assert!(!toml_str.contains("secret-client"));
        assert!(!toml_str.contains("__ddg2"));
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
            [general]
            log_level = "debug"

            [resolver]
            mode = "worker"
            retry_attempts = 5
            stale_hosts = ["vault-99.example"]
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.resolver.mode, ResolverMode::Worker);
        assert_eq!(config.resolver.retry_attempts, 5);
        assert_eq!(config.resolver.stale_hosts, vec!["vault-99.example"]);
        assert_eq!(config.pahe.kwik_prefix, "https://kwik.cx");
    }

    #[test]
    fn test_validate_rejects_zero_retry_budget() {
        let mut config = Config::default();
        config.resolver.retry_attempts = 0;
        assert!(config.validate().is_err());
    }
}
