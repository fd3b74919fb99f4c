//! Time-boxed response caching behind a swappable trait.

use crate::db::Store;
use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::warn;

/// Key to `(value, expiry)` cache injected into services that memoize upstream reads.
///
/// Implementations swallow their own storage failures: a broken cache behaves
/// like an empty one.
#[async_trait::async_trait]
pub trait TtlCache: Send + Sync {
    async fn get(&self, key: &str) -> Option<Value>;

    async fn set(&self, key: &str, value: Value, ttl: Duration);

    async fn invalidate(&self, key: &str);
}

/// In-process cache. Entries vanish on restart.
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, (Value, Instant)>>,
}

impl MemoryCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl TtlCache for MemoryCache {
    async fn get(&self, key: &str) -> Option<Value> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some((value, expires_at)) if Instant::now() < *expires_at => {
                    return Some(value.clone());
                }
                None => return None,
                Some(_) => {}
            }
        }

        self.entries.write().await.remove(key);
        None
    }

    async fn set(&self, key: &str, value: Value, ttl: Duration) {
        let expires_at = Instant::now() + ttl;
        self.entries
            .write()
            .await
            .insert(key.to_string(), (value, expires_at));
    }

    async fn invalidate(&self, key: &str) {
        self.entries.write().await.remove(key);
    }
}

/// Cache persisted in the `response_cache` table, shared across restarts.
pub struct StoreCache {
    store: Store,
}

impl StoreCache {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl TtlCache for StoreCache {
    async fn get(&self, key: &str) -> Option<Value> {
        match self.store.get_cached_response(key).await {
            Ok(Some(raw)) => serde_json::from_str(&raw).ok(),
            Ok(None) => None,
            Err(e) => {
                warn!(key = %key, "Cache read failed: {e:#}");
                None
            }
        }
    }

    async fn set(&self, key: &str, value: Value, ttl: Duration) {
        let raw = value.to_string();
        if let Err(e) = self.store.cache_response(key, &raw, ttl).await {
            warn!(key = %key, "Cache write failed: {e:#}");
        }
    }

    async fn invalidate(&self, key: &str) {
        if let Err(e) = self.store.invalidate_cached_response(key).await {
            warn!(key = %key, "Cache invalidation failed: {e:#}");
        }
    }
}
