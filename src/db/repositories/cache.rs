use crate::entities::{prelude::*, response_cache};
use anyhow::Result;
use chrono::SecondsFormat;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

fn timestamp(at: chrono::DateTime<chrono::Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub struct CacheRepository {
    conn: DatabaseConnection,
}

impl CacheRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Returns the raw JSON stored under `key` if it has not expired.
    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let now = timestamp(chrono::Utc::now());

        let entry = ResponseCache::find_by_id(key.to_string())
            .filter(response_cache::Column::ExpiresAt.gt(now))
            .one(&self.conn)
            .await?;

        Ok(entry.map(|e| e.value))
    }

    pub async fn set(&self, key: &str, value: &str, ttl: chrono::Duration) -> Result<()> {
        let now = chrono::Utc::now();
        let active_model = response_cache::ActiveModel {
            key: Set(key.to_string()),
            value: Set(value.to_string()),
            expires_at: Set(timestamp(now + ttl)),
            updated_at: Set(timestamp(now)),
        };

        ResponseCache::insert(active_model)
            .on_conflict(
                sea_orm::sea_query::OnConflict::column(response_cache::Column::Key)
                    .update_columns([
                        response_cache::Column::Value,
                        response_cache::Column::ExpiresAt,
                        response_cache::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&self.conn)
            .await?;

        Ok(())
    }

    pub async fn delete(&self, key: &str) -> Result<()> {
        ResponseCache::delete_by_id(key.to_string())
            .exec(&self.conn)
            .await?;
        Ok(())
    }

    /// Drops every expired entry. Returns how many were removed.
    pub async fn purge_expired(&self) -> Result<u64> {
        let now = timestamp(chrono::Utc::now());
        let result = ResponseCache::delete_many()
            .filter(response_cache::Column::ExpiresAt.lte(now))
            .exec(&self.conn)
            .await?;
        Ok(result.rows_affected)
    }
}
