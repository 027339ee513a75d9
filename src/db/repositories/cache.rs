use super::to_timestamp;
use crate::cache::CacheBackend;
use crate::entities::{cache_entries, prelude::*};
use anyhow::Result;
use async_trait::async_trait;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use std::time::Duration;
use tracing::warn;

/// Cache backend on the `cache_entries` table, shared across processes that
/// use the same database.
pub struct CacheRepository {
    conn: DatabaseConnection,
}

impl CacheRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn purge_expired(&self) -> Result<u64> {
        let now = to_timestamp(chrono::Utc::now());
        let result = CacheEntries::delete_many()
            .filter(cache_entries::Column::ExpiresAt.lte(now))
            .exec(&self.conn)
            .await?;
        Ok(result.rows_affected)
    }
}

#[async_trait]
impl CacheBackend for CacheRepository {
    /// Reads only; an expired hit deletes just that row.
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let Some(entry) = CacheEntries::find_by_id(key.to_string())
            .one(&self.conn)
            .await?
        else {
            return Ok(None);
        };

        if entry.expires_at > to_timestamp(chrono::Utc::now()) {
            return Ok(Some(entry.value));
        }

        if let Err(e) = CacheEntries::delete_many()
            .filter(cache_entries::Column::CacheKey.eq(key))
            .filter(cache_entries::Column::ExpiresAt.eq(entry.expires_at))
            .exec(&self.conn)
            .await
        {
            warn!(error = %e, "Failed to drop expired cache entry");
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        if let Err(e) = self.purge_expired().await {
            warn!(error = %e, "Failed to purge expired cache entries");
        }

        let now = chrono::Utc::now();
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or_else(|| anyhow::anyhow!("cache TTL out of range: {ttl:?}"))?;

        let active_model = cache_entries::ActiveModel {
            cache_key: Set(key.to_string()),
            value: Set(value.to_string()),
            expires_at: Set(to_timestamp(expires_at)),
            created_at: Set(to_timestamp(now)),
        };

        CacheEntries::insert(active_model)
            .on_conflict(
                OnConflict::column(cache_entries::Column::CacheKey)
                    .update_columns([
                        cache_entries::Column::Value,
                        cache_entries::Column::ExpiresAt,
                        cache_entries::Column::CreatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&self.conn)
            .await?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        CacheEntries::delete_by_id(key.to_string())
            .exec(&self.conn)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Store;

    async fn backend() -> CacheRepository {
        let path = std::env::temp_dir().join(format!(
            "movie-nexus-dbcache-{}.db",
            uuid::Uuid::new_v4()
        ));
        let store = Store::new(&format!("sqlite:{}", path.display()))
            .await
            .unwrap();
        CacheRepository::new(store.conn)
    }

    #[tokio::test]
    async fn test_set_overwrites_and_delete_removes() {
        let cache = backend().await;

        cache.set("k", "one", Duration::from_secs(60)).await.unwrap();
        cache.set("k", "two", Duration::from_secs(60)).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap().as_deref(), Some("two"));

        cache.delete("k").await.unwrap();
        assert!(cache.get("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_entries_are_hidden_and_purged() {
        let cache = backend().await;

        cache.set("kept", "v", Duration::from_secs(60)).await.unwrap();
        cache.set("gone", "v", Duration::ZERO).await.unwrap();

        assert!(cache.get("gone").await.unwrap().is_none());
        assert!(
            CacheEntries::find_by_id("gone".to_string())
                .one(&cache.conn)
                .await
                .unwrap()
                .is_none()
        );
        assert_eq!(cache.get("kept").await.unwrap().as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn test_reads_leave_other_expired_rows_for_the_next_write() {
        let cache = backend().await;

        cache.set("live", "v", Duration::from_secs(60)).await.unwrap();
        cache.set("old", "v", Duration::ZERO).await.unwrap();
        assert_eq!(cache.get("live").await.unwrap().as_deref(), Some("v"));
        assert!(
            CacheEntries::find_by_id("old".to_string())
                .one(&cache.conn)
                .await
                .unwrap()
                .is_some()
        );

        cache.set("next", "v", Duration::from_secs(60)).await.unwrap();
        assert!(
            CacheEntries::find_by_id("old".to_string())
                .one(&cache.conn)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_unrepresentable_ttl_is_an_error() {
        let cache = backend().await;
        assert!(cache.set("k", "v", Duration::MAX).await.is_err());
        assert!(cache.get("k").await.unwrap().is_none());
    }
}
