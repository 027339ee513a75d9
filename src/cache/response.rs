//! Outermost cache tier: fully formatted read payloads.
//!
//! Keys for per-movie payloads (detail, related) are derived only from the
//! provider id and relation type, so a write can recompute and delete them.
//! Search and listing pages are bounded by their TTL.

use super::{CacheBackend, cache_key};
use crate::domain::ProviderId;
use crate::models::relationship::RelationType;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const NAMESPACE: &str = "response";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseKind {
    Detail,
    List,
    Trending,
    Search,
    Related,
}

impl ResponseKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Detail => "detail",
            Self::List => "list",
            Self::Trending => "trending",
            Self::Search => "search",
            Self::Related => "related",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseTtls {
    pub detail: Duration,
    pub list: Duration,
    pub trending: Duration,
    pub search: Duration,
    pub related: Duration,
}

impl Default for ResponseTtls {
    fn default() -> Self {
        Self {
            detail: Duration::from_secs(60 * 60),
            list: Duration::from_secs(30 * 60),
            trending: Duration::from_secs(5 * 60),
            search: Duration::from_secs(30 * 60),
            related: Duration::from_secs(60 * 60),
        }
    }
}

impl ResponseTtls {
    #[must_use]
    pub const fn for_kind(&self, kind: ResponseKind) -> Duration {
        match kind {
            ResponseKind::Detail => self.detail,
            ResponseKind::List => self.list,
            ResponseKind::Trending => self.trending,
            ResponseKind::Search => self.search,
            ResponseKind::Related => self.related,
        }
    }
}

#[derive(Clone)]
pub struct ResponseCache {
    backend: Arc<dyn CacheBackend>,
    ttls: ResponseTtls,
}

impl ResponseCache {
    #[must_use]
    pub fn new(backend: Arc<dyn CacheBackend>, ttls: ResponseTtls) -> Self {
        Self { backend, ttls }
    }

    fn key(operation: &str, params: &[(&str, String)]) -> String {
        let params: BTreeMap<String, String> = params
            .iter()
            .map(|(name, value)| ((*name).to_string(), value.clone()))
            .collect();
        cache_key(NAMESPACE, operation, &params)
    }

    #[must_use]
    pub fn detail_key(provider_id: ProviderId) -> String {
        Self::key("detail", &[("provider_id", provider_id.to_string())])
    }

    #[must_use]
    pub fn related_key(provider_id: ProviderId, relation_type: RelationType) -> String {
        Self::key(
            "related",
            &[
                ("provider_id", provider_id.to_string()),
                ("relation_type", relation_type.as_str().to_string()),
            ],
        )
    }

    /// Queries differing only in case or spacing share a key.
    #[must_use]
    pub fn search_key(query: &str, page: u32, store_results: bool) -> String {
        let normalized = query
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        Self::key(
            "search",
            &[
                ("query", normalized),
                ("page", page.to_string()),
                ("store_results", store_results.to_string()),
            ],
        )
    }

    #[must_use]
    pub fn list_key(list: &str, page: u32, store_results: bool) -> String {
        Self::key(
            "list",
            &[
                ("list", list.to_string()),
                ("page", page.to_string()),
                ("store_results", store_results.to_string()),
            ],
        )
    }

    /// Backend failures and undecodable entries read as a miss.
    pub async fn get<T: DeserializeOwned>(&self, kind: ResponseKind, key: &str) -> Option<T> {
        let cached = match self.backend.get(key).await {
            Ok(cached) => cached,
            Err(e) => {
                warn!(error = %e, kind = kind.as_str(), "Response cache read failed");
                None
            }
        };

        let Some(body) = cached else {
            metrics::counter!("response_cache_misses_total", "kind" => kind.as_str())
                .increment(1);
            return None;
        };

        match serde_json::from_str(&body) {
            Ok(value) => {
                metrics::counter!("response_cache_hits_total", "kind" => kind.as_str())
                    .increment(1);
                Some(value)
            }
            Err(e) => {
                debug!(error = %e, key, "Discarding undecodable response cache entry");
                self.invalidate(key).await;
                None
            }
        }
    }

    pub async fn put<T: Serialize + Sync>(&self, kind: ResponseKind, key: &str, value: &T) {
        let body = match serde_json::to_string(value) {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, kind = kind.as_str(), "Failed to encode response for caching");
                return;
            }
        };

        if let Err(e) = self
            .backend
            .set(key, &body, self.ttls.for_kind(kind))
            .await
        {
            warn!(error = %e, kind = kind.as_str(), "Response cache write failed");
        }
    }

    pub async fn invalidate(&self, key: &str) {
        if let Err(e) = self.backend.delete(key).await {
            warn!(error = %e, key, "Response cache delete failed");
        }
    }

    /// Drops every per-movie payload derived from `provider_id`.
    pub async fn invalidate_movie(&self, provider_id: ProviderId) {
        self.invalidate(&Self::detail_key(provider_id)).await;
        for relation_type in RelationType::ALL {
            self.invalidate(&Self::related_key(provider_id, relation_type))
                .await;
        }
        debug!(%provider_id, "Invalidated cached responses");
    }
}
