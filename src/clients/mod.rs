//! Access to the upstream movie metadata Provider.

pub mod tmdb;

pub use tmdb::{Throttle, TmdbClient};

use crate::domain::ProviderId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

/// Failures surfaced by a Provider call. None of them are retried here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("provider rejected credentials: {0}")]
    Auth(String),

    #[error("provider has no resource at {0}")]
    NotFound(String),

    #[error("provider rate limit hit (retry after {retry_after:?}s)")]
    RateLimited { retry_after: Option<u64> },

    #[error("provider unreachable: {0}")]
    Transient(String),

    #[error("provider server error: HTTP {status}")]
    Server { status: u16 },

    #[error("unexpected provider response: HTTP {status}")]
    UnexpectedStatus { status: u16 },

    #[error("provider returned an unreadable body: {0}")]
    InvalidPayload(String),

    #[error("invalid provider configuration: {0}")]
    Configuration(String),
}

impl ProviderError {
    /// Configuration problems no amount of waiting will fix.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Auth(_) | Self::Configuration(_))
    }

    /// Conditions that may clear up on their own; callers serve stale data.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::Transient(_) | Self::Server { .. }
        )
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Auth(_) => "auth",
            Self::NotFound(_) => "not_found",
            Self::RateLimited { .. } => "rate_limited",
            Self::Transient(_) => "transient",
            Self::Server { .. } => "server",
            Self::UnexpectedStatus { .. } => "unexpected_status",
            Self::InvalidPayload(_) => "invalid_payload",
            Self::Configuration(_) => "configuration",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendingWindow {
    Day,
    Week,
}

impl TrendingWindow {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
        }
    }
}

/// Raw-cache lifetime class of an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheClass {
    /// Taxonomy and configuration data.
    Static,
    Details,
    Listing,
    Trending,
    Search,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Endpoint {
    MovieDetails(ProviderId),
    SearchMovies,
    Popular,
    TopRated,
    Trending(TrendingWindow),
    GenreList,
    Configuration,
}

impl Endpoint {
    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Self::MovieDetails(id) => format!("movie/{id}"),
            Self::SearchMovies => "search/movie".to_string(),
            Self::Popular => "movie/popular".to_string(),
            Self::TopRated => "movie/top_rated".to_string(),
            Self::Trending(window) => format!("trending/movie/{}", window.as_str()),
            Self::GenreList => "genre/movie/list".to_string(),
            Self::Configuration => "configuration".to_string(),
        }
    }

    #[must_use]
    pub const fn cache_class(&self) -> CacheClass {
        match self {
            Self::GenreList | Self::Configuration => CacheClass::Static,
            Self::MovieDetails(_) => CacheClass::Details,
            Self::Popular | Self::TopRated => CacheClass::Listing,
            Self::Trending(_) => CacheClass::Trending,
            Self::SearchMovies => CacheClass::Search,
        }
    }

    /// Low-cardinality name for metrics and logs.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::MovieDetails(_) => "movie_details",
            Self::SearchMovies => "search",
            Self::Popular => "popular",
            Self::TopRated => "top_rated",
            Self::Trending(_) => "trending",
            Self::GenreList => "genre_list",
            Self::Configuration => "configuration",
        }
    }
}

/// Sections appended to a detail fetch so one call yields everything a
/// complete record needs.
pub const DETAIL_APPENDS: &str = "credits,videos,recommendations,similar,external_ids";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderRequest {
    pub endpoint: Endpoint,
    pub params: BTreeMap<String, String>,
}

impl ProviderRequest {
    #[must_use]
    pub const fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            params: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn param(mut self, name: &str, value: impl ToString) -> Self {
        self.params.insert(name.to_string(), value.to_string());
        self
    }

    #[must_use]
    pub fn movie_details(id: ProviderId) -> Self {
        Self::new(Endpoint::MovieDetails(id)).param("append_to_response", DETAIL_APPENDS)
    }

    #[must_use]
    pub fn search(query: &str, page: u32, include_adult: bool) -> Self {
        Self::new(Endpoint::SearchMovies)
            .param("query", query.trim())
            .param("page", page)
            .param("include_adult", include_adult)
    }

    #[must_use]
    pub fn popular(page: u32) -> Self {
        Self::new(Endpoint::Popular).param("page", page)
    }

    #[must_use]
    pub fn top_rated(page: u32) -> Self {
        Self::new(Endpoint::TopRated).param("page", page)
    }

    #[must_use]
    pub fn trending(window: TrendingWindow, page: u32) -> Self {
        Self::new(Endpoint::Trending(window)).param("page", page)
    }

    #[must_use]
    pub fn genre_list() -> Self {
        Self::new(Endpoint::GenreList)
    }
}

/// Whether a fetch may be answered from the raw-response cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    Cached,
    /// Skip the cache read; a successful response still refreshes the cache.
    Fresh,
}

/// The seam between the catalog and the Provider.
#[async_trait]
pub trait MovieProvider: Send + Sync {
    /// Fetches one Provider resource.
    ///
    /// # Errors
    ///
    /// Returns the [`ProviderError`] matching the failure; nothing is retried.
    async fn fetch(&self, request: &ProviderRequest, mode: FetchMode)
    -> Result<Value, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_paths() {
        let id = ProviderId::new(603);
        assert_eq!(Endpoint::MovieDetails(id).path(), "movie/603");
        assert_eq!(
            Endpoint::Trending(TrendingWindow::Week).path(),
            "trending/movie/week"
        );
        assert_eq!(Endpoint::TopRated.path(), "movie/top_rated");
        assert_eq!(Endpoint::GenreList.path(), "genre/movie/list");
    }

    #[test]
    fn test_cache_classes() {
        assert_eq!(Endpoint::GenreList.cache_class(), CacheClass::Static);
        assert_eq!(
            Endpoint::MovieDetails(ProviderId::new(1)).cache_class(),
            CacheClass::Details
        );
        assert_eq!(
            Endpoint::Trending(TrendingWindow::Day).cache_class(),
            CacheClass::Trending
        );
        assert_eq!(Endpoint::SearchMovies.cache_class(), CacheClass::Search);
    }

    #[test]
    fn test_detail_request_appends_sections() {
        let request = ProviderRequest::movie_details(ProviderId::new(11));
        assert_eq!(
            request.params.get("append_to_response").map(String::as_str),
            Some(DETAIL_APPENDS)
        );
    }

    #[test]
    fn test_error_classification() {
        assert!(ProviderError::Auth("bad key".into()).is_fatal());
        assert!(!ProviderError::NotFound("movie/1".into()).is_fatal());
        assert!(ProviderError::Server { status: 503 }.is_retryable());
        assert!(ProviderError::RateLimited { retry_after: Some(2) }.is_retryable());
        assert!(!ProviderError::InvalidPayload("eof".into()).is_retryable());
    }
}
