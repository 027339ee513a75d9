//! Domain service for keeping the local catalog in step with the Provider.
//!
//! This module provides the [`CatalogService`] trait: the sync state machine
//! (`never` → `partial` → `complete`/`failed`), bulk and single-item syncs,
//! search and listing with local-wins semantics, and the read paths that sit
//! behind the response cache.

use crate::clients::{ProviderError, TrendingWindow};
use crate::domain::{MovieId, ProviderId};
use crate::models::{
    Genre, Movie, MovieDetail, MovieSummary, PagedResult, RelationType, RelationshipIntegrityError,
};
use crate::transform::TransformError;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Domain errors for catalog operations.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Movie {0} not found")]
    NotFound(ProviderId),

    #[error("No local movie with ID {0}")]
    UnknownMovie(MovieId),

    #[error("Movie {0} is inactive")]
    Inactive(ProviderId),

    #[error("Movie {0} failed recently; provider calls are paused")]
    CoolingDown(ProviderId),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Invalid provider payload: {0}")]
    Transform(#[from] TransformError),

    #[error(transparent)]
    Relationship(#[from] RelationshipIntegrityError),

    #[error("Database error: {0}")]
    Store(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl SyncError {
    /// Conditions that must reach the caller instead of degrading to
    /// locally available data.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        match self {
            Self::Provider(e) => e.is_fatal(),
            Self::Store(_) => true,
            _ => false,
        }
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::UnknownMovie(_) => "unknown_movie",
            Self::Inactive(_) => "inactive",
            Self::CoolingDown(_) => "cooling_down",
            Self::Provider(e) => e.label(),
            Self::Transform(_) => "transform",
            Self::Relationship(_) => "relationship",
            Self::Store(_) => "store",
            Self::Validation(_) => "validation",
        }
    }
}

impl From<sea_orm::DbErr> for SyncError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Store(err.to_string())
    }
}

impl From<anyhow::Error> for SyncError {
    fn from(err: anyhow::Error) -> Self {
        Self::Store(err.to_string())
    }
}

/// Result of a bulk sync. Every requested id lands in exactly one list.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BulkSyncReport {
    pub synced: Vec<Movie>,
    pub failed: Vec<ProviderId>,
}

/// Provider charts that can be browsed and optionally stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiscoverList {
    Popular,
    TopRated,
    Trending(TrendingWindow),
}

impl DiscoverList {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Popular => "popular",
            Self::TopRated => "top-rated",
            Self::Trending(TrendingWindow::Day) => "trending-day",
            Self::Trending(TrendingWindow::Week) => "trending-week",
        }
    }
}

impl fmt::Display for DiscoverList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DiscoverList {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "popular" => Ok(Self::Popular),
            "top-rated" => Ok(Self::TopRated),
            "trending" | "trending-day" => Ok(Self::Trending(TrendingWindow::Day)),
            "trending-week" => Ok(Self::Trending(TrendingWindow::Week)),
            other => Err(format!("unknown list: {other}")),
        }
    }
}

/// Domain service trait for catalog synchronization.
///
/// Reads degrade to the most complete local data when the Provider is
/// unavailable; only fatal conditions (bad credentials, unreachable store)
/// surface as errors.
#[async_trait::async_trait]
pub trait CatalogService: Send + Sync {
    /// Returns the local record, syncing it from the Provider first when it
    /// needs a refresh or `force` is set.
    ///
    /// # Errors
    ///
    /// - Returns [`SyncError::NotFound`] if neither the Provider nor the store knows the id
    /// - Returns [`SyncError::Inactive`] if the movie was deactivated
    /// - Returns [`SyncError::Provider`] on authentication failures
    async fn get_or_sync(&self, provider_id: ProviderId, force: bool) -> Result<Movie, SyncError>;

    /// Staleness policy check for a local record.
    fn needs_sync(&self, movie: &Movie) -> bool;

    /// Syncs each id independently; one failure never aborts the others.
    ///
    /// # Errors
    ///
    /// Returns an error only for fatal conditions, which stop the batch.
    async fn bulk_sync(&self, provider_ids: &[ProviderId]) -> Result<BulkSyncReport, SyncError>;

    /// Searches the Provider. Known movies are shown from their local record;
    /// unknown ones are stored as `partial` when `store_results` is set.
    ///
    /// # Errors
    ///
    /// - Returns [`SyncError::Validation`] for an empty query
    /// - Returns [`SyncError::Provider`] on authentication failures
    async fn search_and_store(
        &self,
        query: &str,
        page: u32,
        store_results: bool,
    ) -> Result<PagedResult<MovieSummary>, SyncError>;

    /// Formatted detail view, served from the response cache when possible.
    ///
    /// # Errors
    ///
    /// Same as [`CatalogService::get_or_sync`].
    async fn movie_details(&self, provider_id: ProviderId, force: bool)
    -> Result<MovieDetail, SyncError>;

    /// Browses a Provider chart with the same semantics as search.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Provider`] on authentication failures.
    async fn discover(
        &self,
        list: DiscoverList,
        page: u32,
        store_results: bool,
    ) -> Result<PagedResult<MovieSummary>, SyncError>;

    /// Upserts the Provider's genre taxonomy and returns the local genre list.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Provider`] or [`SyncError::Transform`] when the
    /// taxonomy cannot be fetched.
    async fn sync_genre_taxonomy(&self) -> Result<Vec<Genre>, SyncError>;

    /// Bulk syncs up to `limit` active movies that need a refresh.
    ///
    /// # Errors
    ///
    /// Returns an error only for fatal conditions.
    async fn refresh_stale(&self, limit: usize) -> Result<BulkSyncReport, SyncError>;

    /// Active movies linked from `provider_id` by `relation_type`.
    ///
    /// # Errors
    ///
    /// Same as [`CatalogService::get_or_sync`].
    async fn related_movies(
        &self,
        provider_id: ProviderId,
        relation_type: RelationType,
        limit: usize,
    ) -> Result<Vec<MovieSummary>, SyncError>;

    /// Local active movies assigned to the genre with `slug`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Validation`] if no genre has that slug.
    async fn movies_by_genre(
        &self,
        slug: &str,
        page: u32,
    ) -> Result<PagedResult<MovieSummary>, SyncError>;

    /// Soft delete: the movie is excluded from sync and reads.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::NotFound`] if the movie is not stored locally.
    async fn deactivate(&self, provider_id: ProviderId) -> Result<(), SyncError>;

    /// # Errors
    ///
    /// Returns [`SyncError::NotFound`] if the movie is not stored locally.
    async fn reactivate(&self, provider_id: ProviderId) -> Result<(), SyncError>;

    /// Hard delete, cascading genre assignments and edges in both directions.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::NotFound`] if the movie is not stored locally.
    async fn delete(&self, provider_id: ProviderId) -> Result<(), SyncError>;
}
