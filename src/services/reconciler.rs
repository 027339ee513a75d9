//! Genre assignment and relationship graph maintenance.
//!
//! Both reconciliations are full replacements (delete-then-insert) that run in
//! a single transaction per movie, so readers never observe a movie with a
//! momentarily empty genre or edge set. The `*_in` variants take the caller's
//! connection so a movie sync can fold them into its own transaction.

use crate::cache::ResponseCache;
use crate::db::{GenreRepository, RelationshipRepository, Store};
use crate::domain::ProviderId;
use crate::models::{
    Genre, GenreAssignment, GenreCount, GenreRecord, Movie, MovieRelationship, NewRelationship,
    RelationType, RelationshipIntegrityError, RelationshipSyncReport,
};
use crate::services::catalog_service::SyncError;
use chrono::{DateTime, Utc};
use sea_orm::ConnectionTrait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct Reconciler {
    store: Arc<Store>,
    response_cache: ResponseCache,
}

impl Reconciler {
    #[must_use]
    pub const fn new(store: Arc<Store>, response_cache: ResponseCache) -> Self {
        Self {
            store,
            response_cache,
        }
    }

    /// Replaces the genres of `movie` with `genre_ids` in provider order.
    /// Unknown ids get placeholder genres; an empty list clears the genres.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Store`] if the transaction fails.
    pub async fn assign_genres(
        &self,
        movie: &Movie,
        genre_ids: &[i32],
    ) -> Result<Vec<GenreAssignment>, SyncError> {
        let txn = self.store.begin().await?;
        let assignments = Self::assign_genres_in(&txn, movie, genre_ids, Utc::now()).await?;
        txn.commit().await?;

        self.response_cache.invalidate_movie(movie.provider_id).await;
        Ok(assignments)
    }

    pub async fn assign_genres_in<C: ConnectionTrait>(
        conn: &C,
        movie: &Movie,
        genre_ids: &[i32],
        now: DateTime<Utc>,
    ) -> anyhow::Result<Vec<GenreAssignment>> {
        let genres = GenreRepository::ensure(conn, genre_ids).await?;
        let assignments = GenreRepository::replace_assignments(conn, movie.id, &genres, now).await?;

        debug!(
            provider_id = %movie.provider_id,
            count = assignments.len(),
            "Assigned genres"
        );
        Ok(assignments)
    }

    /// Makes `genre_provider_id` the only primary genre of `movie` with
    /// weight 1.0. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Store`] if the update fails.
    pub async fn set_primary(&self, movie: &Movie, genre_provider_id: i32) -> Result<Genre, SyncError> {
        let genre = self
            .store
            .ensure_genres(&[genre_provider_id])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| SyncError::Validation(format!("genre {genre_provider_id} unavailable")))?;

        self.store
            .set_primary_genre(movie.id, &genre, Utc::now())
            .await?;

        self.response_cache.invalidate_movie(movie.provider_id).await;
        info!(provider_id = %movie.provider_id, genre = %genre.name, "Primary genre set");
        Ok(genre)
    }

    /// Replaces every `relation_type` edge leaving `movie` with edges to the
    /// locally known movies among `related_ids`. Unknown ids are skipped, not
    /// synced; self references and repeats are rejected individually.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Store`] if the transaction fails.
    pub async fn sync_relationships(
        &self,
        movie: &Movie,
        related_ids: &[ProviderId],
        relation_type: RelationType,
    ) -> Result<RelationshipSyncReport, SyncError> {
        let resolved = self.store.get_movies_by_provider_ids(related_ids).await?;

        let txn = self.store.begin().await?;
        let report = Self::sync_relationships_in(
            &txn,
            movie,
            related_ids,
            relation_type,
            &resolved,
            Utc::now(),
        )
        .await?;
        txn.commit().await?;

        self.response_cache.invalidate_movie(movie.provider_id).await;
        Ok(report)
    }

    pub async fn sync_relationships_in<C: ConnectionTrait>(
        conn: &C,
        movie: &Movie,
        related_ids: &[ProviderId],
        relation_type: RelationType,
        resolved: &HashMap<ProviderId, Movie>,
        now: DateTime<Utc>,
    ) -> anyhow::Result<RelationshipSyncReport> {
        let (edges, report) = plan_edges(movie, related_ids, relation_type, resolved);
        RelationshipRepository::replace_edges(conn, movie.id, relation_type, &edges, now).await?;

        debug!(
            provider_id = %movie.provider_id,
            relation_type = relation_type.as_str(),
            linked = report.linked,
            skipped = report.skipped_missing.len(),
            rejected = report.rejected,
            "Synced relationships"
        );
        Ok(report)
    }

    /// Adds one edge without touching the rest of the graph.
    ///
    /// # Errors
    ///
    /// - Returns [`SyncError::Relationship`] for self edges, duplicates and confidence violations
    /// - Returns [`SyncError::UnknownMovie`] if either endpoint is not stored
    pub async fn add_relationship(&self, edge: NewRelationship) -> Result<MovieRelationship, SyncError> {
        edge.validate()?;

        let source = self
            .store
            .get_movie(edge.source)
            .await?
            .ok_or(SyncError::UnknownMovie(edge.source))?;
        if self.store.get_movie(edge.target).await?.is_none() {
            return Err(SyncError::UnknownMovie(edge.target));
        }

        if self
            .store
            .relationship_exists(edge.source, edge.target, edge.relation_type)
            .await?
        {
            return Err(RelationshipIntegrityError::Duplicate {
                source_movie: edge.source,
                target_movie: edge.target,
                relation_type: edge.relation_type,
            }
            .into());
        }

        let stored = self.store.insert_relationship(&edge, Utc::now()).await?;
        self.response_cache.invalidate_movie(source.provider_id).await;
        Ok(stored)
    }

    /// # Errors
    ///
    /// Returns [`SyncError::Store`] if the upsert fails.
    pub async fn upsert_genres(&self, records: &[GenreRecord]) -> Result<usize, SyncError> {
        Ok(self.store.upsert_genres(records).await?)
    }

    /// Up to `limit` genres ranked by how many active movies carry them.
    /// Genres without active movies are left out.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Validation`] for a zero limit and
    /// [`SyncError::Store`] if the query fails.
    pub async fn popular_genres(&self, limit: usize) -> Result<Vec<GenreCount>, SyncError> {
        if limit == 0 {
            return Err(SyncError::Validation("limit must be positive".to_string()));
        }
        Ok(self.store.popular_genres(limit).await?)
    }

    /// Primary first, then by descending weight and name.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Store`] if the query fails.
    pub async fn genres_for(&self, movie: &Movie) -> Result<Vec<GenreAssignment>, SyncError> {
        Ok(self.store.genre_assignments(movie.id).await?)
    }

    /// # Errors
    ///
    /// Returns [`SyncError::Store`] if the query fails.
    pub async fn primary_genre(&self, movie: &Movie) -> Result<Option<Genre>, SyncError> {
        Ok(self
            .genres_for(movie)
            .await?
            .into_iter()
            .find(|a| a.is_primary)
            .map(|a| a.genre))
    }
}

/// Turns resolved related ids into validated provider edges.
fn plan_edges(
    movie: &Movie,
    related_ids: &[ProviderId],
    relation_type: RelationType,
    resolved: &HashMap<ProviderId, Movie>,
) -> (Vec<NewRelationship>, RelationshipSyncReport) {
    let mut report = RelationshipSyncReport::default();
    let mut seen = HashSet::new();
    let mut edges = Vec::new();

    for id in related_ids {
        let Some(target) = resolved.get(id) else {
            report.skipped_missing.push(*id);
            continue;
        };

        let edge = NewRelationship::from_provider(movie.id, target.id, relation_type);
        if let Err(e) = edge.validate() {
            warn!(provider_id = %movie.provider_id, error = %e, "Rejected relationship");
            report.rejected += 1;
            continue;
        }

        if !seen.insert(target.id) {
            let duplicate = RelationshipIntegrityError::Duplicate {
                source_movie: movie.id,
                target_movie: target.id,
                relation_type,
            };
            debug!(error = %duplicate, "Rejected relationship");
            report.rejected += 1;
            continue;
        }

        edges.push(edge);
    }

    report.linked = edges.len();
    (edges, report)
}
