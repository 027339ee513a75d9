use super::{parse_timestamp, to_timestamp};
use crate::domain::{MovieId, ProviderId};
use crate::entities::{movie_genres, movie_relationships, movies, prelude::*};
use crate::models::{Movie, StalenessPolicy, SyncStatus};
use crate::transform::{BasicMovieRecord, CompleteMovieRecord};
use anyhow::Context;
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use std::collections::HashMap;
use tracing::{debug, info};

const DATE_FORMAT: &str = "%Y-%m-%d";
const SCAN_PAGE_SIZE: u64 = 200;

/// One page of local movies.
#[derive(Debug, Clone)]
pub struct MoviePage {
    pub movies: Vec<Movie>,
    pub total_pages: u64,
    pub total_results: u64,
}

/// Ordering for local chart listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartOrder {
    Popularity,
    Rating,
}

pub struct MovieRepository {
    conn: DatabaseConnection,
}

impl MovieRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub(crate) fn map_model(model: movies::Model) -> Movie {
        Movie {
            id: MovieId::new(model.id),
            provider_id: ProviderId::new(model.provider_id),
            title: model.title,
            original_title: model.original_title,
            overview: model.overview,
            tagline: model.tagline,
            release_date: model
                .release_date
                .as_deref()
                .and_then(|d| NaiveDate::parse_from_str(d, DATE_FORMAT).ok()),
            release_status: model.release_status.as_deref().and_then(|s| s.parse().ok()),
            runtime: model.runtime,
            budget: model.budget,
            revenue: model.revenue,
            homepage: model.homepage,
            imdb_id: model.imdb_id,
            original_language: model.original_language,
            adult: model.adult,
            popularity: model.popularity,
            vote_average: model.vote_average,
            vote_count: model.vote_count,
            poster_path: model.poster_path,
            backdrop_path: model.backdrop_path,
            credits: model
                .credits_json
                .as_deref()
                .and_then(|j| serde_json::from_str(j).ok())
                .unwrap_or_default(),
            videos: model
                .videos_json
                .as_deref()
                .and_then(|j| serde_json::from_str(j).ok())
                .unwrap_or_default(),
            sync_status: model.sync_status.parse().unwrap_or(SyncStatus::Never),
            last_synced_at: model.last_synced_at.as_deref().and_then(parse_timestamp),
            last_sync_error: model.last_sync_error,
            is_active: model.is_active,
            created_at: parse_timestamp(&model.created_at).unwrap_or_default(),
            updated_at: parse_timestamp(&model.updated_at).unwrap_or_default(),
        }
    }

    pub async fn get(&self, id: MovieId) -> anyhow::Result<Option<Movie>> {
        let row = Movies::find_by_id(id.value()).one(&self.conn).await?;
        Ok(row.map(Self::map_model))
    }

    pub async fn get_by_provider_id(&self, provider_id: ProviderId) -> anyhow::Result<Option<Movie>> {
        Self::find_by_provider_id(&self.conn, provider_id).await
    }

    async fn find_by_provider_id<C: ConnectionTrait>(
        conn: &C,
        provider_id: ProviderId,
    ) -> anyhow::Result<Option<Movie>> {
        let row = Movies::find()
            .filter(movies::Column::ProviderId.eq(provider_id.value()))
            .one(conn)
            .await?;
        Ok(row.map(Self::map_model))
    }

    pub async fn get_many_by_provider_ids(
        &self,
        provider_ids: &[ProviderId],
    ) -> anyhow::Result<HashMap<ProviderId, Movie>> {
        if provider_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = Movies::find()
            .filter(movies::Column::ProviderId.is_in(provider_ids.iter().map(|id| id.value())))
            .all(&self.conn)
            .await?;

        Ok(rows
            .into_iter()
            .map(Self::map_model)
            .map(|movie| (movie.provider_id, movie))
            .collect())
    }

    /// Creates a `partial` record from a listing entry unless the movie is
    /// already known. Existing rows are never touched.
    pub async fn insert_partial(
        &self,
        record: &BasicMovieRecord,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Movie> {
        let stamp = to_timestamp(now);
        let active_model = movies::ActiveModel {
            provider_id: Set(record.provider_id.value()),
            title: Set(record.title.clone()),
            original_title: Set(record.original_title.clone()),
            overview: Set(record.overview.clone()),
            release_date: Set(record.release_date.map(|d| d.format(DATE_FORMAT).to_string())),
            original_language: Set(record.original_language.clone()),
            adult: Set(record.adult),
            popularity: Set(record.popularity),
            vote_average: Set(record.vote_average),
            vote_count: Set(record.vote_count),
            poster_path: Set(record.poster_path.clone()),
            backdrop_path: Set(record.backdrop_path.clone()),
            sync_status: Set(SyncStatus::Partial.as_str().to_string()),
            is_active: Set(true),
            created_at: Set(stamp.clone()),
            updated_at: Set(stamp),
            ..Default::default()
        };

        let inserted = Movies::insert(active_model)
            .on_conflict(
                OnConflict::column(movies::Column::ProviderId)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.conn)
            .await?;

        if inserted > 0 {
            debug!(provider_id = %record.provider_id, "Created partial movie record");
        }

        self.get_by_provider_id(record.provider_id)
            .await?
            .with_context(|| format!("movie {} missing after insert", record.provider_id))
    }

    /// Writes every Provider-owned column from a detail fetch and marks the
    /// record `complete`. `is_active` and `created_at` keep their stored values.
    pub async fn upsert_complete<C: ConnectionTrait>(
        conn: &C,
        record: &CompleteMovieRecord,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Movie> {
        let basic = &record.basic;
        let stamp = to_timestamp(now);

        let active_model = movies::ActiveModel {
            provider_id: Set(basic.provider_id.value()),
            title: Set(basic.title.clone()),
            original_title: Set(basic.original_title.clone()),
            overview: Set(basic.overview.clone()),
            tagline: Set(record.tagline.clone()),
            release_date: Set(basic.release_date.map(|d| d.format(DATE_FORMAT).to_string())),
            release_status: Set(record.release_status.map(|s| s.as_str().to_string())),
            runtime: Set(record.runtime),
            budget: Set(record.budget),
            revenue: Set(record.revenue),
            homepage: Set(record.homepage.clone()),
            imdb_id: Set(record.imdb_id.clone()),
            original_language: Set(basic.original_language.clone()),
            adult: Set(basic.adult),
            popularity: Set(basic.popularity),
            vote_average: Set(basic.vote_average),
            vote_count: Set(basic.vote_count),
            poster_path: Set(basic.poster_path.clone()),
            backdrop_path: Set(basic.backdrop_path.clone()),
            credits_json: Set(Some(serde_json::to_string(&record.credits)?)),
            videos_json: Set(Some(serde_json::to_string(&record.videos)?)),
            sync_status: Set(SyncStatus::Complete.as_str().to_string()),
            last_synced_at: Set(Some(stamp.clone())),
            last_sync_error: Set(None),
            last_sync_attempt_at: Set(Some(stamp.clone())),
            is_active: Set(true),
            created_at: Set(stamp.clone()),
            updated_at: Set(stamp),
            ..Default::default()
        };

        Movies::insert(active_model)
            .on_conflict(
                OnConflict::column(movies::Column::ProviderId)
                    .update_columns([
                        movies::Column::Title,
                        movies::Column::OriginalTitle,
                        movies::Column::Overview,
                        movies::Column::Tagline,
                        movies::Column::ReleaseDate,
                        movies::Column::ReleaseStatus,
                        movies::Column::Runtime,
                        movies::Column::Budget,
                        movies::Column::Revenue,
                        movies::Column::Homepage,
                        movies::Column::ImdbId,
                        movies::Column::OriginalLanguage,
                        movies::Column::Adult,
                        movies::Column::Popularity,
                        movies::Column::VoteAverage,
                        movies::Column::VoteCount,
                        movies::Column::PosterPath,
                        movies::Column::BackdropPath,
                        movies::Column::CreditsJson,
                        movies::Column::VideosJson,
                        movies::Column::SyncStatus,
                        movies::Column::LastSyncedAt,
                        movies::Column::LastSyncError,
                        movies::Column::LastSyncAttemptAt,
                        movies::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(conn)
            .await?;

        Self::find_by_provider_id(conn, basic.provider_id)
            .await?
            .with_context(|| format!("movie {} missing after upsert", basic.provider_id))
    }

    /// Records a failed sync attempt. With `mark_failed`, a record that is
    /// not `complete` moves to `failed`; complete records keep their status.
    pub async fn record_sync_failure(
        &self,
        provider_id: ProviderId,
        error: &str,
        mark_failed: bool,
        now: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let txn = self.conn.begin().await?;

        Movies::update_many()
            .col_expr(movies::Column::LastSyncError, Expr::value(error))
            .col_expr(
                movies::Column::LastSyncAttemptAt,
                Expr::value(to_timestamp(now)),
            )
            .filter(movies::Column::ProviderId.eq(provider_id.value()))
            .exec(&txn)
            .await?;

        if mark_failed {
            Movies::update_many()
                .col_expr(
                    movies::Column::SyncStatus,
                    Expr::value(SyncStatus::Failed.as_str()),
                )
                .filter(movies::Column::ProviderId.eq(provider_id.value()))
                .filter(movies::Column::SyncStatus.ne(SyncStatus::Complete.as_str()))
                .exec(&txn)
                .await?;
        }

        txn.commit().await?;
        Ok(())
    }

    pub async fn set_active(
        &self,
        provider_id: ProviderId,
        active: bool,
        now: DateTime<Utc>,
    ) -> anyhow::Result<bool> {
        let result = Movies::update_many()
            .col_expr(movies::Column::IsActive, Expr::value(active))
            .col_expr(movies::Column::UpdatedAt, Expr::value(to_timestamp(now)))
            .filter(movies::Column::ProviderId.eq(provider_id.value()))
            .exec(&self.conn)
            .await?;

        Ok(result.rows_affected > 0)
    }

    /// Irreversible. Edges in both directions and genre assignments go with
    /// the movie.
    pub async fn delete(&self, id: MovieId) -> anyhow::Result<bool> {
        let txn = self.conn.begin().await?;

        MovieRelationships::delete_many()
            .filter(
                Condition::any()
                    .add(movie_relationships::Column::SourceMovieId.eq(id.value()))
                    .add(movie_relationships::Column::TargetMovieId.eq(id.value())),
            )
            .exec(&txn)
            .await?;

        MovieGenres::delete_many()
            .filter(movie_genres::Column::MovieId.eq(id.value()))
            .exec(&txn)
            .await?;

        let result = Movies::delete_by_id(id.value()).exec(&txn).await?;

        txn.commit().await?;

        let removed = result.rows_affected > 0;
        if removed {
            info!("Deleted movie with local ID: {}", id);
        }
        Ok(removed)
    }

    /// Case-insensitive title match over active movies, most popular first.
    pub async fn search_by_title(
        &self,
        query: &str,
        page: u64,
        page_size: u64,
    ) -> anyhow::Result<MoviePage> {
        let pattern = query.trim();
        let select = Movies::find()
            .filter(movies::Column::IsActive.eq(true))
            .filter(
                Condition::any()
                    .add(movies::Column::Title.contains(pattern))
                    .add(movies::Column::OriginalTitle.contains(pattern)),
            )
            .order_by_desc(movies::Column::Popularity)
            .order_by_asc(movies::Column::Id);

        let paginator = select.paginate(&self.conn, page_size);
        let counts = paginator.num_items_and_pages().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok(MoviePage {
            movies: items.into_iter().map(Self::map_model).collect(),
            total_pages: counts.number_of_pages,
            total_results: counts.number_of_items,
        })
    }

    /// Active movies ordered like a Provider chart.
    pub async fn list_active(
        &self,
        order: ChartOrder,
        page: u64,
        page_size: u64,
    ) -> anyhow::Result<MoviePage> {
        let select = Movies::find().filter(movies::Column::IsActive.eq(true));
        let select = match order {
            ChartOrder::Popularity => select.order_by_desc(movies::Column::Popularity),
            ChartOrder::Rating => select
                .order_by_desc(movies::Column::VoteAverage)
                .order_by_desc(movies::Column::VoteCount),
        }
        .order_by_asc(movies::Column::Id);

        let paginator = select.paginate(&self.conn, page_size);
        let counts = paginator.num_items_and_pages().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok(MoviePage {
            movies: items.into_iter().map(Self::map_model).collect(),
            total_pages: counts.number_of_pages,
            total_results: counts.number_of_items,
        })
    }

    pub async fn list_by_genre(
        &self,
        genre_id: i32,
        page: u64,
        page_size: u64,
    ) -> anyhow::Result<MoviePage> {
        let select = Movies::find()
            .inner_join(MovieGenres)
            .filter(movie_genres::Column::GenreId.eq(genre_id))
            .filter(movies::Column::IsActive.eq(true))
            .order_by_desc(movies::Column::Popularity)
            .order_by_asc(movies::Column::Id);

        let paginator = select.paginate(&self.conn, page_size);
        let counts = paginator.num_items_and_pages().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok(MoviePage {
            movies: items.into_iter().map(Self::map_model).collect(),
            total_pages: counts.number_of_pages,
            total_results: counts.number_of_items,
        })
    }

    /// Active movies for which [`Movie::needs_sync`] holds, least recently
    /// synced first.
    pub async fn stale_candidates(
        &self,
        policy: &StalenessPolicy,
        now: DateTime<Utc>,
        limit: usize,
    ) -> anyhow::Result<Vec<Movie>> {
        let window = policy.unreleased_window.min(policy.released_window);
        let cutoff = to_timestamp(now - window);

        let select = Movies::find()
            .filter(movies::Column::IsActive.eq(true))
            .filter(
                Condition::any()
                    .add(movies::Column::SyncStatus.ne(SyncStatus::Complete.as_str()))
                    .add(movies::Column::LastSyncedAt.is_null())
                    .add(movies::Column::LastSyncedAt.lt(cutoff))
                    .add(movies::Column::Runtime.is_null())
                    .add(movies::Column::Overview.eq(""))
                    .add(movies::Column::PosterPath.is_null())
                    .add(movies::Column::PosterPath.eq("")),
            )
            .order_by_asc(movies::Column::LastSyncedAt)
            .order_by_asc(movies::Column::Id);

        let mut pages = select.paginate(&self.conn, SCAN_PAGE_SIZE);
        let mut stale = Vec::new();
        while let Some(batch) = pages.fetch_and_next().await? {
            stale.extend(
                batch
                    .into_iter()
                    .map(Self::map_model)
                    .filter(|movie| movie.needs_sync(policy, now)),
            );
            if stale.len() >= limit {
                break;
            }
        }

        stale.truncate(limit);
        Ok(stale)
    }

    /// Number of movies per sync status.
    pub async fn status_counts(&self) -> anyhow::Result<Vec<(String, i64)>> {
        let rows = Movies::find()
            .select_only()
            .column(movies::Column::SyncStatus)
            .column_as(Expr::col(movies::Column::Id).count(), "count")
            .group_by(movies::Column::SyncStatus)
            .order_by_asc(movies::Column::SyncStatus)
            .into_tuple::<(String, i64)>()
            .all(&self.conn)
            .await?;

        Ok(rows)
    }
}
