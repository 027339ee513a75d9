use super::to_timestamp;
use crate::domain::MovieId;
use crate::entities::{genres, movie_genres, movies, prelude::*};
use crate::models::genre::default_weight;
use crate::models::{Genre, GenreAssignment, GenreCount, GenreRecord};
use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

pub struct GenreRepository {
    conn: DatabaseConnection,
}

impl GenreRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    fn map_model(model: genres::Model) -> Genre {
        Genre {
            id: model.id,
            provider_id: model.provider_id,
            name: model.name,
            slug: model.slug,
        }
    }

    fn map_assignment(model: movie_genres::Model, genre: genres::Model) -> GenreAssignment {
        GenreAssignment {
            genre: Self::map_model(genre),
            weight: model.weight,
            is_primary: model.is_primary,
        }
    }

    /// Inserts or renames genres by provider id.
    pub async fn upsert(&self, records: &[GenreRecord]) -> anyhow::Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let txn = self.conn.begin().await?;
        let count = Self::upsert_all(&txn, records).await?;
        txn.commit().await?;

        info!("Upserted {} genres", count);
        Ok(count)
    }

    pub async fn upsert_all<C: ConnectionTrait>(
        conn: &C,
        records: &[GenreRecord],
    ) -> anyhow::Result<usize> {
        for record in records {
            let active_model = genres::ActiveModel {
                provider_id: Set(record.provider_id),
                name: Set(record.name.clone()),
                slug: Set(record.slug.clone()),
                ..Default::default()
            };

            Genres::insert(active_model)
                .on_conflict(
                    OnConflict::column(genres::Column::ProviderId)
                        .update_columns([genres::Column::Name, genres::Column::Slug])
                        .to_owned(),
                )
                .exec_without_returning(conn)
                .await?;
        }

        Ok(records.len())
    }

    /// Resolves provider genre ids in the given order, creating placeholder
    /// genres for ids the taxonomy has not delivered yet. Repeated ids are
    /// kept once, at their first position.
    pub async fn ensure<C: ConnectionTrait>(
        conn: &C,
        provider_ids: &[i32],
    ) -> anyhow::Result<Vec<Genre>> {
        let mut seen = HashSet::new();
        let ordered: Vec<i32> = provider_ids
            .iter()
            .copied()
            .filter(|id| seen.insert(*id))
            .collect();

        if ordered.is_empty() {
            return Ok(Vec::new());
        }

        let mut known = Self::find_by_provider_ids(conn, &ordered).await?;

        let missing: Vec<i32> = ordered
            .iter()
            .copied()
            .filter(|id| !known.contains_key(id))
            .collect();

        if !missing.is_empty() {
            for id in &missing {
                let placeholder = GenreRecord::placeholder(*id);
                let active_model = genres::ActiveModel {
                    provider_id: Set(placeholder.provider_id),
                    name: Set(placeholder.name),
                    slug: Set(placeholder.slug),
                    ..Default::default()
                };
                Genres::insert(active_model)
                    .on_conflict(
                        OnConflict::column(genres::Column::ProviderId)
                            .do_nothing()
                            .to_owned(),
                    )
                    .exec_without_returning(conn)
                    .await?;
            }
            debug!(?missing, "Created placeholder genres");
            known = Self::find_by_provider_ids(conn, &ordered).await?;
        }

        Ok(ordered
            .iter()
            .filter_map(|id| known.remove(id))
            .collect())
    }

    async fn find_by_provider_ids<C: ConnectionTrait>(
        conn: &C,
        provider_ids: &[i32],
    ) -> anyhow::Result<HashMap<i32, Genre>> {
        let rows = Genres::find()
            .filter(genres::Column::ProviderId.is_in(provider_ids.iter().copied()))
            .all(conn)
            .await?;

        Ok(rows
            .into_iter()
            .map(|m| (m.provider_id, Self::map_model(m)))
            .collect())
    }

    pub async fn list(&self) -> anyhow::Result<Vec<Genre>> {
        let rows = Genres::find()
            .order_by_asc(genres::Column::Name)
            .all(&self.conn)
            .await?;
        Ok(rows.into_iter().map(Self::map_model).collect())
    }

    /// Genres with at least one active movie, most populated first and ties
    /// by name.
    pub async fn popular(&self, limit: usize) -> anyhow::Result<Vec<GenreCount>> {
        let counts: Vec<(i32, i64)> = MovieGenres::find()
            .select_only()
            .column(movie_genres::Column::GenreId)
            .column_as(movie_genres::Column::MovieId.count(), "movie_count")
            .inner_join(Movies)
            .filter(movies::Column::IsActive.eq(true))
            .group_by(movie_genres::Column::GenreId)
            .into_tuple()
            .all(&self.conn)
            .await?;

        if counts.is_empty() {
            return Ok(Vec::new());
        }

        let mut by_id: HashMap<i32, Genre> = Genres::find()
            .filter(genres::Column::Id.is_in(counts.iter().map(|(id, _)| *id)))
            .all(&self.conn)
            .await?
            .into_iter()
            .map(|m| (m.id, Self::map_model(m)))
            .collect();

        let mut popular: Vec<GenreCount> = counts
            .into_iter()
            .filter_map(|(id, count)| {
                Some(GenreCount {
                    genre: by_id.remove(&id)?,
                    movie_count: u64::try_from(count).unwrap_or_default(),
                })
            })
            .collect();
        popular.sort_by(|a, b| {
            b.movie_count
                .cmp(&a.movie_count)
                .then_with(|| a.genre.name.cmp(&b.genre.name))
        });
        popular.truncate(limit);

        debug!(genres = popular.len(), limit, "Ranked genres by active movie count");
        Ok(popular)
    }

    pub async fn get_by_slug(&self, slug: &str) -> anyhow::Result<Option<Genre>> {
        let row = Genres::find()
            .filter(genres::Column::Slug.eq(slug))
            .one(&self.conn)
            .await?;
        Ok(row.map(Self::map_model))
    }

    /// Primary first, then by weight and name.
    pub async fn assignments_for(&self, movie_id: MovieId) -> anyhow::Result<Vec<GenreAssignment>> {
        let rows = MovieGenres::find()
            .filter(movie_genres::Column::MovieId.eq(movie_id.value()))
            .find_also_related(Genres)
            .all(&self.conn)
            .await?;

        let mut assignments: Vec<GenreAssignment> = rows
            .into_iter()
            .filter_map(|(link, genre)| genre.map(|g| Self::map_assignment(link, g)))
            .collect();
        sort_assignments(&mut assignments);
        Ok(assignments)
    }

    /// Provider genre ids per movie, in assignment order.
    pub async fn provider_genre_ids_for(
        &self,
        movie_ids: &[MovieId],
    ) -> anyhow::Result<HashMap<MovieId, Vec<i32>>> {
        if movie_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = MovieGenres::find()
            .filter(movie_genres::Column::MovieId.is_in(movie_ids.iter().map(|id| id.value())))
            .find_also_related(Genres)
            .all(&self.conn)
            .await?;

        let mut grouped: HashMap<MovieId, Vec<GenreAssignment>> = HashMap::new();
        for (link, genre) in rows {
            if let Some(genre) = genre {
                let movie_id = MovieId::new(link.movie_id);
                grouped
                    .entry(movie_id)
                    .or_default()
                    .push(Self::map_assignment(link, genre));
            }
        }

        Ok(grouped
            .into_iter()
            .map(|(movie_id, mut assignments)| {
                sort_assignments(&mut assignments);
                let ids = assignments.iter().map(|a| a.genre.provider_id).collect();
                (movie_id, ids)
            })
            .collect())
    }

    /// Replaces every assignment of `movie_id` with `genres`, first one
    /// primary and weights descending. Runs on the caller's connection so it
    /// can share a transaction with the movie upsert.
    pub async fn replace_assignments<C: ConnectionTrait>(
        conn: &C,
        movie_id: MovieId,
        genres: &[Genre],
        now: DateTime<Utc>,
    ) -> anyhow::Result<Vec<GenreAssignment>> {
        MovieGenres::delete_many()
            .filter(movie_genres::Column::MovieId.eq(movie_id.value()))
            .exec(conn)
            .await?;

        if genres.is_empty() {
            return Ok(Vec::new());
        }

        let stamp = to_timestamp(now);
        let assignments: Vec<GenreAssignment> = genres
            .iter()
            .enumerate()
            .map(|(position, genre)| GenreAssignment {
                genre: genre.clone(),
                weight: default_weight(position),
                is_primary: position == 0,
            })
            .collect();

        let models = assignments.iter().map(|a| movie_genres::ActiveModel {
            movie_id: Set(movie_id.value()),
            genre_id: Set(a.genre.id),
            weight: Set(a.weight),
            is_primary: Set(a.is_primary),
            created_at: Set(stamp.clone()),
            ..Default::default()
        });

        MovieGenres::insert_many(models)
            .exec_without_returning(conn)
            .await?;

        Ok(assignments)
    }

    /// Makes `genre` the single primary genre of `movie_id`, creating the
    /// assignment when missing.
    pub async fn set_primary(
        &self,
        movie_id: MovieId,
        genre: &Genre,
        now: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let txn = self.conn.begin().await?;

        MovieGenres::update_many()
            .col_expr(movie_genres::Column::IsPrimary, Expr::value(false))
            .filter(movie_genres::Column::MovieId.eq(movie_id.value()))
            .filter(movie_genres::Column::IsPrimary.eq(true))
            .exec(&txn)
            .await?;

        let active_model = movie_genres::ActiveModel {
            movie_id: Set(movie_id.value()),
            genre_id: Set(genre.id),
            weight: Set(1.0),
            is_primary: Set(true),
            created_at: Set(to_timestamp(now)),
            ..Default::default()
        };

        MovieGenres::insert(active_model)
            .on_conflict(
                OnConflict::columns([movie_genres::Column::MovieId, movie_genres::Column::GenreId])
                    .update_columns([movie_genres::Column::Weight, movie_genres::Column::IsPrimary])
                    .to_owned(),
            )
            .exec_without_returning(&txn)
            .await?;

        txn.commit().await?;
        Ok(())
    }
}

fn sort_assignments(assignments: &mut [GenreAssignment]) {
    assignments.sort_by(|a, b| {
        b.is_primary
            .cmp(&a.is_primary)
            .then_with(|| b.weight.total_cmp(&a.weight))
            .then_with(|| a.genre.name.cmp(&b.genre.name))
    });
}
