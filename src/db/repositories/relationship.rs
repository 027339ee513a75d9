use super::movie::MovieRepository;
use super::{parse_timestamp, to_timestamp};
use crate::domain::{MovieId, ProviderId};
use crate::entities::{movie_relationships, movies, prelude::*};
use crate::models::{Movie, MovieRelationship, NewRelationship, RelationOrigin, RelationType};
use chrono::{DateTime, Utc};
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};

pub struct RelationshipRepository {
    conn: DatabaseConnection,
}

impl RelationshipRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    fn to_active_model(edge: &NewRelationship, stamp: &str) -> movie_relationships::ActiveModel {
        movie_relationships::ActiveModel {
            source_movie_id: Set(edge.source.value()),
            target_movie_id: Set(edge.target.value()),
            relation_type: Set(edge.relation_type.as_str().to_string()),
            confidence: Set(edge.confidence),
            origin: Set(edge.origin.as_str().to_string()),
            created_at: Set(stamp.to_string()),
            ..Default::default()
        }
    }

    /// Replaces the provider edges of `relation_type` leaving `source`.
    /// Internal edges are kept; a provider edge that duplicates one is
    /// dropped. Edges are expected to be validated and free of duplicates.
    pub async fn replace_edges<C: ConnectionTrait>(
        conn: &C,
        source: MovieId,
        relation_type: RelationType,
        edges: &[NewRelationship],
        now: DateTime<Utc>,
    ) -> anyhow::Result<u64> {
        MovieRelationships::delete_many()
            .filter(movie_relationships::Column::SourceMovieId.eq(source.value()))
            .filter(movie_relationships::Column::RelationType.eq(relation_type.as_str()))
            .filter(movie_relationships::Column::Origin.eq(RelationOrigin::Provider.as_str()))
            .exec(conn)
            .await?;

        if edges.is_empty() {
            return Ok(0);
        }

        let stamp = to_timestamp(now);
        let inserted =
            MovieRelationships::insert_many(edges.iter().map(|e| Self::to_active_model(e, &stamp)))
                .on_conflict(
                    OnConflict::columns([
                        movie_relationships::Column::SourceMovieId,
                        movie_relationships::Column::TargetMovieId,
                        movie_relationships::Column::RelationType,
                    ])
                    .do_nothing()
                    .to_owned(),
                )
                .exec_without_returning(conn)
                .await?;

        Ok(inserted)
    }

    pub async fn exists(
        &self,
        source: MovieId,
        target: MovieId,
        relation_type: RelationType,
    ) -> anyhow::Result<bool> {
        let count = MovieRelationships::find()
            .filter(movie_relationships::Column::SourceMovieId.eq(source.value()))
            .filter(movie_relationships::Column::TargetMovieId.eq(target.value()))
            .filter(movie_relationships::Column::RelationType.eq(relation_type.as_str()))
            .count(&self.conn)
            .await?;
        Ok(count > 0)
    }

    pub async fn insert(
        &self,
        edge: &NewRelationship,
        now: DateTime<Utc>,
    ) -> anyhow::Result<MovieRelationship> {
        let stamp = to_timestamp(now);
        let result = MovieRelationships::insert(Self::to_active_model(edge, &stamp))
            .exec(&self.conn)
            .await?;

        Ok(MovieRelationship {
            id: result.last_insert_id,
            source_movie_id: edge.source,
            target_movie_id: edge.target,
            relation_type: edge.relation_type,
            confidence: edge.confidence,
            origin: edge.origin,
            created_at: parse_timestamp(&stamp).unwrap_or(now),
        })
    }

    /// Active targets of `source`'s edges of one type, in insertion order.
    pub async fn targets(
        &self,
        source: MovieId,
        relation_type: RelationType,
    ) -> anyhow::Result<Vec<Movie>> {
        let rows = MovieRelationships::find()
            .filter(movie_relationships::Column::SourceMovieId.eq(source.value()))
            .filter(movie_relationships::Column::RelationType.eq(relation_type.as_str()))
            .order_by_asc(movie_relationships::Column::Id)
            .find_also_related(Movies)
            .all(&self.conn)
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(_, target)| target)
            .filter(|target| target.is_active)
            .map(MovieRepository::map_model)
            .collect())
    }

    /// Provider ids of every movie with an edge pointing at `target`.
    pub async fn source_provider_ids(&self, target: MovieId) -> anyhow::Result<Vec<ProviderId>> {
        let sources: Vec<i32> = MovieRelationships::find()
            .filter(movie_relationships::Column::TargetMovieId.eq(target.value()))
            .all(&self.conn)
            .await?
            .into_iter()
            .map(|edge| edge.source_movie_id)
            .collect();

        if sources.is_empty() {
            return Ok(Vec::new());
        }

        let rows = Movies::find()
            .filter(movies::Column::Id.is_in(sources))
            .all(&self.conn)
            .await?;

        Ok(rows
            .into_iter()
            .map(|m| ProviderId::new(m.provider_id))
            .collect())
    }

    pub async fn count_by_origin(&self, origin: RelationOrigin) -> anyhow::Result<u64> {
        let count = MovieRelationships::find()
            .filter(movie_relationships::Column::Origin.eq(origin.as_str()))
            .count(&self.conn)
            .await?;
        Ok(count)
    }
}
