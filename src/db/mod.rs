use crate::cache::CacheBackend;
use crate::domain::{MovieId, ProviderId};
use crate::models::{
    Genre, GenreAssignment, GenreCount, GenreRecord, Movie, MovieRelationship, NewRelationship,
    RelationOrigin, RelationType, StalenessPolicy,
};
use crate::transform::BasicMovieRecord;
use anyhow::Result;
use chrono::{DateTime, Utc};
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DatabaseTransaction, Statement,
    TransactionTrait,
};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub mod migrator;
pub mod repositories;

pub use repositories::cache::CacheRepository as DbCache;
pub use repositories::genre::GenreRepository;
pub use repositories::movie::{ChartOrder, MoviePage, MovieRepository};
pub use repositories::relationship::RelationshipRepository;
pub use repositories::{parse_timestamp, to_timestamp};

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url
                .trim_start_matches("sqlite://")
                .trim_start_matches("sqlite:");
            let path_str = path_str.split('?').next().unwrap_or(path_str);
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    /// Starts a transaction for multi-step writes that must land together.
    pub async fn begin(&self) -> Result<DatabaseTransaction> {
        Ok(self.conn.begin().await?)
    }

    /// Cache backend persisted in this database.
    #[must_use]
    pub fn cache_backend(&self) -> Arc<dyn CacheBackend> {
        Arc::new(self.cache_repo())
    }

    fn movie_repo(&self) -> MovieRepository {
        MovieRepository::new(self.conn.clone())
    }

    fn genre_repo(&self) -> GenreRepository {
        GenreRepository::new(self.conn.clone())
    }

    fn relationship_repo(&self) -> RelationshipRepository {
        RelationshipRepository::new(self.conn.clone())
    }

    fn cache_repo(&self) -> DbCache {
        DbCache::new(self.conn.clone())
    }

    // Movies

    pub async fn get_movie(&self, id: MovieId) -> Result<Option<Movie>> {
        self.movie_repo().get(id).await
    }

    pub async fn get_movie_by_provider_id(&self, provider_id: ProviderId) -> Result<Option<Movie>> {
        self.movie_repo().get_by_provider_id(provider_id).await
    }

    pub async fn get_movies_by_provider_ids(
        &self,
        provider_ids: &[ProviderId],
    ) -> Result<HashMap<ProviderId, Movie>> {
        self.movie_repo()
            .get_many_by_provider_ids(provider_ids)
            .await
    }

    pub async fn insert_partial_movie(
        &self,
        record: &BasicMovieRecord,
        now: DateTime<Utc>,
    ) -> Result<Movie> {
        self.movie_repo().insert_partial(record, now).await
    }

    pub async fn record_sync_failure(
        &self,
        provider_id: ProviderId,
        error: &str,
        mark_failed: bool,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.movie_repo()
            .record_sync_failure(provider_id, error, mark_failed, now)
            .await
    }

    pub async fn set_movie_active(
        &self,
        provider_id: ProviderId,
        active: bool,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        self.movie_repo()
            .set_active(provider_id, active, now)
            .await
    }

    pub async fn delete_movie(&self, id: MovieId) -> Result<bool> {
        self.movie_repo().delete(id).await
    }

    pub async fn search_movies_by_title(
        &self,
        query: &str,
        page: u64,
        page_size: u64,
    ) -> Result<MoviePage> {
        self.movie_repo()
            .search_by_title(query, page, page_size)
            .await
    }

    pub async fn list_active_movies(
        &self,
        order: ChartOrder,
        page: u64,
        page_size: u64,
    ) -> Result<MoviePage> {
        self.movie_repo().list_active(order, page, page_size).await
    }

    pub async fn list_movies_by_genre(
        &self,
        genre_id: i32,
        page: u64,
        page_size: u64,
    ) -> Result<MoviePage> {
        self.movie_repo()
            .list_by_genre(genre_id, page, page_size)
            .await
    }

    pub async fn stale_movies(
        &self,
        policy: &StalenessPolicy,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Movie>> {
        self.movie_repo()
            .stale_candidates(policy, now, limit)
            .await
    }

    pub async fn movie_status_counts(&self) -> Result<Vec<(String, i64)>> {
        self.movie_repo().status_counts().await
    }

    // Genres

    pub async fn upsert_genres(&self, records: &[GenreRecord]) -> Result<usize> {
        self.genre_repo().upsert(records).await
    }

    pub async fn list_genres(&self) -> Result<Vec<Genre>> {
        self.genre_repo().list().await
    }

    pub async fn popular_genres(&self, limit: usize) -> Result<Vec<GenreCount>> {
        self.genre_repo().popular(limit).await
    }

    pub async fn get_genre_by_slug(&self, slug: &str) -> Result<Option<Genre>> {
        self.genre_repo().get_by_slug(slug).await
    }

    pub async fn ensure_genres(&self, provider_ids: &[i32]) -> Result<Vec<Genre>> {
        GenreRepository::ensure(&self.conn, provider_ids).await
    }

    pub async fn genre_assignments(&self, movie_id: MovieId) -> Result<Vec<GenreAssignment>> {
        self.genre_repo().assignments_for(movie_id).await
    }

    pub async fn provider_genre_ids_for(
        &self,
        movie_ids: &[MovieId],
    ) -> Result<HashMap<MovieId, Vec<i32>>> {
        self.genre_repo().provider_genre_ids_for(movie_ids).await
    }

    pub async fn set_primary_genre(
        &self,
        movie_id: MovieId,
        genre: &Genre,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.genre_repo().set_primary(movie_id, genre, now).await
    }

    // Relationships

    pub async fn relationship_exists(
        &self,
        source: MovieId,
        target: MovieId,
        relation_type: RelationType,
    ) -> Result<bool> {
        self.relationship_repo()
            .exists(source, target, relation_type)
            .await
    }

    pub async fn insert_relationship(
        &self,
        edge: &NewRelationship,
        now: DateTime<Utc>,
    ) -> Result<MovieRelationship> {
        self.relationship_repo().insert(edge, now).await
    }

    pub async fn related_targets(
        &self,
        source: MovieId,
        relation_type: RelationType,
    ) -> Result<Vec<Movie>> {
        self.relationship_repo()
            .targets(source, relation_type)
            .await
    }

    pub async fn relationship_sources(&self, target: MovieId) -> Result<Vec<ProviderId>> {
        self.relationship_repo().source_provider_ids(target).await
    }

    pub async fn count_relationships(&self, origin: RelationOrigin) -> Result<u64> {
        self.relationship_repo().count_by_origin(origin).await
    }
}
