use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let conn = manager.get_connection();

        conn.execute_unprepared(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_movie_genres_pair ON movie_genres(movie_id, genre_id)",
        )
        .await?;

        // At most one primary genre per movie.
        conn.execute_unprepared(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_movie_genres_primary ON movie_genres(movie_id) WHERE is_primary = 1",
        )
        .await?;

        conn.execute_unprepared(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_movie_relationships_edge ON movie_relationships(source_movie_id, target_movie_id, relation_type)",
        )
        .await?;

        conn.execute_unprepared(
            "CREATE INDEX IF NOT EXISTS idx_movie_relationships_source ON movie_relationships(source_movie_id, relation_type)",
        )
        .await?;

        conn.execute_unprepared(
            "CREATE INDEX IF NOT EXISTS idx_movies_sync ON movies(is_active, sync_status, last_synced_at)",
        )
        .await?;

        conn.execute_unprepared(
            "CREATE INDEX IF NOT EXISTS idx_cache_entries_expires ON cache_entries(expires_at)",
        )
        .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let conn = manager.get_connection();

        for index in [
            "idx_cache_entries_expires",
            "idx_movies_sync",
            "idx_movie_relationships_source",
            "idx_movie_relationships_edge",
            "idx_movie_genres_primary",
            "idx_movie_genres_pair",
        ] {
            conn.execute_unprepared(&format!("DROP INDEX IF EXISTS {index}"))
                .await?;
        }

        Ok(())
    }
}
