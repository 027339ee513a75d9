use crate::models::RelationOrigin;
use crate::state::SharedState;

pub async fn cmd_check(state: &SharedState) -> anyhow::Result<()> {
    println!("System Check");
    println!("{:-<60}", "");

    match state.store.ping().await {
        Ok(()) => println!("Database: ✓ {}", state.config.general.database_path),
        Err(e) => println!("Database: ✗ {e}"),
    }

    match state.provider.check_connection().await {
        Ok(()) => println!("Provider: ✓ {}", state.provider.base_url()),
        Err(e) => println!("Provider: ✗ {e}"),
    }

    println!("Cache:    {:?}", state.config.cache.backend);

    println!();
    println!("Catalog");
    println!("{:-<60}", "");

    let counts = state.store.movie_status_counts().await?;
    let total: i64 = counts.iter().map(|(_, count)| count).sum();
    println!("Movies:   {total}");
    for (status, count) in &counts {
        println!("  {status:<10} {count}");
    }

    let genres = state.store.list_genres().await?;
    println!("Genres:   {}", genres.len());

    let provider_edges = state
        .store
        .count_relationships(RelationOrigin::Provider)
        .await?;
    let internal_edges = state
        .store
        .count_relationships(RelationOrigin::Internal)
        .await?;
    println!("Edges:    {provider_edges} provider, {internal_edges} internal");

    Ok(())
}
