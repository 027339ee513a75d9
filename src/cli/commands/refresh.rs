use crate::services::CatalogService;
use crate::state::SharedState;

pub async fn cmd_refresh(state: &SharedState, limit: Option<usize>) -> anyhow::Result<()> {
    let limit = limit.unwrap_or(state.config.sync.refresh_batch_size);
    println!("Refreshing up to {limit} stale movie(s)...");

    let report = state.catalog().refresh_stale(limit).await?;

    if report.synced.is_empty() && report.failed.is_empty() {
        println!("✓ Catalog is up to date.");
        return Ok(());
    }

    for movie in &report.synced {
        println!("✓ {} {}", movie.provider_id, movie.title);
    }
    for id in &report.failed {
        println!("✗ {id}");
    }

    println!();
    println!(
        "Refreshed: {} | Failed: {}",
        report.synced.len(),
        report.failed.len()
    );
    Ok(())
}
