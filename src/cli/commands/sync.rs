use crate::domain::ProviderId;
use crate::services::CatalogService;
use crate::state::SharedState;

pub async fn cmd_sync(state: &SharedState, ids: &[ProviderId]) -> anyhow::Result<()> {
    println!("Syncing {} movie(s)...", ids.len());

    let report = state.catalog().bulk_sync(ids).await?;

    for movie in &report.synced {
        println!("✓ {} [{}] {}", movie.provider_id, movie.sync_status, movie.title);
    }
    for id in &report.failed {
        let reason = match state.store.get_movie_by_provider_id(*id).await? {
            Some(movie) => movie
                .last_sync_error
                .unwrap_or_else(|| format!("status {}", movie.sync_status)),
            None => "not found".to_string(),
        };
        println!("✗ {id}: {reason}");
    }

    println!();
    println!(
        "Synced: {} | Failed: {}",
        report.synced.len(),
        report.failed.len()
    );
    Ok(())
}
