use super::print_summary;
use crate::domain::ProviderId;
use crate::models::RelationType;
use crate::services::CatalogService;
use crate::state::SharedState;

pub async fn cmd_related(
    state: &SharedState,
    id: ProviderId,
    similar: bool,
    limit: usize,
) -> anyhow::Result<()> {
    let relation_type = if similar {
        RelationType::ProviderSimilar
    } else {
        RelationType::ProviderRecommendation
    };

    let related = state
        .catalog()
        .related_movies(id, relation_type, limit)
        .await?;

    if related.is_empty() {
        println!("No related movies stored for {id}.");
        println!("Related titles are linked once they are in the catalog; try `sync` on them.");
        return Ok(());
    }

    println!("Related to {id} ({relation_type})");
    println!("{:-<60}", "");
    for summary in &related {
        print_summary(summary);
    }

    Ok(())
}
