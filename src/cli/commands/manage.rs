use crate::domain::ProviderId;
use crate::services::CatalogService;
use crate::state::SharedState;

pub async fn cmd_deactivate(state: &SharedState, id: ProviderId) -> anyhow::Result<()> {
    state.catalog().deactivate(id).await?;
    println!("✓ Movie {id} deactivated");
    Ok(())
}

pub async fn cmd_reactivate(state: &SharedState, id: ProviderId) -> anyhow::Result<()> {
    state.catalog().reactivate(id).await?;
    println!("✓ Movie {id} reactivated");
    Ok(())
}

pub async fn cmd_delete(state: &SharedState, id: ProviderId) -> anyhow::Result<()> {
    state.catalog().delete(id).await?;
    println!("✓ Movie {id} deleted");
    Ok(())
}
