use super::print_page;
use crate::services::{CatalogService, DiscoverList};
use crate::state::SharedState;

pub async fn cmd_search(
    state: &SharedState,
    query: &str,
    page: u32,
    store_results: bool,
) -> anyhow::Result<()> {
    println!("Searching for: {query}");
    println!();

    let results = state
        .catalog()
        .search_and_store(query, page, store_results)
        .await?;

    print_page("Search Results", &results);
    Ok(())
}

pub async fn cmd_discover(
    state: &SharedState,
    list: DiscoverList,
    page: u32,
    store_results: bool,
) -> anyhow::Result<()> {
    let results = state.catalog().discover(list, page, store_results).await?;

    print_page(&format!("Discover: {list}"), &results);
    Ok(())
}
