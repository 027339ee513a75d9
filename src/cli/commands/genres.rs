use super::print_page;
use crate::services::CatalogService;
use crate::state::SharedState;
use tracing::warn;

pub async fn cmd_genres(state: &SharedState, slug: Option<&str>, page: u32) -> anyhow::Result<()> {
    if let Some(slug) = slug {
        let results = state.catalog().movies_by_genre(slug, page).await?;
        print_page(&format!("Genre: {slug}"), &results);
        return Ok(());
    }

    let genres = match state.catalog().sync_genre_taxonomy().await {
        Ok(genres) => genres,
        Err(e) if e.is_fatal() => return Err(e.into()),
        Err(e) => {
            warn!("Genre sync failed, showing local genres: {}", e);
            state.store.list_genres().await?
        }
    };

    if genres.is_empty() {
        println!("No genres stored yet.");
        return Ok(());
    }

    println!("Genres ({} total)", genres.len());
    println!("{:-<60}", "");
    for genre in &genres {
        println!("{:>6}  {:<24} {}", genre.provider_id, genre.name, genre.slug);
    }

    Ok(())
}

pub async fn cmd_popular_genres(state: &SharedState, limit: usize) -> anyhow::Result<()> {
    let ranked = state.reconciler().popular_genres(limit).await?;

    if ranked.is_empty() {
        println!("No genres with catalog movies yet.");
        return Ok(());
    }

    println!("Popular genres");
    println!("{:-<60}", "");
    for entry in &ranked {
        println!("{:>6}  {:<24} {}", entry.movie_count, entry.genre.name, entry.genre.slug);
    }

    Ok(())
}
