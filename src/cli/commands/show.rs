use crate::domain::ProviderId;
use crate::models::views::truncate_overview;
use crate::services::CatalogService;
use crate::state::SharedState;

pub async fn cmd_show(state: &SharedState, id: ProviderId, force: bool) -> anyhow::Result<()> {
    let detail = state.catalog().movie_details(id, force).await?;

    println!("Movie Info");
    println!("{:-<60}", "");
    println!("Title:    {}", detail.title);
    if detail.original_title != detail.title {
        println!("Original: {}", detail.original_title);
    }
    if let Some(tagline) = &detail.tagline {
        println!("Tagline:  {tagline}");
    }
    println!("ID:       {} (local {})", detail.provider_id, detail.local_id);
    if let Some(date) = detail.release_date {
        let status = detail.release_status.map_or("", |s| s.as_str());
        println!("Released: {date} {status}");
    }
    if let Some(runtime) = &detail.runtime_formatted {
        println!("Runtime:  {runtime}");
    }
    println!(
        "Rating:   {:.1}/10 ({} votes, {:.1} stars)",
        detail.vote_average, detail.vote_count, detail.rating_stars
    );

    if !detail.genres.is_empty() {
        let names: Vec<&str> = detail.genres.iter().map(|g| g.name.as_str()).collect();
        println!("Genres:   {}", names.join(", "));
    }
    if let Some(director) = &detail.director {
        println!("Director: {director}");
    }
    if !detail.cast.is_empty() {
        let names: Vec<&str> = detail.cast.iter().take(5).map(|c| c.name.as_str()).collect();
        println!("Cast:     {}", names.join(", "));
    }
    if let Some(profit) = detail.profit {
        println!("Profit:   ${profit}");
    }
    if let Some(url) = &detail.trailer_url {
        println!("Trailer:  {url}");
    }
    if let Some(url) = &detail.imdb_url {
        println!("IMDb:     {url}");
    }
    println!("TMDb:     {}", detail.provider_url);

    if !detail.overview.is_empty() {
        println!();
        println!("{}", truncate_overview(&detail.overview, 400));
    }

    println!();
    match detail.last_synced_at {
        Some(at) => println!("Sync:     {} at {}", detail.sync_status, at.format("%Y-%m-%d %H:%M")),
        None => println!("Sync:     {}", detail.sync_status),
    }

    Ok(())
}
