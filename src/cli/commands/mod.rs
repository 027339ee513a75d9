mod check;
mod genres;
mod manage;
mod refresh;
mod related;
mod search;
mod show;
mod sync;

pub use check::cmd_check;
pub use genres::{cmd_genres, cmd_popular_genres};
pub use manage::{cmd_deactivate, cmd_delete, cmd_reactivate};
pub use refresh::cmd_refresh;
pub use related::cmd_related;
pub use search::{cmd_discover, cmd_search};
pub use show::cmd_show;
pub use sync::cmd_sync;

use crate::models::{MovieSummary, PagedResult};

fn print_summary(summary: &MovieSummary) {
    let year = summary
        .year
        .map_or_else(|| "????".to_string(), |y| y.to_string());
    let status = summary
        .sync_status
        .map_or("remote", |s| s.as_str());

    println!("• {} ({year})", summary.title);
    println!(
        "  ID: {} | Rating: {:.1} ({} votes) | {status}",
        summary.provider_id, summary.vote_average, summary.vote_count
    );
}

fn print_page(heading: &str, page: &PagedResult<MovieSummary>) {
    if page.results.is_empty() {
        println!("No movies found.");
        return;
    }

    println!(
        "{heading} (page {}/{}, {} total)",
        page.pagination.page, page.pagination.total_pages, page.pagination.total_results
    );
    println!("{:-<60}", "");

    for summary in &page.results {
        print_summary(summary);
    }

    if page.pagination.has_next {
        println!();
        println!("More results: --page {}", page.pagination.page + 1);
    }
}
