//! Formatted read payloads served to collaborators and memoized by the
//! response cache. Everything here is derived deterministically from stored
//! records so two reads of unchanged data serialize identically.

use crate::domain::{MovieId, ProviderId};
use crate::models::genre::GenreAssignment;
use crate::models::movie::{CastMember, Movie, ReleaseStatus, SyncStatus, VideoRef};
use crate::transform::{BasicMovieRecord, ImageSize, image_url};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

const OVERVIEW_PREVIEW_CHARS: usize = 200;
const DETAIL_CAST_LIMIT: usize = 10;
const PROVIDER_MOVIE_URL: &str = "https://www.themoviedb.org/movie";
const IMDB_TITLE_URL: &str = "https://www.imdb.com/title";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub total_pages: u32,
    pub total_results: u64,
    pub has_next: bool,
    pub has_previous: bool,
}

impl Pagination {
    #[must_use]
    pub const fn new(page: u32, total_pages: u32, total_results: u64) -> Self {
        Self {
            page,
            total_pages,
            total_results,
            has_next: page < total_pages,
            has_previous: page > 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PagedResult<T> {
    #[serde(flatten)]
    pub pagination: Pagination,
    pub results: Vec<T>,
}

impl<T> PagedResult<T> {
    #[must_use]
    pub const fn new(pagination: Pagination, results: Vec<T>) -> Self {
        Self {
            pagination,
            results,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenreView {
    pub provider_id: i32,
    pub name: String,
    pub slug: String,
    pub weight: f64,
    pub is_primary: bool,
}

impl From<&GenreAssignment> for GenreView {
    fn from(assignment: &GenreAssignment) -> Self {
        Self {
            provider_id: assignment.genre.provider_id,
            name: assignment.genre.name.clone(),
            slug: assignment.genre.slug.clone(),
            weight: assignment.weight,
            is_primary: assignment.is_primary,
        }
    }
}

/// List/search shaped view of a movie.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieSummary {
    pub provider_id: ProviderId,
    pub local_id: Option<MovieId>,
    pub title: String,
    pub overview: String,
    pub release_date: Option<NaiveDate>,
    pub year: Option<i32>,
    pub poster_url: Option<String>,
    pub backdrop_url: Option<String>,
    pub vote_average: f64,
    pub vote_count: i32,
    pub popularity: f64,
    pub genre_ids: Vec<i32>,
    pub adult: bool,
    pub sync_status: Option<SyncStatus>,
}

impl MovieSummary {
    #[must_use]
    pub fn from_movie(movie: &Movie, genre_ids: Vec<i32>, image_base: &str) -> Self {
        Self {
            provider_id: movie.provider_id,
            local_id: Some(movie.id),
            title: movie.title.clone(),
            overview: truncate_overview(&movie.overview, OVERVIEW_PREVIEW_CHARS),
            release_date: movie.release_date,
            year: movie.release_date.map(|d| d.year()),
            poster_url: image_url(image_base, ImageSize::W342, movie.poster_path.as_deref()),
            backdrop_url: image_url(image_base, ImageSize::W780, movie.backdrop_path.as_deref()),
            vote_average: movie.vote_average,
            vote_count: movie.vote_count,
            popularity: movie.popularity,
            genre_ids,
            adult: movie.adult,
            sync_status: Some(movie.sync_status),
        }
    }

    /// View of a Provider result that has no local record.
    #[must_use]
    pub fn from_record(record: &BasicMovieRecord, image_base: &str) -> Self {
        Self {
            provider_id: record.provider_id,
            local_id: None,
            title: record.title.clone(),
            overview: truncate_overview(&record.overview, OVERVIEW_PREVIEW_CHARS),
            release_date: record.release_date,
            year: record.release_date.map(|d| d.year()),
            poster_url: image_url(image_base, ImageSize::W342, record.poster_path.as_deref()),
            backdrop_url: image_url(image_base, ImageSize::W780, record.backdrop_path.as_deref()),
            vote_average: record.vote_average,
            vote_count: record.vote_count,
            popularity: record.popularity,
            genre_ids: record.genre_ids.clone(),
            adult: record.adult,
            sync_status: None,
        }
    }
}

/// Detail view of a stored movie.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieDetail {
    pub provider_id: ProviderId,
    pub local_id: MovieId,
    pub title: String,
    pub original_title: String,
    pub overview: String,
    pub tagline: Option<String>,
    pub release_date: Option<NaiveDate>,
    pub release_status: Option<ReleaseStatus>,
    pub runtime: Option<i32>,
    pub runtime_formatted: Option<String>,
    pub budget: Option<i64>,
    pub revenue: Option<i64>,
    pub profit: Option<i64>,
    pub homepage: Option<String>,
    pub imdb_id: Option<String>,
    pub imdb_url: Option<String>,
    pub provider_url: String,
    pub poster_url: Option<String>,
    pub backdrop_url: Option<String>,
    pub original_language: String,
    pub vote_average: f64,
    pub vote_count: i32,
    pub rating_stars: f64,
    pub popularity: f64,
    pub genres: Vec<GenreView>,
    pub primary_genre: Option<GenreView>,
    pub director: Option<String>,
    pub cast: Vec<CastMember>,
    pub main_trailer: Option<VideoRef>,
    pub trailer_url: Option<String>,
    pub trailer_embed_url: Option<String>,
    pub sync_status: SyncStatus,
    pub last_synced_at: Option<DateTime<Utc>>,
}

impl MovieDetail {
    #[must_use]
    pub fn build(movie: &Movie, assignments: &[GenreAssignment], image_base: &str) -> Self {
        let genres: Vec<GenreView> = assignments.iter().map(GenreView::from).collect();
        let primary_genre = genres.iter().find(|g| g.is_primary).cloned();
        let main_trailer = movie.videos.main_trailer.clone();

        Self {
            provider_id: movie.provider_id,
            local_id: movie.id,
            title: movie.title.clone(),
            original_title: movie.original_title.clone(),
            overview: movie.overview.clone(),
            tagline: movie.tagline.clone(),
            release_date: movie.release_date,
            release_status: movie.release_status,
            runtime: movie.runtime,
            runtime_formatted: format_runtime(movie.runtime),
            budget: movie.budget,
            revenue: movie.revenue,
            profit: profit(movie.budget, movie.revenue),
            homepage: movie.homepage.clone(),
            imdb_id: movie.imdb_id.clone(),
            imdb_url: movie
                .imdb_id
                .as_ref()
                .map(|id| format!("{IMDB_TITLE_URL}/{id}")),
            provider_url: format!("{PROVIDER_MOVIE_URL}/{}", movie.provider_id),
            poster_url: image_url(image_base, ImageSize::W500, movie.poster_path.as_deref()),
            backdrop_url: image_url(image_base, ImageSize::W1280, movie.backdrop_path.as_deref()),
            original_language: movie.original_language.clone(),
            vote_average: movie.vote_average,
            vote_count: movie.vote_count,
            rating_stars: rating_stars(movie.vote_average),
            popularity: movie.popularity,
            genres,
            primary_genre,
            director: movie.credits.director.clone(),
            cast: movie
                .credits
                .cast
                .iter()
                .take(DETAIL_CAST_LIMIT)
                .cloned()
                .collect(),
            trailer_url: main_trailer.as_ref().and_then(VideoRef::url),
            trailer_embed_url: main_trailer.as_ref().and_then(VideoRef::embed_url),
            main_trailer,
            sync_status: movie.sync_status,
            last_synced_at: movie.last_synced_at,
        }
    }
}

/// "2h 16m", or "45m" for short runtimes.
#[must_use]
pub fn format_runtime(minutes: Option<i32>) -> Option<String> {
    let minutes = minutes.filter(|m| *m > 0)?;
    let (hours, rest) = (minutes / 60, minutes % 60);
    if hours > 0 {
        Some(format!("{hours}h {rest}m"))
    } else {
        Some(format!("{rest}m"))
    }
}

/// Vote average on the five star scale, one decimal.
#[must_use]
pub fn rating_stars(vote_average: f64) -> f64 {
    (vote_average / 2.0 * 10.0).round() / 10.0
}

fn profit(budget: Option<i64>, revenue: Option<i64>) -> Option<i64> {
    match (budget, revenue) {
        (Some(b), Some(r)) if b > 0 && r > 0 => Some(r - b),
        _ => None,
    }
}

#[must_use]
pub fn truncate_overview(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut preview: String = text.chars().take(max_chars).collect();
    preview.push_str("...");
    preview
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_runtime() {
        assert_eq!(format_runtime(Some(136)), Some("2h 16m".to_string()));
        assert_eq!(format_runtime(Some(45)), Some("45m".to_string()));
        assert_eq!(format_runtime(Some(120)), Some("2h 0m".to_string()));
        assert_eq!(format_runtime(Some(0)), None);
        assert_eq!(format_runtime(None), None);
    }

    #[test]
    fn test_rating_stars_rounds_to_one_decimal() {
        assert!((rating_stars(8.2) - 4.1).abs() < 1e-9);
        assert!((rating_stars(7.44) - 3.7).abs() < 1e-9);
        assert!(rating_stars(0.0).abs() < 1e-9);
    }

    #[test]
    fn test_profit_requires_both_figures() {
        assert_eq!(profit(Some(10), Some(25)), Some(15));
        assert_eq!(profit(Some(0), Some(25)), None);
        assert_eq!(profit(None, Some(25)), None);
    }

    #[test]
    fn test_truncate_overview_is_char_safe() {
        let text = "é".repeat(250);
        let preview = truncate_overview(&text, 200);
        assert_eq!(preview.chars().count(), 203);
        assert!(preview.ends_with("..."));
        assert_eq!(truncate_overview("short", 200), "short");
    }

    #[test]
    fn test_pagination_flags() {
        let first = Pagination::new(1, 3, 55);
        assert!(first.has_next);
        assert!(!first.has_previous);

        let last = Pagination::new(3, 3, 55);
        assert!(!last.has_next);
        assert!(last.has_previous);
    }
}
