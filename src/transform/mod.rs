//! Pure mapping from raw Provider payloads to domain-shaped records.
//!
//! Nothing in here performs I/O. Optional fields default to empty values;
//! only a missing or unusable movie id rejects a payload.

mod payload;

use crate::domain::ProviderId;
use crate::models::genre::GenreRecord;
use crate::models::movie::{CastMember, Credits, CrewMember, ReleaseStatus, VideoRef, Videos};
use crate::models::views::Pagination;
use chrono::NaiveDate;
use payload::{GenreRefs, RawCredits, RawGenreList, RawMovie, RawPage, RawVideos};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use thiserror::Error;

pub const DEFAULT_RELATED_LIMIT: usize = 20;
const CAST_LIMIT: usize = 20;
const UNKNOWN_CAST_ORDER: i64 = 999;
const TRAILER_LIMIT: usize = 3;
const TEASER_LIMIT: usize = 2;
const KEY_CREW_JOBS: [&str; 5] = [
    "Director",
    "Screenplay",
    "Writer",
    "Producer",
    "Original Music Composer",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransformError {
    #[error("malformed payload: {0}")]
    Malformed(String),

    #[error("payload is missing required field `{0}`")]
    MissingField(&'static str),

    #[error("invalid value for `{field}`: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

/// Fields present in every listing, search and detail payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasicMovieRecord {
    pub provider_id: ProviderId,
    pub title: String,
    pub original_title: String,
    pub overview: String,
    pub release_date: Option<NaiveDate>,
    pub adult: bool,
    pub popularity: f64,
    pub vote_average: f64,
    pub vote_count: i32,
    pub original_language: String,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub genre_ids: Vec<i32>,
}

/// Everything a detail fetch yields.
///
/// `recommendation_ids` and `similar_ids` are `None` when the payload did not
/// include that section at all, which is different from an empty section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompleteMovieRecord {
    pub basic: BasicMovieRecord,
    pub tagline: Option<String>,
    pub release_status: Option<ReleaseStatus>,
    pub runtime: Option<i32>,
    pub budget: Option<i64>,
    pub revenue: Option<i64>,
    pub homepage: Option<String>,
    pub imdb_id: Option<String>,
    pub genres: Vec<GenreRecord>,
    pub credits: Credits,
    pub videos: Videos,
    pub recommendation_ids: Option<Vec<ProviderId>>,
    pub similar_ids: Option<Vec<ProviderId>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    pub pagination: Pagination,
    pub records: Vec<BasicMovieRecord>,
    /// Entries dropped because they had no usable id.
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSize {
    W92,
    W154,
    W185,
    W342,
    W500,
    W780,
    W1280,
    H632,
    Original,
}

impl ImageSize {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::W92 => "w92",
            Self::W154 => "w154",
            Self::W185 => "w185",
            Self::W342 => "w342",
            Self::W500 => "w500",
            Self::W780 => "w780",
            Self::W1280 => "w1280",
            Self::H632 => "h632",
            Self::Original => "original",
        }
    }
}

fn raw_movie(payload: &Value) -> Result<RawMovie, TransformError> {
    if !payload.is_object() {
        return Err(TransformError::Malformed(
            "expected a JSON object".to_string(),
        ));
    }
    RawMovie::deserialize(payload).map_err(|e| TransformError::Malformed(e.to_string()))
}

fn raw_page(payload: &Value) -> Result<RawPage, TransformError> {
    if !payload.is_object() {
        return Err(TransformError::Malformed(
            "expected a JSON object".to_string(),
        ));
    }
    RawPage::deserialize(payload).map_err(|e| TransformError::Malformed(e.to_string()))
}

pub fn basic_movie(payload: &Value) -> Result<BasicMovieRecord, TransformError> {
    let raw = raw_movie(payload)?;
    basic_from_raw(&raw)
}

fn basic_from_raw(raw: &RawMovie) -> Result<BasicMovieRecord, TransformError> {
    let provider_id = provider_id(raw.id)?;
    let title = non_blank(raw.title.as_deref());
    let original_title = non_blank(raw.original_title.as_deref());

    Ok(BasicMovieRecord {
        provider_id,
        title: title.clone().or_else(|| original_title.clone()).unwrap_or_default(),
        original_title: original_title.or(title).unwrap_or_default(),
        overview: raw.overview.as_deref().map(str::trim).unwrap_or_default().to_string(),
        release_date: parse_date(raw.release_date.as_deref()),
        adult: raw.adult.unwrap_or(false),
        popularity: raw.popularity.unwrap_or(0.0),
        vote_average: raw.vote_average.unwrap_or(0.0),
        vote_count: raw
            .vote_count
            .and_then(|c| i32::try_from(c).ok())
            .unwrap_or(0),
        original_language: non_blank(raw.original_language.as_deref())
            .unwrap_or_else(|| "en".to_string()),
        poster_path: non_blank(raw.poster_path.as_deref()),
        backdrop_path: non_blank(raw.backdrop_path.as_deref()),
        genre_ids: normalize_genre_ids(&raw.genre_refs()),
    })
}

pub fn complete_movie(
    payload: &Value,
    related_limit: usize,
) -> Result<CompleteMovieRecord, TransformError> {
    let raw = raw_movie(payload)?;
    let basic = basic_from_raw(&raw)?;

    let genres = match raw.genre_refs() {
        GenreRefs::Embedded(embedded) => embedded
            .iter()
            .filter_map(|g| genre_record(g.id, g.name.as_deref()))
            .collect(),
        GenreRefs::Ids(_) => Vec::new(),
    };

    let imdb_id = non_blank(raw.imdb_id.as_deref()).or_else(|| {
        raw.external_ids
            .as_ref()
            .and_then(|ids| non_blank(ids.imdb_id.as_deref()))
    });

    Ok(CompleteMovieRecord {
        basic,
        tagline: non_blank(raw.tagline.as_deref()),
        release_status: raw.status.as_deref().and_then(ReleaseStatus::from_provider),
        runtime: positive(raw.runtime).and_then(|r| i32::try_from(r).ok()),
        budget: positive(raw.budget),
        revenue: positive(raw.revenue),
        homepage: non_blank(raw.homepage.as_deref()),
        imdb_id,
        genres,
        credits: credits_from_raw(raw.credits.as_ref()),
        videos: videos_from_raw(raw.videos.as_ref()),
        recommendation_ids: raw
            .recommendations
            .as_ref()
            .map(|page| ids_from_page(page, related_limit)),
        similar_ids: raw
            .similar
            .as_ref()
            .map(|page| ids_from_page(page, related_limit)),
    })
}

/// A search/popular/trending page. Entries without a usable id are skipped.
pub fn listing(payload: &Value) -> Result<Listing, TransformError> {
    let page = raw_page(payload)?;
    let mut records = Vec::new();
    let mut skipped = 0;

    for entry in page.results.as_deref().unwrap_or_default() {
        match basic_movie(entry) {
            Ok(record) => records.push(record),
            Err(_) => skipped += 1,
        }
    }

    Ok(Listing {
        pagination: pagination(&page),
        records,
        skipped,
    })
}

/// The genre taxonomy payload: `{"genres": [{"id": 28, "name": "Action"}]}`.
pub fn genre_list(payload: &Value) -> Result<Vec<GenreRecord>, TransformError> {
    if !payload.is_object() {
        return Err(TransformError::Malformed(
            "expected a JSON object".to_string(),
        ));
    }
    let raw = RawGenreList::deserialize(payload)
        .map_err(|e| TransformError::Malformed(e.to_string()))?;

    Ok(raw
        .genres
        .unwrap_or_default()
        .iter()
        .filter_map(|g| genre_record(g.id, g.name.as_deref()))
        .collect())
}

/// Credits section of a detail payload, or a standalone credits payload.
#[must_use]
pub fn credits(payload: &Value) -> Credits {
    let raw = RawCredits::deserialize(payload).ok();
    credits_from_raw(raw.as_ref())
}

/// Videos section of a detail payload, or a standalone videos payload.
#[must_use]
pub fn videos(payload: &Value) -> Videos {
    let raw = RawVideos::deserialize(payload).ok();
    videos_from_raw(raw.as_ref())
}

/// Ids of a standalone recommendations or similar page.
pub fn related_ids(payload: &Value, limit: usize) -> Result<Vec<ProviderId>, TransformError> {
    let page = raw_page(payload)?;
    Ok(ids_from_page(&page, limit))
}

fn credits_from_raw(raw: Option<&RawCredits>) -> Credits {
    let Some(raw) = raw else {
        return Credits::default();
    };

    let mut cast: Vec<(i64, CastMember)> = raw
        .cast
        .as_deref()
        .unwrap_or_default()
        .iter()
        .filter_map(|member| {
            let provider_id = member.id.and_then(|id| i32::try_from(id).ok())?;
            let name = non_blank(member.name.as_deref())?;
            let order = member.order.unwrap_or(UNKNOWN_CAST_ORDER);
            Some((
                order,
                CastMember {
                    provider_id,
                    name,
                    character: member.character.clone().unwrap_or_default(),
                    order: i32::try_from(order).unwrap_or(i32::MAX),
                    profile_path: non_blank(member.profile_path.as_deref()),
                },
            ))
        })
        .collect();
    cast.sort_by_key(|(order, _)| *order);

    let crew: Vec<CrewMember> = raw
        .crew
        .as_deref()
        .unwrap_or_default()
        .iter()
        .filter_map(|member| {
            let job = member.job.as_deref()?;
            if !KEY_CREW_JOBS.contains(&job) {
                return None;
            }
            Some(CrewMember {
                provider_id: member.id.and_then(|id| i32::try_from(id).ok())?,
                name: non_blank(member.name.as_deref())?,
                job: job.to_string(),
                department: member.department.clone().unwrap_or_default(),
                profile_path: non_blank(member.profile_path.as_deref()),
            })
        })
        .collect();

    let director = crew
        .iter()
        .find(|member| member.job == "Director")
        .map(|member| member.name.clone());

    Credits {
        cast: cast
            .into_iter()
            .take(CAST_LIMIT)
            .map(|(_, member)| member)
            .collect(),
        crew,
        director,
    }
}

fn videos_from_raw(raw: Option<&RawVideos>) -> Videos {
    let all: Vec<VideoRef> = raw
        .and_then(|v| v.results.as_deref())
        .unwrap_or_default()
        .iter()
        .filter_map(|video| {
            Some(VideoRef {
                key: non_blank(video.key.as_deref())?,
                name: video.name.clone().unwrap_or_default(),
                site: video.site.clone().unwrap_or_default(),
                kind: video.kind.clone().unwrap_or_default(),
                official: video.official.unwrap_or(false),
            })
        })
        .collect();

    let trailers: Vec<VideoRef> = all
        .iter()
        .filter(|v| v.kind == "Trailer")
        .take(TRAILER_LIMIT)
        .cloned()
        .collect();
    let teasers: Vec<VideoRef> = all
        .iter()
        .filter(|v| v.kind == "Teaser")
        .take(TEASER_LIMIT)
        .cloned()
        .collect();
    let main_trailer = trailers
        .iter()
        .find(|v| v.site == "YouTube")
        .or_else(|| trailers.first())
        .cloned();

    Videos {
        trailers,
        teasers,
        main_trailer,
    }
}

fn ids_from_page(page: &RawPage, limit: usize) -> Vec<ProviderId> {
    let mut seen = HashSet::new();
    page.results
        .as_deref()
        .unwrap_or_default()
        .iter()
        .filter_map(|entry| entry.get("id").and_then(Value::as_i64))
        .filter_map(|id| provider_id(Some(id)).ok())
        .filter(|id| seen.insert(*id))
        .take(limit)
        .collect()
}

fn pagination(page: &RawPage) -> Pagination {
    let current = page
        .page
        .and_then(|p| u32::try_from(p).ok())
        .unwrap_or(1)
        .max(1);
    let total_pages = page
        .total_pages
        .and_then(|p| u32::try_from(p).ok())
        .unwrap_or(0);
    let total_results = page
        .total_results
        .and_then(|r| u64::try_from(r).ok())
        .unwrap_or(0);
    Pagination::new(current, total_pages, total_results)
}

/// Both genre reference shapes collapse into an ordered, duplicate-free list
/// of provider genre ids.
fn normalize_genre_ids(refs: &GenreRefs<'_>) -> Vec<i32> {
    let raw_ids: Vec<i64> = match refs {
        GenreRefs::Ids(ids) => ids.to_vec(),
        GenreRefs::Embedded(genres) => genres.iter().filter_map(|g| g.id).collect(),
    };

    let mut seen = HashSet::new();
    raw_ids
        .into_iter()
        .filter_map(|id| i32::try_from(id).ok())
        .filter(|id| *id > 0 && seen.insert(*id))
        .collect()
}

fn genre_record(id: Option<i64>, name: Option<&str>) -> Option<GenreRecord> {
    let provider_id = id.and_then(|id| i32::try_from(id).ok()).filter(|id| *id > 0)?;
    let name = non_blank(name)?;
    Some(GenreRecord {
        provider_id,
        slug: slugify(&name),
        name,
    })
}

fn provider_id(raw: Option<i64>) -> Result<ProviderId, TransformError> {
    let id = raw.ok_or(TransformError::MissingField("id"))?;
    match i32::try_from(id) {
        Ok(id) if id > 0 => Ok(ProviderId::new(id)),
        _ => Err(TransformError::InvalidField {
            field: "id",
            reason: format!("{id} is not a valid provider id"),
        }),
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn positive(value: Option<i64>) -> Option<i64> {
    value.filter(|v| *v > 0)
}

/// Calendar dates arrive as `YYYY-MM-DD`; anything else reads as unknown.
#[must_use]
pub fn parse_date(raw: Option<&str>) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw?.trim(), "%Y-%m-%d").ok()
}

/// "Action & Adventure" becomes "action-and-adventure".
#[must_use]
pub fn slugify(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .replace('&', "and")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

/// Full image URL for a stored relative path. Paths are never stored
/// expanded; this is computed on read.
#[must_use]
pub fn image_url(base: &str, size: ImageSize, path: Option<&str>) -> Option<String> {
    let path = path.map(str::trim).filter(|p| !p.is_empty())?;
    let base = base.trim_end_matches('/');
    let separator = if path.starts_with('/') { "" } else { "/" };
    Some(format!("{base}/{}{separator}{path}", size.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn detail_payload() -> Value {
        json!({
            "id": 603,
            "title": "The Matrix",
            "original_title": "The Matrix",
            "overview": "Set in the 22nd century...",
            "release_date": "1999-03-30",
            "adult": false,
            "popularity": 81.2,
            "vote_average": 8.2,
            "vote_count": 25000,
            "original_language": "en",
            "poster_path": "/f89U3ADr1oiB1s9GkdPOEpXUk5H.jpg",
            "backdrop_path": "",
            "genres": [{"id": 28, "name": "Action"}, {"id": 878, "name": "Science Fiction"}],
            "tagline": "Welcome to the Real World.",
            "status": "Released",
            "runtime": 136,
            "budget": 63_000_000,
            "revenue": 463_517_383,
            "homepage": "",
            "imdb_id": "tt0133093",
            "credits": {
                "cast": [
                    {"id": 6384, "name": "Keanu Reeves", "character": "Neo", "order": 0},
                    {"id": 2975, "name": "Laurence Fishburne", "character": "Morpheus", "order": 1},
                    {"id": 530, "name": "Carrie-Anne Moss", "character": "Trinity"}
                ],
                "crew": [
                    {"id": 9340, "name": "Lana Wachowski", "job": "Director", "department": "Directing"},
                    {"id": 1, "name": "Someone", "job": "Gaffer", "department": "Lighting"}
                ]
            },
            "videos": {
                "results": [
                    {"key": "vimeo1", "name": "Trailer A", "site": "Vimeo", "type": "Trailer"},
                    {"key": "yt1", "name": "Trailer B", "site": "YouTube", "type": "Trailer", "official": true},
                    {"key": "yt2", "name": "Teaser", "site": "YouTube", "type": "Teaser"},
                    {"key": "clip", "name": "Clip", "site": "YouTube", "type": "Clip"}
                ]
            },
            "recommendations": {"page": 1, "results": [{"id": 604}, {"id": 605}, {"id": 604}, {"title": "no id"}]},
        })
    }

    #[test]
    fn test_complete_movie_maps_detail_payload() {
        let record = complete_movie(&detail_payload(), DEFAULT_RELATED_LIMIT).unwrap();

        assert_eq!(record.basic.provider_id, ProviderId::new(603));
        assert_eq!(record.basic.release_date, NaiveDate::from_ymd_opt(1999, 3, 30));
        assert_eq!(record.basic.genre_ids, vec![28, 878]);
        assert_eq!(record.basic.backdrop_path, None);
        assert_eq!(record.release_status, Some(ReleaseStatus::Released));
        assert_eq!(record.runtime, Some(136));
        assert_eq!(record.homepage, None);
        assert_eq!(record.imdb_id.as_deref(), Some("tt0133093"));
        assert_eq!(record.genres.len(), 2);
        assert_eq!(record.genres[1].slug, "science-fiction");
    }

    #[test]
    fn test_credits_are_ordered_and_director_extracted() {
        let record = complete_movie(&detail_payload(), DEFAULT_RELATED_LIMIT).unwrap();
        let names: Vec<&str> = record
            .credits
            .cast
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, ["Keanu Reeves", "Laurence Fishburne", "Carrie-Anne Moss"]);
        assert_eq!(record.credits.cast[2].order, 999);
        assert_eq!(record.credits.director.as_deref(), Some("Lana Wachowski"));
        assert_eq!(record.credits.crew.len(), 1);
    }

    #[test]
    fn test_main_trailer_prefers_youtube() {
        let record = complete_movie(&detail_payload(), DEFAULT_RELATED_LIMIT).unwrap();
        assert_eq!(record.videos.trailers.len(), 2);
        assert_eq!(record.videos.teasers.len(), 1);
        let main = record.videos.main_trailer.unwrap();
        assert_eq!(main.key, "yt1");
        assert_eq!(
            main.url().as_deref(),
            Some("https://www.youtube.com/watch?v=yt1")
        );
    }

    #[test]
    fn test_related_ids_distinguish_absent_from_empty() {
        let record = complete_movie(&detail_payload(), DEFAULT_RELATED_LIMIT).unwrap();
        assert_eq!(
            record.recommendation_ids,
            Some(vec![ProviderId::new(604), ProviderId::new(605)])
        );
        assert_eq!(record.similar_ids, None);

        let mut payload = detail_payload();
        payload["similar"] = json!({"results": []});
        let record = complete_movie(&payload, DEFAULT_RELATED_LIMIT).unwrap();
        assert_eq!(record.similar_ids, Some(vec![]));
    }

    #[test]
    fn test_related_ids_respect_limit() {
        let results: Vec<Value> = (1..=30).map(|id| json!({"id": id})).collect();
        let ids = related_ids(&json!({"results": results}), 20).unwrap();
        assert_eq!(ids.len(), 20);
        assert_eq!(ids[0], ProviderId::new(1));
    }

    #[test]
    fn test_both_genre_shapes_normalize_to_ids() {
        let listing_shape = basic_movie(&json!({"id": 1, "genre_ids": [18, 80, 18]})).unwrap();
        let detail_shape = basic_movie(&json!({
            "id": 1,
            "genres": [{"id": 18, "name": "Drama"}, {"id": 80, "name": "Crime"}]
        }))
        .unwrap();

        assert_eq!(listing_shape.genre_ids, vec![18, 80]);
        assert_eq!(detail_shape.genre_ids, listing_shape.genre_ids);

        let neither = basic_movie(&json!({"id": 1, "genre_ids": []})).unwrap();
        assert!(neither.genre_ids.is_empty());
    }

    #[test]
    fn test_missing_optional_fields_default() {
        let record = basic_movie(&json!({"id": 42})).unwrap();
        assert_eq!(record.title, "");
        assert_eq!(record.overview, "");
        assert_eq!(record.original_language, "en");
        assert_eq!(record.vote_count, 0);
        assert!(record.release_date.is_none());
        assert!(record.poster_path.is_none());
    }

    #[test]
    fn test_wrong_types_read_as_absent() {
        let record = basic_movie(&json!({
            "id": 42,
            "title": 17,
            "original_title": "Fallback",
            "vote_count": "lots",
            "popularity": null,
            "genre_ids": [12, "x", 14],
        }))
        .unwrap();
        assert_eq!(record.title, "Fallback");
        assert_eq!(record.vote_count, 0);
        assert_eq!(record.genre_ids, vec![12, 14]);
    }

    #[test]
    fn test_missing_or_invalid_id_is_rejected() {
        assert_eq!(
            basic_movie(&json!({"title": "Nameless"})),
            Err(TransformError::MissingField("id"))
        );
        assert!(matches!(
            basic_movie(&json!({"id": -3})),
            Err(TransformError::InvalidField { field: "id", .. })
        ));
        assert!(matches!(
            basic_movie(&json!(["not", "an", "object"])),
            Err(TransformError::Malformed(_))
        ));
    }

    #[test]
    fn test_malformed_dates_become_none() {
        assert_eq!(parse_date(Some("2024-02-30")), None);
        assert_eq!(parse_date(Some("")), None);
        assert_eq!(parse_date(Some("03/30/1999")), None);
        assert_eq!(parse_date(None), None);
        assert_eq!(
            parse_date(Some("2010-07-16")),
            NaiveDate::from_ymd_opt(2010, 7, 16)
        );
    }

    #[test]
    fn test_zero_runtime_means_unknown() {
        let record = complete_movie(&json!({"id": 7, "runtime": 0}), 20).unwrap();
        assert_eq!(record.runtime, None);
    }

    #[test]
    fn test_listing_skips_entries_without_id() {
        let listing = listing(&json!({
            "page": 2,
            "total_pages": 5,
            "total_results": 93,
            "results": [{"id": 1, "title": "A"}, {"title": "B"}, {"id": 3, "title": "C"}]
        }))
        .unwrap();

        assert_eq!(listing.records.len(), 2);
        assert_eq!(listing.skipped, 1);
        assert_eq!(listing.pagination.page, 2);
        assert!(listing.pagination.has_next);
        assert!(listing.pagination.has_previous);
    }

    #[test]
    fn test_genre_list_builds_slugs() {
        let genres = genre_list(&json!({
            "genres": [
                {"id": 10759, "name": "Action & Adventure"},
                {"id": 99, "name": "  Documentary "},
                {"id": 5, "name": ""},
                {"name": "No Id"}
            ]
        }))
        .unwrap();

        assert_eq!(genres.len(), 2);
        assert_eq!(genres[0].slug, "action-and-adventure");
        assert_eq!(genres[1].name, "Documentary");
    }

    #[test]
    fn test_image_url_is_derived() {
        let base = "https://image.tmdb.org/t/p/";
        assert_eq!(
            image_url(base, ImageSize::W500, Some("/abc.jpg")).as_deref(),
            Some("https://image.tmdb.org/t/p/w500/abc.jpg")
        );
        assert_eq!(
            image_url("https://img.example", ImageSize::Original, Some("abc.jpg")).as_deref(),
            Some("https://img.example/original/abc.jpg")
        );
        assert_eq!(image_url(base, ImageSize::W500, Some("  ")), None);
        assert_eq!(image_url(base, ImageSize::W500, None), None);
    }
}
