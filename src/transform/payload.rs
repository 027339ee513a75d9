//! Raw Provider payload shapes.
//!
//! Every field is optional and tolerant: a value of the wrong JSON type reads
//! as absent instead of failing the whole payload.

use serde::Deserialize;
use serde::de::{DeserializeOwned, Deserializer};
use serde_json::Value;

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Keeps the well-formed elements of an array, drops the rest.
fn lenient_list<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Array(items) => Some(
            items
                .into_iter()
                .filter_map(|item| serde_json::from_value(item).ok())
                .collect(),
        ),
        _ => None,
    })
}

#[derive(Debug, Default, Deserialize)]
pub struct RawMovie {
    #[serde(default, deserialize_with = "lenient")]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub original_title: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub overview: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub release_date: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub adult: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub popularity: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub vote_average: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub vote_count: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    pub original_language: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub poster_path: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub backdrop_path: Option<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub genre_ids: Option<Vec<i64>>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub genres: Option<Vec<RawGenre>>,
    #[serde(default, deserialize_with = "lenient")]
    pub tagline: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub runtime: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    pub budget: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    pub revenue: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    pub homepage: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub imdb_id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub external_ids: Option<RawExternalIds>,
    #[serde(default, deserialize_with = "lenient")]
    pub credits: Option<RawCredits>,
    #[serde(default, deserialize_with = "lenient")]
    pub videos: Option<RawVideos>,
    #[serde(default, deserialize_with = "lenient")]
    pub recommendations: Option<RawPage>,
    #[serde(default, deserialize_with = "lenient")]
    pub similar: Option<RawPage>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawGenre {
    #[serde(default, deserialize_with = "lenient")]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawGenreList {
    #[serde(default, deserialize_with = "lenient_list")]
    pub genres: Option<Vec<RawGenre>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawExternalIds {
    #[serde(default, deserialize_with = "lenient")]
    pub imdb_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawCredits {
    #[serde(default, deserialize_with = "lenient_list")]
    pub cast: Option<Vec<RawCastMember>>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub crew: Option<Vec<RawCrewMember>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawCastMember {
    #[serde(default, deserialize_with = "lenient")]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub character: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub order: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    pub profile_path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawCrewMember {
    #[serde(default, deserialize_with = "lenient")]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub job: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub department: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub profile_path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawVideos {
    #[serde(default, deserialize_with = "lenient_list")]
    pub results: Option<Vec<RawVideo>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawVideo {
    #[serde(default, deserialize_with = "lenient")]
    pub key: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub site: Option<String>,
    #[serde(rename = "type", default, deserialize_with = "lenient")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub official: Option<bool>,
}

/// One page of a listing (search, popular, recommendations, ...).
///
/// Results stay untyped so each entry can be transformed, and rejected,
/// on its own.
#[derive(Debug, Default, Deserialize)]
pub struct RawPage {
    #[serde(default, deserialize_with = "lenient")]
    pub page: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    pub total_pages: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    pub total_results: Option<i64>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub results: Option<Vec<Value>>,
}

/// The two shapes in which the Provider references a movie's genres.
#[derive(Debug)]
pub enum GenreRefs<'a> {
    /// Listing payloads: `"genre_ids": [28, 12]`.
    Ids(&'a [i64]),
    /// Detail payloads: `"genres": [{"id": 28, "name": "Action"}]`.
    Embedded(&'a [RawGenre]),
}

impl RawMovie {
    /// A non-empty id list wins over embedded objects.
    pub fn genre_refs(&self) -> GenreRefs<'_> {
        match (&self.genre_ids, &self.genres) {
            (Some(ids), _) if !ids.is_empty() => GenreRefs::Ids(ids),
            (_, Some(embedded)) => GenreRefs::Embedded(embedded),
            _ => GenreRefs::Ids(&[]),
        }
    }
}
