use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genre {
    pub id: i32,
    pub provider_id: i32,
    pub name: String,
    pub slug: String,
}

/// A named genre as reported by the Provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenreRecord {
    pub provider_id: i32,
    pub name: String,
    pub slug: String,
}

impl GenreRecord {
    /// Stand-in used when a movie references a genre the taxonomy sync has not
    /// delivered yet. A later taxonomy sync renames it in place.
    #[must_use]
    pub fn placeholder(provider_id: i32) -> Self {
        Self {
            provider_id,
            name: format!("Genre {provider_id}"),
            slug: format!("genre-{provider_id}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenreAssignment {
    pub genre: Genre,
    pub weight: f64,
    pub is_primary: bool,
}

/// A genre with the number of active movies filed under it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenreCount {
    pub genre: Genre,
    pub movie_count: u64,
}

/// Weight for the genre at `position` in provider order: 1.0, 0.9, 0.8, ...
/// floored at zero.
#[must_use]
pub fn default_weight(position: usize) -> f64 {
    let steps = u32::try_from(position.min(10)).unwrap_or(10);
    f64::from(10 - steps) / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weights_descend_and_floor() {
        assert!((default_weight(0) - 1.0).abs() < f64::EPSILON);
        assert!((default_weight(1) - 0.9).abs() < f64::EPSILON);
        assert!((default_weight(4) - 0.6).abs() < f64::EPSILON);
        assert!(default_weight(10).abs() < f64::EPSILON);
        assert!(default_weight(42).abs() < f64::EPSILON);
    }

    #[test]
    fn test_placeholder_genre_is_unique_per_id() {
        let genre = GenreRecord::placeholder(10752);
        assert_eq!(genre.name, "Genre 10752");
        assert_eq!(genre.slug, "genre-10752");
    }
}
