pub mod prelude;

pub mod cache_entries;
pub mod genres;
pub mod movie_genres;
pub mod movie_relationships;
pub mod movies;
