pub use super::cache_entries::Entity as CacheEntries;
pub use super::genres::Entity as Genres;
pub use super::movie_genres::Entity as MovieGenres;
pub use super::movie_relationships::Entity as MovieRelationships;
pub use super::movies::Entity as Movies;
