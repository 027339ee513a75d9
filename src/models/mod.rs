pub mod genre;
pub mod movie;
pub mod relationship;
pub mod views;

pub use genre::{Genre, GenreAssignment, GenreCount, GenreRecord};
pub use movie::{
    CastMember, Credits, CrewMember, Movie, ReleaseStatus, StalenessPolicy, SyncStatus, VideoRef,
    Videos,
};
pub use relationship::{
    MovieRelationship, NewRelationship, RelationOrigin, RelationType, RelationshipIntegrityError,
    RelationshipSyncReport,
};
pub use views::{GenreView, MovieDetail, MovieSummary, PagedResult, Pagination};
