use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "movies")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub provider_id: i32,
    pub title: String,
    pub original_title: String,
    #[sea_orm(column_type = "Text")]
    pub overview: String,
    pub tagline: Option<String>,
    /// ISO 8601 calendar date.
    pub release_date: Option<String>,
    pub release_status: Option<String>,
    pub runtime: Option<i32>,
    pub budget: Option<i64>,
    pub revenue: Option<i64>,
    pub homepage: Option<String>,
    pub imdb_id: Option<String>,
    pub original_language: String,
    pub adult: bool,
    pub popularity: f64,
    pub vote_average: f64,
    pub vote_count: i32,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub credits_json: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub videos_json: Option<String>,
    pub sync_status: String,
    pub last_synced_at: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub last_sync_error: Option<String>,
    pub last_sync_attempt_at: Option<String>,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::movie_genres::Entity")]
    MovieGenres,
}

impl Related<super::movie_genres::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MovieGenres.def()
    }
}

impl Related<super::genres::Entity> for Entity {
    fn to() -> RelationDef {
        super::movie_genres::Relation::Genres.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::movie_genres::Relation::Movies.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
