use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "movie_relationships")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub source_movie_id: i32,
    pub target_movie_id: i32,
    pub relation_type: String,
    /// Only internal edges carry a score.
    pub confidence: Option<f64>,
    pub origin: String,
    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::movies::Entity",
        from = "Column::SourceMovieId",
        to = "super::movies::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Source,
    #[sea_orm(
        belongs_to = "super::movies::Entity",
        from = "Column::TargetMovieId",
        to = "super::movies::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Target,
}

impl Related<super::movies::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Target.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
