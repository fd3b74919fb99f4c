use sea_orm::entity::prelude::*;

/// One catalog document. Nested structures are stored as JSON text.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "anime_documents")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub anime_id: i64,
    pub session: Option<String>,
    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub alternative_titles: String,
    #[sea_orm(column_type = "Text")]
    pub synopsis: String,
    pub poster: String,
    pub media_type: String,
    pub score: f64,
    pub status: String,
    #[sea_orm(column_type = "Text")]
    pub genres: String,
    #[sea_orm(column_type = "Text")]
    pub studios: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub start_season: Option<String>,
    pub start_date: String,
    pub end_date: String,
    pub episode_count: i64,
    pub current_episode_count: i64,
    #[sea_orm(column_type = "Text", nullable)]
    pub broadcast: Option<String>,
    pub duration: i64,
    pub rating: String,
    #[sea_orm(column_type = "Text")]
    pub episodes: String,
    #[sea_orm(column_type = "Text")]
    pub recommendations: String,
    #[sea_orm(column_type = "Text")]
    pub related_anime: String,
    pub use_api: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
