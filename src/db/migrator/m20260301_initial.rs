use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AnimeDocuments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AnimeDocuments::AnimeId)
                            .big_integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AnimeDocuments::Session).string().null())
                    .col(ColumnDef::new(AnimeDocuments::Title).string().not_null())
                    .col(
                        ColumnDef::new(AnimeDocuments::AlternativeTitles)
                            .text()
                            .not_null()
                            .default("{}"),
                    )
                    .col(
                        ColumnDef::new(AnimeDocuments::Synopsis)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(AnimeDocuments::Poster)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(AnimeDocuments::MediaType)
                            .string()
                            .not_null()
                            .default("TV"),
                    )
                    .col(
                        ColumnDef::new(AnimeDocuments::Score)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(AnimeDocuments::Status)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(AnimeDocuments::Genres)
                            .text()
                            .not_null()
                            .default("[]"),
                    )
                    .col(
                        ColumnDef::new(AnimeDocuments::Studios)
                            .text()
                            .not_null()
                            .default("[]"),
                    )
                    .col(ColumnDef::new(AnimeDocuments::StartSeason).text().null())
                    .col(
                        ColumnDef::new(AnimeDocuments::StartDate)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(AnimeDocuments::EndDate)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(AnimeDocuments::EpisodeCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(AnimeDocuments::CurrentEpisodeCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(AnimeDocuments::Broadcast).text().null())
                    .col(
                        ColumnDef::new(AnimeDocuments::Duration)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(AnimeDocuments::Rating)
                            .string()
                            .not_null()
                            .default("g"),
                    )
                    .col(
                        ColumnDef::new(AnimeDocuments::Episodes)
                            .text()
                            .not_null()
                            .default("[]"),
                    )
                    .col(
                        ColumnDef::new(AnimeDocuments::Recommendations)
                            .text()
                            .not_null()
                            .default("[]"),
                    )
                    .col(
                        ColumnDef::new(AnimeDocuments::RelatedAnime)
                            .text()
                            .not_null()
                            .default("[]"),
                    )
                    .col(
                        ColumnDef::new(AnimeDocuments::UseApi)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(AnimeDocuments::CreatedAt).string().not_null())
                    .col(ColumnDef::new(AnimeDocuments::UpdatedAt).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_anime_documents_session")
                    .table(AnimeDocuments::Table)
                    .col(AnimeDocuments::Session)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AnimeDocuments::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum AnimeDocuments {
    Table,
    AnimeId,
    Session,
    Title,
    AlternativeTitles,
    Synopsis,
    Poster,
    MediaType,
    Score,
    Status,
    Genres,
    Studios,
    StartSeason,
    StartDate,
    EndDate,
    EpisodeCount,
    CurrentEpisodeCount,
    Broadcast,
    Duration,
    Rating,
    Episodes,
    Recommendations,
    RelatedAnime,
    UseApi,
    CreatedAt,
    UpdatedAt,
}
