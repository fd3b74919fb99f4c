use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ResponseCache::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ResponseCache::Key)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ResponseCache::Value).text().not_null())
                    .col(ColumnDef::new(ResponseCache::ExpiresAt).string().not_null())
                    .col(ColumnDef::new(ResponseCache::UpdatedAt).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_response_cache_expires_at")
                    .table(ResponseCache::Table)
                    .col(ResponseCache::ExpiresAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ResponseCache::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ResponseCache {
    Table,
    Key,
    Value,
    ExpiresAt,
    UpdatedAt,
}
