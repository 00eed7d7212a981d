use crate::Now;
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ShortCode::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ShortCode::Code)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ShortCode::Mode).integer().not_null())
                    .col(
                        ColumnDef::new(ShortCode::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Func::cust(Now)),
                    )
                    .col(ColumnDef::new(ShortCode::ArchivedAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(MirrorState::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MirrorState::ShortCodeCode)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from_col(MirrorState::ShortCodeCode)
                            .to(ShortCode::Table, ShortCode::Code)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .col(ColumnDef::new(MirrorState::LastSync).timestamp_with_time_zone())
                    .col(ColumnDef::new(MirrorState::ErrataAfter).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(MirrorState::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ShortCode::Table).if_exists().to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum ShortCode {
    Table,
    Code,
    Mode,
    CreatedAt,
    ArchivedAt,
}

#[derive(DeriveIden)]
pub enum MirrorState {
    Table,
    ShortCodeCode,
    LastSync,
    ErrataAfter,
}
