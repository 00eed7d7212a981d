use crate::m0000010_create_short_code::ShortCode;
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
                    .table(Cve::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Cve::Id).string().not_null().primary_key())
                    .col(
                        ColumnDef::new(Cve::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Func::cust(Now)),
                    )
                    .col(ColumnDef::new(Cve::ShortCodeCode).string().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .from_col(Cve::ShortCodeCode)
                            .to(ShortCode::Table, ShortCode::Code),
                    )
                    .col(ColumnDef::new(Cve::SourceBy).string())
                    .col(ColumnDef::new(Cve::SourceLink).string())
                    .col(ColumnDef::new(Cve::Content).json_binary())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Cve::Table).if_exists().to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Cve {
    Table,
    Id,
    CreatedAt,
    ShortCodeCode,
    SourceBy,
    SourceLink,
    Content,
}
