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
                    .table(Advisory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Advisory::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Advisory::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Func::cust(Now)),
                    )
                    .col(ColumnDef::new(Advisory::Year).integer().not_null())
                    .col(ColumnDef::new(Advisory::Num).integer().not_null())
                    .col(ColumnDef::new(Advisory::Synopsis).string().not_null())
                    .col(ColumnDef::new(Advisory::Topic).text().not_null())
                    .col(ColumnDef::new(Advisory::Description).text().not_null())
                    .col(ColumnDef::new(Advisory::Solution).text())
                    .col(ColumnDef::new(Advisory::Severity).integer().not_null())
                    .col(ColumnDef::new(Advisory::Type).integer().not_null())
                    .col(ColumnDef::new(Advisory::RedhatIssuedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Advisory::ShortCodeCode).string().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .from_col(Advisory::ShortCodeCode)
                            .to(ShortCode::Table, ShortCode::Code),
                    )
                    .col(
                        ColumnDef::new(Advisory::RebootSuggested)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Advisory::PublishedAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        // Backs idempotent errata mirroring and unique derived names.
        manager
            .create_index(
                Index::create()
                    .table(Advisory::Table)
                    .name("advisory_code_year_num_idx")
                    .col(Advisory::ShortCodeCode)
                    .col(Advisory::Year)
                    .col(Advisory::Num)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Fix::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Fix::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Fix::Ticket).string())
                    .col(ColumnDef::new(Fix::SourceBy).string())
                    .col(ColumnDef::new(Fix::SourceLink).string())
                    .col(ColumnDef::new(Fix::Description).text())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Fix::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Advisory::Table).if_exists().to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Advisory {
    Table,
    Id,
    CreatedAt,
    Year,
    Num,
    Synopsis,
    Topic,
    Description,
    Solution,
    Severity,
    Type,
    RedhatIssuedAt,
    ShortCodeCode,
    RebootSuggested,
    PublishedAt,
}

#[derive(DeriveIden)]
pub enum Fix {
    Table,
    Id,
    Ticket,
    SourceBy,
    SourceLink,
    Description,
}
