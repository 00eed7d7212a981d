use crate::m0000020_create_product::Product;
use crate::m0000030_create_cve::Cve;
use crate::m0000050_create_advisory::{Advisory, Fix};
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AdvisoryCve::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AdvisoryCve::AdvisoryId)
                            .big_integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from_col(AdvisoryCve::AdvisoryId)
                            .to(Advisory::Table, Advisory::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .col(ColumnDef::new(AdvisoryCve::CveId).string().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .from_col(AdvisoryCve::CveId)
                            .to(Cve::Table, Cve::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .primary_key(
                        Index::create()
                            .col(AdvisoryCve::AdvisoryId)
                            .col(AdvisoryCve::CveId),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AdvisoryFix::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AdvisoryFix::AdvisoryId)
                            .big_integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from_col(AdvisoryFix::AdvisoryId)
                            .to(Advisory::Table, Advisory::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .col(ColumnDef::new(AdvisoryFix::FixId).big_integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .from_col(AdvisoryFix::FixId)
                            .to(Fix::Table, Fix::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .primary_key(
                        Index::create()
                            .col(AdvisoryFix::AdvisoryId)
                            .col(AdvisoryFix::FixId),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AdvisoryReference::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AdvisoryReference::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(AdvisoryReference::AdvisoryId)
                            .big_integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from_col(AdvisoryReference::AdvisoryId)
                            .to(Advisory::Table, Advisory::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .col(ColumnDef::new(AdvisoryReference::Url).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AdvisoryRpm::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AdvisoryRpm::AdvisoryId)
                            .big_integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from_col(AdvisoryRpm::AdvisoryId)
                            .to(Advisory::Table, Advisory::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .col(ColumnDef::new(AdvisoryRpm::Name).string().not_null())
                    .col(
                        ColumnDef::new(AdvisoryRpm::ProductId)
                            .big_integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from_col(AdvisoryRpm::ProductId)
                            .to(Product::Table, Product::Id),
                    )
                    .primary_key(
                        Index::create()
                            .col(AdvisoryRpm::AdvisoryId)
                            .col(AdvisoryRpm::Name)
                            .col(AdvisoryRpm::ProductId),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for table in [
            Table::drop().table(AdvisoryRpm::Table).if_exists().to_owned(),
            Table::drop()
                .table(AdvisoryReference::Table)
                .if_exists()
                .to_owned(),
            Table::drop().table(AdvisoryFix::Table).if_exists().to_owned(),
            Table::drop().table(AdvisoryCve::Table).if_exists().to_owned(),
        ] {
            manager.drop_table(table).await?;
        }

        Ok(())
    }
}

#[derive(DeriveIden)]
pub enum AdvisoryCve {
    Table,
    AdvisoryId,
    CveId,
}

#[derive(DeriveIden)]
pub enum AdvisoryFix {
    Table,
    AdvisoryId,
    FixId,
}

#[derive(DeriveIden)]
pub enum AdvisoryReference {
    Table,
    Id,
    AdvisoryId,
    Url,
}

#[derive(DeriveIden)]
pub enum AdvisoryRpm {
    Table,
    AdvisoryId,
    Name,
    ProductId,
}
