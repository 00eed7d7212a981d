use crate::m0000020_create_product::Product;
use crate::m0000030_create_cve::Cve;
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AffectedProduct::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AffectedProduct::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(AffectedProduct::ProductId)
                            .big_integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from_col(AffectedProduct::ProductId)
                            .to(Product::Table, Product::Id),
                    )
                    .col(ColumnDef::new(AffectedProduct::CveId).string())
                    .foreign_key(
                        ForeignKey::create()
                            .from_col(AffectedProduct::CveId)
                            .to(Cve::Table, Cve::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .col(ColumnDef::new(AffectedProduct::State).integer().not_null())
                    .col(ColumnDef::new(AffectedProduct::Version).string().not_null())
                    .col(ColumnDef::new(AffectedProduct::Package).string().not_null())
                    .col(ColumnDef::new(AffectedProduct::Advisory).string())
                    .to_owned(),
            )
            .await?;

        // Backs the "at most one affected product per (cve, package)" rule.
        manager
            .create_index(
                Index::create()
                    .table(AffectedProduct::Table)
                    .name("affected_product_cve_package_idx")
                    .col(AffectedProduct::CveId)
                    .col(AffectedProduct::Package)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(BuildReference::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BuildReference::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(BuildReference::AffectedProductId)
                            .big_integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from_col(BuildReference::AffectedProductId)
                            .to(AffectedProduct::Table, AffectedProduct::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .col(ColumnDef::new(BuildReference::Rpm).string().not_null())
                    .col(ColumnDef::new(BuildReference::SrcRpm).string().not_null())
                    .col(ColumnDef::new(BuildReference::CveId).string().not_null())
                    .col(
                        ColumnDef::new(BuildReference::Sha256Sum)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(BuildReference::BuildId).string())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(BuildReference::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .table(AffectedProduct::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await
    }
}

#[derive(DeriveIden)]
pub enum AffectedProduct {
    Table,
    Id,
    ProductId,
    CveId,
    State,
    Version,
    Package,
    Advisory,
}

#[derive(DeriveIden)]
pub enum BuildReference {
    Table,
    Id,
    AffectedProductId,
    Rpm,
    SrcRpm,
    CveId,
    Sha256Sum,
    BuildId,
}
