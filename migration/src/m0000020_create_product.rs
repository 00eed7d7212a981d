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
                    .table(Product::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Product::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Product::Name).string().not_null())
                    .col(
                        ColumnDef::new(Product::CurrentFullVersion)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Product::RedhatMajorVersion).integer())
                    .col(ColumnDef::new(Product::ShortCodeCode).string().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .from_col(Product::ShortCodeCode)
                            .to(ShortCode::Table, ShortCode::Code),
                    )
                    .col(
                        ColumnDef::new(Product::Archs)
                            .array(ColumnType::Text)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Product::MirrorFromDate).timestamp_with_time_zone())
                    .col(ColumnDef::new(Product::RedhatProductPrefix).string())
                    .col(ColumnDef::new(Product::Cpe).string())
                    .col(ColumnDef::new(Product::EolAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Product::BuildSystem).string().not_null())
                    .col(
                        ColumnDef::new(Product::BuildSystemEndpoint)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Product::KojiCompose).string())
                    .col(ColumnDef::new(Product::KojiModuleCompose).string())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(Product::Table)
                    .name("product_name_short_code_idx")
                    .col(Product::Name)
                    .col(Product::ShortCodeCode)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(IgnoredUpstreamPackage::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(IgnoredUpstreamPackage::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(IgnoredUpstreamPackage::ProductId)
                            .big_integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from_col(IgnoredUpstreamPackage::ProductId)
                            .to(Product::Table, Product::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .col(
                        ColumnDef::new(IgnoredUpstreamPackage::Package)
                            .string()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(RebootSuggestedPackage::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RebootSuggestedPackage::Name)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(RebootSuggestedPackage::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Func::cust(Now)),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(RebootSuggestedPackage::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .table(IgnoredUpstreamPackage::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(Product::Table).if_exists().to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Product {
    Table,
    Id,
    Name,
    CurrentFullVersion,
    RedhatMajorVersion,
    ShortCodeCode,
    Archs,
    MirrorFromDate,
    RedhatProductPrefix,
    Cpe,
    EolAt,
    BuildSystem,
    BuildSystemEndpoint,
    KojiCompose,
    KojiModuleCompose,
}

#[derive(DeriveIden)]
pub enum IgnoredUpstreamPackage {
    Table,
    Id,
    ProductId,
    Package,
}

#[derive(DeriveIden)]
pub enum RebootSuggestedPackage {
    Table,
    Name,
    CreatedAt,
}
