use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(TaskStatus::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TaskStatus::Name)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(TaskStatus::Heartbeat).timestamp_with_time_zone())
                    .col(ColumnDef::new(TaskStatus::LastRun).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TaskStatus::Table).if_exists().to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum TaskStatus {
    Table,
    Name,
    Heartbeat,
    LastRun,
}
