use sea_orm::entity::prelude::*;
use time::OffsetDateTime;

/// Worker bookkeeping for a periodic task.
///
/// `heartbeat` is bumped every few seconds while the task runs and is
/// compared on update (optimistic locking), so a second worker taking over a
/// stale task does not fight a live one.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "task_status")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub name: String,
    pub heartbeat: Option<OffsetDateTime>,
    pub last_run: Option<OffsetDateTime>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
