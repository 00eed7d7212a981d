use sea_orm::entity::prelude::*;
use time::OffsetDateTime;

/// Per short code mirror watermarks. Both timestamps only ever move forward.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "mirror_state")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub short_code_code: String,
    /// Watermark of the CVE poller.
    pub last_sync: Option<OffsetDateTime>,
    /// Watermark of the errata poller.
    pub errata_after: Option<OffsetDateTime>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::short_code::Entity",
        from = "Column::ShortCodeCode",
        to = "super::short_code::Column::Code"
    )]
    ShortCode,
}

impl Related<super::short_code::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ShortCode.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
