use sea_orm::entity::prelude::*;
use time::OffsetDateTime;

/// How a short code sources its advisories.
#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    serde::Serialize,
    serde::Deserialize,
    utoipa::ToSchema,
)]
#[sea_orm(rs_type = "i32", db_type = "Integer")]
#[serde(rename_all = "snake_case")]
pub enum ShortCodeMode {
    #[sea_orm(num_value = 0)]
    Unknown,
    /// Advisories are mirrored from upstream.
    #[sea_orm(num_value = 1)]
    Mirror,
    /// Advisories are entered by operators.
    #[sea_orm(num_value = 2)]
    Manual,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "short_code")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub code: String,
    pub mode: ShortCodeMode,
    pub created_at: OffsetDateTime,
    pub archived_at: Option<OffsetDateTime>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::product::Entity")]
    Products,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Products.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
