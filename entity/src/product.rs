use sea_orm::entity::prelude::*;
use time::OffsetDateTime;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "product")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    pub current_full_version: String,
    pub redhat_major_version: Option<i32>,
    pub short_code_code: String,
    pub archs: Vec<String>,
    pub mirror_from_date: Option<OffsetDateTime>,
    /// Prefix used to translate upstream product strings, e.g. `Rocky Linux`.
    pub redhat_product_prefix: Option<String>,
    pub cpe: Option<String>,
    pub eol_at: Option<OffsetDateTime>,
    pub build_system: String,
    pub build_system_endpoint: String,
    pub koji_compose: Option<String>,
    pub koji_module_compose: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::short_code::Entity",
        from = "Column::ShortCodeCode",
        to = "super::short_code::Column::Code"
    )]
    ShortCode,

    #[sea_orm(has_many = "super::affected_product::Entity")]
    AffectedProducts,
}

impl Related<super::short_code::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ShortCode.def()
    }
}

impl Related<super::affected_product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AffectedProducts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
