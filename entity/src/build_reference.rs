use sea_orm::entity::prelude::*;

/// Links an affected product to one RPM of the downstream build that fixed it.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "build_reference")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub affected_product_id: i64,
    /// Epoch qualified NVRA file name, e.g. `cmake-0:3.18.2-11.el8_4.x86_64.rpm`.
    pub rpm: String,
    pub src_rpm: String,
    pub cve_id: String,
    pub sha256_sum: String,
    /// Build system build id.
    pub build_id: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::affected_product::Entity",
        from = "Column::AffectedProductId",
        to = "super::affected_product::Column::Id"
    )]
    AffectedProduct,
}

impl Related<super::affected_product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AffectedProduct.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
