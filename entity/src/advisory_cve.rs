use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "advisory_cve")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub advisory_id: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub cve_id: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::advisory::Entity",
        from = "Column::AdvisoryId",
        to = "super::advisory::Column::Id"
    )]
    Advisory,

    #[sea_orm(
        belongs_to = "super::cve::Entity",
        from = "Column::CveId",
        to = "super::cve::Column::Id"
    )]
    Cve,
}

impl Related<super::advisory::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Advisory.def()
    }
}

impl Related<super::cve::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Cve.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
