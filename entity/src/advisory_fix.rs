use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "advisory_fix")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub advisory_id: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub fix_id: i64,
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
        belongs_to = "super::fix::Entity",
        from = "Column::FixId",
        to = "super::fix::Column::Id"
    )]
    Fix,
}

impl Related<super::advisory::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Advisory.def()
    }
}

impl Related<super::fix::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Fix.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
