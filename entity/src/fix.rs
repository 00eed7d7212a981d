use sea_orm::entity::prelude::*;

/// An upstream bug reference, usually a Bugzilla ticket.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "fix")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub ticket: Option<String>,
    pub source_by: Option<String>,
    pub source_link: Option<String>,
    pub description: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::advisory_fix::Entity")]
    AdvisoryFixes,
}

impl Related<super::advisory::Entity> for Entity {
    fn to() -> RelationDef {
        super::advisory_fix::Relation::Advisory.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::advisory_fix::Relation::Fix.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
