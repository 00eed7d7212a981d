use sea_orm::entity::prelude::*;
use time::OffsetDateTime;

/// An upstream advisory identifier.
///
/// The id is either a `CVE-YYYY-N` identifier or, for mirrored bugfix and
/// enhancement errata without CVEs, the upstream erratum name itself.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "cve")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub created_at: OffsetDateTime,
    pub short_code_code: String,
    pub source_by: Option<String>,
    pub source_link: Option<String>,
    /// Verbatim upstream JSON (CVSS v3 vector and score, CWE,
    /// `affected_release[]`, `package_state[]`).
    pub content: Option<Json>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::affected_product::Entity")]
    AffectedProducts,

    #[sea_orm(has_many = "super::advisory_cve::Entity")]
    AdvisoryCves,
}

impl Related<super::affected_product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AffectedProducts.def()
    }
}

impl Related<super::advisory::Entity> for Entity {
    fn to() -> RelationDef {
        super::advisory_cve::Relation::Advisory.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::advisory_cve::Relation::Cve.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
