use sea_orm::entity::prelude::*;
use time::OffsetDateTime;

#[derive(
    Debug,
    Copy,
    Clone,
    Hash,
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
pub enum AdvisoryType {
    #[sea_orm(num_value = 0)]
    Unknown,
    #[sea_orm(num_value = 1)]
    Security,
    #[sea_orm(num_value = 2)]
    Bugfix,
    #[sea_orm(num_value = 3)]
    Enhancement,
}

impl AdvisoryType {
    /// The two-letter infix used in derived advisory names.
    pub fn infix(&self) -> &'static str {
        match self {
            Self::Security => "SA",
            Self::Bugfix => "BA",
            Self::Unknown | Self::Enhancement => "EA",
        }
    }

    /// The `type` attribute value in updateinfo documents.
    pub fn updateinfo_type(&self) -> &'static str {
        match self {
            Self::Security => "security",
            Self::Bugfix => "bugfix",
            Self::Unknown | Self::Enhancement => "enhancement",
        }
    }
}

#[derive(
    Debug,
    Copy,
    Clone,
    Hash,
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
pub enum AdvisorySeverity {
    #[sea_orm(num_value = 0)]
    Unknown,
    #[sea_orm(num_value = 1)]
    Critical,
    #[sea_orm(num_value = 2)]
    Important,
    #[sea_orm(num_value = 3)]
    Moderate,
    #[sea_orm(num_value = 4)]
    Low,
}

impl std::fmt::Display for AdvisorySeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Unknown => "None",
            Self::Critical => "Critical",
            Self::Important => "Important",
            Self::Moderate => "Moderate",
            Self::Low => "Low",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "advisory")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub created_at: OffsetDateTime,
    pub year: i32,
    pub num: i32,
    pub synopsis: String,
    pub topic: String,
    pub description: String,
    pub solution: Option<String>,
    pub severity: AdvisorySeverity,
    #[sea_orm(column_name = "type")]
    pub kind: AdvisoryType,
    /// When the upstream erratum was issued. Immutable after creation.
    pub redhat_issued_at: Option<OffsetDateTime>,
    pub short_code_code: String,
    pub reboot_suggested: bool,
    /// Set exactly once, on first emission into an updateinfo document.
    pub published_at: Option<OffsetDateTime>,
}

impl Model {
    /// Derived name, e.g. `RLBA-2021:2593`. Unique within the short code.
    pub fn name(&self) -> String {
        format!(
            "{}{}-{}:{}",
            self.short_code_code,
            self.kind.infix(),
            self.year,
            self.num
        )
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::advisory_cve::Entity")]
    AdvisoryCves,

    #[sea_orm(has_many = "super::advisory_fix::Entity")]
    AdvisoryFixes,

    #[sea_orm(has_many = "super::advisory_reference::Entity")]
    References,

    #[sea_orm(has_many = "super::advisory_rpm::Entity")]
    Rpms,
}

impl Related<super::cve::Entity> for Entity {
    fn to() -> RelationDef {
        super::advisory_cve::Relation::Cve.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::advisory_cve::Relation::Advisory.def().rev())
    }
}

impl Related<super::fix::Entity> for Entity {
    fn to() -> RelationDef {
        super::advisory_fix::Relation::Fix.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::advisory_fix::Relation::Advisory.def().rev())
    }
}

impl Related<super::advisory_reference::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::References.def()
    }
}

impl Related<super::advisory_rpm::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Rpms.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
