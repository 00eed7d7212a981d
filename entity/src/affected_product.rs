use sea_orm::entity::prelude::*;

/// Lifecycle state of a `(cve, product, package)` triple.
///
/// The numeric values are part of the stored data and must not be reordered.
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
pub enum AffectedProductState {
    #[sea_orm(num_value = 0)]
    Unknown,
    #[sea_orm(num_value = 1)]
    UnderInvestigationUpstream,
    #[sea_orm(num_value = 2)]
    UnderInvestigationDownstream,
    #[sea_orm(num_value = 3)]
    FixedUpstream,
    #[sea_orm(num_value = 4)]
    FixedDownstream,
    #[sea_orm(num_value = 5)]
    WillNotFixUpstream,
    #[sea_orm(num_value = 7)]
    OutOfSupportScope,
    #[sea_orm(num_value = 8)]
    AffectedUpstream,
    #[sea_orm(num_value = 9)]
    AffectedDownstream,
}

impl AffectedProductState {
    /// States still waiting on an upstream or downstream resolution.
    pub fn is_unresolved(&self) -> bool {
        matches!(
            self,
            Self::UnderInvestigationUpstream
                | Self::UnderInvestigationDownstream
                | Self::AffectedUpstream
                | Self::AffectedDownstream
        )
    }
}

impl std::fmt::Display for AffectedProductState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Unknown => "Unknown",
            Self::UnderInvestigationUpstream => "UnderInvestigationUpstream",
            Self::UnderInvestigationDownstream => "UnderInvestigationDownstream",
            Self::FixedUpstream => "FixedUpstream",
            Self::FixedDownstream => "FixedDownstream",
            Self::WillNotFixUpstream => "WillNotFixUpstream",
            Self::OutOfSupportScope => "OutOfSupportScope",
            Self::AffectedUpstream => "AffectedUpstream",
            Self::AffectedDownstream => "AffectedDownstream",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "affected_product")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub product_id: i64,
    pub cve_id: Option<String>,
    pub state: AffectedProductState,
    pub version: String,
    /// NVR-ish package string as reported upstream.
    pub package: String,
    /// Upstream erratum name, when known.
    pub advisory: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,

    #[sea_orm(
        belongs_to = "super::cve::Entity",
        from = "Column::CveId",
        to = "super::cve::Column::Id"
    )]
    Cve,

    #[sea_orm(has_many = "super::build_reference::Entity")]
    BuildReferences,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl Related<super::cve::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Cve.def()
    }
}

impl Related<super::build_reference::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BuildReferences.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
