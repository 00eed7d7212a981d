use errata_entity::advisory::{AdvisorySeverity, AdvisoryType};
use errata_store::AdvisoryData;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::{IntoParams, ToSchema};

/// An advisory as served by the read API.
#[derive(Clone, Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdvisorySummary {
    /// Derived name, e.g. `RLSA-2021:2595`.
    pub name: String,
    pub synopsis: String,
    pub topic: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub solution: Option<String>,
    pub severity: AdvisorySeverity,
    #[serde(rename = "type")]
    pub kind: AdvisoryType,
    pub reboot_suggested: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub published_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub redhat_issued_at: Option<OffsetDateTime>,
    pub affected_products: Vec<String>,
    pub cves: Vec<AdvisoryCve>,
    pub fixes: Vec<AdvisoryFix>,
    pub references: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rpms: Vec<String>,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdvisoryCve {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cvss3_scoring_vector: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cvss3_base_score: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwe: Option<String>,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdvisoryFix {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticket: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl AdvisorySummary {
    pub fn from_data(data: &AdvisoryData) -> Self {
        Self {
            name: data.advisory.name(),
            synopsis: data.advisory.synopsis.clone(),
            topic: data.advisory.topic.clone(),
            description: data.advisory.description.clone(),
            solution: data.advisory.solution.clone(),
            severity: data.advisory.severity,
            kind: data.advisory.kind,
            reboot_suggested: data.advisory.reboot_suggested,
            published_at: data.advisory.published_at,
            redhat_issued_at: data.advisory.redhat_issued_at,
            affected_products: data.affected_products.clone(),
            cves: data
                .cves
                .iter()
                .map(|cve| AdvisoryCve {
                    id: cve.id.clone(),
                    source_by: cve.source_by.clone(),
                    source_link: cve.source_link.clone(),
                    cvss3_scoring_vector: cve.cvss3_scoring_vector.clone(),
                    cvss3_base_score: cve.cvss3_base_score.clone(),
                    cwe: cve.cwe.clone(),
                })
                .collect(),
            fixes: data
                .fixes
                .iter()
                .map(|fix| AdvisoryFix {
                    ticket: fix.ticket.clone(),
                    source_by: fix.source_by.clone(),
                    source_link: fix.source_link.clone(),
                    description: fix.description.clone(),
                })
                .collect(),
            references: data.references.clone(),
            rpms: data.rpms.iter().map(|rpm| rpm.name.clone()).collect(),
        }
    }
}

/// Query filters of the advisory listing.
#[derive(Clone, Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct AdvisoryQuery {
    /// Only advisories affecting this product name.
    pub product: Option<String>,
    /// Substring match on linked CVE ids.
    pub cve: Option<String>,
    /// Substring match on the synopsis.
    pub synopsis: Option<String>,
    /// Substring match across text fields, CVE ids and the derived name.
    pub keyword: Option<String>,
    pub severity: Option<AdvisorySeverity>,
    #[serde(rename = "type")]
    pub kind: Option<AdvisoryType>,
    /// Accepted but always cleared; unpublished advisories are not served.
    pub include_unpublished: Option<bool>,
}

impl AdvisoryQuery {
    pub fn into_filters(self) -> errata_store::AdvisoryFilters {
        errata_store::AdvisoryFilters {
            product: self.product,
            before: None,
            after: None,
            include_unpublished: false,
            cve: self.cve,
            synopsis: self.synopsis,
            keyword: self.keyword,
            severity: self.severity,
            kind: self.kind,
            include_rpms: false,
        }
    }
}

#[derive(Clone, Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListAdvisoriesResponse {
    pub advisories: Vec<AdvisorySummary>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    /// Newest mirror sync time across all short codes.
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_updated: Option<OffsetDateTime>,
}
