//! Persistence layer.
//!
//! [`Store`] is the narrow interface the pipeline components are written
//! against. It has two implementations: [`PgStore`] over Postgres (sea-orm)
//! and [`MemStore`], an in-memory variant used by tests.

pub mod mem;
pub mod pg;

pub use mem::MemStore;
pub use pg::PgStore;

use errata_entity::{
    advisory, advisory::AdvisorySeverity, advisory::AdvisoryType, affected_product,
    affected_product::AffectedProductState, build_reference, cve, fix, mirror_state, product,
    short_code, short_code::ShortCodeMode, task_status,
};
use time::OffsetDateTime;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Db(#[from] sea_orm::DbErr),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("conflict on {0}")]
    Conflict(&'static str),
    #[error("transaction already closed")]
    Closed,
}

/// Filters accepted by [`Store::list_advisories`].
#[derive(Clone, Debug, Default)]
pub struct AdvisoryFilters {
    /// Only advisories affecting this product name.
    pub product: Option<String>,
    /// Only advisories published before this time.
    pub before: Option<OffsetDateTime>,
    /// Only advisories published after this time.
    pub after: Option<OffsetDateTime>,
    /// Include advisories that have not been published yet.
    pub include_unpublished: bool,
    /// Substring match on linked CVE ids.
    pub cve: Option<String>,
    /// Substring match on the synopsis.
    pub synopsis: Option<String>,
    /// Substring match across synopsis, topic, description, solution, CVE ids
    /// and the derived name.
    pub keyword: Option<String>,
    pub severity: Option<AdvisorySeverity>,
    pub kind: Option<AdvisoryType>,
    /// Assemble the per-product RPM list for each advisory.
    pub include_rpms: bool,
}

/// A CVE as linked to an advisory, with presentation fields pulled out of the
/// stored upstream content blob.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdvisoryCveInfo {
    pub id: String,
    pub source_by: Option<String>,
    pub source_link: Option<String>,
    pub cvss3_scoring_vector: Option<String>,
    pub cvss3_base_score: Option<String>,
    pub cwe: Option<String>,
}

impl AdvisoryCveInfo {
    pub fn from_model(cve: &cve::Model) -> Self {
        let cvss3 = cve.content.as_ref().map(|content| &content["cvss3"]);
        let string_at = |value: Option<&serde_json::Value>, key: &str| {
            value
                .and_then(|v| v[key].as_str())
                .map(|s| s.to_string())
        };

        Self {
            id: cve.id.clone(),
            source_by: cve.source_by.clone(),
            source_link: cve.source_link.clone(),
            cvss3_scoring_vector: string_at(cvss3, "cvss3_scoring_vector"),
            cvss3_base_score: string_at(cvss3, "cvss3_base_score"),
            cwe: cve
                .content
                .as_ref()
                .and_then(|v| v["cwe"].as_str())
                .map(|s| s.to_string()),
        }
    }
}

/// One RPM produced by the downstream build that fixed an affected product.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuildArtifact {
    pub rpm: String,
    pub src_rpm: String,
}

/// An RPM shipped by an advisory together with the product it shipped for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdvisoryRpmInfo {
    pub name: String,
    pub product_name: String,
}

/// An advisory row together with everything reachable through its joins.
#[derive(Clone, Debug)]
pub struct AdvisoryData {
    pub advisory: advisory::Model,
    pub affected_products: Vec<String>,
    pub fixes: Vec<fix::Model>,
    pub cves: Vec<AdvisoryCveInfo>,
    pub references: Vec<String>,
    pub rpms: Vec<AdvisoryRpmInfo>,
    pub build_artifacts: Vec<BuildArtifact>,
}

impl AdvisoryData {
    /// The upstream erratum name this advisory mirrors, e.g. `RHBA-2021:2593`.
    pub fn upstream_name(&self) -> String {
        format!(
            "RH{}-{}:{}",
            self.advisory.kind.infix(),
            self.advisory.year,
            self.advisory.num
        )
    }
}

/// Fields for a new advisory row.
#[derive(Clone, Debug)]
pub struct NewAdvisory {
    pub year: i32,
    pub num: i32,
    pub synopsis: String,
    pub topic: String,
    pub description: String,
    pub solution: Option<String>,
    pub severity: AdvisorySeverity,
    pub kind: AdvisoryType,
    pub redhat_issued_at: Option<OffsetDateTime>,
    pub short_code_code: String,
    pub reboot_suggested: bool,
}

/// The persistence interface of the pipeline.
///
/// All methods are usable both on the plain store and inside a transaction
/// handle obtained through [`Store::begin`].
#[async_trait::async_trait]
pub trait Store: Send + Sync {
    // short codes

    async fn all_short_codes(&self) -> Result<Vec<short_code::Model>, Error>;
    async fn short_code_by_code(&self, code: &str) -> Result<Option<short_code::Model>, Error>;
    async fn create_short_code(
        &self,
        code: &str,
        mode: ShortCodeMode,
    ) -> Result<short_code::Model, Error>;

    // products

    async fn products_by_short_code(&self, code: &str) -> Result<Vec<product::Model>, Error>;
    async fn product_by_name_and_short_code(
        &self,
        name: &str,
        code: &str,
    ) -> Result<Option<product::Model>, Error>;
    async fn product_by_id(&self, id: i64) -> Result<Option<product::Model>, Error>;

    // cves

    async fn cve_by_id(&self, id: &str) -> Result<Option<cve::Model>, Error>;
    async fn all_cves(&self) -> Result<Vec<cve::Model>, Error>;
    /// CVEs with no affected products, or with at least one affected product
    /// still under investigation or affected.
    async fn unresolved_cves(&self) -> Result<Vec<cve::Model>, Error>;
    /// CVEs with at least one affected product fixed downstream.
    async fn cves_fixed_downstream(&self) -> Result<Vec<cve::Model>, Error>;
    async fn create_cve(
        &self,
        id: &str,
        short_code: &str,
        source_by: Option<&str>,
        source_link: Option<&str>,
        content: Option<serde_json::Value>,
    ) -> Result<cve::Model, Error>;
    async fn set_cve_content(&self, id: &str, content: serde_json::Value) -> Result<(), Error>;

    // affected products

    async fn affected_products_by_cve(
        &self,
        cve: &str,
    ) -> Result<Vec<affected_product::Model>, Error>;
    async fn affected_product_by_cve_and_package(
        &self,
        cve: &str,
        package: &str,
    ) -> Result<Option<affected_product::Model>, Error>;
    async fn affected_product_by_advisory(
        &self,
        advisory: &str,
    ) -> Result<Option<affected_product::Model>, Error>;
    /// Affected products awaiting a downstream fix (state `FixedUpstream`).
    async fn pending_affected_products(&self) -> Result<Vec<affected_product::Model>, Error>;
    async fn create_affected_product(
        &self,
        product_id: i64,
        cve_id: &str,
        state: AffectedProductState,
        version: &str,
        package: &str,
        advisory: Option<&str>,
    ) -> Result<affected_product::Model, Error>;
    async fn update_affected_product(
        &self,
        id: i64,
        state: AffectedProductState,
        package: &str,
        advisory: Option<&str>,
    ) -> Result<(), Error>;
    async fn delete_affected_product(&self, id: i64) -> Result<(), Error>;

    // advisories

    async fn list_advisories(
        &self,
        filters: &AdvisoryFilters,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<AdvisoryData>, u64), Error>;
    async fn advisory_by_code_year_num(
        &self,
        code: &str,
        year: i32,
        num: i32,
    ) -> Result<Option<AdvisoryData>, Error>;
    async fn create_advisory(&self, advisory: NewAdvisory) -> Result<advisory::Model, Error>;
    async fn set_advisory_published_at(
        &self,
        id: i64,
        published_at: OffsetDateTime,
    ) -> Result<(), Error>;

    // fixes and joins

    async fn create_fix(
        &self,
        ticket: &str,
        source_by: &str,
        source_link: &str,
        description: &str,
    ) -> Result<i64, Error>;
    async fn create_advisory_reference(&self, advisory_id: i64, url: &str) -> Result<(), Error>;
    /// Upsert; only added if the pair does not exist yet.
    async fn add_advisory_fix(&self, advisory_id: i64, fix_id: i64) -> Result<(), Error>;
    /// Upsert; only added if the pair does not exist yet.
    async fn add_advisory_cve(&self, advisory_id: i64, cve_id: &str) -> Result<(), Error>;
    /// Upsert; only added if the triple does not exist yet.
    async fn add_advisory_rpm(
        &self,
        advisory_id: i64,
        name: &str,
        product_id: i64,
    ) -> Result<(), Error>;

    // build references

    async fn create_build_reference(
        &self,
        affected_product_id: i64,
        rpm: &str,
        src_rpm: &str,
        cve_id: &str,
        sha256_sum: &str,
        build_id: Option<&str>,
    ) -> Result<build_reference::Model, Error>;

    // mirror state

    async fn mirror_state(&self, code: &str) -> Result<Option<mirror_state::Model>, Error>;
    /// Advance the CVE poll watermark. Never moves backwards.
    async fn update_mirror_state_last_sync(
        &self,
        code: &str,
        last_sync: OffsetDateTime,
    ) -> Result<(), Error>;
    /// Advance the errata poll watermark. Never moves backwards.
    async fn update_mirror_state_errata_after(
        &self,
        code: &str,
        errata_after: OffsetDateTime,
    ) -> Result<(), Error>;
    async fn max_last_sync(&self) -> Result<Option<OffsetDateTime>, Error>;

    // package lists

    async fn ignored_packages_by_product(&self, product_id: i64) -> Result<Vec<String>, Error>;
    async fn reboot_suggested_packages(&self) -> Result<Vec<String>, Error>;

    // worker bookkeeping

    async fn task_status(&self, name: &str) -> Result<Option<task_status::Model>, Error>;
    /// Bump the heartbeat, but only if the stored value still matches
    /// `previous` (optimistic locking).
    async fn beat_task(
        &self,
        name: &str,
        previous: Option<OffsetDateTime>,
        at: OffsetDateTime,
    ) -> Result<(), Error>;
    /// Record a completed run and clear the heartbeat.
    async fn finish_task(&self, name: &str, last_run: OffsetDateTime) -> Result<(), Error>;

    // transactions

    async fn begin(&self) -> Result<Box<dyn StoreTx>, Error>;
}

/// A transactional [`Store`] handle.
#[async_trait::async_trait]
pub trait StoreTx: Store {
    async fn commit(self: Box<Self>) -> Result<(), Error>;
    async fn rollback(self: Box<Self>) -> Result<(), Error>;
}

/// Filters that need the assembled joins, shared by both implementations.
pub(crate) fn matches_filters(data: &AdvisoryData, filters: &AdvisoryFilters) -> bool {
    let contains_ci = |haystack: &str, needle: &str| {
        haystack.to_lowercase().contains(&needle.to_lowercase())
    };

    if let Some(product) = &filters.product {
        if !data.affected_products.iter().any(|p| p == product) {
            return false;
        }
    }
    if let Some(cve) = &filters.cve {
        if !data.cves.iter().any(|c| contains_ci(&c.id, cve)) {
            return false;
        }
    }
    if let Some(synopsis) = &filters.synopsis {
        if !contains_ci(&data.advisory.synopsis, synopsis) {
            return false;
        }
    }
    if let Some(keyword) = &filters.keyword {
        let advisory = &data.advisory;
        let hit = contains_ci(&advisory.synopsis, keyword)
            || contains_ci(&advisory.topic, keyword)
            || contains_ci(&advisory.description, keyword)
            || advisory
                .solution
                .as_deref()
                .map(|s| contains_ci(s, keyword))
                .unwrap_or(false)
            || data.cves.iter().any(|c| contains_ci(&c.id, keyword))
            || contains_ci(&advisory.name(), keyword);
        if !hit {
            return false;
        }
    }

    true
}

pub(crate) fn paginate(items: Vec<AdvisoryData>, page: u64, limit: u64) -> Vec<AdvisoryData> {
    if limit == 0 {
        return items;
    }
    items
        .into_iter()
        .skip((page * limit) as usize)
        .take(limit as usize)
        .collect()
}
