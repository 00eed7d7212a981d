//! In-memory implementation of [`Store`], used by tests.
//!
//! State lives behind an `Arc<RwLock<_>>`. A transaction clones the state and
//! works on the clone; committing swaps the clone back into the original, so
//! rollback behavior is observable in tests.

use crate::{
    AdvisoryCveInfo, AdvisoryData, AdvisoryFilters, AdvisoryRpmInfo, BuildArtifact, Error,
    NewAdvisory, Store, StoreTx,
};
use errata_entity::{
    advisory, advisory_cve, advisory_fix, advisory_reference, advisory_rpm, affected_product,
    affected_product::AffectedProductState, build_reference, cve, fix, ignored_upstream_package,
    mirror_state, product, reboot_suggested_package, short_code, short_code::ShortCodeMode,
    task_status,
};
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::sync::RwLock;

/// The backing data, one vector per table.
#[derive(Clone, Debug, Default)]
pub struct State {
    pub short_codes: Vec<short_code::Model>,
    pub products: Vec<product::Model>,
    pub mirror_states: Vec<mirror_state::Model>,
    pub cves: Vec<cve::Model>,
    pub affected_products: Vec<affected_product::Model>,
    pub advisories: Vec<advisory::Model>,
    pub fixes: Vec<fix::Model>,
    pub advisory_cves: Vec<advisory_cve::Model>,
    pub advisory_fixes: Vec<advisory_fix::Model>,
    pub advisory_references: Vec<advisory_reference::Model>,
    pub advisory_rpms: Vec<advisory_rpm::Model>,
    pub build_references: Vec<build_reference::Model>,
    pub ignored_upstream_packages: Vec<ignored_upstream_package::Model>,
    pub reboot_suggested_packages: Vec<reboot_suggested_package::Model>,
    pub task_statuses: Vec<task_status::Model>,
    next_id: i64,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Clone)]
pub struct MemStore {
    state: Arc<RwLock<State>>,
    /// Set on transaction handles: the state the clone gets written back to.
    origin: Option<Arc<RwLock<State>>>,
}

impl Default for MemStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemStore {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(State::default())),
            origin: None,
        }
    }

    /// Mutate the backing state directly. Test seeding.
    pub async fn edit<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        let mut state = self.state.write().await;
        f(&mut state)
    }

    /// A copy of the backing state. Test assertions.
    pub async fn snapshot(&self) -> State {
        self.state.read().await.clone()
    }

    fn assemble(state: &State, row: &advisory::Model, include_rpms: bool) -> AdvisoryData {
        let cves = state
            .advisory_cves
            .iter()
            .filter(|j| j.advisory_id == row.id)
            .filter_map(|j| state.cves.iter().find(|c| c.id == j.cve_id))
            .map(AdvisoryCveInfo::from_model)
            .collect();

        let fixes = state
            .advisory_fixes
            .iter()
            .filter(|j| j.advisory_id == row.id)
            .filter_map(|j| state.fixes.iter().find(|f| f.id == j.fix_id))
            .cloned()
            .collect();

        let references = state
            .advisory_references
            .iter()
            .filter(|r| r.advisory_id == row.id)
            .map(|r| r.url.clone())
            .collect();

        let rpms = if include_rpms {
            state
                .advisory_rpms
                .iter()
                .filter(|r| r.advisory_id == row.id)
                .map(|r| AdvisoryRpmInfo {
                    name: r.name.clone(),
                    product_name: state
                        .products
                        .iter()
                        .find(|p| p.id == r.product_id)
                        .map(|p| p.name.clone())
                        .unwrap_or_default(),
                })
                .collect()
        } else {
            Vec::new()
        };

        let upstream_name = format!("RH{}-{}:{}", row.kind.infix(), row.year, row.num);
        let affected: Vec<_> = state
            .affected_products
            .iter()
            .filter(|ap| ap.advisory.as_deref() == Some(upstream_name.as_str()))
            .collect();

        let mut affected_products: Vec<String> = Vec::new();
        let mut build_artifacts: Vec<BuildArtifact> = Vec::new();
        for ap in &affected {
            if let Some(product) = state.products.iter().find(|p| p.id == ap.product_id) {
                if !affected_products.contains(&product.name) {
                    affected_products.push(product.name.clone());
                }
            }
            for build_ref in state
                .build_references
                .iter()
                .filter(|b| b.affected_product_id == ap.id)
            {
                let artifact = BuildArtifact {
                    rpm: build_ref.rpm.clone(),
                    src_rpm: build_ref.src_rpm.clone(),
                };
                if !build_artifacts.contains(&artifact) {
                    build_artifacts.push(artifact);
                }
            }
        }

        AdvisoryData {
            advisory: row.clone(),
            affected_products,
            fixes,
            cves,
            references,
            rpms,
            build_artifacts,
        }
    }
}

#[async_trait::async_trait]
impl Store for MemStore {
    async fn all_short_codes(&self) -> Result<Vec<short_code::Model>, Error> {
        Ok(self.state.read().await.short_codes.clone())
    }

    async fn short_code_by_code(&self, code: &str) -> Result<Option<short_code::Model>, Error> {
        Ok(self
            .state
            .read()
            .await
            .short_codes
            .iter()
            .find(|s| s.code == code)
            .cloned())
    }

    async fn create_short_code(
        &self,
        code: &str,
        mode: ShortCodeMode,
    ) -> Result<short_code::Model, Error> {
        let mut state = self.state.write().await;
        if state.short_codes.iter().any(|s| s.code == code) {
            return Err(Error::Conflict("short_code"));
        }
        let model = short_code::Model {
            code: code.to_string(),
            mode,
            created_at: OffsetDateTime::now_utc(),
            archived_at: None,
        };
        state.short_codes.push(model.clone());
        Ok(model)
    }

    async fn products_by_short_code(&self, code: &str) -> Result<Vec<product::Model>, Error> {
        Ok(self
            .state
            .read()
            .await
            .products
            .iter()
            .filter(|p| p.short_code_code == code)
            .cloned()
            .collect())
    }

    async fn product_by_name_and_short_code(
        &self,
        name: &str,
        code: &str,
    ) -> Result<Option<product::Model>, Error> {
        Ok(self
            .state
            .read()
            .await
            .products
            .iter()
            .find(|p| p.name == name && p.short_code_code == code)
            .cloned())
    }

    async fn product_by_id(&self, id: i64) -> Result<Option<product::Model>, Error> {
        Ok(self
            .state
            .read()
            .await
            .products
            .iter()
            .find(|p| p.id == id)
            .cloned())
    }

    async fn cve_by_id(&self, id: &str) -> Result<Option<cve::Model>, Error> {
        Ok(self
            .state
            .read()
            .await
            .cves
            .iter()
            .find(|c| c.id == id)
            .cloned())
    }

    async fn all_cves(&self) -> Result<Vec<cve::Model>, Error> {
        Ok(self.state.read().await.cves.clone())
    }

    async fn unresolved_cves(&self) -> Result<Vec<cve::Model>, Error> {
        let state = self.state.read().await;
        Ok(state
            .cves
            .iter()
            .filter(|c| {
                let mut any = false;
                for ap in state
                    .affected_products
                    .iter()
                    .filter(|ap| ap.cve_id.as_deref() == Some(c.id.as_str()))
                {
                    any = true;
                    if ap.state.is_unresolved() {
                        return true;
                    }
                }
                !any
            })
            .cloned()
            .collect())
    }

    async fn cves_fixed_downstream(&self) -> Result<Vec<cve::Model>, Error> {
        let state = self.state.read().await;
        Ok(state
            .cves
            .iter()
            .filter(|c| {
                state.affected_products.iter().any(|ap| {
                    ap.cve_id.as_deref() == Some(c.id.as_str())
                        && ap.state == AffectedProductState::FixedDownstream
                })
            })
            .cloned()
            .collect())
    }

    async fn create_cve(
        &self,
        id: &str,
        short_code: &str,
        source_by: Option<&str>,
        source_link: Option<&str>,
        content: Option<serde_json::Value>,
    ) -> Result<cve::Model, Error> {
        let mut state = self.state.write().await;
        if state.cves.iter().any(|c| c.id == id) {
            return Err(Error::Conflict("cve"));
        }
        let model = cve::Model {
            id: id.to_string(),
            created_at: OffsetDateTime::now_utc(),
            short_code_code: short_code.to_string(),
            source_by: source_by.map(|s| s.to_string()),
            source_link: source_link.map(|s| s.to_string()),
            content,
        };
        state.cves.push(model.clone());
        Ok(model)
    }

    async fn set_cve_content(&self, id: &str, content: serde_json::Value) -> Result<(), Error> {
        let mut state = self.state.write().await;
        match state.cves.iter_mut().find(|c| c.id == id) {
            Some(cve) => {
                cve.content = Some(content);
                Ok(())
            }
            None => Err(Error::NotFound("cve")),
        }
    }

    async fn affected_products_by_cve(
        &self,
        cve: &str,
    ) -> Result<Vec<affected_product::Model>, Error> {
        Ok(self
            .state
            .read()
            .await
            .affected_products
            .iter()
            .filter(|ap| ap.cve_id.as_deref() == Some(cve))
            .cloned()
            .collect())
    }

    async fn affected_product_by_cve_and_package(
        &self,
        cve: &str,
        package: &str,
    ) -> Result<Option<affected_product::Model>, Error> {
        Ok(self
            .state
            .read()
            .await
            .affected_products
            .iter()
            .find(|ap| ap.cve_id.as_deref() == Some(cve) && ap.package == package)
            .cloned())
    }

    async fn affected_product_by_advisory(
        &self,
        advisory: &str,
    ) -> Result<Option<affected_product::Model>, Error> {
        Ok(self
            .state
            .read()
            .await
            .affected_products
            .iter()
            .find(|ap| ap.advisory.as_deref() == Some(advisory))
            .cloned())
    }

    async fn pending_affected_products(&self) -> Result<Vec<affected_product::Model>, Error> {
        Ok(self
            .state
            .read()
            .await
            .affected_products
            .iter()
            .filter(|ap| ap.state == AffectedProductState::FixedUpstream)
            .cloned()
            .collect())
    }

    async fn create_affected_product(
        &self,
        product_id: i64,
        cve_id: &str,
        state: AffectedProductState,
        version: &str,
        package: &str,
        advisory: Option<&str>,
    ) -> Result<affected_product::Model, Error> {
        let mut data = self.state.write().await;
        if data
            .affected_products
            .iter()
            .any(|ap| ap.cve_id.as_deref() == Some(cve_id) && ap.package == package)
        {
            return Err(Error::Conflict("affected_product"));
        }
        let model = affected_product::Model {
            id: data.next_id(),
            product_id,
            cve_id: Some(cve_id.to_string()),
            state,
            version: version.to_string(),
            package: package.to_string(),
            advisory: advisory.map(|s| s.to_string()),
        };
        data.affected_products.push(model.clone());
        Ok(model)
    }

    async fn update_affected_product(
        &self,
        id: i64,
        state: AffectedProductState,
        package: &str,
        advisory: Option<&str>,
    ) -> Result<(), Error> {
        let mut data = self.state.write().await;
        match data.affected_products.iter_mut().find(|ap| ap.id == id) {
            Some(ap) => {
                ap.state = state;
                ap.package = package.to_string();
                ap.advisory = advisory.map(|s| s.to_string());
                Ok(())
            }
            None => Err(Error::NotFound("affected_product")),
        }
    }

    async fn delete_affected_product(&self, id: i64) -> Result<(), Error> {
        let mut data = self.state.write().await;
        data.affected_products.retain(|ap| ap.id != id);
        Ok(())
    }

    async fn list_advisories(
        &self,
        filters: &AdvisoryFilters,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<AdvisoryData>, u64), Error> {
        let state = self.state.read().await;

        let mut rows: Vec<&advisory::Model> = state
            .advisories
            .iter()
            .filter(|a| filters.include_unpublished || a.published_at.is_some())
            .filter(|a| match (filters.before, a.published_at) {
                (Some(before), Some(published)) => published < before,
                (Some(_), None) => true,
                (None, _) => true,
            })
            .filter(|a| match (filters.after, a.published_at) {
                (Some(after), Some(published)) => published > after,
                (Some(_), None) => true,
                (None, _) => true,
            })
            .filter(|a| filters.severity.map(|s| a.severity == s).unwrap_or(true))
            .filter(|a| filters.kind.map(|k| a.kind == k).unwrap_or(true))
            .collect();
        rows.sort_by(|a, b| b.published_at.cmp(&a.published_at));

        let matched: Vec<AdvisoryData> = rows
            .into_iter()
            .map(|row| Self::assemble(&state, row, filters.include_rpms))
            .filter(|data| crate::matches_filters(data, filters))
            .collect();

        let total = matched.len() as u64;
        Ok((crate::paginate(matched, page, limit), total))
    }

    async fn advisory_by_code_year_num(
        &self,
        code: &str,
        year: i32,
        num: i32,
    ) -> Result<Option<AdvisoryData>, Error> {
        let state = self.state.read().await;
        Ok(state
            .advisories
            .iter()
            .find(|a| a.short_code_code == code && a.year == year && a.num == num)
            .map(|row| Self::assemble(&state, row, true)))
    }

    async fn create_advisory(&self, advisory: NewAdvisory) -> Result<advisory::Model, Error> {
        let mut state = self.state.write().await;
        if state.advisories.iter().any(|a| {
            a.short_code_code == advisory.short_code_code
                && a.year == advisory.year
                && a.num == advisory.num
        }) {
            return Err(Error::Conflict("advisory"));
        }
        let model = advisory::Model {
            id: state.next_id(),
            created_at: OffsetDateTime::now_utc(),
            year: advisory.year,
            num: advisory.num,
            synopsis: advisory.synopsis,
            topic: advisory.topic,
            description: advisory.description,
            solution: advisory.solution,
            severity: advisory.severity,
            kind: advisory.kind,
            redhat_issued_at: advisory.redhat_issued_at,
            short_code_code: advisory.short_code_code,
            reboot_suggested: advisory.reboot_suggested,
            published_at: None,
        };
        state.advisories.push(model.clone());
        Ok(model)
    }

    async fn set_advisory_published_at(
        &self,
        id: i64,
        published_at: OffsetDateTime,
    ) -> Result<(), Error> {
        let mut state = self.state.write().await;
        match state.advisories.iter_mut().find(|a| a.id == id) {
            Some(advisory) => {
                advisory.published_at = Some(published_at);
                Ok(())
            }
            None => Err(Error::NotFound("advisory")),
        }
    }

    async fn create_fix(
        &self,
        ticket: &str,
        source_by: &str,
        source_link: &str,
        description: &str,
    ) -> Result<i64, Error> {
        let mut state = self.state.write().await;
        let id = state.next_id();
        state.fixes.push(fix::Model {
            id,
            ticket: Some(ticket.to_string()),
            source_by: Some(source_by.to_string()),
            source_link: Some(source_link.to_string()),
            description: Some(description.to_string()),
        });
        Ok(id)
    }

    async fn create_advisory_reference(&self, advisory_id: i64, url: &str) -> Result<(), Error> {
        let mut state = self.state.write().await;
        let id = state.next_id();
        state.advisory_references.push(advisory_reference::Model {
            id,
            advisory_id,
            url: url.to_string(),
        });
        Ok(())
    }

    async fn add_advisory_fix(&self, advisory_id: i64, fix_id: i64) -> Result<(), Error> {
        let mut state = self.state.write().await;
        let exists = state
            .advisory_fixes
            .iter()
            .any(|j| j.advisory_id == advisory_id && j.fix_id == fix_id);
        if !exists {
            state.advisory_fixes.push(advisory_fix::Model {
                advisory_id,
                fix_id,
            });
        }
        Ok(())
    }

    async fn add_advisory_cve(&self, advisory_id: i64, cve_id: &str) -> Result<(), Error> {
        let mut state = self.state.write().await;
        let exists = state
            .advisory_cves
            .iter()
            .any(|j| j.advisory_id == advisory_id && j.cve_id == cve_id);
        if !exists {
            state.advisory_cves.push(advisory_cve::Model {
                advisory_id,
                cve_id: cve_id.to_string(),
            });
        }
        Ok(())
    }

    async fn add_advisory_rpm(
        &self,
        advisory_id: i64,
        name: &str,
        product_id: i64,
    ) -> Result<(), Error> {
        let mut state = self.state.write().await;
        let exists = state.advisory_rpms.iter().any(|j| {
            j.advisory_id == advisory_id && j.name == name && j.product_id == product_id
        });
        if !exists {
            state.advisory_rpms.push(advisory_rpm::Model {
                advisory_id,
                name: name.to_string(),
                product_id,
            });
        }
        Ok(())
    }

    async fn create_build_reference(
        &self,
        affected_product_id: i64,
        rpm: &str,
        src_rpm: &str,
        cve_id: &str,
        sha256_sum: &str,
        build_id: Option<&str>,
    ) -> Result<build_reference::Model, Error> {
        let mut state = self.state.write().await;
        let model = build_reference::Model {
            id: state.next_id(),
            affected_product_id,
            rpm: rpm.to_string(),
            src_rpm: src_rpm.to_string(),
            cve_id: cve_id.to_string(),
            sha256_sum: sha256_sum.to_string(),
            build_id: build_id.map(|s| s.to_string()),
        };
        state.build_references.push(model.clone());
        Ok(model)
    }

    async fn mirror_state(&self, code: &str) -> Result<Option<mirror_state::Model>, Error> {
        Ok(self
            .state
            .read()
            .await
            .mirror_states
            .iter()
            .find(|m| m.short_code_code == code)
            .cloned())
    }

    async fn update_mirror_state_last_sync(
        &self,
        code: &str,
        last_sync: OffsetDateTime,
    ) -> Result<(), Error> {
        let mut state = self.state.write().await;
        match state
            .mirror_states
            .iter_mut()
            .find(|m| m.short_code_code == code)
        {
            Some(mirror) => {
                // the watermark never moves backwards
                if mirror.last_sync.map(|t| t >= last_sync).unwrap_or(false) {
                    return Ok(());
                }
                mirror.last_sync = Some(last_sync);
            }
            None => state.mirror_states.push(mirror_state::Model {
                short_code_code: code.to_string(),
                last_sync: Some(last_sync),
                errata_after: None,
            }),
        }
        Ok(())
    }

    async fn update_mirror_state_errata_after(
        &self,
        code: &str,
        errata_after: OffsetDateTime,
    ) -> Result<(), Error> {
        let mut state = self.state.write().await;
        match state
            .mirror_states
            .iter_mut()
            .find(|m| m.short_code_code == code)
        {
            Some(mirror) => {
                if mirror
                    .errata_after
                    .map(|t| t >= errata_after)
                    .unwrap_or(false)
                {
                    return Ok(());
                }
                mirror.errata_after = Some(errata_after);
            }
            None => state.mirror_states.push(mirror_state::Model {
                short_code_code: code.to_string(),
                last_sync: None,
                errata_after: Some(errata_after),
            }),
        }
        Ok(())
    }

    async fn max_last_sync(&self) -> Result<Option<OffsetDateTime>, Error> {
        Ok(self
            .state
            .read()
            .await
            .mirror_states
            .iter()
            .filter_map(|m| m.last_sync)
            .max())
    }

    async fn ignored_packages_by_product(&self, product_id: i64) -> Result<Vec<String>, Error> {
        Ok(self
            .state
            .read()
            .await
            .ignored_upstream_packages
            .iter()
            .filter(|p| p.product_id == product_id)
            .map(|p| p.package.clone())
            .collect())
    }

    async fn reboot_suggested_packages(&self) -> Result<Vec<String>, Error> {
        Ok(self
            .state
            .read()
            .await
            .reboot_suggested_packages
            .iter()
            .map(|p| p.name.clone())
            .collect())
    }

    async fn task_status(&self, name: &str) -> Result<Option<task_status::Model>, Error> {
        Ok(self
            .state
            .read()
            .await
            .task_statuses
            .iter()
            .find(|t| t.name == name)
            .cloned())
    }

    async fn beat_task(
        &self,
        name: &str,
        previous: Option<OffsetDateTime>,
        at: OffsetDateTime,
    ) -> Result<(), Error> {
        let mut state = self.state.write().await;
        match state.task_statuses.iter_mut().find(|t| t.name == name) {
            Some(task) => {
                if task.heartbeat != previous {
                    return Err(Error::NotFound("task heartbeat"));
                }
                task.heartbeat = Some(at);
            }
            None => state.task_statuses.push(task_status::Model {
                name: name.to_string(),
                heartbeat: Some(at),
                last_run: None,
            }),
        }
        Ok(())
    }

    async fn finish_task(&self, name: &str, last_run: OffsetDateTime) -> Result<(), Error> {
        let mut state = self.state.write().await;
        match state.task_statuses.iter_mut().find(|t| t.name == name) {
            Some(task) => {
                task.heartbeat = None;
                task.last_run = Some(last_run);
            }
            None => state.task_statuses.push(task_status::Model {
                name: name.to_string(),
                heartbeat: None,
                last_run: Some(last_run),
            }),
        }
        Ok(())
    }

    async fn begin(&self) -> Result<Box<dyn StoreTx>, Error> {
        let snapshot = self.state.read().await.clone();
        Ok(Box::new(MemStore {
            state: Arc::new(RwLock::new(snapshot)),
            origin: Some(self.state.clone()),
        }))
    }
}

#[async_trait::async_trait]
impl StoreTx for MemStore {
    async fn commit(self: Box<Self>) -> Result<(), Error> {
        let origin = self.origin.as_ref().ok_or(Error::Closed)?;
        let work = self.state.read().await.clone();
        *origin.write().await = work;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), Error> {
        if self.origin.is_none() {
            return Err(Error::Closed);
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use errata_entity::advisory::{AdvisorySeverity, AdvisoryType};
    use test_log::test;
    use time::macros::datetime;

    #[test(tokio::test)]
    async fn watermarks_never_move_backwards() -> Result<(), Error> {
        let store = MemStore::new();

        store
            .update_mirror_state_last_sync("RL", datetime!(2021-06-02 0:00 UTC))
            .await?;
        store
            .update_mirror_state_last_sync("RL", datetime!(2021-06-01 0:00 UTC))
            .await?;

        let state = store.mirror_state("RL").await?.expect("mirror state");
        assert_eq!(state.last_sync, Some(datetime!(2021-06-02 0:00 UTC)));

        store
            .update_mirror_state_errata_after("RL", datetime!(2021-06-29 0:00 UTC))
            .await?;
        store
            .update_mirror_state_errata_after("RL", datetime!(2021-06-28 0:00 UTC))
            .await?;

        let state = store.mirror_state("RL").await?.expect("mirror state");
        assert_eq!(state.errata_after, Some(datetime!(2021-06-29 0:00 UTC)));

        Ok(())
    }

    #[test(tokio::test)]
    async fn transaction_rollback_discards_writes() -> Result<(), Error> {
        let store = MemStore::new();

        let tx = store.begin().await?;
        tx.create_cve("CVE-2021-3514", "RL", None, None, None).await?;
        tx.rollback().await?;
        assert!(store.cve_by_id("CVE-2021-3514").await?.is_none());

        let tx = store.begin().await?;
        tx.create_cve("CVE-2021-3514", "RL", None, None, None).await?;
        tx.commit().await?;
        assert!(store.cve_by_id("CVE-2021-3514").await?.is_some());

        Ok(())
    }

    #[test(tokio::test)]
    async fn affected_product_unique_per_cve_and_package() -> Result<(), Error> {
        let store = MemStore::new();

        store
            .create_affected_product(
                1,
                "RHBA-2021:2593",
                AffectedProductState::FixedUpstream,
                "8.4",
                "cmake-3.18.2-11.el8_4",
                Some("RHBA-2021:2593"),
            )
            .await?;

        let dup = store
            .create_affected_product(
                1,
                "RHBA-2021:2593",
                AffectedProductState::FixedUpstream,
                "8.4",
                "cmake-3.18.2-11.el8_4",
                Some("RHBA-2021:2593"),
            )
            .await;
        assert!(matches!(dup, Err(Error::Conflict(_))));

        Ok(())
    }

    #[test(tokio::test)]
    async fn advisory_unique_per_code_year_num() -> Result<(), Error> {
        let store = MemStore::new();

        let advisory = NewAdvisory {
            year: 2021,
            num: 2593,
            synopsis: "cmake bugfix update".into(),
            topic: String::new(),
            description: String::new(),
            solution: None,
            severity: AdvisorySeverity::Unknown,
            kind: AdvisoryType::Bugfix,
            redhat_issued_at: None,
            short_code_code: "RL".into(),
            reboot_suggested: false,
        };

        store.create_advisory(advisory.clone()).await?;
        assert!(matches!(
            store.create_advisory(advisory).await,
            Err(Error::Conflict(_))
        ));

        Ok(())
    }
}
