//! Mirror upstream errata listings, per short code and product.

use crate::{matches_any_glob, Controller, Error};
use errata_store::Store;
use errata_common::rpm::{AdvisoryParts, Nvr};
use errata_entity::{
    affected_product::AffectedProductState, product, short_code, short_code::ShortCodeMode,
};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

impl Controller {
    async fn poll_errata_product(
        &self,
        short_code: &short_code::Model,
        product: &product::Model,
    ) -> Result<(), Error> {
        let Some(major_version) = product.redhat_major_version else {
            return Ok(());
        };
        let prefix = product.redhat_product_prefix.as_deref().unwrap_or_default();
        if !product.name.starts_with(prefix) {
            return Ok(());
        }

        let ignored_upstream_packages = self
            .store
            .ignored_packages_by_product(product.id)
            .await
            .map_err(|err| {
                log::error!("could not get ignored packages: {err}");
                err
            })?;

        let last_sync = self
            .store
            .mirror_state(&short_code.code)
            .await
            .ok()
            .flatten()
            .and_then(|state| state.errata_after);

        let advisories = self
            .errata
            .list_advisories(&product.current_full_version, last_sync)
            .await
            .map_err(|err| {
                log::error!("Could not get upstream advisories: {err}");
                err
            })?;

        // The listing is newest first: the first parseable publication date
        // becomes the next watermark, committed only once the whole batch
        // went through.
        let mut new_last_sync = None;

        for advisory in &advisories {
            if new_last_sync.is_none() {
                if let Ok(parsed) = OffsetDateTime::parse(&advisory.publication_date, &Rfc3339) {
                    new_last_sync = Some(parsed);
                }
            }

            let Some(parts) = AdvisoryParts::parse(&advisory.name) else {
                log::error!("Invalid advisory {}", advisory.name);
                continue;
            };

            let tx = self.store.begin().await?;

            if tx
                .advisory_by_code_year_num(&short_code.code, parts.year, parts.num)
                .await?
                .is_some()
            {
                // already mirrored
                tx.commit().await?;
                continue;
            }

            if advisory.name.starts_with("RHSA") {
                // security errata only contribute their CVEs; the rest of the
                // pipeline picks them up from there
                for cve in &advisory.cves {
                    if tx.cve_by_id(cve).await?.is_some() {
                        continue;
                    }

                    let resource_url = format!(
                        "https://access.redhat.com/hydra/rest/securitydata/cve/{cve}.json"
                    );
                    let (_, content) = match self.security.get_cve(cve).await {
                        Ok(detail) => detail,
                        Err(err) => {
                            tx.rollback().await?;
                            return Err(err.into());
                        }
                    };

                    tx.create_cve(
                        cve,
                        &short_code.code,
                        Some("Red Hat"),
                        Some(&resource_url),
                        Some(content),
                    )
                    .await?;
                    log::info!("Added {cve} to {} ({})", short_code.code, advisory.name);
                }
            } else if advisory.name.starts_with("RHBA") || advisory.name.starts_with("RHEA") {
                if tx
                    .affected_product_by_advisory(&advisory.name)
                    .await?
                    .is_none()
                {
                    if tx.cve_by_id(&advisory.name).await?.is_some() {
                        tx.commit().await?;
                        continue;
                    }

                    // bugfix and enhancement errata have no CVE; the erratum
                    // name itself becomes the tracking id
                    let resource_url =
                        format!("https://access.redhat.com/errata/{}", advisory.name);
                    tx.create_cve(
                        &advisory.name,
                        &short_code.code,
                        Some("Red Hat"),
                        Some(&resource_url),
                        None,
                    )
                    .await?;

                    let dist = format!("el{major_version}");
                    for srpm in &advisory.affected_packages {
                        if !srpm.contains(".src.rpm") {
                            continue;
                        }

                        let pkg = srpm.replacen(".src.rpm", "", 1);
                        let package_name = Nvr::parse(&pkg)
                            .map(|nvr| nvr.name)
                            .unwrap_or_else(|| pkg.clone());
                        if matches_any_glob(&ignored_upstream_packages, &package_name)? {
                            continue;
                        }
                        if !pkg.contains(&dist) {
                            continue;
                        }
                        if pkg.contains(&format!("{dist}sat")) {
                            continue;
                        }

                        tx.create_affected_product(
                            product.id,
                            &advisory.name,
                            AffectedProductState::FixedUpstream,
                            &product.current_full_version,
                            &pkg,
                            Some(&advisory.name),
                        )
                        .await?;
                    }
                    log::info!("Added {} to {}", advisory.name, short_code.code);
                }
            }

            tx.commit().await?;
        }

        if let Some(new_last_sync) = new_last_sync {
            self.store
                .update_mirror_state_errata_after(&short_code.code, new_last_sync)
                .await?;
        }

        Ok(())
    }

    /// Mirror new errata for one short code.
    pub async fn poll_errata_short_code(
        &self,
        short_code: &short_code::Model,
    ) -> Result<(), Error> {
        if short_code.mode != ShortCodeMode::Mirror {
            // this is not a mirrored short code
            return Ok(());
        }

        let products = match self.store.products_by_short_code(&short_code.code).await {
            Ok(products) => products,
            Err(err) => {
                log::error!(
                    "could not get all products for code {}: {err}",
                    short_code.code
                );
                return Ok(());
            }
        };

        for product in &products {
            self.poll_errata_product(short_code, product).await?;
        }

        Ok(())
    }

    /// Mirror new errata for every short code.
    pub async fn poll_errata(&self) -> Result<(), Error> {
        let short_codes = self.store.all_short_codes().await?;

        futures::future::try_join_all(
            short_codes
                .iter()
                .map(|short_code| self.poll_errata_short_code(short_code)),
        )
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test::{cmake_compact_erratum, rhsa_2595_compact, TestContext};
    use test_log::test;

    #[test(tokio::test)]
    async fn security_erratum_creates_unresolved_cve() -> Result<(), Error> {
        let ctx = TestContext::new().await;
        ctx.errata.set_advisories(vec![rhsa_2595_compact()]).await;
        ctx.security
            .set_detail("CVE-2021-3514", serde_json::json!({"name": "CVE-2021-3514"}))
            .await;

        ctx.controller.poll_errata().await?;

        let cves = ctx.store.unresolved_cves().await?;
        assert_eq!(cves.len(), 1);
        assert_eq!(cves[0].id, "CVE-2021-3514");
        Ok(())
    }

    #[test(tokio::test)]
    async fn bugfix_erratum_creates_affected_product() -> Result<(), Error> {
        let ctx = TestContext::new().await;
        ctx.errata
            .set_advisories(vec![cmake_compact_erratum()])
            .await;

        ctx.controller.poll_errata().await?;

        let state = ctx.store.snapshot().await;
        assert_eq!(state.cves.len(), 1);
        assert_eq!(state.cves[0].id, "RHBA-2021:2593");

        let affected = ctx.store.affected_products_by_cve("RHBA-2021:2593").await?;
        assert_eq!(affected.len(), 1);
        assert_eq!(affected[0].package, "cmake-3.18.2-11.el8_4");
        assert_eq!(affected[0].state, AffectedProductState::FixedUpstream);
        assert_eq!(affected[0].advisory.as_deref(), Some("RHBA-2021:2593"));
        Ok(())
    }

    #[test(tokio::test)]
    async fn polling_twice_is_idempotent() -> Result<(), Error> {
        let ctx = TestContext::new().await;
        ctx.errata
            .set_advisories(vec![cmake_compact_erratum()])
            .await;

        ctx.controller.poll_errata().await?;
        ctx.controller.poll_errata().await?;

        let state = ctx.store.snapshot().await;
        assert_eq!(state.cves.len(), 1);
        assert_eq!(state.affected_products.len(), 1);
        Ok(())
    }

    #[test(tokio::test)]
    async fn watermark_follows_first_erratum() -> Result<(), Error> {
        let ctx = TestContext::new().await;
        ctx.errata
            .set_advisories(vec![cmake_compact_erratum()])
            .await;

        ctx.controller.poll_errata().await?;

        let state = ctx.store.mirror_state("RL").await?.expect("mirror state");
        assert_eq!(
            state.errata_after,
            Some(time::macros::datetime!(2021-06-29 0:00 UTC))
        );
        Ok(())
    }

    #[test(tokio::test)]
    async fn malformed_advisory_name_is_skipped() -> Result<(), Error> {
        let ctx = TestContext::new().await;
        let mut bad = cmake_compact_erratum();
        bad.name = "NOT-AN-ADVISORY".into();
        ctx.errata
            .set_advisories(vec![bad, rhsa_2595_compact()])
            .await;
        ctx.security
            .set_detail("CVE-2021-3514", serde_json::json!({"name": "CVE-2021-3514"}))
            .await;

        ctx.controller.poll_errata().await?;

        // the malformed entry is skipped and the batch continues
        let cves = ctx.store.unresolved_cves().await?;
        assert_eq!(cves.len(), 1);
        assert_eq!(cves[0].id, "CVE-2021-3514");
        Ok(())
    }

    #[test(tokio::test)]
    async fn satellite_and_ignored_packages_are_excluded() -> Result<(), Error> {
        let ctx = TestContext::new().await;
        ctx.store
            .edit(|state| {
                state.ignored_upstream_packages.push(
                    errata_entity::ignored_upstream_package::Model {
                        id: 900,
                        product_id: 1,
                        package: "cmake*".into(),
                    },
                )
            })
            .await;

        let mut erratum = cmake_compact_erratum();
        erratum
            .affected_packages
            .push("foreman-3.1.0-1.el8sat.src.rpm".into());
        ctx.errata.set_advisories(vec![erratum]).await;

        ctx.controller.poll_errata().await?;

        let affected = ctx.store.affected_products_by_cve("RHBA-2021:2593").await?;
        assert!(affected.is_empty());
        Ok(())
    }
}
