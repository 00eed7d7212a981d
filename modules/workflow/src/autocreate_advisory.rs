//! Materialise downstream advisories for CVEs fully fixed downstream.

use crate::{matches_any_glob, substitute_vendor, Controller, Error};
use errata_common::rpm::{self, AdvisoryParts};
use errata_store::{NewAdvisory, Store};

impl Controller {
    pub async fn autocreate_advisories(&self) -> Result<(), Error> {
        let cves = self.store.cves_fixed_downstream().await.map_err(|err| {
            log::error!("Could not get cves fixed downstream: {err}");
            err
        })?;

        let reboot_suggested_packages =
            self.store.reboot_suggested_packages().await.map_err(|err| {
                log::error!("Could not get reboot suggested packages: {err}");
                err
            })?;

        'cves: for cve in &cves {
            let tx = match self.store.begin().await {
                Ok(tx) => tx,
                Err(err) => {
                    log::error!("could not begin tx: {err}");
                    continue;
                }
            };

            let affected_products = match tx.affected_products_by_cve(&cve.id).await {
                Ok(affected) => affected,
                Err(err) => {
                    log::error!("Could not get affected products for {}: {err}", cve.id);
                    let _ = tx.rollback().await;
                    continue;
                }
            };

            let mut advisory_name = String::new();

            for affected_product in &affected_products {
                // only affected products carrying an upstream erratum can
                // seed a downstream advisory
                let Some(upstream_advisory) = affected_product.advisory.clone() else {
                    continue;
                };
                let product = self
                    .store
                    .product_by_id(affected_product.product_id)
                    .await?
                    .ok_or(Error::Vanished("product"))?;

                let Some(parts) = AdvisoryParts::parse(&upstream_advisory) else {
                    log::error!("invalid advisory {upstream_advisory}");
                    continue;
                };

                let existing = match tx
                    .advisory_by_code_year_num(&product.short_code_code, parts.year, parts.num)
                    .await
                {
                    Ok(existing) => existing,
                    Err(err) => {
                        log::error!("Could not retrieve advisory: {err}");
                        let _ = tx.rollback().await;
                        continue 'cves;
                    }
                };

                let advisory_id = match existing {
                    Some(existing) => {
                        advisory_name = existing.advisory.name();
                        existing.advisory.id
                    }
                    None => {
                        let erratum = match self.errata.get_erratum(&upstream_advisory).await {
                            Ok(erratum) => erratum,
                            Err(err) => {
                                log::error!("could not get upstream erratum: {err}");
                                let _ = tx.rollback().await;
                                continue 'cves;
                            }
                        };

                        let prefix =
                            product.redhat_product_prefix.as_deref().unwrap_or_default();
                        let topic: Vec<String> = erratum
                            .topic
                            .iter()
                            .map(|t| substitute_vendor(t, prefix, &self.vendor))
                            .collect();
                        let description: Vec<String> = erratum
                            .description
                            .iter()
                            .map(|d| substitute_vendor(d, prefix, &self.vendor))
                            .collect();

                        // module streams never drive the reboot flag
                        let mut reboot_suggested = false;
                        if !rpm::module().is_match(&affected_product.package) {
                            let nvr = rpm::Nvr::parse(&affected_product.package);
                            let package_name = nvr
                                .map(|nvr| nvr.name)
                                .unwrap_or_else(|| affected_product.package.clone());
                            reboot_suggested =
                                matches_any_glob(&reboot_suggested_packages, &package_name)?;
                        }

                        let created = match tx
                            .create_advisory(NewAdvisory {
                                year: parts.year,
                                num: parts.num,
                                synopsis: erratum.synopsis.clone(),
                                topic: topic.join("\n"),
                                description: description.join("\n"),
                                solution: None,
                                severity: erratum.severity,
                                kind: erratum.kind,
                                redhat_issued_at: Some(erratum.issued_at),
                                short_code_code: product.short_code_code.clone(),
                                reboot_suggested,
                            })
                            .await
                        {
                            Ok(created) => created,
                            Err(err) => {
                                log::error!("Could not create new advisory: {err}");
                                let _ = tx.rollback().await;
                                continue 'cves;
                            }
                        };
                        advisory_name = created.name();

                        for fix in &erratum.fixes {
                            let source_link = format!(
                                "https://bugzilla.redhat.com/show_bug.cgi?id={}",
                                fix.bugzilla_id
                            );
                            let fix_id = match tx
                                .create_fix(
                                    &fix.bugzilla_id,
                                    "Red Hat",
                                    &source_link,
                                    &fix.description,
                                )
                                .await
                            {
                                Ok(id) => id,
                                Err(err) => {
                                    log::error!(
                                        "Could not create fix for BZ#{}: {err}",
                                        fix.bugzilla_id
                                    );
                                    let _ = tx.rollback().await;
                                    continue 'cves;
                                }
                            };
                            if let Err(err) = tx.add_advisory_fix(created.id, fix_id).await {
                                log::error!(
                                    "Could not add fix BZ#{} to advisory {}: {err}",
                                    fix.bugzilla_id,
                                    created.id
                                );
                                let _ = tx.rollback().await;
                                continue 'cves;
                            }
                        }

                        for reference in &erratum.references {
                            // upstream-internal references stay upstream
                            if reference.contains("redhat.com") {
                                continue;
                            }
                            if let Err(err) =
                                tx.create_advisory_reference(created.id, reference).await
                            {
                                log::error!("Could not add reference {reference}: {err}");
                                let _ = tx.rollback().await;
                                continue 'cves;
                            }
                        }

                        created.id
                    }
                };

                if let Err(err) = tx.add_advisory_cve(advisory_id, &cve.id).await {
                    log::error!("Could not add {} to advisory {advisory_id}: {err}", cve.id);
                    let _ = tx.rollback().await;
                    continue 'cves;
                }
            }

            if let Err(err) = tx.commit().await {
                log::error!("Could not commit database transaction: {err}");
                continue;
            }

            if !advisory_name.is_empty() {
                log::info!("Created/updated advisory {advisory_name} for {}", cve.id);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use crate::test::{cmake_build, cmake_compact_erratum, cmake_rpms, TestContext};
    use crate::Error;
    use errata_entity::advisory::{AdvisorySeverity, AdvisoryType};
    use errata_store::Store;
    use test_log::test;
    use time::macros::datetime;

    async fn fixed_downstream_context() -> Result<TestContext, Error> {
        let ctx = TestContext::new().await;
        ctx.errata
            .set_advisories(vec![cmake_compact_erratum()])
            .await;
        ctx.controller.poll_errata().await?;
        ctx.koji.set_tagged(vec![cmake_build()]).await;
        ctx.koji.set_rpms(cmake_rpms()).await;
        ctx.controller.downstream_check().await?;
        Ok(ctx)
    }

    #[test(tokio::test)]
    async fn creates_advisory_for_fixed_cve() -> Result<(), Error> {
        let ctx = fixed_downstream_context().await?;

        ctx.controller.autocreate_advisories().await?;

        let data = ctx
            .store
            .advisory_by_code_year_num("RL", 2021, 2593)
            .await?
            .expect("advisory");
        let advisory = &data.advisory;
        assert_eq!(advisory.name(), "RLBA-2021:2593");
        assert_eq!(advisory.kind, AdvisoryType::Bugfix);
        assert_eq!(advisory.severity, AdvisorySeverity::Unknown);
        assert_eq!(advisory.synopsis, "cmake bugfix and enhancement update");
        assert_eq!(
            advisory.redhat_issued_at,
            Some(datetime!(2021-06-29 0:00 UTC))
        );
        assert_eq!(advisory.published_at, None);
        // upstream vendor strings are rewritten
        assert!(advisory.topic.contains("Rocky Linux 8"));
        assert!(!advisory.topic.contains("Red Hat"));

        // the CVE is linked and the bugzilla fix carried over
        assert_eq!(data.cves.len(), 1);
        assert_eq!(data.cves[0].id, "RHBA-2021:2593");
        assert_eq!(data.fixes.len(), 1);
        assert_eq!(data.fixes[0].ticket.as_deref(), Some("1957948"));

        // build artifacts surface through the upstream advisory link
        assert_eq!(data.build_artifacts.len(), 14);
        Ok(())
    }

    #[test(tokio::test)]
    async fn creating_twice_reuses_the_advisory() -> Result<(), Error> {
        let ctx = fixed_downstream_context().await?;

        ctx.controller.autocreate_advisories().await?;
        ctx.controller.autocreate_advisories().await?;

        let state = ctx.store.snapshot().await;
        assert_eq!(state.advisories.len(), 1);
        assert_eq!(state.advisory_cves.len(), 1);
        Ok(())
    }

    #[test(tokio::test)]
    async fn upstream_fetch_failure_rolls_back() -> Result<(), Error> {
        let ctx = fixed_downstream_context().await?;

        // drop the upstream erratum so the detail fetch fails
        ctx.errata.set_advisories(vec![]).await;

        ctx.controller.autocreate_advisories().await?;

        let state = ctx.store.snapshot().await;
        assert!(state.advisories.is_empty());
        assert!(state.advisory_cves.is_empty());
        Ok(())
    }

    #[test(tokio::test)]
    async fn partially_fixed_cves_are_not_advised() -> Result<(), Error> {
        let ctx = TestContext::new().await;
        ctx.errata
            .set_advisories(vec![cmake_compact_erratum()])
            .await;
        ctx.controller.poll_errata().await?;

        // still waiting on a downstream build
        ctx.controller.autocreate_advisories().await?;

        let state = ctx.store.snapshot().await;
        assert!(state.advisories.is_empty());
        Ok(())
    }
}
