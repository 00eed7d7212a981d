//! Walk pending affected products and look for downstream builds.

use crate::{is_nvr_identical, matches_any_glob, BuildStatus, Controller, Error};
use errata_common::rpm::{self, Nvr};
use errata_entity::{affected_product, affected_product::AffectedProductState, cve};
use errata_store::Store;

impl Controller {
    /// Classify one NVR against the build system, recording build references
    /// when an identical build exists.
    pub(crate) async fn check_koji_for_build(
        &self,
        tx: &dyn Store,
        ignored_packages: &[String],
        nvr_only: &str,
        affected_product: &affected_product::Model,
        cve: &cve::Model,
    ) -> BuildStatus {
        let product = match tx.product_by_id(affected_product.product_id).await {
            Ok(Some(product)) => product,
            Ok(None) | Err(_) => {
                log::error!("could not get product {}", affected_product.product_id);
                return BuildStatus::Skip;
            }
        };
        // only koji is wired up; other build systems degrade to a skip
        if product.build_system != "koji" {
            return BuildStatus::Skip;
        }

        let koji = match (self.koji)(&product) {
            Ok(koji) => koji,
            Err(err) => {
                log::error!("could not create koji client: {err}");
                return BuildStatus::Skip;
            }
        };

        let Some(nvr) = Nvr::parse(nvr_only) else {
            log::error!("Invalid NVR {nvr_only}");
            return BuildStatus::Skip;
        };

        match matches_any_glob(ignored_packages, &nvr.name) {
            Ok(true) => return BuildStatus::WillNotFix,
            Ok(false) => {}
            Err(err) => {
                log::error!("Invalid glob: {err}");
                return BuildStatus::Skip;
            }
        }

        // Module packages are not tagged into the compose tag; check every
        // build of the package instead.
        let tagged = if nvr_only.contains(".module") {
            let package = match koji.get_package(&nvr.name).await {
                Ok(Some(package)) => package,
                Ok(None) => {
                    log::error!("Package {} not known to koji", nvr.name);
                    return BuildStatus::Skip;
                }
                Err(err) => {
                    log::error!("Could not get package information from koji: {err}");
                    return BuildStatus::Skip;
                }
            };
            match koji.list_builds(package.id).await {
                Ok(builds) => builds,
                Err(err) => {
                    log::error!("Could not get builds from koji: {err}");
                    return BuildStatus::Skip;
                }
            }
        } else {
            let tag = product.koji_compose.as_deref().unwrap_or_default();
            match koji.list_tagged(tag, &nvr.name).await {
                Ok(builds) => builds,
                Err(err) => {
                    log::error!("Could not get tagged builds for package {}: {err}", nvr.name);
                    return BuildStatus::Skip;
                }
            }
        };

        // no builds usually means we don't ship that package
        if tagged.is_empty() {
            log::error!("No valid builds found for package {}", nvr.name);
            return BuildStatus::NotFixed;
        }

        let mut fixed = false;
        for build in &tagged {
            // skip module contents inserted by the module build service
            if build.has_module_typeinfo() {
                continue;
            }

            if !is_nvr_identical(build, &nvr) {
                continue;
            }

            log::info!(
                "{} has been fixed downstream with build {} ({}-{}-{})",
                cve.id,
                build.build_id,
                build.package_name,
                build.version,
                build.release
            );

            if let Err(err) = tx
                .update_affected_product(
                    affected_product.id,
                    AffectedProductState::FixedDownstream,
                    &affected_product.package,
                    affected_product.advisory.as_deref(),
                )
                .await
            {
                log::error!("Could not update affected product {}: {err}", affected_product.id);
                return BuildStatus::Skip;
            }

            let rpms = match koji.list_rpms(build.build_id).await {
                Ok(rpms) => rpms,
                Err(err) => {
                    log::error!("Could not get RPMs from koji: {err}");
                    return BuildStatus::Skip;
                }
            };

            let src_rpm = rpms
                .iter()
                .find(|rpm| rpm.arch == "src")
                .map(|rpm| {
                    format!(
                        "{}-{}:{}-{}.{}.rpm",
                        rpm.name,
                        rpm.epoch.unwrap_or(0),
                        rpm.version,
                        rpm.release,
                        rpm.arch
                    )
                })
                .unwrap_or_default();

            // every RPM becomes a build reference; this is the affected
            // packages section of the eventual advisory
            for rpm in &rpms {
                let rpm_str = format!(
                    "{}-{}:{}-{}.{}.rpm",
                    rpm.name,
                    rpm.epoch.unwrap_or(0),
                    rpm.version,
                    rpm.release,
                    rpm.arch
                );
                if let Err(err) = tx
                    .create_build_reference(
                        affected_product.id,
                        &rpm_str,
                        &src_rpm,
                        &cve.id,
                        "",
                        Some(&build.build_id.to_string()),
                    )
                    .await
                {
                    log::error!("Could not create build reference: {err}");
                    return BuildStatus::Skip;
                }
            }

            fixed = true;
            break;
        }

        if !fixed {
            log::error!("{} has not been fixed for NVR {nvr_only}", cve.id);
            return BuildStatus::NotFixed;
        }

        BuildStatus::Fixed
    }

    pub async fn downstream_check(&self) -> Result<(), Error> {
        let pending = self.store.pending_affected_products().await.map_err(|err| {
            log::error!("could not get pending affected products: {err}");
            err
        })?;

        for affected_product in &pending {
            let Some(cve_id) = affected_product.cve_id.clone() else {
                continue;
            };

            let mut will_not_fix_only = true;
            let mut all_fixed = true;

            match affected_product.state {
                AffectedProductState::WillNotFixUpstream
                | AffectedProductState::OutOfSupportScope => continue,
                AffectedProductState::UnderInvestigationUpstream
                | AffectedProductState::AffectedUpstream => continue,
                _ => {}
            }

            let product = self
                .store
                .product_by_id(affected_product.product_id)
                .await?
                .ok_or(Error::Vanished("product"))?;
            let ignored_packages = self
                .store
                .ignored_packages_by_product(product.id)
                .await?;

            let tx = self.store.begin().await?;

            let cve = self
                .store
                .cve_by_id(&cve_id)
                .await?
                .ok_or(Error::Vanished("cve"))?;

            let mut skip_product = false;

            let nvr_only = affected_product.package.replacen(':', "-", 1);
            if rpm::module().is_match(&nvr_only) {
                // Module streams cannot be matched directly; resolve the
                // SRPMs through the upstream erratum instead.
                let advisory = affected_product.advisory.clone();
                if advisory.is_none() {
                    skip_product = true;
                }

                if let Some(advisory) = advisory {
                    match self.errata.get_erratum(&advisory).await {
                        Ok(erratum) => {
                            for arch in &product.archs {
                                let product_name = errata_module_redhat::product_name_for_arch(
                                    arch,
                                    product.redhat_major_version.unwrap_or_default(),
                                );
                                let Some(affected) =
                                    erratum.affected_products.get(&product_name)
                                else {
                                    continue;
                                };

                                for srpm in &affected.srpms {
                                    let status = self
                                        .check_koji_for_build(
                                            tx.as_ref(),
                                            &ignored_packages,
                                            srpm,
                                            affected_product,
                                            &cve,
                                        )
                                        .await;
                                    match status {
                                        BuildStatus::Skip => {
                                            skip_product = true;
                                            break;
                                        }
                                        BuildStatus::Fixed => will_not_fix_only = false,
                                        BuildStatus::NotFixed => {
                                            all_fixed = false;
                                            will_not_fix_only = false;
                                        }
                                        BuildStatus::WillNotFix => {}
                                    }
                                }
                                break;
                            }
                        }
                        Err(err) => {
                            log::error!("Could not get upstream erratum: {err}");
                            skip_product = true;
                        }
                    }
                }
                if skip_product {
                    log::error!("{} has not been fixed for NVR {nvr_only}", cve.id);
                }
            } else {
                let nvr_only = rpm::strip_epoch(&affected_product.package);
                let status = self
                    .check_koji_for_build(
                        tx.as_ref(),
                        &ignored_packages,
                        &nvr_only,
                        affected_product,
                        &cve,
                    )
                    .await;
                match status {
                    BuildStatus::Skip => skip_product = true,
                    BuildStatus::Fixed => will_not_fix_only = false,
                    BuildStatus::NotFixed => {
                        all_fixed = false;
                        will_not_fix_only = false;
                    }
                    BuildStatus::WillNotFix => {}
                }
            }

            if skip_product {
                log::info!("{}: Skipping package for now", affected_product.package);
                tx.rollback().await?;
                continue;
            }

            let mut new_state = AffectedProductState::FixedUpstream;
            if all_fixed {
                new_state = AffectedProductState::FixedDownstream;
            }
            if will_not_fix_only {
                new_state = AffectedProductState::WillNotFixUpstream;
            }

            tx.update_affected_product(
                affected_product.id,
                new_state,
                &affected_product.package,
                affected_product.advisory.as_deref(),
            )
            .await?;
            tx.commit().await?;

            log::info!("{} is now set to {new_state}", cve.id);
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test::{cmake_build, cmake_compact_erratum, cmake_rpms, TestContext};
    use test_log::test;

    #[test(tokio::test)]
    async fn no_matching_build_stays_fixed_upstream() -> Result<(), Error> {
        let ctx = TestContext::new().await;
        ctx.errata
            .set_advisories(vec![cmake_compact_erratum()])
            .await;

        ctx.controller.poll_errata().await?;
        ctx.controller.downstream_check().await?;

        let affected = ctx.store.affected_products_by_cve("RHBA-2021:2593").await?;
        assert_eq!(affected.len(), 1);
        assert_eq!(affected[0].package, "cmake-3.18.2-11.el8_4");
        assert_eq!(affected[0].state, AffectedProductState::FixedUpstream);
        Ok(())
    }

    #[test(tokio::test)]
    async fn matching_build_moves_to_fixed_downstream() -> Result<(), Error> {
        let ctx = TestContext::new().await;
        ctx.errata
            .set_advisories(vec![cmake_compact_erratum()])
            .await;

        ctx.controller.poll_errata().await?;

        ctx.koji.set_tagged(vec![cmake_build()]).await;
        ctx.koji.set_rpms(cmake_rpms()).await;

        ctx.controller.downstream_check().await?;

        let affected = ctx.store.affected_products_by_cve("RHBA-2021:2593").await?;
        assert_eq!(affected.len(), 1);
        assert_eq!(affected[0].package, "cmake-3.18.2-11.el8_4");
        assert_eq!(affected[0].state, AffectedProductState::FixedDownstream);

        let state = ctx.store.snapshot().await;
        assert_eq!(state.build_references.len(), 14);
        assert!(state
            .build_references
            .iter()
            .all(|b| b.build_id.as_deref() == Some("10")));
        assert!(state
            .build_references
            .iter()
            .all(|b| b.src_rpm == "cmake-0:3.18.2-11.el8_4.src.rpm"));
        Ok(())
    }

    #[test(tokio::test)]
    async fn ignored_package_becomes_will_not_fix() -> Result<(), Error> {
        let ctx = TestContext::new().await;
        ctx.errata
            .set_advisories(vec![cmake_compact_erratum()])
            .await;
        ctx.controller.poll_errata().await?;

        ctx.store
            .edit(|state| {
                state.ignored_upstream_packages.push(
                    errata_entity::ignored_upstream_package::Model {
                        id: 900,
                        product_id: 1,
                        package: "cmake".into(),
                    },
                )
            })
            .await;

        ctx.controller.downstream_check().await?;

        let affected = ctx.store.affected_products_by_cve("RHBA-2021:2593").await?;
        assert_eq!(affected[0].state, AffectedProductState::WillNotFixUpstream);
        Ok(())
    }

    #[test(tokio::test)]
    async fn module_container_builds_are_skipped() -> Result<(), Error> {
        let ctx = TestContext::new().await;
        ctx.errata
            .set_advisories(vec![cmake_compact_erratum()])
            .await;
        ctx.controller.poll_errata().await?;

        let mut container = cmake_build();
        let mut members = std::collections::BTreeMap::new();
        members.insert(
            "typeinfo".to_string(),
            errata_module_koji::xmlrpc::Value::Struct(Default::default()),
        );
        container.extra = Some(errata_module_koji::xmlrpc::Value::Struct(members));

        ctx.koji.set_tagged(vec![container]).await;
        ctx.koji.set_rpms(cmake_rpms()).await;

        ctx.controller.downstream_check().await?;

        // the only candidate was a module container, so nothing matched
        let affected = ctx.store.affected_products_by_cve("RHBA-2021:2593").await?;
        assert_eq!(affected[0].state, AffectedProductState::FixedUpstream);
        Ok(())
    }
}
