//! Re-fetch unresolved CVEs and reclassify affected products.

use crate::{matches_any_glob, product_state, Controller, Error};
use errata_store::Store;
use errata_entity::{affected_product::AffectedProductState, product, short_code};
use std::collections::HashMap;

impl Controller {
    pub async fn update_cve_state(&self) -> Result<(), Error> {
        let cves = self.store.unresolved_cves().await.map_err(|err| {
            log::error!("could not get unresolved cves: {err}");
            err
        })?;

        let mut short_code_buffer: HashMap<String, short_code::Model> = HashMap::new();
        let mut product_buffer: HashMap<String, Vec<product::Model>> = HashMap::new();
        let mut ignored_packages_buffer: HashMap<i64, Vec<String>> = HashMap::new();

        for cve in &cves {
            if !cve.id.starts_with("CVE") {
                continue;
            }

            if !short_code_buffer.contains_key(&cve.short_code_code) {
                match self.store.short_code_by_code(&cve.short_code_code).await {
                    Ok(Some(short_code)) => {
                        short_code_buffer.insert(cve.short_code_code.clone(), short_code);
                    }
                    Ok(None) | Err(_) => {
                        log::error!("could not get short code {}", cve.short_code_code);
                        continue;
                    }
                }
            }
            let short_code = short_code_buffer[&cve.short_code_code].clone();

            if !product_buffer.contains_key(&short_code.code) {
                match self.store.products_by_short_code(&short_code.code).await {
                    Ok(products) => {
                        product_buffer.insert(short_code.code.clone(), products);
                    }
                    Err(err) => {
                        log::error!(
                            "could not get products for code {}: {err}",
                            short_code.code
                        );
                        continue;
                    }
                }
            }
            let products = product_buffer[&short_code.code].clone();

            let (detail, _) = match self.security.get_cve(&cve.id).await {
                Ok(detail) => detail,
                Err(err) => {
                    log::error!("could not retrieve new state for {} upstream: {err}", cve.id);
                    continue;
                }
            };

            for product in &products {
                if !ignored_packages_buffer.contains_key(&product.id) {
                    match self.store.ignored_packages_by_product(product.id).await {
                        Ok(ignored) => {
                            ignored_packages_buffer.insert(product.id, ignored);
                        }
                        Err(err) => {
                            log::error!("could not get ignored packages: {err}");
                            continue;
                        }
                    }
                }
                let ignored_upstream_packages = ignored_packages_buffer[&product.id].clone();

                let product_name = errata_module_redhat::product_name(
                    product.redhat_major_version.unwrap_or_default(),
                );

                let tx = match self.store.begin().await {
                    Ok(tx) => tx,
                    Err(err) => {
                        log::error!("could not begin transaction: {err}");
                        continue;
                    }
                };

                let mut skip_cve = false;

                for release in detail.affected_release.iter().flatten() {
                    let cpe_match = product
                        .cpe
                        .as_deref()
                        .map(|cpe| cpe == release.cpe)
                        .unwrap_or(false);
                    if !cpe_match && release.product_name != product_name {
                        continue;
                    }

                    let mut state = AffectedProductState::FixedUpstream;
                    let mut package_name = "TBD".to_string();
                    if let Some(package) = &release.package {
                        package_name = package.clone();

                        match matches_any_glob(&ignored_upstream_packages, &package_name) {
                            Ok(true) => state = AffectedProductState::Unknown,
                            Ok(false) => {}
                            Err(err) => {
                                log::error!("invalid glob: {err}");
                                continue;
                            }
                        }
                    } else {
                        // no package named means there is nothing to track
                        state = AffectedProductState::Unknown;
                    }

                    skip_cve = self
                        .check_product(
                            tx.as_ref(),
                            cve,
                            &short_code,
                            product,
                            state,
                            &package_name,
                            Some(&release.advisory),
                        )
                        .await;
                    if skip_cve {
                        break;
                    }
                }

                if !skip_cve {
                    for package_state in detail.package_state.iter().flatten() {
                        let cpe_match = product
                            .cpe
                            .as_deref()
                            .map(|cpe| cpe == package_state.cpe)
                            .unwrap_or(false);
                        if !cpe_match && package_state.product_name != product_name {
                            continue;
                        }

                        let mut state = product_state(&package_state.fix_state);
                        let mut package_name = "TBD".to_string();
                        if !package_state.package_name.is_empty() {
                            package_name = package_state.package_name.clone();

                            match matches_any_glob(&ignored_upstream_packages, &package_name) {
                                Ok(true) => state = AffectedProductState::Unknown,
                                Ok(false) => {}
                                Err(err) => {
                                    log::error!("invalid glob: {err}");
                                    continue;
                                }
                            }
                        }

                        skip_cve = self
                            .check_product(
                                tx.as_ref(),
                                cve,
                                &short_code,
                                product,
                                state,
                                &package_name,
                                None,
                            )
                            .await;
                        if skip_cve {
                            break;
                        }
                    }
                }

                if skip_cve {
                    let _ = tx.rollback().await;
                } else if let Err(err) = tx.commit().await {
                    log::error!("could not commit transaction: {err}");
                }
            }
        }

        Ok(())
    }
}
