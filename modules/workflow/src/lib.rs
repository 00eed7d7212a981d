//! The cron-driven pipeline: mirror upstream CVEs and errata, classify
//! affected products, detect downstream fixes, and auto-create advisories.

pub mod autocreate_advisory;
pub mod collect_cve_content;
pub mod downstream_check;
pub mod heartbeat;
pub mod poll_cves;
pub mod poll_errata;
pub mod server;
pub mod update_cve_state;

#[cfg(test)]
pub(crate) mod test;

use errata_entity::{
    affected_product::AffectedProductState, cve, product, short_code,
};
use errata_module_koji::KojiApi;
use errata_module_redhat::{ErrataApi, SecurityApi};
use errata_store::Store;
use regex::Regex;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Store(#[from] errata_store::Error),
    #[error(transparent)]
    Upstream(#[from] errata_module_redhat::Error),
    #[error(transparent)]
    Koji(#[from] errata_module_koji::Error),
    #[error("invalid glob pattern {0:?}")]
    Glob(String),
    #[error("{0} disappeared mid-run")]
    Vanished(&'static str),
}

/// Outcome of checking the build system for one NVR.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BuildStatus {
    /// A matching downstream build exists.
    Fixed,
    /// No matching downstream build yet.
    NotFixed,
    /// The package is on the ignored list.
    WillNotFix,
    /// Something went wrong; leave the affected product untouched.
    Skip,
}

/// Creates a build system client for a product's configured endpoint.
pub type KojiFactory = Arc<
    dyn Fn(&product::Model) -> Result<Arc<dyn KojiApi>, errata_module_koji::Error> + Send + Sync,
>;

pub struct Controller {
    store: Arc<dyn Store>,
    security: Arc<dyn SecurityApi>,
    errata: Arc<dyn ErrataApi>,
    koji: KojiFactory,
    vendor: String,
}

impl Controller {
    pub fn new(
        store: Arc<dyn Store>,
        security: Arc<dyn SecurityApi>,
        errata: Arc<dyn ErrataApi>,
        vendor: impl Into<String>,
    ) -> Self {
        Self {
            store,
            security,
            errata,
            koji: Arc::new(|product: &product::Model| {
                let client = errata_module_koji::HubClient::new(&product.build_system_endpoint)?;
                Ok(Arc::new(client) as Arc<dyn KojiApi>)
            }),
            vendor: vendor.into(),
        }
    }

    /// Replace the build system client factory. Tests plug a mock in here.
    pub fn with_koji_factory(mut self, koji: KojiFactory) -> Self {
        self.koji = koji;
        self
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Check and record one CVE package state against a downstream product.
    ///
    /// Returns `true` when the surrounding transaction should be abandoned
    /// for this CVE.
    pub(crate) async fn check_product(
        &self,
        tx: &dyn Store,
        cve: &cve::Model,
        short_code: &short_code::Model,
        product: &product::Model,
        state: AffectedProductState,
        package_name: &str,
        advisory: Option<&str>,
    ) -> bool {
        // Re-create a valid product name using the product prefix and major
        // version. Example: "Red Hat Enterprise Linux 8" translates to
        // "Rocky Linux 8" for the short code RL.
        let mirror_product_name = format!(
            "{} {}",
            product.redhat_product_prefix.as_deref().unwrap_or_default(),
            product.redhat_major_version.unwrap_or_default()
        );

        let mut affected = match tx
            .affected_product_by_cve_and_package(&cve.id, package_name)
            .await
        {
            Ok(row) => row,
            Err(err) => {
                log::error!("could not get affected product: {err}");
                return true;
            }
        };

        if affected.is_none() {
            // The package name may be a full NVR while a plain-name variant
            // already exists; prefer updating that one over creating another.
            let mut skip_create = false;
            let epochless = errata_common::rpm::strip_epoch(package_name);
            if let Some(nvr) = errata_common::rpm::Nvr::parse(&epochless) {
                match tx
                    .affected_product_by_cve_and_package(&cve.id, &nvr.name)
                    .await
                {
                    Ok(Some(row)) => {
                        affected = Some(row);
                        skip_create = true;
                    }
                    Ok(None) => {}
                    Err(err) => {
                        log::error!("could not get affected product: {err}");
                        return true;
                    }
                }
            }

            if !skip_create {
                // Only configured products get new rows. Example: as long as
                // only "Rocky Linux 8" is seeded, el9 packages are ignored.
                let configured = match tx
                    .product_by_name_and_short_code(&mirror_product_name, &short_code.code)
                    .await
                {
                    Ok(row) => row,
                    Err(err) => {
                        log::error!("could not get product: {err}");
                        return true;
                    }
                };
                let Some(configured) = configured else {
                    log::info!("Product {mirror_product_name} not supported");
                    return true;
                };

                if state != AffectedProductState::Unknown {
                    if let Err(err) = tx
                        .create_affected_product(
                            configured.id,
                            &cve.id,
                            state,
                            &configured.current_full_version,
                            package_name,
                            advisory,
                        )
                        .await
                    {
                        log::error!("could not create affected product: {err}");
                        return true;
                    }
                    log::info!(
                        "Added product {mirror_product_name} ({package_name}) to {} with state {state}",
                        cve.id
                    );
                }
                return false;
            }
        }

        if let Some(affected) = affected {
            if state != AffectedProductState::Unknown {
                // already there, nothing to do
                if affected.state == state {
                    return true;
                }
                // a downstream fix always wins over an upstream one
                if affected.state == AffectedProductState::FixedDownstream
                    && state == AffectedProductState::FixedUpstream
                {
                    return true;
                }

                if let Err(err) = tx
                    .update_affected_product(affected.id, state, package_name, advisory)
                    .await
                {
                    log::error!("could not update affected product state: {err}");
                    return true;
                }
                log::info!(
                    "Updated product {mirror_product_name} ({package_name}) on {} with state {state}",
                    cve.id
                );
            } else {
                // Unknown means the upstream reports the product as not
                // affected; drop the row.
                if let Err(err) = tx.delete_affected_product(affected.id).await {
                    log::error!("could not delete unaffected product: {err}");
                    return true;
                }
                log::info!(
                    "Product {mirror_product_name} ({package_name}) not affected by {}",
                    cve.id
                );
            }
        }

        false
    }
}

/// Map an upstream free-text fix state onto a lifecycle state.
pub(crate) fn product_state(fix_state: &str) -> AffectedProductState {
    match fix_state {
        "Under investigation" => AffectedProductState::UnderInvestigationUpstream,
        "Not affected" => AffectedProductState::Unknown,
        "Will not fix" => AffectedProductState::WillNotFixUpstream,
        "Out of support scope" => AffectedProductState::OutOfSupportScope,
        "Affected" => AffectedProductState::AffectedUpstream,
        _ => AffectedProductState::UnderInvestigationUpstream,
    }
}

/// Replace upstream vendor strings in mirrored advisory text. The longer
/// product string has to go first or it would be mangled by the shorter one.
pub(crate) fn substitute_vendor(text: &str, product_prefix: &str, vendor: &str) -> String {
    text.replace("Red Hat Enterprise Linux", product_prefix)
        .replace("Red Hat", vendor)
}

fn compile_glob(pattern: &str) -> Result<Regex, Error> {
    let mut expr = String::from("^");
    for ch in pattern.chars() {
        match ch {
            '*' => expr.push_str(".*"),
            '?' => expr.push('.'),
            other => expr.push_str(&regex::escape(&other.to_string())),
        }
    }
    expr.push('$');
    Regex::new(&expr).map_err(|_| Error::Glob(pattern.to_string()))
}

/// Whether a package name matches any of the configured glob patterns.
pub(crate) fn matches_any_glob(patterns: &[String], package_name: &str) -> Result<bool, Error> {
    for pattern in patterns {
        if compile_glob(pattern)?.is_match(package_name) {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Whether a koji build satisfies the wanted NVR. Release comparison happens
/// on the dist-stripped prefix, since downstream rebuilds may re-tag
/// (`el8_3` vs `el8`) or append their own suffix.
pub(crate) fn is_nvr_identical(
    build: &errata_module_koji::KojiBuild,
    nvr: &errata_common::rpm::Nvr,
) -> bool {
    let joined = match &nvr.arch {
        Some(arch) => format!("{}.{}", nvr.release, arch),
        None => nvr.release.clone(),
    };
    let wanted = errata_common::rpm::normalize_release(joined.trim_end_matches('.'));
    let got = errata_common::rpm::normalize_release(&build.release);

    build.package_name == nvr.name && build.version == nvr.version && got.starts_with(&wanted)
}

#[cfg(test)]
mod unit {
    use super::*;
    use errata_common::rpm::Nvr;
    use errata_module_koji::KojiBuild;

    fn build(package_name: &str, version: &str, release: &str) -> KojiBuild {
        KojiBuild {
            build_id: 10,
            package_name: package_name.to_string(),
            version: version.to_string(),
            release: release.to_string(),
            epoch: None,
            nvr: format!("{package_name}-{version}-{release}"),
            extra: None,
        }
    }

    #[test]
    fn fix_state_mapping() {
        assert_eq!(
            product_state("Under investigation"),
            AffectedProductState::UnderInvestigationUpstream
        );
        assert_eq!(product_state("Not affected"), AffectedProductState::Unknown);
        assert_eq!(
            product_state("Will not fix"),
            AffectedProductState::WillNotFixUpstream
        );
        assert_eq!(
            product_state("Out of support scope"),
            AffectedProductState::OutOfSupportScope
        );
        assert_eq!(
            product_state("Affected"),
            AffectedProductState::AffectedUpstream
        );
        assert_eq!(
            product_state("Fix deferred"),
            AffectedProductState::UnderInvestigationUpstream
        );
    }

    #[test]
    fn vendor_substitution_is_order_sensitive() {
        let text = "An update for firefox is now available for Red Hat Enterprise Linux 8. \
                    Red Hat Product Security has rated this update.";
        let out = substitute_vendor(text, "Rocky Linux", "Rocky Enterprise Software Foundation");
        assert_eq!(
            out,
            "An update for firefox is now available for Rocky Linux 8. \
             Rocky Enterprise Software Foundation Product Security has rated this update."
        );
    }

    #[test]
    fn glob_matching() {
        let patterns = vec!["kernel*".to_string(), "rhc".to_string()];
        assert!(matches_any_glob(&patterns, "kernel-rt").unwrap());
        assert!(matches_any_glob(&patterns, "rhc").unwrap());
        assert!(!matches_any_glob(&patterns, "cmake").unwrap());
        // no accidental regex metacharacters
        assert!(!matches_any_glob(&["a.b".to_string()], "axb").unwrap());
    }

    #[test]
    fn nvr_identity_ignores_dist_tag() {
        let nvr = Nvr::parse("cmake-3.18.2-11.el8_4").expect("should parse");
        assert!(is_nvr_identical(&build("cmake", "3.18.2", "11.el8_4"), &nvr));
        // initial rebuilds may carry a plain el8 dist tag
        assert!(is_nvr_identical(&build("cmake", "3.18.2", "11.el8"), &nvr));
        // downstream may append its own suffix
        assert!(is_nvr_identical(&build("cmake", "3.18.2", "11.el8_4.rocky"), &nvr));
        assert!(!is_nvr_identical(&build("cmake", "3.18.2", "12.el8_4"), &nvr));
        assert!(!is_nvr_identical(&build("cmake", "3.18.3", "11.el8_4"), &nvr));
    }

    #[test]
    fn nvr_identity_for_module_builds() {
        let nvr = Nvr::parse("389-ds-base-1.4.3.16-16.module+el8.4.0+11446+fc96bc48.src.rpm")
            .expect("should parse");
        assert!(is_nvr_identical(
            &build(
                "389-ds-base",
                "1.4.3.16",
                "16.module+el8.4.0+11000+abcd1234"
            ),
            &nvr
        ));
    }
}
