//! Shared harness for workflow tests: in-memory store, mocked upstream and
//! build system clients, and a seeded short code with one product.

use crate::Controller;
use errata_entity::{product, short_code, short_code::ShortCodeMode};
use errata_module_koji::{xmlrpc::Value, KojiApi, KojiBuild, KojiRpm, MockKoji};
use errata_module_redhat::{CompactErratum, MockErrataApi, MockSecurityApi};
use errata_store::{MemStore, Store};
use std::collections::BTreeMap;
use std::sync::Arc;
use time::macros::datetime;
use time::OffsetDateTime;

pub(crate) struct TestContext {
    pub store: MemStore,
    pub security: Arc<MockSecurityApi>,
    pub errata: Arc<MockErrataApi>,
    pub koji: Arc<MockKoji>,
    pub controller: Controller,
}

impl TestContext {
    pub async fn new() -> Self {
        let store = MemStore::new();
        let security = Arc::new(MockSecurityApi::new());
        let errata = Arc::new(MockErrataApi::new());
        let koji = Arc::new(MockKoji::new());

        store
            .edit(|state| {
                state.short_codes.push(short_code::Model {
                    code: "RL".into(),
                    mode: ShortCodeMode::Mirror,
                    created_at: OffsetDateTime::now_utc(),
                    archived_at: None,
                });
                state.products.push(product::Model {
                    id: 1,
                    name: "Rocky Linux 8".into(),
                    current_full_version: "8.4".into(),
                    redhat_major_version: Some(8),
                    short_code_code: "RL".into(),
                    archs: vec!["x86_64".into(), "aarch64".into()],
                    mirror_from_date: Some(datetime!(2021-06-01 0:00 UTC)),
                    redhat_product_prefix: Some("Rocky Linux".into()),
                    cpe: None,
                    eol_at: None,
                    build_system: "koji".into(),
                    build_system_endpoint: "local".into(),
                    koji_compose: Some("Rocky-8.4".into()),
                    koji_module_compose: Some("Rocky-8.4-module".into()),
                });
            })
            .await;

        let factory_koji = koji.clone();
        let controller = Controller::new(
            Arc::new(store.clone()),
            security.clone(),
            errata.clone(),
            "Rocky Enterprise Software Foundation",
        )
        .with_koji_factory(Arc::new(move |_| {
            Ok(factory_koji.clone() as Arc<dyn KojiApi>)
        }));

        Self {
            store,
            security,
            errata,
            koji,
            controller,
        }
    }
}

pub(crate) fn cmake_compact_erratum() -> CompactErratum {
    CompactErratum {
        name: "RHBA-2021:2593".into(),
        description: "An update for cmake is now available for Red Hat Enterprise Linux 8.\n\nCMake is an open-source, cross-platform family of tools designed to build, test and package software.\n\nUsers of cmake are advised to upgrade to these updated packages.".into(),
        synopsis: "cmake bugfix and enhancement update".into(),
        severity: "None".into(),
        kind: "Bug Fix".into(),
        affected_packages: vec![
            "cmake-3.18.2-11.el8_4.src.rpm".into(),
            "cmake-3.18.2-11.el8_4.x86_64.rpm".into(),
            "cmake-data-3.18.2-11.el8_4.noarch.rpm".into(),
            "cmake-debuginfo-3.18.2-11.el8_4.i686.rpm".into(),
            "cmake-debuginfo-3.18.2-11.el8_4.x86_64.rpm".into(),
            "cmake-debugsource-3.18.2-11.el8_4.i686.rpm".into(),
            "cmake-debugsource-3.18.2-11.el8_4.x86_64.rpm".into(),
            "cmake-doc-3.18.2-11.el8_4.noarch.rpm".into(),
            "cmake-filesystem-3.18.2-11.el8_4.i686.rpm".into(),
            "cmake-filesystem-3.18.2-11.el8_4.x86_64.rpm".into(),
            "cmake-gui-3.18.2-11.el8_4.x86_64.rpm".into(),
            "cmake-gui-debuginfo-3.18.2-11.el8_4.i686.rpm".into(),
            "cmake-gui-debuginfo-3.18.2-11.el8_4.x86_64.rpm".into(),
            "cmake-rpm-macros-3.18.2-11.el8_4.noarch.rpm".into(),
        ],
        cves: vec![],
        fixes: vec!["1957948".into()],
        publication_date: "2021-06-29T00:00:00Z".into(),
    }
}

pub(crate) fn rhsa_2595_compact() -> CompactErratum {
    CompactErratum {
        name: "RHSA-2021:2595".into(),
        description: String::new(),
        synopsis: "Moderate: 389-ds:1.4 security and bug fix update".into(),
        severity: "Moderate".into(),
        kind: "Security".into(),
        affected_packages: vec![
            "389-ds-base-1.4.3.16-16.module+el8.4.0+11446+fc96bc48.src.rpm".into(),
            "389-ds-base-1.4.3.16-16.module+el8.4.0+11446+fc96bc48.x86_64.rpm".into(),
            "python3-lib389-1.4.3.16-16.module+el8.4.0+11446+fc96bc48.noarch.rpm".into(),
        ],
        cves: vec!["CVE-2021-3514".into()],
        fixes: vec!["1952907".into(), "1960720".into()],
        publication_date: "2021-06-29T00:00:00Z".into(),
    }
}

pub(crate) fn cmake_build() -> KojiBuild {
    let mut source = BTreeMap::new();
    source.insert(
        "original_url".to_string(),
        Value::String(
            "git+https://git.rockylinux.org/staging/rpms/cmake.git?#aa313111d4efd7cc6c36d41cd9fc29874d1e0740".into(),
        ),
    );
    let mut extra = BTreeMap::new();
    extra.insert("source".to_string(), Value::Struct(source));

    KojiBuild {
        build_id: 10,
        package_name: "cmake".into(),
        version: "3.18.2".into(),
        release: "11.el8_4".into(),
        epoch: None,
        nvr: "cmake-3.18.2-11.el8_4".into(),
        extra: Some(Value::Struct(extra)),
    }
}

pub(crate) fn cmake_rpms() -> Vec<KojiRpm> {
    let rpm = |name: &str, arch: &str| KojiRpm {
        name: name.into(),
        epoch: None,
        version: "3.18.2".into(),
        release: "11.el8_4".into(),
        arch: arch.into(),
        build_id: 10,
    };

    vec![
        rpm("cmake", "src"),
        rpm("cmake", "x86_64"),
        rpm("cmake-gui", "x86_64"),
        rpm("cmake-doc", "noarch"),
        rpm("cmake-rpm-macros", "noarch"),
        rpm("cmake-data", "noarch"),
        rpm("cmake-debuginfo", "i686"),
        rpm("cmake-debuginfo", "x86_64"),
        rpm("cmake-debugsource", "i686"),
        rpm("cmake-debugsource", "x86_64"),
        rpm("cmake-filesystem", "i686"),
        rpm("cmake-filesystem", "x86_64"),
        rpm("cmake-gui-debuginfo", "i686"),
        rpm("cmake-gui-debuginfo", "x86_64"),
    ]
}

/// Full pipeline pass: poll, check downstream, auto-create.
#[cfg(test)]
mod pipeline {
    use super::*;
    use crate::Error;
    use errata_entity::affected_product::AffectedProductState;
    use test_log::test;

    #[test(tokio::test)]
    async fn erratum_to_unpublished_advisory() -> Result<(), Error> {
        let ctx = TestContext::new().await;
        ctx.errata
            .set_advisories(vec![cmake_compact_erratum()])
            .await;

        ctx.controller.poll_errata().await?;
        ctx.koji.set_tagged(vec![cmake_build()]).await;
        ctx.koji.set_rpms(cmake_rpms()).await;
        ctx.controller.downstream_check().await?;
        ctx.controller.autocreate_advisories().await?;

        let affected = ctx.store.affected_products_by_cve("RHBA-2021:2593").await?;
        assert_eq!(affected[0].state, AffectedProductState::FixedDownstream);

        let data = ctx
            .store
            .advisory_by_code_year_num("RL", 2021, 2593)
            .await?
            .expect("advisory");
        assert_eq!(data.advisory.name(), "RLBA-2021:2593");
        assert_eq!(data.advisory.published_at, None);
        assert_eq!(data.build_artifacts.len(), 14);

        Ok(())
    }
}
