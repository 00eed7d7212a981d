//! End-to-end publisher runs against an on-disk compose tree and the
//! in-memory store.

use errata_entity::advisory::{AdvisorySeverity, AdvisoryType};
use errata_entity::{affected_product::AffectedProductState, product};
use errata_publisher::updateinfo::{RepoMdRoot, UpdatesRoot};
use errata_publisher::Scanner;
use errata_store::{MemStore, NewAdvisory, Store};
use flate2::read::GzDecoder;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use test_log::test;
use time::macros::datetime;

fn rpm_files() -> Vec<String> {
    // the 14 RPMs of the cmake build, one file name per (name, arch)
    [
        ("cmake", "src"),
        ("cmake", "x86_64"),
        ("cmake-gui", "x86_64"),
        ("cmake-doc", "noarch"),
        ("cmake-rpm-macros", "noarch"),
        ("cmake-data", "noarch"),
        ("cmake-debuginfo", "i686"),
        ("cmake-debuginfo", "x86_64"),
        ("cmake-debugsource", "i686"),
        ("cmake-debugsource", "x86_64"),
        ("cmake-filesystem", "i686"),
        ("cmake-filesystem", "x86_64"),
        ("cmake-gui-debuginfo", "i686"),
        ("cmake-gui-debuginfo", "x86_64"),
    ]
    .iter()
    .map(|(name, arch)| format!("{name}-3.18.2-11.el8_4.{arch}.rpm"))
    .collect()
}

const REPOMD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<repomd xmlns="http://linux.duke.edu/metadata/repo" xmlns:rpm="http://linux.duke.edu/metadata/rpm">
  <revision>1624924800</revision>
  <data type="primary">
    <checksum type="sha256">aaaa</checksum>
    <open-checksum type="sha256">bbbb</open-checksum>
    <location href="repodata/aaaa-primary.xml.gz"/>
    <timestamp>1624924800</timestamp>
    <size>100</size>
    <open-size>200</open-size>
  </data>
</repomd>
"#;

async fn seeded_store() -> MemStore {
    let store = MemStore::new();

    store
        .edit(|state| {
            state.products.push(product::Model {
                id: 1,
                name: "Rocky Linux 8".into(),
                current_full_version: "8.4".into(),
                redhat_major_version: Some(8),
                short_code_code: "RL".into(),
                archs: vec!["x86_64".into()],
                mirror_from_date: None,
                redhat_product_prefix: Some("Rocky Linux".into()),
                cpe: None,
                eol_at: None,
                build_system: "koji".into(),
                build_system_endpoint: "local".into(),
                koji_compose: Some("Rocky-8.4".into()),
                koji_module_compose: None,
            });
        })
        .await;

    let advisory = store
        .create_advisory(NewAdvisory {
            year: 2021,
            num: 2593,
            synopsis: "cmake bugfix and enhancement update".into(),
            topic: "An update for cmake is now available for Rocky Linux 8.".into(),
            description: "CMake is an open-source, cross-platform build tool.".into(),
            solution: None,
            severity: AdvisorySeverity::Unknown,
            kind: AdvisoryType::Bugfix,
            redhat_issued_at: Some(datetime!(2021-06-29 0:00 UTC)),
            short_code_code: "RL".into(),
            reboot_suggested: false,
        })
        .await
        .expect("create advisory");

    store
        .create_cve(
            "RHBA-2021:2593",
            "RL",
            Some("Red Hat"),
            Some("https://access.redhat.com/errata/RHBA-2021:2593"),
            None,
        )
        .await
        .expect("create cve");
    store
        .add_advisory_cve(advisory.id, "RHBA-2021:2593")
        .await
        .expect("link cve");

    let affected = store
        .create_affected_product(
            1,
            "RHBA-2021:2593",
            AffectedProductState::FixedDownstream,
            "8.4",
            "cmake-3.18.2-11.el8_4",
            Some("RHBA-2021:2593"),
        )
        .await
        .expect("create affected product");

    for file in rpm_files() {
        let artifact = file.replacen("-3.18.2-", "-0:3.18.2-", 1);
        store
            .create_build_reference(
                affected.id,
                &artifact,
                "cmake-0:3.18.2-11.el8_4.src.rpm",
                "RHBA-2021:2593",
                "",
                Some("10"),
            )
            .await
            .expect("create build reference");
    }

    store
}

fn write_compose(root: &Path) {
    let repo = root.join("Rocky-8.4/BaseOS/x86_64/os");
    let packages = repo.join("Packages");
    let repodata = repo.join("repodata");
    std::fs::create_dir_all(&packages).expect("create packages dir");
    std::fs::create_dir_all(&repodata).expect("create repodata dir");

    for file in rpm_files() {
        std::fs::write(packages.join(&file), file.as_bytes()).expect("write rpm");
    }
    std::fs::write(repodata.join("repomd.xml"), REPOMD).expect("write repomd");
}

fn read_published_updateinfo(repo: &Path) -> (RepoMdRoot, UpdatesRoot) {
    let repomd_xml =
        std::fs::read_to_string(repo.join("repodata/repomd.xml")).expect("read repomd");
    let repomd: RepoMdRoot = quick_xml::de::from_str(&repomd_xml).expect("parse repomd");

    let entry = repomd
        .data
        .iter()
        .find(|entry| entry.kind == "updateinfo")
        .expect("updateinfo entry")
        .clone();

    let gz = std::fs::File::open(repo.join(&entry.location.href)).expect("open updateinfo");
    let mut xml = String::new();
    GzDecoder::new(gz)
        .read_to_string(&mut xml)
        .expect("gunzip updateinfo");
    let updates: UpdatesRoot = quick_xml::de::from_str(&xml).expect("parse updateinfo");

    (repomd, updates)
}

fn scanner(store: Arc<MemStore>, root: &Path) -> Scanner {
    Scanner::new(
        store,
        root,
        "releng@rockylinux.org",
        1,
        "Rocky Linux 8",
        "RL8",
    )
}

#[test(tokio::test)]
async fn publish_compose_end_to_end() {
    let store = seeded_store().await;
    let dir = tempfile::tempdir().expect("tempdir");
    write_compose(dir.path());

    scanner(Arc::new(store.clone()), dir.path())
        .scan_and_publish("Rocky-8.4", false)
        .await
        .expect("publish");

    let repo = dir.path().join("Rocky-8.4/BaseOS/x86_64/os");
    let (repomd, updates) = read_published_updateinfo(&repo);

    let entry = repomd
        .data
        .iter()
        .find(|entry| entry.kind == "updateinfo")
        .expect("updateinfo entry");
    assert!(entry.location.href.ends_with("-updateinfo.xml.gz"));
    assert_eq!(entry.checksum.kind, "sha256");
    assert!(entry.location.href.contains(&entry.checksum.value));

    assert_eq!(updates.updates.len(), 1);
    let update = &updates.updates[0];
    assert_eq!(update.id, "RLBA-2021:2593");
    assert_eq!(update.kind, "bugfix");
    assert_eq!(update.severity, "None");
    assert_eq!(update.updated.date, "2021-06-29 00:00:00");
    assert_eq!(update.pkglist.collections.len(), 1);
    assert_eq!(update.pkglist.collections[0].packages.len(), 14);
    assert_eq!(update.references.references.len(), 1);
    assert_eq!(update.references.references[0].kind, "erratum");

    let cmake = update.pkglist.collections[0]
        .packages
        .iter()
        .find(|p| p.name == "cmake" && p.arch == "x86_64")
        .expect("cmake package");
    assert_eq!(cmake.filename, "cmake-3.18.2-11.el8_4.x86_64.rpm");
    assert_eq!(cmake.epoch, "0");
    assert_eq!(cmake.src, "cmake-3.18.2-11.el8_4.src.rpm");
    assert_eq!(cmake.sums[0].kind, "sha256");
    assert!(!cmake.sums[0].value.is_empty());

    // the database now carries the publication
    let state = store.snapshot().await;
    assert!(state.advisories[0].published_at.is_some());
    assert_eq!(state.advisory_rpms.len(), 14);
    assert!(state.advisory_rpms.iter().all(|rpm| rpm.product_id == 1));

    // the hash cache was written next to the composes
    assert!(dir.path().join(".erratacache_1").exists());
}

#[test(tokio::test)]
async fn republishing_replaces_the_artifact() {
    let store = seeded_store().await;
    let dir = tempfile::tempdir().expect("tempdir");
    write_compose(dir.path());

    let repo = dir.path().join("Rocky-8.4/BaseOS/x86_64/os");

    scanner(Arc::new(store.clone()), dir.path())
        .scan_and_publish("Rocky-8.4", false)
        .await
        .expect("first publish");
    let (first_md, _) = read_published_updateinfo(&repo);
    let first_href = first_md
        .data
        .iter()
        .find(|e| e.kind == "updateinfo")
        .expect("entry")
        .location
        .href
        .clone();

    scanner(Arc::new(store.clone()), dir.path())
        .scan_and_publish("Rocky-8.4", false)
        .await
        .expect("second publish");

    let (second_md, updates) = read_published_updateinfo(&repo);
    assert_eq!(
        second_md
            .data
            .iter()
            .filter(|e| e.kind == "updateinfo")
            .count(),
        1
    );
    // the update list did not grow
    assert_eq!(updates.updates.len(), 1);

    let second_href = second_md
        .data
        .iter()
        .find(|e| e.kind == "updateinfo")
        .expect("entry")
        .location
        .href
        .clone();
    if first_href != second_href {
        assert!(!repo.join(&first_href).exists());
    }
}

#[test(tokio::test)]
async fn scan_and_stop_writes_nothing() {
    let store = seeded_store().await;
    let dir = tempfile::tempdir().expect("tempdir");
    write_compose(dir.path());

    scanner(Arc::new(store.clone()), dir.path())
        .scan_and_publish("Rocky-8.4", true)
        .await
        .expect("scan");

    let repo = dir.path().join("Rocky-8.4/BaseOS/x86_64/os");
    let repomd_xml =
        std::fs::read_to_string(repo.join("repodata/repomd.xml")).expect("read repomd");
    assert!(!repomd_xml.contains("updateinfo"));

    let state = store.snapshot().await;
    assert!(state.advisories[0].published_at.is_none());
    assert!(state.advisory_rpms.is_empty());
}

#[test(tokio::test)]
async fn broken_repository_rolls_everything_back() {
    let store = seeded_store().await;
    let dir = tempfile::tempdir().expect("tempdir");
    write_compose(dir.path());

    let repo = dir.path().join("Rocky-8.4/BaseOS/x86_64/os");
    std::fs::write(repo.join("repodata/repomd.xml"), "not xml").expect("corrupt repomd");

    let result = scanner(Arc::new(store.clone()), dir.path())
        .scan_and_publish("Rocky-8.4", false)
        .await;
    assert!(result.is_err());

    // no publication date, no advisory rpm rows
    let state = store.snapshot().await;
    assert!(state.advisories[0].published_at.is_none());
    assert!(state.advisory_rpms.is_empty());
}
