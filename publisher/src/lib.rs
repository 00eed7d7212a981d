//! Advisory publisher: scans compose repositories for RPMs shipped by
//! advisories, emits `updateinfo.xml.gz`, and splices it into `repomd.xml`.

pub mod updateinfo;

use crate::updateinfo::{
    RepoMdChecksum, RepoMdData, RepoMdLocation, RepoMdRoot, Update, UpdateCollection, UpdateDate,
    UpdatePackage, UpdatePackageSum, UpdatePkgList, UpdateReference, UpdateReferences,
    UpdatesRoot, TIME_FORMAT,
};
use errata_common::rpm::{self, Nvr};
use errata_store::{AdvisoryData, AdvisoryFilters, Store};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use time::OffsetDateTime;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Store(#[from] errata_store::Error),
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not find repodata above {}", .0.display())]
    NoRepodata(PathBuf),
    #[error("invalid rpm file name {0:?}")]
    BadRpm(String),
    #[error("{}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: quick_xml::de::DeError,
    },
    #[error("could not serialize document: {0}")]
    Encode(String),
    #[error("could not format timestamp: {0}")]
    Time(#[from] time::error::Format),
}

fn io_err(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Error {
    move |source| Error::Io {
        path: path.into(),
        source,
    }
}

/// An RPM found on disk, together with the repository that owns it.
#[derive(Clone, Debug)]
struct RpmFile {
    filename: String,
    repo: PathBuf,
    sha256: String,
}

/// One advisory/RPM pair scheduled for publication into a repository.
#[derive(Clone, Debug)]
struct Publish {
    advisory_id: i64,
    /// Epoch qualified artifact name as stored on the advisory.
    artifact: String,
    filename: String,
    epoch: String,
    src_rpm: String,
    sha256: String,
}

pub struct Scanner {
    store: Arc<dyn Store>,
    repo_dir: PathBuf,
    from: String,
    product_id: i64,
    product_name: String,
    product_short: String,
}

impl Scanner {
    pub fn new(
        store: Arc<dyn Store>,
        repo_dir: impl Into<PathBuf>,
        from: impl Into<String>,
        product_id: i64,
        product_name: impl Into<String>,
        product_short: impl Into<String>,
    ) -> Self {
        Self {
            store,
            repo_dir: repo_dir.into(),
            from: from.into(),
            product_id,
            product_name: product_name.into(),
            product_short: product_short.into(),
        }
    }

    fn cache_path(&self) -> PathBuf {
        self.repo_dir
            .join(format!(".erratacache_{}", self.product_id))
    }

    /// Walk the compose and hash every RPM. Hashes are cached by file name;
    /// safe because emitted RPM file names embed the full NVRA.
    fn scan(&self, compose: &str) -> Result<Vec<RpmFile>, Error> {
        let root = self.repo_dir.join(compose);
        std::fs::metadata(&root).map_err(io_err(&root))?;

        let mut cache: HashMap<String, String> = std::fs::read(self.cache_path())
            .ok()
            .and_then(|bytes| serde_json::from_slice(&bytes).ok())
            .unwrap_or_default();

        let mut files = Vec::new();
        let mut pending = vec![root.clone()];
        while let Some(dir) = pending.pop() {
            let entries = match std::fs::read_dir(&dir) {
                Ok(entries) => entries,
                // paths we cannot access are not ours to publish
                Err(err) => {
                    log::warn!("skipping {}: {err}", dir.display());
                    continue;
                }
            };
            for entry in entries {
                let entry = entry.map_err(io_err(&dir))?;
                let path = entry.path();
                if path.is_dir() {
                    if entry.file_name() == "kickstart" {
                        continue;
                    }
                    pending.push(path);
                    continue;
                }

                let filename = entry.file_name().to_string_lossy().to_string();
                if !filename.ends_with(".rpm") {
                    continue;
                }

                let sha256 = match cache.get(&filename) {
                    Some(cached) => cached.clone(),
                    None => {
                        let sha256 = hash_file(&path)?;
                        cache.insert(filename.clone(), sha256.clone());
                        sha256
                    }
                };

                let repo = find_repo(&root, path.parent().unwrap_or(&root))
                    .ok_or_else(|| Error::NoRepodata(path.clone()))?;

                files.push(RpmFile {
                    filename,
                    repo,
                    sha256,
                });
            }
        }

        let cache_path = self.cache_path();
        std::fs::write(
            &cache_path,
            serde_json::to_vec(&cache).unwrap_or_default(),
        )
        .map_err(io_err(&cache_path))?;

        log::info!("found {} rpms under {}", files.len(), root.display());
        Ok(files)
    }

    /// Match on-disk RPMs against advisory build artifacts.
    fn match_advisories(
        &self,
        advisories: &[AdvisoryData],
        rpms: &[RpmFile],
    ) -> BTreeMap<PathBuf, Vec<Publish>> {
        let mut by_name: HashMap<&str, Vec<&RpmFile>> = HashMap::new();
        for rpm in rpms {
            by_name.entry(rpm.filename.as_str()).or_default().push(rpm);
        }

        let mut matches: BTreeMap<PathBuf, Vec<Publish>> = BTreeMap::new();
        for data in advisories {
            for artifact in &data.build_artifacts {
                let plain = rpm::strip_epoch(&artifact.rpm);
                let Some(found) = by_name.get(plain.as_str()) else {
                    continue;
                };

                let epoch = rpm::epoch()
                    .captures(&artifact.rpm)
                    .map(|caps| caps[1].to_string())
                    .unwrap_or_else(|| "0".to_string());

                for file in found {
                    log::info!(
                        "Advisory {} affects {} in {}",
                        data.advisory.name(),
                        artifact.rpm,
                        file.repo.display()
                    );
                    matches.entry(file.repo.clone()).or_default().push(Publish {
                        advisory_id: data.advisory.id,
                        artifact: artifact.rpm.clone(),
                        filename: file.filename.clone(),
                        epoch: epoch.clone(),
                        src_rpm: rpm::strip_epoch(&artifact.src_rpm),
                        sha256: file.sha256.clone(),
                    });
                }
            }
        }

        matches
    }

    /// Scan a compose, publish matching advisories into its repositories, and
    /// stamp publication dates. All database writes commit only after every
    /// repository integrated cleanly.
    pub async fn scan_and_publish(&self, compose: &str, scan_and_stop: bool) -> Result<(), Error> {
        let rpms = self.scan(compose)?;

        let filters = AdvisoryFilters {
            include_unpublished: true,
            ..Default::default()
        };
        let (advisories, _) = self.store.list_advisories(&filters, 0, 0).await?;
        let by_id: HashMap<i64, &AdvisoryData> = advisories
            .iter()
            .map(|data| (data.advisory.id, data))
            .collect();

        let matches = self.match_advisories(&advisories, &rpms);

        if scan_and_stop {
            for (repo, publishes) in &matches {
                let names: HashSet<String> = publishes
                    .iter()
                    .filter_map(|p| by_id.get(&p.advisory_id))
                    .map(|data| data.advisory.name())
                    .collect();
                log::info!(
                    "{}: would publish {} rpms for {:?}",
                    repo.display(),
                    publishes.len(),
                    names
                );
            }
            return Ok(());
        }

        let now = OffsetDateTime::now_utc();
        let tx = self.store.begin().await?;

        match self.publish(tx.as_ref(), &by_id, &matches, now).await {
            Ok(()) => {
                tx.commit().await?;
                Ok(())
            }
            Err(err) => {
                log::error!("publishing failed, rolling back: {err}");
                let _ = tx.rollback().await;
                Err(err)
            }
        }
    }

    async fn publish(
        &self,
        tx: &dyn Store,
        by_id: &HashMap<i64, &AdvisoryData>,
        matches: &BTreeMap<PathBuf, Vec<Publish>>,
        now: OffsetDateTime,
    ) -> Result<(), Error> {
        // register advisory rpms and stamp publication dates first; the
        // issued date in the emitted document is the stamped one
        let mut published_at: HashMap<i64, OffsetDateTime> = HashMap::new();
        for publishes in matches.values() {
            for publish in publishes {
                tx.add_advisory_rpm(publish.advisory_id, &publish.artifact, self.product_id)
                    .await?;

                if published_at.contains_key(&publish.advisory_id) {
                    continue;
                }
                let data = by_id[&publish.advisory_id];
                let at = match data.advisory.published_at {
                    Some(at) => at,
                    None => {
                        tx.set_advisory_published_at(publish.advisory_id, now).await?;
                        now
                    }
                };
                published_at.insert(publish.advisory_id, at);
            }
        }

        for (repo, publishes) in matches {
            self.integrate_repo(repo, by_id, publishes, &published_at, now)?;
        }

        Ok(())
    }

    fn integrate_repo(
        &self,
        repo: &Path,
        by_id: &HashMap<i64, &AdvisoryData>,
        publishes: &[Publish],
        published_at: &HashMap<i64, OffsetDateTime>,
        now: OffsetDateTime,
    ) -> Result<(), Error> {
        let repodata = repo.join("repodata");
        let repomd_path = repodata.join("repomd.xml");

        let repomd_xml =
            std::fs::read_to_string(&repomd_path).map_err(io_err(&repomd_path))?;
        let mut repomd: RepoMdRoot =
            quick_xml::de::from_str(&repomd_xml).map_err(|source| Error::Decode {
                path: repomd_path.clone(),
                source,
            })?;

        let older_update_info = repomd
            .data
            .iter()
            .find(|entry| entry.kind == "updateinfo")
            .map(|entry| entry.location.href.clone());

        // carry previously published updates forward
        let mut updates = match &older_update_info {
            Some(href) => read_updateinfo(&repo.join(href)).unwrap_or_default(),
            None => UpdatesRoot::default(),
        };

        let mut by_advisory: BTreeMap<i64, Vec<&Publish>> = BTreeMap::new();
        for publish in publishes {
            by_advisory.entry(publish.advisory_id).or_default().push(publish);
        }

        for (advisory_id, rpms) in by_advisory {
            let data = by_id[&advisory_id];
            let update = self.make_update(data, published_at[&advisory_id], &rpms)?;

            // replaying a publish must not duplicate the entry
            updates.updates.retain(|existing| existing.id != update.id);
            updates.updates.push(update);
        }

        let xml =
            quick_xml::se::to_string(&updates).map_err(|err| Error::Encode(err.to_string()))?;
        let open_size = xml.len();
        let open_checksum = hex::encode(Sha256::digest(xml.as_bytes()));

        let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder
            .write_all(xml.as_bytes())
            .map_err(io_err(&repodata))?;
        let gzipped = encoder.finish().map_err(io_err(&repodata))?;

        let closed_size = gzipped.len();
        let closed_checksum = hex::encode(Sha256::digest(&gzipped));

        let href = format!("repodata/{closed_checksum}-updateinfo.xml.gz");
        let update_info_path = repo.join(&href);
        std::fs::write(&update_info_path, &gzipped).map_err(io_err(&update_info_path))?;

        let entry = RepoMdData {
            kind: "updateinfo".into(),
            checksum: RepoMdChecksum {
                kind: "sha256".into(),
                value: closed_checksum,
            },
            open_checksum: Some(RepoMdChecksum {
                kind: "sha256".into(),
                value: open_checksum,
            }),
            location: RepoMdLocation { href: href.clone() },
            timestamp: now.unix_timestamp().to_string(),
            size: closed_size.to_string(),
            open_size: Some(open_size.to_string()),
        };

        match repomd
            .data
            .iter_mut()
            .find(|entry| entry.kind == "updateinfo")
        {
            Some(existing) => *existing = entry,
            None => repomd.data.push(entry),
        }

        let repomd_xml = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{}",
            quick_xml::se::to_string(&repomd).map_err(|err| Error::Encode(err.to_string()))?
        );
        std::fs::write(&repomd_path, repomd_xml).map_err(io_err(&repomd_path))?;

        if let Some(older) = older_update_info {
            if older != href {
                let _ = std::fs::remove_file(repo.join(older));
            }
        }

        Ok(())
    }

    fn make_update(
        &self,
        data: &AdvisoryData,
        issued_at: OffsetDateTime,
        rpms: &[&Publish],
    ) -> Result<Update, Error> {
        let advisory = &data.advisory;

        let mut references = Vec::new();
        for cve in &data.cves {
            let kind = if cve.id.starts_with("CVE") {
                "cve"
            } else {
                "erratum"
            };
            references.push(UpdateReference {
                href: cve.source_link.clone().unwrap_or_default(),
                id: cve.id.clone(),
                kind: kind.into(),
                title: format!(
                    "Update information for {} is retrieved from {}",
                    cve.id,
                    cve.source_by.as_deref().unwrap_or("upstream")
                ),
            });
        }

        let mut packages = Vec::new();
        for publish in rpms {
            let nvr = Nvr::parse(&publish.filename)
                .ok_or_else(|| Error::BadRpm(publish.filename.clone()))?;
            packages.push(UpdatePackage {
                name: nvr.name,
                version: nvr.version,
                release: nvr.release,
                epoch: publish.epoch.clone(),
                arch: nvr.arch.unwrap_or_default(),
                src: publish.src_rpm.clone(),
                filename: publish.filename.clone(),
                reboot_suggested: advisory.reboot_suggested.then(|| "True".to_string()),
                sums: vec![UpdatePackageSum {
                    kind: "sha256".into(),
                    value: publish.sha256.clone(),
                }],
            });
        }

        Ok(Update {
            from: self.from.clone(),
            status: "final".into(),
            kind: advisory.kind.updateinfo_type().into(),
            version: "2".into(),
            id: advisory.name(),
            title: advisory.synopsis.clone(),
            issued: UpdateDate {
                date: issued_at.format(TIME_FORMAT)?,
            },
            updated: UpdateDate {
                date: advisory
                    .redhat_issued_at
                    .unwrap_or(issued_at)
                    .format(TIME_FORMAT)?,
            },
            rights: format!(
                "Copyright (C) {} {}",
                issued_at.year(),
                self.product_name
            ),
            release: self.product_name.clone(),
            pushcount: "1".into(),
            severity: advisory.severity.to_string(),
            summary: advisory.topic.clone(),
            description: advisory.description.clone(),
            references: UpdateReferences { references },
            pkglist: UpdatePkgList {
                collections: vec![UpdateCollection {
                    short: self.product_short.clone(),
                    name: self.product_name.clone(),
                    packages,
                }],
            },
        })
    }
}

fn hash_file(path: &Path) -> Result<String, Error> {
    let mut file = std::fs::File::open(path).map_err(io_err(path))?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf).map_err(io_err(path))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Ascend from `dir` towards `root` until a `repodata/` directory shows up.
fn find_repo(root: &Path, dir: &Path) -> Option<PathBuf> {
    let mut current = dir;
    loop {
        if current.join("repodata").is_dir() {
            return Some(current.to_path_buf());
        }
        if current == root {
            return None;
        }
        current = current.parent()?;
    }
}

fn read_updateinfo(path: &Path) -> Option<UpdatesRoot> {
    let file = std::fs::File::open(path).ok()?;
    let mut decoded = String::new();
    GzDecoder::new(file).read_to_string(&mut decoded).ok()?;
    quick_xml::de::from_str(&decoded).ok()
}
