//! Client for the upstream errata search API.
//!
//! Listings come from the Lucene-style search endpoint. Erratum detail is
//! reconstructed from the structured search document of the erratum itself
//! rather than scraping the portal HTML page; the resulting [`Erratum`]
//! carries the same fields the page would yield.

use crate::Error;
use errata_common::rpm::Nvr;
use errata_entity::advisory::{AdvisorySeverity, AdvisoryType};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tokio::sync::RwLock;

/// An erratum as returned by the search listing.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CompactErratum {
    #[serde(rename = "id")]
    pub name: String,
    #[serde(rename = "portal_description", default)]
    pub description: String,
    #[serde(rename = "portal_synopsis", default)]
    pub synopsis: String,
    #[serde(rename = "portal_severity", default)]
    pub severity: String,
    #[serde(rename = "portal_advisory_type", default)]
    pub kind: String,
    #[serde(rename = "portal_package", default)]
    pub affected_packages: Vec<String>,
    #[serde(rename = "portal_CVE", default)]
    pub cves: Vec<String>,
    #[serde(rename = "portal_BZ", default)]
    pub fixes: Vec<String>,
    #[serde(rename = "portal_publication_date", default)]
    pub publication_date: String,
}

/// Affected packages of one upstream product group.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ErratumProduct {
    pub srpms: Vec<String>,
    /// Binary packages per arch.
    pub packages: HashMap<String, Vec<String>>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ErratumFix {
    pub bugzilla_id: String,
    pub description: String,
}

/// Full erratum detail.
#[derive(Clone, Debug)]
pub struct Erratum {
    pub name: String,
    pub synopsis: String,
    pub kind: AdvisoryType,
    pub severity: AdvisorySeverity,
    pub topic: Vec<String>,
    pub description: Vec<String>,
    /// Keyed by upstream product group name, e.g.
    /// `Red Hat Enterprise Linux for x86_64 8`.
    pub affected_products: HashMap<String, ErratumProduct>,
    pub fixes: Vec<ErratumFix>,
    pub cves: Vec<String>,
    pub references: Vec<String>,
    pub issued_at: OffsetDateTime,
}

fn el_major() -> &'static Regex {
    static LOCK: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::unwrap_used)]
    LOCK.get_or_init(|| Regex::new(r"el(\d+)").unwrap())
}

fn parse_kind(kind: &str, name: &str) -> AdvisoryType {
    match kind {
        "Security" => AdvisoryType::Security,
        "Bug Fix" => AdvisoryType::Bugfix,
        "Product Enhancement" | "Enhancement" => AdvisoryType::Enhancement,
        _ => {
            if name.starts_with("RHSA") {
                AdvisoryType::Security
            } else if name.starts_with("RHBA") {
                AdvisoryType::Bugfix
            } else {
                AdvisoryType::Enhancement
            }
        }
    }
}

fn parse_severity(severity: &str) -> AdvisorySeverity {
    match severity {
        "Critical" => AdvisorySeverity::Critical,
        "Important" => AdvisorySeverity::Important,
        "Moderate" => AdvisorySeverity::Moderate,
        "Low" => AdvisorySeverity::Low,
        _ => AdvisorySeverity::Unknown,
    }
}

impl Erratum {
    const PRODUCT_ARCHES: [&'static str; 4] = ["x86_64", "aarch64", "ppc64le", "s390x"];

    pub fn from_compact(compact: &CompactErratum) -> Result<Self, Error> {
        let issued_at = OffsetDateTime::parse(&compact.publication_date, &Rfc3339)
            .map_err(|_| {
                Error::Malformed(format!(
                    "{}: bad publication date {:?}",
                    compact.name, compact.publication_date
                ))
            })?;

        let kind = parse_kind(&compact.kind, &compact.name);
        let severity = parse_severity(&compact.severity);

        // topic and description are separate sections on the portal page; the
        // search document carries them as one text, split at the first
        // paragraph break
        let mut paragraphs: Vec<String> = compact
            .description
            .split("\n\n")
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();
        let topic = if paragraphs.is_empty() {
            Vec::new()
        } else {
            vec![paragraphs.remove(0)]
        };

        let srpms: Vec<String> = compact
            .affected_packages
            .iter()
            .filter(|p| p.ends_with(".src.rpm"))
            .cloned()
            .collect();

        let major = compact
            .affected_packages
            .iter()
            .find_map(|p| el_major().captures(p))
            .and_then(|caps| caps[1].parse::<i32>().ok());

        let mut affected_products = HashMap::new();
        if let Some(major) = major {
            for arch in Self::PRODUCT_ARCHES {
                let mut product = ErratumProduct {
                    srpms: srpms.clone(),
                    packages: HashMap::new(),
                };
                for package in &compact.affected_packages {
                    if package.ends_with(".src.rpm") {
                        continue;
                    }
                    let Some(package_arch) = Nvr::parse(package).and_then(|nvr| nvr.arch) else {
                        continue;
                    };
                    let belongs = package_arch == arch
                        || package_arch == "noarch"
                        || (arch == "x86_64" && package_arch == "i686");
                    if belongs {
                        product
                            .packages
                            .entry(package_arch)
                            .or_insert_with(Vec::new)
                            .push(package.clone());
                    }
                }
                affected_products.insert(crate::product_name_for_arch(arch, major), product);
            }
        }

        let fixes = compact
            .fixes
            .iter()
            .map(|id| ErratumFix {
                bugzilla_id: id.clone(),
                description: String::new(),
            })
            .collect();

        let mut references = Vec::new();
        if kind == AdvisoryType::Security && severity != AdvisorySeverity::Unknown {
            references.push(format!(
                "https://access.redhat.com/security/updates/classification/#{}",
                severity.to_string().to_lowercase()
            ));
        }

        Ok(Self {
            name: compact.name.clone(),
            synopsis: compact.synopsis.clone(),
            kind,
            severity,
            topic,
            description: paragraphs,
            affected_products,
            fixes,
            cves: compact.cves.clone(),
            references,
            issued_at,
        })
    }
}

#[async_trait::async_trait]
pub trait ErrataApi: Send + Sync {
    /// Compact errata for a product version, newest first, optionally limited
    /// to those published after the given time.
    async fn list_advisories(
        &self,
        current_version: &str,
        after: Option<OffsetDateTime>,
    ) -> Result<Vec<CompactErratum>, Error>;

    /// Detail for a single erratum by name.
    async fn get_erratum(&self, name: &str) -> Result<Erratum, Error>;
}

#[derive(Deserialize)]
struct SearchResponse {
    response: SearchDocs,
}

#[derive(Deserialize)]
struct SearchDocs {
    #[serde(default)]
    docs: Vec<CompactErratum>,
}

pub struct HttpErrataApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpErrataApi {
    pub const DEFAULT_BASE_URL: &'static str = "https://access.redhat.com/hydra/rest/search/kcs";

    pub fn new() -> Result<Self, Error> {
        Ok(Self {
            client: crate::http_client()?,
            base_url: Self::DEFAULT_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn search(&self, raw_query: &str) -> Result<Vec<CompactErratum>, Error> {
        let mut url = url::Url::parse(&self.base_url)
            .map_err(|err| Error::Malformed(err.to_string()))?;
        url.set_query(Some(raw_query));

        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?
            .error_for_status()?;

        let body: SearchResponse = response.json().await?;
        Ok(body.response.docs)
    }
}

#[async_trait::async_trait]
impl ErrataApi for HttpErrataApi {
    async fn list_advisories(
        &self,
        current_version: &str,
        after: Option<OffsetDateTime>,
    ) -> Result<Vec<CompactErratum>, Error> {
        let fq1 = "documentKind:(%22Errata%22)";
        let usable_version = current_version.replace('.', "%5C.");
        let fq2 = format!(
            "portal_product_filter:Red%5C+Hat%5C+Enterprise%5C+Linux%7C*%7C{usable_version}%7C*"
        );
        let mut fq3 = String::new();
        if let Some(after) = after {
            let after = after
                .format(&Rfc3339)
                .map_err(|err| Error::Malformed(err.to_string()))?;
            let filter = format!("portal_publication_date:[{after} TO NOW]");
            fq3 = format!(
                "&fq={}",
                url::form_urlencoded::byte_serialize(filter.as_bytes()).collect::<String>()
            );
        }

        let raw_query = format!(
            "fq={fq1}&fq={fq2}{fq3}&q=*:*&rows=10000&sort=portal_publication_date+desc&start=0"
        );

        self.search(&raw_query).await
    }

    async fn get_erratum(&self, name: &str) -> Result<Erratum, Error> {
        let id = url::form_urlencoded::byte_serialize(format!("\"{name}\"").as_bytes())
            .collect::<String>();
        let raw_query = format!("fq=documentKind:(%22Errata%22)&q=id:{id}&rows=1&start=0");

        let docs = self.search(&raw_query).await?;
        let compact = docs
            .into_iter()
            .find(|doc| doc.name == name)
            .ok_or_else(|| Error::NotFound(name.to_string()))?;

        Erratum::from_compact(&compact)
    }
}

/// Test double serving configured compact errata.
#[derive(Default)]
pub struct MockErrataApi {
    advisories: RwLock<Vec<CompactErratum>>,
}

impl MockErrataApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_advisories(&self, advisories: Vec<CompactErratum>) {
        *self.advisories.write().await = advisories;
    }
}

#[async_trait::async_trait]
impl ErrataApi for MockErrataApi {
    async fn list_advisories(
        &self,
        _current_version: &str,
        _after: Option<OffsetDateTime>,
    ) -> Result<Vec<CompactErratum>, Error> {
        Ok(self.advisories.read().await.clone())
    }

    async fn get_erratum(&self, name: &str) -> Result<Erratum, Error> {
        let advisories = self.advisories.read().await;
        let compact = advisories
            .iter()
            .find(|doc| doc.name == name)
            .ok_or_else(|| Error::NotFound(name.to_string()))?;
        Erratum::from_compact(compact)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use test_log::test;

    fn cmake_compact() -> CompactErratum {
        CompactErratum {
            name: "RHBA-2021:2593".into(),
            description: "An update for cmake is now available for Red Hat Enterprise Linux 8.\n\nCMake is used to control the software compilation process.\n\nUsers of cmake are advised to upgrade to these updated packages.".into(),
            synopsis: "cmake bugfix and enhancement update".into(),
            severity: "None".into(),
            kind: "Bug Fix".into(),
            affected_packages: vec![
                "cmake-3.18.2-11.el8_4.src.rpm".into(),
                "cmake-3.18.2-11.el8_4.x86_64.rpm".into(),
                "cmake-data-3.18.2-11.el8_4.noarch.rpm".into(),
                "cmake-debuginfo-3.18.2-11.el8_4.i686.rpm".into(),
            ],
            cves: vec![],
            fixes: vec!["1957948".into()],
            publication_date: "2021-06-29T00:00:00Z".into(),
        }
    }

    #[test]
    fn detail_from_compact_document() {
        let erratum = Erratum::from_compact(&cmake_compact()).expect("should convert");

        assert_eq!(erratum.name, "RHBA-2021:2593");
        assert_eq!(erratum.kind, AdvisoryType::Bugfix);
        assert_eq!(erratum.severity, AdvisorySeverity::Unknown);
        assert_eq!(
            erratum.topic,
            vec!["An update for cmake is now available for Red Hat Enterprise Linux 8.".to_string()]
        );
        assert_eq!(erratum.description.len(), 2);
        assert_eq!(erratum.fixes[0].bugzilla_id, "1957948");

        let x86 = &erratum.affected_products["Red Hat Enterprise Linux for x86_64 8"];
        assert_eq!(x86.srpms, vec!["cmake-3.18.2-11.el8_4.src.rpm".to_string()]);
        assert_eq!(x86.packages["x86_64"], vec!["cmake-3.18.2-11.el8_4.x86_64.rpm"]);
        assert_eq!(x86.packages["noarch"], vec!["cmake-data-3.18.2-11.el8_4.noarch.rpm"]);
        assert_eq!(
            x86.packages["i686"],
            vec!["cmake-debuginfo-3.18.2-11.el8_4.i686.rpm"]
        );

        // every arch group carries the SRPM list
        let arm = &erratum.affected_products["Red Hat Enterprise Linux for ARM 64 8"];
        assert_eq!(arm.srpms, vec!["cmake-3.18.2-11.el8_4.src.rpm".to_string()]);
        assert!(!arm.packages.contains_key("x86_64"));
    }

    #[test]
    fn security_detail_gets_classification_reference() {
        let compact = CompactErratum {
            name: "RHSA-2021:2595".into(),
            severity: "Moderate".into(),
            kind: "Security".into(),
            cves: vec!["CVE-2021-3514".into()],
            publication_date: "2021-06-29T00:00:00Z".into(),
            ..Default::default()
        };

        let erratum = Erratum::from_compact(&compact).expect("should convert");
        assert_eq!(erratum.kind, AdvisoryType::Security);
        assert_eq!(erratum.severity, AdvisorySeverity::Moderate);
        assert_eq!(
            erratum.references,
            vec!["https://access.redhat.com/security/updates/classification/#moderate".to_string()]
        );
        assert_eq!(erratum.cves, vec!["CVE-2021-3514".to_string()]);
    }

    #[test]
    fn bad_publication_date_is_malformed() {
        let compact = CompactErratum {
            name: "RHBA-2021:2593".into(),
            publication_date: "yesterday".into(),
            ..Default::default()
        };
        assert!(matches!(
            Erratum::from_compact(&compact),
            Err(Error::Malformed(_))
        ));
    }

    #[test(tokio::test)]
    async fn mock_serves_detail_from_listing() -> Result<(), Error> {
        let mock = MockErrataApi::new();
        mock.set_advisories(vec![cmake_compact()]).await;

        let listed = mock.list_advisories("8.4", None).await?;
        assert_eq!(listed.len(), 1);

        let erratum = mock.get_erratum("RHBA-2021:2593").await?;
        assert_eq!(erratum.synopsis, "cmake bugfix and enhancement update");

        assert!(matches!(
            mock.get_erratum("RHBA-2021:9999").await,
            Err(Error::NotFound(_))
        ));

        Ok(())
    }
}
