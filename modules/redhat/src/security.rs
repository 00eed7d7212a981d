//! Client for the upstream security data API.

use crate::Error;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use time::Date;
use tokio::sync::RwLock;

/// A CVE as returned by the paginated listing.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CompactCve {
    #[serde(rename = "CVE")]
    pub cve: String,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub public_date: Option<String>,
    #[serde(default)]
    pub resource_url: Option<String>,
}

/// Per-release fix information inside a CVE detail document.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AffectedRelease {
    #[serde(default)]
    pub cpe: String,
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub package: Option<String>,
    #[serde(default)]
    pub advisory: String,
}

/// Per-package state inside a CVE detail document.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PackageState {
    #[serde(default)]
    pub cpe: String,
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub package_name: String,
    #[serde(default)]
    pub fix_state: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Cvss3 {
    #[serde(default)]
    pub cvss3_scoring_vector: Option<String>,
    #[serde(default)]
    pub cvss3_base_score: Option<String>,
}

/// The parts of a CVE detail document the classifier acts on. The verbatim
/// JSON is persisted separately, so unknown fields are not lost.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CveDetail {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub affected_release: Option<Vec<AffectedRelease>>,
    #[serde(default)]
    pub package_state: Option<Vec<PackageState>>,
    #[serde(default)]
    pub cvss3: Option<Cvss3>,
    #[serde(default)]
    pub cwe: Option<String>,
}

#[async_trait::async_trait]
pub trait SecurityApi: Send + Sync {
    /// One page of CVEs for a product, modified after the given date. An
    /// empty page terminates pagination.
    async fn list_cves(
        &self,
        product: &str,
        after: Option<Date>,
        page: u32,
    ) -> Result<Vec<CompactCve>, Error>;

    /// Full CVE detail plus the verbatim response document.
    async fn get_cve(&self, id: &str) -> Result<(CveDetail, serde_json::Value), Error>;
}

pub struct HttpSecurityApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSecurityApi {
    pub const DEFAULT_BASE_URL: &'static str = "https://access.redhat.com/hydra/rest/securitydata";

    const PER_PAGE: u32 = 1000;

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
}

#[async_trait::async_trait]
impl SecurityApi for HttpSecurityApi {
    async fn list_cves(
        &self,
        product: &str,
        after: Option<Date>,
        page: u32,
    ) -> Result<Vec<CompactCve>, Error> {
        let mut request = self
            .client
            .get(format!("{}/cve.json", self.base_url))
            .query(&[("product", product)])
            .query(&[("page", page), ("per_page", Self::PER_PAGE)]);

        if let Some(after) = after {
            let format = time::macros::format_description!("[year]-[month]-[day]");
            let after = after
                .format(format)
                .map_err(|err| Error::Malformed(err.to_string()))?;
            request = request.query(&[("after", after)]);
        }

        let response = request.send().await?.error_for_status()?;
        Ok(response.json().await?)
    }

    async fn get_cve(&self, id: &str) -> Result<(CveDetail, serde_json::Value), Error> {
        let response = self
            .client
            .get(format!("{}/cve/{}.json", self.base_url, id))
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::NotFound(id.to_string()));
        }

        let content: serde_json::Value = response.error_for_status()?.json().await?;
        let detail: CveDetail = serde_json::from_value(content.clone())?;
        Ok((detail, content))
    }
}

/// Test double serving configured records.
#[derive(Default)]
pub struct MockSecurityApi {
    cves: RwLock<Vec<CompactCve>>,
    details: RwLock<HashMap<String, serde_json::Value>>,
}

impl MockSecurityApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_cves(&self, cves: Vec<CompactCve>) {
        *self.cves.write().await = cves;
    }

    pub async fn set_detail(&self, id: &str, content: serde_json::Value) {
        self.details.write().await.insert(id.to_string(), content);
    }
}

#[async_trait::async_trait]
impl SecurityApi for MockSecurityApi {
    async fn list_cves(
        &self,
        _product: &str,
        _after: Option<Date>,
        page: u32,
    ) -> Result<Vec<CompactCve>, Error> {
        // single mocked page; pagination wraps after it
        if page > 1 {
            return Ok(Vec::new());
        }
        Ok(self.cves.read().await.clone())
    }

    async fn get_cve(&self, id: &str) -> Result<(CveDetail, serde_json::Value), Error> {
        let details = self.details.read().await;
        let content = details
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        let detail: CveDetail = serde_json::from_value(content.clone())?;
        Ok((detail, content))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use test_log::test;

    #[test(tokio::test)]
    async fn detail_parses_and_keeps_verbatim_content() -> Result<(), Error> {
        let mock = MockSecurityApi::new();
        mock.set_detail(
            "CVE-2021-3514",
            serde_json::json!({
                "name": "CVE-2021-3514",
                "cvss3": {
                    "cvss3_scoring_vector": "CVSS:3.1/AV:N/AC:H/PR:L/UI:N/S:U/C:H/I:N/A:N",
                    "cvss3_base_score": "4.8"
                },
                "cwe": "CWE-303",
                "affected_release": [{
                    "product_name": "Red Hat Enterprise Linux 8",
                    "cpe": "cpe:/a:redhat:enterprise_linux:8",
                    "package": "389-ds:1.4-8040020210721055904.96015a92",
                    "advisory": "RHSA-2021:2595"
                }],
                "package_state": [{
                    "product_name": "Red Hat Enterprise Linux 7",
                    "cpe": "cpe:/o:redhat:enterprise_linux:7",
                    "package_name": "389-ds-base",
                    "fix_state": "Not affected"
                }],
                "upstream_only_field": true
            }),
        )
        .await;

        let (detail, content) = mock.get_cve("CVE-2021-3514").await?;

        let releases = detail.affected_release.expect("affected_release");
        assert_eq!(releases.len(), 1);
        assert_eq!(releases[0].advisory, "RHSA-2021:2595");

        let states = detail.package_state.expect("package_state");
        assert_eq!(states[0].fix_state, "Not affected");

        // unknown fields survive in the verbatim document
        assert_eq!(content["upstream_only_field"], serde_json::json!(true));

        Ok(())
    }

    #[test(tokio::test)]
    async fn mock_listing_is_a_single_page() -> Result<(), Error> {
        let mock = MockSecurityApi::new();
        mock.set_cves(vec![CompactCve {
            cve: "CVE-2021-3514".into(),
            ..Default::default()
        }])
        .await;

        assert_eq!(mock.list_cves("Red Hat Enterprise Linux 8", None, 1).await?.len(), 1);
        assert!(mock.list_cves("Red Hat Enterprise Linux 8", None, 2).await?.is_empty());

        Ok(())
    }
}
