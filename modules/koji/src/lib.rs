//! Client for the koji build system hub.

pub mod hub;
pub mod xmlrpc;

pub use hub::HubClient;

use tokio::sync::RwLock;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("could not decode hub response: {0}")]
    Decode(String),
    #[error("hub fault {code}: {message}")]
    Fault { code: i64, message: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KojiPackage {
    pub id: i64,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct KojiBuild {
    pub build_id: i64,
    pub package_name: String,
    pub version: String,
    pub release: String,
    pub epoch: Option<i64>,
    pub nvr: String,
    pub extra: Option<xmlrpc::Value>,
}

impl KojiBuild {
    /// Module container builds carry `extra.typeinfo`; their contents are
    /// inserted by the module build service and are not real builds.
    pub fn has_module_typeinfo(&self) -> bool {
        self.extra
            .as_ref()
            .and_then(|extra| extra.get("typeinfo"))
            .is_some()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KojiRpm {
    pub name: String,
    pub epoch: Option<i64>,
    pub version: String,
    pub release: String,
    pub arch: String,
    pub build_id: i64,
}

#[async_trait::async_trait]
pub trait KojiApi: Send + Sync {
    async fn get_package(&self, name: &str) -> Result<Option<KojiPackage>, Error>;
    async fn list_builds(&self, package_id: i64) -> Result<Vec<KojiBuild>, Error>;
    async fn list_tagged(&self, tag: &str, package: &str) -> Result<Vec<KojiBuild>, Error>;
    async fn list_rpms(&self, build_id: i64) -> Result<Vec<KojiRpm>, Error>;
}

/// Test double with settable hub state.
#[derive(Default)]
pub struct MockKoji {
    pub packages: RwLock<Vec<KojiPackage>>,
    pub builds: RwLock<Vec<KojiBuild>>,
    pub tagged: RwLock<Vec<KojiBuild>>,
    pub rpms: RwLock<Vec<KojiRpm>>,
}

impl MockKoji {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_tagged(&self, tagged: Vec<KojiBuild>) {
        *self.tagged.write().await = tagged;
    }

    pub async fn set_builds(&self, builds: Vec<KojiBuild>) {
        *self.builds.write().await = builds;
    }

    pub async fn set_rpms(&self, rpms: Vec<KojiRpm>) {
        *self.rpms.write().await = rpms;
    }

    pub async fn set_packages(&self, packages: Vec<KojiPackage>) {
        *self.packages.write().await = packages;
    }
}

#[async_trait::async_trait]
impl KojiApi for MockKoji {
    async fn get_package(&self, name: &str) -> Result<Option<KojiPackage>, Error> {
        Ok(self
            .packages
            .read()
            .await
            .iter()
            .find(|p| p.name == name)
            .cloned())
    }

    async fn list_builds(&self, package_id: i64) -> Result<Vec<KojiBuild>, Error> {
        let packages = self.packages.read().await;
        let package = packages.iter().find(|p| p.id == package_id);
        Ok(self
            .builds
            .read()
            .await
            .iter()
            .filter(|b| package.map(|p| b.package_name == p.name).unwrap_or(false))
            .cloned()
            .collect())
    }

    async fn list_tagged(&self, _tag: &str, package: &str) -> Result<Vec<KojiBuild>, Error> {
        Ok(self
            .tagged
            .read()
            .await
            .iter()
            .filter(|b| b.package_name == package)
            .cloned()
            .collect())
    }

    async fn list_rpms(&self, build_id: i64) -> Result<Vec<KojiRpm>, Error> {
        Ok(self
            .rpms
            .read()
            .await
            .iter()
            .filter(|r| r.build_id == build_id)
            .cloned()
            .collect())
    }
}
