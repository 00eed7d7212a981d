//! XML-RPC client against a koji hub endpoint.

use crate::xmlrpc::{self, Value};
use crate::{Error, KojiApi, KojiBuild, KojiPackage, KojiRpm};
use std::collections::BTreeMap;

pub struct HubClient {
    client: reqwest::Client,
    endpoint: String,
}

impl HubClient {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, Error> {
        Ok(Self {
            client: reqwest::Client::builder()
                .user_agent(errata_common::USER_AGENT)
                .timeout(errata_common::HTTP_TIMEOUT)
                .build()?,
            endpoint: endpoint.into(),
        })
    }

    async fn call(&self, method: &str, params: &[Value]) -> Result<Value, Error> {
        let body = xmlrpc::request(method, params);
        let response = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "text/xml")
            .body(body)
            .send()
            .await?
            .error_for_status()?;

        xmlrpc::parse_response(&response.text().await?)
    }

    /// Keyword arguments travel as a trailing struct flagged with
    /// `__starstar`, per the hub's calling convention.
    fn keyword_args(pairs: impl IntoIterator<Item = (&'static str, Value)>) -> Value {
        let mut members = BTreeMap::new();
        members.insert("__starstar".to_string(), Value::Boolean(true));
        for (key, value) in pairs {
            members.insert(key.to_string(), value);
        }
        Value::Struct(members)
    }
}

fn build_from_value(value: &Value) -> Option<KojiBuild> {
    Some(KojiBuild {
        build_id: value.get("build_id").and_then(Value::as_i64)?,
        package_name: value
            .get("package_name")
            .or_else(|| value.get("name"))
            .and_then(Value::as_str)?
            .to_string(),
        version: value.get("version").and_then(Value::as_str)?.to_string(),
        release: value.get("release").and_then(Value::as_str)?.to_string(),
        epoch: value.get("epoch").and_then(Value::as_i64),
        nvr: value
            .get("nvr")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        extra: value.get("extra").cloned(),
    })
}

fn rpm_from_value(value: &Value) -> Option<KojiRpm> {
    Some(KojiRpm {
        name: value.get("name").and_then(Value::as_str)?.to_string(),
        epoch: value.get("epoch").and_then(Value::as_i64),
        version: value.get("version").and_then(Value::as_str)?.to_string(),
        release: value.get("release").and_then(Value::as_str)?.to_string(),
        arch: value.get("arch").and_then(Value::as_str)?.to_string(),
        build_id: value.get("build_id").and_then(Value::as_i64)?,
    })
}

fn builds_from_value(value: &Value) -> Result<Vec<KojiBuild>, Error> {
    value
        .as_array()
        .unwrap_or_default()
        .iter()
        .map(|entry| {
            build_from_value(entry).ok_or_else(|| Error::Decode("incomplete build entry".into()))
        })
        .collect()
}

#[async_trait::async_trait]
impl KojiApi for HubClient {
    async fn get_package(&self, name: &str) -> Result<Option<KojiPackage>, Error> {
        let value = self
            .call("getPackage", &[Value::String(name.to_string())])
            .await?;

        if value == Value::Nil {
            return Ok(None);
        }

        let id = value
            .get("id")
            .and_then(Value::as_i64)
            .ok_or_else(|| Error::Decode("package without id".into()))?;
        let name = value
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or(name)
            .to_string();

        Ok(Some(KojiPackage { id, name }))
    }

    async fn list_builds(&self, package_id: i64) -> Result<Vec<KojiBuild>, Error> {
        let value = self
            .call(
                "listBuilds",
                &[Self::keyword_args([("packageID", Value::Int(package_id))])],
            )
            .await?;
        builds_from_value(&value)
    }

    async fn list_tagged(&self, tag: &str, package: &str) -> Result<Vec<KojiBuild>, Error> {
        let value = self
            .call(
                "listTagged",
                &[
                    Value::String(tag.to_string()),
                    Self::keyword_args([("package", Value::String(package.to_string()))]),
                ],
            )
            .await?;
        builds_from_value(&value)
    }

    async fn list_rpms(&self, build_id: i64) -> Result<Vec<KojiRpm>, Error> {
        let value = self
            .call(
                "listRPMs",
                &[Self::keyword_args([("buildID", Value::Int(build_id))])],
            )
            .await?;

        value
            .as_array()
            .unwrap_or_default()
            .iter()
            .map(|entry| {
                rpm_from_value(entry).ok_or_else(|| Error::Decode("incomplete rpm entry".into()))
            })
            .collect()
    }
}
