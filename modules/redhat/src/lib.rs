//! Clients for the upstream security data and errata search APIs.

pub mod errata;
pub mod security;

pub use errata::{CompactErratum, Erratum, ErrataApi, HttpErrataApi, MockErrataApi};
pub use security::{CompactCve, CveDetail, HttpSecurityApi, MockSecurityApi, SecurityApi};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("{0} not found upstream")]
    NotFound(String),
    #[error("malformed upstream payload: {0}")]
    Malformed(String),
}

/// Upstream product name for a major version, e.g.
/// `Red Hat Enterprise Linux 8`.
pub fn product_name(major_version: i32) -> String {
    format!("Red Hat Enterprise Linux {major_version}")
}

/// Upstream product name for an arch and major version. Errata list their
/// affected packages per arch under these names.
pub fn product_name_for_arch(arch: &str, major_version: i32) -> String {
    let arch_string = match arch {
        "x86_64" => "x86_64",
        "aarch64" => "ARM 64",
        "ppc64le" => "Power, little endian",
        "s390x" => "IBM z Systems",
        _ => "UnknownBreakOnPurpose",
    };
    format!("Red Hat Enterprise Linux for {arch_string} {major_version}")
}

fn http_client() -> Result<reqwest::Client, Error> {
    Ok(reqwest::Client::builder()
        .user_agent(errata_common::USER_AGENT)
        .timeout(errata_common::HTTP_TIMEOUT)
        .build()?)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn upstream_product_names() {
        assert_eq!(product_name(8), "Red Hat Enterprise Linux 8");
        assert_eq!(
            product_name_for_arch("x86_64", 8),
            "Red Hat Enterprise Linux for x86_64 8"
        );
        assert_eq!(
            product_name_for_arch("aarch64", 8),
            "Red Hat Enterprise Linux for ARM 64 8"
        );
        assert_eq!(
            product_name_for_arch("ppc64le", 9),
            "Red Hat Enterprise Linux for Power, little endian 9"
        );
        assert_eq!(
            product_name_for_arch("s390x", 8),
            "Red Hat Enterprise Linux for IBM z Systems 8"
        );
    }
}
