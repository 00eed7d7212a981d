//! RPM and advisory name handling.
//!
//! The regular expressions here define the boundary with upstream data:
//! package file names, NVR(A) strings, dist tags, and advisory names.

use regex::Regex;
use std::sync::OnceLock;

/// `name-version-release(.arch)(.rpm)` — the release part is greedy up to the
/// optional arch/extension suffixes.
pub fn nvr() -> &'static Regex {
    static LOCK: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::unwrap_used)]
    LOCK.get_or_init(|| {
        Regex::new(r"^(\S+)-([\w~%.+^]+)-(\w+(?:\.[\w~%+^]+)+?)(?:\.(\w+))?(?:\.rpm)?$").unwrap()
    })
}

/// Epoch prefix, e.g. the `1:` in `openssl-1:1.1.1k-4.el8`.
pub fn epoch() -> &'static Regex {
    static LOCK: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::unwrap_used)]
    LOCK.get_or_init(|| Regex::new(r"(\d+):").unwrap())
}

/// Module build release, e.g. `801020190628172739.cdc1202b`.
pub fn module() -> &'static Regex {
    static LOCK: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::unwrap_used)]
    LOCK.get_or_init(|| Regex::new(r"^(.+)-(.+)-([0-9]{19})\.((?:.+){8})$").unwrap())
}

/// Dist tag, e.g. `.el8` or `.el8_4`.
pub fn dist() -> &'static Regex {
    static LOCK: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::unwrap_used)]
    LOCK.get_or_init(|| Regex::new(r"(\.el\d(?:_\d|))").unwrap())
}

/// Module dist suffix, e.g. `.module+el8.4.0+11446+fc96bc48`.
pub fn module_dist() -> &'static Regex {
    static LOCK: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::unwrap_used)]
    LOCK.get_or_init(|| Regex::new(r"\.module.+$").unwrap())
}

/// Advisory name, e.g. `RHSA-2021:2595` or `RLBA-2021:2593`.
pub fn advisory_id() -> &'static Regex {
    static LOCK: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::unwrap_used)]
    LOCK.get_or_init(|| Regex::new(r"^(.+)([SEB]A)-([0-9]{4}):([0-9]+)$").unwrap())
}

/// A parsed `name-version-release(.arch)` string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Nvr {
    pub name: String,
    pub version: String,
    pub release: String,
    pub arch: Option<String>,
}

impl Nvr {
    /// Parse an NVR(A) string, with or without a `.rpm` extension.
    pub fn parse(input: &str) -> Option<Self> {
        let caps = nvr().captures(input)?;
        Some(Self {
            name: caps.get(1)?.as_str().to_string(),
            version: caps.get(2)?.as_str().to_string(),
            release: caps.get(3)?.as_str().to_string(),
            arch: caps.get(4).map(|m| m.as_str().to_string()),
        })
    }

    /// Release with the dist tag and any module suffix removed. Downstream
    /// rebuilds may re-tag (`el8_3` vs `el8`) or append suffixes, so release
    /// comparison happens on this normalized form.
    pub fn normalized_release(&self) -> String {
        normalize_release(&self.release)
    }
}

/// Strip the dist tag and module suffix from a release string.
pub fn normalize_release(release: &str) -> String {
    let stripped = dist().replace_all(release, "");
    module_dist().replace_all(&stripped, "").into_owned()
}

/// Remove an epoch prefix anywhere in the string.
pub fn strip_epoch(input: &str) -> String {
    epoch().replace_all(input, "").into_owned()
}

/// The components of an advisory name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdvisoryParts {
    /// Issuer prefix, e.g. `RH` or `RL`.
    pub code: String,
    /// `SA`, `BA` or `EA`.
    pub infix: String,
    pub year: i32,
    pub num: i32,
}

impl AdvisoryParts {
    pub fn parse(name: &str) -> Option<Self> {
        let caps = advisory_id().captures(name)?;
        Some(Self {
            code: caps.get(1)?.as_str().to_string(),
            infix: caps.get(2)?.as_str().to_string(),
            year: caps.get(3)?.as_str().parse().ok()?,
            num: caps.get(4)?.as_str().parse().ok()?,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_plain_nvr() {
        let nvr = Nvr::parse("cmake-3.18.2-11.el8_4").expect("should parse");
        assert_eq!(nvr.name, "cmake");
        assert_eq!(nvr.version, "3.18.2");
        assert_eq!(nvr.release, "11.el8_4");
        assert_eq!(nvr.arch, None);
    }

    #[test]
    fn parse_nvra_with_extension() {
        let nvr = Nvr::parse("cmake-doc-3.18.2-11.el8_4.noarch.rpm").expect("should parse");
        assert_eq!(nvr.name, "cmake-doc");
        assert_eq!(nvr.version, "3.18.2");
        assert_eq!(nvr.release, "11.el8_4");
        assert_eq!(nvr.arch.as_deref(), Some("noarch"));
    }

    #[test]
    fn parse_module_nvr() {
        let pkg = "389-ds-base-1.4.3.16-16.module+el8.4.0+11446+fc96bc48";
        let nvr = Nvr::parse(pkg).expect("should parse");
        assert_eq!(nvr.name, "389-ds-base");
        assert_eq!(nvr.version, "1.4.3.16");
        assert_eq!(nvr.normalized_release(), "16");
    }

    #[test]
    fn normalize_strips_dist_variants() {
        assert_eq!(normalize_release("11.el8_4"), "11");
        assert_eq!(normalize_release("11.el8"), "11");
        assert_eq!(normalize_release("16.module+el8.4.0+11446+fc96bc48"), "16");
    }

    #[test]
    fn strip_epoch_prefix() {
        assert_eq!(strip_epoch("openssl-1:1.1.1k-4.el8"), "openssl-1.1.1k-4.el8");
        assert_eq!(strip_epoch("cmake-3.18.2-11.el8_4"), "cmake-3.18.2-11.el8_4");
    }

    #[test]
    fn parse_advisory_names() {
        let parts = AdvisoryParts::parse("RHBA-2021:2593").expect("should parse");
        assert_eq!(parts.code, "RH");
        assert_eq!(parts.infix, "BA");
        assert_eq!(parts.year, 2021);
        assert_eq!(parts.num, 2593);

        let parts = AdvisoryParts::parse("RLSA-2022:1642").expect("should parse");
        assert_eq!(parts.code, "RL");
        assert_eq!(parts.infix, "SA");

        assert_eq!(AdvisoryParts::parse("not-an-advisory"), None);
    }

    #[test]
    fn emitted_rpm_file_names_round_trip() {
        for name in [
            "cmake-3.18.2-11.el8_4.x86_64.rpm",
            "cmake-gui-debuginfo-3.18.2-11.el8_4.i686.rpm",
            "cmake-rpm-macros-3.18.2-11.el8_4.noarch.rpm",
        ] {
            let nvr = Nvr::parse(name).expect("should parse");
            let rebuilt = format!(
                "{}-{}-{}.{}.rpm",
                nvr.name,
                nvr.version,
                nvr.release,
                nvr.arch.as_deref().expect("arch")
            );
            assert_eq!(rebuilt, name);
        }
    }
}
