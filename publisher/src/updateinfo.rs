//! The `updateinfo` document and the `repomd.xml` index, as serialized into
//! yum/dnf repositories.

use serde::{Deserialize, Serialize};
use time::format_description::FormatItem;
use time::macros::format_description;

/// Timestamp format of `issued`/`updated` dates.
pub const TIME_FORMAT: &[FormatItem] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename = "updates")]
pub struct UpdatesRoot {
    #[serde(rename = "update", default)]
    pub updates: Vec<Update>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Update {
    #[serde(rename = "@from")]
    pub from: String,
    #[serde(rename = "@status")]
    pub status: String,
    #[serde(rename = "@type")]
    pub kind: String,
    #[serde(rename = "@version")]
    pub version: String,
    pub id: String,
    pub title: String,
    pub issued: UpdateDate,
    pub updated: UpdateDate,
    pub rights: String,
    pub release: String,
    pub pushcount: String,
    pub severity: String,
    pub summary: String,
    pub description: String,
    pub references: UpdateReferences,
    pub pkglist: UpdatePkgList,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateDate {
    #[serde(rename = "@date")]
    pub date: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateReferences {
    #[serde(rename = "reference", default)]
    pub references: Vec<UpdateReference>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateReference {
    #[serde(rename = "@href")]
    pub href: String,
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@type")]
    pub kind: String,
    #[serde(rename = "@title")]
    pub title: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdatePkgList {
    #[serde(rename = "collection", default)]
    pub collections: Vec<UpdateCollection>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateCollection {
    #[serde(rename = "@short")]
    pub short: String,
    pub name: String,
    #[serde(rename = "package", default)]
    pub packages: Vec<UpdatePackage>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdatePackage {
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(rename = "@version")]
    pub version: String,
    #[serde(rename = "@release")]
    pub release: String,
    #[serde(rename = "@epoch")]
    pub epoch: String,
    #[serde(rename = "@arch")]
    pub arch: String,
    #[serde(rename = "@src")]
    pub src: String,
    pub filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reboot_suggested: Option<String>,
    #[serde(rename = "sum", default)]
    pub sums: Vec<UpdatePackageSum>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdatePackageSum {
    #[serde(rename = "@type")]
    pub kind: String,
    #[serde(rename = "$text")]
    pub value: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename = "repomd")]
pub struct RepoMdRoot {
    #[serde(rename = "@xmlns", default, skip_serializing_if = "Option::is_none")]
    pub xmlns: Option<String>,
    #[serde(rename = "@xmlns:rpm", default, skip_serializing_if = "Option::is_none")]
    pub xmlns_rpm: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
    #[serde(rename = "data", default)]
    pub data: Vec<RepoMdData>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RepoMdData {
    #[serde(rename = "@type")]
    pub kind: String,
    pub checksum: RepoMdChecksum,
    #[serde(rename = "open-checksum", default, skip_serializing_if = "Option::is_none")]
    pub open_checksum: Option<RepoMdChecksum>,
    pub location: RepoMdLocation,
    pub timestamp: String,
    pub size: String,
    #[serde(rename = "open-size", default, skip_serializing_if = "Option::is_none")]
    pub open_size: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RepoMdChecksum {
    #[serde(rename = "@type")]
    pub kind: String,
    #[serde(rename = "$text")]
    pub value: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RepoMdLocation {
    #[serde(rename = "@href")]
    pub href: String,
}

#[cfg(test)]
mod test {
    use super::*;

    fn sample_update() -> Update {
        Update {
            from: "releng@rockylinux.org".into(),
            status: "final".into(),
            kind: "bugfix".into(),
            version: "2".into(),
            id: "RLBA-2021:2593".into(),
            title: "cmake bugfix and enhancement update".into(),
            issued: UpdateDate {
                date: "2021-07-01 12:00:00".into(),
            },
            updated: UpdateDate {
                date: "2021-06-29 00:00:00".into(),
            },
            rights: "Copyright (C) 2021 Rocky Linux".into(),
            release: "Rocky Linux 8".into(),
            pushcount: "1".into(),
            severity: "None".into(),
            summary: "An update for cmake is now available for Rocky Linux 8.".into(),
            description: "CMake is an open-source, cross-platform build tool.".into(),
            references: UpdateReferences {
                references: vec![UpdateReference {
                    href: "https://access.redhat.com/errata/RHBA-2021:2593".into(),
                    id: "RHBA-2021:2593".into(),
                    kind: "erratum".into(),
                    title: "Update information for RHBA-2021:2593 is retrieved from Red Hat".into(),
                }],
            },
            pkglist: UpdatePkgList {
                collections: vec![UpdateCollection {
                    short: "RL8".into(),
                    name: "Rocky Linux 8".into(),
                    packages: vec![UpdatePackage {
                        name: "cmake".into(),
                        version: "3.18.2".into(),
                        release: "11.el8_4".into(),
                        epoch: "0".into(),
                        arch: "x86_64".into(),
                        src: "cmake-3.18.2-11.el8_4.src.rpm".into(),
                        filename: "cmake-3.18.2-11.el8_4.x86_64.rpm".into(),
                        reboot_suggested: None,
                        sums: vec![UpdatePackageSum {
                            kind: "sha256".into(),
                            value: "deadbeef".into(),
                        }],
                    }],
                }],
            },
        }
    }

    #[test]
    fn updateinfo_round_trips() {
        let root = UpdatesRoot {
            updates: vec![sample_update()],
        };

        let xml = quick_xml::se::to_string(&root).expect("serialize");
        assert!(xml.starts_with("<updates>"));
        assert!(xml.contains("<update from=\"releng@rockylinux.org\""));
        assert!(xml.contains("type=\"bugfix\""));
        assert!(xml.contains("<sum type=\"sha256\">deadbeef</sum>"));

        let parsed: UpdatesRoot = quick_xml::de::from_str(&xml).expect("parse");
        assert_eq!(parsed, root);
    }

    #[test]
    fn reboot_suggested_is_emitted_when_set() {
        let mut update = sample_update();
        update.pkglist.collections[0].packages[0].reboot_suggested = Some("True".into());
        let root = UpdatesRoot {
            updates: vec![update],
        };

        let xml = quick_xml::se::to_string(&root).expect("serialize");
        assert!(xml.contains("<reboot_suggested>True</reboot_suggested>"));

        let parsed: UpdatesRoot = quick_xml::de::from_str(&xml).expect("parse");
        assert_eq!(
            parsed.updates[0].pkglist.collections[0].packages[0]
                .reboot_suggested
                .as_deref(),
            Some("True")
        );
    }

    #[test]
    fn repomd_round_trips() {
        let repomd = RepoMdRoot {
            xmlns: Some("http://linux.duke.edu/metadata/repo".into()),
            xmlns_rpm: Some("http://linux.duke.edu/metadata/rpm".into()),
            revision: Some("1627000000".into()),
            data: vec![RepoMdData {
                kind: "updateinfo".into(),
                checksum: RepoMdChecksum {
                    kind: "sha256".into(),
                    value: "cafe".into(),
                },
                open_checksum: Some(RepoMdChecksum {
                    kind: "sha256".into(),
                    value: "f00d".into(),
                }),
                location: RepoMdLocation {
                    href: "repodata/cafe-updateinfo.xml.gz".into(),
                },
                timestamp: "1627000000".into(),
                size: "123".into(),
                open_size: Some("456".into()),
            }],
        };

        let xml = quick_xml::se::to_string(&repomd).expect("serialize");
        let parsed: RepoMdRoot = quick_xml::de::from_str(&xml).expect("parse");
        assert_eq!(parsed, repomd);
    }

    #[test]
    fn foreign_repomd_entries_survive() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
            <repomd xmlns="http://linux.duke.edu/metadata/repo" xmlns:rpm="http://linux.duke.edu/metadata/rpm">
              <revision>1627000000</revision>
              <data type="primary">
                <checksum type="sha256">abc</checksum>
                <open-checksum type="sha256">def</open-checksum>
                <location href="repodata/abc-primary.xml.gz"/>
                <timestamp>1627000000</timestamp>
                <size>100</size>
                <open-size>200</open-size>
              </data>
            </repomd>"#;

        let parsed: RepoMdRoot = quick_xml::de::from_str(xml).expect("parse");
        assert_eq!(parsed.data.len(), 1);
        assert_eq!(parsed.data[0].kind, "primary");
        assert_eq!(parsed.data[0].location.href, "repodata/abc-primary.xml.gz");
    }
}
