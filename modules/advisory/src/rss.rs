//! RSS 2.0 rendering of the latest advisories.

use crate::Error;
use errata_store::AdvisoryData;
use serde::Serialize;
use time::format_description::well_known::Rfc2822;

#[derive(Debug, Serialize)]
#[serde(rename = "rss")]
struct Rss {
    #[serde(rename = "@version")]
    version: &'static str,
    channel: Channel,
}

#[derive(Debug, Serialize)]
struct Channel {
    title: String,
    link: String,
    description: String,
    #[serde(rename = "lastBuildDate", skip_serializing_if = "Option::is_none")]
    last_build_date: Option<String>,
    #[serde(rename = "item")]
    items: Vec<Item>,
}

#[derive(Debug, Serialize)]
struct Item {
    title: String,
    link: String,
    description: String,
    guid: String,
    #[serde(rename = "pubDate", skip_serializing_if = "Option::is_none")]
    pub_date: Option<String>,
}

fn rfc2822(time: time::OffsetDateTime) -> Option<String> {
    time.format(&Rfc2822).ok()
}

pub fn render(homepage: &str, vendor: &str, advisories: &[AdvisoryData]) -> Result<String, Error> {
    let last_build_date = advisories
        .first()
        .and_then(|data| data.advisory.published_at)
        .and_then(rfc2822);

    let items = advisories
        .iter()
        .map(|data| {
            let name = data.advisory.name();
            Item {
                title: format!("{name}: {}", data.advisory.synopsis),
                link: format!("{homepage}/{name}"),
                description: data.advisory.topic.clone(),
                guid: data.advisory.id.to_string(),
                pub_date: data.advisory.published_at.and_then(rfc2822),
            }
        })
        .collect();

    let feed = Rss {
        version: "2.0",
        channel: Channel {
            title: format!("{vendor} Errata RSS Feed"),
            link: homepage.to_string(),
            description: format!("Security advisories issued by {vendor}"),
            last_build_date,
            items,
        },
    };

    quick_xml::se::to_string(&feed).map_err(|err| Error::Feed(err.to_string()))
}
