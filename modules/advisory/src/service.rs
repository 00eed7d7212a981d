use crate::model::{AdvisoryQuery, AdvisorySummary, ListAdvisoriesResponse};
use crate::rss;
use crate::Error;
use errata_common::model::Paginated;
use errata_common::rpm::AdvisoryParts;
use errata_store::Store;
use std::sync::Arc;

pub struct AdvisoryService {
    store: Arc<dyn Store>,
    homepage: String,
    vendor: String,
}

impl AdvisoryService {
    /// Number of items in the RSS feed.
    const RSS_LIMIT: u64 = 25;

    pub fn new(store: Arc<dyn Store>, homepage: impl Into<String>, vendor: impl Into<String>) -> Self {
        Self {
            store,
            homepage: homepage.into(),
            vendor: vendor.into(),
        }
    }

    pub async fn list_advisories(
        &self,
        query: AdvisoryQuery,
        paginated: Paginated,
    ) -> Result<ListAdvisoriesResponse, Error> {
        // the public listing never includes unpublished advisories
        let filters = query.into_filters();

        let (items, total) = self
            .store
            .list_advisories(&filters, paginated.page, paginated.limit)
            .await?;
        let last_updated = self.store.max_last_sync().await?;

        Ok(ListAdvisoriesResponse {
            advisories: items.iter().map(AdvisorySummary::from_data).collect(),
            total,
            page: paginated.page,
            limit: paginated.limit,
            last_updated,
        })
    }

    /// A single published advisory by derived name. Unpublished advisories
    /// are indistinguishable from missing ones.
    pub async fn get_advisory(&self, name: &str) -> Result<Option<AdvisorySummary>, Error> {
        let parts =
            AdvisoryParts::parse(name).ok_or_else(|| Error::InvalidName(name.to_string()))?;

        let data = self
            .store
            .advisory_by_code_year_num(&parts.code, parts.year, parts.num)
            .await?;

        Ok(data
            .filter(|data| data.advisory.published_at.is_some())
            .map(|data| AdvisorySummary::from_data(&data)))
    }

    /// The latest published advisories as an RSS 2.0 document.
    pub async fn list_advisories_rss(&self) -> Result<String, Error> {
        let (items, _) = self
            .store
            .list_advisories(&Default::default(), 0, Self::RSS_LIMIT)
            .await?;

        rss::render(&self.homepage, &self.vendor, &items)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use errata_entity::advisory::{AdvisorySeverity, AdvisoryType};
    use errata_store::{MemStore, NewAdvisory, Store};
    use test_log::test;
    use time::macros::datetime;

    async fn seed(store: &MemStore, num: i32, published: bool) -> Result<i64, Error> {
        let advisory = store
            .create_advisory(NewAdvisory {
                year: 2021,
                num,
                synopsis: format!("advisory {num}"),
                topic: "topic".into(),
                description: "description".into(),
                solution: None,
                severity: AdvisorySeverity::Moderate,
                kind: AdvisoryType::Security,
                redhat_issued_at: Some(datetime!(2021-06-29 0:00 UTC)),
                short_code_code: "RL".into(),
                reboot_suggested: false,
            })
            .await?;
        if published {
            store
                .set_advisory_published_at(advisory.id, datetime!(2021-07-01 12:00 UTC))
                .await?;
        }
        Ok(advisory.id)
    }

    fn service(store: MemStore) -> AdvisoryService {
        AdvisoryService::new(
            Arc::new(store),
            "https://errata.rockylinux.org",
            "Rocky Enterprise Software Foundation",
        )
    }

    #[test(tokio::test)]
    async fn listing_hides_unpublished_advisories() -> Result<(), Error> {
        let store = MemStore::new();
        seed(&store, 1, true).await?;
        seed(&store, 2, false).await?;

        let service = service(store);

        // even an explicit request for unpublished rows is ignored
        let query = AdvisoryQuery {
            include_unpublished: Some(true),
            ..Default::default()
        };
        let response = service
            .list_advisories(query, Paginated::default())
            .await?;

        assert_eq!(response.total, 1);
        assert_eq!(response.advisories[0].name, "RLSA-2021:1");
        Ok(())
    }

    #[test(tokio::test)]
    async fn get_advisory_by_name() -> Result<(), Error> {
        let store = MemStore::new();
        seed(&store, 1, true).await?;
        seed(&store, 2, false).await?;

        let service = service(store);

        let found = service.get_advisory("RLSA-2021:1").await?;
        assert_eq!(found.expect("advisory").synopsis, "advisory 1");

        // unpublished and missing advisories both come back empty
        assert!(service.get_advisory("RLSA-2021:2").await?.is_none());
        assert!(service.get_advisory("RLSA-2021:3").await?.is_none());

        // malformed names are rejected outright
        assert!(matches!(
            service.get_advisory("not-a-name").await,
            Err(Error::InvalidName(_))
        ));
        Ok(())
    }

    #[test(tokio::test)]
    async fn rss_lists_published_advisories() -> Result<(), Error> {
        let store = MemStore::new();
        seed(&store, 1, true).await?;
        seed(&store, 2, false).await?;

        let service = service(store);
        let feed = service.list_advisories_rss().await?;

        assert!(feed.starts_with("<rss"));
        assert!(feed.contains("<title>RLSA-2021:1: advisory 1</title>"));
        assert!(feed.contains("https://errata.rockylinux.org/RLSA-2021:1"));
        assert!(!feed.contains("RLSA-2021:2"));
        Ok(())
    }
}
