//! Backfill CVE content for rows mirrored without it.

use crate::{Controller, Error};
use errata_store::Store;

impl Controller {
    pub async fn collect_cve_content(&self) -> Result<(), Error> {
        let cves = self.store.all_cves().await?;

        for cve in cves {
            if cve.content.is_some() {
                continue;
            }
            // pseudo-CVEs named after errata have no upstream detail document
            if !cve.id.starts_with("CVE") {
                continue;
            }

            let (_, content) = self.security.get_cve(&cve.id).await?;
            self.store.set_cve_content(&cve.id, content).await?;
            log::info!("Collected content for {}", cve.id);
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use crate::test::TestContext;
    use crate::Error;
    use errata_store::Store;
    use test_log::test;

    #[test(tokio::test)]
    async fn backfills_only_empty_cve_rows() -> Result<(), Error> {
        let ctx = TestContext::new().await;

        ctx.store
            .create_cve("CVE-2021-3514", "RL", Some("Red Hat"), None, None)
            .await?;
        ctx.store
            .create_cve("RHBA-2021:2593", "RL", Some("Red Hat"), None, None)
            .await?;
        ctx.security
            .set_detail("CVE-2021-3514", serde_json::json!({"name": "CVE-2021-3514"}))
            .await;

        ctx.controller.collect_cve_content().await?;

        let cve = ctx
            .store
            .cve_by_id("CVE-2021-3514")
            .await?
            .expect("cve row");
        assert!(cve.content.is_some());

        // erratum-named rows are left alone
        let pseudo = ctx
            .store
            .cve_by_id("RHBA-2021:2593")
            .await?
            .expect("cve row");
        assert!(pseudo.content.is_none());

        Ok(())
    }
}
