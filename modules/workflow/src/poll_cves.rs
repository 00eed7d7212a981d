//! Mirror upstream CVE records, per short code and product.

use crate::{Controller, Error};
use errata_store::Store;
use errata_entity::{product, short_code, short_code::ShortCodeMode};
use time::OffsetDateTime;

impl Controller {
    async fn poll_cves_product(
        &self,
        short_code: &short_code::Model,
        product: &product::Model,
    ) -> Result<(), Error> {
        // only products tracking a valid upstream major version are mirrored
        let Some(major_version) = product.redhat_major_version else {
            return Ok(());
        };
        let prefix = product.redhat_product_prefix.as_deref().unwrap_or_default();
        if !product.name.starts_with(prefix) {
            return Ok(());
        }

        let mut last_sync = None;
        match self.store.mirror_state(&short_code.code).await {
            Ok(state) => last_sync = state.and_then(|s| s.last_sync),
            Err(err) => {
                log::error!(
                    "could not get last sync for code {}: {err}",
                    short_code.code
                );
                // the cron will retry this
                return Ok(());
            }
        }
        let last_sync = last_sync
            .or(product.mirror_from_date)
            .unwrap_or_else(OffsetDateTime::now_utc);

        let product_name = errata_module_redhat::product_name(major_version);

        let mut page = 1;
        loop {
            let cves = self
                .security
                .list_cves(&product_name, Some(last_sync.date()), page)
                .await?;
            if cves.is_empty() {
                break;
            }

            for cve in &cves {
                if self.store.cve_by_id(&cve.cve).await?.is_some() {
                    continue;
                }

                let (_, content) = self.security.get_cve(&cve.cve).await?;
                self.store
                    .create_cve(
                        &cve.cve,
                        &short_code.code,
                        Some("Red Hat"),
                        cve.resource_url.as_deref(),
                        Some(content),
                    )
                    .await?;
                log::info!("Added {} to {}", cve.cve, short_code.code);
            }
            page += 1;
        }

        if let Err(err) = self
            .store
            .update_mirror_state_last_sync(&short_code.code, OffsetDateTime::now_utc())
            .await
        {
            log::error!("could not update mirroring state: {err}");
        }

        Ok(())
    }

    /// Mirror new CVEs for one short code.
    pub async fn poll_cves_short_code(&self, short_code: &short_code::Model) -> Result<(), Error> {
        if short_code.mode != ShortCodeMode::Mirror {
            // this is not a mirrored short code
            return Ok(());
        }

        let products = match self.store.products_by_short_code(&short_code.code).await {
            Ok(products) => products,
            Err(err) => {
                log::error!(
                    "could not get all products for code {}: {err}",
                    short_code.code
                );
                // returning Ok since the cron will retry this
                return Ok(());
            }
        };

        for product in &products {
            self.poll_cves_product(short_code, product).await?;
        }

        Ok(())
    }

    /// Mirror new CVEs for every short code. Short codes run concurrently,
    /// products within one short code sequentially.
    pub async fn poll_cves(&self) -> Result<(), Error> {
        let short_codes = self.store.all_short_codes().await?;

        futures::future::try_join_all(
            short_codes
                .iter()
                .map(|short_code| self.poll_cves_short_code(short_code)),
        )
        .await?;

        Ok(())
    }
}
