use std::sync::Arc;

use crate::{
    models::{resolve_image_url, AvailabilityBlock, CatalogProviderItem, MovieRecord, ProviderRef},
    services::catalog::CatalogProvider,
};

/// Attaches regional watch-provider data to resolved records.
///
/// Looks up exactly one configured region; an absent region or any upstream
/// failure leaves the block empty. The block is always populated from a
/// single response, never merged across calls.
#[derive(Clone)]
pub struct AvailabilityEnricher {
    catalog: Arc<dyn CatalogProvider>,
    region: String,
    logo_base: String,
}

impl AvailabilityEnricher {
    pub fn new(catalog: Arc<dyn CatalogProvider>, region: String, logo_base: String) -> Self {
        Self {
            catalog,
            region,
            logo_base,
        }
    }

    /// Fills in the record's availability block.
    ///
    /// Enrichment failure never fails resolution: the record comes back
    /// with an empty block and a logged diagnostic.
    pub async fn enrich(&self, mut record: MovieRecord) -> MovieRecord {
        let Ok(id) = record.id.parse::<u64>() else {
            tracing::warn!(id = %record.id, "Skipping enrichment: non-numeric canonical id");
            return record;
        };

        let regions = match self.catalog.availability_by_id(id).await {
            Ok(regions) => regions,
            Err(e) => {
                tracing::warn!(id = id, error = %e, "Availability fetch failed");
                return record;
            }
        };

        let Some(listing) = regions.get(&self.region) else {
            tracing::debug!(id = id, region = %self.region, "No availability for region");
            return record;
        };

        record.availability = AvailabilityBlock {
            subscription: self.map_providers(&listing.flatrate),
            rent: self.map_providers(&listing.rent),
            buy: self.map_providers(&listing.buy),
            link: listing.link.clone(),
        };

        tracing::debug!(
            id = id,
            region = %self.region,
            subscription = record.availability.subscription.len(),
            rent = record.availability.rent.len(),
            buy = record.availability.buy.len(),
            "Availability attached"
        );

        record
    }

    fn map_providers(&self, items: &[CatalogProviderItem]) -> Vec<ProviderRef> {
        items
            .iter()
            .map(|item| ProviderRef {
                name: item.provider_name.clone(),
                logo_url: item
                    .logo_path
                    .as_deref()
                    .map(|p| resolve_image_url(&self.logo_base, p)),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::AppError,
        models::{CatalogMovieDetail, RegionListing},
        services::catalog::MockCatalogProvider,
    };
    use std::collections::HashMap;

    fn record_fixture() -> MovieRecord {
        let detail = CatalogMovieDetail {
            id: 27205,
            title: "Inception".to_string(),
            release_date: Some("2010-07-15".to_string()),
            vote_average: Some(8.4),
            poster_path: None,
            overview: None,
            genres: vec![],
            credits: None,
        };
        MovieRecord::from_detail(detail, "https://cdn.example/w500")
    }

    fn region_listing() -> RegionListing {
        RegionListing {
            link: Some("https://watch.example/27205".to_string()),
            flatrate: vec![CatalogProviderItem {
                provider_name: "Netflix".to_string(),
                logo_path: Some("/netflix.png".to_string()),
            }],
            rent: vec![CatalogProviderItem {
                provider_name: "Apple TV".to_string(),
                logo_path: Some("https://cdn/appletv.png".to_string()),
            }],
            buy: vec![],
        }
    }

    fn enricher(catalog: MockCatalogProvider) -> AvailabilityEnricher {
        AvailabilityEnricher::new(
            Arc::new(catalog),
            "US".to_string(),
            "https://cdn.example/original".to_string(),
        )
    }

    #[tokio::test]
    async fn test_enrich_maps_configured_region() {
        let mut catalog = MockCatalogProvider::new();
        catalog.expect_availability_by_id().returning(|_| {
            let mut regions = HashMap::new();
            regions.insert("US".to_string(), region_listing());
            regions.insert("ES".to_string(), RegionListing::default());
            Ok(regions)
        });

        let record = enricher(catalog).enrich(record_fixture()).await;

        assert_eq!(record.availability.subscription.len(), 1);
        assert_eq!(record.availability.subscription[0].name, "Netflix");
        assert_eq!(
            record.availability.subscription[0].logo_url,
            Some("https://cdn.example/original/netflix.png".to_string())
        );
        assert_eq!(record.availability.rent.len(), 1);
        assert!(record.availability.buy.is_empty());
        assert_eq!(
            record.availability.link,
            Some("https://watch.example/27205".to_string())
        );
    }

    #[tokio::test]
    async fn test_enrich_keeps_absolute_logo_urls() {
        let mut catalog = MockCatalogProvider::new();
        catalog.expect_availability_by_id().returning(|_| {
            let mut regions = HashMap::new();
            regions.insert("US".to_string(), region_listing());
            Ok(regions)
        });

        let record = enricher(catalog).enrich(record_fixture()).await;

        assert_eq!(
            record.availability.rent[0].logo_url,
            Some("https://cdn/appletv.png".to_string())
        );
    }

    #[tokio::test]
    async fn test_enrich_absent_region_leaves_block_empty() {
        let mut catalog = MockCatalogProvider::new();
        catalog.expect_availability_by_id().returning(|_| {
            let mut regions = HashMap::new();
            regions.insert("ES".to_string(), region_listing());
            Ok(regions)
        });

        let record = enricher(catalog).enrich(record_fixture()).await;
        assert!(record.availability.is_empty());
    }

    #[tokio::test]
    async fn test_enrich_upstream_failure_is_swallowed() {
        let mut catalog = MockCatalogProvider::new();
        catalog
            .expect_availability_by_id()
            .returning(|_| Err(AppError::ExternalApi("boom".to_string())));

        let record = enricher(catalog).enrich(record_fixture()).await;
        assert!(record.availability.is_empty());
    }
}
