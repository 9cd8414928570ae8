use std::sync::Arc;

use crate::{
    models::MovieRecord,
    services::{availability::AvailabilityEnricher, catalog::CatalogProvider},
};

/// Number of popular titles assembled for the home feed
const FEED_SIZE: usize = 10;

/// Assembles the home-page feed: the catalog's current popular titles,
/// each expanded to a full detailed record with availability attached.
#[derive(Clone)]
pub struct TrendingFeed {
    catalog: Arc<dyn CatalogProvider>,
    enricher: AvailabilityEnricher,
    poster_base: String,
}

impl TrendingFeed {
    pub fn new(
        catalog: Arc<dyn CatalogProvider>,
        enricher: AvailabilityEnricher,
        poster_base: String,
    ) -> Self {
        Self {
            catalog,
            enricher,
            poster_base,
        }
    }

    /// Fetches the first popular page and expands the top entries in
    /// parallel. Items whose detail fetch fails are skipped; a failed
    /// listing fetch yields an empty feed.
    pub async fn fetch(&self) -> Vec<MovieRecord> {
        let listing = match self.catalog.popular(1).await {
            Ok(listing) => listing,
            Err(e) => {
                tracing::warn!(error = %e, "Popular listing fetch failed");
                return Vec::new();
            }
        };

        let mut tasks = Vec::new();
        for item in listing.into_iter().take(FEED_SIZE) {
            let catalog = Arc::clone(&self.catalog);
            let enricher = self.enricher.clone();
            let poster_base = self.poster_base.clone();

            tasks.push(tokio::spawn(async move {
                match catalog.detail_by_id(item.id).await {
                    Ok(detail) => {
                        let record = MovieRecord::from_detail(detail, &poster_base);
                        Some(enricher.enrich(record).await)
                    }
                    Err(e) => {
                        tracing::warn!(id = item.id, error = %e, "Feed detail fetch failed");
                        None
                    }
                }
            }));
        }

        let mut records = Vec::new();
        for task in tasks {
            match task.await {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {}
                Err(e) => tracing::error!(error = %e, "Feed task join error"),
            }
        }

        tracing::info!(count = records.len(), "Trending feed assembled");
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::AppError,
        models::{CatalogMovieDetail, CatalogMovieSummary},
        services::catalog::MockCatalogProvider,
    };
    use std::collections::HashMap;

    fn summaries(count: usize) -> Vec<CatalogMovieSummary> {
        (0..count)
            .map(|i| CatalogMovieSummary {
                id: i as u64,
                title: format!("Movie {}", i),
                poster_path: None,
            })
            .collect()
    }

    fn detail(id: u64) -> CatalogMovieDetail {
        CatalogMovieDetail {
            id,
            title: format!("Movie {}", id),
            release_date: None,
            vote_average: None,
            poster_path: None,
            overview: None,
            genres: vec![],
            credits: None,
        }
    }

    fn feed(catalog: MockCatalogProvider) -> TrendingFeed {
        let catalog: Arc<dyn CatalogProvider> = Arc::new(catalog);
        let enricher = AvailabilityEnricher::new(
            Arc::clone(&catalog),
            "US".to_string(),
            "https://cdn.example/original".to_string(),
        );
        TrendingFeed::new(catalog, enricher, "https://cdn.example/w500".to_string())
    }

    #[tokio::test]
    async fn test_feed_is_capped_at_ten() {
        let mut catalog = MockCatalogProvider::new();
        catalog.expect_popular().returning(|_| Ok(summaries(15)));
        catalog.expect_detail_by_id().returning(|id| Ok(detail(id)));
        catalog
            .expect_availability_by_id()
            .returning(|_| Ok(HashMap::new()));

        let records = feed(catalog).fetch().await;
        assert_eq!(records.len(), 10);
    }

    #[tokio::test]
    async fn test_failed_detail_is_skipped() {
        let mut catalog = MockCatalogProvider::new();
        catalog.expect_popular().returning(|_| Ok(summaries(3)));
        catalog
            .expect_detail_by_id()
            .withf(|&id| id == 1)
            .returning(|_| Err(AppError::ExternalApi("down".to_string())));
        catalog.expect_detail_by_id().returning(|id| Ok(detail(id)));
        catalog
            .expect_availability_by_id()
            .returning(|_| Ok(HashMap::new()));

        let records = feed(catalog).fetch().await;
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn test_failed_listing_yields_empty_feed() {
        let mut catalog = MockCatalogProvider::new();
        catalog
            .expect_popular()
            .returning(|_| Err(AppError::ExternalApi("down".to_string())));
        catalog.expect_detail_by_id().never();

        let records = feed(catalog).fetch().await;
        assert!(records.is_empty());
    }
}
