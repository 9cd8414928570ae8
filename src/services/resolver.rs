use std::sync::Arc;

use crate::{
    models::MovieRecord,
    services::{availability::AvailabilityEnricher, catalog::CatalogProvider},
};

/// Prefix identifying external cross-reference ids
const EXTERNAL_ID_PREFIX: &str = "tt";

/// Normalizes an opaque query into one canonical detailed record.
///
/// Three lookup strategies, first success wins: external cross-reference
/// id, numeric canonical id, title search. Upstream failures are recovered
/// per step and logged; `None` is the NotFound outcome, never an error.
#[derive(Clone)]
pub struct IdentityResolver {
    catalog: Arc<dyn CatalogProvider>,
    enricher: AvailabilityEnricher,
    poster_base: String,
}

impl IdentityResolver {
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

    pub async fn resolve(&self, query: &str) -> Option<MovieRecord> {
        let query = query.trim();

        // External cross-reference ids never fall back to title search,
        // even when the lookup fails.
        if query.starts_with(EXTERNAL_ID_PREFIX) {
            match self.catalog.find_by_external_id(query).await {
                Ok(hits) => {
                    if let Some(first) = hits.first() {
                        return self.fetch_detail(first.id).await;
                    }
                    tracing::debug!(query = %query, "No cross-reference match");
                }
                Err(e) => {
                    tracing::warn!(query = %query, error = %e, "Cross-reference lookup failed");
                }
            }
            return None;
        }

        // Nonnegative integers are canonical ids as-is.
        if let Ok(id) = query.parse::<u64>() {
            return self.fetch_detail(id).await;
        }

        match self.catalog.search_by_title(query).await {
            Ok(hits) => {
                if let Some(first) = hits.first() {
                    return self.fetch_detail(first.id).await;
                }
                tracing::debug!(query = %query, "No title match");
            }
            Err(e) => {
                tracing::warn!(query = %query, error = %e, "Title search failed");
            }
        }

        None
    }

    /// Fetches full detail, maps it and attaches availability.
    async fn fetch_detail(&self, id: u64) -> Option<MovieRecord> {
        match self.catalog.detail_by_id(id).await {
            Ok(detail) => {
                let record = MovieRecord::from_detail(detail, &self.poster_base);
                Some(self.enricher.enrich(record).await)
            }
            Err(e) => {
                tracing::warn!(id = id, error = %e, "Detail fetch failed");
                None
            }
        }
    }
}
