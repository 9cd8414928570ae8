use std::sync::Arc;

use crate::{
    cache::SessionCache,
    config::Config,
    models::MovieRecord,
    services::{
        agent::{AgentOrchestrator, BatchAgent},
        aggregator::CategoryAggregator,
        availability::AvailabilityEnricher,
        catalog::{CatalogProvider, TmdbCatalogClient},
        resolver::IdentityResolver,
        trending::TrendingFeed,
    },
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub resolver: IdentityResolver,
    pub aggregator: CategoryAggregator,
    pub trending: TrendingFeed,
    pub agent: Arc<dyn BatchAgent>,
    pub feed_cache: Arc<SessionCache<Vec<MovieRecord>>>,
}

impl AppState {
    /// Builds state over the real catalog client and subprocess agent
    pub fn new(config: &Config) -> Self {
        let catalog: Arc<dyn CatalogProvider> = Arc::new(TmdbCatalogClient::new(
            config.catalog_api_key.clone(),
            config.catalog_api_url.clone(),
        ));
        let agent: Arc<dyn BatchAgent> = Arc::new(AgentOrchestrator::new(
            config.agent_interpreter.clone(),
            config.agent_script_path.clone(),
            config.max_concurrent_agent_runs,
        ));
        Self::with_seams(catalog, agent, config)
    }

    /// Builds state over explicit seams; tests inject stubs here
    pub fn with_seams(
        catalog: Arc<dyn CatalogProvider>,
        agent: Arc<dyn BatchAgent>,
        config: &Config,
    ) -> Self {
        let enricher = AvailabilityEnricher::new(
            Arc::clone(&catalog),
            config.availability_region.clone(),
            config.logo_base(),
        );
        let resolver = IdentityResolver::new(
            Arc::clone(&catalog),
            enricher.clone(),
            config.poster_base(),
        );
        let aggregator = CategoryAggregator::new(
            Arc::clone(&catalog),
            config.poster_base(),
            config.aggregator_concurrency,
        );
        let trending = TrendingFeed::new(catalog, enricher, config.poster_base());

        Self {
            resolver,
            aggregator,
            trending,
            agent,
            feed_cache: Arc::new(SessionCache::new()),
        }
    }
}
