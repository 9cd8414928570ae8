use std::collections::HashMap;

use reqwest::Client as HttpClient;

use crate::{
    error::{AppError, AppResult},
    models::{
        CatalogAvailabilityResponse, CatalogFindResponse, CatalogListResponse, CatalogMovieDetail,
        CatalogMovieSummary, RegionListing,
    },
};

/// Minimum vote count for discover results, filtered server-side
const DISCOVER_MIN_VOTE_COUNT: &str = "3000";

/// Upstream catalog abstraction.
///
/// One method per consumed endpoint, no business logic. The resolver,
/// aggregator and enricher all run against this trait so tests can swap the
/// network out.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogProvider: Send + Sync {
    /// Search titles by name, first page only
    async fn search_by_title(&self, title: &str) -> AppResult<Vec<CatalogMovieSummary>>;

    /// Look up a title by an external cross-reference id
    async fn find_by_external_id(&self, external_id: &str) -> AppResult<Vec<CatalogMovieSummary>>;

    /// Fetch full detail (credits included) by canonical id
    async fn detail_by_id(&self, id: u64) -> AppResult<CatalogMovieDetail>;

    /// Discover popular titles for one category, sorted by vote count
    async fn discover_by_category(
        &self,
        category_id: u32,
        page: u32,
    ) -> AppResult<Vec<CatalogMovieSummary>>;

    /// Regional watch-provider listings by canonical id
    async fn availability_by_id(&self, id: u64) -> AppResult<HashMap<String, RegionListing>>;

    /// Currently popular titles
    async fn popular(&self, page: u32) -> AppResult<Vec<CatalogMovieSummary>>;
}

/// Catalog client backed by the TMDB HTTP API
#[derive(Clone)]
pub struct TmdbCatalogClient {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
}

impl TmdbCatalogClient {
    pub fn new(api_key: String, api_url: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_url,
        }
    }

    /// Issues a GET with the API key attached and deserializes the body,
    /// reporting non-2xx statuses as external API errors.
    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> AppResult<T> {
        let response = self
            .http_client
            .get(url)
            .query(&[("api_key", self.api_key.as_str())])
            .query(query)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "Catalog API returned status {}: {}",
                status, body
            )));
        }

        Ok(response.json().await?)
    }
}

#[async_trait::async_trait]
impl CatalogProvider for TmdbCatalogClient {
    async fn search_by_title(&self, title: &str) -> AppResult<Vec<CatalogMovieSummary>> {
        let url = format!("{}/search/movie", self.api_url);
        let response: CatalogListResponse = self.get_json(&url, &[("query", title)]).await?;

        tracing::debug!(
            query = %title,
            results = response.results.len(),
            "Title search completed"
        );

        Ok(response.results)
    }

    async fn find_by_external_id(&self, external_id: &str) -> AppResult<Vec<CatalogMovieSummary>> {
        let url = format!("{}/find/{}", self.api_url, external_id);
        let response: CatalogFindResponse = self
            .get_json(&url, &[("external_source", "imdb_id")])
            .await?;

        tracing::debug!(
            external_id = %external_id,
            results = response.movie_results.len(),
            "Cross-reference lookup completed"
        );

        Ok(response.movie_results)
    }

    async fn detail_by_id(&self, id: u64) -> AppResult<CatalogMovieDetail> {
        let url = format!("{}/movie/{}", self.api_url, id);
        self.get_json(&url, &[("append_to_response", "credits")])
            .await
    }

    async fn discover_by_category(
        &self,
        category_id: u32,
        page: u32,
    ) -> AppResult<Vec<CatalogMovieSummary>> {
        let url = format!("{}/discover/movie", self.api_url);
        let category = category_id.to_string();
        let page = page.to_string();
        let response: CatalogListResponse = self
            .get_json(
                &url,
                &[
                    ("with_genres", category.as_str()),
                    ("language", "en-US"),
                    ("sort_by", "vote_count.desc"),
                    ("vote_count.gte", DISCOVER_MIN_VOTE_COUNT),
                    ("page", page.as_str()),
                ],
            )
            .await?;

        Ok(response.results)
    }

    async fn availability_by_id(&self, id: u64) -> AppResult<HashMap<String, RegionListing>> {
        let url = format!("{}/movie/{}/watch/providers", self.api_url, id);
        let response: CatalogAvailabilityResponse = self.get_json(&url, &[]).await?;
        Ok(response.results)
    }

    async fn popular(&self, page: u32) -> AppResult<Vec<CatalogMovieSummary>> {
        let url = format!("{}/movie/popular", self.api_url);
        let page = page.to_string();
        let response: CatalogListResponse = self
            .get_json(&url, &[("language", "en-US"), ("page", page.as_str())])
            .await?;

        Ok(response.results)
    }
}
