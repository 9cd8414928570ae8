use std::sync::Arc;

use rand::{seq::SliceRandom, Rng};
use tokio::sync::Semaphore;

use crate::{
    models::{resolve_image_url, CategoryBucket, MovieSummary},
    services::catalog::CatalogProvider,
};

/// Category label -> upstream category id
const CATEGORY_IDS: [(&str, u32); 8] = [
    ("ACTION", 28),
    ("COMEDY", 35),
    ("DRAMA", 18),
    ("ROMANCE", 10749),
    ("HORROR", 27),
    ("THRILLER", 53),
    ("ADVENTURE", 12),
    ("SCI-FI", 878),
];

/// Result pages eligible for random sampling
const CANDIDATE_PAGES: u32 = 5;

/// Maximum entries per bucket
const BUCKET_LIMIT: usize = 10;

/// Maps a category label to its upstream id; labels outside the fixed table
/// are unrecognized.
pub fn category_id(label: &str) -> Option<u32> {
    CATEGORY_IDS
        .iter()
        .find(|(name, _)| *name == label)
        .map(|(_, id)| *id)
}

/// Fans out one discover query per recognized category on a bounded worker
/// pool and joins the results in input order.
#[derive(Clone)]
pub struct CategoryAggregator {
    catalog: Arc<dyn CatalogProvider>,
    poster_base: String,
    pool: Arc<Semaphore>,
}

impl CategoryAggregator {
    pub fn new(catalog: Arc<dyn CatalogProvider>, poster_base: String, concurrency: usize) -> Self {
        Self {
            catalog,
            poster_base,
            pool: Arc::new(Semaphore::new(concurrency.max(1))),
        }
    }

    /// One bucket per recognized category, in input order. Unrecognized
    /// labels are silently dropped; a category whose fetch fails yields an
    /// empty bucket without failing or delaying its siblings.
    pub async fn aggregate_by_categories(&self, categories: &[String]) -> Vec<CategoryBucket> {
        let mut pending = Vec::new();

        for label in categories {
            let Some(id) = category_id(label) else {
                tracing::debug!(category = %label, "Unrecognized category dropped");
                continue;
            };

            let catalog = Arc::clone(&self.catalog);
            let pool = Arc::clone(&self.pool);
            let poster_base = self.poster_base.clone();

            let handle = tokio::spawn(async move {
                let _permit = match pool.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return Vec::new(),
                };
                fetch_category_sample(catalog.as_ref(), id, &poster_base).await
            });

            pending.push((label.clone(), handle));
        }

        let mut buckets = Vec::with_capacity(pending.len());
        for (category, handle) in pending {
            let movies = match handle.await {
                Ok(movies) => movies,
                Err(e) => {
                    tracing::error!(category = %category, error = %e, "Category task panicked");
                    Vec::new()
                }
            };
            buckets.push(CategoryBucket { category, movies });
        }

        buckets
    }
}

/// Fetches one random candidate page for a category and samples it:
/// poster-less items dropped, full shuffle, at most `BUCKET_LIMIT` kept.
async fn fetch_category_sample(
    catalog: &dyn CatalogProvider,
    category_id: u32,
    poster_base: &str,
) -> Vec<MovieSummary> {
    let page = rand::rng().random_range(1..=CANDIDATE_PAGES);

    let items = match catalog.discover_by_category(category_id, page).await {
        Ok(items) => items,
        Err(e) => {
            tracing::warn!(category_id = category_id, page = page, error = %e, "Discover failed");
            return Vec::new();
        }
    };

    let mut movies: Vec<MovieSummary> = items
        .into_iter()
        .filter_map(|item| {
            let poster = item.poster_path?;
            Some(MovieSummary {
                id: item.id.to_string(),
                title: item.title,
                poster_url: resolve_image_url(poster_base, &poster),
            })
        })
        .collect();

    movies.shuffle(&mut rand::rng());
    movies.truncate(BUCKET_LIMIT);
    movies
}
