use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Fallback display value for fields the catalog has no data for
pub const NOT_AVAILABLE: &str = "N/A";

/// Resolves an image reference against the CDN base.
///
/// Path-only references are prefixed; references that are already absolute
/// URLs pass through untouched.
pub fn resolve_image_url(cdn_base: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        path.to_string()
    } else {
        format!("{}{}", cdn_base, path)
    }
}

/// A single provider offering a title in the configured region
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderRef {
    pub name: String,
    pub logo_url: Option<String>,
}

/// Regional availability attached to a resolved record.
///
/// Either fully populated from one upstream response or entirely empty;
/// lists from different responses are never merged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AvailabilityBlock {
    pub subscription: Vec<ProviderRef>,
    pub rent: Vec<ProviderRef>,
    pub buy: Vec<ProviderRef>,
    pub link: Option<String>,
}

impl AvailabilityBlock {
    pub fn is_empty(&self) -> bool {
        self.subscription.is_empty()
            && self.rent.is_empty()
            && self.buy.is_empty()
            && self.link.is_none()
    }
}

/// Canonical detailed record for one title
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MovieRecord {
    /// The catalog's own stable identifier, in string form
    pub id: String,
    pub title: String,
    /// Release year, first four characters of the release date
    pub year: Option<String>,
    /// Comma-joined genre names, or "N/A"
    pub genre: String,
    /// Rating formatted to one decimal place, or "N/A"
    pub rating: String,
    pub poster_url: Option<String>,
    pub synopsis: Option<String>,
    /// Comma-joined directing credits, or "N/A"
    pub director: String,
    /// Top five billed cast members, comma-joined, or "N/A"
    pub cast: String,
    pub availability: AvailabilityBlock,
}

impl MovieRecord {
    /// Maps a raw catalog detail payload into the canonical record shape.
    ///
    /// The availability block starts empty; enrichment fills it in a
    /// separate step.
    pub fn from_detail(detail: CatalogMovieDetail, poster_base: &str) -> Self {
        let year = detail
            .release_date
            .as_deref()
            .filter(|d| d.len() >= 4)
            .map(|d| d[..4].to_string());

        let rating = detail
            .vote_average
            .map(|v| format!("{:.1}", v))
            .unwrap_or_else(|| NOT_AVAILABLE.to_string());

        let genre = if detail.genres.is_empty() {
            NOT_AVAILABLE.to_string()
        } else {
            detail
                .genres
                .iter()
                .map(|g| g.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        };

        let (director, cast) = match detail.credits {
            Some(credits) => (credits.director_names(), credits.top_billed_cast(5)),
            None => (NOT_AVAILABLE.to_string(), NOT_AVAILABLE.to_string()),
        };

        let poster_url = detail
            .poster_path
            .as_deref()
            .map(|p| resolve_image_url(poster_base, p));

        Self {
            id: detail.id.to_string(),
            title: detail.title,
            year,
            genre,
            rating,
            poster_url,
            synopsis: detail.overview,
            director,
            cast,
            availability: AvailabilityBlock::default(),
        }
    }
}

/// Lightweight listing entry: id, title and poster only
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MovieSummary {
    pub id: String,
    pub title: String,
    pub poster_url: String,
}

/// One category's shuffled sample of popular titles
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryBucket {
    pub category: String,
    pub movies: Vec<MovieSummary>,
}

// ============================================================================
// Raw catalog API payload types
// ============================================================================

/// Listing entry as returned by search / discover / find / popular
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogMovieSummary {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub poster_path: Option<String>,
}

/// Paged list response wrapper
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogListResponse {
    #[serde(default)]
    pub results: Vec<CatalogMovieSummary>,
}

/// Cross-reference lookup response; only the movie hits are consumed
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogFindResponse {
    #[serde(default)]
    pub movie_results: Vec<CatalogMovieSummary>,
}

/// Full detail payload with credits appended
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogMovieDetail {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub genres: Vec<CatalogGenre>,
    #[serde(default)]
    pub credits: Option<CatalogCredits>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogGenre {
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogCredits {
    #[serde(default)]
    pub cast: Vec<CatalogCastMember>,
    #[serde(default)]
    pub crew: Vec<CatalogCrewMember>,
}

impl CatalogCredits {
    /// Comma-joined names of crew members credited as "Director"
    pub fn director_names(&self) -> String {
        let directors: Vec<&str> = self
            .crew
            .iter()
            .filter(|c| c.job.as_deref() == Some("Director"))
            .map(|c| c.name.as_str())
            .collect();

        if directors.is_empty() {
            NOT_AVAILABLE.to_string()
        } else {
            directors.join(", ")
        }
    }

    /// Names of the `count` lowest-order billed cast members.
    ///
    /// Billing order ties keep the payload's list order (stable sort).
    pub fn top_billed_cast(&self, count: usize) -> String {
        let mut billed: Vec<&CatalogCastMember> =
            self.cast.iter().filter(|c| c.order.is_some()).collect();
        billed.sort_by_key(|c| c.order);

        let names: Vec<&str> = billed.iter().take(count).map(|c| c.name.as_str()).collect();

        if names.is_empty() {
            NOT_AVAILABLE.to_string()
        } else {
            names.join(", ")
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogCastMember {
    pub name: String,
    #[serde(default)]
    pub order: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogCrewMember {
    pub name: String,
    #[serde(default)]
    pub job: Option<String>,
}

/// Watch-provider response: region code -> listing
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogAvailabilityResponse {
    #[serde(default)]
    pub results: HashMap<String, RegionListing>,
}

/// Provider listing for one region
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegionListing {
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub flatrate: Vec<CatalogProviderItem>,
    #[serde(default)]
    pub rent: Vec<CatalogProviderItem>,
    #[serde(default)]
    pub buy: Vec<CatalogProviderItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogProviderItem {
    pub provider_name: String,
    #[serde(default)]
    pub logo_path: Option<String>,
}
