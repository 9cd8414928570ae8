use serde::Deserialize;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Catalog API key (required)
    pub catalog_api_key: String,

    /// Catalog API base URL
    #[serde(default = "default_catalog_api_url")]
    pub catalog_api_url: String,

    /// Base URL for poster and provider-logo images
    #[serde(default = "default_image_cdn_base")]
    pub image_cdn_base: String,

    /// Region code used for availability lookups
    #[serde(default = "default_availability_region")]
    pub availability_region: String,

    /// Interpreter used to launch the batch agent
    #[serde(default = "default_agent_interpreter")]
    pub agent_interpreter: String,

    /// Path to the batch agent script
    #[serde(default = "default_agent_script_path")]
    pub agent_script_path: String,

    /// Worker pool size for per-category catalog fan-out
    #[serde(default = "default_aggregator_concurrency")]
    pub aggregator_concurrency: usize,

    /// Maximum concurrently running async agent invocations
    #[serde(default = "default_max_concurrent_agent_runs")]
    pub max_concurrent_agent_runs: usize,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_catalog_api_url() -> String {
    "https://api.themoviedb.org/3".to_string()
}

fn default_image_cdn_base() -> String {
    "https://image.tmdb.org/t/p".to_string()
}

fn default_availability_region() -> String {
    "US".to_string()
}

fn default_agent_interpreter() -> String {
    "python3".to_string()
}

fn default_agent_script_path() -> String {
    "./agent/batch_processor.py".to_string()
}

fn default_aggregator_concurrency() -> usize {
    4
}

fn default_max_concurrent_agent_runs() -> usize {
    2
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    /// Poster image base (w500 rendition)
    pub fn poster_base(&self) -> String {
        format!("{}/w500", self.image_cdn_base)
    }

    /// Provider logo base (original rendition)
    pub fn logo_base(&self) -> String {
        format!("{}/original", self.image_cdn_base)
    }
}
