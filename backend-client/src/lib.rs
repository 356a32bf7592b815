//! Client for the hosted table backend that stores scraped leads.
//!
//! [`BackendClient`] exposes the data-access operations the review tool
//! needs. Each operation comes in two forms: `try_*` returns the failure,
//! the plain form logs it and degrades to an empty or default value.

pub mod api;
pub mod leads;
pub mod metrics;
pub mod query;
pub mod shared;


pub use api::RestClient;
pub use metrics::{ApiMetrics, MetricsCollector, TableMetrics};
pub use query::TableQuery;
pub use shared::{install, shared};

use leadswipe_core::{AppConfig, BackendConfig, CoreError};

pub const LEADS_TABLE: &str = "reddit_leads";
pub const POSTS_TABLE: &str = "reddit_posts";
pub const SUBREDDITS_TABLE: &str = "subreddits";
pub const DECISIONS_TABLE: &str = "lead_decisions";
pub const KEYWORDS_TABLE: &str = "search_keywords";
pub const SCRAPE_JOBS_TABLE: &str = "scrape_jobs";

#[derive(Debug, Clone)]
pub struct BackendClient {
    api: RestClient,
}

impl BackendClient {
    pub fn new(config: &BackendConfig) -> Result<Self, CoreError> {
        Ok(Self {
            api: RestClient::new(config)?,
        })
    }

    /// Builds a client from `leadswipe.toml` and the environment.
    pub fn from_env() -> Result<Self, CoreError> {
        let config = AppConfig::load()?;
        Self::new(&config.backend)
    }

    pub fn api(&self) -> &RestClient {
        &self.api
    }

    pub async fn get_api_metrics(&self) -> ApiMetrics {
        self.api.get_metrics().await
    }

    pub async fn get_table_metrics(&self, table: &str) -> Option<TableMetrics> {
        self.api.get_table_metrics(table).await
    }

    /// All request counters as pretty-printed JSON.
    pub async fn export_api_metrics(&self) -> Result<String, CoreError> {
        self.api.export_metrics().await
    }
}
