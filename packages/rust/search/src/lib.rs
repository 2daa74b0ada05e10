//! Search capability for dbbuilder.
//!
//! [`SearchClient`] pages through the Custom Search JSON API and normalizes the
//! results into [`SearchResultItem`]s. [`filter_results`] drops links that are
//! obviously not company sites before any generative call is spent on them.

mod client;
mod filter;

use async_trait::async_trait;

use dbbuilder_shared::{Result, SearchResultItem};

pub use client::{RESULTS_PER_PAGE, SearchClient, page_count};
pub use filter::{KeywordFilter, filter_results};

/// A paginated web-search service.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Run `query`, asking for up to `desired_count` results.
    ///
    /// Results come back in page order, then in the order the service
    /// returned them within each page. Fewer than `desired_count` is normal.
    async fn search(&self, query: &str, desired_count: usize) -> Result<Vec<SearchResultItem>>;
}
