//! URL finder: search for a named manufacturer and let the generative service
//! pick the right link.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, instrument, warn};

use dbbuilder_llm::{ChatMessage, TextGenerator, extract_https_url};
use dbbuilder_search::{KeywordFilter, SearchProvider};
use dbbuilder_shared::{Invoker, Result, SearchResultItem};
use dbbuilder_tables::ResultTable;

use crate::prompts;
use crate::scheduler::WorkUnit;

/// Which URL is being looked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinderProfile {
    /// The manufacturer's own website.
    Website,
    /// The product listing page on an already known website.
    ProductPage,
}

impl FinderProfile {
    /// Header of the URL column in the output table.
    pub fn column(&self) -> &'static str {
        match self {
            Self::Website => "website",
            Self::ProductPage => "product page",
        }
    }

    pub fn headers(&self) -> [&'static str; 2] {
        ["manufacturer name", self.column()]
    }

    pub fn query(&self, target: &FinderTarget) -> String {
        match (self, target.site.as_deref()) {
            (Self::ProductPage, Some(site)) => format!("{} site:{site} products", target.name),
            (Self::ProductPage, None) => format!("{} products", target.name),
            (Self::Website, _) => format!("{} manufacturer website", target.name),
        }
    }

    /// Only website lookups are worth filtering; product-page queries are
    /// already pinned to one site.
    pub fn filters_results(&self) -> bool {
        matches!(self, Self::Website)
    }

    fn prompt(&self, name: &str, listing: &str) -> String {
        match self {
            Self::Website => prompts::website_lookup(name, listing),
            Self::ProductPage => prompts::product_page_lookup(name, listing),
        }
    }
}

/// A manufacturer to look up, and its website when already known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinderTarget {
    pub name: String,
    pub site: Option<String>,
}

impl FinderTarget {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            site: None,
        }
    }

    pub fn on_site(name: impl Into<String>, site: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            site: Some(site.into()),
        }
    }
}

impl fmt::Display for FinderTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

pub struct UrlFinder {
    search: Arc<dyn SearchProvider>,
    generator: Arc<dyn TextGenerator>,
    invoker: Invoker,
    filter: KeywordFilter,
    profile: FinderProfile,
    result_count: usize,
}

impl UrlFinder {
    pub fn new(
        search: Arc<dyn SearchProvider>,
        generator: Arc<dyn TextGenerator>,
        invoker: Invoker,
        filter: KeywordFilter,
        profile: FinderProfile,
        result_count: usize,
    ) -> Self {
        Self {
            search,
            generator,
            invoker,
            filter,
            profile,
            result_count,
        }
    }

    pub fn profile(&self) -> FinderProfile {
        self.profile
    }

    /// The chosen URL, or an empty string when none could be found.
    #[instrument(skip_all, fields(name = %target.name, profile = self.profile.column()))]
    pub async fn find(&self, target: &FinderTarget) -> Result<String> {
        let query = self.profile.query(target);
        let mut results = self.search.search(&query, self.result_count).await?;
        if self.profile.filters_results() {
            results = self.filter.apply(results);
        }

        if results.is_empty() {
            warn!("no search results, leaving URL empty");
            return Ok(String::new());
        }

        let messages = [ChatMessage::user(
            self.profile.prompt(&target.name, &format_results(&results)),
        )];
        let response = self
            .invoker
            .invoke(|| self.generator.complete(&messages))
            .await?;

        match extract_https_url(&response) {
            Some(url) => {
                info!(%url, "URL found");
                Ok(url)
            }
            None => {
                warn!("could not find URL in response");
                Ok(String::new())
            }
        }
    }
}

/// One link per line.
fn format_results(results: &[SearchResultItem]) -> String {
    results
        .iter()
        .map(|r| r.link.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl WorkUnit for UrlFinder {
    type Input = FinderTarget;

    async fn process(&self, input: &FinderTarget) -> Result<ResultTable> {
        let url = self.find(input).await?;
        let mut table = ResultTable::with_headers(self.profile.headers())?;
        table.push_row([input.name.clone(), url])?;
        Ok(table)
    }
}
