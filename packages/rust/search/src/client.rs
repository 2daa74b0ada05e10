//! Paginated Custom Search JSON API client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};
use url::Url;

use dbbuilder_shared::{
    DbBuilderError, Invoker, Result, SearchConfig, SearchResultItem, resolve_secret,
};

use crate::SearchProvider;

/// Results the service returns per page.
pub const RESULTS_PER_PAGE: usize = 10;

/// User-Agent string for search requests.
const USER_AGENT: &str = concat!("dbbuilder/", env!("CARGO_PKG_VERSION"));

/// Number of page requests made for `desired_count` results.
pub fn page_count(desired_count: usize) -> usize {
    (desired_count / RESULTS_PER_PAGE).max(1)
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SearchPage {
    #[serde(default)]
    items: Vec<RawItem>,
}

#[derive(Debug, Deserialize)]
struct RawItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
}

/// What one page request produced, short of a retryable error.
enum PageOutcome {
    Items(Vec<SearchResultItem>),
    ServerError(StatusCode),
    Rejected(StatusCode),
}

// ---------------------------------------------------------------------------
// SearchClient
// ---------------------------------------------------------------------------

/// Search client holding one pooled `reqwest::Client`; safe to share across tasks.
#[derive(Debug, Clone)]
pub struct SearchClient {
    client: Client,
    endpoint: String,
    api_key: String,
    engine_id: String,
    server_error_delay: Duration,
    invoker: Invoker,
}

impl SearchClient {
    /// Build a client, reading the key and engine id from the env vars named in `config`.
    pub fn from_config(config: &SearchConfig, invoker: Invoker) -> Result<Self> {
        let api_key = resolve_secret(&config.api_key_env)?;
        let engine_id = resolve_secret(&config.engine_id_env)?;
        Self::new(config, api_key, engine_id, invoker)
    }

    /// Build a client with explicit credentials.
    pub fn new(
        config: &SearchConfig,
        api_key: impl Into<String>,
        engine_id: impl Into<String>,
        invoker: Invoker,
    ) -> Result<Self> {
        let endpoint = Url::parse(&config.base_url).map_err(|e| {
            DbBuilderError::config(format!("invalid search base_url {:?}: {e}", config.base_url))
        })?;

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DbBuilderError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            api_key: api_key.into(),
            engine_id: engine_id.into(),
            server_error_delay: Duration::from_secs(config.server_error_delay_secs),
            invoker,
        })
    }

    /// Fetch one page, retrying a server error once. Failures yield no items.
    async fn fetch_page(
        &self,
        query: &str,
        start: usize,
        num: Option<usize>,
    ) -> Vec<SearchResultItem> {
        let mut retried = false;
        loop {
            let outcome = self
                .invoker
                .invoke(|| self.request_page(query, start, num))
                .await;

            match outcome {
                Ok(PageOutcome::Items(items)) => return items,
                Ok(PageOutcome::ServerError(status)) if !retried => {
                    warn!(
                        %status,
                        start,
                        delay_secs = self.server_error_delay.as_secs(),
                        "search server error, retrying page once"
                    );
                    tokio::time::sleep(self.server_error_delay).await;
                    retried = true;
                }
                Ok(PageOutcome::ServerError(status) | PageOutcome::Rejected(status)) => {
                    warn!(%status, start, "search page failed, skipping");
                    return Vec::new();
                }
                Err(e) => {
                    warn!(error = %e, start, "search page failed, skipping");
                    return Vec::new();
                }
            }
        }
    }

    async fn request_page(
        &self,
        query: &str,
        start: usize,
        num: Option<usize>,
    ) -> Result<PageOutcome> {
        let start_param = start.to_string();
        let mut params: Vec<(&str, &str)> = vec![
            ("key", self.api_key.as_str()),
            ("cx", self.engine_id.as_str()),
            ("q", query),
            ("start", start_param.as_str()),
        ];
        let num_param = num.map(|n| n.to_string());
        if let Some(num) = &num_param {
            params.push(("num", num.as_str()));
        }

        let response = self
            .client
            .get(&self.endpoint)
            .query(&params)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(DbBuilderError::RateLimited(format!(
                "search quota exceeded (start={start})"
            )));
        }
        if status.is_server_error() {
            return Ok(PageOutcome::ServerError(status));
        }
        if !status.is_success() {
            return Ok(PageOutcome::Rejected(status));
        }

        let page: SearchPage = response.json().await.map_err(|e| {
            if e.is_decode() {
                DbBuilderError::parse(format!("unreadable search page: {e}"))
            } else {
                transport_error(e)
            }
        })?;

        let items = page
            .items
            .into_iter()
            .filter(|item| !item.link.is_empty())
            .map(|item| SearchResultItem {
                title: item.title,
                link: item.link,
                snippet: item.snippet,
            })
            .collect();

        Ok(PageOutcome::Items(items))
    }
}

#[async_trait]
impl SearchProvider for SearchClient {
    #[instrument(skip_all, fields(query = %query, desired = desired_count))]
    async fn search(&self, query: &str, desired_count: usize) -> Result<Vec<SearchResultItem>> {
        if desired_count == 0 {
            return Ok(Vec::new());
        }

        let num = (desired_count < RESULTS_PER_PAGE).then_some(desired_count);
        let mut results = Vec::new();

        for page in 0..page_count(desired_count) {
            let start = page * RESULTS_PER_PAGE + 1;
            let items = self.fetch_page(query, start, num).await;
            debug!(start, count = items.len(), "search page fetched");
            results.extend(items);
        }

        info!(count = results.len(), "search complete");
        Ok(results)
    }
}

/// Timeouts and connection failures are worth retrying; the rest are not.
fn transport_error(e: reqwest::Error) -> DbBuilderError {
    if e.is_timeout() || e.is_connect() || e.is_request() || e.is_body() {
        DbBuilderError::Transient(e.to_string())
    } else {
        DbBuilderError::Network(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> SearchClient {
        let config = SearchConfig {
            base_url: format!("{}/customsearch/v1", server.uri()),
            server_error_delay_secs: 0,
            timeout_secs: 5,
            ..SearchConfig::default()
        };
        let invoker = Invoker::new(Duration::ZERO, Some(3));
        SearchClient::new(&config, "key", "engine", invoker).unwrap()
    }

    fn page_body(prefix: &str, count: usize) -> serde_json::Value {
        let items: Vec<_> = (0..count)
            .map(|i| {
                serde_json::json!({
                    "title": format!("{prefix} {i}"),
                    "link": format!("https://{prefix}{i}.example.com/page"),
                    "snippet": "..."
                })
            })
            .collect();
        serde_json::json!({ "items": items })
    }

    #[test]
    fn page_counts() {
        assert_eq!(page_count(100), 10);
        assert_eq!(page_count(50), 5);
        assert_eq!(page_count(10), 1);
        assert_eq!(page_count(15), 1);
        assert_eq!(page_count(3), 1);
    }

    #[tokio::test]
    async fn pages_are_requested_in_order() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/customsearch/v1"))
            .and(query_param("q", "boilers manufacturers"))
            .and(query_param("start", "1"))
            .and(query_param("cx", "engine"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_body("first", 10)))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/customsearch/v1"))
            .and(query_param("start", "11"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_body("second", 10)))
            .expect(1)
            .mount(&server)
            .await;

        let results = client_for(&server)
            .search("boilers manufacturers", 20)
            .await
            .unwrap();

        assert_eq!(results.len(), 20);
        assert_eq!(results[0].title, "first 0");
        assert_eq!(results[9].title, "first 9");
        assert_eq!(results[10].title, "second 0");
    }

    #[tokio::test]
    async fn small_requests_set_num() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(query_param("num", "5"))
            .and(query_param("start", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_body("only", 5)))
            .expect(1)
            .mount(&server)
            .await;

        let results = client_for(&server).search("x", 5).await.unwrap();
        assert_eq!(results.len(), 5);
    }

    #[tokio::test]
    async fn missing_items_contribute_nothing() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"searchInformation": {"totalResults": "0"}})),
            )
            .mount(&server)
            .await;

        let results = client_for(&server).search("nothing", 10).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn server_error_retried_once_then_skipped() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(query_param("start", "1"))
            .respond_with(ResponseTemplate::new(500))
            .expect(2)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(query_param("start", "11"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_body("later", 10)))
            .expect(1)
            .mount(&server)
            .await;

        let results = client_for(&server).search("x", 20).await.unwrap();
        assert_eq!(results.len(), 10);
        assert_eq!(results[0].title, "later 0");
    }

    #[tokio::test]
    async fn client_error_page_is_skipped_without_retry() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .expect(1)
            .mount(&server)
            .await;

        let results = client_for(&server).search("x", 10).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn rate_limit_goes_through_invoker() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_body("after", 10)))
            .expect(1)
            .mount(&server)
            .await;

        let results = client_for(&server).search("x", 10).await.unwrap();
        assert_eq!(results.len(), 10);
    }
}
