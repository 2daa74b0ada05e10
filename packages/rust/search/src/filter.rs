//! Link-based pre-filter for search results.

use dbbuilder_shared::SearchResultItem;

/// Drops results whose link contains any excluded substring.
///
/// Matching is case-insensitive and purely textual; no request is made.
#[derive(Debug, Clone)]
pub struct KeywordFilter {
    keywords: Vec<String>,
}

impl KeywordFilter {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keywords: keywords
                .into_iter()
                .map(|k| k.as_ref().trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    /// Whether `link` contains none of the excluded substrings.
    pub fn allows(&self, link: &str) -> bool {
        let link = link.to_lowercase();
        !self.keywords.iter().any(|k| link.contains(k.as_str()))
    }

    /// Keep the allowed results, in their original order.
    pub fn apply(&self, results: Vec<SearchResultItem>) -> Vec<SearchResultItem> {
        results
            .into_iter()
            .filter(|item| self.allows(&item.link))
            .collect()
    }
}

/// One-shot form of [`KeywordFilter::apply`].
pub fn filter_results<S: AsRef<str>>(
    results: Vec<SearchResultItem>,
    keywords: &[S],
) -> Vec<SearchResultItem> {
    KeywordFilter::new(keywords).apply(results)
}
