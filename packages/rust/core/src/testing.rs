//! Stub capabilities for pipeline tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use dbbuilder_llm::{ChatMessage, TextGenerator};
use dbbuilder_search::SearchProvider;
use dbbuilder_shared::{DbBuilderError, Result, SearchResultItem};

/// Replies with a fixed script, one entry per call; the last entry repeats.
pub struct ScriptedGenerator {
    script: Vec<String>,
    pub calls: AtomicUsize,
}

impl ScriptedGenerator {
    pub fn new<S: Into<String>>(script: impl IntoIterator<Item = S>) -> Self {
        Self {
            script: script.into_iter().map(Into::into).collect(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn complete(&self, _messages: &[ChatMessage]) -> Result<String> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        let idx = n.min(self.script.len().saturating_sub(1));
        Ok(self.script.get(idx).cloned().unwrap_or_default())
    }
}

/// Answers by the first rule whose needle occurs in the last message.
pub struct RuleGenerator {
    rules: Vec<(String, std::result::Result<String, String>)>,
    pub calls: AtomicUsize,
    pub seen: Mutex<Vec<Vec<ChatMessage>>>,
}

impl RuleGenerator {
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn reply(mut self, needle: &str, answer: &str) -> Self {
        self.rules.push((needle.to_string(), Ok(answer.to_string())));
        self
    }

    /// Fail fatally when `needle` is present.
    pub fn fail(mut self, needle: &str, message: &str) -> Self {
        self.rules.push((needle.to_string(), Err(message.to_string())));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for RuleGenerator {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(messages.to_vec());

        let last = messages.last().map(|m| m.content.as_str()).unwrap_or_default();
        for (needle, answer) in &self.rules {
            if last.contains(needle.as_str()) {
                return answer.clone().map_err(|message| DbBuilderError::Api {
                    status: 400,
                    message,
                });
            }
        }
        Ok(String::new())
    }
}

/// Returns canned results per query and counts calls.
#[derive(Default)]
pub struct StubSearch {
    results: HashMap<String, Vec<SearchResultItem>>,
    pub calls: AtomicUsize,
}

impl StubSearch {
    pub fn with(mut self, query: &str, links: &[(&str, &str)]) -> Self {
        let items = links
            .iter()
            .map(|(title, link)| SearchResultItem {
                title: title.to_string(),
                link: link.to_string(),
                snippet: String::new(),
            })
            .collect();
        self.results.insert(query.to_string(), items);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SearchProvider for StubSearch {
    async fn search(&self, query: &str, desired_count: usize) -> Result<Vec<SearchResultItem>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut items = self.results.get(query).cloned().unwrap_or_default();
        items.truncate(desired_count);
        Ok(items)
    }
}

/// A list literal of `count` numbered items.
pub fn numbered_list(prefix: &str, count: usize) -> String {
    let items: Vec<String> = (0..count).map(|i| format!("\"{prefix} {i}\"")).collect();
    format!("[{}]", items.join(", "))
}
