//! External capabilities built once from config and shared by every unit.

use std::sync::Arc;

use dbbuilder_llm::{ChatClient, TextGenerator};
use dbbuilder_search::{KeywordFilter, SearchClient, SearchProvider};
use dbbuilder_shared::{AppConfig, Invoker, Result, SearchConfig};

use crate::generator::QuantityGenerator;
use crate::judgement::JudgementPipeline;

/// Where the search capability comes from.
#[derive(Clone)]
enum SearchSource {
    Ready(Arc<dyn SearchProvider>),
    /// Built on first use, so modes that never search need no search credentials.
    Deferred(SearchConfig),
}

#[derive(Clone)]
pub struct Toolkit {
    pub generator: Arc<dyn TextGenerator>,
    pub invoker: Invoker,
    search: SearchSource,
}

impl Toolkit {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        search: Arc<dyn SearchProvider>,
        invoker: Invoker,
    ) -> Self {
        Self {
            generator,
            invoker,
            search: SearchSource::Ready(search),
        }
    }

    /// A toolkit whose search client is built from `config` when first asked for.
    pub fn with_deferred_search(
        generator: Arc<dyn TextGenerator>,
        config: SearchConfig,
        invoker: Invoker,
    ) -> Self {
        Self {
            generator,
            invoker,
            search: SearchSource::Deferred(config),
        }
    }

    /// Build the chat client. Fails when the LLM key env var is unset; search
    /// credentials are only checked by [`Toolkit::search`].
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let invoker = Invoker::from_config(&config.retry);
        let generator = ChatClient::from_config(&config.llm)?;
        Ok(Self::with_deferred_search(
            Arc::new(generator),
            config.search.clone(),
            invoker,
        ))
    }

    /// The search capability. Fails when a search credential env var is unset.
    pub fn search(&self) -> Result<Arc<dyn SearchProvider>> {
        match &self.search {
            SearchSource::Ready(search) => Ok(search.clone()),
            SearchSource::Deferred(config) => {
                let client = SearchClient::from_config(config, self.invoker.clone())?;
                Ok(Arc::new(client))
            }
        }
    }

    pub fn quantity_generator(&self, config: &AppConfig) -> QuantityGenerator {
        QuantityGenerator::new(
            self.generator.clone(),
            self.invoker.clone(),
            config.pipeline.generation_limit(),
        )
    }

    pub fn judgement(&self) -> JudgementPipeline {
        JudgementPipeline::new(self.generator.clone(), self.invoker.clone())
    }

    pub fn keyword_filter(config: &AppConfig) -> KeywordFilter {
        KeywordFilter::new(&config.pipeline.exclude_keywords)
    }
}
