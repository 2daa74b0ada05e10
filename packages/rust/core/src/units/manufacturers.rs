//! Manufacturer search: web results for a target, judged into company rows.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, instrument};

use dbbuilder_search::{KeywordFilter, SearchProvider};
use dbbuilder_shared::{Result, TargetKey};
use dbbuilder_tables::ResultTable;

use crate::judgement::JudgementPipeline;
use crate::scheduler::WorkUnit;

pub const MANUFACTURER_HEADERS: [&str; 2] = ["company name", "url"];

pub struct ManufacturerSearch {
    search: Arc<dyn SearchProvider>,
    filter: KeywordFilter,
    judgement: JudgementPipeline,
    result_count: usize,
}

impl ManufacturerSearch {
    pub fn new(
        search: Arc<dyn SearchProvider>,
        filter: KeywordFilter,
        judgement: JudgementPipeline,
        result_count: usize,
    ) -> Self {
        Self {
            search,
            filter,
            judgement,
            result_count,
        }
    }
}

#[async_trait]
impl WorkUnit for ManufacturerSearch {
    type Input = TargetKey;

    #[instrument(skip_all, fields(target = %input))]
    async fn process(&self, input: &TargetKey) -> Result<ResultTable> {
        let query = format!("{} manufacturers", input.label);
        let results = self.search.search(&query, self.result_count).await?;
        let fetched = results.len();
        let candidates = self.filter.apply(results);
        info!(fetched, kept = candidates.len(), "search results filtered");

        let outcome = self.judgement.run(candidates).await;

        let mut table = ResultTable::with_headers(MANUFACTURER_HEADERS)?;
        for entity in outcome.entities {
            table.push_row([entity.name, entity.url])?;
        }

        info!(
            manufacturers = table.row_count(),
            dropped = outcome.failures.len(),
            "manufacturers found"
        );
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RuleGenerator, StubSearch};
    use dbbuilder_shared::Invoker;
    use std::time::Duration;

    #[tokio::test]
    async fn filtered_judged_rows() {
        let search = Arc::new(StubSearch::default().with(
            "Boilers manufacturers",
            &[
                ("Boilers on Amazon", "https://www.amazon.com/s?k=boilers"),
                ("Acme Boilers", "https://acme.com/boilers"),
                ("Acme again", "https://acme.com/contact"),
            ],
        ));
        let generator = Arc::new(
            RuleGenerator::new()
                .reply("belong to?", "Acme")
                .reply("URL: https://acme.com", "yes")
                .reply("official website", "yes"),
        );
        let invoker = Invoker::new(Duration::ZERO, Some(2));
        let unit = ManufacturerSearch::new(
            search.clone(),
            KeywordFilter::new(["amazon."]),
            JudgementPipeline::new(generator.clone(), invoker),
            100,
        );

        let table = unit
            .process(&TargetKey::new("23-13", "Boilers"))
            .await
            .unwrap();

        assert_eq!(table.headers(), MANUFACTURER_HEADERS.to_vec());
        let rows: Vec<_> = table.rows().collect();
        assert_eq!(rows, vec![vec!["Acme", "https://acme.com"]]);
        assert_eq!(search.calls(), 1);
        // amazon never reaches the generator: 2 classify + 2 extract + 1 verify
        assert_eq!(generator.calls(), 5);
    }
}
