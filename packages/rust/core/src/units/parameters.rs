//! Parameter tables: N parameter names for a target, N values for each.

use async_trait::async_trait;
use futures::future::try_join_all;
use tracing::{info, instrument};

use dbbuilder_llm::ChatMessage;
use dbbuilder_shared::{ParameterRecord, Result, TargetKey};
use dbbuilder_tables::ResultTable;

use crate::generator::QuantityGenerator;
use crate::prompts;
use crate::scheduler::WorkUnit;

pub struct ParameterTables {
    generator: QuantityGenerator,
    record_count: usize,
}

impl ParameterTables {
    pub fn new(generator: QuantityGenerator, record_count: usize) -> Self {
        Self {
            generator,
            record_count,
        }
    }

    async fn values_for(
        &self,
        context: &[ChatMessage],
        parameter: &str,
        label: &str,
    ) -> Result<ParameterRecord> {
        let mut messages = context.to_vec();
        messages.push(ChatMessage::user(prompts::parameter_values(
            parameter,
            label,
            self.record_count,
        )));

        let generated = self.generator.generate(&messages, self.record_count).await?;
        ParameterRecord::new(parameter, generated.items, self.record_count)
    }
}

#[async_trait]
impl WorkUnit for ParameterTables {
    type Input = TargetKey;

    #[instrument(skip_all, fields(target = %input))]
    async fn process(&self, input: &TargetKey) -> Result<ResultTable> {
        let n = self.record_count;
        let ask = ChatMessage::user(prompts::parameter_names(&input.label, n));
        let names = self
            .generator
            .generate(std::slice::from_ref(&ask), n)
            .await?;
        info!(parameters = names.items.len(), "parameters generated");

        // value prompts see the parameter exchange as prior turns
        let context = [ask, ChatMessage::assistant(names.raw.clone())];
        let records = try_join_all(
            names
                .items
                .iter()
                .map(|parameter| self.values_for(&context, parameter, &input.label)),
        )
        .await?;

        let mut table = ResultTable::new();
        for record in records {
            let (name, values) = record.into_parts();
            let column = unique_column_name(&table, &name);
            table.insert_column(column, values)?;
        }

        info!(
            columns = table.column_count(),
            rows = table.row_count(),
            "parameter table built"
        );
        Ok(table)
    }
}

/// `name`, or `name (2)`, `name (3)`, ... if already taken.
fn unique_column_name(table: &ResultTable, name: &str) -> String {
    if table.column(name).is_none() {
        return name.to_string();
    }
    (2..)
        .map(|i| format!("{name} ({i})"))
        .find(|candidate| table.column(candidate).is_none())
        .unwrap_or_else(|| name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RuleGenerator, numbered_list};
    use dbbuilder_llm::Role;
    use dbbuilder_shared::{DbBuilderError, Invoker};
    use std::sync::Arc;
    use std::time::Duration;

    fn unit(stub: Arc<RuleGenerator>, n: usize) -> ParameterTables {
        let invoker = Invoker::new(Duration::ZERO, Some(2));
        ParameterTables::new(QuantityGenerator::new(stub, invoker, Some(3)), n)
    }

    #[tokio::test]
    async fn builds_one_column_per_parameter() {
        let stub = Arc::new(
            RuleGenerator::new()
                .reply("BIM parameters", r#"["Finish", "Material", "Finish"]"#)
                .reply("Finish parameter", &numbered_list("finish", 3))
                .reply("Material parameter", &numbered_list("material", 3)),
        );
        let table = unit(stub.clone(), 3)
            .process(&TargetKey::new("23-13", "Boilers"))
            .await
            .unwrap();

        assert_eq!(table.headers(), vec!["Finish", "Material", "Finish (2)"]);
        assert_eq!(table.row_count(), 3);
        assert_eq!(table.column("Material").unwrap()[2], "material 2");
        // 1 names call + 3 value calls
        assert_eq!(stub.calls(), 4);
    }

    #[tokio::test]
    async fn value_prompts_carry_the_parameter_exchange() {
        let names = r#"["Finish"]"#;
        let stub = Arc::new(
            RuleGenerator::new()
                .reply("BIM parameters", names)
                .reply("Finish parameter", &numbered_list("v", 1)),
        );
        unit(stub.clone(), 1)
            .process(&TargetKey::new("23-13", "Boilers"))
            .await
            .unwrap();

        let seen = stub.seen.lock().unwrap();
        let value_call = seen.iter().find(|m| m.len() == 3).expect("value call");
        assert_eq!(value_call[0].role, Role::User);
        assert!(value_call[0].content.contains("Boilers"));
        assert_eq!(value_call[1], ChatMessage::assistant(names));
        assert!(value_call[2].content.contains("Finish parameter"));
    }

    #[tokio::test]
    async fn wrong_value_count_fails_the_target() {
        let stub = Arc::new(
            RuleGenerator::new()
                .reply("BIM parameters", &numbered_list("p", 2))
                .reply("p 0 parameter", &numbered_list("v", 2))
                .reply("p 1 parameter", &numbered_list("v", 1)),
        );
        let err = unit(stub, 2)
            .process(&TargetKey::new("23-13", "Boilers"))
            .await
            .unwrap_err();
        assert!(matches!(err, DbBuilderError::ExhaustedRetries { .. }));
    }

    #[test]
    fn column_names_are_disambiguated() {
        let mut table = ResultTable::new();
        table.insert_column("A", vec![]).unwrap();
        table.insert_column("A (2)", vec![]).unwrap();
        assert_eq!(unique_column_name(&table, "A"), "A (3)");
        assert_eq!(unique_column_name(&table, "B"), "B");
    }
}
