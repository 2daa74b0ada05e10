//! Exact-length list generation.

use std::sync::Arc;

use tracing::{debug, warn};

use dbbuilder_llm::{ChatMessage, TextGenerator, parse_list};
use dbbuilder_shared::{DbBuilderError, Invoker, Result};

/// A list with exactly the requested number of items, plus the raw answer it
/// was parsed from (kept so follow-up prompts can quote the exchange).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generated {
    pub items: Vec<String>,
    pub raw: String,
}

/// Asks for a list until one of the exact length comes back.
///
/// Unparsable answers and answers of the wrong length are regenerated, up to
/// `max_generations` (unbounded when `None`). Service errors go through the
/// [`Invoker`] and are not counted as generations.
#[derive(Clone)]
pub struct QuantityGenerator {
    generator: Arc<dyn TextGenerator>,
    invoker: Invoker,
    max_generations: Option<u32>,
}

impl QuantityGenerator {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        invoker: Invoker,
        max_generations: Option<u32>,
    ) -> Self {
        Self {
            generator,
            invoker,
            max_generations,
        }
    }

    pub async fn generate(&self, messages: &[ChatMessage], count: usize) -> Result<Generated> {
        let mut generation: u32 = 0;
        loop {
            generation += 1;
            let raw = self
                .invoker
                .invoke(|| self.generator.complete(messages))
                .await?;

            let err = match parse_list(&raw) {
                Ok(items) if items.len() == count => {
                    debug!(generation, count, "list accepted");
                    return Ok(Generated { items, raw });
                }
                Ok(items) => DbBuilderError::QuantityMismatch {
                    expected: count,
                    actual: items.len(),
                },
                Err(e) if e.is_regenerable() => e,
                Err(e) => return Err(e),
            };

            if self.max_generations.is_some_and(|max| generation >= max) {
                return Err(DbBuilderError::ExhaustedRetries {
                    attempts: generation,
                    last: err.to_string(),
                });
            }
            warn!(generation, error = %err, "regenerating list");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedGenerator, numbered_list};
    use std::time::Duration;

    fn generator_over(stub: Arc<ScriptedGenerator>, max: Option<u32>) -> QuantityGenerator {
        QuantityGenerator::new(stub, Invoker::new(Duration::ZERO, Some(3)), max)
    }

    #[tokio::test]
    async fn short_list_is_regenerated() {
        let stub = Arc::new(ScriptedGenerator::new([
            numbered_list("short", 18),
            numbered_list("value", 20),
        ]));
        let generator = generator_over(stub.clone(), Some(10));

        let generated = generator
            .generate(&[ChatMessage::user("twenty please")], 20)
            .await
            .unwrap();

        assert_eq!(generated.items.len(), 20);
        assert_eq!(generated.items[0], "value 0");
        assert_eq!(generated.raw, numbered_list("value", 20));
        assert_eq!(stub.calls(), 2);
    }

    #[tokio::test]
    async fn unparsable_answer_is_regenerated() {
        let stub = Arc::new(ScriptedGenerator::new([
            "Sorry, here are some ideas: finish, colour".to_string(),
            numbered_list("v", 3),
        ]));
        let generated = generator_over(stub.clone(), None)
            .generate(&[ChatMessage::user("three")], 3)
            .await
            .unwrap();

        assert_eq!(generated.items, vec!["v 0", "v 1", "v 2"]);
        assert_eq!(stub.calls(), 2);
    }

    #[tokio::test]
    async fn generation_cap_ends_in_exhausted_retries() {
        let stub = Arc::new(ScriptedGenerator::new([numbered_list("x", 2)]));
        let err = generator_over(stub.clone(), Some(4))
            .generate(&[ChatMessage::user("five")], 5)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DbBuilderError::ExhaustedRetries { attempts: 4, .. }
        ));
        assert_eq!(stub.calls(), 4);
    }
}
