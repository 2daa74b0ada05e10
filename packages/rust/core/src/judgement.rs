//! Candidate judgement: classify, extract, deduplicate, verify.
//!
//! Every stage is a concurrent fan-out over the surviving candidates, joined
//! before the next stage starts. Results are matched back to candidates by
//! position. A failure for one candidate drops that candidate only.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, info, instrument, warn};

use dbbuilder_llm::{ChatMessage, TextGenerator};
use dbbuilder_shared::{CandidateEntity, DbBuilderError, Invoker, Result, SearchResultItem};

use crate::prompts::{self, JudgeProfile};

// ---------------------------------------------------------------------------
// Verdicts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    Reject,
}

/// Read a yes/no answer. Anything else is a parse failure.
pub fn parse_verdict(text: &str) -> Result<Verdict> {
    let answer = text
        .trim()
        .trim_start_matches(|c: char| c == '"' || c == '\'' || c == '*')
        .to_lowercase();

    if answer.starts_with("yes") || answer.starts_with("true") {
        Ok(Verdict::Accept)
    } else if answer.starts_with("no") || answer.starts_with("false") {
        Ok(Verdict::Reject)
    } else {
        let snippet: String = text.trim().chars().take(40).collect();
        Err(DbBuilderError::parse(format!(
            "expected yes or no, got {snippet:?}"
        )))
    }
}

// ---------------------------------------------------------------------------
// Judge / Extractor
// ---------------------------------------------------------------------------

/// Asks one yes/no question about a candidate.
#[derive(Clone)]
pub struct Judge {
    generator: Arc<dyn TextGenerator>,
    invoker: Invoker,
    profile: JudgeProfile,
}

impl Judge {
    pub fn new(generator: Arc<dyn TextGenerator>, invoker: Invoker, profile: JudgeProfile) -> Self {
        Self {
            generator,
            invoker,
            profile,
        }
    }

    pub async fn evaluate(&self, candidate: &SearchResultItem) -> Result<Verdict> {
        let messages = [
            ChatMessage::system(self.profile.system),
            ChatMessage::user(self.profile.render(
                &candidate.title,
                &candidate.link,
                &candidate.snippet,
            )),
        ];
        let answer = self
            .invoker
            .invoke(|| self.generator.complete(&messages))
            .await?;

        let verdict = parse_verdict(&answer)?;
        debug!(profile = self.profile.name, link = %candidate.link, ?verdict, "judged");
        Ok(verdict)
    }
}

/// Pulls the company name out of a candidate.
#[derive(Clone)]
pub struct Extractor {
    generator: Arc<dyn TextGenerator>,
    invoker: Invoker,
    profile: JudgeProfile,
}

impl Extractor {
    pub fn new(generator: Arc<dyn TextGenerator>, invoker: Invoker) -> Self {
        Self {
            generator,
            invoker,
            profile: prompts::NAME_EXTRACT,
        }
    }

    pub async fn extract(&self, candidate: &SearchResultItem) -> Result<String> {
        let messages = [
            ChatMessage::system(self.profile.system),
            ChatMessage::user(self.profile.render(
                &candidate.title,
                &candidate.link,
                &candidate.snippet,
            )),
        ];
        let answer = self
            .invoker
            .invoke(|| self.generator.complete(&messages))
            .await?;

        let name = answer
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or_default()
            .trim_matches(|c: char| c == '"' || c == '\'' || c == '.')
            .trim();

        if name.is_empty() {
            return Err(DbBuilderError::parse("empty company name"));
        }
        Ok(name.to_string())
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Stage at which a candidate was dropped by an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Classify,
    Extract,
    Verify,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Classify => "classify",
            Self::Extract => "extract",
            Self::Verify => "verify",
        })
    }
}

/// A candidate that errored rather than being judged.
#[derive(Debug)]
pub struct CandidateFailure {
    pub link: String,
    pub stage: Stage,
    pub error: DbBuilderError,
}

/// Verified entities in first-seen order, and the candidates that errored.
#[derive(Debug, Default)]
pub struct JudgementOutcome {
    pub entities: Vec<CandidateEntity>,
    pub failures: Vec<CandidateFailure>,
}

#[derive(Clone)]
pub struct JudgementPipeline {
    classifier: Judge,
    extractor: Extractor,
    verifier: Judge,
}

impl JudgementPipeline {
    /// Pipeline using the built-in site-check, name-extract, and verify prompts.
    pub fn new(generator: Arc<dyn TextGenerator>, invoker: Invoker) -> Self {
        Self {
            classifier: Judge::new(generator.clone(), invoker.clone(), prompts::SITE_CHECK),
            extractor: Extractor::new(generator.clone(), invoker.clone()),
            verifier: Judge::new(generator, invoker, prompts::SITE_VERIFY),
        }
    }

    #[instrument(skip_all, fields(candidates = candidates.len()))]
    pub async fn run(&self, candidates: Vec<SearchResultItem>) -> JudgementOutcome {
        let mut failures = Vec::new();

        // classify
        let verdicts = join_all(candidates.iter().map(|c| self.classifier.evaluate(c))).await;
        let mut accepted = Vec::new();
        for (candidate, verdict) in candidates.into_iter().zip(verdicts) {
            match verdict {
                Ok(Verdict::Accept) => accepted.push(candidate),
                Ok(Verdict::Reject) => {}
                Err(error) => failures.push(failure(candidate.link, Stage::Classify, error)),
            }
        }
        info!(accepted = accepted.len(), "classification done");

        // extract
        let names = join_all(accepted.iter().map(|c| self.extractor.extract(c))).await;
        let mut named = Vec::new();
        for (candidate, name) in accepted.into_iter().zip(names) {
            match name {
                Ok(name) => named.push(CandidateEntity::new(name, &candidate.link)),
                Err(error) => failures.push(failure(candidate.link, Stage::Extract, error)),
            }
        }

        let unique = dedupe_candidates(named);
        debug!(unique = unique.len(), "deduplicated");

        // verify against the bare base URL
        let probes: Vec<SearchResultItem> = unique
            .iter()
            .map(|entity| SearchResultItem {
                title: entity.name.clone(),
                link: entity.url.clone(),
                snippet: String::new(),
            })
            .collect();
        let verdicts = join_all(probes.iter().map(|p| self.verifier.evaluate(p))).await;
        let mut entities = Vec::new();
        for (entity, verdict) in unique.into_iter().zip(verdicts) {
            match verdict {
                Ok(Verdict::Accept) => entities.push(entity),
                Ok(Verdict::Reject) => {}
                Err(error) => failures.push(failure(entity.url, Stage::Verify, error)),
            }
        }

        info!(
            verified = entities.len(),
            failed = failures.len(),
            "judgement complete"
        );
        JudgementOutcome { entities, failures }
    }
}

fn failure(link: String, stage: Stage, error: DbBuilderError) -> CandidateFailure {
    warn!(%link, %stage, error = %error, "candidate dropped");
    CandidateFailure { link, stage, error }
}

/// Keep the first entity per base URL, preserving order.
pub fn dedupe_candidates(entities: Vec<CandidateEntity>) -> Vec<CandidateEntity> {
    let mut seen = HashSet::new();
    entities
        .into_iter()
        .filter(|entity| seen.insert(entity.url.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RuleGenerator;
    use std::time::Duration;

    fn item(title: &str, link: &str) -> SearchResultItem {
        SearchResultItem {
            title: title.to_string(),
            link: link.to_string(),
            snippet: String::new(),
        }
    }

    fn invoker() -> Invoker {
        Invoker::new(Duration::ZERO, Some(2))
    }

    #[test]
    fn verdict_grammar() {
        assert_eq!(parse_verdict("Yes.").unwrap(), Verdict::Accept);
        assert_eq!(parse_verdict("  true").unwrap(), Verdict::Accept);
        assert_eq!(parse_verdict("\"yes\"").unwrap(), Verdict::Accept);
        assert_eq!(parse_verdict("No, it is a blog").unwrap(), Verdict::Reject);
        assert_eq!(parse_verdict("FALSE").unwrap(), Verdict::Reject);
        assert!(parse_verdict("Maybe").is_err());
        assert!(parse_verdict("").is_err());
    }

    #[test]
    fn dedupe_keeps_first_per_base_url() {
        let entities = vec![
            CandidateEntity::new("Example One", "https://example.com/a?x=1"),
            CandidateEntity::new("Example Two", "https://example.com/b"),
            CandidateEntity::new("Other", "https://other.com/"),
        ];
        let unique = dedupe_candidates(entities);
        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].name, "Example One");
        assert_eq!(unique[0].url, "https://example.com");
        assert_eq!(unique[1].name, "Other");
    }

    #[tokio::test]
    async fn pipeline_classifies_extracts_dedupes_verifies() {
        let stub = Arc::new(
            RuleGenerator::new()
                // extract prompts also quote the URL, so they match first
                .reply("belong to?\n\nTitle: Acme Boilers", "Acme Corp")
                .reply("belong to?\n\nTitle: About Acme", "Acme Corporation")
                .reply("belong to?\n\nTitle: HeatCo", "HeatCo")
                // classify
                .reply("URL: https://acme.com/boilers", "yes")
                .reply("URL: https://acme.com/about", "yes")
                .reply("URL: https://blog.example.org", "no")
                .reply("URL: https://heatco.com/", "yes")
                .reply("URL: https://broken.com/", "perhaps")
                // verify
                .reply("Is https://acme.com the official", "yes")
                .reply("Is https://heatco.com the official", "no"),
        );
        let pipeline = JudgementPipeline::new(stub.clone(), invoker());

        let outcome = pipeline
            .run(vec![
                item("Acme Boilers", "https://acme.com/boilers"),
                item("Boiler blog", "https://blog.example.org"),
                item("About Acme", "https://acme.com/about"),
                item("HeatCo", "https://heatco.com/"),
                item("Broken", "https://broken.com/"),
            ])
            .await;

        assert_eq!(
            outcome.entities,
            vec![CandidateEntity::new("Acme Corp", "https://acme.com")]
        );
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].link, "https://broken.com/");
        assert_eq!(outcome.failures[0].stage, Stage::Classify);
        // 5 classify + 3 extract + 2 verify
        assert_eq!(stub.calls(), 10);
    }

    #[tokio::test]
    async fn fatal_error_drops_only_that_candidate() {
        let stub = Arc::new(
            RuleGenerator::new()
                .reply("belong to?", "Good Inc")
                .fail("URL: https://bad.com", "content policy")
                .reply("URL: https://good.com", "yes")
                .reply("the official website", "yes"),
        );
        let pipeline = JudgementPipeline::new(stub, invoker());

        let outcome = pipeline
            .run(vec![
                item("Bad", "https://bad.com"),
                item("Good", "https://good.com/x"),
            ])
            .await;

        assert_eq!(outcome.entities.len(), 1);
        assert_eq!(outcome.entities[0].name, "Good Inc");
        assert_eq!(outcome.failures.len(), 1);
        assert!(matches!(
            outcome.failures[0].error,
            DbBuilderError::Api { status: 400, .. }
        ));
    }

    #[tokio::test]
    async fn empty_input_makes_no_calls() {
        let stub = Arc::new(RuleGenerator::new());
        let outcome = JudgementPipeline::new(stub.clone(), invoker())
            .run(Vec::new())
            .await;
        assert!(outcome.entities.is_empty());
        assert_eq!(stub.calls(), 0);
    }
}
