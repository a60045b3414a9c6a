//! Narrative analysis of top-ranked candidates.
//!
//! One LLM call per candidate, run with bounded concurrency and a
//! per-candidate deadline so a slow or failing analysis never stalls the
//! rest of the batch. Results are cached on the content of the prompt
//! (metadata, criteria, dimension scores), so the same candidate evaluated
//! against the same criteria reuses the stored narrative even across
//! queries with different ids.

use std::collections::HashMap;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::cache::{fingerprint, CacheLayer, CacheOutcome};
use crate::config::ScreeningConfig;
use crate::llm::prompts::{ANALYSIS_PROMPT_TEMPLATE, ANALYSIS_SYSTEM, ANALYSIS_VERSION};
use crate::llm::{LlmError, LlmProvider};
use crate::models::{QueryCriteria, ScoredCandidate};

/// Outcome of analyzing one batch of candidates. A candidate appears in
/// `narratives` or `failures`, never both.
#[derive(Debug, Default)]
pub struct BatchAnalysis {
    pub narratives: HashMap<Uuid, String>,
    pub failures: HashMap<Uuid, String>,
    pub cache_hits: usize,
    pub cache_misses: usize,
}

pub struct CandidateAnalyzer {
    llm: Arc<dyn LlmProvider>,
    cache: Arc<CacheLayer>,
    config: ScreeningConfig,
}

impl CandidateAnalyzer {
    pub fn new(llm: Arc<dyn LlmProvider>, cache: Arc<CacheLayer>, config: ScreeningConfig) -> Self {
        Self { llm, cache, config }
    }

    /// Analyzes `candidates` with at most `analysis_concurrency` calls in
    /// flight. Each candidate is isolated: a timeout or provider error is
    /// recorded as that candidate's failure and the batch continues.
    pub async fn analyze_batch(
        &self,
        criteria: &QueryCriteria,
        candidates: &[ScoredCandidate],
    ) -> BatchAnalysis {
        let mut batch = BatchAnalysis::default();

        let futures: Vec<_> = candidates
            .iter()
            .map(|candidate| async move {
                (candidate.record.id, self.analyze_one(criteria, candidate).await)
            })
            .collect();
        let results: Vec<(Uuid, Result<(String, CacheOutcome), String>)> = stream::iter(futures)
            .buffer_unordered(self.config.analysis_concurrency.max(1))
            .collect()
            .await;

        for (resume_id, result) in results {
            match result {
                Ok((narrative, outcome)) => {
                    match outcome {
                        CacheOutcome::Hit => batch.cache_hits += 1,
                        CacheOutcome::Miss => batch.cache_misses += 1,
                    }
                    batch.narratives.insert(resume_id, narrative);
                }
                Err(reason) => {
                    warn!(%resume_id, "candidate analysis failed: {reason}");
                    batch.failures.insert(resume_id, reason);
                }
            }
        }

        info!(
            query_id = %criteria.id,
            analyzed = batch.narratives.len(),
            failed = batch.failures.len(),
            cache_hits = batch.cache_hits,
            "batch analysis done"
        );
        batch
    }

    async fn analyze_one(
        &self,
        criteria: &QueryCriteria,
        candidate: &ScoredCandidate,
    ) -> Result<(String, CacheOutcome), String> {
        let prompt = self.render_prompt(criteria, candidate)?;
        // Keying on the rendered prompt makes the cache insensitive to query
        // and submission ids: same candidate, same criteria content, same key.
        let key = fingerprint("analyze_candidate", &prompt, ANALYSIS_VERSION);
        let timeout = self.config.analysis_timeout;

        self.cache
            .get_or_compute::<String, String, _, _>(&key, self.config.cache_ttl, || async move {
                match tokio::time::timeout(timeout, self.llm.complete(&prompt, ANALYSIS_SYSTEM))
                    .await
                {
                    Ok(Ok(narrative)) if !narrative.trim().is_empty() => {
                        Ok(narrative.trim().to_string())
                    }
                    Ok(Ok(_)) => Err(LlmError::EmptyContent.to_string()),
                    Ok(Err(e)) => Err(e.to_string()),
                    Err(_) => Err(LlmError::Timeout {
                        seconds: timeout.as_secs(),
                    }
                    .to_string()),
                }
            })
            .await
    }

    fn render_prompt(
        &self,
        criteria: &QueryCriteria,
        candidate: &ScoredCandidate,
    ) -> Result<String, String> {
        // Ids, timestamps, and ranks are deliberately left out of the prompt
        // payloads so equivalent content renders identically.
        let candidate_json = serde_json::to_string_pretty(&candidate.record.metadata)
            .map_err(|e| e.to_string())?;
        let criteria_json = serde_json::to_string_pretty(&json!({
            "required": criteria.required,
            "soft": criteria.soft,
        }))
        .map_err(|e| e.to_string())?;
        let b = &candidate.breakdown;
        let breakdown_json = serde_json::to_string_pretty(&json!({
            "skills": b.skills,
            "experience": b.experience,
            "education": b.education,
            "salary": b.salary,
            "location": b.location,
            "domain": b.domain,
            "composite": b.composite,
        }))
        .map_err(|e| e.to_string())?;

        Ok(ANALYSIS_PROMPT_TEMPLATE
            .replace("{candidate_json}", &candidate_json)
            .replace("{criteria_json}", &criteria_json)
            .replace("{breakdown_json}", &breakdown_json))
    }
}
