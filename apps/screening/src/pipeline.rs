//! Pipeline facade: resume ingestion, query submission, and asynchronous
//! evaluation wired over the capability traits. No global mutable state —
//! every dependency is injected as an `Arc<dyn Trait>` and the pipeline
//! itself is shared behind an `Arc`.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use serde_json::json;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::aggregator;
use crate::analyzer::CandidateAnalyzer;
use crate::cache::{CacheLayer, CacheOutcome};
use crate::config::ScreeningConfig;
use crate::embedding::EmbeddingProvider;
use crate::errors::ScreenError;
use crate::extractor::MetadataExtractor;
use crate::filter;
use crate::index::VectorStore;
use crate::llm::LlmProvider;
use crate::models::{
    Provenance, QueryCriteria, QueryStatus, ResumeRecord, ScoredCandidate, ScreeningReport,
};
use crate::query::QueryInterpreter;
use crate::ranker;
use crate::retriever::Retriever;
use crate::scorer;

pub struct ScreeningPipeline {
    extractor: MetadataExtractor,
    interpreter: QueryInterpreter,
    retriever: Retriever,
    analyzer: CandidateAnalyzer,
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorStore>,
    resumes: RwLock<HashMap<Uuid, ResumeRecord>>,
    queries: RwLock<HashMap<Uuid, QueryStatus>>,
    config: ScreeningConfig,
}

impl ScreeningPipeline {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorStore>,
        cache: Arc<CacheLayer>,
        config: ScreeningConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            extractor: MetadataExtractor::new(llm.clone(), cache.clone(), config.clone()),
            interpreter: QueryInterpreter::new(llm.clone(), cache.clone(), config.clone()),
            retriever: Retriever::new(embedder.clone(), index.clone()),
            analyzer: CandidateAnalyzer::new(llm, cache, config.clone()),
            embedder,
            index,
            resumes: RwLock::new(HashMap::new()),
            queries: RwLock::new(HashMap::new()),
            config,
        })
    }

    /// Ingests one resume: extract metadata, embed the raw text, index it.
    /// Never fails — an embedding or index error leaves the record stored
    /// with `indexed = false` (invisible to retrieval, recoverable later).
    pub async fn ingest_resume(&self, raw_text: &str) -> Uuid {
        let id = Uuid::new_v4();
        let (metadata, _) = self.extractor.extract(raw_text).await;

        let mut embedding = Vec::new();
        let mut indexed = false;
        match self.embedder.embed(raw_text).await {
            Ok(vector) => {
                let payload = json!({ "name": metadata.name });
                match self.index.upsert(id, vector.clone(), payload).await {
                    Ok(()) => {
                        embedding = vector;
                        indexed = true;
                    }
                    Err(e) => warn!(%id, "resume not indexed: {e}"),
                }
            }
            Err(e) => warn!(%id, "resume not embedded: {e}"),
        }

        let record = ResumeRecord {
            id,
            raw_text: raw_text.to_string(),
            metadata,
            embedding,
            indexed,
            ingested_at: Utc::now(),
        };
        info!(%id, indexed, incomplete = record.metadata.incomplete, "resume ingested");
        self.resumes.write().await.insert(id, record);
        id
    }

    /// Batch ingestion over a bounded worker pool. Returned ids are in
    /// completion order.
    pub async fn ingest_batch(&self, texts: Vec<String>) -> Vec<Uuid> {
        stream::iter(texts)
            .map(|text| async move { self.ingest_resume(&text).await })
            .buffer_unordered(self.config.ingest_concurrency.max(1))
            .collect()
            .await
    }

    pub async fn resume(&self, id: Uuid) -> Result<ResumeRecord, ScreenError> {
        self.resumes
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(ScreenError::ResumeNotFound(id))
    }

    pub async fn resume_count(&self) -> usize {
        self.resumes.read().await.len()
    }

    /// Deletes a resume and cascades to the index. Once this returns, the
    /// candidate can no longer appear in any retrieval.
    pub async fn delete_resume(&self, id: Uuid) -> Result<(), ScreenError> {
        if self.resumes.write().await.remove(&id).is_none() {
            return Err(ScreenError::ResumeNotFound(id));
        }
        self.index.delete(id).await?;
        info!(%id, "resume deleted");
        Ok(())
    }

    /// Interprets the requirement synchronously, then spawns the evaluation.
    /// An interpretation failure surfaces here; everything after it is
    /// observed through `fetch_results`.
    pub async fn submit_query(self: &Arc<Self>, query_text: &str) -> Result<Uuid, ScreenError> {
        let query_id = Uuid::new_v4();
        let (criteria, interp_outcome) = self.interpreter.interpret(query_id, query_text).await?;

        self.queries
            .write()
            .await
            .insert(query_id, QueryStatus::Pending);

        let pipeline = Arc::clone(self);
        tokio::spawn(async move {
            let status = match pipeline.evaluate(&criteria, interp_outcome).await {
                Ok(report) => QueryStatus::Ready {
                    report: Box::new(report),
                },
                Err(e) => {
                    warn!(%query_id, "query evaluation failed: {e}");
                    QueryStatus::Failed {
                        message: e.to_string(),
                        retryable: e.is_retryable(),
                    }
                }
            };
            pipeline.queries.write().await.insert(query_id, status);
        });

        Ok(query_id)
    }

    pub async fn fetch_results(&self, query_id: Uuid) -> Result<QueryStatus, ScreenError> {
        self.queries
            .read()
            .await
            .get(&query_id)
            .cloned()
            .ok_or(ScreenError::QueryNotFound(query_id))
    }

    /// retrieval → filter → score → rank → analyze top-N → aggregate.
    /// Candidate-level problems degrade with annotations; only index or
    /// embedding unreachability fails the whole query.
    async fn evaluate(
        &self,
        criteria: &QueryCriteria,
        interp_outcome: CacheOutcome,
    ) -> Result<ScreeningReport, ScreenError> {
        let hits = self
            .retriever
            .retrieve(criteria, self.config.retrieval_depth)
            .await?;

        let mut provenance = Provenance {
            interpretation_cache_hit: interp_outcome == CacheOutcome::Hit,
            retrieved: hits.len(),
            ..Default::default()
        };

        let resumes = self.resumes.read().await;
        let mut scored: Vec<ScoredCandidate> = Vec::new();
        for hit in hits {
            let record = match resumes.get(&hit.id) {
                Some(r) => r.clone(),
                // Index and record store can briefly disagree around a
                // delete; a hit without a record is simply dropped.
                None => continue,
            };
            let verdict = filter::evaluate(&record.metadata, criteria, self.config.salary_tolerance);
            if !verdict.passed() {
                provenance.filtered_out += 1;
                if !verdict.insufficient.is_empty() {
                    provenance.insufficient_data += 1;
                }
                continue;
            }
            let breakdown = scorer::score(
                record.id,
                &record.metadata,
                criteria,
                &self.config.weights,
                self.config.salary_tolerance,
            );
            scored.push(ScoredCandidate {
                similarity: hit.similarity,
                annotations: verdict.annotations(),
                record,
                breakdown,
            });
        }
        drop(resumes);

        let ranked = ranker::rank(scored, self.config.min_composite);
        let analysis = self
            .analyzer
            .analyze_batch(criteria, ranker::top(&ranked, self.config.top_n))
            .await;

        Ok(aggregator::assemble(criteria, ranked, analysis, provenance))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCacheStore;
    use crate::index::MemoryVectorIndex;
    use crate::llm::prompts::{ANALYSIS_SYSTEM, EXTRACTION_SYSTEM, INTERPRET_SYSTEM};
    use crate::llm::LlmError;
    use crate::models::Annotation;
    use async_trait::async_trait;
    use std::time::Duration;

    /// Routes on the system prompt the way the real pipeline does, and on
    /// markers inside the prompt for per-resume extraction output.
    struct RoutedLlm {
        extractions: Vec<(&'static str, String)>,
        interpretation: String,
        fail_analysis_for: Option<&'static str>,
    }

    #[async_trait]
    impl LlmProvider for RoutedLlm {
        async fn complete(&self, prompt: &str, system: &str) -> Result<String, LlmError> {
            if system == EXTRACTION_SYSTEM {
                for (marker, response) in &self.extractions {
                    if prompt.contains(marker) {
                        return Ok(response.clone());
                    }
                }
                return Err(LlmError::EmptyContent);
            }
            if system == INTERPRET_SYSTEM {
                return Ok(self.interpretation.clone());
            }
            if system == ANALYSIS_SYSTEM {
                if let Some(marker) = self.fail_analysis_for {
                    if prompt.contains(marker) {
                        return Err(LlmError::Api {
                            status: 500,
                            message: "analysis backend down".to_string(),
                        });
                    }
                }
                return Ok("Solid match; recommend an interview.".to_string());
            }
            Err(LlmError::EmptyContent)
        }
    }

    /// Counts occurrences of a tiny vocabulary, giving deterministic vectors
    /// where shared terms mean real cosine similarity.
    struct VocabEmbedder {
        fail_on: Option<&'static str>,
    }

    const VOCAB: [&str; 6] = ["rust", "python", "berlin", "senior", "fintech", "backend"];

    #[async_trait]
    impl EmbeddingProvider for VocabEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, ScreenError> {
            if let Some(marker) = self.fail_on {
                if text.contains(marker) {
                    return Err(ScreenError::Embedding("provider refused".to_string()));
                }
            }
            let lower = text.to_lowercase();
            Ok(VOCAB
                .iter()
                .map(|word| lower.matches(word).count() as f32)
                .collect())
        }

        fn dimension(&self) -> usize {
            VOCAB.len()
        }
    }

    fn extraction(name: &str, skills: &str, years: f64, salary: &str, location: &str) -> String {
        format!(
            r#"{{"name": "{name}", "skills": [{skills}], "years_experience": {years},
                "education": "master", "expected_salary": "{salary}",
                "location": "{location}", "remote_ok": false,
                "domains": ["fintech"], "traits": [], "summary": "x"}}"#
        )
    }

    const INTERPRETATION: &str = r#"{
        "required_skills": ["rust"],
        "preferred_skills": [],
        "keywords": ["backend"],
        "min_experience_years": 5,
        "min_education": "bachelor",
        "salary_min": "20K",
        "salary_max": "30K",
        "locations": ["Berlin"],
        "remote_allowed": false,
        "domains": ["fintech"],
        "traits": [],
        "ambiguous_fields": []
    }"#;

    fn routed_llm(fail_analysis_for: Option<&'static str>) -> Arc<RoutedLlm> {
        Arc::new(RoutedLlm {
            extractions: vec![
                (
                    "Alice",
                    extraction("Alice", r#""rust", "sql""#, 6.0, "25K", "Berlin"),
                ),
                (
                    "Bob",
                    extraction("Bob", r#""python""#, 7.0, "26K", "Berlin"),
                ),
                (
                    "Carol",
                    extraction("Carol", r#""rust""#, 2.0, "24K", "Berlin"),
                ),
            ],
            interpretation: INTERPRETATION.to_string(),
            fail_analysis_for,
        })
    }

    fn pipeline_with(
        llm: Arc<RoutedLlm>,
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorStore>,
    ) -> Arc<ScreeningPipeline> {
        let cache = Arc::new(CacheLayer::new(Arc::new(MemoryCacheStore::new())));
        ScreeningPipeline::new(llm, embedder, index, cache, ScreeningConfig::default())
    }

    fn pipeline(llm: Arc<RoutedLlm>) -> Arc<ScreeningPipeline> {
        pipeline_with(
            llm,
            Arc::new(VocabEmbedder { fail_on: None }),
            Arc::new(MemoryVectorIndex::new()),
        )
    }

    const ALICE_RESUME: &str = "Alice, senior rust backend engineer in berlin, fintech";
    const BOB_RESUME: &str = "Bob, senior python backend engineer in berlin";
    const CAROL_RESUME: &str = "Carol, junior rust developer in berlin";

    async fn wait_ready(pipeline: &ScreeningPipeline, query_id: Uuid) -> ScreeningReport {
        for _ in 0..400 {
            match pipeline.fetch_results(query_id).await.unwrap() {
                QueryStatus::Pending => tokio::time::sleep(Duration::from_millis(5)).await,
                QueryStatus::Ready { report } => return *report,
                QueryStatus::Failed { message, .. } => panic!("query failed: {message}"),
            }
        }
        panic!("query never became ready");
    }

    #[tokio::test]
    async fn test_end_to_end_screening() {
        let pipeline = pipeline(routed_llm(None));
        for resume in [ALICE_RESUME, BOB_RESUME, CAROL_RESUME] {
            pipeline.ingest_resume(resume).await;
        }
        assert_eq!(pipeline.resume_count().await, 3);

        let query_id = pipeline
            .submit_query("senior rust backend engineer in berlin, 20K-30K")
            .await
            .unwrap();
        let report = wait_ready(&pipeline, query_id).await;

        // Carol (2 years) fails the >=5 requirement; Alice and Bob pass.
        assert_eq!(report.provenance.retrieved, 3);
        assert_eq!(report.provenance.filtered_out, 1);
        assert_eq!(report.total_candidates, 2);
        assert_eq!(report.candidates[0].name.as_deref(), Some("Alice"));
        assert_eq!(report.candidates[0].rank, 1);
        // Top-ranked candidates carry narratives.
        assert!(report.candidates[0].narrative.is_some());
        // Alice matches the required skill; Bob does not.
        assert!(
            report.candidates[0].breakdown.composite
                > report.candidates[1].breakdown.composite
        );
    }

    #[tokio::test]
    async fn test_analysis_failure_keeps_rank_with_annotation() {
        let pipeline = pipeline(routed_llm(Some("Alice")));
        pipeline.ingest_resume(ALICE_RESUME).await;
        pipeline.ingest_resume(BOB_RESUME).await;

        let query_id = pipeline.submit_query("rust engineer").await.unwrap();
        let report = wait_ready(&pipeline, query_id).await;

        let alice = report
            .candidates
            .iter()
            .find(|c| c.name.as_deref() == Some("Alice"))
            .unwrap();
        assert!(alice.narrative.is_none());
        assert!(alice
            .annotations
            .iter()
            .any(|a| matches!(a, Annotation::AnalysisFailed { .. })));
        assert_eq!(alice.rank, 1);

        // The other candidate's analysis still succeeded.
        let bob = report
            .candidates
            .iter()
            .find(|c| c.name.as_deref() == Some("Bob"))
            .unwrap();
        assert!(bob.narrative.is_some());
    }

    #[tokio::test]
    async fn test_identical_candidates_rank_by_ascending_id() {
        let pipeline = pipeline(routed_llm(None));
        // Same resume text twice: identical metadata, identical scores.
        let a = pipeline.ingest_resume(ALICE_RESUME).await;
        let b = pipeline.ingest_resume(ALICE_RESUME).await;
        let (low, high) = if a < b { (a, b) } else { (b, a) };

        let query_id = pipeline.submit_query("rust engineer").await.unwrap();
        let report = wait_ready(&pipeline, query_id).await;

        assert_eq!(report.total_candidates, 2);
        assert_eq!(report.candidates[0].resume_id, low);
        assert_eq!(report.candidates[1].resume_id, high);
    }

    #[tokio::test]
    async fn test_deleted_resume_never_retrieved() {
        let pipeline = pipeline(routed_llm(None));
        let alice = pipeline.ingest_resume(ALICE_RESUME).await;
        pipeline.ingest_resume(BOB_RESUME).await;

        pipeline.delete_resume(alice).await.unwrap();
        assert!(matches!(
            pipeline.resume(alice).await,
            Err(ScreenError::ResumeNotFound(_))
        ));

        let query_id = pipeline.submit_query("rust engineer").await.unwrap();
        let report = wait_ready(&pipeline, query_id).await;
        assert_eq!(report.provenance.retrieved, 1);
        assert!(report
            .candidates
            .iter()
            .all(|c| c.resume_id != alice));
    }

    #[tokio::test]
    async fn test_embedding_failure_degrades_to_unindexed_record() {
        let pipeline = pipeline_with(
            routed_llm(None),
            Arc::new(VocabEmbedder {
                fail_on: Some("Alice"),
            }),
            Arc::new(MemoryVectorIndex::new()),
        );
        let alice = pipeline.ingest_resume(ALICE_RESUME).await;
        pipeline.ingest_resume(BOB_RESUME).await;

        // The record survives for later re-indexing but is not retrievable.
        let record = pipeline.resume(alice).await.unwrap();
        assert!(!record.indexed);

        let query_id = pipeline.submit_query("rust engineer").await.unwrap();
        let report = wait_ready(&pipeline, query_id).await;
        assert_eq!(report.provenance.retrieved, 1);
    }

    #[tokio::test]
    async fn test_unreachable_index_fails_query_retryable() {
        struct DownIndex;

        #[async_trait]
        impl VectorStore for DownIndex {
            async fn upsert(
                &self,
                _id: Uuid,
                _vector: Vec<f32>,
                _payload: serde_json::Value,
            ) -> Result<(), ScreenError> {
                Err(ScreenError::Retrieval("index down".to_string()))
            }
            async fn delete(&self, _id: Uuid) -> Result<(), ScreenError> {
                Err(ScreenError::Retrieval("index down".to_string()))
            }
            async fn query(
                &self,
                _vector: &[f32],
                _top_k: usize,
            ) -> Result<Vec<crate::index::SearchHit>, ScreenError> {
                Err(ScreenError::Retrieval("index down".to_string()))
            }
        }

        let pipeline = pipeline_with(
            routed_llm(None),
            Arc::new(VocabEmbedder { fail_on: None }),
            Arc::new(DownIndex),
        );
        let query_id = pipeline.submit_query("rust engineer").await.unwrap();

        let status = loop {
            match pipeline.fetch_results(query_id).await.unwrap() {
                QueryStatus::Pending => tokio::time::sleep(Duration::from_millis(5)).await,
                other => break other,
            }
        };
        match status {
            QueryStatus::Failed { retryable, .. } => assert!(retryable),
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unknown_query_id_is_an_error() {
        let pipeline = pipeline(routed_llm(None));
        assert!(matches!(
            pipeline.fetch_results(Uuid::new_v4()).await,
            Err(ScreenError::QueryNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_repeat_submission_reports_interpretation_cache_hit() {
        let pipeline = pipeline(routed_llm(None));
        pipeline.ingest_resume(ALICE_RESUME).await;

        let first = pipeline.submit_query("rust engineer").await.unwrap();
        let first_report = wait_ready(&pipeline, first).await;
        assert!(!first_report.provenance.interpretation_cache_hit);

        let second = pipeline.submit_query("rust engineer").await.unwrap();
        assert_ne!(first, second);
        let second_report = wait_ready(&pipeline, second).await;
        assert!(second_report.provenance.interpretation_cache_hit);
        // Analysis for the same candidates was also served from cache.
        assert!(second_report.provenance.analysis_cache_hits > 0);
    }

    #[tokio::test]
    async fn test_batch_ingestion_indexes_everything() {
        let pipeline = pipeline(routed_llm(None));
        let ids = pipeline
            .ingest_batch(vec![
                ALICE_RESUME.to_string(),
                BOB_RESUME.to_string(),
                CAROL_RESUME.to_string(),
            ])
            .await;
        assert_eq!(ids.len(), 3);
        assert_eq!(pipeline.resume_count().await, 3);
        for id in ids {
            assert!(pipeline.resume(id).await.unwrap().indexed);
        }
    }
}
