//! Query interpretation: free-text hiring requirement → `QueryCriteria`,
//! split into hard requirements and soft preferences. Interpretations are
//! cached; a required field the model flags ambiguous is demoted to
//! advisory and never silently enforced.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::cache::{fingerprint, CacheLayer, CacheOutcome};
use crate::config::ScreeningConfig;
use crate::errors::ScreenError;
use crate::llm::prompts::{INTERPRET_PROMPT_TEMPLATE, INTERPRET_SYSTEM, INTERPRET_VERSION};
use crate::llm::{complete_json, LlmError, LlmProvider};
use crate::models::{
    EducationLevel, QueryCriteria, RequiredConditions, RequiredField, SalaryRange, SoftPreferences,
};

/// Model-facing schema; lenient fields are resolved into `QueryCriteria`
/// here. Cached in this raw form so criteria ids stay fresh per query.
#[derive(Debug, Default, Serialize, Deserialize)]
struct RawInterpretation {
    #[serde(default)]
    required_skills: Vec<String>,
    #[serde(default)]
    preferred_skills: Vec<String>,
    #[serde(default)]
    keywords: Vec<String>,
    min_experience_years: Option<f64>,
    min_education: Option<String>,
    salary_min: Option<String>,
    salary_max: Option<String>,
    #[serde(default)]
    locations: Vec<String>,
    #[serde(default)]
    remote_allowed: bool,
    #[serde(default)]
    domains: Vec<String>,
    #[serde(default)]
    traits: Vec<String>,
    #[serde(default)]
    ambiguous_fields: Vec<String>,
}

impl RawInterpretation {
    fn into_criteria(self, query_id: Uuid, raw_text: &str) -> QueryCriteria {
        let mut ambiguous: Vec<RequiredField> = self
            .ambiguous_fields
            .iter()
            .filter_map(|name| match name.trim().to_lowercase().as_str() {
                "experience" => Some(RequiredField::Experience),
                "salary" => Some(RequiredField::Salary),
                "education" => Some(RequiredField::Education),
                "location" => Some(RequiredField::Location),
                _ => None,
            })
            .collect();
        ambiguous.dedup();

        let min_education = match self.min_education.as_deref() {
            None => None,
            Some(text) => {
                let parsed = EducationLevel::parse(text);
                // An education string we cannot place in the ordinal scale
                // must not be silently enforced or dropped.
                if parsed.is_none() && !ambiguous.contains(&RequiredField::Education) {
                    ambiguous.push(RequiredField::Education);
                }
                parsed
            }
        };

        let salary_range = match (
            self.salary_min.as_deref().and_then(SalaryRange::parse),
            self.salary_max.as_deref().and_then(SalaryRange::parse),
        ) {
            (Some(lo), Some(hi)) => Some(SalaryRange::new(lo.min, hi.max)),
            (Some(only), None) | (None, Some(only)) => Some(only),
            (None, None) => None,
        };

        QueryCriteria {
            id: query_id,
            raw_text: raw_text.to_string(),
            required: RequiredConditions {
                min_experience_years: self.min_experience_years,
                salary_range,
                min_education,
                locations: self.locations,
                remote_allowed: self.remote_allowed,
            },
            soft: SoftPreferences {
                required_skills: lowercase(self.required_skills),
                preferred_skills: lowercase(self.preferred_skills),
                domains: lowercase(self.domains),
                traits: lowercase(self.traits),
                keywords: lowercase(self.keywords),
            },
            ambiguous,
            created_at: Utc::now(),
        }
    }
}

fn lowercase(items: Vec<String>) -> Vec<String> {
    items.into_iter().map(|s| s.trim().to_lowercase()).collect()
}

pub struct QueryInterpreter {
    llm: Arc<dyn LlmProvider>,
    cache: Arc<CacheLayer>,
    config: ScreeningConfig,
}

impl QueryInterpreter {
    pub fn new(llm: Arc<dyn LlmProvider>, cache: Arc<CacheLayer>, config: ScreeningConfig) -> Self {
        Self { llm, cache, config }
    }

    /// Interprets a hiring requirement. Unlike extraction there is no
    /// degraded form: criteria the pipeline cannot trust would poison every
    /// downstream stage, so failure is surfaced to the submitter.
    pub async fn interpret(
        &self,
        query_id: Uuid,
        query_text: &str,
    ) -> Result<(QueryCriteria, CacheOutcome), ScreenError> {
        let key = fingerprint("interpret_query", query_text, INTERPRET_VERSION);
        let prompt = INTERPRET_PROMPT_TEMPLATE.replace("{query_text}", query_text);

        let (raw, outcome) = self
            .cache
            .get_or_compute::<RawInterpretation, LlmError, _, _>(
                &key,
                self.config.cache_ttl,
                || complete_json::<RawInterpretation>(self.llm.as_ref(), &prompt, INTERPRET_SYSTEM),
            )
            .await
            .map_err(|e| ScreenError::Interpretation(e.to_string()))?;

        let criteria = raw.into_criteria(query_id, query_text);
        info!(
            %query_id,
            ambiguous = criteria.ambiguous.len(),
            "interpreted query criteria"
        );
        Ok((criteria, outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCacheStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedLlm {
        response: String,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LlmProvider for FixedLlm {
        async fn complete(&self, _prompt: &str, _system: &str) -> Result<String, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.response.clone())
        }
    }

    fn interpreter(response: &str) -> (QueryInterpreter, Arc<FixedLlm>) {
        let llm = Arc::new(FixedLlm {
            response: response.to_string(),
            calls: AtomicUsize::new(0),
        });
        let cache = Arc::new(CacheLayer::new(Arc::new(MemoryCacheStore::new())));
        (
            QueryInterpreter::new(llm.clone(), cache, ScreeningConfig::default()),
            llm,
        )
    }

    const FULL_RESPONSE: &str = r#"{
        "required_skills": ["Rust", "SQL"],
        "preferred_skills": ["Docker"],
        "keywords": ["backend"],
        "min_experience_years": 5,
        "min_education": "bachelor",
        "salary_min": "20K",
        "salary_max": "30K",
        "locations": ["Berlin"],
        "remote_allowed": false,
        "domains": ["fintech"],
        "traits": ["leadership"],
        "ambiguous_fields": []
    }"#;

    #[tokio::test]
    async fn test_interpretation_splits_required_and_soft() {
        let (interpreter, _) = interpreter(FULL_RESPONSE);
        let (criteria, _) = interpreter
            .interpret(Uuid::new_v4(), "senior rust backend engineer")
            .await
            .unwrap();

        assert_eq!(criteria.required.min_experience_years, Some(5.0));
        assert_eq!(
            criteria.required.min_education,
            Some(EducationLevel::Bachelor)
        );
        assert_eq!(
            criteria.required.salary_range,
            Some(SalaryRange::new(20_000.0, 30_000.0))
        );
        assert_eq!(criteria.required.locations, vec!["Berlin"]);
        assert_eq!(criteria.soft.required_skills, vec!["rust", "sql"]);
        assert_eq!(criteria.soft.preferred_skills, vec!["docker"]);
        assert!(criteria.ambiguous.is_empty());
    }

    #[tokio::test]
    async fn test_ambiguous_fields_are_parsed() {
        let response = r#"{
            "min_experience_years": 3,
            "ambiguous_fields": ["experience", "salary", "not-a-field"]
        }"#;
        let (interpreter, _) = interpreter(response);
        let (criteria, _) = interpreter
            .interpret(Uuid::new_v4(), "maybe around 3 years?")
            .await
            .unwrap();

        assert!(criteria.ambiguous.contains(&RequiredField::Experience));
        assert!(criteria.ambiguous.contains(&RequiredField::Salary));
        assert_eq!(criteria.ambiguous.len(), 2);
        assert!(!criteria.is_enforceable(RequiredField::Experience));
    }

    #[tokio::test]
    async fn test_unparseable_education_becomes_ambiguous() {
        let response = r#"{"min_education": "wizard academy"}"#;
        let (interpreter, _) = interpreter(response);
        let (criteria, _) = interpreter
            .interpret(Uuid::new_v4(), "needs wizard academy degree")
            .await
            .unwrap();

        assert_eq!(criteria.required.min_education, None);
        assert!(criteria.ambiguous.contains(&RequiredField::Education));
    }

    #[tokio::test]
    async fn test_repeat_interpretation_hits_cache() {
        let (interpreter, llm) = interpreter(FULL_RESPONSE);
        let text = "senior rust backend engineer";
        let (_, first) = interpreter.interpret(Uuid::new_v4(), text).await.unwrap();
        let (criteria, second) = interpreter.interpret(Uuid::new_v4(), text).await.unwrap();

        assert_eq!(first, CacheOutcome::Miss);
        assert_eq!(second, CacheOutcome::Hit);
        assert_eq!(llm.calls.load(Ordering::SeqCst), 1);
        // Fresh query id even on a hit.
        assert_eq!(criteria.raw_text, text);
    }

    #[tokio::test]
    async fn test_unparseable_response_fails_interpretation() {
        let (interpreter, _) = interpreter("I cannot answer that.");
        let result = interpreter.interpret(Uuid::new_v4(), "anything").await;
        assert!(matches!(result, Err(ScreenError::Interpretation(_))));
    }
}
