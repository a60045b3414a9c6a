//! Metadata extraction: raw resume text → `CandidateMetadata` through one
//! cached LLM call, with bounded reprompting on malformed output and a
//! best-effort degradation path instead of failure.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::cache::{fingerprint, CacheLayer, CacheOutcome};
use crate::config::ScreeningConfig;
use crate::llm::prompts::{
    EXTRACTION_PROMPT_TEMPLATE, EXTRACTION_STRICT_SUFFIX, EXTRACTION_SYSTEM, EXTRACTION_VERSION,
};
use crate::llm::{complete_json, LlmError, LlmProvider};
use crate::models::{CandidateMetadata, EducationLevel, SalaryRange};

const MAX_ATTEMPTS: u32 = 3;

/// What the model is asked to return. Kept separate from
/// `CandidateMetadata` so lenient parsing (salary strings, free-form
/// education) happens in one place.
#[derive(Debug, Default, Serialize, Deserialize)]
struct RawExtraction {
    name: Option<String>,
    #[serde(default)]
    skills: Vec<String>,
    years_experience: Option<f64>,
    education: Option<String>,
    expected_salary: Option<String>,
    location: Option<String>,
    #[serde(default)]
    remote_ok: bool,
    #[serde(default)]
    domains: Vec<String>,
    #[serde(default)]
    traits: Vec<String>,
    summary: Option<String>,
}

impl RawExtraction {
    fn into_metadata(self) -> CandidateMetadata {
        let education = self.education.as_deref().and_then(EducationLevel::parse);
        let expected_salary = self.expected_salary.as_deref().and_then(SalaryRange::parse);
        let mut metadata = CandidateMetadata {
            name: self.name,
            skills: lowercase_all(self.skills),
            years_experience: self.years_experience,
            education,
            expected_salary,
            location: self.location,
            remote_ok: self.remote_ok,
            domains: lowercase_all(self.domains),
            traits: lowercase_all(self.traits),
            summary: self.summary,
            incomplete: false,
        };
        // Incomplete means a hard-filterable field could not be recovered;
        // the filter will exclude such candidates with an annotation when
        // the affected condition is required.
        metadata.incomplete = metadata.years_experience.is_none()
            || metadata.education.is_none()
            || metadata.expected_salary.is_none()
            || metadata.location.is_none();
        metadata
    }
}

fn lowercase_all(items: Vec<String>) -> Vec<String> {
    items.into_iter().map(|s| s.trim().to_lowercase()).collect()
}

/// Cached, degradation-tolerant extractor.
pub struct MetadataExtractor {
    llm: Arc<dyn LlmProvider>,
    cache: Arc<CacheLayer>,
    config: ScreeningConfig,
}

impl MetadataExtractor {
    pub fn new(llm: Arc<dyn LlmProvider>, cache: Arc<CacheLayer>, config: ScreeningConfig) -> Self {
        Self { llm, cache, config }
    }

    /// Extracts metadata for one resume. Never fails: after `MAX_ATTEMPTS`
    /// unparsable responses the result is empty metadata with
    /// `incomplete = true`, and that degraded value is NOT cached so a
    /// later retry gets a fresh chance.
    pub async fn extract(&self, resume_text: &str) -> (CandidateMetadata, CacheOutcome) {
        let key = fingerprint("extract_metadata", resume_text, EXTRACTION_VERSION);
        let result = self
            .cache
            .get_or_compute::<CandidateMetadata, LlmError, _, _>(
                &key,
                self.config.cache_ttl,
                || self.extract_uncached(resume_text),
            )
            .await;

        match result {
            Ok((metadata, outcome)) => (metadata, outcome),
            Err(e) => {
                warn!("extraction degraded to partial metadata: {e}");
                (
                    CandidateMetadata {
                        incomplete: true,
                        ..CandidateMetadata::default()
                    },
                    CacheOutcome::Miss,
                )
            }
        }
    }

    async fn extract_uncached(&self, resume_text: &str) -> Result<CandidateMetadata, LlmError> {
        let base_prompt = EXTRACTION_PROMPT_TEMPLATE.replace("{resume_text}", resume_text);
        let mut last_error: Option<LlmError> = None;

        for attempt in 1..=MAX_ATTEMPTS {
            let prompt = if attempt == 1 {
                base_prompt.clone()
            } else {
                format!("{base_prompt}{EXTRACTION_STRICT_SUFFIX}")
            };

            match complete_json::<RawExtraction>(self.llm.as_ref(), &prompt, EXTRACTION_SYSTEM)
                .await
            {
                Ok(raw) => {
                    let metadata = raw.into_metadata();
                    info!(
                        attempt,
                        incomplete = metadata.incomplete,
                        "extracted metadata for candidate {:?}",
                        metadata.name
                    );
                    return Ok(metadata);
                }
                Err(e @ LlmError::Parse(_)) | Err(e @ LlmError::EmptyContent) => {
                    warn!("extraction attempt {attempt} returned malformed output: {e}");
                    last_error = Some(e);
                }
                // Transport failures already went through the client's own
                // retry loop; reprompting will not help.
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or(LlmError::EmptyContent))
    }
}
