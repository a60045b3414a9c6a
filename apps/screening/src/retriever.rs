//! Semantic retrieval: renders interpreted criteria back into a retrieval
//! text, embeds it, and pulls the nearest candidates from the vector index.

use std::sync::Arc;

use tracing::info;

use crate::embedding::EmbeddingProvider;
use crate::errors::ScreenError;
use crate::index::{SearchHit, VectorStore};
use crate::models::QueryCriteria;

/// Renders criteria into the text that gets embedded for retrieval. All
/// interpreted signals participate — including ambiguous required fields,
/// which are advisory here rather than gating.
pub fn criteria_to_query_text(criteria: &QueryCriteria) -> String {
    let mut parts: Vec<String> = Vec::new();

    if !criteria.soft.keywords.is_empty() {
        parts.push(format!("keywords: {}", criteria.soft.keywords.join(", ")));
    }
    if !criteria.soft.required_skills.is_empty() {
        parts.push(format!(
            "required skills: {}",
            criteria.soft.required_skills.join(", ")
        ));
    }
    if !criteria.soft.preferred_skills.is_empty() {
        parts.push(format!(
            "preferred skills: {}",
            criteria.soft.preferred_skills.join(", ")
        ));
    }
    if let Some(years) = criteria.required.min_experience_years {
        parts.push(format!("minimum experience: {years} years"));
    }
    if let Some(level) = criteria.required.min_education {
        parts.push(format!("minimum education: {level:?}"));
    }
    if !criteria.required.locations.is_empty() {
        parts.push(format!(
            "locations: {}",
            criteria.required.locations.join(", ")
        ));
    }
    if criteria.required.remote_allowed {
        parts.push("remote work acceptable".to_string());
    }
    if !criteria.soft.domains.is_empty() {
        parts.push(format!("domains: {}", criteria.soft.domains.join(", ")));
    }
    if !criteria.soft.traits.is_empty() {
        parts.push(format!("traits: {}", criteria.soft.traits.join(", ")));
    }

    if parts.is_empty() {
        // Nothing structured was recovered; fall back to the raw requirement.
        return criteria.raw_text.clone();
    }
    parts.join("; ")
}

pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorStore>,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, index: Arc<dyn VectorStore>) -> Self {
        Self { embedder, index }
    }

    /// Embeds the rendered criteria and returns the `depth` nearest
    /// candidates, ordered by non-increasing similarity.
    pub async fn retrieve(
        &self,
        criteria: &QueryCriteria,
        depth: usize,
    ) -> Result<Vec<SearchHit>, ScreenError> {
        let query_text = criteria_to_query_text(criteria);
        let vector = self.embedder.embed(&query_text).await?;
        let hits = self
            .index
            .query(&vector, depth)
            .await
            .map_err(|e| ScreenError::Retrieval(e.to_string()))?;
        info!(query_id = %criteria.id, hits = hits.len(), "retrieved candidates");
        Ok(hits)
    }
}
