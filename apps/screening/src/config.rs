use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Provider credentials and endpoints, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub embedding_model: String,
    pub embedding_dimension: usize,
    /// Optional; without it the in-memory cache store is used.
    pub redis_url: Option<String>,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            openai_api_key: require_env("OPENAI_API_KEY")?,
            openai_base_url: std::env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            embedding_model: std::env::var("EMBEDDING_MODEL")
                .unwrap_or_else(|_| "text-embedding-3-small".to_string()),
            embedding_dimension: std::env::var("EMBEDDING_DIMENSION")
                .unwrap_or_else(|_| "1536".to_string())
                .parse::<usize>()
                .context("EMBEDDING_DIMENSION must be a positive integer")?,
            redis_url: std::env::var("REDIS_URL").ok(),
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Per-dimension composite weights. Must be non-negative; `normalized`
/// rescales them to sum to 1 so any assignment yields a composite in
/// [0, 100].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub skills: f64,
    pub experience: f64,
    pub education: f64,
    pub salary: f64,
    pub location: f64,
    pub domain: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        // Equal weights summing to 1.
        Self {
            skills: 1.0 / 6.0,
            experience: 1.0 / 6.0,
            education: 1.0 / 6.0,
            salary: 1.0 / 6.0,
            location: 1.0 / 6.0,
            domain: 1.0 / 6.0,
        }
    }
}

impl ScoreWeights {
    pub fn sum(&self) -> f64 {
        self.skills + self.experience + self.education + self.salary + self.location + self.domain
    }

    pub fn normalized(&self) -> Self {
        let total = self.sum();
        if total <= 0.0 {
            return Self::default();
        }
        Self {
            skills: self.skills / total,
            experience: self.experience / total,
            education: self.education / total,
            salary: self.salary / total,
            location: self.location / total,
            domain: self.domain / total,
        }
    }
}

/// Tunables of the screening pipeline itself.
#[derive(Debug, Clone)]
pub struct ScreeningConfig {
    pub weights: ScoreWeights,
    /// Salary overlap tolerance for the hard filter and salary scoring.
    pub salary_tolerance: f64,
    /// Candidates fetched from the vector index per query.
    pub retrieval_depth: usize,
    /// Ranked candidates that receive narrative analysis.
    pub top_n: usize,
    /// Optional composite-score floor applied after ranking.
    pub min_composite: Option<f64>,
    /// Worker-pool width for batch ingestion.
    pub ingest_concurrency: usize,
    /// Concurrent analysis calls per query.
    pub analysis_concurrency: usize,
    /// Per-candidate deadline for one analysis call.
    pub analysis_timeout: Duration,
    /// TTL for cached extraction/interpretation/analysis values.
    pub cache_ttl: Option<Duration>,
}

impl Default for ScreeningConfig {
    fn default() -> Self {
        Self {
            weights: ScoreWeights::default(),
            salary_tolerance: 0.10,
            retrieval_depth: 20,
            top_n: 5,
            min_composite: None,
            ingest_concurrency: 4,
            analysis_concurrency: 3,
            analysis_timeout: Duration::from_secs(60),
            cache_ttl: Some(Duration::from_secs(24 * 3600)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weights_sum_to_one() {
        assert!((ScoreWeights::default().sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_normalized_rescales_arbitrary_weights() {
        let w = ScoreWeights {
            skills: 3.0,
            experience: 2.0,
            education: 1.0,
            salary: 1.0,
            location: 2.0,
            domain: 1.0,
        }
        .normalized();
        assert!((w.sum() - 1.0).abs() < 1e-9);
        assert!((w.skills - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_weights_fall_back_to_default() {
        let w = ScoreWeights {
            skills: 0.0,
            experience: 0.0,
            education: 0.0,
            salary: 0.0,
            location: 0.0,
            domain: 0.0,
        }
        .normalized();
        assert!((w.sum() - 1.0).abs() < 1e-9);
    }
}
