//! Candidate screening pipeline: LLM-backed metadata extraction, semantic
//! retrieval over a vector index, hard filtering, multi-dimensional scoring,
//! deterministic ranking, and cached narrative analysis, aggregated into one
//! ordered screening report.

pub mod aggregator;
pub mod analyzer;
pub mod cache;
pub mod config;
pub mod embedding;
pub mod errors;
pub mod extractor;
pub mod filter;
pub mod index;
pub mod llm;
pub mod models;
pub mod pipeline;
pub mod query;
pub mod ranker;
pub mod retriever;
pub mod scorer;

pub use config::{Config, ScoreWeights, ScreeningConfig};
pub use errors::ScreenError;
pub use pipeline::ScreeningPipeline;
