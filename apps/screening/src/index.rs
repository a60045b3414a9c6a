//! Vector index seam and the in-memory implementation.
//!
//! Consistency contract for implementations: once `delete(id)` returns, no
//! subsequent `query` may return that id; once `upsert(id, ...)` returns,
//! the id is visible to every subsequent `query`. Backends that are
//! eventually consistent must hide uncommitted writes rather than expose
//! them early. `MemoryVectorIndex` is strongly consistent — its RwLock makes
//! the consistency window zero.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::errors::ScreenError;

/// One nearest-neighbor hit, with the payload stored at upsert time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: Uuid,
    pub similarity: f32,
    pub payload: serde_json::Value,
}

/// Narrow interface over the vector backend.
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn upsert(
        &self,
        id: Uuid,
        vector: Vec<f32>,
        payload: serde_json::Value,
    ) -> Result<(), ScreenError>;

    async fn delete(&self, id: Uuid) -> Result<(), ScreenError>;

    /// Top-k by non-increasing cosine similarity, deduplicated by id.
    /// Ties are broken by ascending id so results are reproducible.
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<SearchHit>, ScreenError>;
}

/// In-process index. Keyed by id, so duplicates are structurally impossible.
#[derive(Default)]
pub struct MemoryVectorIndex {
    entries: RwLock<HashMap<Uuid, (Vec<f32>, serde_json::Value)>>,
}

impl MemoryVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl VectorStore for MemoryVectorIndex {
    async fn upsert(
        &self,
        id: Uuid,
        vector: Vec<f32>,
        payload: serde_json::Value,
    ) -> Result<(), ScreenError> {
        self.entries.write().await.insert(id, (vector, payload));
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), ScreenError> {
        self.entries.write().await.remove(&id);
        Ok(())
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<SearchHit>, ScreenError> {
        let entries = self.entries.read().await;
        let mut hits: Vec<SearchHit> = entries
            .iter()
            .map(|(id, (stored, payload))| SearchHit {
                id: *id,
                similarity: cosine_similarity(vector, stored),
                payload: payload.clone(),
            })
            .collect();
        hits.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        hits.truncate(top_k);
        Ok(hits)
    }
}

/// Cosine similarity; 0.0 for mismatched dimensions or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}
