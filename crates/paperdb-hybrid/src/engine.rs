//! Query-side facade: embed the query, fan out to both indexes, fuse.

use std::sync::Arc;

use paperdb_core::traits::{Embedder, LexicalIndex, VectorIndex};
use paperdb_core::types::{RankedResult, SearchFilters};

use crate::fusion::fuse;

pub const DEFAULT_VECTOR_WEIGHT: f32 = 0.7;

pub struct HybridSearchEngine {
    embedder: Arc<dyn Embedder>,
    vector: Arc<dyn VectorIndex>,
    lexical: Arc<dyn LexicalIndex>,
    vector_weight: f32,
}

impl HybridSearchEngine {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        vector: Arc<dyn VectorIndex>,
        lexical: Arc<dyn LexicalIndex>,
    ) -> Self {
        Self { embedder, vector, lexical, vector_weight: DEFAULT_VECTOR_WEIGHT }
    }

    pub fn with_vector_weight(mut self, vector_weight: f32) -> Self {
        self.vector_weight = vector_weight.clamp(0.0, 1.0);
        self
    }

    /// Run a hybrid query and return fused results.
    ///
    /// Both sources are over-fetched to `(limit + offset) * 2` before
    /// fusion; paginating the sources directly would bias the ranking
    /// because fusion can promote a fragment either source ranked low.
    /// `vector_weight` overrides the engine default for this call.
    pub fn search(
        &self,
        query: &str,
        limit: usize,
        offset: usize,
        filters: Option<&SearchFilters>,
        vector_weight: Option<f32>,
    ) -> anyhow::Result<Vec<RankedResult>> {
        let weight = vector_weight.unwrap_or(self.vector_weight).clamp(0.0, 1.0);
        let fetch = (limit + offset).max(1) * 2;
        tracing::info!(query, limit, offset, weight, "hybrid search");

        let query_vector = self.embedder.encode_one(query)?;
        let vector_hits = self.vector.search(&query_vector, fetch, filters)?;
        let keyword_hits = self.lexical.search(query, fetch, filters)?;
        tracing::debug!(
            vector_hits = vector_hits.len(),
            keyword_hits = keyword_hits.len(),
            "collected source hits"
        );

        let fused = fuse(vector_hits, keyword_hits, weight);
        Ok(fused.into_iter().skip(offset).take(limit).collect())
    }
}
