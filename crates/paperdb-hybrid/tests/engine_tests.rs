use std::sync::{Arc, Mutex};

use paperdb_core::traits::{Embedder, LexicalIndex, VectorIndex};
use paperdb_core::types::{
    DocumentId, FragmentId, IndexPayload, KeywordHit, Meta, SearchFilters, VectorHit,
};
use paperdb_embed::{similarity, HashEmbedder};
use paperdb_hybrid::HybridSearchEngine;

/// Brute-force cosine scan over everything ever upserted.
#[derive(Default)]
struct MemoryVectorIndex {
    rows: Mutex<Vec<(Vec<f32>, IndexPayload)>>,
}

impl VectorIndex for MemoryVectorIndex {
    fn upsert(
        &self,
        vectors: &[Vec<f32>],
        payloads: &[IndexPayload],
    ) -> anyhow::Result<Vec<String>> {
        let mut rows = self.rows.lock().expect("lock");
        let mut keys = Vec::new();
        for (v, p) in vectors.iter().zip(payloads.iter()) {
            keys.push(p.fragment_id.to_string());
            rows.push((v.clone(), p.clone()));
        }
        Ok(keys)
    }

    fn search(
        &self,
        query_vector: &[f32],
        limit: usize,
        _filters: Option<&SearchFilters>,
    ) -> anyhow::Result<Vec<VectorHit>> {
        let rows = self.rows.lock().expect("lock");
        let mut hits: Vec<VectorHit> = rows
            .iter()
            .map(|(v, p)| {
                let score = similarity(v, query_vector).unwrap_or(0.0);
                VectorHit {
                    fragment_id: p.fragment_id,
                    document_id: p.document_id,
                    text: p.text.clone(),
                    score,
                    metadata: Meta::new(),
                }
            })
            .collect();
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(limit);
        Ok(hits)
    }

    fn delete_by_document(&self, document_id: DocumentId) -> anyhow::Result<()> {
        self.rows.lock().expect("lock").retain(|(_, p)| p.document_id != document_id);
        Ok(())
    }
}

/// Scores by the count of query terms contained in the fragment text.
#[derive(Default)]
struct MemoryLexicalIndex {
    rows: Mutex<Vec<(FragmentId, DocumentId, String)>>,
}

impl LexicalIndex for MemoryLexicalIndex {
    fn index(
        &self,
        fragment_id: FragmentId,
        document_id: DocumentId,
        text: &str,
        _metadata: &Meta,
    ) -> anyhow::Result<String> {
        self.rows.lock().expect("lock").push((fragment_id, document_id, text.to_string()));
        Ok(fragment_id.to_string())
    }

    fn search(
        &self,
        query: &str,
        limit: usize,
        _filters: Option<&SearchFilters>,
    ) -> anyhow::Result<Vec<KeywordHit>> {
        let rows = self.rows.lock().expect("lock");
        let terms: Vec<String> = query.split_whitespace().map(str::to_lowercase).collect();
        let mut hits: Vec<KeywordHit> = rows
            .iter()
            .filter_map(|(fid, did, text)| {
                let lower = text.to_lowercase();
                let matched = terms.iter().filter(|t| lower.contains(*t)).count();
                if matched == 0 {
                    return None;
                }
                Some(KeywordHit {
                    fragment_id: *fid,
                    document_id: *did,
                    text: text.clone(),
                    score: matched as f32,
                    highlighted: Some(format!("<em>{query}</em>")),
                    metadata: Meta::new(),
                })
            })
            .collect();
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(limit);
        Ok(hits)
    }

    fn delete_by_document(&self, document_id: DocumentId) -> anyhow::Result<()> {
        self.rows.lock().expect("lock").retain(|(_, did, _)| *did != document_id);
        Ok(())
    }
}

fn seeded_engine() -> (HybridSearchEngine, Arc<MemoryVectorIndex>, Arc<MemoryLexicalIndex>) {
    let embedder: Arc<dyn Embedder> = Arc::new(HashEmbedder::new(256));
    let vector = Arc::new(MemoryVectorIndex::default());
    let lexical = Arc::new(MemoryLexicalIndex::default());

    let corpus = [
        (1i64, "the quick brown fox jumps over the lazy dog"),
        (2i64, "annual revenue and operating income grew this quarter"),
        (3i64, "embedding models turn text into dense vectors"),
    ];
    for (fid, text) in corpus {
        let payload = IndexPayload {
            fragment_id: fid,
            document_id: 1,
            text: text.to_string(),
            page_number: None,
        };
        let v = embedder.encode_one(text).expect("embed");
        vector.upsert(&[v], &[payload]).expect("upsert");
        lexical.index(fid, 1, text, &Meta::new()).expect("index");
    }

    let engine =
        HybridSearchEngine::new(embedder, vector.clone(), lexical.clone());
    (engine, vector, lexical)
}

#[test]
fn search_finds_lexically_matching_fragment() {
    let (engine, _, _) = seeded_engine();

    let results = engine.search("operating income quarter", 10, 0, None, None).expect("search");

    assert!(!results.is_empty());
    assert_eq!(results[0].fragment_id, 2);
    assert!(results[0].highlighted_excerpt.is_some());
}

#[test]
fn pagination_applies_after_fusion() {
    let (engine, _, _) = seeded_engine();

    let all = engine.search("the quick brown fox text vectors", 10, 0, None, None).expect("all");
    let page = engine.search("the quick brown fox text vectors", 1, 1, None, None).expect("page");

    assert!(all.len() >= 2);
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].fragment_id, all[1].fragment_id);
}

#[test]
fn per_call_weight_override_changes_ranking_inputs() {
    let (engine, _, _) = seeded_engine();

    // weight 0.0 means pure keyword ranking; a query with terms only in
    // fragment 2 must rank it first.
    let results = engine.search("revenue grew", 10, 0, None, Some(0.0)).expect("search");
    assert_eq!(results[0].fragment_id, 2);
    // With the vector side weighted out, combined equals keyword score.
    assert!((results[0].combined_score - results[0].keyword_score).abs() < 1e-6);
}
