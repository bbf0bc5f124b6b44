//! Score normalization and weighted rank fusion.
//!
//! Vector similarity and lexical relevance live on different scales
//! (cosine is bounded, BM25 is not), so each result set is min-max
//! normalized on its own before the weighted sum. Without that step one
//! source's scale would dominate the combined score regardless of the
//! configured weight.

use paperdb_core::types::{FragmentId, KeywordHit, RankedResult, VectorHit};
use std::collections::HashMap;

/// Two scores closer than this are treated as one degenerate set.
const DEGENERATE_EPSILON: f32 = 1e-10;

/// Min-max scale `scores` into [0, 1] in place.
///
/// A degenerate set (all scores equal, or a singleton) has no spread to
/// scale by; every score becomes 1.0. Empty input stays empty.
pub fn min_max_normalize(scores: &mut [f32]) {
    let Some(&first) = scores.first() else {
        return;
    };
    let (lo, hi) = scores.iter().fold((first, first), |(lo, hi), &s| {
        (lo.min(s), hi.max(s))
    });

    if hi - lo < DEGENERATE_EPSILON {
        for s in scores.iter_mut() {
            *s = 1.0;
        }
        return;
    }

    for s in scores.iter_mut() {
        *s = (*s - lo) / (hi - lo);
    }
}

/// Fuse vector and keyword hits into one list, descending by combined
/// score.
///
/// Steps: normalize each set independently, merge by fragment identity
/// (missing side scores 0.0, keyword highlight wins when present),
/// combine as `vector * weight + keyword * (1 - weight)`, then sort.
/// Ties preserve vector-set order first, keyword-set order second, so
/// identical inputs always produce identical output.
pub fn fuse(
    vector_hits: Vec<VectorHit>,
    keyword_hits: Vec<KeywordHit>,
    vector_weight: f32,
) -> Vec<RankedResult> {
    let keyword_weight = 1.0 - vector_weight;

    let mut vector_scores: Vec<f32> = vector_hits.iter().map(|h| h.score).collect();
    let mut keyword_scores: Vec<f32> = keyword_hits.iter().map(|h| h.score).collect();
    min_max_normalize(&mut vector_scores);
    min_max_normalize(&mut keyword_scores);

    // arrival is the stable tie-break: vector hits first in their
    // original order, then keyword-only hits in theirs.
    struct Entry {
        result: RankedResult,
        arrival: usize,
    }

    let mut merged: HashMap<FragmentId, Entry> = HashMap::new();
    let mut order: Vec<FragmentId> = Vec::new();

    for (hit, score) in vector_hits.into_iter().zip(vector_scores) {
        let arrival = order.len();
        order.push(hit.fragment_id);
        merged.insert(
            hit.fragment_id,
            Entry {
                result: RankedResult {
                    fragment_id: hit.fragment_id,
                    document_id: hit.document_id,
                    text: hit.text,
                    vector_score: score,
                    keyword_score: 0.0,
                    combined_score: 0.0,
                    highlighted_excerpt: None,
                    metadata: hit.metadata,
                },
                arrival,
            },
        );
    }

    for (hit, score) in keyword_hits.into_iter().zip(keyword_scores) {
        match merged.get_mut(&hit.fragment_id) {
            Some(entry) => {
                entry.result.keyword_score = score;
                if hit.highlighted.is_some() {
                    entry.result.highlighted_excerpt = hit.highlighted;
                }
            }
            None => {
                let arrival = order.len();
                order.push(hit.fragment_id);
                merged.insert(
                    hit.fragment_id,
                    Entry {
                        result: RankedResult {
                            fragment_id: hit.fragment_id,
                            document_id: hit.document_id,
                            text: hit.text,
                            vector_score: 0.0,
                            keyword_score: score,
                            combined_score: 0.0,
                            highlighted_excerpt: hit.highlighted,
                            metadata: hit.metadata,
                        },
                        arrival,
                    },
                );
            }
        }
    }

    let mut entries: Vec<Entry> = merged.into_values().collect();
    for entry in &mut entries {
        entry.result.combined_score =
            entry.result.vector_score * vector_weight + entry.result.keyword_score * keyword_weight;
    }

    entries.sort_by(|a, b| {
        b.result
            .combined_score
            .partial_cmp(&a.result.combined_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.arrival.cmp(&b.arrival))
    });

    entries.into_iter().map(|e| e.result).collect()
}
