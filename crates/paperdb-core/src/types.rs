//! Domain types shared by the ingestion pipeline and the search engines.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type DocumentId = i64;
pub type FragmentId = i64;
pub type Meta = HashMap<String, String>;

/// Processing lifecycle of a document.
///
/// The only forward transitions are `Pending -> Processing`,
/// `Processing -> Completed` and `Processing -> Failed`. Terminal states
/// never revert to `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingState {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ProcessingState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingState::Pending => "pending",
            ProcessingState::Processing => "processing",
            ProcessingState::Completed => "completed",
            ProcessingState::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ProcessingState::Pending),
            "processing" => Some(ProcessingState::Processing),
            "completed" => Some(ProcessingState::Completed),
            "failed" => Some(ProcessingState::Failed),
            _ => None,
        }
    }
}

/// One page of extracted text, 1-based page numbering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageText {
    pub page_number: u32,
    pub text: String,
}

/// Document-level metadata reported by the text extractor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentMeta {
    pub page_count: u32,
    pub title: Option<String>,
}

/// A bounded-size slice of document text produced by the fragmenter.
///
/// Fragments of one document are ordered by `index`, which is gap-free
/// from zero. `token_estimate` comes from the pluggable estimator and is
/// approximate by design. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fragment {
    pub index: usize,
    pub text: String,
    pub token_estimate: usize,
    pub page_number: Option<u32>,
    pub char_span: Option<(usize, usize)>,
}

/// Persisted document row.
#[derive(Debug, Clone)]
pub struct DocumentRecord {
    pub id: DocumentId,
    pub filename: String,
    pub title: Option<String>,
    pub storage_path: String,
    pub page_count: Option<u32>,
    pub status: ProcessingState,
    pub error_message: Option<String>,
    pub chunk_count: usize,
    pub processing_time_secs: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

/// Persisted fragment row correlating a fragment with its index keys.
///
/// A record is pending until both `vector_key` and `lexical_key` are set,
/// then indexed. Deleting the parent document cascades to both stores.
#[derive(Debug, Clone)]
pub struct FragmentRecord {
    pub id: FragmentId,
    pub document_id: DocumentId,
    pub fragment_index: usize,
    pub text: String,
    pub token_estimate: usize,
    pub page_number: Option<u32>,
    pub vector_key: Option<String>,
    pub lexical_key: Option<String>,
}

/// Payload handed to both index collaborators alongside the indexable data.
///
/// Embeds the durable fragment identity so later search results and
/// delete-by-document calls can be correlated back to catalog rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexPayload {
    pub fragment_id: FragmentId,
    pub document_id: DocumentId,
    pub text: String,
    pub page_number: Option<u32>,
}

/// A raw hit from the vector index. `score` is engine-specific,
/// higher is better.
#[derive(Debug, Clone)]
pub struct VectorHit {
    pub fragment_id: FragmentId,
    pub document_id: DocumentId,
    pub text: String,
    pub score: f32,
    pub metadata: Meta,
}

/// A raw hit from the lexical index, optionally carrying a highlighted
/// excerpt around the matched terms.
#[derive(Debug, Clone)]
pub struct KeywordHit {
    pub fragment_id: FragmentId,
    pub document_id: DocumentId,
    pub text: String,
    pub score: f32,
    pub highlighted: Option<String>,
    pub metadata: Meta,
}

/// Final fused result returned to callers. Ephemeral, never persisted.
///
/// `vector_score` and `keyword_score` are min-max normalized into [0, 1];
/// `combined_score` is their weighted sum.
#[derive(Debug, Clone, Serialize)]
pub struct RankedResult {
    pub fragment_id: FragmentId,
    pub document_id: DocumentId,
    pub text: String,
    pub vector_score: f32,
    pub keyword_score: f32,
    pub combined_score: f32,
    pub highlighted_excerpt: Option<String>,
    pub metadata: Meta,
}

/// Narrow filter surface accepted by both index collaborators.
#[derive(Debug, Clone, Default)]
pub struct SearchFilters {
    pub document_id: Option<DocumentId>,
    pub page_number: Option<u32>,
}

impl SearchFilters {
    pub fn is_empty(&self) -> bool {
        self.document_id.is_none() && self.page_number.is_none()
    }
}
