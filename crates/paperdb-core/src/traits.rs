//! Collaborator interfaces consumed by the pipeline.
//!
//! The core never owns the index engines, the blob store or the catalog;
//! it talks to them through these traits. Concrete adapters live in the
//! sibling crates and are wired together by the composition root.

use crate::types::{
    DocumentId, DocumentMeta, DocumentRecord, Fragment, FragmentId, FragmentRecord, IndexPayload,
    KeywordHit, Meta, PageText, SearchFilters, VectorHit,
};

/// Rough token counting used by the fragmenter.
///
/// Implementations are estimators, not tokenizers; callers must not
/// assume exactness. Swappable so a real tokenizer can replace the
/// word-count heuristic without touching fragmenter control flow.
pub trait TokenEstimator: Send + Sync {
    fn estimate(&self, text: &str) -> usize;
}

/// Text-to-vector encoder. Holds no per-call mutable state.
pub trait Embedder: Send + Sync {
    /// Fixed output dimension of every vector this embedder produces.
    fn dim(&self) -> usize;

    /// Encode `texts` in order, `batch_size` items per model call.
    ///
    /// Returns exactly one vector per input text or fails as a whole;
    /// partial vector lists are never returned.
    fn encode(&self, texts: &[String], batch_size: usize) -> anyhow::Result<Vec<Vec<f32>>>;

    /// Single-item convenience wrapper around [`Embedder::encode`].
    fn encode_one(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let single = [text.to_string()];
        let mut vectors = self.encode(&single, 1)?;
        vectors
            .pop()
            .ok_or_else(|| anyhow::anyhow!("embedder returned no vector for single input"))
    }
}

/// Opaque-path blob storage for raw document bytes.
pub trait BlobStore: Send + Sync {
    fn put(&self, bytes: &[u8], name: &str) -> anyhow::Result<String>;
    fn fetch(&self, path: &str) -> anyhow::Result<Vec<u8>>;
    fn delete(&self, path: &str) -> anyhow::Result<()>;
}

/// Extracts text and metadata from raw document bytes.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, bytes: &[u8]) -> anyhow::Result<(String, DocumentMeta)>;
    fn extract_by_page(&self, bytes: &[u8]) -> anyhow::Result<Vec<PageText>>;
}

/// Dense vector index collaborator.
pub trait VectorIndex: Send + Sync {
    /// Store one vector per payload, returning one key per row in order.
    fn upsert(&self, vectors: &[Vec<f32>], payloads: &[IndexPayload]) -> anyhow::Result<Vec<String>>;

    fn search(
        &self,
        query_vector: &[f32],
        limit: usize,
        filters: Option<&SearchFilters>,
    ) -> anyhow::Result<Vec<VectorHit>>;

    fn delete_by_document(&self, document_id: DocumentId) -> anyhow::Result<()>;
}

/// Keyword (full-text) index collaborator.
pub trait LexicalIndex: Send + Sync {
    /// Index one fragment, returning the engine's key for it.
    fn index(
        &self,
        fragment_id: FragmentId,
        document_id: DocumentId,
        text: &str,
        metadata: &Meta,
    ) -> anyhow::Result<String>;

    fn search(
        &self,
        query: &str,
        limit: usize,
        filters: Option<&SearchFilters>,
    ) -> anyhow::Result<Vec<KeywordHit>>;

    fn delete_by_document(&self, document_id: DocumentId) -> anyhow::Result<()>;
}

/// Relational store for document and fragment rows.
///
/// `insert_fragments` must hand back durable identities before the
/// orchestrator forwards payloads to the index collaborators, since both
/// payloads embed the fragment id for later correlation and deletion.
pub trait Catalog: Send + Sync {
    fn create_document(&self, filename: &str, storage_path: &str) -> anyhow::Result<DocumentId>;

    fn document(&self, id: DocumentId) -> anyhow::Result<Option<DocumentRecord>>;

    /// Move a pending document into `processing`. Errors if the document
    /// is missing or not pending.
    fn set_processing(&self, id: DocumentId) -> anyhow::Result<()>;

    fn set_document_meta(
        &self,
        id: DocumentId,
        title: Option<&str>,
        page_count: u32,
    ) -> anyhow::Result<()>;

    /// Persist fragment rows in order, returning their generated ids.
    fn insert_fragments(
        &self,
        document_id: DocumentId,
        fragments: &[Fragment],
    ) -> anyhow::Result<Vec<FragmentId>>;

    /// Record the index keys returned by the two collaborators, one pair
    /// per fragment id, same order.
    fn record_index_keys(
        &self,
        fragment_ids: &[FragmentId],
        vector_keys: &[String],
        lexical_keys: &[String],
    ) -> anyhow::Result<()>;

    fn set_completed(&self, id: DocumentId, chunk_count: usize, elapsed_secs: f64)
        -> anyhow::Result<()>;

    fn set_failed(&self, id: DocumentId, message: &str) -> anyhow::Result<()>;

    fn fragments_for_document(&self, id: DocumentId) -> anyhow::Result<Vec<FragmentRecord>>;

    /// Remove the document row and its fragment rows.
    fn delete_document(&self, id: DocumentId) -> anyhow::Result<()>;
}
