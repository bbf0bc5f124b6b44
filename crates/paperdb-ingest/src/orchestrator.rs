//! Ingestion orchestrator: drives one document through the pipeline.
//!
//! Each stage failure is mapped to its `PipelineError` variant before the
//! document is marked failed, so callers and the catalog row both see
//! which stage broke and the collaborator's own message.

use std::sync::Arc;
use std::time::Instant;

use paperdb_core::error::{PipelineError, Result};
use paperdb_core::fragmenter::Fragmenter;
use paperdb_core::traits::{BlobStore, Catalog, Embedder, LexicalIndex, TextExtractor, VectorIndex};
use paperdb_core::types::{DocumentId, IndexPayload, Meta};

/// Outcome of one successful `process` run.
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub document_id: DocumentId,
    pub fragment_count: usize,
    pub elapsed_secs: f64,
}

pub struct IngestOrchestrator {
    blobs: Arc<dyn BlobStore>,
    extractor: Arc<dyn TextExtractor>,
    fragmenter: Fragmenter,
    embedder: Arc<dyn Embedder>,
    catalog: Arc<dyn Catalog>,
    vector: Arc<dyn VectorIndex>,
    lexical: Arc<dyn LexicalIndex>,
    batch_size: usize,
}

impl IngestOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        blobs: Arc<dyn BlobStore>,
        extractor: Arc<dyn TextExtractor>,
        fragmenter: Fragmenter,
        embedder: Arc<dyn Embedder>,
        catalog: Arc<dyn Catalog>,
        vector: Arc<dyn VectorIndex>,
        lexical: Arc<dyn LexicalIndex>,
        batch_size: usize,
    ) -> Self {
        Self { blobs, extractor, fragmenter, embedder, catalog, vector, lexical, batch_size }
    }

    /// Store raw bytes in the blob store and register a pending document.
    pub fn add_document(&self, bytes: &[u8], filename: &str) -> Result<DocumentId> {
        let storage_path = self
            .blobs
            .put(bytes, filename)
            .map_err(|e| PipelineError::Storage(format!("{e:#}")))?;
        let id = self
            .catalog
            .create_document(filename, &storage_path)
            .map_err(|e| PipelineError::Catalog(format!("{e:#}")))?;
        tracing::info!(document_id = id, filename, "registered document");
        Ok(id)
    }

    /// Drive a pending document to `completed` or `failed`.
    ///
    /// On any stage error the document is marked failed with the stage's
    /// message and the error is returned. Index writes that happened
    /// before the failure are not rolled back.
    pub fn process(&self, document_id: DocumentId) -> Result<IngestReport> {
        let started = Instant::now();

        let document = self
            .catalog
            .document(document_id)
            .map_err(|e| PipelineError::Catalog(format!("{e:#}")))?
            .ok_or_else(|| PipelineError::NotFound(format!("document {document_id}")))?;

        self.catalog
            .set_processing(document_id)
            .map_err(|e| PipelineError::Catalog(format!("{e:#}")))?;

        match self.run_stages(document_id, &document.storage_path) {
            Ok(fragment_count) => {
                let elapsed_secs = started.elapsed().as_secs_f64();
                self.catalog
                    .set_completed(document_id, fragment_count, elapsed_secs)
                    .map_err(|e| PipelineError::Catalog(format!("{e:#}")))?;
                tracing::info!(document_id, fragment_count, elapsed_secs, "document processed");
                Ok(IngestReport { document_id, fragment_count, elapsed_secs })
            }
            Err(err) => {
                let message = err.to_string();
                tracing::error!(document_id, error = %message, "processing failed");
                if let Err(update_err) = self.catalog.set_failed(document_id, &message) {
                    tracing::error!(document_id, error = %update_err, "could not mark failed");
                }
                Err(err)
            }
        }
    }

    fn run_stages(&self, document_id: DocumentId, storage_path: &str) -> Result<usize> {
        let bytes = self
            .blobs
            .fetch(storage_path)
            .map_err(|e| PipelineError::Storage(format!("{e:#}")))?;

        let (_, meta) = self
            .extractor
            .extract(&bytes)
            .map_err(|e| PipelineError::Extraction(format!("{e:#}")))?;
        let pages = self
            .extractor
            .extract_by_page(&bytes)
            .map_err(|e| PipelineError::Extraction(format!("{e:#}")))?;

        self.catalog
            .set_document_meta(document_id, meta.title.as_deref(), meta.page_count)
            .map_err(|e| PipelineError::Catalog(format!("{e:#}")))?;

        let fragments = self.fragmenter.fragment_pages(&pages);
        if fragments.is_empty() {
            tracing::warn!(document_id, "document produced no fragments");
            return Ok(0);
        }

        let texts: Vec<String> = fragments.iter().map(|f| f.text.clone()).collect();
        let vectors = self
            .embedder
            .encode(&texts, self.batch_size)
            .map_err(|e| PipelineError::Embedding(format!("{e:#}")))?;

        // Fragment rows must be durable before either index sees a
        // payload; both payloads embed the generated ids.
        let fragment_ids = self
            .catalog
            .insert_fragments(document_id, &fragments)
            .map_err(|e| PipelineError::Catalog(format!("{e:#}")))?;

        let payloads: Vec<IndexPayload> = fragment_ids
            .iter()
            .zip(&fragments)
            .map(|(&fragment_id, fragment)| IndexPayload {
                fragment_id,
                document_id,
                text: fragment.text.clone(),
                page_number: fragment.page_number,
            })
            .collect();

        let vector_keys = self
            .vector
            .upsert(&vectors, &payloads)
            .map_err(|e| PipelineError::IndexWrite(format!("{e:#}")))?;

        let mut lexical_keys = Vec::with_capacity(payloads.len());
        for payload in &payloads {
            let mut metadata = Meta::new();
            if let Some(page) = payload.page_number {
                metadata.insert("page_number".to_string(), page.to_string());
            }
            let key = self
                .lexical
                .index(payload.fragment_id, payload.document_id, &payload.text, &metadata)
                .map_err(|e| PipelineError::IndexWrite(format!("{e:#}")))?;
            lexical_keys.push(key);
        }

        self.catalog
            .record_index_keys(&fragment_ids, &vector_keys, &lexical_keys)
            .map_err(|e| PipelineError::Catalog(format!("{e:#}")))?;

        Ok(fragments.len())
    }

    /// Remove a document everywhere: both indexes, catalog rows, blob.
    pub fn delete_document(&self, document_id: DocumentId) -> Result<()> {
        let document = self
            .catalog
            .document(document_id)
            .map_err(|e| PipelineError::Catalog(format!("{e:#}")))?
            .ok_or_else(|| PipelineError::NotFound(format!("document {document_id}")))?;

        self.vector
            .delete_by_document(document_id)
            .map_err(|e| PipelineError::IndexWrite(format!("{e:#}")))?;
        self.lexical
            .delete_by_document(document_id)
            .map_err(|e| PipelineError::IndexWrite(format!("{e:#}")))?;
        self.catalog
            .delete_document(document_id)
            .map_err(|e| PipelineError::Catalog(format!("{e:#}")))?;
        self.blobs
            .delete(&document.storage_path)
            .map_err(|e| PipelineError::Storage(format!("{e:#}")))?;

        tracing::info!(document_id, "document deleted");
        Ok(())
    }
}
