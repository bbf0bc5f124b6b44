use std::sync::{Arc, Mutex};

use tempfile::TempDir;

use paperdb_core::fragmenter::Fragmenter;
use paperdb_core::traits::{
    BlobStore, Catalog, Embedder, LexicalIndex, TextExtractor, VectorIndex,
};
use paperdb_core::types::{
    DocumentId, DocumentMeta, FragmentId, IndexPayload, KeywordHit, Meta, PageText,
    ProcessingState, SearchFilters, VectorHit,
};
use paperdb_embed::{similarity, HashEmbedder};
use paperdb_hybrid::HybridSearchEngine;
use paperdb_ingest::{FsBlobStore, IngestOrchestrator, SqliteCatalog};

/// Returns canned pages without looking at the bytes.
struct StubExtractor {
    pages: Vec<PageText>,
    title: Option<String>,
}

impl StubExtractor {
    fn new(pages: &[(u32, &str)]) -> Self {
        Self {
            pages: pages
                .iter()
                .map(|(n, t)| PageText { page_number: *n, text: (*t).to_string() })
                .collect(),
            title: Some("Stub Title".to_string()),
        }
    }
}

impl TextExtractor for StubExtractor {
    fn extract(&self, _bytes: &[u8]) -> anyhow::Result<(String, DocumentMeta)> {
        let text: Vec<&str> = self.pages.iter().map(|p| p.text.as_str()).collect();
        let meta = DocumentMeta {
            page_count: self.pages.len() as u32,
            title: self.title.clone(),
        };
        Ok((text.join("\n"), meta))
    }

    fn extract_by_page(&self, _bytes: &[u8]) -> anyhow::Result<Vec<PageText>> {
        Ok(self.pages.clone())
    }
}

/// Fails every extraction with a fixed message.
struct FailingExtractor;

impl TextExtractor for FailingExtractor {
    fn extract(&self, _bytes: &[u8]) -> anyhow::Result<(String, DocumentMeta)> {
        anyhow::bail!("boom")
    }

    fn extract_by_page(&self, _bytes: &[u8]) -> anyhow::Result<Vec<PageText>> {
        anyhow::bail!("boom")
    }
}

/// Brute-force cosine scan over everything ever upserted.
#[derive(Default)]
struct MemoryVectorIndex {
    rows: Mutex<Vec<(Vec<f32>, IndexPayload)>>,
}

impl MemoryVectorIndex {
    fn len(&self) -> usize {
        self.rows.lock().expect("lock").len()
    }
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
            .map(|(v, p)| VectorHit {
                fragment_id: p.fragment_id,
                document_id: p.document_id,
                text: p.text.clone(),
                score: similarity(v, query_vector).unwrap_or(0.0),
                metadata: Meta::new(),
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

impl MemoryLexicalIndex {
    fn len(&self) -> usize {
        self.rows.lock().expect("lock").len()
    }
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
                    highlighted: None,
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

struct Fixture {
    _tmp: TempDir,
    orchestrator: IngestOrchestrator,
    catalog: Arc<SqliteCatalog>,
    vector: Arc<MemoryVectorIndex>,
    lexical: Arc<MemoryLexicalIndex>,
    embedder: Arc<dyn Embedder>,
    blobs: Arc<FsBlobStore>,
}

fn fixture(extractor: Arc<dyn TextExtractor>) -> Fixture {
    let tmp = TempDir::new().expect("tempdir");
    let blobs = Arc::new(FsBlobStore::open(tmp.path()).expect("blob store"));
    let catalog = Arc::new(SqliteCatalog::in_memory().expect("catalog"));
    let vector = Arc::new(MemoryVectorIndex::default());
    let lexical = Arc::new(MemoryLexicalIndex::default());
    let embedder: Arc<dyn Embedder> = Arc::new(HashEmbedder::new(64));

    let orchestrator = IngestOrchestrator::new(
        blobs.clone(),
        extractor,
        Fragmenter::new(20, 5),
        embedder.clone(),
        catalog.clone(),
        vector.clone(),
        lexical.clone(),
        8,
    );

    Fixture { _tmp: tmp, orchestrator, catalog, vector, lexical, embedder, blobs }
}

#[test]
fn process_completes_and_records_keys() {
    let extractor = Arc::new(StubExtractor::new(&[
        (1, "Revenue grew this year. Operating income followed. Margins were stable."),
        (2, "The appendix lists every regional office. Each office reports monthly."),
    ]));
    let fx = fixture(extractor);

    let id = fx.orchestrator.add_document(b"raw pdf bytes", "report.pdf").expect("add");
    let report = fx.orchestrator.process(id).expect("process");

    assert!(report.fragment_count > 0);

    let doc = fx.catalog.document(id).expect("get").expect("exists");
    assert_eq!(doc.status, ProcessingState::Completed);
    assert_eq!(doc.chunk_count, report.fragment_count);
    assert_eq!(doc.page_count, Some(2));
    assert_eq!(doc.title.as_deref(), Some("Stub Title"));

    let fragments = fx.catalog.fragments_for_document(id).expect("fragments");
    assert_eq!(fragments.len(), report.fragment_count);
    for fragment in &fragments {
        assert!(fragment.vector_key.is_some());
        assert!(fragment.lexical_key.is_some());
        assert!(fragment.page_number.is_some());
    }
    assert_eq!(fx.vector.len(), report.fragment_count);
    assert_eq!(fx.lexical.len(), report.fragment_count);
}

#[test]
fn failed_extraction_marks_document_failed_verbatim() {
    let fx = fixture(Arc::new(FailingExtractor));

    let id = fx.orchestrator.add_document(b"not a pdf", "junk.pdf").expect("add");
    let err = fx.orchestrator.process(id).expect_err("must fail");
    assert!(err.to_string().contains("boom"));

    let doc = fx.catalog.document(id).expect("get").expect("exists");
    assert_eq!(doc.status, ProcessingState::Failed);
    let message = doc.error_message.expect("message recorded");
    assert!(message.contains("boom"), "stored message: {message}");

    assert!(fx.catalog.fragments_for_document(id).expect("fragments").is_empty());
    assert_eq!(fx.vector.len(), 0);
    assert_eq!(fx.lexical.len(), 0);
}

#[test]
fn processed_document_is_searchable_end_to_end() {
    let extractor = Arc::new(StubExtractor::new(&[(
        1,
        "Quarterly revenue rose sharply. Cloud subscriptions drove the increase.",
    )]));
    let fx = fixture(extractor);

    let id = fx.orchestrator.add_document(b"bytes", "q3.pdf").expect("add");
    fx.orchestrator.process(id).expect("process");

    let engine = HybridSearchEngine::new(fx.embedder.clone(), fx.vector.clone(), fx.lexical.clone());
    let results = engine.search("cloud subscriptions revenue", 5, 0, None, None).expect("search");

    assert!(!results.is_empty());
    assert_eq!(results[0].document_id, id);
    assert!(results[0].combined_score > 0.0);
}

#[test]
fn delete_document_clears_every_store() {
    let extractor = Arc::new(StubExtractor::new(&[(1, "Some text worth indexing here.")]));
    let fx = fixture(extractor);

    let id = fx.orchestrator.add_document(b"bytes", "doomed.pdf").expect("add");
    fx.orchestrator.process(id).expect("process");
    let storage_path =
        fx.catalog.document(id).expect("get").expect("exists").storage_path;

    fx.orchestrator.delete_document(id).expect("delete");

    assert!(fx.catalog.document(id).expect("get").is_none());
    assert_eq!(fx.vector.len(), 0);
    assert_eq!(fx.lexical.len(), 0);
    assert!(fx.blobs.fetch(&storage_path).is_err());
}

#[test]
fn empty_document_completes_with_zero_fragments() {
    let fx = fixture(Arc::new(StubExtractor::new(&[(1, "   ")])));

    let id = fx.orchestrator.add_document(b"bytes", "blank.pdf").expect("add");
    let report = fx.orchestrator.process(id).expect("process");

    assert_eq!(report.fragment_count, 0);
    let doc = fx.catalog.document(id).expect("get").expect("exists");
    assert_eq!(doc.status, ProcessingState::Completed);
    assert_eq!(doc.chunk_count, 0);
}
