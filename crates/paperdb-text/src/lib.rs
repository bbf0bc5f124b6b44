//! Tantivy-backed lexical index adapter.
//!
//! Implements the core `LexicalIndex` trait: BM25 search with snippet
//! highlighting and delete-by-document. One fragment per tantivy
//! document; the fragment's catalog id doubles as the returned key.

mod schema;

pub use schema::{build_schema, register_tokenizer};

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;

use anyhow::Context;
use tantivy::collector::TopDocs;
use tantivy::directory::MmapDirectory;
use tantivy::query::{BooleanQuery, Occur, Query, QueryParser, TermQuery};
use tantivy::schema::{Field, IndexRecordOption, Value};
use tantivy::snippet::SnippetGenerator;
use tantivy::{doc, Index, IndexWriter, TantivyDocument, Term};

use paperdb_core::traits::LexicalIndex;
use paperdb_core::types::{DocumentId, FragmentId, KeywordHit, Meta, SearchFilters};

const WRITER_HEAP_BYTES: usize = 50_000_000;

pub struct TantivyLexicalIndex {
    index: Index,
    // Tantivy allows a single writer; calls that mutate the index share it.
    writer: Mutex<IndexWriter>,
    fragment_id_field: Field,
    document_id_field: Field,
    page_number_field: Field,
    text_field: Field,
}

impl TantivyLexicalIndex {
    /// Open the index at `index_dir`, creating it on first use.
    pub fn open(index_dir: &Path) -> anyhow::Result<Self> {
        std::fs::create_dir_all(index_dir)
            .with_context(|| format!("creating index dir {}", index_dir.display()))?;
        let schema = build_schema();
        let directory = MmapDirectory::open(index_dir)?;
        let index = Index::open_or_create(directory, schema.clone())?;
        register_tokenizer(&index);

        let writer = index.writer(WRITER_HEAP_BYTES)?;
        let fragment_id_field = schema.get_field("fragment_id")?;
        let document_id_field = schema.get_field("document_id")?;
        let page_number_field = schema.get_field("page_number")?;
        let text_field = schema.get_field("text")?;

        Ok(Self {
            index,
            writer: Mutex::new(writer),
            fragment_id_field,
            document_id_field,
            page_number_field,
            text_field,
        })
    }

    fn filter_clauses(&self, filters: Option<&SearchFilters>) -> Vec<(Occur, Box<dyn Query>)> {
        let mut clauses: Vec<(Occur, Box<dyn Query>)> = Vec::new();
        let Some(filters) = filters else {
            return clauses;
        };
        if let Some(document_id) = filters.document_id {
            let term = Term::from_field_i64(self.document_id_field, document_id);
            clauses.push((
                Occur::Must,
                Box::new(TermQuery::new(term, IndexRecordOption::Basic)),
            ));
        }
        if let Some(page_number) = filters.page_number {
            let term = Term::from_field_i64(self.page_number_field, i64::from(page_number));
            clauses.push((
                Occur::Must,
                Box::new(TermQuery::new(term, IndexRecordOption::Basic)),
            ));
        }
        clauses
    }
}

impl LexicalIndex for TantivyLexicalIndex {
    fn index(
        &self,
        fragment_id: FragmentId,
        document_id: DocumentId,
        text: &str,
        metadata: &Meta,
    ) -> anyhow::Result<String> {
        let mut document = doc!(
            self.fragment_id_field => fragment_id,
            self.document_id_field => document_id,
            self.text_field => text,
        );
        if let Some(page) = metadata.get("page_number").and_then(|p| p.parse::<i64>().ok()) {
            document.add_i64(self.page_number_field, page);
        }

        let mut writer = self.writer.lock().map_err(|_| anyhow::anyhow!("writer lock poisoned"))?;
        writer.add_document(document)?;
        writer.commit()?;
        Ok(fragment_id.to_string())
    }

    fn search(
        &self,
        query: &str,
        limit: usize,
        filters: Option<&SearchFilters>,
    ) -> anyhow::Result<Vec<KeywordHit>> {
        let reader = self.index.reader()?;
        let searcher = reader.searcher();

        let parser = QueryParser::for_index(&self.index, vec![self.text_field]);
        let text_query = parser.parse_query(query)?;

        let mut clauses = self.filter_clauses(filters);
        let final_query: Box<dyn Query> = if clauses.is_empty() {
            text_query
        } else {
            clauses.push((Occur::Must, text_query));
            Box::new(BooleanQuery::new(clauses))
        };

        let snippet_generator =
            SnippetGenerator::create(&searcher, &*final_query, self.text_field)?;

        let top_docs = searcher.search(&final_query, &TopDocs::with_limit(limit.max(1)))?;
        let mut hits = Vec::with_capacity(top_docs.len());
        for (score, address) in top_docs {
            let retrieved: TantivyDocument = searcher.doc(address)?;
            let fragment_id = retrieved
                .get_first(self.fragment_id_field)
                .and_then(|v| v.as_i64())
                .ok_or_else(|| anyhow::anyhow!("indexed fragment missing fragment_id"))?;
            let document_id = retrieved
                .get_first(self.document_id_field)
                .and_then(|v| v.as_i64())
                .ok_or_else(|| anyhow::anyhow!("indexed fragment missing document_id"))?;
            let text = retrieved
                .get_first(self.text_field)
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();

            let snippet_html = snippet_generator.snippet_from_doc(&retrieved).to_html();
            let highlighted = if snippet_html.is_empty() { None } else { Some(snippet_html) };

            let mut metadata = BTreeMap::new();
            if let Some(page) =
                retrieved.get_first(self.page_number_field).and_then(|v| v.as_i64())
            {
                metadata.insert("page_number".to_string(), page.to_string());
            }

            hits.push(KeywordHit {
                fragment_id,
                document_id,
                text,
                score,
                highlighted,
                metadata: metadata.into_iter().collect(),
            });
        }

        tracing::debug!(query, hits = hits.len(), "lexical search");
        Ok(hits)
    }

    fn delete_by_document(&self, document_id: DocumentId) -> anyhow::Result<()> {
        let mut writer = self.writer.lock().map_err(|_| anyhow::anyhow!("writer lock poisoned"))?;
        let term = Term::from_field_i64(self.document_id_field, document_id);
        writer.delete_term(term);
        writer.commit()?;
        tracing::info!(document_id, "deleted lexical entries");
        Ok(())
    }
}
