//! PDF text extraction via lopdf.

use anyhow::Context;
use lopdf::Document;

use paperdb_core::traits::TextExtractor;
use paperdb_core::types::{DocumentMeta, PageText};

/// Stateless PDF extractor; safe to share across ingestion runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfExtractor;

impl PdfExtractor {
    pub fn new() -> Self {
        Self
    }

    fn load(bytes: &[u8]) -> anyhow::Result<Document> {
        Document::load_mem(bytes).context("parsing PDF bytes")
    }
}

impl TextExtractor for PdfExtractor {
    fn extract(&self, bytes: &[u8]) -> anyhow::Result<(String, DocumentMeta)> {
        let document = Self::load(bytes)?;
        let pages = document.get_pages();
        let page_count = pages.len() as u32;

        let mut full_text = String::new();
        for &page_number in pages.keys() {
            let text = document
                .extract_text(&[page_number])
                .with_context(|| format!("extracting text from page {page_number}"))?;
            full_text.push_str(&text);
            full_text.push('\n');
        }

        let meta = DocumentMeta { page_count, title: document_title(&document) };
        tracing::info!(
            pages = page_count,
            words = full_text.split_whitespace().count(),
            "extracted text"
        );
        Ok((full_text, meta))
    }

    fn extract_by_page(&self, bytes: &[u8]) -> anyhow::Result<Vec<PageText>> {
        let document = Self::load(bytes)?;
        let mut pages = Vec::new();
        for &page_number in document.get_pages().keys() {
            let text = document
                .extract_text(&[page_number])
                .with_context(|| format!("extracting text from page {page_number}"))?;
            pages.push(PageText { page_number, text });
        }
        Ok(pages)
    }
}

/// Best-effort title lookup from the PDF info dictionary.
fn document_title(document: &Document) -> Option<String> {
    let info = document.trailer.get(b"Info").ok()?;
    let info_id = info.as_reference().ok()?;
    let dictionary = document.get_object(info_id).ok()?.as_dict().ok()?;
    let raw = dictionary.get(b"Title").ok()?.as_str().ok()?;
    let title = String::from_utf8_lossy(raw).trim().to_string();
    if title.is_empty() {
        None
    } else {
        Some(title)
    }
}
