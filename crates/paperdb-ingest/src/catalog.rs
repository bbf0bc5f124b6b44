//! SQLite catalog: durable document and fragment rows.
//!
//! Fragment inserts run inside one transaction and report their rowids
//! back before any index collaborator sees a payload, which is what the
//! orchestrator's identity-before-handoff step relies on.

use std::path::Path;
use std::sync::Mutex;

use anyhow::Context;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use paperdb_core::traits::Catalog;
use paperdb_core::types::{
    DocumentId, DocumentRecord, Fragment, FragmentId, FragmentRecord, ProcessingState,
};

pub struct SqliteCatalog {
    conn: Mutex<Connection>,
}

impl SqliteCatalog {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("opening catalog {}", path.display()))?;
        Self::from_connection(conn)
    }

    /// Private in-memory database, used by tests and throwaway runs.
    pub fn in_memory() -> anyhow::Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> anyhow::Result<Self> {
        conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS documents (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                filename TEXT NOT NULL,
                title TEXT,
                storage_path TEXT NOT NULL,
                page_count INTEGER,
                status TEXT NOT NULL DEFAULT 'pending',
                error_message TEXT,
                chunk_count INTEGER NOT NULL DEFAULT 0,
                processing_time_secs REAL,
                created_at TEXT NOT NULL,
                processed_at TEXT
            );

            CREATE TABLE IF NOT EXISTS fragments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                document_id INTEGER NOT NULL
                    REFERENCES documents(id) ON DELETE CASCADE,
                fragment_index INTEGER NOT NULL,
                text TEXT NOT NULL,
                token_estimate INTEGER NOT NULL,
                page_number INTEGER,
                vector_key TEXT,
                lexical_key TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_fragments_document
                ON fragments(document_id);
            ",
        )?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn lock(&self) -> anyhow::Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| anyhow::anyhow!("catalog lock poisoned"))
    }
}

fn document_from_row(row: &Row<'_>) -> rusqlite::Result<DocumentRecord> {
    let status_text: String = row.get("status")?;
    let created_at: String = row.get("created_at")?;
    let processed_at: Option<String> = row.get("processed_at")?;
    Ok(DocumentRecord {
        id: row.get("id")?,
        filename: row.get("filename")?,
        title: row.get("title")?,
        storage_path: row.get("storage_path")?,
        page_count: row.get::<_, Option<u32>>("page_count")?,
        status: ProcessingState::parse(&status_text).unwrap_or(ProcessingState::Pending),
        error_message: row.get("error_message")?,
        chunk_count: row.get::<_, i64>("chunk_count")? as usize,
        processing_time_secs: row.get("processing_time_secs")?,
        created_at: parse_timestamp(&created_at)?,
        processed_at: processed_at.as_deref().map(parse_timestamp).transpose()?,
    })
}

/// Stored timestamps are written by this module as RFC 3339; anything
/// else in the column is corruption and surfaces as a row error rather
/// than a made-up time.
fn parse_timestamp(raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    raw.parse().map_err(|e: chrono::ParseError| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}

impl Catalog for SqliteCatalog {
    fn create_document(&self, filename: &str, storage_path: &str) -> anyhow::Result<DocumentId> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO documents (filename, storage_path, status, created_at)
             VALUES (?1, ?2, 'pending', ?3)",
            params![filename, storage_path, Utc::now().to_rfc3339()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn document(&self, id: DocumentId) -> anyhow::Result<Option<DocumentRecord>> {
        let conn = self.lock()?;
        let record = conn
            .query_row("SELECT * FROM documents WHERE id = ?1", params![id], document_from_row)
            .optional()?;
        Ok(record)
    }

    fn set_processing(&self, id: DocumentId) -> anyhow::Result<()> {
        let conn = self.lock()?;
        let updated = conn.execute(
            "UPDATE documents SET status = 'processing', error_message = NULL
             WHERE id = ?1 AND status = 'pending'",
            params![id],
        )?;
        anyhow::ensure!(updated == 1, "document {id} is not in the pending state");
        Ok(())
    }

    fn set_document_meta(
        &self,
        id: DocumentId,
        title: Option<&str>,
        page_count: u32,
    ) -> anyhow::Result<()> {
        let conn = self.lock()?;
        // Never clobber a caller-supplied title with extractor output.
        conn.execute(
            "UPDATE documents
             SET page_count = ?2,
                 title = COALESCE(title, ?3)
             WHERE id = ?1",
            params![id, page_count, title],
        )?;
        Ok(())
    }

    fn insert_fragments(
        &self,
        document_id: DocumentId,
        fragments: &[Fragment],
    ) -> anyhow::Result<Vec<FragmentId>> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut ids = Vec::with_capacity(fragments.len());
        {
            let mut stmt = tx.prepare(
                "INSERT INTO fragments
                     (document_id, fragment_index, text, token_estimate, page_number)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for fragment in fragments {
                stmt.execute(params![
                    document_id,
                    fragment.index as i64,
                    fragment.text,
                    fragment.token_estimate as i64,
                    fragment.page_number,
                ])?;
                ids.push(tx.last_insert_rowid());
            }
        }
        tx.commit()?;
        Ok(ids)
    }

    fn record_index_keys(
        &self,
        fragment_ids: &[FragmentId],
        vector_keys: &[String],
        lexical_keys: &[String],
    ) -> anyhow::Result<()> {
        anyhow::ensure!(
            fragment_ids.len() == vector_keys.len() && fragment_ids.len() == lexical_keys.len(),
            "fragment ids and index keys must line up"
        );
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "UPDATE fragments SET vector_key = ?2, lexical_key = ?3 WHERE id = ?1",
            )?;
            for ((id, vector_key), lexical_key) in
                fragment_ids.iter().zip(vector_keys).zip(lexical_keys)
            {
                stmt.execute(params![id, vector_key, lexical_key])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn set_completed(
        &self,
        id: DocumentId,
        chunk_count: usize,
        elapsed_secs: f64,
    ) -> anyhow::Result<()> {
        let conn = self.lock()?;
        let updated = conn.execute(
            "UPDATE documents
             SET status = 'completed', chunk_count = ?2, processing_time_secs = ?3,
                 processed_at = ?4
             WHERE id = ?1 AND status = 'processing'",
            params![id, chunk_count as i64, elapsed_secs, Utc::now().to_rfc3339()],
        )?;
        anyhow::ensure!(updated == 1, "document {id} is not in the processing state");
        Ok(())
    }

    fn set_failed(&self, id: DocumentId, message: &str) -> anyhow::Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE documents SET status = 'failed', error_message = ?2, processed_at = ?3
             WHERE id = ?1",
            params![id, message, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn fragments_for_document(&self, id: DocumentId) -> anyhow::Result<Vec<FragmentRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, document_id, fragment_index, text, token_estimate, page_number,
                    vector_key, lexical_key
             FROM fragments WHERE document_id = ?1
             ORDER BY fragment_index",
        )?;
        let rows = stmt.query_map(params![id], |row| {
            Ok(FragmentRecord {
                id: row.get(0)?,
                document_id: row.get(1)?,
                fragment_index: row.get::<_, i64>(2)? as usize,
                text: row.get(3)?,
                token_estimate: row.get::<_, i64>(4)? as usize,
                page_number: row.get(5)?,
                vector_key: row.get(6)?,
                lexical_key: row.get(7)?,
            })
        })?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    fn delete_document(&self, id: DocumentId) -> anyhow::Result<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM fragments WHERE document_id = ?1", params![id])?;
        conn.execute("DELETE FROM documents WHERE id = ?1", params![id])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paperdb_core::types::Fragment;

    fn fragment(index: usize, text: &str) -> Fragment {
        Fragment {
            index,
            text: text.to_string(),
            token_estimate: text.split_whitespace().count(),
            page_number: Some(1),
            char_span: None,
        }
    }

    #[test]
    fn lifecycle_pending_to_completed() {
        let catalog = SqliteCatalog::in_memory().expect("catalog");
        let id = catalog.create_document("a.pdf", "blob/a.pdf").expect("create");

        let doc = catalog.document(id).expect("get").expect("exists");
        assert_eq!(doc.status, ProcessingState::Pending);

        catalog.set_processing(id).expect("processing");
        catalog.set_completed(id, 4, 1.25).expect("completed");

        let doc = catalog.document(id).expect("get").expect("exists");
        assert_eq!(doc.status, ProcessingState::Completed);
        assert_eq!(doc.chunk_count, 4);
        assert!(doc.processing_time_secs.is_some());
        assert!(doc.processed_at.is_some());
    }

    #[test]
    fn processing_requires_pending() {
        let catalog = SqliteCatalog::in_memory().expect("catalog");
        let id = catalog.create_document("a.pdf", "blob/a.pdf").expect("create");

        catalog.set_processing(id).expect("first transition");
        assert!(catalog.set_processing(id).is_err(), "no second entry to processing");
    }

    #[test]
    fn failed_keeps_message_verbatim() {
        let catalog = SqliteCatalog::in_memory().expect("catalog");
        let id = catalog.create_document("a.pdf", "blob/a.pdf").expect("create");
        catalog.set_processing(id).expect("processing");

        catalog.set_failed(id, "extraction failed: not a PDF").expect("failed");

        let doc = catalog.document(id).expect("get").expect("exists");
        assert_eq!(doc.status, ProcessingState::Failed);
        assert_eq!(doc.error_message.as_deref(), Some("extraction failed: not a PDF"));
    }

    #[test]
    fn fragment_ids_are_durable_and_ordered() {
        let catalog = SqliteCatalog::in_memory().expect("catalog");
        let id = catalog.create_document("a.pdf", "blob/a.pdf").expect("create");

        let ids = catalog
            .insert_fragments(id, &[fragment(0, "first part"), fragment(1, "second part")])
            .expect("insert");
        assert_eq!(ids.len(), 2);
        assert!(ids[0] < ids[1]);

        catalog
            .record_index_keys(
                &ids,
                &["v0".to_string(), "v1".to_string()],
                &["l0".to_string(), "l1".to_string()],
            )
            .expect("record keys");

        let records = catalog.fragments_for_document(id).expect("fragments");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].vector_key.as_deref(), Some("v0"));
        assert_eq!(records[1].lexical_key.as_deref(), Some("l1"));
    }

    #[test]
    fn corrupt_timestamp_is_an_error_not_a_fresh_time() {
        let catalog = SqliteCatalog::in_memory().expect("catalog");
        let id = catalog.create_document("a.pdf", "blob/a.pdf").expect("create");

        catalog
            .conn
            .lock()
            .expect("lock")
            .execute("UPDATE documents SET created_at = 'not a timestamp' WHERE id = ?1", [id])
            .expect("corrupt row");

        assert!(catalog.document(id).is_err());
    }

    #[test]
    fn delete_document_removes_fragments() {
        let catalog = SqliteCatalog::in_memory().expect("catalog");
        let id = catalog.create_document("a.pdf", "blob/a.pdf").expect("create");
        catalog.insert_fragments(id, &[fragment(0, "text")]).expect("insert");

        catalog.delete_document(id).expect("delete");

        assert!(catalog.document(id).expect("get").is_none());
        assert!(catalog.fragments_for_document(id).expect("fragments").is_empty());
    }
}
