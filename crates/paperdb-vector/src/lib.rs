//! LanceDB-backed vector index adapter.
//!
//! Implements the core `VectorIndex` trait over a local lancedb table.
//! The lancedb client is async; this adapter owns a small tokio runtime
//! and bridges it behind the synchronous trait so the rest of the
//! pipeline stays blocking.

mod schema;

pub use schema::build_arrow_schema;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use arrow_array::{
    Array, FixedSizeListArray, Float32Array, Int32Array, Int64Array, RecordBatch,
    RecordBatchIterator, StringArray,
};
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{connect, Connection};

use paperdb_core::types::{DocumentId, IndexPayload, Meta, SearchFilters, VectorHit};
use paperdb_core::traits::VectorIndex;

pub struct LanceVectorIndex {
    runtime: tokio::runtime::Runtime,
    db: Connection,
    table_name: String,
    dim: usize,
}

impl LanceVectorIndex {
    pub fn open(db_path: &Path, table_name: &str, dim: usize) -> anyhow::Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("building lancedb runtime")?;
        let db = runtime
            .block_on(connect(db_path.to_string_lossy().as_ref()).execute())
            .context("connecting to lancedb")?;
        Ok(Self { runtime, db, table_name: table_name.to_string(), dim })
    }

    fn rows_to_record_batch(
        &self,
        vectors: &[Vec<f32>],
        payloads: &[IndexPayload],
    ) -> anyhow::Result<RecordBatch> {
        let schema = build_arrow_schema(self.dim);

        let mut ids = Vec::with_capacity(payloads.len());
        let mut fragment_ids = Vec::with_capacity(payloads.len());
        let mut document_ids = Vec::with_capacity(payloads.len());
        let mut texts = Vec::with_capacity(payloads.len());
        let mut page_numbers: Vec<Option<i32>> = Vec::with_capacity(payloads.len());
        let mut rows: Vec<Option<Vec<Option<f32>>>> = Vec::with_capacity(payloads.len());

        for (vector, payload) in vectors.iter().zip(payloads.iter()) {
            anyhow::ensure!(
                vector.len() == self.dim,
                "vector dimension {} does not match table dimension {}",
                vector.len(),
                self.dim
            );
            ids.push(payload.fragment_id.to_string());
            fragment_ids.push(payload.fragment_id);
            document_ids.push(payload.document_id);
            texts.push(payload.text.clone());
            page_numbers.push(payload.page_number.map(|p| p as i32));
            rows.push(Some(vector.iter().map(|&x| Some(x)).collect()));
        }

        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(ids)),
                Arc::new(Int64Array::from(fragment_ids)),
                Arc::new(Int64Array::from(document_ids)),
                Arc::new(StringArray::from(texts)),
                Arc::new(Int32Array::from(page_numbers)),
                Arc::new(FixedSizeListArray::from_iter_primitive::<
                    arrow_array::types::Float32Type,
                    _,
                    _,
                >(rows.into_iter(), self.dim as i32)),
            ],
        )?;
        Ok(batch)
    }

    fn filter_predicate(filters: Option<&SearchFilters>) -> Option<String> {
        let filters = filters?;
        let mut clauses = Vec::new();
        if let Some(document_id) = filters.document_id {
            clauses.push(format!("document_id = {document_id}"));
        }
        if let Some(page_number) = filters.page_number {
            clauses.push(format!("page_number = {page_number}"));
        }
        if clauses.is_empty() {
            None
        } else {
            Some(clauses.join(" AND "))
        }
    }
}

impl VectorIndex for LanceVectorIndex {
    fn upsert(
        &self,
        vectors: &[Vec<f32>],
        payloads: &[IndexPayload],
    ) -> anyhow::Result<Vec<String>> {
        anyhow::ensure!(
            vectors.len() == payloads.len(),
            "vectors and payloads must have the same length"
        );
        if vectors.is_empty() {
            return Ok(Vec::new());
        }

        let batch = self.rows_to_record_batch(vectors, payloads)?;
        let schema = batch.schema();
        let keys: Vec<String> = payloads.iter().map(|p| p.fragment_id.to_string()).collect();

        self.runtime.block_on(async {
            let reader =
                Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema));
            if self.db.table_names().execute().await?.contains(&self.table_name) {
                self.db
                    .open_table(&self.table_name)
                    .execute()
                    .await?
                    .add(reader)
                    .execute()
                    .await?;
            } else {
                self.db.create_table(&self.table_name, reader).execute().await?;
            }
            anyhow::Ok(())
        })?;

        tracing::info!(rows = keys.len(), table = %self.table_name, "stored vectors");
        Ok(keys)
    }

    fn search(
        &self,
        query_vector: &[f32],
        limit: usize,
        filters: Option<&SearchFilters>,
    ) -> anyhow::Result<Vec<VectorHit>> {
        let predicate = Self::filter_predicate(filters);

        self.runtime.block_on(async {
            if !self.db.table_names().execute().await?.contains(&self.table_name) {
                return Ok(Vec::new());
            }
            let table = self.db.open_table(&self.table_name).execute().await?;

            let mut query = table.vector_search(query_vector.to_vec())?.limit(limit.max(1));
            if let Some(predicate) = predicate {
                query = query.only_if(predicate);
            }
            let mut stream = query.execute().await?;

            let mut hits = Vec::new();
            while let Some(batch) = TryStreamExt::try_next(&mut stream).await? {
                for row in 0..batch.num_rows() {
                    hits.push(hit_from_batch(&batch, row)?);
                }
            }
            Ok(hits)
        })
    }

    fn delete_by_document(&self, document_id: DocumentId) -> anyhow::Result<()> {
        self.runtime.block_on(async {
            if !self.db.table_names().execute().await?.contains(&self.table_name) {
                return Ok(());
            }
            let table = self.db.open_table(&self.table_name).execute().await?;
            table.delete(&format!("document_id = {document_id}")).await?;
            anyhow::Ok(())
        })?;
        tracing::info!(document_id, "deleted vectors");
        Ok(())
    }
}

fn hit_from_batch(batch: &RecordBatch, row: usize) -> anyhow::Result<VectorHit> {
    let fragment_id = column_i64(batch, "fragment_id", row)?;
    let document_id = column_i64(batch, "document_id", row)?;
    let text = column_str(batch, "text", row)?;

    // lancedb reports L2/cosine distance; flip it into higher-is-better.
    let score = if let Some(column) = batch.column_by_name("_distance") {
        let distances = column
            .as_any()
            .downcast_ref::<Float32Array>()
            .ok_or_else(|| anyhow::anyhow!("_distance column is not f32"))?;
        1.0 - distances.value(row)
    } else {
        0.0
    };

    let mut metadata = Meta::new();
    if let Some(column) = batch.column_by_name("page_number") {
        if let Some(pages) = column.as_any().downcast_ref::<Int32Array>() {
            if !pages.is_null(row) {
                metadata.insert("page_number".to_string(), pages.value(row).to_string());
            }
        }
    }

    Ok(VectorHit { fragment_id, document_id, text, score, metadata })
}

fn column_i64(batch: &RecordBatch, name: &str, row: usize) -> anyhow::Result<i64> {
    let column = batch
        .column_by_name(name)
        .ok_or_else(|| anyhow::anyhow!("missing column {name}"))?;
    let values = column
        .as_any()
        .downcast_ref::<Int64Array>()
        .ok_or_else(|| anyhow::anyhow!("column {name} is not i64"))?;
    Ok(values.value(row))
}

fn column_str(batch: &RecordBatch, name: &str, row: usize) -> anyhow::Result<String> {
    let column = batch
        .column_by_name(name)
        .ok_or_else(|| anyhow::anyhow!("missing column {name}"))?;
    let values = column
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| anyhow::anyhow!("column {name} is not utf8"))?;
    Ok(values.value(row).to_string())
}
