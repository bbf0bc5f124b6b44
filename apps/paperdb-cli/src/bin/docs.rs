use std::env;
use std::sync::Arc;

use paperdb_core::config::{expand_path, Config};
use paperdb_core::fragmenter::Fragmenter;
use paperdb_core::traits::{Catalog, Embedder};
use paperdb_embed::embedder_from_settings;
use paperdb_ingest::{FsBlobStore, IngestOrchestrator, PdfExtractor, SqliteCatalog};
use paperdb_text::TantivyLexicalIndex;
use paperdb_vector::LanceVectorIndex;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let usage = "Usage: paperdb-docs status <id> | delete <id>";
    let (command, id) = match (args.first().map(String::as_str), args.get(1)) {
        (Some(cmd @ ("status" | "delete")), Some(raw)) => match raw.parse::<i64>() {
            Ok(id) => (cmd, id),
            Err(_) => {
                eprintln!("{usage}");
                std::process::exit(1);
            }
        },
        _ => {
            eprintln!("{usage}");
            std::process::exit(1);
        }
    };

    let config = Config::load()?;
    let catalog_path: String =
        config.get("data.catalog_path").unwrap_or_else(|_| "data/catalog.sqlite3".to_string());
    let catalog = Arc::new(SqliteCatalog::open(&expand_path(&catalog_path))?);

    match command {
        "status" => {
            let Some(doc) = catalog.document(id)? else {
                eprintln!("Document {id} not found");
                std::process::exit(1);
            };
            println!("Document {}", doc.id);
            println!("  filename:   {}", doc.filename);
            if let Some(title) = &doc.title {
                println!("  title:      {title}");
            }
            println!("  status:     {}", doc.status.as_str());
            if let Some(message) = &doc.error_message {
                println!("  error:      {message}");
            }
            if let Some(pages) = doc.page_count {
                println!("  pages:      {pages}");
            }
            println!("  fragments:  {}", doc.chunk_count);
            if let Some(secs) = doc.processing_time_secs {
                println!("  processed in {secs:.2}s");
            }
            println!("  created at: {}", doc.created_at.to_rfc3339());
        }
        "delete" => {
            let orchestrator = build_orchestrator(&config, catalog)?;
            orchestrator.delete_document(id)?;
            println!("🗑️  Deleted document {id}");
        }
        _ => unreachable!(),
    }
    Ok(())
}

fn build_orchestrator(
    config: &Config,
    catalog: Arc<SqliteCatalog>,
) -> anyhow::Result<IngestOrchestrator> {
    let blob_dir: String =
        config.get("data.blob_dir").unwrap_or_else(|_| "data/blobs".to_string());
    let tantivy_dir: String = config
        .get("data.tantivy_index_dir")
        .unwrap_or_else(|_| "data/indexes/tantivy".to_string());
    let lancedb_dir: String = config
        .get("data.lancedb_index_dir")
        .unwrap_or_else(|_| "data/indexes/lancedb".to_string());

    let chunking = config.chunking();
    let embedding = config.embedding();

    let embedder: Arc<dyn Embedder> = Arc::from(embedder_from_settings(&embedding)?);
    Ok(IngestOrchestrator::new(
        Arc::new(FsBlobStore::open(&expand_path(&blob_dir))?),
        Arc::new(PdfExtractor::new()),
        Fragmenter::new(chunking.target_tokens, chunking.overlap_tokens),
        embedder,
        catalog,
        Arc::new(LanceVectorIndex::open(
            &expand_path(&lancedb_dir),
            "fragments",
            embedding.dimension,
        )?),
        Arc::new(TantivyLexicalIndex::open(&expand_path(&tantivy_dir))?),
        embedding.batch_size,
    ))
}
