use std::sync::Arc;
use std::{env, fs, path::Path, path::PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use walkdir::WalkDir;

use paperdb_core::config::{expand_path, Config};
use paperdb_core::fragmenter::Fragmenter;
use paperdb_core::traits::Embedder;
use paperdb_embed::embedder_from_settings;
use paperdb_ingest::{FsBlobStore, IngestOrchestrator, PdfExtractor, SqliteCatalog};
use paperdb_text::TantivyLexicalIndex;
use paperdb_vector::LanceVectorIndex;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() {
        eprintln!("Usage: paperdb-indexer <pdf-file-or-directory>...");
        std::process::exit(1);
    }

    let config = Config::load()?;
    let orchestrator = build_orchestrator(&config)?;

    let mut pdf_paths: Vec<PathBuf> = Vec::new();
    for arg in &args {
        collect_pdfs(Path::new(arg), &mut pdf_paths);
    }
    if pdf_paths.is_empty() {
        eprintln!("No PDF files found under the given paths");
        std::process::exit(1);
    }

    println!("paperdb indexer\n===============");
    println!("Found {} PDF file(s)", pdf_paths.len());

    let bar = ProgressBar::new(pdf_paths.len() as u64);
    bar.set_style(ProgressStyle::with_template(
        "{bar:40.cyan/blue} {pos}/{len} {msg}",
    )?);

    let mut completed = 0usize;
    let mut failed = 0usize;
    for path in &pdf_paths {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        bar.set_message(name.clone());

        match ingest_one(&orchestrator, path, &name) {
            Ok((id, fragments, secs)) => {
                completed += 1;
                bar.println(format!(
                    "  ✅ {name} -> document {id}, {fragments} fragments in {secs:.2}s"
                ));
            }
            Err(e) => {
                failed += 1;
                bar.println(format!("  ❌ {name}: {e:#}"));
            }
        }
        bar.inc(1);
    }
    bar.finish_and_clear();

    println!("\n📊 Ingested {completed} document(s), {failed} failure(s)");
    println!("💡 To search, use: cargo run --bin paperdb-search '<query>'");
    if failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn ingest_one(
    orchestrator: &IngestOrchestrator,
    path: &Path,
    name: &str,
) -> anyhow::Result<(i64, usize, f64)> {
    let bytes = fs::read(path)?;
    let id = orchestrator.add_document(&bytes, name)?;
    let report = orchestrator.process(id)?;
    Ok((id, report.fragment_count, report.elapsed_secs))
}

fn collect_pdfs(path: &Path, out: &mut Vec<PathBuf>) {
    if path.is_file() {
        out.push(path.to_path_buf());
        return;
    }
    for entry in WalkDir::new(path).into_iter().filter_map(|e| e.ok()) {
        let p = entry.path();
        if p.is_file() && p.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("pdf")) {
            out.push(p.to_path_buf());
        }
    }
}

fn build_orchestrator(config: &Config) -> anyhow::Result<IngestOrchestrator> {
    let blob_dir: String =
        config.get("data.blob_dir").unwrap_or_else(|_| "data/blobs".to_string());
    let catalog_path: String =
        config.get("data.catalog_path").unwrap_or_else(|_| "data/catalog.sqlite3".to_string());
    let tantivy_dir: String = config
        .get("data.tantivy_index_dir")
        .unwrap_or_else(|_| "data/indexes/tantivy".to_string());
    let lancedb_dir: String = config
        .get("data.lancedb_index_dir")
        .unwrap_or_else(|_| "data/indexes/lancedb".to_string());

    let chunking = config.chunking();
    let embedding = config.embedding();

    let embedder: Arc<dyn Embedder> = Arc::from(embedder_from_settings(&embedding)?);
    let blobs = Arc::new(FsBlobStore::open(&expand_path(&blob_dir))?);
    let catalog = Arc::new(SqliteCatalog::open(&expand_path(&catalog_path))?);
    let lexical = Arc::new(TantivyLexicalIndex::open(&expand_path(&tantivy_dir))?);
    let vector = Arc::new(LanceVectorIndex::open(
        &expand_path(&lancedb_dir),
        "fragments",
        embedding.dimension,
    )?);

    Ok(IngestOrchestrator::new(
        blobs,
        Arc::new(PdfExtractor::new()),
        Fragmenter::new(chunking.target_tokens, chunking.overlap_tokens),
        embedder,
        catalog,
        vector,
        lexical,
        embedding.batch_size,
    ))
}
