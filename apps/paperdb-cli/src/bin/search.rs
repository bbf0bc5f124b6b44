use std::env;
use std::sync::Arc;

use paperdb_core::config::{expand_path, Config};
use paperdb_core::traits::Embedder;
use paperdb_core::types::SearchFilters;
use paperdb_embed::embedder_from_settings;
use paperdb_hybrid::HybridSearchEngine;
use paperdb_text::TantivyLexicalIndex;
use paperdb_vector::LanceVectorIndex;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() {
        eprintln!("Usage: paperdb-search <query> [--limit N] [--offset N] [--weight W] [--doc ID]");
        eprintln!("Example: paperdb-search 'operating income' --limit 5 --weight 0.5");
        std::process::exit(1);
    }

    let mut query: Option<String> = None;
    let mut limit = 10usize;
    let mut offset = 0usize;
    let mut weight: Option<f32> = None;
    let mut document_id: Option<i64> = None;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--limit" => {
                limit = parse_flag(&args, i, "--limit")?;
                i += 1;
            }
            "--offset" => {
                offset = parse_flag(&args, i, "--offset")?;
                i += 1;
            }
            "--weight" => {
                weight = Some(parse_flag(&args, i, "--weight")?);
                i += 1;
            }
            "--doc" => {
                document_id = Some(parse_flag(&args, i, "--doc")?);
                i += 1;
            }
            other if !other.starts_with('-') => query = Some(other.to_string()),
            other => anyhow::bail!("unknown flag: {other}"),
        }
        i += 1;
    }
    let query = query.ok_or_else(|| anyhow::anyhow!("no query given"))?;

    let config = Config::load()?;
    let tantivy_dir: String = config
        .get("data.tantivy_index_dir")
        .unwrap_or_else(|_| "data/indexes/tantivy".to_string());
    let lancedb_dir: String = config
        .get("data.lancedb_index_dir")
        .unwrap_or_else(|_| "data/indexes/lancedb".to_string());
    let embedding = config.embedding();

    let embedder: Arc<dyn Embedder> = Arc::from(embedder_from_settings(&embedding)?);
    let lexical = Arc::new(TantivyLexicalIndex::open(&expand_path(&tantivy_dir))?);
    let vector = Arc::new(LanceVectorIndex::open(
        &expand_path(&lancedb_dir),
        "fragments",
        embedding.dimension,
    )?);

    let engine = HybridSearchEngine::new(embedder, vector, lexical)
        .with_vector_weight(config.search().vector_weight);

    let filters = document_id.map(|id| SearchFilters { document_id: Some(id), page_number: None });
    let results = engine.search(&query, limit, offset, filters.as_ref(), weight)?;

    println!("🔍 Found {} result(s) for: \"{query}\"", results.len());
    for (i, result) in results.iter().enumerate() {
        println!(
            "\n  {}. combined={:.4} (vector={:.4} keyword={:.4})  fragment={}  document={}",
            i + 1 + offset,
            result.combined_score,
            result.vector_score,
            result.keyword_score,
            result.fragment_id,
            result.document_id,
        );
        if let Some(page) = result.metadata.get("page_number") {
            println!("     📄 Page {page}");
        }
        match &result.highlighted_excerpt {
            Some(excerpt) => println!("     📝 {excerpt}"),
            None => println!("     📝 {}", preview(&result.text, 200)),
        }
    }
    Ok(())
}

fn parse_flag<T: std::str::FromStr>(args: &[String], i: usize, name: &str) -> anyhow::Result<T> {
    args.get(i + 1)
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| anyhow::anyhow!("{name} requires a value"))
}

fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{cut}…")
}
