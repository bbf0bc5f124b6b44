//! Document ingestion: blob storage, PDF extraction, the SQLite catalog
//! and the orchestrator tying them to the index adapters.

#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod catalog;
pub mod extract;
pub mod orchestrator;
pub mod storage;

pub use catalog::SqliteCatalog;
pub use extract::PdfExtractor;
pub use orchestrator::{IngestOrchestrator, IngestReport};
pub use storage::FsBlobStore;
