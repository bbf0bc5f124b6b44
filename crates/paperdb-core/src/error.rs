use thiserror::Error;

/// Pipeline-wide error taxonomy.
///
/// Each variant maps to one stage of document processing so the
/// orchestrator can match on the failure kind instead of inspecting
/// opaque messages. The wrapped string carries the collaborator's
/// original message untouched.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("extraction failed: {0}")]
    Extraction(String),

    #[error("embedding failed: {0}")]
    Embedding(String),

    #[error("index write failed: {0}")]
    IndexWrite(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("catalog error: {0}")]
    Catalog(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("not found: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
