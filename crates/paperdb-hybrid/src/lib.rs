//! Hybrid ranking: per-source score normalization, weighted fusion, and
//! the query facade that drives both index collaborators.

pub mod engine;
pub mod fusion;

pub use engine::{HybridSearchEngine, DEFAULT_VECTOR_WEIGHT};
pub use fusion::{fuse, min_max_normalize};
