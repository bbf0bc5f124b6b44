//! Configuration loader and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `PAPERDB_*`
//! env vars, plus typed views over the sections the pipeline cares about.
//! Helpers expand `~` and `${VAR}` and resolve relative paths against a
//! known base directory.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

use crate::fragmenter::{DEFAULT_OVERLAP_TOKENS, DEFAULT_TARGET_TOKENS};

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("PAPERDB_").split("__"));

        Ok(Self { figment })
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    pub fn chunking(&self) -> ChunkingSettings {
        self.get("chunking").unwrap_or_default()
    }

    pub fn embedding(&self) -> EmbeddingSettings {
        self.get("embedding").unwrap_or_default()
    }

    pub fn search(&self) -> SearchSettings {
        self.get("search").unwrap_or_default()
    }
}

/// Fragmenter sizing knobs, in estimated tokens.
#[derive(Debug, Clone, Deserialize)]
pub struct ChunkingSettings {
    #[serde(default = "default_target_tokens")]
    pub target_tokens: usize,
    #[serde(default = "default_overlap_tokens")]
    pub overlap_tokens: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            target_tokens: DEFAULT_TARGET_TOKENS,
            overlap_tokens: DEFAULT_OVERLAP_TOKENS,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingSettings {
    #[serde(default = "default_dimension")]
    pub dimension: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default)]
    pub model_dir: Option<String>,
    /// Use the deterministic hashing embedder instead of the model.
    #[serde(default)]
    pub use_hash_embedder: bool,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            dimension: default_dimension(),
            batch_size: default_batch_size(),
            model_dir: None,
            use_hash_embedder: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchSettings {
    #[serde(default = "default_vector_weight")]
    pub vector_weight: f32,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self { vector_weight: default_vector_weight() }
    }
}

fn default_target_tokens() -> usize {
    DEFAULT_TARGET_TOKENS
}

fn default_overlap_tokens() -> usize {
    DEFAULT_OVERLAP_TOKENS
}

fn default_dimension() -> usize {
    1024
}

fn default_batch_size() -> usize {
    32
}

fn default_vector_weight() -> f32 {
    0.7
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after
/// expansion. Absolute paths are returned as-is.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() {
        p
    } else {
        base.join(p)
    }
}
