//! Filesystem blob store.
//!
//! Objects are stored under a content hash prefix so re-uploads of the
//! same bytes land on distinct, collision-free names while keeping the
//! original filename readable. Paths handed out are opaque strings
//! relative to the store root.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;

use paperdb_core::traits::BlobStore;

pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn open(root: &Path) -> anyhow::Result<Self> {
        fs::create_dir_all(root)
            .with_context(|| format!("creating blob root {}", root.display()))?;
        Ok(Self { root: root.to_path_buf() })
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

impl BlobStore for FsBlobStore {
    fn put(&self, bytes: &[u8], name: &str) -> anyhow::Result<String> {
        let digest = blake3::hash(bytes).to_hex();
        let object_name = format!("{}-{}", &digest.as_str()[..16], sanitize(name));
        let target = self.resolve(&object_name);
        fs::write(&target, bytes)
            .with_context(|| format!("writing blob {}", target.display()))?;
        tracing::info!(object = %object_name, size = bytes.len(), "stored blob");
        Ok(object_name)
    }

    fn fetch(&self, path: &str) -> anyhow::Result<Vec<u8>> {
        let source = self.resolve(path);
        fs::read(&source).with_context(|| format!("reading blob {}", source.display()))
    }

    fn delete(&self, path: &str) -> anyhow::Result<()> {
        let target = self.resolve(path);
        fs::remove_file(&target)
            .with_context(|| format!("deleting blob {}", target.display()))?;
        tracing::info!(object = path, "deleted blob");
        Ok(())
    }
}

/// Keep filenames path-safe: no separators or parent components.
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect()
}
