use std::path::{Component, Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::domain::entities::error::BackendError;
use crate::usecase::ports::backend::ObjectStore;

/// Object store rooted at a local directory; URLs are `file://` paths.
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)
            .with_context(|| format!("failed to create storage dir: {}", root.display()))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path);
        let escapes = relative
            .components()
            .any(|component| !matches!(component, Component::Normal(_)));
        if path.is_empty() || escapes {
            bail!("invalid object path: {path}");
        }
        Ok(self.root.join(relative))
    }

    fn write(&self, path: &str, bytes: &[u8]) -> Result<String> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create dir: {}", parent.display()))?;
        }
        std::fs::write(&target, bytes)
            .with_context(|| format!("failed to write object: {}", target.display()))?;
        Ok(path.to_string())
    }
}

impl ObjectStore for FsObjectStore {
    fn put(&self, path: &str, bytes: &[u8], content_type: &str) -> Result<String, BackendError> {
        let stored = self.write(path, bytes)?;
        log::info!("stored {} bytes ({content_type}) at {stored}", bytes.len());
        Ok(stored)
    }

    fn public_url(&self, path: &str) -> String {
        format!("file://{}", self.root.join(path).display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_paths_leaving_the_root() {
        let root = std::env::temp_dir().join("intool-store-escape");
        let store = FsObjectStore::new(&root).expect("should create store");
        assert!(store.put("../outside.pdf", b"%PDF-", "application/pdf").is_err());
        assert!(store.put("/abs.pdf", b"%PDF-", "application/pdf").is_err());
        std::fs::remove_dir_all(&root).ok();
    }
}
