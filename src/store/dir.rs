use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info};

use super::DocumentStore;

/// Stores each document as a file in one output directory
pub struct DirStore {
    base_path: PathBuf,
}

impl DirStore {
    pub fn new(base_path: impl AsRef<Path>) -> Result<Self> {
        let base_path = base_path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path).with_context(|| {
            format!("Failed to create output directory: {}", base_path.display())
        })?;

        info!(path = %base_path.display(), "Initialized document directory");

        Ok(Self { base_path })
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.base_path.join(name)
    }
}

impl DocumentStore for DirStore {
    fn read(&self, name: &str) -> Result<Option<String>> {
        let path = self.path_for(name);
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read document: {}", path.display()))?;

        Ok(Some(content))
    }

    fn write(&self, name: &str, contents: &str) -> Result<()> {
        let path = self.path_for(name);
        fs::write(&path, contents)
            .with_context(|| format!("Failed to write document: {}", path.display()))?;

        debug!(path = %path.display(), bytes = contents.len(), "Wrote document");

        Ok(())
    }
}
