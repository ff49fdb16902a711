use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::{anyhow, Result};

use super::DocumentStore;

/// In-process store for tests and dry runs
#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of every stored document, sorted
    pub fn names(&self) -> Result<Vec<String>> {
        let docs = self
            .docs
            .read()
            .map_err(|_| anyhow!("Document store lock poisoned"))?;
        let mut names: Vec<String> = docs.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}

impl DocumentStore for MemoryStore {
    fn read(&self, name: &str) -> Result<Option<String>> {
        let docs = self
            .docs
            .read()
            .map_err(|_| anyhow!("Document store lock poisoned"))?;
        Ok(docs.get(name).cloned())
    }

    fn write(&self, name: &str, contents: &str) -> Result<()> {
        let mut docs = self
            .docs
            .write()
            .map_err(|_| anyhow!("Document store lock poisoned"))?;
        docs.insert(name.to_string(), contents.to_string());
        Ok(())
    }
}
