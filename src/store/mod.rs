pub mod dir;
pub mod memory;

pub use dir::DirStore;
pub use memory::MemoryStore;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Trait for harvested document persistence backends
pub trait DocumentStore: Send + Sync {
    /// Read a document by name, `None` if it was never written
    fn read(&self, name: &str) -> Result<Option<String>>;

    /// Replace a document wholesale
    fn write(&self, name: &str, contents: &str) -> Result<()>;
}

/// The per-app documents a harvest run produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    AppInfo,
    Reviews,
    Criteria,
    Permissions,
    DataSafety,
}

impl Artifact {
    pub fn file_name(self, app_id: &str) -> String {
        let prefix = match self {
            Artifact::AppInfo => "AppInfo",
            Artifact::Reviews => "Reviews",
            Artifact::Criteria => "Criterias",
            Artifact::Permissions => "Permissions",
            Artifact::DataSafety => "DataSafety",
        };
        format!("{}_{}.json", prefix, app_id)
    }
}

/// Load and parse a JSON document
pub fn load_json<T: DeserializeOwned>(store: &impl DocumentStore, name: &str) -> Result<Option<T>> {
    match store.read(name)? {
        Some(content) => {
            let value = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse document: {}", name))?;
            Ok(Some(value))
        }
        None => Ok(None),
    }
}

/// Serialize with a 4-space indent and overwrite the document
pub fn save_json<T: Serialize + ?Sized>(store: &impl DocumentStore, name: &str, value: &T) -> Result<()> {
    let content = to_pretty_json(value)?;
    store.write(name, &content)
}

pub fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value
        .serialize(&mut serializer)
        .context("Failed to serialize document")?;
    String::from_utf8(buf).context("Serialized document is not valid UTF-8")
}
