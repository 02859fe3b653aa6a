//! The external document directory: resolves a document reference for the
//! link-document operation. The engine never stores payload bytes, only
//! `{reference, display_name}` pairs, so this is the whole contract.

use std::collections::HashMap;

use async_trait::async_trait;

use signet_core::EngineError;

/// Metadata the directory returns for a resolvable reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub reference: String,
    pub display_name: String,
}

/// External collaborator resolving document references.
#[async_trait]
pub trait DocumentDirectory: Send + Sync + 'static {
    /// Resolve a reference, or `NotFound` if it does not exist.
    async fn resolve(&self, reference: &str) -> Result<DirectoryEntry, EngineError>;
}

/// Fixed-map directory for tests and demos.
#[derive(Debug, Default)]
pub struct StaticDirectory {
    entries: HashMap<String, String>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, reference: impl Into<String>, display_name: impl Into<String>) -> Self {
        self.entries.insert(reference.into(), display_name.into());
        self
    }
}

#[async_trait]
impl DocumentDirectory for StaticDirectory {
    async fn resolve(&self, reference: &str) -> Result<DirectoryEntry, EngineError> {
        self.entries
            .get(reference)
            .map(|display_name| DirectoryEntry {
                reference: reference.to_string(),
                display_name: display_name.clone(),
            })
            .ok_or_else(|| EngineError::NotFound(format!("document reference '{}'", reference)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_directory_resolves_known_references() {
        let dir = StaticDirectory::new().with_entry("SOP-042", "Cleaning SOP");
        let entry = dir.resolve("SOP-042").await.unwrap();
        assert_eq!(entry.display_name, "Cleaning SOP");
        assert!(matches!(
            dir.resolve("SOP-999").await,
            Err(EngineError::NotFound(_))
        ));
    }
}
