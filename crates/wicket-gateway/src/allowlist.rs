//! User-id allowlist, loaded once at startup.

use std::collections::HashSet;
use std::path::Path;

/// Errors loading an allowlist file.
#[derive(Debug, thiserror::Error)]
pub enum AllowlistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Allowlist must be a JSON array of strings: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Set of user ids permitted to talk to the agent.
#[derive(Debug, Clone, Default)]
pub struct Allowlist {
    ids: HashSet<String>,
}

impl Allowlist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ids: ids.into_iter().map(Into::into).collect(),
        }
    }

    /// Load from a JSON array file. A missing file yields an empty list.
    pub fn from_file(path: &Path) -> Result<Self, AllowlistError> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let raw = std::fs::read_to_string(path)?;
        let ids: Vec<String> = serde_json::from_str(&raw)?;
        Ok(Self::from_ids(ids))
    }

    pub fn add(&mut self, id: impl Into<String>) {
        self.ids.insert(id.into());
    }

    pub fn has(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_membership() {
        let mut list = Allowlist::from_ids(["alice", "bob"]);
        assert!(list.has("alice"));
        assert!(!list.has("mallory"));

        list.add("mallory");
        assert!(list.has("mallory"));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("allowlist.json");
        std::fs::write(&path, r#"["u1", "u2"]"#).unwrap();

        let list = Allowlist::from_file(&path).unwrap();
        assert_eq!(list.len(), 2);
        assert!(list.has("u2"));
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        let list = Allowlist::from_file(&dir.path().join("nope.json")).unwrap();
        assert!(list.is_empty());
    }

    #[test]
    fn test_malformed_file_errors() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("allowlist.json");
        std::fs::write(&path, r#"{"not":"an array"}"#).unwrap();
        assert!(matches!(
            Allowlist::from_file(&path),
            Err(AllowlistError::Parse(_))
        ));
    }
}
