//! In-memory implementation of the PolicyEnforcer trait.
//!
//! Tuples live in an ordered set guarded by an async lock. When a file path is
//! configured, `save_policy` persists them as JSON, one array per section.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info};

use ta_core::domain::PolicyType;
use ta_core::errors::PolicyError;
use ta_core::repositories::PolicyEnforcer;
use ta_shared::PolicyStoreConfig;

/// On-disk layout of the persisted tuples
#[derive(Debug, Default, Serialize, Deserialize)]
struct PolicyFile {
    #[serde(default)]
    p: Vec<Vec<String>>,
    #[serde(default)]
    g: Vec<Vec<String>>,
    #[serde(default)]
    g2: Vec<Vec<String>>,
}

type Tuple = (PolicyType, Vec<String>);

/// Policy store kept in memory, optionally backed by a JSON file
pub struct MemoryPolicyStore {
    tuples: RwLock<BTreeSet<Tuple>>,
    path: Option<PathBuf>,
}

impl MemoryPolicyStore {
    /// Creates an empty store that never touches disk
    pub fn new() -> Self {
        Self {
            tuples: RwLock::new(BTreeSet::new()),
            path: None,
        }
    }

    /// Opens a file-backed store, loading any tuples already saved at `path`
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, PolicyError> {
        let path = path.into();
        let tuples = match tokio::fs::read(&path).await {
            Ok(bytes) => Self::decode(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeSet::new(),
            Err(e) => return Err(store_error(&path, e)),
        };
        info!(path = %path.display(), count = tuples.len(), "Loaded policy tuples");

        Ok(Self {
            tuples: RwLock::new(tuples),
            path: Some(path),
        })
    }

    /// Builds the store described by the configuration
    pub async fn from_config(config: &PolicyStoreConfig) -> Result<Self, PolicyError> {
        match &config.path {
            Some(path) => Self::open(path.clone()).await,
            None => Ok(Self::new()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// All tuples of one section, in sorted order
    pub async fn tuples(&self, policy_type: PolicyType) -> Vec<Vec<String>> {
        self.tuples
            .read()
            .await
            .iter()
            .filter(|(section, _)| *section == policy_type)
            .map(|(_, params)| params.clone())
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.tuples.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tuples.read().await.is_empty()
    }

    fn decode(bytes: &[u8]) -> Result<BTreeSet<Tuple>, PolicyError> {
        let file: PolicyFile = serde_json::from_slice(bytes).map_err(|e| PolicyError::Store {
            message: format!("invalid policy file: {}", e),
        })?;

        let sections = [
            (PolicyType::Policy, file.p),
            (PolicyType::Grouping, file.g),
            (PolicyType::Grouping2, file.g2),
        ];
        Ok(sections
            .into_iter()
            .flat_map(|(section, rows)| rows.into_iter().map(move |params| (section, params)))
            .filter(|(_, params)| !params.is_empty())
            .collect())
    }

    fn encode(tuples: &BTreeSet<Tuple>) -> Result<Vec<u8>, PolicyError> {
        let mut file = PolicyFile::default();
        for (section, params) in tuples {
            let rows = match section {
                PolicyType::Policy => &mut file.p,
                PolicyType::Grouping => &mut file.g,
                PolicyType::Grouping2 => &mut file.g2,
            };
            rows.push(params.clone());
        }
        serde_json::to_vec_pretty(&file).map_err(|e| PolicyError::Store {
            message: format!("failed to encode policies: {}", e),
        })
    }
}

impl Default for MemoryPolicyStore {
    fn default() -> Self {
        Self::new()
    }
}

fn store_error(path: &Path, e: std::io::Error) -> PolicyError {
    PolicyError::Store {
        message: format!("{}: {}", path.display(), e),
    }
}

#[async_trait]
impl PolicyEnforcer for MemoryPolicyStore {
    async fn has_policy(&self, policy_type: PolicyType, params: &[String]) -> Result<bool, PolicyError> {
        let tuples = self.tuples.read().await;
        Ok(tuples.contains(&(policy_type, params.to_vec())))
    }

    async fn add_policy(&self, policy_type: PolicyType, params: &[String]) -> Result<bool, PolicyError> {
        if params.is_empty() {
            return Err(PolicyError::EmptyParameters);
        }
        let mut tuples = self.tuples.write().await;
        Ok(tuples.insert((policy_type, params.to_vec())))
    }

    async fn save_policy(&self) -> Result<(), PolicyError> {
        let Some(path) = &self.path else {
            debug!("Policy store has no file; nothing to save");
            return Ok(());
        };

        // Hold the read lock so the snapshot matches what is written
        let tuples = self.tuples.read().await;
        let bytes = Self::encode(&tuples)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| store_error(parent, e))?;
        }
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(|e| store_error(&tmp, e))?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(|e| store_error(path, e))?;

        info!(path = %path.display(), count = tuples.len(), "Saved policy tuples");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[tokio::test]
    async fn test_add_and_check() {
        let store = MemoryPolicyStore::new();
        let tuple = params(&["alice", "admin", "acme"]);

        assert!(!store.has_policy(PolicyType::Grouping, &tuple).await.unwrap());
        assert!(store.add_policy(PolicyType::Grouping, &tuple).await.unwrap());
        assert!(!store.add_policy(PolicyType::Grouping, &tuple).await.unwrap());
        assert!(store.has_policy(PolicyType::Grouping, &tuple).await.unwrap());

        // Same params in another section are a different tuple
        assert!(!store.has_policy(PolicyType::Grouping2, &tuple).await.unwrap());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_empty_params_rejected() {
        let store = MemoryPolicyStore::new();
        assert_eq!(
            store.add_policy(PolicyType::Policy, &[]).await.unwrap_err(),
            PolicyError::EmptyParameters
        );
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_save_without_path_is_noop() {
        let store = MemoryPolicyStore::new();
        store
            .add_policy(PolicyType::Policy, &params(&["admin", "acme", "/", "read"]))
            .await
            .unwrap();
        store.save_policy().await.unwrap();
        assert!(store.path().is_none());
    }

    #[test]
    fn test_decode_skips_empty_rows() {
        let tuples = MemoryPolicyStore::decode(br#"{"g": [["alice", "admin", "acme"], []]}"#).unwrap();
        assert_eq!(tuples.len(), 1);

        assert!(matches!(
            MemoryPolicyStore::decode(b"not json"),
            Err(PolicyError::Store { .. })
        ));
    }
}
