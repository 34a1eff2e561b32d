//! FragmentStore: filesystem-backed artifact pair storage.
//!
//! One logical model maps to exactly two files sharing a cache key:
//!
//! ```text
//! {base_path}/
//! ├── 5c735d76fe3537a0f35cf4a4eb14a532.frag   # binary fragment payload
//! └── 5c735d76fe3537a0f35cf4a4eb14a532.json   # properties document
//! ```
//!
//! A pair counts as present only when both files exist. Every read path in
//! this module enforces that rule; a stray single file is reported absent
//! and gets overwritten on the next conversion.

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::config::StoreConfig;
use crate::key::CacheKey;

/// Errors from the underlying filesystem.
///
/// Not-found is never an error here; these are real I/O failures
/// (permissions, disk full). Messages carry no filesystem paths since they
/// end up in client-visible envelopes.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage {op} failed: {source}")]
    Io {
        op: &'static str,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    fn io(op: &'static str, source: std::io::Error) -> Self {
        Self::Io { op, source }
    }
}

/// Existence of the two files making up an artifact pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairStatus {
    pub fragment: bool,
    pub properties: bool,
}

impl PairStatus {
    /// A pair is present only when both files exist.
    pub fn complete(&self) -> bool {
        self.fragment && self.properties
    }
}

/// Public URLs for one artifact pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactUrls {
    pub fragment: String,
    pub properties: String,
}

/// Filesystem-backed store for fragment/properties pairs.
#[derive(Debug, Clone)]
pub struct FragmentStore {
    config: StoreConfig,
}

impl FragmentStore {
    /// Create a new store with the given configuration.
    ///
    /// Creates the base directory if it doesn't exist.
    pub fn new(config: StoreConfig) -> Result<Self, StoreError> {
        std::fs::create_dir_all(&config.base_path)
            .map_err(|e| StoreError::io("directory create", e))?;
        Ok(Self { config })
    }

    /// Create a store at a specific path.
    pub fn at_path(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        Self::new(StoreConfig::with_base_path(path))
    }

    /// Get the configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Path of the fragment payload for a key.
    pub fn fragment_path(&self, key: &CacheKey) -> PathBuf {
        self.config.base_path.join(key.fragment_file_name())
    }

    /// Path of the properties document for a key.
    pub fn properties_path(&self, key: &CacheKey) -> PathBuf {
        self.config.base_path.join(key.properties_file_name())
    }

    /// Check which of the two files exist for a key.
    ///
    /// The two checks are independent and run concurrently. Not-found is a
    /// normal boolean outcome, not an error.
    pub async fn status(&self, key: &CacheKey) -> Result<PairStatus, StoreError> {
        let (fragment, properties) = tokio::join!(
            tokio::fs::try_exists(self.fragment_path(key)),
            tokio::fs::try_exists(self.properties_path(key)),
        );

        Ok(PairStatus {
            fragment: fragment.map_err(|e| StoreError::io("existence check", e))?,
            properties: properties.map_err(|e| StoreError::io("existence check", e))?,
        })
    }

    /// Public URLs for a key. Pure function of key + configured base, no I/O.
    pub fn urls_for(&self, key: &CacheKey) -> ArtifactUrls {
        let base = self.config.public_base.trim_end_matches('/');
        ArtifactUrls {
            fragment: format!("{}/{}", base, key.fragment_file_name()),
            properties: format!("{}/{}", base, key.properties_file_name()),
        }
    }

    /// Write both files of a pair.
    ///
    /// Each file is written to a uniquely-named temp file and published with
    /// a rename, so a reader never observes a half-written file. If the
    /// second write fails the pair is left incomplete and read paths report
    /// it absent; the store does not retry.
    pub async fn write_pair(
        &self,
        key: &CacheKey,
        fragment: &[u8],
        properties: &[u8],
    ) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.config.base_path)
            .await
            .map_err(|e| StoreError::io("directory create", e))?;

        self.publish(self.fragment_path(key), fragment).await?;
        self.publish(self.properties_path(key), properties).await?;
        Ok(())
    }

    /// Whole-file replacement: write to a temp file, then rename into place.
    async fn publish(&self, target: PathBuf, data: &[u8]) -> Result<(), StoreError> {
        let tmp = self
            .config
            .base_path
            .join(format!(".{}.tmp", Uuid::new_v4()));

        tokio::fs::write(&tmp, data)
            .await
            .map_err(|e| StoreError::io("write", e))?;

        if let Err(e) = tokio::fs::rename(&tmp, &target).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(StoreError::io("publish", e));
        }
        Ok(())
    }

    /// Read the fragment payload. `Ok(None)` if the file doesn't exist.
    pub async fn read_fragment(&self, key: &CacheKey) -> Result<Option<Vec<u8>>, StoreError> {
        Self::read_optional(self.fragment_path(key)).await
    }

    /// Read the properties document. `Ok(None)` if the file doesn't exist.
    pub async fn read_properties(&self, key: &CacheKey) -> Result<Option<Vec<u8>>, StoreError> {
        Self::read_optional(self.properties_path(key)).await
    }

    async fn read_optional(path: PathBuf) -> Result<Option<Vec<u8>>, StoreError> {
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::io("read", e)),
        }
    }

    /// List every key with a complete pair on disk.
    ///
    /// Keys with only one of the two files are skipped, same as every other
    /// read path.
    pub async fn keys(&self) -> Result<Vec<CacheKey>, StoreError> {
        let mut dir = tokio::fs::read_dir(&self.config.base_path)
            .await
            .map_err(|e| StoreError::io("scan", e))?;

        let mut keys = Vec::new();
        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|e| StoreError::io("scan", e))?
        {
            let name = entry.file_name();
            let Some(stem) = name.to_str().and_then(|n| n.strip_suffix(".frag")) else {
                continue;
            };
            let Ok(key) = CacheKey::from_str_checked(stem) else {
                continue;
            };
            if self.status(&key).await?.complete() {
                keys.push(key);
            }
        }

        keys.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        Ok(keys)
    }
}
