//! Store configuration with environment variable and file-based loading.
//!
//! Environment variables:
//! - `FRAGSERVE_STORE_PATH`: Base path for artifact storage
//! - `FRAGSERVE_PUBLIC_BASE`: Public URL prefix artifacts are served under
//!
//! Default path: `~/.fragserve/models`

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

/// Configuration for the artifact pair store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Base path for artifact storage. Pairs are stored flat as
    /// `{base_path}/{key}.frag` and `{base_path}/{key}.json`.
    pub base_path: PathBuf,

    /// Public URL prefix under which stored files are reachable.
    /// Returned URLs are `{public_base}/{key}.frag` etc.
    #[serde(default = "default_public_base")]
    pub public_base: String,
}

fn default_public_base() -> String {
    "/files".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_path: default_store_path(),
            public_base: default_public_base(),
        }
    }
}

/// Get the default store path (~/.fragserve/models).
fn default_store_path() -> PathBuf {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(".fragserve").join("models"))
        .unwrap_or_else(|| PathBuf::from(".fragserve/models"))
}

impl StoreConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        let base_path = env::var("FRAGSERVE_STORE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_store_path());

        let public_base = env::var("FRAGSERVE_PUBLIC_BASE").unwrap_or_else(|_| default_public_base());

        Ok(Self {
            base_path,
            public_base,
        })
    }

    /// Load configuration from a TOML file, falling back to environment.
    ///
    /// The file should contain a `[store]` section:
    /// ```toml
    /// [store]
    /// base_path = "/srv/fragserve/models"
    /// public_base = "/files"
    /// ```
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        let table: toml::Table = contents
            .parse()
            .with_context(|| format!("failed to parse TOML: {}", path.display()))?;

        if let Some(store_section) = table.get("store") {
            let config: StoreConfig = store_section
                .clone()
                .try_into()
                .context("failed to parse [store] section")?;
            Ok(config)
        } else {
            // No [store] section, fall back to env
            Self::from_env()
        }
    }

    /// Create a config with a specific base path.
    pub fn with_base_path(path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: path.into(),
            public_base: default_public_base(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = StoreConfig::default();
        assert!(config.base_path.to_string_lossy().contains(".fragserve"));
        assert_eq!(config.public_base, "/files");
    }

    #[test]
    fn test_with_base_path() {
        let config = StoreConfig::with_base_path("/custom/path");
        assert_eq!(config.base_path, PathBuf::from("/custom/path"));
        assert_eq!(config.public_base, "/files");
    }

    #[test]
    fn test_from_file_store_section() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[store]\nbase_path = \"/srv/models\"\npublic_base = \"/static\""
        )
        .unwrap();

        let config = StoreConfig::from_file(file.path()).unwrap();
        assert_eq!(config.base_path, PathBuf::from("/srv/models"));
        assert_eq!(config.public_base, "/static");
    }

    #[test]
    fn test_from_file_defaults_public_base() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[store]\nbase_path = \"/srv/models\"").unwrap();

        let config = StoreConfig::from_file(file.path()).unwrap();
        assert_eq!(config.public_base, "/files");
    }

    #[test]
    fn test_serde_roundtrip() {
        let config = StoreConfig {
            base_path: PathBuf::from("/custom/models"),
            public_base: "/assets".to_string(),
        };
        let json = serde_json::to_string(&config).unwrap();
        let restored: StoreConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config.base_path, restored.base_path);
        assert_eq!(config.public_base, restored.public_base);
    }

    #[test]
    fn test_from_env_uses_defaults() {
        env::remove_var("FRAGSERVE_STORE_PATH");
        env::remove_var("FRAGSERVE_PUBLIC_BASE");

        let config = StoreConfig::from_env().unwrap();
        assert!(config.base_path.to_string_lossy().contains(".fragserve"));
        assert_eq!(config.public_base, "/files");
    }
}
