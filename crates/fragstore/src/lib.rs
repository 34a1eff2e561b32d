//! Artifact pair storage for fragserve.
//!
//! Maps a logical building-model name to a stable cache key and stores the
//! derived artifacts — a binary fragment payload plus a JSON properties
//! document — as a two-file pair on the local filesystem.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use fragstore::{CacheKey, FragmentStore, StoreConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = FragmentStore::new(StoreConfig::from_env()?)?;
//!
//! let key = CacheKey::derive("office-tower.ifc")?;
//! if store.status(&key).await?.complete() {
//!     let urls = store.urls_for(&key);
//!     println!("cached at {}", urls.fragment);
//! } else {
//!     store.write_pair(&key, b"...fragment...", b"{}").await?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Consistency
//!
//! A pair is present only when both files exist. Writers publish each file
//! with a temp-file rename; readers treat a lone `.frag` or `.json` as
//! absent, so a failed write degrades to "regenerate next time", never to a
//! half-valid cache hit.

pub mod config;
pub mod key;
pub mod store;

// Re-exports for convenience
pub use config::StoreConfig;
pub use key::{CacheKey, KeyError};
pub use store::{ArtifactUrls, FragmentStore, PairStatus, StoreError};
