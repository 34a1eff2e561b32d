//! Conversion orchestration.
//!
//! Given a cache key and a model source, produce the artifact pair: check
//! the store first, fetch remote bytes if needed, run the engine once, and
//! persist both files. Repeated requests for a converted key cost two
//! existence checks and nothing else.

use std::sync::Arc;

use fragstore::{ArtifactUrls, CacheKey, FragmentStore};

use crate::engine::{ConversionEngine, EngineError, LoadedModel};
use crate::error::ConvertError;

/// Where the raw model bytes come from. Upload and URL-fetch are the same
/// pipeline with a different head.
#[derive(Debug)]
pub enum ModelSource {
    /// Bytes already received in the request body.
    Inline(Vec<u8>),
    /// Remote URL to fetch the model from.
    Remote(String),
}

/// Runs conversions and persists their results.
pub struct Orchestrator {
    store: Arc<FragmentStore>,
    engine: Arc<dyn ConversionEngine>,
    http: reqwest::Client,
}

impl Orchestrator {
    pub fn new(store: Arc<FragmentStore>, engine: Arc<dyn ConversionEngine>) -> Self {
        Self {
            store,
            engine,
            http: reqwest::Client::new(),
        }
    }

    /// Convert a model and store its artifact pair, returning public URLs.
    ///
    /// Short-circuits before any fetch or conversion when a complete pair
    /// already exists; a partial pair does not count and gets regenerated.
    /// Single-shot: no internal retries. Callers may retry freely — a
    /// successful first conversion makes every retry a cache hit.
    ///
    /// No per-key locking: two concurrent calls for the same cold key both
    /// convert and the last complete pair wins.
    pub async fn convert_and_store(
        &self,
        key: &CacheKey,
        source: ModelSource,
    ) -> Result<ArtifactUrls, ConvertError> {
        if self.store.status(key).await?.complete() {
            tracing::debug!("cache hit for {}", key);
            return Ok(self.store.urls_for(key));
        }

        let model_bytes = match source {
            ModelSource::Inline(bytes) => bytes,
            ModelSource::Remote(url) => self.fetch_source(&url).await?,
        };

        tracing::info!("converting model {} ({} bytes)", key, model_bytes.len());
        let mut model = self.engine.load(&model_bytes).await?;

        // The loader holds engine state; release it on every exit path.
        let exported = export(model.as_mut()).await;
        model.dispose().await;
        let (fragment, properties) = exported?;

        let properties_json = serde_json::to_vec(&properties)?;
        self.store
            .write_pair(key, &fragment, &properties_json)
            .await?;
        tracing::info!(
            "stored pair for {} ({} fragment bytes)",
            key,
            fragment.len()
        );

        Ok(self.store.urls_for(key))
    }

    /// Fetch model bytes from a remote URL. Network errors and non-success
    /// statuses are fatal for the request; nothing is written.
    async fn fetch_source(&self, url: &str) -> Result<Vec<u8>, ConvertError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| ConvertError::SourceFetch(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ConvertError::SourceFetch(format!(
                "source returned status {}",
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ConvertError::SourceFetch(e.to_string()))?;

        tracing::debug!("fetched {} source bytes from {}", bytes.len(), url);
        Ok(bytes.to_vec())
    }
}

async fn export(
    model: &mut dyn LoadedModel,
) -> Result<(Vec<u8>, serde_json::Value), EngineError> {
    let fragment = model.export_fragment().await?;
    let properties = model.export_properties().await?;
    Ok((fragment, properties))
}
