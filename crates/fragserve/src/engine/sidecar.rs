//! HTTP client for the geometry conversion sidecar.
//!
//! The sidecar exposes a small model-handle API:
//!
//! - `POST   /models`                  load bytes, returns `{"model": id}`
//! - `POST   /models/{id}/fragment`    export the binary fragment
//! - `GET    /models/{id}/properties`  export the properties document
//! - `DELETE /models/{id}`             release the loader state
//!
//! Geometry-normalization settings are fixed at construction and sent as
//! query parameters with each load.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response};
use serde::Deserialize;
use std::time::Duration;

use super::{ConversionEngine, EngineConfig, EngineError, LoadedModel};

/// Client for an out-of-process conversion engine.
pub struct SidecarEngine {
    client: Client,
    base_url: String,
    config: EngineConfig,
}

impl SidecarEngine {
    /// Create a client for the sidecar at `base_url`.
    ///
    /// Conversion time scales with model size, so only connection setup is
    /// bounded; export requests run without a client-side deadline.
    pub fn new(base_url: impl Into<String>, config: EngineConfig) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: base_url.into(),
            config,
        }
    }

    fn settings_query(&self) -> Vec<(&'static str, String)> {
        vec![
            ("exclude", self.config.excluded_categories.join(",")),
            (
                "coordinateToOrigin",
                self.config.coordinate_to_origin.to_string(),
            ),
            ("optimizeProfiles", self.config.optimize_profiles.to_string()),
            ("circleSegments", self.config.circle_segments.to_string()),
            ("spatialIndex", self.config.spatial_index.to_string()),
        ]
    }
}

#[derive(Debug, Deserialize)]
struct LoadResponse {
    model: String,
}

/// Map a non-success sidecar status to a rejection error.
async fn check(response: Response) -> Result<Response, EngineError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let detail = response.text().await.unwrap_or_default();
    Err(EngineError::Rejected(if detail.is_empty() {
        format!("engine returned status {}", status)
    } else {
        format!("engine returned status {}: {}", status, detail)
    }))
}

#[async_trait]
impl ConversionEngine for SidecarEngine {
    async fn load(&self, model: &[u8]) -> Result<Box<dyn LoadedModel>, EngineError> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .client
            .post(&url)
            .query(&self.settings_query())
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(model.to_vec())
            .send()
            .await?;

        let loaded: LoadResponse = check(response).await?.json().await?;
        tracing::debug!("sidecar loaded model {}", loaded.model);

        Ok(Box::new(SidecarModel {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            id: loaded.model,
            disposed: false,
        }))
    }
}

/// One loaded model inside the sidecar. Holds engine state until disposed.
struct SidecarModel {
    client: Client,
    base_url: String,
    id: String,
    disposed: bool,
}

#[async_trait]
impl LoadedModel for SidecarModel {
    async fn export_fragment(&mut self) -> Result<Vec<u8>, EngineError> {
        let url = format!("{}/models/{}/fragment", self.base_url, self.id);
        let response = check(self.client.post(&url).send().await?).await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn export_properties(&mut self) -> Result<serde_json::Value, EngineError> {
        let url = format!("{}/models/{}/properties", self.base_url, self.id);
        let response = check(self.client.get(&url).send().await?).await?;
        Ok(response.json().await?)
    }

    async fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;

        let url = format!("{}/models/{}", self.base_url, self.id);
        match self.client.delete(&url).send().await {
            Ok(response) if !response.status().is_success() => {
                tracing::warn!(
                    "sidecar refused to release model {}: status {}",
                    self.id,
                    response.status()
                );
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!("failed to release sidecar model {}: {}", self.id, e);
            }
        }
    }
}

impl Drop for SidecarModel {
    fn drop(&mut self) {
        // Engine-side state leaks if the handle is dropped without dispose.
        if !self.disposed {
            tracing::warn!("sidecar model {} dropped without dispose", self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_full_load_export_dispose_cycle() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/models"))
            .and(query_param("coordinateToOrigin", "true"))
            .and(query_param("circleSegments", "12"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"model": "m1"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/models/m1/fragment"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"FRAGBYTES".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/models/m1/properties"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"e1": {}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("DELETE"))
            .and(path("/models/m1"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let engine = SidecarEngine::new(server.uri(), EngineConfig::default());
        let mut model = engine.load(b"IFC...").await.unwrap();

        assert_eq!(model.export_fragment().await.unwrap(), b"FRAGBYTES");
        assert_eq!(
            model.export_properties().await.unwrap(),
            serde_json::json!({"e1": {}})
        );

        model.dispose().await;
    }

    #[tokio::test]
    async fn test_load_rejection_is_an_engine_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/models"))
            .respond_with(ResponseTemplate::new(422).set_body_string("not an IFC file"))
            .mount(&server)
            .await;

        let engine = SidecarEngine::new(server.uri(), EngineConfig::default());
        let err = engine.load(b"garbage").await.err().unwrap();

        match err {
            EngineError::Rejected(msg) => {
                assert!(msg.contains("422"));
                assert!(msg.contains("not an IFC file"));
            }
            other => panic!("expected Rejected, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_dispose_is_idempotent() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/models"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"model": "m2"})),
            )
            .mount(&server)
            .await;

        // Exactly one DELETE even when dispose is called twice.
        Mock::given(method("DELETE"))
            .and(path("/models/m2"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let engine = SidecarEngine::new(server.uri(), EngineConfig::default());
        let mut model = engine.load(b"IFC...").await.unwrap();

        model.dispose().await;
        model.dispose().await;
    }
}
