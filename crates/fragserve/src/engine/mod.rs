//! Conversion engine collaborator interface.
//!
//! The geometry engine that turns raw IFC bytes into a fragment payload and
//! a properties document lives outside this service. The orchestrator only
//! needs the narrow contract below: load bytes into a per-call model
//! handle, export the two artifacts, then dispose the handle. Loader state
//! is stateful per call and must be released on every exit path; a handle
//! is never shared across concurrent conversions.

pub mod sidecar;

pub use sidecar::SidecarEngine;

use async_trait::async_trait;
use thiserror::Error;

/// Fixed engine configuration, set once at construction. Not per-request.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// IFC categories skipped during geometry export.
    pub excluded_categories: Vec<String>,
    /// Translate model geometry so it starts at the origin.
    pub coordinate_to_origin: bool,
    /// Merge repeated extrusion profiles.
    pub optimize_profiles: bool,
    /// Segment count used when tessellating circles.
    pub circle_segments: u32,
    /// Build a spatial index during export.
    pub spatial_index: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            excluded_categories: vec!["IFCSPACE".to_string(), "IFCOPENINGELEMENT".to_string()],
            coordinate_to_origin: true,
            optimize_profiles: true,
            circle_segments: 12,
            spatial_index: true,
        }
    }
}

/// Errors from the conversion engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("conversion engine unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("conversion engine rejected model: {0}")]
    Rejected(String),
}

/// The external conversion engine, consumed as an opaque collaborator.
#[async_trait]
pub trait ConversionEngine: Send + Sync {
    /// Load raw model bytes, returning a stateful per-call handle.
    async fn load(&self, model: &[u8]) -> Result<Box<dyn LoadedModel>, EngineError>;
}

/// A loaded model inside the engine. Must be disposed after export.
#[async_trait]
pub trait LoadedModel: Send {
    /// Export the compact binary fragment representation.
    async fn export_fragment(&mut self) -> Result<Vec<u8>, EngineError>;

    /// Export the element-id → attributes properties document.
    async fn export_properties(&mut self) -> Result<serde_json::Value, EngineError>;

    /// Release engine-side state for this model. Safe to call once on any
    /// exit path; never fails, at most logs.
    async fn dispose(&mut self);
}

#[cfg(test)]
pub mod testing {
    //! Scripted engine double with invocation counters.

    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Debug, Default)]
    pub struct EngineCalls {
        pub loads: AtomicUsize,
        pub disposes: AtomicUsize,
    }

    impl EngineCalls {
        pub fn loads(&self) -> usize {
            self.loads.load(Ordering::SeqCst)
        }

        pub fn disposes(&self) -> usize {
            self.disposes.load(Ordering::SeqCst)
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum MockMode {
        Succeed,
        FailLoad,
        FailExport,
    }

    pub struct MockEngine {
        pub calls: Arc<EngineCalls>,
        fragment: Vec<u8>,
        properties: serde_json::Value,
        mode: MockMode,
    }

    impl MockEngine {
        pub fn returning(fragment: &[u8], properties: serde_json::Value) -> Self {
            Self {
                calls: Arc::new(EngineCalls::default()),
                fragment: fragment.to_vec(),
                properties,
                mode: MockMode::Succeed,
            }
        }

        pub fn failing(mode: MockMode) -> Self {
            Self {
                calls: Arc::new(EngineCalls::default()),
                fragment: Vec::new(),
                properties: serde_json::Value::Null,
                mode,
            }
        }
    }

    #[async_trait]
    impl ConversionEngine for MockEngine {
        async fn load(&self, _model: &[u8]) -> Result<Box<dyn LoadedModel>, EngineError> {
            self.calls.loads.fetch_add(1, Ordering::SeqCst);
            if self.mode == MockMode::FailLoad {
                return Err(EngineError::Rejected("malformed model".to_string()));
            }
            Ok(Box::new(MockModel {
                calls: self.calls.clone(),
                fragment: self.fragment.clone(),
                properties: self.properties.clone(),
                mode: self.mode,
            }))
        }
    }

    struct MockModel {
        calls: Arc<EngineCalls>,
        fragment: Vec<u8>,
        properties: serde_json::Value,
        mode: MockMode,
    }

    #[async_trait]
    impl LoadedModel for MockModel {
        async fn export_fragment(&mut self) -> Result<Vec<u8>, EngineError> {
            if self.mode == MockMode::FailExport {
                return Err(EngineError::Rejected("export blew up".to_string()));
            }
            Ok(self.fragment.clone())
        }

        async fn export_properties(&mut self) -> Result<serde_json::Value, EngineError> {
            Ok(self.properties.clone())
        }

        async fn dispose(&mut self) {
            self.calls.disposes.fetch_add(1, Ordering::SeqCst);
        }
    }
}
