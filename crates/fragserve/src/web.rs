//! Web endpoints for fragserve.
//!
//! Three logical operations over one artifact store: check/fetch a cached
//! pair by name, upload an already-produced pair verbatim, and convert a
//! source model (inline upload or remote URL). Every route answers with the
//! same envelope: a success flag plus URLs, or an error string.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{rejection::JsonRejection, DefaultBodyLimit, Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio_util::io::ReaderStream;

use crate::convert::{ModelSource, Orchestrator};
use crate::error::ConvertError;
use fragstore::{ArtifactUrls, CacheKey, FragmentStore};

/// Shared state for web handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<FragmentStore>,
    pub orchestrator: Arc<Orchestrator>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(serve_root))
        .route("/health", get(health))
        .route("/api/fragments", get(list_models))
        .route("/api/fragments/{name}", get(check_model).post(upload_model))
        .route("/api/convert-ifc", post(convert_from_url))
        .route("/api/convert-ifc/{name}", post(convert_from_upload))
        .route("/files/{file}", get(serve_file))
        // Building models routinely exceed axum's 2 MB default body cap.
        .layer(DefaultBodyLimit::max(1024 * 1024 * 1024))
        .with_state(state)
}

/// Uniform response envelope shared by every API route.
#[derive(Debug, Serialize)]
pub struct Envelope {
    pub success: bool,
    #[serde(rename = "fragUrl", skip_serializing_if = "Option::is_none")]
    pub frag_url: Option<String>,
    #[serde(rename = "jsonUrl", skip_serializing_if = "Option::is_none")]
    pub json_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Envelope {
    fn found(urls: ArtifactUrls) -> Self {
        Self {
            success: true,
            frag_url: Some(urls.fragment),
            json_url: Some(urls.properties),
            error: None,
        }
    }

    /// Negative Check result: a successful check, not an error.
    fn missing() -> Self {
        Self {
            success: false,
            frag_url: None,
            json_url: None,
            error: None,
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            frag_url: None,
            json_url: None,
            error: Some(message.into()),
        }
    }
}

impl IntoResponse for ConvertError {
    fn into_response(self) -> Response {
        tracing::warn!("request failed: {}", self);
        (self.status_code(), Json(Envelope::failure(self.to_string()))).into_response()
    }
}

/// Serve root discovery endpoint
async fn serve_root() -> impl IntoResponse {
    let links = serde_json::json!({
        "name": "fragserve",
        "version": env!("CARGO_PKG_VERSION"),
        "links": {
            "fragments": "/api/fragments",
            "convert": "/api/convert-ifc",
            "health": "/health",
        }
    });
    Json(links)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Check whether a model's artifact pair is cached, returning its URLs.
#[tracing::instrument(name = "http.fragments.check", skip(state))]
async fn check_model(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Envelope>, ConvertError> {
    let key = CacheKey::derive(&name)?;
    let status = state.store.status(&key).await?;

    if status.complete() {
        Ok(Json(Envelope::found(state.store.urls_for(&key))))
    } else {
        Ok(Json(Envelope::missing()))
    }
}

/// Store an already-produced fragment + properties pair verbatim.
///
/// Multipart parts: `frag` (binary fragment) and `json` (properties
/// document). Both are required; nothing is written when either is absent.
#[tracing::instrument(name = "http.fragments.upload", skip(state, multipart))]
async fn upload_model(
    State(state): State<AppState>,
    Path(name): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<Envelope>, ConvertError> {
    let key = CacheKey::derive(&name)?;

    let mut fragment: Option<Vec<u8>> = None;
    let mut properties: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ConvertError::MissingInput(format!("malformed multipart body: {}", e)))?
    {
        let field_name = field.name().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| ConvertError::MissingInput(format!("malformed multipart body: {}", e)))?;

        match field_name.as_deref() {
            Some("frag") => fragment = Some(data.to_vec()),
            Some("json") => properties = Some(data.to_vec()),
            _ => continue,
        }
    }

    let fragment =
        fragment.ok_or_else(|| ConvertError::MissingInput("fragment file (frag)".to_string()))?;
    let properties =
        properties.ok_or_else(|| ConvertError::MissingInput("properties file (json)".to_string()))?;

    state.store.write_pair(&key, &fragment, &properties).await?;
    tracing::info!("uploaded pair for {} as {}", name, key);

    Ok(Json(Envelope::found(state.store.urls_for(&key))))
}

/// Request body for URL-sourced conversion.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConvertRequest {
    filename: Option<String>,
    source_url: Option<String>,
}

/// Convert a model fetched from a remote URL.
#[tracing::instrument(name = "http.convert.url", skip(state, payload))]
async fn convert_from_url(
    State(state): State<AppState>,
    payload: Result<Json<ConvertRequest>, JsonRejection>,
) -> Result<Json<Envelope>, ConvertError> {
    let Json(request) = payload
        .map_err(|e| ConvertError::MissingInput(format!("invalid JSON body: {}", e.body_text())))?;

    let filename = request
        .filename
        .ok_or_else(|| ConvertError::MissingInput("filename".to_string()))?;
    let source_url = request
        .source_url
        .ok_or_else(|| ConvertError::MissingInput("sourceUrl".to_string()))?;

    let key = CacheKey::derive(&filename)?;
    let urls = state
        .orchestrator
        .convert_and_store(&key, ModelSource::Remote(source_url))
        .await?;

    Ok(Json(Envelope::found(urls)))
}

/// Convert a model uploaded inline as a multipart file.
#[tracing::instrument(name = "http.convert.upload", skip(state, multipart))]
async fn convert_from_upload(
    State(state): State<AppState>,
    Path(name): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<Envelope>, ConvertError> {
    let key = CacheKey::derive(&name)?;

    // Only one source model is meaningful; take the first part with data.
    let mut source: Option<Vec<u8>> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ConvertError::MissingInput(format!("malformed multipart body: {}", e)))?
    {
        let data = field
            .bytes()
            .await
            .map_err(|e| ConvertError::MissingInput(format!("malformed multipart body: {}", e)))?;
        if !data.is_empty() && source.is_none() {
            source = Some(data.to_vec());
        }
    }

    let bytes = source.ok_or_else(|| ConvertError::MissingInput("source model file".to_string()))?;
    let urls = state
        .orchestrator
        .convert_and_store(&key, ModelSource::Inline(bytes))
        .await?;

    Ok(Json(Envelope::found(urls)))
}

/// Summary of one cached model for the listing endpoint.
#[derive(Serialize)]
struct ModelSummary {
    key: String,
    #[serde(rename = "fragUrl")]
    frag_url: String,
    #[serde(rename = "jsonUrl")]
    json_url: String,
}

/// List every complete artifact pair in the store.
#[tracing::instrument(name = "http.fragments.list", skip(state))]
async fn list_models(
    State(state): State<AppState>,
) -> Result<Json<Vec<ModelSummary>>, ConvertError> {
    let keys = state.store.keys().await?;

    let models = keys
        .into_iter()
        .map(|key| {
            let urls = state.store.urls_for(&key);
            ModelSummary {
                key: key.into_inner(),
                frag_url: urls.fragment,
                json_url: urls.properties,
            }
        })
        .collect();

    Ok(Json(models))
}

/// Stream a stored artifact file.
///
/// Fragments go out as opaque octet streams, properties as JSON. The pair
/// rule applies on this read path too: a file whose sibling is missing is
/// not served.
#[tracing::instrument(name = "http.files.get", skip(state))]
async fn serve_file(State(state): State<AppState>, Path(file): Path<String>) -> Response {
    let (stem, content_type) = if let Some(stem) = file.strip_suffix(".frag") {
        (stem, "application/octet-stream")
    } else if let Some(stem) = file.strip_suffix(".json") {
        (stem, "application/json")
    } else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let key = match CacheKey::from_str_checked(stem) {
        Ok(key) => key,
        Err(_) => return StatusCode::NOT_FOUND.into_response(),
    };

    match state.store.status(&key).await {
        Ok(status) if status.complete() => {}
        Ok(_) => return StatusCode::NOT_FOUND.into_response(),
        Err(e) => {
            tracing::error!("status check failed while serving {}: {}", key, e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    }

    let path = if content_type == "application/json" {
        state.store.properties_path(&key)
    } else {
        state.store.fragment_path(&key)
    };

    let file = match tokio::fs::File::open(&path).await {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return StatusCode::NOT_FOUND.into_response()
        }
        Err(e) => {
            tracing::error!("failed to open artifact for {}: {}", key, e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let stream = ReaderStream::new(file);
    let body = Body::from_stream(stream);

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .body(body)
        .map_err(|e| {
            tracing::error!("Failed to build response: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })
        .unwrap_or_else(|status| status.into_response())
}
