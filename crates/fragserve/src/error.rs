//! Error kinds for the conversion pipeline.
//!
//! Every failure a request can hit collapses into one of these kinds, and
//! the HTTP layer renders all of them as the uniform `{success: false,
//! error}` envelope. Messages stay human-readable and never expose
//! filesystem paths or stack traces.

use axum::http::StatusCode;
use thiserror::Error;

use crate::engine::EngineError;
use fragstore::{KeyError, StoreError};

#[derive(Debug, Error)]
pub enum ConvertError {
    /// A required field or file was absent from the request.
    #[error("missing input: {0}")]
    MissingInput(String),

    /// The remote source URL was unreachable or returned non-success.
    #[error("failed to fetch source model: {0}")]
    SourceFetch(String),

    /// The external engine rejected or failed on the model.
    #[error("conversion failed: {0}")]
    Conversion(#[from] EngineError),

    /// The properties document could not be serialized.
    #[error("failed to encode properties document: {0}")]
    Encode(#[from] serde_json::Error),

    /// Filesystem failure while checking or writing the artifact pair.
    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl ConvertError {
    /// HTTP status for this kind: caller errors are 400, everything else
    /// is an internal or collaborator failure.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ConvertError::MissingInput(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<KeyError> for ConvertError {
    fn from(e: KeyError) -> Self {
        // An unusable name is a caller error, same as a missing one.
        ConvertError::MissingInput(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_input_is_bad_request() {
        let err = ConvertError::MissingInput("filename".to_string());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_other_kinds_are_internal() {
        let err = ConvertError::SourceFetch("connection refused".to_string());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let err: ConvertError = EngineError::Rejected("bad model".to_string()).into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_empty_name_maps_to_missing_input() {
        let err: ConvertError = fragstore::CacheKey::derive("").unwrap_err().into();
        assert!(matches!(err, ConvertError::MissingInput(_)));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}
