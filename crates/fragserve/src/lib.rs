//! fragserve - IFC conversion cache service
//!
//! This library provides:
//! - `convert`: conversion orchestration (dedup short-circuit, remote
//!   fetch, engine invocation, pair persistence)
//! - `engine`: the external geometry-engine contract and its HTTP sidecar
//!   client
//! - `error`: request error kinds and their HTTP status mapping
//! - `web`: axum routes and the uniform response envelope

pub mod convert;
pub mod engine;
pub mod error;
pub mod web;
