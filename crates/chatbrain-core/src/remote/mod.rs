//! Remote analysis stages.
//!
//! Provides the [`RemoteStageClient`] boundary the controller talks to and an
//! HTTP implementation for the analysis service.

pub(crate) mod client;
pub(crate) mod http;
pub(crate) mod wire;

pub use client::{resolve_env_var, RemoteStageClient};
pub use http::HttpStageClient;

#[cfg(test)]
pub(crate) mod mock;
