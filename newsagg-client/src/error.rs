//! Error types for client construction.
//!
//! Request failures are [`newsagg_core::TransportError`]; this only covers
//! setting the client up.

use crate::config::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}
