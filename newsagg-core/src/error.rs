//! Error taxonomy for every request that leaves the client.
//!
//! Transport and resource clients never swallow these; the query cache
//! attaches them to entries and the mutation coordinator returns them.

use thiserror::Error;

/// Generic message used when the server did not supply one.
pub const DEFAULT_ERROR_MESSAGE: &str = "Terjadi kesalahan";

/// Failure of a single HTTP exchange.
///
/// `Clone` so a single failure can be handed to every subscriber of a
/// cache entry.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The request did not complete within the transport deadline.
    #[error("Request timed out")]
    Timeout,

    /// No response reached the client.
    #[error("Network error: {0}")]
    Network(String),

    /// The server answered with a non-2xx status other than 401.
    #[error("{message} (HTTP {status})")]
    Api { message: String, status: u16 },

    /// The server rejected the credential. The session has already been
    /// cleared by the time a caller sees this.
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    /// A 2xx response whose body did not match the expected envelope.
    #[error("Invalid response body: {0}")]
    Decode(String),
}

impl TransportError {
    pub fn api(message: impl Into<String>, status: u16) -> Self {
        Self::Api {
            message: message.into(),
            status,
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// Short human-readable message suitable for direct display. Never empty.
    pub fn message(&self) -> String {
        let message = match self {
            TransportError::Timeout => "Permintaan melebihi batas waktu".to_string(),
            TransportError::Network(reason) => reason.clone(),
            TransportError::Api { message, .. } => message.clone(),
            TransportError::Unauthorized { message } => message.clone(),
            TransportError::Decode(reason) => reason.clone(),
        };
        if message.trim().is_empty() {
            DEFAULT_ERROR_MESSAGE.to_string()
        } else {
            message
        }
    }

    /// HTTP status when the server produced one.
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Api { status, .. } => Some(*status),
            TransportError::Unauthorized { .. } => Some(401),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, TransportError::Unauthorized { .. })
    }

    /// Whether a read may be retried after this failure.
    pub fn is_retryable(&self) -> bool {
        !self.is_unauthorized()
    }
}

pub type TransportResult<T> = Result<T, TransportError>;
