//! Error types for the Tidewave provider.

use thiserror::Error;

use crate::schema::Diagnostic;

/// Errors that can occur while handling a host-driven operation.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Malformed or disallowed input. Raised before any remote call is made.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The requested resource type is outside the provider's declared set.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// Bad provider configuration, or an operation invoked before `configure`.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The control plane answered with a non-success status.
    #[error("Control plane returned {status}: {message}")]
    Api {
        /// HTTP status code from the control plane.
        status: u16,
        /// Error message decoded from the response body.
        message: String,
    },

    /// The HTTP call itself failed (connect, TLS, body read).
    #[error("Transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// A state or wire payload did not match the expected shape.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The requested remote object does not exist.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// The readiness wait exhausted its configured window.
    #[error("Timed out after {waited:?} waiting for the remote object to become ready")]
    Timeout {
        /// Total time spent waiting, including the initial delay.
        waited: std::time::Duration,
    },

    /// The host cancelled the enclosing operation.
    #[error("Operation cancelled by the host")]
    Cancelled,

    /// The remote object reached a terminal status that is neither pending
    /// nor the awaited target.
    #[error("Remote object entered unexpected status {status:?}")]
    UnexpectedState {
        /// The status reported by the control plane.
        status: String,
    },
}

impl ProviderError {
    /// Shorthand for a [`ProviderError::Validation`] error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Shorthand for a [`ProviderError::Configuration`] error.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Whether this error means the awaited object may still be provisioning.
    ///
    /// Callers use this to distinguish "try again later" from "definitively
    /// broken" when a create operation fails.
    pub fn is_retriable_wait(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

impl From<ProviderError> for Diagnostic {
    fn from(err: ProviderError) -> Self {
        match &err {
            ProviderError::Validation(_) => Diagnostic::error("Invalid configuration"),
            ProviderError::Timeout { .. } => Diagnostic::error("Timed out waiting for readiness"),
            ProviderError::Api { .. } => Diagnostic::error("Control plane request failed"),
            _ => Diagnostic::error("Provider operation failed"),
        }
        .with_detail(err.to_string())
    }
}
