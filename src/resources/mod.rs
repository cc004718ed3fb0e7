//! Resource kinds managed by the provider.
//!
//! The provider manages a closed set of resource kinds, each implementing
//! the same operation set behind [`ResourceKind`]. The host addresses them
//! by declared type name; [`crate::provider::TidewaveProvider`] owns the
//! dispatch.

pub mod service;
pub mod vpc;

pub use service::ServiceResource;
pub use vpc::VpcResource;

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::client::Client;
use crate::error::ProviderError;
use crate::schema::{Diagnostic, Schema};

/// The operation set every resource kind provides.
///
/// State crosses this boundary as JSON, exactly as the host hands it over;
/// each implementation deserializes into its own typed state model.
#[async_trait]
pub trait ResourceKind: Send + Sync {
    /// The type name the host dispatches on.
    fn type_name(&self) -> &'static str;

    /// The schema reported to the host for this kind.
    fn schema(&self) -> Schema;

    /// Validate a configuration before any remote call.
    fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        crate::validation::validate(&self.schema(), config)
    }

    /// Create the remote object and return the reconciled state.
    async fn create(
        &self,
        client: &Client,
        planned: Value,
        cancel: &CancellationToken,
    ) -> Result<Value, ProviderError>;

    /// Refresh state from the remote object.
    async fn read(&self, client: &Client, current: Value) -> Result<Value, ProviderError>;

    /// Apply an in-place change, or reject it before any remote call.
    async fn update(
        &self,
        client: &Client,
        prior: Value,
        planned: Value,
    ) -> Result<Value, ProviderError>;

    /// Delete the remote object.
    async fn delete(&self, client: &Client, current: Value) -> Result<(), ProviderError>;

    /// Bring an existing remote object under management.
    async fn import(&self, client: &Client, id: &str) -> Result<Value, ProviderError>;
}

/// True when a planned optional field differs from its prior value.
///
/// A `None` in the plan means the host left the attribute unknown, which is
/// not a change request.
pub(crate) fn changed<T: PartialEq>(planned: &Option<T>, prior: &Option<T>) -> bool {
    planned.is_some() && planned != prior
}

/// Collapse validation diagnostics into a single validation error.
pub(crate) fn reject_invalid(diagnostics: Vec<Diagnostic>) -> Result<(), ProviderError> {
    if diagnostics.is_empty() {
        return Ok(());
    }
    let summary = diagnostics
        .iter()
        .map(|d| match (&d.attribute, &d.detail) {
            (Some(attr), Some(detail)) => format!("{}: {} ({})", attr, d.summary, detail),
            (Some(attr), None) => format!("{}: {}", attr, d.summary),
            (None, Some(detail)) => format!("{} ({})", d.summary, detail),
            (None, None) => d.summary.clone(),
        })
        .collect::<Vec<_>>()
        .join("; ");
    Err(ProviderError::Validation(summary))
}
