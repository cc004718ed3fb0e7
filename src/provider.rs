//! The host-facing provider surface.
//!
//! The plugin host owns the resource graph, diffing, and plan/apply
//! orchestration; it drives the provider through the fixed entry points of
//! [`ProviderHandler`]: metadata, schema, configure, and the CRUD
//! operations. [`TidewaveProvider`] implements the trait and dispatches
//! each call to one of the closed set of resource kinds by declared type
//! name.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::client::Client;
use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::resources::{ResourceKind, ServiceResource, VpcResource};
use crate::schema::{Attribute, Diagnostic, DiagnosticSeverity, ProviderSchema, Schema};
use crate::validation;

/// Provider metadata the host fetches before any schema work.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProviderMetadata {
    /// Declared resource type names, sorted.
    pub resources: Vec<String>,
}

/// The fixed entry points the host drives.
///
/// State crosses this boundary as JSON: the host hands over planned or
/// prior state exactly as it persisted it, and stores whatever comes back
/// as the new authoritative state.
#[async_trait::async_trait]
pub trait ProviderHandler: Send + Sync + 'static {
    /// Return the provider's schema including all resource types.
    fn schema(&self) -> ProviderSchema;

    /// Return provider metadata. By default, derived from the schema.
    fn metadata(&self) -> ProviderMetadata {
        let schema = self.schema();
        let mut resources: Vec<String> = schema.resources.keys().cloned().collect();
        resources.sort();
        ProviderMetadata { resources }
    }

    /// Configure the provider with credentials and settings.
    /// Returns diagnostics (errors and warnings).
    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError>;

    /// Validate a resource's configuration before the host plans with it.
    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError>;

    /// Create a new resource. `cancel` is the host's operation context;
    /// when it fires, blocking work stops promptly.
    async fn create(
        &self,
        resource_type: &str,
        planned_state: Value,
        cancel: &CancellationToken,
    ) -> Result<Value, ProviderError>;

    /// Read the current state of a resource.
    async fn read(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<Value, ProviderError>;

    /// Update an existing resource.
    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError>;

    /// Delete a resource.
    async fn delete(&self, resource_type: &str, current_state: Value)
        -> Result<(), ProviderError>;

    /// Bring existing infrastructure under management.
    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Value, ProviderError>;
}

/// The Tidewave provider: two resource kinds over one shared control-plane
/// client.
pub struct TidewaveProvider {
    resources: Vec<Box<dyn ResourceKind>>,
    client: RwLock<Option<Arc<Client>>>,
}

impl TidewaveProvider {
    /// Create the provider with its declared resource kinds.
    pub fn new() -> Self {
        Self {
            resources: vec![
                Box::new(ServiceResource::new()),
                Box::new(VpcResource::new()),
            ],
            client: RwLock::new(None),
        }
    }

    fn resource(&self, type_name: &str) -> Result<&dyn ResourceKind, ProviderError> {
        self.resources
            .iter()
            .find(|r| r.type_name() == type_name)
            .map(|r| r.as_ref())
            .ok_or_else(|| ProviderError::UnknownResource(type_name.to_string()))
    }

    async fn client(&self) -> Result<Arc<Client>, ProviderError> {
        self.client
            .read()
            .await
            .clone()
            .ok_or_else(|| ProviderError::configuration("provider has not been configured"))
    }
}

impl Default for TidewaveProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ProviderHandler for TidewaveProvider {
    fn schema(&self) -> ProviderSchema {
        let mut schema = ProviderSchema::new().with_provider_config(
            Schema::v0()
                .with_attribute(
                    "access_key",
                    Attribute::string()
                        .required()
                        .with_description("Project-scoped access key"),
                )
                .with_attribute(
                    "secret_key",
                    Attribute::string()
                        .required()
                        .sensitive()
                        .with_description("Secret paired with the access key"),
                )
                .with_attribute(
                    "project_id",
                    Attribute::string()
                        .required()
                        .with_description("The project every managed object belongs to"),
                )
                .with_attribute(
                    "endpoint",
                    Attribute::string()
                        .optional()
                        .with_description("Control-plane base URL override"),
                ),
        );
        for resource in &self.resources {
            schema = schema.with_resource(resource.type_name(), resource.schema());
        }
        schema
    }

    #[instrument(skip(self, config), name = "provider.configure")]
    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let diagnostics = validation::validate(&self.schema().provider, &config);
        if diagnostics
            .iter()
            .any(|d| matches!(d.severity, DiagnosticSeverity::Error))
        {
            debug!(
                diagnostics = diagnostics.len(),
                "provider configuration is invalid"
            );
            return Ok(diagnostics);
        }

        let parsed = ProviderConfig::from_value(&config)?;
        let client = Client::new(&parsed)?;
        *self.client.write().await = Some(Arc::new(client));

        info!(project_id = %parsed.project_id, "provider configured");
        Ok(diagnostics)
    }

    #[instrument(skip(self, config), name = "provider.validate_resource_config")]
    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let resource = self.resource(resource_type)?;
        Ok(resource.validate(&config))
    }

    #[instrument(skip(self, planned_state, cancel), name = "provider.create")]
    async fn create(
        &self,
        resource_type: &str,
        planned_state: Value,
        cancel: &CancellationToken,
    ) -> Result<Value, ProviderError> {
        let client = self.client().await?;
        let resource = self.resource(resource_type)?;
        info!(resource_type, "Create called");
        resource.create(&client, planned_state, cancel).await
    }

    #[instrument(skip(self, current_state), name = "provider.read")]
    async fn read(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<Value, ProviderError> {
        let client = self.client().await?;
        let resource = self.resource(resource_type)?;
        debug!(resource_type, "Read called");
        resource.read(&client, current_state).await
    }

    #[instrument(skip(self, prior_state, planned_state), name = "provider.update")]
    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        let client = self.client().await?;
        let resource = self.resource(resource_type)?;
        info!(resource_type, "Update called");
        resource.update(&client, prior_state, planned_state).await
    }

    #[instrument(skip(self, current_state), name = "provider.delete")]
    async fn delete(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<(), ProviderError> {
        let client = self.client().await?;
        let resource = self.resource(resource_type)?;
        info!(resource_type, "Delete called");
        resource.delete(&client, current_state).await
    }

    #[instrument(skip(self), name = "provider.import")]
    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Value, ProviderError> {
        let client = self.client().await?;
        let resource = self.resource(resource_type)?;
        info!(resource_type, id, "ImportResourceState called");
        resource.import(&client, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_vpc_json;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_schema_declares_both_resources() {
        let provider = TidewaveProvider::new();
        let schema = provider.schema();

        assert!(schema.resources.contains_key("tidewave_service"));
        assert!(schema.resources.contains_key("tidewave_vpc"));
        assert!(schema.provider.attributes["secret_key"].flags.sensitive);
    }

    #[test]
    fn test_metadata_lists_resources_sorted() {
        let provider = TidewaveProvider::new();
        let metadata = provider.metadata();
        assert_eq!(
            metadata.resources,
            vec!["tidewave_service".to_string(), "tidewave_vpc".to_string()]
        );
    }

    #[tokio::test]
    async fn test_operations_before_configure_are_rejected() {
        let provider = TidewaveProvider::new();
        let cancel = CancellationToken::new();

        let err = provider
            .create("tidewave_vpc", json!({}), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));

        let err = provider.read("tidewave_vpc", json!({})).await.unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_configure_reports_invalid_config_as_diagnostics() {
        let provider = TidewaveProvider::new();
        let diagnostics = provider
            .configure(json!({"access_key": "a"}))
            .await
            .unwrap();
        assert!(!diagnostics.is_empty());

        // The failed configure must not have armed the client.
        let err = provider.read("tidewave_vpc", json!({})).await.unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_unknown_resource_type_is_rejected() {
        let provider = TidewaveProvider::new();
        let server = MockServer::start().await;
        configure(&provider, &server).await;

        let err = provider
            .read("tidewave_cluster", json!({}))
            .await
            .unwrap_err();
        match err {
            ProviderError::UnknownResource(name) => assert_eq!(name, "tidewave_cluster"),
            other => panic!("expected UnknownResource, got {:?}", other),
        }

        let err = provider
            .validate_resource_config("tidewave_cluster", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::UnknownResource(_)));
    }

    #[tokio::test]
    async fn test_dispatch_routes_to_vpc_resource() {
        let provider = TidewaveProvider::new();
        let server = MockServer::start().await;
        configure(&provider, &server).await;

        Mock::given(method("GET"))
            .and(path("/projects/proj-1/vpcs"))
            .and(query_param("name", "prod-vpc"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(sample_vpc_json("7", "prod-vpc")),
            )
            .mount(&server)
            .await;

        let state = provider
            .read("tidewave_vpc", json!({"name": "prod-vpc"}))
            .await
            .unwrap();
        assert_eq!(state["id"], 7);
    }

    #[tokio::test]
    async fn test_validate_resource_config_dispatches() {
        let provider = TidewaveProvider::new();

        let diagnostics = provider
            .validate_resource_config("tidewave_vpc", json!({"name": "x"}))
            .await
            .unwrap();
        assert!(!diagnostics.is_empty());

        let diagnostics = provider
            .validate_resource_config(
                "tidewave_vpc",
                json!({"cidr": "10.0.0.0/16", "region_code": "us-east-1"}),
            )
            .await
            .unwrap();
        assert!(diagnostics.is_empty());
    }

    async fn configure(provider: &TidewaveProvider, server: &MockServer) {
        let diagnostics = provider
            .configure(json!({
                "access_key": "tw-access",
                "secret_key": "tw-secret",
                "project_id": "proj-1",
                "endpoint": server.uri()
            }))
            .await
            .unwrap();
        assert!(diagnostics.is_empty());
    }
}
