//! Testing utilities for the provider.
//!
//! [`ProviderTester`] drives a [`ProviderHandler`] implementation through
//! its entry points without a plugin host, the way the host would. The
//! fixture functions produce control-plane JSON bodies for mock servers.
//!
//! # Example
//!
//! ```ignore
//! use tidewave_provider::testing::ProviderTester;
//! use serde_json::json;
//!
//! #[tokio::test]
//! async fn test_vpc_lifecycle() {
//!     let tester = ProviderTester::new(TidewaveProvider::new());
//!     tester.configure(json!({ /* credentials */ })).await.unwrap();
//!
//!     let state = tester
//!         .create("tidewave_vpc", json!({"cidr": "10.0.0.0/16", "region_code": "us-east-1"}))
//!         .await
//!         .unwrap();
//!     assert_eq!(state["region_code"], "us-east-1");
//! }
//! ```

use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use crate::error::ProviderError;
use crate::provider::{ProviderHandler, ProviderMetadata};
use crate::schema::{Diagnostic, DiagnosticSeverity, ProviderSchema};

/// A test harness for provider implementations.
pub struct ProviderTester<P: ProviderHandler> {
    provider: P,
    cancel: CancellationToken,
}

impl<P: ProviderHandler> ProviderTester<P> {
    /// Create a new tester for the given provider.
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            cancel: CancellationToken::new(),
        }
    }

    /// Get a reference to the underlying provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// The cancellation token handed to blocking operations. Cancel it to
    /// simulate the host aborting an apply.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Get the provider's schema.
    pub fn schema(&self) -> ProviderSchema {
        self.provider.schema()
    }

    /// Get the provider's metadata.
    pub fn metadata(&self) -> ProviderMetadata {
        self.provider.metadata()
    }

    /// Configure the provider. Returns `Err` with the diagnostics when any
    /// are errors.
    pub async fn configure(&self, config: Value) -> Result<(), TestError> {
        let diagnostics = self.provider.configure(config).await?;
        check_diagnostics(diagnostics)
    }

    /// Validate a resource configuration.
    pub async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<(), TestError> {
        let diagnostics = self
            .provider
            .validate_resource_config(resource_type, config)
            .await?;
        check_diagnostics(diagnostics)
    }

    /// Create a new resource.
    pub async fn create(
        &self,
        resource_type: &str,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider
            .create(resource_type, planned_state, &self.cancel)
            .await
    }

    /// Read the current state of a resource.
    pub async fn read(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider.read(resource_type, current_state).await
    }

    /// Update an existing resource.
    pub async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider
            .update(resource_type, prior_state, planned_state)
            .await
    }

    /// Delete a resource.
    pub async fn delete(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<(), ProviderError> {
        self.provider.delete(resource_type, current_state).await
    }

    /// Import an existing resource.
    pub async fn import(&self, resource_type: &str, id: &str) -> Result<Value, ProviderError> {
        self.provider.import_resource(resource_type, id).await
    }

    /// Run a full create → read round trip and return the refreshed state.
    pub async fn lifecycle_create(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        let created = self.create(resource_type, config).await?;
        self.read(resource_type, created).await
    }
}

/// Error type for tester operations that may fail with diagnostics.
#[derive(Debug)]
pub enum TestError {
    /// The operation failed with error diagnostics.
    Diagnostics(Vec<Diagnostic>),
    /// The operation failed with a provider error.
    Provider(ProviderError),
}

impl std::fmt::Display for TestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestError::Diagnostics(diags) => {
                writeln!(f, "Operation failed with {} diagnostic(s):", diags.len())?;
                for diag in diags {
                    write!(f, "  [{:?}] {}", diag.severity, diag.summary)?;
                    if let Some(detail) = &diag.detail {
                        write!(f, ": {}", detail)?;
                    }
                    if let Some(attr) = &diag.attribute {
                        write!(f, " (at {})", attr)?;
                    }
                    writeln!(f)?;
                }
                Ok(())
            }
            TestError::Provider(e) => write!(f, "Provider error: {}", e),
        }
    }
}

impl std::error::Error for TestError {}

impl From<ProviderError> for TestError {
    fn from(e: ProviderError) -> Self {
        TestError::Provider(e)
    }
}

fn check_diagnostics(diagnostics: Vec<Diagnostic>) -> Result<(), TestError> {
    let errors: Vec<_> = diagnostics
        .into_iter()
        .filter(|d| matches!(d.severity, DiagnosticSeverity::Error))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(TestError::Diagnostics(errors))
    }
}

// =========================================================================
// Assertion helpers
// =========================================================================

/// Assert that diagnostics contain no errors.
///
/// # Panics
///
/// Panics if there are any error diagnostics.
pub fn assert_no_errors(diagnostics: &[Diagnostic]) {
    let errors: Vec<_> = diagnostics
        .iter()
        .filter(|d| matches!(d.severity, DiagnosticSeverity::Error))
        .collect();

    assert!(
        errors.is_empty(),
        "Expected no errors, but got {} error(s): {:?}",
        errors.len(),
        errors.iter().map(|d| &d.summary).collect::<Vec<_>>()
    );
}

/// Assert that diagnostics contain at least one error.
///
/// # Panics
///
/// Panics if there are no error diagnostics.
pub fn assert_has_errors(diagnostics: &[Diagnostic]) {
    let has_errors = diagnostics
        .iter()
        .any(|d| matches!(d.severity, DiagnosticSeverity::Error));

    assert!(has_errors, "Expected at least one error, but got none");
}

/// Assert that an error diagnostic mentions the given attribute path.
///
/// # Panics
///
/// Panics if no error diagnostic targets the attribute.
pub fn assert_error_on_attribute(diagnostics: &[Diagnostic], attribute: &str) {
    let found = diagnostics.iter().any(|d| {
        matches!(d.severity, DiagnosticSeverity::Error)
            && d.attribute.as_deref() == Some(attribute)
    });

    assert!(
        found,
        "Expected an error on attribute '{}', but errors were on: {:?}",
        attribute,
        diagnostics
            .iter()
            .filter_map(|d| d.attribute.as_deref())
            .collect::<Vec<_>>()
    );
}

// =========================================================================
// Control-plane fixtures
// =========================================================================

/// A service body as the control plane would return it, with the given id
/// and status and the default compute spec.
pub fn sample_service_json(id: &str, status: &str) -> Value {
    json!({
        "id": id,
        "projectId": "proj-1",
        "name": "orders-db",
        "status": status,
        "serviceSpec": {
            "hostname": format!("{}.tidewave.dev", id),
            "username": "tsdbadmin",
            "port": 5432
        },
        "resources": [
            {"spec": {"milliCpu": 500, "memoryGb": 2, "storageGb": 10}}
        ],
        "autoscaleSettings": {"enabled": false},
        "created": "2025-11-02T09:30:00Z"
    })
}

/// A VPC body as the control plane would return it, with one peering
/// connection attached.
pub fn sample_vpc_json(id: &str, name: &str) -> Value {
    json!({
        "id": id,
        "provisionedId": "vpc-abc123",
        "projectId": "proj-1",
        "cidr": "10.0.0.0/16",
        "name": name,
        "regionCode": "us-east-1",
        "status": "CREATED",
        "errorMessage": "",
        "created": "2025-11-02T09:30:00Z",
        "updated": "2025-11-02T10:00:00Z",
        "peeringConnections": [
            {
                "id": "21",
                "vpcId": id,
                "status": "APPROVED",
                "errorMessage": "",
                "peerVpc": {
                    "id": "vpc-peer-1",
                    "cidr": "10.1.0.0/16",
                    "accountId": "123456789",
                    "regionCode": "us-east-1"
                }
            }
        ]
    })
}
