//! The managed database service resource.
//!
//! Service creation is the one long-running operation in the provider: the
//! control plane registers a service shell immediately, then provisions it
//! in the background. `create` blocks on the readiness poller until the
//! service reports READY, bounded by the user's `timeouts.create` override
//! (45 minutes by default).

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::client::{Client, CreateServiceRequest, Service};
use crate::config::{Timeouts, DEFAULT_CREATE_TIMEOUT};
use crate::error::ProviderError;
use crate::poll::{StateChange, DEFAULT_DELAY, DEFAULT_POLL_INTERVAL};
use crate::resources::{changed, reject_invalid, ResourceKind};
use crate::schema::{Attribute, AttributeType, Diagnostic, Schema};

/// Type name the host dispatches on.
pub const TYPE_NAME: &str = "tidewave_service";

const ERR_UPDATE_SERVICE: &str =
    "Changing a service's name or compute configuration is currently unsupported";

/// Compute defaults applied when the plan leaves sizing unset.
pub const DEFAULT_MILLI_CPU: i64 = 500;
/// Default storage allocation in GB.
pub const DEFAULT_STORAGE_GB: i64 = 10;
/// Default memory allocation in GB.
pub const DEFAULT_MEMORY_GB: i64 = 2;

/// Fixed CPU-to-memory ratio the platform provisions: milli-CPU per GB.
const MILLI_CPU_PER_MEMORY_GB: i64 = 250;

const STORAGE_SIZES: [i64; 40] = [
    10, 25, 50, 75, 100, 125, 150, 175, 200, 225, 250, 275, 300, 325, 350, 375, 400, 425, 450,
    475, 500, 600, 700, 800, 900, 1000, 1500, 2000, 2500, 3000, 4000, 5000, 6000, 7000, 8000,
    9000, 10000, 12000, 14000, 16000,
];
const MEMORY_SIZES: [i64; 7] = [2, 4, 8, 16, 32, 64, 128];
const MILLI_CPU_SIZES: [i64; 7] = [500, 1000, 2000, 4000, 8000, 16000, 32000];

const TARGET_STATUS: &str = "READY";
const PENDING_STATUSES: [&str; 3] = ["QUEUED", "CONFIGURING", "UNSTABLE"];
const FAILED_STATUSES: [&str; 3] = ["FAILED", "DELETING", "DELETED"];

/// Host-facing state of a service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceState {
    /// Service identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Display name; the platform generates one when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Whether storage grows automatically under pressure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_storage_autoscaling: Option<bool>,
    /// CPU allocation in milli-cores.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub milli_cpu: Option<i64>,
    /// Storage in GB.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_gb: Option<i64>,
    /// Memory in GB.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_gb: Option<i64>,
    /// Database password, captured once at creation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Connection hostname.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    /// Connection port.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<i64>,
    /// Database user.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Per-operation timeout overrides.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeouts: Option<Timeouts>,
}

/// The `tidewave_service` resource kind.
#[derive(Debug, Clone)]
pub struct ServiceResource {
    delay: Duration,
    poll_interval: Duration,
}

impl ServiceResource {
    /// Create the resource kind with the standard polling cadence.
    pub fn new() -> Self {
        Self {
            delay: DEFAULT_DELAY,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Override the readiness-polling cadence. Intended for acceptance
    /// tests against a local control plane.
    pub fn with_poll_cadence(mut self, delay: Duration, poll_interval: Duration) -> Self {
        self.delay = delay;
        self.poll_interval = poll_interval;
        self
    }

    async fn await_ready(
        &self,
        client: &Client,
        id: &str,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<Service, ProviderError> {
        let wait = StateChange::new(TARGET_STATUS)
            .with_pending(PENDING_STATUSES)
            .with_failed(FAILED_STATUSES)
            .with_delay(self.delay)
            .with_poll_interval(self.poll_interval)
            .with_timeout(timeout);

        wait.wait_for(
            || {
                let id = id.to_string();
                async move {
                    let service = client.get_service(&id).await?;
                    let status = service.status.clone();
                    Ok((service, status))
                }
            },
            cancel,
        )
        .await
    }
}

impl Default for ServiceResource {
    fn default() -> Self {
        Self::new()
    }
}

/// Map a wire service onto state, preserving the fields only the plan
/// knows: the one-time password and the timeout overrides.
fn reconcile(service: &Service, prior: &ServiceState) -> ServiceState {
    let spec = service.primary_spec();
    ServiceState {
        id: Some(service.id.clone()),
        name: Some(service.name.clone()),
        enable_storage_autoscaling: Some(service.autoscale_settings.enabled),
        milli_cpu: spec.map(|s| s.milli_cpu),
        storage_gb: spec.map(|s| s.storage_gb),
        memory_gb: spec.map(|s| s.memory_gb),
        password: prior.password.clone(),
        hostname: Some(service.service_spec.hostname.clone()),
        port: Some(service.service_spec.port),
        username: Some(service.service_spec.username.clone()),
        timeouts: prior.timeouts.clone(),
    }
}

fn state_from(value: &Value) -> Result<ServiceState, ProviderError> {
    Ok(serde_json::from_value(value.clone())?)
}

fn state_into(state: ServiceState) -> Result<Value, ProviderError> {
    Ok(serde_json::to_value(state)?)
}

#[async_trait]
impl ResourceKind for ServiceResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        let timeouts_type = AttributeType::object([("create", AttributeType::String)]);

        Schema::v0()
            .with_attribute(
                "id",
                Attribute::string()
                    .computed()
                    .with_description("Service identifier"),
            )
            .with_attribute(
                "name",
                Attribute::string().optional_computed().with_description(
                    "Service name. If absent, the provider generates a default.",
                ),
            )
            .with_attribute(
                "enable_storage_autoscaling",
                Attribute::bool()
                    .optional_computed()
                    .with_description("Grow storage automatically under pressure"),
            )
            .with_attribute(
                "milli_cpu",
                Attribute::int64()
                    .optional_computed()
                    .with_description("CPU allocation in milli-cores")
                    .with_default(DEFAULT_MILLI_CPU.into())
                    .with_one_of(MILLI_CPU_SIZES),
            )
            .with_attribute(
                "storage_gb",
                Attribute::int64()
                    .optional_computed()
                    .with_description("Storage in GB")
                    .with_default(DEFAULT_STORAGE_GB.into())
                    .with_one_of(STORAGE_SIZES),
            )
            .with_attribute(
                "memory_gb",
                Attribute::int64()
                    .optional_computed()
                    .with_description("Memory in GB")
                    .with_default(DEFAULT_MEMORY_GB.into())
                    .with_one_of(MEMORY_SIZES),
            )
            .with_attribute(
                "password",
                Attribute::string()
                    .computed()
                    .sensitive()
                    .with_description("Database password, provided once during creation"),
            )
            .with_attribute(
                "hostname",
                Attribute::string()
                    .computed()
                    .with_description("Connection hostname"),
            )
            .with_attribute(
                "port",
                Attribute::int64()
                    .computed()
                    .with_description("Connection port"),
            )
            .with_attribute(
                "username",
                Attribute::string()
                    .computed()
                    .with_description("Database user"),
            )
            .with_attribute(
                "timeouts",
                Attribute::typed(timeouts_type)
                    .optional()
                    .with_description("Operation timeout overrides, e.g. create = \"45m\""),
            )
    }

    fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        let mut diagnostics = crate::validation::validate(&self.schema(), config);

        // The platform only provisions a fixed CPU:memory ratio.
        let cpu = config.get("milli_cpu").and_then(Value::as_i64);
        let memory = config.get("memory_gb").and_then(Value::as_i64);
        if let (Some(cpu), Some(memory)) = (cpu, memory) {
            if cpu != memory * MILLI_CPU_PER_MEMORY_GB {
                diagnostics.push(
                    Diagnostic::error("Invalid compute configuration")
                        .with_detail(format!(
                            "milli_cpu must equal {} x memory_gb; got {} milli-cores with {} GB",
                            MILLI_CPU_PER_MEMORY_GB, cpu, memory
                        ))
                        .with_attribute("milli_cpu"),
                );
            }
        }

        diagnostics
    }

    async fn create(
        &self,
        client: &Client,
        planned: Value,
        cancel: &CancellationToken,
    ) -> Result<Value, ProviderError> {
        reject_invalid(self.validate(&planned))?;
        let mut plan = state_from(&planned)?;

        let response = client
            .create_service(CreateServiceRequest {
                name: plan.name.clone().unwrap_or_default(),
                enable_storage_autoscaling: plan.enable_storage_autoscaling.unwrap_or(false),
                milli_cpu: plan.milli_cpu.unwrap_or(DEFAULT_MILLI_CPU),
                memory_gb: plan.memory_gb.unwrap_or(DEFAULT_MEMORY_GB),
                storage_gb: plan.storage_gb.unwrap_or(DEFAULT_STORAGE_GB),
            })
            .await?;

        // The password is handed out exactly once; it must survive into
        // state before anything else can fail.
        plan.password = Some(response.initial_password);

        let timeout = plan
            .timeouts
            .clone()
            .unwrap_or_default()
            .create_or(DEFAULT_CREATE_TIMEOUT);

        info!(service_id = %response.service.id, ?timeout, "waiting for service readiness");
        let service = self
            .await_ready(client, &response.service.id, timeout, cancel)
            .await?;

        state_into(reconcile(&service, &plan))
    }

    async fn read(&self, client: &Client, current: Value) -> Result<Value, ProviderError> {
        let state = state_from(&current)?;
        let id = state
            .id
            .clone()
            .ok_or_else(|| ProviderError::validation("service state is missing its id"))?;

        debug!(service_id = %id, "reading service");
        let service = client.get_service(&id).await?;
        state_into(reconcile(&service, &state))
    }

    async fn update(
        &self,
        _client: &Client,
        prior: Value,
        planned: Value,
    ) -> Result<Value, ProviderError> {
        let prior_state = state_from(&prior)?;
        let plan = state_from(&planned)?;

        if changed(&plan.name, &prior_state.name)
            || changed(&plan.milli_cpu, &prior_state.milli_cpu)
            || changed(&plan.memory_gb, &prior_state.memory_gb)
            || changed(&plan.storage_gb, &prior_state.storage_gb)
            || changed(
                &plan.enable_storage_autoscaling,
                &prior_state.enable_storage_autoscaling,
            )
        {
            return Err(ProviderError::validation(ERR_UPDATE_SERVICE));
        }

        state_into(prior_state)
    }

    async fn delete(&self, client: &Client, current: Value) -> Result<(), ProviderError> {
        let state = state_from(&current)?;
        let id = state
            .id
            .ok_or_else(|| ProviderError::validation("service state is missing its id"))?;

        info!(service_id = %id, "deleting service");
        client.delete_service(&id).await
    }

    async fn import(&self, client: &Client, id: &str) -> Result<Value, ProviderError> {
        let service = client.get_service(id).await?;
        // The initial password is unknowable after creation; imported state
        // carries none.
        state_into(reconcile(&service, &ServiceState::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderConfig;
    use crate::testing::sample_service_json;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_resource() -> ServiceResource {
        ServiceResource::new()
            .with_poll_cadence(Duration::from_millis(10), Duration::from_millis(10))
    }

    async fn test_client(server: &MockServer) -> Client {
        let config = ProviderConfig::from_value(&json!({
            "access_key": "tw-access",
            "secret_key": "tw-secret",
            "project_id": "proj-1",
            "endpoint": server.uri()
        }))
        .unwrap();
        Client::new(&config).unwrap()
    }

    #[test]
    fn test_schema_allow_lists() {
        let schema = ServiceResource::new().schema();
        assert!(schema.attributes["milli_cpu"]
            .one_of
            .as_ref()
            .unwrap()
            .contains(&json!(500)));
        assert!(schema.attributes["password"].flags.sensitive);
        assert!(schema.attributes["hostname"].flags.computed);
    }

    #[test]
    fn test_validate_accepts_supported_tiers() {
        let resource = ServiceResource::new();
        let diagnostics = resource.validate(&json!({
            "name": "orders-db",
            "milli_cpu": 1000,
            "memory_gb": 4,
            "storage_gb": 100
        }));
        assert!(diagnostics.is_empty(), "{:?}", diagnostics);
    }

    #[test]
    fn test_validate_rejects_unknown_tier() {
        let resource = ServiceResource::new();
        let diagnostics = resource.validate(&json!({"memory_gb": 3}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("memory_gb".to_string()));
    }

    #[test]
    fn test_validate_rejects_cpu_memory_ratio_mismatch() {
        let resource = ServiceResource::new();
        // Both values are valid tiers, but 4 GB pairs with 1000 milli-CPU.
        let diagnostics = resource.validate(&json!({"milli_cpu": 2000, "memory_gb": 4}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Invalid compute"));
    }

    #[tokio::test]
    async fn test_create_waits_for_readiness_and_keeps_password() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/projects/proj-1/services"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "service": sample_service_json("svc-9", "QUEUED"),
                "initialPassword": "hunter2"
            })))
            .mount(&server)
            .await;
        // First poll still provisioning, then ready.
        Mock::given(method("GET"))
            .and(path("/projects/proj-1/services/svc-9"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(sample_service_json("svc-9", "CONFIGURING")),
            )
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/projects/proj-1/services/svc-9"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(sample_service_json("svc-9", "READY")),
            )
            .mount(&server)
            .await;

        let client = test_client(&server).await;
        let cancel = CancellationToken::new();
        let state = fast_resource()
            .create(
                &client,
                json!({"name": "orders-db", "timeouts": {"create": "10s"}}),
                &cancel,
            )
            .await
            .unwrap();

        assert_eq!(state["id"], "svc-9");
        assert_eq!(state["password"], "hunter2");
        assert_eq!(state["hostname"], "svc-9.tidewave.dev");
        assert_eq!(state["milli_cpu"], 500);
        // The timeout override survives the round trip.
        assert_eq!(state["timeouts"]["create"], "10s");
    }

    #[tokio::test]
    async fn test_create_surfaces_timeout_distinctly() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/projects/proj-1/services"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "service": sample_service_json("svc-9", "QUEUED"),
                "initialPassword": "hunter2"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/projects/proj-1/services/svc-9"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(sample_service_json("svc-9", "QUEUED")),
            )
            .mount(&server)
            .await;

        let client = test_client(&server).await;
        let cancel = CancellationToken::new();
        let err = fast_resource()
            .create(
                &client,
                json!({"name": "orders-db", "timeouts": {"create": "50ms"}}),
                &cancel,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::Timeout { .. }));
        assert!(err.is_retriable_wait());
    }

    #[tokio::test]
    async fn test_create_fails_fast_on_deleting_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/projects/proj-1/services"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "service": sample_service_json("svc-9", "QUEUED"),
                "initialPassword": "hunter2"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/projects/proj-1/services/svc-9"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(sample_service_json("svc-9", "DELETING")),
            )
            .mount(&server)
            .await;

        let client = test_client(&server).await;
        let cancel = CancellationToken::new();
        let err = fast_resource()
            .create(&client, json!({"name": "orders-db"}), &cancel)
            .await
            .unwrap_err();

        match err {
            ProviderError::UnexpectedState { status } => assert_eq!(status, "DELETING"),
            other => panic!("expected UnexpectedState, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_plan_without_api_call() {
        let server = MockServer::start().await;

        let client = test_client(&server).await;
        let cancel = CancellationToken::new();
        let err = fast_resource()
            .create(&client, json!({"memory_gb": 3}), &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::Validation(_)));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_read_preserves_password_and_timeouts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/projects/proj-1/services/svc-9"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(sample_service_json("svc-9", "READY")),
            )
            .mount(&server)
            .await;

        let client = test_client(&server).await;
        let state = fast_resource()
            .read(
                &client,
                json!({"id": "svc-9", "password": "hunter2", "timeouts": {"create": "30m"}}),
            )
            .await
            .unwrap();

        assert_eq!(state["password"], "hunter2");
        assert_eq!(state["timeouts"]["create"], "30m");
        assert_eq!(state["username"], "tsdbadmin");
    }

    #[tokio::test]
    async fn test_update_rejects_spec_changes_without_api_call() {
        let server = MockServer::start().await;

        let client = test_client(&server).await;
        let prior = json!({"id": "svc-9", "name": "orders-db", "memory_gb": 2});
        let planned = json!({"id": "svc-9", "name": "orders-db", "memory_gb": 4});

        let err = fast_resource()
            .update(&client, prior, planned)
            .await
            .unwrap_err();

        match err {
            ProviderError::Validation(msg) => assert_eq!(msg, ERR_UPDATE_SERVICE),
            other => panic!("expected Validation, got {:?}", other),
        }
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_without_changes_is_a_no_op() {
        let server = MockServer::start().await;

        let client = test_client(&server).await;
        let prior = json!({"id": "svc-9", "name": "orders-db", "memory_gb": 2});

        let state = fast_resource()
            .update(&client, prior.clone(), prior)
            .await
            .unwrap();
        assert_eq!(state["name"], "orders-db");
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_requires_id() {
        let server = MockServer::start().await;
        let client = test_client(&server).await;

        let err = fast_resource().delete(&client, json!({})).await.unwrap_err();
        assert!(matches!(err, ProviderError::Validation(_)));
    }

    #[tokio::test]
    async fn test_import_leaves_password_null() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/projects/proj-1/services/svc-9"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(sample_service_json("svc-9", "READY")),
            )
            .mount(&server)
            .await;

        let client = test_client(&server).await;
        let state = fast_resource().import(&client, "svc-9").await.unwrap();

        assert_eq!(state["id"], "svc-9");
        assert!(state.get("password").is_none());
    }
}
