//! Control-plane REST client.
//!
//! A thin wrapper around `reqwest` that speaks the Tidewave control-plane
//! API: create/fetch/delete for services, create/fetch/rename/delete for
//! VPCs. Every call is scoped to the configured project. Errors are decoded
//! into [`ProviderError::Api`] where the platform supplies a message body;
//! transport failures map through [`ProviderError::Http`]. No call is
//! retried here; the readiness poller owns the only scheduled re-fetch
//! loop in the provider.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ProviderConfig;
use crate::error::ProviderError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A managed database service as the control plane reports it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    /// Service identifier.
    pub id: String,
    /// Owning project.
    #[serde(default)]
    pub project_id: String,
    /// Display name.
    pub name: String,
    /// Provisioning status (QUEUED, CONFIGURING, UNSTABLE, READY, ...).
    pub status: String,
    /// Connection endpoint details.
    #[serde(default)]
    pub service_spec: ServiceSpec,
    /// Allocated compute resources; the platform reports exactly one entry
    /// for the service's primary node.
    #[serde(default)]
    pub resources: Vec<ResourceConfig>,
    /// Storage autoscaling settings.
    #[serde(default)]
    pub autoscale_settings: AutoscaleSettings,
    /// Creation timestamp.
    #[serde(default)]
    pub created: String,
}

impl Service {
    /// The compute spec of the primary node, when the platform reported one.
    pub fn primary_spec(&self) -> Option<&ResourceSpec> {
        self.resources.first().map(|r| &r.spec)
    }
}

/// Connection endpoint details for a service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSpec {
    /// Hostname clients connect to.
    pub hostname: String,
    /// Database user provisioned with the service.
    pub username: String,
    /// TCP port.
    pub port: i64,
}

/// One allocated resource entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceConfig {
    /// The compute spec of this entry.
    pub spec: ResourceSpec,
}

/// Compute sizing of a service node.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSpec {
    /// CPU allocation in milli-cores.
    pub milli_cpu: i64,
    /// Memory in GB.
    pub memory_gb: i64,
    /// Storage in GB.
    pub storage_gb: i64,
}

/// Storage autoscaling settings.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoscaleSettings {
    /// Whether storage grows automatically under pressure.
    pub enabled: bool,
}

/// Request body for service creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateServiceRequest {
    /// Display name; the platform generates one when empty.
    pub name: String,
    /// Whether to enable storage autoscaling.
    pub enable_storage_autoscaling: bool,
    /// CPU allocation in milli-cores.
    pub milli_cpu: i64,
    /// Memory in GB.
    pub memory_gb: i64,
    /// Storage in GB.
    pub storage_gb: i64,
}

/// Response body for service creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateServiceResponse {
    /// The service shell the platform registered.
    pub service: Service,
    /// The database password, handed out exactly once at creation.
    pub initial_password: String,
}

/// A VPC as the control plane reports it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vpc {
    /// VPC identifier (numeric, transported as a string).
    pub id: String,
    /// Cloud-side identifier once provisioned.
    #[serde(default)]
    pub provisioned_id: String,
    /// Owning project.
    #[serde(default)]
    pub project_id: String,
    /// IPv4 CIDR block.
    pub cidr: String,
    /// Display name.
    pub name: String,
    /// Region the VPC lives in.
    pub region_code: String,
    /// Provisioning status.
    #[serde(default)]
    pub status: String,
    /// Platform-reported error detail, empty when healthy.
    #[serde(default)]
    pub error_message: String,
    /// Creation timestamp.
    #[serde(default)]
    pub created: String,
    /// Last-update timestamp.
    #[serde(default)]
    pub updated: String,
    /// Peering connections attached to this VPC.
    #[serde(default)]
    pub peering_connections: Vec<PeeringConnection>,
}

/// A peering connection between a Tidewave VPC and a customer VPC.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeeringConnection {
    /// Peering connection identifier.
    pub id: String,
    /// The Tidewave-side VPC.
    pub vpc_id: String,
    /// Peering status.
    pub status: String,
    /// Platform-reported error detail, empty when healthy.
    #[serde(default)]
    pub error_message: String,
    /// The customer-side VPC.
    pub peer_vpc: PeerVpc,
}

/// The customer-side end of a peering connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerVpc {
    /// Customer VPC identifier.
    pub id: String,
    /// Customer VPC CIDR block.
    pub cidr: String,
    /// Customer cloud account.
    pub account_id: String,
    /// Customer VPC region.
    pub region_code: String,
}

/// Request body for VPC creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVpcRequest {
    /// Display name; the platform generates one when empty.
    pub name: String,
    /// IPv4 CIDR block.
    pub cidr: String,
    /// Region to provision in.
    pub region_code: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RenameRequest<'a> {
    name: &'a str,
}

/// Project-scoped client for the Tidewave control plane.
#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: String,
    project_id: String,
}

impl Client {
    /// Build a client from validated provider configuration.
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-tidewave-access-key",
            HeaderValue::from_str(&config.access_key)
                .map_err(|_| ProviderError::configuration("access_key is not a valid header value"))?,
        );
        let mut secret = HeaderValue::from_str(&config.secret_key)
            .map_err(|_| ProviderError::configuration("secret_key is not a valid header value"))?;
        secret.set_sensitive(true);
        headers.insert("x-tidewave-secret-key", secret);

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http,
            base_url: config.endpoint().trim_end_matches('/').to_string(),
            project_id: config.project_id.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/projects/{}/{}",
            self.base_url, self.project_id, path
        )
    }

    /// Register a new service. The response carries the initial password,
    /// which the platform never returns again.
    pub async fn create_service(
        &self,
        request: CreateServiceRequest,
    ) -> Result<CreateServiceResponse, ProviderError> {
        debug!(name = %request.name, "creating service");
        let resp = self
            .http
            .post(self.url("services"))
            .json(&request)
            .send()
            .await?;
        decode(resp).await
    }

    /// Fetch a service by id.
    pub async fn get_service(&self, id: &str) -> Result<Service, ProviderError> {
        let resp = self
            .http
            .get(self.url(&format!("services/{}", id)))
            .send()
            .await?;
        decode(resp).await
    }

    /// Delete a service by id.
    pub async fn delete_service(&self, id: &str) -> Result<(), ProviderError> {
        debug!(service_id = %id, "deleting service");
        let resp = self
            .http
            .delete(self.url(&format!("services/{}", id)))
            .send()
            .await?;
        ensure_ok(resp).await
    }

    /// Register a new VPC.
    pub async fn create_vpc(&self, request: CreateVpcRequest) -> Result<Vpc, ProviderError> {
        debug!(name = %request.name, region = %request.region_code, "creating vpc");
        let resp = self
            .http
            .post(self.url("vpcs"))
            .json(&request)
            .send()
            .await?;
        decode(resp).await
    }

    /// Fetch a VPC by id.
    pub async fn get_vpc(&self, id: i64) -> Result<Vpc, ProviderError> {
        let resp = self
            .http
            .get(self.url(&format!("vpcs/{}", id)))
            .send()
            .await?;
        decode(resp).await
    }

    /// Fetch a VPC by name, the platform's lookup key for VPCs.
    pub async fn get_vpc_by_name(&self, name: &str) -> Result<Vpc, ProviderError> {
        let resp = self
            .http
            .get(self.url("vpcs"))
            .query(&[("name", name)])
            .send()
            .await?;
        decode(resp).await
    }

    /// Rename a VPC.
    pub async fn rename_vpc(&self, id: i64, name: &str) -> Result<(), ProviderError> {
        debug!(vpc_id = id, new_name = %name, "renaming vpc");
        let resp = self
            .http
            .patch(self.url(&format!("vpcs/{}/rename", id)))
            .json(&RenameRequest { name })
            .send()
            .await?;
        ensure_ok(resp).await
    }

    /// Delete a VPC by id.
    pub async fn delete_vpc(&self, id: i64) -> Result<(), ProviderError> {
        debug!(vpc_id = id, "deleting vpc");
        let resp = self
            .http
            .delete(self.url(&format!("vpcs/{}", id)))
            .send()
            .await?;
        ensure_ok(resp).await
    }
}

async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ProviderError> {
    if resp.status().is_success() {
        return Ok(resp.json().await?);
    }
    Err(error_from_response(resp).await)
}

async fn ensure_ok(resp: reqwest::Response) -> Result<(), ProviderError> {
    if resp.status().is_success() {
        return Ok(());
    }
    Err(error_from_response(resp).await)
}

async fn error_from_response(resp: reqwest::Response) -> ProviderError {
    let status = resp.status().as_u16();
    let url = resp.url().path().to_string();
    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorBody>(&body)
        .map(|b| b.message)
        .unwrap_or(body);

    if status == 404 {
        return ProviderError::NotFound(if message.is_empty() { url } else { message });
    }
    ProviderError::Api { status, message }
}
