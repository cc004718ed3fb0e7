//! The VPC resource.
//!
//! VPC creation is synchronous at the control plane, so there is no
//! readiness wait here. The platform's lookup key for VPCs is the name;
//! read and import both fetch by name, while delete and rename address the
//! numeric id.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::client::{Client, CreateVpcRequest, Vpc};
use crate::error::ProviderError;
use crate::resources::{changed, reject_invalid, ResourceKind};
use crate::schema::{Attribute, AttributeType, Schema};

/// Type name the host dispatches on.
pub const TYPE_NAME: &str = "tidewave_vpc";

const ERR_REGION_CHANGE: &str = "Changing a VPC's region is not supported";
const ERR_CIDR_CHANGE: &str = "Changing a VPC's CIDR block is not supported";

/// Regions the platform can provision VPCs in.
pub const REGION_CODES: [&str; 5] = [
    "us-east-1",
    "eu-west-1",
    "us-west-2",
    "eu-central-1",
    "ap-southeast-2",
];

/// Host-facing state of a VPC.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VpcState {
    /// VPC identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Cloud-side identifier once provisioned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provisioned_id: Option<String>,
    /// Owning project.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    /// IPv4 CIDR block.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cidr: Option<String>,
    /// Display name; the platform generates one when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Region the VPC lives in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region_code: Option<String>,
    /// Provisioning status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Platform-reported error detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Creation timestamp.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    /// Last-update timestamp.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<String>,
    /// Peering connections attached to this VPC.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peering_connections: Option<Vec<PeeringConnectionState>>,
}

/// Host-facing state of one peering connection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeeringConnectionState {
    /// Peering connection identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// The Tidewave-side VPC.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpc_id: Option<String>,
    /// Peering status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Platform-reported error detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// The customer-side VPC.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peer_vpc: Option<PeerVpcState>,
}

/// The customer-side end of a peering connection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeerVpcState {
    /// Customer VPC identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Customer VPC CIDR block.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cidr: Option<String>,
    /// Customer cloud account.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    /// Customer VPC region.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region_code: Option<String>,
}

/// The `tidewave_vpc` resource kind.
#[derive(Debug, Clone, Default)]
pub struct VpcResource;

impl VpcResource {
    /// Create the resource kind.
    pub fn new() -> Self {
        Self
    }
}

fn parse_id(raw: &str, what: &str) -> Result<i64, ProviderError> {
    raw.parse::<i64>()
        .map_err(|_| ProviderError::validation(format!("could not parse {} id {:?}", what, raw)))
}

/// Map a wire VPC onto state. Numeric ids arrive as strings and are parsed
/// here; a non-numeric id is a malformed control-plane response.
fn reconcile(vpc: &Vpc) -> Result<VpcState, ProviderError> {
    let mut peering = Vec::with_capacity(vpc.peering_connections.len());
    for pc in &vpc.peering_connections {
        peering.push(PeeringConnectionState {
            id: Some(parse_id(&pc.id, "peering connection")?),
            vpc_id: Some(pc.vpc_id.clone()),
            status: Some(pc.status.clone()),
            error_message: Some(pc.error_message.clone()),
            peer_vpc: Some(PeerVpcState {
                id: Some(pc.peer_vpc.id.clone()),
                cidr: Some(pc.peer_vpc.cidr.clone()),
                account_id: Some(pc.peer_vpc.account_id.clone()),
                region_code: Some(pc.peer_vpc.region_code.clone()),
            }),
        });
    }

    Ok(VpcState {
        id: Some(parse_id(&vpc.id, "VPC")?),
        provisioned_id: Some(vpc.provisioned_id.clone()),
        project_id: Some(vpc.project_id.clone()),
        cidr: Some(vpc.cidr.clone()),
        name: Some(vpc.name.clone()),
        region_code: Some(vpc.region_code.clone()),
        status: Some(vpc.status.clone()),
        error_message: Some(vpc.error_message.clone()),
        created: Some(vpc.created.clone()),
        updated: Some(vpc.updated.clone()),
        peering_connections: Some(peering),
    })
}

fn state_from(value: &Value) -> Result<VpcState, ProviderError> {
    Ok(serde_json::from_value(value.clone())?)
}

fn state_into(state: VpcState) -> Result<Value, ProviderError> {
    Ok(serde_json::to_value(state)?)
}

#[async_trait]
impl ResourceKind for VpcResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        let peer_vpc_type = AttributeType::object([
            ("id", AttributeType::String),
            ("cidr", AttributeType::String),
            ("account_id", AttributeType::String),
            ("region_code", AttributeType::String),
        ]);
        let peering_type = AttributeType::list(AttributeType::object([
            ("id", AttributeType::Int64),
            ("vpc_id", AttributeType::String),
            ("status", AttributeType::String),
            ("error_message", AttributeType::String),
            ("peer_vpc", peer_vpc_type),
        ]));

        Schema::v0()
            .with_attribute("id", Attribute::int64().computed())
            .with_attribute("provisioned_id", Attribute::string().computed())
            .with_attribute("project_id", Attribute::string().computed())
            .with_attribute(
                "cidr",
                Attribute::string()
                    .required()
                    .with_description("The IPv4 CIDR block"),
            )
            .with_attribute(
                "name",
                Attribute::string().optional_computed().with_description(
                    "VPC name. If absent, the provider generates a default.",
                ),
            )
            .with_attribute(
                "region_code",
                Attribute::string()
                    .required()
                    .with_description("The region for this VPC")
                    .with_one_of(REGION_CODES),
            )
            .with_attribute("status", Attribute::string().computed())
            .with_attribute("error_message", Attribute::string().computed())
            .with_attribute("created", Attribute::string().computed())
            .with_attribute("updated", Attribute::string().computed())
            .with_attribute(
                "peering_connections",
                Attribute::typed(peering_type).computed(),
            )
    }

    async fn create(
        &self,
        client: &Client,
        planned: Value,
        _cancel: &CancellationToken,
    ) -> Result<Value, ProviderError> {
        reject_invalid(self.validate(&planned))?;
        let plan = state_from(&planned)?;

        // validate() already enforced presence.
        let cidr = plan
            .cidr
            .ok_or_else(|| ProviderError::validation("cidr is required"))?;
        let region_code = plan
            .region_code
            .ok_or_else(|| ProviderError::validation("region_code is required"))?;

        info!(region = %region_code, "creating vpc");
        let vpc = client
            .create_vpc(CreateVpcRequest {
                name: plan.name.unwrap_or_default(),
                cidr,
                region_code,
            })
            .await?;

        state_into(reconcile(&vpc)?)
    }

    async fn read(&self, client: &Client, current: Value) -> Result<Value, ProviderError> {
        let state = state_from(&current)?;
        let name = state
            .name
            .ok_or_else(|| ProviderError::validation("vpc state is missing its name"))?;

        debug!(vpc_name = %name, "reading vpc");
        let vpc = client.get_vpc_by_name(&name).await?;
        state_into(reconcile(&vpc)?)
    }

    async fn update(
        &self,
        client: &Client,
        prior: Value,
        planned: Value,
    ) -> Result<Value, ProviderError> {
        let mut prior_state = state_from(&prior)?;
        let plan = state_from(&planned)?;

        if changed(&plan.region_code, &prior_state.region_code) {
            return Err(ProviderError::validation(ERR_REGION_CHANGE));
        }
        if changed(&plan.cidr, &prior_state.cidr) {
            return Err(ProviderError::validation(ERR_CIDR_CHANGE));
        }

        if changed(&plan.name, &prior_state.name) {
            let id = prior_state
                .id
                .ok_or_else(|| ProviderError::validation("vpc state is missing its id"))?;
            let name = plan.name.clone().unwrap_or_default();
            info!(vpc_id = id, new_name = %name, "renaming vpc");
            client.rename_vpc(id, &name).await?;
            prior_state.name = plan.name;
        }

        state_into(prior_state)
    }

    async fn delete(&self, client: &Client, current: Value) -> Result<(), ProviderError> {
        let state = state_from(&current)?;
        let id = state
            .id
            .ok_or_else(|| ProviderError::validation("vpc state is missing its id"))?;

        info!(vpc_id = id, "deleting vpc");
        client.delete_vpc(id).await
    }

    async fn import(&self, client: &Client, name: &str) -> Result<Value, ProviderError> {
        let vpc = client.get_vpc_by_name(name).await?;
        state_into(reconcile(&vpc)?)
    }
}
