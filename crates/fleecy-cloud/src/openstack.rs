//! OpenStack compute inventory and instance health probe.
//!
//! Authenticates with an application credential (identity v3), lists
//! servers from compute v2.1 and fills in each server's flavor.

use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use fleecy_core::{FlavorDetails, Participant, ServerListing, VmStatus};
use fleecy_selection::{Inventory, InventoryFuture};

use crate::error::{CloudError, CloudResult};
use crate::transport::{HttpClient, endpoint_url};

const TOKEN_HEADER: &str = "x-subject-token";
const AUTH_HEADER: &str = "x-auth-token";

#[derive(Debug, Deserialize)]
struct ServersEnvelope {
    servers: Vec<ServerListing>,
}

#[derive(Debug, Deserialize)]
struct FlavorEnvelope {
    flavor: FlavorDetails,
}

#[derive(Debug, Deserialize)]
struct ServerStatus {
    status: VmStatus,
}

#[derive(Debug, Deserialize)]
struct ServerEnvelope {
    server: ServerStatus,
}

/// Result of probing one instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceHealth {
    pub healthy: bool,
    pub status: String,
    pub message: String,
}

impl InstanceHealth {
    pub(crate) fn unreachable(message: String) -> Self {
        Self {
            healthy: false,
            status: "UNKNOWN".to_string(),
            message,
        }
    }
}

/// Compute API client for participant clouds.
#[derive(Debug, Clone)]
pub struct OpenStackClient {
    http: HttpClient,
}

impl OpenStackClient {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    /// Obtain a scoped token from the participant's application credential.
    pub async fn authenticate(&self, participant: &Participant) -> CloudResult<String> {
        if !participant.has_credentials() {
            return Err(CloudError::Auth(format!(
                "participant {} has no application credential",
                participant.id
            )));
        }
        let url = endpoint_url(&participant.openstack_endpoint, "identity/v3/auth/tokens")?;
        let body = json!({
            "auth": {
                "identity": {
                    "methods": ["application_credential"],
                    "application_credential": {
                        "id": participant.application_credential_id,
                        "secret": participant.application_credential_secret,
                    }
                }
            }
        });

        let response = self.http.post_json(&url, &[], &body).await?;
        if response.status == 401 {
            return Err(CloudError::Auth(format!(
                "identity service rejected the credential of participant {}",
                participant.id
            )));
        }
        let response = response.expect_status(&url, 201)?;
        let token = response
            .header(TOKEN_HEADER)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| CloudError::Auth("identity response carried no token".to_string()))?;

        debug!(participant = %participant.id, "authenticated");
        Ok(token.to_string())
    }

    /// List every server with its flavor resolved.
    ///
    /// A flavor that cannot be fetched degrades to [`FlavorDetails::unknown`].
    pub async fn list_servers(&self, participant: &Participant) -> CloudResult<Vec<ServerListing>> {
        let token = self.authenticate(participant).await?;
        let url = endpoint_url(&participant.openstack_endpoint, "compute/v2.1/servers/detail")?;
        let envelope: ServersEnvelope = self
            .http
            .get(&url, &[(AUTH_HEADER, token.as_str())])
            .await?
            .expect_success(&url)?
            .json(&url)?;

        let mut servers = envelope.servers;
        for server in &mut servers {
            let flavor_id = server.flavor.id.clone();
            server.flavor = match self.flavor(participant, &token, &flavor_id).await {
                Ok(flavor) => flavor,
                Err(e) => {
                    warn!(server = %server.id, flavor = %flavor_id, error = %e, "flavor lookup failed");
                    FlavorDetails::unknown(flavor_id)
                }
            };
        }

        info!(participant = %participant.id, servers = servers.len(), "listed servers");
        Ok(servers)
    }

    pub async fn flavor(
        &self,
        participant: &Participant,
        token: &str,
        flavor_id: &str,
    ) -> CloudResult<FlavorDetails> {
        if flavor_id.is_empty() {
            return Err(CloudError::Malformed("server has no flavor id".to_string()));
        }
        let url = endpoint_url(
            &participant.openstack_endpoint,
            &format!("compute/v2.1/flavors/{flavor_id}"),
        )?;
        let envelope: FlavorEnvelope = self
            .http
            .get(&url, &[(AUTH_HEADER, token)])
            .await?
            .expect_success(&url)?
            .json(&url)?;
        Ok(envelope.flavor)
    }

    /// Probe one instance. Healthy iff the compute API reports it ACTIVE;
    /// any failure reads as unhealthy.
    pub async fn health_check(&self, participant: &Participant, instance_id: &str) -> InstanceHealth {
        match self.authenticate(participant).await {
            Ok(token) => self.health_check_with_token(participant, &token, instance_id).await,
            Err(e) => {
                debug!(instance = instance_id, error = %e, "health probe could not authenticate");
                InstanceHealth::unreachable(e.to_string())
            }
        }
    }

    /// [`Self::health_check`] with a token the caller already holds.
    pub async fn health_check_with_token(
        &self,
        participant: &Participant,
        token: &str,
        instance_id: &str,
    ) -> InstanceHealth {
        match self.server_status(participant, token, instance_id).await {
            Ok(status) => InstanceHealth {
                healthy: status == VmStatus::Active,
                message: format!("instance status is {status}"),
                status: status.to_string(),
            },
            Err(e) => {
                debug!(instance = instance_id, error = %e, "health probe failed");
                InstanceHealth::unreachable(e.to_string())
            }
        }
    }

    async fn server_status(
        &self,
        participant: &Participant,
        token: &str,
        instance_id: &str,
    ) -> CloudResult<VmStatus> {
        let url = endpoint_url(
            &participant.openstack_endpoint,
            &format!("compute/v2.1/servers/{instance_id}"),
        )?;
        let envelope: ServerEnvelope = self
            .http
            .get(&url, &[(AUTH_HEADER, token)])
            .await?
            .expect_success(&url)?
            .json(&url)?;
        Ok(envelope.server.status)
    }
}

impl Inventory for OpenStackClient {
    fn list_instances<'a>(&'a self, participant: &'a Participant) -> InventoryFuture<'a> {
        Box::pin(async move { self.list_servers(participant).await.map_err(Into::into) })
    }
}
