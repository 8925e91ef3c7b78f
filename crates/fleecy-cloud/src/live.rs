//! Live utilization: Prometheus usage plus an OpenStack health probe.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::{debug, warn};
use url::Url;

use fleecy_core::Participant;
use fleecy_selection::{UtilizationFuture, UtilizationProvider, UtilizationSnapshot, VmCandidate};

use crate::error::{CloudError, CloudResult};
use crate::openstack::{InstanceHealth, OpenStackClient};
use crate::prometheus::{PrometheusClient, QueryResponse, instance_or_default};

/// Prometheus base URL for a participant: the explicit `prometheus_url`,
/// else the OpenStack endpoint host on `port`.
pub fn prometheus_base(participant: &Participant, port: u16) -> CloudResult<Url> {
    let invalid = |url: &str, message: String| CloudError::InvalidUrl {
        url: url.to_string(),
        message,
    };

    let mut url = match participant.prometheus_url.as_deref() {
        Some(explicit) if !explicit.trim().is_empty() => {
            Url::parse(explicit).map_err(|e| invalid(explicit, e.to_string()))?
        }
        _ => {
            let endpoint = participant.openstack_endpoint.as_str();
            let mut url = Url::parse(endpoint).map_err(|e| invalid(endpoint, e.to_string()))?;
            url.set_port(Some(port))
                .map_err(|()| invalid(endpoint, "endpoint cannot carry a port".to_string()))?;
            url.set_path("/");
            url.set_query(None);
            url
        }
    };
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// How long one identity token and scrape target list are reused.
const SESSION_TTL: Duration = Duration::from_secs(30);

/// Token and scrape targets shared by every candidate of one participant.
#[derive(Debug)]
struct Session {
    base: Url,
    /// `None` when authentication failed; health then reads unknown.
    token: Option<String>,
    /// `None` when the target list could not be read.
    targets: Option<QueryResponse>,
    opened: Instant,
}

/// Utilization measured from node-exporter series; health from the compute API.
///
/// The identity token and the node-exporter target list are fetched once
/// per participant and reused for [`SESSION_TTL`], so a selection over many
/// candidates authenticates and lists targets once.
#[derive(Debug, Clone)]
pub struct LiveUtilization {
    openstack: OpenStackClient,
    prometheus: PrometheusClient,
    prometheus_port: u16,
    sessions: Arc<Mutex<HashMap<String, Arc<Session>>>>,
}

impl LiveUtilization {
    pub fn new(openstack: OpenStackClient, prometheus: PrometheusClient, prometheus_port: u16) -> Self {
        Self {
            openstack,
            prometheus,
            prometheus_port,
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// The participant's live session, opening a fresh one when missing or
    /// stale. Concurrent callers wait on the same lock, so only one opens it.
    async fn session(&self, participant: &Participant) -> CloudResult<Arc<Session>> {
        let mut sessions = self.sessions.lock().await;
        if let Some(session) = sessions.get(&participant.id) {
            if session.opened.elapsed() < SESSION_TTL {
                return Ok(session.clone());
            }
        }

        let base = prometheus_base(participant, self.prometheus_port)?;
        let (token, targets) = tokio::join!(
            self.openstack.authenticate(participant),
            self.prometheus.targets(&base),
        );
        let token = match token {
            Ok(token) => Some(token),
            Err(e) => {
                warn!(participant = %participant.id, error = %e, "health probes will read unknown");
                None
            }
        };
        let targets = match targets {
            Ok(targets) => Some(targets),
            Err(e) => {
                debug!(participant = %participant.id, error = %e, "target lookup failed");
                None
            }
        };

        let session = Arc::new(Session {
            base,
            token,
            targets,
            opened: Instant::now(),
        });
        sessions.insert(participant.id.clone(), session.clone());
        debug!(participant = %participant.id, "live session opened");
        Ok(session)
    }

    async fn measure(&self, participant: &Participant, candidate: &VmCandidate) -> CloudResult<UtilizationSnapshot> {
        let ip = candidate
            .primary_address()
            .ok_or_else(|| CloudError::NoData(format!("{} has no IPv4 address", candidate.id)))?;
        let session = self.session(participant).await?;
        let instance = instance_or_default(session.targets.as_ref(), ip);

        let health = async {
            match session.token.as_deref() {
                Some(token) => {
                    self.openstack
                        .health_check_with_token(participant, token, &candidate.id)
                        .await
                }
                None => InstanceHealth::unreachable("no identity token".to_string()),
            }
        };
        let (usage, health) = tokio::join!(self.prometheus.node_usage(&session.base, &instance), health);
        let usage = usage?;

        debug!(
            candidate = %candidate.id,
            %instance,
            cpu = usage.cpu_percent,
            memory = usage.memory_percent,
            disk = usage.disk_percent,
            healthy = health.healthy,
            "measured utilization"
        );
        Ok(UtilizationSnapshot::new(
            usage.cpu_percent,
            usage.memory_percent,
            usage.disk_percent,
            health.healthy,
        ))
    }
}

impl UtilizationProvider for LiveUtilization {
    fn utilization<'a>(
        &'a self,
        participant: &'a Participant,
        candidate: &'a VmCandidate,
    ) -> UtilizationFuture<'a> {
        Box::pin(async move { self.measure(participant, candidate).await.map_err(Into::into) })
    }
}
