//! Collaborator assembly by provider mode.

use std::sync::Arc;

use tracing::info;

use fleecy_core::{FleecyConfig, ProviderConfig, ProviderMode};
use fleecy_selection::{Inventory, SimulatedUtilization, UtilizationProvider, VmSelector};

use crate::error::CloudResult;
use crate::transport::HttpClient;
use crate::live::LiveUtilization;
use crate::mock::MockInventory;
use crate::openstack::OpenStackClient;
use crate::prometheus::PrometheusClient;

/// The inventory and utilization provider a selector runs against.
#[derive(Clone)]
pub struct Collaborators {
    pub inventory: Arc<dyn Inventory>,
    pub utilization: Arc<dyn UtilizationProvider>,
}

/// Live mode talks to OpenStack and Prometheus; simulated mode serves the
/// mock fleet with simulated usage.
pub fn build_collaborators(config: &ProviderConfig) -> CloudResult<Collaborators> {
    let collaborators = match config.mode {
        ProviderMode::Live => {
            let http = HttpClient::new(config.request_timeout()?);
            let openstack = OpenStackClient::new(http.clone());
            let utilization = LiveUtilization::new(
                openstack.clone(),
                PrometheusClient::new(http),
                config.prometheus_port,
            );
            Collaborators {
                inventory: Arc::new(openstack),
                utilization: Arc::new(utilization),
            }
        }
        ProviderMode::Simulated => Collaborators {
            inventory: Arc::new(MockInventory),
            utilization: Arc::new(SimulatedUtilization::new()),
        },
    };
    info!(mode = ?config.mode, "collaborators ready");
    Ok(collaborators)
}

/// A selector wired to the collaborators `config` asks for.
pub fn build_selector(config: &FleecyConfig) -> CloudResult<VmSelector> {
    let Collaborators { inventory, utilization } = build_collaborators(&config.provider)?;
    Ok(VmSelector::new(inventory, utilization))
}
