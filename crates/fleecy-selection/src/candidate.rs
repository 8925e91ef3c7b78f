//! Candidate normalization and the inventory contract.
//!
//! Bridges provider-native [`ServerListing`]s to the uniform
//! [`VmCandidate`] the filters and scorer operate on.

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use fleecy_core::{InstanceId, Participant, ParticipantId, ServerListing, VmStatus};

use crate::error::CollaboratorError;

/// One virtual machine under consideration.
///
/// Hardware facts are fixed at construction and never change during a
/// selection pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VmCandidate {
    pub id: InstanceId,
    pub name: String,
    pub participant_id: ParticipantId,
    pub status: VmStatus,
    pub vcpus: u32,
    pub ram_mb: u64,
    pub disk_gb: u64,
    pub flavor_name: String,
    /// IPv4 addresses reported by the provider.
    pub addresses: Vec<String>,
}

impl VmCandidate {
    /// Convert a single provider listing.
    pub fn from_listing(participant_id: &str, server: &ServerListing) -> Self {
        Self {
            id: server.id.clone(),
            name: server.name.clone(),
            participant_id: participant_id.to_string(),
            status: server.status.clone(),
            vcpus: server.flavor.vcpus,
            ram_mb: server.flavor.ram,
            disk_gb: server.flavor.disk,
            flavor_name: server.flavor.name.clone(),
            addresses: server.ipv4_addresses(),
        }
    }

    /// First IPv4 address, if any.
    pub fn primary_address(&self) -> Option<&str> {
        self.addresses.first().map(String::as_str)
    }
}

/// Normalize a provider listing, preserving its order.
pub fn normalize(participant_id: &str, servers: &[ServerListing]) -> Vec<VmCandidate> {
    servers
        .iter()
        .map(|s| VmCandidate::from_listing(participant_id, s))
        .collect()
}

/// Boxed future returned by [`Inventory::list_instances`].
pub type InventoryFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Vec<ServerListing>, CollaboratorError>> + Send + 'a>>;

/// The cloud runtime provider's "list all instances for participant"
/// operation.
pub trait Inventory: Send + Sync {
    fn list_instances<'a>(&'a self, participant: &'a Participant) -> InventoryFuture<'a>;
}
