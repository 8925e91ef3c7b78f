//! Deterministic five-VM fleet for demos and simulated mode.
//!
//! Instance ids (`mock-vm-N-{participant}`) line up with the usage
//! profiles of [`fleecy_selection::SimulatedUtilization`].

use std::collections::BTreeMap;

use fleecy_core::{FlavorDetails, Participant, ServerAddress, ServerListing, VmStatus};
use fleecy_selection::{Inventory, InventoryFuture};

/// (slot, name, status, flavor, vcpus, ram MB, disk GB, address)
type MockVm = (u8, &'static str, &'static str, &'static str, u32, u64, u64, Option<&'static str>);

const FLEET: [MockVm; 5] = [
    (1, "trainer-small", "ACTIVE", "small", 1, 2048, 20, Some("192.168.1.10")),
    (2, "trainer-medium", "ACTIVE", "medium", 2, 4096, 50, Some("192.168.1.11")),
    (3, "trainer-large", "ACTIVE", "large", 4, 8192, 100, Some("192.168.1.12")),
    (4, "stopped-worker", "SHUTOFF", "medium", 2, 4096, 40, None),
    (5, "failed-worker", "ERROR", "small", 1, 1024, 10, None),
];

/// The mock fleet for one participant, in slot order.
pub fn mock_fleet(participant_id: &str) -> Vec<ServerListing> {
    FLEET
        .iter()
        .map(|&(slot, name, status, flavor, vcpus, ram, disk, addr)| {
            let status = VmStatus::from(status);
            let mut addresses = BTreeMap::new();
            if let Some(addr) = addr {
                addresses.insert(
                    "private".to_string(),
                    vec![ServerAddress {
                        addr: addr.to_string(),
                        kind: "fixed".to_string(),
                    }],
                );
            }
            ServerListing {
                id: format!("mock-vm-{slot}-{participant_id}"),
                name: name.to_string(),
                power_state: if status == VmStatus::Active { 1 } else { 4 },
                status,
                flavor: FlavorDetails {
                    id: format!("mock-{flavor}"),
                    name: flavor.to_string(),
                    vcpus,
                    ram,
                    disk,
                },
                addresses,
                availability_zone: "mock".to_string(),
            }
        })
        .collect()
}

/// Inventory that always returns [`mock_fleet`].
#[derive(Debug, Clone, Copy, Default)]
pub struct MockInventory;

impl Inventory for MockInventory {
    fn list_instances<'a>(&'a self, participant: &'a Participant) -> InventoryFuture<'a> {
        let servers = mock_fleet(&participant.id);
        Box::pin(async move { Ok(servers) })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use fleecy_core::SelectionCriteria;
    use fleecy_selection::{FleetStats, SimulatedUtilization, VmSelector};

    use super::*;

    #[test]
    fn ids_are_scoped_to_participant() {
        let ids: Vec<_> = mock_fleet("p-7").into_iter().map(|s| s.id).collect();
        assert_eq!(
            ids,
            vec!["mock-vm-1-p-7", "mock-vm-2-p-7", "mock-vm-3-p-7", "mock-vm-4-p-7", "mock-vm-5-p-7"]
        );
    }

    #[tokio::test]
    async fn simulated_selection_over_mock_fleet() {
        let selector = VmSelector::new(
            Arc::new(MockInventory),
            Arc::new(SimulatedUtilization::new()),
        );
        let participant = Participant::new("p-1", "lab");

        let stats = selector.fleet_stats(&participant).await.unwrap();
        assert_eq!(
            stats,
            FleetStats {
                total: 5,
                active: 3,
                building: 0,
                error: 1,
                shutoff: 1,
                other: 0,
            }
        );

        let report = selector
            .select(&participant, &SelectionCriteria::default())
            .await
            .unwrap();
        assert_eq!(report.selected.unwrap().id, "mock-vm-3-p-1");
        assert!(report.simulated);
    }
}
