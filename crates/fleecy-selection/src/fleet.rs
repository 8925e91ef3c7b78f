//! Inventory summary by status, for display.

use serde::Serialize;

use fleecy_core::VmStatus;

use crate::candidate::VmCandidate;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Default)]
pub struct FleetStats {
    pub total: usize,
    pub active: usize,
    pub building: usize,
    pub error: usize,
    pub shutoff: usize,
    pub other: usize,
}

impl FleetStats {
    pub fn from_candidates(candidates: &[VmCandidate]) -> Self {
        let mut stats = FleetStats {
            total: candidates.len(),
            ..FleetStats::default()
        };
        for c in candidates {
            match c.status {
                VmStatus::Active => stats.active += 1,
                VmStatus::Building => stats.building += 1,
                VmStatus::Error => stats.error += 1,
                VmStatus::Shutoff => stats.shutoff += 1,
                VmStatus::Other(_) => stats.other += 1,
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_status(status: &str) -> VmCandidate {
        VmCandidate {
            id: status.to_string(),
            name: status.to_string(),
            participant_id: "p".to_string(),
            status: VmStatus::from(status),
            vcpus: 1,
            ram_mb: 1024,
            disk_gb: 10,
            flavor_name: "small".to_string(),
            addresses: Vec::new(),
        }
    }

    #[test]
    fn counts_each_status() {
        let fleet: Vec<_> = ["ACTIVE", "ACTIVE", "BUILD", "ERROR", "SHUTOFF", "PAUSED"]
            .into_iter()
            .map(with_status)
            .collect();

        let stats = FleetStats::from_candidates(&fleet);
        assert_eq!(
            stats,
            FleetStats {
                total: 6,
                active: 2,
                building: 1,
                error: 1,
                shutoff: 1,
                other: 1,
            }
        );
    }

    #[test]
    fn empty_fleet() {
        assert_eq!(FleetStats::from_candidates(&[]), FleetStats::default());
    }
}
