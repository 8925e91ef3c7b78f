//! Deterministic utilization for tests and demos.
//!
//! Usage is a pure function of the instance identifier: a few well-known
//! identifier fragments map to fixed usage triples, everything else reads
//! 50/50/50. Health is derived as `cpu < 80 && memory < 80`.

use fleecy_core::Participant;

use crate::candidate::VmCandidate;
use crate::utilization::{UtilizationFuture, UtilizationProvider, UtilizationSnapshot};

/// Identifier fragment → (cpu%, memory%, disk%).
const PROFILES: &[(&str, (f64, f64, f64))] = &[
    ("mock-vm-1", (25.5, 40.2, 15.8)),
    // Busy.
    ("mock-vm-2", (75.8, 60.3, 30.5)),
    // Quiet.
    ("mock-vm-3", (35.2, 25.1, 12.7)),
    // Offline and errored machines report nothing.
    ("mock-vm-4", (0.0, 0.0, 0.0)),
    ("mock-vm-5", (0.0, 0.0, 0.0)),
];

const DEFAULT_USAGE: (f64, f64, f64) = (50.0, 50.0, 50.0);

const HEALTH_LIMIT_PERCENT: f64 = 80.0;

/// Simulated utilization provider. Never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedUtilization;

impl SimulatedUtilization {
    pub fn new() -> Self {
        Self
    }

    /// The snapshot reported for an instance identifier.
    pub fn snapshot_for(instance_id: &str) -> UtilizationSnapshot {
        let (cpu, memory, disk) = PROFILES
            .iter()
            .find(|(fragment, _)| instance_id.contains(fragment))
            .map(|(_, usage)| *usage)
            .unwrap_or(DEFAULT_USAGE);

        UtilizationSnapshot::new(
            cpu,
            memory,
            disk,
            cpu < HEALTH_LIMIT_PERCENT && memory < HEALTH_LIMIT_PERCENT,
        )
    }
}

impl UtilizationProvider for SimulatedUtilization {
    fn utilization<'a>(
        &'a self,
        _participant: &'a Participant,
        candidate: &'a VmCandidate,
    ) -> UtilizationFuture<'a> {
        let snapshot = Self::snapshot_for(&candidate.id);
        Box::pin(async move { Ok(snapshot) })
    }

    fn is_simulated(&self) -> bool {
        true
    }
}
