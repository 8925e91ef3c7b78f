//! Utilization admission: is this machine free enough right now?
//!
//! Fetches one [`UtilizationSnapshot`] per feasible candidate through a
//! [`UtilizationProvider`], then drops candidates whose CPU usage is over
//! the cap or whose usage-adjusted memory/disk cannot hold the task. A
//! failed fetch excludes only that candidate.

use std::future::Future;
use std::pin::Pin;

use futures_util::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use fleecy_core::Participant;

use crate::candidate::VmCandidate;
use crate::criteria::AdmissionCriteria;
use crate::error::CollaboratorError;
use crate::exclusion::{Exclusion, ExclusionReason, StageOutcome};

/// Live resource consumption of one candidate at selection time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct UtilizationSnapshot {
    pub cpu_usage_percent: f64,
    pub memory_usage_percent: f64,
    pub disk_usage_percent: f64,
    pub is_healthy: bool,
}

impl UtilizationSnapshot {
    pub fn new(cpu: f64, memory: f64, disk: f64, is_healthy: bool) -> Self {
        Self {
            cpu_usage_percent: cpu,
            memory_usage_percent: memory,
            disk_usage_percent: disk,
            is_healthy,
        }
    }

    /// Placeholder row for a candidate whose metrics could not be read.
    pub fn unavailable() -> Self {
        Self::default()
    }

    /// Weighted load figure for monitoring: CPU 60%, memory 30%, disk 10%.
    pub fn composite_score(&self) -> f64 {
        self.cpu_usage_percent * 0.6 + self.memory_usage_percent * 0.3 + self.disk_usage_percent * 0.1
    }

    /// Name of the first usage figure that is NaN or infinite.
    pub fn non_finite_metric(&self) -> Option<&'static str> {
        [
            ("cpu", self.cpu_usage_percent),
            ("memory", self.memory_usage_percent),
            ("disk", self.disk_usage_percent),
        ]
        .into_iter()
        .find(|(_, value)| !value.is_finite())
        .map(|(metric, _)| metric)
    }

    pub fn available_memory_mb(&self, ram_mb: u64) -> f64 {
        ram_mb as f64 * (1.0 - self.memory_usage_percent / 100.0)
    }

    pub fn available_disk_gb(&self, disk_gb: u64) -> f64 {
        disk_gb as f64 * (1.0 - self.disk_usage_percent / 100.0)
    }
}

/// Boxed future returned by [`UtilizationProvider::utilization`].
pub type UtilizationFuture<'a> =
    Pin<Box<dyn Future<Output = Result<UtilizationSnapshot, CollaboratorError>> + Send + 'a>>;

/// Source of utilization snapshots, live metrics or simulated data.
pub trait UtilizationProvider: Send + Sync {
    fn utilization<'a>(
        &'a self,
        participant: &'a Participant,
        candidate: &'a VmCandidate,
    ) -> UtilizationFuture<'a>;

    /// Whether snapshots are simulated rather than measured.
    fn is_simulated(&self) -> bool {
        false
    }
}

/// Result of one utilization fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Measured(UtilizationSnapshot),
    Excluded(String),
}

/// Fetch a snapshot, turning a provider failure into an exclusion.
pub async fn fetch(
    provider: &dyn UtilizationProvider,
    participant: &Participant,
    candidate: &VmCandidate,
) -> FetchOutcome {
    match provider.utilization(participant, candidate).await {
        Ok(snapshot) => FetchOutcome::Measured(snapshot),
        Err(e) => {
            warn!(candidate = %candidate.name, error = %e, "utilization fetch failed");
            FetchOutcome::Excluded(e.to_string())
        }
    }
}

/// Upper bound on utilization fetches in flight for one participant.
pub const MAX_CONCURRENT_FETCHES: usize = 8;

/// Fetch every candidate's snapshot, at most [`MAX_CONCURRENT_FETCHES`]
/// at a time. Outcomes come back in candidate order.
pub async fn fetch_all(
    provider: &dyn UtilizationProvider,
    participant: &Participant,
    candidates: &[VmCandidate],
) -> Vec<FetchOutcome> {
    stream::iter(candidates)
        .map(|c| fetch(provider, participant, c))
        .buffered(MAX_CONCURRENT_FETCHES)
        .collect()
        .await
}

/// A candidate that survived both filters, with the snapshot it was judged on.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Finalist {
    pub candidate: VmCandidate,
    pub utilization: UtilizationSnapshot,
}

/// Judge one candidate against its snapshot.
pub fn check_utilization(
    candidate: &VmCandidate,
    snapshot: &UtilizationSnapshot,
    criteria: &AdmissionCriteria,
) -> Result<(), ExclusionReason> {
    if let Some(metric) = snapshot.non_finite_metric() {
        return Err(ExclusionReason::NonFiniteUsage { metric });
    }

    if snapshot.cpu_usage_percent > criteria.max_cpu_usage_percent {
        return Err(ExclusionReason::CpuOverCap {
            usage_percent: snapshot.cpu_usage_percent,
            cap_percent: criteria.max_cpu_usage_percent,
        });
    }

    let available_mb = snapshot.available_memory_mb(candidate.ram_mb);
    let need_mb = criteria.memory_mb();
    if available_mb < need_mb {
        return Err(ExclusionReason::AvailableMemoryShort { available_mb, need_mb });
    }

    let available_gb = snapshot.available_disk_gb(candidate.disk_gb);
    let need_gb = criteria.disk_gb();
    if available_gb < need_gb {
        return Err(ExclusionReason::AvailableDiskShort { available_gb, need_gb });
    }

    Ok(())
}

/// Fetch utilization for every survivor with bounded concurrency and keep
/// the ones that can take the task now. Order is preserved.
pub async fn filter_by_utilization(
    provider: &dyn UtilizationProvider,
    participant: &Participant,
    survivors: Vec<VmCandidate>,
    criteria: &AdmissionCriteria,
) -> StageOutcome<Finalist> {
    let outcomes = fetch_all(provider, participant, &survivors).await;

    let mut passed = Vec::with_capacity(survivors.len());
    let mut excluded = Vec::new();

    for (candidate, outcome) in survivors.into_iter().zip(outcomes) {
        let verdict = match outcome {
            FetchOutcome::Measured(snapshot) => {
                debug!(
                    candidate = %candidate.name,
                    cpu = snapshot.cpu_usage_percent,
                    memory = snapshot.memory_usage_percent,
                    disk = snapshot.disk_usage_percent,
                    healthy = snapshot.is_healthy,
                    "utilization fetched"
                );
                check_utilization(&candidate, &snapshot, criteria).map(|()| snapshot)
            }
            FetchOutcome::Excluded(error) => Err(ExclusionReason::UtilizationUnavailable { error }),
        };

        match verdict {
            Ok(utilization) => passed.push(Finalist { candidate, utilization }),
            Err(reason) => {
                debug!(candidate = %candidate.name, %reason, "excluded at utilization");
                excluded.push(Exclusion {
                    candidate_id: candidate.id,
                    candidate_name: candidate.name,
                    reason,
                });
            }
        }
    }

    StageOutcome { passed, excluded }
}
