//! Feasibility filtering: can this machine ever run the task?
//!
//! Two checks per candidate, independent of current load:
//! 1. **Static**: status and the minimum vCPU/RAM/disk floors
//! 2. **Dynamic**: raw RAM and disk against the model-size requirement

use tracing::debug;

use crate::candidate::VmCandidate;
use crate::criteria::AdmissionCriteria;
use crate::exclusion::{Exclusion, ExclusionReason, StageOutcome};

/// Check one candidate; returns the first failing reason.
pub fn check_feasible(
    candidate: &VmCandidate,
    criteria: &AdmissionCriteria,
) -> Result<(), ExclusionReason> {
    if candidate.status != criteria.required_status {
        return Err(ExclusionReason::StatusMismatch {
            actual: candidate.status.clone(),
            required: criteria.required_status.clone(),
        });
    }
    if candidate.vcpus < criteria.min_vcpus {
        return Err(ExclusionReason::TooFewVcpus {
            have: candidate.vcpus,
            need: criteria.min_vcpus,
        });
    }
    if candidate.ram_mb < criteria.min_ram_mb {
        return Err(ExclusionReason::TooLittleRam {
            have_mb: candidate.ram_mb,
            need_mb: criteria.min_ram_mb,
        });
    }
    if candidate.disk_gb < criteria.min_disk_gb {
        return Err(ExclusionReason::TooLittleDisk {
            have_gb: candidate.disk_gb,
            need_gb: criteria.min_disk_gb,
        });
    }

    let need_mb = criteria.static_memory_mb();
    if candidate.ram_mb < need_mb {
        return Err(ExclusionReason::RamBelowModelNeed {
            have_mb: candidate.ram_mb,
            need_mb,
            model_mb: criteria.model_size_mb,
        });
    }
    let need_gb = criteria.static_disk_gb();
    if candidate.disk_gb < need_gb {
        return Err(ExclusionReason::DiskBelowModelNeed {
            have_gb: candidate.disk_gb,
            need_gb,
            model_mb: criteria.model_size_mb,
        });
    }

    Ok(())
}

/// Split candidates into feasible survivors and exclusions, preserving order.
pub fn filter_feasible(
    candidates: Vec<VmCandidate>,
    criteria: &AdmissionCriteria,
) -> StageOutcome<VmCandidate> {
    let mut passed = Vec::with_capacity(candidates.len());
    let mut excluded = Vec::new();

    for candidate in candidates {
        match check_feasible(&candidate, criteria) {
            Ok(()) => {
                debug!(candidate = %candidate.name, "passed feasibility");
                passed.push(candidate);
            }
            Err(reason) => {
                debug!(candidate = %candidate.name, %reason, "excluded at feasibility");
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
