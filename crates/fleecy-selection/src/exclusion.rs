//! Why a candidate was dropped.

use std::fmt;

use serde::Serialize;

use fleecy_core::{InstanceId, VmStatus};

/// Reason a candidate left the pipeline at some stage.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExclusionReason {
    StatusMismatch { actual: VmStatus, required: VmStatus },
    TooFewVcpus { have: u32, need: u32 },
    TooLittleRam { have_mb: u64, need_mb: u64 },
    TooLittleDisk { have_gb: u64, need_gb: u64 },
    /// Raw RAM cannot hold the model even when idle.
    RamBelowModelNeed { have_mb: u64, need_mb: u64, model_mb: u64 },
    /// Raw disk cannot hold the model's footprint even when empty.
    DiskBelowModelNeed { have_gb: u64, need_gb: u64, model_mb: u64 },
    CpuOverCap { usage_percent: f64, cap_percent: f64 },
    /// Memory left after current usage is too small for the task.
    AvailableMemoryShort { available_mb: f64, need_mb: f64 },
    /// Disk left after current usage is too small for the task.
    AvailableDiskShort { available_gb: f64, need_gb: f64 },
    /// The utilization provider could not produce a snapshot.
    UtilizationUnavailable { error: String },
    /// The snapshot carried a NaN or infinite usage figure.
    NonFiniteUsage { metric: &'static str },
}

impl ExclusionReason {
    /// Whether this exclusion came from missing or unusable utilization data
    /// rather than a capacity or load shortfall.
    pub fn is_fetch_failure(&self) -> bool {
        matches!(
            self,
            ExclusionReason::UtilizationUnavailable { .. } | ExclusionReason::NonFiniteUsage { .. }
        )
    }
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StatusMismatch { actual, required } => {
                write!(f, "status mismatch ({actual} != {required})")
            }
            Self::TooFewVcpus { have, need } => {
                write!(f, "insufficient vCPUs ({have} < {need})")
            }
            Self::TooLittleRam { have_mb, need_mb } => {
                write!(f, "insufficient RAM ({have_mb}MB < {need_mb}MB)")
            }
            Self::TooLittleDisk { have_gb, need_gb } => {
                write!(f, "insufficient disk ({have_gb}GB < {need_gb}GB)")
            }
            Self::RamBelowModelNeed { have_mb, need_mb, model_mb } => write!(
                f,
                "insufficient RAM for model size ({have_mb}MB < {need_mb}MB, model {model_mb}MB)"
            ),
            Self::DiskBelowModelNeed { have_gb, need_gb, model_mb } => write!(
                f,
                "insufficient disk for model size ({have_gb}GB < {need_gb}GB, model {model_mb}MB)"
            ),
            Self::CpuOverCap { usage_percent, cap_percent } => {
                write!(f, "CPU usage over cap ({usage_percent:.1}% > {cap_percent:.1}%)")
            }
            Self::AvailableMemoryShort { available_mb, need_mb } => write!(
                f,
                "insufficient available memory ({available_mb:.1}MB < {need_mb:.1}MB)"
            ),
            Self::AvailableDiskShort { available_gb, need_gb } => write!(
                f,
                "insufficient available disk ({available_gb:.1}GB < {need_gb:.1}GB)"
            ),
            Self::UtilizationUnavailable { error } => {
                write!(f, "utilization unavailable: {error}")
            }
            Self::NonFiniteUsage { metric } => {
                write!(f, "non-finite {metric} usage reported")
            }
        }
    }
}

/// A dropped candidate and the reason.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Exclusion {
    pub candidate_id: InstanceId,
    pub candidate_name: String,
    pub reason: ExclusionReason,
}

impl fmt::Display for Exclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.candidate_name, self.reason)
    }
}

/// Survivors and exclusions of one filtering stage.
#[derive(Debug, Clone)]
pub struct StageOutcome<T> {
    pub passed: Vec<T>,
    pub excluded: Vec<Exclusion>,
}

impl<T> StageOutcome<T> {
    /// Number of candidates this stage removed.
    pub fn pruned(&self) -> usize {
        self.excluded.len()
    }

    /// Exclusions caused by failed utilization fetches.
    pub fn fetch_failures(&self) -> usize {
        self.excluded
            .iter()
            .filter(|e| e.reason.is_fetch_failure())
            .count()
    }
}
