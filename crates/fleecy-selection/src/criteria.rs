//! Criteria resolution and task-size–driven resource requirements.
//!
//! A caller's [`SelectionCriteria`] is validated and has its zero-valued
//! fields replaced by defaults exactly once, producing the
//! [`AdmissionCriteria`] every later stage reads.

use std::fmt;

use serde::Serialize;

use fleecy_core::{SelectionCriteria, VmStatus};

use crate::error::{SelectionError, SelectionResult};

pub const DEFAULT_MIN_VCPUS: u32 = 1;
pub const DEFAULT_MIN_RAM_MB: u64 = 512;
pub const DEFAULT_MIN_DISK_GB: u64 = 5;
pub const DEFAULT_MAX_CPU_USAGE_PERCENT: f64 = 70.0;
pub const DEFAULT_MODEL_SIZE_MB: u64 = 500;

/// The model must fit twice in memory: parameters plus a working copy.
const MODEL_MEMORY_FACTOR: f64 = 2.0;
const MEMORY_OVERHEAD_MB: f64 = 512.0;
/// Checkpoints and logs, proportional to model size.
const MODEL_DISK_FACTOR: f64 = 3.0;
const DISK_HEADROOM_GB: f64 = 1.0;

/// Memory (MB) a task with the given model size needs.
pub fn required_memory_mb(model_size_mb: u64) -> f64 {
    model_size_mb as f64 * MODEL_MEMORY_FACTOR + MEMORY_OVERHEAD_MB
}

/// Disk (GB) a task with the given model size needs.
pub fn required_disk_gb(model_size_mb: u64) -> f64 {
    model_size_mb as f64 / 1024.0 * MODEL_DISK_FACTOR + DISK_HEADROOM_GB
}

/// Validated criteria with all defaults substituted.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AdmissionCriteria {
    pub min_vcpus: u32,
    pub min_ram_mb: u64,
    pub min_disk_gb: u64,
    pub required_status: VmStatus,
    pub max_cpu_usage_percent: f64,
    pub model_size_mb: u64,
}

impl Default for AdmissionCriteria {
    fn default() -> Self {
        Self {
            min_vcpus: DEFAULT_MIN_VCPUS,
            min_ram_mb: DEFAULT_MIN_RAM_MB,
            min_disk_gb: DEFAULT_MIN_DISK_GB,
            required_status: VmStatus::Active,
            max_cpu_usage_percent: DEFAULT_MAX_CPU_USAGE_PERCENT,
            model_size_mb: DEFAULT_MODEL_SIZE_MB,
        }
    }
}

impl AdmissionCriteria {
    /// Validate caller criteria and substitute defaults for zero fields.
    ///
    /// Negative or non-finite values are rejected; they are never
    /// replaced by defaults.
    pub fn resolve(criteria: &SelectionCriteria) -> SelectionResult<Self> {
        let min_vcpus = non_negative("min_vcpus", criteria.min_vcpus)?;
        let min_vcpus = u32::try_from(min_vcpus).map_err(|_| {
            SelectionError::InvalidCriteria(format!("min_vcpus out of range: {min_vcpus}"))
        })?;
        let min_ram_mb = non_negative("min_ram_mb", criteria.min_ram_mb)?;
        let min_disk_gb = non_negative("min_disk_gb", criteria.min_disk_gb)?;
        let model_size_mb = non_negative("model_size_mb", criteria.model_size_mb)?;

        let max_cpu = criteria.max_cpu_usage_percent;
        if !max_cpu.is_finite() || max_cpu < 0.0 {
            return Err(SelectionError::InvalidCriteria(format!(
                "max_cpu_usage_percent must be a non-negative number, got {max_cpu}"
            )));
        }

        let required_status = match &criteria.required_status {
            Some(status) if !status.is_blank() => status.clone(),
            _ => VmStatus::Active,
        };

        Ok(Self {
            min_vcpus: if min_vcpus == 0 { DEFAULT_MIN_VCPUS } else { min_vcpus },
            min_ram_mb: if min_ram_mb == 0 { DEFAULT_MIN_RAM_MB } else { min_ram_mb },
            min_disk_gb: if min_disk_gb == 0 { DEFAULT_MIN_DISK_GB } else { min_disk_gb },
            required_status,
            max_cpu_usage_percent: if max_cpu == 0.0 {
                DEFAULT_MAX_CPU_USAGE_PERCENT
            } else {
                max_cpu
            },
            model_size_mb: if model_size_mb == 0 {
                DEFAULT_MODEL_SIZE_MB
            } else {
                model_size_mb
            },
        })
    }

    /// Memory threshold against raw capacity (whole MB, floored).
    pub fn static_memory_mb(&self) -> u64 {
        required_memory_mb(self.model_size_mb).floor() as u64
    }

    /// Disk threshold against raw capacity (whole GB, floored).
    pub fn static_disk_gb(&self) -> u64 {
        required_disk_gb(self.model_size_mb).floor() as u64
    }

    /// Memory threshold against usage-adjusted capacity.
    pub fn memory_mb(&self) -> f64 {
        required_memory_mb(self.model_size_mb)
    }

    /// Disk threshold against usage-adjusted capacity.
    pub fn disk_gb(&self) -> f64 {
        required_disk_gb(self.model_size_mb)
    }
}

impl fmt::Display for AdmissionCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "status={} vcpus>={} ram>={}MB disk>={}GB max_cpu={:.1}% model={}MB",
            self.required_status,
            self.min_vcpus,
            self.min_ram_mb,
            self.min_disk_gb,
            self.max_cpu_usage_percent,
            self.model_size_mb
        )
    }
}

fn non_negative(field: &str, value: i64) -> SelectionResult<u64> {
    u64::try_from(value).map_err(|_| {
        SelectionError::InvalidCriteria(format!("{field} must not be negative, got {value}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_fields_get_defaults() {
        let resolved = AdmissionCriteria::resolve(&SelectionCriteria::default()).unwrap();

        assert_eq!(resolved.required_status, VmStatus::Active);
        assert_eq!(resolved.max_cpu_usage_percent, 70.0);
        assert_eq!(resolved.model_size_mb, 500);
        assert_eq!(resolved.min_vcpus, 1);
        assert_eq!(resolved.min_ram_mb, 512);
        assert_eq!(resolved.min_disk_gb, 5);
        assert_eq!(resolved, AdmissionCriteria::default());
    }

    #[test]
    fn blank_status_gets_default() {
        let criteria = SelectionCriteria {
            required_status: Some(VmStatus::from("")),
            ..SelectionCriteria::default()
        };
        let resolved = AdmissionCriteria::resolve(&criteria).unwrap();
        assert_eq!(resolved.required_status, VmStatus::Active);
    }

    #[test]
    fn explicit_values_are_kept() {
        let criteria = SelectionCriteria {
            min_vcpus: 4,
            min_ram_mb: 4096,
            min_disk_gb: 40,
            required_status: Some(VmStatus::Shutoff),
            max_cpu_usage_percent: 55.5,
            model_size_mb: 1200,
        };
        let resolved = AdmissionCriteria::resolve(&criteria).unwrap();

        assert_eq!(resolved.min_vcpus, 4);
        assert_eq!(resolved.min_ram_mb, 4096);
        assert_eq!(resolved.min_disk_gb, 40);
        assert_eq!(resolved.required_status, VmStatus::Shutoff);
        assert_eq!(resolved.max_cpu_usage_percent, 55.5);
        assert_eq!(resolved.model_size_mb, 1200);
    }

    #[test]
    fn negative_fields_are_rejected() {
        for criteria in [
            SelectionCriteria { min_vcpus: -1, ..Default::default() },
            SelectionCriteria { min_ram_mb: -512, ..Default::default() },
            SelectionCriteria { min_disk_gb: -5, ..Default::default() },
            SelectionCriteria { model_size_mb: -500, ..Default::default() },
            SelectionCriteria { max_cpu_usage_percent: -70.0, ..Default::default() },
        ] {
            let err = AdmissionCriteria::resolve(&criteria).unwrap_err();
            assert!(matches!(err, SelectionError::InvalidCriteria(_)), "{criteria:?}");
        }
    }

    #[test]
    fn non_finite_cpu_cap_is_rejected() {
        let criteria = SelectionCriteria {
            max_cpu_usage_percent: f64::NAN,
            ..Default::default()
        };
        assert!(AdmissionCriteria::resolve(&criteria).is_err());
    }

    #[test]
    fn oversized_vcpu_minimum_is_rejected() {
        let criteria = SelectionCriteria {
            min_vcpus: i64::from(u32::MAX) + 1,
            ..Default::default()
        };
        assert!(AdmissionCriteria::resolve(&criteria).is_err());
    }

    #[test]
    fn requirements_for_default_model() {
        let c = AdmissionCriteria::default();
        assert_eq!(c.static_memory_mb(), 1512);
        // 500 / 1024 * 3 = 1.46 → 1, plus 1.
        assert_eq!(c.static_disk_gb(), 2);
        assert_eq!(c.memory_mb(), 1512.0);
        assert!((c.disk_gb() - 2.464_843_75).abs() < 1e-9);
    }

    #[test]
    fn requirements_for_large_model() {
        let c = AdmissionCriteria {
            model_size_mb: 2000,
            ..AdmissionCriteria::default()
        };
        assert_eq!(c.static_memory_mb(), 4512);
        // 2000 / 1024 * 3 = 5.86 → 5, plus 1.
        assert_eq!(c.static_disk_gb(), 6);
    }

    #[test]
    fn requirements_are_monotonic_in_model_size() {
        let mut prev_mem = 0.0;
        let mut prev_disk = 0.0;
        for size in (0..20_000u64).step_by(37) {
            let mem = required_memory_mb(size);
            let disk = required_disk_gb(size);
            assert!(mem >= prev_mem);
            assert!(disk >= prev_disk);
            assert!(mem.floor() >= prev_mem.floor());
            assert!(disk.floor() >= prev_disk.floor());
            prev_mem = mem;
            prev_disk = disk;
        }
    }
}
