//! Priority scoring for finalists.
//!
//! Larger, less-loaded machines rank higher:
//! - **Spec score**: `vcpus*10 + ram_gb*5 + disk_gb*2`
//! - **Usage penalty**: one point per percentage point of CPU, memory and disk use
//!
//! `priority = spec_score - usage_penalty`; the highest priority wins and
//! the first finalist seen keeps a tie.

use serde::Serialize;

use crate::utilization::Finalist;

/// Weights for the scoring components.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ScoringWeights {
    pub vcpu: f64,
    pub ram_gb: f64,
    pub disk_gb: f64,
    /// Applied to each usage percentage point.
    pub usage: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            vcpu: 10.0,
            ram_gb: 5.0,
            disk_gb: 2.0,
            usage: 1.0,
        }
    }
}

/// Score breakdown for one finalist.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct PriorityScore {
    pub spec_score: f64,
    pub usage_penalty: f64,
    pub priority: f64,
}

/// Score a single finalist.
pub fn score_finalist(finalist: &Finalist, weights: &ScoringWeights) -> PriorityScore {
    let c = &finalist.candidate;
    let u = &finalist.utilization;

    let spec_score = f64::from(c.vcpus) * weights.vcpu
        + (c.ram_mb as f64 / 1024.0) * weights.ram_gb
        + c.disk_gb as f64 * weights.disk_gb;
    let usage_penalty =
        (u.cpu_usage_percent + u.memory_usage_percent + u.disk_usage_percent) * weights.usage;

    PriorityScore {
        spec_score,
        usage_penalty,
        priority: spec_score - usage_penalty,
    }
}

/// Index and score of the best finalist, or `None` when there are none.
///
/// Only a strictly greater priority replaces the current best, so the
/// earliest finalist wins ties.
pub fn select_best(finalists: &[Finalist], weights: &ScoringWeights) -> Option<(usize, PriorityScore)> {
    let mut best: Option<(usize, PriorityScore)> = None;
    for (idx, finalist) in finalists.iter().enumerate() {
        let score = score_finalist(finalist, weights);
        match best {
            Some((_, current)) if score.priority <= current.priority => {}
            _ => best = Some((idx, score)),
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use fleecy_core::VmStatus;

    use super::*;
    use crate::candidate::VmCandidate;
    use crate::utilization::UtilizationSnapshot;

    fn make_finalist(id: &str, vcpus: u32, ram_mb: u64, disk_gb: u64, usage: (f64, f64, f64)) -> Finalist {
        Finalist {
            candidate: VmCandidate {
                id: id.to_string(),
                name: id.to_string(),
                participant_id: "p".to_string(),
                status: VmStatus::Active,
                vcpus,
                ram_mb,
                disk_gb,
                flavor_name: "test".to_string(),
                addresses: Vec::new(),
            },
            utilization: UtilizationSnapshot::new(usage.0, usage.1, usage.2, true),
        }
    }

    #[test]
    fn scores_reference_machine() {
        let f = make_finalist("a", 8, 16384, 100, (20.0, 30.0, 10.0));
        let score = score_finalist(&f, &ScoringWeights::default());

        assert_eq!(score.spec_score, 360.0);
        assert_eq!(score.usage_penalty, 60.0);
        assert_eq!(score.priority, 300.0);
    }

    #[test]
    fn picks_highest_priority() {
        let finalists = vec![
            make_finalist("small", 2, 4096, 20, (10.0, 10.0, 10.0)),
            make_finalist("large", 8, 16384, 100, (20.0, 30.0, 10.0)),
            make_finalist("medium", 4, 8192, 50, (5.0, 5.0, 5.0)),
        ];

        let (idx, score) = select_best(&finalists, &ScoringWeights::default()).unwrap();
        assert_eq!(finalists[idx].candidate.id, "large");
        for f in &finalists {
            assert!(score.priority >= score_finalist(f, &ScoringWeights::default()).priority);
        }
    }

    #[test]
    fn ties_go_to_first_seen() {
        let finalists = vec![
            make_finalist("first", 4, 8192, 50, (10.0, 10.0, 10.0)),
            make_finalist("second", 4, 8192, 50, (10.0, 10.0, 10.0)),
            make_finalist("third", 4, 8192, 50, (10.0, 10.0, 10.0)),
        ];

        let (idx, _) = select_best(&finalists, &ScoringWeights::default()).unwrap();
        assert_eq!(idx, 0);
    }

    #[test]
    fn heavy_load_outweighs_extra_hardware() {
        let finalists = vec![
            make_finalist("big-busy", 4, 8192, 50, (70.0, 90.0, 90.0)),
            make_finalist("small-idle", 4, 8192, 40, (0.0, 0.0, 0.0)),
        ];
        let (idx, _) = select_best(&finalists, &ScoringWeights::default()).unwrap();
        assert_eq!(finalists[idx].candidate.id, "small-idle");
    }

    #[test]
    fn empty_finalists_select_nothing() {
        assert!(select_best(&[], &ScoringWeights::default()).is_none());
    }

    #[test]
    fn custom_weights_change_ranking() {
        let finalists = vec![
            make_finalist("cpu-heavy", 16, 4096, 20, (0.0, 0.0, 0.0)),
            make_finalist("disk-heavy", 2, 4096, 500, (0.0, 0.0, 0.0)),
        ];
        let cpu_only = ScoringWeights {
            vcpu: 1.0,
            ram_gb: 0.0,
            disk_gb: 0.0,
            usage: 0.0,
        };
        let (idx, _) = select_best(&finalists, &cpu_only).unwrap();
        assert_eq!(finalists[idx].candidate.id, "cpu-heavy");

        let (idx, _) = select_best(&finalists, &ScoringWeights::default()).unwrap();
        assert_eq!(finalists[idx].candidate.id, "disk-heavy");
    }
}
