//! Top-level selection orchestration and reporting.
//!
//! ```text
//! resolve criteria → list inventory → normalize
//!   → feasibility ── empty ──→ report (count 0)
//!   → utilization ── empty ──→ report (count = feasible survivors)
//!   → score ─────────────────→ report (count = finalists)
//! ```

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use fleecy_core::{Participant, SelectionCriteria};

use crate::candidate::{normalize, Inventory, VmCandidate};
use crate::criteria::AdmissionCriteria;
use crate::error::SelectionResult;
use crate::exclusion::Exclusion;
use crate::feasibility::filter_feasible;
use crate::fleet::FleetStats;
use crate::scorer::{select_best, PriorityScore, ScoringWeights};
use crate::state::ParticipantSelectionState;
use crate::utilization::{
    fetch_all, filter_by_utilization, FetchOutcome, UtilizationProvider, UtilizationSnapshot,
};

/// Stage at which a selection terminated.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SelectionStage {
    /// A finalist was chosen.
    Selected,
    /// No candidate passed feasibility.
    FeasibilityEmpty,
    /// Feasible candidates existed but none passed utilization admission.
    UtilizationEmpty,
}

/// Outcome of one selection call.
///
/// `selected` is `None` exactly when `stage` is not [`SelectionStage::Selected`].
#[derive(Debug, Clone, Serialize)]
pub struct SelectionReport {
    pub selected: Option<VmCandidate>,
    pub reason: String,
    /// 0 when feasibility emptied the pool, the feasible survivor count when
    /// utilization did, the finalist count on success.
    pub candidate_count: usize,
    pub stage: SelectionStage,
    pub score: Option<PriorityScore>,
    pub utilization: Option<UtilizationSnapshot>,
    pub criteria: AdmissionCriteria,
    /// Candidates examined before any filtering.
    pub examined: usize,
    pub exclusions: Vec<Exclusion>,
    /// Exclusions caused by failed utilization fetches.
    pub fetch_failures: usize,
    pub simulated: bool,
}

impl SelectionReport {
    pub fn is_selected(&self) -> bool {
        self.selected.is_some()
    }
}

/// One row of the monitoring table returned by [`VmSelector::utilizations`].
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UtilizationReport {
    pub candidate: VmCandidate,
    pub utilization: UtilizationSnapshot,
    pub utilization_score: f64,
    /// False when the snapshot could not be fetched; the row then reads zero.
    pub available: bool,
    pub error: Option<String>,
}

/// Picks the best VM of a participant for a task.
pub struct VmSelector {
    inventory: Arc<dyn Inventory>,
    provider: Arc<dyn UtilizationProvider>,
    weights: ScoringWeights,
    state: Arc<ParticipantSelectionState>,
}

impl VmSelector {
    pub fn new(inventory: Arc<dyn Inventory>, provider: Arc<dyn UtilizationProvider>) -> Self {
        Self {
            inventory,
            provider,
            weights: ScoringWeights::default(),
            state: Arc::new(ParticipantSelectionState::new()),
        }
    }

    pub fn with_weights(mut self, weights: ScoringWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Share selection state with other selectors.
    pub fn with_state(mut self, state: Arc<ParticipantSelectionState>) -> Self {
        self.state = state;
        self
    }

    pub fn state(&self) -> &ParticipantSelectionState {
        &self.state
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    pub fn is_simulated(&self) -> bool {
        self.provider.is_simulated()
    }

    /// The participant's inventory as candidates, in provider order.
    pub async fn list_candidates(&self, participant: &Participant) -> SelectionResult<Vec<VmCandidate>> {
        let servers = self.inventory.list_instances(participant).await?;
        Ok(normalize(&participant.id, &servers))
    }

    /// Select the best VM from the participant's inventory.
    ///
    /// Criteria are validated before the inventory is contacted. An
    /// inventory failure is returned as an error; every other outcome,
    /// including an empty result, is a report.
    pub async fn select(
        &self,
        participant: &Participant,
        criteria: &SelectionCriteria,
    ) -> SelectionResult<SelectionReport> {
        let criteria = AdmissionCriteria::resolve(criteria)?;
        let candidates = self.list_candidates(participant).await?;
        Ok(self.run(participant, candidates, criteria).await)
    }

    /// Run the pipeline on caller-supplied candidates.
    pub async fn select_from_candidates(
        &self,
        participant: &Participant,
        candidates: Vec<VmCandidate>,
        criteria: &SelectionCriteria,
    ) -> SelectionResult<SelectionReport> {
        let criteria = AdmissionCriteria::resolve(criteria)?;
        Ok(self.run(participant, candidates, criteria).await)
    }

    async fn run(
        &self,
        participant: &Participant,
        candidates: Vec<VmCandidate>,
        criteria: AdmissionCriteria,
    ) -> SelectionReport {
        let simulated = self.provider.is_simulated();
        let examined = candidates.len();
        info!(
            participant = %participant.id,
            candidates = examined,
            %criteria,
            simulated,
            "selecting VM"
        );

        let feasible = filter_feasible(candidates, &criteria);
        info!(
            participant = %participant.id,
            survivors = feasible.passed.len(),
            pruned = feasible.pruned(),
            "feasibility filter done"
        );
        let mut exclusions = feasible.excluded;

        if feasible.passed.is_empty() {
            let reason = feasibility_empty_reason(examined, &exclusions);
            info!(participant = %participant.id, %reason, "no feasible VM");
            return SelectionReport {
                selected: None,
                reason: mark_simulated(reason, simulated),
                candidate_count: 0,
                stage: SelectionStage::FeasibilityEmpty,
                score: None,
                utilization: None,
                criteria,
                examined,
                exclusions,
                fetch_failures: 0,
                simulated,
            };
        }

        let survivors = feasible.passed.len();
        let admitted =
            filter_by_utilization(self.provider.as_ref(), participant, feasible.passed, &criteria).await;
        let fetch_failures = admitted.fetch_failures();
        info!(
            participant = %participant.id,
            finalists = admitted.passed.len(),
            pruned = admitted.pruned(),
            fetch_failures,
            "utilization filter done"
        );
        let utilization_excluded = admitted.excluded;
        let reason_if_empty = utilization_empty_reason(survivors, fetch_failures, &utilization_excluded);
        exclusions.extend(utilization_excluded);

        let mut finalists = admitted.passed;
        let Some((idx, score)) = select_best(&finalists, &self.weights) else {
            info!(participant = %participant.id, reason = %reason_if_empty, "no admissible VM");
            return SelectionReport {
                selected: None,
                reason: mark_simulated(reason_if_empty, simulated),
                candidate_count: survivors,
                stage: SelectionStage::UtilizationEmpty,
                score: None,
                utilization: None,
                criteria,
                examined,
                exclusions,
                fetch_failures,
                simulated,
            };
        };

        let finalist_count = finalists.len();
        let winner = finalists.swap_remove(idx);

        let reason = format!(
            "selected by priority score {:.2} (spec {:.2} - usage {:.2}) for model size {}MB among {} finalist(s)",
            score.priority, score.spec_score, score.usage_penalty, criteria.model_size_mb, finalist_count
        );
        info!(
            participant = %participant.id,
            vm = %winner.candidate.name,
            id = %winner.candidate.id,
            priority = score.priority,
            "VM selected"
        );

        SelectionReport {
            selected: Some(winner.candidate),
            reason: mark_simulated(reason, simulated),
            candidate_count: finalist_count,
            stage: SelectionStage::Selected,
            score: Some(score),
            utilization: Some(winner.utilization),
            criteria,
            examined,
            exclusions,
            fetch_failures,
            simulated,
        }
    }

    /// Snapshot every VM in the participant's inventory, unfiltered.
    ///
    /// A failed fetch yields a zero, unhealthy row marked unavailable.
    pub async fn utilizations(&self, participant: &Participant) -> SelectionResult<Vec<UtilizationReport>> {
        let candidates = self.list_candidates(participant).await?;
        let outcomes = fetch_all(self.provider.as_ref(), participant, &candidates).await;

        let rows: Vec<_> = candidates
            .into_iter()
            .zip(outcomes)
            .map(|(candidate, outcome)| {
                let (utilization, error) = match outcome {
                    FetchOutcome::Measured(snapshot) => (snapshot, None),
                    FetchOutcome::Excluded(error) => (UtilizationSnapshot::unavailable(), Some(error)),
                };
                UtilizationReport {
                    utilization_score: utilization.composite_score(),
                    available: error.is_none(),
                    candidate,
                    utilization,
                    error,
                }
            })
            .collect();

        debug!(participant = %participant.id, rows = rows.len(), "utilization table built");
        Ok(rows)
    }

    /// Status counts of the participant's inventory.
    pub async fn fleet_stats(&self, participant: &Participant) -> SelectionResult<FleetStats> {
        let candidates = self.list_candidates(participant).await?;
        Ok(FleetStats::from_candidates(&candidates))
    }

    /// Clear the participant's selection cursor. Idempotent.
    pub fn reset_selection_state(&self, participant_id: &str) {
        self.state.reset(participant_id);
        info!(participant = participant_id, "selection state reset");
    }
}

fn feasibility_empty_reason(examined: usize, exclusions: &[Exclusion]) -> String {
    if examined == 0 {
        return "no VM passed the feasibility filter: inventory is empty".to_string();
    }
    format!(
        "no VM passed the feasibility filter ({examined} examined): {}",
        join_exclusions(exclusions)
    )
}

fn utilization_empty_reason(survivors: usize, fetch_failures: usize, excluded: &[Exclusion]) -> String {
    let shortfalls = excluded.len() - fetch_failures;
    format!(
        "no VM passed the utilization filter ({survivors} feasible, {shortfalls} over load or capacity, \
         {fetch_failures} without utilization data): {}",
        join_exclusions(excluded)
    )
}

fn join_exclusions(exclusions: &[Exclusion]) -> String {
    exclusions
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

fn mark_simulated(reason: String, simulated: bool) -> String {
    if simulated {
        format!("{reason} (simulated)")
    } else {
        reason
    }
}
