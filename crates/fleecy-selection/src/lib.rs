//! Fleecy VM selection: pick the one machine of a participant cloud that
//! should run a federated-learning task.
//!
//! The pipeline narrows a participant's inventory in stages and explains
//! every drop:
//!
//! ```text
//! Inventory ──▶ candidate ──▶ feasibility ──▶ utilization ──▶ scorer ──▶ SelectionReport
//!  (listing)    (normalize)   (static+model)   (live load)    (max priority)
//! ```
//!
//! # Components
//!
//! - **`candidate`**: Provider listings → [`VmCandidate`], the [`Inventory`] contract
//! - **`criteria`**: Validation, default substitution, model-size requirements
//! - **`feasibility`**: Status, hardware floors, raw capacity vs. model size
//! - **`utilization`**: [`UtilizationProvider`] contract and load admission
//! - **`simulated`**: Deterministic provider for tests and demos
//! - **`scorer`**: Priority scoring and max selection
//! - **`selector`**: [`VmSelector`] orchestration, reports, monitoring table
//! - **`state`**: Per-participant selection cursors (reset only)
//! - **`fleet`**: Status counts

pub mod candidate;
pub mod criteria;
pub mod error;
pub mod exclusion;
pub mod feasibility;
pub mod fleet;
pub mod scorer;
pub mod selector;
pub mod simulated;
pub mod state;
pub mod utilization;

pub use candidate::{Inventory, InventoryFuture, VmCandidate, normalize};
pub use criteria::{AdmissionCriteria, required_disk_gb, required_memory_mb};
pub use error::{CollaboratorError, SelectionError, SelectionResult};
pub use exclusion::{Exclusion, ExclusionReason, StageOutcome};
pub use feasibility::{check_feasible, filter_feasible};
pub use fleet::FleetStats;
pub use scorer::{PriorityScore, ScoringWeights, score_finalist, select_best};
pub use selector::{SelectionReport, SelectionStage, UtilizationReport, VmSelector};
pub use simulated::SimulatedUtilization;
pub use state::ParticipantSelectionState;
pub use utilization::{
    FetchOutcome, Finalist, MAX_CONCURRENT_FETCHES, UtilizationFuture, UtilizationProvider,
    UtilizationSnapshot, check_utilization, fetch_all, filter_by_utilization,
};
