//! Campaign runs: the approval state machine and the orchestrator driving it.

pub mod orchestrator;
pub mod run;
pub mod state;

pub use orchestrator::{Orchestrator, OrchestratorDeps};
pub use run::{
    CampaignReport, CampaignRun, CampaignStatus, CancelHandle, OutcomeCounts, OutcomeKind,
    RecipientOutcome, RecipientView, StartRequest,
};
pub use state::{CampaignState, StateTransition};
