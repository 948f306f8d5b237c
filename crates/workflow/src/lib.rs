//! The workflow state machine: the loop that classifies a prompt, routes it
//! through agents via the decision engine, and checkpoints/emits/audits every
//! significant transition until it reaches a terminal or paused state.

mod approval;
mod classify;
mod engine;
mod settings;
mod snapshot;

pub use approval::{ApprovalRequest, ApprovalResponse};
pub use classify::analyze as classify;
pub use engine::{
    WorkflowEngine, WorkflowInputs, WorkflowState, DEFAULT_MAX_ITERATIONS,
};
pub use settings::WorkflowSettings;
pub use snapshot::{phase_for_agent, PhaseHistory, MAX_PHASE_HISTORY};
