//! Shared value types for the orchestration engine.
//!
//! Every other crate in the workspace builds on these: the task/agent model
//! routed by the decision engine, the work breakdown scheduled by the
//! dependency graph, and the three append-only record types (activity,
//! checkpoint, audit) written by their respective stores. None of these
//! types carry behavior beyond validation and simple derived accessors —
//! the stores and engines that own their lifecycle live in their own crates.

pub mod activity;
pub mod agent;
pub mod audit;
pub mod auth;
pub mod breakdown;
pub mod checkpoint;
pub mod error;
pub mod ids;
pub mod task;

pub use activity::{ActivityCategory, ActivityEvent, ActivityType, Progress, Severity};
pub use auth::AuthContext;
pub use agent::{AgentError, AgentOutput, Artifact, RoutingHints, TokenUsage};
pub use audit::{
    Actor, ActorType, AuditError, AuditEvent, AuditOutcome, GENESIS_HASH, HASH_HEX_LEN,
    MAX_DESCRIPTION_CHARS, MAX_EVENT_BYTES,
};
pub use breakdown::{BreakdownTask, BreakdownTaskType, Epic, Feature, WorkBreakdown};
pub use checkpoint::{
    AgentRunStatus, AgentSnapshotEntry, AgentsSnapshot, Checkpoint, CheckpointStatus,
    CheckpointTrigger, ContextSnapshot, FilesystemSnapshot, IntegrityBlock, PhaseTransition,
    RecoveryBlock, WorkflowSnapshot,
};
pub use error::{EngineError, Failure, Result};
pub use task::{AgentId, Complexity, Phase, Task, TaskClassification, TaskType, TerminalOutcome};
