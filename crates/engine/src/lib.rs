//! Binds the orchestration engine's subsystems into a runnable process:
//! environment-driven configuration, retry policy, and the wiring that
//! turns a sealed agent registry into a `workflow::WorkflowEngine`.

pub mod backoff;
pub mod config;
pub mod wiring;

pub use backoff::{retry_with_backoff, BackoffPolicy};
pub use config::{ExecutionMode, OutputFormat, RuntimeConfig};
pub use wiring::{EngineBuilder, ProviderSettings};
