//! `ActivityEvent`: the immutable record the activity stream fans out.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityCategory {
    Workflow,
    Agent,
    File,
    Git,
    User,
    System,
    Progress,
    Design,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Debug,
    Info,
    Success,
    Warning,
    Error,
}

/// Event type. Left open-ended as a wrapper over a string so new event
/// types don't require a schema migration, while the common ones get
/// named constructors and compile-time-checked constants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivityType(pub String);

impl ActivityType {
    pub const WORKFLOW_START: &'static str = "workflow_start";
    pub const WORKFLOW_COMPLETE: &'static str = "workflow_complete";
    pub const WORKFLOW_ERROR: &'static str = "workflow_error";
    pub const AGENT_THINKING: &'static str = "agent_thinking";
    pub const AGENT_COMPLETE: &'static str = "agent_complete";
    pub const FILE_WRITE: &'static str = "file_write";
    pub const USER_APPROVAL: &'static str = "user_approval";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl From<&str> for ActivityType {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Progress {
    pub current: u32,
    pub total: u32,
}

impl Progress {
    pub fn percentage(&self) -> f32 {
        if self.total == 0 {
            0.0
        } else {
            (self.current as f32 / self.total as f32) * 100.0
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEvent {
    /// Monotonic per-session sequence number.
    pub sequence: u64,
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub event_type: ActivityType,
    pub category: ActivityCategory,
    pub severity: Severity,
    pub session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    pub title: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<Progress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_percentage() {
        let progress = Progress {
            current: 1,
            total: 4,
        };
        assert_eq!(progress.percentage(), 25.0);
    }

    #[test]
    fn progress_percentage_zero_total_is_zero() {
        let progress = Progress {
            current: 0,
            total: 0,
        };
        assert_eq!(progress.percentage(), 0.0);
    }

    #[test]
    fn activity_type_from_str() {
        let t: ActivityType = ActivityType::WORKFLOW_START.into();
        assert_eq!(t.0, "workflow_start");
    }
}
