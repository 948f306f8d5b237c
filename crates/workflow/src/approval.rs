//! The human-in-the-loop handoff created when the decision engine pauses a
//! workflow for approval.

use chrono::{DateTime, Utc};
use schemas::AgentId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub requesting_agent: AgentId,
    pub payload: serde_json::Value,
    pub requested_at: DateTime<Utc>,
    /// Set when this request is a re-ask after a rejection; carries the
    /// rejecting response's feedback back to the originating agent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

impl ApprovalRequest {
    pub fn new(requesting_agent: AgentId, payload: serde_json::Value) -> Self {
        Self {
            requesting_agent,
            payload,
            requested_at: Utc::now(),
            feedback: None,
        }
    }

    pub fn with_feedback(mut self, feedback: impl Into<String>) -> Self {
        self.feedback = Some(feedback.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalResponse {
    pub approved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_option: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

impl ApprovalResponse {
    pub fn approve() -> Self {
        Self {
            approved: true,
            selected_option: None,
            feedback: None,
        }
    }

    pub fn reject(feedback: impl Into<String>) -> Self {
        Self {
            approved: false,
            selected_option: None,
            feedback: Some(feedback.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_carries_feedback_into_a_new_request() {
        let response = ApprovalResponse::reject("needs more detail");
        let request = ApprovalRequest::new(AgentId::Architect, serde_json::json!({}));
        let re_request = if !response.approved {
            request.with_feedback(response.feedback.clone().unwrap_or_default())
        } else {
            request
        };
        assert_eq!(re_request.feedback.as_deref(), Some("needs more detail"));
    }
}
