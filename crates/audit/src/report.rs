//! Pure compliance reporters: classify controls from query results alone,
//! no access to the log itself.

use schemas::{AuditEvent, AuditOutcome};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlStatus {
    Compliant,
    Partial,
    NonCompliant,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ControlAssessment {
    pub control: String,
    pub status: ControlStatus,
    pub evidence_count: usize,
    pub failure_count: usize,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ComplianceReport {
    pub controls: Vec<ControlAssessment>,
}

/// One control per audit category present in `events`: compliant if every
/// event in the category succeeded, partial if some did, non-compliant if
/// none did (or the category saw only denials/failures).
pub fn soc2_control_report(events: &[AuditEvent]) -> ComplianceReport {
    let mut by_category: HashMap<&str, (usize, usize)> = HashMap::new();
    for event in events {
        let entry = by_category.entry(event.category.as_str()).or_insert((0, 0));
        entry.0 += 1;
        if !matches!(event.outcome, AuditOutcome::Success) {
            entry.1 += 1;
        }
    }

    let mut controls: Vec<ControlAssessment> = by_category
        .into_iter()
        .map(|(category, (total, failures))| {
            let status = if failures == 0 {
                ControlStatus::Compliant
            } else if failures < total {
                ControlStatus::Partial
            } else {
                ControlStatus::NonCompliant
            };
            ControlAssessment {
                control: category.to_string(),
                status,
                evidence_count: total,
                failure_count: failures,
            }
        })
        .collect();
    controls.sort_by(|a, b| a.control.cmp(&b.control));

    ComplianceReport { controls }
}
