mod canonical;
mod chain;
mod report;
mod store;

pub use canonical::canonical_json;
pub use chain::{compute_hash, verify_link};
pub use report::{soc2_control_report, ComplianceReport, ControlAssessment, ControlStatus};
pub use store::{AuditLog, IntegrityReport, NewAuditEvent, QueryOptions};
