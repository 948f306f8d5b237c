//! Id shapes and validators shared across the data model.

use crate::error::{EngineError, Result};
use std::sync::OnceLock;
use uuid::Uuid;

/// `task-`, `feat-`, or `epic-` followed by lowercase alphanumerics/hyphens.
fn prefixed_id_pattern() -> &'static regex::Regex {
    static PATTERN: OnceLock<regex::Regex> = OnceLock::new();
    PATTERN.get_or_init(|| regex::Regex::new(r"^(task|feat|epic)-[a-z0-9-]+$").unwrap())
}

/// A leaf work-breakdown task id: `^[a-z][a-z0-9-]*$`.
fn leaf_id_pattern() -> &'static regex::Regex {
    static PATTERN: OnceLock<regex::Regex> = OnceLock::new();
    PATTERN.get_or_init(|| regex::Regex::new(r"^[a-z][a-z0-9-]*$").unwrap())
}

pub fn validate_prefixed_id(id: &str) -> Result<()> {
    if prefixed_id_pattern().is_match(id) {
        Ok(())
    } else {
        Err(EngineError::ValidationFailure(format!(
            "id '{id}' does not match ^(task|feat|epic)-[a-z0-9-]+$"
        )))
    }
}

pub fn validate_leaf_task_id(id: &str) -> Result<()> {
    if leaf_id_pattern().is_match(id) {
        Ok(())
    } else {
        Err(EngineError::ValidationFailure(format!(
            "task id '{id}' does not match ^[a-z][a-z0-9-]*$"
        )))
    }
}

pub fn validate_uuid_v4(id: &str) -> Result<Uuid> {
    let parsed = Uuid::parse_str(id)
        .map_err(|e| EngineError::ValidationFailure(format!("invalid uuid '{id}': {e}")))?;
    if parsed.get_version_num() != 4 {
        return Err(EngineError::ValidationFailure(format!(
            "uuid '{id}' is not a v4 uuid"
        )));
    }
    Ok(parsed)
}

pub fn new_uuid_v4() -> Uuid {
    Uuid::new_v4()
}
