//! Checksum computation and redaction applied before a checkpoint is written.

use schemas::{
    AgentsSnapshot, ContextSnapshot, FilesystemSnapshot, IntegrityBlock, WorkflowSnapshot,
};
use sha2::{Digest, Sha256};

const CHECKSUM_HEX_LEN: usize = 16;

fn checksum_of<T: serde::Serialize>(value: &T) -> String {
    let bytes = serde_json::to_vec(value).unwrap_or_default();
    let digest = Sha256::digest(&bytes);
    let hex = hex_encode(&digest);
    hex[..CHECKSUM_HEX_LEN].to_string()
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Scans string values recursively (via a JSON round-trip) and replaces
/// secret-shaped substrings with `[REDACTED]`.
pub fn redact_agents_snapshot(snapshot: &AgentsSnapshot) -> AgentsSnapshot {
    let value = serde_json::to_value(snapshot).unwrap_or_default();
    let redacted = utils::redact_value(&value);
    serde_json::from_value(redacted).unwrap_or_else(|_| snapshot.clone())
}

pub fn redact_context_snapshot(snapshot: &ContextSnapshot) -> ContextSnapshot {
    let value = serde_json::to_value(snapshot).unwrap_or_default();
    let redacted = utils::redact_value(&value);
    serde_json::from_value(redacted).unwrap_or_else(|_| snapshot.clone())
}

pub fn compute_integrity(
    workflow: &WorkflowSnapshot,
    agents: &AgentsSnapshot,
    context: &ContextSnapshot,
    filesystem: &FilesystemSnapshot,
) -> IntegrityBlock {
    let workflow_checksum = checksum_of(workflow);
    let agents_checksum = checksum_of(agents);
    let context_checksum = checksum_of(context);
    let filesystem_checksum = checksum_of(filesystem);

    let mut hasher = Sha256::new();
    hasher.update(workflow_checksum.as_bytes());
    hasher.update(agents_checksum.as_bytes());
    hasher.update(context_checksum.as_bytes());
    hasher.update(filesystem_checksum.as_bytes());
    let overall_checksum = hex_encode(&hasher.finalize())[..CHECKSUM_HEX_LEN].to_string();

    IntegrityBlock {
        workflow_checksum,
        agents_checksum,
        context_checksum,
        filesystem_checksum,
        overall_checksum,
    }
}
