//! Write-then-rename checkpoint persistence under a per-session directory.

use crate::integrity::{compute_integrity, redact_agents_snapshot, redact_context_snapshot};
use chrono::Utc;
use schemas::{
    AgentRunStatus, AgentsSnapshot, Checkpoint, CheckpointStatus, CheckpointTrigger,
    ContextSnapshot, EngineError, FilesystemSnapshot, Phase, RecoveryBlock, Result,
    WorkflowSnapshot,
};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const DEFAULT_MAX_CHECKPOINTS: usize = 50;
pub const DEFAULT_RETENTION_DAYS: i64 = 30;

#[derive(Debug, Clone)]
pub struct CheckpointStoreConfig {
    pub base_dir: PathBuf,
    pub max_checkpoints: usize,
    pub retention_days: i64,
}

impl CheckpointStoreConfig {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            max_checkpoints: DEFAULT_MAX_CHECKPOINTS,
            retention_days: DEFAULT_RETENTION_DAYS,
        }
    }

    pub fn with_max_checkpoints(mut self, max_checkpoints: usize) -> Self {
        self.max_checkpoints = max_checkpoints;
        self
    }

    pub fn with_retention_days(mut self, retention_days: i64) -> Self {
        self.retention_days = retention_days;
        self
    }
}

pub struct CheckpointStore {
    config: CheckpointStoreConfig,
}

fn rfc3339_safe(dt: chrono::DateTime<Utc>) -> String {
    dt.to_rfc3339().replace(':', "-")
}

fn checkpoint_filename(id: Uuid, created_at: chrono::DateTime<Utc>) -> String {
    format!("checkpoint-{}-{id}.json", rfc3339_safe(created_at))
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> std::io::Result<()> {
    Ok(())
}

fn reject_traversal(path: &Path) -> Result<()> {
    if path.components().any(|c| c == std::path::Component::ParentDir) {
        return Err(EngineError::ValidationFailure(
            "checkpoint path must not contain a parent-directory traversal".to_string(),
        ));
    }
    Ok(())
}

impl CheckpointStore {
    pub fn new(config: CheckpointStoreConfig) -> Result<Self> {
        reject_traversal(&config.base_dir)?;
        fs::create_dir_all(&config.base_dir).map_err(|e| {
            EngineError::UpstreamError(format!("failed to create checkpoint directory: {e}"))
        })?;
        set_mode(&config.base_dir, 0o700).map_err(|e| {
            EngineError::UpstreamError(format!("failed to set checkpoint directory mode: {e}"))
        })?;
        Ok(Self { config })
    }

    fn archive_dir(&self) -> PathBuf {
        self.config.base_dir.join("archive")
    }

    fn path_for(&self, id: Uuid, created_at: chrono::DateTime<Utc>) -> PathBuf {
        self.config.base_dir.join(checkpoint_filename(id, created_at))
    }

    fn analyze_recovery(&self, workflow: &WorkflowSnapshot, agents: &AgentsSnapshot) -> RecoveryBlock {
        let failed_agent = agents
            .entries
            .iter()
            .find(|(_, entry)| entry.status == AgentRunStatus::Failed && entry.attempts > 3);

        if workflow.current_state == Phase::Failed || failed_agent.is_some() {
            let mut blockers = Vec::new();
            if workflow.current_state == Phase::Failed {
                blockers.push("workflow is in a terminal failed state".to_string());
            }
            if let Some((agent_id, _)) = failed_agent {
                blockers.push(format!("agent {agent_id} exceeded its retry ceiling"));
            }
            return RecoveryBlock {
                can_resume: false,
                resume_from_agent: None,
                resume_from_state: None,
                blockers,
            };
        }

        RecoveryBlock {
            can_resume: true,
            resume_from_agent: None,
            resume_from_state: Some(workflow.current_state),
            blockers: Vec::new(),
        }
    }

    /// Captures the four snapshots, redacts agent/context string fields,
    /// computes the integrity block, and durably writes the checkpoint via
    /// a write-temp / fsync / rename sequence.
    pub fn create_checkpoint(
        &self,
        trigger: CheckpointTrigger,
        workflow: WorkflowSnapshot,
        agents: AgentsSnapshot,
        context: ContextSnapshot,
        filesystem: FilesystemSnapshot,
    ) -> Result<Checkpoint> {
        let agents = redact_agents_snapshot(&agents);
        let context = redact_context_snapshot(&context);
        let recovery = self.analyze_recovery(&workflow, &agents);
        let integrity = compute_integrity(&workflow, &agents, &context, &filesystem);

        let checkpoint = Checkpoint {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            trigger,
            status: CheckpointStatus::Valid,
            workflow,
            agents,
            context,
            filesystem,
            integrity,
            recovery,
        };

        self.write_checkpoint(&checkpoint)?;
        self.enforce_retention()?;
        Ok(checkpoint)
    }

    fn write_checkpoint(&self, checkpoint: &Checkpoint) -> Result<()> {
        let final_path = self.path_for(checkpoint.id, checkpoint.created_at);
        let tmp_path = final_path.with_extension("json.tmp");

        let bytes = serde_json::to_vec_pretty(checkpoint).map_err(|e| {
            EngineError::ValidationFailure(format!("failed to serialize checkpoint: {e}"))
        })?;
        {
            let mut file = fs::File::create(&tmp_path).map_err(|e| {
                EngineError::UpstreamError(format!("failed to create checkpoint temp file: {e}"))
            })?;
            file.write_all(&bytes).map_err(|e| {
                EngineError::UpstreamError(format!("failed to write checkpoint: {e}"))
            })?;
            file.sync_all().map_err(|e| {
                EngineError::UpstreamError(format!("failed to fsync checkpoint: {e}"))
            })?;
        }
        set_mode(&tmp_path, 0o600)
            .map_err(|e| EngineError::UpstreamError(format!("failed to set checkpoint mode: {e}")))?;
        fs::rename(&tmp_path, &final_path).map_err(|e| {
            EngineError::UpstreamError(format!("failed to rename checkpoint into place: {e}"))
        })?;
        Ok(())
    }

    fn checkpoint_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.config.base_dir).map_err(|e| {
            EngineError::UpstreamError(format!("failed to read checkpoint directory: {e}"))
        })? {
            let entry = entry.map_err(|e| {
                EngineError::UpstreamError(format!("failed to read checkpoint directory entry: {e}"))
            })?;
            let path = entry.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    fn enforce_retention(&self) -> Result<()> {
        let files = self.checkpoint_files()?;
        if files.len() > self.config.max_checkpoints {
            fs::create_dir_all(self.archive_dir()).ok();
            let overflow = files.len() - self.config.max_checkpoints;
            for path in &files[..overflow] {
                if let Some(name) = path.file_name() {
                    let _ = fs::rename(path, self.archive_dir().join(name));
                }
            }
        }

        let cutoff = Utc::now() - chrono::Duration::days(self.config.retention_days);
        for path in self.checkpoint_files()?.iter().chain(self.archived_files()?.iter()) {
            if let Ok(metadata) = fs::metadata(path) {
                if let Ok(modified) = metadata.modified() {
                    let modified: chrono::DateTime<Utc> = modified.into();
                    if modified < cutoff {
                        let _ = fs::remove_file(path);
                    }
                }
            }
        }
        Ok(())
    }

    fn archived_files(&self) -> Result<Vec<PathBuf>> {
        let dir = self.archive_dir();
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut files = Vec::new();
        for entry in fs::read_dir(dir).map_err(|e| {
            EngineError::UpstreamError(format!("failed to read checkpoint archive: {e}"))
        })? {
            let entry = entry.map_err(|e| {
                EngineError::UpstreamError(format!("failed to read checkpoint archive entry: {e}"))
            })?;
            files.push(entry.path());
        }
        Ok(files)
    }

    pub fn get_checkpoint(&self, id: Uuid) -> Result<Checkpoint> {
        for path in self.checkpoint_files()? {
            if path.to_string_lossy().contains(&id.to_string()) {
                return self.read_checkpoint(&path);
            }
        }
        Err(EngineError::NotFound(format!("checkpoint not found: {id}")))
    }

    fn read_checkpoint(&self, path: &Path) -> Result<Checkpoint> {
        let bytes = fs::read(path)
            .map_err(|e| EngineError::UpstreamError(format!("failed to read checkpoint: {e}")))?;
        serde_json::from_slice(&bytes).map_err(|e| {
            EngineError::IntegrityError(format!("failed to deserialize checkpoint: {e}"))
        })
    }

    pub fn list_checkpoints(&self) -> Result<Vec<Checkpoint>> {
        let mut checkpoints = Vec::new();
        for path in self.checkpoint_files()? {
            checkpoints.push(self.read_checkpoint(&path)?);
        }
        checkpoints.sort_by_key(|c| c.created_at);
        Ok(checkpoints)
    }

    pub fn get_latest_checkpoint(&self) -> Result<Option<Checkpoint>> {
        Ok(self.list_checkpoints()?.into_iter().next_back())
    }

    /// Recomputes checksums from the stored snapshots. A mismatch is a
    /// tamper signal, surfaced as an `IntegrityError` naming the diverged
    /// section rather than `Ok(false)`.
    pub fn validate_checkpoint(&self, id: Uuid) -> Result<bool> {
        let checkpoint = self.get_checkpoint(id)?;
        let recomputed = compute_integrity(
            &checkpoint.workflow,
            &checkpoint.agents,
            &checkpoint.context,
            &checkpoint.filesystem,
        );

        let sections: [(&str, &str, &str); 4] = [
            ("workflow", &recomputed.workflow_checksum, &checkpoint.integrity.workflow_checksum),
            ("agents", &recomputed.agents_checksum, &checkpoint.integrity.agents_checksum),
            ("context", &recomputed.context_checksum, &checkpoint.integrity.context_checksum),
            ("filesystem", &recomputed.filesystem_checksum, &checkpoint.integrity.filesystem_checksum),
        ];
        let mut diverged: Vec<&str> = sections
            .iter()
            .filter(|(_, recomputed, stored)| recomputed != stored)
            .map(|(name, _, _)| *name)
            .collect();
        if recomputed.overall_checksum != checkpoint.integrity.overall_checksum
            && diverged.is_empty()
        {
            diverged.push("overall");
        }

        if !diverged.is_empty() {
            return Err(EngineError::IntegrityError(format!(
                "checkpoint {id} failed integrity validation: section(s) reported as {}",
                diverged.join(", ")
            )));
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn workflow() -> WorkflowSnapshot {
        WorkflowSnapshot {
            current_state: Phase::Building,
            previous_state: Some(Phase::Planning),
            history: vec![],
        }
    }

    fn context() -> ContextSnapshot {
        ContextSnapshot {
            task_description: "build the thing".to_string(),
            artifact_checksums: HashMap::new(),
            lessons: vec![],
            decisions: vec![],
        }
    }

    #[test]
    fn create_then_get_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(CheckpointStoreConfig::new(dir.path())).unwrap();
        let checkpoint = store
            .create_checkpoint(
                CheckpointTrigger::Manual,
                workflow(),
                AgentsSnapshot::default(),
                context(),
                FilesystemSnapshot::default(),
            )
            .unwrap();

        let loaded = store.get_checkpoint(checkpoint.id).unwrap();
        assert_eq!(loaded.id, checkpoint.id);
        assert_eq!(
            loaded.integrity.overall_checksum,
            checkpoint.integrity.overall_checksum
        );
    }

    #[test]
    fn validate_checkpoint_detects_tamper() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(CheckpointStoreConfig::new(dir.path())).unwrap();
        let checkpoint = store
            .create_checkpoint(
                CheckpointTrigger::Manual,
                workflow(),
                AgentsSnapshot::default(),
                context(),
                FilesystemSnapshot::default(),
            )
            .unwrap();
        assert!(store.validate_checkpoint(checkpoint.id).unwrap());

        let path = dir.path().join(checkpoint_filename(checkpoint.id, checkpoint.created_at));
        let mut tampered = store.read_checkpoint(&path).unwrap();
        tampered.context.task_description = "tampered".to_string();
        let bytes = serde_json::to_vec_pretty(&tampered).unwrap();
        fs::write(&path, bytes).unwrap();

        assert!(store.validate_checkpoint(checkpoint.id).is_err());
    }

    #[test]
    fn failed_workflow_state_cannot_resume() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(CheckpointStoreConfig::new(dir.path())).unwrap();
        let mut failed_workflow = workflow();
        failed_workflow.current_state = Phase::Failed;
        let checkpoint = store
            .create_checkpoint(
                CheckpointTrigger::Manual,
                failed_workflow,
                AgentsSnapshot::default(),
                context(),
                FilesystemSnapshot::default(),
            )
            .unwrap();
        assert!(!checkpoint.recovery.can_resume);
        assert!(!checkpoint.recovery.blockers.is_empty());
    }

    #[test]
    fn enforces_max_checkpoints_by_archiving_oldest() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(
            CheckpointStoreConfig::new(dir.path()).with_max_checkpoints(2),
        )
        .unwrap();
        for _ in 0..4 {
            store
                .create_checkpoint(
                    CheckpointTrigger::Manual,
                    workflow(),
                    AgentsSnapshot::default(),
                    context(),
                    FilesystemSnapshot::default(),
                )
                .unwrap();
            std::thread::sleep(std::time::Duration::from_millis(2));
        }
        assert!(store.checkpoint_files().unwrap().len() <= 2);
        assert!(!store.archived_files().unwrap().is_empty());
    }

    #[test]
    fn rejects_traversal_in_base_dir() {
        let result = CheckpointStore::new(CheckpointStoreConfig::new("../escape"));
        assert!(result.is_err());
    }
}
