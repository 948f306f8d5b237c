//! `WorkBreakdown`: the Epic → Feature → Task hierarchy a planner agent
//! produces and the dependency graph consumes.

use crate::error::Result;
use crate::ids;
use crate::task::{AgentId, Complexity};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakdownTaskType {
    Design,
    Frontend,
    Backend,
    Database,
    Testing,
    Integration,
    Documentation,
    Devops,
    Review,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakdownTask {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub task_type: BreakdownTaskType,
    pub complexity: Complexity,
    /// Sibling task ids this task depends on, within the same feature.
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub acceptance_criteria: Vec<String>,
    #[serde(default)]
    pub assigned_agents: Vec<AgentId>,
    #[serde(default)]
    pub compliance_relevant: bool,
}

impl BreakdownTask {
    pub fn validate(&self) -> Result<()> {
        ids::validate_leaf_task_id(&self.id)?;
        for dep in &self.dependencies {
            ids::validate_leaf_task_id(dep)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feature {
    pub id: String,
    pub title: String,
    pub tasks: Vec<BreakdownTask>,
}

impl Feature {
    pub fn validate(&self) -> Result<()> {
        ids::validate_prefixed_id(&self.id)?;
        for task in &self.tasks {
            task.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Epic {
    pub id: String,
    pub title: String,
    pub features: Vec<Feature>,
}

impl Epic {
    pub fn validate(&self) -> Result<()> {
        ids::validate_prefixed_id(&self.id)?;
        for feature in &self.features {
            feature.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkBreakdown {
    pub epics: Vec<Epic>,
}

impl WorkBreakdown {
    pub fn validate(&self) -> Result<()> {
        for epic in &self.epics {
            epic.validate()?;
        }
        Ok(())
    }

    /// Flatten to leaf tasks, the unit the dependency graph schedules.
    pub fn leaf_tasks(&self) -> Vec<&BreakdownTask> {
        self.epics
            .iter()
            .flat_map(|epic| epic.features.iter())
            .flat_map(|feature| feature.tasks.iter())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_task(id: &str, deps: Vec<&str>) -> BreakdownTask {
        BreakdownTask {
            id: id.to_string(),
            title: "t".to_string(),
            description: "d".to_string(),
            task_type: BreakdownTaskType::Backend,
            complexity: Complexity::Simple,
            dependencies: deps.into_iter().map(String::from).collect(),
            acceptance_criteria: Vec::new(),
            assigned_agents: Vec::new(),
            compliance_relevant: false,
        }
    }

    #[test]
    fn validate_rejects_malformed_leaf_id() {
        let task = sample_task("Bad_Id", vec![]);
        assert!(task.validate().is_err());
    }

    #[test]
    fn validate_rejects_malformed_dependency_id() {
        let task = sample_task("backend-api", vec!["Bad Dep"]);
        assert!(task.validate().is_err());
    }

    #[test]
    fn leaf_tasks_flattens_hierarchy() {
        let breakdown = WorkBreakdown {
            epics: vec![Epic {
                id: "epic-q3".to_string(),
                title: "Q3".to_string(),
                features: vec![Feature {
                    id: "feat-auth".to_string(),
                    title: "Auth".to_string(),
                    tasks: vec![sample_task("backend-api", vec![]), sample_task("frontend-ui", vec!["backend-api"])],
                }],
            }],
        };
        assert!(breakdown.validate().is_ok());
        assert_eq!(breakdown.leaf_tasks().len(), 2);
    }
}
