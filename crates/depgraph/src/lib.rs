//! Precedence reasoning for work breakdowns: cycle detection, deterministic
//! topological order, parallel-wave grouping, and critical-path analysis.
//!
//! Forward adjacency maps a task to its prerequisites; reverse adjacency
//! maps a task to its dependents. Unknown dependency ids are tolerated at
//! `add_task` (a breakdown can be loaded in any order) and only surface at
//! `validate`.

use schemas::{EngineError, Result};
use std::collections::{BTreeMap, BTreeSet, HashSet};

#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    forward: BTreeMap<String, BTreeSet<String>>,
    reverse: BTreeMap<String, BTreeSet<String>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task and its prerequisites. Fails on an empty id, a
    /// duplicate id, or a self-referencing prerequisite; does not check
    /// that the prerequisites themselves exist yet.
    pub fn add_task(
        &mut self,
        id: impl Into<String>,
        prerequisites: impl IntoIterator<Item = String>,
    ) -> Result<()> {
        let id = id.into();
        if id.is_empty() {
            return Err(EngineError::ValidationFailure(
                "task id must not be empty".to_string(),
            ));
        }
        if self.forward.contains_key(&id) {
            return Err(EngineError::Conflict(format!("duplicate task id: {id}")));
        }

        let prereqs: BTreeSet<String> = prerequisites.into_iter().collect();
        if prereqs.contains(&id) {
            return Err(EngineError::ValidationFailure(format!(
                "task '{id}' cannot depend on itself"
            )));
        }

        self.reverse.entry(id.clone()).or_default();
        for prereq in &prereqs {
            self.reverse.entry(prereq.clone()).or_default().insert(id.clone());
        }
        self.forward.insert(id, prereqs);
        Ok(())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.forward.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    /// Every simple cycle in the graph, as a sequence of ids returning to
    /// its own start. Reports all of them (not just the first) so blocker
    /// reporting can name every offending cycle.
    pub fn detect_cycles(&self) -> Vec<Vec<String>> {
        let mut cycles = Vec::new();
        let mut seen_keys = HashSet::new();

        for start in self.forward.keys() {
            let mut path = vec![start.clone()];
            let mut on_path: HashSet<String> = HashSet::from([start.clone()]);
            self.walk_for_cycles(start, start, &mut path, &mut on_path, &mut cycles, &mut seen_keys);
        }

        cycles
    }

    fn walk_for_cycles(
        &self,
        start: &str,
        current: &str,
        path: &mut Vec<String>,
        on_path: &mut HashSet<String>,
        cycles: &mut Vec<Vec<String>>,
        seen_keys: &mut HashSet<Vec<String>>,
    ) {
        let Some(prereqs) = self.forward.get(current) else {
            return;
        };

        for next in prereqs {
            if next == start {
                if path.len() > 1 {
                    let key = canonical_cycle_key(path);
                    if seen_keys.insert(key) {
                        cycles.push(path.clone());
                    }
                }
                continue;
            }
            if on_path.contains(next) {
                continue;
            }
            path.push(next.clone());
            on_path.insert(next.clone());
            self.walk_for_cycles(start, next, path, on_path, cycles, seen_keys);
            path.pop();
            on_path.remove(next);
        }
    }

    /// Kahn's algorithm over in-degree defined as prerequisite count;
    /// ties in the ready frontier resolve lexicographically for determinism.
    pub fn topological_order(&self) -> Result<Vec<String>> {
        let mut indegree: BTreeMap<&str, usize> = self
            .forward
            .iter()
            .map(|(id, prereqs)| (id.as_str(), prereqs.len()))
            .collect();

        let mut frontier: BTreeSet<String> = indegree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(id, _)| id.to_string())
            .collect();

        let mut order = Vec::with_capacity(self.forward.len());
        while let Some(next) = frontier.iter().next().cloned() {
            frontier.remove(&next);
            order.push(next.clone());
            if let Some(dependents) = self.reverse.get(&next) {
                for dependent in dependents {
                    let degree = indegree.get_mut(dependent.as_str()).expect("dependent tracked");
                    *degree -= 1;
                    if *degree == 0 {
                        frontier.insert(dependent.clone());
                    }
                }
            }
        }

        if order.len() != self.forward.len() {
            return Err(EngineError::Conflict(
                "dependency graph contains a cycle".to_string(),
            ));
        }

        Ok(order)
    }

    /// Level assignment: root tasks are level 0, every other task is
    /// `1 + max(level of its prerequisites)`. Levels ascend; each level is
    /// sorted lexicographically.
    pub fn parallel_groups(&self) -> Result<Vec<Vec<String>>> {
        let order = self.topological_order()?;
        let mut levels: BTreeMap<String, usize> = BTreeMap::new();

        for id in &order {
            let level = self
                .forward
                .get(id)
                .map(|prereqs| prereqs.iter().map(|p| levels[p] + 1).max().unwrap_or(0))
                .unwrap_or(0);
            levels.insert(id.clone(), level);
        }

        let mut groups: BTreeMap<usize, Vec<String>> = BTreeMap::new();
        for (id, level) in levels {
            groups.entry(level).or_default().push(id);
        }
        for group in groups.values_mut() {
            group.sort();
        }

        Ok(groups.into_values().collect())
    }

    /// Longest path by edge count. Ties among equally-long predecessor
    /// candidates, and among multiple longest endpoints, resolve to the
    /// lexicographically smallest id.
    pub fn critical_path(&self) -> Result<Vec<String>> {
        let order = self.topological_order()?;
        let mut dist: BTreeMap<String, usize> = BTreeMap::new();
        let mut pred: BTreeMap<String, Option<String>> = BTreeMap::new();

        for id in &order {
            let prereqs = self.forward.get(id).cloned().unwrap_or_default();
            if prereqs.is_empty() {
                dist.insert(id.clone(), 0);
                pred.insert(id.clone(), None);
                continue;
            }
            let mut best: Option<(usize, &String)> = None;
            for prereq in &prereqs {
                let candidate_dist = dist[prereq] + 1;
                best = match best {
                    None => Some((candidate_dist, prereq)),
                    Some((best_dist, best_id))
                        if candidate_dist > best_dist
                            || (candidate_dist == best_dist && prereq < best_id) =>
                    {
                        Some((candidate_dist, prereq))
                    }
                    other => other,
                };
            }
            let (best_dist, best_id) = best.expect("non-empty prereqs has a best candidate");
            dist.insert(id.clone(), best_dist);
            pred.insert(id.clone(), Some(best_id.clone()));
        }

        let end = dist
            .iter()
            .fold(None, |acc: Option<(&String, &usize)>, (id, d)| match acc {
                None => Some((id, d)),
                Some((best_id, best_d)) if d > best_d || (d == best_d && id < best_id) => {
                    Some((id, d))
                }
                other => other,
            })
            .map(|(id, _)| id.clone());

        let mut path = Vec::new();
        let mut cursor = end;
        while let Some(id) = cursor {
            cursor = pred.get(&id).cloned().flatten();
            path.push(id);
        }
        path.reverse();
        Ok(path)
    }

    /// Ids not yet completed whose prerequisites are all completed.
    pub fn ready_tasks(&self, completed: &HashSet<String>) -> Vec<String> {
        self.forward
            .iter()
            .filter(|(id, _)| !completed.contains(id.as_str()))
            .filter(|(_, prereqs)| prereqs.iter().all(|p| completed.contains(p)))
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Succeeds iff every prerequisite reference resolves to a registered
    /// task and the graph is acyclic.
    pub fn validate(&self) -> Result<()> {
        for (id, prereqs) in &self.forward {
            for prereq in prereqs {
                if !self.forward.contains_key(prereq) {
                    return Err(EngineError::ValidationFailure(format!(
                        "task '{id}' depends on unknown task '{prereq}'"
                    )));
                }
            }
        }
        if !self.detect_cycles().is_empty() {
            return Err(EngineError::Conflict(
                "dependency graph contains a cycle".to_string(),
            ));
        }
        Ok(())
    }
}

/// Rotate a cycle path so it starts at its lexicographically smallest id,
/// so the same cycle found from different start nodes dedups to one entry.
fn canonical_cycle_key(path: &[String]) -> Vec<String> {
    let min_index = path
        .iter()
        .enumerate()
        .min_by_key(|(_, id)| id.as_str())
        .map(|(i, _)| i)
        .unwrap_or(0);
    path[min_index..].iter().chain(path[..min_index].iter()).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(edges: &[(&str, &[&str])]) -> DependencyGraph {
        let mut graph = DependencyGraph::new();
        for (id, prereqs) in edges {
            graph
                .add_task(*id, prereqs.iter().map(|s| s.to_string()))
                .unwrap();
        }
        graph
    }

    #[test]
    fn add_task_rejects_empty_id() {
        let mut graph = DependencyGraph::new();
        assert!(graph.add_task("", Vec::new()).is_err());
    }

    #[test]
    fn add_task_rejects_duplicate_id() {
        let mut graph = DependencyGraph::new();
        graph.add_task("task-a", Vec::new()).unwrap();
        assert!(graph.add_task("task-a", Vec::new()).is_err());
    }

    #[test]
    fn add_task_rejects_self_edge() {
        let mut graph = DependencyGraph::new();
        assert!(graph
            .add_task("task-a", vec!["task-a".to_string()])
            .is_err());
    }

    #[test]
    fn add_task_allows_unknown_dependency_but_validate_fails() {
        let mut graph = DependencyGraph::new();
        graph
            .add_task("task-a", vec!["task-ghost".to_string()])
            .unwrap();
        assert!(graph.validate().is_err());
    }

    #[test]
    fn cycle_rejection_scenario() {
        let graph = build(&[
            ("task-a", &["task-b"]),
            ("task-b", &["task-c"]),
            ("task-c", &["task-a"]),
        ]);

        let cycles = graph.detect_cycles();
        assert_eq!(cycles.len(), 1);
        let node_set: HashSet<_> = cycles[0].iter().cloned().collect();
        assert_eq!(
            node_set,
            HashSet::from(["task-a".to_string(), "task-b".to_string(), "task-c".to_string()])
        );

        assert!(graph.topological_order().is_err());
    }

    #[test]
    fn topological_order_respects_edges_and_is_deterministic() {
        let graph = build(&[
            ("task-d", &["task-b", "task-c"]),
            ("task-b", &["task-a"]),
            ("task-c", &["task-a"]),
            ("task-a", &[]),
        ]);

        let order = graph.topological_order().unwrap();
        let pos = |id: &str| order.iter().position(|x| x == id).unwrap();
        assert!(pos("task-a") < pos("task-b"));
        assert!(pos("task-a") < pos("task-c"));
        assert!(pos("task-b") < pos("task-d"));
        assert!(pos("task-c") < pos("task-d"));
        // task-b and task-c are both ready right after task-a; lexicographic order wins.
        assert!(pos("task-b") < pos("task-c"));
    }

    #[test]
    fn parallel_fan_out_scenario() {
        let graph = build(&[
            ("task-1", &[]),
            ("task-2", &[]),
            ("task-3", &[]),
            ("task-4", &[]),
            ("task-5", &[]),
        ]);

        let groups = graph.parallel_groups().unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(
            groups[0],
            vec!["task-1", "task-2", "task-3", "task-4", "task-5"]
        );

        let critical_path = graph.critical_path().unwrap();
        assert_eq!(critical_path.len(), 1);
    }

    #[test]
    fn parallel_groups_concatenate_to_a_topological_order() {
        let graph = build(&[
            ("task-d", &["task-b", "task-c"]),
            ("task-b", &["task-a"]),
            ("task-c", &["task-a"]),
            ("task-a", &[]),
        ]);

        let groups = graph.parallel_groups().unwrap();
        assert_eq!(groups, vec![
            vec!["task-a".to_string()],
            vec!["task-b".to_string(), "task-c".to_string()],
            vec!["task-d".to_string()],
        ]);
    }

    #[test]
    fn critical_path_picks_longest_chain() {
        let graph = build(&[
            ("task-a", &[]),
            ("task-b", &["task-a"]),
            ("task-c", &["task-b"]),
            ("task-d", &[]),
        ]);

        let path = graph.critical_path().unwrap();
        assert_eq!(path, vec!["task-a", "task-b", "task-c"]);
    }

    #[test]
    fn ready_tasks_excludes_completed_and_unsatisfied() {
        let graph = build(&[
            ("task-a", &[]),
            ("task-b", &["task-a"]),
            ("task-c", &["task-a"]),
            ("task-d", &["task-b", "task-c"]),
        ]);

        let completed = HashSet::from(["task-a".to_string()]);
        let mut ready = graph.ready_tasks(&completed);
        ready.sort();
        assert_eq!(ready, vec!["task-b", "task-c"]);
    }

    #[test]
    fn validate_passes_for_acyclic_fully_referenced_graph() {
        let graph = build(&[("task-a", &[]), ("task-b", &["task-a"])]);
        assert!(graph.validate().is_ok());
    }
}
