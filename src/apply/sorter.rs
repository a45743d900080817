//! Dependency ordering of template tasks (Kahn's algorithm).

use crate::error::{ApplyError, ApplyResult};
use crate::types::TemplateTask;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Handling of tasks that never become ready because of a cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CyclePolicy {
    /// Fail the operation.
    #[default]
    Reject,
    /// Place the stalled tasks after the sorted ones, in input order.
    Append,
}

/// Result of ordering a collection of template tasks.
#[derive(Debug, Clone)]
pub struct TopologicalOrder {
    /// Tasks in dependency order.
    pub sorted: Vec<TemplateTask>,
    /// Tasks in a cycle or downstream of one, in input order.
    pub stalled: Vec<TemplateTask>,
}

impl TopologicalOrder {
    pub fn has_cycle(&self) -> bool {
        !self.stalled.is_empty()
    }

    pub fn stalled_codes(&self) -> Vec<String> {
        self.stalled.iter().map(|t| t.code.clone()).collect()
    }

    /// Apply the cycle policy and return the final order.
    pub fn resolve(self, policy: CyclePolicy) -> ApplyResult<Vec<TemplateTask>> {
        if self.has_cycle() && policy == CyclePolicy::Reject {
            return Err(ApplyError::dependency_cycle(&self.stalled_codes()));
        }
        let mut ordered = self.sorted;
        ordered.extend(self.stalled);
        Ok(ordered)
    }
}

/// Order tasks so every task comes after the tasks it depends on.
///
/// Only dependencies between tasks of the collection constrain the order.
/// When several tasks are ready at once the one earliest in the input goes
/// first, so the result is deterministic.
pub fn sort_by_dependencies(tasks: Vec<TemplateTask>) -> TopologicalOrder {
    let index: HashMap<i64, usize> = tasks
        .iter()
        .enumerate()
        .map(|(i, task)| (task.id, i))
        .collect();

    let mut in_degree = vec![0usize; tasks.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); tasks.len()];

    for (i, task) in tasks.iter().enumerate() {
        let mut seen = HashSet::new();
        for dep in &task.depends_on {
            if let Some(&j) = index.get(dep)
                && seen.insert(j)
            {
                in_degree[i] += 1;
                dependents[j].push(i);
            }
        }
    }

    let mut ready: BTreeSet<usize> = (0..tasks.len()).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(tasks.len());

    while let Some(i) = ready.pop_first() {
        order.push(i);
        for &k in &dependents[i] {
            in_degree[k] -= 1;
            if in_degree[k] == 0 {
                ready.insert(k);
            }
        }
    }

    let mut slots: Vec<Option<TemplateTask>> = tasks.into_iter().map(Some).collect();
    let sorted: Vec<TemplateTask> = order.iter().filter_map(|&i| slots[i].take()).collect();
    let stalled: Vec<TemplateTask> = slots.into_iter().flatten().collect();

    TopologicalOrder { sorted, stalled }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: i64, deps: &[i64]) -> TemplateTask {
        TemplateTask {
            id,
            set_id: 1,
            code: format!("T{}", id),
            name: format!("Task {}", id),
            description: None,
            phase: None,
            discipline: None,
            role_key: None,
            est_duration_days: None,
            sort_order: id,
            depends_on: deps.to_vec(),
        }
    }

    fn ids(tasks: &[TemplateTask]) -> Vec<i64> {
        tasks.iter().map(|t| t.id).collect()
    }

    #[test]
    fn chain_is_ordered_even_when_reversed() {
        let order = sort_by_dependencies(vec![task(3, &[2]), task(2, &[1]), task(1, &[])]);
        assert_eq!(ids(&order.sorted), vec![1, 2, 3]);
        assert!(!order.has_cycle());
    }

    #[test]
    fn every_edge_points_forward() {
        let tasks = vec![
            task(1, &[4]),
            task(2, &[]),
            task(3, &[1, 2]),
            task(4, &[2]),
            task(5, &[3, 4]),
        ];
        let order = sort_by_dependencies(tasks.clone());
        let position: HashMap<i64, usize> = order
            .sorted
            .iter()
            .enumerate()
            .map(|(i, t)| (t.id, i))
            .collect();

        for t in &tasks {
            for dep in &t.depends_on {
                assert!(position[dep] < position[&t.id], "{} before {}", dep, t.id);
            }
        }
    }

    #[test]
    fn ties_follow_input_order() {
        let order = sort_by_dependencies(vec![task(9, &[]), task(4, &[]), task(7, &[9])]);
        assert_eq!(ids(&order.sorted), vec![9, 4, 7]);
    }

    #[test]
    fn outside_dependencies_are_ignored() {
        let order = sort_by_dependencies(vec![task(2, &[99]), task(1, &[])]);
        assert_eq!(ids(&order.sorted), vec![2, 1]);
    }

    #[test]
    fn cycle_is_reported_and_rejected() {
        let order = sort_by_dependencies(vec![
            task(1, &[]),
            task(2, &[3]),
            task(3, &[2]),
            task(4, &[3]),
        ]);
        assert_eq!(ids(&order.sorted), vec![1]);
        assert_eq!(order.stalled_codes(), vec!["T2", "T3", "T4"]);

        let err = order.resolve(CyclePolicy::Reject).unwrap_err();
        assert!(err.message.contains("T2, T3, T4"));
    }

    #[test]
    fn append_policy_keeps_stalled_tasks_last() {
        let order = sort_by_dependencies(vec![task(2, &[2]), task(1, &[])]);
        let resolved = order.resolve(CyclePolicy::Append).unwrap();
        assert_eq!(ids(&resolved), vec![1, 2]);
    }
}
