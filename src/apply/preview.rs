//! Read-only summary of what an apply would create.

use crate::types::TemplateTask;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Key for tasks without a phase or discipline.
pub const NONE_KEY: &str = "none";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Breakdown {
    pub phase: BTreeMap<String, usize>,
    pub discipline: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplyPreview {
    pub total_tasks: usize,
    /// Edges with both endpoints in the resolved set.
    pub total_dependencies: usize,
    /// Sum of template durations, in days.
    pub estimated_duration: f64,
    pub breakdown: Breakdown,
}

pub fn summarize(tasks: &[TemplateTask]) -> ApplyPreview {
    let ids: HashSet<i64> = tasks.iter().map(|t| t.id).collect();
    let mut preview = ApplyPreview {
        total_tasks: tasks.len(),
        ..Default::default()
    };

    for task in tasks {
        preview.total_dependencies += task
            .depends_on
            .iter()
            .filter(|dep| ids.contains(dep))
            .count();
        preview.estimated_duration += task.est_duration_days.unwrap_or(0.0);

        *preview
            .breakdown
            .phase
            .entry(task.phase_code().unwrap_or(NONE_KEY).to_string())
            .or_default() += 1;
        *preview
            .breakdown
            .discipline
            .entry(task.discipline_code().unwrap_or(NONE_KEY).to_string())
            .or_default() += 1;
    }

    preview
}
