//! Core types for the template apply service.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Explicit soft-delete marker carried by catalog, project and task rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    #[default]
    Active,
    Archived,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Active => "active",
            RecordStatus::Archived => "archived",
        }
    }
}

impl FromStr for RecordStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(RecordStatus::Active),
            "archived" => Ok(RecordStatus::Archived),
            other => Err(anyhow::anyhow!("Unknown record status: {}", other)),
        }
    }
}

/// A reusable catalog of task definitions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateSet {
    pub id: i64,
    pub code: String,
    pub name: String,
    /// Owning tenant; `None` for sets that only exist globally.
    pub tenant_id: Option<i64>,
    pub is_global: bool,
    pub record_status: RecordStatus,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplatePhase {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub sort_order: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateDiscipline {
    pub id: i64,
    pub code: String,
    pub name: String,
    /// Hex color, e.g. `#3366ff`.
    pub color: Option<String>,
}

/// A template task with its phase, discipline and dependency ids loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateTask {
    pub id: i64,
    pub set_id: i64,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub phase: Option<TemplatePhase>,
    pub discipline: Option<TemplateDiscipline>,
    pub role_key: Option<String>,
    pub est_duration_days: Option<f64>,
    pub sort_order: i64,
    /// Ids of template tasks this task depends on (must come first).
    pub depends_on: Vec<i64>,
}

impl TemplateTask {
    pub fn phase_code(&self) -> Option<&str> {
        self.phase.as_ref().map(|p| p.code.as_str())
    }

    pub fn discipline_code(&self) -> Option<&str> {
        self.discipline.as_ref().map(|d| d.code.as_str())
    }
}

/// Filter over the tasks of a template set.
///
/// Used both for preset filters and for manual selections. A dimension that is
/// absent or empty places no restriction on the result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phases: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disciplines: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tasks: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude: Option<Vec<String>>,
}

/// A named filter scoped to a template set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplatePreset {
    pub id: i64,
    pub set_id: i64,
    pub code: String,
    pub name: String,
    pub filters: TaskFilter,
}

/// Target project receiving generated tasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub tenant_id: i64,
    pub name: String,
    pub start_date: Option<chrono::NaiveDate>,
    pub record_status: RecordStatus,
    pub created_at: i64,
}

/// A user assigned to a project with a role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectMember {
    pub project_id: i64,
    pub user_id: i64,
    pub role: String,
}

/// A concrete, project-bound task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub project_id: i64,
    pub tenant_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub status: String,
    pub estimated_hours: Option<f64>,
    pub tags: Vec<String>,
    pub assignee_id: Option<i64>,
    pub created_by: i64,
    pub template_task_id: Option<i64>,
    pub record_status: RecordStatus,
    pub created_at: i64,
}

/// Input for inserting a concrete task.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub project_id: i64,
    pub tenant_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub status: String,
    pub estimated_hours: Option<f64>,
    pub tags: Vec<String>,
    pub assignee_id: Option<i64>,
    pub created_by: i64,
    pub template_task_id: Option<i64>,
}

/// Directed edge between concrete tasks: `task_id` depends on `dependency_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDependency {
    pub id: i64,
    pub tenant_id: i64,
    pub task_id: i64,
    pub dependency_id: i64,
    pub created_at: i64,
}

/// Outcome recorded on an apply log row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyOutcome {
    Succeeded,
    Failed,
}

impl ApplyOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplyOutcome::Succeeded => "succeeded",
            ApplyOutcome::Failed => "failed",
        }
    }
}

impl fmt::Display for ApplyOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplyOutcome {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "succeeded" => Ok(ApplyOutcome::Succeeded),
            "failed" => Ok(ApplyOutcome::Failed),
            other => Err(anyhow::anyhow!("Unknown apply outcome: {}", other)),
        }
    }
}

/// Counters stored with each apply log row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyCounts {
    pub tasks_created: usize,
    pub dependencies_created: usize,
    pub warnings_count: usize,
    pub errors_count: usize,
}

/// Immutable audit record of one apply invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateApplyLog {
    pub id: i64,
    pub project_id: i64,
    pub tenant_id: i64,
    pub set_id: i64,
    pub preset_id: Option<i64>,
    pub preset_code: Option<String>,
    pub selections: serde_json::Value,
    pub options: serde_json::Value,
    pub counts: ApplyCounts,
    pub outcome: ApplyOutcome,
    pub error: Option<String>,
    pub executor_id: i64,
    pub duration_ms: i64,
    pub created_at: i64,
}

/// Input for writing an apply log row.
#[derive(Debug, Clone)]
pub struct NewApplyLog {
    pub project_id: i64,
    pub tenant_id: i64,
    pub set_id: i64,
    pub preset_id: Option<i64>,
    pub preset_code: Option<String>,
    pub selections: serde_json::Value,
    pub options: serde_json::Value,
    pub counts: ApplyCounts,
    pub outcome: ApplyOutcome,
    pub error: Option<String>,
    pub executor_id: i64,
    pub duration_ms: i64,
}
