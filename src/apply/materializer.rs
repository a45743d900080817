//! Creates concrete project tasks from ordered template tasks.

use super::options::{ApplyOptions, ConflictBehavior};
use crate::config::KanbanConfig;
use crate::db::projects::find_member_with_role_internal;
use crate::db::tasks::{active_task_names, insert_task_internal};
use crate::error::ApplyError;
use crate::types::{NewTask, Project, TemplateDiscipline, TemplateTask};
use anyhow::Result;
use rusqlite::Connection;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Working hours per estimated template day.
pub const HOURS_PER_DAY: f64 = 8.0;

/// Longest task name storage accepts.
pub const MAX_TASK_NAME_CHARS: usize = 255;

const COPY_SUFFIX: &str = " (Copy)";

/// Inputs shared by every task of one apply.
pub struct MaterializeContext<'a> {
    pub project: &'a Project,
    pub executor_id: i64,
    pub options: &'a ApplyOptions,
    pub kanban: &'a KanbanConfig,
    pub chunk_size: usize,
}

/// What the materializer produced.
#[derive(Debug, Clone, Default)]
pub struct Materialized {
    /// Template task id -> created task id.
    pub task_map: HashMap<i64, i64>,
    pub tasks_created: usize,
    pub tasks_skipped: usize,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

/// Create tasks on `conn`, which is expected to be inside the apply's
/// transaction. Any task failure is returned as an error so the caller rolls
/// back.
///
/// Conflicts are checked against the tasks that existed before this apply,
/// so template tasks sharing a name do not conflict with each other.
pub fn materialize(
    conn: &Connection,
    ctx: &MaterializeContext<'_>,
    tasks: &[TemplateTask],
) -> Result<Materialized> {
    let mut out = Materialized::default();
    let chunk_size = ctx.chunk_size.max(1);
    let existing = active_task_names(conn, ctx.project.tenant_id, ctx.project.id)?;

    for (phase, group) in group_by_phase(tasks) {
        let phase_label = phase.unwrap_or("none");
        for (chunk_index, chunk) in group.chunks(chunk_size).enumerate() {
            debug!(
                project_id = ctx.project.id,
                phase = phase_label,
                chunk = chunk_index,
                tasks = chunk.len(),
                "Materializing chunk"
            );
            for task in chunk {
                materialize_one(conn, ctx, &existing, task, &mut out)?;
            }
        }
    }

    Ok(out)
}

fn materialize_one(
    conn: &Connection,
    ctx: &MaterializeContext<'_>,
    existing: &HashSet<String>,
    task: &TemplateTask,
    out: &mut Materialized,
) -> Result<()> {
    let project = ctx.project;
    let mut name = task.name.clone();

    if existing.contains(&name) {
        match ctx.options.conflict_behavior {
            ConflictBehavior::Skip => {
                out.warnings
                    .push(format!("Task \"{}\" already exists, skipped", name));
                out.tasks_skipped += 1;
                return Ok(());
            }
            ConflictBehavior::Rename => name.push_str(COPY_SUFFIX),
            ConflictBehavior::Allow => {}
        }
    }

    let length = name.chars().count();
    if name.trim().is_empty() || length > MAX_TASK_NAME_CHARS {
        return Err(ApplyError::invalid_task(
            &task.code,
            &format!(
                "name must be 1-{} characters, got {}",
                MAX_TASK_NAME_CHARS, length
            ),
        )
        .into());
    }

    let status = if ctx.options.map_phase_to_kanban {
        ctx.kanban.status_for(task.phase_code())
    } else {
        ctx.kanban.default_status.as_str()
    };

    let assignee_id = if ctx.options.auto_assign_by_role {
        task.role_key
            .as_deref()
            .and_then(|role| resolve_assignee(conn, project, task, role, out))
    } else {
        None
    };

    let new_task = NewTask {
        project_id: project.id,
        tenant_id: project.tenant_id,
        name,
        description: task.description.clone(),
        status: status.to_string(),
        estimated_hours: task.est_duration_days.map(|days| days * HOURS_PER_DAY),
        tags: discipline_tags(task.discipline.as_ref()),
        assignee_id,
        created_by: ctx.executor_id,
        template_task_id: Some(task.id),
    };

    let task_id = insert_task_internal(conn, &new_task)?;
    out.task_map.insert(task.id, task_id);
    out.tasks_created += 1;
    Ok(())
}

/// Lookup failures leave the task unassigned.
fn resolve_assignee(
    conn: &Connection,
    project: &Project,
    task: &TemplateTask,
    role: &str,
    out: &mut Materialized,
) -> Option<i64> {
    match find_member_with_role_internal(conn, project.tenant_id, project.id, role) {
        Ok(user_id) => user_id,
        Err(e) => {
            warn!(
                project_id = project.id,
                task = %task.code,
                role = role,
                error = %e,
                "Assignee lookup failed"
            );
            out.errors.push(format!(
                "Assignee lookup for task {} (role {}) failed: {}",
                task.code, role, e
            ));
            None
        }
    }
}

/// Discipline code, plus `color:<hex>` when the discipline has a color.
pub fn discipline_tags(discipline: Option<&TemplateDiscipline>) -> Vec<String> {
    let Some(discipline) = discipline else {
        return Vec::new();
    };

    let mut tags = vec![discipline.code.clone()];
    if let Some(color) = discipline.color.as_deref().filter(|c| !c.is_empty()) {
        tags.push(format!("color:{}", color));
    }
    tags
}

/// Group tasks by phase code. Groups appear in order of their first task and
/// keep the input order inside each group.
pub fn group_by_phase(tasks: &[TemplateTask]) -> Vec<(Option<&str>, Vec<&TemplateTask>)> {
    let mut groups: Vec<(Option<&str>, Vec<&TemplateTask>)> = Vec::new();
    let mut positions: HashMap<Option<&str>, usize> = HashMap::new();

    for task in tasks {
        let key = task.phase_code();
        let position = *positions.entry(key).or_insert_with(|| {
            groups.push((key, Vec::new()));
            groups.len() - 1
        });
        groups[position].1.push(task);
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TemplatePhase;

    fn task(code: &str, phase: Option<&str>) -> TemplateTask {
        TemplateTask {
            id: 1,
            set_id: 1,
            code: code.to_string(),
            name: code.to_string(),
            description: None,
            phase: phase.map(|p| TemplatePhase {
                id: 1,
                code: p.to_string(),
                name: p.to_string(),
                sort_order: 0,
            }),
            discipline: None,
            role_key: None,
            est_duration_days: None,
            sort_order: 0,
            depends_on: vec![],
        }
    }

    #[test]
    fn groups_keep_first_appearance_order() {
        let tasks = vec![
            task("A", Some("BUILD")),
            task("B", Some("DESIGN")),
            task("C", Some("BUILD")),
            task("D", None),
        ];
        let groups = group_by_phase(&tasks);

        let summary: Vec<(Option<&str>, Vec<&str>)> = groups
            .iter()
            .map(|(phase, items)| (*phase, items.iter().map(|t| t.code.as_str()).collect()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (Some("BUILD"), vec!["A", "C"]),
                (Some("DESIGN"), vec!["B"]),
                (None, vec!["D"]),
            ]
        );
    }

    #[test]
    fn color_becomes_synthetic_tag() {
        let discipline = TemplateDiscipline {
            id: 1,
            code: "MEP".to_string(),
            name: "Mechanical".to_string(),
            color: Some("#3366ff".to_string()),
        };
        assert_eq!(
            discipline_tags(Some(&discipline)),
            vec!["MEP".to_string(), "color:#3366ff".to_string()]
        );
        assert!(discipline_tags(None).is_empty());
    }
}
