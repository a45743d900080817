//! Concrete task and task dependency operations.
//!
//! The `*_internal` helpers take a connection so the apply pipeline can run
//! them inside its own transaction.

use super::{Database, json_column, now_ms};
use crate::types::{NewTask, RecordStatus, Task, TaskDependency};
use anyhow::Result;
use rusqlite::{Connection, Row, params};
use std::collections::HashSet;

pub fn parse_task_row(row: &Row) -> rusqlite::Result<Task> {
    let tags: Option<String> = row.get("tags")?;
    let status: String = row.get("record_status")?;
    Ok(Task {
        id: row.get("id")?,
        project_id: row.get("project_id")?,
        tenant_id: row.get("tenant_id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        status: row.get("status")?,
        estimated_hours: row.get("estimated_hours")?,
        tags: json_column(tags),
        assignee_id: row.get("assignee_id")?,
        created_by: row.get("created_by")?,
        template_task_id: row.get("template_task_id")?,
        record_status: status.parse().unwrap_or(RecordStatus::Archived),
        created_at: row.get("created_at")?,
    })
}

/// Names of the project's active tasks.
pub(crate) fn active_task_names(
    conn: &Connection,
    tenant_id: i64,
    project_id: i64,
) -> Result<HashSet<String>> {
    let mut stmt = conn.prepare(
        "SELECT name FROM tasks
         WHERE tenant_id = ?1 AND project_id = ?2 AND record_status = 'active'",
    )?;
    let names = stmt
        .query_map(params![tenant_id, project_id], |row| row.get(0))?
        .collect::<rusqlite::Result<HashSet<String>>>()?;
    Ok(names)
}

/// Insert a task and return its id.
pub(crate) fn insert_task_internal(conn: &Connection, task: &NewTask) -> Result<i64> {
    conn.execute(
        "INSERT INTO tasks (
            project_id, tenant_id, name, description, status, estimated_hours,
            tags, assignee_id, created_by, template_task_id, record_status, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 'active', ?11)",
        params![
            task.project_id,
            task.tenant_id,
            task.name,
            task.description,
            task.status,
            task.estimated_hours,
            serde_json::to_string(&task.tags)?,
            task.assignee_id,
            task.created_by,
            task.template_task_id,
            now_ms(),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Insert `task_id -> dependency_id` unless the pair already exists.
/// Returns true when a row was written.
pub(crate) fn insert_dependency_if_absent(
    conn: &Connection,
    tenant_id: i64,
    task_id: i64,
    dependency_id: i64,
) -> Result<bool> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO task_dependencies (tenant_id, task_id, dependency_id, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![tenant_id, task_id, dependency_id, now_ms()],
    )?;
    Ok(inserted > 0)
}

impl Database {
    /// Create a single task outside of an apply (manual entry).
    pub fn create_task(&self, task: &NewTask) -> Result<Task> {
        self.with_conn(|conn| {
            let id = insert_task_internal(conn, task)?;
            let task = conn.query_row(
                "SELECT * FROM tasks WHERE id = ?1",
                params![id],
                parse_task_row,
            )?;
            Ok(task)
        })
    }

    /// List the active tasks of a project in creation order.
    pub fn list_project_tasks(&self, tenant_id: i64, project_id: i64) -> Result<Vec<Task>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM tasks
                 WHERE tenant_id = ?1 AND project_id = ?2 AND record_status = 'active'
                 ORDER BY id",
            )?;
            let tasks = stmt
                .query_map(params![tenant_id, project_id], parse_task_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(tasks)
        })
    }

    /// List dependencies whose dependent task belongs to the project.
    pub fn list_project_dependencies(
        &self,
        tenant_id: i64,
        project_id: i64,
    ) -> Result<Vec<TaskDependency>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT d.id, d.tenant_id, d.task_id, d.dependency_id, d.created_at
                 FROM task_dependencies d
                 JOIN tasks t ON t.id = d.task_id
                 WHERE d.tenant_id = ?1 AND t.project_id = ?2
                 ORDER BY d.id",
            )?;
            let deps = stmt
                .query_map(params![tenant_id, project_id], |row| {
                    Ok(TaskDependency {
                        id: row.get(0)?,
                        tenant_id: row.get(1)?,
                        task_id: row.get(2)?,
                        dependency_id: row.get(3)?,
                        created_at: row.get(4)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(deps)
        })
    }

    /// Soft-delete a task. Returns false if no active task matched.
    pub fn archive_task(&self, tenant_id: i64, task_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE tasks SET record_status = 'archived'
                 WHERE id = ?1 AND tenant_id = ?2 AND record_status = 'active'",
                params![task_id, tenant_id],
            )?;
            Ok(changed > 0)
        })
    }
}
