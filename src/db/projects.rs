//! Project and membership operations.

use super::{Database, now_ms};
use crate::types::{Project, ProjectMember, RecordStatus};
use anyhow::{Result, anyhow};
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, Row, params};

fn parse_project_row(row: &Row) -> rusqlite::Result<Project> {
    let start_date: Option<String> = row.get("start_date")?;
    let status: String = row.get("record_status")?;
    Ok(Project {
        id: row.get("id")?,
        tenant_id: row.get("tenant_id")?,
        name: row.get("name")?,
        start_date: start_date.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
        record_status: status.parse().unwrap_or(RecordStatus::Archived),
        created_at: row.get("created_at")?,
    })
}

/// First member of the project holding `role`, in assignment order.
pub(crate) fn find_member_with_role_internal(
    conn: &Connection,
    tenant_id: i64,
    project_id: i64,
    role: &str,
) -> Result<Option<i64>> {
    let user_id = conn
        .query_row(
            "SELECT user_id FROM project_members
             WHERE tenant_id = ?1 AND project_id = ?2 AND role = ?3
             ORDER BY id
             LIMIT 1",
            params![tenant_id, project_id, role],
            |row| row.get(0),
        )
        .optional()?;
    Ok(user_id)
}

impl Database {
    /// Create a new project for a tenant.
    pub fn create_project(
        &self,
        tenant_id: i64,
        name: &str,
        start_date: Option<NaiveDate>,
    ) -> Result<Project> {
        if name.trim().is_empty() {
            return Err(anyhow!("Project name must not be empty"));
        }

        let now = now_ms();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO projects (tenant_id, name, start_date, record_status, created_at)
                 VALUES (?1, ?2, ?3, 'active', ?4)",
                params![
                    tenant_id,
                    name,
                    start_date.map(|d| d.format("%Y-%m-%d").to_string()),
                    now
                ],
            )?;

            Ok(Project {
                id: conn.last_insert_rowid(),
                tenant_id,
                name: name.to_string(),
                start_date,
                record_status: RecordStatus::Active,
                created_at: now,
            })
        })
    }

    /// Look a project up by id regardless of tenant.
    ///
    /// Only the apply preconditions use this, to tell a missing project from
    /// one owned by another tenant.
    pub fn get_project(&self, project_id: i64) -> Result<Option<Project>> {
        self.with_conn(|conn| {
            let project = conn
                .query_row(
                    "SELECT * FROM projects WHERE id = ?1 AND record_status = 'active'",
                    params![project_id],
                    parse_project_row,
                )
                .optional()?;
            Ok(project)
        })
    }

    /// List a tenant's active projects.
    pub fn list_projects(&self, tenant_id: i64) -> Result<Vec<Project>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM projects
                 WHERE tenant_id = ?1 AND record_status = 'active'
                 ORDER BY id",
            )?;
            let projects = stmt
                .query_map(params![tenant_id], parse_project_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(projects)
        })
    }

    /// Assign a user to a project with a role. Re-assigning is a no-op.
    pub fn add_project_member(
        &self,
        tenant_id: i64,
        project_id: i64,
        user_id: i64,
        role: &str,
    ) -> Result<ProjectMember> {
        self.with_conn(|conn| {
            let exists: bool = conn
                .query_row(
                    "SELECT 1 FROM projects WHERE id = ?1 AND tenant_id = ?2",
                    params![project_id, tenant_id],
                    |_| Ok(true),
                )
                .optional()?
                .unwrap_or(false);
            if !exists {
                return Err(anyhow!(
                    "Project {} not found for tenant {}",
                    project_id,
                    tenant_id
                ));
            }

            conn.execute(
                "INSERT OR IGNORE INTO project_members (project_id, tenant_id, user_id, role)
                 VALUES (?1, ?2, ?3, ?4)",
                params![project_id, tenant_id, user_id, role],
            )?;

            Ok(ProjectMember {
                project_id,
                user_id,
                role: role.to_string(),
            })
        })
    }

    /// List the members of a project in assignment order.
    pub fn list_project_members(
        &self,
        tenant_id: i64,
        project_id: i64,
    ) -> Result<Vec<ProjectMember>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT project_id, user_id, role FROM project_members
                 WHERE tenant_id = ?1 AND project_id = ?2
                 ORDER BY id",
            )?;
            let members = stmt
                .query_map(params![tenant_id, project_id], |row| {
                    Ok(ProjectMember {
                        project_id: row.get(0)?,
                        user_id: row.get(1)?,
                        role: row.get(2)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(members)
        })
    }

    /// First project member holding `role`.
    pub fn find_member_with_role(
        &self,
        tenant_id: i64,
        project_id: i64,
        role: &str,
    ) -> Result<Option<i64>> {
        self.with_conn(|conn| find_member_with_role_internal(conn, tenant_id, project_id, role))
    }
}
