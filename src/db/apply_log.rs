//! Apply audit log. Rows are append-only.

use super::{Database, json_column, now_ms};
use crate::types::{ApplyCounts, ApplyOutcome, NewApplyLog, TemplateApplyLog};
use anyhow::Result;
use rusqlite::{Row, params};

fn parse_log_row(row: &Row) -> rusqlite::Result<TemplateApplyLog> {
    let selections: Option<String> = row.get("selections")?;
    let options: Option<String> = row.get("options")?;
    let counts: Option<String> = row.get("counts")?;
    let outcome: String = row.get("outcome")?;
    Ok(TemplateApplyLog {
        id: row.get("id")?,
        project_id: row.get("project_id")?,
        tenant_id: row.get("tenant_id")?,
        set_id: row.get("set_id")?,
        preset_id: row.get("preset_id")?,
        preset_code: row.get("preset_code")?,
        selections: json_column(selections),
        options: json_column(options),
        counts: json_column::<ApplyCounts>(counts),
        outcome: outcome.parse().unwrap_or(ApplyOutcome::Failed),
        error: row.get("error")?,
        executor_id: row.get("executor_id")?,
        duration_ms: row.get("duration_ms")?,
        created_at: row.get("created_at")?,
    })
}

impl Database {
    /// Append an apply log row and return its id.
    pub fn insert_apply_log(&self, log: &NewApplyLog) -> Result<i64> {
        let selections = serde_json::to_string(&log.selections)?;
        let options = serde_json::to_string(&log.options)?;
        let counts = serde_json::to_string(&log.counts)?;

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO template_apply_logs (
                    project_id, tenant_id, set_id, preset_id, preset_code,
                    selections, options, counts, outcome, error,
                    executor_id, duration_ms, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    log.project_id,
                    log.tenant_id,
                    log.set_id,
                    log.preset_id,
                    log.preset_code,
                    selections,
                    options,
                    counts,
                    log.outcome.as_str(),
                    log.error,
                    log.executor_id,
                    log.duration_ms,
                    now_ms(),
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Most recent apply logs for a project, newest first.
    pub fn list_apply_logs(
        &self,
        tenant_id: i64,
        project_id: i64,
        limit: usize,
    ) -> Result<Vec<TemplateApplyLog>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM template_apply_logs
                 WHERE tenant_id = ?1 AND project_id = ?2
                 ORDER BY created_at DESC, id DESC
                 LIMIT ?3",
            )?;
            let logs = stmt
                .query_map(params![tenant_id, project_id, limit as i64], parse_log_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(logs)
        })
    }
}
