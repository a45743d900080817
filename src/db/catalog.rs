//! Template catalog storage: import and tenant-scoped reads.

use super::{Database, json_column, now_ms};
use crate::catalog::CatalogFile;
use crate::types::{
    RecordStatus, TaskFilter, TemplateDiscipline, TemplatePhase, TemplatePreset, TemplateSet,
    TemplateTask,
};
use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, Row, named_params, params};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Visibility clause shared by every catalog read; binds `:tenant_id`.
const SET_VISIBLE: &str =
    "s.record_status = 'active' AND (s.is_global = 1 OR s.tenant_id = :tenant_id)";

/// Row counts written by a catalog import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogImportStats {
    pub sets: usize,
    pub phases: usize,
    pub disciplines: usize,
    pub tasks: usize,
    pub dependencies: usize,
    pub presets: usize,
    /// Ids of the created sets, in file order.
    pub set_ids: Vec<i64>,
}

fn parse_set_row(row: &Row) -> rusqlite::Result<TemplateSet> {
    let status: String = row.get("record_status")?;
    Ok(TemplateSet {
        id: row.get("id")?,
        code: row.get("code")?,
        name: row.get("name")?,
        tenant_id: row.get("tenant_id")?,
        is_global: row.get::<_, i64>("is_global")? != 0,
        record_status: status.parse().unwrap_or(RecordStatus::Archived),
        created_at: row.get("created_at")?,
    })
}

fn parse_preset_row(row: &Row) -> rusqlite::Result<TemplatePreset> {
    let filters: Option<String> = row.get("filters")?;
    Ok(TemplatePreset {
        id: row.get("id")?,
        set_id: row.get("set_id")?,
        code: row.get("code")?,
        name: row.get("name")?,
        filters: json_column::<TaskFilter>(filters),
    })
}

impl Database {
    /// Import every set of a catalog file in one transaction.
    pub fn import_catalog(&self, catalog: &CatalogFile) -> Result<CatalogImportStats> {
        catalog.validate()?;

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let mut stats = CatalogImportStats::default();
            let now = now_ms();

            for set in &catalog.sets {
                tx.execute(
                    "INSERT INTO template_sets (code, name, tenant_id, is_global, record_status, created_at)
                     VALUES (?1, ?2, ?3, ?4, 'active', ?5)",
                    params![set.code, set.name, set.tenant_id, set.global as i64, now],
                )?;
                let set_id = tx.last_insert_rowid();
                stats.sets += 1;
                stats.set_ids.push(set_id);

                let mut phase_ids: HashMap<&str, i64> = HashMap::new();
                for (index, phase) in set.phases.iter().enumerate() {
                    tx.execute(
                        "INSERT INTO template_phases (set_id, code, name, sort_order)
                         VALUES (?1, ?2, ?3, ?4)",
                        params![
                            set_id,
                            phase.code,
                            phase.name,
                            phase.sort_order.unwrap_or(index as i64)
                        ],
                    )?;
                    phase_ids.insert(&phase.code, tx.last_insert_rowid());
                    stats.phases += 1;
                }

                let mut discipline_ids: HashMap<&str, i64> = HashMap::new();
                for discipline in &set.disciplines {
                    tx.execute(
                        "INSERT INTO template_disciplines (set_id, code, name, color)
                         VALUES (?1, ?2, ?3, ?4)",
                        params![set_id, discipline.code, discipline.name, discipline.color],
                    )?;
                    discipline_ids.insert(&discipline.code, tx.last_insert_rowid());
                    stats.disciplines += 1;
                }

                let mut task_ids: HashMap<&str, i64> = HashMap::new();
                for (index, task) in set.tasks.iter().enumerate() {
                    let phase_id = task.phase.as_deref().and_then(|c| phase_ids.get(c));
                    let discipline_id = task
                        .discipline
                        .as_deref()
                        .and_then(|c| discipline_ids.get(c));
                    tx.execute(
                        "INSERT INTO template_tasks (
                            set_id, code, name, description, phase_id, discipline_id,
                            role_key, est_duration_days, sort_order
                        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                        params![
                            set_id,
                            task.code,
                            task.name,
                            task.description,
                            phase_id,
                            discipline_id,
                            task.role_key,
                            task.est_duration_days,
                            index as i64,
                        ],
                    )?;
                    task_ids.insert(&task.code, tx.last_insert_rowid());
                    stats.tasks += 1;
                }

                // Edges go in once every task of the set has an id
                for task in &set.tasks {
                    let task_id = task_ids[task.code.as_str()];
                    for dep in &task.depends_on {
                        let inserted = tx.execute(
                            "INSERT OR IGNORE INTO template_task_dependencies (set_id, task_id, depends_on_task_id)
                             VALUES (?1, ?2, ?3)",
                            params![set_id, task_id, task_ids[dep.as_str()]],
                        )?;
                        stats.dependencies += inserted;
                    }
                }

                for preset in &set.presets {
                    tx.execute(
                        "INSERT INTO template_presets (set_id, code, name, filters)
                         VALUES (?1, ?2, ?3, ?4)",
                        params![
                            set_id,
                            preset.code,
                            preset.name,
                            serde_json::to_string(&preset.filters)?
                        ],
                    )?;
                    stats.presets += 1;
                }
            }

            tx.commit()?;
            Ok(stats)
        })
    }

    /// Get a template set if it is active and visible to the tenant.
    pub fn get_accessible_set(&self, tenant_id: i64, set_id: i64) -> Result<Option<TemplateSet>> {
        self.with_conn(|conn| {
            let set = conn
                .query_row(
                    &format!("SELECT s.* FROM template_sets s WHERE s.id = :set_id AND {SET_VISIBLE}"),
                    named_params! {":set_id": set_id, ":tenant_id": tenant_id},
                    parse_set_row,
                )
                .optional()?;
            Ok(set)
        })
    }

    /// Find a visible set by code, preferring the tenant's own set over a
    /// global one with the same code.
    pub fn find_set_by_code(&self, tenant_id: i64, code: &str) -> Result<Option<TemplateSet>> {
        self.with_conn(|conn| {
            let set = conn
                .query_row(
                    &format!(
                        "SELECT s.* FROM template_sets s
                         WHERE s.code = :code AND {SET_VISIBLE}
                         ORDER BY s.is_global ASC, s.id ASC
                         LIMIT 1"
                    ),
                    named_params! {":code": code, ":tenant_id": tenant_id},
                    parse_set_row,
                )
                .optional()?;
            Ok(set)
        })
    }

    /// List the sets a tenant can apply.
    pub fn list_template_sets(&self, tenant_id: i64) -> Result<Vec<TemplateSet>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT s.* FROM template_sets s
                 WHERE {SET_VISIBLE}
                 ORDER BY s.code, s.id"
            ))?;
            let sets = stmt
                .query_map(named_params! {":tenant_id": tenant_id}, parse_set_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(sets)
        })
    }

    /// Archive a template set; archived sets are no longer applicable.
    pub fn archive_template_set(&self, tenant_id: i64, set_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE template_sets SET record_status = 'archived'
                 WHERE id = ?1 AND tenant_id = ?2 AND record_status = 'active'",
                params![set_id, tenant_id],
            )?;
            Ok(changed > 0)
        })
    }

    /// Load every task of a set in catalog order with phase, discipline and
    /// dependencies attached.
    pub fn load_template_tasks(&self, tenant_id: i64, set_id: i64) -> Result<Vec<TemplateTask>> {
        self.with_conn(|conn| load_template_tasks_internal(conn, tenant_id, set_id))
    }

    /// Get a preset of a set by code.
    pub fn get_preset_by_code(
        &self,
        tenant_id: i64,
        set_id: i64,
        code: &str,
    ) -> Result<Option<TemplatePreset>> {
        self.with_conn(|conn| {
            let preset = conn
                .query_row(
                    &format!(
                        "SELECT p.* FROM template_presets p
                         JOIN template_sets s ON s.id = p.set_id
                         WHERE p.set_id = :set_id AND {SET_VISIBLE} AND p.code = :code"
                    ),
                    named_params! {":set_id": set_id, ":tenant_id": tenant_id, ":code": code},
                    parse_preset_row,
                )
                .optional()?;
            Ok(preset)
        })
    }

    /// Get a preset of a set by id.
    pub fn get_preset(
        &self,
        tenant_id: i64,
        set_id: i64,
        preset_id: i64,
    ) -> Result<Option<TemplatePreset>> {
        self.with_conn(|conn| {
            let preset = conn
                .query_row(
                    &format!(
                        "SELECT p.* FROM template_presets p
                         JOIN template_sets s ON s.id = p.set_id
                         WHERE p.set_id = :set_id AND {SET_VISIBLE} AND p.id = :preset_id"
                    ),
                    named_params! {
                        ":set_id": set_id,
                        ":tenant_id": tenant_id,
                        ":preset_id": preset_id,
                    },
                    parse_preset_row,
                )
                .optional()?;
            Ok(preset)
        })
    }

    /// List presets of a set.
    pub fn list_presets(&self, tenant_id: i64, set_id: i64) -> Result<Vec<TemplatePreset>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT p.* FROM template_presets p
                 JOIN template_sets s ON s.id = p.set_id
                 WHERE p.set_id = :set_id AND {SET_VISIBLE}
                 ORDER BY p.code"
            ))?;
            let presets = stmt
                .query_map(
                    named_params! {":set_id": set_id, ":tenant_id": tenant_id},
                    parse_preset_row,
                )?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(presets)
        })
    }
}

fn load_template_tasks_internal(
    conn: &Connection,
    tenant_id: i64,
    set_id: i64,
) -> Result<Vec<TemplateTask>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT t.id, t.set_id, t.code, t.name, t.description, t.role_key,
                t.est_duration_days, t.sort_order,
                ph.id AS phase_id, ph.code AS phase_code, ph.name AS phase_name,
                ph.sort_order AS phase_sort_order,
                d.id AS discipline_id, d.code AS discipline_code,
                d.name AS discipline_name, d.color AS discipline_color
         FROM template_tasks t
         JOIN template_sets s ON s.id = t.set_id
         LEFT JOIN template_phases ph ON ph.id = t.phase_id
         LEFT JOIN template_disciplines d ON d.id = t.discipline_id
         WHERE t.set_id = :set_id AND {SET_VISIBLE}
         ORDER BY t.sort_order, t.id"
    ))?;

    let mut tasks = stmt
        .query_map(named_params! {":set_id": set_id, ":tenant_id": tenant_id}, |row| {
            let phase = match row.get::<_, Option<i64>>("phase_id")? {
                Some(id) => Some(TemplatePhase {
                    id,
                    code: row.get("phase_code")?,
                    name: row.get("phase_name")?,
                    sort_order: row.get("phase_sort_order")?,
                }),
                None => None,
            };
            let discipline = match row.get::<_, Option<i64>>("discipline_id")? {
                Some(id) => Some(TemplateDiscipline {
                    id,
                    code: row.get("discipline_code")?,
                    name: row.get("discipline_name")?,
                    color: row.get("discipline_color")?,
                }),
                None => None,
            };
            Ok(TemplateTask {
                id: row.get("id")?,
                set_id: row.get("set_id")?,
                code: row.get("code")?,
                name: row.get("name")?,
                description: row.get("description")?,
                phase,
                discipline,
                role_key: row.get("role_key")?,
                est_duration_days: row.get("est_duration_days")?,
                sort_order: row.get("sort_order")?,
                depends_on: Vec::new(),
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut stmt = conn.prepare(
        "SELECT task_id, depends_on_task_id FROM template_task_dependencies
         WHERE set_id = ?1
         ORDER BY id",
    )?;
    let mut deps_by_task: HashMap<i64, Vec<i64>> = HashMap::new();
    let edges = stmt.query_map(params![set_id], |row| {
        Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?))
    })?;
    for edge in edges {
        let (task_id, depends_on) = edge?;
        deps_by_task.entry(task_id).or_default().push(depends_on);
    }

    for task in &mut tasks {
        if let Some(deps) = deps_by_task.remove(&task.id) {
            task.depends_on = deps;
        }
    }

    Ok(tasks)
}
