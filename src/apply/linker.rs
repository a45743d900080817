//! Recreates template dependencies between materialized tasks.

use crate::db::tasks::insert_dependency_if_absent;
use crate::types::TemplateTask;
use rusqlite::Connection;
use std::collections::HashMap;
use tracing::warn;

#[derive(Debug, Clone, Default)]
pub struct Linked {
    pub dependencies_created: usize,
    /// Edges whose target was not created by this apply.
    pub dependencies_omitted: usize,
    pub warnings: Vec<String>,
}

/// Link every mapped task to its mapped template dependencies.
///
/// `codes` maps template task ids of the whole set to their codes, so edges
/// to tasks outside the selection can be named in warnings. Insert failures
/// become warnings and do not stop the batch.
pub fn link_dependencies(
    conn: &Connection,
    tenant_id: i64,
    tasks: &[TemplateTask],
    task_map: &HashMap<i64, i64>,
    codes: &HashMap<i64, String>,
) -> Linked {
    let mut out = Linked::default();
    let code_of = |id: i64| {
        codes
            .get(&id)
            .cloned()
            .unwrap_or_else(|| format!("#{}", id))
    };

    for task in tasks {
        let Some(&task_id) = task_map.get(&task.id) else {
            continue;
        };

        for &depends_on in &task.depends_on {
            let Some(&dependency_id) = task_map.get(&depends_on) else {
                let target = code_of(depends_on);
                out.dependencies_omitted += 1;
                out.warnings.push(format!(
                    "Dependency {} -> {} omitted: {} was not created by this apply",
                    task.code, target, target
                ));
                continue;
            };

            match insert_dependency_if_absent(conn, tenant_id, task_id, dependency_id) {
                Ok(true) => out.dependencies_created += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!(
                        task_id,
                        dependency_id,
                        error = %e,
                        "Dependency insert failed"
                    );
                    out.warnings.push(format!(
                        "Dependency {} -> {} could not be created: {}",
                        task.code,
                        code_of(depends_on),
                        e
                    ));
                }
            }
        }
    }

    out
}
