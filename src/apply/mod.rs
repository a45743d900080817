//! Template apply service.
//!
//! Turns the tasks of a template set into concrete tasks of a project:
//!
//! 1. Check preconditions (project tenant, set visibility, preset)
//! 2. Resolve the task subset from the preset and manual selections
//! 3. Order it by dependencies
//! 4. Create tasks and dependencies inside one transaction
//! 5. Create deliverable folders (after commit)
//! 6. Write the apply log
//!
//! A failure in steps 1-4 leaves no tasks or dependencies behind. Applies
//! that pass step 1 are logged whether they succeed or fail.

pub mod folders;
pub mod linker;
pub mod materializer;
pub mod options;
pub mod preview;
pub mod resolver;
pub mod sorter;

pub use options::{ApplyOptions, ConflictBehavior};
pub use preview::ApplyPreview;
pub use sorter::CyclePolicy;

use crate::config::{ApplyConfig, Config, KanbanConfig};
use crate::db::Database;
use crate::error::{ApplyError, ApplyResult};
use crate::types::{
    ApplyCounts, ApplyOutcome, NewApplyLog, Project, TaskFilter, TemplatePreset, TemplateSet,
    TemplateTask,
};
use linker::Linked;
use materializer::{MaterializeContext, Materialized};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, info, warn};

/// How a preset is identified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresetRef {
    /// Unknown codes resolve to no preset filter.
    Code(String),
    /// Unknown ids are a precondition failure.
    Id(i64),
}

/// Which template tasks to apply, and where.
#[derive(Debug, Clone, Default)]
pub struct TemplateSelection {
    pub tenant_id: i64,
    pub project_id: i64,
    pub set_id: i64,
    pub preset: Option<PresetRef>,
    pub filters: TaskFilter,
}

/// A full apply request.
#[derive(Debug, Clone, Default)]
pub struct ApplyRequest {
    pub selection: TemplateSelection,
    pub options: ApplyOptions,
    pub executor_id: i64,
}

/// The core outcome of an apply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplySummary {
    pub project_id: i64,
    pub template_set_id: i64,
    pub preset_id: Option<i64>,
    pub created_tasks: usize,
    pub created_dependencies: usize,
}

/// Everything an apply reports back, including non-fatal problems.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplyReport {
    #[serde(flatten)]
    pub summary: ApplySummary,
    pub preset_code: Option<String>,
    pub skipped_tasks: usize,
    pub omitted_dependencies: usize,
    pub folders_created: usize,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    pub duration_ms: i64,
    pub log_id: Option<i64>,
}

impl ApplyReport {
    fn counts(&self) -> ApplyCounts {
        ApplyCounts {
            tasks_created: self.summary.created_tasks,
            dependencies_created: self.summary.created_dependencies,
            warnings_count: self.warnings.len(),
            errors_count: self.errors.len(),
        }
    }
}

/// Preconditions checked and tasks resolved; `order` sorts them.
struct ResolvedApply {
    project: Project,
    set: TemplateSet,
    preset: Option<TemplatePreset>,
    tasks: Vec<TemplateTask>,
    /// Template id -> code for every task of the set.
    codes: HashMap<i64, String>,
    warnings: Vec<String>,
}

/// Applies template sets to projects.
#[derive(Clone)]
pub struct TemplateApplier {
    db: Database,
    apply: ApplyConfig,
    kanban: KanbanConfig,
}

impl TemplateApplier {
    pub fn new(db: Database, config: &Config) -> Self {
        Self {
            db,
            apply: config.apply.clone(),
            kanban: config.kanban.clone(),
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Apply a template set, selecting the preset by code.
    ///
    /// Precondition failures return before anything is written, the apply
    /// log included. Every later outcome is logged.
    pub fn apply(&self, request: &ApplyRequest) -> ApplyResult<ApplyReport> {
        let started = Instant::now();

        let resolved = match self.resolve(&request.selection) {
            Ok(resolved) => resolved,
            Err(err) => {
                warn!(
                    project_id = request.selection.project_id,
                    tenant_id = request.selection.tenant_id,
                    set_id = request.selection.set_id,
                    code = ?err.code,
                    error = %err,
                    "Template apply rejected"
                );
                return Err(err);
            }
        };

        match self.order(resolved).and_then(|ordered| self.run(request, ordered)) {
            Ok(mut report) => {
                report.duration_ms = started.elapsed().as_millis() as i64;
                let log = self.log_entry(request, &report, ApplyOutcome::Succeeded, None);
                match self.db.insert_apply_log(&log) {
                    Ok(id) => report.log_id = Some(id),
                    Err(e) => {
                        warn!(project_id = log.project_id, error = %e, "Failed to write apply log");
                        report
                            .warnings
                            .push(format!("Apply log could not be written: {}", e));
                    }
                }

                info!(
                    project_id = report.summary.project_id,
                    set_id = report.summary.template_set_id,
                    tasks = report.summary.created_tasks,
                    dependencies = report.summary.created_dependencies,
                    warnings = report.warnings.len(),
                    duration_ms = report.duration_ms,
                    "Template applied"
                );
                Ok(report)
            }
            Err(err) => {
                let report = ApplyReport {
                    duration_ms: started.elapsed().as_millis() as i64,
                    ..Default::default()
                };
                let log = self.log_entry(
                    request,
                    &report,
                    ApplyOutcome::Failed,
                    Some(err.message.clone()),
                );
                if let Err(e) = self.db.insert_apply_log(&log) {
                    warn!(project_id = log.project_id, error = %e, "Failed to write apply log");
                }

                warn!(
                    project_id = request.selection.project_id,
                    set_id = request.selection.set_id,
                    code = ?err.code,
                    error = %err,
                    "Template apply failed"
                );
                Err(err)
            }
        }
    }

    /// Apply a template set, selecting the preset by id and without manual
    /// selections.
    pub fn apply_to_project(
        &self,
        tenant_id: i64,
        project_id: i64,
        set_id: i64,
        preset_id: Option<i64>,
        options: ApplyOptions,
        executor_id: i64,
    ) -> ApplyResult<ApplyReport> {
        self.apply(&ApplyRequest {
            selection: TemplateSelection {
                tenant_id,
                project_id,
                set_id,
                preset: preset_id.map(PresetRef::Id),
                filters: TaskFilter::default(),
            },
            options,
            executor_id,
        })
    }

    /// Summarize what an apply of this selection would create.
    pub fn preview(&self, selection: &TemplateSelection) -> ApplyResult<ApplyPreview> {
        let resolved = self.order(self.resolve(selection)?)?;
        Ok(preview::summarize(&resolved.tasks))
    }

    fn run(&self, request: &ApplyRequest, resolved: ResolvedApply) -> ApplyResult<ApplyReport> {
        let options = &request.options;
        let project = &resolved.project;

        let ctx = MaterializeContext {
            project,
            executor_id: request.executor_id,
            options,
            kanban: &self.kanban,
            chunk_size: self.apply.chunk_size,
        };

        let (materialized, linked): (Materialized, Linked) = self.db.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let materialized = materializer::materialize(&tx, &ctx, &resolved.tasks)?;
            let linked = if options.include_dependencies {
                linker::link_dependencies(
                    &tx,
                    project.tenant_id,
                    &resolved.tasks,
                    &materialized.task_map,
                    &resolved.codes,
                )
            } else {
                Linked::default()
            };
            tx.commit()?;
            Ok((materialized, linked))
        })?;

        let mut report = ApplyReport {
            summary: ApplySummary {
                project_id: project.id,
                template_set_id: resolved.set.id,
                preset_id: resolved.preset.as_ref().map(|p| p.id),
                created_tasks: materialized.tasks_created,
                created_dependencies: linked.dependencies_created,
            },
            preset_code: resolved.preset.as_ref().map(|p| p.code.clone()),
            skipped_tasks: materialized.tasks_skipped,
            omitted_dependencies: linked.dependencies_omitted,
            warnings: resolved.warnings,
            errors: materialized.errors,
            ..Default::default()
        };
        report.warnings.extend(materialized.warnings);
        report.warnings.extend(linked.warnings);

        if options.create_deliverable_folders {
            let pairs = folders::folder_pairs(
                resolved
                    .tasks
                    .iter()
                    .filter(|t| materialized.task_map.contains_key(&t.id)),
            );
            let folder_report =
                folders::create_deliverable_folders(&self.apply.deliverables_root, project, &pairs);
            report.folders_created = folder_report.created;
            report.warnings.extend(folder_report.warnings);
        }

        Ok(report)
    }

    fn resolve(&self, selection: &TemplateSelection) -> ApplyResult<ResolvedApply> {
        let tenant_id = selection.tenant_id;

        let project = self
            .db
            .get_project(selection.project_id)?
            .ok_or_else(|| ApplyError::project_not_found(selection.project_id))?;
        if project.tenant_id != tenant_id {
            return Err(ApplyError::tenant_mismatch(project.id, tenant_id));
        }

        let set = self
            .db
            .get_accessible_set(tenant_id, selection.set_id)?
            .ok_or_else(|| ApplyError::set_not_accessible(selection.set_id, tenant_id))?;

        let preset = match &selection.preset {
            None => None,
            Some(PresetRef::Code(code)) => {
                let preset = self.db.get_preset_by_code(tenant_id, set.id, code)?;
                if preset.is_none() {
                    debug!(
                        set_id = set.id,
                        preset = %code,
                        "Unknown preset code, no preset filter applied"
                    );
                }
                preset
            }
            Some(PresetRef::Id(id)) => Some(
                self.db
                    .get_preset(tenant_id, set.id, *id)?
                    .ok_or_else(|| ApplyError::preset_not_found(*id, set.id))?,
            ),
        };

        let all_tasks = self.db.load_template_tasks(tenant_id, set.id)?;
        let codes: HashMap<i64, String> =
            all_tasks.iter().map(|t| (t.id, t.code.clone())).collect();

        let tasks = resolver::resolve_tasks(
            all_tasks,
            preset.as_ref().map(|p| &p.filters),
            &selection.filters,
        );
        if tasks.is_empty() {
            return Err(ApplyError::empty_resolution(set.id));
        }

        let mut warnings = Vec::new();
        if tasks.len() > self.apply.queue_threshold {
            // TODO: hand these off to a background worker once one exists
            warn!(
                project_id = project.id,
                set_id = set.id,
                tasks = tasks.len(),
                threshold = self.apply.queue_threshold,
                "Large template applied synchronously"
            );
            warnings.push(format!(
                "Template resolves to {} tasks (threshold {}); applied synchronously",
                tasks.len(),
                self.apply.queue_threshold
            ));
        }

        debug!(
            project_id = project.id,
            set_id = set.id,
            tasks = tasks.len(),
            "Resolved template tasks"
        );

        Ok(ResolvedApply {
            project,
            set,
            preset,
            tasks,
            codes,
            warnings,
        })
    }

    /// Order resolved tasks by dependencies under the configured cycle policy.
    fn order(&self, mut resolved: ResolvedApply) -> ApplyResult<ResolvedApply> {
        let order = sorter::sort_by_dependencies(std::mem::take(&mut resolved.tasks));
        if order.has_cycle() && self.apply.cycle_policy == CyclePolicy::Append {
            let stalled = order.stalled_codes();
            warn!(
                set_id = resolved.set.id,
                tasks = ?stalled,
                "Dependency cycle, appending unordered tasks"
            );
            resolved.warnings.push(format!(
                "Dependency cycle among {}; these tasks were created without ordering",
                stalled.join(", ")
            ));
        }
        resolved.tasks = order.resolve(self.apply.cycle_policy)?;
        Ok(resolved)
    }

    fn log_entry(
        &self,
        request: &ApplyRequest,
        report: &ApplyReport,
        outcome: ApplyOutcome,
        error: Option<String>,
    ) -> NewApplyLog {
        let selection = &request.selection;
        let (preset_id, preset_code) = match (&report.summary.preset_id, &selection.preset) {
            (Some(id), _) => (Some(*id), report.preset_code.clone()),
            (None, Some(PresetRef::Id(id))) => (Some(*id), None),
            (None, Some(PresetRef::Code(code))) => (None, Some(code.clone())),
            (None, None) => (None, None),
        };

        NewApplyLog {
            project_id: selection.project_id,
            tenant_id: selection.tenant_id,
            set_id: selection.set_id,
            preset_id,
            preset_code,
            selections: serde_json::to_value(&selection.filters).unwrap_or_default(),
            options: serde_json::to_value(&request.options).unwrap_or_default(),
            counts: report.counts(),
            outcome,
            error,
            executor_id: request.executor_id,
            duration_ms: report.duration_ms,
        }
    }
}
