//! Deliverable folder tree for a project.
//!
//! Layout: `<root>/<tenant_id>/<project_id>/<phase_code>/<discipline_code>`.

use crate::types::{Project, TemplateTask};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Segment used when a task has no phase or discipline.
pub const UNCLASSIFIED: &str = "general";

#[derive(Debug, Clone, Default)]
pub struct FolderReport {
    pub created: usize,
    pub warnings: Vec<String>,
}

/// Distinct `(phase, discipline)` pairs of the given tasks.
pub fn folder_pairs<'a>(
    tasks: impl IntoIterator<Item = &'a TemplateTask>,
) -> BTreeSet<(String, String)> {
    tasks
        .into_iter()
        .map(|task| {
            (
                task.phase_code().unwrap_or(UNCLASSIFIED).to_string(),
                task.discipline_code().unwrap_or(UNCLASSIFIED).to_string(),
            )
        })
        .collect()
}

pub fn project_dir(root: &Path, project: &Project) -> PathBuf {
    root.join(project.tenant_id.to_string())
        .join(project.id.to_string())
}

/// Create one directory per pair. Failures are reported as warnings.
pub fn create_deliverable_folders(
    root: &Path,
    project: &Project,
    pairs: &BTreeSet<(String, String)>,
) -> FolderReport {
    let mut report = FolderReport::default();
    let base = project_dir(root, project);

    for (phase, discipline) in pairs {
        if !is_safe_segment(phase) || !is_safe_segment(discipline) {
            report.warnings.push(format!(
                "Deliverable folder {}/{} skipped: code is not a valid directory name",
                phase, discipline
            ));
            continue;
        }

        let dir = base.join(phase).join(discipline);
        match std::fs::create_dir_all(&dir) {
            Ok(()) => report.created += 1,
            Err(e) => {
                warn!(path = %dir.display(), error = %e, "Failed to create deliverable folder");
                report.warnings.push(format!(
                    "Failed to create deliverable folder {}: {}",
                    dir.display(),
                    e
                ));
            }
        }
    }

    report
}

/// A single, non-traversing path component.
fn is_safe_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && !segment.contains(['/', '\\', '\0'])
}
