//! Output formatting utilities for markdown and JSON.

use crate::apply::{ApplyPreview, ApplyReport};
use crate::db::catalog::CatalogImportStats;
use crate::types::{Task, TemplateApplyLog, TemplateSet};
use serde::Serialize;

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Markdown,
}

/// Pretty JSON for any serializable result.
pub fn to_json<T: Serialize>(value: &T) -> serde_json::Result<String> {
    serde_json::to_string_pretty(value)
}

fn push_list(md: &mut String, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    md.push_str(&format!("\n### {} ({})\n", title, items.len()));
    for item in items {
        md.push_str(&format!("- {}\n", item));
    }
}

/// Format an apply report as markdown.
pub fn format_report_markdown(report: &ApplyReport) -> String {
    let summary = &report.summary;
    let mut md = String::new();

    md.push_str(&format!(
        "## Applied template set {} to project {}\n",
        summary.template_set_id, summary.project_id
    ));
    if let Some(ref code) = report.preset_code {
        md.push_str(&format!("- **preset**: `{}`\n", code));
    }
    md.push_str(&format!("- **tasks created**: {}\n", summary.created_tasks));
    if report.skipped_tasks > 0 {
        md.push_str(&format!("- **tasks skipped**: {}\n", report.skipped_tasks));
    }
    md.push_str(&format!(
        "- **dependencies created**: {}\n",
        summary.created_dependencies
    ));
    if report.omitted_dependencies > 0 {
        md.push_str(&format!(
            "- **dependencies omitted**: {}\n",
            report.omitted_dependencies
        ));
    }
    if report.folders_created > 0 {
        md.push_str(&format!("- **folders**: {}\n", report.folders_created));
    }
    md.push_str(&format!("- **duration**: {} ms\n", report.duration_ms));

    push_list(&mut md, "Warnings", &report.warnings);
    push_list(&mut md, "Errors", &report.errors);
    md
}

/// Format a preview as markdown.
pub fn format_preview_markdown(preview: &ApplyPreview) -> String {
    let mut md = String::new();

    md.push_str("## Apply preview\n");
    md.push_str(&format!("- **tasks**: {}\n", preview.total_tasks));
    md.push_str(&format!("- **dependencies**: {}\n", preview.total_dependencies));
    md.push_str(&format!(
        "- **estimated duration**: {} days\n",
        preview.estimated_duration
    ));

    md.push_str("\n### By phase\n");
    for (code, count) in &preview.breakdown.phase {
        md.push_str(&format!("- `{}`: {}\n", code, count));
    }
    md.push_str("\n### By discipline\n");
    for (code, count) in &preview.breakdown.discipline {
        md.push_str(&format!("- `{}`: {}\n", code, count));
    }
    md
}

pub fn format_tasks_markdown(tasks: &[Task]) -> String {
    let mut md = format!("# Tasks ({})\n\n", tasks.len());
    for task in tasks {
        md.push_str(&format!("- `{}` **{}** [{}]", task.id, task.name, task.status));
        if let Some(hours) = task.estimated_hours {
            md.push_str(&format!(" {}h", hours));
        }
        if let Some(assignee) = task.assignee_id {
            md.push_str(&format!(" @{}", assignee));
        }
        if !task.tags.is_empty() {
            md.push_str(&format!(" ({})", task.tags.join(", ")));
        }
        md.push('\n');
    }
    md
}

pub fn format_sets_markdown(sets: &[TemplateSet]) -> String {
    let mut md = format!("# Template sets ({})\n\n", sets.len());
    for set in sets {
        let scope = if set.is_global { "global" } else { "tenant" };
        md.push_str(&format!(
            "- `{}` **{}** ({}, {})\n",
            set.id, set.name, set.code, scope
        ));
    }
    md
}

pub fn format_logs_markdown(logs: &[TemplateApplyLog]) -> String {
    let mut md = format!("# Apply log ({})\n\n", logs.len());
    for log in logs {
        md.push_str(&format!(
            "- `{}` set {} {}: {} tasks, {} dependencies, {} warnings, {} errors, {} ms\n",
            log.id,
            log.set_id,
            log.outcome,
            log.counts.tasks_created,
            log.counts.dependencies_created,
            log.counts.warnings_count,
            log.counts.errors_count,
            log.duration_ms
        ));
        if let Some(ref error) = log.error {
            md.push_str(&format!("  - error: {}\n", error));
        }
    }
    md
}

pub fn format_import_markdown(stats: &CatalogImportStats) -> String {
    format!(
        "## Catalog imported\n- **sets**: {}\n- **phases**: {}\n- **disciplines**: {}\n- **tasks**: {}\n- **dependencies**: {}\n- **presets**: {}\n",
        stats.sets, stats.phases, stats.disciplines, stats.tasks, stats.dependencies, stats.presets
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apply::ApplySummary;

    #[test]
    fn report_markdown_lists_warnings() {
        let report = ApplyReport {
            summary: ApplySummary {
                project_id: 1,
                template_set_id: 2,
                preset_id: None,
                created_tasks: 3,
                created_dependencies: 2,
            },
            warnings: vec!["Task \"X\" already exists, skipped".to_string()],
            ..Default::default()
        };

        let md = format_report_markdown(&report);
        assert!(md.contains("**tasks created**: 3"));
        assert!(md.contains("### Warnings (1)"));
        assert!(!md.contains("### Errors"));
    }

    #[test]
    fn report_json_is_flat() {
        let json = to_json(&ApplyReport::default()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value.get("created_tasks").is_some());
        assert!(value.get("summary").is_none());
    }
}
