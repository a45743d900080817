//! Selects the template tasks an apply operates on.

use crate::types::{TaskFilter, TemplateTask};

/// Narrow a set's tasks by an optional preset filter, then by the manual
/// selections. Catalog order is preserved.
pub fn resolve_tasks(
    tasks: Vec<TemplateTask>,
    preset: Option<&TaskFilter>,
    selections: &TaskFilter,
) -> Vec<TemplateTask> {
    tasks
        .into_iter()
        .filter(|task| preset.is_none_or(|filter| matches(filter, task)))
        .filter(|task| matches(selections, task))
        .collect()
}

/// Whether a task passes every restricting dimension of the filter.
pub fn matches(filter: &TaskFilter, task: &TemplateTask) -> bool {
    if let Some(phases) = restricting(&filter.phases)
        && !task.phase_code().is_some_and(|code| contains(phases, code))
    {
        return false;
    }

    if let Some(disciplines) = restricting(&filter.disciplines)
        && !task
            .discipline_code()
            .is_some_and(|code| contains(disciplines, code))
    {
        return false;
    }

    if let Some(codes) = restricting(&filter.tasks)
        && !contains(codes, &task.code)
    {
        return false;
    }

    // Exclusions win over every positive match
    if let Some(excluded) = restricting(&filter.exclude)
        && contains(excluded, &task.code)
    {
        return false;
    }

    true
}

/// A dimension only restricts when it is present and non-empty.
fn restricting(dimension: &Option<Vec<String>>) -> Option<&[String]> {
    dimension.as_deref().filter(|codes| !codes.is_empty())
}

fn contains(codes: &[String], code: &str) -> bool {
    codes.iter().any(|c| c == code)
}
