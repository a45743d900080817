//! Preview, apply and logs subcommands
//!
//! Selection flags are shared by `preview` and `apply`; each filter flag can
//! be repeated or given a comma-separated list.

use crate::apply::{ApplyOptions, ApplyRequest, ConflictBehavior, PresetRef, TemplateSelection};
use crate::types::TaskFilter;
use clap::Args;

/// Which tasks of which set go to which project.
#[derive(Args, Debug, Clone)]
pub struct SelectionArgs {
    /// Tenant performing the operation
    #[arg(long)]
    pub tenant: i64,

    /// Target project id
    #[arg(long)]
    pub project: i64,

    /// Template set id
    #[arg(long)]
    pub set: i64,

    /// Preset code within the set (unknown codes apply no preset filter)
    #[arg(long, conflicts_with = "preset_id")]
    pub preset: Option<String>,

    /// Preset id within the set (unknown ids are an error)
    #[arg(long)]
    pub preset_id: Option<i64>,

    /// Only tasks in these phases
    #[arg(long = "phase", value_name = "CODE", value_delimiter = ',')]
    pub phases: Vec<String>,

    /// Only tasks in these disciplines
    #[arg(long = "discipline", value_name = "CODE", value_delimiter = ',')]
    pub disciplines: Vec<String>,

    /// Only these task codes
    #[arg(long = "task", value_name = "CODE", value_delimiter = ',')]
    pub tasks: Vec<String>,

    /// Never these task codes
    #[arg(long = "exclude", value_name = "CODE", value_delimiter = ',')]
    pub exclude: Vec<String>,
}

fn dimension(codes: &[String]) -> Option<Vec<String>> {
    if codes.is_empty() {
        None
    } else {
        Some(codes.to_vec())
    }
}

impl SelectionArgs {
    pub fn filters(&self) -> TaskFilter {
        TaskFilter {
            phases: dimension(&self.phases),
            disciplines: dimension(&self.disciplines),
            tasks: dimension(&self.tasks),
            exclude: dimension(&self.exclude),
        }
    }

    pub fn to_selection(&self) -> TemplateSelection {
        let preset = match (&self.preset, self.preset_id) {
            (Some(code), _) => Some(PresetRef::Code(code.clone())),
            (None, Some(id)) => Some(PresetRef::Id(id)),
            (None, None) => None,
        };

        TemplateSelection {
            tenant_id: self.tenant,
            project_id: self.project,
            set_id: self.set,
            preset,
            filters: self.filters(),
        }
    }
}

/// Arguments for the preview subcommand
#[derive(Args, Debug)]
pub struct PreviewArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,
}

/// Arguments for the apply subcommand
#[derive(Args, Debug)]
pub struct ApplyArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,

    /// User executing the apply
    #[arg(long)]
    pub executor: i64,

    /// What to do when a task name already exists in the project
    #[arg(long, value_enum, default_value_t = ConflictBehavior::Skip)]
    pub conflict: ConflictBehavior,

    /// Derive task status from the template phase
    #[arg(long)]
    pub map_phase_to_kanban: bool,

    /// Assign tasks to project members by template role
    #[arg(long)]
    pub auto_assign_by_role: bool,

    /// Create deliverable folders per phase and discipline
    #[arg(long)]
    pub create_deliverable_folders: bool,

    /// Do not recreate dependencies between the new tasks
    #[arg(long)]
    pub no_dependencies: bool,
}

impl ApplyArgs {
    pub fn options(&self) -> ApplyOptions {
        ApplyOptions::new()
            .with_conflict_behavior(self.conflict)
            .with_phase_mapping(self.map_phase_to_kanban)
            .with_auto_assign(self.auto_assign_by_role)
            .with_deliverable_folders(self.create_deliverable_folders)
            .with_dependencies(!self.no_dependencies)
    }

    pub fn to_request(&self) -> ApplyRequest {
        ApplyRequest {
            selection: self.selection.to_selection(),
            options: self.options(),
            executor_id: self.executor,
        }
    }
}

/// Arguments for the logs subcommand
#[derive(Args, Debug)]
pub struct LogsArgs {
    /// Tenant owning the project
    #[arg(long)]
    pub tenant: i64,

    /// Project id
    #[arg(long)]
    pub project: i64,

    /// Maximum number of entries
    #[arg(long, default_value_t = 20)]
    pub limit: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Command};
    use clap::Parser;

    #[test]
    fn apply_flags_build_request() {
        let cli = Cli::parse_from([
            "template-apply",
            "apply",
            "--tenant",
            "1",
            "--project",
            "2",
            "--set",
            "3",
            "--preset",
            "design-only",
            "--discipline",
            "MEP,ARCH",
            "--exclude",
            "T5",
            "--executor",
            "9",
            "--conflict",
            "rename",
            "--no-dependencies",
        ]);

        let Command::Apply(args) = cli.command else {
            panic!("expected apply command");
        };
        let request = args.to_request();

        assert_eq!(
            request.selection.preset,
            Some(PresetRef::Code("design-only".to_string()))
        );
        assert_eq!(
            request.selection.filters.disciplines,
            Some(vec!["MEP".to_string(), "ARCH".to_string()])
        );
        assert_eq!(request.selection.filters.phases, None);
        assert_eq!(request.options.conflict_behavior, ConflictBehavior::Rename);
        assert!(!request.options.include_dependencies);
        assert_eq!(request.executor_id, 9);
    }

    #[test]
    fn preset_code_and_id_conflict() {
        let result = Cli::try_parse_from([
            "template-apply",
            "preview",
            "--tenant",
            "1",
            "--project",
            "2",
            "--set",
            "3",
            "--preset",
            "a",
            "--preset-id",
            "4",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn conflict_flag_defaults_to_skip_and_rejects_unknown_values() {
        let base = [
            "template-apply",
            "apply",
            "--tenant",
            "1",
            "--project",
            "2",
            "--set",
            "3",
            "--executor",
            "9",
        ];

        let cli = Cli::parse_from(base);
        let Command::Apply(args) = cli.command else {
            panic!("expected apply command");
        };
        assert_eq!(args.conflict, ConflictBehavior::Skip);

        let mut bad = base.to_vec();
        bad.extend(["--conflict", "merge"]);
        assert!(Cli::try_parse_from(bad).is_err());
    }
}
