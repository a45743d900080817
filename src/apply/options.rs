//! Typed apply options.

use crate::error::ApplyError;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What to do when a task with the same name already exists in the project.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ConflictBehavior {
    /// Leave the existing task alone and record a warning.
    #[default]
    Skip,
    /// Create the task with " (Copy)" appended to its name.
    Rename,
    /// Create the task under the same name.
    Allow,
}

impl ConflictBehavior {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictBehavior::Skip => "skip",
            ConflictBehavior::Rename => "rename",
            ConflictBehavior::Allow => "allow",
        }
    }
}

impl fmt::Display for ConflictBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConflictBehavior {
    type Err = ApplyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "skip" => Ok(ConflictBehavior::Skip),
            "rename" => Ok(ConflictBehavior::Rename),
            "allow" => Ok(ConflictBehavior::Allow),
            other => Err(ApplyError::invalid_options(
                "conflict_behavior",
                &format!(
                    "Unknown conflict behavior '{}' (expected skip, rename or allow)",
                    other
                ),
            )),
        }
    }
}

/// Options controlling how template tasks become project tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyOptions {
    #[serde(default)]
    pub conflict_behavior: ConflictBehavior,

    /// Derive task status from the template phase.
    #[serde(default)]
    pub map_phase_to_kanban: bool,

    /// Assign tasks to the first project member holding the template role.
    #[serde(default)]
    pub auto_assign_by_role: bool,

    /// Create one deliverables directory per phase/discipline pair.
    #[serde(default)]
    pub create_deliverable_folders: bool,

    /// Recreate template dependencies between the new tasks.
    #[serde(default = "default_true")]
    pub include_dependencies: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ApplyOptions {
    fn default() -> Self {
        Self {
            conflict_behavior: ConflictBehavior::default(),
            map_phase_to_kanban: false,
            auto_assign_by_role: false,
            create_deliverable_folders: false,
            include_dependencies: true,
        }
    }
}

impl ApplyOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the conflict behavior (builder pattern).
    pub fn with_conflict_behavior(mut self, behavior: ConflictBehavior) -> Self {
        self.conflict_behavior = behavior;
        self
    }

    /// Map phases to board statuses (builder pattern).
    pub fn with_phase_mapping(mut self, enabled: bool) -> Self {
        self.map_phase_to_kanban = enabled;
        self
    }

    /// Assign by template role (builder pattern).
    pub fn with_auto_assign(mut self, enabled: bool) -> Self {
        self.auto_assign_by_role = enabled;
        self
    }

    /// Create deliverable folders (builder pattern).
    pub fn with_deliverable_folders(mut self, enabled: bool) -> Self {
        self.create_deliverable_folders = enabled;
        self
    }

    /// Include dependencies (builder pattern).
    pub fn with_dependencies(mut self, enabled: bool) -> Self {
        self.include_dependencies = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn empty_json_applies_defaults() {
        let options: ApplyOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options, ApplyOptions::default());
        assert!(options.include_dependencies);
        assert_eq!(options.conflict_behavior, ConflictBehavior::Skip);
    }

    #[test]
    fn unknown_conflict_behavior_is_rejected() {
        let parsed = serde_json::from_str::<ApplyOptions>(r#"{"conflict_behavior": "merge"}"#);
        assert!(parsed.is_err());

        let err = "merge".parse::<ConflictBehavior>().unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidOptions);
        assert_eq!(err.field.as_deref(), Some("conflict_behavior"));
    }

    #[test]
    fn conflict_behavior_parses_case_insensitively() {
        assert_eq!(
            "Rename".parse::<ConflictBehavior>().unwrap(),
            ConflictBehavior::Rename
        );
    }
}
