//! Template catalog file format.
//!
//! A catalog file describes one or more template sets, their phases,
//! disciplines, tasks and presets. Tasks reference phases, disciplines and
//! other tasks by code; the codes are resolved to row ids on import.
//!
//! ```yaml
//! sets:
//!   - code: building
//!     name: Building delivery
//!     global: true
//!     phases:
//!       - { code: DESIGN, name: Design }
//!     disciplines:
//!       - { code: MEP, name: Mechanical, color: "#3366ff" }
//!     tasks:
//!       - { code: T1, name: Survey, phase: DESIGN, discipline: MEP }
//!       - { code: T2, name: Concept, phase: DESIGN, depends_on: [T1] }
//!     presets:
//!       - { code: design-only, name: Design only, filters: { phases: [DESIGN] } }
//! ```

use crate::types::TaskFilter;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while reading or validating a catalog file.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid YAML catalog: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid JSON catalog: {0}")]
    Json(#[from] serde_json::Error),

    #[error("template set '{set}' needs a tenant_id or global: true")]
    MissingOwner { set: String },

    #[error("duplicate {kind} code '{code}' in template set '{set}'")]
    DuplicateCode {
        set: String,
        kind: &'static str,
        code: String,
    },

    #[error("task '{task}' in template set '{set}' references unknown {kind} '{code}'")]
    UnknownReference {
        set: String,
        task: String,
        kind: &'static str,
        code: String,
    },
}

/// Top-level catalog document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogFile {
    #[serde(default)]
    pub sets: Vec<SetDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetDefinition {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub tenant_id: Option<i64>,
    #[serde(default)]
    pub global: bool,
    #[serde(default)]
    pub phases: Vec<PhaseDefinition>,
    #[serde(default)]
    pub disciplines: Vec<DisciplineDefinition>,
    #[serde(default)]
    pub tasks: Vec<TaskDefinition>,
    #[serde(default)]
    pub presets: Vec<PresetDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseDefinition {
    pub code: String,
    pub name: String,
    /// Defaults to the phase's position in the file.
    #[serde(default)]
    pub sort_order: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisciplineDefinition {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDefinition {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub phase: Option<String>,
    #[serde(default)]
    pub discipline: Option<String>,
    #[serde(default)]
    pub role_key: Option<String>,
    #[serde(default)]
    pub est_duration_days: Option<f64>,
    /// Codes of tasks in the same set that must come first.
    #[serde(default)]
    pub depends_on: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresetDefinition {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub filters: TaskFilter,
}

impl CatalogFile {
    /// Load a catalog from disk. `.json` files are parsed as JSON, anything
    /// else as YAML.
    pub fn from_file(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let catalog = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content)?
        } else {
            serde_yaml::from_str(&content)?
        };

        Ok(catalog)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, CatalogError> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Check ownership, code uniqueness and code references.
    pub fn validate(&self) -> Result<(), CatalogError> {
        for set in &self.sets {
            set.validate()?;
        }
        Ok(())
    }
}

impl SetDefinition {
    fn validate(&self) -> Result<(), CatalogError> {
        if self.tenant_id.is_none() && !self.global {
            return Err(CatalogError::MissingOwner {
                set: self.code.clone(),
            });
        }

        let phases = unique_codes(&self.code, "phase", self.phases.iter().map(|p| &p.code))?;
        let disciplines = unique_codes(
            &self.code,
            "discipline",
            self.disciplines.iter().map(|d| &d.code),
        )?;
        let tasks = unique_codes(&self.code, "task", self.tasks.iter().map(|t| &t.code))?;
        unique_codes(&self.code, "preset", self.presets.iter().map(|p| &p.code))?;

        for task in &self.tasks {
            let unknown = |kind: &'static str, code: &str| CatalogError::UnknownReference {
                set: self.code.clone(),
                task: task.code.clone(),
                kind,
                code: code.to_string(),
            };

            if let Some(ref phase) = task.phase
                && !phases.contains(phase.as_str())
            {
                return Err(unknown("phase", phase));
            }
            if let Some(ref discipline) = task.discipline
                && !disciplines.contains(discipline.as_str())
            {
                return Err(unknown("discipline", discipline));
            }
            if let Some(dep) = task
                .depends_on
                .iter()
                .find(|dep| !tasks.contains(dep.as_str()))
            {
                return Err(unknown("task", dep));
            }
        }

        Ok(())
    }
}

fn unique_codes<'a>(
    set: &str,
    kind: &'static str,
    codes: impl Iterator<Item = &'a String>,
) -> Result<HashSet<&'a str>, CatalogError> {
    let mut seen = HashSet::new();
    for code in codes {
        if !seen.insert(code.as_str()) {
            return Err(CatalogError::DuplicateCode {
                set: set.to_string(),
                kind,
                code: code.clone(),
            });
        }
    }
    Ok(seen)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r##"
sets:
  - code: building
    name: Building delivery
    global: true
    phases:
      - { code: DESIGN, name: Design }
    disciplines:
      - { code: MEP, name: Mechanical, color: "#3366ff" }
    tasks:
      - { code: T1, name: Survey, phase: DESIGN, discipline: MEP }
      - { code: T2, name: Concept, depends_on: [T1] }
    presets:
      - { code: design-only, name: Design only, filters: { phases: [DESIGN] } }
"##;

    #[test]
    fn parses_and_validates_sample() {
        let catalog = CatalogFile::from_yaml_str(SAMPLE).unwrap();
        catalog.validate().unwrap();

        let set = &catalog.sets[0];
        assert_eq!(set.tasks[1].depends_on, vec!["T1"]);
        assert_eq!(
            set.presets[0].filters.phases,
            Some(vec!["DESIGN".to_string()])
        );
    }

    #[test]
    fn rejects_unknown_dependency_code() {
        let yaml = SAMPLE.replace("depends_on: [T1]", "depends_on: [T9]");
        let catalog = CatalogFile::from_yaml_str(&yaml).unwrap();

        let err = catalog.validate().unwrap_err();
        assert!(matches!(
            err,
            CatalogError::UnknownReference { kind: "task", .. }
        ));
    }

    #[test]
    fn rejects_duplicate_task_code() {
        let yaml = SAMPLE.replace("code: T2", "code: T1");
        let catalog = CatalogFile::from_yaml_str(&yaml).unwrap();

        let err = catalog.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate task code 'T1'"));
    }

    #[test]
    fn requires_an_owner() {
        let yaml = SAMPLE.replace("global: true", "global: false");
        let catalog = CatalogFile::from_yaml_str(&yaml).unwrap();

        assert!(matches!(
            catalog.validate(),
            Err(CatalogError::MissingOwner { .. })
        ));
    }
}
