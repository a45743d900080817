//! Configuration loading and management.

use crate::apply::sorter::CyclePolicy;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Directory name used for project-local and user-level config.
const CONFIG_DIR: &str = "template-apply";
const CONFIG_FILE: &str = "config.yaml";

/// Service configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub apply: ApplyConfig,

    #[serde(default)]
    pub kanban: KanbanConfig,
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("template-apply/projects.db")
}

/// Tuning for the apply pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyConfig {
    /// Number of tasks inserted per batch.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Resolved task count above which a large-template warning is raised.
    #[serde(default = "default_queue_threshold")]
    pub queue_threshold: usize,

    /// Root directory for per-project deliverable folders.
    #[serde(default = "default_deliverables_root")]
    pub deliverables_root: PathBuf,

    /// What to do with tasks caught in a dependency cycle.
    #[serde(default)]
    pub cycle_policy: CyclePolicy,
}

impl Default for ApplyConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            queue_threshold: default_queue_threshold(),
            deliverables_root: default_deliverables_root(),
            cycle_policy: CyclePolicy::default(),
        }
    }
}

fn default_chunk_size() -> usize {
    500
}

fn default_queue_threshold() -> usize {
    5000
}

fn default_deliverables_root() -> PathBuf {
    PathBuf::from("deliverables")
}

/// Phase to board status mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KanbanConfig {
    /// Status for tasks whose phase has no mapping.
    #[serde(default = "default_status")]
    pub default_status: String,

    /// Phase code -> status.
    #[serde(default)]
    pub phase_status: HashMap<String, String>,
}

impl Default for KanbanConfig {
    fn default() -> Self {
        Self {
            default_status: default_status(),
            phase_status: HashMap::new(),
        }
    }
}

fn default_status() -> String {
    "backlog".to_string()
}

impl KanbanConfig {
    /// Status for a task in the given phase.
    pub fn status_for(&self, phase_code: Option<&str>) -> &str {
        phase_code
            .and_then(|code| self.phase_status.get(code))
            .map(String::as_str)
            .unwrap_or(&self.default_status)
    }
}

impl Config {
    /// Load configuration from file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {:?}", path))?;
        Ok(config)
    }

    /// Load configuration, preferring an explicit path when one is given.
    ///
    /// An explicit path must load. Without one, the project-local and
    /// user-level locations are tried before falling back to defaults.
    /// Environment overrides are applied last.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::load(path)?,
            None => Self::load_or_default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from default locations or return defaults.
    pub fn load_or_default() -> Self {
        // Try ./template-apply/config.yaml
        if let Ok(config) = Self::load(Path::new(CONFIG_DIR).join(CONFIG_FILE)) {
            return config;
        }

        // Then the user config directory
        if let Some(dir) = dirs::config_dir()
            && let Ok(config) = Self::load(dir.join(CONFIG_DIR).join(CONFIG_FILE))
        {
            return config;
        }

        Self::default()
    }

    /// Apply `TEMPLATE_APPLY_*` environment overrides.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(db_path) = std::env::var("TEMPLATE_APPLY_DB_PATH") {
            self.server.db_path = PathBuf::from(db_path);
        }

        if let Ok(root) = std::env::var("TEMPLATE_APPLY_DELIVERABLES_ROOT") {
            self.apply.deliverables_root = PathBuf::from(root);
        }

        if let Ok(size) = std::env::var("TEMPLATE_APPLY_CHUNK_SIZE")
            && let Ok(size) = size.parse::<usize>()
            && size > 0
        {
            self.apply.chunk_size = size;
        }
    }

    /// Ensure the database directory exists.
    pub fn ensure_db_dir(&self) -> Result<()> {
        if let Some(parent) = self.server.db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.apply.chunk_size, 500);
        assert_eq!(config.apply.queue_threshold, 5000);
        assert_eq!(config.apply.cycle_policy, CyclePolicy::Reject);
        assert_eq!(config.kanban.status_for(Some("DESIGN")), "backlog");
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "apply:\n  chunk_size: 50\nkanban:\n  phase_status:\n    DESIGN: todo\n"
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.apply.chunk_size, 50);
        assert_eq!(config.apply.queue_threshold, 5000);
        assert_eq!(config.kanban.status_for(Some("DESIGN")), "todo");
        assert_eq!(config.kanban.status_for(Some("BUILD")), "backlog");
        assert_eq!(config.kanban.status_for(None), "backlog");
    }

    #[test]
    fn explicit_missing_path_is_an_error() {
        let result = Config::resolve(Some(Path::new("/nonexistent/template-apply.yaml")));
        assert!(result.is_err());
    }
}
