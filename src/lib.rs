//! Template Apply Library
//!
//! Materializes template sets (phases, disciplines, tasks, dependencies and
//! presets) into concrete, dependency-ordered project tasks.

pub mod apply;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod format;
pub mod types;
