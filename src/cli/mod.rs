//! CLI command definitions for template-apply
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

pub mod apply;
pub mod catalog;
pub mod project;

use apply::{ApplyArgs, LogsArgs, PreviewArgs};
use catalog::CatalogCommand;
use clap::{Parser, Subcommand, ValueEnum};
use project::ProjectCommand;

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum FormatArg {
    #[default]
    Json,
    Markdown,
}

/// Template set materializer
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Path to database file (overrides config)
    #[arg(short, long, global = true)]
    pub database: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = FormatArg::Json, global = true)]
    pub format: FormatArg,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage template catalogs
    #[command(subcommand)]
    Catalog(CatalogCommand),

    /// Manage projects and their members
    #[command(subcommand)]
    Project(ProjectCommand),

    /// Show what applying a template would create
    Preview(PreviewArgs),

    /// Apply a template set to a project
    Apply(ApplyArgs),

    /// Show the apply history of a project
    Logs(LogsArgs),
}
