//! template-apply
//!
//! Command-line front end for the template apply service: import template
//! catalogs, manage projects, preview and apply template sets.

use anyhow::Result;
use clap::Parser;
use std::fs::OpenOptions;
use std::path::Path;
use template_apply::apply::TemplateApplier;
use template_apply::catalog::CatalogFile;
use template_apply::cli::apply::{ApplyArgs, LogsArgs, PreviewArgs};
use template_apply::cli::catalog::CatalogCommand;
use template_apply::cli::project::ProjectCommand;
use template_apply::cli::{Cli, Command, FormatArg};
use template_apply::config::Config;
use template_apply::db::Database;
use template_apply::error::ApplyError;
use template_apply::format::{self, OutputFormat};
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on --log option
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    match cli.log.as_str() {
        "0" | "off" => {
            // No logging
        }
        "1" | "stdout" => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(std::io::stdout)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        "2" | "stderr" => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        filename => {
            // Log to file (append mode)
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(filename)?;
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(file)
                .with_ansi(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }

    let mut config = Config::resolve(cli.config.as_deref().map(Path::new))?;
    if let Some(db_path) = &cli.database {
        config.server.db_path = db_path.into();
    }

    let output = match cli.format {
        FormatArg::Json => OutputFormat::Json,
        FormatArg::Markdown => OutputFormat::Markdown,
    };

    match cli.command {
        Command::Catalog(command) => run_catalog(&config, command, output),
        Command::Project(command) => run_project(&config, command, output),
        Command::Preview(args) => run_preview(&config, args, output),
        Command::Apply(args) => run_apply(&config, args, output),
        Command::Logs(args) => run_logs(&config, args, output),
    }
}

fn open_database(config: &Config) -> Result<Database> {
    config.ensure_db_dir()?;
    info!(path = %config.server.db_path.display(), "Opening database");
    Database::open(&config.server.db_path)
}

fn print<T: serde::Serialize>(
    output: OutputFormat,
    value: &T,
    markdown: impl FnOnce(&T) -> String,
) -> Result<()> {
    match output {
        OutputFormat::Json => println!("{}", format::to_json(value)?),
        OutputFormat::Markdown => print!("{}", markdown(value)),
    }
    Ok(())
}

/// Emit the structured error on stderr so callers can branch on its code.
fn report_failure(err: ApplyError) -> anyhow::Error {
    if let Ok(json) = format::to_json(&err) {
        eprintln!("{}", json);
    }
    anyhow::Error::new(err)
}

fn run_catalog(config: &Config, command: CatalogCommand, output: OutputFormat) -> Result<()> {
    match command {
        CatalogCommand::Import { file, dry_run } => {
            let catalog = CatalogFile::from_file(&file)?;
            catalog.validate()?;
            if dry_run {
                info!(file = %file.display(), sets = catalog.sets.len(), "Catalog is valid");
                return Ok(());
            }

            let db = open_database(config)?;
            let stats = db.import_catalog(&catalog)?;
            info!(
                file = %file.display(),
                sets = stats.sets,
                tasks = stats.tasks,
                "Catalog imported"
            );
            print(output, &stats, format::format_import_markdown)
        }
        CatalogCommand::List { tenant } => {
            let db = open_database(config)?;
            let sets = db.list_template_sets(tenant)?;
            print(output, &sets, |s| format::format_sets_markdown(s))
        }
    }
}

fn run_project(config: &Config, command: ProjectCommand, output: OutputFormat) -> Result<()> {
    let db = open_database(config)?;
    match command {
        ProjectCommand::Create {
            tenant,
            name,
            start_date,
        } => {
            let project = db.create_project(tenant, &name, start_date)?;
            info!(project_id = project.id, tenant_id = tenant, "Project created");
            print(output, &project, |p| {
                format!("Created project `{}` **{}**\n", p.id, p.name)
            })
        }
        ProjectCommand::Assign {
            tenant,
            project,
            user,
            role,
        } => {
            let member = db.add_project_member(tenant, project, user, &role)?;
            print(output, &member, |m| {
                format!(
                    "Assigned user {} to project {} as {}\n",
                    m.user_id, m.project_id, m.role
                )
            })
        }
        ProjectCommand::Tasks { tenant, project } => {
            let tasks = db.list_project_tasks(tenant, project)?;
            print(output, &tasks, |t| format::format_tasks_markdown(t))
        }
    }
}

fn run_preview(config: &Config, args: PreviewArgs, output: OutputFormat) -> Result<()> {
    let applier = TemplateApplier::new(open_database(config)?, config);
    let preview = applier
        .preview(&args.selection.to_selection())
        .map_err(report_failure)?;
    print(output, &preview, format::format_preview_markdown)
}

fn run_apply(config: &Config, args: ApplyArgs, output: OutputFormat) -> Result<()> {
    let applier = TemplateApplier::new(open_database(config)?, config);
    let report = applier
        .apply(&args.to_request())
        .map_err(report_failure)?;
    print(output, &report, format::format_report_markdown)
}

fn run_logs(config: &Config, args: LogsArgs, output: OutputFormat) -> Result<()> {
    let db = open_database(config)?;
    let logs = db.list_apply_logs(args.tenant, args.project, args.limit)?;
    print(output, &logs, |l| format::format_logs_markdown(l))
}
