//! Catalog subcommands

use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand, Debug)]
pub enum CatalogCommand {
    /// Import template sets from a YAML or JSON catalog file
    Import {
        /// Catalog file (.yaml, .yml or .json)
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Validate the file without writing to the database
        #[arg(long)]
        dry_run: bool,
    },

    /// List the template sets a tenant can apply
    List {
        #[arg(long)]
        tenant: i64,
    },
}
