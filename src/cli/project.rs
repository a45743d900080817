//! Project subcommands

use chrono::NaiveDate;
use clap::Subcommand;

#[derive(Subcommand, Debug)]
pub enum ProjectCommand {
    /// Create a project
    Create {
        #[arg(long)]
        tenant: i64,

        #[arg(long)]
        name: String,

        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        start_date: Option<NaiveDate>,
    },

    /// Assign a user to a project with a role
    Assign {
        #[arg(long)]
        tenant: i64,

        #[arg(long)]
        project: i64,

        #[arg(long)]
        user: i64,

        /// Role key, matched against template task roles
        #[arg(long)]
        role: String,
    },

    /// List a project's tasks
    Tasks {
        #[arg(long)]
        tenant: i64,

        #[arg(long)]
        project: i64,
    },
}
