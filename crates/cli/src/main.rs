mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use dupecull_core::Worklist;
use tracing_subscriber::EnvFilter;

/// Dupecull — photo dedup worklist manager
#[derive(Parser)]
#[command(name = "dupecull", version, about)]
struct Cli {
    /// Path to the worklist CSV
    #[arg(long, short)]
    worklist: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show worklist summary statistics
    Status,
    /// Execute a rule file against the worklist
    Run {
        /// Path to the rule JSON file
        rule: PathBuf,
        /// Show what would change without writing anything
        #[arg(long)]
        dry_run: bool,
        /// Write the result here instead of back to the worklist
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Select records whose field matches a regex
    Select {
        /// Field to match against (e.g. file_path, folder_path, group_number)
        #[arg(long)]
        field: String,
        /// Regex pattern
        #[arg(long)]
        regex: String,
        /// Deselect matches instead of selecting them
        #[arg(long)]
        unselect: bool,
        /// Write the result here instead of back to the worklist
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Show the deletion plan for the current selection
    Plan {
        /// Emit the plan as JSON
        #[arg(long)]
        json: bool,
    },
    /// Export the worklist to a new CSV
    Export {
        /// Destination path
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut worklist = Worklist::from_csv(&cli.worklist)?;

    match cli.command {
        Commands::Status => commands::status::run(&worklist)?,
        Commands::Run {
            rule,
            dry_run,
            output,
        } => {
            let target = output.unwrap_or_else(|| cli.worklist.clone());
            commands::run::run(&mut worklist, &rule, dry_run, &target)?
        }
        Commands::Select {
            field,
            regex,
            unselect,
            output,
        } => {
            let target = output.unwrap_or_else(|| cli.worklist.clone());
            commands::select::run(&mut worklist, &field, &regex, !unselect, &target)?
        }
        Commands::Plan { json } => commands::plan::run(&worklist, json)?,
        Commands::Export { output } => commands::export::run(&worklist, &output)?,
    }

    Ok(())
}
