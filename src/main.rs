//! engage - ETL utilities for student-engagement data

mod commands;

use clap::{Parser, Subcommand};
use engagement_etl::config::{self, EtlConfig};
use engagement_etl::output::{OutputMode, emit_error};
use engagement_etl::ui;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "engage")]
#[command(version)]
#[command(about = "Generate, export and quality-check student-engagement data in SQLite")]
#[command(long_about = r#"
engage manages one SQLite record store of student-engagement data:
  • Generate a seeded synthetic dataset and its per-term rollup
  • Export tables and analytic extracts to CSV
  • Check tables for duplicate rows, missing values and broken references
  • Probe the store and list its tables

Example usage:
  engage init
  engage generate --students 200 --seed 7
  engage check
  engage export --table students
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print machine-readable JSON instead of human output
    #[arg(long, global = true)]
    json: bool,

    /// Config file (defaults to ./engage.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Database file, overriding the config
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default engage.toml
    Init {
        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },

    /// Generate synthetic data, replacing the current tables
    Generate {
        /// Number of students
        #[arg(short, long)]
        students: Option<usize>,

        /// RNG seed
        #[arg(long)]
        seed: Option<u64>,

        /// First intake year
        #[arg(long)]
        year_start: Option<i32>,

        /// Last academic year
        #[arg(long)]
        year_end: Option<i32>,
    },

    /// Export tables and analytic extracts to CSV
    Export {
        /// Export only this table
        #[arg(short, long)]
        table: Option<String>,

        /// Output directory
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Skip the analytic extracts and preview
        #[arg(long)]
        no_queries: bool,
    },

    /// Check tables for duplicates, missing values and anomalies
    Check {
        /// Check only this table
        #[arg(short, long)]
        table: Option<String>,

        /// Required columns (with --table); defaults to the catalog's
        #[arg(short, long, value_delimiter = ',', requires = "table")]
        required: Vec<String>,

        /// Markdown report path
        #[arg(long)]
        report: Option<PathBuf>,

        /// Maximum sample identifiers per finding
        #[arg(long)]
        samples: Option<usize>,
    },

    /// Check that the database can be opened and queried
    Probe,

    /// List tables with row counts
    Tables {
        /// Show the first rows of this table
        #[arg(short, long)]
        sample: Option<String>,

        /// Number of sample rows
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Init { .. } => "init",
            Commands::Generate { .. } => "generate",
            Commands::Export { .. } => "export",
            Commands::Check { .. } => "check",
            Commands::Probe => "probe",
            Commands::Tables { .. } => "tables",
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging; stdout stays reserved for command output
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();

    let mode = OutputMode::from_flag(cli.json);
    let command = cli.command.name();

    match run(cli, mode) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if mode.is_human() {
                ui::error(&format!("{:#}", err));
            } else if let Err(emit) = emit_error(mode, command, &err) {
                eprintln!("{:#}", emit);
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli, mode: OutputMode) -> anyhow::Result<()> {
    if let Commands::Init { force } = cli.command {
        let path = cli.config.unwrap_or_else(config::default_config_path);
        return commands::run_init(&path, force, mode);
    }

    let mut config: EtlConfig = config::load_config(cli.config.as_deref())?.unwrap_or_default();
    if let Some(database) = cli.database {
        config.database = database;
    }

    match cli.command {
        Commands::Init { .. } => Ok(()),
        Commands::Generate {
            students,
            seed,
            year_start,
            year_end,
        } => {
            let generator = &mut config.generator;
            if let Some(students) = students {
                generator.students = students;
            }
            if let Some(seed) = seed {
                generator.seed = seed;
            }
            if let Some(year) = year_start {
                generator.year_start = year;
            }
            if let Some(year) = year_end {
                generator.year_end = year;
            }
            commands::run_generate(&config, mode)
        }
        Commands::Export { table, out, no_queries } => {
            if let Some(out) = out {
                config.export_dir = out;
            }
            commands::run_export(&config, table.as_deref(), !no_queries, mode)
        }
        Commands::Check {
            table,
            required,
            report,
            samples,
        } => {
            if let Some(report) = report {
                config.report_path = report;
            }
            if let Some(samples) = samples {
                config.sample_limit = samples;
            }
            commands::run_check(&config, table.as_deref(), &required, mode)
        }
        Commands::Probe => commands::run_probe(&config, mode),
        Commands::Tables { sample, limit } => commands::run_tables(&config, sample.as_deref(), limit, mode),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_required_columns_need_a_table() {
        assert!(Cli::try_parse_from(["engage", "check", "--required", "score"]).is_err());
        assert!(Cli::try_parse_from(["engage", "check", "--table", "assessments", "--required", "score"]).is_ok());
        assert!(Cli::try_parse_from(["engage", "check"]).is_ok());
    }
}
