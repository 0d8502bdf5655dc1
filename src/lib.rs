//! seamm-datastore: bootstrap and directory import for the SEAMM job datastore.
//!
//! A datastore is a SQLite database plus a `projects/` tree on disk. Jobs are
//! computed into that tree by the job runner and are only visible to the rest
//! of the system once they have a row in the database. This crate does two
//! things:
//!
//! - **Bootstrap** ([`plugins::bootstrap`]): seed an empty database with roles,
//!   the `admin` account, an account mirroring the invoking host user, and a
//!   default project.
//! - **Import** ([`plugins::import`]): walk the `projects/` tree and register
//!   every project folder and every job folder (one containing
//!   `job_data.json`) that the database does not know about yet. Safe to re-run.
//!
//! # Examples
//!
//! ```bash
//! # Seed a fresh datastore under ~/SEAMM_DATASTORE
//! seamm-datastore init
//!
//! # Pick up jobs computed since the last import
//! seamm-datastore import
//!
//! # Import a tree somewhere else, machine-readable output
//! seamm-datastore import /scratch/projects --format json
//! ```
//!
//! # Crate Structure
//!
//! - [`core`]: schema, connection handling, the datastore API, manifest and
//!   job-data parsing, identity resolution, configuration
//! - [`plugins`]: the bootstrap and import operations built on top of `core`

pub mod core;
pub mod plugins;

pub use crate::core::error;

use clap::{Parser, Subcommand};
use crate::core::{api, config, identity, output, time};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(
    name = "seamm-datastore",
    version = env!("CARGO_PKG_VERSION"),
    about = "Initialize the SEAMM datastore and import jobs from disk"
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
    /// Config file (defaults to ~/.seamm/datastore.toml when present).
    #[clap(long, global = true)]
    config: Option<PathBuf>,
    /// Datastore root holding seamm.db and projects/.
    #[clap(long, global = true)]
    root: Option<PathBuf>,
    /// SQLite database file, overriding <root>/seamm.db.
    #[clap(long, global = true)]
    db: Option<PathBuf>,
    /// Projects directory, overriding <root>/projects.
    #[clap(long, global = true)]
    projects_dir: Option<PathBuf>,
    /// Debug-level logging.
    #[clap(short, long, global = true)]
    verbose: bool,
    /// Errors only.
    #[clap(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Seed an empty datastore with roles, users and a default project
    Init {
        /// Name of the default project.
        #[clap(long)]
        default_project: Option<String>,
        /// Output format: 'text' or 'json'.
        #[clap(long, default_value = "text")]
        format: String,
    },
    /// Register projects and jobs found on disk that are not in the database
    Import {
        /// Directory whose subdirectories are projects (defaults to the configured projects dir).
        location: Option<PathBuf>,
        /// Output format: 'text' or 'json'.
        #[clap(long, default_value = "text")]
        format: String,
    },
    /// List registered projects
    Projects {
        #[clap(long, default_value = "text")]
        format: String,
    },
    /// List registered jobs
    Jobs {
        /// Only jobs of this project.
        #[clap(long)]
        project: Option<String>,
        #[clap(long, default_value = "text")]
        format: String,
    },
    /// Print version
    Version,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Text,
    Json,
}

fn parse_format(s: &str) -> Result<Format, error::DatastoreError> {
    match s {
        "text" => Ok(Format::Text),
        "json" => Ok(Format::Json),
        other => Err(error::DatastoreError::ValidationError(format!(
            "unknown format '{}': expected 'text' or 'json'",
            other
        ))),
    }
}

pub fn run() -> Result<(), error::DatastoreError> {
    let cli = Cli::parse();
    init_tracing(cli.quiet, cli.verbose)?;

    if let Command::Version = cli.command {
        println!("v{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let overrides = config::ConfigOverrides {
        config_path: cli.config,
        root: cli.root,
        database: cli.db,
        projects_dir: cli.projects_dir,
        default_project: match &cli.command {
            Command::Init {
                default_project, ..
            } => default_project.clone(),
            _ => None,
        },
    };
    let cfg = config::load(&overrides)?;
    tracing::debug!(
        db = %cfg.store.db_path.display(),
        projects = %cfg.store.projects_dir.display(),
        "resolved datastore"
    );
    let conn = cfg.store.open()?;
    let resolver = identity::default_resolver();

    match cli.command {
        Command::Init { format, .. } => {
            let format = parse_format(&format)?;
            let project_path = cfg.store.project_path(&cfg.default_project);
            let summary = plugins::bootstrap::initialize(
                &conn,
                &cfg.default_project,
                &project_path,
                resolver.as_ref(),
            )?;
            match format {
                Format::Text => println!("{}", output::render_bootstrap(&summary)),
                Format::Json => emit_json("init", serde_json::to_value(&summary)?)?,
            }
        }
        Command::Import { location, format } => {
            let format = parse_format(&format)?;
            let location = location.unwrap_or_else(|| cfg.store.projects_dir.clone());
            let report = plugins::import::import_datastore(&conn, &location, resolver.as_ref())?;
            match format {
                Format::Text => print!("{}", output::render_import(&report)),
                Format::Json => emit_json("import", serde_json::to_value(&report)?)?,
            }
        }
        Command::Projects { format } => {
            let projects = api::list_projects(&conn)?;
            match parse_format(&format)? {
                Format::Text => print!("{}", output::render_projects(&projects)),
                Format::Json => {
                    emit_json("projects", serde_json::json!({ "projects": projects }))?
                }
            }
        }
        Command::Jobs { project, format } => {
            let jobs = api::list_jobs(&conn, project.as_deref())?;
            match parse_format(&format)? {
                Format::Text => print!("{}", output::render_jobs(&jobs)),
                Format::Json => emit_json("jobs", serde_json::json!({ "jobs": jobs }))?,
            }
        }
        Command::Version => {}
    }
    Ok(())
}

fn emit_json(cmd: &str, body: serde_json::Value) -> Result<(), error::DatastoreError> {
    let envelope = time::Envelope::ok(cmd, body);
    println!("{}", serde_json::to_string_pretty(&envelope)?);
    Ok(())
}

fn init_tracing(quiet: bool, verbose: bool) -> Result<(), error::DatastoreError> {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };

    let filter = tracing_subscriber::EnvFilter::try_from_env("SEAMM_DATASTORE_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| {
            error::DatastoreError::ConfigError(format!(
                "failed to initialize tracing subscriber: {e}"
            ))
        })
}
