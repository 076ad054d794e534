//! `wrt` – with-respect-to command line interface.
//!
//! Each invocation:
//!
//! 1. Loads `~/.wrt/config.toml` (defaults when absent) and `WRT_*`
//!    environment overrides.
//! 2. Parses one request, either as a chained expression
//!    (`In('w').Get('f').Wrt('r').Ei('e')`) or as `--In/--Get/--Set/--Wrt/--Ei/--As`
//!    flags.
//! 3. Loads the world from the SQLite database, applies the request, saves the
//!    world back after a `Set`, and prints the 4x4 pose after a `Get`.
//!
//! Exit code 0 on success, 1 on any error.

mod args;
mod config;
mod error;
mod expr;
mod matrix;
mod render;

use std::fs;
use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;
use serde_json::json;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use wrt_graph::{Outcome, SetOptions, execute, load_or_new};
use wrt_store::SqliteWorldStore;

use args::{Action, Cli};
use config::Config;
use error::CliError;

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() { ExitCode::FAILURE } else { ExitCode::SUCCESS };
        }
    };

    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Structured logging
// ─────────────────────────────────────────────────────────────────────────────

/// RUST_LOG wins; otherwise `-v` raises the level from `warn`.  Logs go to
/// stderr so stdout only carries results.  `WRT_LOG_FORMAT=json` emits
/// newline-delimited JSON.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if std::env::var("WRT_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .compact()
            .init();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Dispatch
// ─────────────────────────────────────────────────────────────────────────────

fn run(cli: &Cli) -> Result<(), CliError> {
    let mut cfg = config::load().map_err(CliError::Config)?;
    if let Some(db) = &cli.db {
        cfg.database = db.clone();
    }
    debug!(database = %cfg.database.display(), root = %cfg.root_frame, "configuration loaded");

    match cli.action(cfg.tolerance)? {
        Action::InitConfig => init_config(&cfg),
        Action::Worlds => {
            let store = open_store(&cfg)?;
            let summaries = store.list_worlds()?;
            if cli.json {
                println!("{}", render::worlds_json(&summaries)?);
            } else {
                print!("{}", render::worlds(&summaries));
            }
            Ok(())
        }
        Action::Tree { world } => {
            let store = open_store(&cfg)?;
            let graph = load_or_new(&store, &world, &cfg.root_frame)?;
            print!("{}", render::tree(&graph, cfg.precision));
            Ok(())
        }
        Action::Query { world, request } => {
            let mut store = open_store(&cfg)?;
            let options = SetOptions {
                create_missing_reference: cfg.create_missing_reference,
            };
            match execute(&mut store, &world, &cfg.root_frame, &request, &options)? {
                Outcome::Pose(pose) if cli.json => {
                    let body = json!({
                        "world": world,
                        "subject": request.subject(),
                        "wrt": request.reference(),
                        "ei": request.expressed_in(),
                        "matrix": pose,
                    });
                    println!("{}", serde_json::to_string_pretty(&body)?);
                }
                Outcome::Pose(pose) => println!("{}", matrix::format_pose(&pose, cfg.precision)),
                Outcome::Updated { detached: Some(frame) } => {
                    eprintln!(
                        "{} '{}' was moved under the previous parent of '{}' to keep the tree acyclic",
                        "note:".yellow().bold(),
                        frame,
                        request.subject()
                    );
                }
                Outcome::Updated { detached: None } => {}
            }
            Ok(())
        }
    }
}

fn open_store(cfg: &Config) -> Result<SqliteWorldStore, CliError> {
    if let Some(parent) = cfg.database.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    Ok(SqliteWorldStore::open(&cfg.database)?.with_tolerance(cfg.tolerance))
}

fn init_config(cfg: &Config) -> Result<(), CliError> {
    let path = config::config_path();
    if path.exists() {
        println!("Config already exists at {}", path.display().to_string().bold());
        return Ok(());
    }
    config::save(cfg).map_err(CliError::Config)?;
    println!("{} Config saved to {}", "✓".green().bold(), path.display().to_string().bold());
    Ok(())
}
