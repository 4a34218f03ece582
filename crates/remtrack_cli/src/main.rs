//! Command-line front end for the rem accuracy tracker.
//!
//! # Responsibility
//! - Bootstrap config, logging and the storage chain exactly once.
//! - Map subcommands onto controller actions and print the outcome.

use clap::{Parser, Subcommand, ValueEnum};
use log::info;
use remtrack_core::{
    init_logging, local_db_path_from_arg, AccuracyStore, ActionResponse, StorageAdapter,
    TrackerConfig, TrackerController, WidgetView,
};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "remtrack")]
#[command(about = "Track correct/incorrect attempts per rem and report accuracy")]
#[command(version)]
struct Args {
    /// Local fallback store (SQLite file), or `:memory:` for a throwaway store.
    /// Defaults to the platform data directory.
    #[arg(long, value_name = "PATH")]
    db: Option<String>,

    /// Host-provided store (JSON file). Skipped when omitted.
    #[arg(long, value_name = "PATH")]
    host_store: Option<PathBuf>,

    /// Absolute directory for rolling log files.
    #[arg(long, value_name = "DIR")]
    log_dir: Option<PathBuf>,

    /// Host query string carrying `remId` or `rem`.
    #[arg(long, value_name = "QUERY")]
    query: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Record one attempt for a rem.
    Record { rem: String, outcome: Outcome },
    /// Delete every attempt recorded for a rem.
    Reset { rem: String },
    /// Print accuracy for one rem, or every rem when omitted.
    Stats { rem: Option<String> },
    /// Write the database as pretty JSON to a file, or stdout when omitted.
    Export { file: Option<PathBuf> },
    /// Merge a previously exported file, replacing colliding rems.
    Import { file: PathBuf },
    /// Print the widget snapshot for the current rem.
    View,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Outcome {
    Correct,
    Incorrect,
}

fn main() -> ExitCode {
    match run(Args::parse()) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<bool, Box<dyn Error>> {
    let config = build_config(&args)?;
    if let Some(log_dir) = &config.log_dir {
        init_logging(&config.log_level, &log_dir.to_string_lossy())?;
    }
    info!(
        "event=cli_start module=cli status=ok host_store={} local_file={}",
        config.host_store_path.is_some(),
        config.local_db_path.is_some()
    );

    let store = AccuracyStore::open(StorageAdapter::from_config(&config));
    let mut controller = TrackerController::new(store, args.query.as_deref());

    let ok = match args.command {
        Command::Record { rem, outcome } => {
            let selected = controller.set_current_rem(&rem);
            if !selected.ok {
                return Ok(report(&selected));
            }
            let response = match outcome {
                Outcome::Correct => controller.mark_correct(),
                Outcome::Incorrect => controller.mark_incorrect(),
            };
            report(&response) && report_persistence(&controller)
        }
        Command::Reset { rem } => {
            let selected = controller.set_current_rem(&rem);
            if !selected.ok {
                return Ok(report(&selected));
            }
            report(&controller.reset_current()) && report_persistence(&controller)
        }
        Command::Stats { rem } => {
            print_stats(&controller, rem.as_deref());
            true
        }
        Command::Export { file } => match controller.export_file() {
            Some(export) => {
                match file {
                    Some(path) => {
                        std::fs::write(&path, &export.contents)?;
                        println!("wrote {} ({})", path.display(), export.mime_type);
                    }
                    None => println!("{}", export.as_text()),
                }
                true
            }
            None => {
                print_view(&controller.view());
                false
            }
        },
        Command::Import { file } => {
            let text = std::fs::read_to_string(&file)?;
            report(&controller.import_text(&text)) && report_persistence(&controller)
        }
        Command::View => {
            print_view(&controller.view());
            true
        }
    };
    Ok(ok)
}

fn build_config(args: &Args) -> Result<TrackerConfig, Box<dyn Error>> {
    let mut config = TrackerConfig::from_env()?;
    if let Some(db) = &args.db {
        config.local_db_path = local_db_path_from_arg(db);
    }
    if let Some(host_store) = &args.host_store {
        config.host_store_path = Some(host_store.clone());
    }
    if let Some(log_dir) = &args.log_dir {
        config.log_dir = Some(log_dir.clone());
    }
    config.validate()?;
    Ok(config)
}

fn report(response: &ActionResponse) -> bool {
    if response.ok {
        println!("{}", response.message);
    } else {
        eprintln!("{}", response.message);
    }
    response.ok
}

/// Warns when the last write did not reach a durable backend.
fn report_persistence(controller: &TrackerController) -> bool {
    let status = controller.store().last_persist_status();
    if !status.is_persisted() {
        eprintln!("warning: changes are not durable ({status})");
    }
    true
}

fn print_stats(controller: &TrackerController, rem: Option<&str>) {
    let store = controller.store();
    match rem {
        Some(rem_id) => {
            let summary = store.rem_summary(rem_id);
            println!(
                "{rem_id}: {}% ({}/{})",
                summary.accuracy, summary.correct, summary.attempts
            );
        }
        None => {
            for (rem_id, record) in store.database().iter() {
                println!(
                    "{rem_id}: {}% ({}/{})",
                    record.accuracy(),
                    record.correct_count(),
                    record.attempts.len()
                );
            }
            let overall = store.overall_summary();
            println!(
                "overall: {}% ({}/{})",
                overall.accuracy, overall.correct, overall.attempts
            );
        }
    }
}

fn print_view(view: &WidgetView) {
    println!("rem: {}", view.current_rem.as_deref().unwrap_or("(none)"));
    if let Some(rem) = view.rem {
        println!("rem accuracy: {}% over {} attempts", rem.accuracy, rem.attempts);
    }
    println!(
        "overall accuracy: {}% over {} attempts in {} rems",
        view.overall.accuracy, view.overall.attempts, view.tracked_rems
    );
    println!("storage: {}", view.persistence);
    if let Some(message) = &view.last_message {
        println!("{message}");
    }
}
