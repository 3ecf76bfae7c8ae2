//! Command-line interface for filify.
//!
//! Handles:
//! - Argument parsing
//! - Startup checks (configuration, target directory)
//! - Categorization, with an optional dry run
//! - Undo by count and by commit id
//! - Reporting results through [`OutputFormatter`]

use crate::categorizer::{Categorizer, list_files};
use crate::config::Config;
use crate::error::{FilifyError, Result};
use crate::move_log::MoveLog;
use crate::mover::Mover;
use crate::output::OutputFormatter;
use crate::undo::{BatchReport, CommitUndo, RetentionPolicy, UndoEngine};
use clap::{ArgAction, Parser};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// filify - sort a directory into category folders, with undo
///
/// Without options, moves every file of the configured directory into the
/// folder of its category. Each move is written to a log and gets a commit
/// id, which `--undo` and `--undo_commit` use to put files back.
#[derive(Parser, Debug, Clone)]
#[command(name = "filify")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Undo the last N moves, most recent first
    #[arg(long, value_name = "N", conflicts_with = "undo_commit")]
    pub undo: Option<usize>,

    /// Undo the move with this commit id
    #[arg(long = "undo_commit", visible_alias = "undo-commit", value_name = "ID")]
    pub undo_commit: Option<String>,

    /// Configuration file (JSON, or TOML with a .toml extension)
    ///
    /// Defaults to config.json, then .filifyrc.toml in the current directory,
    /// then ~/.config/filify/config.toml.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Move log to use instead of the configured one
    #[arg(long, value_name = "PATH")]
    pub log: Option<PathBuf>,

    /// Show where files would go without moving anything
    #[arg(short = 'n', long = "dry-run", action = ArgAction::SetTrue,
          conflicts_with_all = ["undo", "undo_commit"])]
    pub dry_run: bool,

    /// With --undo, keep entries that could not be restored in the log
    #[arg(long = "keep-failed", action = ArgAction::SetTrue, requires = "undo")]
    pub keep_failed: bool,
}

/// What a run does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Move files into their category folders.
    Categorize {
        /// If true, only report the plan.
        dry_run: bool,
    },
    /// Undo the last `count` moves.
    UndoLast {
        count: usize,
        policy: RetentionPolicy,
    },
    /// Undo one move by commit id.
    UndoCommit { commit_id: String },
}

impl Args {
    pub fn command(&self) -> Command {
        if let Some(count) = self.undo {
            Command::UndoLast {
                count,
                policy: if self.keep_failed {
                    RetentionPolicy::KeepFailed
                } else {
                    RetentionPolicy::DropAll
                },
            }
        } else if let Some(commit_id) = &self.undo_commit {
            Command::UndoCommit {
                commit_id: commit_id.trim().to_string(),
            }
        } else {
            Command::Categorize {
                dry_run: self.dry_run,
            }
        }
    }
}

/// Loads the configuration, checks the target directory, then runs the
/// command the arguments ask for.
///
/// # Errors
///
/// Any error returned here is fatal: the binary prints it and exits with
/// status 1.
pub fn run(args: &Args) -> Result<()> {
    let mut config = Config::load(args.config.as_deref())?;
    if let Some(log) = &args.log {
        config.log_file = log.clone();
    }

    check_directory(&config.directory)?;
    run_command(&args.command(), &config)
}

/// Runs `command` against an already loaded configuration.
pub fn run_command(command: &Command, config: &Config) -> Result<()> {
    match command {
        Command::Categorize { dry_run: true } => categorize_dry_run(config),
        Command::Categorize { dry_run: false } => categorize_directory(config),
        Command::UndoLast { count, policy } => undo_last(config, *count, *policy),
        Command::UndoCommit { commit_id } => undo_commit(config, commit_id),
    }
}

/// Fails unless `directory` exists and can be listed.
pub fn check_directory(directory: &Path) -> Result<()> {
    fs::read_dir(directory)
        .map(|_| ())
        .map_err(|e| FilifyError::DirectoryUnavailable {
            path: directory.to_path_buf(),
            source: e,
        })
}

fn files_to_categorize(config: &Config) -> Result<Vec<PathBuf>> {
    let filters = config.compile_filters()?;
    let mut reserved = vec![config.log_file.as_path()];
    if let Some(source) = &config.source {
        reserved.push(source.as_path());
    }
    list_files(&config.directory, &filters, &reserved)
}

/// Moves every file of the configured directory into its category folder.
///
/// Folders are created first. The first failed move aborts the pass; the
/// moves before it stay in the log and can be undone.
pub fn categorize_directory(config: &Config) -> Result<()> {
    OutputFormatter::info(&format!(
        "Organizing contents of: {}",
        config.directory.display()
    ));

    let files = files_to_categorize(config)?;
    if files.is_empty() {
        OutputFormatter::plain("No files found to organize.");
    }

    let categorizer = Categorizer::new(config);
    let mut log = MoveLog::open(&config.log_file)?;
    let pb = OutputFormatter::create_progress_bar(files.len() as u64);

    let result = categorizer.categorize(&files, &mut Mover::new(&mut log), |planned, record| {
        pb.suspend(|| {
            OutputFormatter::plain(&format!(
                " - {} → {}/ (commit {})",
                file_label(&planned.file),
                planned.folder,
                record.commit_id
            ))
        });
        pb.inc(1);
    });
    pb.finish_and_clear();
    let report = result?;

    for file in &report.skipped {
        OutputFormatter::warning(&format!(
            "Skipped {}: its name cannot be recorded in the move log.",
            file_label(file)
        ));
    }
    if report.total() > 0 {
        OutputFormatter::summary_table(&report.per_folder, report.total());
    }
    OutputFormatter::success("Organization complete!");
    OutputFormatter::plain(&format!(
        "Moves logged to {}. Use 'filify --undo N' or 'filify --undo_commit ID' to revert.",
        config.log_file.display()
    ));
    Ok(())
}

/// Shows where each file would go. Nothing is moved and the log is not
/// touched.
pub fn categorize_dry_run(config: &Config) -> Result<()> {
    OutputFormatter::dry_run_notice(&format!(
        "Analyzing contents of: {}",
        config.directory.display()
    ));

    let files = files_to_categorize(config)?;
    if files.is_empty() {
        OutputFormatter::plain("No files found to organize.");
        return Ok(());
    }

    let categorizer = Categorizer::new(config);
    let plan = categorizer.plan(&files);
    let mut per_folder: BTreeMap<String, usize> = BTreeMap::new();
    let mut would_move = 0;
    for planned in &plan {
        if !categorizer.is_loggable(planned) {
            OutputFormatter::warning(&format!(
                "Would skip {}: its name cannot be recorded in the move log.",
                file_label(&planned.file)
            ));
            continue;
        }
        would_move += 1;
        OutputFormatter::plain(&format!(
            " - {} → would move to {}/",
            file_label(&planned.file),
            planned.folder
        ));
        *per_folder.entry(planned.folder.clone()).or_insert(0) += 1;
    }

    OutputFormatter::summary_table(&per_folder, would_move);
    OutputFormatter::dry_run_notice("No files were modified.");
    Ok(())
}

fn undo_last(config: &Config, count: usize, policy: RetentionPolicy) -> Result<()> {
    if count == 0 {
        OutputFormatter::warning("Asked to undo 0 moves. Nothing to undo.");
        return Ok(());
    }
    if !config.log_file.exists() {
        OutputFormatter::warning("No log file found. Nothing to undo.");
        return Ok(());
    }

    let mut log = MoveLog::open(&config.log_file)?;
    let report = UndoEngine::new(&mut log).undo_last_moves(count, policy)?;

    if report.processed() == 0 {
        OutputFormatter::warning("Log file is empty. Nothing to undo.");
        return Ok(());
    }
    print_batch_report(&report, policy);
    Ok(())
}

fn print_batch_report(report: &BatchReport, policy: RetentionPolicy) {
    if report.processed() < report.requested {
        OutputFormatter::warning(&format!(
            "Only {} entries in the log; undoing all of them.",
            report.processed()
        ));
    }

    if report.restored() > 0 {
        OutputFormatter::header("Undo Successful:");
        for outcome in report.outcomes.iter().filter(|o| o.is_restored()) {
            OutputFormatter::undo_outcome(outcome);
        }
    }

    if !report.is_complete_success() {
        OutputFormatter::header("Undo Failed:");
        for outcome in report.failures() {
            OutputFormatter::undo_outcome(outcome);
        }
        match policy {
            RetentionPolicy::DropAll => OutputFormatter::warning(
                "Failed entries were removed from the log. Use --keep-failed to keep them.",
            ),
            RetentionPolicy::KeepFailed => {
                OutputFormatter::plain("Failed entries were kept in the log.")
            }
        }
    }

    OutputFormatter::plain(&format!("{} entries left in the log.", report.remaining));
}

fn undo_commit(config: &Config, commit_id: &str) -> Result<()> {
    if !config.log_file.exists() {
        OutputFormatter::warning("No log file found. Nothing to undo.");
        return Ok(());
    }

    let mut log = MoveLog::open(&config.log_file)?;
    match UndoEngine::new(&mut log).undo_by_commit_id(commit_id)? {
        CommitUndo::NotFound(id) => {
            OutputFormatter::warning(&format!("Commit ID {} not found in the log.", id));
        }
        CommitUndo::Entry(outcome) => {
            OutputFormatter::undo_outcome(&outcome);
            if !outcome.is_restored() {
                OutputFormatter::plain("The log was left unchanged.");
            }
        }
    }
    Ok(())
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
