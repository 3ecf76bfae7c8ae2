//! Terminal output.
//!
//! Everything the user reads goes through [`OutputFormatter`], so styling is
//! decided in one place. Diagnostics go through `tracing` instead.

use crate::undo::EntryOutcome;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;

/// Styled console output for filify.
pub struct OutputFormatter;

impl OutputFormatter {
    /// Green line with a check mark.
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Red line with a cross, on stderr.
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Yellow line with a warning sign.
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    pub fn plain(message: &str) {
        println!("{}", message);
    }

    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    pub fn dry_run_notice(message: &str) {
        println!("{}", format!("[DRY RUN] {}", message).yellow());
    }

    /// Progress bar for a categorization pass over `total` files.
    pub fn create_progress_bar(total: u64) -> ProgressBar {
        let style = ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░");
        let pb = ProgressBar::new(total);
        pb.set_style(style);
        pb
    }

    /// Files per destination folder, with a total row.
    ///
    /// ```no_run
    /// use filify::output::OutputFormatter;
    /// use std::collections::BTreeMap;
    ///
    /// let mut counts = BTreeMap::new();
    /// counts.insert("Images".to_string(), 8);
    /// counts.insert("Unsorted".to_string(), 2);
    /// OutputFormatter::summary_table(&counts, 10);
    /// ```
    pub fn summary_table(folder_counts: &BTreeMap<String, usize>, total_files: usize) {
        Self::header("SUMMARY");

        let width = folder_counts
            .keys()
            .map(|name| name.len())
            .max()
            .unwrap_or(0)
            .max("Folder".len());

        println!("{:<width$} | {}", "Folder".bold(), "Files".bold(), width = width);
        println!("{}", "-".repeat(width + 10));
        for (folder, count) in folder_counts {
            println!(
                "{:<width$} | {} {}",
                folder,
                count.to_string().green(),
                plural(*count),
                width = width
            );
        }
        println!("{}", "-".repeat(width + 10));
        println!(
            "{:<width$} | {} {}",
            "Total".bold(),
            total_files.to_string().green().bold(),
            plural(total_files),
            width = width
        );
    }

    /// One line per undo outcome.
    pub fn undo_outcome(outcome: &EntryOutcome) {
        match outcome {
            EntryOutcome::Restored(record) => Self::success(&format!(
                "Restored: {} -> {} (commit {})",
                record.new_path.display(),
                record.original_path.display(),
                record.commit_id
            )),
            EntryOutcome::Missing(record) => Self::error(&format!(
                "Missing: {} (cannot restore, commit {})",
                record.new_path.display(),
                record.commit_id
            )),
            EntryOutcome::Failed { record, reason } => Self::error(&format!(
                "Failed: commit {}: {}",
                record.commit_id, reason
            )),
            EntryOutcome::Malformed(line) => {
                Self::error(&format!("Skipped malformed log line: {}", line))
            }
        }
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 { "file" } else { "files" }
}
