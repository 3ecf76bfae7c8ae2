/// Undo of logged moves, either one commit at a time or the last N.
///
/// Both modes read the whole log, move files back, and compact the log through
/// [`MoveLog::rewrite`]. Problems with single entries (file gone, original
/// spot taken, garbled line) are reported as outcomes, never as errors.
use crate::error::{FilifyError, Result};
use crate::move_log::{LogLine, LogRecord, MoveLog};
use crate::mover::{ensure_dir, relocate};

/// Result of undoing a single log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryOutcome {
    /// The file is back at its original path.
    Restored(LogRecord),
    /// The moved file is no longer where the log says it is.
    Missing(LogRecord),
    /// The file exists but could not be moved back.
    Failed { record: LogRecord, reason: String },
    /// The log line could not be parsed.
    Malformed(String),
}

impl EntryOutcome {
    pub fn is_restored(&self) -> bool {
        matches!(self, EntryOutcome::Restored(_))
    }
}

/// Result of [`UndoEngine::undo_by_commit_id`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitUndo {
    /// No record carries the id; the log was not touched.
    NotFound(String),
    /// The matching record was processed. The log changed only if the
    /// outcome is `Restored`.
    Entry(EntryOutcome),
}

/// What happens to log lines whose restore did not succeed during a batch
/// undo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetentionPolicy {
    /// Every processed line leaves the log, restored or not.
    #[default]
    DropAll,
    /// Lines that were not restored stay in the log for a later retry.
    KeepFailed,
}

/// Result of [`UndoEngine::undo_last_moves`].
#[derive(Debug, Default)]
pub struct BatchReport {
    /// How many entries were asked for.
    pub requested: usize,
    /// Outcomes, most recent move first.
    pub outcomes: Vec<EntryOutcome>,
    /// Lines left in the log after compaction.
    pub remaining: usize,
}

impl BatchReport {
    /// Entries actually processed; less than `requested` when the log was
    /// shorter.
    pub fn processed(&self) -> usize {
        self.outcomes.len()
    }

    pub fn restored(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_restored()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &EntryOutcome> {
        self.outcomes.iter().filter(|o| !o.is_restored())
    }

    pub fn is_complete_success(&self) -> bool {
        self.failures().next().is_none()
    }
}

/// Reverses moves recorded in a [`MoveLog`].
pub struct UndoEngine<'a> {
    log: &'a mut MoveLog,
}

impl<'a> UndoEngine<'a> {
    pub fn new(log: &'a mut MoveLog) -> Self {
        Self { log }
    }

    /// Undoes the most recent move whose commit id equals `commit_id`.
    ///
    /// The log is searched from the newest line backwards. On success exactly
    /// that line is removed; in every other case the log file stays
    /// byte-identical.
    ///
    /// # Errors
    ///
    /// Only reading or rewriting the log itself can fail.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use filify::move_log::MoveLog;
    /// use filify::undo::{CommitUndo, UndoEngine};
    ///
    /// let mut log = MoveLog::open("filify.log")?;
    /// match UndoEngine::new(&mut log).undo_by_commit_id("3f9a1c0b")? {
    ///     CommitUndo::NotFound(id) => println!("no commit {}", id),
    ///     CommitUndo::Entry(outcome) => println!("{:?}", outcome),
    /// }
    /// # Ok::<(), filify::FilifyError>(())
    /// ```
    pub fn undo_by_commit_id(&mut self, commit_id: &str) -> Result<CommitUndo> {
        let mut lines = self.log.read()?;

        let found = lines.iter().enumerate().rev().find_map(|(index, line)| {
            line.record()
                .filter(|record| record.commit_id == commit_id)
                .map(|record| (index, record.clone()))
        });
        let Some((index, record)) = found else {
            tracing::debug!(commit_id, "commit not found in move log");
            return Ok(CommitUndo::NotFound(commit_id.to_string()));
        };

        let outcome = restore(record);
        if outcome.is_restored() {
            lines.remove(index);
            self.log.rewrite(&lines)?;
        }
        Ok(CommitUndo::Entry(outcome))
    }

    /// Undoes the last `n` logged moves, newest first.
    ///
    /// `n` is clamped to the number of entries in the log; blank lines are not
    /// entries and stay where they are. A failed entry does not stop the
    /// batch. Afterwards the processed lines are dropped from the log
    /// according to `policy`.
    ///
    /// # Errors
    ///
    /// Only reading or rewriting the log itself can fail.
    pub fn undo_last_moves(&mut self, n: usize, policy: RetentionPolicy) -> Result<BatchReport> {
        let lines = self.log.read()?;
        let mut report = BatchReport {
            requested: n,
            ..Default::default()
        };

        let entries = lines.iter().filter(|line| !line.is_blank()).count();
        if n == 0 || entries == 0 {
            report.remaining = lines.len();
            return Ok(report);
        }

        let start = lines
            .iter()
            .enumerate()
            .rev()
            .filter(|(_, line)| !line.is_blank())
            .nth(n.min(entries) - 1)
            .map_or(0, |(index, _)| index);

        let mut keep = vec![true; lines.len()];
        for (index, line) in lines.iter().enumerate().skip(start).rev() {
            let outcome = match line {
                LogLine::Record(record) => restore(record.clone()),
                LogLine::Malformed(raw) => EntryOutcome::Malformed(raw.clone()),
                LogLine::Blank(_) => continue,
            };
            keep[index] = !outcome.is_restored() && policy == RetentionPolicy::KeepFailed;
            report.outcomes.push(outcome);
        }

        let remaining: Vec<LogLine> = lines
            .into_iter()
            .zip(keep)
            .filter_map(|(line, keep)| keep.then_some(line))
            .collect();
        report.remaining = remaining.len();
        self.log.rewrite(&remaining)?;

        Ok(report)
    }
}

/// Moves one logged file back to where it came from.
fn restore(record: LogRecord) -> EntryOutcome {
    if !record.new_path.exists() {
        tracing::debug!(commit_id = %record.commit_id, "moved file is missing");
        return EntryOutcome::Missing(record);
    }

    let result = match record.original_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => ensure_dir(parent),
        _ => Ok(()),
    }
    .and_then(|()| relocate(&record.new_path, &record.original_path));

    match result {
        Ok(()) => {
            tracing::debug!(commit_id = %record.commit_id, "restored file");
            EntryOutcome::Restored(record)
        }
        Err(e) => EntryOutcome::Failed {
            reason: failure_reason(&e),
            record,
        },
    }
}

fn failure_reason(error: &FilifyError) -> String {
    match error {
        FilifyError::DestinationExists(path) => {
            format!("original location is occupied: {}", path.display())
        }
        other => other.to_string(),
    }
}
