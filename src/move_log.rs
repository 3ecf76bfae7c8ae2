//! The move log: an append-only text ledger of completed file moves.
//!
//! Each line records one move:
//!
//! ```text
//! 2024-05-01 14:03:22 | 3f9a1c0b | /home/me/Downloads/a.jpg -> /home/me/Downloads/Images/a.jpg
//! ```
//!
//! New records are only ever appended. Removing records (after an undo) goes
//! through [`MoveLog::rewrite`], which replaces the whole file at once.

use crate::error::{FilifyError, Result};
use chrono::{Local, NaiveDateTime, Timelike};
use std::collections::HashSet;
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Separates timestamp, commit id and the move entry.
pub const FIELD_DELIMITER: &str = " | ";

/// Separates the original path from the new path.
pub const PATH_DELIMITER: &str = " -> ";

/// `chrono` format of the timestamp field.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Length of a commit id.
pub const COMMIT_ID_LEN: usize = 8;

/// One completed move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub timestamp: NaiveDateTime,
    pub commit_id: String,
    pub original_path: PathBuf,
    pub new_path: PathBuf,
}

impl LogRecord {
    /// Whether `path` can be written into a log line and read back unchanged.
    pub fn is_representable(path: &Path) -> bool {
        match path.to_str() {
            Some(s) => {
                !s.is_empty()
                    && !s.contains('\n')
                    && !s.contains('\r')
                    && !s.contains(FIELD_DELIMITER)
                    && !s.contains(PATH_DELIMITER)
            }
            None => false,
        }
    }
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}{}{}{}{}",
            self.timestamp.format(TIMESTAMP_FORMAT),
            FIELD_DELIMITER,
            self.commit_id,
            FIELD_DELIMITER,
            self.original_path.display(),
            PATH_DELIMITER,
            self.new_path.display()
        )
    }
}

/// Why a log line could not be read as a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseRecordError(pub String);

impl fmt::Display for ParseRecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ParseRecordError {}

impl FromStr for LogRecord {
    type Err = ParseRecordError;

    fn from_str(line: &str) -> std::result::Result<Self, Self::Err> {
        let fields: Vec<&str> = line.split(FIELD_DELIMITER).collect();
        let [timestamp, commit_id, entry] = fields.as_slice() else {
            return Err(ParseRecordError(format!(
                "expected 3 fields, found {}",
                fields.len()
            )));
        };

        let timestamp = NaiveDateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT)
            .map_err(|e| ParseRecordError(format!("bad timestamp '{}': {}", timestamp, e)))?;

        if commit_id.is_empty() || commit_id.contains(char::is_whitespace) {
            return Err(ParseRecordError(format!("bad commit id '{}'", commit_id)));
        }

        let paths: Vec<&str> = entry.split(PATH_DELIMITER).collect();
        let [original, new] = paths.as_slice() else {
            return Err(ParseRecordError(format!(
                "expected 'ORIGINAL{}NEW', found '{}'",
                PATH_DELIMITER, entry
            )));
        };
        if original.is_empty() || new.is_empty() {
            return Err(ParseRecordError("empty path".to_string()));
        }

        Ok(LogRecord {
            timestamp,
            commit_id: commit_id.to_string(),
            original_path: PathBuf::from(*original),
            new_path: PathBuf::from(*new),
        })
    }
}

/// A line read back from the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogLine {
    Record(LogRecord),
    /// Kept verbatim so a rewrite does not lose it.
    Malformed(String),
    /// Empty or whitespace-only line, kept verbatim. Not an entry.
    Blank(String),
}

impl LogLine {
    /// Reads one line without its `\n`. A trailing `\r` is ignored when
    /// parsing but kept in the raw text of non-record lines.
    pub fn parse(line: &str) -> Self {
        if line.trim().is_empty() {
            return LogLine::Blank(line.to_string());
        }
        match line.strip_suffix('\r').unwrap_or(line).parse::<LogRecord>() {
            Ok(record) => LogLine::Record(record),
            Err(_) => LogLine::Malformed(line.to_string()),
        }
    }

    pub fn record(&self) -> Option<&LogRecord> {
        match self {
            LogLine::Record(record) => Some(record),
            LogLine::Malformed(_) | LogLine::Blank(_) => None,
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, LogLine::Blank(_))
    }
}

impl fmt::Display for LogLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLine::Record(record) => write!(f, "{}", record),
            LogLine::Malformed(raw) | LogLine::Blank(raw) => f.write_str(raw),
        }
    }
}

/// Handle on the move log file.
#[derive(Debug)]
pub struct MoveLog {
    path: PathBuf,
    known_ids: HashSet<String>,
}

impl MoveLog {
    /// Opens the log at `path`. A missing file is an empty log; it is created
    /// by the first [`record_move`](Self::record_move).
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let mut log = Self {
            path: path.into(),
            known_ids: HashSet::new(),
        };
        log.known_ids = log
            .load()?
            .iter()
            .filter_map(LogLine::record)
            .map(|record| record.commit_id.clone())
            .collect();
        Ok(log)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends a record for a move that has already happened and returns it.
    ///
    /// # Errors
    ///
    /// `UnrepresentablePath` if either path would corrupt the line format,
    /// `LogWriteFailed` if the append fails.
    pub fn record_move(&mut self, original_path: &Path, new_path: &Path) -> Result<LogRecord> {
        for path in [original_path, new_path] {
            if !LogRecord::is_representable(path) {
                return Err(FilifyError::UnrepresentablePath(path.to_path_buf()));
            }
        }

        let record = LogRecord {
            timestamp: now(),
            commit_id: self.fresh_commit_id(),
            original_path: original_path.to_path_buf(),
            new_path: new_path.to_path_buf(),
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.write_error(e))?;
        writeln!(file, "{}", record).map_err(|e| self.write_error(e))?;

        self.known_ids.insert(record.commit_id.clone());
        tracing::debug!(commit_id = %record.commit_id, "recorded move");
        Ok(record)
    }

    /// Reads every line of the log in append order. A missing file reads as
    /// empty.
    ///
    /// Each malformed line is reported once per call with a warning.
    pub fn read(&self) -> Result<Vec<LogLine>> {
        let lines = self.load()?;
        for line in &lines {
            if let LogLine::Malformed(raw) = line {
                let reason = raw
                    .strip_suffix('\r')
                    .unwrap_or(raw)
                    .parse::<LogRecord>()
                    .err()
                    .map(|e| e.to_string())
                    .unwrap_or_default();
                tracing::warn!(line = %raw, reason, "malformed move log line");
            }
        }
        Ok(lines)
    }

    fn load(&self) -> Result<Vec<LogLine>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(FilifyError::LogReadFailed {
                    path: self.path.clone(),
                    source: e,
                });
            }
        };

        Ok(content.split_terminator('\n').map(LogLine::parse).collect())
    }

    /// Replaces the whole log with `lines`.
    ///
    /// The new content goes to a sibling temporary file first and is renamed
    /// over the log, so readers see either the old or the new log.
    /// Records are written in canonical form with a `\n` ending; malformed
    /// and blank lines are written back byte for byte.
    pub fn rewrite(&mut self, lines: &[LogLine]) -> Result<()> {
        let mut content = String::new();
        for line in lines {
            content.push_str(&line.to_string());
            content.push('\n');
        }

        let tmp_path = self.tmp_path();
        fs::write(&tmp_path, content).map_err(|e| self.write_error(e))?;
        fs::rename(&tmp_path, &self.path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            self.write_error(e)
        })?;

        self.known_ids = lines
            .iter()
            .filter_map(LogLine::record)
            .map(|record| record.commit_id.clone())
            .collect();
        tracing::debug!(path = %self.path.display(), lines = lines.len(), "compacted move log");
        Ok(())
    }

    /// Random 8-hex-digit token not already present in the log.
    fn fresh_commit_id(&self) -> String {
        loop {
            let id: String = uuid::Uuid::new_v4()
                .simple()
                .to_string()
                .chars()
                .take(COMMIT_ID_LEN)
                .collect();
            if !self.known_ids.contains(&id) {
                return id;
            }
        }
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn write_error(&self, source: std::io::Error) -> FilifyError {
        FilifyError::LogWriteFailed {
            path: self.path.clone(),
            source,
        }
    }
}

/// Current local time truncated to whole seconds, the log's resolution.
fn now() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}
