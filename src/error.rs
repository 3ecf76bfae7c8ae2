//! Error types shared by every filify component.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a filify run.
///
/// Per-entry problems during undo (a file that vanished, a malformed log line)
/// are not errors; they are reported through the undo outcome types instead.
#[derive(Debug, Error)]
pub enum FilifyError {
    /// No configuration file was found in any of the searched locations.
    #[error("Configuration file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    /// The configuration document could not be parsed.
    #[error("Invalid configuration in {}: {reason}", .path.display())]
    ConfigInvalid { path: PathBuf, reason: String },

    /// A glob pattern in the filter rules failed to compile.
    #[error("Invalid glob pattern '{0}': expected *.ext or dir/**")]
    InvalidGlobPattern(String),

    /// A regex in the filter rules failed to compile.
    #[error("Invalid regex pattern '{pattern}': {reason}")]
    InvalidRegexPattern { pattern: String, reason: String },

    /// The target directory is missing or cannot be read.
    #[error("Cannot access directory {}: {source}", .path.display())]
    DirectoryUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A category or fallback folder could not be created.
    #[error("Failed to create directory {}: {source}", .path.display())]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The filesystem refused to move a file.
    #[error("Failed to move {} to {}: {source}", .from.display(), .to.display())]
    FileMoveFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The destination already holds a file with the same name.
    #[error("Destination already exists: {}", .0.display())]
    DestinationExists(PathBuf),

    /// The path cannot be written to the move log without ambiguity.
    #[error("Path cannot be recorded in the move log: {}", .0.display())]
    UnrepresentablePath(PathBuf),

    /// Appending to or rewriting the move log failed.
    #[error("Failed to write move log {}: {source}", .path.display())]
    LogWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Reading the move log failed.
    #[error("Failed to read move log {}: {source}", .path.display())]
    LogReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for filify operations.
pub type Result<T> = std::result::Result<T, FilifyError>;
