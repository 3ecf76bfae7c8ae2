//! filify - sort a directory into category folders, with commit-style undo
//!
//! Files are routed by extension into the folder of the first category that
//! claims it. Every move is appended to a plain-text log with a commit id, and
//! can be reversed one commit at a time or N moves at a time.

pub mod categorizer;
pub mod cli;
pub mod config;
pub mod error;
pub mod move_log;
pub mod mover;
pub mod output;
pub mod undo;

pub use categorizer::{Categorizer, Destination};
pub use config::{CategoryRule, Config, ConfigFormat};
pub use error::{FilifyError, Result};
pub use move_log::{LogLine, LogRecord, MoveLog};
pub use mover::Mover;
pub use undo::{BatchReport, CommitUndo, EntryOutcome, RetentionPolicy, UndoEngine};

pub use cli::{Args, Command, run};
