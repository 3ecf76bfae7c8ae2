/// Moves single files and records each move in the log.
///
/// The move itself is done by [`relocate`], which the undo engine reuses to
/// put files back.
use crate::error::{FilifyError, Result};
use crate::move_log::{LogRecord, MoveLog};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Creates `folder` (and parents) unless it already exists.
pub fn ensure_dir(folder: &Path) -> Result<()> {
    if folder.is_dir() {
        return Ok(());
    }
    fs::create_dir_all(folder).map_err(|e| FilifyError::DirectoryCreationFailed {
        path: folder.to_path_buf(),
        source: e,
    })
}

/// Moves `from` to `to`, refusing to overwrite an existing file.
///
/// Falls back to copy-then-remove when the rename crosses filesystems.
pub fn relocate(from: &Path, to: &Path) -> Result<()> {
    if to.exists() {
        return Err(FilifyError::DestinationExists(to.to_path_buf()));
    }

    let move_error = |e: std::io::Error| FilifyError::FileMoveFailed {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source: e,
    };

    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::CrossesDevices => {
            tracing::debug!(from = %from.display(), "rename crosses devices, copying");
            fs::copy(from, to).map_err(move_error)?;
            fs::remove_file(from).map_err(move_error)
        }
        Err(e) => Err(move_error(e)),
    }
}

/// Moves files into folders and appends one log record per completed move.
pub struct Mover<'a> {
    log: &'a mut MoveLog,
}

impl<'a> Mover<'a> {
    pub fn new(log: &'a mut MoveLog) -> Self {
        Self { log }
    }

    /// Moves `original_path` into `destination_folder`, keeping its file name,
    /// and logs the move.
    ///
    /// The folder is created if missing. Nothing is logged unless the move
    /// succeeded, and paths the log cannot represent are refused before any
    /// file is touched.
    ///
    /// # Errors
    ///
    /// Any failure is returned as is; a file already moved is not moved back.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use filify::move_log::MoveLog;
    /// use filify::mover::Mover;
    /// use std::path::Path;
    ///
    /// let mut log = MoveLog::open("filify.log")?;
    /// let record = Mover::new(&mut log)
    ///     .move_into(Path::new("/tmp/t/a.jpg"), Path::new("/tmp/t/Images"))?;
    /// println!("moved as commit {}", record.commit_id);
    /// # Ok::<(), filify::FilifyError>(())
    /// ```
    pub fn move_into(
        &mut self,
        original_path: &Path,
        destination_folder: &Path,
    ) -> Result<LogRecord> {
        let file_name = original_path.file_name().ok_or_else(|| FilifyError::FileMoveFailed {
            from: original_path.to_path_buf(),
            to: destination_folder.to_path_buf(),
            source: std::io::Error::new(ErrorKind::InvalidInput, "file has no name component"),
        })?;
        let new_path: PathBuf = destination_folder.join(file_name);

        for path in [original_path, new_path.as_path()] {
            if !LogRecord::is_representable(path) {
                return Err(FilifyError::UnrepresentablePath(path.to_path_buf()));
            }
        }

        ensure_dir(destination_folder)?;
        relocate(original_path, &new_path)?;
        tracing::debug!(
            from = %original_path.display(),
            to = %new_path.display(),
            "moved file"
        );

        self.log.record_move(original_path, &new_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::move_log::LogLine;
    use tempfile::TempDir;

    #[test]
    fn test_move_into_creates_folder_and_logs() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();
        let file_path = base_path.join("a.jpg");
        fs::write(&file_path, "jpeg").expect("Failed to write test file");

        let mut log = MoveLog::open(base_path.join("filify.log")).unwrap();
        let record = Mover::new(&mut log)
            .move_into(&file_path, &base_path.join("Images"))
            .expect("Failed to move file");

        assert!(!file_path.exists());
        assert!(base_path.join("Images").join("a.jpg").exists());
        assert_eq!(record.original_path, file_path);
        assert_eq!(record.new_path, base_path.join("Images").join("a.jpg"));
        assert_eq!(log.read().unwrap(), vec![LogLine::Record(record)]);
    }

    #[test]
    fn test_move_into_existing_folder() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();
        fs::create_dir(base_path.join("Docs")).unwrap();
        let file_path = base_path.join("notes.txt");
        fs::write(&file_path, "notes").unwrap();

        let mut log = MoveLog::open(base_path.join("filify.log")).unwrap();
        Mover::new(&mut log)
            .move_into(&file_path, &base_path.join("Docs"))
            .expect("Failed to move file");

        assert!(base_path.join("Docs").join("notes.txt").exists());
    }

    #[test]
    fn test_collision_fails_without_logging() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();
        fs::create_dir(base_path.join("Docs")).unwrap();
        fs::write(base_path.join("Docs").join("notes.txt"), "old").unwrap();
        let file_path = base_path.join("notes.txt");
        fs::write(&file_path, "new").unwrap();

        let mut log = MoveLog::open(base_path.join("filify.log")).unwrap();
        let result = Mover::new(&mut log).move_into(&file_path, &base_path.join("Docs"));

        assert!(matches!(result, Err(FilifyError::DestinationExists(_))));
        assert!(file_path.exists());
        assert_eq!(
            fs::read_to_string(base_path.join("Docs").join("notes.txt")).unwrap(),
            "old"
        );
        assert!(log.read().unwrap().is_empty());
    }

    #[test]
    fn test_missing_source_fails_without_logging() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();

        let mut log = MoveLog::open(base_path.join("filify.log")).unwrap();
        let result = Mover::new(&mut log).move_into(&base_path.join("gone.txt"), base_path);

        assert!(matches!(result, Err(FilifyError::FileMoveFailed { .. })));
        assert!(log.read().unwrap().is_empty());
    }

    #[test]
    fn test_unrepresentable_name_is_not_moved() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();
        let file_path = base_path.join("a -> b.txt");
        fs::write(&file_path, "x").unwrap();

        let mut log = MoveLog::open(base_path.join("filify.log")).unwrap();
        let result = Mover::new(&mut log).move_into(&file_path, &base_path.join("Docs"));

        assert!(matches!(result, Err(FilifyError::UnrepresentablePath(_))));
        assert!(file_path.exists());
        assert!(!base_path.join("Docs").exists());
    }

    #[test]
    fn test_relocate_refuses_overwrite() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let from = temp_dir.path().join("a.txt");
        let to = temp_dir.path().join("b.txt");
        fs::write(&from, "a").unwrap();
        fs::write(&to, "b").unwrap();

        assert!(relocate(&from, &to).is_err());
        assert_eq!(fs::read_to_string(&to).unwrap(), "b");
    }
}
