//! Decides which folder each file belongs in and moves it there.

use crate::config::{CompiledFilters, Config};
use crate::error::{FilifyError, Result};
use crate::move_log::LogRecord;
use crate::mover::{Mover, ensure_dir};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Lower-cased text after the last "." of `file_name`, or `None` when the
/// name has no dot.
///
/// ```
/// use filify::categorizer::extension_of;
///
/// assert_eq!(extension_of("photo.JPG"), Some("jpg".to_string()));
/// assert_eq!(extension_of("archive.tar.gz"), Some("gz".to_string()));
/// assert_eq!(extension_of("README"), None);
/// ```
pub fn extension_of(file_name: &str) -> Option<String> {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
}

/// Where a file is routed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// Index into `Config::group_extensions`.
    Category(usize),
    Unsorted,
}

/// A routing decision for one file, before anything moves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedMove {
    pub file: PathBuf,
    /// Folder name relative to the target directory.
    pub folder: String,
    pub destination: Destination,
}

/// What a categorization pass did.
#[derive(Debug, Default)]
pub struct CategorizeReport {
    /// Records appended to the log, in move order.
    pub moves: Vec<LogRecord>,
    /// Files moved per folder name.
    pub per_folder: BTreeMap<String, usize>,
    /// Files left in place because their path cannot be written to the log.
    pub skipped: Vec<PathBuf>,
}

impl CategorizeReport {
    pub fn total(&self) -> usize {
        self.moves.len()
    }
}

/// Regular files directly inside `directory`, sorted by name.
///
/// Skips files the filters reject and any of `reserved` (the move log and the
/// configuration file, when they live in the directory).
///
/// # Errors
///
/// `DirectoryUnavailable` when the directory cannot be read.
pub fn list_files(
    directory: &Path,
    filters: &CompiledFilters,
    reserved: &[&Path],
) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(directory).map_err(|e| FilifyError::DirectoryUnavailable {
        path: directory.to_path_buf(),
        source: e,
    })?;

    let reserved: Vec<PathBuf> = reserved
        .iter()
        .filter_map(|path| fs::canonicalize(path).ok())
        .collect();

    let mut files: Vec<PathBuf> = entries
        .flatten()
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_file()))
        .filter(|entry| filters.should_include(&entry.file_name().to_string_lossy()))
        .map(|entry| entry.path())
        .filter(|path| {
            fs::canonicalize(path).map_or(true, |canonical| !reserved.contains(&canonical))
        })
        .collect();

    files.sort();
    Ok(files)
}

/// Routes files into category folders.
pub struct Categorizer<'a> {
    config: &'a Config,
}

impl<'a> Categorizer<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Picks the destination for a file name.
    ///
    /// Names without a dot go to the fallback folder. Otherwise the first
    /// declared category claiming the extension wins, even when a later one
    /// claims it too.
    pub fn route(&self, file_name: &str) -> Destination {
        let Some(extension) = extension_of(file_name) else {
            return Destination::Unsorted;
        };

        self.config
            .group_extensions
            .iter()
            .position(|rule| rule.claims(&extension))
            .map_or(Destination::Unsorted, Destination::Category)
    }

    /// Folder name for a destination.
    pub fn folder_name(&self, destination: &Destination) -> &'a str {
        match destination {
            Destination::Category(index) => &self.config.group_extensions[*index].name,
            Destination::Unsorted => &self.config.unsorted_folder,
        }
    }

    /// Whether both ends of `planned` can be recorded in the move log.
    ///
    /// Names containing the log delimiters or invalid UTF-8 cannot.
    pub fn is_loggable(&self, planned: &PlannedMove) -> bool {
        let Some(file_name) = planned.file.file_name() else {
            return false;
        };
        let new_path = self.config.directory.join(&planned.folder).join(file_name);
        LogRecord::is_representable(&planned.file) && LogRecord::is_representable(&new_path)
    }

    /// Routing decisions for `files` without touching the filesystem.
    pub fn plan(&self, files: &[PathBuf]) -> Vec<PlannedMove> {
        files
            .iter()
            .map(|file| {
                let name = file
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                let destination = self.route(&name);
                PlannedMove {
                    file: file.clone(),
                    folder: self.folder_name(&destination).to_string(),
                    destination,
                }
            })
            .collect()
    }

    /// Creates every category folder and the fallback folder, then moves each
    /// file with one `Mover` call.
    ///
    /// `on_move` is called after each successful move (used for progress).
    /// Files the log cannot represent are left in place and listed in
    /// [`CategorizeReport::skipped`].
    ///
    /// # Errors
    ///
    /// The first failed move aborts the pass. Files moved before it stay moved
    /// and logged.
    pub fn categorize(
        &self,
        files: &[PathBuf],
        mover: &mut Mover<'_>,
        mut on_move: impl FnMut(&PlannedMove, &LogRecord),
    ) -> Result<CategorizeReport> {
        for rule in &self.config.group_extensions {
            ensure_dir(&self.config.category_dir(&rule.name))?;
        }
        ensure_dir(&self.config.unsorted_dir())?;

        let mut report = CategorizeReport::default();
        for planned in self.plan(files) {
            if !self.is_loggable(&planned) {
                tracing::warn!(file = %planned.file.display(), "path cannot be logged, skipping");
                report.skipped.push(planned.file);
                continue;
            }
            let folder = self.config.directory.join(&planned.folder);
            let record = mover.move_into(&planned.file, &folder)?;
            on_move(&planned, &record);

            *report.per_folder.entry(planned.folder.clone()).or_insert(0) += 1;
            report.moves.push(record);
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::move_log::MoveLog;
    use tempfile::TempDir;

    fn images_and_docs(dir: &Path) -> Config {
        Config::new(dir)
            .with_category("Images", ["jpg", "png"])
            .with_category("Documents", ["pdf", "txt"])
    }

    #[test]
    fn test_route_by_extension() {
        let config = images_and_docs(Path::new("/tmp/t"));
        let categorizer = Categorizer::new(&config);

        assert_eq!(categorizer.route("a.jpg"), Destination::Category(0));
        assert_eq!(categorizer.route("A.PNG"), Destination::Category(0));
        assert_eq!(categorizer.route("report.pdf"), Destination::Category(1));
        assert_eq!(categorizer.route("song.mp3"), Destination::Unsorted);
        assert_eq!(categorizer.route("Makefile"), Destination::Unsorted);
    }

    #[test]
    fn test_route_first_declared_wins() {
        let config = Config::new("/tmp/t")
            .with_category("Pictures", ["jpg"])
            .with_category("Images", ["jpg", "png"]);
        let categorizer = Categorizer::new(&config);

        assert_eq!(categorizer.route("a.jpg"), Destination::Category(0));
        assert_eq!(categorizer.route("a.png"), Destination::Category(1));
        assert_eq!(categorizer.folder_name(&categorizer.route("a.jpg")), "Pictures");
    }

    #[test]
    fn test_route_uses_last_dot() {
        let config = Config::new("/tmp/t").with_category("Archives", ["gz"]);
        let categorizer = Categorizer::new(&config);

        assert_eq!(categorizer.route("backup.tar.gz"), Destination::Category(0));
        assert_eq!(categorizer.route("trailing."), Destination::Unsorted);
    }

    #[test]
    fn test_list_files_skips_dirs_hidden_and_reserved() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();
        fs::write(base_path.join("b.txt"), "b").unwrap();
        fs::write(base_path.join("a.jpg"), "a").unwrap();
        fs::write(base_path.join(".hidden"), "h").unwrap();
        fs::write(base_path.join("filify.log"), "").unwrap();
        fs::create_dir(base_path.join("Images")).unwrap();

        let config = Config::new(base_path);
        let filters = config.compile_filters().unwrap();
        let log_path = base_path.join("filify.log");
        let files = list_files(base_path, &filters, &[log_path.as_path()]).unwrap();

        assert_eq!(files, vec![base_path.join("a.jpg"), base_path.join("b.txt")]);
    }

    #[test]
    fn test_list_files_missing_directory() {
        let filters = Config::new("/tmp").compile_filters().unwrap();
        let result = list_files(Path::new("/non/existent/path"), &filters, &[]);
        assert!(matches!(result, Err(FilifyError::DirectoryUnavailable { .. })));
    }

    #[test]
    fn test_categorize_moves_and_counts() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();
        let log_dir = TempDir::new().expect("Failed to create temp directory");
        fs::write(base_path.join("a.jpg"), "a").unwrap();
        fs::write(base_path.join("b.txt"), "b").unwrap();
        fs::write(base_path.join("c"), "c").unwrap();

        let config = images_and_docs(base_path);
        let files = list_files(base_path, &config.compile_filters().unwrap(), &[]).unwrap();
        let mut log = MoveLog::open(log_dir.path().join("filify.log")).unwrap();
        let mut seen = 0;
        let report = Categorizer::new(&config)
            .categorize(&files, &mut Mover::new(&mut log), |_, _| seen += 1)
            .expect("Categorize failed");

        assert_eq!(report.total(), 3);
        assert_eq!(seen, 3);
        assert_eq!(report.per_folder.get("Images"), Some(&1));
        assert_eq!(report.per_folder.get("Documents"), Some(&1));
        assert_eq!(report.per_folder.get("Unsorted"), Some(&1));
        assert!(base_path.join("Images/a.jpg").exists());
        assert!(base_path.join("Documents/b.txt").exists());
        assert!(base_path.join("Unsorted/c").exists());
        assert_eq!(log.read().unwrap().len(), 3);
    }

    #[test]
    fn test_categorize_creates_all_folders_up_front() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();
        let log_dir = TempDir::new().expect("Failed to create temp directory");

        let config = images_and_docs(base_path).with_unsorted_folder("Misc");
        let mut log = MoveLog::open(log_dir.path().join("filify.log")).unwrap();
        let report = Categorizer::new(&config)
            .categorize(&[], &mut Mover::new(&mut log), |_, _| {})
            .unwrap();

        assert_eq!(report.total(), 0);
        assert!(base_path.join("Images").is_dir());
        assert!(base_path.join("Documents").is_dir());
        assert!(base_path.join("Misc").is_dir());
        assert!(!base_path.join("Unsorted").exists());
    }

    #[test]
    fn test_categorize_skips_unloggable_names() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();
        let log_dir = TempDir::new().expect("Failed to create temp directory");
        for name in ["a.jpg", "m -> n.jpg", "p | q.png", "z.png"] {
            fs::write(base_path.join(name), name).unwrap();
        }

        let config = images_and_docs(base_path);
        let files = list_files(base_path, &config.compile_filters().unwrap(), &[]).unwrap();
        let mut log = MoveLog::open(log_dir.path().join("filify.log")).unwrap();
        let report = Categorizer::new(&config)
            .categorize(&files, &mut Mover::new(&mut log), |_, _| {})
            .expect("Categorize failed");

        assert_eq!(report.total(), 2);
        assert_eq!(
            report.skipped,
            vec![base_path.join("m -> n.jpg"), base_path.join("p | q.png")]
        );
        assert!(base_path.join("Images/a.jpg").exists());
        assert!(base_path.join("Images/z.png").exists());
        assert!(base_path.join("m -> n.jpg").exists());
        assert!(base_path.join("p | q.png").exists());
        assert_eq!(log.read().unwrap().len(), 2);
    }

    #[test]
    fn test_is_loggable() {
        let config = images_and_docs(Path::new("/tmp/t"));
        let categorizer = Categorizer::new(&config);
        let plan = categorizer.plan(&[
            PathBuf::from("/tmp/t/a.jpg"),
            PathBuf::from("/tmp/t/a -> b.jpg"),
        ]);

        assert!(categorizer.is_loggable(&plan[0]));
        assert!(!categorizer.is_loggable(&plan[1]));
    }
}
