//! Run configuration: target directory, categories, fallback folder, log
//! location and file filters.
//!
//! Configuration is read from a JSON or TOML document. Category order is the
//! order of declaration in the document, which matters because the first
//! category claiming an extension wins.
//!
//! # JSON
//!
//! ```json
//! {
//!   "directory": "/home/me/Downloads",
//!   "group_extensions": {
//!     "Images": ["jpg", "png"],
//!     "Documents": ["pdf", "txt"]
//!   },
//!   "unsorted_folder": "Unsorted"
//! }
//! ```
//!
//! # TOML
//!
//! ```toml
//! directory = "/home/me/Downloads"
//! log_file = "/home/me/.filify.log"
//!
//! [group_extensions]
//! Images = ["jpg", "png"]
//! Documents = ["pdf", "txt"]
//!
//! [filters]
//! enable_hidden_files = false
//!
//! [filters.exclude]
//! filenames = ["Thumbs.db"]
//! extensions = ["part", "crdownload"]
//! patterns = ["*.tmp"]
//! regex = []
//! ```

use crate::categorizer::extension_of;
use crate::error::{FilifyError, Result};
use glob::Pattern;
use regex::Regex;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the fallback folder when the document does not set one.
pub const DEFAULT_UNSORTED_FOLDER: &str = "Unsorted";

/// Log file used when the document does not set one.
pub const DEFAULT_LOG_FILE: &str = "filify.log";

/// Configuration file looked up in the working directory first.
pub const LOCAL_JSON_CONFIG: &str = "config.json";

/// TOML configuration looked up in the working directory second.
pub const LOCAL_TOML_CONFIG: &str = ".filifyrc.toml";

/// One named category and the extensions it claims.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRule {
    pub name: String,
    /// Lower-cased, without a leading dot.
    pub extensions: Vec<String>,
}

impl CategoryRule {
    pub fn new<I, S>(name: impl Into<String>, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            name: name.into(),
            extensions: extensions
                .into_iter()
                .map(|ext| ext.as_ref().trim().trim_start_matches('.').to_lowercase())
                .filter(|ext| !ext.is_empty())
                .collect(),
        }
    }

    /// Whether this category claims `extension` (already lower-cased).
    pub fn claims(&self, extension: &str) -> bool {
        self.extensions.iter().any(|ext| ext == extension)
    }
}

/// Document format of a configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Toml,
}

impl ConfigFormat {
    /// Picks the format from the file extension; anything but `.toml` is JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => ConfigFormat::Toml,
            _ => ConfigFormat::Json,
        }
    }
}

/// Everything one run needs to know. Built once and passed by reference into
/// each component.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Directory whose top-level files get categorized.
    #[serde(default = "default_directory")]
    pub directory: PathBuf,

    /// Categories in declaration order.
    #[serde(default, deserialize_with = "deserialize_categories")]
    pub group_extensions: Vec<CategoryRule>,

    /// Folder for files without an extension or without a matching category.
    #[serde(default = "default_unsorted_folder")]
    pub unsorted_folder: String,

    /// Location of the move log.
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,

    #[serde(default)]
    pub filters: FilterRules,

    /// File the configuration was read from, if any. Never deserialized.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

fn default_directory() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

fn default_unsorted_folder() -> String {
    DEFAULT_UNSORTED_FOLDER.to_string()
}

fn default_log_file() -> PathBuf {
    PathBuf::from(DEFAULT_LOG_FILE)
}

/// Reads `group_extensions` as an ordered list. Going through a visitor keeps
/// the document order, which a `HashMap` would lose.
fn deserialize_categories<'de, D>(deserializer: D) -> std::result::Result<Vec<CategoryRule>, D::Error>
where
    D: Deserializer<'de>,
{
    struct CategoriesVisitor;

    impl<'de> Visitor<'de> for CategoriesVisitor {
        type Value = Vec<CategoryRule>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map from category name to a list of extensions")
        }

        fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut rules = Vec::new();
            while let Some((name, extensions)) = map.next_entry::<String, Vec<String>>()? {
                rules.push(CategoryRule::new(name, extensions));
            }
            Ok(rules)
        }
    }

    deserializer.deserialize_map(CategoriesVisitor)
}

impl Config {
    /// Configuration for `directory` with no categories and default settings.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            group_extensions: Vec::new(),
            unsorted_folder: default_unsorted_folder(),
            log_file: default_log_file(),
            filters: FilterRules::default(),
            source: None,
        }
    }

    /// Appends a category after the ones already declared.
    pub fn with_category<I, S>(mut self, name: impl Into<String>, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.group_extensions.push(CategoryRule::new(name, extensions));
        self
    }

    pub fn with_log_file(mut self, log_file: impl Into<PathBuf>) -> Self {
        self.log_file = log_file.into();
        self
    }

    pub fn with_unsorted_folder(mut self, name: impl Into<String>) -> Self {
        self.unsorted_folder = name.into();
        self
    }

    /// Loads the configuration.
    ///
    /// Looks in this order and uses the first hit:
    /// 1. `config_path`, when given
    /// 2. `config.json` in the current directory
    /// 3. `.filifyrc.toml` in the current directory
    /// 4. `~/.config/filify/config.toml`
    ///
    /// # Errors
    ///
    /// `ConfigNotFound` when nothing is found, `ConfigInvalid` when the
    /// document does not parse.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::from_file(path);
        }

        let mut candidates = vec![
            PathBuf::from(LOCAL_JSON_CONFIG),
            PathBuf::from(LOCAL_TOML_CONFIG),
        ];
        if let Ok(home) = std::env::var("HOME") {
            candidates.push(
                PathBuf::from(home)
                    .join(".config")
                    .join("filify")
                    .join("config.toml"),
            );
        }

        match candidates.iter().find(|path| path.is_file()) {
            Some(path) => Self::from_file(path),
            None => Err(FilifyError::ConfigNotFound(PathBuf::from(LOCAL_JSON_CONFIG))),
        }
    }

    /// Reads one configuration file, choosing the format by extension.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(FilifyError::ConfigNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|e| FilifyError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let mut config = Self::parse(&content, ConfigFormat::from_path(path)).map_err(|e| {
            match e {
                FilifyError::ConfigInvalid { reason, .. } => FilifyError::ConfigInvalid {
                    path: path.to_path_buf(),
                    reason,
                },
                other => other,
            }
        })?;
        config.source = Some(path.to_path_buf());
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Parses a configuration document held in memory.
    pub fn parse(content: &str, format: ConfigFormat) -> Result<Self> {
        let parsed = match format {
            ConfigFormat::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
            ConfigFormat::Toml => toml::from_str(content).map_err(|e| e.to_string()),
        };
        parsed.map_err(|reason| FilifyError::ConfigInvalid {
            path: PathBuf::new(),
            reason,
        })
    }

    /// Path of a category folder.
    pub fn category_dir(&self, name: &str) -> PathBuf {
        self.directory.join(name)
    }

    /// Path of the fallback folder.
    pub fn unsorted_dir(&self) -> PathBuf {
        self.directory.join(&self.unsorted_folder)
    }

    /// Compiles the filter rules, rejecting invalid globs and regexes.
    pub fn compile_filters(&self) -> Result<CompiledFilters> {
        CompiledFilters::new(&self.filters)
    }
}

/// Which files are left alone during categorization.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterRules {
    /// Whether files starting with "." are categorized. Defaults to false.
    #[serde(default)]
    pub enable_hidden_files: bool,

    #[serde(default)]
    pub exclude: ExcludeRules,
}

/// Files matching any of these rules are skipped.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExcludeRules {
    /// Exact file names, e.g. "Thumbs.db".
    #[serde(default)]
    pub filenames: Vec<String>,

    /// Extensions, compared case-insensitively.
    #[serde(default)]
    pub extensions: Vec<String>,

    /// Glob patterns matched against the file name, e.g. "*.tmp".
    #[serde(default)]
    pub patterns: Vec<String>,

    /// Regular expressions matched against the file name.
    #[serde(default)]
    pub regex: Vec<String>,
}

/// Filter rules with patterns compiled once per run.
#[derive(Debug)]
pub struct CompiledFilters {
    enable_hidden_files: bool,
    filenames: HashSet<String>,
    extensions: HashSet<String>,
    patterns: Vec<Pattern>,
    regexes: Vec<Regex>,
}

impl CompiledFilters {
    fn new(rules: &FilterRules) -> Result<Self> {
        let patterns = rules
            .exclude
            .patterns
            .iter()
            .map(|pattern| {
                Pattern::new(pattern).map_err(|_| FilifyError::InvalidGlobPattern(pattern.clone()))
            })
            .collect::<Result<Vec<_>>>()?;

        let regexes = rules
            .exclude
            .regex
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| FilifyError::InvalidRegexPattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            enable_hidden_files: rules.enable_hidden_files,
            filenames: rules.exclude.filenames.iter().cloned().collect(),
            extensions: rules
                .exclude
                .extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_lowercase())
                .collect(),
            patterns,
            regexes,
        })
    }

    /// Whether a file with this name should be categorized.
    pub fn should_include(&self, file_name: &str) -> bool {
        if !self.enable_hidden_files && file_name.starts_with('.') {
            return false;
        }
        if self.filenames.contains(file_name) {
            return false;
        }
        if let Some(ext) = extension_of(file_name)
            && self.extensions.contains(&ext)
        {
            return false;
        }
        if self.patterns.iter().any(|p| p.matches(file_name)) {
            return false;
        }
        !self.regexes.iter().any(|re| re.is_match(file_name))
    }
}
