//! Read-only view of an application source tree.
//!
//! Detectors only ever see a [`SourceRepo`]; they never touch the host file
//! system directly. Paths handed to the trait are relative to the repository
//! root. I/O failures surface as `anyhow` errors; malformed structured files
//! are reported as data through [`StructuredFile::Malformed`].

use crate::fs::{FileSystem, RealFileSystem};
use anyhow::{Context, Result};
use glob::Pattern;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Formats understood by [`SourceRepo::parse_structured`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructuredFormat {
    Json,
    Yaml,
    Toml,
}

impl StructuredFormat {
    /// Guess the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "json" => Some(Self::Json),
            "yaml" | "yml" => Some(Self::Yaml),
            "toml" => Some(Self::Toml),
            _ => None,
        }
    }
}

/// Outcome of parsing a structured file whose bytes were read successfully.
#[derive(Debug, Clone, PartialEq)]
pub enum StructuredFile {
    Parsed(Value),
    Malformed { path: PathBuf, message: String },
}

impl StructuredFile {
    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Parsed(value) => Some(value),
            Self::Malformed { .. } => None,
        }
    }

    /// Human-readable warning for a malformed file.
    pub fn warning(&self) -> Option<String> {
        match self {
            Self::Parsed(_) => None,
            Self::Malformed { path, message } => {
                Some(format!("Failed to parse {}: {}", path.display(), message))
            }
        }
    }

    /// Top-level keys of a parsed mapping, empty for anything else.
    pub fn top_level_keys(&self) -> Vec<&str> {
        match self.value() {
            Some(Value::Object(map)) => map.keys().map(String::as_str).collect(),
            _ => Vec::new(),
        }
    }
}

pub trait SourceRepo: Send + Sync {
    fn root_path(&self) -> &Path;

    fn file_exists(&self, path: &str) -> bool;

    fn dir_exists(&self, path: &str) -> bool;

    /// Read a file relative to the root. Fails when the file does not exist.
    fn read_file(&self, path: &str) -> Result<String>;

    /// Files whose name matches `pattern` (e.g. `*.toml`), either directly
    /// under `under_subdir` (or the root) or anywhere below it when
    /// `recursive` is set. Paths are relative to the root and sorted.
    fn enumerate_files(
        &self,
        pattern: &str,
        recursive: bool,
        under_subdir: Option<&str>,
    ) -> Result<Vec<PathBuf>>;

    /// Read and parse a structured file. Only the read can fail; a parse
    /// failure is returned as [`StructuredFile::Malformed`].
    fn parse_structured(&self, path: &str, format: StructuredFormat) -> Result<StructuredFile> {
        let content = self.read_file(path)?;
        Ok(parse_content(Path::new(path), &content, format))
    }
}

fn parse_content(path: &Path, content: &str, format: StructuredFormat) -> StructuredFile {
    let parsed: std::result::Result<Value, String> = match format {
        StructuredFormat::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
        StructuredFormat::Yaml => serde_yaml::from_str(content).map_err(|e| e.to_string()),
        StructuredFormat::Toml => toml::from_str::<toml::Value>(content)
            .map_err(|e| e.to_string())
            .and_then(|v| serde_json::to_value(v).map_err(|e| e.to_string())),
    };

    match parsed {
        Ok(value) => StructuredFile::Parsed(value),
        Err(message) => StructuredFile::Malformed {
            path: path.to_path_buf(),
            message,
        },
    }
}

/// [`SourceRepo`] over a directory on a [`FileSystem`].
pub struct LocalSourceRepo {
    root: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl LocalSourceRepo {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_fs(root, Arc::new(RealFileSystem::new()))
    }

    pub fn with_fs(root: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            root: root.into(),
            fs,
        }
    }

    fn walk(
        &self,
        dir: &Path,
        pattern: &Pattern,
        recursive: bool,
        found: &mut Vec<PathBuf>,
    ) -> Result<()> {
        for entry in self.fs.read_dir(dir)? {
            if entry.is_dir() {
                if recursive {
                    self.walk(entry.path(), pattern, recursive, found)?;
                }
            } else if entry.is_file() && pattern.matches(entry.file_name()) {
                let relative = entry
                    .path()
                    .strip_prefix(&self.root)
                    .unwrap_or(entry.path())
                    .to_path_buf();
                found.push(relative);
            }
        }
        Ok(())
    }
}

impl SourceRepo for LocalSourceRepo {
    fn root_path(&self) -> &Path {
        &self.root
    }

    fn file_exists(&self, path: &str) -> bool {
        self.fs.is_file(&self.root.join(path))
    }

    fn dir_exists(&self, path: &str) -> bool {
        self.fs.is_dir(&self.root.join(path))
    }

    fn read_file(&self, path: &str) -> Result<String> {
        self.fs
            .read_to_string(&self.root.join(path))
            .with_context(|| format!("Failed to read {} from source repo", path))
    }

    fn enumerate_files(
        &self,
        pattern: &str,
        recursive: bool,
        under_subdir: Option<&str>,
    ) -> Result<Vec<PathBuf>> {
        let glob = Pattern::new(pattern).with_context(|| format!("Invalid glob {}", pattern))?;
        let start = match under_subdir {
            Some(subdir) => self.root.join(subdir),
            None => self.root.clone(),
        };

        let mut found = Vec::new();
        if self.fs.is_dir(&start) {
            self.walk(&start, &glob, recursive, &mut found)?;
        }
        found.sort();
        Ok(found)
    }
}
