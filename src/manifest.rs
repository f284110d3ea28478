//! Build manifest: a flat, ordered property bag.
//!
//! Every key has exactly one owner (a platform key or the generator).
//! Writing a key owned by someone else is a [`BuildError::ManifestKeyCollision`];
//! there is no last-writer-wins.

use crate::error::BuildError;
use anyhow::{Context, Result};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

pub const MANIFEST_FILE_NAME: &str = "peelkit-manifest.toml";

/// Owner name for keys written by the generator itself.
pub const GENERATOR_OWNER: &str = "generator";

pub mod keys {
    pub const OPERATION_ID: &str = "OperationId";
    pub const PLATFORM_NAME: &str = "PlatformName";
    pub const SOURCE_DIRECTORY_IN_BUILD_CONTAINER: &str = "SourceDirectoryInBuildContainer";

    pub const NODE_VERSION: &str = "NodeVersion";
    pub const NODE_FRAMEWORKS: &str = "NodeFrameworks";
    pub const PHP_VERSION: &str = "PhpVersion";
    pub const PHP_COMPOSER_VERSION: &str = "PhpComposerVersion";
    pub const HUGO_VERSION: &str = "HugoVersion";

    /// Keys the generator owns regardless of platform.
    pub const COMMON: &[&str] = &[OPERATION_ID, PLATFORM_NAME, SOURCE_DIRECTORY_IN_BUILD_CONTAINER];
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    key: String,
    value: String,
    owner: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildManifest {
    entries: Vec<Entry>,
}

impl BuildManifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key` on behalf of `owner`. Rewriting an own key replaces the
    /// value in place.
    pub fn insert(
        &mut self,
        owner: &str,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), BuildError> {
        let key = key.into();
        let value = value.into();

        match self.entries.iter_mut().find(|e| e.key == key) {
            Some(existing) if existing.owner != owner => Err(BuildError::ManifestKeyCollision {
                key,
                owner: existing.owner.clone(),
                intruder: owner.to_string(),
            }),
            Some(existing) => {
                existing.value = value;
                Ok(())
            }
            None => {
                self.entries.push(Entry {
                    key,
                    value,
                    owner: owner.to_string(),
                });
                Ok(())
            }
        }
    }

    /// Append every property of `properties` under `owner`.
    pub fn extend<'a>(
        &mut self,
        owner: &str,
        properties: impl IntoIterator<Item = (&'a String, &'a String)>,
    ) -> Result<(), BuildError> {
        for (key, value) in properties {
            self.insert(owner, key.as_str(), value.as_str())?;
        }
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.key == key)
            .map(|e| e.value.as_str())
    }

    pub fn owner_of(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.key == key)
            .map(|e| e.owner.as_str())
    }

    /// Properties in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|e| (e.key.as_str(), e.value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// One `Key="value"` line per property.
    pub fn to_file_content(&self) -> String {
        let mut out = String::new();
        for (key, value) in self.iter() {
            let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
            let _ = writeln!(out, "{}=\"{}\"", key, escaped);
        }
        out
    }

    /// Write the manifest into `dir`, creating it if needed.
    pub fn write_to_dir(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create manifest directory {}", dir.display()))?;
        let path = dir.join(MANIFEST_FILE_NAME);
        std::fs::write(&path, self.to_file_content())
            .with_context(|| format!("Failed to write manifest {}", path.display()))?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_insertion_order_is_kept() {
        let mut manifest = BuildManifest::new();
        manifest.insert("php", keys::PHP_VERSION, "8.2.12").unwrap();
        manifest.insert("nodejs", keys::NODE_VERSION, "18.17.1").unwrap();

        let keys: Vec<&str> = manifest.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["PhpVersion", "NodeVersion"]);
    }

    #[test]
    fn test_collision_is_an_error() {
        let mut manifest = BuildManifest::new();
        manifest.insert("nodejs", keys::NODE_VERSION, "18.17.1").unwrap();

        let err = manifest
            .insert("php", keys::NODE_VERSION, "8.2.12")
            .unwrap_err();
        match err {
            BuildError::ManifestKeyCollision {
                key,
                owner,
                intruder,
            } => {
                assert_eq!(key, "NodeVersion");
                assert_eq!(owner, "nodejs");
                assert_eq!(intruder, "php");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(manifest.get(keys::NODE_VERSION), Some("18.17.1"));
    }

    #[test]
    fn test_owner_may_overwrite() {
        let mut manifest = BuildManifest::new();
        manifest.insert(GENERATOR_OWNER, keys::PLATFORM_NAME, "nodejs").unwrap();
        manifest
            .insert(GENERATOR_OWNER, keys::PLATFORM_NAME, "nodejs,php")
            .unwrap();

        assert_eq!(manifest.len(), 1);
        assert_eq!(manifest.get(keys::PLATFORM_NAME), Some("nodejs,php"));
        assert_eq!(manifest.owner_of(keys::PLATFORM_NAME), Some(GENERATOR_OWNER));
    }

    #[test]
    fn test_file_content_format() {
        let mut manifest = BuildManifest::new();
        manifest.insert("hugo", keys::HUGO_VERSION, "0.119.0").unwrap();
        manifest
            .insert(GENERATOR_OWNER, keys::SOURCE_DIRECTORY_IN_BUILD_CONTAINER, "/tmp/a \"b\"")
            .unwrap();

        assert_eq!(
            manifest.to_file_content(),
            "HugoVersion=\"0.119.0\"\nSourceDirectoryInBuildContainer=\"/tmp/a \\\"b\\\"\"\n"
        );
    }

    #[test]
    fn test_write_to_dir() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("out");

        let mut manifest = BuildManifest::new();
        manifest.insert("php", keys::PHP_VERSION, "8.1.25").unwrap();
        let path = manifest.write_to_dir(&target).unwrap();

        assert_eq!(path, target.join(MANIFEST_FILE_NAME));
        let content = std::fs::read_to_string(path).unwrap();
        assert_eq!(content, "PhpVersion=\"8.1.25\"\n");
    }
}
