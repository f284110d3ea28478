//! Supported toolchain versions.
//!
//! Each tool (`nodejs`, `php`, `php-composer`, `hugo`) maps to the finite set
//! of versions that can be built plus the version used when neither the
//! caller nor the repository asks for one. The catalog is read once per build
//! and never changes afterwards.

use crate::error::BuildError;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub const NODE_TOOL: &str = "nodejs";
pub const PHP_TOOL: &str = "php";
pub const PHP_COMPOSER_TOOL: &str = "php-composer";
pub const HUGO_TOOL: &str = "hugo";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportedVersionInfo {
    pub supported_versions: Vec<String>,
    pub default_version: String,
}

impl SupportedVersionInfo {
    pub fn new<I, S>(versions: I, default_version: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            supported_versions: versions.into_iter().map(Into::into).collect(),
            default_version: default_version.into(),
        }
    }

    pub fn contains(&self, version: &str) -> bool {
        self.supported_versions.iter().any(|v| v == version)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionCatalog {
    tools: BTreeMap<String, SupportedVersionInfo>,
}

impl VersionCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Versions shipped with the default build image.
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        catalog.insert(
            NODE_TOOL,
            SupportedVersionInfo::new(
                [
                    "8.17.0", "10.24.1", "12.22.12", "14.21.3", "16.20.2", "18.17.1", "20.9.0",
                ],
                "18.17.1",
            ),
        );
        catalog.insert(
            PHP_TOOL,
            SupportedVersionInfo::new(
                [
                    "7.3.33", "7.4.33", "8.0.30", "8.1.25", "8.2.12", "8.3.0RC5", "8.3.0RC6",
                ],
                "8.2.12",
            ),
        );
        catalog.insert(
            PHP_COMPOSER_TOOL,
            SupportedVersionInfo::new(["1.10.26", "2.0.8", "2.2.21", "2.6.5"], "2.6.5"),
        );
        catalog.insert(
            HUGO_TOOL,
            SupportedVersionInfo::new(["0.81.0", "0.92.2", "0.111.3", "0.119.0"], "0.119.0"),
        );
        catalog
    }

    /// Load a catalog from a `.yaml`/`.yml` or `.toml` file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read version catalog {}", path.display()))?;

        let catalog = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml_str(&content),
            Some("toml") => Self::from_toml_str(&content),
            other => bail!(
                "Unsupported version catalog format {:?} for {}",
                other,
                path.display()
            ),
        }?;

        catalog.validate()?;
        Ok(catalog)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).context("Failed to parse YAML version catalog")
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse TOML version catalog")
    }

    pub fn insert(&mut self, tool: impl Into<String>, info: SupportedVersionInfo) {
        self.tools.insert(tool.into(), info);
    }

    pub fn get(&self, tool: &str) -> Result<&SupportedVersionInfo, BuildError> {
        self.tools
            .get(tool)
            .ok_or_else(|| BuildError::MissingVersionInfo(tool.to_string()))
    }

    pub fn tools(&self) -> impl Iterator<Item = &str> {
        self.tools.keys().map(String::as_str)
    }

    /// Every default version must itself be supported.
    pub fn validate(&self) -> Result<()> {
        for (tool, info) in &self.tools {
            if info.supported_versions.is_empty() {
                bail!("Tool '{}' declares no supported versions", tool);
            }
            if !info.contains(&info.default_version) {
                bail!(
                    "Default version '{}' of '{}' is not in its supported set",
                    info.default_version,
                    tool
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_builtin_catalog_is_valid() {
        let catalog = VersionCatalog::builtin();
        catalog.validate().unwrap();

        let tools: Vec<&str> = catalog.tools().collect();
        assert_eq!(tools, vec!["hugo", "nodejs", "php", "php-composer"]);
    }

    #[test]
    fn test_get_missing_tool() {
        let catalog = VersionCatalog::new();
        let err = catalog.get("ruby").unwrap_err();
        assert!(matches!(err, BuildError::MissingVersionInfo(ref t) if t == "ruby"));
    }

    #[test]
    fn test_from_yaml_str() {
        let catalog = VersionCatalog::from_yaml_str(
            r#"
nodejs:
  supported_versions: ["16.20.2", "18.17.1"]
  default_version: "18.17.1"
"#,
        )
        .unwrap();

        let node = catalog.get(NODE_TOOL).unwrap();
        assert_eq!(node.default_version, "18.17.1");
        assert!(node.contains("16.20.2"));
    }

    #[test]
    fn test_from_path_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("versions.toml");
        fs::write(
            &path,
            r#"
[hugo]
supported_versions = ["0.119.0"]
default_version = "0.119.0"
"#,
        )
        .unwrap();

        let catalog = VersionCatalog::from_path(&path).unwrap();
        assert_eq!(catalog.get(HUGO_TOOL).unwrap().default_version, "0.119.0");
    }

    #[test]
    fn test_from_path_rejects_default_outside_set() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("versions.yaml");
        fs::write(
            &path,
            "php:\n  supported_versions: ['8.1.25']\n  default_version: '8.2.12'\n",
        )
        .unwrap();

        let err = VersionCatalog::from_path(&path).unwrap_err();
        assert!(err.to_string().contains("8.2.12"));
    }

    #[test]
    fn test_from_path_unknown_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("versions.ini");
        fs::write(&path, "").unwrap();

        assert!(VersionCatalog::from_path(&path).is_err());
    }
}
