use super::{DetectorContext, HugoDetectionResult, PlatformDetectionResult, PlatformDetector};
use crate::platform_id::PlatformId;
use crate::repo::{SourceRepo, StructuredFormat};
use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Top-level keys that identify a Hugo site configuration.
pub const HUGO_CONFIG_KEYS: &[&str] = &[
    "archetypeDir",
    "baseURL",
    "contentDir",
    "languageCode",
    "layoutDir",
    "staticDir",
    "title",
    "theme",
];

const ROOT_CONFIG_FILES: &[&str] = &["config.toml", "config.yml", "config.yaml", "config.json"];
const CONFIG_DIR: &str = "config";
const CONFIG_DIR_PATTERNS: &[&str] = &["*.toml", "*.yaml", "*.yml", "*.json"];

#[derive(Debug, Default)]
pub struct HugoDetector;

impl HugoDetector {
    pub fn new() -> Self {
        Self
    }

    fn is_hugo_config(&self, repo: &dyn SourceRepo, path: &Path) -> Result<bool> {
        let Some(format) = StructuredFormat::from_path(path) else {
            return Ok(false);
        };
        let path_str = path.to_string_lossy();
        let parsed = repo.parse_structured(&path_str, format)?;

        if let Some(warning) = parsed.warning() {
            debug!("{}", warning);
            return Ok(false);
        }

        Ok(parsed.top_level_keys().iter().any(|key| {
            HUGO_CONFIG_KEYS
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(key))
        }))
    }

    fn find_config(&self, repo: &dyn SourceRepo) -> Result<Option<PathBuf>> {
        for name in ROOT_CONFIG_FILES {
            let path = Path::new(name);
            if repo.file_exists(name) && self.is_hugo_config(repo, path)? {
                return Ok(Some(path.to_path_buf()));
            }
        }

        if !repo.dir_exists(CONFIG_DIR) {
            return Ok(None);
        }

        for pattern in CONFIG_DIR_PATTERNS {
            for path in repo.enumerate_files(pattern, true, Some(CONFIG_DIR))? {
                if self.is_hugo_config(repo, &path)? {
                    return Ok(Some(path));
                }
            }
        }

        Ok(None)
    }
}

impl PlatformDetector for HugoDetector {
    fn platform(&self) -> PlatformId {
        PlatformId::Hugo
    }

    fn detect(&self, context: &DetectorContext) -> Result<Option<PlatformDetectionResult>> {
        match self.find_config(context.repo.as_ref())? {
            Some(config_file) => {
                debug!(config = %config_file.display(), "Found Hugo configuration");
                Ok(Some(PlatformDetectionResult::Hugo(HugoDetectionResult {
                    detected_version: None,
                    app_directory: String::new(),
                    config_file: Some(config_file),
                    warnings: Vec::new(),
                })))
            }
            None => {
                debug!("No Hugo configuration found");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::test_support::context;

    fn detect(files: &[(&str, &str)]) -> Option<PathBuf> {
        match HugoDetector::new().detect(&context(files)).unwrap() {
            Some(PlatformDetectionResult::Hugo(result)) => result.config_file,
            Some(other) => panic!("unexpected result {:?}", other),
            None => None,
        }
    }

    #[test]
    fn test_nested_yaml_with_allowed_key() {
        let found = detect(&[("config/subdir/site.yaml", "baseURL: https://example.org/\n")]);
        assert_eq!(found, Some(PathBuf::from("config/subdir/site.yaml")));
    }

    #[test]
    fn test_nested_yaml_with_unrelated_key() {
        assert!(detect(&[("config/subdir/site.yaml", "unrelatedKey: 1\n")]).is_none());
    }

    #[test]
    fn test_keys_compare_case_insensitively() {
        let found = detect(&[("config.toml", "BASEURL = '/'\n")]);
        assert_eq!(found, Some(PathBuf::from("config.toml")));
    }

    #[test]
    fn test_root_precedence_toml_before_yaml() {
        let found = detect(&[
            ("config.yaml", "title: Blog\n"),
            ("config.toml", "title = 'Blog'\n"),
        ]);
        assert_eq!(found, Some(PathBuf::from("config.toml")));
    }

    #[test]
    fn test_root_file_without_keys_falls_through_to_config_dir() {
        let found = detect(&[
            ("config.json", r#"{"name": "not hugo"}"#),
            ("config/_default/config.json", r#"{"theme": "ananke"}"#),
        ]);
        assert_eq!(found, Some(PathBuf::from("config/_default/config.json")));
    }

    #[test]
    fn test_config_dir_toml_before_yaml() {
        let found = detect(&[
            ("config/b.yaml", "title: Blog\n"),
            ("config/z/a.toml", "theme = 'x'\n"),
        ]);
        assert_eq!(found, Some(PathBuf::from("config/z/a.toml")));
    }

    #[test]
    fn test_malformed_config_does_not_qualify() {
        assert!(detect(&[("config.toml", "title = \n[[")]).is_none());
    }

    #[test]
    fn test_non_mapping_yaml_does_not_qualify() {
        assert!(detect(&[("config.yaml", "- title\n- theme\n")]).is_none());
    }
}
