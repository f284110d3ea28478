//! Configuration for a build-script generation run
//!
//! [`GeneratorConfig`] is a plain value threaded through every call; nothing
//! reads process-wide state after it has been constructed.
//! `GeneratorConfig::default()` reads `PEELKIT_*` environment variables and
//! falls back to the defaults below.
//!
//! # Environment Variables
//!
//! - `PEELKIT_SOURCE_DIR`: application source directory - default: "."
//! - `PEELKIT_OUTPUT_DIR` / `PEELKIT_INTERMEDIATE_DIR` / `PEELKIT_MANIFEST_DIR`
//! - `PEELKIT_PLATFORM` / `PEELKIT_PLATFORM_VERSION`: force a platform and version
//! - `PEELKIT_NODE_VERSION`, `PEELKIT_PHP_VERSION`, `PEELKIT_PHP_COMPOSER_VERSION`,
//!   `PEELKIT_HUGO_VERSION`: explicit per-tool versions
//! - `PEELKIT_DISABLE_NODE_BUILD`, `PEELKIT_DISABLE_PHP_BUILD`, `PEELKIT_DISABLE_HUGO_BUILD`
//! - `PEELKIT_ENABLE_MULTIPLATFORM_BUILD` - default: "false"
//! - `PEELKIT_ENABLE_DYNAMIC_INSTALL` - default: "false"
//! - `PEELKIT_CONTINUE_ON_PLATFORM_FAILURE` - default: "false"
//! - `PEELKIT_DISABLE_FRAMEWORK_DETECTION` - default: "false"
//! - `PEELKIT_DYNAMIC_INSTALL_ROOT` - default: "/tmp/peelkit/platforms"
//! - `PEELKIT_NODE_ROOT`, `PEELKIT_PHP_ROOT`, `PEELKIT_PHP_COMPOSER_ROOT`, `PEELKIT_HUGO_ROOT`:
//!   built-in install roots - default: "/opt/<tool>"
//! - `PEELKIT_PRE_BUILD_COMMAND` / `PEELKIT_POST_BUILD_COMMAND`
//! - `PEELKIT_OPERATION_ID`: id recorded in the manifest - default: random UUID
//! - `PEELKIT_VERSIONS_FILE`: YAML or TOML supported-version catalog
//! - `PEELKIT_LOG_LEVEL` - default: "warn"

use crate::detector::DetectorOptions;
use crate::platform_id::PlatformId;
use crate::util::logging::try_parse_level;
use crate::version::{VersionCatalog, HUGO_TOOL, NODE_TOOL, PHP_COMPOSER_TOOL, PHP_TOOL};
use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

const DEFAULT_LOG_LEVEL: &str = "warn";
const DEFAULT_DYNAMIC_INSTALL_ROOT: &str = "/tmp/peelkit/platforms";
const DEFAULT_BUILT_IN_ROOT: &str = "/opt";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Valid options: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("{name} must be an absolute path, got '{}'", .path.display())]
    RelativeInstallRoot { name: String, path: PathBuf },

    #[error("A platform version was given without a platform name")]
    VersionWithoutPlatform,

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    #[error("Failed to load version catalog: {0}")]
    Catalog(String),
}

#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub source_dir: PathBuf,
    pub output_dir: Option<PathBuf>,
    pub intermediate_dir: Option<PathBuf>,
    pub manifest_dir: Option<PathBuf>,

    /// Run only this platform, skipping detection of the others.
    pub platform_name: Option<String>,
    /// Explicit version for the forced platform's primary tool.
    pub platform_version: Option<String>,

    pub node_version: Option<String>,
    pub php_version: Option<String>,
    pub php_composer_version: Option<String>,
    pub hugo_version: Option<String>,

    pub enable_node_build: bool,
    pub enable_php_build: bool,
    pub enable_hugo_build: bool,
    pub enable_multi_platform_build: bool,
    pub enable_dynamic_install: bool,
    pub continue_on_platform_failure: bool,
    pub disable_framework_detection: bool,

    pub dynamic_install_root: PathBuf,
    /// Per-tool directories holding versions baked into the image.
    pub built_in_roots: BTreeMap<String, PathBuf>,

    pub pre_build_command: Option<String>,
    pub post_build_command: Option<String>,

    pub operation_id: Option<String>,
    pub versions_file: Option<PathBuf>,
    pub log_level: String,
}

fn env_string(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_flag(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .and_then(|v| match v.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        })
        .unwrap_or(default)
}

fn default_built_in_roots() -> BTreeMap<String, PathBuf> {
    [
        (NODE_TOOL, "PEELKIT_NODE_ROOT"),
        (PHP_TOOL, "PEELKIT_PHP_ROOT"),
        (PHP_COMPOSER_TOOL, "PEELKIT_PHP_COMPOSER_ROOT"),
        (HUGO_TOOL, "PEELKIT_HUGO_ROOT"),
    ]
    .into_iter()
    .map(|(tool, var)| {
        let root = env_string(var)
            .map(PathBuf::from)
            .unwrap_or_else(|| Path::new(DEFAULT_BUILT_IN_ROOT).join(tool));
        (tool.to_string(), root)
    })
    .collect()
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            source_dir: env_string("PEELKIT_SOURCE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
            output_dir: env_string("PEELKIT_OUTPUT_DIR").map(PathBuf::from),
            intermediate_dir: env_string("PEELKIT_INTERMEDIATE_DIR").map(PathBuf::from),
            manifest_dir: env_string("PEELKIT_MANIFEST_DIR").map(PathBuf::from),

            platform_name: env_string("PEELKIT_PLATFORM"),
            platform_version: env_string("PEELKIT_PLATFORM_VERSION"),

            node_version: env_string("PEELKIT_NODE_VERSION"),
            php_version: env_string("PEELKIT_PHP_VERSION"),
            php_composer_version: env_string("PEELKIT_PHP_COMPOSER_VERSION"),
            hugo_version: env_string("PEELKIT_HUGO_VERSION"),

            enable_node_build: !env_flag("PEELKIT_DISABLE_NODE_BUILD", false),
            enable_php_build: !env_flag("PEELKIT_DISABLE_PHP_BUILD", false),
            enable_hugo_build: !env_flag("PEELKIT_DISABLE_HUGO_BUILD", false),
            enable_multi_platform_build: env_flag("PEELKIT_ENABLE_MULTIPLATFORM_BUILD", false),
            enable_dynamic_install: env_flag("PEELKIT_ENABLE_DYNAMIC_INSTALL", false),
            continue_on_platform_failure: env_flag("PEELKIT_CONTINUE_ON_PLATFORM_FAILURE", false),
            disable_framework_detection: env_flag("PEELKIT_DISABLE_FRAMEWORK_DETECTION", false),

            dynamic_install_root: env_string("PEELKIT_DYNAMIC_INSTALL_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DYNAMIC_INSTALL_ROOT)),
            built_in_roots: default_built_in_roots(),

            pre_build_command: env_string("PEELKIT_PRE_BUILD_COMMAND"),
            post_build_command: env_string("PEELKIT_POST_BUILD_COMMAND"),

            operation_id: env_string("PEELKIT_OPERATION_ID"),
            versions_file: env_string("PEELKIT_VERSIONS_FILE").map(PathBuf::from),
            log_level: env::var("PEELKIT_LOG_LEVEL")
                .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string())
                .to_lowercase(),
        }
    }
}

impl GeneratorConfig {
    /// Configuration for `source_dir` with environment defaults for the rest.
    pub fn for_source(source_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            ..Self::default()
        }
    }

    /// # Errors
    ///
    /// Returns `ConfigError` for an unknown log level, relative install
    /// roots, an empty source directory, or a platform version without a
    /// platform name.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.source_dir.as_os_str().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "Source directory cannot be empty".to_string(),
            ));
        }

        if try_parse_level(&self.log_level).is_none() {
            return Err(ConfigError::InvalidLogLevel(self.log_level.clone()));
        }

        if self.platform_version.is_some() && self.platform_name.is_none() {
            return Err(ConfigError::VersionWithoutPlatform);
        }

        if !self.dynamic_install_root.is_absolute() {
            return Err(ConfigError::RelativeInstallRoot {
                name: "dynamic_install_root".to_string(),
                path: self.dynamic_install_root.clone(),
            });
        }

        for (tool, root) in &self.built_in_roots {
            if !root.is_absolute() {
                return Err(ConfigError::RelativeInstallRoot {
                    name: format!("{} install root", tool),
                    path: root.clone(),
                });
            }
        }

        Ok(())
    }

    pub fn is_platform_enabled(&self, platform: PlatformId) -> bool {
        match platform {
            PlatformId::Node => self.enable_node_build,
            PlatformId::Php => self.enable_php_build,
            PlatformId::Hugo => self.enable_hugo_build,
        }
    }

    /// Caller-supplied version for `tool`, if any.
    pub fn explicit_version(&self, tool: &str) -> Option<&str> {
        match tool {
            NODE_TOOL => self.node_version.as_deref(),
            PHP_TOOL => self.php_version.as_deref(),
            PHP_COMPOSER_TOOL => self.php_composer_version.as_deref(),
            HUGO_TOOL => self.hugo_version.as_deref(),
            _ => None,
        }
    }

    /// Overrides the explicit version of `tool`. Unknown tools are ignored.
    pub fn set_explicit_version(&mut self, tool: &str, version: impl Into<String>) {
        let slot = match tool {
            NODE_TOOL => &mut self.node_version,
            PHP_TOOL => &mut self.php_version,
            PHP_COMPOSER_TOOL => &mut self.php_composer_version,
            HUGO_TOOL => &mut self.hugo_version,
            _ => return,
        };
        *slot = Some(version.into());
    }

    pub fn built_in_root(&self, tool: &str) -> PathBuf {
        self.built_in_roots
            .get(tool)
            .cloned()
            .unwrap_or_else(|| Path::new(DEFAULT_BUILT_IN_ROOT).join(tool))
    }

    pub fn detector_options(&self) -> DetectorOptions {
        DetectorOptions {
            disable_framework_detection: self.disable_framework_detection,
        }
    }

    /// The catalog named by `versions_file`, or the built-in one.
    pub fn load_catalog(&self) -> Result<VersionCatalog, ConfigError> {
        match &self.versions_file {
            Some(path) => {
                VersionCatalog::from_path(path).map_err(|e| ConfigError::Catalog(format!("{:#}", e)))
            }
            None => Ok(VersionCatalog::builtin()),
        }
    }

    pub fn to_display_map(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();

        map.insert(
            "source_dir".to_string(),
            self.source_dir.display().to_string(),
        );
        for (key, dir) in [
            ("output_dir", &self.output_dir),
            ("intermediate_dir", &self.intermediate_dir),
            ("manifest_dir", &self.manifest_dir),
        ] {
            if let Some(dir) = dir {
                map.insert(key.to_string(), dir.display().to_string());
            }
        }
        for (key, value) in [
            ("platform_name", &self.platform_name),
            ("platform_version", &self.platform_version),
            ("node_version", &self.node_version),
            ("php_version", &self.php_version),
            ("php_composer_version", &self.php_composer_version),
            ("hugo_version", &self.hugo_version),
            ("operation_id", &self.operation_id),
        ] {
            if let Some(value) = value {
                map.insert(key.to_string(), value.clone());
            }
        }
        for (key, flag) in [
            ("enable_node_build", self.enable_node_build),
            ("enable_php_build", self.enable_php_build),
            ("enable_hugo_build", self.enable_hugo_build),
            ("enable_multi_platform_build", self.enable_multi_platform_build),
            ("enable_dynamic_install", self.enable_dynamic_install),
            ("continue_on_platform_failure", self.continue_on_platform_failure),
            ("disable_framework_detection", self.disable_framework_detection),
        ] {
            map.insert(key.to_string(), flag.to_string());
        }
        map.insert(
            "dynamic_install_root".to_string(),
            self.dynamic_install_root.display().to_string(),
        );
        if let Some(ref file) = self.versions_file {
            map.insert("versions_file".to_string(), file.display().to_string());
        }
        map.insert("log_level".to_string(), self.log_level.clone());

        map
    }
}

impl fmt::Display for GeneratorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Peelkit Configuration:")?;
        for (key, value) in self.to_display_map() {
            writeln!(f, "  {}: {}", key, value)?;
        }
        Ok(())
    }
}
