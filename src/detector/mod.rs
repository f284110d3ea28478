//! Platform detection.
//!
//! A [`PlatformDetector`] inspects a [`SourceRepo`] and either recognises its
//! platform or returns `Ok(None)`. Malformed manifest content never fails
//! detection; it degrades to "no hint" and a recorded warning. Only I/O
//! failures from the repository propagate as errors.

mod hugo;
pub mod markers;
mod node;
mod php;

pub use hugo::{HugoDetector, HUGO_CONFIG_KEYS};
pub use node::{
    read_package_json, NodeDetector, DEPENDENCY_FRAMEWORKS, DEV_DEPENDENCY_FRAMEWORKS,
    PACKAGE_JSON, YARN_LOCK,
};
pub use php::{PhpDetector, COMPOSER_JSON};

use crate::platform_id::PlatformId;
use crate::repo::SourceRepo;
use anyhow::Result;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DetectorOptions {
    /// Skip framework and other secondary signal extraction.
    pub disable_framework_detection: bool,
}

/// Everything a detector may look at. Created once per build.
#[derive(Clone)]
pub struct DetectorContext {
    pub repo: Arc<dyn SourceRepo>,
    pub options: DetectorOptions,
}

impl DetectorContext {
    pub fn new(repo: Arc<dyn SourceRepo>, options: DetectorOptions) -> Self {
        Self { repo, options }
    }
}

impl std::fmt::Debug for DetectorContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetectorContext")
            .field("root", &self.repo.root_path())
            .field("options", &self.options)
            .finish()
    }
}

pub trait PlatformDetector: Send + Sync {
    fn platform(&self) -> PlatformId;

    fn detect(&self, context: &DetectorContext) -> Result<Option<PlatformDetectionResult>>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetectedFramework {
    pub name: String,
    /// Dependency version spec, empty when the framework is marker based.
    pub version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NodeDetectionResult {
    pub detected_version: Option<String>,
    pub app_directory: String,
    pub frameworks: Vec<DetectedFramework>,
    pub has_lerna_json: bool,
    pub has_lage_config: bool,
    pub has_yarn_lock: bool,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PhpDetectionResult {
    pub detected_version: Option<String>,
    pub app_directory: String,
    /// Composer version hint; repositories never declare one.
    pub composer_version: Option<String>,
    pub has_composer_json: bool,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HugoDetectionResult {
    pub detected_version: Option<String>,
    pub app_directory: String,
    /// Configuration file that identified the site.
    pub config_file: Option<PathBuf>,
    pub warnings: Vec<String>,
}

/// Detection outcome, one variant per platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "platform")]
pub enum PlatformDetectionResult {
    #[serde(rename = "nodejs")]
    Node(NodeDetectionResult),
    #[serde(rename = "php")]
    Php(PhpDetectionResult),
    #[serde(rename = "hugo")]
    Hugo(HugoDetectionResult),
}

impl PlatformDetectionResult {
    pub fn platform(&self) -> PlatformId {
        match self {
            Self::Node(_) => PlatformId::Node,
            Self::Php(_) => PlatformId::Php,
            Self::Hugo(_) => PlatformId::Hugo,
        }
    }

    pub fn detected_version(&self) -> Option<&str> {
        match self {
            Self::Node(r) => r.detected_version.as_deref(),
            Self::Php(r) => r.detected_version.as_deref(),
            Self::Hugo(r) => r.detected_version.as_deref(),
        }
    }

    pub fn app_directory(&self) -> &str {
        match self {
            Self::Node(r) => &r.app_directory,
            Self::Php(r) => &r.app_directory,
            Self::Hugo(r) => &r.app_directory,
        }
    }

    pub fn warnings(&self) -> &[String] {
        match self {
            Self::Node(r) => &r.warnings,
            Self::Php(r) => &r.warnings,
            Self::Hugo(r) => &r.warnings,
        }
    }
}

/// Run every detector in order and collect the hits.
pub fn detect_all(
    detectors: &[&dyn PlatformDetector],
    context: &DetectorContext,
) -> Result<Vec<PlatformDetectionResult>> {
    let mut results = Vec::new();
    for detector in detectors {
        if let Some(result) = detector.detect(context)? {
            results.push(result);
        }
    }
    Ok(results)
}
