//! Programming platforms.
//!
//! A [`ProgrammingPlatform`] ties one detector, its installers and its build
//! template together. Every call is stateless: the facade receives the build
//! context and the values produced by earlier steps, and returns new values.
//!
//! Pipeline, driven by [`crate::generator::BuildScriptGenerator`]:
//! `is_enabled` -> `detect` -> `resolve_versions` -> `installer_snippet` ->
//! `build_snippet` -> `tools_to_path` -> directory exclusions.

mod hugo;
pub mod installer;
mod node;
mod php;
mod registry;

pub use hugo::HugoPlatform;
pub use installer::{plan_installs, InstallerInstruction, PlatformInstaller, ToolInstaller};
pub use node::NodePlatform;
pub use php::PhpPlatform;
pub use registry::PlatformRegistry;

use crate::config::GeneratorConfig;
use crate::detector::{
    DetectorContext, HugoDetectionResult, NodeDetectionResult, PhpDetectionResult,
    PlatformDetectionResult,
};
use crate::error::BuildError;
use crate::platform_id::PlatformId;
use crate::repo::{LocalSourceRepo, SourceRepo};
use crate::version::VersionCatalog;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Inputs shared by every platform during one build.
#[derive(Clone)]
pub struct BuildContext {
    pub repo: Arc<dyn SourceRepo>,
    pub config: GeneratorConfig,
    pub catalog: VersionCatalog,
}

impl BuildContext {
    pub fn new(repo: Arc<dyn SourceRepo>, config: GeneratorConfig, catalog: VersionCatalog) -> Self {
        Self {
            repo,
            config,
            catalog,
        }
    }

    /// Context over `config.source_dir` on the real file system, with the
    /// catalog named by the configuration.
    pub fn from_config(config: GeneratorConfig) -> Result<Self, BuildError> {
        let catalog = config.load_catalog()?;
        let repo = Arc::new(LocalSourceRepo::new(config.source_dir.clone()));
        Ok(Self::new(repo, config, catalog))
    }

    pub fn detector_context(&self) -> DetectorContext {
        DetectorContext::new(self.repo.clone(), self.config.detector_options())
    }
}

impl std::fmt::Debug for BuildContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildContext")
            .field("root", &self.repo.root_path())
            .field("config", &self.config)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedNodeConfig {
    pub node_version: String,
    pub detection: NodeDetectionResult,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedPhpConfig {
    pub php_version: String,
    pub composer_version: String,
    pub detection: PhpDetectionResult,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedHugoConfig {
    pub hugo_version: String,
    pub detection: HugoDetectionResult,
}

/// A detection result with every version replaced by a supported one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "platform")]
pub enum ResolvedPlatformConfig {
    #[serde(rename = "nodejs")]
    Node(ResolvedNodeConfig),
    #[serde(rename = "php")]
    Php(ResolvedPhpConfig),
    #[serde(rename = "hugo")]
    Hugo(ResolvedHugoConfig),
}

impl ResolvedPlatformConfig {
    pub fn platform(&self) -> PlatformId {
        match self {
            Self::Node(_) => PlatformId::Node,
            Self::Php(_) => PlatformId::Php,
            Self::Hugo(_) => PlatformId::Hugo,
        }
    }

    pub fn primary_version(&self) -> &str {
        match self {
            Self::Node(c) => &c.node_version,
            Self::Php(c) => &c.php_version,
            Self::Hugo(c) => &c.hugo_version,
        }
    }
}

/// One platform's contribution to the build script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildScriptSnippet {
    pub platform: PlatformId,
    pub bash_text: String,
    pub manifest_properties: BTreeMap<String, String>,
    pub warnings: Vec<String>,
}

/// Error for a facade handed a value produced by another platform.
pub fn result_type_mismatch(expected: PlatformId, actual: PlatformId) -> BuildError {
    BuildError::ResultTypeMismatch {
        platform: expected.key().to_string(),
        expected: expected.key(),
        actual: actual.key(),
    }
}

pub trait ProgrammingPlatform: Send + Sync {
    fn id(&self) -> PlatformId;

    fn name(&self) -> &'static str {
        self.id().name()
    }

    fn is_enabled(&self, context: &BuildContext) -> bool {
        context.config.is_platform_enabled(self.id())
    }

    fn is_enabled_for_multi_platform_build(&self, _context: &BuildContext) -> bool {
        true
    }

    fn detect(&self, context: &BuildContext) -> Result<Option<PlatformDetectionResult>, BuildError>;

    /// Bare result used when the platform is forced but not detected.
    fn undetected_result(&self) -> PlatformDetectionResult;

    fn resolve_versions(
        &self,
        context: &BuildContext,
        detection: &PlatformDetectionResult,
    ) -> Result<ResolvedPlatformConfig, BuildError>;

    /// Installers in the order their fragments appear in the script.
    fn installers(&self) -> &[Box<dyn ToolInstaller>];

    /// Catalog tool name and resolved version for every installer.
    fn tool_versions(
        &self,
        resolved: &ResolvedPlatformConfig,
    ) -> Result<Vec<(&'static str, String)>, BuildError>;

    fn installer_instructions(
        &self,
        context: &BuildContext,
        resolved: &ResolvedPlatformConfig,
    ) -> Result<Vec<InstallerInstruction>, BuildError> {
        if !context.config.enable_dynamic_install {
            return Ok(Vec::new());
        }
        plan_installs(self.installers(), &self.tool_versions(resolved)?)
    }

    /// Concatenated installer fragments, or `None` when dynamic install is
    /// off or every tool is already installed.
    fn installer_snippet(
        &self,
        context: &BuildContext,
        resolved: &ResolvedPlatformConfig,
    ) -> Result<Option<String>, BuildError> {
        let snippets: Vec<String> = self
            .installer_instructions(context, resolved)?
            .into_iter()
            .filter_map(|i| i.snippet_text)
            .collect();

        if snippets.is_empty() {
            Ok(None)
        } else {
            Ok(Some(snippets.join("\n")))
        }
    }

    fn build_snippet(
        &self,
        context: &BuildContext,
        resolved: &ResolvedPlatformConfig,
    ) -> Result<BuildScriptSnippet, BuildError>;

    /// Executable name to version, for the path-setup step.
    fn tools_to_path(
        &self,
        resolved: &ResolvedPlatformConfig,
    ) -> Result<BTreeMap<String, String>, BuildError>;

    fn dirs_to_exclude_from_intermediate(&self, _context: &BuildContext) -> Vec<String> {
        Vec::new()
    }

    fn dirs_to_exclude_from_output(&self, _context: &BuildContext) -> Vec<String> {
        Vec::new()
    }

    /// Manifest keys this platform owns. Build snippets write no others.
    fn manifest_keys(&self) -> &'static [&'static str];
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::fs::MockFileSystem;
    use crate::template::{TemplateRenderer, TeraRenderer};
    use std::path::PathBuf;

    pub fn renderer() -> Arc<dyn TemplateRenderer> {
        Arc::new(TeraRenderer::new().unwrap())
    }

    /// Fixed configuration that ignores the process environment.
    pub fn config() -> GeneratorConfig {
        GeneratorConfig {
            source_dir: PathBuf::from("/app"),
            output_dir: None,
            intermediate_dir: None,
            manifest_dir: None,
            platform_name: None,
            platform_version: None,
            node_version: None,
            php_version: None,
            php_composer_version: None,
            hugo_version: None,
            enable_node_build: true,
            enable_php_build: true,
            enable_hugo_build: true,
            enable_multi_platform_build: false,
            enable_dynamic_install: false,
            continue_on_platform_failure: false,
            disable_framework_detection: false,
            dynamic_install_root: PathBuf::from("/tmp/peelkit/platforms"),
            built_in_roots: ["nodejs", "php", "php-composer", "hugo"]
                .into_iter()
                .map(|tool| (tool.to_string(), PathBuf::from("/opt").join(tool)))
                .collect(),
            pre_build_command: None,
            post_build_command: None,
            operation_id: Some("test-operation".to_string()),
            versions_file: None,
            log_level: "warn".to_string(),
        }
    }

    pub fn context(files: &[(&str, &str)], config: GeneratorConfig) -> BuildContext {
        let fs = MockFileSystem::with_root(PathBuf::from("/app"));
        for (path, content) in files {
            fs.add_file(path, content);
        }
        let repo = Arc::new(LocalSourceRepo::with_fs("/app", Arc::new(fs)));
        BuildContext::new(repo, config, VersionCatalog::builtin())
    }

    /// Host file system with nothing installed.
    pub fn host_fs() -> Arc<MockFileSystem> {
        Arc::new(MockFileSystem::new())
    }
}
