//! Toolchain installers.
//!
//! An installer never downloads anything itself. It answers whether a
//! version is already on disk and otherwise renders the shell fragment that
//! the generated build script runs to fetch it.

use crate::config::GeneratorConfig;
use crate::error::BuildError;
use crate::fs::FileSystem;
use crate::template::{render_with, TemplateId, TemplateRenderer};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

#[cfg_attr(test, mockall::automock)]
pub trait ToolInstaller: Send + Sync {
    /// Catalog key of the tool, e.g. `php-composer`.
    fn tool_name(&self) -> &'static str;

    fn is_version_already_installed(&self, version: &str) -> bool;

    fn installer_script_snippet(&self, version: &str) -> Result<String, BuildError>;
}

/// Outcome of planning one tool's installation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallerInstruction {
    pub tool_name: String,
    pub version: String,
    pub already_installed: bool,
    pub snippet_text: Option<String>,
}

/// Installer that looks for `<built_in_dir>/<version>` and then
/// `<dynamic_root>/<tool>/<version>`.
pub struct PlatformInstaller {
    tool: &'static str,
    built_in_dir: PathBuf,
    dynamic_dir: PathBuf,
    fs: Arc<dyn FileSystem>,
    renderer: Arc<dyn TemplateRenderer>,
}

#[derive(Serialize)]
struct InstallerTemplateData<'a> {
    tool: &'a str,
    version: &'a str,
    install_dir: String,
}

impl PlatformInstaller {
    pub fn new(
        tool: &'static str,
        built_in_dir: impl Into<PathBuf>,
        dynamic_root: impl Into<PathBuf>,
        fs: Arc<dyn FileSystem>,
        renderer: Arc<dyn TemplateRenderer>,
    ) -> Self {
        Self {
            tool,
            built_in_dir: built_in_dir.into(),
            dynamic_dir: dynamic_root.into().join(tool),
            fs,
            renderer,
        }
    }

    /// Installer for `tool` using the roots in `config`.
    pub fn from_config(
        tool: &'static str,
        config: &GeneratorConfig,
        fs: Arc<dyn FileSystem>,
        renderer: Arc<dyn TemplateRenderer>,
    ) -> Self {
        Self::new(
            tool,
            config.built_in_root(tool),
            config.dynamic_install_root.clone(),
            fs,
            renderer,
        )
    }

    /// Where a dynamic install of `version` lands.
    pub fn install_dir(&self, version: &str) -> PathBuf {
        self.dynamic_dir.join(version)
    }
}

impl ToolInstaller for PlatformInstaller {
    fn tool_name(&self) -> &'static str {
        self.tool
    }

    fn is_version_already_installed(&self, version: &str) -> bool {
        let built_in = self.built_in_dir.join(version);
        if self.fs.is_dir(&built_in) {
            debug!(tool = self.tool, version, dir = %built_in.display(), "Version is built in");
            return true;
        }

        let dynamic = self.install_dir(version);
        if self.fs.is_dir(&dynamic) {
            debug!(tool = self.tool, version, dir = %dynamic.display(), "Version was installed dynamically");
            return true;
        }

        false
    }

    fn installer_script_snippet(&self, version: &str) -> Result<String, BuildError> {
        render_with(
            self.renderer.as_ref(),
            TemplateId::Installer,
            &InstallerTemplateData {
                tool: self.tool,
                version,
                install_dir: self.install_dir(version).display().to_string(),
            },
        )
    }
}

/// Plan installs for `tools` (tool name and resolved version) in order.
/// Snippets are only requested for versions that are not on disk.
pub fn plan_installs(
    installers: &[Box<dyn ToolInstaller>],
    tools: &[(&'static str, String)],
) -> Result<Vec<InstallerInstruction>, BuildError> {
    let mut instructions = Vec::with_capacity(installers.len());

    for installer in installers {
        let tool = installer.tool_name();
        let version = tools
            .iter()
            .find(|(name, _)| *name == tool)
            .map(|(_, version)| version.as_str())
            .ok_or_else(|| BuildError::MissingVersionInfo(tool.to_string()))?;

        let already_installed = installer.is_version_already_installed(version);
        let snippet_text = if already_installed {
            debug!(tool, version, "Already installed, skipping");
            None
        } else {
            debug!(tool, version, "Not installed, generating installer snippet");
            Some(installer.installer_script_snippet(version)?)
        };

        instructions.push(InstallerInstruction {
            tool_name: tool.to_string(),
            version: version.to_string(),
            already_installed,
            snippet_text,
        });
    }

    Ok(instructions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MockFileSystem;
    use crate::template::TeraRenderer;
    use mockall::predicate::eq;

    fn installer(fs: MockFileSystem) -> PlatformInstaller {
        PlatformInstaller::new(
            "php",
            "/opt/php",
            "/tmp/peelkit/platforms",
            Arc::new(fs),
            Arc::new(TeraRenderer::new().unwrap()),
        )
    }

    #[test]
    fn test_installed_under_built_in_root() {
        let fs = MockFileSystem::new();
        fs.add_dir("/opt/php/8.2.12");

        let installer = installer(fs);
        assert!(installer.is_version_already_installed("8.2.12"));
        assert!(!installer.is_version_already_installed("8.1.25"));
    }

    #[test]
    fn test_installed_under_dynamic_root() {
        let fs = MockFileSystem::new();
        fs.add_dir("/tmp/peelkit/platforms/php/8.1.25");

        assert!(installer(fs).is_version_already_installed("8.1.25"));
    }

    #[test]
    fn test_dynamic_root_is_namespaced_per_tool() {
        let fs = MockFileSystem::new();
        fs.add_dir("/tmp/peelkit/platforms/8.1.25");
        fs.add_dir("/tmp/peelkit/platforms/nodejs/8.1.25");

        assert!(!installer(fs).is_version_already_installed("8.1.25"));
    }

    #[test]
    fn test_file_named_like_version_is_not_an_install() {
        let fs = MockFileSystem::new();
        fs.add_file("/opt/php/8.2.12", "");

        assert!(!installer(fs).is_version_already_installed("8.2.12"));
    }

    #[test]
    fn test_snippet_targets_dynamic_dir() {
        let snippet = installer(MockFileSystem::new())
            .installer_script_snippet("8.1.25")
            .unwrap();
        assert!(snippet.contains("/tmp/peelkit/platforms/php/8.1.25"));
    }

    #[test]
    fn test_plan_skips_snippet_when_installed() {
        let mut php = MockToolInstaller::new();
        php.expect_tool_name().return_const("php");
        php.expect_is_version_already_installed()
            .with(eq("8.2.12"))
            .times(1)
            .return_const(true);
        php.expect_installer_script_snippet().times(0);

        let mut composer = MockToolInstaller::new();
        composer.expect_tool_name().return_const("php-composer");
        composer
            .expect_is_version_already_installed()
            .with(eq("2.6.5"))
            .return_const(false);
        composer
            .expect_installer_script_snippet()
            .with(eq("2.6.5"))
            .times(1)
            .returning(|v| Ok(format!("install composer {}", v)));

        let installers: Vec<Box<dyn ToolInstaller>> = vec![Box::new(php), Box::new(composer)];
        let plan = plan_installs(
            &installers,
            &[
                ("php", "8.2.12".to_string()),
                ("php-composer", "2.6.5".to_string()),
            ],
        )
        .unwrap();

        assert!(plan[0].already_installed);
        assert_eq!(plan[0].snippet_text, None);
        assert_eq!(plan[1].snippet_text.as_deref(), Some("install composer 2.6.5"));
    }

    #[test]
    fn test_plan_missing_version_is_internal_error() {
        let mut hugo = MockToolInstaller::new();
        hugo.expect_tool_name().return_const("hugo");
        hugo.expect_is_version_already_installed().times(0);

        let installers: Vec<Box<dyn ToolInstaller>> = vec![Box::new(hugo)];
        let err = plan_installs(&installers, &[]).unwrap_err();
        assert!(err.is_internal());
    }
}
