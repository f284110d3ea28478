//! Build script orchestration.
//!
//! [`BuildScriptGenerator::generate`] picks the participating platforms,
//! runs each facade over the same repository snapshot and assembles the
//! final script and manifest in platform priority order.

use crate::config::GeneratorConfig;
use crate::detector::PlatformDetectionResult;
use crate::error::BuildError;
use crate::fs::RealFileSystem;
use crate::manifest::{keys, BuildManifest, GENERATOR_OWNER};
use crate::platform::{
    BuildContext, BuildScriptSnippet, PlatformRegistry, ProgrammingPlatform, ResolvedPlatformConfig,
};
use crate::template::{render_with, TemplateId, TemplateRenderer, TeraRenderer};
use anyhow::{Context, Result};
use serde::Serialize;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Script, manifest and diagnostics of one generation run.
#[derive(Debug, Clone)]
pub struct GeneratedBuild {
    pub script: String,
    pub manifest: BuildManifest,
    /// Tool name to version for the path-setup step.
    pub tools: BTreeMap<String, String>,
    /// Participating platforms in priority order.
    pub platforms: Vec<ResolvedPlatformConfig>,
    pub warnings: Vec<String>,
}

impl GeneratedBuild {
    /// Write the script (executable on Unix) and the manifest into
    /// `manifest_dir`. Returns the manifest path.
    pub fn write_to(&self, script_path: &Path, manifest_dir: &Path) -> Result<PathBuf> {
        if let Some(parent) = script_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        std::fs::write(script_path, &self.script)
            .with_context(|| format!("Failed to write build script {}", script_path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(script_path, std::fs::Permissions::from_mode(0o755))
                .with_context(|| format!("Failed to make {} executable", script_path.display()))?;
        }

        self.manifest.write_to_dir(manifest_dir)
    }
}

type Participants<'a> = Vec<(&'a dyn ProgrammingPlatform, PlatformDetectionResult)>;

/// Everything one platform contributed.
struct PlatformOutcome {
    resolved: ResolvedPlatformConfig,
    installer_snippet: Option<String>,
    snippet: BuildScriptSnippet,
    tools: BTreeMap<String, String>,
    intermediate_excludes: Vec<String>,
    output_excludes: Vec<String>,
    warnings: Vec<String>,
}

#[derive(Serialize)]
struct SnippetData<'a> {
    platform: &'static str,
    text: &'a str,
}

#[derive(Serialize)]
struct BaseScriptData<'a> {
    source_dir: String,
    output_dir: String,
    intermediate_dir: Option<String>,
    pre_build_command: Option<&'a str>,
    post_build_command: Option<&'a str>,
    installer_snippets: String,
    tools_to_path: String,
    intermediate_excludes: Vec<&'a str>,
    output_excludes: Vec<&'a str>,
    build_snippets: Vec<SnippetData<'a>>,
}

pub struct BuildScriptGenerator {
    registry: PlatformRegistry,
    renderer: Arc<dyn TemplateRenderer>,
}

impl BuildScriptGenerator {
    pub fn new(registry: PlatformRegistry, renderer: Arc<dyn TemplateRenderer>) -> Self {
        Self { registry, renderer }
    }

    /// Default platforms over the host file system with the embedded templates.
    pub fn from_config(config: &GeneratorConfig) -> Result<Self, BuildError> {
        let renderer: Arc<dyn TemplateRenderer> = Arc::new(TeraRenderer::new()?);
        let registry =
            PlatformRegistry::with_defaults(config, Arc::new(RealFileSystem::new()), renderer.clone());
        Ok(Self::new(registry, renderer))
    }

    pub fn registry(&self) -> &PlatformRegistry {
        &self.registry
    }

    /// Detection results of every enabled platform, in priority order.
    pub fn detect(&self, context: &BuildContext) -> Result<Vec<PlatformDetectionResult>, BuildError> {
        let mut results = Vec::new();
        for platform in self.registry.iter() {
            if !platform.is_enabled(context) {
                debug!(platform = platform.id().key(), "Platform disabled, skipping detection");
                continue;
            }
            match platform.detect(context)? {
                Some(result) => {
                    info!(platform = platform.id().key(), "Detected platform");
                    results.push(result);
                }
                None => debug!(platform = platform.id().key(), "Platform not detected"),
            }
        }
        Ok(results)
    }

    /// Run every participating platform and assemble the build.
    ///
    /// # Errors
    ///
    /// `PlatformNotDetected` when nothing matches, `UnknownPlatform` for a
    /// bad forced name, and the first platform failure unless
    /// `continue_on_platform_failure` lets other platforms carry on.
    /// Internal contract violations always abort.
    pub fn generate(&self, context: &BuildContext) -> Result<GeneratedBuild, BuildError> {
        let (context, participants) = self.select_participants(context)?;
        let context = context.as_ref();

        let mut outcomes = Vec::with_capacity(participants.len());
        let mut first_failure = None;

        for (platform, detection) in participants {
            match self.run_platform(platform, context, &detection) {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) if e.is_internal() => return Err(e),
                Err(e) if context.config.continue_on_platform_failure => {
                    error!(platform = platform.id().key(), error = %e, "Platform failed, continuing without it");
                    first_failure.get_or_insert(e);
                }
                Err(e) => {
                    error!(platform = platform.id().key(), error = %e, "Platform failed");
                    return Err(e);
                }
            }
        }

        if outcomes.is_empty() {
            return Err(first_failure.unwrap_or_else(|| BuildError::PlatformNotDetected {
                path: context.repo.root_path().to_path_buf(),
            }));
        }

        let manifest = self.build_manifest(context, &outcomes)?;
        let script = self.render_script(&context.config, &outcomes)?;

        let mut tools = BTreeMap::new();
        let mut warnings = Vec::new();
        let mut platforms = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            tools.extend(outcome.tools);
            warnings.extend(outcome.warnings);
            platforms.push(outcome.resolved);
        }

        info!(platforms = platforms.len(), tools = tools.len(), "Generated build script");
        Ok(GeneratedBuild {
            script,
            manifest,
            tools,
            platforms,
            warnings,
        })
    }

    /// Forced platform or detected platforms, with the context the facades
    /// should see.
    fn select_participants<'a, 'c>(
        &'a self,
        context: &'c BuildContext,
    ) -> Result<(Cow<'c, BuildContext>, Participants<'a>), BuildError> {
        if let Some(name) = context.config.platform_name.as_deref() {
            let platform = self.registry.by_name(name)?;
            let context = match context.config.platform_version.as_deref() {
                Some(version) => {
                    let mut forced = context.clone();
                    forced.config.set_explicit_version(platform.id().key(), version);
                    Cow::Owned(forced)
                }
                None => Cow::Borrowed(context),
            };

            let detection = match platform.detect(&context)? {
                Some(detection) => detection,
                None => {
                    debug!(platform = platform.id().key(), "Forced platform not detected, using bare result");
                    platform.undetected_result()
                }
            };
            info!(platform = platform.id().key(), "Using forced platform");
            return Ok((context, vec![(platform, detection)]));
        }

        let multi = context.config.enable_multi_platform_build;
        let mut participants = Vec::new();
        for platform in self.registry.iter() {
            if !platform.is_enabled(context) {
                debug!(platform = platform.id().key(), "Platform disabled, skipping detection");
                continue;
            }
            if multi && !platform.is_enabled_for_multi_platform_build(context) {
                debug!(platform = platform.id().key(), "Platform excluded from multi-platform builds");
                continue;
            }

            let Some(detection) = platform.detect(context)? else {
                debug!(platform = platform.id().key(), "Platform not detected");
                continue;
            };
            info!(platform = platform.id().key(), "Detected platform");
            participants.push((platform, detection));

            if !multi {
                break;
            }
        }

        if participants.is_empty() {
            return Err(BuildError::PlatformNotDetected {
                path: context.repo.root_path().to_path_buf(),
            });
        }
        Ok((Cow::Borrowed(context), participants))
    }

    fn run_platform(
        &self,
        platform: &dyn ProgrammingPlatform,
        context: &BuildContext,
        detection: &PlatformDetectionResult,
    ) -> Result<PlatformOutcome, BuildError> {
        let resolved = platform.resolve_versions(context, detection)?;
        let installer_snippet = platform.installer_snippet(context, &resolved)?;
        let snippet = platform.build_snippet(context, &resolved)?;
        let tools = platform.tools_to_path(&resolved)?;

        // A snippet may repeat what detection already reported.
        let mut warnings = detection.warnings().to_vec();
        for warning in &snippet.warnings {
            if !warnings.contains(warning) {
                warnings.push(warning.clone());
            }
        }

        Ok(PlatformOutcome {
            installer_snippet,
            tools,
            intermediate_excludes: platform.dirs_to_exclude_from_intermediate(context),
            output_excludes: platform.dirs_to_exclude_from_output(context),
            warnings,
            snippet,
            resolved,
        })
    }

    /// Generator keys first, then each platform's own keys in priority order.
    fn build_manifest(
        &self,
        context: &BuildContext,
        outcomes: &[PlatformOutcome],
    ) -> Result<BuildManifest, BuildError> {
        let mut manifest = BuildManifest::new();

        let operation_id = context
            .config
            .operation_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let platform_names: Vec<&str> = outcomes.iter().map(|o| o.resolved.platform().key()).collect();

        manifest.insert(GENERATOR_OWNER, keys::OPERATION_ID, operation_id)?;
        manifest.insert(GENERATOR_OWNER, keys::PLATFORM_NAME, platform_names.join(","))?;
        manifest.insert(
            GENERATOR_OWNER,
            keys::SOURCE_DIRECTORY_IN_BUILD_CONTAINER,
            context.config.source_dir.display().to_string(),
        )?;

        for outcome in outcomes {
            let id = outcome.resolved.platform();
            let owned = self
                .registry
                .get(id)
                .map(|p| p.manifest_keys())
                .unwrap_or_default();

            for key in outcome.snippet.manifest_properties.keys() {
                if !owned.contains(&key.as_str()) {
                    return Err(BuildError::ManifestKeyCollision {
                        key: key.clone(),
                        owner: self.key_owner(key),
                        intruder: id.key().to_string(),
                    });
                }
            }
            manifest.extend(id.key(), &outcome.snippet.manifest_properties)?;
        }

        Ok(manifest)
    }

    fn key_owner(&self, key: &str) -> String {
        if keys::COMMON.contains(&key) {
            return GENERATOR_OWNER.to_string();
        }
        self.registry
            .iter()
            .find(|p| p.manifest_keys().contains(&key))
            .map(|p| p.id().key().to_string())
            .unwrap_or_else(|| "nobody".to_string())
    }

    fn render_script(
        &self,
        config: &GeneratorConfig,
        outcomes: &[PlatformOutcome],
    ) -> Result<String, BuildError> {
        let source_dir = config.source_dir.display().to_string();
        let output_dir = config
            .output_dir
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| source_dir.clone());

        let installer_snippets: Vec<&str> = outcomes
            .iter()
            .filter_map(|o| o.installer_snippet.as_deref())
            .collect();

        let tools_to_path: Vec<String> = outcomes
            .iter()
            .flat_map(|o| o.tools.iter())
            .map(|(tool, version)| format!("{}={}", tool, version))
            .collect();

        let data = BaseScriptData {
            source_dir,
            output_dir,
            intermediate_dir: config
                .intermediate_dir
                .as_ref()
                .map(|p| p.display().to_string()),
            pre_build_command: config.pre_build_command.as_deref(),
            post_build_command: config.post_build_command.as_deref(),
            installer_snippets: installer_snippets.join("\n"),
            tools_to_path: tools_to_path.join(" "),
            intermediate_excludes: unique(outcomes.iter().flat_map(|o| &o.intermediate_excludes)),
            output_excludes: unique(outcomes.iter().flat_map(|o| &o.output_excludes)),
            build_snippets: outcomes
                .iter()
                .map(|o| SnippetData {
                    platform: o.snippet.platform.key(),
                    text: &o.snippet.bash_text,
                })
                .collect(),
        };

        render_with(self.renderer.as_ref(), TemplateId::BaseBuildScript, &data)
    }
}

/// First occurrence of every value, in order.
fn unique<'a>(values: impl Iterator<Item = &'a String>) -> Vec<&'a str> {
    let mut seen = Vec::new();
    for value in values {
        if !seen.contains(&value.as_str()) {
            seen.push(value.as_str());
        }
    }
    seen
}
