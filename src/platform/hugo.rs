use super::{
    result_type_mismatch, BuildContext, BuildScriptSnippet, PlatformInstaller,
    ProgrammingPlatform, ResolvedHugoConfig, ResolvedPlatformConfig, ToolInstaller,
};
use crate::config::GeneratorConfig;
use crate::detector::{HugoDetectionResult, HugoDetector, PlatformDetectionResult, PlatformDetector};
use crate::error::BuildError;
use crate::fs::FileSystem;
use crate::manifest::keys;
use crate::platform_id::PlatformId;
use crate::template::{render_with, TemplateId, TemplateRenderer};
use crate::version::{self, resolve_requested, PreviewPolicy, HUGO_TOOL};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

const HUGO_MANIFEST_KEYS: &[&str] = &[keys::HUGO_VERSION];

#[derive(Serialize)]
struct HugoBuildData<'a> {
    hugo_version: &'a str,
}

pub struct HugoPlatform {
    detector: HugoDetector,
    installers: Vec<Box<dyn ToolInstaller>>,
    renderer: Arc<dyn TemplateRenderer>,
}

impl HugoPlatform {
    pub fn new(installer: Box<dyn ToolInstaller>, renderer: Arc<dyn TemplateRenderer>) -> Self {
        Self {
            detector: HugoDetector::new(),
            installers: vec![installer],
            renderer,
        }
    }

    pub fn from_config(
        config: &GeneratorConfig,
        fs: Arc<dyn FileSystem>,
        renderer: Arc<dyn TemplateRenderer>,
    ) -> Self {
        let installer = PlatformInstaller::from_config(HUGO_TOOL, config, fs, renderer.clone());
        Self::new(Box::new(installer), renderer)
    }
}

impl ProgrammingPlatform for HugoPlatform {
    fn id(&self) -> PlatformId {
        PlatformId::Hugo
    }

    fn detect(&self, context: &BuildContext) -> Result<Option<PlatformDetectionResult>, BuildError> {
        Ok(self.detector.detect(&context.detector_context())?)
    }

    fn undetected_result(&self) -> PlatformDetectionResult {
        PlatformDetectionResult::Hugo(HugoDetectionResult::default())
    }

    fn resolve_versions(
        &self,
        context: &BuildContext,
        detection: &PlatformDetectionResult,
    ) -> Result<ResolvedPlatformConfig, BuildError> {
        let PlatformDetectionResult::Hugo(detection) = detection else {
            return Err(result_type_mismatch(PlatformId::Hugo, detection.platform()));
        };

        let info = context.catalog.get(HUGO_TOOL)?;
        let requested = resolve_requested(
            context.config.explicit_version(HUGO_TOOL),
            detection.detected_version.as_deref(),
            &info.default_version,
        );
        let hugo_version =
            version::resolve(HUGO_TOOL, requested, info, PreviewPolicy::for_tool(HUGO_TOOL))?;
        info!(platform = HUGO_TOOL, requested, version = %hugo_version, "Selected Hugo version");

        Ok(ResolvedPlatformConfig::Hugo(ResolvedHugoConfig {
            hugo_version,
            detection: detection.clone(),
        }))
    }

    fn installers(&self) -> &[Box<dyn ToolInstaller>] {
        &self.installers
    }

    fn tool_versions(
        &self,
        resolved: &ResolvedPlatformConfig,
    ) -> Result<Vec<(&'static str, String)>, BuildError> {
        match resolved {
            ResolvedPlatformConfig::Hugo(config) => Ok(vec![(HUGO_TOOL, config.hugo_version.clone())]),
            other => Err(result_type_mismatch(PlatformId::Hugo, other.platform())),
        }
    }

    fn build_snippet(
        &self,
        _context: &BuildContext,
        resolved: &ResolvedPlatformConfig,
    ) -> Result<BuildScriptSnippet, BuildError> {
        let ResolvedPlatformConfig::Hugo(config) = resolved else {
            return Err(result_type_mismatch(PlatformId::Hugo, resolved.platform()));
        };

        let bash_text = render_with(
            self.renderer.as_ref(),
            TemplateId::HugoBuild,
            &HugoBuildData {
                hugo_version: &config.hugo_version,
            },
        )?;

        Ok(BuildScriptSnippet {
            platform: PlatformId::Hugo,
            bash_text,
            manifest_properties: BTreeMap::from([(
                keys::HUGO_VERSION.to_string(),
                config.hugo_version.clone(),
            )]),
            warnings: Vec::new(),
        })
    }

    fn tools_to_path(
        &self,
        resolved: &ResolvedPlatformConfig,
    ) -> Result<BTreeMap<String, String>, BuildError> {
        Ok(self.tool_versions(resolved)?.into_iter().map(|(tool, v)| (tool.to_string(), v)).collect())
    }

    fn manifest_keys(&self) -> &'static [&'static str] {
        HUGO_MANIFEST_KEYS
    }
}
