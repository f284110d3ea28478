use super::{
    result_type_mismatch, BuildContext, BuildScriptSnippet, PlatformInstaller,
    ProgrammingPlatform, ResolvedPhpConfig, ResolvedPlatformConfig, ToolInstaller,
};
use crate::config::GeneratorConfig;
use crate::detector::{
    PhpDetectionResult, PhpDetector, PlatformDetectionResult, PlatformDetector, COMPOSER_JSON,
};
use crate::error::BuildError;
use crate::fs::FileSystem;
use crate::manifest::keys;
use crate::platform_id::PlatformId;
use crate::repo::StructuredFormat;
use crate::template::{render_with, TemplateId, TemplateRenderer};
use crate::version::{self, resolve_requested, PreviewPolicy, PHP_COMPOSER_TOOL, PHP_TOOL};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

const PHP_MANIFEST_KEYS: &[&str] = &[keys::PHP_VERSION, keys::PHP_COMPOSER_VERSION];

pub struct PhpPlatform {
    detector: PhpDetector,
    installers: Vec<Box<dyn ToolInstaller>>,
    renderer: Arc<dyn TemplateRenderer>,
}

#[derive(Serialize)]
struct PhpBuildData<'a> {
    php_version: &'a str,
    composer_version: &'a str,
    composer_file_exists: bool,
}

impl PhpPlatform {
    /// `php` must install the `php` tool and `composer` the `php-composer`
    /// tool; fragments are emitted in that order.
    pub fn new(
        php: Box<dyn ToolInstaller>,
        composer: Box<dyn ToolInstaller>,
        renderer: Arc<dyn TemplateRenderer>,
    ) -> Self {
        Self {
            detector: PhpDetector::new(),
            installers: vec![php, composer],
            renderer,
        }
    }

    pub fn from_config(
        config: &GeneratorConfig,
        fs: Arc<dyn FileSystem>,
        renderer: Arc<dyn TemplateRenderer>,
    ) -> Self {
        let php = PlatformInstaller::from_config(PHP_TOOL, config, fs.clone(), renderer.clone());
        let composer =
            PlatformInstaller::from_config(PHP_COMPOSER_TOOL, config, fs, renderer.clone());
        Self::new(Box::new(php), Box::new(composer), renderer)
    }

    fn resolved<'a>(
        &self,
        resolved: &'a ResolvedPlatformConfig,
    ) -> Result<&'a ResolvedPhpConfig, BuildError> {
        match resolved {
            ResolvedPlatformConfig::Php(config) => Ok(config),
            other => Err(result_type_mismatch(PlatformId::Php, other.platform())),
        }
    }

    /// Log `require` of composer.json. A malformed file is returned as a
    /// warning; composer may still cope with it.
    fn enumerate_dependencies(
        &self,
        context: &BuildContext,
        php_version: &str,
    ) -> Result<Vec<String>, BuildError> {
        let parsed = context
            .repo
            .parse_structured(COMPOSER_JSON, StructuredFormat::Json)?;

        if let Some(warning) = parsed.warning() {
            warn!(platform = PHP_TOOL, "{}", warning);
            return Ok(vec![warning]);
        }

        if let Some(require) = parsed
            .value()
            .and_then(|v| v.get("require"))
            .and_then(Value::as_object)
        {
            let specs: Vec<String> = require
                .iter()
                .map(|(name, spec)| format!("{}{}", name, spec.as_str().unwrap_or_default()))
                .collect();
            debug!(platform = PHP_TOOL, version = php_version, dependencies = ?specs, "PHP dependencies");
        }
        Ok(Vec::new())
    }
}

impl ProgrammingPlatform for PhpPlatform {
    fn id(&self) -> PlatformId {
        PlatformId::Php
    }

    fn detect(&self, context: &BuildContext) -> Result<Option<PlatformDetectionResult>, BuildError> {
        Ok(self.detector.detect(&context.detector_context())?)
    }

    fn undetected_result(&self) -> PlatformDetectionResult {
        PlatformDetectionResult::Php(PhpDetectionResult::default())
    }

    fn resolve_versions(
        &self,
        context: &BuildContext,
        detection: &PlatformDetectionResult,
    ) -> Result<ResolvedPlatformConfig, BuildError> {
        let PlatformDetectionResult::Php(detection) = detection else {
            return Err(result_type_mismatch(PlatformId::Php, detection.platform()));
        };

        let php_info = context.catalog.get(PHP_TOOL)?;
        let requested = resolve_requested(
            context.config.explicit_version(PHP_TOOL),
            detection.detected_version.as_deref(),
            &php_info.default_version,
        );
        let php_version =
            version::resolve(PHP_TOOL, requested, php_info, PreviewPolicy::for_tool(PHP_TOOL))?;
        info!(platform = PHP_TOOL, requested, version = %php_version, "Selected PHP version");

        let composer_info = context.catalog.get(PHP_COMPOSER_TOOL)?;
        let requested = resolve_requested(
            context.config.explicit_version(PHP_COMPOSER_TOOL),
            detection.composer_version.as_deref(),
            &composer_info.default_version,
        );
        let composer_version = version::resolve(
            PHP_COMPOSER_TOOL,
            requested,
            composer_info,
            PreviewPolicy::for_tool(PHP_COMPOSER_TOOL),
        )?;
        info!(platform = PHP_COMPOSER_TOOL, requested, version = %composer_version, "Selected Composer version");

        Ok(ResolvedPlatformConfig::Php(ResolvedPhpConfig {
            php_version,
            composer_version,
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
        let config = self.resolved(resolved)?;
        Ok(vec![
            (PHP_TOOL, config.php_version.clone()),
            (PHP_COMPOSER_TOOL, config.composer_version.clone()),
        ])
    }

    fn build_snippet(
        &self,
        context: &BuildContext,
        resolved: &ResolvedPlatformConfig,
    ) -> Result<BuildScriptSnippet, BuildError> {
        let config = self.resolved(resolved)?;

        let composer_file_exists = context.repo.file_exists(COMPOSER_JSON);
        let warnings = if composer_file_exists {
            self.enumerate_dependencies(context, &config.php_version)?
        } else {
            Vec::new()
        };

        let bash_text = render_with(
            self.renderer.as_ref(),
            TemplateId::PhpBuild,
            &PhpBuildData {
                php_version: &config.php_version,
                composer_version: &config.composer_version,
                composer_file_exists,
            },
        )?;

        let manifest_properties = BTreeMap::from([
            (keys::PHP_VERSION.to_string(), config.php_version.clone()),
            (
                keys::PHP_COMPOSER_VERSION.to_string(),
                config.composer_version.clone(),
            ),
        ]);

        Ok(BuildScriptSnippet {
            platform: PlatformId::Php,
            bash_text,
            manifest_properties,
            warnings,
        })
    }

    fn tools_to_path(
        &self,
        resolved: &ResolvedPlatformConfig,
    ) -> Result<BTreeMap<String, String>, BuildError> {
        let config = self.resolved(resolved)?;
        Ok(BTreeMap::from([
            ("php".to_string(), config.php_version.clone()),
            ("composer".to_string(), config.composer_version.clone()),
        ]))
    }

    fn manifest_keys(&self) -> &'static [&'static str] {
        PHP_MANIFEST_KEYS
    }
}
