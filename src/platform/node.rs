use super::{
    result_type_mismatch, BuildContext, BuildScriptSnippet, PlatformInstaller,
    ProgrammingPlatform, ResolvedNodeConfig, ResolvedPlatformConfig, ToolInstaller,
};
use crate::config::GeneratorConfig;
use crate::detector::{
    read_package_json, NodeDetectionResult, NodeDetector, PlatformDetectionResult,
    PlatformDetector,
};
use crate::error::BuildError;
use crate::fs::FileSystem;
use crate::manifest::keys;
use crate::platform_id::PlatformId;
use crate::template::{render_with, TemplateId, TemplateRenderer};
use crate::version::{self, resolve_requested, PreviewPolicy, NODE_TOOL};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

const NODE_MANIFEST_KEYS: &[&str] = &[keys::NODE_VERSION, keys::NODE_FRAMEWORKS];

pub struct NodePlatform {
    detector: NodeDetector,
    installers: Vec<Box<dyn ToolInstaller>>,
    renderer: Arc<dyn TemplateRenderer>,
}

#[derive(Serialize)]
struct NodeBuildData<'a> {
    node_version: &'a str,
    package_install_command: &'static str,
    run_build_command: Option<&'static str>,
    has_lerna: bool,
    has_lage: bool,
}

impl NodePlatform {
    pub fn new(installer: Box<dyn ToolInstaller>, renderer: Arc<dyn TemplateRenderer>) -> Self {
        Self {
            detector: NodeDetector::new(),
            installers: vec![installer],
            renderer,
        }
    }

    pub fn from_config(
        config: &GeneratorConfig,
        fs: Arc<dyn FileSystem>,
        renderer: Arc<dyn TemplateRenderer>,
    ) -> Self {
        let installer = PlatformInstaller::from_config(NODE_TOOL, config, fs, renderer.clone());
        Self::new(Box::new(installer), renderer)
    }

    fn resolved<'a>(
        &self,
        resolved: &'a ResolvedPlatformConfig,
    ) -> Result<&'a ResolvedNodeConfig, BuildError> {
        match resolved {
            ResolvedPlatformConfig::Node(config) => Ok(config),
            other => Err(result_type_mismatch(PlatformId::Node, other.platform())),
        }
    }
}

impl ProgrammingPlatform for NodePlatform {
    fn id(&self) -> PlatformId {
        PlatformId::Node
    }

    fn detect(&self, context: &BuildContext) -> Result<Option<PlatformDetectionResult>, BuildError> {
        Ok(self.detector.detect(&context.detector_context())?)
    }

    fn undetected_result(&self) -> PlatformDetectionResult {
        PlatformDetectionResult::Node(NodeDetectionResult::default())
    }

    fn resolve_versions(
        &self,
        context: &BuildContext,
        detection: &PlatformDetectionResult,
    ) -> Result<ResolvedPlatformConfig, BuildError> {
        let PlatformDetectionResult::Node(detection) = detection else {
            return Err(result_type_mismatch(PlatformId::Node, detection.platform()));
        };

        let info = context.catalog.get(NODE_TOOL)?;
        let requested = resolve_requested(
            context.config.explicit_version(NODE_TOOL),
            detection.detected_version.as_deref(),
            &info.default_version,
        );
        let node_version =
            version::resolve(NODE_TOOL, requested, info, PreviewPolicy::for_tool(NODE_TOOL))?;
        info!(platform = NODE_TOOL, requested, version = %node_version, "Selected Node.js version");

        Ok(ResolvedPlatformConfig::Node(ResolvedNodeConfig {
            node_version,
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
        Ok(vec![(NODE_TOOL, config.node_version.clone())])
    }

    fn build_snippet(
        &self,
        context: &BuildContext,
        resolved: &ResolvedPlatformConfig,
    ) -> Result<BuildScriptSnippet, BuildError> {
        let config = self.resolved(resolved)?;
        let detection = &config.detection;

        // Parse problems were already reported during detection.
        let mut ignored = Vec::new();
        let package_json = read_package_json(context.repo.as_ref(), &mut ignored)?;

        if let Some(deps) = package_json
            .as_ref()
            .and_then(|p| p.get("dependencies"))
            .and_then(Value::as_object)
        {
            let specs: Vec<String> = deps
                .iter()
                .map(|(name, spec)| format!("{}{}", name, spec.as_str().unwrap_or_default()))
                .collect();
            debug!(platform = NODE_TOOL, version = %config.node_version, dependencies = ?specs, "Node.js dependencies");
        }

        let has_build_script = package_json
            .as_ref()
            .and_then(|p| p.pointer("/scripts/build"))
            .is_some();
        let (package_install_command, run_build_command) = if detection.has_yarn_lock {
            ("yarn install --prefer-offline", has_build_script.then_some("yarn run build"))
        } else {
            ("npm install", has_build_script.then_some("npm run build"))
        };

        let bash_text = render_with(
            self.renderer.as_ref(),
            TemplateId::NodeBuild,
            &NodeBuildData {
                node_version: &config.node_version,
                package_install_command,
                run_build_command,
                has_lerna: detection.has_lerna_json,
                has_lage: detection.has_lage_config,
            },
        )?;

        let mut manifest_properties = BTreeMap::new();
        manifest_properties.insert(keys::NODE_VERSION.to_string(), config.node_version.clone());
        if !detection.frameworks.is_empty() {
            let names: Vec<&str> = detection.frameworks.iter().map(|f| f.name.as_str()).collect();
            manifest_properties.insert(keys::NODE_FRAMEWORKS.to_string(), names.join(","));
        }

        Ok(BuildScriptSnippet {
            platform: PlatformId::Node,
            bash_text,
            manifest_properties,
            warnings: Vec::new(),
        })
    }

    fn tools_to_path(
        &self,
        resolved: &ResolvedPlatformConfig,
    ) -> Result<BTreeMap<String, String>, BuildError> {
        let config = self.resolved(resolved)?;
        Ok(BTreeMap::from([(
            "node".to_string(),
            config.node_version.clone(),
        )]))
    }

    fn dirs_to_exclude_from_intermediate(&self, _context: &BuildContext) -> Vec<String> {
        vec!["node_modules".to_string()]
    }

    fn manifest_keys(&self) -> &'static [&'static str] {
        NODE_MANIFEST_KEYS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::test_support::{config, context, host_fs, renderer};

    fn platform() -> NodePlatform {
        NodePlatform::from_config(&config(), host_fs(), renderer())
    }

    fn resolve(files: &[(&str, &str)], cfg: GeneratorConfig) -> Result<ResolvedPlatformConfig, BuildError> {
        let ctx = context(files, cfg);
        let platform = platform();
        let detection = platform.detect(&ctx)?.expect("node app");
        platform.resolve_versions(&ctx, &detection)
    }

    #[test]
    fn test_detected_hint_resolves_to_max_satisfying() {
        let resolved = resolve(&[("package.json", r#"{"engines":{"node":"16"}}"#)], config()).unwrap();
        assert_eq!(resolved.primary_version(), "16.20.2");
    }

    #[test]
    fn test_explicit_version_beats_hint() {
        let mut cfg = config();
        cfg.node_version = Some("20".to_string());
        let resolved = resolve(&[("package.json", r#"{"engines":{"node":"16"}}"#)], cfg).unwrap();
        assert_eq!(resolved.primary_version(), "20.9.0");
    }

    #[test]
    fn test_default_when_no_hint() {
        let resolved = resolve(&[("yarn.lock", "")], config()).unwrap();
        assert_eq!(resolved.primary_version(), "18.17.1");
    }

    #[test]
    fn test_unsupported_hint_fails() {
        let err = resolve(&[("package.json", r#"{"engines":{"node":"99"}}"#)], config()).unwrap_err();
        assert!(matches!(err, BuildError::UnsupportedVersion { ref requested, .. } if requested == "99"));
    }

    #[test]
    fn test_wrong_detection_variant_is_mismatch() {
        let ctx = context(&[], config());
        let php = PlatformDetectionResult::Php(Default::default());
        let err = platform().resolve_versions(&ctx, &php).unwrap_err();
        assert!(matches!(err, BuildError::ResultTypeMismatch { actual: "php", .. }));
    }

    #[test]
    fn test_build_snippet_with_yarn_and_build_script() {
        let files = [
            (
                "package.json",
                r#"{"scripts":{"build":"tsc"},"dependencies":{"react":"18.2.0"}}"#,
            ),
            ("yarn.lock", ""),
        ];
        let ctx = context(&files, config());
        let platform = platform();
        let detection = platform.detect(&ctx).unwrap().unwrap();
        let resolved = platform.resolve_versions(&ctx, &detection).unwrap();

        let snippet = platform.build_snippet(&ctx, &resolved).unwrap();
        assert!(snippet.bash_text.contains("yarn install --prefer-offline"));
        assert!(snippet.bash_text.contains("yarn run build"));
        assert_eq!(
            snippet.manifest_properties.get(keys::NODE_VERSION).map(String::as_str),
            Some("18.17.1")
        );
        assert_eq!(
            snippet.manifest_properties.get(keys::NODE_FRAMEWORKS).map(String::as_str),
            Some("React")
        );
    }

    #[test]
    fn test_build_snippet_malformed_package_json() {
        let ctx = context(&[("package.json", "{")], config());
        let platform = platform();
        let detection = platform.detect(&ctx).unwrap().unwrap();
        let resolved = platform.resolve_versions(&ctx, &detection).unwrap();

        let snippet = platform.build_snippet(&ctx, &resolved).unwrap();
        assert!(snippet.bash_text.contains("npm install"));
        assert!(!snippet.bash_text.contains("npm run build"));
        assert!(!snippet.manifest_properties.contains_key(keys::NODE_FRAMEWORKS));
    }

    #[test]
    fn test_installer_snippet_disabled_by_default() {
        let resolved = resolve(&[("package.json", "{}")], config()).unwrap();
        let ctx = context(&[], config());
        assert_eq!(platform().installer_snippet(&ctx, &resolved).unwrap(), None);
    }

    #[test]
    fn test_installer_snippet_when_dynamic_install_enabled() {
        let mut cfg = config();
        cfg.enable_dynamic_install = true;
        let resolved = resolve(&[("package.json", "{}")], cfg.clone()).unwrap();
        let ctx = context(&[], cfg);

        let snippet = platform().installer_snippet(&ctx, &resolved).unwrap().unwrap();
        assert!(snippet.contains("/tmp/peelkit/platforms/nodejs/18.17.1"));
    }

    #[test]
    fn test_tools_and_exclusions() {
        let resolved = resolve(&[("package.json", "{}")], config()).unwrap();
        let ctx = context(&[], config());
        let platform = platform();

        let tools = platform.tools_to_path(&resolved).unwrap();
        assert_eq!(tools.get("node").map(String::as_str), Some("18.17.1"));
        assert_eq!(platform.dirs_to_exclude_from_intermediate(&ctx), vec!["node_modules"]);
        assert!(platform.dirs_to_exclude_from_output(&ctx).is_empty());
    }
}
