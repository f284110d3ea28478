use super::markers::{MarkerMatch, MarkerRules};
use super::{
    DetectedFramework, DetectorContext, NodeDetectionResult, PlatformDetectionResult,
    PlatformDetector,
};
use crate::platform_id::PlatformId;
use crate::repo::{SourceRepo, StructuredFormat};
use anyhow::Result;
use serde_json::Value;
use tracing::{debug, warn};

pub const PACKAGE_JSON: &str = "package.json";
pub const YARN_LOCK: &str = "yarn.lock";
const LERNA_JSON: &str = "lerna.json";
const LAGE_CONFIG: &str = "lage.config.js";
const PUBSPEC_YAML: &str = "pubspec.yaml";

const NODE_MARKERS: MarkerRules = MarkerRules {
    primary: &[PACKAGE_JSON, "package-lock.json", YARN_LOCK],
    ambiguous: &["server.js", "app.js"],
    // IIS start pages: a site that has one is served by IIS, not node.
    exclusions: &[
        "default.htm",
        "default.html",
        "default.asp",
        "index.htm",
        "index.html",
        "iisstart.htm",
        "default.aspx",
        "index.php",
    ],
};

/// `devDependencies` keyword to framework label, in reporting order.
pub const DEV_DEPENDENCY_FRAMEWORKS: &[(&str, &str)] = &[
    ("aurelia-cli", "Aurelia"),
    ("astro", "Astro"),
    ("@11ty/eleventy", "Eleventy"),
    ("elm", "Elm"),
    ("ember-cli", "Ember"),
    ("@glimmer/component", "Glimmer"),
    ("hugo-cli", "Hugo"),
    ("knockout", "KnockoutJs"),
    ("lit-element", "LitElement"),
    ("@marko/build", "Marko"),
    ("@stencil/core", "Stencil"),
    ("@vue/cli-service", "VueJs"),
    ("typescript", "Typescript"),
];

/// `dependencies` keyword to framework label, in reporting order.
pub const DEPENDENCY_FRAMEWORKS: &[(&str, &str)] = &[
    ("@angular/core", "Angular"),
    ("express", "Express"),
    ("gatsby", "Gatsby"),
    ("gridsome", "Gridsome"),
    ("jquery", "jQuery"),
    ("next", "Next.js"),
    ("nuxt", "Nuxt.js"),
    ("preact", "Preact"),
    ("react", "React"),
    ("svelte", "Svelte"),
    ("vue", "VueJs"),
    ("@vuepress/core", "VuePress"),
];

#[derive(Debug, Default)]
pub struct NodeDetector;

impl NodeDetector {
    pub fn new() -> Self {
        Self
    }
}

/// Parsed `package.json`, or `None` when absent or malformed. A malformed
/// file adds a warning instead of failing.
pub fn read_package_json(repo: &dyn SourceRepo, warnings: &mut Vec<String>) -> Result<Option<Value>> {
    if !repo.file_exists(PACKAGE_JSON) {
        return Ok(None);
    }

    let parsed = repo.parse_structured(PACKAGE_JSON, StructuredFormat::Json)?;
    if let Some(warning) = parsed.warning() {
        warn!(file = PACKAGE_JSON, "{}", warning);
        warnings.push(warning);
    }
    Ok(parsed.value().cloned())
}

fn frameworks_from(
    package_json: &Value,
    field: &str,
    keywords: &[(&str, &str)],
    found: &mut Vec<DetectedFramework>,
) {
    let Some(deps) = package_json.get(field).and_then(Value::as_object) else {
        return;
    };

    for (keyword, label) in keywords {
        if let Some(spec) = deps.get(*keyword) {
            found.push(DetectedFramework {
                name: label.to_string(),
                version: spec.as_str().unwrap_or_default().to_string(),
            });
        }
    }
}

fn detect_frameworks(repo: &dyn SourceRepo, package_json: Option<&Value>) -> Vec<DetectedFramework> {
    let mut found = Vec::new();
    if let Some(package_json) = package_json {
        frameworks_from(package_json, "devDependencies", DEV_DEPENDENCY_FRAMEWORKS, &mut found);
        frameworks_from(package_json, "dependencies", DEPENDENCY_FRAMEWORKS, &mut found);
    }
    if repo.file_exists(PUBSPEC_YAML) {
        found.push(DetectedFramework {
            name: "Flutter".to_string(),
            version: String::new(),
        });
    }
    found
}

impl PlatformDetector for NodeDetector {
    fn platform(&self) -> PlatformId {
        PlatformId::Node
    }

    fn detect(&self, context: &DetectorContext) -> Result<Option<PlatformDetectionResult>> {
        let repo = context.repo.as_ref();

        match NODE_MARKERS.evaluate(repo) {
            MarkerMatch::Primary(marker) | MarkerMatch::Ambiguous(marker) => {
                debug!(marker, "Found Node.js marker");
            }
            MarkerMatch::Excluded(exclusion) => {
                debug!(exclusion, "Not a Node.js app, found IIS start page");
                return Ok(None);
            }
            MarkerMatch::None => {
                debug!("Could not find typical Node.js files in repo");
                return Ok(None);
            }
        }

        let mut warnings = Vec::new();
        let package_json = read_package_json(repo, &mut warnings)?;

        let detected_version = package_json
            .as_ref()
            .and_then(|p| p.pointer("/engines/node"))
            .and_then(Value::as_str)
            .map(str::to_string);
        if detected_version.is_none() {
            debug!("No engines.node version in package.json");
        }

        let frameworks = if context.options.disable_framework_detection {
            Vec::new()
        } else {
            detect_frameworks(repo, package_json.as_ref())
        };

        Ok(Some(PlatformDetectionResult::Node(NodeDetectionResult {
            detected_version,
            app_directory: String::new(),
            frameworks,
            has_lerna_json: repo.file_exists(LERNA_JSON),
            has_lage_config: repo.file_exists(LAGE_CONFIG),
            has_yarn_lock: repo.file_exists(YARN_LOCK),
            warnings,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::test_support::{context, context_with};
    use crate::detector::DetectorOptions;

    fn detect(files: &[(&str, &str)]) -> Option<NodeDetectionResult> {
        match NodeDetector::new().detect(&context(files)).unwrap() {
            Some(PlatformDetectionResult::Node(result)) => Some(result),
            Some(other) => panic!("unexpected result {:?}", other),
            None => None,
        }
    }

    #[test]
    fn test_engines_node_hint() {
        let result = detect(&[("package.json", r#"{"engines":{"node":"8"}}"#)]).unwrap();
        assert_eq!(result.detected_version.as_deref(), Some("8"));
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_malformed_package_json_still_detected_without_hint() {
        let result = detect(&[("package.json", r#"{"engines":{"node":"8"}"#)]).unwrap();
        assert_eq!(result.detected_version, None);
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("package.json"));
    }

    #[test]
    fn test_lockfile_only() {
        let result = detect(&[("yarn.lock", "")]).unwrap();
        assert!(result.has_yarn_lock);
        assert_eq!(result.detected_version, None);
    }

    #[test]
    fn test_ambiguous_marker_detected() {
        assert!(detect(&[("server.js", "require('http')")]).is_some());
    }

    #[test]
    fn test_ambiguous_marker_with_iis_start_page_not_detected() {
        assert!(detect(&[("app.js", ""), ("iisstart.htm", "")]).is_none());
    }

    #[test]
    fn test_no_markers() {
        assert!(detect(&[("index.html", "<html/>")]).is_none());
    }

    #[test]
    fn test_monorepo_flags() {
        let result = detect(&[
            ("package.json", "{}"),
            ("lerna.json", "{}"),
            ("lage.config.js", "module.exports = {}"),
        ])
        .unwrap();
        assert!(result.has_lerna_json);
        assert!(result.has_lage_config);
        assert!(!result.has_yarn_lock);
    }

    #[test]
    fn test_frameworks_in_map_order() {
        let result = detect(&[
            (
                "package.json",
                r#"{
                    "devDependencies": {"typescript": "^5.0.0", "@vue/cli-service": "~5.0.0"},
                    "dependencies": {"react": "18.2.0", "express": "^4.18.2", "left-pad": "1.0.0"}
                }"#,
            ),
            ("pubspec.yaml", "name: app"),
        ])
        .unwrap();

        let names: Vec<&str> = result.frameworks.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["VueJs", "Typescript", "Express", "React", "Flutter"]);
        assert_eq!(result.frameworks[3].version, "18.2.0");
        assert_eq!(result.frameworks[4].version, "");
    }

    #[test]
    fn test_framework_detection_disabled() {
        let ctx = context_with(
            &[("package.json", r#"{"dependencies": {"react": "18.2.0"}}"#)],
            DetectorOptions {
                disable_framework_detection: true,
            },
        );
        let result = NodeDetector::new().detect(&ctx).unwrap().unwrap();
        match result {
            PlatformDetectionResult::Node(node) => assert!(node.frameworks.is_empty()),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_non_string_engine_is_no_hint() {
        let result = detect(&[("package.json", r#"{"engines":{"node":18}}"#)]).unwrap();
        assert_eq!(result.detected_version, None);
    }
}
