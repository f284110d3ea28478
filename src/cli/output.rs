//! Output formatting for the CLI.
//!
//! JSON and YAML are meant for machines; the human format mirrors what an
//! operator wants to see after a run.

use anyhow::{Context, Result};
use serde_json::json;
use std::fmt::Write as _;

use crate::config::GeneratorConfig;
use crate::detector::PlatformDetectionResult;
use crate::generator::GeneratedBuild;

const RULE: &str = "\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Yaml,
    Human,
}

pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format_detections(&self, results: &[PlatformDetectionResult]) -> Result<String> {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(results)
                .context("Failed to serialize detection results to JSON"),
            OutputFormat::Yaml => {
                serde_yaml::to_string(results).context("Failed to serialize detection results to YAML")
            }
            OutputFormat::Human => Ok(self.format_detections_human(results)),
        }
    }

    /// Summary of a generated build; the script itself is not included.
    pub fn format_build(&self, build: &GeneratedBuild) -> Result<String> {
        let summary = json!({
            "platforms": build.platforms,
            "tools": build.tools,
            "manifest": build.manifest.iter().collect::<std::collections::BTreeMap<_, _>>(),
            "warnings": build.warnings,
        });

        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(&summary)
                .context("Failed to serialize build summary to JSON"),
            OutputFormat::Yaml => {
                serde_yaml::to_string(&summary).context("Failed to serialize build summary to YAML")
            }
            OutputFormat::Human => Ok(self.format_build_human(build)),
        }
    }

    pub fn format_config(&self, config: &GeneratorConfig) -> Result<String> {
        let config_map = config.to_display_map();
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(&config_map).context("Failed to serialize config to JSON")
            }
            OutputFormat::Yaml => {
                serde_yaml::to_string(&config_map).context("Failed to serialize config to YAML")
            }
            OutputFormat::Human => Ok(config.to_string()),
        }
    }

    fn format_detections_human(&self, results: &[PlatformDetectionResult]) -> String {
        let mut output = String::new();

        if results.is_empty() {
            output.push_str("\u{26A0} No platform detected\n");
            return output;
        }

        output.push_str("\u{2713} Detected Platforms\n");
        let _ = writeln!(output, "{}\n", RULE);

        for result in results {
            let _ = writeln!(output, "{}", result.platform().name());
            let version = result.detected_version().unwrap_or("(no hint)");
            let _ = writeln!(output, "\u{251C}\u{2500} Version hint: {}", version);

            match result {
                PlatformDetectionResult::Node(node) => {
                    let frameworks: Vec<&str> = node.frameworks.iter().map(|f| f.name.as_str()).collect();
                    if frameworks.is_empty() {
                        output.push_str("\u{251C}\u{2500} Frameworks:   (none)\n");
                    } else {
                        let _ = writeln!(output, "\u{251C}\u{2500} Frameworks:   {}", frameworks.join(", "));
                    }
                    let _ = writeln!(
                        output,
                        "\u{2514}\u{2500} Tooling:      yarn.lock={} lerna={} lage={}",
                        node.has_yarn_lock, node.has_lerna_json, node.has_lage_config
                    );
                }
                PlatformDetectionResult::Php(php) => {
                    let _ = writeln!(
                        output,
                        "\u{2514}\u{2500} composer.json: {}",
                        if php.has_composer_json { "yes" } else { "no" }
                    );
                }
                PlatformDetectionResult::Hugo(hugo) => {
                    let config = hugo
                        .config_file
                        .as_ref()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| "(none)".to_string());
                    let _ = writeln!(output, "\u{2514}\u{2500} Config:       {}", config);
                }
            }
            output.push('\n');
        }

        let warnings: Vec<&String> = results.iter().flat_map(|r| r.warnings()).collect();
        push_warnings(&mut output, &warnings);
        output
    }

    fn format_build_human(&self, build: &GeneratedBuild) -> String {
        let mut output = String::new();

        output.push_str("\u{2713} Build Script Generated\n");
        let _ = writeln!(output, "{}\n", RULE);

        output.push_str("Platforms:\n");
        for (i, platform) in build.platforms.iter().enumerate() {
            let connector = if i + 1 == build.platforms.len() { "\u{2514}" } else { "\u{251C}" };
            let _ = writeln!(
                output,
                "{}\u{2500} {} {}",
                connector,
                platform.platform().name(),
                platform.primary_version()
            );
        }
        output.push('\n');

        output.push_str("Manifest:\n");
        for (key, value) in build.manifest.iter() {
            let _ = writeln!(output, "  {} = {}", key, value);
        }

        let warnings: Vec<&String> = build.warnings.iter().collect();
        push_warnings(&mut output, &warnings);
        output
    }
}

fn push_warnings(output: &mut String, warnings: &[&String]) {
    if warnings.is_empty() {
        return;
    }
    output.push_str("\n\u{26A0} Warnings:\n");
    for warning in warnings {
        let _ = writeln!(output, "  - {}", warning);
    }
}
