use super::{DetectorContext, PhpDetectionResult, PlatformDetectionResult, PlatformDetector};
use crate::platform_id::PlatformId;
use crate::repo::{SourceRepo, StructuredFormat};
use anyhow::Result;
use serde_json::Value;
use tracing::{debug, warn};

pub const COMPOSER_JSON: &str = "composer.json";

#[derive(Debug, Default)]
pub struct PhpDetector;

impl PhpDetector {
    pub fn new() -> Self {
        Self
    }
}

/// `require.php` of composer.json, e.g. `^7.4 || ^8.0`.
fn version_from_composer(repo: &dyn SourceRepo, warnings: &mut Vec<String>) -> Result<Option<String>> {
    let parsed = repo.parse_structured(COMPOSER_JSON, StructuredFormat::Json)?;
    if let Some(warning) = parsed.warning() {
        warn!(file = COMPOSER_JSON, "{}", warning);
        warnings.push(warning);
    }

    Ok(parsed
        .value()
        .and_then(|v| v.pointer("/require/php"))
        .and_then(Value::as_str)
        .map(str::to_string))
}

impl PlatformDetector for PhpDetector {
    fn platform(&self) -> PlatformId {
        PlatformId::Php
    }

    fn detect(&self, context: &DetectorContext) -> Result<Option<PlatformDetectionResult>> {
        let repo = context.repo.as_ref();
        let mut warnings = Vec::new();

        let has_composer_json = repo.file_exists(COMPOSER_JSON);
        let detected_version = if has_composer_json {
            version_from_composer(repo, &mut warnings)?
        } else {
            let php_files = repo.enumerate_files("*.php", false, None)?;
            if php_files.is_empty() {
                debug!("Could not find composer.json or any .php file in repo");
                return Ok(None);
            }
            debug!(count = php_files.len(), "Found .php files in repo root");
            None
        };

        Ok(Some(PlatformDetectionResult::Php(PhpDetectionResult {
            detected_version,
            app_directory: String::new(),
            composer_version: None,
            has_composer_json,
            warnings,
        })))
    }
}
