//! Command handlers. Each returns the process exit code.

use super::commands::{BuildScriptArgs, DetectArgs};
use super::output::{OutputFormat, OutputFormatter};
use crate::config::GeneratorConfig;
use crate::error::{BuildError, EXIT_PLATFORM_NOT_DETECTED};
use crate::generator::BuildScriptGenerator;
use crate::platform::BuildContext;
use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::{debug, warn};

pub fn handle_detect(args: &DetectArgs) -> i32 {
    run_detect(args).unwrap_or_else(|e| report(&e))
}

pub fn handle_build_script(args: &BuildScriptArgs) -> i32 {
    run_build_script(args).unwrap_or_else(|e| report(&e))
}

/// Print `error` and map it to an exit code.
fn report(error: &anyhow::Error) -> i32 {
    eprintln!("Error: {:#}", error);
    error
        .downcast_ref::<BuildError>()
        .map(BuildError::exit_code)
        .unwrap_or(1)
}

fn run_detect(args: &DetectArgs) -> Result<i32> {
    let mut config = GeneratorConfig::default();
    if let Some(source) = &args.source {
        config.source_dir = source.clone();
    }
    config.disable_framework_detection |= args.no_frameworks;
    config.validate().map_err(BuildError::from)?;
    debug!("{}", config);

    let context = BuildContext::from_config(config)?;
    let generator = BuildScriptGenerator::from_config(&context.config)?;
    let results = generator.detect(&context)?;

    let formatter = OutputFormatter::new(args.format.into());
    print!("{}", formatter.format_detections(&results)?);

    if results.is_empty() {
        return Ok(EXIT_PLATFORM_NOT_DETECTED);
    }
    Ok(0)
}

fn run_build_script(args: &BuildScriptArgs) -> Result<i32> {
    let mut config = GeneratorConfig::default();
    args.apply_to(&mut config);
    config.validate().map_err(BuildError::from)?;
    debug!("{}", config);

    let context = BuildContext::from_config(config)?;
    let generator = BuildScriptGenerator::from_config(&context.config)?;
    let build = generator.generate(&context)?;

    for warning in &build.warnings {
        warn!("{}", warning);
    }

    let config = &context.config;
    match &args.script_path {
        Some(script_path) => {
            let manifest_path = build
                .write_to(script_path, &manifest_dir(config))
                .context("Failed to write build outputs")?;
            eprintln!("Build script written to {}", script_path.display());
            eprintln!("Manifest written to {}", manifest_path.display());
            print!("{}", OutputFormatter::new(OutputFormat::Human).format_build(&build)?);
        }
        None => {
            if let Some(dir) = &config.manifest_dir {
                build.manifest.write_to_dir(dir)?;
            }
            print!("{}", build.script);
        }
    }

    Ok(0)
}

/// Explicit manifest dir, else the output dir, else the source dir.
fn manifest_dir(config: &GeneratorConfig) -> PathBuf {
    config
        .manifest_dir
        .clone()
        .or_else(|| config.output_dir.clone())
        .unwrap_or_else(|| config.source_dir.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_maps_build_errors() {
        let err = anyhow::Error::from(BuildError::UnknownPlatform("ruby".to_string()));
        assert_eq!(report(&err), crate::error::EXIT_UNKNOWN_PLATFORM);

        let wrapped = anyhow::Error::from(BuildError::PlatformNotDetected {
            path: PathBuf::from("/src"),
        })
        .context("while generating");
        assert_eq!(report(&wrapped), EXIT_PLATFORM_NOT_DETECTED);
    }

    #[test]
    fn test_report_other_errors() {
        assert_eq!(report(&anyhow::anyhow!("disk full")), 1);
    }

    #[test]
    fn test_manifest_dir_fallbacks() {
        let mut config = GeneratorConfig {
            source_dir: PathBuf::from("/src"),
            output_dir: None,
            manifest_dir: None,
            ..crate::platform::test_support::config()
        };
        assert_eq!(manifest_dir(&config), PathBuf::from("/src"));

        config.output_dir = Some(PathBuf::from("/out"));
        assert_eq!(manifest_dir(&config), PathBuf::from("/out"));

        config.manifest_dir = Some(PathBuf::from("/manifest"));
        assert_eq!(manifest_dir(&config), PathBuf::from("/manifest"));
    }
}
