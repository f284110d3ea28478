use crate::config::GeneratorConfig;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Source-to-image build script generator
#[derive(Parser, Debug)]
#[command(
    name = "peelkit",
    about = "Detect application platforms and generate build scripts",
    version,
    author,
    long_about = "peelkit inspects a source tree, recognises Node.js, PHP and Hugo \
                  applications, resolves toolchain versions against the supported set \
                  and writes a bash build script plus a build manifest. It never runs \
                  the build itself."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - only log errors"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Detect the platforms of a source tree",
        long_about = "Runs every enabled platform detector against the source tree and \
                      prints what was found, without resolving versions.\n\n\
                      Examples:\n  \
                      peelkit detect\n  \
                      peelkit detect /path/to/app --format json"
    )]
    Detect(DetectArgs),

    #[command(
        about = "Generate the build script and manifest",
        long_about = "Detects the platforms of the source tree, resolves their versions and \
                      renders the build script. The manifest is written next to the output \
                      directory unless --manifest-dir says otherwise.\n\n\
                      Examples:\n  \
                      peelkit build-script /src -o /out --script-path /tmp/build.sh\n  \
                      peelkit build-script /src --platform php --platform-version 8.1"
    )]
    BuildScript(BuildScriptArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct DetectArgs {
    #[arg(value_name = "SOURCE", help = "Source directory (defaults to current directory)")]
    pub source: Option<PathBuf>,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,

    #[arg(long, help = "Skip framework detection")]
    pub no_frameworks: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct BuildScriptArgs {
    #[arg(value_name = "SOURCE", help = "Source directory (defaults to current directory)")]
    pub source: Option<PathBuf>,

    #[arg(short = 'o', long, value_name = "DIR", help = "Destination of the build output")]
    pub output: Option<PathBuf>,

    #[arg(
        short = 'i',
        long,
        value_name = "DIR",
        help = "Copy the source here and build from the copy"
    )]
    pub intermediate: Option<PathBuf>,

    #[arg(long, value_name = "NAME", help = "Build only this platform (nodejs, php, hugo)")]
    pub platform: Option<String>,

    #[arg(
        long,
        value_name = "VERSION",
        requires = "platform",
        help = "Version of the forced platform"
    )]
    pub platform_version: Option<String>,

    #[arg(long, value_name = "DIR", help = "Where to write the build manifest")]
    pub manifest_dir: Option<PathBuf>,

    #[arg(
        long,
        value_name = "FILE",
        help = "Write the script here instead of printing it"
    )]
    pub script_path: Option<PathBuf>,

    #[arg(long, help = "Install missing toolchains while the script runs")]
    pub dynamic_install: bool,

    #[arg(long, help = "Build every detected platform instead of the first")]
    pub multi_platform: bool,

    #[arg(long, value_name = "FILE", help = "Supported versions catalog (.yaml or .toml)")]
    pub versions_file: Option<PathBuf>,
}

impl BuildScriptArgs {
    /// Layer the flags over `config`. Absent flags leave it untouched.
    pub fn apply_to(&self, config: &mut GeneratorConfig) {
        if let Some(source) = &self.source {
            config.source_dir = source.clone();
        }
        if let Some(output) = &self.output {
            config.output_dir = Some(output.clone());
        }
        if let Some(intermediate) = &self.intermediate {
            config.intermediate_dir = Some(intermediate.clone());
        }
        if let Some(platform) = &self.platform {
            config.platform_name = Some(platform.clone());
        }
        if let Some(version) = &self.platform_version {
            config.platform_version = Some(version.clone());
        }
        if let Some(dir) = &self.manifest_dir {
            config.manifest_dir = Some(dir.clone());
        }
        if let Some(file) = &self.versions_file {
            config.versions_file = Some(file.clone());
        }
        config.enable_dynamic_install |= self.dynamic_install;
        config.enable_multi_platform_build |= self.multi_platform;
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Json,
    Yaml,
    Human,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Yaml => super::output::OutputFormat::Yaml,
            OutputFormatArg::Human => super::output::OutputFormat::Human,
        }
    }
}
