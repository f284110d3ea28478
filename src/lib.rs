//! peelkit - source-to-image build script generation
//!
//! This library inspects an application source tree, recognises which
//! language platforms it uses and produces a bash build script plus a build
//! manifest describing the toolchain versions the build needs. It never runs
//! the build itself.
//!
//! # Core Concepts
//!
//! - **Detection**: each [`detector::PlatformDetector`] reads the repository
//!   through [`repo::SourceRepo`] and reports a platform with an optional
//!   version hint. Malformed manifests degrade to warnings.
//! - **Version resolution**: requested versions (explicit, detected or
//!   default) are matched against the supported set in a
//!   [`version::VersionCatalog`].
//! - **Platforms**: a [`platform::ProgrammingPlatform`] facade turns a
//!   detection into installer fragments, a build fragment and manifest
//!   properties.
//! - **Generation**: [`generator::BuildScriptGenerator`] assembles the final
//!   script and manifest in platform priority order.
//!
//! # Example Usage
//!
//! ```no_run
//! use peelkit::{BuildContext, BuildScriptGenerator, GeneratorConfig};
//!
//! fn generate() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = GeneratorConfig::for_source("/src/app");
//!     config.validate()?;
//!
//!     let context = BuildContext::from_config(config)?;
//!     let generator = BuildScriptGenerator::from_config(&context.config)?;
//!     let build = generator.generate(&context)?;
//!
//!     println!("{}", build.script);
//!     build.write_to("/tmp/build.sh".as_ref(), "/src/app".as_ref())?;
//!     Ok(())
//! }
//! ```
//!
//! # Project Structure
//!
//! - [`detector`]: platform detection rules
//! - [`version`]: supported-version catalog and resolver
//! - [`platform`]: platform facades, installers and the registry
//! - [`generator`]: orchestration and script assembly
//! - [`manifest`]: the build manifest property bag

pub mod cli;
pub mod config;
pub mod detector;
pub mod error;
pub mod fs;
pub mod generator;
pub mod manifest;
pub mod platform;
pub mod platform_id;
pub mod repo;
pub mod template;
pub mod util;
pub mod version;

pub use config::{ConfigError, GeneratorConfig};
pub use detector::{DetectorContext, DetectorOptions, PlatformDetectionResult, PlatformDetector};
pub use error::BuildError;
pub use generator::{BuildScriptGenerator, GeneratedBuild};
pub use manifest::BuildManifest;
pub use platform::{BuildContext, PlatformRegistry, ProgrammingPlatform, ResolvedPlatformConfig};
pub use platform_id::PlatformId;
pub use repo::{LocalSourceRepo, SourceRepo};
pub use template::{TemplateRenderer, TeraRenderer};
pub use util::{init_default, init_from_env, init_logging, LoggingConfig};
pub use version::{SupportedVersionInfo, VersionCatalog};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
