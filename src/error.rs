use crate::config::ConfigError;
use std::path::PathBuf;
use thiserror::Error;

/// Exit code for a repository no enabled platform recognised.
pub const EXIT_PLATFORM_NOT_DETECTED: i32 = 2;
/// Exit code for a requested or detected version outside the supported set.
pub const EXIT_UNSUPPORTED_VERSION: i32 = 3;
/// Exit code for a platform name no platform is registered under.
pub const EXIT_UNKNOWN_PLATFORM: i32 = 4;
/// Exit code for internal contract violations (`EX_SOFTWARE`).
pub const EXIT_INTERNAL: i32 = 70;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error(
        "Platform '{platform}' version '{requested}' is unsupported. Supported versions: {}",
        .supported.join(", ")
    )]
    UnsupportedVersion {
        platform: String,
        requested: String,
        supported: Vec<String>,
    },

    #[error("Could not detect the language or platform of the source in {}", .path.display())]
    PlatformNotDetected { path: PathBuf },

    #[error(
        "Platform '{platform}' expected a detection result of type '{expected}' but got '{actual}'"
    )]
    ResultTypeMismatch {
        platform: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Unknown platform '{0}'")]
    UnknownPlatform(String),

    #[error("No supported version information for '{0}'")]
    MissingVersionInfo(String),

    #[error("Manifest key '{key}' is owned by '{owner}' but was also written by '{intruder}'")]
    ManifestKeyCollision {
        key: String,
        owner: String,
        intruder: String,
    },

    #[error("Failed to render template '{template}': {message}")]
    Template { template: String, message: String },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    SourceRepo(#[from] anyhow::Error),
}

impl BuildError {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            BuildError::PlatformNotDetected { .. } => EXIT_PLATFORM_NOT_DETECTED,
            BuildError::UnsupportedVersion { .. } => EXIT_UNSUPPORTED_VERSION,
            BuildError::UnknownPlatform(_) => EXIT_UNKNOWN_PLATFORM,
            BuildError::ResultTypeMismatch { .. }
            | BuildError::ManifestKeyCollision { .. }
            | BuildError::MissingVersionInfo(_)
            | BuildError::Template { .. } => EXIT_INTERNAL,
            BuildError::Config(_) | BuildError::SourceRepo(_) => 1,
        }
    }

    /// Contract violations that must abort the build even when other
    /// platforms could continue.
    pub fn is_internal(&self) -> bool {
        self.exit_code() == EXIT_INTERNAL
    }
}
