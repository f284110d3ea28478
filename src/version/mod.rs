//! Supported-version catalog and version resolution.

mod catalog;
mod resolver;

pub use catalog::{
    SupportedVersionInfo, VersionCatalog, HUGO_TOOL, NODE_TOOL, PHP_COMPOSER_TOOL, PHP_TOOL,
};
pub use resolver::{
    is_preview, max_preview_version, max_satisfying_version, resolve, resolve_requested,
    PreviewPolicy,
};
