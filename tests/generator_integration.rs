//! End-to-end generation over real source trees.

use peelkit::error::{EXIT_PLATFORM_NOT_DETECTED, EXIT_UNKNOWN_PLATFORM, EXIT_UNSUPPORTED_VERSION};
use peelkit::manifest::keys;
use peelkit::{
    BuildContext, BuildScriptGenerator, GeneratedBuild, GeneratorConfig, LocalSourceRepo,
    PlatformId, VersionCatalog,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

fn write(dir: &Path, name: &str, content: &str) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

/// Configuration that does not depend on the host environment.
fn config(source: &Path) -> GeneratorConfig {
    let mut config = GeneratorConfig::for_source(source);
    config.platform_name = None;
    config.platform_version = None;
    config.node_version = None;
    config.php_version = None;
    config.php_composer_version = None;
    config.hugo_version = None;
    config.enable_node_build = true;
    config.enable_php_build = true;
    config.enable_hugo_build = true;
    config.enable_multi_platform_build = false;
    config.enable_dynamic_install = false;
    config.continue_on_platform_failure = false;
    config.disable_framework_detection = false;
    config.dynamic_install_root = PathBuf::from("/tmp/peelkit-test/platforms");
    config.operation_id = Some("op-1".to_string());
    config.versions_file = None;
    config.log_level = "warn".to_string();
    config
}

fn generate(config: GeneratorConfig) -> Result<GeneratedBuild, peelkit::BuildError> {
    let context = BuildContext::from_config(config)?;
    BuildScriptGenerator::from_config(&context.config)?.generate(&context)
}

#[test]
fn test_node_app() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "package.json",
        r#"{"engines":{"node":">=14 <17"},"dependencies":{"gatsby":"^5.0.0"}}"#,
    );
    write(dir.path(), "yarn.lock", "");
    write(dir.path(), "lerna.json", "{}");

    let build = generate(config(dir.path())).unwrap();

    assert_eq!(build.manifest.get(keys::NODE_VERSION), Some("16.20.2"));
    assert_eq!(build.manifest.get(keys::NODE_FRAMEWORKS), Some("Gatsby"));
    assert!(build.script.contains("npx lerna bootstrap"));
    assert_eq!(build.tools.get("node").map(String::as_str), Some("16.20.2"));
}

#[test]
fn test_php_app_with_composer() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "composer.json",
        r#"{"require":{"php":"^7.4 || ^8.0","laravel/framework":"^10.0"}}"#,
    );

    let build = generate(config(dir.path())).unwrap();

    assert_eq!(build.manifest.get(keys::PHP_VERSION), Some("8.2.12"));
    assert_eq!(build.manifest.get(keys::PHP_COMPOSER_VERSION), Some("2.6.5"));
    assert!(build.script.contains("composer install"));
}

#[test]
fn test_php_root_file_without_composer() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "index.php", "<?php echo 'hi';");

    let build = generate(config(dir.path())).unwrap();
    assert_eq!(build.platforms[0].platform(), PlatformId::Php);
    assert!(build.script.contains("No 'composer.json' file found"));
}

#[test]
fn test_hugo_site_config_in_subdirectory() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "config/_default/hugo.yaml", "baseURL: https://example.org/\n");
    write(dir.path(), "content/_index.md", "# Home");

    let build = generate(config(dir.path())).unwrap();
    assert_eq!(build.manifest.get(keys::HUGO_VERSION), Some("0.119.0"));
    assert_eq!(build.manifest.get(keys::PLATFORM_NAME), Some("hugo"));
}

#[test]
fn test_node_veto_by_static_index() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "server.js", "require('http')");
    write(dir.path(), "index.html", "<html></html>");

    let err = generate(config(dir.path())).unwrap_err();
    assert_eq!(err.exit_code(), EXIT_PLATFORM_NOT_DETECTED);
}

#[test]
fn test_multi_platform_build() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "package.json", "{}");
    write(dir.path(), "composer.json", "{}");
    write(dir.path(), "config.toml", "title = \"Docs\"\n");

    let mut config = config(dir.path());
    config.enable_multi_platform_build = true;
    let build = generate(config).unwrap();

    let platforms: Vec<PlatformId> = build.platforms.iter().map(|p| p.platform()).collect();
    assert_eq!(platforms, vec![PlatformId::Node, PlatformId::Php, PlatformId::Hugo]);
    assert_eq!(build.manifest.get(keys::PLATFORM_NAME), Some("nodejs,php,hugo"));
}

#[test]
fn test_unsupported_version() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "composer.json", r#"{"require":{"php":"5.6.*"}}"#);

    let err = generate(config(dir.path())).unwrap_err();
    assert_eq!(err.exit_code(), EXIT_UNSUPPORTED_VERSION);
    assert!(err.to_string().contains("8.3.0RC6"));
}

#[test]
fn test_unknown_platform() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "package.json", "{}");

    let mut config = config(dir.path());
    config.platform_name = Some("dotnet".to_string());
    let err = generate(config).unwrap_err();
    assert_eq!(err.exit_code(), EXIT_UNKNOWN_PLATFORM);
}

#[test]
fn test_user_catalog_restricts_versions() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "package.json", r#"{"engines":{"node":"20"}}"#);
    let catalog = dir.path().join("versions.yaml");
    fs::write(
        &catalog,
        "nodejs:\n  supported_versions: ['18.17.1', '20.1.0']\n  default_version: '18.17.1'\n",
    )
    .unwrap();

    let mut config = config(dir.path());
    config.versions_file = Some(catalog);
    let build = generate(config).unwrap();
    assert_eq!(build.manifest.get(keys::NODE_VERSION), Some("20.1.0"));
}

#[test]
fn test_write_outputs() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "config.toml", "theme = \"ananke\"\n");
    let out = TempDir::new().unwrap();

    let build = generate(config(dir.path())).unwrap();
    let manifest_path = build
        .write_to(&out.path().join("build.sh"), out.path())
        .unwrap();

    let manifest = fs::read_to_string(manifest_path).unwrap();
    let lines: Vec<&str> = manifest.lines().collect();
    assert_eq!(lines[0], "OperationId=\"op-1\"");
    assert_eq!(lines[1], "PlatformName=\"hugo\"");
    assert!(lines.contains(&"HugoVersion=\"0.119.0\""));
}

#[test]
fn test_detection_is_deterministic() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "package.json", r#"{"devDependencies":{"typescript":"5.0.0","astro":"2.0.0"}}"#);
    write(dir.path(), "config.yaml", "title: Docs\n");

    let repo = Arc::new(LocalSourceRepo::new(dir.path()));
    let context = BuildContext::new(repo, config(dir.path()), VersionCatalog::builtin());
    let generator = BuildScriptGenerator::from_config(&context.config).unwrap();

    let first = generator.detect(&context).unwrap();
    let second = generator.detect(&context).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.len(), 2);
}
