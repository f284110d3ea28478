//! Bash template rendering.
//!
//! The generator only picks a [`TemplateId`] and supplies serialisable data;
//! the rendered text is never interpreted.

use crate::error::BuildError;
use serde::Serialize;
use tera::{Context, Tera};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateId {
    BaseBuildScript,
    Installer,
    NodeBuild,
    PhpBuild,
    HugoBuild,
}

impl TemplateId {
    pub fn name(&self) -> &'static str {
        match self {
            Self::BaseBuildScript => "base_build.sh",
            Self::Installer => "installer.sh",
            Self::NodeBuild => "node_build.sh",
            Self::PhpBuild => "php_build.sh",
            Self::HugoBuild => "hugo_build.sh",
        }
    }

    fn source(&self) -> &'static str {
        match self {
            Self::BaseBuildScript => include_str!("../templates/base_build.sh.tera"),
            Self::Installer => include_str!("../templates/installer.sh.tera"),
            Self::NodeBuild => include_str!("../templates/node_build.sh.tera"),
            Self::PhpBuild => include_str!("../templates/php_build.sh.tera"),
            Self::HugoBuild => include_str!("../templates/hugo_build.sh.tera"),
        }
    }

    pub fn all() -> &'static [TemplateId] {
        &[
            Self::BaseBuildScript,
            Self::Installer,
            Self::NodeBuild,
            Self::PhpBuild,
            Self::HugoBuild,
        ]
    }
}

pub trait TemplateRenderer: Send + Sync {
    fn render(&self, template: TemplateId, data: &serde_json::Value) -> Result<String, BuildError>;
}

/// Serialise `data` and render it with `renderer`.
pub fn render_with<T: Serialize>(
    renderer: &dyn TemplateRenderer,
    template: TemplateId,
    data: &T,
) -> Result<String, BuildError> {
    let value = serde_json::to_value(data).map_err(|e| BuildError::Template {
        template: template.name().to_string(),
        message: e.to_string(),
    })?;
    renderer.render(template, &value)
}

/// Renders the templates embedded in the binary.
pub struct TeraRenderer {
    tera: Tera,
}

impl TeraRenderer {
    pub fn new() -> Result<Self, BuildError> {
        let mut tera = Tera::default();
        for id in TemplateId::all() {
            tera.add_raw_template(id.name(), id.source())
                .map_err(|e| template_error(*id, &e))?;
        }
        Ok(Self { tera })
    }
}

fn template_error(template: TemplateId, error: &tera::Error) -> BuildError {
    // tera keeps the useful part of the message in the source chain
    let mut message = error.to_string();
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = std::error::Error::source(cause);
    }
    BuildError::Template {
        template: template.name().to_string(),
        message,
    }
}

impl TemplateRenderer for TeraRenderer {
    fn render(&self, template: TemplateId, data: &serde_json::Value) -> Result<String, BuildError> {
        let context = Context::from_serialize(data).map_err(|e| template_error(template, &e))?;
        self.tera
            .render(template.name(), &context)
            .map_err(|e| template_error(template, &e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_all_embedded_templates_compile() {
        assert!(TeraRenderer::new().is_ok());
    }

    #[test]
    fn test_render_hugo() {
        let renderer = TeraRenderer::new().unwrap();
        let out = renderer
            .render(TemplateId::HugoBuild, &json!({"hugo_version": "0.119.0"}))
            .unwrap();
        assert!(out.contains("Running 'hugo' 0.119.0"));
    }

    #[test]
    fn test_render_php_without_composer() {
        let renderer = TeraRenderer::new().unwrap();
        let out = renderer
            .render(TemplateId::PhpBuild, &json!({"composer_file_exists": false}))
            .unwrap();
        assert!(out.contains("not running 'composer install'"));
    }

    #[test]
    fn test_render_installer() {
        let renderer = TeraRenderer::new().unwrap();
        let out = renderer
            .render(
                TemplateId::Installer,
                &json!({
                    "tool": "nodejs",
                    "version": "18.17.1",
                    "install_dir": "/tmp/peelkit/platforms/nodejs/18.17.1",
                }),
            )
            .unwrap();
        assert!(out.contains("nodejs-18.17.1.tar.gz"));
        assert!(out.contains("/tmp/peelkit/platforms/nodejs/18.17.1/.peelkit-sentinel"));
    }

    #[test]
    fn test_missing_variable_is_template_error() {
        let renderer = TeraRenderer::new().unwrap();
        let err = renderer
            .render(TemplateId::Installer, &json!({"tool": "php"}))
            .unwrap_err();
        match err {
            BuildError::Template { template, .. } => assert_eq!(template, "installer.sh"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_render_with_serializes_struct() {
        #[derive(Serialize)]
        struct Data {
            composer_file_exists: bool,
        }

        let renderer = TeraRenderer::new().unwrap();
        let out = render_with(
            &renderer,
            TemplateId::PhpBuild,
            &Data {
                composer_file_exists: true,
            },
        )
        .unwrap();
        assert!(out.contains("composer install"));
    }
}
