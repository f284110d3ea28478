use super::{HugoPlatform, NodePlatform, PhpPlatform, ProgrammingPlatform};
use crate::config::GeneratorConfig;
use crate::error::BuildError;
use crate::fs::FileSystem;
use crate::platform_id::PlatformId;
use crate::template::TemplateRenderer;
use std::sync::Arc;

/// Platforms in build priority order.
#[derive(Clone, Default)]
pub struct PlatformRegistry {
    platforms: Vec<Arc<dyn ProgrammingPlatform>>,
}

impl PlatformRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Node, PHP and Hugo, with installers rooted where `config` says.
    pub fn with_defaults(
        config: &GeneratorConfig,
        fs: Arc<dyn FileSystem>,
        renderer: Arc<dyn TemplateRenderer>,
    ) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(NodePlatform::from_config(
            config,
            fs.clone(),
            renderer.clone(),
        )));
        registry.register(Arc::new(PhpPlatform::from_config(
            config,
            fs.clone(),
            renderer.clone(),
        )));
        registry.register(Arc::new(HugoPlatform::from_config(config, fs, renderer)));
        registry
    }

    /// Registering an id twice replaces the earlier platform. The list is
    /// kept sorted by priority.
    pub fn register(&mut self, platform: Arc<dyn ProgrammingPlatform>) {
        self.platforms.retain(|p| p.id() != platform.id());
        self.platforms.push(platform);
        self.platforms.sort_by_key(|p| p.id());
    }

    pub fn get(&self, id: PlatformId) -> Option<&dyn ProgrammingPlatform> {
        self.platforms
            .iter()
            .find(|p| p.id() == id)
            .map(|p| p.as_ref())
    }

    /// Lookup by key or display name, case-insensitive.
    pub fn by_name(&self, name: &str) -> Result<&dyn ProgrammingPlatform, BuildError> {
        PlatformId::from_name(name)
            .and_then(|id| self.get(id))
            .ok_or_else(|| BuildError::UnknownPlatform(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn ProgrammingPlatform> {
        self.platforms.iter().map(|p| p.as_ref())
    }

    pub fn len(&self) -> usize {
        self.platforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.platforms.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::test_support::{config, host_fs, renderer};

    fn registry() -> PlatformRegistry {
        PlatformRegistry::with_defaults(&config(), host_fs(), renderer())
    }

    #[test]
    fn test_defaults_in_priority_order() {
        let ids: Vec<PlatformId> = registry().iter().map(|p| p.id()).collect();
        assert_eq!(ids, vec![PlatformId::Node, PlatformId::Php, PlatformId::Hugo]);
    }

    #[test]
    fn test_registration_order_does_not_matter() {
        let mut registry = PlatformRegistry::new();
        registry.register(Arc::new(HugoPlatform::from_config(&config(), host_fs(), renderer())));
        registry.register(Arc::new(NodePlatform::from_config(&config(), host_fs(), renderer())));

        let ids: Vec<PlatformId> = registry.iter().map(|p| p.id()).collect();
        assert_eq!(ids, vec![PlatformId::Node, PlatformId::Hugo]);
    }

    #[test]
    fn test_register_replaces_same_id() {
        let mut registry = registry();
        registry.register(Arc::new(PhpPlatform::from_config(&config(), host_fs(), renderer())));
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_by_name() {
        let registry = registry();
        assert_eq!(registry.by_name("nodejs").unwrap().id(), PlatformId::Node);
        assert_eq!(registry.by_name("PHP").unwrap().id(), PlatformId::Php);

        let err = registry.by_name("ruby").err().unwrap();
        assert!(matches!(err, BuildError::UnknownPlatform(ref name) if name == "ruby"));
        assert_eq!(err.exit_code(), crate::error::EXIT_UNKNOWN_PLATFORM);
    }

    #[test]
    fn test_by_name_not_registered() {
        let mut registry = PlatformRegistry::new();
        registry.register(Arc::new(NodePlatform::from_config(&config(), host_fs(), renderer())));
        assert!(registry.by_name("hugo").is_err());
    }
}
