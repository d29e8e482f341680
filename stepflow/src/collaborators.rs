//! Injected collaborators shared by step definitions and pipelines.

use crate::config::{DefinitionOptions, SettingsRegistry};
use crate::materializers::{register_builtin_materializers, MaterializerRegistry};
use crate::source::{InMemorySourceRegistry, SourceResolver};
use std::sync::Arc;

/// Everything a step needs from the outside world.
#[derive(Debug, Clone)]
pub struct Collaborators {
    /// Resolves, loads and hashes sources.
    pub sources: Arc<dyn SourceResolver>,
    /// Default materializers by output type.
    pub materializers: Arc<MaterializerRegistry>,
    /// Recognized settings namespaces.
    pub settings: Arc<SettingsRegistry>,
    /// Definition options.
    pub options: DefinitionOptions,
}

impl Collaborators {
    /// Creates a bundle with default settings namespaces and options.
    #[must_use]
    pub fn new(sources: Arc<dyn SourceResolver>, materializers: Arc<MaterializerRegistry>) -> Self {
        Self {
            sources,
            materializers,
            settings: Arc::new(SettingsRegistry::new()),
            options: DefinitionOptions::default(),
        }
    }

    /// Creates a bundle backed by `sources` with the built-in materializers registered.
    #[must_use]
    pub fn with_builtin_materializers(sources: Arc<InMemorySourceRegistry>) -> Self {
        let materializers = Arc::new(MaterializerRegistry::new());
        register_builtin_materializers(&materializers, &sources);
        Self::new(sources, materializers)
    }

    /// Replaces the settings registry.
    #[must_use]
    pub fn with_settings(mut self, settings: Arc<SettingsRegistry>) -> Self {
        self.settings = settings;
        self
    }

    /// Replaces the definition options.
    #[must_use]
    pub fn with_options(mut self, options: DefinitionOptions) -> Self {
        self.options = options;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DuplicateInputPolicy;
    use crate::materializers::BUILTIN_MATERIALIZER;

    #[test]
    fn test_builtin_bundle() {
        let sources = Arc::new(InMemorySourceRegistry::new());
        let collaborators = Collaborators::with_builtin_materializers(Arc::clone(&sources));

        assert!(collaborators.materializers.is_registered("int"));
        assert!(sources.contains(BUILTIN_MATERIALIZER));
        assert!(collaborators.settings.is_valid_key("docker"));
    }

    #[test]
    fn test_with_options() {
        let sources = Arc::new(InMemorySourceRegistry::new());
        let collaborators = Collaborators::with_builtin_materializers(sources).with_options(
            DefinitionOptions::new().with_duplicate_input_policy(DuplicateInputPolicy::Reject),
        );

        assert_eq!(
            collaborators.options.duplicate_input_policy,
            DuplicateInputPolicy::Reject
        );
    }
}
