//! Source resolution: import path ↔ object ↔ source text.

use super::{hash_source_code, Source};
use crate::errors::SourceError;
use crate::materializers::MaterializerClass;
use crate::steps::HookDecl;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

/// An object a source loads to.
#[derive(Debug, Clone)]
pub enum SourceObject {
    /// A materializer class.
    Materializer(Arc<MaterializerClass>),
    /// A failure or success hook.
    Hook(Arc<HookDecl>),
    /// Any other code, such as a step entrypoint.
    Code,
}

impl SourceObject {
    /// Short name of the object kind, used in error messages.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Materializer(_) => "materializer",
            Self::Hook(_) => "hook",
            Self::Code => "plain code object",
        }
    }
}

/// Resolves objects to sources and loads them back.
///
/// Implementations must be deterministic and content addressed: the same
/// source text always hashes to the same value.
#[cfg_attr(test, mockall::automock)]
pub trait SourceResolver: Send + Sync + Debug {
    /// Resolves an import path to a registered source.
    fn resolve(&self, import_path: &str) -> Result<Source, SourceError>;

    /// Loads the object a source points to.
    fn load(&self, source: &Source) -> Result<SourceObject, SourceError>;

    /// Returns the source text of the object a source points to.
    fn source_code(&self, source: &Source) -> Result<String, SourceError>;

    /// Hashes the source text of the object a source points to.
    fn hash_source(&self, source: &Source) -> Result<String, SourceError> {
        Ok(hash_source_code(&self.source_code(source)?))
    }
}

#[derive(Debug, Clone)]
struct RegisteredSource {
    source: Source,
    object: SourceObject,
    code: String,
}

/// In-memory source registry.
#[derive(Debug, Default)]
pub struct InMemorySourceRegistry {
    entries: RwLock<HashMap<String, RegisteredSource>>,
}

impl InMemorySourceRegistry {
    /// Creates a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an object under its source, replacing any previous entry.
    pub fn register(&self, source: Source, object: SourceObject, code: impl Into<String>) {
        let entry = RegisteredSource {
            source: source.clone(),
            object,
            code: code.into(),
        };
        self.entries.write().insert(source.import_path(), entry);
    }

    /// Registers a materializer class under its own source.
    pub fn register_materializer(&self, class: Arc<MaterializerClass>, code: impl Into<String>) {
        let source = class.source().clone();
        self.register(source, SourceObject::Materializer(class), code);
    }

    /// Registers a hook.
    pub fn register_hook(&self, source: Source, hook: HookDecl, code: impl Into<String>) {
        self.register(source, SourceObject::Hook(Arc::new(hook)), code);
    }

    /// Registers plain code.
    pub fn register_code(&self, source: Source, code: impl Into<String>) {
        self.register(source, SourceObject::Code, code);
    }

    /// Returns true if something is registered under the import path.
    #[must_use]
    pub fn contains(&self, import_path: &str) -> bool {
        self.entries.read().contains_key(import_path)
    }

    /// Returns the number of registered sources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    fn entry(&self, source: &Source) -> Result<RegisteredSource, SourceError> {
        let path = source.import_path();
        self.entries
            .read()
            .get(&path)
            .cloned()
            .ok_or(SourceError::NotFound { path })
    }
}

impl SourceResolver for InMemorySourceRegistry {
    fn resolve(&self, import_path: &str) -> Result<Source, SourceError> {
        let parsed = Source::from_import_path(import_path)?;
        Ok(self.entry(&parsed)?.source)
    }

    fn load(&self, source: &Source) -> Result<SourceObject, SourceError> {
        Ok(self.entry(source)?.object)
    }

    fn source_code(&self, source: &Source) -> Result<String, SourceError> {
        Ok(self.entry(source)?.code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceType;

    #[test]
    fn test_register_and_load_code() {
        let registry = InMemorySourceRegistry::new();
        let source = Source::from_import_path("pkg::module::helper").unwrap();
        registry.register_code(source.clone(), "fn helper() {}");

        assert!(registry.contains("pkg::module::helper"));
        assert!(matches!(registry.load(&source).unwrap(), SourceObject::Code));
        assert_eq!(registry.source_code(&source).unwrap(), "fn helper() {}");
    }

    #[test]
    fn test_resolve_keeps_registered_type() {
        let registry = InMemorySourceRegistry::new();
        let source = Source::from_import_path("stepflow::internal::Thing")
            .unwrap()
            .with_type(SourceType::Internal);
        registry.register_code(source, "struct Thing;");

        let resolved = registry.resolve("stepflow::internal::Thing").unwrap();
        assert_eq!(resolved.source_type, SourceType::Internal);
    }

    #[test]
    fn test_unknown_source() {
        let registry = InMemorySourceRegistry::new();
        let err = registry.resolve("missing::Thing").unwrap_err();
        assert_eq!(
            err,
            SourceError::NotFound {
                path: "missing::Thing".to_string()
            }
        );
    }

    #[test]
    fn test_hash_source_follows_code() {
        let registry = InMemorySourceRegistry::new();
        let source = Source::from_import_path("pkg::f").unwrap();

        registry.register_code(source.clone(), "v1");
        let first = registry.hash_source(&source).unwrap();
        registry.register_code(source.clone(), "v1");
        assert_eq!(first, registry.hash_source(&source).unwrap());

        registry.register_code(source.clone(), "v2");
        assert_ne!(first, registry.hash_source(&source).unwrap());
    }
}
