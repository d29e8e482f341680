//! Default materializer registry: output type → materializer class.

use super::MaterializerClass;
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::sync::Arc;

/// Registry of default materializers keyed by type name.
///
/// The first registration for a type wins; later ones are skipped.
#[derive(Debug, Default)]
pub struct MaterializerRegistry {
    entries: RwLock<IndexMap<String, Arc<MaterializerClass>>>,
}

impl MaterializerRegistry {
    /// Creates a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a materializer as the default for one type.
    pub fn register_materializer_type(&self, type_name: impl Into<String>, class: Arc<MaterializerClass>) {
        let type_name = type_name.into();
        let mut entries = self.entries.write();
        if let Some(existing) = entries.get(&type_name) {
            tracing::debug!(
                type_name = %type_name,
                existing = %existing.source(),
                skipped = %class.source(),
                "Default materializer already registered, skipping"
            );
            return;
        }
        entries.insert(type_name, class);
    }

    /// Registers a materializer for every type it is associated with.
    pub fn register(&self, class: Arc<MaterializerClass>) {
        for type_name in class.associated_types() {
            self.register_materializer_type(type_name.clone(), Arc::clone(&class));
        }
    }

    /// Returns true if a default materializer exists for the type.
    #[must_use]
    pub fn is_registered(&self, type_name: &str) -> bool {
        self.entries.read().contains_key(type_name)
    }

    /// Looks up the default materializer for the type.
    #[must_use]
    pub fn lookup(&self, type_name: &str) -> Option<Arc<MaterializerClass>> {
        self.entries.read().get(type_name).cloned()
    }

    /// Returns all registrations in registration order.
    #[must_use]
    pub fn list(&self) -> Vec<(String, Arc<MaterializerClass>)> {
        self.entries
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), Arc::clone(v)))
            .collect()
    }

    /// Remove all registered entries (primarily for tests).
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Returns the number of registered types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Source;

    fn class(path: &str, types: &[&str]) -> Arc<MaterializerClass> {
        Arc::new(MaterializerClass::new(
            Source::from_import_path(path).unwrap(),
            types.iter().copied(),
        ))
    }

    #[test]
    fn test_register_all_associated_types() {
        let registry = MaterializerRegistry::new();
        registry.register(class("pkg::JsonMaterializer", &["dict", "list"]));

        assert!(registry.is_registered("dict"));
        assert!(registry.is_registered("list"));
        assert!(!registry.is_registered("int"));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_first_registration_wins() {
        let registry = MaterializerRegistry::new();
        registry.register(class("pkg::First", &["int"]));
        registry.register(class("pkg::Second", &["int"]));

        let found = registry.lookup("int").unwrap();
        assert_eq!(found.name(), "First");
    }

    #[test]
    fn test_lookup_missing() {
        let registry = MaterializerRegistry::new();
        assert!(registry.lookup("DataFrame").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_clear() {
        let registry = MaterializerRegistry::new();
        registry.register(class("pkg::M", &["a", "b"]));
        registry.clear();
        assert!(registry.list().is_empty());
    }
}
