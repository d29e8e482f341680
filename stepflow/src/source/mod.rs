//! Source references.
//!
//! A [`Source`] is the stable textual path of an importable object. Sources
//! are how materializers and hooks are stored in a configuration and later
//! loaded again, and their source text feeds the caching fingerprint.

mod hashing;
mod resolver;

pub use hashing::{canonical_json, hash_json, hash_source_code};
pub use resolver::{InMemorySourceRegistry, SourceObject, SourceResolver};

#[cfg(test)]
pub use resolver::MockSourceResolver;

use crate::errors::SourceError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

#[allow(clippy::expect_used)]
static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is valid"));

/// Where a source comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    /// Code written by the user.
    #[default]
    User,
    /// Code shipped with stepflow itself.
    Internal,
    /// Language builtins.
    Builtin,
    /// Origin could not be determined.
    Unknown,
}

/// A reference to an importable object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Source {
    /// The module path, `::` separated.
    pub module: String,
    /// The attribute inside the module, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
    /// The origin of the source.
    #[serde(rename = "type", default)]
    pub source_type: SourceType,
}

impl Source {
    /// Creates a new user source.
    #[must_use]
    pub fn new(module: impl Into<String>, attribute: Option<String>) -> Self {
        Self {
            module: module.into(),
            attribute,
            source_type: SourceType::User,
        }
    }

    /// Sets the source type.
    #[must_use]
    pub fn with_type(mut self, source_type: SourceType) -> Self {
        self.source_type = source_type;
        self
    }

    /// Parses a `::` separated import path. The last segment becomes the attribute.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is empty or a segment is not an identifier.
    pub fn from_import_path(path: &str) -> Result<Self, SourceError> {
        let invalid = |reason: &str| SourceError::InvalidImportPath {
            path: path.to_string(),
            reason: reason.to_string(),
        };

        if path.trim().is_empty() {
            return Err(invalid("import path cannot be empty"));
        }

        let segments: Vec<&str> = path.split("::").collect();
        if let Some(bad) = segments.iter().find(|s| !IDENTIFIER.is_match(s)) {
            return Err(invalid(&format!("'{bad}' is not a valid identifier")));
        }

        match segments.split_last() {
            Some((attribute, module)) if !module.is_empty() => {
                Ok(Self::new(module.join("::"), Some((*attribute).to_string())))
            }
            _ => Ok(Self::new(path, None)),
        }
    }

    /// Returns the full import path.
    #[must_use]
    pub fn import_path(&self) -> String {
        match self.attribute {
            Some(ref attribute) => format!("{}::{}", self.module, attribute),
            None => self.module.clone(),
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.import_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_import_path() {
        let source = Source::from_import_path("my_pkg::materializers::CsvMaterializer").unwrap();

        assert_eq!(source.module, "my_pkg::materializers");
        assert_eq!(source.attribute.as_deref(), Some("CsvMaterializer"));
        assert_eq!(source.import_path(), "my_pkg::materializers::CsvMaterializer");
    }

    #[test]
    fn test_single_segment_is_module() {
        let source = Source::from_import_path("hooks").unwrap();
        assert_eq!(source.module, "hooks");
        assert!(source.attribute.is_none());
        assert_eq!(source.to_string(), "hooks");
    }

    #[test]
    fn test_invalid_import_paths() {
        assert!(Source::from_import_path("").is_err());
        assert!(Source::from_import_path("a::::b").is_err());
        assert!(Source::from_import_path("a::1b").is_err());
        assert!(Source::from_import_path("a::b-c").is_err());
        assert!(Source::from_import_path("a.b").is_err());
    }

    #[test]
    fn test_serialization_uses_type_key() {
        let source = Source::new("pkg", Some("Obj".to_string())).with_type(SourceType::Internal);
        let json = serde_json::to_value(&source).unwrap();

        assert_eq!(json["type"], "internal");
        assert_eq!(json["attribute"], "Obj");
    }
}
