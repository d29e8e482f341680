//! Materializers shipped with stepflow for the built-in value types.

use super::{MaterializerClass, MaterializerRegistry};
use crate::source::{InMemorySourceRegistry, Source, SourceType};
use std::sync::Arc;

/// Materializer for primitive values.
pub const BUILTIN_MATERIALIZER: &str = "stepflow::materializers::BuiltInMaterializer";

/// Materializer for lists and dicts.
pub const BUILTIN_CONTAINER_MATERIALIZER: &str =
    "stepflow::materializers::BuiltInContainerMaterializer";

/// Materializer for n-dimensional arrays.
pub const ARRAY_MATERIALIZER: &str = "stepflow::materializers::ArrayMaterializer";

const BUILTIN_MATERIALIZER_CODE: &str = r#"
impl Materializer for BuiltInMaterializer {
    const ASSOCIATED_TYPES: &'static [&'static str] = &["bool", "int", "float", "str", "bytes"];

    fn load(&self, uri: &Path) -> Result<Value> {
        Ok(serde_json::from_reader(File::open(uri.join("data.json"))?)?)
    }

    fn save(&self, uri: &Path, value: &Value) -> Result<()> {
        Ok(serde_json::to_writer(File::create(uri.join("data.json"))?, value)?)
    }
}
"#;

const BUILTIN_CONTAINER_MATERIALIZER_CODE: &str = r#"
impl Materializer for BuiltInContainerMaterializer {
    const ASSOCIATED_TYPES: &'static [&'static str] = &["dict", "list", "tuple", "set"];

    fn load(&self, uri: &Path) -> Result<Value> {
        Ok(serde_json::from_reader(File::open(uri.join("container.json"))?)?)
    }

    fn save(&self, uri: &Path, value: &Value) -> Result<()> {
        Ok(serde_json::to_writer(File::create(uri.join("container.json"))?, value)?)
    }
}
"#;

const ARRAY_MATERIALIZER_CODE: &str = r#"
impl Materializer for ArrayMaterializer {
    const ASSOCIATED_TYPES: &'static [&'static str] = &["array"];

    fn load(&self, uri: &Path) -> Result<Array> {
        read_array(&uri.join("data.bin"))
    }

    fn save(&self, uri: &Path, array: &Array) -> Result<()> {
        write_array(&uri.join("data.bin"), array)
    }
}
"#;

fn builtin(path: &str, types: &[&str]) -> Arc<MaterializerClass> {
    let (module, attribute) = path.rsplit_once("::").unwrap_or(("", path));
    let source = Source::new(module, Some(attribute.to_string())).with_type(SourceType::Internal);
    Arc::new(MaterializerClass::new(source, types.iter().copied()))
}

/// Returns the built-in materializer classes with their source text.
#[must_use]
pub fn builtin_materializers() -> Vec<(Arc<MaterializerClass>, &'static str)> {
    vec![
        (
            builtin(BUILTIN_MATERIALIZER, &["bool", "int", "float", "str", "bytes"]),
            BUILTIN_MATERIALIZER_CODE,
        ),
        (
            builtin(BUILTIN_CONTAINER_MATERIALIZER, &["dict", "list", "tuple", "set"]),
            BUILTIN_CONTAINER_MATERIALIZER_CODE,
        ),
        (builtin(ARRAY_MATERIALIZER, &["array"]), ARRAY_MATERIALIZER_CODE),
    ]
}

/// Registers the built-in materializers as defaults and makes their sources loadable.
pub fn register_builtin_materializers(
    registry: &MaterializerRegistry,
    sources: &InMemorySourceRegistry,
) {
    for (class, code) in builtin_materializers() {
        sources.register_materializer(Arc::clone(&class), code);
        registry.register(class);
    }
}
