use std::sync::OnceLock;

use rustc_hash::FxHashMap;

use crate::ops::all_schemas;
use crate::schema::{SchemaDescriptor, SchemaError};

/// Alias of the default operator domain.
const ONNX_DOMAIN: &str = "ai.onnx";

/// Map "ai.onnx" to the empty string, which also denotes the default domain.
fn normalize_domain(domain: &str) -> &str {
    if domain == ONNX_DOMAIN {
        ""
    } else {
        domain
    }
}

/// Registry of operator schemas, used to look up the schema for a graph
/// node.
///
/// Schemas are keyed by domain, operator name and the opset version that
/// introduced them. A lookup for an opset version finds the newest schema
/// introduced at or before that version.
///
/// New registries are empty. To create a registry with the neuromorphic
/// operators registered, use [`SchemaRegistry::with_neuromorphic_ops`], or
/// use the shared instance returned by [`SchemaRegistry::global`].
#[derive(Default)]
pub struct SchemaRegistry {
    /// Map of domain to operator name to schemas, sorted by version.
    schemas: FxHashMap<String, FxHashMap<String, Vec<SchemaDescriptor>>>,
}

impl SchemaRegistry {
    /// Create a new empty registry.
    pub fn new() -> SchemaRegistry {
        SchemaRegistry::default()
    }

    /// Create a registry with all the neuromorphic operators registered.
    pub fn with_neuromorphic_ops() -> Result<SchemaRegistry, SchemaError> {
        let mut registry = SchemaRegistry::new();
        for schema in all_schemas()? {
            registry.register(schema)?;
        }
        Ok(registry)
    }

    /// Return a shared registry with all the neuromorphic operators
    /// registered.
    ///
    /// The registry is built on first use.
    ///
    /// # Panics
    ///
    /// Panics if one of the built-in schemas is invalid.
    pub fn global() -> &'static SchemaRegistry {
        static REGISTRY: OnceLock<SchemaRegistry> = OnceLock::new();
        REGISTRY.get_or_init(|| {
            SchemaRegistry::with_neuromorphic_ops()
                .unwrap_or_else(|err| panic!("invalid built-in schema: {}", err))
        })
    }

    /// Add a schema to the registry.
    ///
    /// Fails if a schema with the same domain, name and version is already
    /// registered.
    pub fn register(&mut self, schema: SchemaDescriptor) -> Result<(), SchemaError> {
        let versions = self
            .schemas
            .entry(normalize_domain(schema.domain()).to_string())
            .or_default()
            .entry(schema.name().to_string())
            .or_default();

        match versions.binary_search_by_key(&schema.since_version(), |s| s.since_version()) {
            Ok(_) => Err(SchemaError::DuplicateSchema {
                domain: schema.domain().to_string(),
                name: schema.name().to_string(),
                since_version: schema.since_version(),
            }),
            Err(pos) => {
                log::debug!(
                    "Registered schema {}-{}",
                    schema.name(),
                    schema.since_version()
                );
                versions.insert(pos, schema);
                Ok(())
            }
        }
    }

    /// Find the schema for operator `name` in `domain` for a graph using
    /// opset version `opset_version`.
    ///
    /// Returns the schema with the highest `since_version` that is less than
    /// or equal to `opset_version`.
    pub fn get(&self, domain: &str, name: &str, opset_version: u32) -> Option<&SchemaDescriptor> {
        let versions = self.schemas.get(normalize_domain(domain))?.get(name)?;
        versions
            .iter()
            .rev()
            .find(|schema| schema.since_version() <= opset_version)
    }

    /// Return all schemas, ordered by domain, name and version.
    pub fn schemas(&self) -> Vec<&SchemaDescriptor> {
        let mut schemas: Vec<_> = self
            .schemas
            .values()
            .flat_map(|ops| ops.values())
            .flatten()
            .collect();
        schemas.sort_by_key(|s| (s.domain(), s.name(), s.since_version()));
        schemas
    }

    /// Return the number of registered schemas, counting each version.
    pub fn len(&self) -> usize {
        self.schemas
            .values()
            .flat_map(|ops| ops.values())
            .map(|versions| versions.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use nmdefs_shape_inference::{InferShapesError, InferenceContext};

    use super::SchemaRegistry;
    use crate::attrs::Attrs;
    use crate::ops::{recurrent_schema, CellDef, LIF_CELL, LSNN_LAYER};
    use crate::schema::{SchemaDef, SchemaDescriptor, SchemaError, TypeConstraint};
    use nmdefs_shape_inference::ElementType;

    fn versioned_schema(name: &'static str, since_version: u32) -> SchemaDescriptor {
        fn infer(_attrs: &Attrs, _ctx: &mut InferenceContext<'_>) -> Result<(), InferShapesError> {
            Ok(())
        }

        SchemaDescriptor::new(SchemaDef {
            name,
            domain: "com.example",
            since_version,
            doc: String::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            attributes: Vec::new(),
            type_constraints: vec![TypeConstraint::new(
                "T",
                [ElementType::Float32],
                "Float tensors.",
            )],
            inference: infer,
        })
        .unwrap()
    }

    #[test]
    fn test_with_neuromorphic_ops() {
        let registry = SchemaRegistry::with_neuromorphic_ops().unwrap();
        assert_eq!(registry.len(), 6);
        assert!(!registry.is_empty());

        let schema = registry.get("", LSNN_LAYER, 10).unwrap();
        assert_eq!(schema.name(), LSNN_LAYER);

        // "ai.onnx" is an alias of the default domain.
        assert!(registry.get("ai.onnx", LIF_CELL, 12).is_some());

        // Operators are not available before the version which introduced
        // them.
        assert!(registry.get("", LIF_CELL, 9).is_none());
        assert!(registry.get("com.example", LIF_CELL, 10).is_none());
        assert!(registry.get("", "LSTM", 10).is_none());

        let names: Vec<_> = registry.schemas().iter().map(|s| s.name()).collect();
        assert_eq!(
            names,
            ["ADEXCell", "ADEXLayer", "LIFCell", "LIFLayer", "LSNNCell", "LSNNLayer"]
        );
    }

    #[test]
    fn test_version_resolution() {
        let mut registry = SchemaRegistry::new();
        registry.register(versioned_schema("Spike", 3)).unwrap();
        registry.register(versioned_schema("Spike", 1)).unwrap();
        registry.register(versioned_schema("Spike", 7)).unwrap();

        let version = |opset| {
            registry
                .get("com.example", "Spike", opset)
                .map(|s| s.since_version())
        };
        assert_eq!(version(0), None);
        assert_eq!(version(1), Some(1));
        assert_eq!(version(2), Some(1));
        assert_eq!(version(6), Some(3));
        assert_eq!(version(20), Some(7));
    }

    #[test]
    fn test_duplicate_schema() {
        let mut registry = SchemaRegistry::with_neuromorphic_ops().unwrap();
        let schema = recurrent_schema(CellDef {
            name: LIF_CELL,
            doc: "",
            attributes: Vec::new(),
        })
        .unwrap();

        assert_eq!(
            registry.register(schema),
            Err(SchemaError::DuplicateSchema {
                domain: String::new(),
                name: LIF_CELL.to_string(),
                since_version: 10,
            })
        );
        assert_eq!(registry.len(), 6);
    }

    #[test]
    fn test_global() {
        let registry = SchemaRegistry::global();
        assert!(std::ptr::eq(registry, SchemaRegistry::global()));
        assert_eq!(registry.len(), 6);
    }
}
