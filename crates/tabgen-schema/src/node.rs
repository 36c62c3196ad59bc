use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use jsonschema::JSONSchema;
use jsonschema::error::ValidationErrorKind;
use serde_json::{Map, Value};

use crate::errors::{Result, SchemaError, Violation, Violations};
use crate::store::{DetachedResolver, SchemaStore};

/// A JSON Schema document with its identity and a compiled validator.
///
/// Clones share the document and the validator. Documents are never
/// mutated after construction.
#[derive(Clone)]
pub struct SchemaNode {
    document: Arc<Value>,
    locator: String,
    fragment: Option<String>,
    validator: Arc<JSONSchema>,
    store: Option<Arc<SchemaStore>>,
    /// Extracted subschemas keyed by name and dependencies. Shared by clones.
    subschemas: Arc<Mutex<HashMap<(String, Vec<String>), SchemaNode>>>,
}

impl SchemaNode {
    /// Wrap a schema that has no locator.
    ///
    /// No `$id` is synthesized, so external references cannot be resolved and
    /// subschemas extracted from it are anonymous as well.
    pub fn from_document(document: Value) -> Result<Self> {
        Self::build(document, String::new(), None, None)
    }

    pub(crate) fn build(
        mut document: Value,
        locator: String,
        fragment: Option<String>,
        store: Option<Arc<SchemaStore>>,
    ) -> Result<Self> {
        let id = match &store {
            Some(store) if !locator.is_empty() => {
                Some(store.schema_id(&locator, fragment.as_deref()))
            }
            _ => None,
        };

        match id {
            Some(id) => {
                let object = document
                    .as_object_mut()
                    .ok_or_else(|| SchemaError::Structure {
                        locator: display_locator(&locator, fragment.as_deref()),
                        reason: "schema document must be a JSON object".to_string(),
                    })?;
                object.insert("$id".to_string(), Value::String(id));
            }
            None => {
                tracing::warn!(
                    event = "schema_unidentified",
                    fragment = fragment.as_deref().unwrap_or(""),
                    "schema has no locator; \"$id\" cannot be set and references may not resolve"
                );
            }
        }

        let document = Arc::new(document);
        let mut options = JSONSchema::options();
        match &store {
            Some(store) => {
                options.with_resolver(store.resolver(&locator, Arc::clone(&document)))
            }
            None => options.with_resolver(DetachedResolver),
        };

        let validator = options.compile(&document).map_err(|err| match &err.kind {
            ValidationErrorKind::Resolver { url, error } => SchemaError::Resolution {
                reference: url.to_string(),
                reason: error.to_string(),
            },
            _ => SchemaError::Structure {
                locator: display_locator(&locator, fragment.as_deref()),
                reason: err.to_string(),
            },
        })?;

        Ok(Self {
            document,
            locator,
            fragment,
            validator: Arc::new(validator),
            store,
            subschemas: Arc::default(),
        })
    }

    /// The schema document, including the synthesized `$id`.
    pub fn document(&self) -> &Value {
        &self.document
    }

    /// Logical path of the schema resource, empty for anonymous schemas.
    pub fn locator(&self) -> &str {
        &self.locator
    }

    /// `#/definitions/...` pointer for extracted subschemas.
    pub fn fragment(&self) -> Option<&str> {
        self.fragment.as_deref()
    }

    /// The synthesized `$id`.
    pub fn id(&self) -> Result<&str> {
        if self.locator.is_empty() {
            tracing::warn!(event = "schema_unidentified", "requested \"$id\" of an anonymous schema");
            return Err(SchemaError::Unidentified);
        }
        self.document
            .get("$id")
            .and_then(Value::as_str)
            .ok_or(SchemaError::Unidentified)
    }

    /// Extract `#/definitions/<name>` as a standalone schema.
    ///
    /// The result lives at the same locator with its fragment replaced by
    /// `#/definitions/<name>`: extraction is always relative to the original
    /// root, so repeated extraction never nests fragments. `$schema` is
    /// carried over, and each named dependency is copied into the result's
    /// own `definitions` so local `$ref`s keep resolving.
    ///
    /// Extractions are memoized per node, so repeated calls share one
    /// compiled validator.
    pub fn subschema(&self, name: &str, dependencies: &[&str]) -> Result<SchemaNode> {
        let key = (
            name.to_string(),
            dependencies.iter().map(|dep| (*dep).to_string()).collect::<Vec<_>>(),
        );
        if let Some(node) = self.cached_subschema(&key) {
            tracing::debug!(
                event = "subschema_cache_hit",
                locator = %self.locator,
                subschema = name
            );
            return Ok(node);
        }

        let node = self.extract(name, dependencies)?;
        self.subschemas
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, node.clone());
        Ok(node)
    }

    fn cached_subschema(&self, key: &(String, Vec<String>)) -> Option<SchemaNode> {
        let subschemas = self.subschemas.lock().unwrap_or_else(PoisonError::into_inner);
        subschemas.get(key).cloned()
    }

    fn extract(&self, name: &str, dependencies: &[&str]) -> Result<SchemaNode> {
        let definitions = self
            .document
            .get("definitions")
            .and_then(Value::as_object)
            .ok_or_else(|| self.structure_error("schema has no definitions".to_string()))?;

        let mut subschema = definitions
            .get(name)
            .ok_or_else(|| self.structure_error(format!("no subschema named '{name}'")))?
            .as_object()
            .cloned()
            .ok_or_else(|| self.structure_error(format!("subschema '{name}' is not an object")))?;

        if let Some(version) = self.document.get("$schema") {
            subschema.insert("$schema".to_string(), version.clone());
        }

        if !dependencies.is_empty() {
            let mut nested = match subschema.get("definitions") {
                Some(Value::Object(existing)) => existing.clone(),
                _ => Map::new(),
            };
            for dependency in dependencies {
                let definition = definitions.get(*dependency).ok_or_else(|| {
                    self.structure_error(format!(
                        "dependency '{dependency}' of subschema '{name}' does not exist"
                    ))
                })?;
                nested.insert((*dependency).to_string(), definition.clone());
            }
            subschema.insert("definitions".to_string(), Value::Object(nested));
        }

        if self.locator.is_empty() {
            tracing::warn!(
                event = "anonymous_subschema",
                subschema = name,
                "extracting from a schema without a locator"
            );
        }

        tracing::debug!(
            event = "subschema_extracted",
            locator = %self.locator,
            subschema = name,
            dependencies = dependencies.len()
        );

        SchemaNode::build(
            Value::Object(subschema),
            self.locator.clone(),
            Some(format!("#/definitions/{name}")),
            self.store.clone(),
        )
    }

    /// Validate `instance` against this schema.
    ///
    /// Every violation is reported. A reference that cannot be resolved is
    /// reported on its own as [`SchemaError::Resolution`], since the instance
    /// may well be valid.
    pub fn validate_structure(&self, instance: &Value) -> Result<()> {
        let errors = match self.validator.validate(instance) {
            Ok(()) => return Ok(()),
            Err(errors) => errors,
        };

        let mut violations = Vec::new();
        for error in errors {
            if let ValidationErrorKind::Resolver { url, error: cause } = &error.kind {
                return Err(SchemaError::Resolution {
                    reference: url.to_string(),
                    reason: cause.to_string(),
                });
            }
            violations.push(Violation {
                instance_path: error.instance_path.to_string(),
                schema_path: error.schema_path.to_string(),
                message: error.to_string(),
            });
        }

        Err(SchemaError::StructuralValidation(Violations::new(violations)))
    }

    fn structure_error(&self, reason: String) -> SchemaError {
        SchemaError::Structure {
            locator: display_locator(&self.locator, self.fragment.as_deref()),
            reason,
        }
    }
}

impl fmt::Debug for SchemaNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaNode")
            .field("locator", &self.locator)
            .field("fragment", &self.fragment)
            .finish_non_exhaustive()
    }
}

fn display_locator(locator: &str, fragment: Option<&str>) -> String {
    let locator = if locator.is_empty() { "<anonymous>" } else { locator };
    format!("{locator}{}", fragment.unwrap_or(""))
}
