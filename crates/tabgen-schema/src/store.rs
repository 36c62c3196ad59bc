use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use jsonschema::{SchemaResolver, SchemaResolverError};
use serde_json::Value;
use url::Url;

use crate::config::SchemaApiConfig;
use crate::errors::{Result, SchemaError};
use crate::node::SchemaNode;
use crate::path::normalize_locator;
use crate::source::SchemaSource;

type Slot = Arc<Mutex<Option<Arc<Value>>>>;

/// Process-wide cache of parsed schema documents, keyed by locator.
///
/// Each locator is parsed at most once. Callers racing on the first load of
/// the same locator wait on that locator's slot instead of parsing twice. A
/// failed load leaves the slot empty, so a later call retries.
pub struct SchemaStore {
    source: Box<dyn SchemaSource>,
    config: SchemaApiConfig,
    slots: Mutex<HashMap<String, Slot>>,
}

impl SchemaStore {
    pub fn new(source: impl SchemaSource + 'static, config: SchemaApiConfig) -> Arc<Self> {
        Arc::new(Self {
            source: Box::new(source),
            config,
            slots: Mutex::new(HashMap::new()),
        })
    }

    pub fn config(&self) -> &SchemaApiConfig {
        &self.config
    }

    /// `$id` a schema at `locator` (and optional fragment) is published under.
    pub fn schema_id(&self, locator: &str, fragment: Option<&str>) -> String {
        self.config.schema_id(locator, fragment)
    }

    /// Returns true when the document for `locator` has already been parsed.
    pub fn is_cached(&self, locator: &str) -> bool {
        let key = normalize_locator(locator);
        let slot = self
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned();
        match slot {
            Some(slot) => {
                let cached = slot.lock().unwrap_or_else(PoisonError::into_inner);
                cached.is_some()
            }
            None => false,
        }
    }

    /// Parsed document for `locator`, fetched from the source on first use.
    pub fn document(&self, locator: &str) -> Result<Arc<Value>> {
        let key = normalize_locator(locator);
        if key.is_empty() {
            return Err(SchemaError::NotFound {
                locator: locator.to_string(),
            });
        }

        loop {
            let slot = {
                let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
                let slot = slots.entry(key.clone()).or_default();
                Arc::clone(slot)
            };

            let mut cached = slot.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(document) = cached.as_ref() {
                tracing::debug!(event = "schema_cache_hit", locator = %key);
                return Ok(Arc::clone(document));
            }

            // A failed load discards its slot; callers that queued on it start over.
            if !self.owns_slot(&key, &slot) {
                continue;
            }

            match self.source.fetch(&key) {
                Ok(document) => {
                    let document = Arc::new(document);
                    tracing::info!(event = "schema_loaded", locator = %key);
                    *cached = Some(Arc::clone(&document));
                    return Ok(document);
                }
                Err(err) => {
                    self.slots
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .remove(&key);
                    return Err(err);
                }
            }
        }
    }

    fn owns_slot(&self, key: &str, slot: &Slot) -> bool {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.get(key).is_some_and(|current| Arc::ptr_eq(current, slot))
    }

    /// Build a node for the schema at `locator`.
    ///
    /// The parsed document is cached; the node, and its `$id`, are derived
    /// afresh on every call.
    pub fn load(self: &Arc<Self>, locator: &str) -> Result<SchemaNode> {
        let document = self.document(locator)?;
        SchemaNode::build(
            Value::clone(&document),
            normalize_locator(locator),
            None,
            Some(Arc::clone(self)),
        )
    }

    /// Wrap an in-memory document living at `locator`/`fragment`. The
    /// document is not added to the cache.
    pub fn node_from_document(
        self: &Arc<Self>,
        document: Value,
        locator: &str,
        fragment: Option<&str>,
    ) -> Result<SchemaNode> {
        SchemaNode::build(
            document,
            normalize_locator(locator),
            fragment.map(str::to_string),
            Some(Arc::clone(self)),
        )
    }

    pub(crate) fn resolver(
        self: &Arc<Self>,
        locator: &str,
        document: Arc<Value>,
    ) -> StoreResolver {
        StoreResolver {
            store: Arc::clone(self),
            locator: locator.to_string(),
            document,
        }
    }
}

/// Serves `$ref`s that point at the schemas API, and refuses everything else
/// without touching the network.
///
/// References back into the node's own locator are answered with the node's
/// own document, so an extracted subschema resolves against the definitions
/// copied into it rather than the full root in the store.
pub(crate) struct StoreResolver {
    store: Arc<SchemaStore>,
    locator: String,
    document: Arc<Value>,
}

impl SchemaResolver for StoreResolver {
    fn resolve(
        &self,
        _root_schema: &Value,
        url: &Url,
        original_reference: &str,
    ) -> std::result::Result<Arc<Value>, SchemaResolverError> {
        let locator = self.store.config.locator_for(url).ok_or_else(|| {
            anyhow::anyhow!(
                "'{original_reference}' does not point at the schemas API ({})",
                self.store.config.base_url()
            )
        })?;
        if locator == self.locator {
            tracing::debug!(event = "schema_reference_resolved", url = %url, source = "self");
            return Ok(Arc::clone(&self.document));
        }
        tracing::debug!(event = "schema_reference_resolved", url = %url, locator = %locator);
        Ok(self.store.document(&locator)?)
    }
}

/// Resolver for nodes without a store: nothing external can be fetched.
pub(crate) struct DetachedResolver;

impl SchemaResolver for DetachedResolver {
    fn resolve(
        &self,
        _root_schema: &Value,
        url: &Url,
        _original_reference: &str,
    ) -> std::result::Result<Arc<Value>, SchemaResolverError> {
        Err(anyhow::anyhow!(
            "schema has no store to resolve '{url}' from"
        ))
    }
}
