use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::SCHEMA_FILE_SUFFIX;
use crate::errors::{Result, SchemaError};
use crate::path::normalize_locator;

/// Persistent storage for schema documents.
pub trait SchemaSource: Send + Sync {
    /// Fetch and parse the schema stored under a normalized locator.
    fn fetch(&self, locator: &str) -> Result<Value>;
}

/// Schemas stored as `<root>/<locator>.schema.json` files.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// On-disk path of the schema for `locator`.
    pub fn path_for(&self, locator: &str) -> PathBuf {
        self.root
            .join(format!("{}{SCHEMA_FILE_SUFFIX}", normalize_locator(locator)))
    }
}

impl SchemaSource for DirectorySource {
    fn fetch(&self, locator: &str) -> Result<Value> {
        let path = self.path_for(locator);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(SchemaError::NotFound {
                    locator: locator.to_string(),
                });
            }
            Err(err) => return Err(err.into()),
        };
        Ok(serde_json::from_str(&contents)?)
    }
}

/// Schemas registered in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    documents: HashMap<String, Value>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `document` under `locator`, replacing any previous one.
    pub fn with(mut self, locator: &str, document: Value) -> Self {
        self.documents.insert(normalize_locator(locator), document);
        self
    }
}

impl SchemaSource for MemorySource {
    fn fetch(&self, locator: &str) -> Result<Value> {
        self.documents
            .get(&normalize_locator(locator))
            .cloned()
            .ok_or_else(|| SchemaError::NotFound {
                locator: locator.to_string(),
            })
    }
}
