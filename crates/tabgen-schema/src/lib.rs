//! JSON Schema composition for tabgen.
//!
//! A [`SchemaNode`] is a schema document plus the identity it lives under
//! (`$id`) and a compiled structural validator. Nodes are loaded through a
//! [`SchemaStore`], which caches parsed documents per locator and resolves
//! `$ref`s pointing back at the schemas API from the same cache.

pub mod config;
pub mod errors;
pub mod node;
pub mod path;
pub mod source;
pub mod store;

pub use config::SchemaApiConfig;
pub use errors::{Result, SchemaError, Violation, Violations};
pub use node::SchemaNode;
pub use path::{normalize_locator, normalize_path};
pub use source::{DirectorySource, MemorySource, SchemaSource};
pub use store::SchemaStore;

/// File suffix of schema resources on disk.
pub const SCHEMA_FILE_SUFFIX: &str = ".schema.json";
